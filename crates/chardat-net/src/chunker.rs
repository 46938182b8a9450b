use crate::error::TransferError;

/// Default chunk size: 256 KiB fits most message size limits.
pub const DEFAULT_CHUNK_SIZE: usize = 256 * 1024;

/// Split `data` into ordered chunks of `chunk_size` bytes. The last chunk
/// holds the remainder and is omitted when the length divides evenly.
pub fn split(data: &[u8], chunk_size: usize) -> Result<Vec<Vec<u8>>, TransferError> {
    if chunk_size == 0 {
        return Err(TransferError::ZeroChunkSize);
    }
    Ok(data.chunks(chunk_size).map(<[u8]>::to_vec).collect())
}

/// Concatenate chunks that are already in sequence order.
pub fn reassemble<I, B>(chunks: I) -> Vec<u8>
where
    I: IntoIterator<Item = B>,
    B: AsRef<[u8]>,
{
    let mut data = Vec::new();
    for chunk in chunks {
        data.extend_from_slice(chunk.as_ref());
    }
    data
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bytes(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i * 31 % 251) as u8).collect()
    }

    #[test]
    fn chunk_lengths() {
        let chunks = split(&bytes(10), 4).unwrap();
        let lens: Vec<usize> = chunks.iter().map(Vec::len).collect();
        assert_eq!(lens, vec![4, 4, 2]);

        assert_eq!(split(&bytes(8), 4).unwrap().len(), 2);
        assert!(split(&[], 4).unwrap().is_empty());
    }

    #[test]
    fn reassemble_inverts_split() {
        for len in [0, 1, 7, 64, 1000] {
            for size in [1, 3, 64, 1024] {
                let data = bytes(len);
                let chunks = split(&data, size).unwrap();
                assert_eq!(chunks.len(), len.div_ceil(size));
                assert_eq!(reassemble(&chunks), data);
            }
        }
    }

    #[test]
    fn zero_chunk_size_is_rejected() {
        assert!(matches!(split(b"abc", 0), Err(TransferError::ZeroChunkSize)));
    }
}
