use std::io::Cursor;

use chardat_core::Texture;
use image::{ImageFormat, RgbaImage};

use crate::error::AssetError;

/// Encode RGBA8 pixels as a PNG file.
pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>, AssetError> {
    let mut bytes = Cursor::new(Vec::new());
    image
        .write_to(&mut bytes, ImageFormat::Png)
        .map_err(|e| AssetError::ImageEncode(e.to_string()))?;
    Ok(bytes.into_inner())
}

/// Decode a PNG file into a texture.
///
/// Decoded textures live on the device only; duplicate them through a
/// graphics context before reading their pixels on the CPU.
pub fn decode_png(bytes: &[u8]) -> Result<Texture, AssetError> {
    let image = image::load_from_memory_with_format(bytes, ImageFormat::Png)
        .map_err(|e| AssetError::ImageDecode(e.to_string()))?
        .to_rgba8();
    let (width, height) = image.dimensions();
    let mut texture = Texture::from_rgba8(width, height, image.into_raw())?;
    texture.readable = false;
    Ok(texture)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn png_preserves_pixels() {
        let pixels: Vec<u8> = (0..8 * 8 * 4).map(|i| (i * 7) as u8).collect();
        let image = RgbaImage::from_raw(8, 8, pixels.clone()).unwrap();

        let bytes = encode_png(&image).unwrap();
        assert_eq!(&bytes[1..4], b"PNG");

        let texture = decode_png(&bytes).unwrap();
        assert_eq!((texture.width, texture.height), (8, 8));
        assert_eq!(texture.pixels(), pixels.as_slice());
        assert!(!texture.readable);
    }

    #[test]
    fn garbage_is_a_decode_error() {
        assert!(matches!(
            decode_png(b"not a png"),
            Err(AssetError::ImageDecode(_))
        ));
    }
}
