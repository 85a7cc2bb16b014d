use image::{DynamicImage, GrayImage, Luma};
use std::io::Cursor;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PreprocessError {
    #[error("Failed to load image: {0}")]
    Load(#[from] image::ImageError),
    #[error("Failed to encode processed image: {0}")]
    Encode(String),
}

/// Decode raw image bytes (JPEG / PNG / TIFF / …).
pub fn load_image(data: &[u8]) -> Result<DynamicImage, PreprocessError> {
    Ok(image::load_from_memory(data)?)
}

/// Binarize `img` and return PNG bytes ready for OCR.
pub fn prepare_for_ocr(img: &DynamicImage, level: u8) -> Result<Vec<u8>, PreprocessError> {
    encode_as_png(DynamicImage::ImageLuma8(threshold(img, level)))
}

/// Grayscale, then pixels darker than `level` become black and the rest white.
pub fn threshold(img: &DynamicImage, level: u8) -> GrayImage {
    let mut gray = img.to_luma8();
    for p in gray.pixels_mut() {
        *p = if p[0] < level { Luma([0]) } else { Luma([255]) };
    }
    gray
}

fn encode_as_png(img: DynamicImage) -> Result<Vec<u8>, PreprocessError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .map_err(|e| PreprocessError::Encode(e.to_string()))?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb, RgbImage};

    fn gradient_gray(width: u32) -> DynamicImage {
        let img: GrayImage = ImageBuffer::from_fn(width, 1, |x, _| Luma([(x * 255 / (width - 1)) as u8]));
        DynamicImage::ImageLuma8(img)
    }

    #[test]
    fn threshold_is_binary() {
        let out = threshold(&gradient_gray(256), 140);
        assert!(out.pixels().all(|p| p[0] == 0 || p[0] == 255));
    }

    #[test]
    fn threshold_boundary_is_exclusive() {
        let out = threshold(&gradient_gray(256), 140);
        assert_eq!(out.get_pixel(139, 0)[0], 0);
        assert_eq!(out.get_pixel(140, 0)[0], 255);
    }

    #[test]
    fn color_input_is_grayscaled_first() {
        let img: RgbImage = ImageBuffer::from_fn(2, 1, |x, _| {
            if x == 0 { Rgb([10, 10, 10]) } else { Rgb([240, 240, 240]) }
        });
        let out = threshold(&DynamicImage::ImageRgb8(img), 140);
        assert_eq!(out.dimensions(), (2, 1));
        assert_eq!(out.get_pixel(0, 0)[0], 0);
        assert_eq!(out.get_pixel(1, 0)[0], 255);
    }

    #[test]
    fn prepare_produces_png_header() {
        let bytes = prepare_for_ocr(&gradient_gray(16), 140).unwrap();
        // PNG magic bytes: 0x89 0x50 0x4E 0x47
        assert_eq!(&bytes[..4], b"\x89PNG");
    }

    #[test]
    fn load_rejects_garbage() {
        assert!(matches!(load_image(b"not an image"), Err(PreprocessError::Load(_))));
        assert!(load_image(&[]).is_err());
    }
}
