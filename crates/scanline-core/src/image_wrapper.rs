//! Grayscale frame buffer handed to readers and result collectors.

use image::DynamicImage;

use crate::error::EngineError;

/// An owned 8-bit grayscale frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageWrapper {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl ImageWrapper {
    /// Wrap raw luma bytes. `data` must hold exactly `width * height` bytes.
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Result<Self, EngineError> {
        let expected = width as usize * height as usize;
        if data.len() != expected {
            return Err(EngineError::InputStream {
                message: format!(
                    "buffer holds {} bytes, {}x{} frame needs {}",
                    data.len(),
                    width,
                    height,
                    expected
                ),
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// A frame filled with a single luma value.
    pub fn filled(width: u32, height: u32, value: u8) -> Self {
        Self {
            width,
            height,
            data: vec![value; width as usize * height as usize],
        }
    }

    /// Convert a decoded image to grayscale.
    pub fn from_dynamic(image: &DynamicImage) -> Self {
        let luma = image.to_luma8();
        let (width, height) = luma.dimensions();
        Self {
            width,
            height,
            data: luma.into_raw(),
        }
    }

    /// Downscale so the longer side is at most `max_side`, keeping aspect ratio.
    ///
    /// Frames already within bounds are returned unchanged.
    pub fn from_dynamic_scaled(image: &DynamicImage, max_side: u32) -> Self {
        let longest = image.width().max(image.height());
        if max_side == 0 || longest <= max_side {
            return Self::from_dynamic(image);
        }
        let scaled = image.resize(max_side, max_side, image::imageops::FilterType::Triangle);
        Self::from_dynamic(&scaled)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Raw row-major luma bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Luma value at `(x, y)`, or `None` outside the frame.
    pub fn get(&self, x: u32, y: u32) -> Option<u8> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.data
            .get(y as usize * self.width as usize + x as usize)
            .copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rejects_mismatched_buffer() {
        let err = ImageWrapper::new(4, 4, vec![0; 10]).unwrap_err();
        assert!(err.to_string().contains("needs 16"));
    }

    #[test]
    fn test_get_bounds() {
        let frame = ImageWrapper::new(2, 2, vec![1, 2, 3, 4]).unwrap();
        assert_eq!(frame.get(1, 1), Some(4));
        assert_eq!(frame.get(2, 0), None);
    }

    #[test]
    fn test_from_dynamic_scaled_limits_longest_side() {
        let img = DynamicImage::new_rgb8(1600, 400);
        let frame = ImageWrapper::from_dynamic_scaled(&img, 800);
        assert_eq!(frame.width(), 800);
        assert_eq!(frame.height(), 200);
    }

    #[test]
    fn test_from_dynamic_scaled_keeps_small_frames() {
        let img = DynamicImage::new_luma8(320, 240);
        let frame = ImageWrapper::from_dynamic_scaled(&img, 800);
        assert_eq!(frame.size(), (320, 240));
    }
}
