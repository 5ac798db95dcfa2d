// src/image.rs
//
// Owned image container and borrowed viewports into it.
//
// An Image exclusively owns its pixel buffer. Relabeling only touches the
// mode tag; anything that changes premultiplication state goes through the
// alpha codec. Views never copy pixels.

use crate::convert::{ColorConverter, StandardConverter};
use crate::crop::CropBox;
use crate::error::{ResizerError, Result};
use crate::mode::{ColorMode, PixelFormat};
use image::{DynamicImage, GrayImage, RgbImage, RgbaImage};

#[derive(Clone, Debug, PartialEq)]
pub struct Image {
    width: u32,
    height: u32,
    mode: ColorMode,
    buffer: Vec<u8>,
}

impl Image {
    /// Zero-filled image. RGB padding bytes are opaque.
    pub fn new(width: u32, height: u32, mode: ColorMode) -> Result<Self> {
        let len = mode.pixel_format().buffer_len(width, height)?;
        let mut buffer = vec![0u8; len];
        if mode == ColorMode::Rgb {
            fill_opaque_padding(&mut buffer);
        }
        Ok(Self {
            width,
            height,
            mode,
            buffer,
        })
    }

    /// Wrap an existing buffer. Bytes beyond `width * height * pixel_size` are dropped.
    /// RGB padding bytes are overwritten with 255.
    pub fn from_vec(width: u32, height: u32, mode: ColorMode, mut buffer: Vec<u8>) -> Result<Self> {
        let len = mode.pixel_format().buffer_len(width, height)?;
        if buffer.len() < len {
            return Err(ResizerError::buffer_too_small(len, buffer.len()));
        }
        buffer.truncate(len);
        if mode == ColorMode::Rgb {
            fill_opaque_padding(&mut buffer);
        }
        Ok(Self {
            width,
            height,
            mode,
            buffer,
        })
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

    pub fn mode(&self) -> ColorMode {
        self.mode
    }

    pub fn pixel_format(&self) -> PixelFormat {
        self.mode.pixel_format()
    }

    pub fn buffer(&self) -> &[u8] {
        &self.buffer
    }

    pub fn buffer_mut(&mut self) -> &mut [u8] {
        &mut self.buffer
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.buffer
    }

    /// Change the mode tag without touching color data.
    ///
    /// Only modes with the same physical layout can be swapped this way.
    /// Moving into `RGB`, or from `RGB` into an alpha mode, resets the
    /// alpha slot to 255: RGB is always opaque.
    pub fn set_mode_tag(&mut self, mode: ColorMode) -> Result<()> {
        let resets_alpha = match (self.mode, mode) {
            (from, ColorMode::Rgb) => from != ColorMode::Rgb,
            (ColorMode::Rgb, ColorMode::Rgba | ColorMode::RgbaPremultiplied) => true,
            _ => false,
        };
        self.retag(mode)?;
        if resets_alpha {
            fill_opaque_padding(&mut self.buffer);
        }
        Ok(())
    }

    /// Tag-only relabel, bytes untouched. Used on backend output whose
    /// bytes already carry the new mode.
    pub(crate) fn retag(&mut self, mode: ColorMode) -> Result<()> {
        if mode.pixel_format() != self.mode.pixel_format() {
            return Err(ResizerError::unsupported_mode_pair(self.mode, mode));
        }
        self.mode = mode;
        Ok(())
    }

    /// Generic colorspace conversion through the standard converter.
    pub fn convert_to(&self, mode: ColorMode) -> Result<Image> {
        StandardConverter.convert(self, mode)
    }

    pub fn view(&self) -> ImageView<'_> {
        ImageView {
            image: self,
            crop_box: None,
        }
    }

    /// Rectangular window into this image. Fails when the box leaves the image.
    pub fn cropped_view(&self, crop_box: CropBox) -> Result<ImageView<'_>> {
        crop_box.check_within(self.width, self.height)?;
        Ok(ImageView {
            image: self,
            crop_box: Some(crop_box),
        })
    }

    pub fn from_dynamic_image(image: DynamicImage) -> Result<Self> {
        let (width, height) = (image.width(), image.height());
        match image {
            DynamicImage::ImageLuma8(gray) => {
                Self::from_vec(width, height, ColorMode::Grayscale, gray.into_raw())
            }
            DynamicImage::ImageRgb8(rgb) => {
                let buffer = rgb
                    .into_raw()
                    .chunks_exact(3)
                    .flat_map(|px| [px[0], px[1], px[2], u8::MAX])
                    .collect();
                Self::from_vec(width, height, ColorMode::Rgb, buffer)
            }
            DynamicImage::ImageRgba8(rgba) => {
                Self::from_vec(width, height, ColorMode::Rgba, rgba.into_raw())
            }
            other => Self::from_vec(width, height, ColorMode::Rgba, other.to_rgba8().into_raw()),
        }
    }

    /// Export into an `image` crate buffer.
    ///
    /// CMYK, I and F go through RGB or L; RGBa is rejected because an
    /// un-premultiply needs the alpha codec.
    pub fn to_dynamic_image(&self) -> Result<DynamicImage> {
        let build_failed = || ResizerError::unsupported_mode_pair(self.mode, ColorMode::Rgba);
        match self.mode {
            ColorMode::Grayscale => GrayImage::from_raw(self.width, self.height, self.buffer.clone())
                .map(DynamicImage::ImageLuma8)
                .ok_or_else(build_failed),
            ColorMode::Rgb => {
                let packed = self
                    .buffer
                    .chunks_exact(4)
                    .flat_map(|px| [px[0], px[1], px[2]])
                    .collect();
                RgbImage::from_raw(self.width, self.height, packed)
                    .map(DynamicImage::ImageRgb8)
                    .ok_or_else(build_failed)
            }
            ColorMode::Rgba => RgbaImage::from_raw(self.width, self.height, self.buffer.clone())
                .map(DynamicImage::ImageRgba8)
                .ok_or_else(build_failed),
            ColorMode::RgbaPremultiplied => Err(build_failed()),
            ColorMode::Cmyk => self.convert_to(ColorMode::Rgb)?.to_dynamic_image(),
            ColorMode::Int32Gray | ColorMode::Float32Gray => {
                self.convert_to(ColorMode::Grayscale)?.to_dynamic_image()
            }
        }
    }
}

/// Set the fourth byte of every 4-byte pixel to 255.
fn fill_opaque_padding(buffer: &mut [u8]) {
    buffer.iter_mut().skip(3).step_by(4).for_each(|pad| *pad = u8::MAX);
}

/// Borrowed, optionally cropped window into an [`Image`].
#[derive(Clone, Copy, Debug)]
pub struct ImageView<'a> {
    image: &'a Image,
    crop_box: Option<CropBox>,
}

impl<'a> ImageView<'a> {
    pub fn image(&self) -> &'a Image {
        self.image
    }

    pub fn crop_box(&self) -> Option<CropBox> {
        self.crop_box
    }

    /// Size of the visible window, rounded to whole pixels.
    pub fn size(&self) -> (u32, u32) {
        match self.crop_box {
            Some(crop_box) => {
                let (_, _, width, height) = crop_box.to_pixel_rect();
                (width, height)
            }
            None => self.image.size(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rgb_is_opaque() {
        let img = Image::new(2, 2, ColorMode::Rgb).unwrap();
        assert_eq!(img.buffer(), &[0, 0, 0, 255, 0, 0, 0, 255, 0, 0, 0, 255, 0, 0, 0, 255]);
        let rgba = Image::new(1, 1, ColorMode::Rgba).unwrap();
        assert_eq!(rgba.buffer(), &[0, 0, 0, 0]);
    }

    #[test]
    fn test_from_vec_validates_shape() {
        assert!(matches!(
            Image::from_vec(0, 4, ColorMode::Rgba, vec![]),
            Err(ResizerError::InvalidDimensions { .. })
        ));
        assert!(matches!(
            Image::from_vec(2, 2, ColorMode::Rgba, vec![0; 15]),
            Err(ResizerError::BufferTooSmall {
                expected: 16,
                actual: 15
            })
        ));
        let img = Image::from_vec(2, 1, ColorMode::Grayscale, vec![1, 2, 3]).unwrap();
        assert_eq!(img.buffer(), &[1, 2]);
    }

    #[test]
    fn test_relabel_keeps_bytes() {
        let mut img = Image::from_vec(1, 1, ColorMode::Rgb, vec![10, 20, 30, 255]).unwrap();
        img.set_mode_tag(ColorMode::RgbaPremultiplied).unwrap();
        assert_eq!(img.mode(), ColorMode::RgbaPremultiplied);
        assert_eq!(img.buffer(), &[10, 20, 30, 255]);
        assert!(img.set_mode_tag(ColorMode::Grayscale).is_err());
    }

    #[test]
    fn test_rgb_padding_is_opaque() {
        let img = Image::from_vec(2, 1, ColorMode::Rgb, vec![1, 2, 3, 0, 4, 5, 6, 17]).unwrap();
        assert_eq!(img.buffer(), &[1, 2, 3, 255, 4, 5, 6, 255]);

        let mut img = Image::from_vec(1, 1, ColorMode::Rgba, vec![1, 2, 3, 40]).unwrap();
        img.set_mode_tag(ColorMode::Rgb).unwrap();
        assert_eq!(img.buffer(), &[1, 2, 3, 255]);

        img.buffer_mut()[3] = 0;
        img.set_mode_tag(ColorMode::Rgba).unwrap();
        assert_eq!(img.buffer(), &[1, 2, 3, 255]);
    }

    #[test]
    fn test_alpha_relabel_keeps_alpha() {
        let mut img = Image::from_vec(1, 1, ColorMode::Rgba, vec![10, 20, 30, 40]).unwrap();
        img.set_mode_tag(ColorMode::RgbaPremultiplied).unwrap();
        assert_eq!(img.buffer(), &[10, 20, 30, 40]);
    }

    #[test]
    fn test_cropped_view_borrows() {
        let img = Image::new(10, 8, ColorMode::Rgba).unwrap();
        let view = img.cropped_view(CropBox::new(2.0, 1.0, 5.0, 4.0).unwrap()).unwrap();
        assert!(std::ptr::eq(view.image(), &img));
        assert_eq!(view.size(), (5, 4));
        assert!(img.cropped_view(CropBox::new(6.0, 0.0, 5.0, 4.0).unwrap()).is_err());
        assert_eq!(img.view().size(), (10, 8));
    }

    #[test]
    fn test_dynamic_image_round_trip() {
        let rgb = RgbImage::from_fn(3, 2, |x, y| image::Rgb([x as u8, y as u8, 7]));
        let img = Image::from_dynamic_image(DynamicImage::ImageRgb8(rgb.clone())).unwrap();
        assert_eq!(img.mode(), ColorMode::Rgb);
        assert_eq!(&img.buffer()[..4], &[0, 0, 7, 255]);
        let back = img.to_dynamic_image().unwrap();
        assert_eq!(back.to_rgb8(), rgb);
    }

    #[test]
    fn test_premultiplied_export_rejected() {
        let img = Image::new(1, 1, ColorMode::RgbaPremultiplied).unwrap();
        assert!(img.to_dynamic_image().is_err());
    }
}
