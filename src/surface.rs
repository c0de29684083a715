//! In-memory raster drawing surface.
//!
//! A [`Surface`] plays the part of a canvas: the engine draws onto it, it can be
//! composited onto another surface, and it exports itself as encoded image
//! bytes or an embedded `data:` URI.

use std::io::Cursor;
use std::path::Path;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::codecs::webp::WebPEncoder;
use image::{imageops, DynamicImage, ImageBuffer, Rgba, RgbaImage};

use crate::error::Result;
use crate::style::Color;

pub const MIME_PNG: &str = "image/png";
pub const MIME_JPEG: &str = "image/jpeg";
pub const MIME_WEBP: &str = "image/webp";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Surface {
    pixels: RgbaImage,
}

impl Surface {
    /// An empty 0x0 surface, fully transparent once resized.
    pub fn new() -> Self {
        Self { pixels: ImageBuffer::new(0, 0) }
    }

    pub fn with_size(width: u32, height: u32) -> Self {
        Self { pixels: ImageBuffer::new(width, height) }
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }

    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    /// Resizes the surface, discarding its content.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.pixels = ImageBuffer::new(width, height);
    }

    /// Resets every pixel to transparent black.
    pub fn clear(&mut self) {
        for pixel in self.pixels.pixels_mut() {
            *pixel = Rgba([0, 0, 0, 0]);
        }
    }

    pub fn fill(&mut self, color: Color) {
        let rgba: Rgba<u8> = color.into();
        for pixel in self.pixels.pixels_mut() {
            *pixel = rgba;
        }
    }

    pub fn pixel(&self, x: u32, y: u32) -> Color {
        let Rgba([r, g, b, a]) = *self.pixels.get_pixel(x, y);
        Color::rgba(r, g, b, a)
    }

    pub fn put_pixel(&mut self, x: u32, y: u32, color: Color) {
        self.pixels.put_pixel(x, y, color.into());
    }

    /// Alpha-blends `other` onto this surface with its top-left corner at `(x, y)`.
    pub fn draw_surface(&mut self, other: &Surface, x: i64, y: i64) {
        imageops::overlay(&mut self.pixels, &other.pixels, x, y);
    }

    pub fn as_image(&self) -> &RgbaImage {
        &self.pixels
    }

    /// Encodes the surface for `mime`, falling back to PNG for anything
    /// unrecognised.
    ///
    /// `quality` (0.0..=1.0) only affects JPEG. JPEG has no alpha channel, so
    /// the surface is flattened onto opaque black first.
    pub fn encode(&self, mime: &str, quality: f32) -> Result<Vec<u8>> {
        let mut bytes = Vec::new();

        match mime {
            MIME_JPEG => {
                let mut flattened = Surface::with_size(self.width(), self.height());
                flattened.fill(Color::BLACK);
                flattened.draw_surface(self, 0, 0);
                let rgb = DynamicImage::ImageRgba8(flattened.pixels).to_rgb8();
                let encoder = JpegEncoder::new_with_quality(&mut bytes, jpeg_quality(quality));
                DynamicImage::ImageRgb8(rgb).write_with_encoder(encoder)?;
            }
            MIME_WEBP => {
                DynamicImage::ImageRgba8(self.pixels.clone())
                    .write_with_encoder(WebPEncoder::new_lossless(&mut bytes))?;
            }
            _ => {
                DynamicImage::ImageRgba8(self.pixels.clone())
                    .write_with_encoder(PngEncoder::new(Cursor::new(&mut bytes)))?;
            }
        }

        Ok(bytes)
    }

    /// Exports the surface as a `data:<mime>;base64,...` URI.
    pub fn to_data_uri(&self, mime: &str, quality: f32) -> Result<String> {
        let mime = match mime {
            MIME_JPEG | MIME_WEBP => mime,
            _ => MIME_PNG,
        };
        let bytes = self.encode(mime, quality)?;
        Ok(format!("data:{};base64,{}", mime, STANDARD.encode(bytes)))
    }

    /// Saves the surface as a PNG file, creating parent directories as needed.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, self.encode(MIME_PNG, 1.0)?)?;
        Ok(())
    }
}

impl Default for Surface {
    fn default() -> Self {
        Self::new()
    }
}

fn jpeg_quality(quality: f32) -> u8 {
    (quality.clamp(0.0, 1.0) * 100.0).round().max(1.0) as u8
}
