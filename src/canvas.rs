//! Off-screen raster surface addressed in logical units.
//! The bitmap is `scale` times the logical size; every call multiplies by
//! `scale`, so layout code is written once at 1×.

use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::imageops::{self, FilterType as ResizeFilter};
use image::{ExtendedColorType, ImageEncoder, Rgba, RgbaImage};

use crate::consts::MAX_SCALE;
use crate::error::Result;
use crate::text::{Align, LabelFont};

pub const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);
pub const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);

pub struct Canvas {
    img: RgbaImage,
    scale: u32,
}

impl Canvas {
    /// Transparent surface of `w × h` logical units. `scale` is clamped to
    /// `1..=MAX_SCALE`.
    pub fn new(w: u32, h: u32, scale: u32) -> Self {
        let scale = scale.clamp(1, MAX_SCALE);
        Self { img: RgbaImage::new(w * scale, h * scale), scale }
    }

    pub fn scale(&self) -> u32 {
        self.scale
    }

    pub fn image(&self) -> &RgbaImage {
        &self.img
    }

    fn px(&self, v: f32) -> f32 {
        v * self.scale as f32
    }

    // logical span -> clamped physical pixel range
    fn span(&self, from: f32, to: f32, limit: u32) -> std::ops::Range<u32> {
        let a = self.px(from).round().clamp(0.0, limit as f32) as u32;
        let b = self.px(to).round().clamp(0.0, limit as f32) as u32;
        a.min(b)..a.max(b)
    }

    pub fn fill_rect(&mut self, x: f32, y: f32, w: f32, h: f32, color: Rgba<u8>) {
        let xs = self.span(x, x + w, self.img.width());
        let ys = self.span(y, y + h, self.img.height());
        for py in ys {
            for px in xs.clone() {
                self.img.put_pixel(px, py, color);
            }
        }
    }

    /// Text anchored at (`x`, `y`) with a middle baseline. No-op without a font.
    pub fn fill_text(
        &mut self,
        font: Option<&LabelFont>,
        text: &str,
        font_px: f32,
        x: f32,
        y: f32,
        align: Align,
        color: Rgba<u8>,
    ) {
        if let Some(font) = font {
            let (px_size, px_x, px_y) = (self.px(font_px), self.px(x), self.px(y));
            font.draw(&mut self.img, text, px_size, px_x, px_y, align, color);
        }
    }

    /// Axis-aligned line, 1 logical unit wide, centered on the path.
    pub fn stroke_line(&mut self, x0: f32, y0: f32, x1: f32, y1: f32, color: Rgba<u8>) {
        if y0 == y1 {
            self.fill_rect(x0.min(x1), y0 - 0.5, (x1 - x0).abs(), 1.0, color);
        } else if x0 == x1 {
            self.fill_rect(x0 - 0.5, y0.min(y1), 1.0, (y1 - y0).abs(), color);
        } else {
            // diagonal: step along the longer axis in physical pixels
            let (dx, dy) = (self.px(x1 - x0), self.px(y1 - y0));
            let steps = dx.abs().max(dy.abs()).ceil() as u32;
            for i in 0..=steps {
                let t = i as f32 / steps as f32;
                let (x, y) = (x0 + (x1 - x0) * t, y0 + (y1 - y0) * t);
                self.fill_rect(x - 0.5, y - 0.5, 1.0, 1.0, color);
            }
        }
    }

    /// Stretch `src` into the logical rect, alpha-blended over what is there.
    pub fn draw_image(&mut self, src: &RgbaImage, x: f32, y: f32, w: f32, h: f32) {
        let xs = self.span(x, x + w, self.img.width());
        let ys = self.span(y, y + h, self.img.height());
        if xs.is_empty() || ys.is_empty() {
            return;
        }
        let (tw, th) = (xs.end - xs.start, ys.end - ys.start);
        if src.dimensions() == (tw, th) {
            imageops::overlay(&mut self.img, src, xs.start as i64, ys.start as i64);
        } else {
            let resized = imageops::resize(src, tw, th, ResizeFilter::Triangle);
            imageops::overlay(&mut self.img, &resized, xs.start as i64, ys.start as i64);
        }
    }

    /// Physical size of a logical rect, as `draw_image` will place it.
    pub fn physical_size(&self, x: f32, y: f32, w: f32, h: f32) -> (u32, u32) {
        let xs = self.span(x, x + w, self.img.width());
        let ys = self.span(y, y + h, self.img.height());
        (xs.end - xs.start, ys.end - ys.start)
    }

    /// Lossless PNG at maximum compression effort.
    pub fn to_png(&self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        let enc = PngEncoder::new_with_quality(&mut out, CompressionType::Best, FilterType::Adaptive);
        enc.write_image(self.img.as_raw(), self.img.width(), self.img.height(), ExtendedColorType::Rgba8)?;
        Ok(out)
    }
}
