//! Minimal SVG for barcode graphics: filled rects and text.
//! `to_svg` writes a standalone document; `decode` turns serialized SVG back
//! into a bitmap with usvg + resvg.

use std::sync::Arc;

use image::{Rgba, RgbaImage};
use usvg::fontdb;

use crate::text::Align;

#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    Rect { x: f32, y: f32, w: f32, h: f32, fill: Rgba<u8> },
    /// `y` is the middle of the text line.
    Text { x: f32, y: f32, size: f32, anchor: Align, fill: Rgba<u8>, content: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct SvgDocument {
    pub width: f32,
    pub height: f32,
    pub shapes: Vec<Shape>,
}

impl SvgDocument {
    pub fn to_svg(&self) -> String {
        let mut s = format!(
            "<svg xmlns=\"http://www.w3.org/2000/svg\" version=\"1.1\" width=\"{w}\" height=\"{h}\" viewBox=\"0 0 {w} {h}\" shape-rendering=\"crispEdges\">",
            w = self.width,
            h = self.height
        );
        for shape in &self.shapes {
            match shape {
                Shape::Rect { x, y, w, h, fill } => s.push_str(&format!(
                    "<rect x=\"{x}\" y=\"{y}\" width=\"{w}\" height=\"{h}\" fill=\"{}\"/>",
                    hex(*fill)
                )),
                Shape::Text { x, y, size, anchor, fill, content } => s.push_str(&format!(
                    "<text x=\"{x}\" y=\"{y}\" font-size=\"{size}\" font-family=\"sans-serif\" text-anchor=\"{}\" dominant-baseline=\"middle\" fill=\"{}\">{}</text>",
                    anchor_name(*anchor),
                    hex(*fill),
                    escape(content)
                )),
            }
        }
        s.push_str("</svg>\n");
        s
    }
}

/// Decode serialized SVG into a `w_px` × `h_px` bitmap, stretching the
/// document's viewport to fill it. Text resolves against `fonts`.
pub fn decode(bytes: &[u8], w_px: u32, h_px: u32, fonts: Option<Arc<fontdb::Database>>) -> Result<RgbaImage, String> {
    let mut opt = usvg::Options::default();
    if let Some(db) = fonts {
        opt.fontdb = db;
    }
    let tree = usvg::Tree::from_data(bytes, &opt).map_err(|e| format!("SVG parse error: {e}"))?;

    let mut pixmap = tiny_skia::Pixmap::new(w_px, h_px).ok_or_else(|| format!("cannot allocate {w_px}x{h_px} pixmap"))?;
    let size = tree.size();
    let fit = tiny_skia::Transform::from_scale(w_px as f32 / size.width(), h_px as f32 / size.height());
    resvg::render(&tree, fit, &mut pixmap.as_mut());

    // pixmap data is premultiplied
    let mut img = RgbaImage::new(w_px, h_px);
    for (dst, src) in img.pixels_mut().zip(pixmap.pixels()) {
        let c = src.demultiply();
        *dst = Rgba([c.red(), c.green(), c.blue(), c.alpha()]);
    }
    Ok(img)
}

fn hex(c: Rgba<u8>) -> String {
    format!("#{:02x}{:02x}{:02x}", c.0[0], c.0[1], c.0[2])
}

fn anchor_name(a: Align) -> &'static str {
    match a {
        Align::Left => "start",
        Align::Center => "middle",
        Align::Right => "end",
    }
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
