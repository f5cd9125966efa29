use std::path::Path;
use std::sync::Arc;

use ar_reshaper::{ArabicReshaper, ReshaperConfig};
use image::{Rgba, RgbaImage};
use rusttype::{point, Font, Scale};
use unicode_bidi::BidiInfo;
use usvg::fontdb;

use crate::error::{Error, Result};

/// Horizontal anchor, like a canvas `textAlign`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Align {
    #[default]
    Left,
    Center,
    Right,
}

/// Left edge of a run of `width` anchored at `anchor_x`.
pub fn aligned_x(anchor_x: f32, width: f32, align: Align) -> f32 {
    match align {
        Align::Left => anchor_x,
        Align::Center => anchor_x - width / 2.0,
        Align::Right => anchor_x - width,
    }
}

/// DejaVu Sans, shipped with the crate (license in `assets/fonts`).
pub const DEFAULT_FONT: &[u8] = include_bytes!("../assets/fonts/DejaVuSans.ttf");

/// Loaded label font. The same face backs canvas text and the
/// `sans-serif` family of decoded SVG graphics.
pub struct LabelFont {
    font: Font<'static>,
    db: Arc<fontdb::Database>,
}

impl std::fmt::Debug for LabelFont {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LabelFont")
            .field("glyphs", &self.font.glyph_count())
            .field("faces", &self.db.len())
            .finish()
    }
}

impl LabelFont {
    /// The bundled default font.
    pub fn embedded() -> Result<Self> {
        let font = Font::try_from_bytes(DEFAULT_FONT)
            .ok_or_else(|| Error::Font("bundled font is not a TrueType font".into()))?;
        Ok(Self { font, db: Arc::new(font_db(DEFAULT_FONT.to_vec())?) })
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        let db = font_db(bytes.clone())?;
        let font = Font::try_from_vec(bytes).ok_or_else(|| Error::Font("not a TrueType/OpenType font".into()))?;
        Ok(Self { font, db: Arc::new(db) })
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        Self::from_bytes(bytes).map_err(|e| Error::Font(format!("{}: {e}", path.display())))
    }

    /// Font database for SVG text, with this face as `sans-serif`.
    pub fn font_db(&self) -> Arc<fontdb::Database> {
        self.db.clone()
    }

    fn visual_width(&self, visual: &str, scale: Scale) -> f32 {
        self.font
            .layout(visual, scale, point(0.0, 0.0))
            .last()
            .map(|g| g.position().x + g.unpositioned().h_metrics().advance_width)
            .unwrap_or(0.0)
    }

    /// Draw `text` anchored at (`x`, `y`) with a middle baseline, alpha-blended.
    pub fn draw(&self, img: &mut RgbaImage, text: &str, px: f32, x: f32, y: f32, align: Align, color: Rgba<u8>) {
        if text.is_empty() || px <= 0.0 {
            return;
        }
        let visual = bidi_then_shape(text, &shaper());
        let scale = Scale::uniform(px);
        let vm = self.font.v_metrics(scale);
        let left = aligned_x(x, self.visual_width(&visual, scale), align);
        let baseline = y + (vm.ascent + vm.descent) / 2.0;

        let (w, h) = (img.width() as i32, img.height() as i32);
        for g in self.font.layout(&visual, scale, point(left, baseline)) {
            if let Some(bb) = g.pixel_bounding_box() {
                g.draw(|gx, gy, v| {
                    let px = gx as i32 + bb.min.x;
                    let py = gy as i32 + bb.min.y;
                    if px < 0 || py < 0 || px >= w || py >= h || v <= 0.0 {
                        return;
                    }
                    blend(img.get_pixel_mut(px as u32, py as u32), color, v.min(1.0));
                });
            }
        }
    }
}

fn font_db(bytes: Vec<u8>) -> Result<fontdb::Database> {
    let mut db = fontdb::Database::new();
    db.load_font_data(bytes);
    let family = db
        .faces()
        .next()
        .and_then(|face| face.families.first().map(|(name, _)| name.clone()))
        .ok_or_else(|| Error::Font("no font face found".into()))?;
    db.set_sans_serif_family(family);
    Ok(db)
}

fn blend(dst: &mut Rgba<u8>, src: Rgba<u8>, coverage: f32) {
    let a = coverage * src.0[3] as f32 / 255.0;
    let inv = 1.0 - a;
    for c in 0..3 {
        dst.0[c] = (src.0[c] as f32 * a + dst.0[c] as f32 * inv).round() as u8;
    }
    dst.0[3] = ((a + dst.0[3] as f32 / 255.0 * inv) * 255.0).round() as u8;
}

fn shaper() -> ArabicReshaper {
    ArabicReshaper::new(ReshaperConfig::default())
}

/// Visual-order string: BiDi runs; reshape only RTL runs.
fn bidi_then_shape(text: &str, reshaper: &ArabicReshaper) -> String {
    let info = BidiInfo::new(text, None);
    let Some(para) = info.paragraphs.first() else {
        return String::new();
    };
    let (levels, ranges) = info.visual_runs(para, para.range.clone());

    let mut out = String::new();
    for (level, range) in levels.into_iter().zip(ranges) {
        let slice = &text[range];
        if level.is_rtl() && slice.chars().any(|c| ('\u{0600}'..='\u{06FF}').contains(&c)) {
            // shaped glyphs are laid out left to right
            out.extend(reshaper.reshape(slice).chars().rev());
        } else {
            out.push_str(slice);
        }
    }
    out
}
