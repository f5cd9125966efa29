//! Barcode rendering capability: value + options -> vector graphic.
//! Code 128 (default) and EAN-13 are encoded here; the graphic is a
//! module pattern that serializes to a self-contained SVG document.

use std::future::Future;

use image::Rgba;

use crate::consts::{BARCODE_FONT_PX, BARCODE_MARGIN, BARCODE_TEXT_MARGIN, BAR_HEIGHT, MODULE_WIDTH};
use crate::svg::{Shape, SvgDocument};
use crate::text::Align;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Symbology {
    #[default]
    Code128,
    Ean13,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextPosition {
    Top,
    #[default]
    Bottom,
}

/// Rendering options, in graphic units (1 unit = 1 px at 1×).
#[derive(Debug, Clone, PartialEq)]
pub struct BarcodeOptions {
    pub symbology: Symbology,
    pub module_width: u32,
    pub height: u32,
    pub font_size: u32,
    pub margin: u32,
    pub text_margin: u32,
    pub display_value: bool,
    pub text_align: Align,
    pub text_position: TextPosition,
    pub background: Rgba<u8>,
    pub line_color: Rgba<u8>,
}

impl Default for BarcodeOptions {
    fn default() -> Self {
        Self {
            symbology: Symbology::Code128,
            module_width: MODULE_WIDTH,
            height: BAR_HEIGHT,
            font_size: BARCODE_FONT_PX,
            margin: BARCODE_MARGIN,
            text_margin: BARCODE_TEXT_MARGIN,
            display_value: true,
            text_align: Align::Center,
            text_position: TextPosition::Bottom,
            background: Rgba([255, 255, 255, 255]),
            line_color: Rgba([0, 0, 0, 255]),
        }
    }
}

/// Encoded barcode: module pattern plus the human-readable caption.
#[derive(Debug, Clone, PartialEq)]
pub struct BarcodeGraphic {
    modules: Vec<bool>,
    caption: String,
    opts: BarcodeOptions,
}

impl BarcodeGraphic {
    /// Encode `value`; `None` when the symbology cannot represent it.
    pub fn encode(value: &str, opts: &BarcodeOptions) -> Option<Self> {
        let (modules, caption) = match opts.symbology {
            Symbology::Code128 => (encode_code128(value)?, value.to_string()),
            Symbology::Ean13 => {
                let full = normalize_ean13(value)?;
                (encode_ean13(&full)?, full)
            }
        };
        Some(Self { modules, caption, opts: opts.clone() })
    }

    pub fn modules(&self) -> &[bool] {
        &self.modules
    }

    pub fn caption(&self) -> &str {
        &self.caption
    }

    pub fn width(&self) -> u32 {
        self.modules.len() as u32 * self.opts.module_width + 2 * self.opts.margin
    }

    pub fn height(&self) -> u32 {
        self.opts.height + self.text_band() + 2 * self.opts.margin
    }

    fn text_band(&self) -> u32 {
        if self.opts.display_value { self.opts.font_size + self.opts.text_margin } else { 0 }
    }

    /// Bars as (start module, run length).
    pub fn bars(&self) -> Vec<(u32, u32)> {
        let mut out = Vec::new();
        let mut i = 0;
        while i < self.modules.len() {
            if self.modules[i] {
                let start = i;
                while i < self.modules.len() && self.modules[i] { i += 1; }
                out.push((start as u32, (i - start) as u32));
            } else {
                i += 1;
            }
        }
        out
    }

    /// Vector document in graphic units.
    pub fn to_document(&self) -> SvgDocument {
        let o = &self.opts;
        let (w, h) = (self.width() as f32, self.height() as f32);
        let m = o.margin as f32;
        let bars_top = match o.text_position {
            TextPosition::Top => m + self.text_band() as f32,
            TextPosition::Bottom => m,
        };

        let mut shapes = vec![Shape::Rect { x: 0.0, y: 0.0, w, h, fill: o.background }];
        for (start, len) in self.bars() {
            shapes.push(Shape::Rect {
                x: m + (start * o.module_width) as f32,
                y: bars_top,
                w: (len * o.module_width) as f32,
                h: o.height as f32,
                fill: o.line_color,
            });
        }

        if o.display_value {
            let x = match o.text_align {
                Align::Left => m,
                Align::Center => w / 2.0,
                Align::Right => w - m,
            };
            // text sits in the band between margin and bars, middle baseline
            let y = match o.text_position {
                TextPosition::Top => m + o.font_size as f32 / 2.0,
                TextPosition::Bottom => {
                    bars_top + o.height as f32 + o.text_margin as f32 + o.font_size as f32 / 2.0
                }
            };
            shapes.push(Shape::Text {
                x,
                y,
                size: o.font_size as f32,
                anchor: o.text_align,
                fill: o.line_color,
                content: self.caption.clone(),
            });
        }

        SvgDocument { width: w, height: h, shapes }
    }

    pub fn to_svg(&self) -> String {
        self.to_document().to_svg()
    }
}

/// A barcode-rendering capability. The returned future resolving is the
/// completion signal: the graphic is ready to sample, or `None` when the
/// value produced nothing.
pub trait BarcodeRenderer {
    fn render(
        &self,
        value: &str,
        opts: &BarcodeOptions,
    ) -> impl Future<Output = Option<BarcodeGraphic>> + Send;
}

/// Built-in renderer for Code 128 / EAN-13.
#[derive(Debug, Clone, Copy, Default)]
pub struct VectorBarcodeRenderer;

impl BarcodeRenderer for VectorBarcodeRenderer {
    fn render(
        &self,
        value: &str,
        opts: &BarcodeOptions,
    ) -> impl Future<Output = Option<BarcodeGraphic>> + Send {
        let graphic = BarcodeGraphic::encode(value, opts);
        async move {
            // layout completes on the next scheduler tick
            tokio::task::yield_now().await;
            graphic
        }
    }
}

// ======== Code 128 ========

// Bar/space widths for symbol values 0..=105; stop is separate
const CODE128_PATTERNS: [&str; 106] = [
    "212222", "222122", "222221", "121223", "121322", "131222", "122213", "122312", "132212", "221213",
    "221312", "231212", "112232", "122132", "122231", "113222", "123122", "123221", "223211", "221132",
    "221231", "213212", "223112", "312131", "311222", "321122", "321221", "312212", "322112", "322211",
    "212123", "212321", "232121", "111323", "131123", "131321", "112313", "132113", "132311", "211313",
    "231113", "231311", "112133", "112331", "132131", "113123", "113321", "133121", "313121", "211331",
    "231131", "213113", "213311", "213131", "311123", "311321", "331121", "312113", "312311", "332111",
    "314111", "221411", "431111", "111224", "111422", "121124", "121421", "141122", "141221", "112214",
    "112412", "122114", "122411", "142112", "142211", "241211", "221114", "413111", "241112", "134111",
    "111242", "121142", "121241", "114212", "124112", "124211", "411212", "421112", "421211", "212141",
    "214121", "412121", "111143", "111341", "131141", "114113", "114311", "411113", "411311", "113141",
    "114131", "311141", "411131", "211412", "211214", "211232",
];
const CODE128_STOP: &str = "2331112";
const START_B: u32 = 104;
const START_C: u32 = 105;

/// Code set C for even-length all-digit values (≥ 4), else code set B.
pub fn encode_code128(value: &str) -> Option<Vec<bool>> {
    if value.is_empty() {
        return None;
    }
    let all_digits = value.bytes().all(|b| b.is_ascii_digit());
    let mut symbols: Vec<u32> = Vec::new();
    if all_digits && value.len() >= 4 && value.len() % 2 == 0 {
        symbols.push(START_C);
        for pair in value.as_bytes().chunks(2) {
            symbols.push(((pair[0] - b'0') * 10 + (pair[1] - b'0')) as u32);
        }
    } else {
        symbols.push(START_B);
        for b in value.bytes() {
            if !(32..=127).contains(&b) {
                return None;
            }
            symbols.push((b - 32) as u32);
        }
    }

    let check = symbols
        .iter()
        .enumerate()
        .map(|(i, &s)| if i == 0 { s } else { s * i as u32 })
        .sum::<u32>()
        % 103;
    symbols.push(check);

    let mut modules = Vec::new();
    for s in symbols {
        push_widths(&mut modules, CODE128_PATTERNS[s as usize]);
    }
    push_widths(&mut modules, CODE128_STOP);
    Some(modules)
}

// Widths alternate bar, space, bar, ...
fn push_widths(modules: &mut Vec<bool>, widths: &str) {
    for (i, w) in widths.bytes().enumerate() {
        let bar = i % 2 == 0;
        for _ in 0..(w - b'0') {
            modules.push(bar);
        }
    }
}

// ======== EAN-13 ========

const EAN_L: [&str; 10] = [
    "0001101", "0011001", "0010011", "0111101", "0100011",
    "0110001", "0101111", "0111011", "0110111", "0001011",
];
const EAN_G: [&str; 10] = [
    "0100111", "0110011", "0011011", "0100001", "0011101",
    "0111001", "0000101", "0010001", "0001001", "0010111",
];
const EAN_R: [&str; 10] = [
    "1110010", "1100110", "1101100", "1000010", "1011100",
    "1001110", "1010000", "1000100", "1001000", "1110100",
];
// Parity of digits 2..7 by leading digit (L = false, G = true)
const EAN_PARITY: [&str; 10] = [
    "LLLLLL", "LLGLGG", "LLGGLG", "LLGGGL", "LGLLGG",
    "LGGLLG", "LGGGLL", "LGLGLG", "LGLGGL", "LGGLGL",
];

/// 12 digits -> append check digit; 13 digits -> validate check digit.
pub fn normalize_ean13(code: &str) -> Option<String> {
    if !code.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    match code.len() {
        12 => Some(format!("{}{}", code, ean13_checksum(code)?)),
        13 => (ean13_checksum(&code[..12])? == code.as_bytes()[12] - b'0').then(|| code.to_string()),
        _ => None,
    }
}

fn ean13_checksum(digits: &str) -> Option<u8> {
    if digits.len() != 12 {
        return None;
    }
    let mut sum = 0u32;
    for (i, ch) in digits.chars().enumerate() {
        let d = ch.to_digit(10)?;
        sum += if i % 2 == 0 { d } else { d * 3 };
    }
    Some(((10 - sum % 10) % 10) as u8)
}

fn encode_ean13(full: &str) -> Option<Vec<bool>> {
    let d: Vec<usize> = full.bytes().map(|b| (b - b'0') as usize).collect();
    if d.len() != 13 {
        return None;
    }
    let mut bits = String::from("101");
    for (i, parity) in EAN_PARITY[d[0]].chars().enumerate() {
        bits.push_str(if parity == 'G' { EAN_G[d[i + 1]] } else { EAN_L[d[i + 1]] });
    }
    bits.push_str("01010");
    for &digit in &d[7..13] {
        bits.push_str(EAN_R[digit]);
    }
    bits.push_str("101");
    Some(bits.chars().map(|c| c == '1').collect())
}
