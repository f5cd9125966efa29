// Label layout and barcode tuning constants (logical units unless noted)
pub const LABEL_W: u32 = 300;
pub const LABEL_H: u32 = 120;
pub const SCALE: u32 = 3;           // physical px per logical unit
pub const MAX_SCALE: u32 = 8;       // 2400x960 px

pub const FONT_PX: f32 = 12.0;

pub const HEADER_Y: f32 = 20.0;
pub const VALUE_Y: f32 = 35.0;
pub const SEPARATOR_Y: f32 = VALUE_Y + 7.0;

pub const COL_LEFT: f32 = 10.0;
pub const COL_CENTER: f32 = 150.0;
pub const COL_RIGHT: f32 = 290.0;

pub const HEADERS: [&str; 3] = ["Unit Price", "Weight", "Price"];

// Barcode placement on the label
pub const BARCODE_X: f32 = 10.0;
pub const BARCODE_Y: f32 = 45.0;
pub const BARCODE_W: f32 = 280.0;
pub const BARCODE_H: f32 = 60.0;

// Barcode rendering defaults
pub const MODULE_WIDTH: u32 = 2;
pub const BAR_HEIGHT: u32 = 50;
pub const BARCODE_FONT_PX: u32 = 14;
pub const BARCODE_MARGIN: u32 = 0;
pub const BARCODE_TEXT_MARGIN: u32 = 2;

pub const RENDER_TIMEOUT_MS: u64 = 2_000;
