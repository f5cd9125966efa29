//! Weighed-goods label tool.
//! - Derives price = unit price × weight (2 decimals)
//! - Looks up candidate barcodes for a product code over HTTP
//! - Composes a 300×120 label (3× density) with text rows, separator and barcode
//! - Exports it as `barcode-<value>.png`, text-only when the barcode fails

pub mod barcode;
pub mod canvas;
pub mod compositor;
pub mod config;
pub mod consts;
pub mod download;
pub mod error;
pub mod fields;
pub mod host;
pub mod lookup;
pub mod svg;
pub mod text;

pub use barcode::{BarcodeGraphic, BarcodeOptions, BarcodeRenderer, Symbology, VectorBarcodeRenderer};
pub use compositor::{download_name, Composition, DegradeReason, ExportReport, LabelCompositor};
pub use config::AppConfig;
pub use download::{DirDownloader, Downloader};
pub use error::{Error, Result};
pub use fields::{compute_price, LabelFields, LabelForm};
pub use host::RenderHost;
pub use lookup::{BarcodeChoices, BarcodeOption, LookupClient, LookupError};
pub use text::LabelFont;
