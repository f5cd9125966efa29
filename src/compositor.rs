//! Label compositor: text rows, separator and barcode merged onto one
//! bitmap, then exported as `barcode-<value>.png`.
//!
//! Two awaited steps: the renderer's completion (bounded by the render
//! timeout) and the decode of the serialized graphic. The hidden container
//! and object URL are guards, so they are released on every exit path.
//! A barcode that fails to render or decode degrades the label to text only.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use image::RgbaImage;

use crate::barcode::{BarcodeOptions, BarcodeRenderer};
use crate::canvas::{Canvas, BLACK, WHITE};
use crate::consts::*;
use crate::download::Downloader;
use crate::error::{Error, Result};
use crate::fields::LabelFields;
use crate::host::RenderHost;
use crate::svg;
use crate::text::{Align, LabelFont};

const SVG_MIME: &str = "image/svg+xml;charset=utf-8";

const COLUMNS: [(f32, Align); 3] = [
    (COL_LEFT, Align::Left),
    (COL_CENTER, Align::Center),
    (COL_RIGHT, Align::Right),
];

/// Why a label was exported without its barcode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DegradeReason {
    /// The renderer produced no graphic for the value.
    NoGraphic,
    /// The renderer did not signal completion within the render timeout.
    RenderTimedOut,
    /// The serialized graphic could not be decoded to a bitmap.
    DecodeFailed(String),
}

impl std::fmt::Display for DegradeReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DegradeReason::NoGraphic => write!(f, "barcode renderer produced no graphic"),
            DegradeReason::RenderTimedOut => write!(f, "barcode renderer timed out"),
            DegradeReason::DecodeFailed(e) => write!(f, "barcode decode failed: {e}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Composition {
    Full,
    Degraded(DegradeReason),
}

impl Composition {
    pub fn is_degraded(&self) -> bool {
        matches!(self, Composition::Degraded(_))
    }
}

/// A composed label, ready to encode.
pub struct CompositeImage {
    canvas: Canvas,
    pub outcome: Composition,
}

impl CompositeImage {
    pub fn image(&self) -> &RgbaImage {
        self.canvas.image()
    }

    pub fn to_png(&self) -> Result<Vec<u8>> {
        self.canvas.to_png()
    }
}

#[derive(Debug, Clone)]
pub struct ExportReport {
    pub file_name: String,
    pub path: PathBuf,
    pub bytes: usize,
    pub outcome: Composition,
}

/// File name for a label's download.
pub fn download_name(barcode_value: &str) -> String {
    format!("barcode-{}.png", barcode_value)
}

pub struct LabelCompositor<R> {
    renderer: R,
    host: RenderHost,
    font: Option<Arc<LabelFont>>,
    barcode_opts: BarcodeOptions,
    scale: u32,
    render_timeout: Duration,
    composing: AtomicBool,
}

// Clears the composing flag on every exit path
struct ComposingGuard<'a>(&'a AtomicBool);

impl Drop for ComposingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl<R: BarcodeRenderer> LabelCompositor<R> {
    /// Compositor drawing text with the bundled font; see `with_font`.
    pub fn new(renderer: R, host: RenderHost) -> Self {
        let font = match LabelFont::embedded() {
            Ok(font) => Some(Arc::new(font)),
            Err(e) => {
                tracing::error!("Bundled label font unusable: {}", e);
                None
            }
        };
        Self {
            renderer,
            host,
            font,
            barcode_opts: BarcodeOptions::default(),
            scale: SCALE,
            render_timeout: Duration::from_millis(RENDER_TIMEOUT_MS),
            composing: AtomicBool::new(false),
        }
    }

    /// Replace the bundled font.
    pub fn with_font(mut self, font: Arc<LabelFont>) -> Self {
        self.font = Some(font);
        self
    }

    pub fn with_scale(mut self, scale: u32) -> Self {
        self.scale = scale.clamp(1, MAX_SCALE);
        self
    }

    pub fn with_render_timeout(mut self, timeout: Duration) -> Self {
        self.render_timeout = timeout;
        self
    }

    pub fn with_barcode_options(mut self, opts: BarcodeOptions) -> Self {
        self.barcode_opts = opts;
        self
    }

    pub fn host(&self) -> &RenderHost {
        &self.host
    }

    pub fn is_composing(&self) -> bool {
        self.composing.load(Ordering::Acquire)
    }

    fn begin(&self) -> Result<ComposingGuard<'_>> {
        if self.composing.swap(true, Ordering::AcqRel) {
            return Err(Error::Busy);
        }
        Ok(ComposingGuard(&self.composing))
    }

    /// Compose the label bitmap. Only `Error::Busy` is returned as an error;
    /// barcode failures come back as `Composition::Degraded`.
    pub async fn compose(&self, fields: &LabelFields) -> Result<CompositeImage> {
        let _busy = self.begin()?;

        let mut canvas = Canvas::new(LABEL_W, LABEL_H, self.scale);
        canvas.fill_rect(0.0, 0.0, LABEL_W as f32, LABEL_H as f32, WHITE);
        self.draw_text(&mut canvas, fields);

        let (w_px, h_px) = canvas.physical_size(BARCODE_X, BARCODE_Y, BARCODE_W, BARCODE_H);
        let outcome = match self.barcode_bitmap(&fields.barcode_value, w_px, h_px).await {
            Ok(bitmap) => {
                canvas.draw_image(&bitmap, BARCODE_X, BARCODE_Y, BARCODE_W, BARCODE_H);
                Composition::Full
            }
            Err(reason) => {
                tracing::warn!("Label {:?} exported without barcode: {}", fields.barcode_value, reason);
                Composition::Degraded(reason)
            }
        };
        Ok(CompositeImage { canvas, outcome })
    }

    /// Compose, encode as PNG and hand off to `downloader`.
    pub async fn export(&self, fields: &LabelFields, downloader: &dyn Downloader) -> Result<ExportReport> {
        let file_name = download_name(&fields.barcode_value);
        let composite = self.compose(fields).await?;
        let png = composite.to_png()?;
        let path = downloader.save(&file_name, &png)?;
        tracing::info!("Exported {} ({:?})", file_name, composite.outcome);
        Ok(ExportReport { file_name, path, bytes: png.len(), outcome: composite.outcome })
    }

    fn draw_text(&self, canvas: &mut Canvas, fields: &LabelFields) {
        let font = self.font.as_deref();
        if font.is_none() {
            tracing::debug!("No label font loaded; text rows left blank");
        }
        for ((header, value), (x, align)) in HEADERS.iter().zip(fields.value_row()).zip(COLUMNS) {
            canvas.fill_text(font, header, FONT_PX, x, HEADER_Y, align, BLACK);
            canvas.fill_text(font, &value, FONT_PX, x, VALUE_Y, align, BLACK);
        }
        canvas.stroke_line(COL_LEFT, SEPARATOR_Y, COL_RIGHT, SEPARATOR_Y, BLACK);
    }

    async fn barcode_bitmap(&self, value: &str, w_px: u32, h_px: u32) -> Result<RgbaImage, DegradeReason> {
        let mut container = self.host.attach_hidden_container();

        let rendered = tokio::time::timeout(self.render_timeout, self.renderer.render(value, &self.barcode_opts)).await;
        match rendered {
            Ok(Some(graphic)) => container.mount(graphic),
            Ok(None) => return Err(DegradeReason::NoGraphic),
            Err(_) => return Err(DegradeReason::RenderTimedOut),
        }
        let svg = container.graphic().ok_or(DegradeReason::NoGraphic)?.to_svg();
        tracing::debug!("Serialized barcode graphic ({} bytes)", svg.len());

        let url = self.host.create_object_url(svg.into_bytes(), SVG_MIME);
        let blob = self
            .host
            .resolve(url.as_str())
            .ok_or_else(|| DegradeReason::DecodeFailed(format!("{} did not resolve", url.as_str())))?;

        let fonts = self.font.as_ref().map(|f| f.font_db());
        let decoded = tokio::task::spawn_blocking(move || svg::decode(&blob.bytes, w_px, h_px, fonts))
            .await
            .map_err(|e| DegradeReason::DecodeFailed(e.to_string()))?;
        decoded.map_err(DegradeReason::DecodeFailed)
    }
}

#[cfg(test)]
mod tests {
    use std::future::Future;
    use std::sync::Mutex;

    use tokio::sync::Notify;

    use super::*;
    use crate::barcode::{BarcodeGraphic, Symbology, VectorBarcodeRenderer};

    #[derive(Default)]
    struct Recorder {
        saved: Mutex<Vec<(String, Vec<u8>)>>,
    }

    impl Downloader for Recorder {
        fn save(&self, file_name: &str, bytes: &[u8]) -> Result<PathBuf> {
            self.saved.lock().unwrap().push((file_name.to_string(), bytes.to_vec()));
            Ok(PathBuf::from(file_name))
        }
    }

    struct NeverRenders;

    impl BarcodeRenderer for NeverRenders {
        fn render(&self, _: &str, _: &BarcodeOptions) -> impl Future<Output = Option<BarcodeGraphic>> + Send {
            std::future::pending()
        }
    }

    struct Gated(Arc<Notify>);

    impl BarcodeRenderer for Gated {
        fn render(&self, value: &str, opts: &BarcodeOptions) -> impl Future<Output = Option<BarcodeGraphic>> + Send {
            let gate = self.0.clone();
            let graphic = BarcodeGraphic::encode(value, opts);
            async move {
                gate.notified().await;
                graphic
            }
        }
    }

    // Mounts a graphic whose serialized document has no area
    struct ZeroSized;

    impl BarcodeRenderer for ZeroSized {
        fn render(&self, value: &str, _: &BarcodeOptions) -> impl Future<Output = Option<BarcodeGraphic>> + Send {
            let flat = BarcodeOptions { module_width: 0, height: 0, margin: 0, display_value: false, ..Default::default() };
            std::future::ready(BarcodeGraphic::encode(value, &flat))
        }
    }

    fn fields() -> LabelFields {
        LabelFields::new("10.50", "2.00", "123456789012")
    }

    fn assert_released(host: &RenderHost) {
        assert_eq!(host.attached_containers(), 0);
        assert_eq!(host.live_object_urls(), 0);
    }

    #[tokio::test]
    async fn export_names_file_after_barcode() {
        let host = RenderHost::new();
        let comp = LabelCompositor::new(VectorBarcodeRenderer, host.clone());
        let dl = Recorder::default();

        let report = comp.export(&fields(), &dl).await.unwrap();
        assert_eq!(report.file_name, "barcode-123456789012.png");
        assert_eq!(report.outcome, Composition::Full);

        let saved = dl.saved.lock().unwrap();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].0, "barcode-123456789012.png");
        let png = image::load_from_memory(&saved[0].1).unwrap();
        assert_eq!((png.width(), png.height()), (900, 360));
        assert_released(&host);
    }

    #[tokio::test]
    async fn layout_has_background_separator_and_bars() {
        let comp = LabelCompositor::new(VectorBarcodeRenderer, RenderHost::new());
        let label = comp.compose(&fields()).await.unwrap();
        let img = label.image();

        assert_eq!(img.get_pixel(0, 0), &WHITE);
        assert_eq!(img.get_pixel(899, 359), &WHITE);
        // separator at y = 42 spans x 10..290
        assert_eq!(img.get_pixel(450, 126), &BLACK);
        assert_eq!(img.get_pixel(15, 126), &WHITE);
        assert_eq!(img.get_pixel(885, 126), &WHITE);
        // first bar of the code 128 start symbol at the barcode's left edge
        assert_eq!(img.get_pixel(31, 140), &BLACK);
        assert_eq!(img.get_pixel(25, 140), &WHITE);
    }

    #[tokio::test]
    async fn invalid_value_degrades_to_text_only() {
        let host = RenderHost::new();
        let ean = BarcodeOptions { symbology: Symbology::Ean13, ..Default::default() };
        let comp = LabelCompositor::new(VectorBarcodeRenderer, host.clone()).with_barcode_options(ean);
        let dl = Recorder::default();

        let bad = LabelFields::new("10.50", "2.00", "not-a-number");
        let report = comp.export(&bad, &dl).await.unwrap();
        assert_eq!(report.outcome, Composition::Degraded(DegradeReason::NoGraphic));
        assert_eq!(report.file_name, "barcode-not-a-number.png");

        let png = image::load_from_memory(&dl.saved.lock().unwrap()[0].1).unwrap().to_rgba8();
        assert_eq!(png.get_pixel(31, 140), &WHITE);
        assert_released(&host);
    }

    #[tokio::test]
    async fn empty_fields_do_not_crash() {
        let host = RenderHost::new();
        let comp = LabelCompositor::new(VectorBarcodeRenderer, host.clone());
        let label = comp.compose(&LabelFields::default()).await.unwrap();
        assert!(label.outcome.is_degraded());
        assert_released(&host);
    }

    #[tokio::test(start_paused = true)]
    async fn silent_renderer_times_out_and_releases() {
        let host = RenderHost::new();
        let comp = LabelCompositor::new(NeverRenders, host.clone())
            .with_render_timeout(Duration::from_millis(250));

        let label = comp.compose(&fields()).await.unwrap();
        assert_eq!(label.outcome, Composition::Degraded(DegradeReason::RenderTimedOut));
        assert!(!comp.is_composing());
        assert_released(&host);
    }

    #[tokio::test(start_paused = true)]
    async fn second_compose_while_busy_is_rejected() {
        let gate = Arc::new(Notify::new());
        let host = RenderHost::new();
        let comp = LabelCompositor::new(Gated(gate.clone()), host.clone())
            .with_render_timeout(Duration::from_secs(60));
        let f = fields();

        let first = comp.compose(&f);
        tokio::pin!(first);
        assert!(tokio::time::timeout(Duration::from_millis(10), &mut first).await.is_err());
        assert!(comp.is_composing());
        assert_eq!(host.attached_containers(), 1);

        assert!(matches!(comp.compose(&f).await, Err(Error::Busy)));

        gate.notify_one();
        let label = first.await.unwrap();
        assert_eq!(label.outcome, Composition::Full);
        assert!(!comp.is_composing());
        assert_released(&host);
    }

    fn dark_pixels(img: &RgbaImage, xs: std::ops::Range<u32>, ys: std::ops::Range<u32>) -> usize {
        ys.flat_map(|y| xs.clone().map(move |x| (x, y)))
            .filter(|&(x, y)| img.get_pixel(x, y).0[0] < 128)
            .count()
    }

    #[tokio::test]
    async fn default_font_fills_header_and_value_rows() {
        let comp = LabelCompositor::new(VectorBarcodeRenderer, RenderHost::new());
        let label = comp.compose(&fields()).await.unwrap();
        let img = label.image();

        // header middle at y = 20, values at y = 35 (physical 60 and 105)
        let header_rows = 45..80;
        let value_rows = 90..120;
        for (name, xs) in [("left", 30..150), ("center", 390..510), ("right", 750..870)] {
            assert!(dark_pixels(img, xs.clone(), header_rows.clone()) > 0, "{name} header is blank");
            assert!(dark_pixels(img, xs, value_rows.clone()) > 0, "{name} value is blank");
        }
        // nothing right of the right anchor or left of the left one
        assert_eq!(dark_pixels(img, 0..27, 45..120), 0);
        assert_eq!(dark_pixels(img, 873..900, 45..120), 0);
    }

    #[tokio::test]
    async fn undecodable_graphic_degrades_and_releases() {
        let host = RenderHost::new();
        let comp = LabelCompositor::new(ZeroSized, host.clone());
        let dl = Recorder::default();

        let report = comp.export(&fields(), &dl).await.unwrap();
        assert!(matches!(report.outcome, Composition::Degraded(DegradeReason::DecodeFailed(_))));
        assert!(!comp.is_composing());
        assert_released(&host);

        let saved = dl.saved.lock().unwrap();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].0, "barcode-123456789012.png");
        let png = image::load_from_memory(&saved[0].1).unwrap().to_rgba8();
        assert_eq!(png.dimensions(), (900, 360));
        assert_eq!(png.get_pixel(31, 140), &WHITE);
        assert_eq!(png.get_pixel(450, 126), &BLACK);
    }
}
