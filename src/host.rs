//! Host-side temporary resources used while composing a label: hidden
//! containers that hold an off-screen barcode graphic, and object URLs that
//! address serialized blobs. Both are released when their guard drops.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};

use crate::barcode::BarcodeGraphic;

#[derive(Debug, Default)]
struct HostState {
    next_id: u64,
    containers: HashSet<u64>,
    blobs: HashMap<String, Blob>,
}

/// A blob addressable by URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    pub mime: String,
    pub bytes: Vec<u8>,
}

/// The document that off-screen containers attach to. Cheap to clone.
#[derive(Debug, Clone, Default)]
pub struct RenderHost {
    state: Arc<Mutex<HostState>>,
}

impl RenderHost {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HostState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn attach_hidden_container(&self) -> HiddenContainer {
        let mut st = self.lock();
        st.next_id += 1;
        let id = st.next_id;
        st.containers.insert(id);
        tracing::debug!("Attached hidden container #{}", id);
        HiddenContainer { host: self.clone(), id, content: None }
    }

    pub fn create_object_url(&self, bytes: Vec<u8>, mime: &str) -> ObjectUrl {
        let mut st = self.lock();
        st.next_id += 1;
        let url = format!("blob:weighlabel/{}", st.next_id);
        st.blobs.insert(url.clone(), Blob { mime: mime.to_string(), bytes });
        ObjectUrl { host: self.clone(), url }
    }

    /// Fetch the blob behind a live `blob:` URL, or decode a base64 `data:` URL.
    pub fn resolve(&self, url: &str) -> Option<Blob> {
        if let Some(rest) = url.strip_prefix("data:") {
            let (mime, payload) = rest.split_once(";base64,")?;
            let bytes = BASE64.decode(payload).ok()?;
            return Some(Blob { mime: mime.to_string(), bytes });
        }
        self.lock().blobs.get(url).cloned()
    }

    pub fn attached_containers(&self) -> usize {
        self.lock().containers.len()
    }

    pub fn live_object_urls(&self) -> usize {
        self.lock().blobs.len()
    }
}

/// `data:` URL embedding `bytes` as base64.
pub fn data_url(mime: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime, BASE64.encode(bytes))
}

/// Invisible element holding a rendered graphic; detached on drop.
#[derive(Debug)]
pub struct HiddenContainer {
    host: RenderHost,
    id: u64,
    content: Option<BarcodeGraphic>,
}

impl HiddenContainer {
    pub fn mount(&mut self, graphic: BarcodeGraphic) {
        self.content = Some(graphic);
    }

    /// The mounted graphic, if rendering produced one.
    pub fn graphic(&self) -> Option<&BarcodeGraphic> {
        self.content.as_ref()
    }
}

impl Drop for HiddenContainer {
    fn drop(&mut self) {
        self.host.lock().containers.remove(&self.id);
        tracing::debug!("Detached hidden container #{}", self.id);
    }
}

/// Live object URL; revoked on drop.
#[derive(Debug)]
pub struct ObjectUrl {
    host: RenderHost,
    url: String,
}

impl ObjectUrl {
    pub fn as_str(&self) -> &str {
        &self.url
    }
}

impl Drop for ObjectUrl {
    fn drop(&mut self) {
        self.host.lock().blobs.remove(&self.url);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guards_release_on_drop() {
        let host = RenderHost::new();
        {
            let _c = host.attach_hidden_container();
            let url = host.create_object_url(b"<svg/>".to_vec(), "image/svg+xml");
            assert_eq!(host.attached_containers(), 1);
            assert_eq!(host.resolve(url.as_str()).map(|b| b.bytes), Some(b"<svg/>".to_vec()));
        }
        assert_eq!(host.attached_containers(), 0);
        assert_eq!(host.live_object_urls(), 0);
    }

    #[test]
    fn revoked_url_no_longer_resolves() {
        let host = RenderHost::new();
        let url = host.create_object_url(vec![1, 2, 3], "application/octet-stream");
        let addr = url.as_str().to_string();
        drop(url);
        assert_eq!(host.resolve(&addr), None);
    }

    #[test]
    fn data_urls_resolve_without_registration() {
        let host = RenderHost::new();
        let url = data_url("image/svg+xml", b"<svg></svg>");
        assert!(url.starts_with("data:image/svg+xml;base64,"));
        let blob = host.resolve(&url).unwrap();
        assert_eq!(blob.mime, "image/svg+xml");
        assert_eq!(blob.bytes, b"<svg></svg>");
        assert_eq!(host.resolve("data:text/plain,hello"), None);
    }
}
