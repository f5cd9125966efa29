use std::path::{Path, PathBuf};

use crate::error::Result;

/// Destination for an exported file.
pub trait Downloader {
    /// Save `bytes` under `file_name`; returns where it landed.
    fn save(&self, file_name: &str, bytes: &[u8]) -> Result<PathBuf>;
}

/// Saves into a fixed directory, creating it when needed.
#[derive(Debug, Clone)]
pub struct DirDownloader {
    dir: PathBuf,
}

impl DirDownloader {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl Downloader for DirDownloader {
    fn save(&self, file_name: &str, bytes: &[u8]) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(flatten_name(file_name));
        std::fs::write(&path, bytes)?;
        tracing::info!("Saved {} ({} bytes)", path.display(), bytes.len());
        Ok(path)
    }
}

// Keep the file inside the target directory
fn flatten_name(name: &str) -> String {
    let flat: String = name
        .chars()
        .map(|c| if matches!(c, '/' | '\\' | '\0') { '_' } else { c })
        .collect();
    if flat == "." || flat == ".." { "_".to_string() } else { flat }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn saves_into_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let d = DirDownloader::new(tmp.path().join("out"));
        let path = d.save("barcode-123.png", b"png").unwrap();
        assert_eq!(path, tmp.path().join("out").join("barcode-123.png"));
        assert_eq!(std::fs::read(&path).unwrap(), b"png");
    }

    #[test]
    fn separators_cannot_escape() {
        assert_eq!(flatten_name("barcode-../../x.png"), "barcode-.._.._x.png");
        assert_eq!(flatten_name(".."), "_");
        assert_eq!(flatten_name("barcode-A1.png"), "barcode-A1.png");
    }
}
