//! Asset sources
//!
//! Where encoded sound files come from: a directory on disk, an HTTP base
//! URL, or an in-memory table.
use std::collections::HashMap;
use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;

use crate::error::SoundError;

/// Byte-fetchable asset storage keyed by locator (e.g. `sounds/cursed.mp3`)
pub trait AssetSource: Send + Sync {
    fn fetch(&self, locator: &str) -> Result<Vec<u8>, SoundError>;
}

/// Reads assets relative to a root directory
#[derive(Debug, Clone)]
pub struct FileAssetSource {
    root: PathBuf,
}

impl FileAssetSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl AssetSource for FileAssetSource {
    fn fetch(&self, locator: &str) -> Result<Vec<u8>, SoundError> {
        let path = self.root.join(locator);
        if !path.exists() {
            return Err(SoundError::fetch(
                locator,
                format!("Audio file not found: {}", path.display()),
            ));
        }

        let bytes = std::fs::read(&path).map_err(|e| SoundError::fetch(locator, e))?;
        tracing::debug!("Read {} ({} bytes)", path.display(), bytes.len());
        Ok(bytes)
    }
}

/// Fetches assets from `<base_url>/<locator>`
#[derive(Debug, Clone)]
pub struct HttpAssetSource {
    base_url: String,
    agent: ureq::Agent,
}

impl HttpAssetSource {
    pub fn new(base_url: impl Into<String>) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(10))
            .user_agent(&format!("couch-guardian-sfx/{}", env!("CARGO_PKG_VERSION")))
            .build();

        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            agent,
        }
    }

    fn url_for(&self, locator: &str) -> String {
        format!("{}/{}", self.base_url, locator.trim_start_matches('/'))
    }
}

impl AssetSource for HttpAssetSource {
    fn fetch(&self, locator: &str) -> Result<Vec<u8>, SoundError> {
        let url = self.url_for(locator);
        let response = self
            .agent
            .get(&url)
            .call()
            .map_err(|e| SoundError::fetch(locator, e))?;

        let mut bytes = Vec::new();
        response
            .into_reader()
            .read_to_end(&mut bytes)
            .map_err(|e| SoundError::fetch(locator, e))?;

        tracing::debug!("Downloaded {} ({} bytes)", url, bytes.len());
        Ok(bytes)
    }
}

/// Assets held in memory, e.g. embedded with `include_bytes!`
#[derive(Debug, Default)]
pub struct MemoryAssetSource {
    assets: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryAssetSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_asset(self, locator: impl Into<String>, bytes: Vec<u8>) -> Self {
        self.insert(locator, bytes);
        self
    }

    pub fn insert(&self, locator: impl Into<String>, bytes: Vec<u8>) {
        self.assets.write().insert(locator.into(), bytes);
    }
}

impl AssetSource for MemoryAssetSource {
    fn fetch(&self, locator: &str) -> Result<Vec<u8>, SoundError> {
        self.assets
            .read()
            .get(locator)
            .cloned()
            .ok_or_else(|| SoundError::fetch(locator, "asset not found"))
    }
}

/// Build the source matching a configured base: `http(s)://` URLs use HTTP,
/// anything else is a directory
pub fn from_base(base: &str) -> Arc<dyn AssetSource> {
    if base.starts_with("http://") || base.starts_with("https://") {
        Arc::new(HttpAssetSource::new(base))
    } else {
        Arc::new(FileAssetSource::new(base))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_source_reads_relative_to_root() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("sounds")).unwrap();
        std::fs::write(dir.path().join("sounds/cursed.mp3"), b"abc").unwrap();

        let source = FileAssetSource::new(dir.path());
        assert_eq!(source.fetch("sounds/cursed.mp3").unwrap(), b"abc");
        assert!(matches!(
            source.fetch("sounds/missing.mp3"),
            Err(SoundError::AssetFetchFailed { .. })
        ));
    }

    #[test]
    fn test_memory_source() {
        let source = MemoryAssetSource::new().with_asset("a.wav", vec![1, 2, 3]);
        assert_eq!(source.fetch("a.wav").unwrap(), vec![1, 2, 3]);
        assert!(source.fetch("b.wav").is_err());
    }

    #[test]
    fn test_http_url_joining() {
        let source = HttpAssetSource::new("https://example.com/game/");
        assert_eq!(
            source.url_for("sounds/level-up.mp3"),
            "https://example.com/game/sounds/level-up.mp3"
        );
    }
}
