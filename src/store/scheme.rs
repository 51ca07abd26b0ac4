//! Opening stores from URLs

use crate::config::StoreConfig;
use crate::store::{ContentStore, FileBackedStore};
use crate::{Error, Result};
use std::sync::Arc;
use url::Url;

/// A URL scheme that can open a store
pub trait StoreScheme {
    const SCHEME: &'static str;

    /// Check the URL components before opening
    fn is_valid(host: Option<&str>, port: Option<u16>, path: &str, query: Option<&str>) -> bool;

    fn open(url: &Url, config: &StoreConfig) -> Result<Arc<dyn ContentStore>>;

    fn accepts(url: &Url) -> bool {
        url.scheme() == Self::SCHEME
            && Self::is_valid(url.host_str(), url.port(), url.path(), url.query())
    }
}

/// `file:///absolute/path` opens a [`FileBackedStore`] rooted at the path
pub struct FileStoreScheme;

impl StoreScheme for FileStoreScheme {
    const SCHEME: &'static str = "file";

    fn is_valid(host: Option<&str>, port: Option<u16>, path: &str, query: Option<&str>) -> bool {
        host.is_none() && port.is_none() && !path.is_empty() && query.is_none()
    }

    fn open(url: &Url, config: &StoreConfig) -> Result<Arc<dyn ContentStore>> {
        if !Self::accepts(url) {
            return Err(Error::InvalidUrl(url.to_string()));
        }
        let root = url
            .to_file_path()
            .map_err(|_| Error::InvalidUrl(url.to_string()))?;
        Ok(Arc::new(FileBackedStore::open(root, config.worker_threads)?))
    }
}

/// Open the store a URL names
pub fn open_url(url: &str, config: &StoreConfig) -> Result<Arc<dyn ContentStore>> {
    let parsed = Url::parse(url).map_err(|e| Error::InvalidUrl(format!("{}: {}", url, e)))?;
    if parsed.scheme() == FileStoreScheme::SCHEME {
        FileStoreScheme::open(&parsed, config)
    } else {
        Err(Error::InvalidUrl(format!(
            "unsupported scheme '{}'",
            parsed.scheme()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use tempfile::tempdir;

    #[test]
    fn test_file_scheme_validation() {
        assert!(FileStoreScheme::is_valid(None, None, "/tmp/cas", None));
        assert!(!FileStoreScheme::is_valid(Some("host"), None, "/tmp/cas", None));
        assert!(!FileStoreScheme::is_valid(None, Some(80), "/tmp/cas", None));
        assert!(!FileStoreScheme::is_valid(None, None, "", None));
        assert!(!FileStoreScheme::is_valid(None, None, "/tmp/cas", Some("a=b")));
    }

    #[tokio::test]
    async fn test_open_file_url() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("cas");
        let url = Url::from_file_path(&root).unwrap();

        let store = open_url(url.as_str(), &StoreConfig::default()).unwrap();
        assert!(root.is_dir());

        let id = store.put(vec![], Bytes::from_static(b"via url")).await.unwrap();
        assert!(store.contains(&id).await.unwrap());
    }

    #[test]
    fn test_rejects_bad_urls() {
        let config = StoreConfig::default();
        assert!(matches!(
            open_url("http://example.com/cas", &config),
            Err(Error::InvalidUrl(_))
        ));
        assert!(matches!(
            open_url("file://remote-host/cas", &config),
            Err(Error::InvalidUrl(_))
        ));
        assert!(matches!(
            open_url("file:///tmp/cas?mode=ro", &config),
            Err(Error::InvalidUrl(_))
        ));
        assert!(matches!(open_url("not a url", &config), Err(Error::InvalidUrl(_))));
    }
}
