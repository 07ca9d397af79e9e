use crate::modules::protocol::{DirectoryPayload, MedicineName};
use log::{debug, warn};
use reqwest::StatusCode;
use std::future::Future;
use std::path::PathBuf;
use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("directory request failed: status={0}")]
    BadStatus(StatusCode),
    #[error("failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("directory payload parse failed: {0}")]
    Parse(String),
    #[error("invalid directory location {0:?}")]
    InvalidLocation(String),
}

/// Where the static list of medicine names lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectoryLocation {
    Http(Url),
    File(PathBuf),
}

impl DirectoryLocation {
    pub fn parse(raw: &str) -> Result<Self, DirectoryError> {
        let t = raw.trim();
        if t.is_empty() {
            return Err(DirectoryError::InvalidLocation(raw.to_string()));
        }
        let lower = t.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            let url = Url::parse(t).map_err(|_| DirectoryError::InvalidLocation(t.to_string()))?;
            return Ok(Self::Http(url));
        }
        Ok(Self::File(PathBuf::from(t)))
    }
}

pub trait DirectorySource {
    fn fetch(&self) -> impl Future<Output = Result<DirectoryPayload, DirectoryError>> + Send;
}

/// Fetches `{ "medicines": [...] }` over HTTP or from disk.
#[derive(Debug, Clone)]
pub struct ResourceDirectory {
    location: DirectoryLocation,
    http: reqwest::Client,
}

impl ResourceDirectory {
    pub fn new(location: DirectoryLocation, http: reqwest::Client) -> Self {
        Self { location, http }
    }
}

impl DirectorySource for ResourceDirectory {
    async fn fetch(&self) -> Result<DirectoryPayload, DirectoryError> {
        let body = match &self.location {
            DirectoryLocation::Http(url) => {
                let resp = self.http.get(url.clone()).send().await?;
                let status = resp.status();
                if !status.is_success() {
                    return Err(DirectoryError::BadStatus(status));
                }
                resp.text().await?
            }
            DirectoryLocation::File(path) => tokio::fs::read_to_string(path)
                .await
                .map_err(|source| DirectoryError::Io {
                    path: path.clone(),
                    source,
                })?,
        };
        serde_json::from_str(&body).map_err(|e| DirectoryError::Parse(e.to_string()))
    }
}

/// Outcome of a directory load. `Unavailable` renders like an empty directory but stays
/// distinguishable for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectoryLoad<'a> {
    Ready(&'a [MedicineName]),
    Unavailable,
}

impl<'a> DirectoryLoad<'a> {
    pub fn names(&self) -> &'a [MedicineName] {
        match self {
            DirectoryLoad::Ready(names) => names,
            DirectoryLoad::Unavailable => &[],
        }
    }

    pub fn available(&self) -> Option<&'a [MedicineName]> {
        match self {
            DirectoryLoad::Ready(names) => Some(names),
            DirectoryLoad::Unavailable => None,
        }
    }
}

/// Session-long store of known medicine names.
///
/// The first successful fetch is kept for good. A failed fetch leaves it empty so the next
/// caller fetches again; failures never reach the caller.
#[derive(Debug, Default)]
pub struct DirectoryCache {
    names: Option<Vec<MedicineName>>,
}

impl DirectoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_loaded(&self) -> bool {
        self.names.is_some()
    }

    pub fn current(&self) -> DirectoryLoad<'_> {
        match &self.names {
            Some(names) => DirectoryLoad::Ready(names),
            None => DirectoryLoad::Unavailable,
        }
    }

    /// Records a finished fetch. An error is logged and leaves the cache as it was.
    pub fn store(&mut self, fetched: Result<DirectoryPayload, DirectoryError>) -> DirectoryLoad<'_> {
        match fetched {
            Ok(payload) => {
                debug!("directory loaded: {} name(s)", payload.medicines.len());
                self.names = Some(payload.medicines);
            }
            Err(e) => warn!("medicine directory unavailable: {e}"),
        }
        self.current()
    }
}

/// Lazily loaded directory: a source plus its cache, fetched on first use.
pub struct MedicineDirectory<S> {
    source: S,
    cache: DirectoryCache,
}

impl<S: DirectorySource> MedicineDirectory<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            cache: DirectoryCache::new(),
        }
    }

    pub fn cached(&self) -> Option<&[MedicineName]> {
        self.cache.current().available()
    }

    pub async fn load(&mut self) -> DirectoryLoad<'_> {
        if !self.cache.is_loaded() {
            let fetched = self.source.fetch().await;
            return self.cache.store(fetched);
        }
        self.cache.current()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct ScriptedSource {
        calls: AtomicUsize,
        replies: Mutex<Vec<Result<DirectoryPayload, DirectoryError>>>,
    }

    impl ScriptedSource {
        fn new(mut replies: Vec<Result<DirectoryPayload, DirectoryError>>) -> Self {
            replies.reverse();
            Self {
                calls: AtomicUsize::new(0),
                replies: Mutex::new(replies),
            }
        }
    }

    impl DirectorySource for ScriptedSource {
        async fn fetch(&self) -> Result<DirectoryPayload, DirectoryError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let next = self.replies.lock().unwrap().pop();
            next.unwrap_or_else(|| Err(DirectoryError::Parse("script exhausted".to_string())))
        }
    }

    fn payload(names: &[&str]) -> DirectoryPayload {
        DirectoryPayload {
            medicines: names.iter().map(|n| MedicineName::from(*n)).collect(),
        }
    }

    #[tokio::test]
    async fn second_load_is_served_from_cache() {
        let mut dir = MedicineDirectory::new(ScriptedSource::new(vec![Ok(payload(&[
            "Aspirin",
            "Ibuprofen",
        ]))]));

        assert_eq!(dir.load().await.names().len(), 2);
        assert_eq!(dir.load().await.names().len(), 2);
        assert_eq!(dir.source.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failure_degrades_and_retries_on_next_call() {
        let mut dir = MedicineDirectory::new(ScriptedSource::new(vec![
            Err(DirectoryError::Parse("expected value".to_string())),
            Ok(payload(&["Aspirin"])),
        ]));

        assert_eq!(dir.load().await, DirectoryLoad::Unavailable);
        assert!(dir.cached().is_none());

        let names: Vec<&str> = dir.load().await.names().iter().map(|n| n.as_str()).collect();
        assert_eq!(names, ["Aspirin"]);
        assert_eq!(dir.source.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn failed_store_keeps_an_earlier_load() {
        let mut cache = DirectoryCache::new();
        assert_eq!(cache.current(), DirectoryLoad::Unavailable);
        cache.store(Ok(payload(&["Aspirin"])));
        let after = cache.store(Err(DirectoryError::Parse("late failure".to_string())));
        assert_eq!(after.names().len(), 1);
        assert!(cache.is_loaded());
    }

    #[test]
    fn location_parses_urls_and_paths() {
        assert!(matches!(
            DirectoryLocation::parse("https://example.org/medicines.json"),
            Ok(DirectoryLocation::Http(_))
        ));
        assert_eq!(
            DirectoryLocation::parse(" data/medicines.json ").unwrap(),
            DirectoryLocation::File(PathBuf::from("data/medicines.json"))
        );
        assert!(DirectoryLocation::parse("").is_err());
    }
}
