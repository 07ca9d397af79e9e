use crate::modules::directory::DirectoryLocation;
use log::warn;
use std::time::Duration;
use thiserror::Error;
use url::Url;

pub const DEFAULT_SERVICE_URL: &str = "http://127.0.0.1:5000/";
pub const DEFAULT_DIRECTORY: &str = "medicines.json";

const SERVICE_URL_ENV: &str = "REMEDY_SERVICE_URL";
const DIRECTORY_ENV: &str = "REMEDY_DIRECTORY";
const HTTP_TIMEOUT_ENV: &str = "REMEDY_HTTP_TIMEOUT_SECS";
const RACE_POLICY_ENV: &str = "REMEDY_RACE_POLICY";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid service url {value:?}: {source}")]
    ServiceUrl {
        value: String,
        #[source]
        source: url::ParseError,
    },
    #[error("service url {0} cannot be used as a base address")]
    NotABase(String),
    #[error("invalid directory location {0:?}")]
    Directory(String),
    #[error("unknown race policy {0:?} (expected last_settled or latest_submission)")]
    RacePolicy(String),
    #[error("http client setup failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// Which settling query owns the final view when searches overlap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RacePolicy {
    /// Whichever query resolves last is shown, regardless of submission order.
    #[default]
    LastSettledWins,
    /// Only the most recent submission may settle; older results are dropped.
    LatestSubmissionWins,
}

impl RacePolicy {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "last_settled" | "last-settled" | "last_settled_wins" | "settled" => {
                Some(Self::LastSettledWins)
            }
            "latest_submission" | "latest-submission" | "latest_submission_wins" | "latest"
            | "guarded" => Some(Self::LatestSubmissionWins),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LookupConfig {
    pub service_base: Url,
    pub directory: DirectoryLocation,
    /// `None` leaves requests unbounded; a hung service keeps the session loading.
    pub http_timeout: Option<Duration>,
    pub race_policy: RacePolicy,
}

impl LookupConfig {
    pub fn new(service_base: Url, directory: DirectoryLocation) -> Self {
        Self {
            service_base,
            directory,
            http_timeout: None,
            race_policy: RacePolicy::default(),
        }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from an arbitrary key lookup. Bad values warn and keep the default.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::new(
            service_base_url(DEFAULT_SERVICE_URL)?,
            DirectoryLocation::parse(DEFAULT_DIRECTORY)
                .map_err(|_| ConfigError::Directory(DEFAULT_DIRECTORY.to_string()))?,
        );
        let mut config = defaults;

        if let Some(raw) = non_empty(lookup(SERVICE_URL_ENV)) {
            match service_base_url(&raw) {
                Ok(url) => config.service_base = url,
                Err(e) => warn!("{SERVICE_URL_ENV}: {e}; using {DEFAULT_SERVICE_URL}"),
            }
        }

        if let Some(raw) = non_empty(lookup(DIRECTORY_ENV)) {
            match DirectoryLocation::parse(&raw) {
                Ok(loc) => config.directory = loc,
                Err(e) => warn!("{DIRECTORY_ENV}: {e}; using {DEFAULT_DIRECTORY}"),
            }
        }

        if let Some(raw) = non_empty(lookup(HTTP_TIMEOUT_ENV)) {
            match raw.trim().parse::<u64>() {
                Ok(0) => config.http_timeout = None,
                Ok(secs) => config.http_timeout = Some(Duration::from_secs(secs)),
                Err(_) => warn!("{HTTP_TIMEOUT_ENV}={raw:?} is not a number of seconds; ignoring"),
            }
        }

        if let Some(raw) = non_empty(lookup(RACE_POLICY_ENV)) {
            match RacePolicy::parse(&raw) {
                Some(policy) => config.race_policy = policy,
                None => warn!("unknown {RACE_POLICY_ENV}={raw:?}, keeping last_settled"),
            }
        }

        Ok(config)
    }

    pub fn with_service_url(mut self, raw: &str) -> Result<Self, ConfigError> {
        self.service_base = service_base_url(raw)?;
        Ok(self)
    }

    pub fn with_directory(mut self, raw: &str) -> Result<Self, ConfigError> {
        self.directory =
            DirectoryLocation::parse(raw).map_err(|_| ConfigError::Directory(raw.to_string()))?;
        Ok(self)
    }

    pub fn with_race_policy(mut self, raw: &str) -> Result<Self, ConfigError> {
        self.race_policy =
            RacePolicy::parse(raw).ok_or_else(|| ConfigError::RacePolicy(raw.to_string()))?;
        Ok(self)
    }

    pub fn http_client(&self) -> Result<reqwest::Client, ConfigError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = self.http_timeout {
            builder = builder.timeout(timeout);
        }
        Ok(builder.build()?)
    }
}

/// Parses a service address and forces a trailing slash so relative endpoints append to it.
pub fn service_base_url(raw: &str) -> Result<Url, ConfigError> {
    let raw = raw.trim();
    let mut url = Url::parse(raw).map_err(|source| ConfigError::ServiceUrl {
        value: raw.to_string(),
        source,
    })?;
    if url.cannot_be_a_base() {
        return Err(ConfigError::NotABase(raw.to_string()));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

fn non_empty(v: Option<String>) -> Option<String> {
    v.filter(|s| !s.trim().is_empty())
}
