use crate::modules::config::{ConfigError, LookupConfig};
use crate::modules::protocol::{EffectQueryResult, ErrorBody, EFFECT_QUERY_PATH, MEDICINE_NAME_PARAM};
use log::debug;
use reqwest::StatusCode;
use std::error::Error as StdError;
use std::future::Future;
use thiserror::Error;
use url::Url;

pub const GENERIC_STATUS_MESSAGE: &str = "Network response was not ok";
pub const GENERIC_TRANSPORT_MESSAGE: &str = "Error fetching medicine details.";

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("{message}")]
    ServerReported { status: StatusCode, message: String },
    #[error("http error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("effect response parse failed: {0}")]
    Malformed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryErrorKind {
    ServerReported,
    Transport,
}

impl QueryError {
    pub fn kind(&self) -> QueryErrorKind {
        match self {
            QueryError::ServerReported { .. } => QueryErrorKind::ServerReported,
            QueryError::Transport(_) | QueryError::Malformed(_) => QueryErrorKind::Transport,
        }
    }

    /// Single-line message for the error banner.
    pub fn user_message(&self) -> String {
        let raw = match self {
            QueryError::ServerReported { message, .. } => return message.clone(),
            QueryError::Transport(e) => describe_chain(e),
            QueryError::Malformed(detail) => detail.clone(),
        };
        let line = raw.split_whitespace().collect::<Vec<_>>().join(" ");
        if line.is_empty() {
            GENERIC_TRANSPORT_MESSAGE.to_string()
        } else {
            line
        }
    }
}

/// Remote lookup of a medicine's effect and ranked remedies.
///
/// One call is one request: no retries, no caching. Callers check for empty names.
pub trait EffectQuery {
    fn query(
        &self,
        medicine: &str,
    ) -> impl Future<Output = Result<EffectQueryResult, QueryError>> + Send;
}

#[derive(Debug, Clone)]
pub struct EffectQueryClient {
    http: reqwest::Client,
    endpoint: Url,
}

impl EffectQueryClient {
    pub fn new(http: reqwest::Client, service_base: &Url) -> Result<Self, ConfigError> {
        let endpoint = service_base
            .join(EFFECT_QUERY_PATH)
            .map_err(|source| ConfigError::ServiceUrl {
                value: service_base.to_string(),
                source,
            })?;
        Ok(Self { http, endpoint })
    }

    pub fn from_config(config: &LookupConfig) -> Result<Self, ConfigError> {
        Self::new(config.http_client()?, &config.service_base)
    }

    pub fn request_url(&self, medicine: &str) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair(MEDICINE_NAME_PARAM, medicine);
        url
    }
}

impl EffectQuery for EffectQueryClient {
    async fn query(&self, medicine: &str) -> Result<EffectQueryResult, QueryError> {
        let url = self.request_url(medicine);
        debug!("effect query: GET {url}");

        let resp = self.http.get(url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(QueryError::ServerReported {
                status,
                message: server_message(&body),
            });
        }

        let body = resp.text().await?;
        serde_json::from_str::<EffectQueryResult>(&body)
            .map_err(|e| QueryError::Malformed(e.to_string()))
    }
}

/// Extracts `error` from a failure body, or the generic status message.
pub fn server_message(body: &str) -> String {
    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.error)
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| GENERIC_STATUS_MESSAGE.to_string())
}

fn describe_chain(err: &dyn StdError) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let cause_text = cause.to_string();
        if !cause_text.is_empty() && !out.contains(&cause_text) {
            out.push_str(": ");
            out.push_str(&cause_text);
        }
        source = cause.source();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base: &str) -> EffectQueryClient {
        let base = crate::modules::config::service_base_url(base).unwrap();
        EffectQueryClient::new(reqwest::Client::new(), &base).unwrap()
    }

    #[test]
    fn request_url_encodes_the_medicine_name() {
        let url = client("http://127.0.0.1:5000").request_url("Tylenol & Co/500mg");
        assert_eq!(url.path(), "/api/get_medicine_effect");
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(
            pairs,
            [(
                "medicine_name".to_string(),
                "Tylenol & Co/500mg".to_string()
            )]
        );
        assert!(!url.query().unwrap_or_default().contains('&'));
    }

    #[test]
    fn endpoint_appends_to_a_base_path() {
        let url = client("https://remedies.example.org/service").request_url("aspirin");
        assert_eq!(
            url.as_str(),
            "https://remedies.example.org/service/api/get_medicine_effect?medicine_name=aspirin"
        );
    }

    #[test]
    fn server_error_field_is_surfaced_verbatim() {
        assert_eq!(server_message(r#"{"error":"not found"}"#), "not found");
    }

    #[test]
    fn unusable_error_bodies_fall_back() {
        for body in ["", "<html>502</html>", "{}", r#"{"error":""}"#, r#"{"error":42}"#] {
            assert_eq!(server_message(body), GENERIC_STATUS_MESSAGE, "body {body:?}");
        }
    }

    #[test]
    fn malformed_success_is_a_transport_failure() {
        let err = QueryError::Malformed("expected value at line 1 column 1".to_string());
        assert_eq!(err.kind(), QueryErrorKind::Transport);
        assert_eq!(err.user_message(), "expected value at line 1 column 1");

        let blank = QueryError::Malformed("  \n".to_string());
        assert_eq!(blank.user_message(), GENERIC_TRANSPORT_MESSAGE);
    }

    #[test]
    fn server_reported_message_is_kept_as_is() {
        let err = QueryError::ServerReported {
            status: StatusCode::NOT_FOUND,
            message: "No data found for this medicine.".to_string(),
        };
        assert_eq!(err.kind(), QueryErrorKind::ServerReported);
        assert_eq!(err.user_message(), "No data found for this medicine.");
        assert_eq!(err.to_string(), "No data found for this medicine.");
    }
}
