//! Local stand-in for the remedy effect service and the static medicine directory.
//!
//! Answers are scripted per medicine through a [`Fixture`]. Integration tests call
//! [`spawn`] on `127.0.0.1:0`; the binary serves a fixture file on a fixed port.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use remedy_protocol::{
    DirectoryPayload, EffectQueryResult, ErrorBody, MedicineName, Remedy, MEDICINE_NAME_PARAM,
};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::{info, warn};

pub const DIRECTORY_ROUTE: &str = "/medicines.json";
pub const EFFECT_ROUTE: &str = "/api/get_medicine_effect";

pub const MISSING_NAME_MESSAGE: &str = "Please provide a medicine name.";
pub const NO_DATA_MESSAGE: &str = "No data found for this medicine.";
pub const UNKNOWN_ROUTE_MESSAGE: &str = "Endpoint not found.";

/// Scripted answer for one medicine.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Scripted {
    Effect(EffectQueryResult),
    /// Any status with a raw body, e.g. an HTML proxy page.
    Fail { status: u16, body: String },
    /// 200 with a body that is not an effect result.
    MalformedSuccess { body: String },
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Fixture {
    /// `None` makes the directory route answer 500.
    #[serde(default)]
    pub medicines: Option<Vec<MedicineName>>,
    /// Keyed by lowercase medicine name; file keys are normalized on load.
    #[serde(default, deserialize_with = "normalized_keys")]
    pub responses: BTreeMap<String, Scripted>,
}

impl Fixture {
    pub fn sample() -> Self {
        let medicines = [
            "Aspirin",
            "Aspirin Plus",
            "Ibuprofen",
            "Acetaminophen",
            "Metoprolol",
            "Ketorolac",
            "Amoxicillin",
        ]
        .into_iter()
        .map(MedicineName::from)
        .collect();

        let mut fixture = Self {
            medicines: Some(medicines),
            responses: BTreeMap::new(),
        };
        fixture.insert(
            "Aspirin",
            Scripted::Effect(EffectQueryResult {
                effect: "For the temporary relief of minor aches and pains.".to_string(),
                remedies: vec![
                    remedy("Willow bark", "Relieves minor aches and pains.", 0.8333),
                    remedy("Ginger", "Reduces inflammation and pain.", 0.5),
                ],
            }),
        );
        fixture.insert(
            "Ibuprofen",
            Scripted::Effect(EffectQueryResult {
                effect: "Reduces fever and relieves inflammation.".to_string(),
                remedies: vec![remedy("Turmeric", "Relieves inflammation.", 0.7142)],
            }),
        );
        fixture.insert(
            "Acetaminophen",
            Scripted::Effect(EffectQueryResult {
                effect: "Temporarily reduces fever.".to_string(),
                remedies: Vec::new(),
            }),
        );
        fixture.insert(
            "Metoprolol",
            Scripted::Fail {
                status: 504,
                body: r#"{"error":"Request to FDA API timed out."}"#.to_string(),
            },
        );
        fixture.insert(
            "Ketorolac",
            Scripted::Fail {
                status: 502,
                body: "<html><body>Bad Gateway</body></html>".to_string(),
            },
        );
        fixture.insert(
            "Amoxicillin",
            Scripted::MalformedSuccess {
                body: "effect: unknown".to_string(),
            },
        );
        fixture
    }

    pub fn insert(&mut self, medicine: &str, answer: Scripted) {
        self.responses.insert(response_key(medicine), answer);
    }

    pub fn answer_for(&self, medicine: &str) -> Option<&Scripted> {
        self.responses.get(&response_key(medicine))
    }
}

fn remedy(name: &str, effect: &str, match_score: f64) -> Remedy {
    Remedy {
        name: name.to_string(),
        effect: effect.to_string(),
        match_score,
    }
}

fn response_key(medicine: &str) -> String {
    medicine.trim().to_lowercase()
}

fn normalized_keys<'de, D>(deserializer: D) -> Result<BTreeMap<String, Scripted>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = BTreeMap::<String, Scripted>::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .map(|(medicine, answer)| (response_key(&medicine), answer))
        .collect())
}

#[derive(Debug, Default)]
struct Shared {
    fixture: RwLock<Fixture>,
    requests: Mutex<Vec<String>>,
    directory_hits: AtomicUsize,
}

/// Fixture plus a record of what was asked; shared by every handler.
#[derive(Debug, Clone, Default)]
pub struct MockState {
    shared: Arc<Shared>,
}

impl MockState {
    pub fn new(fixture: Fixture) -> Self {
        Self {
            shared: Arc::new(Shared {
                fixture: RwLock::new(fixture),
                ..Shared::default()
            }),
        }
    }

    /// Medicine names received by the effect route, in arrival order.
    pub fn requests(&self) -> Vec<String> {
        self.shared
            .requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn directory_hits(&self) -> usize {
        self.shared.directory_hits.load(Ordering::SeqCst)
    }

    pub fn set_directory(&self, medicines: Option<Vec<MedicineName>>) {
        self.fixture_mut().medicines = medicines;
    }

    pub fn set_answer(&self, medicine: &str, answer: Scripted) {
        self.fixture_mut().insert(medicine, answer);
    }

    fn fixture_mut(&self) -> std::sync::RwLockWriteGuard<'_, Fixture> {
        self.shared
            .fixture
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn fixture(&self) -> std::sync::RwLockReadGuard<'_, Fixture> {
        self.shared
            .fixture
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

pub fn router(state: MockState) -> Router {
    Router::new()
        .route(DIRECTORY_ROUTE, get(directory))
        .route(EFFECT_ROUTE, get(effect))
        .fallback(unknown_route)
        .with_state(state)
}

fn error_response(status: StatusCode, message: &str) -> Response {
    let body = ErrorBody {
        error: Some(message.to_string()),
    };
    (status, Json(body)).into_response()
}

async fn directory(State(state): State<MockState>) -> Response {
    state.shared.directory_hits.fetch_add(1, Ordering::SeqCst);
    let medicines = state.fixture().medicines.clone();
    match medicines {
        Some(medicines) => {
            info!("directory served: {} name(s)", medicines.len());
            Json(DirectoryPayload { medicines }).into_response()
        }
        None => {
            warn!("directory offline");
            (StatusCode::INTERNAL_SERVER_ERROR, "directory offline").into_response()
        }
    }
}

async fn effect(
    State(state): State<MockState>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let Some(raw) = params.get(MEDICINE_NAME_PARAM) else {
        return error_response(StatusCode::BAD_REQUEST, MISSING_NAME_MESSAGE);
    };
    state
        .shared
        .requests
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .push(raw.clone());

    if raw.trim().is_empty() {
        return error_response(StatusCode::BAD_REQUEST, MISSING_NAME_MESSAGE);
    }

    let answer = state.fixture().answer_for(raw).cloned();
    info!("effect query for {raw:?}: {}", answer.is_some());
    match answer {
        None => error_response(StatusCode::NOT_FOUND, NO_DATA_MESSAGE),
        Some(Scripted::Effect(result)) => Json(result).into_response(),
        Some(Scripted::Fail { status, body }) => {
            let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            (status, body).into_response()
        }
        Some(Scripted::MalformedSuccess { body }) => (StatusCode::OK, body).into_response(),
    }
}

async fn unknown_route() -> Response {
    error_response(StatusCode::NOT_FOUND, UNKNOWN_ROUTE_MESSAGE)
}

/// A running mock bound to a local port. Dropping it stops the server.
pub struct MockService {
    local_addr: SocketAddr,
    state: MockState,
    task: JoinHandle<()>,
}

impl MockService {
    /// Service base address with a trailing slash.
    pub fn base_url(&self) -> String {
        format!("http://{}/", self.local_addr)
    }

    pub fn directory_url(&self) -> String {
        format!("http://{}{DIRECTORY_ROUTE}", self.local_addr)
    }

    pub fn requests(&self) -> Vec<String> {
        self.state.requests()
    }

    pub fn directory_hits(&self) -> usize {
        self.state.directory_hits()
    }

    pub fn set_directory(&self, medicines: Option<Vec<MedicineName>>) {
        self.state.set_directory(medicines);
    }

    pub fn set_answer(&self, medicine: &str, answer: Scripted) {
        self.state.set_answer(medicine, answer);
    }
}

impl Drop for MockService {
    fn drop(&mut self) {
        self.task.abort();
    }
}

pub async fn spawn(addr: &str, fixture: Fixture) -> std::io::Result<MockService> {
    let listener = TcpListener::bind(addr).await?;
    let local_addr = listener.local_addr()?;
    let state = MockState::new(fixture);
    let app = router(state.clone());

    let task = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            warn!("mock service stopped: {e}");
        }
    });

    Ok(MockService {
        local_addr,
        state,
        task,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn answers_are_keyed_case_insensitively() {
        let fixture = Fixture::sample();
        assert!(fixture.answer_for("ASPIRIN").is_some());
        assert!(fixture.answer_for("  ibuprofen ").is_some());
        assert!(fixture.answer_for("unobtainium").is_none());
    }

    #[test]
    fn bundled_fixture_file_matches_sample() {
        let parsed: Fixture =
            serde_json::from_str(include_str!("../fixtures/sample.json")).unwrap();
        assert_eq!(parsed, Fixture::sample());
    }

    #[test]
    fn fixture_file_keys_match_any_case() {
        let raw = r#"{"responses":{" Aspirin ":{"kind":"fail","status":500,"body":""}}}"#;
        let fixture: Fixture = serde_json::from_str(raw).unwrap();
        assert!(fixture.answer_for("aspirin").is_some());
        assert!(fixture.answer_for("ASPIRIN").is_some());
        assert!(fixture.responses.contains_key("aspirin"));
        assert!(fixture.medicines.is_none());
    }

    #[test]
    fn scripted_answers_are_tagged_by_kind() {
        let raw = r#"{"kind":"fail","status":503,"body":"down"}"#;
        let parsed: Scripted = serde_json::from_str(raw).unwrap();
        assert_eq!(
            parsed,
            Scripted::Fail {
                status: 503,
                body: "down".to_string()
            }
        );
    }
}
