use serde::{Deserialize, Serialize};
use std::fmt;

/// A known medicine name as published by the directory resource.
///
/// Directory data is trusted as-is: names are neither validated nor deduplicated.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct MedicineName(String);

impl MedicineName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `needle` must already be lowercase.
    pub fn contains_lowercase(&self, needle: &str) -> bool {
        self.0.to_lowercase().contains(needle)
    }
}

impl fmt::Display for MedicineName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for MedicineName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for MedicineName {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for MedicineName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Body of the static directory resource: `{ "medicines": [...] }`.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct DirectoryPayload {
    pub medicines: Vec<MedicineName>,
}

/// One natural remedy as ranked by the effect service.
///
/// `match_score` is opaque to the client; it is displayed, never recomputed.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Remedy {
    pub name: String,
    pub effect: String,
    pub match_score: f64,
}

/// Successful body of `GET /api/get_medicine_effect`.
///
/// `remedies` keeps the service order; a missing array reads as empty.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct EffectQueryResult {
    pub effect: String,
    #[serde(default)]
    pub remedies: Vec<Remedy>,
}

/// Failure body of the effect service: `{ "error": "..." }`, field optional.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct ErrorBody {
    #[serde(default)]
    pub error: Option<String>,
}

pub const EFFECT_QUERY_PATH: &str = "api/get_medicine_effect";
pub const MEDICINE_NAME_PARAM: &str = "medicine_name";
