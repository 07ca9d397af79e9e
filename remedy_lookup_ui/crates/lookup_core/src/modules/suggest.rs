use crate::modules::protocol::MedicineName;
use log::debug;

/// Shorter queries produce no suggestions at all.
pub const MIN_QUERY_CHARS: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    Pointer,
    EnterKey,
}

/// Why the list holds what it holds. Only `Matches` is ever displayed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Suggestions {
    #[default]
    Cleared,
    QueryTooShort,
    DirectoryUnavailable,
    NoMatch,
    Matches(Vec<MedicineName>),
}

impl Suggestions {
    pub fn names(&self) -> &[MedicineName] {
        match self {
            Suggestions::Matches(names) => names,
            _ => &[],
        }
    }
}

/// Snapshot of the suggestion list slot.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SuggestionView {
    pub items: Vec<MedicineName>,
    pub visible: bool,
}

/// Trimmed, lowercased query, or `None` when it is too short to suggest on.
pub fn normalize_query(raw: &str) -> Option<String> {
    let q = raw.trim().to_lowercase();
    if q.chars().count() < MIN_QUERY_CHARS {
        return None;
    }
    Some(q)
}

pub fn classify(raw_query: &str, directory: Option<&[MedicineName]>) -> Suggestions {
    let Some(query) = normalize_query(raw_query) else {
        return Suggestions::QueryTooShort;
    };
    let Some(directory) = directory else {
        return Suggestions::DirectoryUnavailable;
    };
    let matches: Vec<MedicineName> = directory
        .iter()
        .filter(|name| name.contains_lowercase(&query))
        .cloned()
        .collect();
    if matches.is_empty() {
        Suggestions::NoMatch
    } else {
        Suggestions::Matches(matches)
    }
}

/// Substring filter in directory order. No ranking, dedup or limit.
pub fn suggest(query: &str, directory: &[MedicineName]) -> Vec<MedicineName> {
    match classify(query, Some(directory)) {
        Suggestions::Matches(names) => names,
        _ => Vec::new(),
    }
}

/// Owns the text input value and the suggestion list shown under it.
#[derive(Debug, Default)]
pub struct SuggestionEngine {
    input: String,
    list: Suggestions,
    visible: bool,
    awaiting: bool,
}

impl SuggestionEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn list(&self) -> &Suggestions {
        &self.list
    }

    pub fn set_input(&mut self, text: impl Into<String>) {
        self.input = text.into();
    }

    /// Whether the current input is long enough to need the directory.
    pub fn wants_directory(&self) -> bool {
        normalize_query(&self.input).is_some()
    }

    /// Marks the list as waiting for the directory; the shown list is left untouched.
    pub fn await_directory(&mut self) {
        self.awaiting = true;
    }

    pub fn awaiting_directory(&self) -> bool {
        self.awaiting
    }

    pub fn update(&mut self, directory: Option<&[MedicineName]>) -> SuggestionView {
        self.awaiting = false;
        self.list = classify(&self.input, directory);
        self.visible = !self.list.names().is_empty();
        self.view()
    }

    /// Commits `name` as the input value and clears the list. Pointer and Enter commit the same value.
    pub fn select(&mut self, name: impl Into<String>, via: Activation) -> SuggestionView {
        self.input = name.into();
        debug!("suggestion selected via {via:?}: {}", self.input);
        self.list = Suggestions::Cleared;
        self.visible = false;
        self.awaiting = false;
        self.view()
    }

    /// Hides the list after an interaction outside the input and the list.
    pub fn dismiss(&mut self) -> SuggestionView {
        self.visible = false;
        self.awaiting = false;
        self.view()
    }

    pub fn view(&self) -> SuggestionView {
        SuggestionView {
            items: if self.visible {
                self.list.names().to_vec()
            } else {
                Vec::new()
            },
            visible: self.visible,
        }
    }
}
