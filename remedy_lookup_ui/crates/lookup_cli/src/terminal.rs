use lookup_core::actor::{SubmitTrigger, UiEvent, ViewSink, ViewUpdate};
use lookup_core::presenter::{RemedySection, ResultView, NO_REMEDIES_NOTICE, REMEDIES_HEADING};
use lookup_core::protocol::MedicineName;
use lookup_core::suggest::{Activation, SuggestionView};
use std::sync::{Arc, Mutex};

pub const HELP: &str = "\
type a medicine name to see suggestions, then press Enter on an empty line to search
  /pick N    choose suggestion N (pointer)
  /key N     choose suggestion N (keyboard Enter)
  /search    press the search button
  /away      click outside the search box
  /help      show this text
  /quit      leave";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Event(UiEvent),
    Help,
    Quit,
    Invalid(String),
}

/// Maps one line of terminal input onto a search-box event.
pub fn parse_line(line: &str, shown: &[MedicineName]) -> Command {
    let line = line.trim_end_matches(['\r', '\n']);
    if line.trim().is_empty() {
        return Command::Event(UiEvent::SubmitRequested(SubmitTrigger::EnterKey));
    }
    let Some(cmd) = line.trim().strip_prefix('/') else {
        return Command::Event(UiEvent::TextChanged(line.to_string()));
    };

    let mut parts = cmd.split_whitespace();
    let name = parts.next().unwrap_or_default().to_ascii_lowercase();
    let arg = parts.next();
    match name.as_str() {
        "search" => Command::Event(UiEvent::SubmitRequested(SubmitTrigger::Click)),
        "away" => Command::Event(UiEvent::FocusLostOutside),
        "help" => Command::Help,
        "quit" | "exit" => Command::Quit,
        "pick" => pick(arg, shown, Activation::Pointer),
        "key" => pick(arg, shown, Activation::EnterKey),
        other => Command::Invalid(format!("unknown command /{other} (try /help)")),
    }
}

fn pick(arg: Option<&str>, shown: &[MedicineName], via: Activation) -> Command {
    let Some(n) = arg.and_then(|a| a.parse::<usize>().ok()) else {
        return Command::Invalid("expected a suggestion number".to_string());
    };
    match n.checked_sub(1).and_then(|i| shown.get(i)) {
        Some(name) => Command::Event(UiEvent::SuggestionActivated {
            name: name.to_string(),
            via,
        }),
        None => Command::Invalid(format!("no suggestion #{n}")),
    }
}

pub fn format_suggestions(view: &SuggestionView) -> Vec<String> {
    if !view.visible {
        return Vec::new();
    }
    view.items
        .iter()
        .enumerate()
        .map(|(i, name)| format!("  [{}] {name}", i + 1))
        .collect()
}

pub fn format_result(view: &ResultView) -> Vec<String> {
    let mut lines = Vec::new();
    if view.loading {
        lines.push("Loading...".to_string());
    }
    if let Some(message) = &view.error_banner {
        lines.push(format!("error: {message}"));
    }
    if let Some(header) = &view.effect_header {
        lines.push(header.title());
        lines.push(header.effect.clone());
    }
    match &view.remedies {
        Some(RemedySection::Cards(cards)) => {
            lines.push(REMEDIES_HEADING.to_string());
            for card in cards {
                lines.push(format!("  * {}", card.name));
                lines.push(format!("    {}", card.effect));
                lines.push(format!("    Match Score: {}", card.match_score));
            }
        }
        Some(RemedySection::NoneFound) => lines.push(NO_REMEDIES_NOTICE.to_string()),
        None => {}
    }
    lines
}

/// Prints view updates to stdout and remembers the listed suggestions for `/pick`.
pub struct TerminalView {
    shown: Arc<Mutex<Vec<MedicineName>>>,
}

impl TerminalView {
    pub fn new(shown: Arc<Mutex<Vec<MedicineName>>>) -> Self {
        Self { shown }
    }
}

impl ViewSink for TerminalView {
    fn apply(&mut self, update: ViewUpdate) {
        match update {
            ViewUpdate::Suggestions(view) => {
                if let Ok(mut shown) = self.shown.lock() {
                    *shown = view.items.clone();
                }
                for line in format_suggestions(&view) {
                    println!("{line}");
                }
            }
            ViewUpdate::Input(text) => println!("> {text}"),
            ViewUpdate::FocusInput => {}
            ViewUpdate::Result(view) => {
                for line in format_result(&view) {
                    println!("{line}");
                }
            }
        }
    }
}
