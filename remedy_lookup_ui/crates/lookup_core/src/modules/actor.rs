use crate::modules::config::RacePolicy;
use crate::modules::directory::{DirectoryCache, DirectoryError, DirectorySource};
use crate::modules::effect_client::{EffectQuery, QueryError};
use crate::modules::presenter::{render, ResultView};
use crate::modules::protocol::{DirectoryPayload, EffectQueryResult};
use crate::modules::session::{SearchSession, SearchTicket, SessionState, Settlement, Submission};
use crate::modules::suggest::{Activation, SuggestionEngine, SuggestionView};
use futures_util::future::{BoxFuture, OptionFuture};
use futures_util::stream::FuturesUnordered;
use futures_util::StreamExt;
use log::debug;
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitTrigger {
    Click,
    EnterKey,
}

/// Input events from whatever toolkit hosts the search box.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiEvent {
    TextChanged(String),
    SuggestionActivated { name: String, via: Activation },
    SubmitRequested(SubmitTrigger),
    FocusLostOutside,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewUpdate {
    Suggestions(SuggestionView),
    Input(String),
    FocusInput,
    Result(ResultView),
}

pub trait ViewSink {
    fn apply(&mut self, update: ViewUpdate);
}

impl ViewSink for Vec<ViewUpdate> {
    fn apply(&mut self, update: ViewUpdate) {
        self.push(update);
    }
}

impl ViewSink for mpsc::UnboundedSender<ViewUpdate> {
    fn apply(&mut self, update: ViewUpdate) {
        let _ = self.send(update);
    }
}

type Settling = (SearchTicket, Result<EffectQueryResult, QueryError>);
type Fetching = Result<DirectoryPayload, DirectoryError>;

pub struct Controller<Q, S> {
    client: Q,
    source: S,
    directory: DirectoryCache,
    suggestions: SuggestionEngine,
    session: SearchSession,
}

impl<Q, S> Controller<Q, S>
where
    Q: EffectQuery + Sync,
    S: DirectorySource,
{
    pub fn new(client: Q, source: S, policy: RacePolicy) -> Self {
        Self {
            client,
            source,
            directory: DirectoryCache::new(),
            suggestions: SuggestionEngine::new(),
            session: SearchSession::new(policy),
        }
    }
}

/// Drives one search box until `rx` closes, then lets in-flight queries finish.
///
/// Queries and the directory fetch run alongside event handling; nothing cancels a query.
/// At most one directory fetch is outstanding, and it is dropped on shutdown. Returns the
/// final session state.
pub async fn run<Q, S, V>(
    mut rx: mpsc::Receiver<UiEvent>,
    controller: Controller<Q, S>,
    view: &mut V,
) -> SessionState
where
    Q: EffectQuery + Sync,
    S: DirectorySource,
    V: ViewSink,
{
    let Controller {
        client,
        source,
        mut directory,
        mut suggestions,
        mut session,
    } = controller;
    let client = &client;
    let source = &source;
    let mut inflight: FuturesUnordered<BoxFuture<'_, Settling>> = FuturesUnordered::new();
    let mut pending_directory: Option<BoxFuture<'_, Fetching>> = None;

    view.apply(ViewUpdate::Result(render(session.state())));

    loop {
        tokio::select! {
            event = rx.recv() => {
                let Some(event) = event else { break };
                let mut wants_fetch = false;
                match event {
                    UiEvent::TextChanged(text) => {
                        suggestions.set_input(text);
                        wants_fetch = refresh_suggestions(&directory, &mut suggestions, view);
                    }
                    UiEvent::SuggestionActivated { name, via } => {
                        let list = suggestions.select(name, via);
                        view.apply(ViewUpdate::Suggestions(list));
                        view.apply(ViewUpdate::Input(suggestions.input().to_string()));
                        view.apply(ViewUpdate::FocusInput);
                    }
                    UiEvent::SubmitRequested(trigger) => {
                        if trigger == SubmitTrigger::EnterKey {
                            wants_fetch = refresh_suggestions(&directory, &mut suggestions, view);
                        }
                        if let Submission::Started(ticket) = session.submit(suggestions.input()) {
                            inflight.push(Box::pin(async move {
                                let outcome = client.query(&ticket.medicine).await;
                                (ticket, outcome)
                            }));
                        }
                        view.apply(ViewUpdate::Result(render(session.state())));
                    }
                    UiEvent::FocusLostOutside => {
                        view.apply(ViewUpdate::Suggestions(suggestions.dismiss()));
                    }
                }
                if wants_fetch && pending_directory.is_none() {
                    debug!("fetching medicine directory");
                    pending_directory = Some(Box::pin(source.fetch()));
                }
            }
            Some(fetched) = OptionFuture::from(pending_directory.as_mut()), if pending_directory.is_some() => {
                pending_directory = None;
                let load = directory.store(fetched);
                if suggestions.awaiting_directory() {
                    view.apply(ViewUpdate::Suggestions(suggestions.update(load.available())));
                }
            }
            Some((ticket, outcome)) = inflight.next(), if !inflight.is_empty() => {
                if session.settle(ticket, outcome) == Settlement::Applied {
                    view.apply(ViewUpdate::Result(render(session.state())));
                }
            }
        }
    }

    debug!("ui closed; {} search(es) still in flight", session.in_flight());
    while let Some((ticket, outcome)) = inflight.next().await {
        if session.settle(ticket, outcome) == Settlement::Applied {
            view.apply(ViewUpdate::Result(render(session.state())));
        }
    }

    session.into_state()
}

/// Recomputes the list from the cached directory. Returns `true` when the input needs a
/// directory that has not loaded yet; the list then waits for the fetch.
fn refresh_suggestions<V: ViewSink>(
    directory: &DirectoryCache,
    suggestions: &mut SuggestionEngine,
    view: &mut V,
) -> bool {
    if suggestions.wants_directory() && !directory.is_loaded() {
        suggestions.await_directory();
        return true;
    }
    let list = suggestions.update(directory.current().available());
    view.apply(ViewUpdate::Suggestions(list));
    false
}
