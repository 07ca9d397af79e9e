//! Search session state machine.
//!
//! `Idle -> Loading -> Success | Error`, re-entered on every submission. Each transition
//! replaces the whole state value, so a stale result or error never survives into the next
//! state. Queries run outside this type: `submit` hands out a [`SearchTicket`] and the
//! caller feeds the outcome back through [`SearchSession::settle`].

use crate::modules::config::RacePolicy;
use crate::modules::effect_client::QueryError;
use crate::modules::protocol::EffectQueryResult;
use log::debug;

pub const EMPTY_INPUT_MESSAGE: &str = "Please enter a medicine name.";

#[derive(Debug, Clone, PartialEq, Default)]
pub enum SessionState {
    #[default]
    Idle,
    Loading,
    Success {
        result: EffectQueryResult,
        medicine: String,
    },
    Error {
        message: String,
    },
}

/// Handed out for every started query; carries the controller-assigned generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchTicket {
    pub generation: u64,
    pub medicine: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    /// Blank input: the session moved straight to the empty-input error.
    Rejected,
    Started(SearchTicket),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settlement {
    Applied,
    /// A newer submission exists and the policy drops older outcomes.
    Discarded,
}

#[derive(Debug)]
pub struct SearchSession {
    state: SessionState,
    policy: RacePolicy,
    generation: u64,
    in_flight: usize,
}

impl SearchSession {
    pub fn new(policy: RacePolicy) -> Self {
        Self {
            state: SessionState::Idle,
            policy,
            generation: 0,
            in_flight: 0,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn into_state(self) -> SessionState {
        self.state
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    pub fn submit(&mut self, input: &str) -> Submission {
        // Rejections also bump the generation so a guarded session drops older queries.
        self.generation += 1;

        let medicine = input.trim();
        if medicine.is_empty() {
            self.state = SessionState::Error {
                message: EMPTY_INPUT_MESSAGE.to_string(),
            };
            return Submission::Rejected;
        }

        self.in_flight += 1;
        self.state = SessionState::Loading;
        debug!("search #{} started: {medicine}", self.generation);
        Submission::Started(SearchTicket {
            generation: self.generation,
            medicine: medicine.to_string(),
        })
    }

    pub fn settle(
        &mut self,
        ticket: SearchTicket,
        outcome: Result<EffectQueryResult, QueryError>,
    ) -> Settlement {
        self.in_flight = self.in_flight.saturating_sub(1);

        if self.policy == RacePolicy::LatestSubmissionWins && ticket.generation != self.generation
        {
            debug!(
                "search #{} settled after #{}; discarded",
                ticket.generation, self.generation
            );
            return Settlement::Discarded;
        }

        self.state = match outcome {
            Ok(result) => SessionState::Success {
                result,
                medicine: ticket.medicine,
            },
            Err(e) => {
                debug!("search #{} failed: {e}", ticket.generation);
                SessionState::Error {
                    message: e.user_message(),
                }
            }
        };
        Settlement::Applied
    }
}
