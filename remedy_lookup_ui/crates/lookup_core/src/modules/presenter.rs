use crate::modules::protocol::Remedy;
use crate::modules::session::SessionState;

pub const REMEDIES_HEADING: &str = "Closest Natural Remedies:";
pub const NO_REMEDIES_NOTICE: &str = "No natural remedies found for this effect.";

/// Output slots of the result area. At most one of loading / error / effect is asserted.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ResultView {
    pub loading: bool,
    pub error_banner: Option<String>,
    pub effect_header: Option<EffectHeader>,
    pub remedies: Option<RemedySection>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EffectHeader {
    pub medicine: String,
    pub effect: String,
}

impl EffectHeader {
    pub fn title(&self) -> String {
        format!("Effect of {}:", self.medicine)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemedySection {
    Cards(Vec<RemedyCard>),
    NoneFound,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemedyCard {
    pub name: String,
    pub effect: String,
    pub match_score: String,
}

impl From<&Remedy> for RemedyCard {
    fn from(r: &Remedy) -> Self {
        Self {
            name: r.name.clone(),
            effect: r.effect.clone(),
            match_score: format_score(r.match_score),
        }
    }
}

pub fn format_score(score: f64) -> String {
    format!("{score:.2}")
}

pub fn render(state: &SessionState) -> ResultView {
    match state {
        SessionState::Idle => ResultView::default(),
        SessionState::Loading => ResultView {
            loading: true,
            ..ResultView::default()
        },
        SessionState::Error { message } => ResultView {
            error_banner: Some(message.clone()),
            ..ResultView::default()
        },
        SessionState::Success { result, medicine } => {
            let remedies = if result.remedies.is_empty() {
                RemedySection::NoneFound
            } else {
                RemedySection::Cards(result.remedies.iter().map(RemedyCard::from).collect())
            };
            ResultView {
                effect_header: Some(EffectHeader {
                    medicine: medicine.clone(),
                    effect: result.effect.clone(),
                }),
                remedies: Some(remedies),
                ..ResultView::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::protocol::EffectQueryResult;

    fn success(remedies: Vec<Remedy>) -> SessionState {
        SessionState::Success {
            result: EffectQueryResult {
                effect: "Used for the temporary relief of minor aches.".to_string(),
                remedies,
            },
            medicine: "Aspirin".to_string(),
        }
    }

    fn remedy(name: &str, effect: &str, score: f64) -> Remedy {
        Remedy {
            name: name.to_string(),
            effect: effect.to_string(),
            match_score: score,
        }
    }

    #[test]
    fn idle_clears_every_slot() {
        assert_eq!(render(&SessionState::Idle), ResultView::default());
    }

    #[test]
    fn loading_shows_only_the_indicator() {
        let view = render(&SessionState::Loading);
        assert!(view.loading);
        assert!(view.error_banner.is_none());
        assert!(view.effect_header.is_none());
        assert!(view.remedies.is_none());
    }

    #[test]
    fn error_message_is_rendered_verbatim() {
        let view = render(&SessionState::Error {
            message: "Request to FDA API timed out.".to_string(),
        });
        assert!(!view.loading);
        assert_eq!(
            view.error_banner.as_deref(),
            Some("Request to FDA API timed out.")
        );
        assert!(view.effect_header.is_none());
    }

    #[test]
    fn cards_keep_order_and_two_decimal_scores() {
        let view = render(&success(vec![
            remedy("A", "e1", 0.8333),
            remedy("B", "e2", 0.5),
        ]));

        let header = view.effect_header.unwrap();
        assert_eq!(header.title(), "Effect of Aspirin:");
        assert_eq!(header.effect, "Used for the temporary relief of minor aches.");

        let Some(RemedySection::Cards(cards)) = view.remedies else {
            panic!("expected remedy cards");
        };
        let got: Vec<(&str, &str, &str)> = cards
            .iter()
            .map(|c| (c.name.as_str(), c.effect.as_str(), c.match_score.as_str()))
            .collect();
        assert_eq!(got, [("A", "e1", "0.83"), ("B", "e2", "0.50")]);
    }

    #[test]
    fn no_remedies_renders_the_notice() {
        let view = render(&success(Vec::new()));
        assert!(view.effect_header.is_some());
        assert_eq!(view.remedies, Some(RemedySection::NoneFound));
    }

    #[test]
    fn scores_are_never_reordered() {
        let view = render(&success(vec![
            remedy("Low", "x", 0.1),
            remedy("High", "y", 0.99),
        ]));
        let Some(RemedySection::Cards(cards)) = view.remedies else {
            panic!("expected remedy cards");
        };
        assert_eq!(cards[0].name, "Low");
        assert_eq!(cards[1].match_score, "0.99");
    }
}
