use serde::{Deserialize, Serialize};

/// Closed action vocabulary. BUY/SELL/HOLD apply to held positions,
/// LONG/SHORT to opportunities outside the portfolio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    Buy,
    Sell,
    Hold,
    Long,
    Short,
}

impl Action {
    pub fn as_str(self) -> &'static str {
        match self {
            Action::Buy => "BUY",
            Action::Sell => "SELL",
            Action::Hold => "HOLD",
            Action::Long => "LONG",
            Action::Short => "SHORT",
        }
    }

    /// Substring containment over the uppercased text, BUY checked first.
    /// Deliberately loose: the model wraps tokens in arbitrary prose.
    pub fn find_portfolio_action(text: &str) -> Option<Action> {
        let upper = text.to_uppercase();
        [Action::Buy, Action::Sell, Action::Hold]
            .into_iter()
            .find(|action| upper.contains(action.as_str()))
    }

    /// Same containment matching for the opportunities vocabulary.
    pub fn find_opportunity_action(text: &str) -> Option<Action> {
        let upper = text.to_uppercase();
        [Action::Long, Action::Short]
            .into_iter()
            .find(|action| upper.contains(action.as_str()))
    }
}

/// One advisory line item. `action` is `None` when no vocabulary token
/// could be extracted; the formatter renders a neutral indicator then.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
    pub ticker: String,
    pub name: String,
    pub action: Option<Action>,
    pub reason: String,
}

/// Result of parsing one advisory response. Built once per pipeline run
/// and never persisted across runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioAnalysis {
    pub summary: String,
    pub recommendations: Vec<Recommendation>,
    /// Recommendations for instruments not currently held.
    pub opportunities: Vec<Recommendation>,
    pub monthly_reminder: bool,
    /// Untouched model output, kept for diagnostics.
    pub raw_text: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn portfolio_action_is_case_insensitive_containment() {
        assert_eq!(Action::find_portfolio_action(" Sberbank - buy"), Some(Action::Buy));
        assert_eq!(Action::find_portfolio_action("HOLD for now"), Some(Action::Hold));
        assert_eq!(Action::find_portfolio_action("nothing here"), None);
    }

    #[test]
    fn buy_wins_when_multiple_tokens_present() {
        // Containment order is BUY, SELL, HOLD.
        assert_eq!(
            Action::find_portfolio_action("SELL half, BUY the dip"),
            Some(Action::Buy)
        );
    }

    #[test]
    fn opportunity_action_tolerates_surrounding_words() {
        assert_eq!(
            Action::find_opportunity_action("strong LONG candidate"),
            Some(Action::Long)
        );
        assert_eq!(Action::find_opportunity_action("go short"), Some(Action::Short));
        assert_eq!(Action::find_opportunity_action("BUY"), None);
    }
}
