use crate::delivery::MAX_MESSAGE_LEN;
use crate::domain::analysis::{Action, PortfolioAnalysis, Recommendation};
use crate::domain::portfolio::Portfolio;

/// Renders the full report and splits it into deliverable chunks.
pub fn format_report(portfolio: &Portfolio, analysis: &PortfolioAnalysis) -> Vec<String> {
    chunk_message(&render_report(portfolio, analysis), MAX_MESSAGE_LEN)
}

/// Assembles the report in fixed order: header, summary, portfolio totals,
/// recommendations, opportunities (when any), monthly reminder (when set).
pub fn render_report(portfolio: &Portfolio, analysis: &PortfolioAnalysis) -> String {
    let mut out = String::new();

    out.push_str("📊 *PORTFOLIO ANALYSIS* 📊\n\n");

    out.push_str("*SUMMARY:*\n");
    out.push_str(&analysis.summary);
    out.push_str("\n\n");

    out.push_str("*PORTFOLIO OVERVIEW:*\n");
    out.push_str(&format!(
        "Total Value: {:.2} {}\n",
        portfolio.total_amount, portfolio.currency
    ));
    out.push_str(&format!(
        "Expected Yield: {:.2} {}\n\n",
        portfolio.expected_yield, portfolio.currency
    ));

    out.push_str("*RECOMMENDATIONS:*\n\n");
    for rec in &analysis.recommendations {
        push_recommendation(&mut out, rec);
    }

    if !analysis.opportunities.is_empty() {
        out.push_str("*OPPORTUNITIES:*\n\n");
        for opp in &analysis.opportunities {
            push_recommendation(&mut out, opp);
        }
    }

    if analysis.monthly_reminder {
        out.push_str("\n⚠️ *REMINDER* ⚠️\n");
        out.push_str("Don't forget to add funds and redistribute your portfolio this month!\n");
    }

    out
}

fn push_recommendation(out: &mut String, rec: &Recommendation) {
    let label = rec.action.map(Action::as_str).unwrap_or_default();
    out.push_str(&format!(
        "*{} ({})* - {} {}\n",
        rec.ticker,
        rec.name,
        action_glyph(rec.action),
        label
    ));
    out.push_str(&format!("_{}_\n\n", rec.reason));
}

fn action_glyph(action: Option<Action>) -> &'static str {
    match action {
        Some(Action::Buy) => "🟢",
        Some(Action::Sell) => "🔴",
        Some(Action::Long) => "📈",
        Some(Action::Short) => "📉",
        // HOLD and anything unrecognized render neutrally.
        Some(Action::Hold) | None => "🔄",
    }
}

/// Splits `text` into chunks of at most `max_len` bytes. Prefers cutting at
/// the last newline inside the window when that newline sits past the halfway
/// point; otherwise cuts at the hard limit, backed off to a char boundary
/// since reports are largely Cyrillic. Undersized input comes back unchanged,
/// and the concatenation of all chunks always reconstructs the input.
pub fn chunk_message(text: &str, max_len: usize) -> Vec<String> {
    if text.len() <= max_len {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut rest = text;
    while rest.len() > max_len {
        let mut window = max_len;
        while window > 0 && !rest.is_char_boundary(window) {
            window -= 1;
        }
        if window == 0 {
            // max_len is smaller than the first character; emit it whole.
            window = rest
                .chars()
                .next()
                .map(char::len_utf8)
                .unwrap_or(rest.len());
        }

        let cut = match rest[..window].rfind('\n') {
            Some(idx) if idx >= max_len / 2 && idx > 0 => idx,
            _ => window,
        };

        chunks.push(rest[..cut].to_string());
        rest = &rest[cut..];
    }
    chunks.push(rest.to_string());
    chunks
}

/// Plain-text variant for the delivery fallback path.
pub fn strip_markdown(text: &str) -> String {
    text.replace(['*', '_'], "")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::portfolio::Position;

    fn sample_portfolio() -> Portfolio {
        Portfolio::from_positions(
            vec![Position {
                figi: "BBG004730N88".to_string(),
                ticker: "SBER".to_string(),
                name: "Sberbank".to_string(),
                instrument_type: "share".to_string(),
                quantity: 10.0,
                average_price: 240.0,
                current_price: 251.3,
                expected_yield: 113.0,
                currency: "RUB".to_string(),
            }],
            "RUB",
        )
    }

    fn sample_analysis() -> PortfolioAnalysis {
        PortfolioAnalysis {
            summary: "All good.".to_string(),
            recommendations: vec![Recommendation {
                ticker: "SBER".to_string(),
                name: "Sberbank".to_string(),
                action: Some(Action::Buy),
                reason: "Strong fundamentals.".to_string(),
            }],
            opportunities: Vec::new(),
            monthly_reminder: false,
            raw_text: String::new(),
        }
    }

    #[test]
    fn report_has_fixed_section_order() {
        let report = render_report(&sample_portfolio(), &sample_analysis());

        let summary = report.find("*SUMMARY:*").unwrap();
        let overview = report.find("*PORTFOLIO OVERVIEW:*").unwrap();
        let recs = report.find("*RECOMMENDATIONS:*").unwrap();
        assert!(summary < overview && overview < recs);

        assert!(report.contains("Total Value: 2513.00 RUB\n"));
        assert!(report.contains("Expected Yield: 113.00 RUB\n"));
        assert!(report.contains("*SBER (Sberbank)* - 🟢 BUY\n"));
        assert!(report.contains("_Strong fundamentals._\n"));
        assert!(!report.contains("REMINDER"));
        assert!(!report.contains("*OPPORTUNITIES:*"));
    }

    #[test]
    fn monthly_reminder_appends_fixed_block() {
        let mut analysis = sample_analysis();
        analysis.monthly_reminder = true;
        let report = render_report(&sample_portfolio(), &analysis);
        assert!(report.contains("⚠️ *REMINDER* ⚠️"));
        assert!(report.contains("add funds and redistribute"));
    }

    #[test]
    fn opportunities_render_after_recommendations() {
        let mut analysis = sample_analysis();
        analysis.opportunities.push(Recommendation {
            ticker: "YNDX".to_string(),
            name: "Yandex".to_string(),
            action: Some(Action::Long),
            reason: "Growing search share.".to_string(),
        });
        let report = render_report(&sample_portfolio(), &analysis);

        let recs = report.find("*RECOMMENDATIONS:*").unwrap();
        let opps = report.find("*OPPORTUNITIES:*").unwrap();
        assert!(recs < opps);
        assert!(report.contains("*YNDX (Yandex)* - 📈 LONG\n"));
    }

    #[test]
    fn hold_and_unrecognized_use_neutral_glyph() {
        assert_eq!(action_glyph(Some(Action::Hold)), "🔄");
        assert_eq!(action_glyph(None), "🔄");
        assert_eq!(action_glyph(Some(Action::Sell)), "🔴");
    }

    #[test]
    fn undersized_text_is_returned_unchanged() {
        let chunks = chunk_message("short message", 4096);
        assert_eq!(chunks, ["short message"]);
    }

    #[test]
    fn chunks_respect_limit_and_reconstruct_input() {
        let text = "line one\nline two\nline three\nline four\n".repeat(20);
        let chunks = chunk_message(&text, 100);

        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.len() <= 100);
        }
        assert_eq!(chunks.concat(), text);
    }

    #[test]
    fn split_prefers_newline_past_halfway() {
        // A newline at byte 80 is inside the second half of a 100-byte window.
        let text = format!("{}\n{}", "a".repeat(80), "b".repeat(80));
        let chunks = chunk_message(&text, 100);
        assert_eq!(chunks[0], "a".repeat(80));
        assert_eq!(chunks.concat(), text);
    }

    #[test]
    fn early_newline_is_ignored_in_favor_of_hard_cut() {
        let text = format!("{}\n{}", "a".repeat(10), "b".repeat(200));
        let chunks = chunk_message(&text, 100);
        // Newline at byte 10 is before the halfway point of the window.
        assert_eq!(chunks[0].len(), 100);
        assert_eq!(chunks.concat(), text);
    }

    #[test]
    fn cyrillic_text_never_splits_inside_a_character() {
        let text = "привет мир ".repeat(50);
        let chunks = chunk_message(&text, 64);
        for chunk in &chunks {
            assert!(chunk.len() <= 64);
            // Would panic on a broken boundary.
            let _ = chunk.chars().count();
        }
        assert_eq!(chunks.concat(), text);
    }

    #[test]
    fn rechunking_chunks_is_idempotent() {
        let text = "word ".repeat(100);
        let chunks = chunk_message(&text, 4096);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunk_message(&chunks[0], 4096), chunks);
    }

    #[test]
    fn strip_markdown_removes_emphasis_only() {
        assert_eq!(strip_markdown("*bold* and _italic_"), "bold and italic");
        assert_eq!(strip_markdown("plain"), "plain");
    }
}
