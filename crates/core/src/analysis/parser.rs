use crate::domain::analysis::{Action, PortfolioAnalysis, Recommendation};
use crate::domain::portfolio::Position;

const MARKER_SUMMARY: &str = "SUMMARY:";
const MARKER_RECOMMENDATIONS: &str = "RECOMMENDATIONS:";
// The model is instructed to use English headings but occasionally
// localizes them anyway.
const MARKER_RECOMMENDATIONS_RU: &str = "РЕКОМЕНДАЦИИ:";
const MARKER_OPPORTUNITIES: &str = "OPPORTUNITIES:";
const PREFIX_EXPLANATION: &str = "Explanation:";

const FALLBACK_SUMMARY: &str = "Analysis completed, but could not parse specific recommendations.";
const FALLBACK_REASON: &str = "Based on current position yield.";

/// Turns one unstructured advisory response into a structured analysis.
///
/// The advisory is model-generated natural language with no enforced schema,
/// so this is a tolerant line-oriented pass. It never fails: when no
/// recommendation structure can be extracted from non-empty input it
/// synthesizes one recommendation per known position from the sign of that
/// position's expected yield and replaces the summary with a diagnostic.
pub fn parse_advisory(text: &str, positions: &[Position]) -> PortfolioAnalysis {
    // Strip emphasis markers first so headings match regardless of markup.
    let cleaned = text.replace(['*', '_'], "");

    let mut analysis = PortfolioAnalysis {
        summary: String::new(),
        recommendations: Vec::new(),
        opportunities: Vec::new(),
        monthly_reminder: false,
        raw_text: text.to_string(),
    };

    let split = cleaned
        .split_once(MARKER_RECOMMENDATIONS)
        .or_else(|| cleaned.split_once(MARKER_RECOMMENDATIONS_RU));

    match split {
        Some((head, tail)) => {
            analysis.summary = extract_summary(head);
            // The recommendations block runs to the next section marker.
            let block = match tail.split_once(MARKER_OPPORTUNITIES) {
                Some((block, _)) => block,
                None => tail,
            };
            analysis.recommendations = parse_recommendations(block, positions);
        }
        None => {
            analysis.summary = extract_summary(&cleaned);
        }
    }

    if analysis.recommendations.is_empty() && !cleaned.trim().is_empty() {
        analysis.summary = FALLBACK_SUMMARY.to_string();
        analysis.recommendations = fallback_recommendations(positions);
    }

    if let Some((_, block)) = cleaned.split_once(MARKER_OPPORTUNITIES) {
        analysis.opportunities = parse_opportunities(block);
    }

    analysis
}

/// `SUMMARY:` takes the remainder of its line, or the next non-empty line
/// when the remainder is blank.
fn extract_summary(part: &str) -> String {
    let lines: Vec<&str> = part.lines().collect();
    for (i, line) in lines.iter().enumerate() {
        if let Some(rest) = line.trim_start().strip_prefix(MARKER_SUMMARY) {
            let rest = rest.trim();
            if !rest.is_empty() {
                return rest.to_string();
            }
            return lines[i + 1..]
                .iter()
                .map(|l| l.trim())
                .find(|l| !l.is_empty())
                .unwrap_or_default()
                .to_string();
        }
    }
    String::new()
}

/// A line opens a new recommendation only when it starts with a known ticker
/// followed by a separator, so a ticker embedded mid-sentence never triggers.
fn ticker_line_start(line: &str, ticker: &str) -> bool {
    match line.strip_prefix(ticker) {
        Some(rest) => matches!(rest.trim_start().chars().next(), Some(':' | '-')),
        None => false,
    }
}

fn parse_recommendations(block: &str, positions: &[Position]) -> Vec<Recommendation> {
    let lines: Vec<&str> = block.lines().map(str::trim).collect();
    let mut out = Vec::new();

    let mut i = 0;
    while i < lines.len() {
        let line = lines[i];
        if line.is_empty() {
            i += 1;
            continue;
        }

        if let Some(pos) = positions.iter().find(|p| ticker_line_start(line, &p.ticker)) {
            let rest = line[pos.ticker.len()..].trim_start();
            let rest = rest.strip_prefix([':', '-']).unwrap_or(rest);
            let mut rec = Recommendation {
                ticker: pos.ticker.clone(),
                name: pos.name.clone(),
                action: Action::find_portfolio_action(rest),
                reason: String::new(),
            };

            // The next non-blank line is the rationale, unless it opens a
            // new recommendation itself.
            if let Some((j, next)) = lines
                .iter()
                .enumerate()
                .skip(i + 1)
                .find(|(_, l)| !l.is_empty())
            {
                if !positions.iter().any(|p| ticker_line_start(next, &p.ticker)) {
                    rec.reason = next
                        .strip_prefix(PREFIX_EXPLANATION)
                        .unwrap_or(next)
                        .trim()
                        .to_string();
                    i = j;
                }
            }
            out.push(rec);
        }
        i += 1;
    }

    out
}

/// Opportunity lines are `ticker[: name] - ACTION`; tickers here are not in
/// the portfolio, so anything left of the dash is taken as written.
fn parse_opportunities(block: &str) -> Vec<Recommendation> {
    let lines: Vec<&str> = block.lines().map(str::trim).collect();
    let mut out = Vec::new();

    let mut i = 0;
    while i < lines.len() {
        let line = lines[i];
        let Some((left, right)) = line.split_once('-') else {
            i += 1;
            continue;
        };

        let left = left.trim();
        let (ticker, name) = match left.split_once(':') {
            Some((ticker, name)) => (ticker.trim(), name.trim()),
            None => (left, ""),
        };

        let mut rec = Recommendation {
            ticker: ticker.to_string(),
            name: name.to_string(),
            action: Action::find_opportunity_action(right),
            reason: String::new(),
        };

        if let Some(next) = lines.get(i + 1) {
            if let Some(explanation) = next.strip_prefix(PREFIX_EXPLANATION) {
                rec.reason = explanation.trim().to_string();
                i += 1;
            }
        }
        out.push(rec);
        i += 1;
    }

    out
}

/// Yield-sign heuristic: the advisory produced no parseable structure, but
/// the caller still gets one actionable line per position.
fn fallback_recommendations(positions: &[Position]) -> Vec<Recommendation> {
    positions
        .iter()
        .map(|pos| {
            let action = if pos.expected_yield > 0.0 {
                Action::Buy
            } else if pos.expected_yield < 0.0 {
                Action::Sell
            } else {
                Action::Hold
            };
            Recommendation {
                ticker: pos.ticker.clone(),
                name: pos.name.clone(),
                action: Some(action),
                reason: FALLBACK_REASON.to_string(),
            }
        })
        .collect()
}
