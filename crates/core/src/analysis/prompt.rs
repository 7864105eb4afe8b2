use crate::domain::portfolio::Portfolio;
use crate::news::Article;

/// Renders the portfolio into the fixed prompt section. The formatting is
/// deliberately stable so the model sees identical input shape across runs.
pub fn render_portfolio(portfolio: &Portfolio) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "Total portfolio value: {:.2} {}\n",
        portfolio.total_amount, portfolio.currency
    ));
    out.push_str(&format!(
        "Expected yield: {:.2} {}\n\n",
        portfolio.expected_yield, portfolio.currency
    ));
    out.push_str("Positions:\n");

    for pos in &portfolio.positions {
        out.push_str(&format!(
            "- {} ({}): {}\n",
            pos.ticker, pos.name, pos.instrument_type
        ));
        out.push_str(&format!("  Quantity: {:.2}\n", pos.quantity));
        out.push_str(&format!(
            "  Average Price: {:.2} {}\n",
            pos.average_price, pos.currency
        ));
        out.push_str(&format!(
            "  Current Price: {:.2} {}\n",
            pos.current_price, pos.currency
        ));
        out.push_str(&format!(
            "  Expected Yield: {:.2} {}\n",
            pos.expected_yield, pos.currency
        ));
        out.push('\n');
    }

    out
}

/// Renders fetched articles as a numbered list; an empty slice renders to an
/// empty string, which the advisory prompt tolerates.
pub fn render_news(articles: &[Article]) -> String {
    let mut out = String::new();
    for (i, article) in articles.iter().enumerate() {
        out.push_str(&format!("{}. {}\n", i + 1, article.title));
        out.push_str(&format!("   Source: {}\n", article.source));
        out.push_str(&format!(
            "   Date: {}\n",
            article.published_at.format("%Y-%m-%d")
        ));
        if let Some(description) = article.description.as_deref() {
            if !description.is_empty() {
                out.push_str(&format!("   Description: {description}\n"));
            }
        }
        out.push_str(&format!("   URL: {}\n\n", article.url));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::portfolio::Position;
    use chrono::{TimeZone, Utc};

    #[test]
    fn portfolio_rendering_is_stable() {
        let portfolio = Portfolio::from_positions(
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
        );

        let rendered = render_portfolio(&portfolio);
        assert_eq!(
            rendered,
            "Total portfolio value: 2513.00 RUB\n\
             Expected yield: 113.00 RUB\n\n\
             Positions:\n\
             - SBER (Sberbank): share\n\
             \x20 Quantity: 10.00\n\
             \x20 Average Price: 240.00 RUB\n\
             \x20 Current Price: 251.30 RUB\n\
             \x20 Expected Yield: 113.00 RUB\n\n"
        );
    }

    #[test]
    fn news_rendering_numbers_articles_and_skips_empty_description() {
        let articles = vec![
            Article {
                title: "Rates unchanged".to_string(),
                description: Some("Central bank holds".to_string()),
                url: "https://example.com/a".to_string(),
                published_at: Utc.with_ymd_and_hms(2026, 8, 20, 9, 0, 0).unwrap(),
                source: "Example Wire".to_string(),
            },
            Article {
                title: "Oil steady".to_string(),
                description: None,
                url: "https://example.com/b".to_string(),
                published_at: Utc.with_ymd_and_hms(2026, 8, 21, 9, 0, 0).unwrap(),
                source: "Example Wire".to_string(),
            },
        ];

        let rendered = render_news(&articles);
        assert!(rendered.starts_with("1. Rates unchanged\n"));
        assert!(rendered.contains("   Date: 2026-08-20\n"));
        assert!(rendered.contains("   Description: Central bank holds\n"));
        assert!(rendered.contains("2. Oil steady\n"));
        // No description line for the second article.
        assert_eq!(rendered.matches("Description:").count(), 1);
    }

    #[test]
    fn empty_news_renders_empty() {
        assert_eq!(render_news(&[]), "");
    }
}
