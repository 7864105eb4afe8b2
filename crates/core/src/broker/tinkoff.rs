use crate::broker::PortfolioProvider;
use crate::config::Settings;
use crate::domain::portfolio::{Portfolio, Position};
use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://invest-public-api.tinkoff.ru/rest";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

const SERVICE_USERS: &str = "tinkoff.public.invest.api.contract.v1.UsersService";
const SERVICE_OPERATIONS: &str = "tinkoff.public.invest.api.contract.v1.OperationsService";
const SERVICE_INSTRUMENTS: &str = "tinkoff.public.invest.api.contract.v1.InstrumentsService";

const REPORT_CURRENCY: &str = "RUB";

/// Tinkoff Invest REST client. Uses the gRPC-over-REST gateway, so every
/// method is a POST with a JSON body.
#[derive(Debug, Clone)]
pub struct TinkoffClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
    account_id: Option<String>,
}

impl TinkoffClient {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let token = settings.require_broker_token()?.to_string();
        let base_url = settings
            .broker_base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let timeout_secs = std::env::var("TINKOFF_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("failed to build broker http client")?;

        Ok(Self {
            http,
            base_url,
            token,
            account_id: settings.broker_account_id.clone(),
        })
    }

    fn url(&self, service: &str, method: &str) -> String {
        format!("{}/{service}/{method}", self.base_url.trim_end_matches('/'))
    }

    async fn call<B: Serialize, T: DeserializeOwned>(
        &self,
        service: &str,
        method: &str,
        body: &B,
    ) -> Result<T> {
        let res = self
            .http
            .post(self.url(service, method))
            .bearer_auth(&self.token)
            .json(body)
            .send()
            .await
            .with_context(|| format!("broker {method} request failed"))?;

        let status = res.status();
        let text = res
            .text()
            .await
            .context("failed to read broker response body")?;
        if !status.is_success() {
            anyhow::bail!("broker {method} returned HTTP {status}: {text}");
        }

        serde_json::from_str::<T>(&text)
            .with_context(|| format!("failed to decode broker {method} response: {text}"))
    }

    async fn resolve_account_id(&self) -> Result<String> {
        if let Some(id) = &self.account_id {
            return Ok(id.clone());
        }

        let resp: GetAccountsResponse = self
            .call(SERVICE_USERS, "GetAccounts", &serde_json::json!({}))
            .await?;
        let first = resp
            .accounts
            .into_iter()
            .next()
            .context("no brokerage accounts found")?;
        Ok(first.id)
    }

    /// The portfolio endpoint only carries FIGIs; display names come from the
    /// instruments service. Resolution failure degrades to the FIGI itself
    /// rather than failing the snapshot.
    async fn resolve_instrument(&self, figi: &str) -> Option<InstrumentBrief> {
        let body = serde_json::json!({
            "idType": "INSTRUMENT_ID_TYPE_FIGI",
            "id": figi,
        });
        match self
            .call::<_, GetInstrumentResponse>(SERVICE_INSTRUMENTS, "GetInstrumentBy", &body)
            .await
        {
            Ok(resp) => resp.instrument.filter(|i| !i.ticker.trim().is_empty()),
            Err(err) => {
                tracing::warn!(figi, error = %err, "instrument resolution failed; using FIGI");
                None
            }
        }
    }
}

#[async_trait::async_trait]
impl PortfolioProvider for TinkoffClient {
    fn provider_name(&self) -> &'static str {
        "tinkoff_invest"
    }

    async fn fetch_portfolio(&self) -> Result<Portfolio> {
        let account_id = self.resolve_account_id().await?;

        let body = serde_json::json!({
            "accountId": account_id,
            "currency": REPORT_CURRENCY,
        });
        let resp: GetPortfolioResponse = self
            .call(SERVICE_OPERATIONS, "GetPortfolio", &body)
            .await?;

        let mut positions = Vec::with_capacity(resp.positions.len());
        for pos in resp.positions {
            let (ticker, name) = match self.resolve_instrument(&pos.figi).await {
                Some(instrument) => (instrument.ticker, instrument.name),
                None => (pos.figi.clone(), pos.instrument_type.clone()),
            };

            positions.push(Position {
                quantity: pos.quantity.to_f64(),
                average_price: pos.average_position_price.to_f64(),
                current_price: pos.current_price.to_f64(),
                expected_yield: pos.expected_yield.to_f64(),
                figi: pos.figi,
                ticker,
                name,
                instrument_type: pos.instrument_type,
                currency: REPORT_CURRENCY.to_string(),
            });
        }

        Ok(Portfolio::from_positions(positions, REPORT_CURRENCY))
    }
}

#[derive(Debug, Deserialize)]
struct GetAccountsResponse {
    #[serde(default)]
    accounts: Vec<Account>,
}

#[derive(Debug, Deserialize)]
struct Account {
    id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GetPortfolioResponse {
    #[serde(default)]
    positions: Vec<PortfolioPosition>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PortfolioPosition {
    figi: String,
    #[serde(default)]
    instrument_type: String,
    #[serde(default)]
    quantity: Quotation,
    #[serde(default)]
    average_position_price: Quotation,
    #[serde(default)]
    current_price: Quotation,
    #[serde(default)]
    expected_yield: Quotation,
}

/// Decimal split into integer `units` and fractional `nano` parts, as the
/// invest API encodes both Quotation and MoneyValue. `units` arrives as a
/// JSON string (int64 over the REST gateway).
#[derive(Debug, Default, Deserialize)]
struct Quotation {
    #[serde(default)]
    units: String,
    #[serde(default)]
    nano: i64,
}

impl Quotation {
    fn to_f64(&self) -> f64 {
        let units = self.units.parse::<i64>().unwrap_or(0);
        units as f64 + self.nano as f64 / 1e9
    }
}

#[derive(Debug, Deserialize)]
struct GetInstrumentResponse {
    instrument: Option<InstrumentBrief>,
}

#[derive(Debug, Deserialize)]
struct InstrumentBrief {
    #[serde(default)]
    ticker: String,
    #[serde(default)]
    name: String,
}
