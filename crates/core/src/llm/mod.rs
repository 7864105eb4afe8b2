pub mod error;
pub mod openai;

/// Input to advisory generation. The prompt sections are pre-rendered by
/// `analysis::prompt` so the model receives identical formatting across runs.
#[derive(Debug, Clone)]
pub struct AdvisoryRequest {
    pub portfolio_text: String,
    pub news_text: String,
    pub monthly_reminder: bool,
}

/// Produces the unstructured advisory text for one pipeline run.
#[async_trait::async_trait]
pub trait AdvisoryGenerator: Send + Sync {
    fn provider_name(&self) -> &'static str;

    async fn generate(&self, request: &AdvisoryRequest) -> anyhow::Result<String>;
}
