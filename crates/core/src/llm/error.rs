use std::fmt;

/// Advisory generation failure with enough context to diagnose the model
/// exchange after the fact. The raw body is kept for error reporting.
#[derive(Debug, Clone)]
pub struct AdvisoryError {
    pub stage: &'static str,
    pub detail: String,
    pub raw_output: Option<String>,
}

impl fmt::Display for AdvisoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "advisory generation error (stage={}): {}",
            self.stage, self.detail
        )
    }
}

impl std::error::Error for AdvisoryError {}
