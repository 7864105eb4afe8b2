pub mod telegram;

/// Hard cap on a single delivered payload; the chunker must respect it.
pub const MAX_MESSAGE_LEN: usize = 4096;

/// Renders text to the single authorized recipient.
#[async_trait::async_trait]
pub trait DeliveryChannel: Send + Sync {
    /// Send one payload. `markdown` switches emphasis parsing on; malformed
    /// markup can make the channel reject the payload, in which case the
    /// caller retries once with a plain variant.
    async fn send(&self, text: &str, markdown: bool) -> anyhow::Result<()>;
}
