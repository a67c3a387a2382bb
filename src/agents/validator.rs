use async_trait::async_trait;

/// Gate applied to every incoming message before anything else happens.
#[async_trait]
pub trait Validator: Send + Sync {
    /// Returns `false` to reject the message.
    async fn validate(&self, text: &str) -> bool;

    fn name(&self) -> &'static str;
}

/// Accepts every message.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughValidator;

#[async_trait]
impl Validator for PassthroughValidator {
    async fn validate(&self, _text: &str) -> bool {
        true
    }

    fn name(&self) -> &'static str {
        "passthrough"
    }
}
