use crate::domain::model::FallbackContext;
use crate::utils::error::Result;
use async_trait::async_trait;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
}

/// Free-text answering service consulted when no heuristic matches.
#[async_trait]
pub trait Assistant: Send + Sync {
    fn name(&self) -> &str;

    async fn answer(&self, context: &FallbackContext) -> Result<String>;
}
