pub mod in_memory;

use crate::core::errors::DenError;
use crate::core::models::AppLog;
use async_trait::async_trait;

/// Audit trail of den actions.
#[async_trait]
pub trait LoggingService: Send + Sync {
    async fn log_action(
        &self,
        action: &str,
        den_id: Option<&str>,
        details: serde_json::Value,
        user_id: Option<&str>,
    ) -> Result<(), DenError>;
    async fn get_logs(&self) -> Result<Vec<AppLog>, DenError>;
    async fn get_den_logs(&self, den_id: &str) -> Result<Vec<AppLog>, DenError>;
}
