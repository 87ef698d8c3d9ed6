use crate::core::errors::DenError;
use crate::core::models::AppLog;
use crate::infrastructure::logging::LoggingService;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Clone, Default)]
pub struct InMemoryLogging {
    logs: Arc<RwLock<Vec<AppLog>>>,
}

impl InMemoryLogging {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LoggingService for InMemoryLogging {
    async fn log_action(
        &self,
        action: &str,
        den_id: Option<&str>,
        details: serde_json::Value,
        user_id: Option<&str>,
    ) -> Result<(), DenError> {
        if !details.is_object() {
            return Err(DenError::LoggingError(format!(
                "Log details for {} must be a JSON object",
                action
            )));
        }
        let mut logs = self.logs.write().await;
        logs.push(AppLog {
            id: Uuid::new_v4().to_string(),
            action: action.to_string(),
            den_id: den_id.map(String::from),
            user_id: user_id.map(String::from),
            details,
            timestamp: chrono::Utc::now(),
        });
        Ok(())
    }

    async fn get_logs(&self) -> Result<Vec<AppLog>, DenError> {
        let logs = self.logs.read().await;
        Ok(logs.clone())
    }

    async fn get_den_logs(&self, den_id: &str) -> Result<Vec<AppLog>, DenError> {
        let logs = self.logs.read().await;
        Ok(logs
            .iter()
            .filter(|l| l.den_id.as_deref() == Some(den_id))
            .cloned()
            .collect())
    }
}
