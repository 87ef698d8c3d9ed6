pub mod cache_keys;
pub mod in_memory;

use crate::core::errors::DenError;
use crate::core::models::Member;
use async_trait::async_trait;

/// Short-lived memo of den member lists.
#[async_trait]
pub trait Cache: Send + Sync {
    async fn get_members(&self, den_id: &str) -> Result<Option<Vec<Member>>, DenError>;
    async fn save_members(&self, den_id: &str, members: &[Member], ttl: std::time::Duration) -> Result<(), DenError>;
    async fn invalidate_members(&self, den_id: &str) -> Result<(), DenError>;
}
