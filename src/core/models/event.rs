use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct Event {
    pub id: String,
    pub den_id: String,
    pub title: String,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub all_day: bool,
    pub child_ids: Vec<String>,
    pub created_by: String,
    pub updated_at: DateTime<Utc>,
}

/// Last time a user looked at an event.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct EventView {
    pub user_id: String,
    pub event_id: String,
    pub seen_at: DateTime<Utc>,
}
