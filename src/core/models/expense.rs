use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct Expense {
    pub id: String,
    pub den_id: String,
    pub amount: Decimal,
    pub paid_by: String,
    pub description: String,
    pub child_ids: Vec<String>,
    pub created_at: DateTime<Utc>,
    /// `None` while the expense is outstanding.
    pub settled_at: Option<DateTime<Utc>>,
}

impl Expense {
    pub fn is_outstanding(&self) -> bool {
        self.settled_at.is_none()
    }
}
