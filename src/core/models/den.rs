use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct Den {
    pub id: String,
    pub name: String,
    /// IANA zone name; `None` renders in the host's local zone.
    pub timezone: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Parent,
    Caregiver,
    Viewer,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Role::Parent => "PARENT",
            Role::Caregiver => "CAREGIVER",
            Role::Viewer => "VIEWER",
        };
        write!(f, "{}", s)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct Member {
    pub den_id: String,
    pub user_id: String,
    pub role: Role,
    /// Custom share of den expenses in percent.
    pub split_percentage: Option<Decimal>,
    pub joined_at: DateTime<Utc>,
}

impl Member {
    pub fn is_parent(&self) -> bool {
        self.role == Role::Parent
    }
}
