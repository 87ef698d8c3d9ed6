use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct Child {
    pub id: String,
    pub den_id: String,
    pub name: String,
    pub birth_date: Option<NaiveDate>,
}
