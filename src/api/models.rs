use axum::{Json, http::StatusCode, response::IntoResponse};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use utoipa::{IntoParams, ToSchema};

use crate::core::errors::DenError;
use crate::core::models::Role;

// Request structs for JSON payloads
#[derive(Deserialize, ToSchema)]
pub struct CreateDenRequest {
    pub name: String,
    pub timezone: Option<String>,
    pub creator_id: String,
}

#[derive(Deserialize, ToSchema)]
pub struct SetTimezoneRequest {
    pub timezone: Option<String>,
    pub acting_user_id: String,
}

#[derive(Deserialize, ToSchema)]
pub struct SetSplitsRequest {
    /// Empty map restores equal splitting.
    #[schema(value_type = Object)]
    pub percentages: BTreeMap<String, Decimal>,
    pub acting_user_id: String,
}

#[derive(Deserialize, ToSchema)]
pub struct AddChildRequest {
    pub name: String,
    pub birth_date: Option<NaiveDate>,
    pub acting_user_id: String,
}

#[derive(Deserialize, ToSchema)]
pub struct AddExpenseRequest {
    pub amount: Decimal,
    pub paid_by: String,
    pub description: String,
    #[serde(default)]
    pub child_ids: Vec<String>,
    pub acting_user_id: String,
}

#[derive(Deserialize, ToSchema)]
pub struct ActingUserRequest {
    pub acting_user_id: String,
}

#[derive(Deserialize, ToSchema)]
pub struct CreateInviteRequest {
    pub role: Role,
    pub acting_user_id: String,
}

#[derive(Deserialize, ToSchema)]
pub struct ValidateCodeRequest {
    pub code: String,
}

#[derive(Serialize, ToSchema)]
pub struct ValidateCodeResponse {
    pub valid: bool,
    /// Display form, e.g. `ABCD-EFGH`.
    pub code: Option<String>,
    pub den_id: Option<String>,
    pub role: Option<Role>,
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Deserialize, ToSchema)]
pub struct JoinDenRequest {
    pub code: String,
    pub user_id: String,
}

#[derive(Deserialize, ToSchema)]
pub struct CreateEventRequest {
    pub title: String,
    /// RFC 3339 instant, or a naive timestamp read as den-local time.
    pub start: String,
    pub end: String,
    #[serde(default)]
    pub all_day: bool,
    #[serde(default)]
    pub child_ids: Vec<String>,
    pub acting_user_id: String,
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateEventRequest {
    pub title: Option<String>,
    pub start: Option<String>,
    pub end: Option<String>,
    pub all_day: Option<bool>,
    pub child_ids: Option<Vec<String>>,
    pub acting_user_id: String,
}

// Query strings
#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ActingUserQuery {
    pub user_id: String,
}

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct MonthQuery {
    pub user_id: String,
    pub year: i32,
    pub month: u32,
    pub child_id: Option<String>,
}

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DayQuery {
    pub user_id: String,
    /// Defaults to today in the den's zone.
    pub date: Option<NaiveDate>,
    pub child_id: Option<String>,
}

// Error response struct
#[derive(Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

// Newtype wrapper for DenError to implement IntoResponse
pub struct ApiError(pub DenError);

impl From<DenError> for ApiError {
    fn from(err: DenError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self.0 {
            DenError::DenNotFound(_)
            | DenError::ExpenseNotFound(_)
            | DenError::EventNotFound(_)
            | DenError::InviteNotFound(_) => StatusCode::NOT_FOUND,
            DenError::NotDenMember(_) | DenError::NotDenParent(_) => StatusCode::FORBIDDEN,
            DenError::ExpenseAlreadySettled(_) | DenError::InviteAlreadyUsed(_) => StatusCode::CONFLICT,
            DenError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            DenError::InvalidInviteCode
            | DenError::InvalidEventRange
            | DenError::InvalidSplitPercentages(_)
            | DenError::InvalidSplitUser(_)
            | DenError::InvalidTimeZone(_)
            | DenError::InvalidInput(_, _) => StatusCode::BAD_REQUEST,
            DenError::InviteCodeExhausted(_) => StatusCode::SERVICE_UNAVAILABLE,
            DenError::StorageError(_)
            | DenError::LoggingError(_)
            | DenError::CacheError(_)
            | DenError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!(error = %self.0, "request failed");
        }
        (status, Json(ErrorResponse { error: self.0.to_string() })).into_response()
    }
}
