use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Serialize)]
pub struct FieldError {
    pub field: String,
    pub title: String,
    pub description: String,
}

#[derive(Error, Debug, Serialize)]
pub enum DenError {
    /// Den with given ID not found
    #[error("Den {0} not found")]
    DenNotFound(String),

    /// User is not a member of the den
    #[error("User {0} is not a den member")]
    NotDenMember(String),

    /// User is a member but lacks the parent role
    #[error("User {0} is not a den parent")]
    NotDenParent(String),

    #[error("Expense {0} not found")]
    ExpenseNotFound(String),

    #[error("Expense {0} already settled")]
    ExpenseAlreadySettled(String),

    #[error("Event {0} not found")]
    EventNotFound(String),

    #[error("Event ends before it starts")]
    InvalidEventRange,

    #[error("Invite {0} not found")]
    InviteNotFound(String),

    /// Code is unknown, expired or already consumed
    #[error("Invite code is invalid or expired")]
    InvalidInviteCode,

    #[error("Invite {0} already used")]
    InviteAlreadyUsed(String),

    /// No unused code could be generated within the retry budget
    #[error("Could not generate a unique invite code after {0} attempts")]
    InviteCodeExhausted(usize),

    /// Too many failed join attempts in the rate-limit window
    #[error("Too many failed attempts, try again in {0} minutes")]
    RateLimited(i64),

    /// Custom split percentages don't add up to 100
    #[error("Split percentages must sum to 100, got {0}")]
    InvalidSplitPercentages(String),

    #[error("Invalid split user: {0}")]
    InvalidSplitUser(String),

    #[error("Invalid time zone: {0}")]
    InvalidTimeZone(String),

    /// Generic input validation error with detailed field information
    #[error("Invalid input for field `{0}`: {1:?}")]
    InvalidInput(String, FieldError),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Logging error: {0}")]
    LoggingError(String),

    #[error("Cache error: {0}")]
    CacheError(String),

    #[error("Internal server error: {0}")]
    InternalServerError(String),
}

impl DenError {
    pub fn invalid_input(field: &str, title: &str, description: impl Into<String>) -> Self {
        DenError::InvalidInput(
            field.to_string(),
            FieldError {
                field: field.to_string(),
                title: title.to_string(),
                description: description.into(),
            },
        )
    }
}
