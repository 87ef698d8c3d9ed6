use rust_decimal::Decimal;

// Audit actions
pub const DEN_CREATED: &str = "DEN_CREATED";
pub const DEN_TIMEZONE_CHANGED: &str = "DEN_TIMEZONE_CHANGED";
pub const SPLIT_PERCENTAGES_UPDATED: &str = "SPLIT_PERCENTAGES_UPDATED";
pub const CHILD_ADDED: &str = "CHILD_ADDED";
pub const EXPENSE_ADDED: &str = "EXPENSE_ADDED";
pub const EXPENSE_SETTLED: &str = "EXPENSE_SETTLED";
pub const BALANCES_QUERIED: &str = "BALANCES_QUERIED";
pub const INVITE_CREATED: &str = "INVITE_CREATED";
pub const INVITE_REVOKED: &str = "INVITE_REVOKED";
pub const MEMBER_JOINED: &str = "MEMBER_JOINED";
pub const JOIN_REJECTED: &str = "JOIN_REJECTED";
pub const EVENT_CREATED: &str = "EVENT_CREATED";
pub const EVENT_UPDATED: &str = "EVENT_UPDATED";

/// Invite code alphabet without I, O, 0, 1 and L.
pub const INVITE_ALPHABET: &[u8; 31] = b"ABCDEFGHJKMNPQRSTUVWXYZ23456789";
pub const INVITE_CODE_LENGTH: usize = 8;
pub const INVITE_EXPIRY_DAYS: i64 = 3;
pub const INVITE_MAX_GENERATION_ATTEMPTS: usize = 32;

pub const RATE_LIMIT_WINDOW_MINUTES: i64 = 15;
pub const RATE_LIMIT_MAX_FAILURES: usize = 5;

pub const MEMBER_CACHE_TTL_SECS: u64 = 60;

/// Residual below which a balance counts as settled (one cent).
pub const SETTLED_EPSILON: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

pub const MONTH_GRID_CELLS: usize = 42;
pub const WEEK_DAYS: usize = 7;
pub const AGENDA_DAYS: usize = 14;
pub const MONTH_MARKER_LIMIT: usize = 3;
