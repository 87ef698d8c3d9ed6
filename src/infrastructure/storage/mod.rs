use crate::core::errors::DenError;
use crate::core::models::{Child, Den, Event, EventView, Expense, Invite, InviteAttempt, Member};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

#[async_trait]
pub trait DenRepository: Send + Sync {
    async fn save_den(&self, den: Den) -> Result<(), DenError>;
    async fn get_den(&self, den_id: &str) -> Result<Option<Den>, DenError>;
}

#[async_trait]
pub trait MemberRepository: Send + Sync {
    async fn save_member(&self, member: Member) -> Result<(), DenError>;
    async fn get_member(&self, den_id: &str, user_id: &str) -> Result<Option<Member>, DenError>;
    async fn list_members(&self, den_id: &str) -> Result<Vec<Member>, DenError>;
}

#[async_trait]
pub trait ChildRepository: Send + Sync {
    async fn save_child(&self, child: Child) -> Result<(), DenError>;
    async fn list_children(&self, den_id: &str) -> Result<Vec<Child>, DenError>;
}

#[async_trait]
pub trait ExpenseRepository: Send + Sync {
    async fn save_expense(&self, expense: Expense) -> Result<(), DenError>;
    async fn get_expense(&self, expense_id: &str) -> Result<Option<Expense>, DenError>;
    async fn list_expenses(&self, den_id: &str) -> Result<Vec<Expense>, DenError>;
}

#[async_trait]
pub trait InviteRepository: Send + Sync {
    async fn save_invite(&self, invite: Invite) -> Result<(), DenError>;
    async fn get_invite(&self, invite_id: &str) -> Result<Option<Invite>, DenError>;
    async fn find_invite_by_code(&self, code: &str) -> Result<Option<Invite>, DenError>;
    async fn code_exists(&self, code: &str) -> Result<bool, DenError>;
    async fn list_invites(&self, den_id: &str) -> Result<Vec<Invite>, DenError>;
    /// Sets `used_by`/`used_at` once; a second call fails with `InviteAlreadyUsed`.
    async fn mark_invite_used(&self, invite_id: &str, user_id: &str, at: DateTime<Utc>) -> Result<Invite, DenError>;
}

/// Append-only log of join attempts.
#[async_trait]
pub trait InviteAttemptRepository: Send + Sync {
    async fn log_attempt(&self, attempt: InviteAttempt) -> Result<(), DenError>;
    async fn list_attempts_since(&self, user_id: &str, since: DateTime<Utc>) -> Result<Vec<InviteAttempt>, DenError>;
}

#[async_trait]
pub trait EventRepository: Send + Sync {
    async fn save_event(&self, event: Event) -> Result<(), DenError>;
    async fn get_event(&self, event_id: &str) -> Result<Option<Event>, DenError>;
    /// Events of a den overlapping `[from, to)`.
    async fn list_events_between(
        &self,
        den_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Event>, DenError>;
    async fn save_event_view(&self, view: EventView) -> Result<(), DenError>;
    async fn list_event_views(&self, user_id: &str) -> Result<Vec<EventView>, DenError>;
}

/// Everything the den service persists.
pub trait Storage:
    DenRepository
    + MemberRepository
    + ChildRepository
    + ExpenseRepository
    + InviteRepository
    + InviteAttemptRepository
    + EventRepository
{
}

impl<T> Storage for T where
    T: DenRepository
        + MemberRepository
        + ChildRepository
        + ExpenseRepository
        + InviteRepository
        + InviteAttemptRepository
        + EventRepository
{
}

pub mod in_memory;
