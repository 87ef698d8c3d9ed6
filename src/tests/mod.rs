mod calendar_tests;
mod invite_tests;

use crate::config::Config;
use crate::core::clock::ManualClock;
use crate::core::errors::DenError;
use crate::core::models::{Child, Den, Event, EventView, Expense, Invite, InviteAttempt, Member};
use crate::core::services::DenService;
use crate::infrastructure::cache::in_memory::InMemoryCache;
use crate::infrastructure::logging::in_memory::InMemoryLogging;
use crate::infrastructure::storage::in_memory::InMemoryStorage;
use crate::infrastructure::storage::{
    ChildRepository, DenRepository, EventRepository, ExpenseRepository, InviteAttemptRepository, InviteRepository,
    MemberRepository,
};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

pub type TestService = DenService<InMemoryStorage, InMemoryLogging, InMemoryCache>;

pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 4, 9, 0, 0).unwrap()
}

pub fn test_config() -> Config {
    Config {
        default_timezone: Some("UTC".to_string()),
        ..Config::default()
    }
}

pub type FlakyService = DenService<FlakyStorage, InMemoryLogging, InMemoryCache>;

pub fn create_flaky_service() -> (FlakyService, FlakyStorage, Arc<ManualClock>) {
    let _ = env_logger::try_init();
    let storage = FlakyStorage::default();
    let clock = Arc::new(ManualClock::new(start_time()));
    let service = DenService::new(storage.clone(), InMemoryLogging::new(), InMemoryCache::new())
        .with_config(test_config())
        .with_clock(clock.clone());
    (service, storage, clock)
}

pub fn create_test_service() -> (TestService, Arc<ManualClock>, InMemoryLogging) {
    let _ = env_logger::try_init();
    let clock = Arc::new(ManualClock::new(start_time()));
    let logging = InMemoryLogging::new();
    let service = DenService::new(InMemoryStorage::new(), logging.clone(), InMemoryCache::new())
        .with_config(test_config())
        .with_clock(clock.clone());
    (service, clock, logging)
}

/// In-memory storage whose invite and attempt reads can be switched to fail.
/// Also counts invite code lookups.
#[derive(Clone, Default)]
pub struct FlakyStorage {
    inner: InMemoryStorage,
    fail_reads: Arc<AtomicBool>,
    lookups: Arc<AtomicUsize>,
}

impl FlakyStorage {
    pub fn invite_lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    pub fn set_failing(&self, failing: bool) {
        self.fail_reads.store(failing, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), DenError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(DenError::StorageError("backend unavailable".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl DenRepository for FlakyStorage {
    async fn save_den(&self, den: Den) -> Result<(), DenError> {
        self.inner.save_den(den).await
    }

    async fn get_den(&self, den_id: &str) -> Result<Option<Den>, DenError> {
        self.inner.get_den(den_id).await
    }
}

#[async_trait]
impl MemberRepository for FlakyStorage {
    async fn save_member(&self, member: Member) -> Result<(), DenError> {
        self.inner.save_member(member).await
    }

    async fn get_member(&self, den_id: &str, user_id: &str) -> Result<Option<Member>, DenError> {
        self.inner.get_member(den_id, user_id).await
    }

    async fn list_members(&self, den_id: &str) -> Result<Vec<Member>, DenError> {
        self.inner.list_members(den_id).await
    }
}

#[async_trait]
impl ChildRepository for FlakyStorage {
    async fn save_child(&self, child: Child) -> Result<(), DenError> {
        self.inner.save_child(child).await
    }

    async fn list_children(&self, den_id: &str) -> Result<Vec<Child>, DenError> {
        self.inner.list_children(den_id).await
    }
}

#[async_trait]
impl ExpenseRepository for FlakyStorage {
    async fn save_expense(&self, expense: Expense) -> Result<(), DenError> {
        self.inner.save_expense(expense).await
    }

    async fn get_expense(&self, expense_id: &str) -> Result<Option<Expense>, DenError> {
        self.inner.get_expense(expense_id).await
    }

    async fn list_expenses(&self, den_id: &str) -> Result<Vec<Expense>, DenError> {
        self.inner.list_expenses(den_id).await
    }
}

#[async_trait]
impl InviteRepository for FlakyStorage {
    async fn save_invite(&self, invite: Invite) -> Result<(), DenError> {
        self.inner.save_invite(invite).await
    }

    async fn get_invite(&self, invite_id: &str) -> Result<Option<Invite>, DenError> {
        self.inner.get_invite(invite_id).await
    }

    async fn find_invite_by_code(&self, code: &str) -> Result<Option<Invite>, DenError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        self.inner.find_invite_by_code(code).await
    }

    async fn code_exists(&self, code: &str) -> Result<bool, DenError> {
        self.inner.code_exists(code).await
    }

    async fn list_invites(&self, den_id: &str) -> Result<Vec<Invite>, DenError> {
        self.inner.list_invites(den_id).await
    }

    async fn mark_invite_used(&self, invite_id: &str, user_id: &str, at: DateTime<Utc>) -> Result<Invite, DenError> {
        self.inner.mark_invite_used(invite_id, user_id, at).await
    }
}

#[async_trait]
impl InviteAttemptRepository for FlakyStorage {
    async fn log_attempt(&self, attempt: InviteAttempt) -> Result<(), DenError> {
        self.inner.log_attempt(attempt).await
    }

    async fn list_attempts_since(&self, user_id: &str, since: DateTime<Utc>) -> Result<Vec<InviteAttempt>, DenError> {
        self.check()?;
        self.inner.list_attempts_since(user_id, since).await
    }
}

#[async_trait]
impl EventRepository for FlakyStorage {
    async fn save_event(&self, event: Event) -> Result<(), DenError> {
        self.inner.save_event(event).await
    }

    async fn get_event(&self, event_id: &str) -> Result<Option<Event>, DenError> {
        self.inner.get_event(event_id).await
    }

    async fn list_events_between(
        &self,
        den_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Event>, DenError> {
        self.inner.list_events_between(den_id, from, to).await
    }

    async fn save_event_view(&self, view: EventView) -> Result<(), DenError> {
        self.inner.save_event_view(view).await
    }

    async fn list_event_views(&self, user_id: &str) -> Result<Vec<EventView>, DenError> {
        self.inner.list_event_views(user_id).await
    }
}
