use crate::core::errors::DenError;
use crate::core::models::{Child, Den, Event, EventView, Expense, Invite, InviteAttempt, Member};
use crate::infrastructure::storage::{
    ChildRepository, DenRepository, EventRepository, ExpenseRepository, InviteAttemptRepository, InviteRepository,
    MemberRepository,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Clone, Default)]
pub struct InMemoryStorage {
    dens: Arc<RwLock<HashMap<String, Den>>>,
    members: Arc<RwLock<HashMap<(String, String), Member>>>, // (den_id, user_id) -> member
    children: Arc<RwLock<HashMap<String, Child>>>,
    expenses: Arc<RwLock<HashMap<String, Expense>>>,
    invites: Arc<RwLock<HashMap<String, Invite>>>,
    invites_by_code: Arc<RwLock<HashMap<String, String>>>, // code -> invite_id
    attempts: Arc<RwLock<Vec<InviteAttempt>>>,
    events: Arc<RwLock<HashMap<String, Event>>>,
    event_views: Arc<RwLock<HashMap<(String, String), EventView>>>, // (user_id, event_id) -> view
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DenRepository for InMemoryStorage {
    async fn save_den(&self, den: Den) -> Result<(), DenError> {
        let mut dens = self.dens.write().await;
        dens.insert(den.id.clone(), den);
        Ok(())
    }

    async fn get_den(&self, den_id: &str) -> Result<Option<Den>, DenError> {
        let dens = self.dens.read().await;
        Ok(dens.get(den_id).cloned())
    }
}

#[async_trait]
impl MemberRepository for InMemoryStorage {
    async fn save_member(&self, member: Member) -> Result<(), DenError> {
        let mut members = self.members.write().await;
        members.insert((member.den_id.clone(), member.user_id.clone()), member);
        Ok(())
    }

    async fn get_member(&self, den_id: &str, user_id: &str) -> Result<Option<Member>, DenError> {
        let members = self.members.read().await;
        Ok(members.get(&(den_id.to_string(), user_id.to_string())).cloned())
    }

    async fn list_members(&self, den_id: &str) -> Result<Vec<Member>, DenError> {
        let members = self.members.read().await;
        let mut listed: Vec<Member> = members.values().filter(|m| m.den_id == den_id).cloned().collect();
        listed.sort_by(|a, b| a.joined_at.cmp(&b.joined_at).then_with(|| a.user_id.cmp(&b.user_id)));
        Ok(listed)
    }
}

#[async_trait]
impl ChildRepository for InMemoryStorage {
    async fn save_child(&self, child: Child) -> Result<(), DenError> {
        let mut children = self.children.write().await;
        children.insert(child.id.clone(), child);
        Ok(())
    }

    async fn list_children(&self, den_id: &str) -> Result<Vec<Child>, DenError> {
        let children = self.children.read().await;
        Ok(children.values().filter(|c| c.den_id == den_id).cloned().collect())
    }
}

#[async_trait]
impl ExpenseRepository for InMemoryStorage {
    async fn save_expense(&self, expense: Expense) -> Result<(), DenError> {
        let mut expenses = self.expenses.write().await;
        expenses.insert(expense.id.clone(), expense);
        Ok(())
    }

    async fn get_expense(&self, expense_id: &str) -> Result<Option<Expense>, DenError> {
        let expenses = self.expenses.read().await;
        Ok(expenses.get(expense_id).cloned())
    }

    async fn list_expenses(&self, den_id: &str) -> Result<Vec<Expense>, DenError> {
        let expenses = self.expenses.read().await;
        let mut listed: Vec<Expense> = expenses.values().filter(|e| e.den_id == den_id).cloned().collect();
        listed.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(listed)
    }
}

#[async_trait]
impl InviteRepository for InMemoryStorage {
    async fn save_invite(&self, invite: Invite) -> Result<(), DenError> {
        let mut invites = self.invites.write().await;
        let mut invites_by_code = self.invites_by_code.write().await;
        invites_by_code.insert(invite.code.clone(), invite.id.clone());
        invites.insert(invite.id.clone(), invite);
        Ok(())
    }

    async fn get_invite(&self, invite_id: &str) -> Result<Option<Invite>, DenError> {
        let invites = self.invites.read().await;
        Ok(invites.get(invite_id).cloned())
    }

    async fn find_invite_by_code(&self, code: &str) -> Result<Option<Invite>, DenError> {
        let invites = self.invites.read().await;
        let invites_by_code = self.invites_by_code.read().await;
        Ok(invites_by_code
            .get(code)
            .and_then(|invite_id| invites.get(invite_id).cloned()))
    }

    async fn code_exists(&self, code: &str) -> Result<bool, DenError> {
        let invites_by_code = self.invites_by_code.read().await;
        Ok(invites_by_code.contains_key(code))
    }

    async fn list_invites(&self, den_id: &str) -> Result<Vec<Invite>, DenError> {
        let invites = self.invites.read().await;
        let mut listed: Vec<Invite> = invites.values().filter(|i| i.den_id == den_id).cloned().collect();
        listed.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(listed)
    }

    async fn mark_invite_used(&self, invite_id: &str, user_id: &str, at: DateTime<Utc>) -> Result<Invite, DenError> {
        let mut invites = self.invites.write().await;
        let invite = invites
            .get_mut(invite_id)
            .ok_or_else(|| DenError::InviteNotFound(invite_id.to_string()))?;
        if invite.is_used() {
            return Err(DenError::InviteAlreadyUsed(invite_id.to_string()));
        }
        invite.used_by = Some(user_id.to_string());
        invite.used_at = Some(at);
        Ok(invite.clone())
    }
}

#[async_trait]
impl InviteAttemptRepository for InMemoryStorage {
    async fn log_attempt(&self, attempt: InviteAttempt) -> Result<(), DenError> {
        let mut attempts = self.attempts.write().await;
        attempts.push(attempt);
        Ok(())
    }

    async fn list_attempts_since(&self, user_id: &str, since: DateTime<Utc>) -> Result<Vec<InviteAttempt>, DenError> {
        let attempts = self.attempts.read().await;
        Ok(attempts
            .iter()
            .filter(|a| a.user_id == user_id && a.attempted_at >= since)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl EventRepository for InMemoryStorage {
    async fn save_event(&self, event: Event) -> Result<(), DenError> {
        let mut events = self.events.write().await;
        events.insert(event.id.clone(), event);
        Ok(())
    }

    async fn get_event(&self, event_id: &str) -> Result<Option<Event>, DenError> {
        let events = self.events.read().await;
        Ok(events.get(event_id).cloned())
    }

    async fn list_events_between(
        &self,
        den_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Event>, DenError> {
        let events = self.events.read().await;
        let mut listed: Vec<Event> = events
            .values()
            .filter(|e| e.den_id == den_id && e.starts_at < to && e.ends_at >= from)
            .cloned()
            .collect();
        listed.sort_by(|a, b| a.starts_at.cmp(&b.starts_at));
        Ok(listed)
    }

    async fn save_event_view(&self, view: EventView) -> Result<(), DenError> {
        let mut event_views = self.event_views.write().await;
        event_views.insert((view.user_id.clone(), view.event_id.clone()), view);
        Ok(())
    }

    async fn list_event_views(&self, user_id: &str) -> Result<Vec<EventView>, DenError> {
        let event_views = self.event_views.read().await;
        Ok(event_views.values().filter(|v| v.user_id == user_id).cloned().collect())
    }
}
