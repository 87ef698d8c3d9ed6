use crate::config::Config;
use crate::core::balance::{self, Balances, SplitMode, Transfer};
use crate::core::calendar::{self, AgendaView, CalendarEvent, MonthGrid, SeenIndex, WeekView};
use crate::core::clock::{Clock, SystemClock};
use crate::core::constants::{
    BALANCES_QUERIED, CHILD_ADDED, DEN_CREATED, DEN_TIMEZONE_CHANGED, EVENT_CREATED, EVENT_UPDATED, EXPENSE_ADDED,
    EXPENSE_SETTLED, INVITE_CREATED, INVITE_MAX_GENERATION_ATTEMPTS, INVITE_REVOKED, JOIN_REJECTED, MEMBER_JOINED,
    SPLIT_PERCENTAGES_UPDATED,
};
use crate::core::errors::DenError;
use crate::core::invites::{CodeGenerator, UuidCodeGenerator, is_well_formed, normalize_code};
use crate::core::models::{AppLog, Child, Den, Event, EventView, Expense, Invite, InviteAttempt, Member, Role};
use crate::core::timezone::{DenZone, StoredTime, resolve_zone, to_local, to_utc};
use crate::infrastructure::cache::Cache;
use crate::infrastructure::logging::LoggingService;
use crate::infrastructure::storage::Storage;
use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use chrono_tz::Tz;
use log::{debug, info, warn};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

const MAX_EXPENSE_AMOUNT: i64 = 1_000_000;

#[derive(Clone, Debug, Deserialize, ToSchema)]
pub struct NewExpense {
    pub amount: Decimal,
    pub paid_by: String,
    pub description: String,
    #[serde(default)]
    pub child_ids: Vec<String>,
}

/// Event input in den-local wall-clock time.
#[derive(Clone, Debug, Deserialize, ToSchema)]
pub struct NewEvent {
    pub title: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    #[serde(default)]
    pub all_day: bool,
    #[serde(default)]
    pub child_ids: Vec<String>,
}

#[derive(Clone, Debug, Default, Deserialize, ToSchema)]
pub struct EventUpdate {
    pub title: Option<String>,
    pub start: Option<NaiveDateTime>,
    pub end: Option<NaiveDateTime>,
    pub all_day: Option<bool>,
    pub child_ids: Option<Vec<String>>,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum SplitKind {
    Equal,
    Weighted,
}

impl SplitKind {
    fn of(mode: &SplitMode) -> Self {
        match mode {
            SplitMode::Equal(_) => SplitKind::Equal,
            SplitMode::Weighted(_) => SplitKind::Weighted,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct DenBalances {
    pub den_id: String,
    pub split: SplitKind,
    pub outstanding_total: Decimal,
    #[schema(value_type = Object)]
    pub balances: Balances,
    pub transfers: Vec<Transfer>,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ExpenseShares {
    pub expense_id: String,
    pub split: SplitKind,
    #[schema(value_type = Object)]
    pub shares: Balances,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
#[serde(tag = "status", content = "member", rename_all = "snake_case")]
pub enum JoinOutcome {
    Joined(Member),
    /// The user was already in the den; the invite is left unused.
    AlreadyMember(Member),
}

pub struct DenService<S: Storage, L: LoggingService, C: Cache> {
    storage: S,
    logging: L,
    cache: C,
    clock: Arc<dyn Clock>,
    codes: Arc<dyn CodeGenerator>,
    config: Config,
}

impl<S: Storage, L: LoggingService, C: Cache> DenService<S, L, C> {
    pub fn new(storage: S, logging: L, cache: C) -> Self {
        info!("Initializing DenService");
        DenService {
            storage,
            logging,
            cache,
            clock: Arc::new(SystemClock),
            codes: Arc::new(UuidCodeGenerator),
            config: Config::default(),
        }
    }

    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_code_generator(mut self, codes: Arc<dyn CodeGenerator>) -> Self {
        self.codes = codes;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    async fn log_and_audit(
        &self,
        den_id: Option<&str>,
        action: &str,
        details: serde_json::Value,
        user_id: Option<&str>,
    ) -> Result<(), DenError> {
        debug!("Audit {} den={:?} user={:?}", action, den_id, user_id);
        self.logging.log_action(action, den_id, details, user_id).await
    }

    fn validate_string_input(&self, field: &str, value: &str, max_length: usize) -> Result<(), DenError> {
        if value.trim().is_empty() {
            return Err(DenError::invalid_input(
                field,
                &format!("Invalid {}", field),
                format!("{} cannot be empty", field),
            ));
        }
        if value.chars().count() > max_length {
            return Err(DenError::invalid_input(
                field,
                &format!("{} Too Long", field),
                format!("{} cannot exceed {} characters", field, max_length),
            ));
        }
        if value.chars().any(|c| c.is_control() || "<>{}[]".contains(c)) {
            return Err(DenError::invalid_input(
                field,
                &format!("Invalid {}", field),
                format!("{} contains invalid characters", field),
            ));
        }
        Ok(())
    }

    fn validate_amount_input(&self, field: &str, amount: Decimal) -> Result<(), DenError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(DenError::invalid_input(field, "Invalid Amount", "Amount cannot be negative"));
        }
        if amount > Decimal::from(MAX_EXPENSE_AMOUNT) {
            return Err(DenError::invalid_input(
                field,
                "Amount Too Large",
                format!("Amount cannot exceed {}", MAX_EXPENSE_AMOUNT),
            ));
        }
        if amount.normalize().scale() > 2 {
            return Err(DenError::invalid_input(
                field,
                "Invalid Amount",
                "Amount cannot have more than 2 decimal places",
            ));
        }
        Ok(())
    }

    fn validate_timezone(&self, timezone: Option<&str>) -> Result<Option<String>, DenError> {
        match timezone.map(str::trim).filter(|tz| !tz.is_empty()) {
            None => Ok(None),
            Some(name) => name
                .parse::<Tz>()
                .map(|tz| Some(tz.name().to_string()))
                .map_err(|_| DenError::InvalidTimeZone(name.to_string())),
        }
    }

    async fn get_den_or_err(&self, den_id: &str) -> Result<Den, DenError> {
        self.storage
            .get_den(den_id)
            .await?
            .ok_or_else(|| DenError::DenNotFound(den_id.to_string()))
    }

    async fn require_member(&self, den_id: &str, user_id: &str) -> Result<Member, DenError> {
        self.get_den_or_err(den_id).await?;
        self.storage
            .get_member(den_id, user_id)
            .await?
            .ok_or_else(|| DenError::NotDenMember(user_id.to_string()))
    }

    async fn require_parent(&self, den_id: &str, user_id: &str) -> Result<Member, DenError> {
        let member = self.require_member(den_id, user_id).await?;
        if !member.is_parent() {
            warn!("User {} attempted a parent-only action in den {}", user_id, den_id);
            return Err(DenError::NotDenParent(user_id.to_string()));
        }
        Ok(member)
    }

    async fn cached_members(&self, den_id: &str) -> Result<Vec<Member>, DenError> {
        if let Some(members) = self.cache.get_members(den_id).await? {
            return Ok(members);
        }
        let members = self.storage.list_members(den_id).await?;
        self.cache
            .save_members(
                den_id,
                &members,
                std::time::Duration::from_secs(self.config.member_cache_ttl_secs),
            )
            .await?;
        Ok(members)
    }

    async fn validate_child_ids(&self, den_id: &str, child_ids: &[String]) -> Result<(), DenError> {
        if child_ids.is_empty() {
            return Ok(());
        }
        let known: HashSet<String> = self
            .storage
            .list_children(den_id)
            .await?
            .into_iter()
            .map(|c| c.id)
            .collect();
        if let Some(unknown) = child_ids.iter().find(|id| !known.contains(*id)) {
            return Err(DenError::invalid_input(
                "child_ids",
                "Unknown Child",
                format!("Child {} does not belong to den {}", unknown, den_id),
            ));
        }
        Ok(())
    }

    // DENS

    pub async fn create_den(&self, name: String, timezone: Option<String>, creator_id: &str) -> Result<Den, DenError> {
        self.validate_string_input("name", &name, 100)?;
        let timezone = self.validate_timezone(timezone.as_deref())?;
        let now = self.clock.now();

        let den = Den {
            id: Uuid::new_v4().to_string(),
            name,
            timezone,
            created_at: now,
        };
        self.storage.save_den(den.clone()).await?;
        self.storage
            .save_member(Member {
                den_id: den.id.clone(),
                user_id: creator_id.to_string(),
                role: Role::Parent,
                split_percentage: None,
                joined_at: now,
            })
            .await?;
        info!("Den {} created by {}", den.id, creator_id);

        self.log_and_audit(
            Some(&den.id),
            DEN_CREATED,
            json!({ "den_id": den.id, "name": den.name, "timezone": den.timezone }),
            Some(creator_id),
        )
        .await?;
        Ok(den)
    }

    pub async fn get_den(&self, den_id: &str, acting_user_id: &str) -> Result<Den, DenError> {
        self.require_member(den_id, acting_user_id).await?;
        self.get_den_or_err(den_id).await
    }

    pub async fn set_den_timezone(
        &self,
        den_id: &str,
        timezone: Option<String>,
        acting_user_id: &str,
    ) -> Result<Den, DenError> {
        self.require_parent(den_id, acting_user_id).await?;
        let mut den = self.get_den_or_err(den_id).await?;
        let old = den.timezone.clone();
        den.timezone = self.validate_timezone(timezone.as_deref())?;
        self.storage.save_den(den.clone()).await?;

        self.log_and_audit(
            Some(den_id),
            DEN_TIMEZONE_CHANGED,
            json!({ "den_id": den_id, "old": old, "new": den.timezone }),
            Some(acting_user_id),
        )
        .await?;
        Ok(den)
    }

    /// The den's zone, then the configured default, then the host zone.
    pub async fn den_zone(&self, den_id: &str) -> Result<DenZone, DenError> {
        let den = self.get_den_or_err(den_id).await?;
        let name = den.timezone.or_else(|| self.config.default_timezone.clone());
        Ok(resolve_zone(name.as_deref()))
    }

    // MEMBERS AND CHILDREN

    pub async fn list_members(&self, den_id: &str, acting_user_id: &str) -> Result<Vec<Member>, DenError> {
        self.require_member(den_id, acting_user_id).await?;
        self.cached_members(den_id).await
    }

    /// Assigns custom split percentages to every member; an empty map goes
    /// back to equal splitting.
    pub async fn set_split_percentages(
        &self,
        den_id: &str,
        percentages: BTreeMap<String, Decimal>,
        acting_user_id: &str,
    ) -> Result<Vec<Member>, DenError> {
        self.require_parent(den_id, acting_user_id).await?;
        let members = self.storage.list_members(den_id).await?;

        if !percentages.is_empty() {
            if let Some(stranger) = percentages.keys().find(|id| !members.iter().any(|m| &m.user_id == *id)) {
                return Err(DenError::InvalidSplitUser(stranger.clone()));
            }
            if let Some(missing) = members.iter().find(|m| !percentages.contains_key(&m.user_id)) {
                return Err(DenError::InvalidSplitUser(missing.user_id.clone()));
            }
            balance::validate_percentages(&percentages)?;
        }

        let mut updated = Vec::with_capacity(members.len());
        for mut member in members {
            member.split_percentage = percentages.get(&member.user_id).copied();
            self.storage.save_member(member.clone()).await?;
            updated.push(member);
        }
        self.cache.invalidate_members(den_id).await?;

        self.log_and_audit(
            Some(den_id),
            SPLIT_PERCENTAGES_UPDATED,
            json!({ "den_id": den_id, "percentages": percentages }),
            Some(acting_user_id),
        )
        .await?;
        Ok(updated)
    }

    pub async fn add_child(
        &self,
        den_id: &str,
        name: String,
        birth_date: Option<NaiveDate>,
        acting_user_id: &str,
    ) -> Result<Child, DenError> {
        self.require_parent(den_id, acting_user_id).await?;
        self.validate_string_input("name", &name, 100)?;
        let child = Child {
            id: Uuid::new_v4().to_string(),
            den_id: den_id.to_string(),
            name,
            birth_date,
        };
        self.storage.save_child(child.clone()).await?;

        self.log_and_audit(
            Some(den_id),
            CHILD_ADDED,
            json!({ "child_id": child.id, "name": child.name }),
            Some(acting_user_id),
        )
        .await?;
        Ok(child)
    }

    pub async fn list_children(&self, den_id: &str, acting_user_id: &str) -> Result<Vec<Child>, DenError> {
        self.require_member(den_id, acting_user_id).await?;
        self.storage.list_children(den_id).await
    }

    // EXPENSES

    pub async fn add_expense(
        &self,
        den_id: &str,
        expense: NewExpense,
        acting_user_id: &str,
    ) -> Result<Expense, DenError> {
        self.require_member(den_id, acting_user_id).await?;
        self.validate_amount_input("amount", expense.amount)?;
        self.validate_string_input("description", &expense.description, 200)?;
        if self.storage.get_member(den_id, &expense.paid_by).await?.is_none() {
            return Err(DenError::InvalidSplitUser(expense.paid_by));
        }
        self.validate_child_ids(den_id, &expense.child_ids).await?;

        let created = Expense {
            id: Uuid::new_v4().to_string(),
            den_id: den_id.to_string(),
            amount: expense.amount,
            paid_by: expense.paid_by,
            description: expense.description,
            child_ids: expense.child_ids,
            created_at: self.clock.now(),
            settled_at: None,
        };
        self.storage.save_expense(created.clone()).await?;

        self.log_and_audit(
            Some(den_id),
            EXPENSE_ADDED,
            json!({
                "expense_id": created.id,
                "amount": created.amount.to_string(),
                "paid_by": created.paid_by
            }),
            Some(acting_user_id),
        )
        .await?;
        Ok(created)
    }

    pub async fn settle_expense(&self, expense_id: &str, acting_user_id: &str) -> Result<Expense, DenError> {
        let mut expense = self
            .storage
            .get_expense(expense_id)
            .await?
            .ok_or_else(|| DenError::ExpenseNotFound(expense_id.to_string()))?;
        self.require_member(&expense.den_id, acting_user_id).await?;
        if !expense.is_outstanding() {
            return Err(DenError::ExpenseAlreadySettled(expense_id.to_string()));
        }

        expense.settled_at = Some(self.clock.now());
        self.storage.save_expense(expense.clone()).await?;

        self.log_and_audit(
            Some(&expense.den_id),
            EXPENSE_SETTLED,
            json!({ "expense_id": expense.id }),
            Some(acting_user_id),
        )
        .await?;
        Ok(expense)
    }

    pub async fn list_expenses(&self, den_id: &str, acting_user_id: &str) -> Result<Vec<Expense>, DenError> {
        self.require_member(den_id, acting_user_id).await?;
        self.storage.list_expenses(den_id).await
    }

    /// Each member's portion of one expense under the den's current split.
    pub async fn expense_shares(&self, expense_id: &str, acting_user_id: &str) -> Result<ExpenseShares, DenError> {
        let expense = self
            .storage
            .get_expense(expense_id)
            .await?
            .ok_or_else(|| DenError::ExpenseNotFound(expense_id.to_string()))?;
        self.require_member(&expense.den_id, acting_user_id).await?;
        let members = self.cached_members(&expense.den_id).await?;
        let mode = SplitMode::for_members(&members);
        Ok(ExpenseShares {
            expense_id: expense.id,
            split: SplitKind::of(&mode),
            shares: balance::round_balances(&mode.shares(expense.amount)),
        })
    }

    /// Balances over outstanding expenses, weighted when every member has a
    /// custom percentage.
    pub async fn den_balances(&self, den_id: &str, acting_user_id: &str) -> Result<DenBalances, DenError> {
        self.require_member(den_id, acting_user_id).await?;
        let members = self.cached_members(den_id).await?;
        let outstanding: Vec<Expense> = self
            .storage
            .list_expenses(den_id)
            .await?
            .into_iter()
            .filter(Expense::is_outstanding)
            .collect();

        let payments: Vec<(Decimal, &str)> = outstanding.iter().map(|e| (e.amount, e.paid_by.as_str())).collect();
        let mode = SplitMode::for_members(&members);
        let raw = mode.balances(&payments);

        let response = DenBalances {
            den_id: den_id.to_string(),
            split: SplitKind::of(&mode),
            outstanding_total: payments.iter().map(|(amount, _)| *amount).sum(),
            balances: balance::round_balances(&raw),
            transfers: balance::suggest_transfers(&raw),
        };

        self.log_and_audit(
            Some(den_id),
            BALANCES_QUERIED,
            json!({ "den_id": den_id, "expenses": outstanding.len() }),
            Some(acting_user_id),
        )
        .await?;
        Ok(response)
    }

    // INVITES

    pub async fn create_invite(&self, den_id: &str, acting_user_id: &str, role: Role) -> Result<Invite, DenError> {
        self.require_parent(den_id, acting_user_id).await?;

        let length = self.config.invite_code_length;
        let mut code = None;
        for _ in 0..INVITE_MAX_GENERATION_ATTEMPTS {
            let candidate = normalize_code(&self.codes.generate(length));
            if !self.storage.code_exists(&candidate).await? {
                code = Some(candidate);
                break;
            }
            debug!("Invite code collision, regenerating");
        }
        let code = code.ok_or(DenError::InviteCodeExhausted(INVITE_MAX_GENERATION_ATTEMPTS))?;

        let now = self.clock.now();
        let invite = Invite {
            id: Uuid::new_v4().to_string(),
            den_id: den_id.to_string(),
            code,
            role,
            created_by: acting_user_id.to_string(),
            created_at: now,
            expires_at: now + Duration::days(self.config.invite_expiry_days),
            used_by: None,
            used_at: None,
        };
        self.storage.save_invite(invite.clone()).await?;

        self.log_and_audit(
            Some(den_id),
            INVITE_CREATED,
            json!({ "invite_id": invite.id, "role": invite.role, "expires_at": invite.expires_at }),
            Some(acting_user_id),
        )
        .await?;
        Ok(invite)
    }

    /// Returns the invite when the code is known, unexpired and unused.
    /// Storage failures read as "no such invite".
    pub async fn validate_code(&self, code: &str) -> Option<Invite> {
        let normalized = normalize_code(code);
        if !is_well_formed(&normalized, self.config.invite_code_length) {
            debug!("Rejecting malformed invite code without lookup");
            return None;
        }
        match self.storage.find_invite_by_code(&normalized).await {
            Ok(found) => found.filter(|invite| invite.is_valid_at(self.clock.now())),
            Err(e) => {
                // TODO: decide whether invite lookups should fail closed once storage reports outages distinctly
                warn!("Invite lookup failed, treating code as unknown: {}", e);
                None
            }
        }
    }

    /// Failed join attempts by `user_id` in the trailing window. Storage
    /// failures read as zero.
    pub async fn failed_attempts_count(&self, user_id: &str, window_minutes: i64) -> usize {
        let since = self.clock.now() - Duration::minutes(window_minutes);
        match self.storage.list_attempts_since(user_id, since).await {
            Ok(attempts) => attempts.iter().filter(|a| !a.success).count(),
            Err(e) => {
                warn!("Attempt lookup failed, assuming no prior failures: {}", e);
                0
            }
        }
    }

    pub async fn join_den(&self, code: &str, user_id: &str) -> Result<JoinOutcome, DenError> {
        let window = self.config.rate_limit_window_minutes;
        let failures = self.failed_attempts_count(user_id, window).await;
        if failures >= self.config.rate_limit_max_failures {
            warn!("User {} rate limited after {} failed join attempts", user_id, failures);
            self.log_and_audit(
                None,
                JOIN_REJECTED,
                json!({ "reason": "rate_limited", "failures": failures }),
                Some(user_id),
            )
            .await?;
            return Err(DenError::RateLimited(window));
        }

        let normalized = normalize_code(code);
        let invite = self.validate_code(&normalized).await;
        let now = self.clock.now();
        self.storage
            .log_attempt(InviteAttempt {
                id: Uuid::new_v4().to_string(),
                user_id: user_id.to_string(),
                code: normalized,
                success: invite.is_some(),
                attempted_at: now,
            })
            .await?;

        let Some(invite) = invite else {
            return Err(DenError::InvalidInviteCode);
        };

        if let Some(existing) = self.storage.get_member(&invite.den_id, user_id).await? {
            debug!("User {} already in den {}", user_id, invite.den_id);
            return Ok(JoinOutcome::AlreadyMember(existing));
        }

        match self.storage.mark_invite_used(&invite.id, user_id, now).await {
            Ok(_) => {}
            Err(DenError::InviteAlreadyUsed(_)) => return Err(DenError::InvalidInviteCode),
            Err(e) => return Err(e),
        }

        let member = Member {
            den_id: invite.den_id.clone(),
            user_id: user_id.to_string(),
            role: invite.role,
            split_percentage: None,
            joined_at: now,
        };
        self.storage.save_member(member.clone()).await?;
        self.cache.invalidate_members(&invite.den_id).await?;
        info!("User {} joined den {} as {}", user_id, invite.den_id, invite.role);

        self.log_and_audit(
            Some(&invite.den_id),
            MEMBER_JOINED,
            json!({ "invite_id": invite.id, "user_id": user_id, "role": invite.role }),
            Some(user_id),
        )
        .await?;
        Ok(JoinOutcome::Joined(member))
    }

    pub async fn list_active_invites(&self, den_id: &str, acting_user_id: &str) -> Result<Vec<Invite>, DenError> {
        self.require_parent(den_id, acting_user_id).await?;
        let now = self.clock.now();
        Ok(self
            .storage
            .list_invites(den_id)
            .await?
            .into_iter()
            .filter(|i| i.is_valid_at(now))
            .collect())
    }

    /// Expires the invite immediately.
    pub async fn revoke_invite(&self, invite_id: &str, acting_user_id: &str) -> Result<Invite, DenError> {
        let mut invite = self
            .storage
            .get_invite(invite_id)
            .await?
            .ok_or_else(|| DenError::InviteNotFound(invite_id.to_string()))?;
        self.require_parent(&invite.den_id, acting_user_id).await?;

        let now = self.clock.now();
        if invite.expires_at > now {
            invite.expires_at = now;
            self.storage.save_invite(invite.clone()).await?;
        }

        self.log_and_audit(
            Some(&invite.den_id),
            INVITE_REVOKED,
            json!({ "invite_id": invite.id }),
            Some(acting_user_id),
        )
        .await?;
        Ok(invite)
    }

    // EVENTS

    fn normalize_event_range(
        start: NaiveDateTime,
        end: NaiveDateTime,
        all_day: bool,
    ) -> Result<(NaiveDateTime, NaiveDateTime), DenError> {
        if end < start {
            return Err(DenError::InvalidEventRange);
        }
        if all_day {
            return Ok((start.date().and_time(NaiveTime::MIN), end.date().and_time(NaiveTime::MIN)));
        }
        Ok((start, end))
    }

    pub async fn create_event(&self, den_id: &str, event: NewEvent, acting_user_id: &str) -> Result<Event, DenError> {
        self.require_member(den_id, acting_user_id).await?;
        self.validate_string_input("title", &event.title, 200)?;
        self.validate_child_ids(den_id, &event.child_ids).await?;
        let (start, end) = Self::normalize_event_range(event.start, event.end, event.all_day)?;
        let zone = self.den_zone(den_id).await?;

        let created = Event {
            id: Uuid::new_v4().to_string(),
            den_id: den_id.to_string(),
            title: event.title,
            starts_at: to_utc(start, &zone),
            ends_at: to_utc(end, &zone),
            all_day: event.all_day,
            child_ids: event.child_ids,
            created_by: acting_user_id.to_string(),
            updated_at: self.clock.now(),
        };
        self.storage.save_event(created.clone()).await?;

        self.log_and_audit(
            Some(den_id),
            EVENT_CREATED,
            json!({ "event_id": created.id, "zone": zone.name() }),
            Some(acting_user_id),
        )
        .await?;
        Ok(created)
    }

    pub async fn update_event(
        &self,
        event_id: &str,
        update: EventUpdate,
        acting_user_id: &str,
    ) -> Result<Event, DenError> {
        let mut event = self
            .storage
            .get_event(event_id)
            .await?
            .ok_or_else(|| DenError::EventNotFound(event_id.to_string()))?;
        self.require_member(&event.den_id, acting_user_id).await?;
        let zone = self.den_zone(&event.den_id).await?;

        if let Some(title) = update.title {
            self.validate_string_input("title", &title, 200)?;
            event.title = title;
        }
        if let Some(child_ids) = update.child_ids {
            self.validate_child_ids(&event.den_id, &child_ids).await?;
            event.child_ids = child_ids;
        }
        let all_day = update.all_day.unwrap_or(event.all_day);
        let start = update
            .start
            .unwrap_or_else(|| to_local(StoredTime::Utc(event.starts_at), &zone));
        let end = update
            .end
            .unwrap_or_else(|| to_local(StoredTime::Utc(event.ends_at), &zone));
        let (start, end) = Self::normalize_event_range(start, end, all_day)?;
        event.starts_at = to_utc(start, &zone);
        event.ends_at = to_utc(end, &zone);
        event.all_day = all_day;
        event.updated_at = self.clock.now();
        self.storage.save_event(event.clone()).await?;

        self.log_and_audit(
            Some(&event.den_id),
            EVENT_UPDATED,
            json!({ "event_id": event.id }),
            Some(acting_user_id),
        )
        .await?;
        Ok(event)
    }

    pub async fn get_event(&self, event_id: &str, acting_user_id: &str) -> Result<Event, DenError> {
        let event = self
            .storage
            .get_event(event_id)
            .await?
            .ok_or_else(|| DenError::EventNotFound(event_id.to_string()))?;
        self.require_member(&event.den_id, acting_user_id).await?;
        Ok(event)
    }

    /// Reads a client timestamp as den-local time. Input carrying an offset
    /// is converted into the den's zone; naive input is taken as is.
    pub async fn parse_local_time(&self, den_id: &str, field: &str, raw: &str) -> Result<NaiveDateTime, DenError> {
        let stored = StoredTime::parse(raw).ok_or_else(|| {
            DenError::invalid_input(field, "Invalid Time", format!("'{}' is not a recognised timestamp", raw))
        })?;
        let zone = self.den_zone(den_id).await?;
        Ok(to_local(stored, &zone))
    }

    pub async fn mark_event_seen(&self, event_id: &str, acting_user_id: &str) -> Result<EventView, DenError> {
        let event = self
            .storage
            .get_event(event_id)
            .await?
            .ok_or_else(|| DenError::EventNotFound(event_id.to_string()))?;
        self.require_member(&event.den_id, acting_user_id).await?;
        let view = EventView {
            user_id: acting_user_id.to_string(),
            event_id: event.id,
            seen_at: self.clock.now(),
        };
        self.storage.save_event_view(view.clone()).await?;
        Ok(view)
    }

    /// Den events overlapping `[from, to)` in local dates, converted to local
    /// time, plus what the user has seen.
    async fn calendar_events(
        &self,
        den_id: &str,
        acting_user_id: &str,
        from: NaiveDate,
        to: NaiveDate,
        child_id: Option<&str>,
    ) -> Result<(Vec<CalendarEvent>, SeenIndex), DenError> {
        self.require_member(den_id, acting_user_id).await?;
        let zone = self.den_zone(den_id).await?;
        let from_utc = to_utc(from.and_time(NaiveTime::MIN), &zone);
        let to_utc_bound = to_utc(to.and_time(NaiveTime::MIN), &zone);

        let mut events: Vec<CalendarEvent> = self
            .storage
            .list_events_between(den_id, from_utc, to_utc_bound)
            .await?
            .into_iter()
            .map(|e| CalendarEvent {
                start: to_local(StoredTime::Utc(e.starts_at), &zone),
                end: to_local(StoredTime::Utc(e.ends_at), &zone),
                id: e.id,
                title: e.title,
                all_day: e.all_day,
                child_ids: e.child_ids,
                updated_at: e.updated_at,
            })
            .collect();

        if let Some(child_id) = child_id {
            let known: HashSet<String> = self
                .storage
                .list_children(den_id)
                .await?
                .into_iter()
                .map(|c| c.id)
                .collect();
            events = calendar::filter_by_child(&events, child_id, &known);
        }

        let seen: SeenIndex = self
            .storage
            .list_event_views(acting_user_id)
            .await?
            .into_iter()
            .map(|v| (v.event_id, v.seen_at))
            .collect();
        Ok((events, seen))
    }

    pub async fn month_view(
        &self,
        den_id: &str,
        acting_user_id: &str,
        year: i32,
        month: u32,
        child_id: Option<&str>,
    ) -> Result<MonthGrid, DenError> {
        let window = calendar::CalendarWindow::month(year, month, self.config.week_start).ok_or_else(|| {
            DenError::invalid_input("month", "Invalid Month", format!("{}-{} is not a calendar month", year, month))
        })?;
        let (events, seen) = self
            .calendar_events(den_id, acting_user_id, window.start, window.end() + Duration::days(1), child_id)
            .await?;
        calendar::build_month(year, month, self.config.week_start, &events, &seen)
            .ok_or_else(|| DenError::InternalServerError("month grid could not be built".to_string()))
    }

    pub async fn week_view(
        &self,
        den_id: &str,
        acting_user_id: &str,
        date: NaiveDate,
        child_id: Option<&str>,
    ) -> Result<WeekView, DenError> {
        let window = calendar::CalendarWindow::week(date, self.config.week_start);
        let (events, seen) = self
            .calendar_events(den_id, acting_user_id, window.start, window.end() + Duration::days(1), child_id)
            .await?;
        Ok(calendar::build_week(date, self.config.week_start, &events, &seen))
    }

    pub async fn agenda_view(
        &self,
        den_id: &str,
        acting_user_id: &str,
        date: NaiveDate,
        child_id: Option<&str>,
    ) -> Result<AgendaView, DenError> {
        let window = calendar::CalendarWindow::agenda(date);
        let (events, seen) = self
            .calendar_events(den_id, acting_user_id, window.start, window.end() + Duration::days(1), child_id)
            .await?;
        Ok(calendar::build_agenda(date, &events, &seen))
    }

    /// Today's date in the den's zone.
    pub async fn den_today(&self, den_id: &str) -> Result<NaiveDate, DenError> {
        let zone = self.den_zone(den_id).await?;
        Ok(to_local(StoredTime::Utc(self.clock.now()), &zone).date())
    }

    // AUDIT

    pub async fn get_den_logs(&self, den_id: &str, acting_user_id: &str) -> Result<Vec<AppLog>, DenError> {
        self.require_parent(den_id, acting_user_id).await?;
        self.logging.get_den_logs(den_id).await
    }

    pub async fn get_app_logs(&self) -> Result<Vec<AppLog>, DenError> {
        self.logging.get_logs().await
    }
}
