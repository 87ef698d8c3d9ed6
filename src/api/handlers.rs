use crate::{
    api::models::*,
    core::{
        calendar::{AgendaView, MonthGrid, WeekView},
        invites::format_code,
        models::{AppLog, Child, Den, Event, EventView, Expense, Invite, Member},
        services::{DenBalances, DenService, EventUpdate, ExpenseShares, JoinOutcome, NewEvent, NewExpense},
    },
    infrastructure::{
        cache::in_memory::InMemoryCache, logging::in_memory::InMemoryLogging, storage::in_memory::InMemoryStorage,
    },
};
use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post},
};
use std::sync::Arc;

pub type SharedService = Arc<DenService<InMemoryStorage, InMemoryLogging, InMemoryCache>>;

// Define API routes
pub fn api_routes(service: SharedService) -> Router {
    Router::new()
        .route("/dens", post(create_den))
        .route("/dens/{den_id}", get(get_den))
        .route("/dens/{den_id}/timezone", post(set_den_timezone))
        .route("/dens/{den_id}/members", get(list_members))
        .route("/dens/{den_id}/splits", post(set_split_percentages))
        .route("/dens/{den_id}/children", post(add_child).get(list_children))
        .route("/dens/{den_id}/expenses", post(add_expense).get(list_expenses))
        .route("/dens/{den_id}/balances", get(den_balances))
        .route("/dens/{den_id}/invites", post(create_invite).get(list_active_invites))
        .route("/dens/{den_id}/events", post(create_event))
        .route("/dens/{den_id}/calendar/month", get(month_view))
        .route("/dens/{den_id}/calendar/week", get(week_view))
        .route("/dens/{den_id}/calendar/agenda", get(agenda_view))
        .route("/dens/{den_id}/audits", get(den_audits))
        .route("/expenses/{expense_id}/settle", post(settle_expense))
        .route("/expenses/{expense_id}/shares", get(expense_shares))
        .route("/invites/{invite_id}/revoke", post(revoke_invite))
        .route("/invites/validate", post(validate_code))
        .route("/join", post(join_den))
        .route("/events/{event_id}", get(get_event).patch(update_event))
        .route("/events/{event_id}/seen", post(mark_event_seen))
        .route("/logs", get(get_app_logs))
        .with_state(service)
}

#[utoipa::path(
    post,
    path = "/api/dens",
    request_body = CreateDenRequest,
    responses(
        (status = 200, description = "Den created", body = Den),
        (status = 400, description = "Bad request", body = ErrorResponse)
    )
)]
pub async fn create_den(
    State(service): State<SharedService>,
    Json(req): Json<CreateDenRequest>,
) -> Result<Json<Den>, ApiError> {
    let den = service.create_den(req.name, req.timezone, &req.creator_id).await?;
    Ok(Json(den))
}

#[utoipa::path(
    get,
    path = "/api/dens/{den_id}",
    params(("den_id" = String, Path, description = "Den ID"), ActingUserQuery),
    responses(
        (status = 200, description = "Den", body = Den),
        (status = 403, description = "Not a den member", body = ErrorResponse),
        (status = 404, description = "Den not found", body = ErrorResponse)
    )
)]
pub async fn get_den(
    State(service): State<SharedService>,
    Path(den_id): Path<String>,
    Query(q): Query<ActingUserQuery>,
) -> Result<Json<Den>, ApiError> {
    Ok(Json(service.get_den(&den_id, &q.user_id).await?))
}

#[utoipa::path(
    post,
    path = "/api/dens/{den_id}/timezone",
    params(("den_id" = String, Path, description = "Den ID")),
    request_body = SetTimezoneRequest,
    responses(
        (status = 200, description = "Time zone updated", body = Den),
        (status = 400, description = "Unknown time zone", body = ErrorResponse),
        (status = 403, description = "Not a den parent", body = ErrorResponse)
    )
)]
pub async fn set_den_timezone(
    State(service): State<SharedService>,
    Path(den_id): Path<String>,
    Json(req): Json<SetTimezoneRequest>,
) -> Result<Json<Den>, ApiError> {
    let den = service
        .set_den_timezone(&den_id, req.timezone, &req.acting_user_id)
        .await?;
    Ok(Json(den))
}

#[utoipa::path(
    get,
    path = "/api/dens/{den_id}/members",
    params(("den_id" = String, Path, description = "Den ID"), ActingUserQuery),
    responses((status = 200, description = "Den members", body = [Member]))
)]
pub async fn list_members(
    State(service): State<SharedService>,
    Path(den_id): Path<String>,
    Query(q): Query<ActingUserQuery>,
) -> Result<Json<Vec<Member>>, ApiError> {
    Ok(Json(service.list_members(&den_id, &q.user_id).await?))
}

#[utoipa::path(
    post,
    path = "/api/dens/{den_id}/splits",
    params(("den_id" = String, Path, description = "Den ID")),
    request_body = SetSplitsRequest,
    responses(
        (status = 200, description = "Splits updated", body = [Member]),
        (status = 400, description = "Percentages don't sum to 100", body = ErrorResponse)
    )
)]
pub async fn set_split_percentages(
    State(service): State<SharedService>,
    Path(den_id): Path<String>,
    Json(req): Json<SetSplitsRequest>,
) -> Result<Json<Vec<Member>>, ApiError> {
    let members = service
        .set_split_percentages(&den_id, req.percentages, &req.acting_user_id)
        .await?;
    Ok(Json(members))
}

#[utoipa::path(
    post,
    path = "/api/dens/{den_id}/children",
    params(("den_id" = String, Path, description = "Den ID")),
    request_body = AddChildRequest,
    responses((status = 200, description = "Child added", body = Child))
)]
pub async fn add_child(
    State(service): State<SharedService>,
    Path(den_id): Path<String>,
    Json(req): Json<AddChildRequest>,
) -> Result<Json<Child>, ApiError> {
    let child = service
        .add_child(&den_id, req.name, req.birth_date, &req.acting_user_id)
        .await?;
    Ok(Json(child))
}

#[utoipa::path(
    get,
    path = "/api/dens/{den_id}/children",
    params(("den_id" = String, Path, description = "Den ID"), ActingUserQuery),
    responses((status = 200, description = "Children of the den", body = [Child]))
)]
pub async fn list_children(
    State(service): State<SharedService>,
    Path(den_id): Path<String>,
    Query(q): Query<ActingUserQuery>,
) -> Result<Json<Vec<Child>>, ApiError> {
    Ok(Json(service.list_children(&den_id, &q.user_id).await?))
}

#[utoipa::path(
    post,
    path = "/api/dens/{den_id}/expenses",
    params(("den_id" = String, Path, description = "Den ID")),
    request_body = AddExpenseRequest,
    responses(
        (status = 200, description = "Expense added", body = Expense),
        (status = 400, description = "Bad request", body = ErrorResponse)
    )
)]
pub async fn add_expense(
    State(service): State<SharedService>,
    Path(den_id): Path<String>,
    Json(req): Json<AddExpenseRequest>,
) -> Result<Json<Expense>, ApiError> {
    let expense = NewExpense {
        amount: req.amount,
        paid_by: req.paid_by,
        description: req.description,
        child_ids: req.child_ids,
    };
    Ok(Json(service.add_expense(&den_id, expense, &req.acting_user_id).await?))
}

#[utoipa::path(
    get,
    path = "/api/dens/{den_id}/expenses",
    params(("den_id" = String, Path, description = "Den ID"), ActingUserQuery),
    responses((status = 200, description = "Den expenses", body = [Expense]))
)]
pub async fn list_expenses(
    State(service): State<SharedService>,
    Path(den_id): Path<String>,
    Query(q): Query<ActingUserQuery>,
) -> Result<Json<Vec<Expense>>, ApiError> {
    Ok(Json(service.list_expenses(&den_id, &q.user_id).await?))
}

#[utoipa::path(
    post,
    path = "/api/expenses/{expense_id}/settle",
    params(("expense_id" = String, Path, description = "Expense ID")),
    request_body = ActingUserRequest,
    responses(
        (status = 200, description = "Expense settled", body = Expense),
        (status = 409, description = "Already settled", body = ErrorResponse)
    )
)]
pub async fn settle_expense(
    State(service): State<SharedService>,
    Path(expense_id): Path<String>,
    Json(req): Json<ActingUserRequest>,
) -> Result<Json<Expense>, ApiError> {
    Ok(Json(service.settle_expense(&expense_id, &req.acting_user_id).await?))
}

#[utoipa::path(
    get,
    path = "/api/expenses/{expense_id}/shares",
    params(("expense_id" = String, Path, description = "Expense ID"), ActingUserQuery),
    responses(
        (status = 200, description = "Per-member share of the expense", body = ExpenseShares),
        (status = 404, description = "Expense not found", body = ErrorResponse)
    )
)]
pub async fn expense_shares(
    State(service): State<SharedService>,
    Path(expense_id): Path<String>,
    Query(q): Query<ActingUserQuery>,
) -> Result<Json<ExpenseShares>, ApiError> {
    Ok(Json(service.expense_shares(&expense_id, &q.user_id).await?))
}

#[utoipa::path(
    get,
    path = "/api/dens/{den_id}/balances",
    params(("den_id" = String, Path, description = "Den ID"), ActingUserQuery),
    responses((status = 200, description = "Outstanding balances", body = DenBalances))
)]
pub async fn den_balances(
    State(service): State<SharedService>,
    Path(den_id): Path<String>,
    Query(q): Query<ActingUserQuery>,
) -> Result<Json<DenBalances>, ApiError> {
    Ok(Json(service.den_balances(&den_id, &q.user_id).await?))
}

#[utoipa::path(
    post,
    path = "/api/dens/{den_id}/invites",
    params(("den_id" = String, Path, description = "Den ID")),
    request_body = CreateInviteRequest,
    responses(
        (status = 200, description = "Invite created", body = Invite),
        (status = 403, description = "Not a den parent", body = ErrorResponse)
    )
)]
pub async fn create_invite(
    State(service): State<SharedService>,
    Path(den_id): Path<String>,
    Json(req): Json<CreateInviteRequest>,
) -> Result<Json<Invite>, ApiError> {
    Ok(Json(service.create_invite(&den_id, &req.acting_user_id, req.role).await?))
}

#[utoipa::path(
    get,
    path = "/api/dens/{den_id}/invites",
    params(("den_id" = String, Path, description = "Den ID"), ActingUserQuery),
    responses((status = 200, description = "Unused, unexpired invites", body = [Invite]))
)]
pub async fn list_active_invites(
    State(service): State<SharedService>,
    Path(den_id): Path<String>,
    Query(q): Query<ActingUserQuery>,
) -> Result<Json<Vec<Invite>>, ApiError> {
    Ok(Json(service.list_active_invites(&den_id, &q.user_id).await?))
}

#[utoipa::path(
    post,
    path = "/api/invites/{invite_id}/revoke",
    params(("invite_id" = String, Path, description = "Invite ID")),
    request_body = ActingUserRequest,
    responses((status = 200, description = "Invite revoked", body = Invite))
)]
pub async fn revoke_invite(
    State(service): State<SharedService>,
    Path(invite_id): Path<String>,
    Json(req): Json<ActingUserRequest>,
) -> Result<Json<Invite>, ApiError> {
    Ok(Json(service.revoke_invite(&invite_id, &req.acting_user_id).await?))
}

#[utoipa::path(
    post,
    path = "/api/invites/validate",
    request_body = ValidateCodeRequest,
    responses((status = 200, description = "Whether the code can be used", body = ValidateCodeResponse))
)]
pub async fn validate_code(
    State(service): State<SharedService>,
    Json(req): Json<ValidateCodeRequest>,
) -> Json<ValidateCodeResponse> {
    let invite = service.validate_code(&req.code).await;
    Json(ValidateCodeResponse {
        valid: invite.is_some(),
        code: invite.as_ref().map(|i| format_code(&i.code)),
        den_id: invite.as_ref().map(|i| i.den_id.clone()),
        role: invite.as_ref().map(|i| i.role),
        expires_at: invite.as_ref().map(|i| i.expires_at),
    })
}

#[utoipa::path(
    post,
    path = "/api/join",
    request_body = JoinDenRequest,
    responses(
        (status = 200, description = "Joined, or already a member", body = JoinOutcome),
        (status = 400, description = "Invalid or expired code", body = ErrorResponse),
        (status = 429, description = "Too many failed attempts", body = ErrorResponse)
    )
)]
pub async fn join_den(
    State(service): State<SharedService>,
    Json(req): Json<JoinDenRequest>,
) -> Result<Json<JoinOutcome>, ApiError> {
    Ok(Json(service.join_den(&req.code, &req.user_id).await?))
}

#[utoipa::path(
    post,
    path = "/api/dens/{den_id}/events",
    params(("den_id" = String, Path, description = "Den ID")),
    request_body = CreateEventRequest,
    responses(
        (status = 200, description = "Event created, times stored in UTC", body = Event),
        (status = 400, description = "Bad request", body = ErrorResponse)
    )
)]
pub async fn create_event(
    State(service): State<SharedService>,
    Path(den_id): Path<String>,
    Json(req): Json<CreateEventRequest>,
) -> Result<Json<Event>, ApiError> {
    let start = service.parse_local_time(&den_id, "start", &req.start).await?;
    let end = service.parse_local_time(&den_id, "end", &req.end).await?;
    let event = NewEvent {
        title: req.title,
        start,
        end,
        all_day: req.all_day,
        child_ids: req.child_ids,
    };
    Ok(Json(service.create_event(&den_id, event, &req.acting_user_id).await?))
}

#[utoipa::path(
    get,
    path = "/api/events/{event_id}",
    params(("event_id" = String, Path, description = "Event ID"), ActingUserQuery),
    responses(
        (status = 200, description = "Event", body = Event),
        (status = 404, description = "Event not found", body = ErrorResponse)
    )
)]
pub async fn get_event(
    State(service): State<SharedService>,
    Path(event_id): Path<String>,
    Query(q): Query<ActingUserQuery>,
) -> Result<Json<Event>, ApiError> {
    Ok(Json(service.get_event(&event_id, &q.user_id).await?))
}

#[utoipa::path(
    patch,
    path = "/api/events/{event_id}",
    params(("event_id" = String, Path, description = "Event ID")),
    request_body = UpdateEventRequest,
    responses((status = 200, description = "Event updated", body = Event))
)]
pub async fn update_event(
    State(service): State<SharedService>,
    Path(event_id): Path<String>,
    Json(req): Json<UpdateEventRequest>,
) -> Result<Json<Event>, ApiError> {
    let den_id = service.get_event(&event_id, &req.acting_user_id).await?.den_id;
    let start = match req.start {
        Some(raw) => Some(service.parse_local_time(&den_id, "start", &raw).await?),
        None => None,
    };
    let end = match req.end {
        Some(raw) => Some(service.parse_local_time(&den_id, "end", &raw).await?),
        None => None,
    };
    let update = EventUpdate {
        title: req.title,
        start,
        end,
        all_day: req.all_day,
        child_ids: req.child_ids,
    };
    Ok(Json(service.update_event(&event_id, update, &req.acting_user_id).await?))
}

#[utoipa::path(
    post,
    path = "/api/events/{event_id}/seen",
    params(("event_id" = String, Path, description = "Event ID")),
    request_body = ActingUserRequest,
    responses((status = 200, description = "Seen marker stored", body = EventView))
)]
pub async fn mark_event_seen(
    State(service): State<SharedService>,
    Path(event_id): Path<String>,
    Json(req): Json<ActingUserRequest>,
) -> Result<Json<EventView>, ApiError> {
    Ok(Json(service.mark_event_seen(&event_id, &req.acting_user_id).await?))
}

#[utoipa::path(
    get,
    path = "/api/dens/{den_id}/calendar/month",
    params(("den_id" = String, Path, description = "Den ID"), MonthQuery),
    responses((status = 200, description = "Six-week month grid", body = MonthGrid))
)]
pub async fn month_view(
    State(service): State<SharedService>,
    Path(den_id): Path<String>,
    Query(q): Query<MonthQuery>,
) -> Result<Json<MonthGrid>, ApiError> {
    let grid = service
        .month_view(&den_id, &q.user_id, q.year, q.month, q.child_id.as_deref())
        .await?;
    Ok(Json(grid))
}

#[utoipa::path(
    get,
    path = "/api/dens/{den_id}/calendar/week",
    params(("den_id" = String, Path, description = "Den ID"), DayQuery),
    responses((status = 200, description = "Week with lane assignments", body = WeekView))
)]
pub async fn week_view(
    State(service): State<SharedService>,
    Path(den_id): Path<String>,
    Query(q): Query<DayQuery>,
) -> Result<Json<WeekView>, ApiError> {
    let date = match q.date {
        Some(date) => date,
        None => service.den_today(&den_id).await?,
    };
    let week = service
        .week_view(&den_id, &q.user_id, date, q.child_id.as_deref())
        .await?;
    Ok(Json(week))
}

#[utoipa::path(
    get,
    path = "/api/dens/{den_id}/calendar/agenda",
    params(("den_id" = String, Path, description = "Den ID"), DayQuery),
    responses((status = 200, description = "Next fourteen days", body = AgendaView))
)]
pub async fn agenda_view(
    State(service): State<SharedService>,
    Path(den_id): Path<String>,
    Query(q): Query<DayQuery>,
) -> Result<Json<AgendaView>, ApiError> {
    let date = match q.date {
        Some(date) => date,
        None => service.den_today(&den_id).await?,
    };
    let agenda = service
        .agenda_view(&den_id, &q.user_id, date, q.child_id.as_deref())
        .await?;
    Ok(Json(agenda))
}

#[utoipa::path(
    get,
    path = "/api/dens/{den_id}/audits",
    params(("den_id" = String, Path, description = "Den ID"), ActingUserQuery),
    responses((status = 200, description = "Den audit trail", body = [AppLog]))
)]
pub async fn den_audits(
    State(service): State<SharedService>,
    Path(den_id): Path<String>,
    Query(q): Query<ActingUserQuery>,
) -> Result<Json<Vec<AppLog>>, ApiError> {
    Ok(Json(service.get_den_logs(&den_id, &q.user_id).await?))
}

#[utoipa::path(
    get,
    path = "/api/logs",
    responses((status = 200, description = "All audit entries", body = [AppLog]))
)]
pub async fn get_app_logs(State(service): State<SharedService>) -> Result<Json<Vec<AppLog>>, ApiError> {
    Ok(Json(service.get_app_logs().await?))
}
