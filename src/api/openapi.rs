use utoipa::OpenApi;

use crate::{
    api::models::{
        ActingUserRequest, AddChildRequest, AddExpenseRequest, CreateDenRequest, CreateEventRequest,
        CreateInviteRequest, ErrorResponse, JoinDenRequest, SetSplitsRequest, SetTimezoneRequest,
        UpdateEventRequest, ValidateCodeRequest, ValidateCodeResponse,
    },
    core::{
        balance::Transfer,
        calendar::{AgendaView, CalendarEvent, DayCell, LanedEvent, MonthCell, MonthGrid, WeekDay, WeekView},
        models::{AppLog, Child, Den, Event, EventView, Expense, Invite, Member, Role},
        services::{DenBalances, ExpenseShares, JoinOutcome, SplitKind},
    },
};

#[derive(OpenApi)]
#[openapi(
    paths(
        super::handlers::create_den,
        super::handlers::get_den,
        super::handlers::set_den_timezone,
        super::handlers::list_members,
        super::handlers::set_split_percentages,
        super::handlers::add_child,
        super::handlers::list_children,
        super::handlers::add_expense,
        super::handlers::list_expenses,
        super::handlers::settle_expense,
        super::handlers::expense_shares,
        super::handlers::den_balances,
        super::handlers::create_invite,
        super::handlers::list_active_invites,
        super::handlers::revoke_invite,
        super::handlers::validate_code,
        super::handlers::join_den,
        super::handlers::create_event,
        super::handlers::get_event,
        super::handlers::update_event,
        super::handlers::mark_event_seen,
        super::handlers::month_view,
        super::handlers::week_view,
        super::handlers::agenda_view,
        super::handlers::den_audits,
        super::handlers::get_app_logs
    ),
    components(schemas(
        CreateDenRequest,
        SetTimezoneRequest,
        SetSplitsRequest,
        AddChildRequest,
        AddExpenseRequest,
        ActingUserRequest,
        CreateInviteRequest,
        ValidateCodeRequest,
        ValidateCodeResponse,
        JoinDenRequest,
        CreateEventRequest,
        UpdateEventRequest,
        ErrorResponse,
        Den,
        Member,
        Role,
        Child,
        Expense,
        Invite,
        Event,
        EventView,
        AppLog,
        DenBalances,
        ExpenseShares,
        SplitKind,
        Transfer,
        JoinOutcome,
        CalendarEvent,
        DayCell,
        MonthCell,
        MonthGrid,
        LanedEvent,
        WeekDay,
        WeekView,
        AgendaView
    )),
    info(
        title = "Denkeep API",
        description = "Shared calendar, expenses and invites for co-parenting dens",
        version = "0.1.0"
    )
)]
pub struct ApiDoc;
