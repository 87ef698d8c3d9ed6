pub mod audit;
pub mod child;
pub mod den;
pub mod event;
pub mod expense;
pub mod invite;

pub use audit::AppLog;
pub use child::Child;
pub use den::{Den, Member, Role};
pub use event::{Event, EventView};
pub use expense::Expense;
pub use invite::{Invite, InviteAttempt};
