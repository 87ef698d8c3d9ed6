pub mod balance;
pub mod calendar;
pub mod clock;
pub mod constants;
pub mod errors;
pub mod invites;
pub mod models;
pub mod services;
pub mod timezone;
