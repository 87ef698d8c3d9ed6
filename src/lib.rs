pub mod api;
pub mod config;
pub mod core;
pub mod infrastructure;

pub use crate::core::errors::DenError;
pub use crate::core::services::DenService;
pub use infrastructure::cache::in_memory::InMemoryCache;
pub use infrastructure::logging::in_memory::InMemoryLogging;
pub use infrastructure::storage::in_memory::InMemoryStorage;

#[cfg(test)]
mod tests;
