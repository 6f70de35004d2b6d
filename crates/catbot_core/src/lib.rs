pub mod api;
pub mod classify;
pub mod config;
pub mod confirm;
pub mod error;
pub mod membership;
pub mod model;
pub mod mutate;
pub mod pipeline;

pub use error::{BotError, Result};
