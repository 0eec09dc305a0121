//! Unified error types and result handling.
//!
//! The error taxonomy mirrors what the HTTP layer needs to map onto status
//! codes: `Validation` (400), `Permission` (403), `State` and `Conflict`
//! (409), `NotFound` (404), everything else opaque (500). `State` carries a
//! [`StateBlock`] naming exactly which state blocked the action so a client
//! can render the right remediation (finalized month vs frozen balance vs
//! cutoff passed).

use crate::entities::MealType;
use chrono::NaiveDate;
use thiserror::Error;

/// The specific state that blocked a mutating operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateBlock {
    #[error("month {year}-{month:02} is finalized")]
    Finalized { year: i32, month: u32 },

    #[error("month {year}-{month:02} is not finalized yet")]
    NotFinalized { year: i32, month: u32 },

    #[error("balance is frozen: {}", .reason.as_deref().unwrap_or("no reason recorded"))]
    Frozen { reason: Option<String> },

    #[error("cutoff passed for {meal_type} on {date}")]
    Cutoff { date: NaiveDate, meal_type: MealType },

    #[error("an override (id {override_id}) governs this meal")]
    Overridden { override_id: i64 },

    #[error("no active rate configured for {date}")]
    NoActiveRate { date: NaiveDate },

    #[error("breakfast for {date} is finalized")]
    BreakfastFinalized { date: NaiveDate },
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("validation failed: {message}")]
    Validation { message: String },

    #[error("permission denied: requires '{permission}'")]
    Permission { permission: String },

    #[error("{block}")]
    State { block: StateBlock },

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("conflict: {message}")]
    Conflict { message: String },

    #[error("configuration error: {message}")]
    Config { message: String },

    #[error("database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),
}

impl Error {
    /// Shorthand for a [`Error::Validation`] with a formatted message.
    pub fn validation(message: impl Into<String>) -> Self {
        Error::Validation {
            message: message.into(),
        }
    }

    /// Shorthand for a [`Error::State`] wrapping the given block.
    #[must_use]
    pub fn state(block: StateBlock) -> Self {
        Error::State { block }
    }
}

// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
