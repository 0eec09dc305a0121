//! Shared test utilities.
//!
//! Common helpers for setting up in-memory test databases, actors at each
//! permission tier, and a default configuration with known cutoff hours.

use crate::config::settings::AppConfig;
use crate::core::authorizer::Actor;
use crate::core::users;
use crate::entities::{self, BalanceType, Role};
use crate::errors::Result;
use crate::notify::{BalanceAlert, BalanceWatcher};
use sea_orm::DatabaseConnection;
use std::sync::{Arc, Mutex};

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Default test configuration: no weekend-off days, lunch cutoff 9:00,
/// dinner cutoff 17:00.
#[must_use]
pub fn test_config() -> AppConfig {
    AppConfig::default()
}

fn actor_with_role(user_id: i64, role: Role) -> Actor {
    Actor::from_user(&entities::user::Model {
        id: user_id,
        name: format!("test-{role:?}"),
        role,
        is_active: true,
        extra_permissions: serde_json::json!([]),
    })
}

/// An actor with no permissions beyond its own meals.
#[must_use]
pub fn plain_actor() -> Actor {
    actor_with_role(9001, Role::User)
}

/// A manager-tier actor.
#[must_use]
pub fn manager_actor() -> Actor {
    actor_with_role(9002, Role::Manager)
}

/// An admin-tier actor.
#[must_use]
pub fn admin_actor() -> Actor {
    actor_with_role(9003, Role::Admin)
}

/// A superadmin-tier actor.
#[must_use]
pub fn superadmin_actor() -> Actor {
    actor_with_role(9004, Role::Superadmin)
}

/// Sets up a database with one plain active user (and their balances).
/// Returns (db, user) for common test scenarios.
pub async fn setup_with_user() -> Result<(DatabaseConnection, entities::user::Model)> {
    let db = setup_test_db().await?;
    let user = users::create_user(&db, &admin_actor(), "karim".to_string(), Role::User).await?;
    Ok((db, user))
}

/// Events captured by [`recording_alert`].
pub type RecordedEvents = Arc<Mutex<Vec<(i64, BalanceType, i64)>>>;

struct RecordingWatcher(RecordedEvents);

impl BalanceWatcher for RecordingWatcher {
    fn low_balance(&self, user_id: i64, balance_type: BalanceType, amount: i64) {
        if let Ok(mut events) = self.0.lock() {
            events.push((user_id, balance_type, amount));
        }
    }
}

/// A balance alert whose notifications are captured for assertions.
#[must_use]
pub fn recording_alert(threshold: i64) -> (BalanceAlert, RecordedEvents) {
    let events: RecordedEvents = Arc::new(Mutex::new(Vec::new()));
    let alert = BalanceAlert {
        threshold,
        watcher: Arc::new(RecordingWatcher(Arc::clone(&events))),
    };
    (alert, events)
}
