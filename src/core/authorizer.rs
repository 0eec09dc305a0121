//! Authorization - one resolver for roles and fine-grained permissions.
//!
//! The four-tier role hierarchy and the per-user permission overlay are two
//! inputs to the same resolver: a role contributes its default permission
//! set (cumulative down the hierarchy), `extra_permissions` adds on top, and
//! calling code only ever asks [`Actor::can`] / [`Actor::require`] about a
//! permission string. Nothing outside this module branches on role names.

use crate::entities::{Role, user};
use crate::errors::{Error, Result};
use std::collections::HashSet;

/// Permission strings known to the system.
pub mod perms {
    /// Toggle meals for users other than yourself.
    pub const MEAL_TOGGLE_ANY: &str = "meal.toggle-any";
    /// Edit meal records inside a finalized month (audited).
    pub const MEAL_FORCE_EDIT: &str = "meal.force-edit";
    /// Exempt from the daily toggle cutoff.
    pub const MEAL_CUTOFF_EXEMPT: &str = "meal.cutoff-exempt";
    /// Post ledger transactions directly.
    pub const LEDGER_POST: &str = "ledger.post";
    /// Reverse a posted transaction.
    pub const LEDGER_REVERSE: &str = "ledger.reverse";
    /// Write to a frozen balance (audited).
    pub const LEDGER_FROZEN_OVERRIDE: &str = "ledger.frozen-override";
    /// Enter and edit breakfast costs.
    pub const BREAKFAST_MANAGE: &str = "breakfast.manage";
    /// Run breakfast and month-end charge posting.
    pub const CHARGES_RUN: &str = "charges.run";
    /// Create, edit, and finalize month settings.
    pub const MONTH_MANAGE: &str = "month.manage";
    /// Revert a finalized month (audited).
    pub const MONTH_FORCE_UNFINALIZE: &str = "month.force-unfinalize";
    /// Manage the holiday calendar.
    pub const HOLIDAY_MANAGE: &str = "holiday.manage";
    /// Create and deactivate rule overrides.
    pub const OVERRIDE_MANAGE: &str = "override.manage";
    /// Create users, freeze and unfreeze balances.
    pub const USER_MANAGE: &str = "user.manage";
}

/// Permissions each role adds on top of the tiers below it.
fn role_grants(role: Role) -> &'static [&'static str] {
    match role {
        Role::User => &[],
        Role::Manager => &[
            perms::MEAL_TOGGLE_ANY,
            perms::MEAL_CUTOFF_EXEMPT,
            perms::BREAKFAST_MANAGE,
            perms::CHARGES_RUN,
            perms::LEDGER_POST,
            perms::MONTH_MANAGE,
        ],
        Role::Admin => &[
            perms::MEAL_FORCE_EDIT,
            perms::LEDGER_REVERSE,
            perms::HOLIDAY_MANAGE,
            perms::OVERRIDE_MANAGE,
            perms::USER_MANAGE,
        ],
        Role::Superadmin => &[perms::MONTH_FORCE_UNFINALIZE, perms::LEDGER_FROZEN_OVERRIDE],
    }
}

/// An authenticated caller: identity plus resolved permission set.
///
/// Built once per request from the user row; all permission checks go
/// through this struct.
#[derive(Debug, Clone)]
pub struct Actor {
    /// User id recorded as `performed_by`/`modified_by` on writes.
    /// Id 0 is the service actor used by scheduled jobs.
    pub user_id: i64,
    /// Role tier, used only for default-permission derivation.
    pub role: Role,
    permissions: HashSet<String>,
}

impl Actor {
    /// Resolves a user row into an actor. Inactive users get no
    /// permissions at all, whatever their role or overlay says.
    #[must_use]
    pub fn from_user(user: &user::Model) -> Self {
        let mut permissions = HashSet::new();
        if user.is_active {
            for tier in [Role::User, Role::Manager, Role::Admin, Role::Superadmin] {
                if user.role >= tier {
                    permissions.extend(role_grants(tier).iter().map(|p| (*p).to_string()));
                }
            }
            if let Ok(extra) =
                serde_json::from_value::<Vec<String>>(user.extra_permissions.clone())
            {
                permissions.extend(extra);
            }
        }
        Self {
            user_id: user.id,
            role: user.role,
            permissions,
        }
    }

    /// A service actor for scheduled jobs: no role defaults, exactly the
    /// listed permissions.
    #[must_use]
    pub fn service(permissions: &[&str]) -> Self {
        Self {
            user_id: 0,
            role: Role::Manager,
            permissions: permissions.iter().map(|p| (*p).to_string()).collect(),
        }
    }

    /// Whether the actor holds the given permission.
    #[must_use]
    pub fn can(&self, permission: &str) -> bool {
        self.permissions.contains(permission)
    }

    /// Errors with [`Error::Permission`] unless the actor holds the
    /// permission.
    pub fn require(&self, permission: &str) -> Result<()> {
        if self.can(permission) {
            Ok(())
        } else {
            Err(Error::Permission {
                permission: permission.to_string(),
            })
        }
    }
}
