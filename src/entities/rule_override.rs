//! Rule override entity - Manual force-on/force-off rules.
//!
//! Overrides sit on top of manual meal records without touching them. The
//! date specification is one of three shapes, discriminated by `date_spec`:
//! `single` uses `date`; `range` uses `start_date`/`end_date`; `recurring`
//! uses `weekday_mask` (bit n set = weekday n matches, Monday = 0) and/or
//! `recurring_day_of_month`.

use super::kinds::{DateSpec, MealScope, OverrideAction, OverrideTarget};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Rule override database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "rule_overrides")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Who the rule targets
    pub target: OverrideTarget,
    /// Target user when `target` is `user`
    pub target_user_id: Option<i64>,
    /// Which date-spec shape the rule uses
    pub date_spec: DateSpec,
    /// Exact date for `single` rules
    pub date: Option<Date>,
    /// Range start for `range` rules
    pub start_date: Option<Date>,
    /// Range end for `range` rules (inclusive)
    pub end_date: Option<Date>,
    /// Weekday bitmask for `recurring` rules (Monday = bit 0)
    pub weekday_mask: i32,
    /// Day-of-month for monthly `recurring` rules
    pub recurring_day_of_month: Option<i32>,
    /// Lunch, dinner, or both
    pub meal_scope: MealScope,
    /// Force on or force off
    pub action: OverrideAction,
    /// Higher priority wins among matching rules
    pub priority: i32,
    /// Inactive rules never match
    pub is_active: bool,
    /// Expired rules never match, regardless of other fields
    pub expires_at: Option<DateTimeUtc>,
    /// Creation time, used as the final tie-breaker (most recent wins)
    pub created_at: DateTimeUtc,
    /// User id of the rule's author
    pub created_by: i64,
}

/// Overrides have no relationships with other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
