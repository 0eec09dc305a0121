//! Holiday entity - Admin-managed reference data for default-off days.
//!
//! A row is either dated (`date` set) or recurring (`recurring_month` +
//! `recurring_day` set); recurring rows match on (month, day) ignoring year.

use super::kinds::HolidayKind;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Holiday database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "holidays")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Exact date for one-off holidays
    pub date: Option<Date>,
    /// Month (1-12) for recurring holidays
    pub recurring_month: Option<i32>,
    /// Day of month (1-31) for recurring holidays
    pub recurring_day: Option<i32>,
    /// Government, optional, or religious
    pub kind: HolidayKind,
    /// Human-readable name
    pub name: String,
    /// Inactive holidays are ignored by the resolver
    pub is_active: bool,
}

/// Holidays have no relationships with other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
