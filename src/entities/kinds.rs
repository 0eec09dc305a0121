//! String-backed database enums shared across entities.
//!
//! Every discriminator column in the schema is a typed `ActiveEnum` rather
//! than a free-form string, so invalid kinds are unrepresentable past the
//! deserialization boundary.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Role tier. Ordering is significant: later variants outrank earlier ones.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
pub enum Role {
    #[sea_orm(string_value = "user")]
    User,
    #[sea_orm(string_value = "manager")]
    Manager,
    #[sea_orm(string_value = "admin")]
    Admin,
    #[sea_orm(string_value = "superadmin")]
    Superadmin,
}

/// Which of a user's three running balances a ledger row touches.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
pub enum BalanceType {
    #[sea_orm(string_value = "breakfast")]
    Breakfast,
    #[sea_orm(string_value = "lunch")]
    Lunch,
    #[sea_orm(string_value = "dinner")]
    Dinner,
}

/// The two toggleable meals. Breakfast is cost-entered, never toggled.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(8))")]
#[serde(rename_all = "snake_case")]
pub enum MealType {
    #[sea_orm(string_value = "lunch")]
    Lunch,
    #[sea_orm(string_value = "dinner")]
    Dinner,
}

impl MealType {
    /// The balance a charge for this meal is posted against.
    #[must_use]
    pub fn balance_type(self) -> BalanceType {
        match self {
            MealType::Lunch => BalanceType::Lunch,
            MealType::Dinner => BalanceType::Dinner,
        }
    }
}

impl fmt::Display for MealType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MealType::Lunch => write!(f, "lunch"),
            MealType::Dinner => write!(f, "dinner"),
        }
    }
}

/// Ledger transaction kind. Sign discipline is enforced at posting time:
/// `Deposit`/`Refund` are positive, `Deduction` negative, `Adjustment`
/// either sign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    #[sea_orm(string_value = "deposit")]
    Deposit,
    #[sea_orm(string_value = "deduction")]
    Deduction,
    #[sea_orm(string_value = "adjustment")]
    Adjustment,
    #[sea_orm(string_value = "refund")]
    Refund,
}

/// What a transaction's `reference_id` points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
pub enum ReferenceKind {
    #[sea_orm(string_value = "breakfast")]
    Breakfast,
    #[sea_orm(string_value = "meal")]
    Meal,
    #[sea_orm(string_value = "month_settings")]
    MonthSettings,
    #[sea_orm(string_value = "transaction")]
    Transaction,
}

/// Holiday classification. Each kind independently toggles default-off
/// behaviour via the configured holiday policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
pub enum HolidayKind {
    #[sea_orm(string_value = "government")]
    Government,
    #[sea_orm(string_value = "optional")]
    Optional,
    #[sea_orm(string_value = "religious")]
    Religious,
}

/// Who a rule override targets. Narrower targets win ties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
pub enum OverrideTarget {
    #[sea_orm(string_value = "user")]
    User,
    #[sea_orm(string_value = "all_users")]
    AllUsers,
    #[sea_orm(string_value = "global")]
    Global,
}

impl OverrideTarget {
    /// Tie-break rank: user > `all_users` > global.
    #[must_use]
    pub fn specificity(self) -> u8 {
        match self {
            OverrideTarget::User => 2,
            OverrideTarget::AllUsers => 1,
            OverrideTarget::Global => 0,
        }
    }
}

/// Shape of an override's date specification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
pub enum DateSpec {
    #[sea_orm(string_value = "single")]
    Single,
    #[sea_orm(string_value = "range")]
    Range,
    #[sea_orm(string_value = "recurring")]
    Recurring,
}

/// Which meals an override covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(8))")]
#[serde(rename_all = "snake_case")]
pub enum MealScope {
    #[sea_orm(string_value = "lunch")]
    Lunch,
    #[sea_orm(string_value = "dinner")]
    Dinner,
    #[sea_orm(string_value = "both")]
    Both,
}

impl MealScope {
    /// Whether this scope covers the given meal.
    #[must_use]
    pub fn covers(self, meal_type: MealType) -> bool {
        match self {
            MealScope::Both => true,
            MealScope::Lunch => meal_type == MealType::Lunch,
            MealScope::Dinner => meal_type == MealType::Dinner,
        }
    }
}

/// What an override does to the meals it governs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
pub enum OverrideAction {
    #[sea_orm(string_value = "force_on")]
    ForceOn,
    #[sea_orm(string_value = "force_off")]
    ForceOff,
}
