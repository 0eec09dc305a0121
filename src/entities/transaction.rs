//! Transaction entity - The append-only ledger log.
//!
//! Rows are never deleted. Corrections are recorded as new metadata on the
//! original row (`is_corrected`/`corrected_by`) plus a linked reversal row.
//! `pending` marks a row whose balance write has not been confirmed yet; a
//! row left pending after a crash is a detectable inconsistency for
//! reconciliation, never a silent one.

use super::kinds::{BalanceType, ReferenceKind, TransactionKind};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Transaction database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    /// Unique identifier for the transaction
    #[sea_orm(primary_key)]
    pub id: i64,
    /// User whose balance this row touches
    pub user_id: i64,
    /// Which of the user's balances this row touches
    pub balance_type: BalanceType,
    /// Deposit, deduction, adjustment, or refund
    pub kind: TransactionKind,
    /// Signed amount in minor units
    pub amount: i64,
    /// Balance before this row was applied
    pub previous_balance: i64,
    /// Balance after this row was applied
    pub new_balance: i64,
    /// Human-readable description
    pub description: String,
    /// What `reference_id` points at, if anything
    pub reference_kind: Option<ReferenceKind>,
    /// Id of the referenced breakfast/meal/month-settings/transaction row
    pub reference_id: Option<i64>,
    /// User id of whoever posted the row
    pub performed_by: i64,
    /// Set when a reversal row amends this one
    pub is_corrected: bool,
    /// Id of the reversal row that amended this one
    pub corrected_by: Option<i64>,
    /// True until the paired balance write is confirmed
    pub pending: bool,
    /// When the transaction was created
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each transaction belongs to one user
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
