//! Balance entity - One running balance per (user, balance type).
//!
//! Amounts are in currency minor units and change only through the ledger;
//! feature code never writes `amount` directly. Negative amounts are legal:
//! this is a debt-tracking ledger, not a wallet with an enforced floor.

use super::kinds::BalanceType;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Balance database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "balances")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Owning user
    pub user_id: i64,
    /// Which of the three balances this row is
    pub balance_type: BalanceType,
    /// Current amount in minor units (may be negative)
    pub amount: i64,
    /// Frozen balances reject ledger writes from non-privileged actors
    pub is_frozen: bool,
    /// Why the balance was frozen, if it is
    pub frozen_reason: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each balance belongs to one user
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
