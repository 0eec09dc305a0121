//! Ledger - atomic balance mutation with an append-only audit trail.
//!
//! Every balance change goes through [`apply_transaction`]: the transaction
//! row and the balance increment happen in one database transaction, with
//! the row inserted `pending` first and confirmed after the balance write,
//! so a crash leaves a detectable inconsistency rather than a silent one.
//! The balance write itself is an atomic column increment
//! (`amount = amount + delta`), which serializes concurrent writers on the
//! same `(user, balance_type)` row without read-modify-write races.
//!
//! Balances are the source of truth for hot reads; [`reconcile`] replays the
//! log to detect drift.

use crate::core::authorizer::{Actor, perms};
use crate::entities::{
    Balance, BalanceType, ReferenceKind, Transaction, TransactionKind, balance,
    correction_history, transaction,
};
use crate::errors::{Error, Result, StateBlock};
use crate::notify::BalanceAlert;
use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{ConnectionTrait, DatabaseConnection, QueryOrder, Set, TransactionTrait, prelude::*};

/// Typed pointer from a transaction to the row that caused it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reference {
    pub kind: ReferenceKind,
    pub id: i64,
}

impl Reference {
    #[must_use]
    pub fn breakfast(id: i64) -> Self {
        Self {
            kind: ReferenceKind::Breakfast,
            id,
        }
    }

    #[must_use]
    pub fn month_settings(id: i64) -> Self {
        Self {
            kind: ReferenceKind::MonthSettings,
            id,
        }
    }

    #[must_use]
    pub fn transaction(id: i64) -> Self {
        Self {
            kind: ReferenceKind::Transaction,
            id,
        }
    }
}

/// Input for one ledger posting.
#[derive(Debug, Clone)]
pub struct Posting {
    pub user_id: i64,
    pub balance_type: BalanceType,
    pub kind: TransactionKind,
    /// Signed amount in minor units
    pub amount: i64,
    pub description: String,
    pub reference: Option<Reference>,
}

/// Sign discipline per transaction kind.
fn validate_sign(kind: TransactionKind, amount: i64) -> Result<()> {
    let ok = match kind {
        TransactionKind::Deposit | TransactionKind::Refund => amount > 0,
        TransactionKind::Deduction => amount < 0,
        TransactionKind::Adjustment => amount != 0,
    };
    if ok {
        Ok(())
    } else {
        Err(Error::validation(format!(
            "amount {amount} has the wrong sign for a {kind:?}"
        )))
    }
}

async fn find_balance<C>(db: &C, user_id: i64, balance_type: BalanceType) -> Result<balance::Model>
where
    C: ConnectionTrait,
{
    Balance::find()
        .filter(balance::Column::UserId.eq(user_id))
        .filter(balance::Column::BalanceType.eq(balance_type))
        .one(db)
        .await?
        .ok_or(Error::NotFound {
            entity: "balance",
            id: format!("user {user_id}"),
        })
}

/// Atomic `amount = amount + delta` on one balance row. Returns the updated
/// model.
async fn adjust_balance_atomic<C>(db: &C, balance_id: i64, delta: i64) -> Result<balance::Model>
where
    C: ConnectionTrait,
{
    Balance::update_many()
        .col_expr(
            balance::Column::Amount,
            Expr::col(balance::Column::Amount).add(delta),
        )
        .filter(balance::Column::Id.eq(balance_id))
        .exec(db)
        .await?;

    Balance::find_by_id(balance_id)
        .one(db)
        .await?
        .ok_or(Error::NotFound {
            entity: "balance",
            id: balance_id.to_string(),
        })
}

/// Posts one transaction inside an open database transaction. Handles the
/// frozen check, the pending-row dance, and the audit row for frozen
/// overrides. Does not validate signs or permissions; callers do.
async fn post_inner<C>(txn: &C, actor: &Actor, posting: &Posting) -> Result<transaction::Model>
where
    C: ConnectionTrait,
{
    let bal = find_balance(txn, posting.user_id, posting.balance_type).await?;

    let frozen_override = bal.is_frozen && actor.can(perms::LEDGER_FROZEN_OVERRIDE);
    if bal.is_frozen && !frozen_override {
        return Err(Error::state(StateBlock::Frozen {
            reason: bal.frozen_reason,
        }));
    }

    let previous_balance = bal.amount;
    let new_balance = previous_balance + posting.amount;

    // Row first, pending; balance write; then confirm the row.
    let row = transaction::ActiveModel {
        user_id: Set(posting.user_id),
        balance_type: Set(posting.balance_type),
        kind: Set(posting.kind),
        amount: Set(posting.amount),
        previous_balance: Set(previous_balance),
        new_balance: Set(new_balance),
        description: Set(posting.description.clone()),
        reference_kind: Set(posting.reference.map(|r| r.kind)),
        reference_id: Set(posting.reference.map(|r| r.id)),
        performed_by: Set(actor.user_id),
        is_corrected: Set(false),
        corrected_by: Set(None),
        pending: Set(true),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(txn)
    .await?;

    adjust_balance_atomic(txn, bal.id, posting.amount).await?;

    let mut confirm: transaction::ActiveModel = row.into();
    confirm.pending = Set(false);
    let row = confirm.update(txn).await?;

    if frozen_override {
        correction_history::ActiveModel {
            entity_kind: Set("balances".to_string()),
            entity_id: Set(bal.id),
            action: Set("frozen_write".to_string()),
            detail: Set(format!(
                "posted transaction {} to a frozen balance: {}",
                row.id, posting.description
            )),
            performed_by: Set(actor.user_id),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(txn)
        .await?;
    }

    Ok(row)
}

/// Applies one posting: validates, writes the row and the balance in one
/// atomic unit, then reports a threshold crossing to `alert` (if given)
/// after the commit.
///
/// Insufficient balance is not an error; balances may go negative. A frozen
/// balance is an error unless the actor holds the frozen-override
/// permission, in which case the write proceeds and is audited.
pub async fn apply_transaction(
    db: &DatabaseConnection,
    actor: &Actor,
    posting: Posting,
    alert: Option<&BalanceAlert>,
) -> Result<transaction::Model> {
    actor.require(perms::LEDGER_POST)?;
    validate_sign(posting.kind, posting.amount)?;
    if posting.description.trim().is_empty() {
        return Err(Error::validation("transaction description cannot be empty"));
    }

    let txn = db.begin().await?;
    let row = post_inner(&txn, actor, &posting).await?;
    txn.commit().await?;

    tracing::debug!(
        user_id = posting.user_id,
        balance_type = ?posting.balance_type,
        amount = posting.amount,
        transaction_id = row.id,
        "ledger posting applied"
    );

    if let Some(alert) = alert {
        alert.notify_if_crossed(
            row.user_id,
            row.balance_type,
            row.previous_balance,
            row.new_balance,
        );
    }

    Ok(row)
}

/// Reverses a posted transaction: a new row with the inverted amount,
/// linked back to the original. The original is marked corrected but never
/// mutated beyond that metadata, and never deleted.
pub async fn reverse_transaction(
    db: &DatabaseConnection,
    actor: &Actor,
    transaction_id: i64,
    reason: &str,
    alert: Option<&BalanceAlert>,
) -> Result<transaction::Model> {
    actor.require(perms::LEDGER_REVERSE)?;

    let txn = db.begin().await?;

    let original = Transaction::find_by_id(transaction_id)
        .one(&txn)
        .await?
        .ok_or(Error::NotFound {
            entity: "transaction",
            id: transaction_id.to_string(),
        })?;

    if original.pending {
        return Err(Error::Conflict {
            message: format!("transaction {transaction_id} is pending and cannot be reversed"),
        });
    }
    if original.is_corrected {
        return Err(Error::Conflict {
            message: format!("transaction {transaction_id} has already been corrected"),
        });
    }

    let reversal = post_inner(
        &txn,
        actor,
        &Posting {
            user_id: original.user_id,
            balance_type: original.balance_type,
            kind: TransactionKind::Adjustment,
            amount: -original.amount,
            description: format!("reversal of transaction {transaction_id}: {reason}"),
            reference: Some(Reference::transaction(transaction_id)),
        },
    )
    .await?;

    let mut amend: transaction::ActiveModel = original.into();
    amend.is_corrected = Set(true);
    amend.corrected_by = Set(Some(reversal.id));
    amend.update(&txn).await?;

    txn.commit().await?;

    if let Some(alert) = alert {
        alert.notify_if_crossed(
            reversal.user_id,
            reversal.balance_type,
            reversal.previous_balance,
            reversal.new_balance,
        );
    }

    Ok(reversal)
}

/// Result of replaying a balance's transaction log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileReport {
    pub user_id: i64,
    pub balance_type: BalanceType,
    /// Amount currently stored on the balance row
    pub stored_amount: i64,
    /// Sum of all confirmed transaction amounts
    pub replayed_amount: i64,
    /// Ids of rows still marked pending (crash leftovers)
    pub pending_rows: Vec<i64>,
    pub in_sync: bool,
}

/// Replays the full transaction log for one balance and compares with the
/// stored amount. Drift detection only; nothing is repaired.
pub async fn reconcile(
    db: &DatabaseConnection,
    user_id: i64,
    balance_type: BalanceType,
) -> Result<ReconcileReport> {
    let bal = find_balance(db, user_id, balance_type).await?;

    let rows = Transaction::find()
        .filter(transaction::Column::UserId.eq(user_id))
        .filter(transaction::Column::BalanceType.eq(balance_type))
        .all(db)
        .await?;

    let replayed_amount = rows.iter().filter(|t| !t.pending).map(|t| t.amount).sum();
    let pending_rows: Vec<i64> = rows.iter().filter(|t| t.pending).map(|t| t.id).collect();
    let in_sync = replayed_amount == bal.amount && pending_rows.is_empty();

    if !in_sync {
        tracing::warn!(
            user_id,
            ?balance_type,
            stored = bal.amount,
            replayed = replayed_amount,
            pending = pending_rows.len(),
            "ledger drift detected"
        );
    }

    Ok(ReconcileReport {
        user_id,
        balance_type,
        stored_amount: bal.amount,
        replayed_amount,
        pending_rows,
        in_sync,
    })
}

/// All transactions for one balance, newest first.
pub async fn get_transactions(
    db: &DatabaseConnection,
    user_id: i64,
    balance_type: BalanceType,
) -> Result<Vec<transaction::Model>> {
    Transaction::find()
        .filter(transaction::Column::UserId.eq(user_id))
        .filter(transaction::Column::BalanceType.eq(balance_type))
        .order_by_desc(transaction::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}
