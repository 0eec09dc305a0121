//! Breakfast entry and per-participant cost splitting.
//!
//! A manager enters one total cost per date; the split is deterministic
//! largest-remainder: everyone gets `total / n`, and the first `total % n`
//! participants in ascending user-id order get one extra minor unit, so the
//! shares always sum exactly to the entered total.

use crate::core::authorizer::{Actor, perms};
use crate::core::ledger::{self, Posting, Reference};
use crate::core::{settings, users};
use crate::entities::{
    Breakfast, BreakfastParticipant, TransactionKind, breakfast, breakfast_participant,
    correction_history,
};
use crate::errors::{Error, Result, StateBlock};
use crate::notify::BalanceAlert;
use chrono::{NaiveDate, Utc};
use sea_orm::{DatabaseConnection, QueryOrder, Set, TransactionTrait, prelude::*};

/// Largest-remainder split of `total` across `n` shares. The first
/// `total % n` shares get one extra minor unit.
#[must_use]
pub fn split_cost(total: i64, n: usize) -> Vec<i64> {
    if n == 0 {
        return Vec::new();
    }
    let n_i64 = n as i64;
    let base = total / n_i64;
    let remainder = total % n_i64;
    (0..n_i64)
        .map(|i| if i < remainder { base + 1 } else { base })
        .collect()
}

/// Creates a breakfast entry for a date, splitting the cost across the
/// given participants. One breakfast per date.
pub async fn create_breakfast(
    db: &DatabaseConnection,
    actor: &Actor,
    date: NaiveDate,
    total_cost: i64,
    participant_ids: &[i64],
) -> Result<(breakfast::Model, Vec<breakfast_participant::Model>)> {
    actor.require(perms::BREAKFAST_MANAGE)?;

    if total_cost <= 0 {
        return Err(Error::validation("breakfast cost must be positive"));
    }
    if participant_ids.is_empty() {
        return Err(Error::validation("breakfast needs at least one participant"));
    }

    let mut ids: Vec<i64> = participant_ids.to_vec();
    ids.sort_unstable();
    ids.dedup();
    if ids.len() != participant_ids.len() {
        return Err(Error::validation("duplicate participant"));
    }

    for &user_id in &ids {
        let user = users::get_user(db, user_id).await?.ok_or(Error::NotFound {
            entity: "user",
            id: user_id.to_string(),
        })?;
        if !user.is_active {
            return Err(Error::validation(format!(
                "user {} is inactive and cannot participate",
                user.name
            )));
        }
    }

    if Breakfast::find()
        .filter(breakfast::Column::Date.eq(date))
        .one(db)
        .await?
        .is_some()
    {
        return Err(Error::Conflict {
            message: format!("a breakfast for {date} already exists"),
        });
    }

    // Entering costs into a finalized month is a privileged correction.
    let force_edit = match settings::month_for_date(db, date).await? {
        Some(month) if month.is_finalized => {
            if actor.can(perms::MEAL_FORCE_EDIT) {
                true
            } else {
                return Err(Error::state(StateBlock::Finalized {
                    year: month.year,
                    month: u32::try_from(month.month).unwrap_or(0),
                }));
            }
        }
        _ => false,
    };

    let txn = db.begin().await?;

    let row = breakfast::ActiveModel {
        date: Set(date),
        total_cost: Set(total_cost),
        is_finalized: Set(false),
        created_by: Set(actor.user_id),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    let shares = split_cost(total_cost, ids.len());
    let mut participants = Vec::with_capacity(ids.len());
    for (&user_id, &cost) in ids.iter().zip(&shares) {
        let participant = breakfast_participant::ActiveModel {
            breakfast_id: Set(row.id),
            user_id: Set(user_id),
            cost: Set(cost),
            deducted: Set(false),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
        participants.push(participant);
    }

    if force_edit {
        correction_history::ActiveModel {
            entity_kind: Set("breakfasts".to_string()),
            entity_id: Set(row.id),
            action: Set("force_edit".to_string()),
            detail: Set(format!(
                "entered breakfast for {date} inside a finalized month"
            )),
            performed_by: Set(actor.user_id),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
    }

    txn.commit().await?;
    Ok((row, participants))
}

/// Re-enters a breakfast's cost and participant list, replacing the split.
/// Only possible while no share has been deducted; after that, corrections
/// go through ledger reversals instead.
pub async fn update_breakfast(
    db: &DatabaseConnection,
    actor: &Actor,
    breakfast_id: i64,
    total_cost: i64,
    participant_ids: &[i64],
) -> Result<(breakfast::Model, Vec<breakfast_participant::Model>)> {
    actor.require(perms::BREAKFAST_MANAGE)?;

    if total_cost <= 0 {
        return Err(Error::validation("breakfast cost must be positive"));
    }
    if participant_ids.is_empty() {
        return Err(Error::validation("breakfast needs at least one participant"));
    }

    let bf = Breakfast::find_by_id(breakfast_id)
        .one(db)
        .await?
        .ok_or(Error::NotFound {
            entity: "breakfast",
            id: breakfast_id.to_string(),
        })?;

    if bf.is_finalized {
        return Err(Error::state(StateBlock::BreakfastFinalized { date: bf.date }));
    }

    let existing = BreakfastParticipant::find()
        .filter(breakfast_participant::Column::BreakfastId.eq(breakfast_id))
        .all(db)
        .await?;
    if existing.iter().any(|p| p.deducted) {
        return Err(Error::Conflict {
            message: format!(
                "breakfast {breakfast_id} already has deducted shares; reverse them first"
            ),
        });
    }

    let mut ids: Vec<i64> = participant_ids.to_vec();
    ids.sort_unstable();
    ids.dedup();
    if ids.len() != participant_ids.len() {
        return Err(Error::validation("duplicate participant"));
    }

    for &user_id in &ids {
        if users::get_user(db, user_id).await?.is_none() {
            return Err(Error::NotFound {
                entity: "user",
                id: user_id.to_string(),
            });
        }
    }

    let txn = db.begin().await?;

    let mut active: breakfast::ActiveModel = bf.into();
    active.total_cost = Set(total_cost);
    let bf = active.update(&txn).await?;

    for participant in existing {
        participant.delete(&txn).await?;
    }

    let shares = split_cost(total_cost, ids.len());
    let mut participants = Vec::with_capacity(ids.len());
    for (&user_id, &cost) in ids.iter().zip(&shares) {
        let participant = breakfast_participant::ActiveModel {
            breakfast_id: Set(bf.id),
            user_id: Set(user_id),
            cost: Set(cost),
            deducted: Set(false),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
        participants.push(participant);
    }

    txn.commit().await?;
    Ok((bf, participants))
}

/// What happened to one participant during charge posting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParticipantOutcome {
    /// Share deducted by the listed transaction
    Charged { user_id: i64, transaction_id: i64 },
    /// Share was already deducted by an earlier run
    AlreadyCharged { user_id: i64 },
    /// The ledger rejected the deduction; the run continued
    Failed { user_id: i64, error: String },
}

/// Result of one breakfast charge run.
#[derive(Debug, Clone)]
pub struct BreakfastChargeReport {
    pub breakfast_id: i64,
    pub outcomes: Vec<ParticipantOutcome>,
    /// True once every participant has been deducted
    pub finalized: bool,
}

/// Posts each participant's share as a ledger deduction. One participant's
/// failure never blocks the others; re-running skips shares that were
/// already deducted, so a partial run can be completed later. The breakfast
/// is finalized only when no share remains undeducted.
pub async fn post_breakfast_charges(
    db: &DatabaseConnection,
    actor: &Actor,
    breakfast_id: i64,
    alert: Option<&BalanceAlert>,
) -> Result<BreakfastChargeReport> {
    actor.require(perms::CHARGES_RUN)?;

    let bf = Breakfast::find_by_id(breakfast_id)
        .one(db)
        .await?
        .ok_or(Error::NotFound {
            entity: "breakfast",
            id: breakfast_id.to_string(),
        })?;

    let participants = BreakfastParticipant::find()
        .filter(breakfast_participant::Column::BreakfastId.eq(breakfast_id))
        .order_by_asc(breakfast_participant::Column::UserId)
        .all(db)
        .await?;

    let mut outcomes = Vec::with_capacity(participants.len());
    let mut failures = 0usize;

    for participant in participants {
        if participant.deducted {
            outcomes.push(ParticipantOutcome::AlreadyCharged {
                user_id: participant.user_id,
            });
            continue;
        }

        let posting = Posting {
            user_id: participant.user_id,
            balance_type: crate::entities::BalanceType::Breakfast,
            kind: TransactionKind::Deduction,
            amount: -participant.cost,
            description: format!("breakfast share for {}", bf.date),
            reference: Some(Reference::breakfast(bf.id)),
        };

        match ledger::apply_transaction(db, actor, posting, alert).await {
            Ok(tx) => {
                let mut active: breakfast_participant::ActiveModel = participant.clone().into();
                active.deducted = Set(true);
                active.update(db).await?;
                outcomes.push(ParticipantOutcome::Charged {
                    user_id: participant.user_id,
                    transaction_id: tx.id,
                });
            }
            Err(err) => {
                tracing::warn!(
                    user_id = participant.user_id,
                    breakfast_id,
                    error = %err,
                    "breakfast share deduction failed"
                );
                failures += 1;
                outcomes.push(ParticipantOutcome::Failed {
                    user_id: participant.user_id,
                    error: err.to_string(),
                });
            }
        }
    }

    let finalized = if failures == 0 && !bf.is_finalized {
        let mut active: breakfast::ActiveModel = bf.into();
        active.is_finalized = Set(true);
        active.update(db).await?;
        true
    } else {
        bf.is_finalized && failures == 0
    };

    Ok(BreakfastChargeReport {
        breakfast_id,
        outcomes,
        finalized,
    })
}
