//! Meal status resolver - the effective on/off decision for a meal cell.
//!
//! Three layers, in precedence order: a governing rule override is terminal;
//! an explicit meal record is next; otherwise the default derived from the
//! holiday calendar and weekend policy applies. Overrides shadow the other
//! layers without mutating them, so removing an override reveals whatever
//! was underneath, not the default.
//!
//! The same module owns togglability: finalization, override governance,
//! and the daily cutoff are checked here before any meal record is written.

use crate::config::settings::AppConfig;
use crate::core::authorizer::{Actor, perms};
use crate::core::{holidays, overrides, settings, users};
use crate::entities::{MealRecord, MealType, correction_history, meal_record};
use crate::errors::{Error, Result, StateBlock};
use chrono::{DateTime, NaiveDate, Timelike, Utc};
use sea_orm::{DatabaseConnection, Set, TransactionTrait, prelude::*};

/// Which layer decided the effective status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusSource {
    /// A rule override governs the cell
    Override,
    /// An explicit meal record exists
    Manual,
    /// Holiday/weekend policy default
    Default,
}

/// The resolved status of one `(user, date, meal)` cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EffectiveStatus {
    pub is_on: bool,
    /// Portions charged if on (guests included)
    pub count: i32,
    pub source: StatusSource,
    /// Whether the owning user could toggle this cell right now
    pub togglable: bool,
    /// Why not, when `togglable` is false
    pub blocked_by: Option<StateBlock>,
}

async fn find_record(
    db: &DatabaseConnection,
    user_id: i64,
    date: NaiveDate,
    meal_type: MealType,
) -> Result<Option<meal_record::Model>> {
    MealRecord::find()
        .filter(meal_record::Column::UserId.eq(user_id))
        .filter(meal_record::Column::Date.eq(date))
        .filter(meal_record::Column::MealType.eq(meal_type))
        .one(db)
        .await
        .map_err(Into::into)
}

/// The cutoff block for a plain user toggling this cell at `now`, if any.
/// Past dates are always blocked; today is blocked once the meal's cutoff
/// hour has been reached; future dates are open.
fn cutoff_block(
    config: &AppConfig,
    date: NaiveDate,
    meal_type: MealType,
    now: DateTime<Utc>,
) -> Option<StateBlock> {
    let today = now.date_naive();
    let passed =
        date < today || (date == today && now.hour() >= config.cutoff.hour_for(meal_type));
    passed.then_some(StateBlock::Cutoff { date, meal_type })
}

/// Resolves the effective status of a cell as of `now`.
pub async fn effective_status_at(
    db: &DatabaseConnection,
    config: &AppConfig,
    user_id: i64,
    date: NaiveDate,
    meal_type: MealType,
    now: DateTime<Utc>,
) -> Result<EffectiveStatus> {
    let record = find_record(db, user_id, date, meal_type).await?;

    if let Some(rule) = overrides::governing(db, user_id, date, meal_type, now).await? {
        let is_on = rule.action == crate::entities::OverrideAction::ForceOn;
        let count = if is_on {
            record.as_ref().map_or(1, |r| r.count.max(1))
        } else {
            0
        };
        return Ok(EffectiveStatus {
            is_on,
            count,
            source: StatusSource::Override,
            togglable: false,
            blocked_by: Some(StateBlock::Overridden {
                override_id: rule.id,
            }),
        });
    }

    let (is_on, count, source) = match &record {
        Some(r) => (r.is_on, r.count, StatusSource::Manual),
        None => {
            let off = holidays::holiday_off(db, &config.holidays, date).await?
                || holidays::is_weekend_off(date, &config.weekend);
            (!off, i32::from(!off), StatusSource::Default)
        }
    };

    // Togglability from the owner's (non-privileged) perspective.
    let blocked_by = if let Some(month) = settings::month_for_date(db, date).await? {
        month.is_finalized.then_some(StateBlock::Finalized {
            year: month.year,
            month: u32::try_from(month.month).unwrap_or(0),
        })
    } else {
        None
    };
    let blocked_by = blocked_by.or_else(|| cutoff_block(config, date, meal_type, now));

    Ok(EffectiveStatus {
        is_on,
        count,
        source,
        togglable: blocked_by.is_none(),
        blocked_by,
    })
}

/// Resolves the effective status of a cell right now.
pub async fn get_effective_status(
    db: &DatabaseConnection,
    config: &AppConfig,
    user_id: i64,
    date: NaiveDate,
    meal_type: MealType,
) -> Result<EffectiveStatus> {
    effective_status_at(db, config, user_id, date, meal_type, Utc::now()).await
}

/// Validated toggle parameters: `count` defaults to one portion when
/// turning on and must be absent or zero when turning off.
fn resolve_count(turn_on: bool, count: Option<i32>) -> Result<i32> {
    match (turn_on, count) {
        (true, None) => Ok(1),
        (true, Some(c)) if c >= 1 => Ok(c),
        (true, Some(c)) => Err(Error::validation(format!(
            "count must be at least 1 when turning a meal on, got {c}"
        ))),
        (false, None | Some(0)) => Ok(0),
        (false, Some(c)) => Err(Error::validation(format!(
            "count must be 0 when turning a meal off, got {c}"
        ))),
    }
}

/// Toggles one cell as of `now`. See [`toggle`].
pub async fn toggle_at(
    db: &DatabaseConnection,
    config: &AppConfig,
    actor: &Actor,
    user_id: i64,
    date: NaiveDate,
    meal_type: MealType,
    turn_on: bool,
    count: Option<i32>,
    now: DateTime<Utc>,
) -> Result<meal_record::Model> {
    let count = resolve_count(turn_on, count)?;

    if actor.user_id != user_id {
        actor.require(perms::MEAL_TOGGLE_ANY)?;
    }

    let user = users::get_user(db, user_id).await?.ok_or(Error::NotFound {
        entity: "user",
        id: user_id.to_string(),
    })?;
    if !user.is_active {
        return Err(Error::validation("cannot toggle meals for an inactive user"));
    }

    // A governing override is terminal for everyone; edit the override
    // instead of the cell.
    if let Some(rule) = overrides::governing(db, user_id, date, meal_type, now).await? {
        return Err(Error::state(StateBlock::Overridden {
            override_id: rule.id,
        }));
    }

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

    if !actor.can(perms::MEAL_CUTOFF_EXEMPT) {
        if let Some(block) = cutoff_block(config, date, meal_type, now) {
            return Err(Error::state(block));
        }
    }

    let existing = find_record(db, user_id, date, meal_type).await?;
    let txn = db.begin().await?;

    let record = match existing {
        Some(existing) => {
            let mut active: meal_record::ActiveModel = existing.into();
            active.is_on = Set(turn_on);
            active.count = Set(count);
            active.is_manually_set = Set(true);
            active.modified_by = Set(actor.user_id);
            active.updated_at = Set(now);
            active.update(&txn).await?
        }
        None => {
            meal_record::ActiveModel {
                user_id: Set(user_id),
                date: Set(date),
                meal_type: Set(meal_type),
                is_on: Set(turn_on),
                count: Set(count),
                is_manually_set: Set(true),
                modified_by: Set(actor.user_id),
                updated_at: Set(now),
                ..Default::default()
            }
            .insert(&txn)
            .await?
        }
    };

    if force_edit {
        correction_history::ActiveModel {
            entity_kind: Set("meal_records".to_string()),
            entity_id: Set(record.id),
            action: Set("force_edit".to_string()),
            detail: Set(format!(
                "set {meal_type} on {date} to {} (count {count}) inside a finalized month",
                if turn_on { "on" } else { "off" }
            )),
            performed_by: Set(actor.user_id),
            created_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
    }

    txn.commit().await?;
    Ok(record)
}

/// Toggles one cell right now, enforcing finalization, override governance,
/// the cutoff, and ownership.
#[allow(clippy::too_many_arguments)]
pub async fn toggle(
    db: &DatabaseConnection,
    config: &AppConfig,
    actor: &Actor,
    user_id: i64,
    date: NaiveDate,
    meal_type: MealType,
    turn_on: bool,
    count: Option<i32>,
) -> Result<meal_record::Model> {
    toggle_at(
        db,
        config,
        actor,
        user_id,
        date,
        meal_type,
        turn_on,
        count,
        Utc::now(),
    )
    .await
}

/// Outcome of one date inside a bulk toggle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToggleOutcome {
    Applied { date: NaiveDate, is_on: bool },
    Skipped { date: NaiveDate, block: StateBlock },
}

/// Toggles every date in `start..=end` independently. A date that fails its
/// togglability check is skipped and reported, never aborting the rest.
/// Ranges longer than 31 days are rejected outright.
#[allow(clippy::too_many_arguments)]
pub async fn toggle_range(
    db: &DatabaseConnection,
    config: &AppConfig,
    actor: &Actor,
    user_id: i64,
    start: NaiveDate,
    end: NaiveDate,
    meal_type: MealType,
    turn_on: bool,
) -> Result<Vec<ToggleOutcome>> {
    if start > end {
        return Err(Error::validation("range start must not follow end"));
    }
    let span_days = (end - start).num_days() + 1;
    if span_days > settings::MAX_RANGE_DAYS {
        return Err(Error::validation(format!(
            "range spans {span_days} days; the maximum is {}",
            settings::MAX_RANGE_DAYS
        )));
    }

    let now = Utc::now();
    let mut outcomes = Vec::with_capacity(usize::try_from(span_days).unwrap_or_default());
    for date in start.iter_days().take_while(|d| *d <= end) {
        match toggle_at(db, config, actor, user_id, date, meal_type, turn_on, None, now).await {
            Ok(record) => outcomes.push(ToggleOutcome::Applied {
                date,
                is_on: record.is_on,
            }),
            Err(Error::State { block }) => outcomes.push(ToggleOutcome::Skipped { date, block }),
            Err(other) => return Err(other),
        }
    }
    Ok(outcomes)
}
