//! Month settings - rates and the finalization lock for a billing month.
//!
//! Finalization is one-way through the public API; only the audited
//! force-unfinalize path reverts it.

use crate::core::authorizer::{Actor, perms};
use crate::entities::{MonthSettings, correction_history, month_settings};
use crate::errors::{Error, Result, StateBlock};
use chrono::{NaiveDate, Utc};
use sea_orm::{DatabaseConnection, QueryOrder, Set, TransactionTrait, prelude::*};

/// Longest allowed billing range, inclusive of both endpoints.
pub const MAX_RANGE_DAYS: i64 = 31;

/// Input for creating a billing month.
#[derive(Debug, Clone)]
pub struct NewMonth {
    pub year: i32,
    pub month: u32,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Per-meal lunch rate in minor units
    pub lunch_rate: i64,
    /// Per-meal dinner rate in minor units
    pub dinner_rate: i64,
}

impl NewMonth {
    fn validate(&self) -> Result<()> {
        if !(1..=12).contains(&self.month) {
            return Err(Error::validation("month must be 1..=12"));
        }
        if self.start_date > self.end_date {
            return Err(Error::validation("start date must not follow end date"));
        }
        let span_days = (self.end_date - self.start_date).num_days() + 1;
        if span_days > MAX_RANGE_DAYS {
            return Err(Error::validation(format!(
                "billing range spans {span_days} days; the maximum is {MAX_RANGE_DAYS}"
            )));
        }
        if self.lunch_rate <= 0 || self.dinner_rate <= 0 {
            return Err(Error::validation("meal rates must be positive"));
        }
        Ok(())
    }
}

/// Creates a billing month. `(year, month)` must be unique.
pub async fn create_month(
    db: &DatabaseConnection,
    actor: &Actor,
    input: NewMonth,
) -> Result<month_settings::Model> {
    actor.require(perms::MONTH_MANAGE)?;
    input.validate()?;

    let existing = MonthSettings::find()
        .filter(month_settings::Column::Year.eq(input.year))
        .filter(month_settings::Column::Month.eq(i32::try_from(input.month).unwrap_or(0)))
        .one(db)
        .await?;
    if existing.is_some() {
        return Err(Error::Conflict {
            message: format!(
                "month settings for {}-{:02} already exist",
                input.year, input.month
            ),
        });
    }

    let row = month_settings::ActiveModel {
        year: Set(input.year),
        month: Set(i32::try_from(input.month).unwrap_or(0)),
        start_date: Set(input.start_date),
        end_date: Set(input.end_date),
        lunch_rate: Set(input.lunch_rate),
        dinner_rate: Set(input.dinner_rate),
        is_finalized: Set(false),
        ..Default::default()
    };
    Ok(row.insert(db).await?)
}

/// Finds the month settings row whose range contains `date`, if any.
pub async fn month_for_date(
    db: &DatabaseConnection,
    date: NaiveDate,
) -> Result<Option<month_settings::Model>> {
    MonthSettings::find()
        .filter(month_settings::Column::StartDate.lte(date))
        .filter(month_settings::Column::EndDate.gte(date))
        .one(db)
        .await
        .map_err(Into::into)
}

/// The active (lunch, dinner) rates for a date. A date in a gap between
/// configured months is a state error; callers must treat it as fatal for
/// that date rather than defaulting to zero.
pub async fn active_rate(db: &DatabaseConnection, date: NaiveDate) -> Result<(i64, i64)> {
    let month = month_for_date(db, date)
        .await?
        .ok_or(Error::state(StateBlock::NoActiveRate { date }))?;
    Ok((month.lunch_rate, month.dinner_rate))
}

/// Whether the month containing `date` is finalized. Dates without month
/// settings are not finalized.
pub async fn is_date_finalized(db: &DatabaseConnection, date: NaiveDate) -> Result<bool> {
    Ok(month_for_date(db, date).await?.is_some_and(|m| m.is_finalized))
}

/// All finalized months, oldest first. The job runner re-posts charges for
/// these on startup; the charge run itself is idempotent.
pub async fn finalized_months(db: &DatabaseConnection) -> Result<Vec<month_settings::Model>> {
    MonthSettings::find()
        .filter(month_settings::Column::IsFinalized.eq(true))
        .order_by_asc(month_settings::Column::StartDate)
        .all(db)
        .await
        .map_err(Into::into)
}

async fn get_month(db: &DatabaseConnection, id: i64) -> Result<month_settings::Model> {
    MonthSettings::find_by_id(id)
        .one(db)
        .await?
        .ok_or(Error::NotFound {
            entity: "month settings",
            id: id.to_string(),
        })
}

/// Finalizes a month. One-way via this API; see [`force_unfinalize`].
pub async fn finalize(db: &DatabaseConnection, actor: &Actor, id: i64) -> Result<()> {
    actor.require(perms::MONTH_MANAGE)?;

    let month = get_month(db, id).await?;
    if month.is_finalized {
        return Err(Error::Conflict {
            message: format!("month {}-{:02} is already finalized", month.year, month.month),
        });
    }

    let (year, month_no) = (month.year, month.month);
    let mut active: month_settings::ActiveModel = month.into();
    active.is_finalized = Set(true);
    active.update(db).await?;

    tracing::info!(year, month = month_no, "month finalized");
    Ok(())
}

/// Reverts a finalized month. Privileged and audited: writes a correction
/// history row in the same database transaction.
pub async fn force_unfinalize(
    db: &DatabaseConnection,
    actor: &Actor,
    id: i64,
    reason: &str,
) -> Result<()> {
    actor.require(perms::MONTH_FORCE_UNFINALIZE)?;

    let month = get_month(db, id).await?;
    if !month.is_finalized {
        return Err(Error::Conflict {
            message: format!("month {}-{:02} is not finalized", month.year, month.month),
        });
    }

    let txn = db.begin().await?;

    let mut active: month_settings::ActiveModel = month.into();
    active.is_finalized = Set(false);
    active.update(&txn).await?;

    correction_history::ActiveModel {
        entity_kind: Set("month_settings".to_string()),
        entity_id: Set(id),
        action: Set("force_unfinalize".to_string()),
        detail: Set(reason.to_string()),
        performed_by: Set(actor.user_id),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    txn.commit().await?;

    tracing::warn!(month_settings_id = id, reason, "month force-unfinalized");
    Ok(())
}
