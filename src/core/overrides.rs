//! Rule overrides - prioritized force-on/force-off rules.
//!
//! Overrides shadow manual meal records without mutating them; the resolver
//! treats the winning override as terminal. Matching is done in SQL where
//! cheap (target, activity, scope) and in code where SQLite can't express it
//! (recurring date math, tie-break ordering).

use crate::core::authorizer::{Actor, perms};
use crate::entities::{
    DateSpec, MealScope, MealType, OverrideAction, OverrideTarget, RuleOverride, rule_override,
};
use crate::errors::{Error, Result};
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use sea_orm::{Condition, DatabaseConnection, Set, prelude::*};

/// Whether a rule's date specification covers the given date.
#[must_use]
pub fn date_spec_matches(rule: &rule_override::Model, date: NaiveDate) -> bool {
    match rule.date_spec {
        DateSpec::Single => rule.date == Some(date),
        DateSpec::Range => match (rule.start_date, rule.end_date) {
            (Some(start), Some(end)) => start <= date && date <= end,
            _ => false,
        },
        DateSpec::Recurring => {
            let weekday_bit = 1 << date.weekday().num_days_from_monday();
            let weekly = rule.weekday_mask & weekday_bit != 0;
            let monthly = rule
                .recurring_day_of_month
                .is_some_and(|dom| i64::from(dom) == i64::from(date.day()));
            weekly || monthly
        }
    }
}

/// Finds the active overrides governing `(user_id, date, meal_type)`,
/// ordered so the first element is the winner: priority descending, then
/// target specificity (user > `all_users` > global), then most recent
/// creation.
pub async fn find_matching(
    db: &DatabaseConnection,
    user_id: i64,
    date: NaiveDate,
    meal_type: MealType,
    now: DateTime<Utc>,
) -> Result<Vec<rule_override::Model>> {
    let candidates = RuleOverride::find()
        .filter(rule_override::Column::IsActive.eq(true))
        .filter(
            Condition::any()
                .add(rule_override::Column::Target.eq(OverrideTarget::AllUsers))
                .add(rule_override::Column::Target.eq(OverrideTarget::Global))
                .add(
                    Condition::all()
                        .add(rule_override::Column::Target.eq(OverrideTarget::User))
                        .add(rule_override::Column::TargetUserId.eq(user_id)),
                ),
        )
        .all(db)
        .await?;

    let mut matching: Vec<_> = candidates
        .into_iter()
        .filter(|r| r.expires_at.is_none_or(|exp| exp > now))
        .filter(|r| r.meal_scope.covers(meal_type))
        .filter(|r| date_spec_matches(r, date))
        .collect();

    matching.sort_by(|a, b| {
        b.priority
            .cmp(&a.priority)
            .then(b.target.specificity().cmp(&a.target.specificity()))
            .then(b.created_at.cmp(&a.created_at))
    });

    Ok(matching)
}

/// The winning override for a cell, if any.
pub async fn governing(
    db: &DatabaseConnection,
    user_id: i64,
    date: NaiveDate,
    meal_type: MealType,
    now: DateTime<Utc>,
) -> Result<Option<rule_override::Model>> {
    Ok(find_matching(db, user_id, date, meal_type, now)
        .await?
        .into_iter()
        .next())
}

/// Input for creating an override rule.
#[derive(Debug, Clone)]
pub struct NewOverride {
    pub target: OverrideTarget,
    pub target_user_id: Option<i64>,
    pub date_spec: DateSpec,
    pub date: Option<NaiveDate>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub weekday_mask: i32,
    pub recurring_day_of_month: Option<i32>,
    pub meal_scope: MealScope,
    pub action: OverrideAction,
    pub priority: i32,
    pub expires_at: Option<DateTime<Utc>>,
}

impl NewOverride {
    fn validate(&self) -> Result<()> {
        match self.target {
            OverrideTarget::User if self.target_user_id.is_none() => {
                return Err(Error::validation("user-targeted override needs a user id"));
            }
            OverrideTarget::AllUsers | OverrideTarget::Global
                if self.target_user_id.is_some() =>
            {
                return Err(Error::validation(
                    "only user-targeted overrides may name a user id",
                ));
            }
            _ => {}
        }

        match self.date_spec {
            DateSpec::Single => {
                if self.date.is_none() {
                    return Err(Error::validation("single-date override needs a date"));
                }
            }
            DateSpec::Range => match (self.start_date, self.end_date) {
                (Some(start), Some(end)) if start <= end => {}
                (Some(_), Some(_)) => {
                    return Err(Error::validation("override range start must not follow end"));
                }
                _ => return Err(Error::validation("range override needs start and end dates")),
            },
            DateSpec::Recurring => {
                let has_weekdays = self.weekday_mask != 0;
                let has_dom = self.recurring_day_of_month.is_some();
                if !has_weekdays && !has_dom {
                    return Err(Error::validation(
                        "recurring override needs weekdays or a day of month",
                    ));
                }
                if self.weekday_mask & !0x7f != 0 {
                    return Err(Error::validation("weekday mask has bits beyond Mon..Sun"));
                }
                if let Some(dom) = self.recurring_day_of_month {
                    if !(1..=31).contains(&dom) {
                        return Err(Error::validation("day of month must be 1..=31"));
                    }
                }
            }
        }
        Ok(())
    }
}

/// Creates an override rule (manager/admin operation).
pub async fn create_override(
    db: &DatabaseConnection,
    actor: &Actor,
    input: NewOverride,
) -> Result<rule_override::Model> {
    actor.require(perms::OVERRIDE_MANAGE)?;
    input.validate()?;

    let row = rule_override::ActiveModel {
        target: Set(input.target),
        target_user_id: Set(input.target_user_id),
        date_spec: Set(input.date_spec),
        date: Set(input.date),
        start_date: Set(input.start_date),
        end_date: Set(input.end_date),
        weekday_mask: Set(input.weekday_mask),
        recurring_day_of_month: Set(input.recurring_day_of_month),
        meal_scope: Set(input.meal_scope),
        action: Set(input.action),
        priority: Set(input.priority),
        is_active: Set(true),
        expires_at: Set(input.expires_at),
        created_at: Set(Utc::now()),
        created_by: Set(actor.user_id),
        ..Default::default()
    };
    Ok(row.insert(db).await?)
}

/// Deactivates an override. The shadowed manual record or default reasserts
/// itself; nothing else is touched.
pub async fn deactivate_override(db: &DatabaseConnection, actor: &Actor, id: i64) -> Result<()> {
    actor.require(perms::OVERRIDE_MANAGE)?;

    let row = RuleOverride::find_by_id(id)
        .one(db)
        .await?
        .ok_or(Error::NotFound {
            entity: "rule override",
            id: id.to_string(),
        })?;

    let mut active: rule_override::ActiveModel = row.into();
    active.is_active = Set(false);
    active.update(db).await?;
    Ok(())
}
