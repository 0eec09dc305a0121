//! Holiday and weekend policy - read-only lookups for default-off days.
//!
//! Holidays are admin-managed reference data; the weekend policy is plain
//! configuration. Both feed the resolver's default layer: a date is
//! default-off when it is a policy-relevant holiday or a weekend-off day.

use crate::core::authorizer::{Actor, perms};
use crate::entities::{Holiday, HolidayKind, holiday};
use crate::errors::{Error, Result};
use chrono::{Datelike, NaiveDate, Weekday};
use sea_orm::{Condition, DatabaseConnection, Set, prelude::*};
use serde::{Deserialize, Serialize};

/// Independent weekend-off flags. At most one of the Saturday sub-rules may
/// apply to a date; configurations where the odd/even flags overlap each
/// other or blanket `saturday_off` are rejected at load time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeekendPolicy {
    /// Every Friday is off
    pub friday_off: bool,
    /// Every Saturday is off
    pub saturday_off: bool,
    /// Saturdays with odd ordinal (1st, 3rd, 5th of the month) are off
    pub odd_saturday_off: bool,
    /// Saturdays with even ordinal (2nd, 4th of the month) are off
    pub even_saturday_off: bool,
}

impl WeekendPolicy {
    /// Rejects contradictory Saturday sub-rules.
    pub fn validate(&self) -> Result<()> {
        if self.odd_saturday_off && self.even_saturday_off {
            return Err(Error::validation(
                "odd_saturday_off and even_saturday_off cannot both be set; \
                 use saturday_off for every Saturday",
            ));
        }
        if self.saturday_off && (self.odd_saturday_off || self.even_saturday_off) {
            return Err(Error::validation(
                "saturday_off already covers every Saturday; \
                 drop the odd/even Saturday flags",
            ));
        }
        Ok(())
    }
}

/// Which holiday kinds cause a default-off day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HolidayPolicy {
    /// Government holidays are off
    pub government_off: bool,
    /// Optional holidays are off
    pub optional_off: bool,
    /// Religious holidays are off
    pub religious_off: bool,
}

impl Default for HolidayPolicy {
    fn default() -> Self {
        Self {
            government_off: true,
            optional_off: false,
            religious_off: true,
        }
    }
}

impl HolidayPolicy {
    /// Whether the given holiday kind causes a default-off day.
    #[must_use]
    pub fn kind_off(&self, kind: HolidayKind) -> bool {
        match kind {
            HolidayKind::Government => self.government_off,
            HolidayKind::Optional => self.optional_off,
            HolidayKind::Religious => self.religious_off,
        }
    }
}

/// Ordinal of a Saturday within its month (1st Saturday = 1).
/// Defined for any date as `ceil(day_of_month / 7)`.
#[must_use]
pub fn saturday_ordinal(date: NaiveDate) -> u32 {
    date.day().div_ceil(7)
}

/// Whether the weekend policy marks this date off.
#[must_use]
pub fn is_weekend_off(date: NaiveDate, policy: &WeekendPolicy) -> bool {
    match date.weekday() {
        Weekday::Fri => policy.friday_off,
        Weekday::Sat => {
            if policy.saturday_off {
                return true;
            }
            let odd = saturday_ordinal(date) % 2 == 1;
            (odd && policy.odd_saturday_off) || (!odd && policy.even_saturday_off)
        }
        _ => false,
    }
}

/// Looks up the active holiday covering a date, if any. Dated rows win over
/// recurring (month, day) matches.
pub async fn find_holiday(
    db: &DatabaseConnection,
    date: NaiveDate,
) -> Result<Option<holiday::Model>> {
    let month = i32::try_from(date.month()).unwrap_or(0);
    let day = i32::try_from(date.day()).unwrap_or(0);

    let matches = Holiday::find()
        .filter(holiday::Column::IsActive.eq(true))
        .filter(
            Condition::any().add(holiday::Column::Date.eq(date)).add(
                Condition::all()
                    .add(holiday::Column::RecurringMonth.eq(month))
                    .add(holiday::Column::RecurringDay.eq(day)),
            ),
        )
        .all(db)
        .await?;

    Ok(matches
        .iter()
        .find(|h| h.date == Some(date))
        .or_else(|| matches.first())
        .cloned())
}

/// Whether the date is a holiday that the configured policy treats as off.
pub async fn holiday_off(
    db: &DatabaseConnection,
    policy: &HolidayPolicy,
    date: NaiveDate,
) -> Result<bool> {
    Ok(find_holiday(db, date)
        .await?
        .is_some_and(|h| policy.kind_off(h.kind)))
}

/// A holiday definition from configuration, used for calendar sync.
#[derive(Debug, Clone, Deserialize)]
pub struct HolidaySeed {
    /// Exact date for one-off holidays
    pub date: Option<NaiveDate>,
    /// Month (1-12) for recurring holidays
    pub recurring_month: Option<i32>,
    /// Day of month for recurring holidays
    pub recurring_day: Option<i32>,
    /// Holiday classification
    pub kind: HolidayKind,
    /// Human-readable name
    pub name: String,
}

impl HolidaySeed {
    fn validate(&self) -> Result<()> {
        match (self.date, self.recurring_month, self.recurring_day) {
            (Some(_), None, None) => Ok(()),
            (None, Some(m), Some(d)) if (1..=12).contains(&m) && (1..=31).contains(&d) => Ok(()),
            _ => Err(Error::validation(format!(
                "holiday '{}' must have either a date or a valid recurring (month, day) pair",
                self.name
            ))),
        }
    }
}

/// Creates a holiday (admin operation).
pub async fn add_holiday(
    db: &DatabaseConnection,
    actor: &Actor,
    seed: &HolidaySeed,
) -> Result<holiday::Model> {
    actor.require(perms::HOLIDAY_MANAGE)?;
    seed.validate()?;

    let row = holiday::ActiveModel {
        date: Set(seed.date),
        recurring_month: Set(seed.recurring_month),
        recurring_day: Set(seed.recurring_day),
        kind: Set(seed.kind),
        name: Set(seed.name.clone()),
        is_active: Set(true),
        ..Default::default()
    };
    Ok(row.insert(db).await?)
}

/// Deactivates a holiday (admin operation). The row is kept for history.
pub async fn deactivate_holiday(db: &DatabaseConnection, actor: &Actor, id: i64) -> Result<()> {
    actor.require(perms::HOLIDAY_MANAGE)?;

    let row = Holiday::find_by_id(id)
        .one(db)
        .await?
        .ok_or(Error::NotFound {
            entity: "holiday",
            id: id.to_string(),
        })?;

    let mut active: holiday::ActiveModel = row.into();
    active.is_active = Set(false);
    active.update(db).await?;
    Ok(())
}

/// Upserts the configured holiday calendar. Idempotent: a seed whose
/// (date | recurring pair) and name already exist as an active row is
/// skipped. Returns how many rows were inserted.
///
/// This is the target of the scheduled holiday-sync job.
pub async fn sync_holidays(
    db: &DatabaseConnection,
    actor: &Actor,
    seeds: &[HolidaySeed],
) -> Result<usize> {
    actor.require(perms::HOLIDAY_MANAGE)?;

    let mut inserted = 0;
    for seed in seeds {
        seed.validate()?;

        let mut query = Holiday::find()
            .filter(holiday::Column::IsActive.eq(true))
            .filter(holiday::Column::Name.eq(seed.name.clone()));
        query = match seed.date {
            Some(date) => query.filter(holiday::Column::Date.eq(date)),
            None => query
                .filter(holiday::Column::RecurringMonth.eq(seed.recurring_month))
                .filter(holiday::Column::RecurringDay.eq(seed.recurring_day)),
        };

        if query.one(db).await?.is_none() {
            let row = holiday::ActiveModel {
                date: Set(seed.date),
                recurring_month: Set(seed.recurring_month),
                recurring_day: Set(seed.recurring_day),
                kind: Set(seed.kind),
                name: Set(seed.name.clone()),
                is_active: Set(true),
                ..Default::default()
            };
            row.insert(db).await?;
            inserted += 1;
        }
    }

    if inserted > 0 {
        tracing::info!(inserted, "holiday calendar synced");
    }
    Ok(inserted)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_saturday_ordinal() {
        // August 2026: Saturdays fall on 1, 8, 15, 22, 29
        assert_eq!(saturday_ordinal(d(2026, 8, 1)), 1);
        assert_eq!(saturday_ordinal(d(2026, 8, 8)), 2);
        assert_eq!(saturday_ordinal(d(2026, 8, 15)), 3);
        assert_eq!(saturday_ordinal(d(2026, 8, 22)), 4);
        assert_eq!(saturday_ordinal(d(2026, 8, 29)), 5);
    }

    #[test]
    fn test_weekend_policy_friday() {
        let policy = WeekendPolicy {
            friday_off: true,
            ..Default::default()
        };
        assert!(is_weekend_off(d(2026, 8, 7), &policy)); // Friday
        assert!(!is_weekend_off(d(2026, 8, 8), &policy)); // Saturday
        assert!(!is_weekend_off(d(2026, 8, 9), &policy)); // Sunday
    }

    #[test]
    fn test_weekend_policy_odd_even_saturdays() {
        let odd = WeekendPolicy {
            odd_saturday_off: true,
            ..Default::default()
        };
        assert!(is_weekend_off(d(2026, 8, 1), &odd)); // 1st Saturday
        assert!(!is_weekend_off(d(2026, 8, 8), &odd)); // 2nd Saturday
        assert!(is_weekend_off(d(2026, 8, 15), &odd)); // 3rd Saturday

        let even = WeekendPolicy {
            even_saturday_off: true,
            ..Default::default()
        };
        assert!(!is_weekend_off(d(2026, 8, 1), &even));
        assert!(is_weekend_off(d(2026, 8, 8), &even));
        assert!(is_weekend_off(d(2026, 8, 22), &even)); // 4th Saturday
    }

    #[test]
    fn test_weekend_policy_blanket_saturday() {
        let policy = WeekendPolicy {
            saturday_off: true,
            ..Default::default()
        };
        assert!(is_weekend_off(d(2026, 8, 1), &policy));
        assert!(is_weekend_off(d(2026, 8, 8), &policy));
    }

    #[test]
    fn test_weekend_policy_rejects_contradictions() {
        let both = WeekendPolicy {
            odd_saturday_off: true,
            even_saturday_off: true,
            ..Default::default()
        };
        assert!(both.validate().is_err());

        let redundant = WeekendPolicy {
            saturday_off: true,
            odd_saturday_off: true,
            ..Default::default()
        };
        assert!(redundant.validate().is_err());

        let fine = WeekendPolicy {
            friday_off: true,
            odd_saturday_off: true,
            ..Default::default()
        };
        assert!(fine.validate().is_ok());
    }

    #[tokio::test]
    async fn test_find_holiday_dated_and_recurring() -> crate::errors::Result<()> {
        let db = setup_test_db().await?;
        let admin = admin_actor();

        add_holiday(
            &db,
            &admin,
            &HolidaySeed {
                date: Some(d(2026, 3, 26)),
                recurring_month: None,
                recurring_day: None,
                kind: HolidayKind::Government,
                name: "Independence Day".to_string(),
            },
        )
        .await?;
        add_holiday(
            &db,
            &admin,
            &HolidaySeed {
                date: None,
                recurring_month: Some(5),
                recurring_day: Some(1),
                kind: HolidayKind::Government,
                name: "May Day".to_string(),
            },
        )
        .await?;

        let dated = find_holiday(&db, d(2026, 3, 26)).await?;
        assert_eq!(dated.unwrap().name, "Independence Day");

        // Recurring match ignores the year
        let recurring = find_holiday(&db, d(2027, 5, 1)).await?;
        assert_eq!(recurring.unwrap().name, "May Day");

        assert!(find_holiday(&db, d(2026, 3, 27)).await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_holiday_off_respects_kind_policy() -> crate::errors::Result<()> {
        let db = setup_test_db().await?;
        let admin = admin_actor();

        add_holiday(
            &db,
            &admin,
            &HolidaySeed {
                date: Some(d(2026, 4, 14)),
                recurring_month: None,
                recurring_day: None,
                kind: HolidayKind::Optional,
                name: "New Year (optional)".to_string(),
            },
        )
        .await?;

        let strict = HolidayPolicy {
            government_off: true,
            optional_off: false,
            religious_off: true,
        };
        assert!(!holiday_off(&db, &strict, d(2026, 4, 14)).await?);

        let lenient = HolidayPolicy {
            optional_off: true,
            ..strict
        };
        assert!(holiday_off(&db, &lenient, d(2026, 4, 14)).await?);
        Ok(())
    }

    #[tokio::test]
    async fn test_deactivated_holiday_is_ignored() -> crate::errors::Result<()> {
        let db = setup_test_db().await?;
        let admin = admin_actor();

        let row = add_holiday(
            &db,
            &admin,
            &HolidaySeed {
                date: Some(d(2026, 12, 16)),
                recurring_month: None,
                recurring_day: None,
                kind: HolidayKind::Government,
                name: "Victory Day".to_string(),
            },
        )
        .await?;

        deactivate_holiday(&db, &admin, row.id).await?;
        assert!(find_holiday(&db, d(2026, 12, 16)).await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_sync_holidays_is_idempotent() -> crate::errors::Result<()> {
        let db = setup_test_db().await?;
        let admin = admin_actor();

        let seeds = vec![
            HolidaySeed {
                date: Some(d(2026, 2, 21)),
                recurring_month: None,
                recurring_day: None,
                kind: HolidayKind::Government,
                name: "Language Day".to_string(),
            },
            HolidaySeed {
                date: None,
                recurring_month: Some(5),
                recurring_day: Some(1),
                kind: HolidayKind::Government,
                name: "May Day".to_string(),
            },
        ];

        assert_eq!(sync_holidays(&db, &admin, &seeds).await?, 2);
        assert_eq!(sync_holidays(&db, &admin, &seeds).await?, 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_holiday_crud_requires_permission() -> crate::errors::Result<()> {
        let db = setup_test_db().await?;
        let plain = plain_actor();

        let result = add_holiday(
            &db,
            &plain,
            &HolidaySeed {
                date: Some(d(2026, 1, 1)),
                recurring_month: None,
                recurring_day: None,
                kind: HolidayKind::Optional,
                name: "Nope".to_string(),
            },
        )
        .await;
        assert!(matches!(result, Err(Error::Permission { .. })));
        Ok(())
    }
}
