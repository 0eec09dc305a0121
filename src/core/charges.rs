//! Month-end charge application.
//!
//! For each active user and each of lunch/dinner, the run sums effective-on
//! counts across the month range through the resolver (so overrides and
//! defaults are respected, never a raw table scan), multiplies by the active
//! rate, and posts one aggregate deduction referencing the month settings
//! row. That reference triple `(month settings, user, balance type)` is the
//! natural dedupe key: a re-run after a partial failure skips pairs that
//! already carry a non-corrected charge, so the run is idempotent.
//!
//! The whole pass holds a process-wide month-charge lock, so a toggle
//! landing mid-run is deterministically included or excluded rather than
//! racing the read-then-post pass. This is a batch entry point for the job
//! runner, not an inline request path.

use crate::config::settings::AppConfig;
use crate::core::authorizer::{Actor, perms};
use crate::core::ledger::{self, Posting, Reference};
use crate::core::{resolver, users};
use crate::entities::{
    BalanceType, MealType, MonthSettings, ReferenceKind, Transaction, TransactionKind,
    month_settings, transaction,
};
use crate::errors::{Error, Result, StateBlock};
use crate::notify::BalanceAlert;
use chrono::Utc;
use sea_orm::{DatabaseConnection, prelude::*};
use tokio::sync::Mutex;

/// Serializes month-end charge runs against each other (and lets toggles
/// observe a consistent before/after boundary).
static MONTH_CHARGE_LOCK: Mutex<()> = Mutex::const_new(());

/// What happened to one (user, meal) pair during a charge run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChargeOutcome {
    /// Deduction posted
    Charged {
        user_id: i64,
        balance_type: BalanceType,
        meal_count: i64,
        transaction_id: i64,
        amount: i64,
    },
    /// A non-corrected charge for this pair already exists
    AlreadyCharged {
        user_id: i64,
        balance_type: BalanceType,
    },
    /// No effective-on meals in the range; nothing to post
    NoMeals {
        user_id: i64,
        balance_type: BalanceType,
    },
    /// The ledger rejected the deduction; the run continued
    Failed {
        user_id: i64,
        balance_type: BalanceType,
        error: String,
    },
}

/// Result of one month-end charge run.
#[derive(Debug, Clone)]
pub struct MonthChargeReport {
    pub month_settings_id: i64,
    pub outcomes: Vec<ChargeOutcome>,
}

impl MonthChargeReport {
    /// True when no pair is left in a failed state.
    #[must_use]
    pub fn clean(&self) -> bool {
        !self
            .outcomes
            .iter()
            .any(|o| matches!(o, ChargeOutcome::Failed { .. }))
    }
}

async fn already_charged(
    db: &DatabaseConnection,
    month_settings_id: i64,
    user_id: i64,
    balance_type: BalanceType,
) -> Result<bool> {
    Ok(Transaction::find()
        .filter(transaction::Column::UserId.eq(user_id))
        .filter(transaction::Column::BalanceType.eq(balance_type))
        .filter(transaction::Column::ReferenceKind.eq(ReferenceKind::MonthSettings))
        .filter(transaction::Column::ReferenceId.eq(month_settings_id))
        .filter(transaction::Column::IsCorrected.eq(false))
        .one(db)
        .await?
        .is_some())
}

/// Posts the month's lunch and dinner charges for every active user.
/// The month must be finalized first; until then toggles could still change
/// the counts the charges are based on.
pub async fn post_month_end_charges(
    db: &DatabaseConnection,
    config: &AppConfig,
    actor: &Actor,
    month_settings_id: i64,
    alert: Option<&BalanceAlert>,
) -> Result<MonthChargeReport> {
    actor.require(perms::CHARGES_RUN)?;

    let month = MonthSettings::find_by_id(month_settings_id)
        .one(db)
        .await?
        .ok_or(Error::NotFound {
            entity: "month settings",
            id: month_settings_id.to_string(),
        })?;

    if !month.is_finalized {
        return Err(Error::state(StateBlock::NotFinalized {
            year: month.year,
            month: u32::try_from(month.month).unwrap_or(0),
        }));
    }

    let _guard = MONTH_CHARGE_LOCK.lock().await;
    let now = Utc::now();
    let active_users = users::get_active_users(db).await?;
    let mut outcomes = Vec::with_capacity(active_users.len() * 2);

    for user in &active_users {
        for (meal_type, rate) in [
            (MealType::Lunch, month.lunch_rate),
            (MealType::Dinner, month.dinner_rate),
        ] {
            let balance_type = meal_type.balance_type();

            if already_charged(db, month.id, user.id, balance_type).await? {
                outcomes.push(ChargeOutcome::AlreadyCharged {
                    user_id: user.id,
                    balance_type,
                });
                continue;
            }

            let meal_count = month_meal_count(db, config, &month, user.id, meal_type, now).await?;
            if meal_count == 0 {
                outcomes.push(ChargeOutcome::NoMeals {
                    user_id: user.id,
                    balance_type,
                });
                continue;
            }

            let amount = -(meal_count * rate);
            let posting = Posting {
                user_id: user.id,
                balance_type,
                kind: TransactionKind::Deduction,
                amount,
                description: format!(
                    "{meal_type} charges for {}-{:02} ({meal_count} meals @ {rate})",
                    month.year, month.month
                ),
                reference: Some(Reference::month_settings(month.id)),
            };

            match ledger::apply_transaction(db, actor, posting, alert).await {
                Ok(tx) => outcomes.push(ChargeOutcome::Charged {
                    user_id: user.id,
                    balance_type,
                    meal_count,
                    transaction_id: tx.id,
                    amount,
                }),
                Err(err) => {
                    tracing::warn!(
                        user_id = user.id,
                        ?balance_type,
                        error = %err,
                        "month-end charge failed"
                    );
                    outcomes.push(ChargeOutcome::Failed {
                        user_id: user.id,
                        balance_type,
                        error: err.to_string(),
                    });
                }
            }
        }
    }

    tracing::info!(
        month_settings_id,
        pairs = outcomes.len(),
        "month-end charge run finished"
    );

    Ok(MonthChargeReport {
        month_settings_id,
        outcomes,
    })
}

/// Sum of effective-on counts for one user and meal across the month range,
/// resolved per date.
async fn month_meal_count(
    db: &DatabaseConnection,
    config: &AppConfig,
    month: &month_settings::Model,
    user_id: i64,
    meal_type: MealType,
    now: chrono::DateTime<Utc>,
) -> Result<i64> {
    let mut total = 0i64;
    for date in month
        .start_date
        .iter_days()
        .take_while(|d| *d <= month.end_date)
    {
        let status =
            resolver::effective_status_at(db, config, user_id, date, meal_type, now).await?;
        if status.is_on {
            total += i64::from(status.count);
        }
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core::authorizer::Actor;
    use crate::core::overrides::{self, NewOverride};
    use crate::core::settings::{self, NewMonth};
    use crate::entities::{
        DateSpec, MealScope, OverrideAction, OverrideTarget, Role,
    };
    use chrono::NaiveDate;

    use crate::test_utils::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[tokio::test]
    async fn test_twenty_on_days_post_one_aggregate_deduction() -> Result<()> {
        let (db, user) = setup_with_user().await?;
        let config = test_config();
        let manager = manager_actor();

        let month = settings::create_month(
            &db,
            &manager,
            NewMonth {
                year: 2026,
                month: 8,
                start_date: d(2026, 8, 1),
                end_date: d(2026, 8, 20),
                lunch_rate: 50,
                dinner_rate: 60,
            },
        )
        .await?;
        settings::finalize(&db, &manager, month.id).await?;

        let report = post_month_end_charges(&db, &config, &manager, month.id, None).await?;
        assert!(report.clean());

        // 20 default-on days at rate 50: one -1000 lunch transaction
        let lunch = report
            .outcomes
            .iter()
            .find(|o| matches!(o, ChargeOutcome::Charged { balance_type: BalanceType::Lunch, .. }))
            .unwrap();
        if let ChargeOutcome::Charged {
            meal_count, amount, ..
        } = lunch
        {
            assert_eq!(*meal_count, 20);
            assert_eq!(*amount, -1000);
        }

        let bal = crate::core::users::get_balance(&db, user.id, BalanceType::Lunch).await?;
        assert_eq!(bal.amount, -1000);

        let rows = ledger::get_transactions(&db, user.id, BalanceType::Lunch).await?;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].new_balance, -1000);

        // Dinner charged at its own rate
        let bal = crate::core::users::get_balance(&db, user.id, BalanceType::Dinner).await?;
        assert_eq!(bal.amount, -1200);
        Ok(())
    }

    #[tokio::test]
    async fn test_rerun_is_idempotent() -> Result<()> {
        let (db, user) = setup_with_user().await?;
        let config = test_config();
        let manager = manager_actor();

        let month = settings::create_month(
            &db,
            &manager,
            NewMonth {
                year: 2026,
                month: 8,
                start_date: d(2026, 8, 1),
                end_date: d(2026, 8, 20),
                lunch_rate: 50,
                dinner_rate: 60,
            },
        )
        .await?;
        settings::finalize(&db, &manager, month.id).await?;

        post_month_end_charges(&db, &config, &manager, month.id, None).await?;
        let second = post_month_end_charges(&db, &config, &manager, month.id, None).await?;

        assert!(second
            .outcomes
            .iter()
            .all(|o| matches!(o, ChargeOutcome::AlreadyCharged { .. })));

        let bal = crate::core::users::get_balance(&db, user.id, BalanceType::Lunch).await?;
        assert_eq!(bal.amount, -1000);
        Ok(())
    }

    #[tokio::test]
    async fn test_counts_respect_manual_toggles_and_overrides() -> Result<()> {
        let (db, user) = setup_with_user().await?;
        let config = test_config();
        let manager = manager_actor();
        let admin = admin_actor();

        let month = settings::create_month(
            &db,
            &manager,
            NewMonth {
                year: 2026,
                month: 8,
                start_date: d(2026, 8, 1),
                end_date: d(2026, 8, 20),
                lunch_rate: 50,
                dinner_rate: 60,
            },
        )
        .await?;

        // Manual off on the 1st (manager is cutoff-exempt, month not yet final)
        resolver::toggle(
            &db,
            &config,
            &manager,
            user.id,
            d(2026, 8, 1),
            MealType::Lunch,
            false,
            None,
        )
        .await?;

        // Force-off override on the 2nd
        overrides::create_override(
            &db,
            &admin,
            NewOverride {
                target: OverrideTarget::User,
                target_user_id: Some(user.id),
                date_spec: DateSpec::Single,
                date: Some(d(2026, 8, 2)),
                start_date: None,
                end_date: None,
                weekday_mask: 0,
                recurring_day_of_month: None,
                meal_scope: MealScope::Lunch,
                action: OverrideAction::ForceOff,
                priority: 0,
                expires_at: None,
            },
        )
        .await?;

        // Double portion on the 3rd
        resolver::toggle(
            &db,
            &config,
            &manager,
            user.id,
            d(2026, 8, 3),
            MealType::Lunch,
            true,
            Some(2),
        )
        .await?;

        settings::finalize(&db, &manager, month.id).await?;
        let report = post_month_end_charges(&db, &config, &manager, month.id, None).await?;
        assert!(report.clean());

        // 20 days - off(1st) - override-off(2nd) + extra portion(3rd) = 19
        let lunch = report
            .outcomes
            .iter()
            .find(|o| matches!(o, ChargeOutcome::Charged { balance_type: BalanceType::Lunch, .. }))
            .unwrap();
        if let ChargeOutcome::Charged { meal_count, .. } = lunch {
            assert_eq!(*meal_count, 19);
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_unfinalized_month_is_rejected() -> Result<()> {
        let (db, _user) = setup_with_user().await?;
        let config = test_config();
        let manager = manager_actor();

        let month = settings::create_month(
            &db,
            &manager,
            NewMonth {
                year: 2026,
                month: 8,
                start_date: d(2026, 8, 1),
                end_date: d(2026, 8, 20),
                lunch_rate: 50,
                dinner_rate: 60,
            },
        )
        .await?;

        let result = post_month_end_charges(&db, &config, &manager, month.id, None).await;
        assert!(matches!(
            result,
            Err(Error::State {
                block: StateBlock::NotFinalized { .. }
            })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_inactive_users_are_skipped() -> Result<()> {
        let (db, user) = setup_with_user().await?;
        let config = test_config();
        let manager = manager_actor();
        let admin = admin_actor();

        crate::core::users::set_active(&db, &admin, user.id, false).await?;

        let month = settings::create_month(
            &db,
            &manager,
            NewMonth {
                year: 2026,
                month: 8,
                start_date: d(2026, 8, 1),
                end_date: d(2026, 8, 20),
                lunch_rate: 50,
                dinner_rate: 60,
            },
        )
        .await?;
        settings::finalize(&db, &manager, month.id).await?;

        let report = post_month_end_charges(&db, &config, &manager, month.id, None).await?;
        assert!(report.outcomes.is_empty());

        let bal = crate::core::users::get_balance(&db, user.id, BalanceType::Lunch).await?;
        assert_eq!(bal.amount, 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_service_actor_can_run_charges() -> Result<()> {
        let (db, _user) = setup_with_user().await?;
        let config = test_config();
        let manager = manager_actor();
        let service = Actor::service(&[perms::CHARGES_RUN, perms::LEDGER_POST]);

        let month = settings::create_month(
            &db,
            &manager,
            NewMonth {
                year: 2026,
                month: 8,
                start_date: d(2026, 8, 1),
                end_date: d(2026, 8, 20),
                lunch_rate: 50,
                dinner_rate: 60,
            },
        )
        .await?;
        settings::finalize(&db, &manager, month.id).await?;

        let report = post_month_end_charges(&db, &config, &service, month.id, None).await?;
        assert!(report.clean());
        Ok(())
    }

    #[tokio::test]
    async fn test_failed_pair_does_not_block_others() -> Result<()> {
        let (db, user) = setup_with_user().await?;
        let config = test_config();
        let manager = manager_actor();
        let admin = admin_actor();

        let other =
            crate::core::users::create_user(&db, &admin, "other".to_string(), Role::User).await?;
        crate::core::users::freeze_balance(
            &db,
            &admin,
            user.id,
            BalanceType::Lunch,
            "hold".to_string(),
        )
        .await?;

        let month = settings::create_month(
            &db,
            &manager,
            NewMonth {
                year: 2026,
                month: 8,
                start_date: d(2026, 8, 1),
                end_date: d(2026, 8, 20),
                lunch_rate: 50,
                dinner_rate: 60,
            },
        )
        .await?;
        settings::finalize(&db, &manager, month.id).await?;

        let report = post_month_end_charges(&db, &config, &manager, month.id, None).await?;
        assert!(!report.clean());

        // The frozen pair failed, everything else was charged
        let frozen_failed = report.outcomes.iter().any(|o| {
            matches!(o, ChargeOutcome::Failed { user_id, balance_type: BalanceType::Lunch, .. } if *user_id == user.id)
        });
        assert!(frozen_failed);

        let bal = crate::core::users::get_balance(&db, other.id, BalanceType::Lunch).await?;
        assert_eq!(bal.amount, -1000);

        // Unfreeze and re-run: only the failed pair is charged now
        crate::core::users::unfreeze_balance(&db, &admin, user.id, BalanceType::Lunch).await?;
        let report = post_month_end_charges(&db, &config, &manager, month.id, None).await?;
        assert!(report.clean());
        let bal = crate::core::users::get_balance(&db, user.id, BalanceType::Lunch).await?;
        assert_eq!(bal.amount, -1000);
        let bal = crate::core::users::get_balance(&db, other.id, BalanceType::Lunch).await?;
        assert_eq!(bal.amount, -1000); // not double charged
        Ok(())
    }
}
