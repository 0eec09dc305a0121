//! Service bootstrap and scheduled-job entry point.
//!
//! Running the binary initializes the database, syncs the configured
//! holiday calendar, and re-posts any due charges for finalized months.
//! Cron invokes this as the job runner; the charge run is idempotent, so
//! repeated invocations are safe.

use dotenvy::dotenv;
use messbook::config::settings::AppConfig;
use messbook::config::database;
use messbook::core::authorizer::{Actor, perms};
use messbook::core::{charges, holidays, settings};
use messbook::errors::Result;
use messbook::notify::BalanceAlert;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    dotenv().ok();

    let config = AppConfig::load_default()?;
    info!(database_url = %config.database_url, "configuration loaded");

    let db = database::create_connection(&config.database_url).await?;
    database::create_tables(&db).await?;
    info!("database ready");

    // The job runner acts with a narrow service permission set.
    let service = Actor::service(&[
        perms::HOLIDAY_MANAGE,
        perms::CHARGES_RUN,
        perms::LEDGER_POST,
    ]);

    let synced = holidays::sync_holidays(&db, &service, &config.holiday_calendar).await?;
    info!(synced, "holiday calendar up to date");

    let alert = BalanceAlert::tracing(config.low_balance_threshold);
    for month in settings::finalized_months(&db).await? {
        let report =
            charges::post_month_end_charges(&db, &config, &service, month.id, Some(&alert))
                .await?;
        if report.clean() {
            info!(year = month.year, month = month.month, "charges up to date");
        } else {
            warn!(
                year = month.year,
                month = month.month,
                "some charges failed; re-run after resolving"
            );
        }
    }

    Ok(())
}
