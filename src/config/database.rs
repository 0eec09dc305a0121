//! Database connection and table creation using `SeaORM`.
//!
//! Tables are generated straight from the entity definitions with
//! `Schema::create_table_from_entity`, so the schema always matches the
//! Rust structs without hand-written SQL or a migration framework.

use crate::entities::{
    Balance, Breakfast, BreakfastParticipant, CorrectionHistory, Holiday, MealRecord,
    MonthSettings, RuleOverride, Transaction, User,
};
use crate::errors::Result;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Schema};

/// Establishes a connection to the database named by the configured URL.
pub async fn create_connection(database_url: &str) -> Result<DatabaseConnection> {
    Database::connect(database_url).await.map_err(Into::into)
}

/// Creates any missing tables from the entity definitions. Existing tables
/// are left alone (no migrations).
pub async fn create_tables(db: &DatabaseConnection) -> Result<()> {
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    let mut statements = vec![
        schema.create_table_from_entity(User),
        schema.create_table_from_entity(Balance),
        schema.create_table_from_entity(MealRecord),
        schema.create_table_from_entity(Holiday),
        schema.create_table_from_entity(RuleOverride),
        schema.create_table_from_entity(MonthSettings),
        schema.create_table_from_entity(Transaction),
        schema.create_table_from_entity(Breakfast),
        schema.create_table_from_entity(BreakfastParticipant),
        schema.create_table_from_entity(CorrectionHistory),
    ];

    for statement in &mut statements {
        db.execute(builder.build(statement.if_not_exists())).await?;
    }

    Ok(())
}
