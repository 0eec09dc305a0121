//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the database tables and their relationships.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod balance;
pub mod breakfast;
pub mod breakfast_participant;
pub mod correction_history;
pub mod holiday;
pub mod kinds;
pub mod meal_record;
pub mod month_settings;
pub mod rule_override;
pub mod transaction;
pub mod user;

// Re-export specific types to avoid conflicts
pub use balance::Entity as Balance;
pub use breakfast::Entity as Breakfast;
pub use breakfast_participant::Entity as BreakfastParticipant;
pub use correction_history::Entity as CorrectionHistory;
pub use holiday::Entity as Holiday;
pub use kinds::{
    BalanceType, DateSpec, HolidayKind, MealScope, MealType, OverrideAction, OverrideTarget,
    ReferenceKind, Role, TransactionKind,
};
pub use meal_record::Entity as MealRecord;
pub use month_settings::Entity as MonthSettings;
pub use rule_override::Entity as RuleOverride;
pub use transaction::Entity as Transaction;
pub use user::Entity as User;
