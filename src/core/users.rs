//! User management - creation, activation, balance freezing.
//!
//! Creating a user also creates its three zero balances in one database
//! transaction, so the ledger can always assume the balance row exists.

use crate::core::authorizer::{Actor, perms};
use crate::entities::{Balance, BalanceType, Role, User, balance, user};
use crate::errors::{Error, Result};
use sea_orm::{DatabaseConnection, QueryOrder, Set, TransactionTrait, prelude::*};

/// Creates a user and its breakfast/lunch/dinner balance rows.
pub async fn create_user(
    db: &DatabaseConnection,
    actor: &Actor,
    name: String,
    role: Role,
) -> Result<user::Model> {
    actor.require(perms::USER_MANAGE)?;

    if name.trim().is_empty() {
        return Err(Error::validation("user name cannot be empty"));
    }

    let txn = db.begin().await?;

    let user = user::ActiveModel {
        name: Set(name.trim().to_string()),
        role: Set(role),
        is_active: Set(true),
        extra_permissions: Set(serde_json::json!([])),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    for balance_type in [
        BalanceType::Breakfast,
        BalanceType::Lunch,
        BalanceType::Dinner,
    ] {
        balance::ActiveModel {
            user_id: Set(user.id),
            balance_type: Set(balance_type),
            amount: Set(0),
            is_frozen: Set(false),
            frozen_reason: Set(None),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
    }

    txn.commit().await?;
    Ok(user)
}

/// Finds a user by id.
pub async fn get_user(db: &DatabaseConnection, user_id: i64) -> Result<Option<user::Model>> {
    User::find_by_id(user_id).one(db).await.map_err(Into::into)
}

/// All active users, ordered by name.
pub async fn get_active_users(db: &DatabaseConnection) -> Result<Vec<user::Model>> {
    User::find()
        .filter(user::Column::IsActive.eq(true))
        .order_by_asc(user::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Activates or deactivates a user. Inactive users keep their data but
/// cannot act and are skipped by charge runs.
pub async fn set_active(
    db: &DatabaseConnection,
    actor: &Actor,
    user_id: i64,
    is_active: bool,
) -> Result<()> {
    actor.require(perms::USER_MANAGE)?;

    let user = get_user(db, user_id).await?.ok_or(Error::NotFound {
        entity: "user",
        id: user_id.to_string(),
    })?;

    let mut active: user::ActiveModel = user.into();
    active.is_active = Set(is_active);
    active.update(db).await?;
    Ok(())
}

/// The balance row for `(user_id, balance_type)`.
pub async fn get_balance(
    db: &DatabaseConnection,
    user_id: i64,
    balance_type: BalanceType,
) -> Result<balance::Model> {
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

/// Freezes a balance so non-privileged ledger writes are rejected.
pub async fn freeze_balance(
    db: &DatabaseConnection,
    actor: &Actor,
    user_id: i64,
    balance_type: BalanceType,
    reason: String,
) -> Result<()> {
    actor.require(perms::USER_MANAGE)?;

    let bal = get_balance(db, user_id, balance_type).await?;
    let mut active: balance::ActiveModel = bal.into();
    active.is_frozen = Set(true);
    active.frozen_reason = Set(Some(reason));
    active.update(db).await?;
    Ok(())
}

/// Unfreezes a balance.
pub async fn unfreeze_balance(
    db: &DatabaseConnection,
    actor: &Actor,
    user_id: i64,
    balance_type: BalanceType,
) -> Result<()> {
    actor.require(perms::USER_MANAGE)?;

    let bal = get_balance(db, user_id, balance_type).await?;
    let mut active: balance::ActiveModel = bal.into();
    active.is_frozen = Set(false);
    active.frozen_reason = Set(None);
    active.update(db).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;

    #[tokio::test]
    async fn test_create_user_creates_three_balances() -> Result<()> {
        let db = setup_test_db().await?;
        let admin = admin_actor();

        let user = create_user(&db, &admin, "rahim".to_string(), Role::User).await?;

        for balance_type in [
            BalanceType::Breakfast,
            BalanceType::Lunch,
            BalanceType::Dinner,
        ] {
            let bal = get_balance(&db, user.id, balance_type).await?;
            assert_eq!(bal.amount, 0);
            assert!(!bal.is_frozen);
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_create_user_rejects_empty_name() -> Result<()> {
        let db = setup_test_db().await?;
        let admin = admin_actor();

        let result = create_user(&db, &admin, "   ".to_string(), Role::User).await;
        assert!(matches!(result, Err(Error::Validation { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_deactivated_user_excluded_from_active_list() -> Result<()> {
        let db = setup_test_db().await?;
        let admin = admin_actor();

        let a = create_user(&db, &admin, "a".to_string(), Role::User).await?;
        let _b = create_user(&db, &admin, "b".to_string(), Role::User).await?;
        set_active(&db, &admin, a.id, false).await?;

        let active = get_active_users(&db).await?;
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].name, "b");
        Ok(())
    }

    #[tokio::test]
    async fn test_freeze_and_unfreeze_balance() -> Result<()> {
        let (db, user) = setup_with_user().await?;
        let admin = admin_actor();

        freeze_balance(
            &db,
            &admin,
            user.id,
            BalanceType::Lunch,
            "dispute pending".to_string(),
        )
        .await?;
        let bal = get_balance(&db, user.id, BalanceType::Lunch).await?;
        assert!(bal.is_frozen);
        assert_eq!(bal.frozen_reason.as_deref(), Some("dispute pending"));

        unfreeze_balance(&db, &admin, user.id, BalanceType::Lunch).await?;
        let bal = get_balance(&db, user.id, BalanceType::Lunch).await?;
        assert!(!bal.is_frozen);
        assert!(bal.frozen_reason.is_none());
        Ok(())
    }
}
