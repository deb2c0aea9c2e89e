use uuid::Uuid;

use crate::core::security;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::types::UserRole;
use crate::repositories;

/// Creates the configured admin account, or repairs its password/role/active
/// flag when it drifted from configuration.
pub(crate) async fn ensure_superuser(state: &AppState) -> anyhow::Result<()> {
    let admin = state.settings().admin();
    if admin.first_superuser_password.is_empty() {
        tracing::warn!("FIRST_SUPERUSER_PASSWORD not configured; skipping superuser creation");
        return Ok(());
    }

    let username = admin.first_superuser_username.as_str();
    let now = primitive_now_utc();

    let Some(user) = repositories::users::find_by_username(state.db(), username).await? else {
        let hashed_password = security::hash_password(&admin.first_superuser_password)?;
        repositories::users::create(
            state.db(),
            repositories::users::CreateUser {
                id: &Uuid::new_v4().to_string(),
                username,
                full_name: "Administrator",
                hashed_password: &hashed_password,
                role: UserRole::Admin,
                is_active: true,
                created_at: now,
            },
        )
        .await?;

        tracing::info!(username, "Created default superuser");
        return Ok(());
    };

    let password_matches =
        security::verify_password(&admin.first_superuser_password, &user.hashed_password)
            .unwrap_or(false);

    if password_matches && user.role == UserRole::Admin && user.is_active {
        tracing::info!(username, "Default superuser already up to date");
        return Ok(());
    }

    let hashed_password = if password_matches {
        user.hashed_password.clone()
    } else {
        security::hash_password(&admin.first_superuser_password)?
    };

    repositories::users::update_account(
        state.db(),
        &user.id,
        &hashed_password,
        UserRole::Admin,
        true,
        now,
    )
    .await?;

    tracing::info!(username, "Updated default superuser");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::ensure_superuser;
    use crate::core::security;
    use crate::db::types::UserRole;
    use crate::repositories;
    use crate::test_support;

    #[tokio::test]
    async fn creates_then_repairs_superuser() {
        std::env::set_var("FIRST_SUPERUSER_USERNAME", "root");
        std::env::set_var("FIRST_SUPERUSER_PASSWORD", "root-password");
        let ctx = test_support::setup_test_context().await;
        std::env::remove_var("FIRST_SUPERUSER_PASSWORD");

        ensure_superuser(&ctx.state).await.expect("bootstrap");
        let user = repositories::users::find_by_username(ctx.state.db(), "root")
            .await
            .expect("lookup")
            .expect("superuser exists");
        assert_eq!(user.role, UserRole::Admin);

        sqlx::query("UPDATE users SET role = 'student', is_active = FALSE WHERE id = $1")
            .bind(&user.id)
            .execute(ctx.state.db())
            .await
            .expect("demote");

        ensure_superuser(&ctx.state).await.expect("repair");
        let repaired = repositories::users::find_by_id(ctx.state.db(), &user.id)
            .await
            .expect("lookup")
            .expect("still exists");
        assert_eq!(repaired.role, UserRole::Admin);
        assert!(repaired.is_active);
        assert!(security::verify_password("root-password", &repaired.hashed_password).unwrap());
    }
}
