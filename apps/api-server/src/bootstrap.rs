//! First-run admin account.

use stockadoodle_core::validation::validate_new_user;
use stockadoodle_core::{NewUser, Role, User};
use stockadoodle_db::Database;
use tracing::info;

use crate::auth::hash_password;
use crate::config::BootstrapAdmin;
use crate::error::ApiResult;

/// Creates the configured admin when no user exists yet.
///
/// Returns the new account, or `None` when users are already present.
pub async fn ensure_admin(db: &Database, admin: &BootstrapAdmin) -> ApiResult<Option<User>> {
    if db.users().count().await? > 0 {
        return Ok(None);
    }

    let input = NewUser {
        username: admin.username.clone(),
        password: admin.password.clone(),
        full_name: "Administrator".to_string(),
        email: Some(admin.email.clone()),
        role: Role::Admin,
        mfa_enabled: true,
    };
    validate_new_user(&input)?;

    let hash = hash_password(&input.password)?;
    let user = db.users().create(&input, &hash, None).await?;

    info!(user_id = %user.id, username = %user.username, "Bootstrap admin created");
    Ok(Some(user))
}
