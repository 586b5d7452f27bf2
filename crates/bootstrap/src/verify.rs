//! Post-setup sanity check of an administrator's credentials.

use {agentdesk_store::{BootstrapStore, Role}, serde::Serialize};

use crate::{Result, password::verify_password};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyReport {
    pub exists: bool,
    pub active: bool,
    pub is_admin: bool,
    pub password_matches: bool,
}

impl VerifyReport {
    /// The account can log in as an administrator.
    pub fn ok(&self) -> bool {
        self.exists && self.active && self.is_admin && self.password_matches
    }
}

/// Look up `username` and check it against `password`. A missing user is a
/// report with `exists == false`, not an error.
pub async fn verify_admin(
    store: &dyn BootstrapStore,
    username: &str,
    password: &str,
) -> Result<VerifyReport> {
    let Some(user) = store.find_user_by_username(username).await? else {
        return Ok(VerifyReport::default());
    };
    Ok(VerifyReport {
        exists: true,
        active: user.is_active,
        is_admin: user.role == Role::Admin,
        password_matches: verify_password(password, &user.password_hash),
    })
}
