use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::Error;

/// A tenant. Owns its users, departments and agents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Company {
    pub id: String,
    pub name: String,
    pub logo: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl Company {
    /// A new company with a canonical id. Timestamps are filled in by the store.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: agentdesk_common::new_id(),
            name: name.into(),
            logo: None,
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    pub fn has_canonical_id(&self) -> bool {
        agentdesk_common::is_canonical_id(&self.id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "USER",
            Self::Admin => "ADMIN",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "USER" => Ok(Self::User),
            "ADMIN" => Ok(Self::Admin),
            other => Err(Error::invalid_row("users", format!("unknown role `{other}`"))),
        }
    }
}

/// A stored user. The password hash never leaves the process in serialized form.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub company_id: String,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub display_name: String,
    pub position: Option<String>,
    pub email: String,
    pub phone: Option<String>,
    pub role: Role,
    pub is_active: bool,
    pub bootstrap_admin: bool,
    pub created_at: String,
    pub updated_at: String,
}

/// Fields for inserting a user.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub id: String,
    pub company_id: String,
    pub username: String,
    pub password_hash: String,
    pub display_name: String,
    pub position: Option<String>,
    pub email: String,
    pub phone: Option<String>,
    pub role: Role,
    pub is_active: bool,
    /// Marks the single administrator created by first-run bootstrap.
    pub bootstrap_admin: bool,
}

/// Rows referencing a company, used to decide whether it can be recreated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CompanyDependents {
    pub users: u64,
    pub departments: u64,
    pub agents: u64,
}

impl CompanyDependents {
    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    pub fn total(&self) -> u64 {
        self.users + self.departments + self.agents
    }
}

/// Rows removed when a user is deleted together with everything it owns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PurgedRows {
    pub permissions: u64,
    pub messages: u64,
    pub sessions: u64,
    pub files: u64,
}
