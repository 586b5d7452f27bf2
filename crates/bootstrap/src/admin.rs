//! Administrator spec supplied to first-run setup, and its validation.

use std::sync::LazyLock;

use {
    regex::Regex,
    secrecy::{ExposeSecret, Secret},
    serde::Deserialize,
};

use crate::{Error, Result};

pub const MIN_PASSWORD_LEN: usize = 6;

static USERNAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9_]{3,20}$").unwrap_or_else(|e| unreachable!("username pattern: {e}"))
});

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap_or_else(|e| unreachable!("email pattern: {e}"))
});

/// Raw administrator fields as received from a request body or the CLI.
/// Every field is optional here so missing input is reported as a
/// validation error rather than a deserialization failure.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminSpec {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<Secret<String>>,
    pub display_name: Option<String>,
    pub position: Option<String>,
}

/// An administrator spec that passed validation.
#[derive(Debug, Clone)]
pub struct ValidAdmin {
    pub username: String,
    pub email: String,
    pub password: Secret<String>,
    pub display_name: String,
    pub position: String,
}

impl AdminSpec {
    pub fn from_config(cfg: &agentdesk_config::DefaultAdminConfig) -> Self {
        Self {
            username: Some(cfg.username.clone()),
            email: Some(cfg.email.clone()),
            password: Some(cfg.password.clone()),
            display_name: Some(cfg.display_name.clone()),
            position: Some(cfg.position.clone()),
        }
    }

    /// Check, in order: required fields, username format, email format,
    /// password length. The first failure wins.
    pub fn validate(self) -> Result<ValidAdmin> {
        let username = required("username", self.username)?;
        let email = required("email", self.email)?;
        let password = match self.password {
            Some(p) if !p.expose_secret().is_empty() => p,
            _ => return Err(missing("password")),
        };
        let display_name = required("displayName", self.display_name)?;
        let position = required("position", self.position)?;

        if !USERNAME_RE.is_match(&username) {
            return Err(Error::validation(
                "username",
                "username must be 3-20 characters of letters, digits or underscore",
            ));
        }
        if !EMAIL_RE.is_match(&email) {
            return Err(Error::validation("email", "email address is not valid"));
        }
        if password.expose_secret().chars().count() < MIN_PASSWORD_LEN {
            return Err(Error::validation(
                "password",
                format!("password must be at least {MIN_PASSWORD_LEN} characters"),
            ));
        }

        Ok(ValidAdmin {
            username,
            email,
            password,
            display_name,
            position,
        })
    }
}

fn required(field: &'static str, value: Option<String>) -> Result<String> {
    match value.map(|v| v.trim().to_string()) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(missing(field)),
    }
}

fn missing(field: &'static str) -> Error {
    Error::validation(field, format!("missing required field: {field}"))
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn spec() -> AdminSpec {
        AdminSpec {
            username: Some("admin".into()),
            email: Some("admin@x.com".into()),
            password: Some(Secret::new("123456".into())),
            display_name: Some("Admin".into()),
            position: Some("Owner".into()),
        }
    }

    fn field_of(err: Error) -> &'static str {
        match err {
            Error::Validation { field, .. } => field,
            other => panic!("expected validation error, got {other}"),
        }
    }

    #[test]
    fn accepts_valid_spec() {
        let admin = spec().validate().unwrap();
        assert_eq!(admin.username, "admin");
        assert_eq!(admin.position, "Owner");
    }

    #[test]
    fn missing_fields_reported_in_order() {
        let mut s = spec();
        s.email = None;
        s.position = Some("  ".into());
        assert_eq!(field_of(s.validate().unwrap_err()), "email");

        let mut s = spec();
        s.password = Some(Secret::new(String::new()));
        assert_eq!(field_of(s.validate().unwrap_err()), "password");

        let mut s = spec();
        s.position = None;
        let err = s.validate().unwrap_err();
        assert_eq!(err.to_string(), "missing required field: position");
    }

    #[test]
    fn short_username_rejected() {
        let mut s = spec();
        s.username = Some("ab".into());
        assert_eq!(field_of(s.validate().unwrap_err()), "username");
    }

    #[test]
    fn username_charset_enforced() {
        for bad in ["bad-name", "has space", "abcdefghijklmnopqrstu", "ünï"] {
            let mut s = spec();
            s.username = Some(bad.into());
            assert_eq!(field_of(s.validate().unwrap_err()), "username", "{bad}");
        }
        let mut s = spec();
        s.username = Some("Admin_01".into());
        assert!(s.validate().is_ok());
    }

    #[test]
    fn email_shape_enforced() {
        for bad in ["admin", "admin@x", "@x.com", "a b@x.com"] {
            let mut s = spec();
            s.email = Some(bad.into());
            assert_eq!(field_of(s.validate().unwrap_err()), "email", "{bad}");
        }
    }

    #[test]
    fn username_checked_before_password_length() {
        let mut s = spec();
        s.username = Some("ab".into());
        s.password = Some(Secret::new("12345".into()));
        assert_eq!(field_of(s.validate().unwrap_err()), "username");
    }

    #[test]
    fn short_password_rejected() {
        let mut s = spec();
        s.password = Some(Secret::new("12345".into()));
        let err = s.validate().unwrap_err();
        assert_eq!(err.to_string(), "password must be at least 6 characters");
    }

    #[test]
    fn deserializes_camel_case_body() {
        let s: AdminSpec = serde_json::from_str(
            r#"{"username":"admin","email":"admin@x.com","password":"123456","displayName":"Admin"}"#,
        )
        .unwrap();
        assert_eq!(s.display_name.as_deref(), Some("Admin"));
        assert_eq!(field_of(s.validate().unwrap_err()), "position");
    }
}
