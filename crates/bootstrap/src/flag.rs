//! Out-of-band initialization marker.
//!
//! The flag record is advisory: it lets the detector answer without a
//! database round trip, but a missing or stale record is always overridden by
//! the relational store.

use std::path::{Path, PathBuf};

use {
    async_trait::async_trait,
    serde::{Deserialize, Serialize},
    tracing::debug,
};

use crate::{Error, Result};

/// Placeholder written in place of the administrator password.
pub const REDACTED_PASSWORD: &str = "********";

/// The persisted "initialization completed" document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlagRecord {
    pub initialized: bool,
    /// RFC 3339 timestamp of the bootstrap that wrote the record.
    pub timestamp: String,
    pub admin: FlagAdmin,
    /// Company display name.
    pub company: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlagAdmin {
    pub username: String,
    /// Always [`REDACTED_PASSWORD`]; the plaintext is never persisted.
    pub password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl FlagRecord {
    pub fn completed(
        company: impl Into<String>,
        company_id: impl Into<String>,
        username: impl Into<String>,
        email: impl Into<String>,
    ) -> Self {
        Self {
            initialized: true,
            timestamp: chrono::Utc::now().to_rfc3339(),
            admin: FlagAdmin {
                username: username.into(),
                password: REDACTED_PASSWORD.into(),
                email: Some(email.into()),
            },
            company: company.into(),
            company_id: Some(company_id.into()),
        }
    }
}

/// Durable storage for the flag record.
#[async_trait]
pub trait FlagStore: Send + Sync {
    /// `Ok(None)` when no record exists; `Err` when it exists but cannot be
    /// read or parsed.
    async fn read(&self) -> Result<Option<FlagRecord>>;
    async fn write(&self, record: &FlagRecord) -> Result<()>;
    /// Remove the record if present.
    async fn clear(&self) -> Result<()>;
}

/// Stores the flag record as a JSON file.
pub struct FileFlagStore {
    path: PathBuf,
}

impl FileFlagStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> Error {
        Error::FlagIo {
            path: self.path.clone(),
            source,
        }
    }
}

#[async_trait]
impl FlagStore for FileFlagStore {
    async fn read(&self) -> Result<Option<FlagRecord>> {
        let raw = match tokio::fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.io_error(e)),
        };
        serde_json::from_slice(&raw)
            .map(Some)
            .map_err(|source| Error::FlagParse {
                path: self.path.clone(),
                source,
            })
    }

    async fn write(&self, record: &FlagRecord) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| self.io_error(e))?;
        }
        let json = serde_json::to_vec_pretty(record).map_err(|source| Error::FlagEncode {
            path: self.path.clone(),
            source,
        })?;

        // Write-then-rename so readers never observe a half-written record.
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json)
            .await
            .map_err(|e| self.io_error(e))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| self.io_error(e))?;
        debug!(path = %self.path.display(), "flag record written");
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(self.io_error(e)),
        }
    }
}
