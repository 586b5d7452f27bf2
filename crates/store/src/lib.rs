//! Persistence gateway for tenants and their users.
//!
//! [`BootstrapStore`] is the narrow set of reads and writes first-run
//! initialization needs; [`SqliteStore`] implements it on top of sqlx. The
//! schema lives in `migrations/` and is applied with [`run_migrations`].

pub mod error;
pub mod sqlite;
pub mod store;
pub mod types;

pub use {
    error::{Error, Result},
    sqlite::SqliteStore,
    store::BootstrapStore,
    types::{Company, CompanyDependents, NewUser, PurgedRows, Role, User},
};

/// Run database migrations for the store.
///
/// Creates every table the bootstrap subsystem reads, writes, or checks for
/// dependents. Call at startup before using [`SqliteStore`].
pub async fn run_migrations(pool: &sqlx::SqlitePool) -> Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}
