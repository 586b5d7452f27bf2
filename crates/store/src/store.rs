//! Persistence trait consumed by the bootstrap subsystem.

use async_trait::async_trait;

use crate::{
    Result,
    types::{Company, CompanyDependents, NewUser, PurgedRows, User},
};

/// Reads and writes against `Company` and `User` records. No business logic
/// lives behind this trait; every decision is made by the caller.
#[async_trait]
pub trait BootstrapStore: Send + Sync {
    /// Round-trip to the backend to prove it is reachable.
    async fn ping(&self) -> Result<()>;

    /// Number of users of any role or state.
    async fn count_users(&self) -> Result<u64>;

    /// Number of users with `is_active = true`.
    async fn count_active_users(&self) -> Result<u64>;

    async fn find_company_by_name(&self, name: &str) -> Result<Option<Company>>;

    /// Insert a company. Its id must be canonical.
    async fn insert_company(&self, company: &Company) -> Result<Company>;

    async fn company_dependents(&self, company_id: &str) -> Result<CompanyDependents>;

    /// Atomically delete the company `old_id` and insert `replacement`.
    ///
    /// Fails with [`crate::Error::CompanyInUse`] if rows started referencing
    /// `old_id` since the caller last looked.
    async fn replace_company(&self, old_id: &str, replacement: &Company) -> Result<Company>;

    /// Insert a user. Duplicate usernames or ids surface as
    /// [`crate::Error::Conflict`].
    async fn insert_user(&self, user: &NewUser) -> Result<User>;

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>>;

    /// Users of `company_id` that look like the administrator (role ADMIN, or
    /// username/id equal to `admin`), plus the bootstrap administrator of any
    /// company.
    async fn find_admin_candidates(&self, company_id: &str) -> Result<Vec<User>>;

    /// Delete a user after its permissions, chat messages, chat sessions and
    /// uploaded files, in that order.
    async fn delete_user_cascade(&self, user_id: &str) -> Result<PurgedRows>;
}
