//! SQLite-backed persistence gateway using sqlx.

use {
    async_trait::async_trait,
    sqlx::{SqlitePool, sqlite::SqlitePoolOptions},
    tracing::debug,
};

use crate::{
    Error, Result,
    store::BootstrapStore,
    types::{Company, CompanyDependents, NewUser, PurgedRows, Role, User},
};

const USER_COLUMNS: &str = "id, company_id, username, password_hash, display_name, position, \
                            email, phone, role, is_active, bootstrap_admin, created_at, updated_at";

/// Explicitly constructed persistence handle. Open one per process or request
/// scope with [`SqliteStore::connect`] and release it with [`SqliteStore::close`].
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open a pool on `database_url` and run migrations.
    ///
    /// Connection failures are reported as [`Error::Unavailable`].
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|source| Error::Unavailable { source })?;
        crate::run_migrations(&pool).await?;
        debug!(max_connections, "store connected");
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close every pooled connection. Later calls fail as unavailable.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    async fn count(&self, sql: &str, bind: &str) -> Result<u64> {
        let (n,): (i64,) = sqlx::query_as(sql).bind(bind).fetch_one(&self.pool).await?;
        Ok(n as u64)
    }

    async fn fetch_company(&self, id: &str) -> Result<Company> {
        let company = sqlx::query_as::<_, Company>(
            "SELECT id, name, logo, created_at, updated_at FROM companies WHERE id = ?",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;
        Ok(company)
    }

    async fn fetch_user(&self, id: &str) -> Result<User> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = ?"
        ))
        .bind(id)
        .fetch_one(&self.pool)
        .await?;
        row.try_into()
    }
}

#[async_trait]
impl BootstrapStore for SqliteStore {
    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn count_users(&self) -> Result<u64> {
        let (n,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;
        Ok(n as u64)
    }

    async fn count_active_users(&self) -> Result<u64> {
        let (n,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users WHERE is_active = 1")
            .fetch_one(&self.pool)
            .await?;
        Ok(n as u64)
    }

    async fn find_company_by_name(&self, name: &str) -> Result<Option<Company>> {
        let company = sqlx::query_as::<_, Company>(
            "SELECT id, name, logo, created_at, updated_at FROM companies
             WHERE name = ? ORDER BY created_at ASC LIMIT 1",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;
        Ok(company)
    }

    async fn insert_company(&self, company: &Company) -> Result<Company> {
        agentdesk_common::ensure_canonical(&company.id)?;
        sqlx::query("INSERT INTO companies (id, name, logo) VALUES (?, ?, ?)")
            .bind(&company.id)
            .bind(&company.name)
            .bind(&company.logo)
            .execute(&self.pool)
            .await?;
        self.fetch_company(&company.id).await
    }

    async fn company_dependents(&self, company_id: &str) -> Result<CompanyDependents> {
        Ok(CompanyDependents {
            users: self
                .count("SELECT COUNT(*) FROM users WHERE company_id = ?", company_id)
                .await?,
            departments: self
                .count(
                    "SELECT COUNT(*) FROM departments WHERE company_id = ?",
                    company_id,
                )
                .await?,
            agents: self
                .count("SELECT COUNT(*) FROM agents WHERE company_id = ?", company_id)
                .await?,
        })
    }

    async fn replace_company(&self, old_id: &str, replacement: &Company) -> Result<Company> {
        agentdesk_common::ensure_canonical(&replacement.id)?;
        let mut tx = self.pool.begin().await?;

        let (referencing,): (i64,) = sqlx::query_as(
            "SELECT (SELECT COUNT(*) FROM users WHERE company_id = ?1)
                  + (SELECT COUNT(*) FROM departments WHERE company_id = ?1)
                  + (SELECT COUNT(*) FROM agents WHERE company_id = ?1)",
        )
        .bind(old_id)
        .fetch_one(&mut *tx)
        .await?;
        if referencing > 0 {
            return Err(Error::CompanyInUse {
                id: old_id.to_string(),
            });
        }

        sqlx::query("DELETE FROM companies WHERE id = ?")
            .bind(old_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("INSERT INTO companies (id, name, logo) VALUES (?, ?, ?)")
            .bind(&replacement.id)
            .bind(&replacement.name)
            .bind(&replacement.logo)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        self.fetch_company(&replacement.id).await
    }

    async fn insert_user(&self, user: &NewUser) -> Result<User> {
        sqlx::query(
            "INSERT INTO users (id, company_id, username, password_hash, display_name, position,
                                email, phone, role, is_active, bootstrap_admin)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&user.id)
        .bind(&user.company_id)
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(&user.display_name)
        .bind(&user.position)
        .bind(&user.email)
        .bind(&user.phone)
        .bind(user.role.as_str())
        .bind(user.is_active)
        .bind(user.bootstrap_admin)
        .execute(&self.pool)
        .await?;
        self.fetch_user(&user.id).await
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = ?"
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        row.map(User::try_from).transpose()
    }

    async fn find_admin_candidates(&self, company_id: &str) -> Result<Vec<User>> {
        let rows = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users
             WHERE (company_id = ? AND (role = 'ADMIN' OR username = 'admin' OR id = 'admin'))
                OR bootstrap_admin = 1
             ORDER BY created_at ASC"
        ))
        .bind(company_id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(User::try_from).collect()
    }

    async fn delete_user_cascade(&self, user_id: &str) -> Result<PurgedRows> {
        let mut tx = self.pool.begin().await?;

        let permissions = sqlx::query("DELETE FROM agent_permissions WHERE user_id = ?")
            .bind(user_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        let messages = sqlx::query(
            "DELETE FROM chat_messages
             WHERE user_id = ?1
                OR session_id IN (SELECT id FROM chat_sessions WHERE user_id = ?1)",
        )
        .bind(user_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();
        let sessions = sqlx::query("DELETE FROM chat_sessions WHERE user_id = ?")
            .bind(user_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        let files = sqlx::query("DELETE FROM uploaded_files WHERE user_id = ?")
            .bind(user_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(PurgedRows {
            permissions,
            messages,
            sessions,
            files,
        })
    }
}

/// Internal row type for sqlx mapping.
#[derive(sqlx::FromRow)]
struct UserRow {
    id: String,
    company_id: String,
    username: String,
    password_hash: String,
    display_name: String,
    position: Option<String>,
    email: String,
    phone: Option<String>,
    role: String,
    is_active: bool,
    bootstrap_admin: bool,
    created_at: String,
    updated_at: String,
}

impl TryFrom<UserRow> for User {
    type Error = Error;

    fn try_from(r: UserRow) -> Result<Self> {
        Ok(Self {
            role: r.role.parse::<Role>()?,
            id: r.id,
            company_id: r.company_id,
            username: r.username,
            password_hash: r.password_hash,
            display_name: r.display_name,
            position: r.position,
            email: r.email,
            phone: r.phone,
            is_active: r.is_active,
            bootstrap_admin: r.bootstrap_admin,
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    async fn memory_store() -> SqliteStore {
        SqliteStore::connect("sqlite::memory:", 1).await.unwrap()
    }

    fn new_user(company_id: &str, username: &str, role: Role) -> NewUser {
        NewUser {
            id: agentdesk_common::new_id(),
            company_id: company_id.into(),
            username: username.into(),
            password_hash: "$2b$12$notarealhashnotarealhashnotarealhashnotarealhashnot".into(),
            display_name: username.into(),
            position: None,
            email: format!("{username}@example.com"),
            phone: None,
            role,
            is_active: true,
            bootstrap_admin: false,
        }
    }

    #[tokio::test]
    async fn company_insert_and_lookup() {
        let store = memory_store().await;
        assert!(store.find_company_by_name("Acme").await.unwrap().is_none());

        let created = store.insert_company(&Company::new("Acme")).await.unwrap();
        assert!(!created.created_at.is_empty());

        let found = store.find_company_by_name("Acme").await.unwrap().unwrap();
        assert_eq!(found.id, created.id);
    }

    #[tokio::test]
    async fn non_canonical_company_id_rejected() {
        let store = memory_store().await;
        let mut company = Company::new("Acme");
        company.id = "default-company".into();
        let err = store.insert_company(&company).await.unwrap_err();
        assert!(matches!(err, Error::InvalidId(_)), "{err}");
    }

    #[tokio::test]
    async fn user_counts_respect_active_flag() {
        let store = memory_store().await;
        let company = store.insert_company(&Company::new("Acme")).await.unwrap();

        store
            .insert_user(&new_user(&company.id, "alice", Role::User))
            .await
            .unwrap();
        let mut inactive = new_user(&company.id, "bob", Role::User);
        inactive.is_active = false;
        store.insert_user(&inactive).await.unwrap();

        assert_eq!(store.count_users().await.unwrap(), 2);
        assert_eq!(store.count_active_users().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn duplicate_username_is_conflict() {
        let store = memory_store().await;
        let company = store.insert_company(&Company::new("Acme")).await.unwrap();

        store
            .insert_user(&new_user(&company.id, "alice", Role::User))
            .await
            .unwrap();
        let err = store
            .insert_user(&new_user(&company.id, "alice", Role::User))
            .await
            .unwrap_err();
        assert!(err.is_conflict(), "{err}");
    }

    #[tokio::test]
    async fn second_bootstrap_admin_is_conflict() {
        let store = memory_store().await;
        let company = store.insert_company(&Company::new("Acme")).await.unwrap();

        let mut first = new_user(&company.id, "root", Role::Admin);
        first.bootstrap_admin = true;
        store.insert_user(&first).await.unwrap();

        let mut second = new_user(&company.id, "other_root", Role::Admin);
        second.bootstrap_admin = true;
        let err = store.insert_user(&second).await.unwrap_err();
        assert!(err.is_conflict(), "{err}");

        // Regular admins are not limited.
        store
            .insert_user(&new_user(&company.id, "ops", Role::Admin))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn password_hash_is_not_serialized() {
        let store = memory_store().await;
        let company = store.insert_company(&Company::new("Acme")).await.unwrap();
        let user = store
            .insert_user(&new_user(&company.id, "alice", Role::User))
            .await
            .unwrap();

        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("passwordHash").is_none());
        assert_eq!(json["role"], "USER");
    }

    #[tokio::test]
    async fn dependents_and_replace() {
        let store = memory_store().await;
        sqlx::query("INSERT INTO companies (id, name) VALUES ('legacy-1', 'Acme')")
            .execute(store.pool())
            .await
            .unwrap();
        assert!(
            store
                .company_dependents("legacy-1")
                .await
                .unwrap()
                .is_empty()
        );

        let replacement = Company::new("Acme");
        let replaced = store
            .replace_company("legacy-1", &replacement)
            .await
            .unwrap();
        assert!(replaced.has_canonical_id());
        let found = store.find_company_by_name("Acme").await.unwrap().unwrap();
        assert_eq!(found.id, replacement.id);
    }

    #[tokio::test]
    async fn replace_refuses_referenced_company() {
        let store = memory_store().await;
        sqlx::query("INSERT INTO companies (id, name) VALUES ('legacy-1', 'Acme')")
            .execute(store.pool())
            .await
            .unwrap();
        sqlx::query("INSERT INTO departments (id, company_id, name) VALUES ('d1', 'legacy-1', 'Ops')")
            .execute(store.pool())
            .await
            .unwrap();

        let deps = store.company_dependents("legacy-1").await.unwrap();
        assert_eq!(deps.departments, 1);

        let err = store
            .replace_company("legacy-1", &Company::new("Acme"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::CompanyInUse { .. }), "{err}");
        assert_eq!(
            store.find_company_by_name("Acme").await.unwrap().unwrap().id,
            "legacy-1"
        );
    }

    #[tokio::test]
    async fn replace_refuses_company_with_users() {
        let store = memory_store().await;
        sqlx::query("INSERT INTO companies (id, name) VALUES ('legacy-1', 'Acme')")
            .execute(store.pool())
            .await
            .unwrap();
        store
            .insert_user(&new_user("legacy-1", "alice", Role::User))
            .await
            .unwrap();

        assert_eq!(store.company_dependents("legacy-1").await.unwrap().users, 1);
        let err = store
            .replace_company("legacy-1", &Company::new("Acme"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::CompanyInUse { .. }), "{err}");
    }

    #[tokio::test]
    async fn admin_candidates_match_role_or_name() {
        let store = memory_store().await;
        let company = store.insert_company(&Company::new("Acme")).await.unwrap();
        store
            .insert_user(&new_user(&company.id, "root", Role::Admin))
            .await
            .unwrap();
        store
            .insert_user(&new_user(&company.id, "admin", Role::User))
            .await
            .unwrap();
        store
            .insert_user(&new_user(&company.id, "alice", Role::User))
            .await
            .unwrap();

        let mut names: Vec<String> = store
            .find_admin_candidates(&company.id)
            .await
            .unwrap()
            .into_iter()
            .map(|u| u.username)
            .collect();
        names.sort();
        assert_eq!(names, ["admin", "root"]);
    }

    #[tokio::test]
    async fn admin_candidates_include_bootstrap_admin_of_any_company() {
        let store = memory_store().await;
        let old = store.insert_company(&Company::new("Old Co")).await.unwrap();
        let new = store.insert_company(&Company::new("New Co")).await.unwrap();
        let mut root = new_user(&old.id, "root", Role::Admin);
        root.bootstrap_admin = true;
        store.insert_user(&root).await.unwrap();
        store
            .insert_user(&new_user(&old.id, "ops", Role::Admin))
            .await
            .unwrap();

        let names: Vec<String> = store
            .find_admin_candidates(&new.id)
            .await
            .unwrap()
            .into_iter()
            .map(|u| u.username)
            .collect();
        assert_eq!(names, ["root"]);
    }

    #[tokio::test]
    async fn delete_user_cascade_removes_dependents() {
        let store = memory_store().await;
        let company = store.insert_company(&Company::new("Acme")).await.unwrap();
        let user = store
            .insert_user(&new_user(&company.id, "root", Role::Admin))
            .await
            .unwrap();

        let pool = store.pool();
        sqlx::query("INSERT INTO agents (id, company_id, name, api_url) VALUES ('a1', ?, 'Bot', 'http://bot')")
            .bind(&company.id)
            .execute(pool)
            .await
            .unwrap();
        sqlx::query("INSERT INTO agent_permissions (id, user_id, agent_id) VALUES ('p1', ?, 'a1')")
            .bind(&user.id)
            .execute(pool)
            .await
            .unwrap();
        sqlx::query("INSERT INTO chat_sessions (id, user_id, agent_id) VALUES ('s1', ?, 'a1')")
            .bind(&user.id)
            .execute(pool)
            .await
            .unwrap();
        for (id, sender) in [("m1", "user"), ("m2", "agent")] {
            sqlx::query(
                "INSERT INTO chat_messages (id, session_id, user_id, sender, content) VALUES (?, 's1', NULL, ?, 'hi')",
            )
            .bind(id)
            .bind(sender)
            .execute(pool)
            .await
            .unwrap();
        }
        sqlx::query(
            "INSERT INTO uploaded_files (id, user_id, file_name, mime_type, size_bytes) VALUES ('f1', ?, 'a.txt', 'text/plain', 3)",
        )
        .bind(&user.id)
        .execute(pool)
        .await
        .unwrap();

        let purged = store.delete_user_cascade(&user.id).await.unwrap();
        assert_eq!(purged, PurgedRows {
            permissions: 1,
            messages: 2,
            sessions: 1,
            files: 1,
        });
        assert_eq!(store.count_users().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn closed_store_is_unavailable() {
        let store = memory_store().await;
        store.close().await;
        let err = store.count_active_users().await.unwrap_err();
        assert!(err.is_unavailable(), "{err}");
    }

    #[tokio::test]
    async fn unreachable_database_fails_to_connect() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!(
            "sqlite:{}?mode=ro",
            dir.path().join("missing/agentdesk.db").display()
        );
        let err = SqliteStore::connect(&url, 1).await.err().unwrap();
        assert!(err.is_unavailable(), "{err}");
    }
}
