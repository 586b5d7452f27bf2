//! Bootstrap orchestrator: ensure company → ensure admin → record completion.

use std::sync::Arc;

use {
    agentdesk_config::{AgentdeskConfig, BootstrapConfig},
    agentdesk_store::{BootstrapStore, Company, NewUser, PurgedRows, Role, SqliteStore, User},
    secrecy::Secret,
    serde::Serialize,
    tracing::{info, warn},
};

use crate::{
    Error, Result,
    admin::{AdminSpec, ValidAdmin},
    detect::{InitReport, check_initialized},
    flag::{FileFlagStore, FlagRecord, FlagStore},
    password::hash_password,
    state::{SystemState, Transition},
};

/// Settings the orchestrator needs from config.
#[derive(Debug, Clone)]
pub struct BootstrapSettings {
    pub company_name: String,
    pub password_cost: u32,
    /// Administrator recreated by force re-init. Its password is the fixed
    /// re-init password.
    pub reinit_admin: AdminSpec,
}

impl From<&BootstrapConfig> for BootstrapSettings {
    fn from(cfg: &BootstrapConfig) -> Self {
        let mut reinit_admin = AdminSpec::from_config(&cfg.default_admin);
        reinit_admin.password = Some(cfg.reinit_password.clone());
        Self {
            company_name: cfg.company_name.clone(),
            password_cost: cfg.password_cost,
            reinit_admin,
        }
    }
}

/// Public fields of an administrator. Never carries the password hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminSummary {
    pub id: String,
    pub username: String,
    pub email: String,
    pub display_name: String,
    pub position: Option<String>,
    pub role: Role,
}

impl From<&User> for AdminSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            username: user.username.clone(),
            email: user.email.clone(),
            display_name: user.display_name.clone(),
            position: user.position.clone(),
            role: user.role,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanySummary {
    pub id: String,
    pub name: String,
}

impl From<&Company> for CompanySummary {
    fn from(company: &Company) -> Self {
        Self {
            id: company.id.clone(),
            name: company.name.clone(),
        }
    }
}

/// What "ensure company" had to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CompanyAction {
    Created,
    Existing,
    /// A malformed record without dependents was replaced.
    Repaired,
    /// A malformed record with dependents was left untouched and used.
    KeptMalformed,
}

#[derive(Debug, Clone)]
pub struct EnsuredCompany {
    pub company: Company,
    pub action: CompanyAction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AdminAction {
    Created,
    Existing,
}

/// Result of a successful first-run setup.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitOutcome {
    pub admin: AdminSummary,
    pub company: CompanySummary,
    pub company_action: CompanyAction,
    /// Soft failures that did not abort setup (e.g. the flag write).
    pub warnings: Vec<String>,
}

/// Result of the non-interactive quick-init entry point.
#[derive(Debug, Clone)]
pub struct QuickInitOutcome {
    pub admin: AdminSummary,
    pub admin_action: AdminAction,
    pub company: CompanySummary,
    pub company_action: CompanyAction,
    /// Password to hand to the operator; `None` when an existing admin was reused.
    pub password: Option<Secret<String>>,
    pub warnings: Vec<String>,
}

/// Result of force re-init.
#[derive(Debug, Clone)]
pub struct ReinitOutcome {
    pub admin: AdminSummary,
    pub company: CompanySummary,
    /// Removed administrators, each with the rows purged alongside it.
    pub removed: Vec<(String, PurgedRows)>,
    pub password: Secret<String>,
    pub warnings: Vec<String>,
}

/// Drives first-run setup against an explicitly supplied store and flag store.
#[derive(Clone)]
pub struct Bootstrapper {
    store: Arc<dyn BootstrapStore>,
    flags: Arc<dyn FlagStore>,
    settings: BootstrapSettings,
}

impl Bootstrapper {
    pub fn new(
        store: Arc<dyn BootstrapStore>,
        flags: Arc<dyn FlagStore>,
        settings: BootstrapSettings,
    ) -> Self {
        Self {
            store,
            flags,
            settings,
        }
    }

    /// Open the configured SQLite store and flag file. The returned store
    /// handle is the one to `close()` when the caller is done.
    pub async fn connect(config: &AgentdeskConfig) -> Result<(Self, SqliteStore)> {
        let store = SqliteStore::connect(
            &config.database.resolved_url(),
            config.database.max_connections,
        )
        .await?;
        let flags = FileFlagStore::new(config.bootstrap.resolved_flag_file());
        let bootstrapper = Self::new(
            Arc::new(store.clone()),
            Arc::new(flags),
            BootstrapSettings::from(&config.bootstrap),
        );
        Ok((bootstrapper, store))
    }

    pub fn store(&self) -> &dyn BootstrapStore {
        self.store.as_ref()
    }

    pub fn settings(&self) -> &BootstrapSettings {
        &self.settings
    }

    /// Run the initialization detector.
    pub async fn check(&self) -> InitReport {
        check_initialized(self.store.as_ref(), self.flags.as_ref()).await
    }

    /// First-run setup: create the default company (if needed) and the single
    /// administrator, then record completion.
    ///
    /// Validation and the "no users yet" guard run before any mutation. The
    /// store's uniqueness constraints make concurrent callers lose with
    /// [`Error::Conflict`].
    pub async fn initialize_system(&self, spec: AdminSpec) -> Result<InitOutcome> {
        let admin = match spec.validate() {
            Ok(admin) => admin,
            Err(e) => {
                let state = self.guard_state().await.unwrap_or(SystemState::Unreachable);
                warn!(
                    error = %e,
                    state = ?state.apply(Transition::SetupRejected),
                    "setup rejected"
                );
                return Err(e);
            },
        };

        let state = self.guard_state().await?;
        if !state.can_initialize() {
            return Err(Error::AlreadyInitialized);
        }

        let ensured = self.ensure_company().await?;
        let user = self.create_admin(&ensured.company, &admin, true).await?;
        let warnings = self.record_completion(&ensured.company, &user).await;

        info!(
            username = %user.username,
            company = %ensured.company.name,
            state = ?state.apply(Transition::SetupSucceeded),
            "system initialized"
        );
        Ok(InitOutcome {
            admin: AdminSummary::from(&user),
            company: CompanySummary::from(&ensured.company),
            company_action: ensured.action,
            warnings,
        })
    }

    /// Setup guard: any user row at all, active or not, means the system was
    /// initialized.
    async fn guard_state(&self) -> Result<SystemState> {
        Ok(if self.store.count_users().await? > 0 {
            SystemState::Initialized
        } else {
            SystemState::Fresh
        })
    }

    /// Find or create the default company, repairing a malformed id when
    /// nothing references it.
    pub async fn ensure_company(&self) -> Result<EnsuredCompany> {
        let name = self.settings.company_name.as_str();

        let Some(existing) = self.store.find_company_by_name(name).await? else {
            return match self.store.insert_company(&Company::new(name)).await {
                Ok(company) => {
                    info!(company_id = %company.id, name, "created default company");
                    Ok(EnsuredCompany {
                        company,
                        action: CompanyAction::Created,
                    })
                },
                // A concurrent bootstrap created it first.
                Err(agentdesk_store::Error::Conflict { .. }) => {
                    let company = self.store.find_company_by_name(name).await?.ok_or_else(|| {
                        Error::Conflict {
                            message: format!("company `{name}` vanished during creation"),
                        }
                    })?;
                    Ok(EnsuredCompany {
                        company,
                        action: CompanyAction::Existing,
                    })
                },
                Err(e) => Err(e.into()),
            };
        };

        if existing.has_canonical_id() {
            return Ok(EnsuredCompany {
                company: existing,
                action: CompanyAction::Existing,
            });
        }

        let dependents = self.store.company_dependents(&existing.id).await?;
        if !dependents.is_empty() {
            warn!(
                company_id = %existing.id,
                users = dependents.users,
                departments = dependents.departments,
                agents = dependents.agents,
                "default company has a malformed id but is referenced; keeping it"
            );
            return Ok(EnsuredCompany {
                company: existing,
                action: CompanyAction::KeptMalformed,
            });
        }

        match self
            .store
            .replace_company(&existing.id, &Company::new(name))
            .await
        {
            Ok(company) => {
                info!(
                    old_id = %existing.id,
                    company_id = %company.id,
                    "replaced default company with malformed id"
                );
                Ok(EnsuredCompany {
                    company,
                    action: CompanyAction::Repaired,
                })
            },
            Err(agentdesk_store::Error::CompanyInUse { .. }) => {
                warn!(company_id = %existing.id, "company gained dependents during repair; keeping it");
                Ok(EnsuredCompany {
                    company: existing,
                    action: CompanyAction::KeptMalformed,
                })
            },
            Err(e) => Err(e.into()),
        }
    }

    /// Hash the password and insert an active administrator under `company`.
    /// The username doubles as the user id.
    async fn create_admin(
        &self,
        company: &Company,
        admin: &ValidAdmin,
        bootstrap_admin: bool,
    ) -> Result<User> {
        let password_hash = hash_password(&admin.password, self.settings.password_cost)?;
        let user = self
            .store
            .insert_user(&NewUser {
                id: admin.username.clone(),
                company_id: company.id.clone(),
                username: admin.username.clone(),
                password_hash,
                display_name: admin.display_name.clone(),
                position: Some(admin.position.clone()),
                email: admin.email.clone(),
                phone: None,
                role: Role::Admin,
                is_active: true,
                bootstrap_admin,
            })
            .await?;
        info!(username = %user.username, company_id = %company.id, "created administrator");
        Ok(user)
    }

    /// Write the flag record. Failures are returned as warnings, never errors.
    async fn record_completion(&self, company: &Company, admin: &User) -> Vec<String> {
        let record = FlagRecord::completed(&company.name, &company.id, &admin.username, &admin.email);
        match self.flags.write(&record).await {
            Ok(()) => Vec::new(),
            Err(e) => {
                warn!(error = %e, "initialization succeeded but the flag record was not written");
                vec![format!("initialization flag not written: {e}")]
            },
        }
    }

    /// Destructive recovery: delete every administrator-like user of the
    /// default company together with its permissions, messages, sessions and
    /// files, then create one administrator with the fixed re-init password.
    pub async fn force_reinit_admin(&self) -> Result<ReinitOutcome> {
        let admin = self.settings.reinit_admin.clone().validate()?;

        let report = self.check().await;
        if let Some(cause) = &report.backend_error {
            return Err(Error::Detection {
                message: cause.clone(),
            });
        }
        if !report.state().can_force_reinit() {
            return Err(Error::NotInitialized);
        }

        let ensured = self.ensure_company().await?;
        let candidates = self.store.find_admin_candidates(&ensured.company.id).await?;

        let mut removed = Vec::with_capacity(candidates.len());
        for user in candidates {
            let purged = self.store.delete_user_cascade(&user.id).await?;
            warn!(
                username = %user.username,
                permissions = purged.permissions,
                messages = purged.messages,
                sessions = purged.sessions,
                files = purged.files,
                "deleted administrator for re-initialization"
            );
            removed.push((user.username, purged));
        }

        let user = self.create_admin(&ensured.company, &admin, true).await?;
        let warnings = self.record_completion(&ensured.company, &user).await;
        info!(
            username = %user.username,
            state = ?report.state().apply(Transition::ForceReinitialized),
            "administrator re-initialized"
        );

        Ok(ReinitOutcome {
            admin: AdminSummary::from(&user),
            company: CompanySummary::from(&ensured.company),
            removed,
            password: admin.password,
            warnings,
        })
    }

    /// Non-interactive composition for deployment tooling: reachability →
    /// already-initialized guard (skipped with `force`; flag record, then any
    /// user row) → ensure company → find or create admin → write flag.
    pub async fn quick_init(&self, spec: AdminSpec, force: bool) -> Result<QuickInitOutcome> {
        self.store.ping().await?;

        if !force {
            let flagged = match self.flags.read().await {
                Ok(record) => record.is_some_and(|r| r.initialized),
                Err(e) => {
                    warn!(error = %e, "unreadable initialization flag; falling back to the database");
                    false
                },
            };
            if flagged || !self.guard_state().await?.can_initialize() {
                return Err(Error::AlreadyInitialized);
            }
        }

        let admin = spec.validate()?;
        let ensured = self.ensure_company().await?;

        let (user, admin_action, password) =
            match self.store.find_user_by_username(&admin.username).await? {
                Some(existing) => {
                    info!(username = %existing.username, "administrator already exists; reusing it");
                    (existing, AdminAction::Existing, None)
                },
                None => {
                    let first = self.store.count_users().await? == 0;
                    let user = self.create_admin(&ensured.company, &admin, first).await?;
                    (user, AdminAction::Created, Some(admin.password.clone()))
                },
            };

        let warnings = self.record_completion(&ensured.company, &user).await;
        Ok(QuickInitOutcome {
            admin: AdminSummary::from(&user),
            admin_action,
            company: CompanySummary::from(&ensured.company),
            company_action: ensured.action,
            password,
            warnings,
        })
    }
}
