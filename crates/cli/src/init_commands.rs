use {
    agentdesk_bootstrap::{AdminAction, AdminSpec, Bootstrapper, Error, verify_admin},
    agentdesk_config::AgentdeskConfig,
    anyhow::{Result, bail},
    clap::Args,
    secrecy::{ExposeSecret, Secret},
};

/// Fields left unset fall back to `[bootstrap.default_admin]`.
#[derive(Args)]
pub struct InitArgs {
    /// Proceed even if the system already looks initialized. Existing
    /// records are reused; nothing is deleted.
    #[arg(long)]
    pub force: bool,
    #[arg(long)]
    pub username: Option<String>,
    #[arg(long)]
    pub email: Option<String>,
    #[arg(long, env = "AGENTDESK_ADMIN_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,
    #[arg(long)]
    pub display_name: Option<String>,
    #[arg(long)]
    pub position: Option<String>,
}

impl InitArgs {
    fn into_spec(self, config: &AgentdeskConfig) -> AdminSpec {
        let defaults = AdminSpec::from_config(&config.bootstrap.default_admin);
        AdminSpec {
            username: self.username.or(defaults.username),
            email: self.email.or(defaults.email),
            password: self.password.map(Secret::new).or(defaults.password),
            display_name: self.display_name.or(defaults.display_name),
            position: self.position.or(defaults.position),
        }
    }
}

pub async fn quick_init(config: &AgentdeskConfig, args: InitArgs) -> Result<()> {
    let force = args.force;
    let spec = args.into_spec(config);
    let (bootstrapper, store) = Bootstrapper::connect(config).await?;

    let result = bootstrapper.quick_init(spec, force).await;
    store.close().await;

    let outcome = match result {
        Ok(outcome) => outcome,
        Err(Error::AlreadyInitialized) => {
            bail!("system is already initialized; pass --force to re-run setup without deleting anything")
        },
        Err(e) => return Err(e.into()),
    };

    println!(
        "Company: {} ({}, {:?})",
        outcome.company.name, outcome.company.id, outcome.company_action
    );
    match outcome.admin_action {
        AdminAction::Created => println!("Administrator created: {}", outcome.admin.username),
        AdminAction::Existing => {
            println!("Administrator already exists: {}", outcome.admin.username)
        },
    }
    if let Some(password) = &outcome.password {
        println!("  username: {}", outcome.admin.username);
        println!("  password: {}", password.expose_secret());
        println!("Change this password after the first login.");
    }
    for warning in &outcome.warnings {
        eprintln!("Warning: {warning}");
    }
    Ok(())
}

pub async fn check(config: &AgentdeskConfig, json: bool) -> Result<()> {
    let (bootstrapper, store) = Bootstrapper::connect(config).await?;
    let report = bootstrapper.check().await;
    let users = bootstrapper.store().count_users().await.ok();
    store.close().await;

    if json {
        let mut value = serde_json::to_value(&report)?;
        value["state"] = serde_json::to_value(report.state())?;
        value["users"] = serde_json::json!(users);
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    println!("State:        {:?}", report.state());
    println!("Source:       {:?}", report.source);
    println!("Detail:       {}", report.detail);
    if let Some(active) = report.active_users {
        println!("Active users: {active}");
    }
    if let Some(users) = users {
        println!("Total users:  {users}");
    }
    if let Some(flag) = &report.flag {
        println!(
            "Flag:         initialized={} at {} for {}",
            flag.initialized, flag.timestamp, flag.company
        );
    }
    if let Some(cause) = &report.backend_error {
        eprintln!("Database error: {cause}");
    }
    Ok(())
}

pub async fn verify(
    config: &AgentdeskConfig,
    username: Option<String>,
    password: Option<String>,
) -> Result<()> {
    let admin = &config.bootstrap.default_admin;
    let username = username.unwrap_or_else(|| admin.username.clone());
    let password = password.unwrap_or_else(|| admin.password.expose_secret().clone());

    let (bootstrapper, store) = Bootstrapper::connect(config).await?;
    let result = verify_admin(bootstrapper.store(), &username, &password).await;
    store.close().await;
    let report = result?;

    let mark = |ok: bool| if ok { "ok" } else { "FAILED" };
    println!("User `{username}`:");
    println!("  exists:           {}", mark(report.exists));
    if report.exists {
        println!("  active:           {}", mark(report.active));
        println!("  administrator:    {}", mark(report.is_admin));
        println!("  password matches: {}", mark(report.password_matches));
    }
    if !report.ok() {
        bail!("verification failed for `{username}`");
    }
    Ok(())
}

pub async fn reinit_admin(config: &AgentdeskConfig, yes: bool) -> Result<()> {
    if !yes {
        eprintln!(
            "This deletes every administrator of `{}` together with their permissions, \
             chat sessions, messages and uploaded files, then creates a fresh administrator \
             with the configured re-init password.",
            config.bootstrap.company_name
        );
        bail!("refusing to continue without --yes");
    }

    let (bootstrapper, store) = Bootstrapper::connect(config).await?;
    let result = bootstrapper.force_reinit_admin().await;
    store.close().await;
    let outcome = result?;

    for (username, purged) in &outcome.removed {
        println!(
            "Deleted `{username}`: {} permissions, {} messages, {} sessions, {} files",
            purged.permissions, purged.messages, purged.sessions, purged.files
        );
    }
    println!(
        "Administrator recreated for {} ({})",
        outcome.company.name, outcome.company.id
    );
    println!("  username: {}", outcome.admin.username);
    println!("  password: {}", outcome.password.expose_secret());
    println!("Change this password after the first login.");
    for warning in &outcome.warnings {
        eprintln!("Warning: {warning}");
    }
    Ok(())
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> InitArgs {
        InitArgs {
            force: false,
            username: None,
            email: None,
            password: None,
            display_name: None,
            position: None,
        }
    }

    #[test]
    fn unset_fields_use_configured_defaults() {
        let config = AgentdeskConfig::default();
        let spec = args().into_spec(&config);
        assert_eq!(spec.username.as_deref(), Some("admin"));
        assert_eq!(spec.email.as_deref(), Some("admin@example.com"));
        assert_eq!(spec.position.as_deref(), Some("System Administrator"));
        assert_eq!(spec.password.unwrap().expose_secret(), "admin123");
    }

    #[test]
    fn flags_override_defaults() {
        let config = AgentdeskConfig::default();
        let spec = InitArgs {
            username: Some("root".into()),
            password: Some("hunter22".into()),
            ..args()
        }
        .into_spec(&config);
        assert_eq!(spec.username.as_deref(), Some("root"));
        assert_eq!(spec.display_name.as_deref(), Some("Administrator"));
        assert_eq!(spec.password.unwrap().expose_secret(), "hunter22");
    }
}
