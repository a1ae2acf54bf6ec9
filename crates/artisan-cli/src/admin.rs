use clap::Subcommand;

#[derive(Debug, Subcommand)]
pub enum AdminCommands {
    /// Create an administrator account
    Create {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        /// Read from ARTISAN_ADMIN_PASSWORD when omitted
        #[arg(long, env = "ARTISAN_ADMIN_PASSWORD", hide_env_values = true)]
        password: String,
    },
}

pub(crate) async fn run(pool: &sqlx::PgPool, command: AdminCommands) -> anyhow::Result<()> {
    match command {
        AdminCommands::Create {
            name,
            email,
            password,
        } => {
            let name = name.trim();
            if name.is_empty() {
                anyhow::bail!("admin name must not be empty");
            }
            let email = artisan_core::normalize_email(&email)
                .ok_or_else(|| anyhow::anyhow!("'{email}' is not a valid email address"))?;
            artisan_core::validate_password(&password).map_err(anyhow::Error::msg)?;

            let hash = artisan_core::hash_password(&password)?;
            let admin = artisan_db::create_admin(pool, name, &email, &hash)
                .await
                .map_err(|e| {
                    if e.is_unique_violation() {
                        anyhow::anyhow!("an admin with email '{email}' already exists")
                    } else {
                        anyhow::Error::new(e)
                    }
                })?;

            tracing::info!(admin_id = %admin.id, "admin account created");
            println!("created admin {} <{}>", admin.name, admin.email);
        }
    }
    Ok(())
}
