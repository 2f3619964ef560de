use clap::Args;
use serde_json::json;

use crate::auth::hash_password;
use crate::auth::password::check_password_strength;
use crate::cli::utils::output_success;
use crate::cli::OutputFormat;
use crate::config::config;
use crate::database::DatabaseManager;
use crate::services::UserService;

#[derive(Args)]
pub struct CreateAdminArgs {
    #[arg(long, help = "Account email")]
    pub email: String,

    #[arg(long, help = "Display name (required for a new account)")]
    pub name: Option<String>,

    #[arg(long, env = "ADMIN_PASSWORD", help = "Password (required for a new account)")]
    pub password: Option<String>,
}

pub async fn handle(args: CreateAdminArgs, output_format: OutputFormat) -> anyhow::Result<()> {
    let pool = DatabaseManager::connect(&config().database).await?;
    let users = UserService::new(pool);

    let user = match users.find_by_email(&args.email).await? {
        Some(existing) => users.set_admin(existing.id, true).await?,
        None => {
            let name = args
                .name
                .ok_or_else(|| anyhow::anyhow!("--name is required to create a new account"))?;
            let password = args
                .password
                .ok_or_else(|| anyhow::anyhow!("--password is required to create a new account"))?;
            check_password_strength(&password, config().security.password_min_length)
                .map_err(|message| anyhow::anyhow!(message))?;
            users.create(&name, &args.email, &hash_password(&password)?, true).await?
        }
    };

    output_success(
        &output_format,
        &format!("{} is now an administrator", user.email),
        Some(json!({ "user_id": user.id, "email": user.email })),
    )
}
