//! User commands

use anyhow::Result;
use clap::Subcommand;
use serde::Serialize;
use tabled::Tabled;
use tokengate_core::auth::JwtAuthResolver;
use tokengate_core::services::accounts;
use tokengate_core::{LoginRequest, RegisterRequest, UserResponse};

use super::Context;
use crate::output::{print_info, print_single, print_success, print_warning, OutputFormat};

#[derive(Subcommand)]
pub enum UserAction {
    /// Register a user on the free plan
    Add {
        /// Username
        username: String,

        /// Password
        #[arg(long)]
        password: String,

        /// Display name (defaults to the username)
        #[arg(long, default_value = "")]
        name: String,

        /// Email (defaults to <username>@local)
        #[arg(long)]
        email: Option<String>,
    },

    /// Issue an access token for a user
    Login {
        /// Username
        username: String,

        /// Password
        #[arg(long)]
        password: String,
    },
}

/// User row for table display
#[derive(Debug, Serialize, Tabled)]
pub struct UserRow {
    #[tabled(rename = "ID")]
    pub id: String,
    #[tabled(rename = "Username")]
    pub username: String,
    #[tabled(rename = "Email")]
    pub email: String,
    #[tabled(rename = "Name")]
    pub name: String,
}

impl From<&UserResponse> for UserRow {
    fn from(user: &UserResponse) -> Self {
        Self {
            id: user.id.clone(),
            username: user.username.clone(),
            email: user.email.clone(),
            name: user.name.clone(),
        }
    }
}

pub async fn execute(ctx: &Context, action: UserAction) -> Result<()> {
    match action {
        UserAction::Add {
            username,
            password,
            name,
            email,
        } => add_user(ctx, username, password, name, email).await,
        UserAction::Login { username, password } => login(ctx, username, password).await,
    }
}

async fn add_user(
    ctx: &Context,
    username: String,
    password: String,
    name: String,
    email: Option<String>,
) -> Result<()> {
    let request = RegisterRequest {
        username,
        password,
        name,
        email,
    };
    let free_plan = ctx.entitlements.catalog().free_plan();
    let today = ctx.entitlements.day_boundary().today();

    let user = accounts::register_user(&ctx.users, request, free_plan, today).await?;

    print_success(&format!("Registered {} on the {} plan", user.username, free_plan.name), ctx.quiet);
    print_single(&UserRow::from(&user), &user, ctx.format)
}

async fn login(ctx: &Context, username: String, password: String) -> Result<()> {
    if std::env::var(tokengate_core::config::ENV_JWT_SECRET).is_err() {
        print_warning("TOKENGATE_JWT_SECRET is not set; this token will not be accepted by the server");
    }

    let resolver = JwtAuthResolver::new(ctx.config.jwt_secret.clone());
    let token = accounts::login(&ctx.users, &resolver, LoginRequest { username, password }).await?;

    match ctx.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&token)?),
        OutputFormat::Table => {
            print_info(
                &format!("Token valid for {} hours", token.expires_in / 3600),
                ctx.quiet,
            );
            println!("{}", token.access_token);
        }
    }
    Ok(())
}
