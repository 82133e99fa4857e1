use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use jobseek_client::config::Config;
use jobseek_client::gateway::OutboundRequest;
use jobseek_client::guard::{AuthStatus, RouteGuard};
use jobseek_client::models::user::User;
use jobseek_client::{ClientError, ClientState};

#[derive(Parser, Debug)]
#[command(name = "jobseek", about = "Job-search assistant API client")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sign in and persist the session
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "JOBSEEK_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Create an account and persist the session
    Register {
        #[arg(long)]
        email: String,
        #[arg(long, env = "JOBSEEK_PASSWORD", hide_env_values = true)]
        password: String,
        #[arg(long)]
        name: Option<String>,
    },
    /// Sign out and erase the persisted session
    Logout,
    /// Fetch the current user from the API
    Me,
    /// Show the local session and where the route guards would send you
    Status,
    /// Authenticated GET against any API path
    Get { path: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::from_env()?;

    // Logs go to stderr so command output stays machine-readable.
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("jobseek_client={}", &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!("Starting jobseek v{}", env!("CARGO_PKG_VERSION"));

    let state = ClientState::from_config(config)?;

    match run(cli.command, &state).await {
        Ok(output) => {
            println!("{}", serde_json::to_string_pretty(&output)?);
            Ok(())
        }
        Err(err) => match err.downcast_ref::<ClientError>() {
            Some(client_err) => {
                println!("{}", serde_json::to_string_pretty(&client_err.report())?);
                std::process::exit(1);
            }
            None => Err(err),
        },
    }
}

fn user_output(user: &User) -> Value {
    json!({ "user": user, "display_name": user.display_name() })
}

async fn run(command: Command, state: &ClientState) -> Result<Value> {
    let output = match command {
        Command::Login { email, password } => {
            let user = state.session.login(&email, &password).await?;
            user_output(&user)
        }
        Command::Register {
            email,
            password,
            name,
        } => {
            let user = state
                .session
                .register(&email, &password, name.as_deref())
                .await?;
            user_output(&user)
        }
        Command::Logout => {
            state.session.sign_out().await?;
            json!({ "logged_out": true })
        }
        Command::Me => {
            let user = state.gateway.fetch_current_user().await?;
            user_output(&user)
        }
        Command::Status => {
            let session = state.session.snapshot();
            let protected = format!("{:?}", RouteGuard::protected().decide(&session));
            let public_only = format!("{:?}", RouteGuard::public_only().decide(&session));
            json!({
                "status": format!("{:?}", AuthStatus::of(&session)),
                "user": session.user,
                "display_name": session.user.as_ref().map(User::display_name),
                "protected_route": protected,
                "public_route": public_only,
            })
        }
        Command::Get { path } => {
            let response = state.gateway.send(OutboundRequest::get(path)).await?;
            let status = response.status().as_u16();
            let body = response.text().await.context("Failed to read response body")?;
            let body = serde_json::from_str::<Value>(&body).unwrap_or(Value::String(body));
            json!({ "status": status, "body": body })
        }
    };

    Ok(output)
}
