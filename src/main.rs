use clap::{Parser, Subcommand};

use authflow::cli::output::{print_error, OutputMode};
use authflow::cli::session::{self, Resource};

#[derive(Parser)]
#[command(name = "authflow", version, about = "Log in and call token-protected APIs with automatic token refresh")]
struct Cli {
    /// Path to a config file
    #[arg(long, global = true, env = "AUTHFLOW_CONFIG")]
    config: Option<String>,

    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in and store the refresh token
    Login {
        /// Account email
        #[arg(long)]
        email: String,

        /// Account password
        #[arg(long, env = "AUTHFLOW_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Revoke the stored refresh token and forget the session
    Logout,

    /// Show the logged-in user
    Me,

    /// Show account statistics
    Stats,

    /// Show the dashboard summary
    Dashboard,

    /// Show whether a session is stored locally
    Status,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("AUTHFLOW_LOG_LEVEL")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mode = OutputMode::from_flag(cli.json);

    if let Err(e) = run(cli, mode).await {
        print_error(&e, mode == OutputMode::Json);
        std::process::exit(1);
    }
}

async fn run(cli: Cli, mode: OutputMode) -> Result<(), authflow::AuthflowError> {
    let config = cli.config.as_deref();
    match cli.command {
        Commands::Login { email, password } => {
            session::run_login(config, &email, &password, mode).await
        }
        Commands::Logout => session::run_logout(config, mode).await,
        Commands::Me => session::run_fetch(config, Resource::Me, mode).await,
        Commands::Stats => session::run_fetch(config, Resource::Stats, mode).await,
        Commands::Dashboard => session::run_fetch(config, Resource::Dashboard, mode).await,
        Commands::Status => session::run_status(config, mode).await,
    }
}
