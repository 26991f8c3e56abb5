//! Dirbind - directory-backed credential verification
//!
//! Operator harness for the LDAP authenticator: check a configuration,
//! authenticate one claim, or run the built-in demo directory.

mod commands;

use clap::{Parser, Subcommand, ValueEnum};
use commands::CommandContext;
use dirbind_core::DirbindConfig;
use tracing::debug;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "dirbind")]
#[command(author = "Dirbind Team")]
#[command(version = dirbind_core::VERSION)]
#[command(about = "Directory-backed credential verification", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, global = true, env = "DIRBIND_CONFIG")]
    config: Option<String>,

    /// LDAP server URL
    #[arg(long, global = true, env = "DIRBIND_LDAP_URL")]
    ldap_url: Option<String>,

    /// Base DN for user entries
    #[arg(long, global = true, env = "DIRBIND_BASE_DN")]
    base_dn: Option<String>,

    /// Identity resolver (pattern, search)
    #[arg(long, global = true)]
    resolver: Option<String>,

    /// Returned identifier (dn, login)
    #[arg(long, global = true)]
    returned_id: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "DIRBIND_LOG_LEVEL")]
    log_level: Option<String>,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value = "text")]
    output: OutputFormat,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Authenticate a login against the directory
    Auth {
        /// Login to authenticate
        login: String,

        /// Secret; read from stdin when not given
        #[arg(long, env = "DIRBIND_PASSWORD", hide_env_values = true)]
        password: Option<String>,

        /// Also fetch the attributes configured in [attributes]
        #[arg(long)]
        enrich: bool,
    },

    /// Validate the configuration without authenticating anyone
    CheckConfig,

    /// Run the authenticate-then-enrich pipeline against a built-in directory
    Demo,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // Load or create config
    let mut config = if let Some(config_path) = &cli.config {
        DirbindConfig::from_file(config_path)?
    } else {
        DirbindConfig::from_env()
    };

    // Override with CLI args
    if let Some(url) = cli.ldap_url {
        config.ldap.server_url = Some(url);
    }
    if let Some(base_dn) = cli.base_dn {
        config.ldap.base_dn = Some(base_dn);
    }
    if let Some(resolver) = cli.resolver {
        config.ldap.resolver = resolver;
    }
    if let Some(returned_id) = cli.returned_id {
        config.ldap.returned_id = returned_id;
    }
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }

    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    if config.logging.format == "json" {
        tracing_subscriber::registry()
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .with(filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .with(filter)
            .init();
    }

    debug!(
        "Dirbind {} (resolver: {}, server: {:?})",
        dirbind_core::VERSION, config.ldap.resolver, config.ldap.server_url
    );

    let ctx = CommandContext {
        config,
        output_format: cli.output,
        verbose: cli.verbose,
        quiet: cli.quiet,
    };

    match cli.command {
        Commands::Auth {
            login,
            password,
            enrich,
        } => commands::auth::execute(&ctx, &login, password, enrich).await,
        Commands::CheckConfig => commands::check::execute(&ctx).await,
        Commands::Demo => commands::demo::execute(&ctx).await,
    }
}
