//! orchestrix: resource service and command-line client
//!
//! ```bash
//! orchestrix serve --port 8000
//! orchestrix migrate
//! orchestrix tenant create '{"name": "acme"}'
//! orchestrix host create hosts.yaml
//! orchestrix host show web01
//! orchestrix host history urn:orchestrix:host:host(urn:orchestrix:tenant:acme,web01)
//! ```
//!
//! ## Configuration
//! - `config.yaml`, `--config`, or ORCHESTRIX_CONFIG for the server
//! - ORCHESTRIX_* variables, e.g. ORCHESTRIX_SERVER__PORT
//! - ORCHESTRIX_LOG: log filter (default: info)
//! - ORCHESTRIX_HOST: server URL used by resource commands

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::{error, info};

use orchestrix::api;
use orchestrix::catalog::Stores;
use orchestrix::config::{Config, DEFAULT_SERVER_URL, HOST_ENV_VAR};
use orchestrix::entity::{Entity, Host, OAuthClient, Tenant, User};
use orchestrix::utils::bootstrap::{connect, init_tracing};
use orchestrix_client::{report_error, ResourceClient, ResourceCommand};

#[derive(Parser)]
#[command(name = "orchestrix")]
#[command(version)]
#[command(about = "Versioned resource management service and client", long_about = None)]
struct Cli {
    /// Server URL for resource commands
    #[arg(long, global = true, env = HOST_ENV_VAR, default_value = DEFAULT_SERVER_URL)]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the REST server
    Serve {
        /// Configuration file
        #[arg(short, long)]
        config: Option<String>,

        /// Bind host, overrides configuration
        #[arg(short = 'a', long)]
        host: Option<String>,

        /// Bind port, overrides configuration
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Create every entity table
    Migrate {
        /// Configuration file
        #[arg(short, long)]
        config: Option<String>,
    },
    /// Manage tenants
    Tenant {
        #[command(subcommand)]
        action: ResourceCommand,
    },
    /// Manage hosts
    Host {
        #[command(subcommand)]
        action: ResourceCommand,
    },
    /// Manage OAuth clients
    OauthClient {
        #[command(subcommand)]
        action: ResourceCommand,
    },
    /// Manage users
    User {
        #[command(subcommand)]
        action: ResourceCommand,
    },
}

async fn open_stores(config: &Config) -> Result<Stores, Box<dyn std::error::Error + Send + Sync>> {
    let context = config.store_context()?;
    let pool = connect(&config.storage).await?;
    Ok(Stores::sqlite(pool, &context).await?)
}

async fn serve(
    config_path: Option<String>,
    host: Option<String>,
    port: Option<u16>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    init_tracing();

    let mut config = Config::load(config_path.as_deref())?;
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    info!(
        address = %config.bind_address(),
        namespace = %config.urn.namespace,
        timezone = %config.timezone,
        "starting orchestrix"
    );
    let stores = open_stores(&config).await?;
    api::serve(&stores, &config.bind_address()).await
}

async fn migrate(config_path: Option<String>) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    init_tracing();

    let config = Config::load(config_path.as_deref())?;
    open_stores(&config).await?;
    info!(url = %config.storage.url, "migration complete");
    Ok(())
}

async fn resource(server: &str, collection: &str, action: ResourceCommand) -> ExitCode {
    let client = match ResourceClient::new(server, collection) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("ERROR {}", e);
            return ExitCode::FAILURE;
        }
    };

    let mut stdout = std::io::stdout();
    match orchestrix_client::run(&client, action, &mut stdout).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let _ = report_error(&e, &mut std::io::stderr());
            ExitCode::FAILURE
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Serve { config, host, port } => serve(config, host, port).await,
        Commands::Migrate { config } => migrate(config).await,
        Commands::Tenant { action } => return resource(&cli.server, Tenant::COLLECTION, action).await,
        Commands::Host { action } => return resource(&cli.server, Host::COLLECTION, action).await,
        Commands::OauthClient { action } => {
            return resource(&cli.server, OAuthClient::COLLECTION, action).await
        }
        Commands::User { action } => return resource(&cli.server, User::COLLECTION, action).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "orchestrix failed");
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
