use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};

use svcreg_client::RegistryClient;
use svcreg_core::{bootstrap::load_client_config, logging, Endpoint, ServerIdentity};

#[derive(Parser, Debug)]
#[command(name = "svcreg-cli")]
#[command(about = "Register or discover servers through an svcreg master", long_about = None)]
struct Args {
    /// Client config file. Defaults to $SVCREG_CLIENT_CONFIG_PATH or ./config/client.yaml
    #[arg(short, long)]
    config: Option<String>,

    /// Master host (overrides master_server.host)
    #[arg(long)]
    host: Option<String>,

    /// Master port (overrides master_server.port)
    #[arg(long)]
    port: Option<u16>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Publish or update a server's endpoint
    Register {
        #[arg(long = "type")]
        server_type: String,
        #[arg(long = "name")]
        server_name: String,
        #[arg(long)]
        ip: String,
        #[arg(long)]
        port: u16,
    },
    /// Resolve a server identity; falls back to the configured target_server
    Discover {
        #[arg(long = "type", requires = "server_name")]
        server_type: Option<String>,
        #[arg(long = "name", requires = "server_type")]
        server_name: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = load_client_config(args.config.as_deref())?;
    if let Some(host) = args.host {
        config.master_server.host = host;
    }
    if let Some(port) = args.port {
        config.master_server.port = port;
    }
    logging::init_logging(&config.logging)?;

    let client = RegistryClient::from_config(&config);

    match args.command {
        Command::Register {
            server_type,
            server_name,
            ip,
            port,
        } => {
            let identity = ServerIdentity::new(server_type, server_name);
            let accepted = client
                .register(identity.clone(), Endpoint::new(ip, port))
                .await
                .with_context(|| format!("registering {identity}"))?;
            if !accepted {
                bail!("master refused registration of {identity}");
            }
            println!("registered {identity}");
        }
        Command::Discover {
            server_type,
            server_name,
        } => {
            let identity = match (server_type, server_name) {
                (Some(server_type), Some(server_name)) => ServerIdentity::new(server_type, server_name),
                _ => config
                    .default_target()
                    .context("no --type/--name given and no target_server configured")?,
            };
            match client
                .discover(identity.clone())
                .await
                .with_context(|| format!("discovering {identity}"))?
            {
                Some(endpoint) => println!("{endpoint}"),
                None => bail!("{identity} is not registered"),
            }
        }
    }

    Ok(())
}
