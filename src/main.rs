use anyhow::{Context as _, Result};
use clap::{Args, Parser, Subcommand};
use oauthkeep_config::{Config, LogConfig};
use oauthkeep_store::{
    ClientStoreOptions, DatabaseConnection, DbClientStore, DbTokenStore, TokenStoreOptions,
};
use oauthkeep_types::{Client, ClientStore as _, Token, TokenStore as _};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "oauthkeep", about = "oauthkeep — OAuth2 client and token storage")]
struct Cli {
    /// Path to the YAML configuration file.
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,
    /// Override the database URL (e.g. sqlite://oauthkeep.db?mode=rwc).
    #[arg(long, value_name = "URL", global = true)]
    db: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Manage registered clients.
    #[command(subcommand)]
    Client(ClientCommand),
    /// Inspect or revoke issued credentials.
    #[command(subcommand)]
    Token(TokenCommand),
    /// Delete expired and revoked token rows once.
    Sweep,
    /// Run the periodic token sweep until interrupted.
    Gc,
}

#[derive(Subcommand, Debug)]
enum ClientCommand {
    /// Register a new client.
    Add {
        #[arg(long)]
        id: String,
        #[arg(long)]
        secret: String,
        #[arg(long)]
        domain: String,
        #[arg(long)]
        user_id: Option<String>,
    },
    /// Print a client's stored record.
    Show { id: String },
}

#[derive(Subcommand, Debug)]
enum TokenCommand {
    /// Print the stored record for a credential.
    Show(CredentialArg),
    /// Clear a credential so it no longer resolves.
    Revoke(CredentialArg),
}

#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
struct CredentialArg {
    #[arg(long)]
    code: Option<String>,
    #[arg(long)]
    access: Option<String>,
    #[arg(long)]
    refresh: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => Config::from_file(path).map_err(|e| anyhow::anyhow!("config error: {e}"))?,
        None => Config::from_env().map_err(|e| anyhow::anyhow!("config error: {e}"))?,
    };
    if let Some(url) = cli.db {
        config.database_url = url;
    }
    init_tracing(&config.log);

    let db = oauthkeep_store::connect(&config.database_url)
        .await
        .with_context(|| format!("cannot open database {}", config.database_url))?;

    match cli.command {
        Commands::Client(cmd) => cmd_client(cmd, db, &config).await,
        Commands::Token(cmd) => cmd_token(cmd, db, &config).await,
        Commands::Sweep => cmd_sweep(db, &config).await,
        Commands::Gc => cmd_gc(db, &config).await,
    }
}

fn init_tracing(log: &LogConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if log.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn client_options(config: &Config) -> ClientStoreOptions {
    let mut opts = ClientStoreOptions::new().with_table_name(&config.clients.table);
    if !config.clients.auto_create {
        opts = opts.without_auto_create();
    }
    opts
}

/// Token store options from config. `gc` decides whether the background sweep
/// runs; only the `gc` command wants it.
fn token_options(config: &Config, gc: bool) -> TokenStoreOptions {
    let mut opts = TokenStoreOptions::new()
        .with_table_name(&config.tokens.table)
        .with_gc_interval(config.tokens.gc.interval());
    if !config.tokens.auto_create {
        opts = opts.without_auto_create();
    }
    if !gc {
        opts = opts.without_gc();
    }
    opts
}

async fn cmd_client(cmd: ClientCommand, db: DatabaseConnection, config: &Config) -> Result<()> {
    let store = DbClientStore::new(db, client_options(config)).await?;
    match cmd {
        ClientCommand::Add {
            id,
            secret,
            domain,
            user_id,
        } => {
            let mut client = Client::new(id, secret, domain);
            if let Some(user_id) = user_id {
                client = client.with_user_id(user_id);
            }
            store
                .create(&client)
                .await
                .with_context(|| format!("cannot register client '{}'", client.id))?;
            eprintln!("client '{}' registered", client.id);
        }
        ClientCommand::Show { id } => match store.get_by_id(&id).await? {
            Some(client) => println!("{}", serde_json::to_string_pretty(&client)?),
            None => anyhow::bail!("client '{id}' not found"),
        },
    }
    Ok(())
}

async fn cmd_token(cmd: TokenCommand, db: DatabaseConnection, config: &Config) -> Result<()> {
    let store = DbTokenStore::new(db, token_options(config, false)).await?;
    match cmd {
        TokenCommand::Show(arg) => {
            let found: Option<Token> = match (&arg.code, &arg.access, &arg.refresh) {
                (Some(code), _, _) => store.get_by_code(code).await?,
                (_, Some(access), _) => store.get_by_access(access).await?,
                (_, _, Some(refresh)) => store.get_by_refresh(refresh).await?,
                (None, None, None) => None,
            };
            match found {
                Some(token) => println!("{}", serde_json::to_string_pretty(&token)?),
                None => anyhow::bail!("credential not found"),
            }
        }
        TokenCommand::Revoke(arg) => {
            match (&arg.code, &arg.access, &arg.refresh) {
                (Some(code), _, _) => store.remove_by_code(code).await?,
                (_, Some(access), _) => store.remove_by_access(access).await?,
                (_, _, Some(refresh)) => store.remove_by_refresh(refresh).await?,
                (None, None, None) => {}
            }
            eprintln!("credential revoked");
        }
    }
    Ok(())
}

async fn cmd_sweep(db: DatabaseConnection, config: &Config) -> Result<()> {
    let store = DbTokenStore::new(db, token_options(config, false)).await?;
    let removed = store.sweep().await.context("sweep failed")?;
    println!("{removed} token rows removed from {}", store.table_name());
    Ok(())
}

async fn cmd_gc(db: DatabaseConnection, config: &Config) -> Result<()> {
    if !config.tokens.gc.enabled {
        anyhow::bail!("token gc is disabled in the configuration");
    }
    let store = DbTokenStore::new(db, token_options(config, true)).await?;
    tracing::info!(
        table = store.table_name(),
        interval_secs = config.tokens.gc.interval_secs,
        "token gc running, press Ctrl-C to stop"
    );
    tokio::signal::ctrl_c().await?;
    store.close().await;
    tracing::info!("token gc stopped");
    Ok(())
}
