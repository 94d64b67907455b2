//! mcpreg - MCP server registry CLI

mod context;
mod logging;

use std::path::PathBuf;

use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use mcpreg_core::{
    DomainEvent, Endpoint, EventReceiver, LifecycleState, ProbeHandle, ProviderKey, ServerRecord,
    SyncReport, SyncResult, TransportType,
};
use tracing::error;

use context::{Context, TokenStore};

#[derive(Parser)]
#[command(name = "mcpreg", version)]
#[command(about = "Keep a local MCP server registry in sync with provider directories")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Database file (default: <data dir>/mcpreg/mcpreg.db)
    #[arg(long, global = true, env = "MCPREG_DB")]
    db: Option<PathBuf>,

    /// Where provider tokens are stored
    #[arg(long, global = true, value_enum, default_value_t = TokenStore::Encrypted, env = "MCPREG_TOKEN_STORE")]
    token_store: TokenStore,

    /// Enable debug output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List supported provider directories
    Providers,

    /// List registered servers
    List {
        /// Filter by name, description, tag or provider
        #[arg(short, long)]
        query: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Register a server by hand
    Add {
        /// Display name
        name: String,

        /// Remote endpoint URL
        #[arg(long, conflicts_with = "command")]
        url: Option<String>,

        /// Local command (stdio)
        #[arg(long)]
        command: Option<String>,

        /// Arguments for the command
        #[arg(long = "arg", allow_hyphen_values = true)]
        args: Vec<String>,

        /// Transport type (inferred when omitted)
        #[arg(long = "type")]
        transport: Option<String>,

        /// Extra HTTP header, NAME=VALUE
        #[arg(long = "header")]
        headers: Vec<String>,

        /// Environment variable for the command, NAME=VALUE
        #[arg(long = "env", requires = "command")]
        env: Vec<String>,
    },

    /// Sync one provider directory into the registry
    Sync {
        provider: ProviderKey,

        /// Token to use (and remember); defaults to the stored one
        #[arg(long, env = "MCPREG_TOKEN", hide_env_values = true)]
        token: Option<String>,

        /// Show what would change without committing
        #[arg(long)]
        dry_run: bool,

        /// Probe newly discovered servers right away
        #[arg(long)]
        activate: bool,
    },

    /// Sync every provider with its stored token
    SyncAll {
        /// Probe newly discovered servers right away
        #[arg(long)]
        activate: bool,
    },

    /// Import an mcpServers JSON document ("-" for stdin)
    Import { file: PathBuf },

    /// Export the registry as an mcpServers JSON document
    Export {
        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Probe a server and mark it active if reachable
    Activate { id: String },

    /// Mark a server inactive
    Deactivate { id: String },

    /// Delete a server from the registry
    Remove { id: String },

    /// Manage provider tokens
    Token {
        #[command(subcommand)]
        action: TokenAction,
    },
}

#[derive(Subcommand)]
enum TokenAction {
    /// Store a token for a provider
    Set { provider: ProviderKey, token: String },

    /// Forget a provider's token
    Clear { provider: ProviderKey },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let _guard = logging::init_tracing(cli.verbose);

    if let Err(e) = run(cli).await {
        error!("{:#}", e);
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let activate_new = matches!(
        cli.command,
        Commands::Sync { activate: true, .. } | Commands::SyncAll { activate: true }
    );
    let ctx = Context::open(cli.db, cli.token_store, activate_new).await?;
    let mut events = ctx.services.subscribe();

    let result = dispatch(&ctx, cli.command).await;
    report_events(&mut events);
    result
}

async fn dispatch(ctx: &Context, command: Commands) -> Result<()> {
    let services = &ctx.services;

    match command {
        Commands::Providers => {
            for provider in ProviderKey::ALL {
                let info = provider.info();
                let has_token = services
                    .vault
                    .get(provider)
                    .await
                    .ok()
                    .flatten()
                    .is_some_and(|t| !t.is_empty());
                println!(
                    "{:<11} {:<11} token: {:<3}  {}",
                    provider.as_str(),
                    info.display_name,
                    if has_token { "yes" } else { "no" },
                    info.token_url
                );
            }
        }

        Commands::List { query, json } => {
            let servers = match query {
                Some(q) => services.registry.search(&q).await,
                None => services.registry.list().await,
            };
            if json {
                println!("{}", serde_json::to_string_pretty(&servers)?);
            } else {
                for server in &servers {
                    print_server(server);
                }
            }
        }

        Commands::Add {
            name,
            url,
            command,
            args,
            transport,
            headers,
            env,
        } => {
            let record = user_record(name, url, command, args, transport, headers, env)?;
            let id = record.id.clone();
            services.registry.add(record).await?;
            println!("Added {}", id);
        }

        Commands::Sync {
            provider,
            token,
            dry_run,
            ..
        } => {
            let report = if dry_run {
                SyncReport {
                    result: services.sync.preview(provider, token.as_deref()).await,
                    probes: Vec::new(),
                }
            } else {
                services
                    .sync
                    .sync_with_probes(provider, token.as_deref())
                    .await?
            };
            print_sync_result(&report.result, dry_run);
            wait_for_probes(report.probes).await;
            if report.result.is_unauthorized() {
                eprintln!(
                    "Store a token with `mcpreg token set {} <TOKEN>` or pass --token",
                    provider
                );
            }
            if !report.result.success {
                anyhow::bail!("{} sync failed", provider);
            }
        }

        Commands::SyncAll { .. } => {
            let reports = services.sync.sync_all_with_probes().await;
            let mut probes = Vec::new();
            for report in reports {
                print_sync_result(&report.result, false);
                probes.extend(report.probes);
            }
            wait_for_probes(probes).await;
        }

        Commands::Import { file } => {
            let text = if file.as_os_str() == "-" {
                std::io::read_to_string(std::io::stdin())?
            } else {
                std::fs::read_to_string(&file)
                    .with_context(|| format!("Failed to read {}", file.display()))?
            };

            let report = services.sync.import_json(&text).await?;
            println!("Imported {} servers", report.imported.len());
            for failure in &report.failed {
                println!("  skipped {}: {}", failure.id, failure.reason);
            }
            wait_for_probes(report.probes).await;
        }

        Commands::Export { output } => {
            let json = services.sync.export_json().await?;
            match output {
                Some(path) => {
                    std::fs::write(&path, json)
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    println!("Exported to {}", path.display());
                }
                None => println!("{}", json),
            }
        }

        Commands::Activate { id } => {
            let probe = services.lifecycle.activate(&id).await?;
            print_probe_outcome(&id, probe.wait().await);
        }

        Commands::Deactivate { id } => {
            services.lifecycle.deactivate(&id).await?;
            println!("{} is inactive", id);
        }

        Commands::Remove { id } => {
            let removed = services.lifecycle.remove(&id).await?;
            println!("Removed {} ({})", removed.id, removed.name);
        }

        Commands::Token { action } => match action {
            TokenAction::Set { provider, token } => {
                services.vault.save(provider, token.trim()).await?;
                println!("Saved {} token", provider.display_name());
            }
            TokenAction::Clear { provider } => {
                services.vault.clear(provider).await?;
                println!("Cleared {} token", provider.display_name());
            }
        },
    }

    Ok(())
}

fn user_record(
    name: String,
    url: Option<String>,
    command: Option<String>,
    args: Vec<String>,
    transport: Option<String>,
    headers: Vec<String>,
    env: Vec<String>,
) -> Result<ServerRecord> {
    let (transport, mut endpoint) = match (url, command) {
        (Some(url), None) => {
            let transport = match transport.as_deref() {
                Some(t) => TransportType::parse(t).with_context(|| format!("unknown type: {}", t))?,
                None => TransportType::infer_from_url(&url),
            };
            (transport, Endpoint::remote(url))
        }
        (None, Some(command)) => (TransportType::Stdio, Endpoint::local(command, args)),
        _ => anyhow::bail!("pass exactly one of --url or --command"),
    };

    for header in headers {
        let (name, value) = split_pair(&header, "header")?;
        endpoint = endpoint.with_header(name, value);
    }
    for var in env {
        let (name, value) = split_pair(&var, "env")?;
        endpoint = endpoint.with_env(name, value);
    }

    Ok(ServerRecord::user_created(name, transport, endpoint))
}

fn split_pair<'a>(pair: &'a str, what: &str) -> Result<(&'a str, &'a str)> {
    let (name, value) = pair
        .split_once('=')
        .with_context(|| format!("{} must be NAME=VALUE: {}", what, pair))?;
    Ok((name.trim(), value.trim()))
}

fn print_server(server: &ServerRecord) {
    let target = server
        .endpoint
        .base_url
        .as_deref()
        .or(server.endpoint.command.as_deref())
        .unwrap_or("-");
    println!(
        "{} {:<32} {:<15} {:<28} {}",
        if server.is_active { "●" } else { "○" },
        server.id,
        server.transport_type,
        server.name,
        target
    );
}

fn print_sync_result(result: &SyncResult, dry_run: bool) {
    let prefix = if dry_run { "[dry run] " } else { "" };
    println!("{}{}: {}", prefix, result.provider.display_name(), result.message);

    if let Some(detail) = &result.error_detail {
        println!("  {}", detail);
    }
    if result.token_cleared {
        println!(
            "  token was rejected and removed; get a new one at {}",
            result.provider.info().token_url
        );
    }
    for record in &result.added {
        println!("  + {} {}", record.id, record.name);
    }
    if result.skipped > 0 {
        println!("  ({} upstream entries skipped)", result.skipped);
    }
}

async fn wait_for_probes(probes: Vec<ProbeHandle>) {
    for probe in probes {
        let id = probe.server_id().to_string();
        print_probe_outcome(&id, probe.wait().await);
    }
}

fn print_probe_outcome(id: &str, state: Option<LifecycleState>) {
    match state {
        Some(LifecycleState::Active) => println!("{} is active", id),
        Some(state) => println!("{} is {}", id, state),
        None => println!("{}: probe result discarded", id),
    }
}

/// Surface what the core flagged for the user
fn report_events(events: &mut EventReceiver) {
    for event in events.drain() {
        match event {
            DomainEvent::ServerStatusChanged {
                server_id,
                state: LifecycleState::Inactive,
                notify_user: true,
                detail: Some(detail),
            } => eprintln!("{} unreachable: {}", server_id, detail),
            DomainEvent::ProviderTokenCleared { provider } => {
                eprintln!("{} token cleared", provider.display_name())
            }
            other => tracing::debug!(event = other.type_name(), "[CLI] Event"),
        }
    }
}
