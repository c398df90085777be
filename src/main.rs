use anyhow::Result;
use clap::Parser;
use std::io::{IsTerminal, Write};
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use tracert_as::cli::Args;
use tracert_as::config::Config;
use tracert_as::error::TraceError;
use tracert_as::export::{export_json_line, write_header, write_hop, write_registry};
use tracert_as::lookup::RegistryResolver;
use tracert_as::probe::permission_hint;
use tracert_as::trace::{PathDiscovery, spawn_discovery};

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        return ExitCode::FAILURE;
    }

    init_logging(args.verbose);

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if let Some(TraceError::PermissionDenied(_)) = e.downcast_ref::<TraceError>() {
                eprintln!("{}", permission_hint());
            } else {
                eprintln!("Error: {:#}", e);
            }
            ExitCode::FAILURE
        }
    }
}

fn default_log_level(verbose: bool) -> &'static str {
    if verbose { "debug" } else { "info" }
}

/// Logs go to stderr; RUST_LOG overrides the default level
fn init_logging(verbose: bool) {
    let default = default_log_level(verbose);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(args: Args) -> Result<()> {
    let config = Config::from(&args);

    // Fails fast on an unresolvable host or missing raw socket permission
    let discovery = PathDiscovery::new(&args.host, &config)?;
    let dest = discovery.destination();

    let registry = config
        .whois_enabled
        .then(|| RegistryResolver::new(config.registry.clone()));

    // Cancellation token for graceful shutdown
    let cancel = CancellationToken::new();
    let cancel_clone = cancel.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        cancel_clone.cancel();
    });

    let color = !args.json && std::io::stdout().is_terminal();
    let mut stdout = std::io::stdout();

    if !args.json {
        write_header(&mut stdout, &args.host, dest, config.max_hops)?;
    }

    let mut hops = spawn_discovery(discovery, cancel.clone());
    loop {
        let hop = tokio::select! {
            _ = cancel.cancelled() => break,
            hop = hops.recv() => match hop {
                Some(hop) => hop,
                None => break,
            },
        };

        if !args.json {
            write_hop(&mut stdout, &hop, color)?;
            stdout.flush()?;
        }

        let info = match (&registry, hop.addr) {
            (Some(registry), Some(addr)) => Some(registry.resolve(addr.into()).await),
            _ => None,
        };

        if args.json {
            export_json_line(&mut stdout, &hop, info.as_ref())?;
        } else if let Some(ref info) = info {
            write_registry(&mut stdout, info, color)?;
        }
        stdout.flush()?;
    }

    Ok(())
}
