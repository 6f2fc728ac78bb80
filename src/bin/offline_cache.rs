//! offline-cache — inspect and drive a disk-backed generational response cache
//!
//! Usage:
//!   offline-cache register [--config <file>] [--root <dir>]   Seed, then reap stale generations
//!   offline-cache install [--config <file>] [--root <dir>]    Seed the configured generation only
//!   offline-cache activate [--config <file>] [--root <dir>]   Reap stale generations only
//!   offline-cache get <url> [--config <file>] [--root <dir>]  Serve one request through the cache
//!   offline-cache generations [--root <dir>]                  List generations in creation order
//!   offline-cache entries <generation> [--root <dir>]         List the keys held by a generation

use anyhow::{bail, Context};
use offline_cache::{
    fetch::HttpFetcher, CacheConfig, CacheWorker, DiskStore, GenerationManager, Interceptor,
    ReapReport, Registration, Request, RequestKey, Store,
};
use std::path::PathBuf;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive("info".parse()?),
        )
        .with_target(false)
        .try_init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        print_usage();
        std::process::exit(1);
    }

    let rest = &args[2..];
    match args[1].as_str() {
        "register" => cmd_register(rest).await,
        "install" => cmd_install(rest).await,
        "activate" => cmd_activate(rest).await,
        "get" => cmd_get(rest).await,
        "generations" => cmd_generations(rest).await,
        "entries" => cmd_entries(rest).await,
        "version" | "--version" | "-V" => {
            println!("offline-cache {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        "help" | "--help" | "-h" => {
            print_usage();
            Ok(())
        }
        other => {
            eprintln!("Unknown command: {other}");
            eprintln!();
            print_usage();
            std::process::exit(1);
        }
    }
}

fn print_usage() {
    println!(
        r#"offline-cache — generational HTTP response cache

USAGE:
    offline-cache <COMMAND> [OPTIONS]

COMMANDS:
    register                    Seed the configured generation, then reap stale ones
    install                     Seed the configured generation only
    activate                    Reap stale generations only
    get <url>                   Serve one GET request through the cache
    generations                 List generations in creation order
    entries <generation>        List the keys held by a generation
    version                     Show version information
    help                        Show this help message

OPTIONS:
    --config <file>             YAML config (generation, prefix, seed, fallback, origin)
    --root <dir>                Store directory

ENVIRONMENT:
    OFFLINE_CACHE_ROOT          Store directory when --root is absent
    OFFLINE_CACHE_GENERATION    Overrides the configured generation
    OFFLINE_CACHE_ORIGIN        Overrides the configured origin
    RUST_LOG                    Log filter (default: info)"#
    );
}

fn flag(args: &[String], name: &str) -> Option<String> {
    args.iter()
        .position(|a| a == name)
        .and_then(|i| args.get(i + 1))
        .cloned()
}

/// First argument that is neither a flag nor a flag's value.
fn positional(args: &[String]) -> Option<&str> {
    let mut skip = false;
    for arg in args {
        if skip {
            skip = false;
            continue;
        }
        if arg.starts_with("--") {
            skip = true;
            continue;
        }
        return Some(arg.as_str());
    }
    None
}

async fn open_store(args: &[String]) -> anyhow::Result<Arc<DiskStore>> {
    let root = flag(args, "--root")
        .or_else(|| std::env::var("OFFLINE_CACHE_ROOT").ok())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(".offline-cache"));
    let store = DiskStore::open_root(&root)
        .await
        .with_context(|| format!("opening store at {}", root.display()))?;
    Ok(Arc::new(store))
}

async fn load_config(args: &[String]) -> anyhow::Result<CacheConfig> {
    let config = match flag(args, "--config") {
        Some(path) => CacheConfig::from_yaml_file(&path)
            .await
            .with_context(|| format!("loading config {path}"))?,
        None => CacheConfig::default(),
    };
    let config = config.apply_env_overrides();
    config.validate()?;
    Ok(config)
}

fn print_report(report: &ReapReport) {
    for g in &report.deleted {
        println!("deleted   {g}");
    }
    for g in &report.retained {
        println!("retained  {g}");
    }
    for (g, err) in &report.failed {
        println!("failed    {g}: {err}");
    }
}

async fn cmd_register(args: &[String]) -> anyhow::Result<()> {
    let config = load_config(args).await?;
    let store = open_store(args).await?;
    let worker = CacheWorker::builder().config(config).store(store).build()?;
    let registration = Registration::new();
    let report = registration.register(worker).await?;
    print_report(&report);
    Ok(())
}

async fn cmd_install(args: &[String]) -> anyhow::Result<()> {
    let config = load_config(args).await?;
    let store = open_store(args).await?;
    let worker = CacheWorker::builder().config(config).store(store).build()?;
    worker.on_install().await?;
    println!("installed {}", worker.generation());
    Ok(())
}

async fn cmd_activate(args: &[String]) -> anyhow::Result<()> {
    let config = load_config(args).await?;
    let store = open_store(args).await?;
    let manager = GenerationManager::reaper(&config, store);
    let report = manager.reap(&config.generation).await?;
    print_report(&report);
    Ok(())
}

async fn cmd_get(args: &[String]) -> anyhow::Result<()> {
    let Some(url) = positional(args) else {
        bail!("usage: offline-cache get <url>");
    };
    let config = load_config(args).await?;
    let store = open_store(args).await?;
    let fetcher = Arc::new(HttpFetcher::new(&config)?);
    let interceptor = Interceptor::new(&config, store, fetcher);

    let (resp, outcome) = interceptor.handle_with_outcome(&Request::get(url)).await;
    eprintln!("{} {} [{}]", resp.status, url, outcome);
    println!("{}", resp.text());
    Ok(())
}

async fn cmd_generations(args: &[String]) -> anyhow::Result<()> {
    let store = open_store(args).await?;
    for generation in store.list().await? {
        let count = store.keys(&generation).await?.len();
        println!("{generation}\t{count} entries");
    }
    Ok(())
}

async fn cmd_entries(args: &[String]) -> anyhow::Result<()> {
    let Some(generation) = positional(args) else {
        bail!("usage: offline-cache entries <generation>");
    };
    let store = open_store(args).await?;
    if !store.contains(generation).await? {
        bail!("no generation named '{generation}'");
    }
    for key in store.keys(generation).await? {
        let RequestKey { method, url } = key;
        println!("{method} {url}");
    }
    Ok(())
}
