pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod domain;
pub mod entities;
pub mod ingest;

use tokio::signal;

pub use config::Config;
use db::Store;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

pub async fn run() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = Config::load()?;
    config.validate()?;

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.general.log_level));

    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_help();
        return Ok(());
    }

    match args[1].as_str() {
        "serve" | "-d" | "--serve" => run_server(config).await,

        "init" | "--init" => {
            Config::create_default_if_missing()?;
            println!("✓ Config file created. Edit config.toml and run again.");
            Ok(())
        }

        "user" => {
            if args.len() < 3 {
                println!("Usage: callarr user <subcommand>");
                println!("Subcommands: add, passwd, list, enable, disable");
                return Ok(());
            }
            match args[2].as_str() {
                "add" => {
                    if args.len() < 5 {
                        println!("Usage: callarr user add <username> <password>");
                        return Ok(());
                    }
                    cmd_user_add(&config, &args[3], &args[4]).await
                }
                "passwd" => {
                    if args.len() < 5 {
                        println!("Usage: callarr user passwd <username> <new-password>");
                        return Ok(());
                    }
                    cmd_user_passwd(&config, &args[3], &args[4]).await
                }
                "list" | "ls" => cmd_user_list(&config).await,
                "enable" | "disable" => {
                    if args.len() < 4 {
                        println!("Usage: callarr user {} <username>", args[2]);
                        return Ok(());
                    }
                    cmd_user_set_enabled(&config, &args[3], args[2] == "enable").await
                }
                _ => {
                    println!("Unknown user subcommand: {}", args[2]);
                    println!("Use: add, passwd, list, enable, disable");
                    Ok(())
                }
            }
        }

        "help" | "-h" | "--help" => {
            print_help();
            Ok(())
        }

        _ => {
            println!("Unknown command: {}", args[1]);
            println!();
            print_help();
            Ok(())
        }
    }
}

fn print_help() {
    println!("Callarr - Call Record Management Backend");
    println!("Ingests PBX call detail records and serves them over an authenticated API");
    println!();
    println!("USAGE:");
    println!("  callarr <COMMAND> [OPTIONS]");
    println!();
    println!("COMMANDS:");
    println!("  serve             Run the HTTP API server");
    println!("  init              Create default config file");
    println!("  user add <name> <password>");
    println!("                    Create an operator account");
    println!("  user passwd <name> <new-password>");
    println!("                    Change an account password");
    println!("  user list         List accounts");
    println!("  user enable <name> / user disable <name>");
    println!("                    Toggle whether an account may log in");
    println!("  help              Show this help message");
    println!();
    println!("CONFIG:");
    println!("  Edit config.toml to configure the database, server port, etc.");
}

async fn run_server(config: Config) -> anyhow::Result<()> {
    info!(
        "Callarr v{} starting...",
        env!("CARGO_PKG_VERSION")
    );

    let port = config.server.port;
    let state = api::create_app_state_from_config(config).await?;
    let app = api::router(state);

    let addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    let server_handle = tokio::spawn(async move {
        info!("Web API running at http://0.0.0.0:{port}");
        if let Err(e) = axum::serve(listener, app).await {
            error!("Web server error: {}", e);
        }
    });

    info!("Server running. Press Ctrl+C to stop.");

    match signal::ctrl_c().await {
        Ok(()) => {
            info!("Shutdown signal received");
        }
        Err(e) => {
            error!("Error listening for shutdown: {}", e);
        }
    }

    server_handle.abort();
    info!("Server stopped");

    Ok(())
}

async fn open_store(config: &Config) -> anyhow::Result<Store> {
    Store::with_pool_options(
        &config.general.database_path,
        config.general.max_db_connections,
        config.general.min_db_connections,
    )
    .await
}

async fn cmd_user_add(config: &Config, username: &str, password: &str) -> anyhow::Result<()> {
    let store = open_store(config).await?;

    if store.get_user_by_username(username).await?.is_some() {
        println!("User '{username}' already exists");
        return Ok(());
    }

    let user = store
        .create_user(username, password, Some(&config.security))
        .await?;
    println!("✓ Created user '{}' (id {})", user.username, user.id);
    Ok(())
}

async fn cmd_user_passwd(config: &Config, username: &str, password: &str) -> anyhow::Result<()> {
    let store = open_store(config).await?;
    store
        .update_user_password(username, password, Some(&config.security))
        .await?;
    println!("✓ Password updated for '{username}'");
    Ok(())
}

async fn cmd_user_list(config: &Config) -> anyhow::Result<()> {
    let store = open_store(config).await?;
    let users = store.list_users().await?;

    if users.is_empty() {
        println!("No users");
        return Ok(());
    }

    println!("{:<6} {:<24} {:<8}", "ID", "USERNAME", "ENABLED");
    println!("{:-<40}", "");
    for user in users {
        println!("{:<6} {:<24} {:<8}", user.id, user.username, user.enabled);
    }
    Ok(())
}

async fn cmd_user_set_enabled(
    config: &Config,
    username: &str,
    enabled: bool,
) -> anyhow::Result<()> {
    let store = open_store(config).await?;
    store.set_user_enabled(username, enabled).await?;
    println!(
        "✓ User '{username}' {}",
        if enabled { "enabled" } else { "disabled" }
    );
    Ok(())
}
