//! Banshee remote: entry point.
//!
//! ```text
//! banshee-remote status                 Show the player status
//! banshee-remote --host 10.0.0.5 next   Skip on another server
//! banshee-remote sync                   Refresh the cached library
//! banshee-remote sync --recompress      Rebuild the server copy, then refresh
//! banshee-remote gen-config             Dump default config and exit
//! ```

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::sync::mpsc;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use banshee_core::{
    Command, CommandEvent, Connection, CoverStore, DiskCache, Enqueued, LibraryCache, Reply,
    ServerStore, Session, SessionNotice, TcpTransport, check_server,
};

use banshee_remote::cli::{Action, Cli};
use banshee_remote::config::ClientConfig;
use banshee_remote::{output, servers};

type AppResult = Result<(), Box<dyn std::error::Error>>;

const EVENT_SLACK: Duration = Duration::from_secs(1);

// ── Main ─────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> AppResult {
    let cli = Cli::parse();

    if cli.command == Action::GenConfig {
        println!("{}", ClientConfig::default_toml()?);
        return Ok(());
    }

    let mut config = ClientConfig::load(&cli.config);
    if let Some(host) = cli.host {
        config.server.host = host;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if let Some(password_id) = cli.password_id {
        config.server.password_id = password_id;
    }

    // Init tracing.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    info!("banshee-remote v{}", env!("CARGO_PKG_VERSION"));

    match &cli.command {
        Action::Check => run_check(&config, cli.json).await,
        Action::Sync { .. } | Action::Cover { .. } => {
            run_session(&config, &cli.command, cli.json).await
        }
        action => run_command(&config, action, cli.json).await,
    }
}

// ── Actions ──────────────────────────────────────────────────────

async fn run_check(config: &ClientConfig, json: bool) -> AppResult {
    let endpoint = config.to_server().endpoint();
    let status = check_server(&TcpTransport::new(), &endpoint, config.check_timeout()).await;
    println!("{}", output::render_check(status, json)?);
    if !status.is_accepted() {
        return Err(format!("check failed for {endpoint}").into());
    }
    Ok(())
}

/// Send one command and print its decoded reply.
async fn run_command(config: &ClientConfig, action: &Action, json: bool) -> AppResult {
    let (command, params) = action
        .to_request()
        .ok_or("action does not map to a single command")?;
    let conn_config = config.to_connection_config();
    let (tx, mut rx) = mpsc::channel(4);
    let conn = Connection::open(config.to_server().endpoint(), conn_config, Some(tx));

    let enqueued = conn.send_command(command, params);
    debug!(?command, ?enqueued, "sent");

    let event = next_event(&mut rx, event_wait(command, config)).await;
    conn.close();

    match event? {
        CommandEvent::Handled {
            command,
            params,
            response,
        } => {
            let reply = Reply::decode(command, params.as_deref(), &response)?;
            println!("{}", output::render(&reply, json)?);
            Ok(())
        }
        CommandEvent::ConnectionLost => Err(format!("no reply from {}", conn.endpoint()).into()),
    }
}

/// Library sync and cover fetches go through a `Session` so replies
/// land in the cache directory.
async fn run_session(config: &ClientConfig, action: &Action, json: bool) -> AppResult {
    let servers_path = config.servers_path();
    let mut store = servers::load(&servers_path);
    let id = servers::ensure(&mut store, &config.to_server())?;

    let cache = Arc::new(DiskCache::new(&config.storage.cache_dir));
    let mut session = Session::new(
        config.to_connection_config(),
        Box::new(store.clone()),
        Arc::clone(&cache) as Arc<dyn LibraryCache>,
        cache as Arc<dyn CoverStore>,
    );

    let (tx, mut rx) = mpsc::channel(8);
    session.connect(id, Some(tx))?;
    store.set_default(id)?;

    let command = match action {
        Action::Cover { art_id } => {
            if session.request_cover(art_id)? == Enqueued::Dismissed {
                println!("cover {art_id:?} not requested: cached or empty id");
                session.disconnect();
                return Ok(());
            }
            Command::Cover
        }
        Action::Sync { recompress: true } => {
            session.request_recompress()?;
            Command::SyncDatabase
        }
        _ => {
            session.request_sync()?;
            Command::SyncDatabase
        }
    };

    let wait = event_wait(command, config);
    let result = loop {
        let event = match next_event(&mut rx, wait).await {
            Ok(event) => event,
            Err(e) => break Err(e),
        };
        match session.handle_event(&event)? {
            Some(
                notice @ (SessionNotice::DatabaseRequested { .. }
                | SessionNotice::DatabaseRecompressed),
            ) => {
                println!("{}", output::render_notice(&notice, json)?);
            }
            Some(SessionNotice::ConnectionLost) => break Err("connection lost".into()),
            Some(notice) => {
                println!("{}", output::render_notice(&notice, json)?);
                break Ok(());
            }
            None => {
                if let CommandEvent::Handled {
                    command,
                    params,
                    response,
                } = &event
                {
                    let reply = Reply::decode(*command, params.as_deref(), response)?;
                    println!("{}", output::render(&reply, json)?);
                }
                break Ok(());
            }
        }
    };

    if let Some(timestamp) = session.server().and_then(|s| s.db_timestamp) {
        store.set_db_timestamp(id, timestamp)?;
    }
    session.disconnect();
    servers::save(&servers_path, &store)?;
    result
}

// ── Helpers ──────────────────────────────────────────────────────

/// Long enough for every retry the dispatcher makes before giving up.
fn event_wait(command: Command, config: &ClientConfig) -> Duration {
    let attempts = config.connection.max_failures.max(1);
    command.timeout(config.network.link) * attempts + EVENT_SLACK
}

async fn next_event(
    rx: &mut mpsc::Receiver<CommandEvent>,
    wait: Duration,
) -> Result<CommandEvent, Box<dyn std::error::Error>> {
    match tokio::time::timeout(wait, rx.recv()).await {
        Ok(Some(event)) => Ok(event),
        Ok(None) => Err("connection closed".into()),
        Err(_) => Err(format!("no reply within {}ms", wait.as_millis()).into()),
    }
}
