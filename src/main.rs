//! OnBoard - live driver status.
//!
//! `serve` runs the status API; `view` and `drive` are polling clients
//! against it; `provision` seeds the tracked record.

mod cli;

use cli::{Command, DriverInput, DRIVER_HELP, USAGE};
use onboard::client::HttpStatusClient;
use onboard::config::Config;
use onboard::database::Database;
use onboard::poller::{Mode, Poller, PollerConfig, PollerError, TerminalRenderer};
use onboard::service::{DriverCredential, StatusService};
use onboard::store::{Status, StatusStore};
use std::io::BufRead;
use std::sync::Arc;
use tokio::sync::{mpsc, Notify};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("onboard=info")),
        )
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = match Command::parse(&args) {
        Ok(command) => command,
        Err(e) => {
            eprintln!("onboard: {e}\n\n{USAGE}");
            std::process::exit(2);
        }
    };

    let config = Config::from_env()?;

    match command {
        Command::Serve => serve(config).await,
        Command::Provision(status) => provision(&config, status),
        Command::View => view(config).await,
        Command::Drive => drive(config).await,
    }
}

/// Installs the Ctrl+C handler; the returned notifier fires once on signal.
fn shutdown_signal() -> Result<Arc<Notify>, ctrlc::Error> {
    let notify = Arc::new(Notify::new());
    let handler_notify = Arc::clone(&notify);
    ctrlc::set_handler(move || {
        println!("\n🛑 Shutdown signal received...");
        handler_notify.notify_one();
    })?;
    Ok(notify)
}

async fn serve(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    println!("🔧 Opening status store...");
    let db = Database::open(&config.db_path)?;
    if db.fetch(&config.record_id)?.is_none() {
        tracing::warn!(
            id = %config.record_id,
            "Tracked record is not provisioned; run `onboard provision` first"
        );
    }
    println!("   ✓ Store ready at {}", config.db_path.display());

    let mut service = StatusService::new(Arc::new(db));
    if let Some(token) = config.driver_token.as_deref() {
        service = service.with_credential(DriverCredential::new(token));
    }

    let notify = shutdown_signal()?;
    println!("🌐 API available at http://{}", config.bind_addr);
    println!("   • POST /api/get-status     - Current status");
    println!("   • POST /api/update-status  - Publish a status");
    println!("   • GET  /api/labels         - Status label set");

    onboard::server::run_server(config.bind_addr, service, async move {
        notify.notified().await;
    })
    .await?;

    println!("👋 Server stopped.");
    Ok(())
}

fn provision(config: &Config, status: Status) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open(&config.db_path)?;
    let record = db.provision(&config.record_id, status)?;
    println!(
        "✓ Record `{}` set to {} ({})",
        record.id,
        record.status.code(),
        record.status.label()
    );
    Ok(())
}

fn build_poller(config: &Config) -> Result<Poller<HttpStatusClient>, Box<dyn std::error::Error>> {
    let client = HttpStatusClient::new(config.server_url.clone())?;
    let poller_config = PollerConfig {
        poll_interval: config.poll_interval,
        record_id: config.record_id.clone(),
    };
    Ok(Poller::new(
        Arc::new(client),
        poller_config,
        Arc::new(TerminalRenderer),
    ))
}

async fn view(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let notify = shutdown_signal()?;
    let mut poller = build_poller(&config)?;

    println!("👀 Following {} (Ctrl+C to quit)", config.server_url);
    poller.enter_viewer();
    notify.notified().await;
    poller.stop();

    Ok(())
}

async fn drive(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let notify = shutdown_signal()?;
    let mut poller = build_poller(&config)?;
    let mut lines = spawn_stdin_reader();

    println!("{DRIVER_HELP}");
    poller.enter_driver();

    loop {
        let line = tokio::select! {
            _ = notify.notified() => break,
            line = lines.recv() => line,
        };
        let Some(line) = line else {
            break;
        };

        match DriverInput::parse(&line) {
            DriverInput::Unlock(code) => {
                // Rejections and transport errors are alerted by the poller.
                let _ = poller.unlock(&code).await;
            }
            DriverInput::Select(status) => match poller.select_status(status).await {
                Ok(()) | Err(PollerError::Client(_)) => {}
                Err(e) => eprintln!("⚠ {e}"),
            },
            DriverInput::Labels => {
                for status in Status::all() {
                    println!("  {} - {}", status.code(), status.label());
                }
            }
            DriverInput::Back => {
                poller.back();
                if poller.mode() == Mode::Unset {
                    break;
                }
            }
            DriverInput::Quit => break,
            DriverInput::Help => println!("{DRIVER_HELP}"),
            DriverInput::Invalid(message) => eprintln!("⚠ {message}"),
        }
    }

    poller.stop();
    Ok(())
}

/// Reads stdin lines on a dedicated thread so a blocked read never holds
/// up runtime shutdown.
fn spawn_stdin_reader() -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else {
                break;
            };
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}
