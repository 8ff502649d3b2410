// Scoutboard entry point.
//
// Startup sequence:
// 1. Load config (copying defaults on first run)
// 2. Initialize tracing (log to file, not terminal)
// 3. Build the API backend: HTTP, or the in-memory demo backend when offline
// 4. Create mpsc channels and the application state
// 5. Spawn the app event loop and the update printer
// 6. Read console commands until `quit` or EOF
// 7. Cleanup on exit

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::sync::mpsc;
use tracing::{error, info};

use scoutboard_app::app;
use scoutboard_app::console;
use scoutboard_app::http::HttpApi;
use scoutboard_core::api::PipelineApi;
use scoutboard_core::config;
use scoutboard_core::memory::MemoryApi;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // 1. Load config
    let config = config::load_config().context("failed to load configuration")?;

    // 2. Initialize tracing
    init_tracing(&config.logging.filter)?;
    info!("Scoutboard starting up");

    // 3. API backend
    let api: Arc<dyn PipelineApi> = if config.api.offline {
        info!("Offline mode: using the in-memory demo backend");
        Arc::new(MemoryApi::with_demo_data())
    } else {
        let client = HttpApi::from_config(&config).context("failed to build HTTP client")?;
        info!(
            base_url = %config.api.base_url,
            authenticated = config.credentials.bearer_token.is_some(),
            "HTTP client initialized"
        );
        Arc::new(client)
    };

    // 4. Channels and state
    let (cmd_tx, cmd_rx) = mpsc::channel(64);
    let (event_tx, event_rx) = mpsc::channel(64);
    let (ui_tx, ui_rx) = mpsc::channel(256);
    let app_state = app::AppState::new(api, &config.search, event_tx);

    // 5. Event loop and printer
    let app_handle = tokio::spawn(async move {
        if let Err(e) = app::run(cmd_rx, event_rx, ui_tx, app_state).await {
            error!("Application loop error: {}", e);
        }
    });
    let printer_handle = tokio::spawn(console::print_updates(ui_rx));

    // 6. Console input (returns on `quit` or EOF)
    println!("{}\n", console::HELP);
    if let Err(e) = console::read_commands(cmd_tx).await {
        error!("Console input error: {}", e);
    }

    // 7. Cleanup: the printer ends once the event loop drops its sender
    let _ = tokio::time::timeout(Duration::from_secs(5), async {
        let _ = app_handle.await;
        let _ = printer_handle.await;
    })
    .await;

    info!("Scoutboard shut down cleanly");
    Ok(())
}

/// Initialize tracing to log to a file so the console stays readable.
///
/// `RUST_LOG` takes precedence over the configured filter.
fn init_tracing(filter: &str) -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let log_dir = config::default_log_dir().context("failed to resolve log directory")?;
    std::fs::create_dir_all(&log_dir)
        .with_context(|| format!("failed to create log directory {}", log_dir.display()))?;

    let log_file = std::fs::File::create(log_dir.join("scoutboard.log"))?;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(log_file)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
