use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::event::{self, Event, KeyEventKind};

use teahouse::api::{IdentityProvider, MemoryBackend, SharedBackend, SupabaseClient};
use teahouse::app::App;
use teahouse::config::{BackendConfig, ConfigManager};
use teahouse::{log_debug, log_key_event, logging, terminal, ui};

/// Teahouse - a keyboard-driven terminal client for a shared photo feed
#[derive(Parser)]
#[command(name = "teahouse")]
#[command(about = "Share moments, like, comment and follow the conversation from your terminal")]
#[command(version)]
struct Cli {
    /// Base URL of the hosted backend
    #[arg(long, short, env = "TEAHOUSE_BACKEND_URL")]
    backend_url: Option<String>,

    /// Public anonymous key for the hosted backend
    #[arg(long, short, env = "TEAHOUSE_ANON_KEY")]
    anon_key: Option<String>,

    /// Run against built-in sample data (sign in with any listed email, code 123456)
    #[arg(long)]
    demo: bool,

    /// Enable verbose logging
    #[arg(long, short)]
    verbose: bool,
}

// Load environment variables from a .env file so the backend settings can
// live next to the project instead of the shell profile
fn load_env() {
    let _ = dotenv::dotenv();
}

fn build_backend(cli: &Cli, config_manager: Option<&ConfigManager>) -> Option<SharedBackend> {
    if cli.demo {
        log::info!("Running against the in-memory demo backend");
        return Some(Arc::new(MemoryBackend::demo()));
    }

    let config = BackendConfig::resolve(cli.backend_url.clone(), cli.anon_key.clone())?;
    log::info!("Using backend at {}", config.url);
    let mut client = SupabaseClient::new(&config);
    if let Some(manager) = config_manager {
        client = client.with_session_store(manager.session_store());
    }
    Some(Arc::new(client))
}

#[tokio::main]
async fn main() -> Result<()> {
    // .env first so clap's env fallbacks can see it
    load_env();
    let cli = Cli::parse();

    let log_config = if cli.verbose {
        logging::LogConfig::verbose()
    } else {
        logging::LogConfig::default()
    };
    logging::init_logging(&log_config).context("Failed to initialize logging")?;

    let config_manager = match ConfigManager::new() {
        Ok(manager) => Some(manager),
        Err(e) => {
            log::warn!("Config directory unavailable, preferences will not persist: {}", e);
            None
        }
    };

    let backend = build_backend(&cli, config_manager.as_ref());
    if backend.is_none() {
        log::warn!("Backend URL or anon key missing");
    }

    let initial_user = match &backend {
        Some(backend) => match backend.restore_session().await {
            Ok(user) => user,
            Err(e) => {
                log::warn!("Could not restore previous session: {}", e);
                backend.current_user()
            }
        },
        None => None,
    };

    // Subscribed after restoring, so the restore itself is not replayed
    let mut identity_rx = backend.as_ref().map(|b| b.subscribe());
    let (mut app, mut events) = App::new(backend, config_manager);
    app.log_config = log_config;
    if app.repo.is_some() {
        app.on_identity_change(initial_user).await;
    }

    let mut tui = terminal::init()?;

    while app.running {
        // Identity changes: sign-in, sign-out, expired refresh
        if let Some(rx) = identity_rx.as_mut() {
            if rx.has_changed().unwrap_or(false) {
                let user = rx.borrow_and_update().clone();
                log_debug!(app.log_config, "Identity changed: {:?}", user.as_ref().map(|u| u.id));
                app.on_identity_change(user).await;
            }
        }

        // Results from background comment-count and search tasks
        while let Ok(ev) = events.try_recv() {
            app.handle_event(ev);
        }

        // Clear expired messages (auto-clear after 3 seconds)
        app.clear_expired_messages();

        tui.draw(|frame| ui::render(&mut app, frame))?;

        // Refresh requested with 'r': reload after the loading state is drawn
        if app.pending_load {
            app.pending_load = false;
            app.reload().await;
        }

        if event::poll(Duration::from_millis(100))? {
            let event = event::read()?;

            // Keyboard-only navigation
            if matches!(event, Event::Mouse(_)) {
                continue;
            }

            if let Event::Key(key) = event {
                if key.kind == KeyEventKind::Press {
                    log_key_event!(
                        app.log_config,
                        "{:?} {:?} on {:?}",
                        key.modifiers,
                        key.code,
                        app.screen()
                    );
                    if let Some(action) = app.handle_key_event(key)? {
                        app.perform(action).await?;
                    }
                }
            }
        }
    }

    terminal::restore()?;

    Ok(())
}
