use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use clap::Parser;
use crossterm::{
    event::{self, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use rspotify::{clients::OAuthClient, AuthCodeSpotify, Config, Token};
use tokio::sync::Mutex;

use playlist_muse::audio::CpalOutput;
use playlist_muse::auth;
use playlist_muse::config::AppConfig;
use playlist_muse::controller::AppController;
use playlist_muse::gateway::{RecommendationService, SpotifyGateway};
use playlist_muse::logging;
use playlist_muse::model::AppModel;
use playlist_muse::view::AppView;

const TOKEN_CHECK_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::parse();

    if let Err(e) = logging::init_logging(&config.log_dir) {
        eprintln!("Warning: Failed to initialize logging: {}", e);
    }

    let config = config.validate()?;
    tracing::info!(api_url = %config.api_url, page_size = config.page_size, "=== Playlist Muse Starting ===");

    // Step 1: Get credentials
    let auth_result = auth::perform_oauth_flow().await?;

    // Step 2: Authenticate with rspotify
    let rspotify_client = setup_rspotify(auth_result.rspotify_token.clone()).await?;

    match rspotify_client.me().await {
        Ok(user) => tracing::info!(user_id = %user.id, "rspotify authorized successfully"),
        Err(e) => {
            tracing::error!(error = %e, "rspotify authentication failed");
            return Err(anyhow::anyhow!("rspotify init failed"));
        }
    }

    let recommendations = RecommendationService::new(config.api_url.clone(), config.session_cookie.clone());
    let gateway = SpotifyGateway::new(
        rspotify_client,
        recommendations,
        auth_result.refresh_token.clone(),
        Some(auth_result.expires_at),
    );

    let (app_model, player_events) = AppModel::new(
        Arc::new(gateway.clone()),
        Arc::new(CpalOutput::new()),
        &config,
    );
    let model = Arc::new(Mutex::new(app_model));
    let controller = AppController::new(model.clone());
    controller.start_player_event_listener(player_events);

    tracing::info!("Starting TUI...");

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let controller_for_init = controller.clone();
    tokio::spawn(async move {
        controller_for_init.load_user_playlists().await;
    });

    let res = run_app(&mut terminal, model.clone(), controller, gateway).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    model.lock().await.player.lock().await.release_resource();

    if let Err(err) = res {
        tracing::error!(error = ?err, "Application error");
    }

    tracing::info!("Playlist Muse shutting down");
    Ok(())
}

async fn setup_rspotify(access_token: Token) -> Result<AuthCodeSpotify> {
    let spotify = AuthCodeSpotify::with_config(
        Default::default(),
        Default::default(),
        Config {
            token_cached: false,
            token_refreshing: false,
            ..Default::default()
        },
    );

    tracing::debug!("rspotify client initialized");

    *spotify
        .token
        .lock()
        .await
        .map_err(|_| anyhow::anyhow!("Spotify token lock unavailable"))? = Some(access_token);
    tracing::debug!("rspotify token set");
    Ok(spotify)
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    model: Arc<Mutex<AppModel>>,
    controller: AppController,
    gateway: SpotifyGateway,
) -> io::Result<()> {
    let mut last_token_check = Instant::now();

    loop {
        // Periodically check and refresh token if needed
        if last_token_check.elapsed() >= TOKEN_CHECK_INTERVAL {
            last_token_check = Instant::now();
            let gateway = gateway.clone();
            tokio::spawn(async move {
                if let Err(e) = gateway.refresh_token_if_needed().await {
                    tracing::warn!("Token refresh check failed: {}", e);
                }
            });
        }

        // Get current state
        let (ui_state, playlists, recommendations, top_tracks, player, should_quit) = {
            let model_guard = model.lock().await;

            // Errors and notices clear themselves after a few seconds
            model_guard.auto_clear_old_messages().await;

            (
                model_guard.get_ui_state().await,
                model_guard.playlists.snapshot(),
                model_guard.recommendations.snapshot(),
                model_guard.top_tracks.snapshot(),
                model_guard.player.clone(),
                model_guard.should_quit().await,
            )
        };
        let playback = player.lock().await.snapshot();

        terminal.draw(|f| {
            AppView::render(f, &playback, &ui_state, &playlists, &recommendations, &top_tracks);
        })?;

        // Handle input with shorter poll time for smoother UI updates
        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                if let Err(e) = controller.handle_key_event(key).await {
                    tracing::warn!(error = %e, "Key handling failed");
                }
            }
        }

        if should_quit {
            break;
        }
    }

    Ok(())
}
