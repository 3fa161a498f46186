use chrono::Duration;
use openask::{AppState, app, auth::create_token, backend, config::Config};
use std::time::Duration as StdDuration;
use tokio::{net::TcpListener, signal, time};
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

const LIMITER_PRUNE_INTERVAL: StdDuration = StdDuration::from_secs(60);

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .compact()
        .init();

    if let Err(e) = run().await {
        error!("{}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env()?;
    let backend = backend::connect(&config)?;

    if config.backend == openask::config::BackendMode::Memory {
        let demo_user = Uuid::new_v4();
        let token = create_token(&demo_user, None, &config, Duration::hours(24))
            .map_err(|e| format!("could not mint local session: {e:?}"))?;
        warn!("In-process backend: data is lost on shutdown");
        info!("Local session minted for user {} (token logged at debug level)", demo_user);
        debug!("Local session token: Bearer {}", token);
    }

    let addr = format!("0.0.0.0:{}", config.port);
    let state = AppState::new(backend, config);

    let limiter = state.clone();
    tokio::spawn(async move {
        let mut ticker = time::interval(LIMITER_PRUNE_INTERVAL);
        loop {
            ticker.tick().await;
            limiter.prune_write_limiter();
        }
    });

    let app = app(state);

    // Start server
    let listener = TcpListener::bind(&addr).await?;

    info!("Server running on http://{}", addr);
    info!("API Endpoints:");
    info!("  GET    /health                 - Health check");
    info!("  GET    /posts                  - List posts (search, category, paginated)");
    info!("  POST   /posts                  - Create post (auth)");
    info!("  GET    /posts/:id              - Get specific post");
    info!("  PUT    /posts/:id              - Edit post (auth, owner only)");
    info!("  DELETE /posts/:id              - Delete post (auth, owner only)");
    info!("  POST   /posts/:id/like         - Like post (auth)");
    info!("  POST   /posts/:id/dislike      - Dislike post (auth)");
    info!("  POST   /posts/:id/report       - Report post (auth)");
    info!("  POST   /posts/:id/answers      - Answer post (auth)");
    info!("  POST   /answers/:id/like       - Like answer (auth)");
    info!("  POST   /answers/:id/dislike    - Dislike answer (auth)");
    info!("  POST   /uploads/post-images    - Upload post image (auth)");
    info!("  GET    /interactions           - Your likes/dislikes for posts");
    info!("  GET    /profile                - Your profile, posts and answers (auth)");
    info!("  PUT    /profile                - Update display name (auth)");
    info!("  POST   /profile/avatar         - Upload avatar (auth)");
    info!("  POST   /contact                - Contact form");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
