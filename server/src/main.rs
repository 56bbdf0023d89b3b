use std::convert::Infallible;
use std::sync::Arc;

use clap::Parser;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::{TokioIo, TokioTimer};
use tokio::net::TcpListener;

// Error tracing
use anyhow::{Context, Result};
use tracing::{error, info};

use server::auth::{SessionIssuer, TokenCodec};
use server::handlers::routes::{Router, build_admin_router, build_api_router};
use server::handlers::utils::responses::internal_error;
use server::{AppState, database, setup};

/// Blog backend: public read API on one port, admin API on another.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Path to the TOML configuration file
    #[arg(long, default_value = "/etc/blog/config.toml")]
    config: String,

    /// Run first-time interactive database initialization, then exit
    #[arg(long)]
    init: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().init();

    let args = Args::parse();

    let config = shared::config::load_config(&args.config)
        .with_context(|| format!("Error loading config {}", args.config))?;

    let db =
        database::open_database(&config.database.file, config.database.max_connections).await?;

    // Initialization mode: set up the database interactively and exit.
    if args.init {
        setup::initialize_blog(&db).await?;
        return Ok(());
    }

    // The signing secret was validated with the config; it is read exactly
    // once and injected into the issuer — nothing else ever sees it.
    let secret = config
        .auth
        .resolved_jwt_secret()
        .context("No signing secret configured")?;
    let issuer = SessionIssuer::new(TokenCodec::new(&secret), &config.auth);

    let state = AppState {
        db,
        config: Arc::new(config),
        issuer,
    };

    let api_addr = state.config.server.api_addr();
    let admin_addr = state.config.server.admin_addr();

    // One port serves readers, the other carries authentication and writes —
    // the admin port can sit behind a firewall while the read API is public.
    info!(
        "Listening on http://{} and (admin) http://{}",
        api_addr, admin_addr
    );

    let api_serv = serve(api_addr, Arc::new(build_api_router()), state.clone());
    let admin_serv = serve(admin_addr, Arc::new(build_admin_router()), state.clone());

    // Run both servers concurrently
    tokio::try_join!(api_serv, admin_serv)?;
    info!("Both servers closed!");

    Ok(())
}

/// Accept loop for one listener: every connection gets its own task, every
/// request goes through the given router.
async fn serve(addr: String, router: Arc<Router>, state: AppState) -> Result<()> {
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    loop {
        let (stream, _) = match listener.accept().await {
            Ok(conn) => conn,
            Err(e) => {
                error!("Accept failed on {}: {}", addr, e);
                continue;
            }
        };
        let io = TokioIo::new(stream);
        let router = router.clone();
        let state = state.clone();

        tokio::task::spawn(async move {
            let service = service_fn(move |req| {
                let router = router.clone();
                let state = state.clone();
                async move {
                    match router.route(req, state).await {
                        Ok(response) => Ok::<_, Infallible>(response),
                        Err(e) => {
                            // Detail stays in the log; the client gets the
                            // generic 500 body.
                            error!("Handler error: {:#}", e);
                            Ok(internal_error())
                        }
                    }
                }
            });

            if let Err(err) = http1::Builder::new()
                .timer(TokioTimer::new())
                .serve_connection(io, service)
                .await
            {
                error!("Error serving connection: {:?}", err);
            }
        });
    }
}
