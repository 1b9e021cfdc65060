use std::net::{SocketAddr, ToSocketAddrs};
use std::sync::Arc;
use std::time::Duration;

use axum_server::tls_rustls::RustlsConfig;
use axum_server::Handle;
use portkey_auth::TokenKeys;
use portkey_core::{AlphaGenerator, LinkRepository};
use portkey_server::config::{Backend, Config};
use portkey_server::rpc::ShortenerRpc;
use portkey_server::service::ShortenService;
use portkey_server::state::AppState;
use portkey_server::{app, diag};
use portkey_storage::{FileRepository, MemoryRepository, PostgresRepository};
use tracing::{error, info};

/// Drain deadline for in-flight requests on shutdown.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(15);

const RPC_ADDR: &str = "0.0.0.0:3200";
const DIAG_ADDR: &str = "0.0.0.0:6060";

const TLS_CERT: &str = "./certs/cert.pem";
const TLS_KEY: &str = "./certs/key.pem";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!(
        "Build version: {}",
        option_env!("PORTKEY_BUILD_VERSION").unwrap_or("N/A")
    );
    println!(
        "Build date: {}",
        option_env!("PORTKEY_BUILD_DATE").unwrap_or("N/A")
    );
    println!(
        "Build commit: {}",
        option_env!("PORTKEY_BUILD_COMMIT").unwrap_or("N/A")
    );

    init_logging();
    let config = Config::load();

    let storage: Arc<dyn LinkRepository> = match config.backend() {
        Backend::Database => {
            info!("using database storage");
            Arc::new(PostgresRepository::connect(&config.database_dsn).await?)
        }
        Backend::File => {
            info!(path = %config.file_storage_path, "using file storage");
            Arc::new(FileRepository::open(&config.file_storage_path).await?)
        }
        Backend::Memory => {
            info!("using in-memory storage");
            Arc::new(MemoryRepository::new())
        }
    };

    let trusted_subnet: Option<ipnet::IpNet> = if config.trusted_subnet.is_empty() {
        None
    } else {
        Some(config.trusted_subnet.parse()?)
    };

    let service = ShortenService::new(Arc::clone(&storage), Arc::new(AlphaGenerator::new()));
    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);

    let state = AppState::builder()
        .storage(Arc::clone(&storage))
        .service(service.clone())
        .base_url(config.base_url.clone())
        .keys(Arc::new(TokenKeys::default()))
        .trusted_subnet(trusted_subnet)
        .shutdown(shutdown_rx.clone())
        .build();

    let handle = Handle::new();
    let diag_handle = Handle::new();

    // One signal stops every listener and doubles as the deletion
    // pipeline's done signal.
    {
        let handle = handle.clone();
        let diag_handle = diag_handle.clone();
        tokio::spawn(async move {
            shutdown_signal().await;
            info!("received shutdown signal");
            let _ = shutdown_tx.send(true);
            handle.graceful_shutdown(Some(SHUTDOWN_GRACE));
            diag_handle.graceful_shutdown(Some(SHUTDOWN_GRACE));
        });
    }

    let rpc = ShortenerRpc::new(Arc::clone(&storage), service, config.base_url.clone());
    let rpc_addr: SocketAddr = RPC_ADDR.parse()?;
    let mut rpc_shutdown = shutdown_rx.clone();
    info!(addr = RPC_ADDR, "starting RPC server");
    let rpc_task = tokio::spawn(async move {
        tonic::transport::Server::builder()
            .add_service(rpc.into_server())
            .serve_with_shutdown(rpc_addr, async move {
                let _ = rpc_shutdown.changed().await;
            })
            .await
    });

    let diag_addr: SocketAddr = DIAG_ADDR.parse()?;
    info!(addr = DIAG_ADDR, "starting diagnostics server");
    let diag_task = tokio::spawn(
        axum_server::bind(diag_addr)
            .handle(diag_handle)
            .serve(diag::router().into_make_service()),
    );

    let addr = resolve(&config.server_address)?;
    let router = app::router(state);
    info!(addr = %addr, https = config.enable_https, base_url = %config.base_url, "starting main server");

    if config.enable_https {
        let tls = RustlsConfig::from_pem_file(TLS_CERT, TLS_KEY).await?;
        axum_server::bind_rustls(addr, tls)
            .handle(handle)
            .serve(router.into_make_service())
            .await?;
    } else {
        axum_server::bind(addr)
            .handle(handle)
            .serve(router.into_make_service())
            .await?;
    }

    if let Err(e) = rpc_task.await? {
        error!(error = %e, "RPC server error");
    }
    diag_task.await??;
    info!("server stopped gracefully");
    Ok(())
}

fn resolve(addr: &str) -> std::io::Result<SocketAddr> {
    addr.to_socket_addrs()?.next().ok_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::AddrNotAvailable,
            format!("cannot resolve listen address: {addr}"),
        )
    })
}

fn init_logging() {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "portkey_server=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Resolves on SIGINT, SIGTERM, or SIGQUIT.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };
    #[cfg(unix)]
    let quit = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::quit())
            .expect("failed to install SIGQUIT handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();
    #[cfg(not(unix))]
    let quit = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
        _ = quit => {},
    }
}
