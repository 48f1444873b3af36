//! Application struct that encapsulates server assembly and serving logic.

use crate::cli::RunArgs;
use arc_swap::ArcSwap;
use model_gateway_core::config::{Config, ConfigWatcher};
use model_gateway_core::entitlements::ConfiguredEntitlements;
use model_gateway_core::lifecycle::signal::SignalHandler;
use model_gateway_core::lifecycle::{self, Lifecycle, LifecycleEvent};
use model_gateway_core::metrics::Metrics;
use model_gateway_server::forward::Forwarder;
use std::path::Path;
use std::sync::Arc;

/// Load the config file and apply CLI overrides. A missing file means
/// defaults; a present but invalid file is an error.
pub fn load_config(args: &RunArgs) -> anyhow::Result<Config> {
    let mut config = if Path::new(&args.config).exists() {
        Config::load(&args.config)
            .map_err(|e| anyhow::anyhow!("invalid config '{}': {e}", args.config))?
    } else {
        // Logging is not up yet.
        eprintln!("Config file '{}' not found, using defaults", args.config);
        Config::default()
    };

    if let Some(ref host) = args.host {
        config.host = host.clone();
    }
    if let Some(port) = args.port {
        config.port = port;
    }
    Ok(config)
}

pub struct Application {
    config: Arc<ArcSwap<Config>>,
    app_router: axum::Router,
    admin_router: axum::Router,
    config_path: String,
    entitlements: Arc<ConfiguredEntitlements>,
    forwarder: Arc<Forwarder>,
    lifecycle: Arc<dyn Lifecycle>,
}

impl Application {
    /// Assemble entitlements, the backend forwarder, metrics and the router.
    pub fn build(config: Config, args: &RunArgs) -> anyhow::Result<Self> {
        let entitlements = Arc::new(ConfiguredEntitlements::new(&config.entitlements)?);
        let forwarder = Arc::new(Forwarder::from_config(&config)?);

        tracing::info!(
            mode = ?entitlements.mode(),
            keys = config.entitlements.keys.len(),
            server_name = %config.server_name,
            "Gateway configured"
        );

        let config = Arc::new(ArcSwap::from_pointee(config));
        let state = model_gateway_server::AppState {
            config: config.clone(),
            entitlements: entitlements.clone(),
            forwarder: forwarder.clone(),
            metrics: Arc::new(Metrics::new()),
        };
        let app_router = model_gateway_server::build_router(state.clone());
        let admin_router = model_gateway_server::build_admin_router(state);

        Ok(Self {
            config,
            app_router,
            admin_router,
            config_path: args.config.clone(),
            entitlements,
            forwarder,
            lifecycle: lifecycle::detect_lifecycle(),
        })
    }

    /// Serve HTTP until a shutdown signal, reloading config on file change
    /// and on SIGHUP.
    pub async fn serve(self) -> anyhow::Result<()> {
        let Self {
            config,
            app_router,
            admin_router,
            config_path,
            entitlements,
            forwarder,
            lifecycle,
        } = self;

        let watcher_entitlements = entitlements.clone();
        let watcher_forwarder = forwarder.clone();
        let _watcher = match ConfigWatcher::start(config_path.clone(), config.clone(), move |new_cfg| {
            apply_reload(&watcher_entitlements, &watcher_forwarder, new_cfg);
        }) {
            Ok(w) => Some(w),
            Err(e) => {
                tracing::warn!("Config file watching disabled for {config_path}: {e}");
                None
            }
        };

        let (signal_handler, shutdown_rx) = SignalHandler::new();

        let reload_config = config.clone();
        let reload_path = config_path.clone();
        let reload_lifecycle = lifecycle.clone();
        let reload_fn = move || {
            reload_lifecycle.notify(LifecycleEvent::Reloading);
            match Config::load(&reload_path) {
                Ok(new_cfg) => {
                    apply_reload(&entitlements, &forwarder, &new_cfg);
                    reload_config.store(Arc::new(new_cfg));
                }
                Err(e) => {
                    tracing::error!("SIGHUP config reload failed: {e}");
                }
            }
            reload_lifecycle.notify(LifecycleEvent::Reloaded);
        };

        tokio::spawn(signal_handler.run(reload_fn));

        let (addr, admin_addr) = {
            let cfg = config.load();
            (format!("{}:{}", cfg.host, cfg.port), cfg.admin_listen.clone())
        };

        tracing::info!("Starting gateway listener on {addr}");
        let listener = tokio::net::TcpListener::bind(&addr).await?;
        let admin = match admin_addr {
            Some(admin_addr) => {
                tracing::info!("Starting admin listener on {admin_addr}");
                let admin_listener = tokio::net::TcpListener::bind(&admin_addr).await?;
                Some(serve_http(admin_listener, admin_router, shutdown_rx.clone()))
            }
            None => None,
        };
        lifecycle.notify(LifecycleEvent::Ready);

        let gateway = serve_http(listener, app_router, shutdown_rx);
        match admin {
            Some(admin) => {
                tokio::try_join!(gateway, admin)?;
            }
            None => gateway.await?,
        }

        lifecycle.notify(LifecycleEvent::Stopping);

        tracing::info!("Server shut down.");
        Ok(())
    }
}

/// Push a freshly loaded config into the swappable components. Listener
/// addresses are fixed for the life of the process.
fn apply_reload(entitlements: &ConfiguredEntitlements, forwarder: &Forwarder, new_cfg: &Config) {
    if let Err(e) = entitlements.update_from_config(&new_cfg.entitlements) {
        tracing::error!("Entitlements reload failed, keeping previous: {e}");
    }
    if let Err(e) = forwarder.update_from_config(new_cfg) {
        tracing::error!("Backend client rebuild failed, keeping previous: {e}");
    }
    tracing::info!(
        mode = ?entitlements.mode(),
        keys = new_cfg.entitlements.keys.len(),
        "Config reloaded"
    );
}

async fn serve_http(
    listener: tokio::net::TcpListener,
    router: axum::Router,
    mut shutdown_rx: tokio::sync::watch::Receiver<bool>,
) -> anyhow::Result<()> {
    let shutdown = async move {
        let _ = shutdown_rx.wait_for(|v| *v).await;
    };

    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown)
    .await?;
    Ok(())
}
