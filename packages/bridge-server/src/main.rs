mod api;
mod cli;

use std::{collections::HashMap, sync::Arc, time::Duration};

use actix_cors::Cors;
use actix_web::{App, HttpServer, http::header, middleware::Logger, web};
use anyhow::{Context, Result};
use bridge_core::{
    config::config::Env,
    indexer::client::HttpIndexerClient,
    models::traits::KeyValueStore,
    orchestrator::{orchestrator::ClaimOrchestrator, wallet::EthersWallet},
    pending::{
        kv_store::{FileStore, MemoryStore},
        pending_store::PendingTxStore,
    },
    pricefeed::pricefeed::PriceFeedManager,
    reconciler::{
        polling::{BridgeWatcher, watch_bridges},
        reconciler::BridgeReconciler,
    },
    registry::token_registry::TokenRegistry,
};
use clap::Parser;
use ethers::types::Address;
use tokio::signal;
use tracing::{error, info, warn};

use crate::{api::config::configure_routes, cli::Cli};

const PRICE_REFRESH_PERIOD: Duration = Duration::from_secs(60);

pub struct AppState {
    pub env: Env,
    pub reconciler: Arc<BridgeReconciler<HttpIndexerClient>>,
    pub tokens: Arc<TokenRegistry>,
    pub orchestrator: Option<Arc<ClaimOrchestrator<EthersWallet>>>,
    pub watchers: HashMap<Address, BridgeWatcher>,
    pub start_time: std::time::Instant,
}

fn load_env(cli: &Cli) -> Result<Env> {
    match Env::from_env() {
        Ok(env) => Ok(env),
        Err(e) => {
            let path = cli.config.clone().unwrap_or_else(|| "config.toml".into());
            info!("📄 Environment incomplete ({}), reading {}", e, path.display());
            Env::from_file(path)
        }
    }
}

fn load_tokens(cli: &Cli, env: &Env, kv: &dyn KeyValueStore) -> Result<TokenRegistry> {
    let registry = match &cli.token_list {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read token list {}", path.display()))?;
            TokenRegistry::from_json(&env.l1, &json).context("Failed to parse token list")?
        }
        None => TokenRegistry::new(&env.l1, Vec::new()),
    };

    Ok(registry.with_custom_tokens(kv))
}

fn mask_url(url: &str) -> String {
    match url.rfind('/') {
        Some(pos) if pos > "https://".len() => format!("{}/***", &url[..pos]),
        _ => url.to_string(),
    }
}

#[actix_web::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "bridge_server=info,bridge_core=info,actix_web=info".into()
            }),
        )
        .init();

    let cli = Cli::parse();

    info!("🚀 Starting zkEVM Bridge Tracker v{}", env!("CARGO_PKG_VERSION"));
    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    info!("📋 Loading configuration");
    let env = load_env(&cli).context("Failed to load configuration")?;

    info!("📡 Network Configuration:");
    info!("   • Indexer: {}", env.indexer_url());
    for chain in [&env.l1, &env.l2] {
        info!(
            "   • {}: chain {} / network {} ({})",
            chain.name,
            chain.chain_id,
            chain.network_id,
            mask_url(&chain.rpc_url)
        );
    }
    info!("   • Poll interval: {}s", env.polling_interval_secs);
    info!("   • Pending tx timeout: {}s", env.pending_tx_timeout_secs);
    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let kv: Arc<dyn KeyValueStore> = match &env.pending_store_path {
        Some(path) => {
            info!("💾 Pending transactions stored in {}", path.display());
            Arc::new(FileStore::new(path.clone()))
        }
        None => {
            warn!("⚠️ PENDING_STORE_PATH not set, pending transactions are kept in memory");
            Arc::new(MemoryStore::default())
        }
    };

    let chains = Arc::new(env.chain_registry());
    let tokens = Arc::new(load_tokens(&cli, &env, kv.as_ref())?);
    info!("🪙 {} tokens registered", tokens.tokens().len());

    let pending = Arc::new(PendingTxStore::new(
        kv.clone(),
        chains.clone(),
        env.pending_tx_timeout_secs,
    ));
    let indexer = Arc::new(
        HttpIndexerClient::new(env.indexer_url()).context("Failed to build indexer client")?,
    );

    let mut reconciler =
        BridgeReconciler::new(indexer, chains.clone(), tokens.clone(), pending.clone());
    let price_handle = match &env.price_feed_url {
        Some(url) => {
            info!("💵 Fiat prices from {}", url);
            let price_feed = Arc::new(PriceFeedManager::new(url));
            let symbols = tokens.tokens().iter().map(|t| t.symbol.clone()).collect();
            let handle = price_feed.clone().start(symbols, PRICE_REFRESH_PERIOD).await;
            reconciler = reconciler.with_price_feed(price_feed);
            Some(handle)
        }
        None => None,
    };
    let reconciler = Arc::new(reconciler);

    let orchestrator = match std::env::var("SIGNER_PRIVATE_KEY") {
        Ok(key) => {
            let wallet = EthersWallet::new(&key, &chains).context("Failed to load signer")?;
            Some(Arc::new(ClaimOrchestrator::new(
                chains.clone(),
                Arc::new(wallet),
                pending.clone(),
                env.gas_limit_buffer_percent,
            )))
        }
        Err(_) => {
            info!("🔒 SIGNER_PRIVATE_KEY not set, claim endpoint disabled");
            None
        }
    };

    let period = Duration::from_secs(env.polling_interval_secs);
    let mut watchers = HashMap::new();
    for raw in &cli.watch {
        let account: Address = raw
            .parse()
            .with_context(|| format!("Invalid --watch address {}", raw))?;
        info!("👀 Watching bridges of {:?}", account);
        watchers.insert(
            account,
            watch_bridges(reconciler.clone(), account, cli.watch_quantity, period),
        );
    }

    let app_state = web::Data::new(AppState {
        env,
        reconciler,
        tokens,
        orchestrator,
        watchers,
        start_time: std::time::Instant::now(),
    });

    let host = cli.host.clone();
    let port = cli.port;
    info!("🌐 Starting HTTP server on {}:{}", host, port);

    let server_state = app_state.clone();
    let server = HttpServer::new(move || {
        let cors = Cors::default()
            .allowed_origin(
                &std::env::var("CORS_ORIGIN")
                    .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            )
            .allowed_methods(vec!["GET", "POST"])
            .allowed_headers(vec![header::CONTENT_TYPE, header::ACCEPT])
            .max_age(3600);

        App::new()
            .app_data(server_state.clone())
            .configure(configure_routes)
            .wrap(cors)
            .wrap(Logger::default())
    })
    .bind((host.as_str(), port))
    .context("Failed to bind HTTP server")?
    .run();

    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    info!("🌐 HTTP Endpoints:");
    info!("   • Health:  http://{}:{}/api/v1/health", host, port);
    info!("   • Bridges: http://{}:{}/api/v1/bridges/{{account}}", host, port);
    info!("   • Watch:   http://{}:{}/api/v1/watch/{{account}}", host, port);
    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    info!("✅ All services started successfully");
    info!("   Press Ctrl+C to shutdown gracefully");
    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    tokio::select! {
        result = server => {
            error!("❌ HTTP server stopped: {:?}", result);
        },
        _ = signal::ctrl_c() => {
            warn!("⚠️ Received shutdown signal (Ctrl+C)");
            info!("🛑 Initiating graceful shutdown...");
        }
    }

    for watcher in app_state.watchers.values() {
        watcher.stop();
    }
    if let Some(handle) = price_handle {
        handle.abort();
    }

    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    info!("✅ Bridge tracker stopped gracefully");
    info!("👋 Goodbye!");
    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    Ok(())
}
