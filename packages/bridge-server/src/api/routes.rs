use actix_web::{HttpResponse, Responder, get, post, web};
use bridge_core::{
    BridgeError, fees::fee_calculator::max_transferable_amount, models::model::FetchOutcome,
};
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::{
    AppState,
    api::model::{
        ApiError, ClaimResponse, MaxAmountQuery, MaxAmountResponse, PageQuery, WatchResponse,
        parse_address, parse_amount,
    },
};

#[get("/health")]
pub async fn health_check(data: web::Data<AppState>) -> impl Responder {
    let watcher_errors = data
        .watchers
        .values()
        .filter(|watcher| watcher.latest().last_error.is_some())
        .count();

    let status = if watcher_errors > 0 {
        "degraded"
    } else {
        "healthy"
    };

    HttpResponse::Ok().json(json!({
        "status": status,
        "timestamp": chrono::Utc::now().timestamp(),
        "version": env!("CARGO_PKG_VERSION"),
        "uptime_secs": data.start_time.elapsed().as_secs(),
        "l1_chain_id": data.env.l1.chain_id,
        "l2_chain_id": data.env.l2.chain_id,
        "watched_accounts": data.watchers.len(),
        "watcher_errors": watcher_errors,
        "claims_enabled": data.orchestrator.is_some(),
    }))
}

#[get("/bridges/{account}")]
pub async fn list_bridges(
    data: web::Data<AppState>,
    path: web::Path<String>,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse, ApiError> {
    let account = parse_address(&path)?;
    let cancel = CancellationToken::new();

    match data
        .reconciler
        .refresh(account, query.request(), &cancel)
        .await?
    {
        FetchOutcome::Fetched(page) => Ok(HttpResponse::Ok().json(page)),
        FetchOutcome::Cancelled => Err(ApiError::Unavailable("request cancelled".to_string())),
    }
}

#[get("/bridges/{account}/{bridge_id}")]
pub async fn get_bridge(
    data: web::Data<AppState>,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse, ApiError> {
    let (account, bridge_id) = path.into_inner();
    let account = parse_address(&account)?;

    let bridge = data.reconciler.get_bridge_by_id(account, &bridge_id).await?;
    Ok(HttpResponse::Ok().json(bridge))
}

/// Submits the claim with the server's signer, switching it to the
/// destination chain first when needed.
#[post("/bridges/{account}/{bridge_id}/claim")]
pub async fn claim_bridge(
    data: web::Data<AppState>,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse, ApiError> {
    let orchestrator = data
        .orchestrator
        .as_ref()
        .ok_or_else(|| ApiError::Unavailable("no signer configured".to_string()))?;

    let (account, bridge_id) = path.into_inner();
    let account = parse_address(&account)?;

    let bridge = data.reconciler.get_bridge_by_id(account, &bridge_id).await?;
    let claim_tx_hash = orchestrator.claim_switching_network(&bridge).await?;

    if let Some(watcher) = data.watchers.get(&account) {
        watcher.reload();
    }
    info!("📨 Claim for {} accepted via API", bridge_id);

    Ok(HttpResponse::Accepted().json(ClaimResponse {
        explorer_url: bridge.to.explorer_tx_url(&claim_tx_hash),
        bridge_id,
        claim_tx_hash,
    }))
}

#[get("/watch/{account}")]
pub async fn watch_snapshot(
    data: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let account = parse_address(&path)?;
    let watcher = data.watchers.get(&account).ok_or_else(|| {
        ApiError::Bridge(BridgeError::NotFound(format!(
            "{:?} is not watched",
            account
        )))
    })?;

    let snapshot = watcher.latest();
    Ok(HttpResponse::Ok().json(WatchResponse {
        account,
        page: snapshot.value,
        last_error: snapshot.last_error,
        updated_at: snapshot.updated_at,
    }))
}

#[get("/max-amount")]
pub async fn max_amount(
    data: web::Data<AppState>,
    query: web::Query<MaxAmountQuery>,
) -> Result<HttpResponse, ApiError> {
    let amount = parse_amount("amount", &query.amount)?;
    let fee = parse_amount("fee", &query.fee)?;
    let chain_id = query.chain_id.unwrap_or(data.env.l1.chain_id);

    let token = match &query.token {
        Some(address) => {
            let address = parse_address(address)?;
            data.tokens.find(address, chain_id).ok_or_else(|| {
                ApiError::Bridge(BridgeError::NotFound(format!(
                    "token {:?} on chain {}",
                    address, chain_id
                )))
            })?
        }
        None => data.tokens.native(),
    };

    let result = match &query.balance {
        Some(balance) => {
            let balance = parse_amount("balance", balance)?;
            max_transferable_amount(token, balance, amount, fee)
        }
        None => {
            let orchestrator = data.orchestrator.as_ref().ok_or_else(|| {
                ApiError::Unavailable("no signer configured, pass a balance".to_string())
            })?;
            let from = data.reconciler.chains().by_chain_id(chain_id)?;
            orchestrator
                .max_transferable(from, token, amount, fee)
                .await?
        }
    };

    Ok(HttpResponse::Ok().json(MaxAmountResponse::from(result)))
}
