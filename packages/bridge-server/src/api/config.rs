use actix_web::web;

use crate::api::routes::{
    claim_bridge, get_bridge, health_check, list_bridges, max_amount, watch_snapshot,
};

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .service(health_check)
            .service(list_bridges)
            .service(get_bridge)
            .service(claim_bridge)
            .service(watch_snapshot)
            .service(max_amount),
    );
}
