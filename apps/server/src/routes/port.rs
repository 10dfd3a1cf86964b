use actix_web::{HttpResponse, get, web};
use netprobe::{Protocol, check_port};
use serde::Deserialize;

use super::required;
use crate::error::ApiError;
use crate::state::AppState;

macros_utils::routes! {
    route check_port_route,
}

#[derive(Debug, Deserialize)]
pub struct CheckPortQuery {
    ip: Option<String>,
    port: Option<String>,
    protocol: Option<String>,
}

/// Probe a single TCP or UDP port
#[get("/check-port")]
pub async fn check_port_route(
    state: web::Data<AppState>,
    query: web::Query<CheckPortQuery>,
) -> Result<HttpResponse, ApiError> {
    let (Some(ip), Some(port), Some(protocol)) = (
        required(query.ip.as_ref()),
        required(query.port.as_ref()),
        required(query.protocol.as_ref()),
    ) else {
        return Err(ApiError::BadRequest("IP, port, and protocol are required".into()));
    };

    let protocol: Protocol = protocol
        .parse()
        .map_err(|_| ApiError::BadRequest("Invalid protocol. Use tcp or udp.".into()))?;
    let port: u16 = port
        .parse()
        .ok()
        .filter(|&port| port != 0)
        .ok_or_else(|| ApiError::BadRequest(format!("Invalid port: {port}")))?;

    let check = check_port(ip, port, protocol, state.port_timeout).await;
    Ok(HttpResponse::Ok().json(check))
}
