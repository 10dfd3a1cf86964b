use actix_web::{HttpResponse, get, post, web};
use serde::Deserialize;
use tracing::{info, warn};

use super::{event_stream, required};
use crate::error::ApiError;
use crate::state::AppState;

macros_utils::routes! {
    route ping_once_route,
    route ping_stream_route,
    route ping_stop_route,
}

#[derive(Debug, Deserialize)]
pub struct PingOnceBody {
    ip: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PingStreamQuery {
    ip: Option<String>,
    id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PingStopBody {
    id: Option<String>,
}

/// Run a single ping and return the tool's output as text
#[post("/ping-once")]
pub async fn ping_once_route(
    state: web::Data<AppState>,
    body: web::Json<PingOnceBody>,
) -> Result<HttpResponse, ApiError> {
    let ip = required(body.ip.as_ref())
        .ok_or_else(|| ApiError::BadRequest("IP address is required".into()))?;

    let output = netprobe::ping_once(&state.ping_program, ip).await?;
    Ok(HttpResponse::Ok().content_type("text/plain; charset=utf-8").body(output))
}

/// Stream a continuous ping as server-sent events
#[get("/ping-stream")]
pub async fn ping_stream_route(
    state: web::Data<AppState>,
    query: web::Query<PingStreamQuery>,
) -> Result<HttpResponse, ApiError> {
    let (Some(ip), Some(id)) = (required(query.ip.as_ref()), required(query.id.as_ref())) else {
        return Err(ApiError::BadRequest("IP and ID are required".into()));
    };

    let rx = state.pings.start(ip, id).await.inspect_err(|error| {
        warn!(session = id, %error, "Rejected ping stream");
    })?;
    info!(session = id, ip, "Streaming ping");

    Ok(event_stream(rx))
}

/// Stop a streaming ping and return its statistics as text
#[post("/ping-stop")]
pub async fn ping_stop_route(
    state: web::Data<AppState>,
    body: web::Json<PingStopBody>,
) -> Result<HttpResponse, ApiError> {
    let id = required(body.id.as_ref()).ok_or_else(|| ApiError::BadRequest("ID is required".into()))?;

    let summary = state
        .pings
        .stop(id)
        .await
        .ok_or_else(|| ApiError::NotFound("No running ping for this ID".into()))?;

    Ok(HttpResponse::Ok().content_type("text/plain; charset=utf-8").body(summary.to_string()))
}
