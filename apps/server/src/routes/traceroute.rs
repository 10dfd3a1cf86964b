use actix_web::{HttpResponse, get, web};
use serde::Deserialize;
use tracing::info;

use super::{event_stream, required};
use crate::error::ApiError;
use crate::state::AppState;

macros_utils::routes! {
    route traceroute_stream_route,
}

#[derive(Debug, Deserialize)]
pub struct TracerouteQuery {
    ip: Option<String>,
}

/// Stream hop lines as server-sent events, ending with a completed event.
///
/// The traceroute is tied to this connection and is killed when the client
/// disconnects.
#[get("/traceroute-stream")]
pub async fn traceroute_stream_route(
    state: web::Data<AppState>,
    query: web::Query<TracerouteQuery>,
) -> Result<HttpResponse, ApiError> {
    let ip = required(query.ip.as_ref()).ok_or_else(|| ApiError::BadRequest("IP is required".into()))?;

    let rx = state.traceroutes.start(ip)?;
    info!(ip, "Streaming traceroute");

    Ok(event_stream(rx))
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::StatusCode;
    use actix_web::{App, test};

    #[actix_web::test]
    async fn test_requires_ip() {
        let app = test::init_service(
            App::new().app_data(web::Data::new(AppState::default())).configure(routes),
        )
        .await;
        let response =
            test::call_service(&app, test::TestRequest::get().uri("/traceroute-stream").to_request()).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn test_option_like_host_is_bad_request() {
        let mut state = AppState::default();
        state.traceroutes = netprobe::TracerouteRunner::new("echo");
        let app = test::init_service(App::new().app_data(web::Data::new(state)).configure(routes)).await;

        let request = test::TestRequest::get().uri("/traceroute-stream?ip=-I").to_request();
        let response = test::call_service(&app, request).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: serde_json::Value = test::read_body_json(response).await;
        assert_eq!(body["error"], "Invalid host: -I");
    }

    #[cfg(unix)]
    #[actix_web::test]
    async fn test_stream_ends_with_completed() {
        let mut state = AppState::default();
        state.traceroutes = netprobe::TracerouteRunner::new("echo");
        let app = test::init_service(App::new().app_data(web::Data::new(state)).configure(routes)).await;

        let request = test::TestRequest::get().uri("/traceroute-stream?ip=example.com").to_request();
        let response = test::call_service(&app, request).await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = test::read_body(response).await;
        assert_eq!(&body[..], b"data: example.com\n\ndata: Traceroute completed\n\n");
    }
}
