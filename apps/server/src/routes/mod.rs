macros_utils::routes! {
    mod health,
    mod ping,
    mod port,
    mod traceroute,
}

use actix_web::HttpResponse;
use actix_web::http::header::{CacheControl, CacheDirective};
use netprobe::{StreamEvent, sse_stream};
use tokio::sync::mpsc;

/// Wrap a session's events in a server-sent event response
fn event_stream(rx: mpsc::Receiver<StreamEvent>) -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/event-stream")
        .insert_header(CacheControl(vec![CacheDirective::NoCache]))
        .streaming(sse_stream(rx))
}

/// Treat absent and blank parameters alike
fn required(value: Option<&String>) -> Option<&str> {
    value.map(|v| v.trim()).filter(|v| !v.is_empty())
}
