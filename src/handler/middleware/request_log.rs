use axum::{
    body::Body,
    extract::ConnectInfo,
    http::{header::CONTENT_LENGTH, Request},
    middleware::Next,
    response::Response,
};
use std::{net::SocketAddr, time::Instant};
use tracing::info;

/// Logs basic request metadata once the downstream handler returns.
pub async fn log_requests(req: Request<Body>, next: Next) -> Response {
    let started_at = Instant::now();
    let method = req.method().clone();
    let uri = req.uri().to_string();
    let client_ip = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0.ip().to_string())
        .unwrap_or_else(|| "-".to_string());

    let response = next.run(req).await;

    let status = response.status();
    let body_len = response
        .headers()
        .get(CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.to_string())
        .unwrap_or_else(|| "-".to_string());
    let cost_ms = started_at.elapsed().as_secs_f64() * 1_000.0;

    info!(
        target: "http.access",
        method = method.as_str(),
        status = status.as_u16(),
        body_len = body_len.as_str(),
        cost_ms = cost_ms,
        uri = uri.as_str(),
        client_ip = client_ip.as_str(),
    );

    response
}
