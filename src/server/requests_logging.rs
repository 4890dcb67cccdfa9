use axum::{body::Body, extract::Request, middleware::Next, response::IntoResponse};
use std::time::Instant;
use tracing::info;

pub async fn log_requests(request: Request<Body>, next: Next) -> impl IntoResponse {
    let start = Instant::now();
    let method = request.method().to_string();
    let uri = request.uri().to_string();

    info!(">>> {} {}", method, uri);
    let response = next.run(request).await;
    info!(
        "<<< {} {} {} ({} ms)",
        method,
        uri,
        response.status().as_u16(),
        start.elapsed().as_millis()
    );

    response
}
