use std::sync::OnceLock;

use axum::{
    http::{header::CONTENT_TYPE, HeaderName, HeaderValue, Method, Request},
    response::IntoResponse,
    routing::get,
    Router,
};
use metrics::set_global_recorder;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tower_http::{
    cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnRequest, DefaultOnResponse, TraceLayer},
    LatencyUnit,
};
use tracing::{info_span, Level};

use crate::{
    routes::{balances, health, metadata, session, tokens, vault, wallet},
    state::AppState,
};

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

pub fn prometheus_handle() -> PrometheusHandle {
    PROMETHEUS_HANDLE
        .get_or_init(|| {
            let recorder = PrometheusBuilder::new().build_recorder();
            let handle = recorder.handle();
            if let Err(err) = set_global_recorder(recorder) {
                tracing::warn!(error = %err, "global metrics recorder already installed");
            }
            handle
        })
        .clone()
}

async fn metrics_handler() -> impl IntoResponse {
    prometheus_handle().render()
}

pub fn build_router(state: AppState, allowed_origins: Vec<HeaderValue>) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(AllowMethods::list([
            Method::GET,
            Method::POST,
            Method::DELETE,
            Method::PUT,
            Method::OPTIONS,
        ]))
        .allow_headers(AllowHeaders::list(vec![CONTENT_TYPE]))
        .allow_origin(AllowOrigin::list(allowed_origins));

    let request_id_header = HeaderName::from_static("x-request-id");
    let request_id_for_span = request_id_header.clone();
    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(move |request: &Request<_>| {
            let request_id = request
                .headers()
                .get(&request_id_for_span)
                .and_then(|value| value.to_str().ok())
                .unwrap_or("unknown");
            info_span!(
                "http_request",
                method = %request.method(),
                uri = %request.uri(),
                request_id = %request_id
            )
        })
        .on_request(DefaultOnRequest::new().level(Level::INFO))
        .on_response(
            DefaultOnResponse::new()
                .level(Level::INFO)
                .latency_unit(LatencyUnit::Millis),
        );

    Router::<AppState>::new()
        .route("/", get(|| async { "vault balance sync" }))
        .route("/metrics", get(metrics_handler))
        .merge(health::router())
        .nest(
            "/api",
            Router::new()
                .merge(balances::router())
                .merge(tokens::router())
                .merge(metadata::router())
                .merge(session::router())
                .merge(vault::router())
                .merge(wallet::router()),
        )
        .with_state(state)
        .layer(cors)
        .layer(PropagateRequestIdLayer::new(request_id_header.clone()))
        .layer(trace_layer)
        .layer(SetRequestIdLayer::new(
            request_id_header,
            MakeRequestUuid::default(),
        ))
}
