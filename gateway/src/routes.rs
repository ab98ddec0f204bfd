//! Route handlers.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::time::Duration;

use axum::Json;
use axum::extract::{ConnectInfo, Query, State};
use axum::response::sse::{Event, KeepAlive, KeepAliveStream, Sse};
use futures::StreamExt;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};

use roxy_command::CmdType;

use crate::AppState;
use crate::error::ApiError;
use crate::pipeline::CommandResponse;
use crate::ratelimit::{RateDecision, RateLimiter};

/// Body of `/run`.
#[derive(Debug, Deserialize)]
pub struct RunRequest {
    pub command: String,
}

/// Body of `/batch`.
#[derive(Debug, Deserialize)]
pub struct BatchRequest {
    pub commands: Vec<String>,
}

/// Query parameters of `/stream`.
#[derive(Debug, Deserialize)]
pub struct StreamParams {
    pub command: String,
}

#[derive(Debug, Serialize)]
struct HealthBody {
    status: &'static str,
    version: &'static str,
    uptime_s: u64,
}

fn charge(limiter: &RateLimiter, addr: &SocketAddr, cost: u32) -> Result<(), ApiError> {
    let key = addr.ip().to_string();
    match limiter.try_acquire(&key, cost) {
        RateDecision::Allowed => Ok(()),
        RateDecision::Limited { retry_after_secs } => {
            Err(ApiError::RateLimited { retry_after_secs })
        }
    }
}

/// Liveness probe; deliberately unauthenticated.
pub async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    let body = HealthBody {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        uptime_s: state.started_at.elapsed().as_secs(),
    };
    Json(json!(body))
}

/// Execute one command.
pub async fn run(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Json(body): Json<RunRequest>,
) -> Result<Json<CommandResponse>, ApiError> {
    charge(&state.run_limiter, &addr, 1)?;
    let response = state.pipeline.run(&body.command).await?;
    Ok(Json(response))
}

/// Execute several commands in order.
///
/// The whole batch is charged against the rate limit up front. Individual
/// failures are folded into their slot in the results; the rest of the
/// batch still runs.
pub async fn batch(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Json(body): Json<BatchRequest>,
) -> Result<Json<Vec<CommandResponse>>, ApiError> {
    if body.commands.is_empty() {
        return Err(ApiError::BadRequest("empty command batch".to_string()));
    }
    let cost = u32::try_from(body.commands.len())
        .map_err(|_| ApiError::BadRequest("batch too large".to_string()))?;
    charge(&state.batch_limiter, &addr, cost)?;

    let mut results = Vec::with_capacity(body.commands.len());
    for command in &body.commands {
        let entry = match state.pipeline.run(command).await {
            Ok(response) => response,
            Err(rejection) => CommandResponse::from_rejection(&rejection),
        };
        results.push(entry);
    }
    Ok(Json(results))
}

fn token_event(token: impl AsRef<str>) -> Event {
    Event::default().event("token").data(token.as_ref())
}

fn complete_event(meta: serde_json::Value) -> Event {
    match Event::default().event("complete").json_data(&meta) {
        Ok(event) => event,
        Err(e) => Event::default().event("error").data(e.to_string()),
    }
}

fn error_event(message: impl std::fmt::Display) -> Event {
    Event::default().event("error").data(message.to_string())
}

type EventStream = BoxStream<'static, Result<Event, Infallible>>;

/// Stream an answer as server-sent events.
///
/// RAG queries stream `token` events as the LLM produces them, then a
/// `complete` event carrying the citations. Anything else executes
/// normally and arrives as a single `complete` event. A cached answer is
/// replayed as one `token` event.
pub async fn stream(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Query(params): Query<StreamParams>,
) -> Result<Sse<KeepAliveStream<EventStream>>, ApiError> {
    charge(&state.run_limiter, &addr, 1)?;
    state.pipeline.sanitize(&params.command)?;
    let parsed = state.pipeline.parse(&params.command);

    let events: EventStream = if parsed.cmd_type == CmdType::Rag {
        if let Some(answer) = state.pipeline.cached_answer(&params.command).await {
            info!("streaming cached answer");
            futures::stream::iter([
                Ok(token_event(answer)),
                Ok(complete_event(json!({
                    "mode": "rag",
                    "cached": true,
                    "sources": [],
                }))),
            ])
            .boxed()
        } else {
            let (sources, mut tokens) = state
                .rag
                .answer_stream(&params.command)
                .await
                .map_err(|e| ApiError::Internal(e.into()))?;

            let pipeline = state.pipeline.clone();
            let query = params.command.clone();
            async_stream::stream! {
                let mut collected = String::new();
                while let Some(token) = tokens.next().await {
                    match token {
                        Ok(token) => {
                            collected.push_str(&token);
                            yield Ok(token_event(token));
                        }
                        Err(e) => {
                            warn!("token stream failed: {e}");
                            yield Ok(error_event(e));
                            return;
                        }
                    }
                }

                if !collected.is_empty() {
                    pipeline.store_answer(&query, &collected).await;
                }

                yield Ok(complete_event(json!({
                    "mode": "rag",
                    "cached": false,
                    "sources": sources,
                })));
            }
            .boxed()
        }
    } else {
        // Deterministic commands have nothing to stream token-by-token.
        let response = state.pipeline.run(&params.command).await?;
        let meta = serde_json::to_value(&response)
            .map_err(|e| ApiError::Internal(e.into()))?;
        futures::stream::iter([
            Ok(token_event(&response.result)),
            Ok(complete_event(meta)),
        ])
        .boxed()
    };

    Ok(Sse::new(events).keep_alive(KeepAlive::new().interval(Duration::from_secs(30))))
}
