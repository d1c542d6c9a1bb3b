//! HTTP endpoint handlers

use std::{convert::Infallible, sync::Arc};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        Json,
    },
};
use futures::stream::{self, Stream};
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::broadcast::error::RecvError;
use tracing::{error, info, warn};

use crate::{
    blocklist::{self, AddError, Blocklist},
    state::{AppState, Foreground, TimerSettings},
    store::timer as timer_store,
};
use super::responses::{ApiResponse, BlockCheckResponse, HealthResponse, StatusResponse, TimerView};

type HandlerResult<T> = Result<Json<T>, StatusCode>;

/// Controller of the attached surface, or 409 when none is attached
fn attached(state: &AppState) -> Result<Arc<Foreground>, StatusCode> {
    state.foreground().ok_or_else(|| {
        warn!("Timer request with no surface attached");
        StatusCode::CONFLICT
    })
}

/// Handle POST /surface/open - Attach the UI surface
pub async fn open_surface_handler(State(state): State<Arc<AppState>>) -> HandlerResult<TimerView> {
    match state.open_surface().await {
        Ok(foreground) => {
            let timer = foreground.state().map_err(|e| {
                error!("Failed to read timer state: {}", e);
                StatusCode::INTERNAL_SERVER_ERROR
            })?;
            Ok(Json(timer.into()))
        }
        Err(e) => {
            error!("Failed to attach surface: {}", e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// Handle POST /surface/close - Detach the UI surface
pub async fn close_surface_handler(State(state): State<Arc<AppState>>) -> Json<ApiResponse> {
    if state.close_surface() {
        info!("Surface closed");
        Json(ApiResponse::ok("Surface detached".to_string()))
    } else {
        Json(ApiResponse::ok("No surface was attached".to_string()))
    }
}

/// Handle GET /timer - Current timer snapshot
pub async fn timer_handler(State(state): State<Arc<AppState>>) -> HandlerResult<TimerView> {
    let foreground = attached(&state)?;
    match foreground.state() {
        Ok(timer) => Ok(Json(timer.into())),
        Err(e) => {
            error!("Failed to read timer state: {}", e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// Handle POST /timer/start - Start or resume
pub async fn start_handler(State(state): State<Arc<AppState>>) -> HandlerResult<TimerView> {
    let foreground = attached(&state)?;
    match foreground.start_timer().await {
        Ok(timer) => {
            state.record_action("start");
            Ok(Json(timer.into()))
        }
        Err(e) => {
            error!("Failed to start timer: {}", e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// Handle POST /timer/pause - Pause the countdown
pub async fn pause_handler(State(state): State<Arc<AppState>>) -> HandlerResult<TimerView> {
    let foreground = attached(&state)?;
    match foreground.pause_timer().await {
        Ok(timer) => {
            state.record_action("pause");
            Ok(Json(timer.into()))
        }
        Err(e) => {
            error!("Failed to pause timer: {}", e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// Handle POST /timer/reset - Back to idle
pub async fn reset_handler(State(state): State<Arc<AppState>>) -> HandlerResult<TimerView> {
    let foreground = attached(&state)?;
    match foreground.reset_timer().await {
        Ok(timer) => {
            state.record_action("reset");
            Ok(Json(timer.into()))
        }
        Err(e) => {
            error!("Failed to reset timer: {}", e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// Handle GET /settings
pub async fn get_settings_handler(State(state): State<Arc<AppState>>) -> Json<TimerSettings> {
    Json(timer_store::load_settings(state.store()).await)
}

/// Handle PUT /settings - Malformed fields fall back to defaults
pub async fn put_settings_handler(
    State(state): State<Arc<AppState>>,
    Json(body): Json<Value>,
) -> HandlerResult<TimerSettings> {
    let settings = TimerSettings::from_value(&body);

    match state.foreground() {
        Some(foreground) => {
            if let Err(e) = foreground.update_settings(settings).await {
                error!("Failed to apply settings: {}", e);
                return Err(StatusCode::INTERNAL_SERVER_ERROR);
            }
        }
        None => {
            if let Err(e) = timer_store::save_settings(state.store(), &settings).await {
                error!("Failed to save settings: {}", e);
                return Err(StatusCode::INTERNAL_SERVER_ERROR);
            }
        }
    }

    state.record_action("settings");
    Ok(Json(settings))
}

#[derive(Debug, Deserialize)]
pub struct AddDomainRequest {
    pub domain: String,
}

#[derive(Debug, Deserialize)]
pub struct EnabledRequest {
    pub enabled: bool,
}

#[derive(Debug, Deserialize)]
pub struct CheckQuery {
    pub url: String,
}

/// Handle GET /blocklist
pub async fn blocklist_handler(State(state): State<Arc<AppState>>) -> Json<Blocklist> {
    Json(blocklist::load(state.store()).await)
}

/// Handle POST /blocklist - Add a domain
pub async fn add_blocked_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AddDomainRequest>,
) -> Result<(StatusCode, Json<Blocklist>), StatusCode> {
    match blocklist::add(state.store(), &request.domain).await {
        Ok(added) => {
            state.record_action("block");
            let code = if added { StatusCode::CREATED } else { StatusCode::OK };
            Ok((code, Json(blocklist::load(state.store()).await)))
        }
        Err(AddError::InvalidDomain) => {
            warn!("Rejected blocklist entry: {:?}", request.domain);
            Err(StatusCode::UNPROCESSABLE_ENTITY)
        }
        Err(AddError::Store(e)) => {
            error!("Failed to save blocklist: {}", e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// Handle DELETE /blocklist/:domain
pub async fn remove_blocked_handler(
    State(state): State<Arc<AppState>>,
    Path(domain): Path<String>,
) -> HandlerResult<Blocklist> {
    match blocklist::remove(state.store(), &domain).await {
        Ok(true) => {
            state.record_action("unblock");
            Ok(Json(blocklist::load(state.store()).await))
        }
        Ok(false) => Err(StatusCode::NOT_FOUND),
        Err(e) => {
            error!("Failed to save blocklist: {}", e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// Handle PUT /blocklist/enabled
pub async fn blocking_enabled_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<EnabledRequest>,
) -> HandlerResult<Blocklist> {
    if let Err(e) = blocklist::set_enabled(state.store(), request.enabled).await {
        error!("Failed to toggle blocking: {}", e);
        return Err(StatusCode::INTERNAL_SERVER_ERROR);
    }
    state.record_action(if request.enabled { "blocking-on" } else { "blocking-off" });
    Ok(Json(blocklist::load(state.store()).await))
}

/// Handle GET /blocklist/check?url=
pub async fn check_blocked_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CheckQuery>,
) -> Json<BlockCheckResponse> {
    let list = blocklist::load(state.store()).await;
    let host = blocklist::normalize_domain(&query.url);
    let blocked = host.as_deref().is_some_and(|h| list.blocks(h));

    Json(BlockCheckResponse {
        url: query.url,
        host,
        blocked,
    })
}

/// Handle GET /alerts - Server-sent stream of alert overlays
pub async fn alerts_handler(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    info!("Alert viewer connected");
    let receiver = state.alerts.subscribe();

    let events = stream::unfold(receiver, |mut receiver| async move {
        loop {
            match receiver.recv().await {
                Ok(alert) => {
                    let event = Event::default()
                        .event("alert")
                        .json_data(alert)
                        .unwrap_or_else(|e| {
                            warn!("Failed to encode alert: {}", e);
                            Event::default().event("alert")
                        });
                    return Some((Ok::<_, Infallible>(event), receiver));
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Alert viewer lagged, skipped {} alerts", skipped);
                }
                Err(RecvError::Closed) => return None,
            }
        }
    });

    Sse::new(events).keep_alive(KeepAlive::default())
}

/// Handle GET /status - Return current service status
pub async fn status_handler(State(state): State<Arc<AppState>>) -> HandlerResult<StatusResponse> {
    let timer = match state.foreground() {
        Some(foreground) => match foreground.state() {
            Ok(timer) => Some(timer.into()),
            Err(e) => {
                error!("Failed to get timer state: {}", e);
                return Err(StatusCode::INTERNAL_SERVER_ERROR);
            }
        },
        None => None,
    };

    let (last_action, last_action_time) = state.get_last_action();

    Ok(Json(StatusResponse {
        surface_attached: timer.is_some(),
        timer,
        alert_viewers: state.alerts.viewers(),
        uptime: state.get_uptime(),
        port: state.port,
        host: state.host.clone(),
        last_action,
        last_action_time,
    }))
}

/// Handle GET /health - Health check endpoint
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::ok())
}
