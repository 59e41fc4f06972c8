use std::sync::Arc;

use axum::{Json, extract::State as AppState, response::IntoResponse};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::{
    directory::MemberRecord,
    error::AppError,
    event::Decision,
    state::State,
};

// Required fields stay `Option` so an absent field becomes our own 400
// with a stable message instead of a deserialization rejection.

#[derive(Deserialize)]
pub struct RegisterRequest {
    name: Option<String>,
    push_token: Option<String>,
}

#[derive(Deserialize)]
pub struct StartMealRequest {
    meal_type: Option<String>,
    creator_name: Option<String>,
}

#[derive(Deserialize)]
pub struct RsvpRequest {
    name: Option<String>,
    status: Option<String>,
}

/// Reports liveness plus directory-store connectivity instead of failing
/// when the store is down.
pub async fn health_handler(AppState(state): AppState<Arc<State>>) -> impl IntoResponse {
    let store_ok = state.directory.ping().await;

    Json(json!({
        "status": "ok",
        "store": state.directory.kind(),
        "store_ok": store_ok,
        "timestamp": Utc::now(),
    }))
}

pub async fn register_handler(
    AppState(state): AppState<Arc<State>>,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    let name = payload
        .name
        .filter(|n| !n.is_empty())
        .ok_or(AppError::Validation("Name is required"))?;

    state
        .directory
        .upsert(&name, MemberRecord::new(payload.push_token))
        .await?;

    info!(name = %name, "Registered member");
    Ok(Json(json!({ "status": "ok" })))
}

pub async fn meal_handler(
    AppState(state): AppState<Arc<State>>,
    Json(payload): Json<StartMealRequest>,
) -> Result<impl IntoResponse, AppError> {
    let meal_type = payload
        .meal_type
        .filter(|v| !v.is_empty())
        .ok_or(AppError::Validation(
            "meal_type and creator_name are required",
        ))?;
    let creator_name = payload
        .creator_name
        .filter(|v| !v.is_empty())
        .ok_or(AppError::Validation(
            "meal_type and creator_name are required",
        ))?;

    let event = state.events.start(&meal_type, &creator_name).await;

    // Everyone with a token except whoever is calling the meal.
    let tokens: Vec<String> = state
        .directory
        .members()
        .await?
        .into_iter()
        .filter(|(name, _)| name != &creator_name)
        .filter_map(|(_, record)| record.push_token)
        .collect();

    // Detached: the response never waits on the bursts.
    let _ = state.dispatcher.dispatch(
        tokens,
        format!("{meal_type} Time!"),
        format!("{creator_name} is calling for {meal_type}!"),
        json!({
            "meal_type": meal_type,
            "creator_name": creator_name,
        }),
    );

    info!(
        meal_type = %meal_type,
        creator = %creator_name,
        "Meal event started"
    );
    Ok(Json(json!({ "status": "ok", "meal": event })))
}

pub async fn current_handler(AppState(state): AppState<Arc<State>>) -> impl IntoResponse {
    match state.events.current().await {
        Some(event) => Json(json!(event)),
        None => Json(json!({ "status": "no_active_meal" })),
    }
}

pub async fn rsvp_handler(
    AppState(state): AppState<Arc<State>>,
    Json(payload): Json<RsvpRequest>,
) -> Result<impl IntoResponse, AppError> {
    let name = payload
        .name
        .filter(|n| !n.is_empty())
        .ok_or(AppError::Validation("name and status are required"))?;
    let status = payload
        .status
        .filter(|s| !s.is_empty())
        .ok_or(AppError::Validation("name and status are required"))?;

    let decision = Decision::parse(&status)
        .ok_or(AppError::Validation("status must be join or not_coming"))?;

    state.events.rsvp(&name, decision).await?;

    info!(name = %name, status = %status, "RSVP recorded");
    Ok(Json(json!({ "status": "ok" })))
}
