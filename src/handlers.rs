use crate::errors::AppError;
use crate::ledger::Ledger;
use crate::models::{FilterQuery, Item, ItemKind, LimitRequest, NewItemRequest, SummaryResponse};
use crate::state::AppState;
use crate::storage::{persist_data, LocalStorage};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use tracing::info;

pub async fn get_tracker(State(state): State<AppState>) -> Json<SummaryResponse> {
    let ledger = state.ledger.lock().await;
    Json(ledger.summary())
}

pub async fn list_meals(
    State(state): State<AppState>,
    Query(query): Query<FilterQuery>,
) -> Json<Vec<Item>> {
    list_items(&state, ItemKind::Meal, &query.filter).await
}

pub async fn list_workouts(
    State(state): State<AppState>,
    Query(query): Query<FilterQuery>,
) -> Json<Vec<Item>> {
    list_items(&state, ItemKind::Workout, &query.filter).await
}

pub async fn add_meal(
    State(state): State<AppState>,
    Json(payload): Json<NewItemRequest>,
) -> Result<(StatusCode, Json<Item>), AppError> {
    add_item(&state, ItemKind::Meal, payload).await
}

pub async fn add_workout(
    State(state): State<AppState>,
    Json(payload): Json<NewItemRequest>,
) -> Result<(StatusCode, Json<Item>), AppError> {
    add_item(&state, ItemKind::Workout, payload).await
}

pub async fn remove_meal(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<SummaryResponse>, AppError> {
    remove_item(&state, ItemKind::Meal, id).await
}

pub async fn remove_workout(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<SummaryResponse>, AppError> {
    remove_item(&state, ItemKind::Workout, id).await
}

pub async fn set_limit(
    State(state): State<AppState>,
    Json(payload): Json<LimitRequest>,
) -> Result<Json<SummaryResponse>, AppError> {
    let limit = payload
        .limit
        .filter(|limit| limit.is_finite() && *limit > 0.0)
        .ok_or_else(|| AppError::bad_request("limit must be a positive number"))?;

    let mut ledger = state.ledger.lock().await;
    let mut next = ledger.clone();
    next.set_limit(limit);
    commit(&state, &mut ledger, next).await?;

    info!(limit, "calorie limit updated");
    Ok(Json(ledger.summary()))
}

pub async fn reset_day(State(state): State<AppState>) -> Result<Json<SummaryResponse>, AppError> {
    let mut ledger = state.ledger.lock().await;
    let mut next = ledger.clone();
    next.reset_day();
    commit(&state, &mut ledger, next).await?;

    info!("day has been reset");
    Ok(Json(ledger.summary()))
}

async fn list_items(state: &AppState, kind: ItemKind, filter: &str) -> Json<Vec<Item>> {
    let ledger = state.ledger.lock().await;
    Json(ledger.filter(kind, filter))
}

async fn add_item(
    state: &AppState,
    kind: ItemKind,
    payload: NewItemRequest,
) -> Result<(StatusCode, Json<Item>), AppError> {
    let name = payload.name.trim();
    if name.is_empty() {
        return Err(AppError::bad_request("name is required"));
    }
    let calories = payload
        .calories
        .ok_or_else(|| AppError::bad_request("calories is required"))?;
    if !calories.is_finite() || calories < 0.0 {
        return Err(AppError::bad_request("calories must be a non-negative number"));
    }

    let mut ledger = state.ledger.lock().await;
    let mut next = ledger.clone();
    let item = next.new_item(name, calories);
    next.add(kind, item.clone());
    commit(state, &mut ledger, next).await?;

    info!(?kind, id = item.id, "item added");
    Ok((StatusCode::CREATED, Json(item)))
}

async fn remove_item(
    state: &AppState,
    kind: ItemKind,
    id: i64,
) -> Result<Json<SummaryResponse>, AppError> {
    let mut ledger = state.ledger.lock().await;
    if ledger.contains(kind, id) {
        let mut next = ledger.clone();
        next.remove(kind, id);
        commit(state, &mut ledger, next).await?;
        info!(?kind, id, "item removed");
    }

    Ok(Json(ledger.summary()))
}

/// Writes `next`'s store to disk and only then replaces the live ledger,
/// so a failed write leaves memory as it was.
async fn commit(
    state: &AppState,
    current: &mut Ledger<LocalStorage>,
    next: Ledger<LocalStorage>,
) -> Result<(), AppError> {
    persist_data(&state.data_path, next.store()).await?;
    *current = next;
    Ok(())
}
