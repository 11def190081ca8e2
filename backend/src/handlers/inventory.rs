//! HTTP handlers for inventory ledger endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::{
    CreateItemInput, InventoryItem, InventoryMovement, InventoryValuation, LowStockItem,
    MovementType,
};
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::MovementInput;
use crate::AppState;

/// Item and the movement that changed it
#[derive(Debug, Serialize)]
pub struct MovementResponse {
    pub item: InventoryItem,
    pub movement: InventoryMovement,
}

/// Manual stock correction
#[derive(Debug, Deserialize)]
pub struct AdjustmentInput {
    #[serde(default = "default_adjustment_type")]
    pub movement_type: MovementType,
    pub quantity: Decimal,
    pub reason: Option<String>,
}

fn default_adjustment_type() -> MovementType {
    MovementType::Adjustment
}

/// Create an inventory item
pub async fn create_item(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateItemInput>,
) -> AppResult<(StatusCode, Json<InventoryItem>)> {
    let item = state.inventory().create_item(input, &current_user.0).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

/// List active items
pub async fn list_items(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<Vec<InventoryItem>>> {
    let items = state.inventory().list_items(current_user.0.scope()).await?;
    Ok(Json(items))
}

/// Get a single item
pub async fn get_item(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(item_id): Path<Uuid>,
) -> AppResult<Json<InventoryItem>> {
    let item = state
        .inventory()
        .get_item(item_id, current_user.0.scope())
        .await?;
    Ok(Json(item))
}

/// Deactivate an item
pub async fn deactivate_item(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(item_id): Path<Uuid>,
) -> AppResult<Json<InventoryItem>> {
    let item = state
        .inventory()
        .deactivate_item(item_id, &current_user.0)
        .await?;
    Ok(Json(item))
}

/// Record a movement against an item
pub async fn record_movement(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(item_id): Path<Uuid>,
    Json(input): Json<MovementInput>,
) -> AppResult<(StatusCode, Json<MovementResponse>)> {
    let (item, movement) = state
        .inventory()
        .process_movement(item_id, input, &current_user.0)
        .await?;
    Ok((StatusCode::CREATED, Json(MovementResponse { item, movement })))
}

/// Manual stock correction
pub async fn adjust_item(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(item_id): Path<Uuid>,
    Json(input): Json<AdjustmentInput>,
) -> AppResult<(StatusCode, Json<MovementResponse>)> {
    let (item, movement) = state
        .documents()
        .record_manual_adjustment(
            item_id,
            input.quantity,
            input.movement_type,
            input.reason,
            &current_user.0,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(MovementResponse { item, movement })))
}

/// Movement history of an item, newest first
pub async fn list_movements(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(item_id): Path<Uuid>,
) -> AppResult<Json<Vec<InventoryMovement>>> {
    let movements = state
        .inventory()
        .get_movement_history(item_id, current_user.0.scope())
        .await?;
    Ok(Json(movements))
}

/// Items at or below their reorder level
pub async fn low_stock(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<Vec<LowStockItem>>> {
    let items = state
        .inventory()
        .get_low_stock_items(current_user.0.scope())
        .await?;
    Ok(Json(items))
}

/// Stock valuation
pub async fn valuation(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<InventoryValuation>> {
    let valuation = state
        .inventory()
        .get_valuation(current_user.0.scope())
        .await?;
    Ok(Json(valuation))
}
