use axum::extract::{Path, Query, State};
use database::migration_events::{DistributionStats, FetchMigrationsParams};
use tracing::{info, instrument};

use crate::{
    error::AppError,
    pagination::{items_count, MigrationsPagination, PlaceholderPagination},
    types::MigrationResponse,
    ApiResponse, ApiResult, AppState,
};

#[instrument(skip_all)]
pub async fn health_check(
    State(_state): State<AppState>,
) -> ApiResult<String, PlaceholderPagination> {
    Ok(ApiResponse {
        success: true,
        items: "OK".to_string(),
        next_page_params: None::<PlaceholderPagination>,
    })
}

#[instrument(skip(state))]
pub async fn get_migrations(
    State(state): State<AppState>,
    Query(pagination_query): Query<MigrationsPagination>,
) -> ApiResult<Vec<MigrationResponse>, MigrationsPagination> {
    let items_count = items_count(pagination_query.items_count);
    let params = FetchMigrationsParams {
        items_count,
        cursor_id: pagination_query.cursor_id,
        distribution_status: pagination_query.distribution_status,
    };

    let models = state.db_client.fetch_migrations_paginated(params).await?;
    info!(count = models.len(), "Fetched migrations");

    let next_page_params = if models.len() == items_count as usize {
        models.last().map(|last| MigrationsPagination {
            items_count: Some(items_count),
            cursor_id: Some(last.id),
            distribution_status: pagination_query.distribution_status,
        })
    } else {
        None
    };

    let items = models
        .into_iter()
        .map(|model| MigrationResponse::from_model(model, &state.explorers))
        .collect();

    Ok(ApiResponse {
        success: true,
        items,
        next_page_params,
    })
}

#[instrument(skip(state))]
pub async fn get_migration(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<MigrationResponse, PlaceholderPagination> {
    let model = state
        .db_client
        .find_migration(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("migration {}", id)))?;

    Ok(ApiResponse {
        success: true,
        items: MigrationResponse::from_model(model, &state.explorers),
        next_page_params: None,
    })
}

#[instrument(skip_all)]
pub async fn get_distribution_stats(
    State(state): State<AppState>,
) -> ApiResult<DistributionStats, PlaceholderPagination> {
    let stats = state.db_client.distribution_stats().await?;

    Ok(ApiResponse {
        success: true,
        items: stats,
        next_page_params: None,
    })
}

#[instrument(skip(state))]
pub async fn get_wallet_migrations(
    State(state): State<AppState>,
    Path(wallet_address): Path<String>,
) -> ApiResult<Vec<MigrationResponse>, PlaceholderPagination> {
    let wallet_address = wallet_address.trim();
    if !is_hex_address(wallet_address) {
        return Err(AppError::BadRequest(format!(
            "{:?} is not a wallet address",
            wallet_address
        )));
    }

    let models = state
        .db_client
        .fetch_wallet_migrations(wallet_address)
        .await?;
    info!(count = models.len(), "Fetched wallet migrations");

    let items = models
        .into_iter()
        .map(|model| MigrationResponse::from_model(model, &state.explorers))
        .collect();

    Ok(ApiResponse {
        success: true,
        items,
        next_page_params: None,
    })
}

fn is_hex_address(value: &str) -> bool {
    value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
        .is_some_and(|hex| hex.len() == 40 && hex.chars().all(|c| c.is_ascii_hexdigit()))
}
