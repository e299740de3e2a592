//! 客户查询 API 处理器

use axum::{
    Json,
    extract::{Path, State},
};

use crm_store::Customer;

use crate::{
    dto::ApiResponse,
    error::{ApiError, Result},
    state::AppState,
};

/// 获取全部客户
///
/// GET /api/customers
pub async fn list_customers(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<Customer>>>> {
    let customers = state.customers.list_all().await?;

    Ok(Json(ApiResponse::success(customers)))
}

/// 获取单个客户
///
/// GET /api/customers/:customer_id
pub async fn get_customer(
    State(state): State<AppState>,
    Path(customer_id): Path<String>,
) -> Result<Json<ApiResponse<Customer>>> {
    let customer = state
        .customers
        .get(&customer_id)
        .await?
        .ok_or(ApiError::NotFound {
            entity: "客户",
            id: customer_id,
        })?;

    Ok(Json(ApiResponse::success(customer)))
}
