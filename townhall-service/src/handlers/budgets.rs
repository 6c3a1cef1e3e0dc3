use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use tracing::info;

use super::{body, query};
use crate::database::models::views::{BudgetCategoryList, BudgetCategoryView, BudgetList, BudgetView};
use crate::database::models::{BudgetCategoryRecord, BudgetRecord, MunicipalityRecord};
use crate::database::operations::budget::BudgetFilter;
use crate::error::ApiError;
use crate::state::AppState;
use crate::types::{
    BudgetQuery, CategoryQuery, CreateBudgetRequest, CreateCategoryRequest, PageRequest,
    UpdateBudgetRequest,
};
use crate::utils::{coerce_f64, coerce_i64, new_id, non_blank, now_timestamp};

const BUDGET_NOT_FOUND: &str = "Budget not found";

/// GET /api/budgets
pub async fn list_budgets(
    State(state): State<AppState>,
    params: Result<Query<BudgetQuery>, QueryRejection>,
) -> Result<Json<BudgetList>, ApiError> {
    let params = query(params)?;
    let page = PageRequest::resolve(params.limit, params.offset)?;
    let filter = BudgetFilter {
        municipality_id: non_blank(&params.municipality_id),
        year: params.year,
    };

    let list = BudgetRecord::list(state.pool(), &filter, page).await?;
    info!(
        "GET /api/budgets - {} of {} budgets",
        list.budgets.len(),
        list.pagination.total
    );
    Ok(Json(list))
}

/// POST /api/budgets
pub async fn create_budget(
    State(state): State<AppState>,
    payload: Result<Json<CreateBudgetRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<BudgetView>), ApiError> {
    let req = body(payload)?;
    let missing = || {
        ApiError::validation("Missing required fields: year, totalBudget, and municipalityId are required")
    };

    let year = coerce_i64(&req.year).ok_or_else(missing)?;
    let total_budget = coerce_f64(&req.total_budget).ok_or_else(missing)?;
    let municipality_id = non_blank(&req.municipality_id).ok_or_else(missing)?;
    if total_budget < 0.0 {
        return Err(ApiError::validation("totalBudget must be non-negative"));
    }

    let pool = state.pool();
    if !MunicipalityRecord::exists(pool, &municipality_id).await? {
        return Err(ApiError::not_found("Municipality not found"));
    }

    let now = now_timestamp();
    let budget = BudgetRecord {
        id: new_id(),
        year,
        total_budget,
        municipality_id,
        created_at: now.clone(),
        updated_at: now,
    };
    budget.insert(pool).await?;
    info!("Created budget {} ({}) for {}", budget.id, budget.year, budget.municipality_id);

    let view = BudgetRecord::get_view(pool, &budget.id)
        .await?
        .ok_or_else(|| ApiError::not_found(BUDGET_NOT_FOUND))?;
    Ok((StatusCode::CREATED, Json(view)))
}

/// GET /api/budgets/{id}
pub async fn get_budget(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<BudgetView>, ApiError> {
    BudgetRecord::get_view(state.pool(), &id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found(BUDGET_NOT_FOUND))
}

/// PATCH /api/budgets/{id}
pub async fn update_budget(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateBudgetRequest>, JsonRejection>,
) -> Result<Json<BudgetView>, ApiError> {
    let req = body(payload)?;

    let year = match &req.year {
        None => None,
        some => Some(coerce_i64(some).ok_or_else(|| ApiError::validation("year must be an integer"))?),
    };
    let total_budget = match &req.total_budget {
        None => None,
        some => Some(
            coerce_f64(some)
                .filter(|v| *v >= 0.0)
                .ok_or_else(|| ApiError::validation("totalBudget must be a non-negative number"))?,
        ),
    };

    let pool = state.pool();
    if !BudgetRecord::update(pool, &id, year, total_budget).await? {
        return Err(ApiError::not_found(BUDGET_NOT_FOUND));
    }
    info!("Updated budget {}", id);

    BudgetRecord::get_view(pool, &id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found(BUDGET_NOT_FOUND))
}

/// DELETE /api/budgets/{id}
pub async fn delete_budget(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    if !BudgetRecord::delete(state.pool(), &id).await? {
        return Err(ApiError::not_found(BUDGET_NOT_FOUND));
    }
    info!("Deleted budget {}", id);
    Ok(Json(json!({ "message": "Budget deleted successfully" })))
}

/// GET /api/budget-categories
pub async fn list_categories(
    State(state): State<AppState>,
    params: Result<Query<CategoryQuery>, QueryRejection>,
) -> Result<Json<BudgetCategoryList>, ApiError> {
    let params = query(params)?;
    let page = PageRequest::resolve(params.limit, params.offset)?;
    let budget_id = non_blank(&params.budget_id);

    let list = BudgetCategoryRecord::list(state.pool(), budget_id.as_deref(), page).await?;
    Ok(Json(list))
}

/// POST /api/budget-categories
pub async fn create_category(
    State(state): State<AppState>,
    payload: Result<Json<CreateCategoryRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<BudgetCategoryView>), ApiError> {
    let req = body(payload)?;
    let missing = || {
        ApiError::validation("Missing required fields: name, amount, color, and budgetId are required")
    };

    let name = non_blank(&req.name).ok_or_else(missing)?;
    let color = non_blank(&req.color).ok_or_else(missing)?;
    let budget_id = non_blank(&req.budget_id).ok_or_else(missing)?;
    let amount = coerce_f64(&req.amount).ok_or_else(missing)?;
    if amount < 0.0 {
        return Err(ApiError::validation("amount must be a non-negative number"));
    }

    let pool = state.pool();
    if !BudgetRecord::exists(pool, &budget_id).await? {
        return Err(ApiError::not_found(BUDGET_NOT_FOUND));
    }

    let category = BudgetCategoryRecord {
        id: new_id(),
        name,
        amount,
        color,
        budget_id,
    };
    category.insert(pool).await?;
    info!("Created category '{}' on budget {}", category.name, category.budget_id);

    let view = BudgetCategoryRecord::get_view(pool, &category.id)
        .await?
        .ok_or_else(|| ApiError::not_found("Budget category not found"))?;
    Ok((StatusCode::CREATED, Json(view)))
}
