use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use tracing::{info, warn};

use super::body;
use crate::database::models::views::TownDetail;
use crate::database::models::MunicipalityRecord;
use crate::database::retry::with_retry;
use crate::error::{is_unique_violation, ApiError};
use crate::state::AppState;
use crate::types::CreateTownRequest;
use crate::utils::{coerce_f64, coerce_i64, new_id, non_blank, now_timestamp};

const SLUG_TAKEN: &str = "A town with this slug already exists";

/// GET /api/towns
pub async fn list_towns(State(state): State<AppState>) -> Result<Json<Vec<MunicipalityRecord>>, ApiError> {
    let pool = state.pool();
    let towns = with_retry(state.config.retry, "fetch towns", || MunicipalityRecord::list_all(pool)).await?;

    info!("GET /api/towns - {} towns", towns.len());
    Ok(Json(towns))
}

/// GET /api/towns/{slug}
pub async fn get_town(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<TownDetail>, ApiError> {
    info!("GET /api/towns/{}", slug);
    let pool = state.pool();
    let slug_ref = slug.as_str();

    let detail = with_retry(state.config.retry, "fetch town", move || async move {
        match MunicipalityRecord::get_by_slug(pool, slug_ref).await? {
            Some(town) => town.load_detail(pool).await.map(Some),
            None => Ok(None),
        }
    })
    .await?;

    match detail {
        Some(detail) => Ok(Json(detail)),
        None => {
            let available_slugs = MunicipalityRecord::list_refs(pool).await?;
            warn!("Town '{}' not found, {} slugs available", slug, available_slugs.len());
            Err(ApiError::TownNotFound { available_slugs })
        }
    }
}

/// POST /api/towns
pub async fn create_town(
    State(state): State<AppState>,
    payload: Result<Json<CreateTownRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<MunicipalityRecord>), ApiError> {
    let req = body(payload)?;
    let town = validate_new_town(&req)?;
    let pool = state.pool();

    if MunicipalityRecord::slug_taken(pool, &town.slug).await? {
        return Err(ApiError::conflict(SLUG_TAKEN));
    }

    // Two racing creates can both pass the check above
    town.insert(pool).await.map_err(|e| {
        if is_unique_violation(&e) {
            ApiError::conflict(SLUG_TAKEN)
        } else {
            ApiError::from(e)
        }
    })?;

    info!("Created town {} ({})", town.name, town.slug);
    Ok((StatusCode::CREATED, Json(town)))
}

fn validate_new_town(req: &CreateTownRequest) -> Result<MunicipalityRecord, ApiError> {
    let missing = || ApiError::validation("Missing required fields");

    let name = non_blank(&req.name).ok_or_else(missing)?;
    let state = non_blank(&req.state).ok_or_else(missing)?;
    let zip_code = non_blank(&req.zip_code).ok_or_else(missing)?;
    let slug = non_blank(&req.slug).ok_or_else(missing)?;
    let population = coerce_i64(&req.population).ok_or_else(missing)?;
    if population < 0 {
        return Err(ApiError::validation("population must be non-negative"));
    }

    let (latitude, longitude) = match req.coordinates.as_deref() {
        Some([lat, lng]) => match (coerce_f64(&Some(lat.clone())), coerce_f64(&Some(lng.clone()))) {
            (Some(lat), Some(lng)) => (lat, lng),
            _ => return Err(ApiError::validation("coordinates must be numeric [latitude, longitude]")),
        },
        Some(_) => return Err(ApiError::validation("coordinates must be [latitude, longitude]")),
        None => return Err(missing()),
    };

    let now = now_timestamp();
    Ok(MunicipalityRecord {
        id: new_id(),
        name,
        state,
        zip_code,
        population,
        is_serviced: req.is_serviced.unwrap_or(false),
        latitude,
        longitude,
        slug,
        created_at: now.clone(),
        updated_at: now,
    })
}
