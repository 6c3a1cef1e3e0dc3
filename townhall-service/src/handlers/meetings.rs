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
use crate::database::models::views::{AgendaItemList, AgendaItemView, MeetingList, MeetingView};
use crate::database::models::{AgendaItemRecord, MeetingRecord, MeetingStatus, MunicipalityRecord};
use crate::database::operations::meeting::{MeetingChanges, MeetingFilter};
use crate::error::ApiError;
use crate::state::AppState;
use crate::types::{
    AgendaItemQuery, CreateAgendaItemRequest, CreateMeetingRequest, MeetingQuery, PageRequest,
    UpdateMeetingRequest,
};
use crate::utils::{coerce_i64, new_id, non_blank, normalize_meeting_date, now_timestamp};

const MEETING_NOT_FOUND: &str = "Meeting not found";

fn parse_status(raw: &str) -> Result<MeetingStatus, ApiError> {
    raw.parse().map_err(ApiError::Validation)
}

/// GET /api/meetings
pub async fn list_meetings(
    State(state): State<AppState>,
    params: Result<Query<MeetingQuery>, QueryRejection>,
) -> Result<Json<MeetingList>, ApiError> {
    let params = query(params)?;
    let page = PageRequest::resolve(params.limit, params.offset)?;
    let filter = MeetingFilter {
        municipality_id: non_blank(&params.municipality_id),
        committee: non_blank(&params.committee),
        status: non_blank(&params.status).as_deref().map(parse_status).transpose()?,
    };

    let list = MeetingRecord::list(state.pool(), &filter, page).await?;
    info!(
        "GET /api/meetings - {} of {} meetings",
        list.meetings.len(),
        list.pagination.total
    );
    Ok(Json(list))
}

/// POST /api/meetings
pub async fn create_meeting(
    State(state): State<AppState>,
    payload: Result<Json<CreateMeetingRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<MeetingView>), ApiError> {
    let req = body(payload)?;
    let missing = || {
        ApiError::validation(
            "Missing required fields: title, date, time, committee, status, and municipalityId are required",
        )
    };

    let title = non_blank(&req.title).ok_or_else(missing)?;
    let date = non_blank(&req.date).ok_or_else(missing)?;
    let time = non_blank(&req.time).ok_or_else(missing)?;
    let committee = non_blank(&req.committee).ok_or_else(missing)?;
    let status = non_blank(&req.status).ok_or_else(missing)?;
    let municipality_id = non_blank(&req.municipality_id).ok_or_else(missing)?;

    let status = parse_status(&status)?;
    let date = normalize_meeting_date(&date)?;

    let pool = state.pool();
    if !MunicipalityRecord::exists(pool, &municipality_id).await? {
        return Err(ApiError::not_found("Municipality not found"));
    }

    let now = now_timestamp();
    let meeting = MeetingRecord {
        id: new_id(),
        title,
        date,
        time,
        committee,
        status: status.to_string(),
        municipality_id,
        created_at: now.clone(),
        updated_at: now,
    };
    meeting.insert(pool).await?;
    info!("Created meeting '{}' on {}", meeting.title, meeting.date);

    let view = MeetingRecord::get_view(pool, &meeting.id)
        .await?
        .ok_or_else(|| ApiError::not_found(MEETING_NOT_FOUND))?;
    Ok((StatusCode::CREATED, Json(view)))
}

/// GET /api/meetings/{id}
pub async fn get_meeting(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MeetingView>, ApiError> {
    MeetingRecord::get_view(state.pool(), &id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found(MEETING_NOT_FOUND))
}

/// PATCH /api/meetings/{id}
pub async fn update_meeting(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateMeetingRequest>, JsonRejection>,
) -> Result<Json<MeetingView>, ApiError> {
    let req = body(payload)?;
    let changes = MeetingChanges {
        title: non_blank(&req.title),
        date: non_blank(&req.date)
            .map(|d| normalize_meeting_date(&d))
            .transpose()?,
        time: non_blank(&req.time),
        committee: non_blank(&req.committee),
        status: non_blank(&req.status).as_deref().map(parse_status).transpose()?,
    };

    let pool = state.pool();
    if !MeetingRecord::update(pool, &id, &changes).await? {
        return Err(ApiError::not_found(MEETING_NOT_FOUND));
    }
    info!("Updated meeting {}", id);

    MeetingRecord::get_view(pool, &id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found(MEETING_NOT_FOUND))
}

/// DELETE /api/meetings/{id}
pub async fn delete_meeting(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    if !MeetingRecord::delete(state.pool(), &id).await? {
        return Err(ApiError::not_found(MEETING_NOT_FOUND));
    }
    info!("Deleted meeting {}", id);
    Ok(Json(json!({ "message": "Meeting deleted successfully" })))
}

/// GET /api/agenda-items
pub async fn list_agenda_items(
    State(state): State<AppState>,
    params: Result<Query<AgendaItemQuery>, QueryRejection>,
) -> Result<Json<AgendaItemList>, ApiError> {
    let params = query(params)?;
    let page = PageRequest::resolve(params.limit, params.offset)?;
    let meeting_id = non_blank(&params.meeting_id);

    let list = AgendaItemRecord::list(state.pool(), meeting_id.as_deref(), page).await?;
    Ok(Json(list))
}

/// POST /api/agenda-items
pub async fn create_agenda_item(
    State(state): State<AppState>,
    payload: Result<Json<CreateAgendaItemRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<AgendaItemView>), ApiError> {
    let req = body(payload)?;
    let missing =
        || ApiError::validation("Missing required fields: content, order, and meetingId are required");

    let content = non_blank(&req.content).ok_or_else(missing)?;
    let order = coerce_i64(&req.order).ok_or_else(missing)?;
    let meeting_id = non_blank(&req.meeting_id).ok_or_else(missing)?;

    let pool = state.pool();
    if !MeetingRecord::exists(pool, &meeting_id).await? {
        return Err(ApiError::not_found(MEETING_NOT_FOUND));
    }

    let item = AgendaItemRecord {
        id: new_id(),
        content,
        order,
        meeting_id,
    };
    item.insert(pool).await?;
    info!("Added agenda item {} to meeting {}", item.order, item.meeting_id);

    let view = AgendaItemRecord::get_view(pool, &item.id)
        .await?
        .ok_or_else(|| ApiError::not_found("Agenda item not found"))?;
    Ok((StatusCode::CREATED, Json(view)))
}
