//! HTTP handlers, one module per resource

pub mod budgets;
pub mod chat;
pub mod forum;
pub mod meetings;
pub mod system;
pub mod towns;

use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    extract::{Json, Query},
};

use crate::error::ApiError;

/// Unwrap a JSON body, turning extractor rejections into a JSON 400
pub(crate) fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    let Json(value) = payload?;
    Ok(value)
}

pub(crate) fn query<T>(params: Result<Query<T>, QueryRejection>) -> Result<T, ApiError> {
    let Query(value) = params?;
    Ok(value)
}
