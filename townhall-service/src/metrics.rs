use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use once_cell::sync::OnceCell;
use serde_json::{json, Value};

use crate::database::constants::MEMORY_DB_PATH;
use crate::database::models::VoteType;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Outcome {
    Success,
    BadRequest,
    NotFound,
    Conflict,
    RateLimited,
    Internal,
}

impl Outcome {
    pub fn from_status(status: u16) -> Self {
        match status {
            200..=399 => Outcome::Success,
            404 => Outcome::NotFound,
            409 => Outcome::Conflict,
            429 => Outcome::RateLimited,
            400..=499 => Outcome::BadRequest,
            _ => Outcome::Internal,
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            Outcome::Success => "success",
            Outcome::BadRequest => "bad_request",
            Outcome::NotFound => "not_found",
            Outcome::Conflict => "conflict",
            Outcome::RateLimited => "rate_limited",
            Outcome::Internal => "internal",
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum VoteAction {
    Cast,
    Removed,
}

pub struct Metrics {
    requests_total: HashMap<(String, Outcome), u64>,
    votes_total: HashMap<(VoteAction, VoteType), u64>,
}

static METRICS: OnceCell<Mutex<Metrics>> = OnceCell::new();

fn get() -> MutexGuard<'static, Metrics> {
    let cell = METRICS.get_or_init(|| {
        Mutex::new(Metrics {
            requests_total: HashMap::new(),
            votes_total: HashMap::new(),
        })
    });
    // Counters stay usable even if a holder panicked mid-update
    cell.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// `route` is the matched route template, e.g. `/api/budgets/{id}`
pub fn record_request(route: &str, outcome: Outcome) {
    let mut m = get();
    *m.requests_total.entry((route.to_string(), outcome)).or_insert(0) += 1;
}

pub fn record_vote(action: VoteAction, vote_type: VoteType) {
    let mut m = get();
    *m.votes_total.entry((action, vote_type)).or_insert(0) += 1;
}

pub fn snapshot_as_json(db_path: &str) -> Value {
    let m = get();

    let mut requests: Vec<Value> = m
        .requests_total
        .iter()
        .map(|((route, outcome), count)| {
            json!({
                "route": route,
                "outcome": outcome.as_str(),
                "count": count
            })
        })
        .collect();
    requests.sort_by(|a, b| a["route"].as_str().cmp(&b["route"].as_str()));

    let votes: Vec<Value> = m
        .votes_total
        .iter()
        .map(|((action, vote_type), count)| {
            json!({
                "action": match action { VoteAction::Cast => "cast", VoteAction::Removed => "removed" },
                "vote_type": vote_type.as_str(),
                "count": count
            })
        })
        .collect();
    drop(m);

    let db_bytes = storage_db_bytes(db_path);
    let db_mb = db_bytes.map(|b| round2(bytes_to_mb(b)));
    let fs_free_mb = filesystem_free_mb_from_db_path(db_path);

    json!({
        "requests_total": requests,
        "votes_total": votes,
        "storage": {
            "db_path": db_path,
            "db_size_mb": db_mb,
            "free_storage_mb": fs_free_mb,
        }
    })
}

fn storage_db_bytes(db_path: &str) -> Option<u64> {
    if db_path == MEMORY_DB_PATH {
        return None;
    }
    std::fs::metadata(db_path)
        .ok()
        .and_then(|m| if m.is_file() { Some(m.len()) } else { None })
}

fn bytes_to_mb(bytes: u64) -> f64 {
    let mb = 1024.0 * 1024.0;
    (bytes as f64) / mb
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

fn filesystem_free_mb_from_db_path(db_path: &str) -> Option<f64> {
    use sysinfo::Disks;
    let disks = Disks::new_with_refreshed_list();
    let path = std::path::Path::new(db_path);
    let mount = path.canonicalize().ok().and_then(|p| {
        disks
            .iter()
            .filter(|d| p.starts_with(d.mount_point()))
            .max_by_key(|d| d.mount_point().as_os_str().len())
    });

    mount.map(|d| round2(bytes_to_mb(d.available_space())))
}
