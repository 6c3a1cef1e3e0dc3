//! MyTownhall civic REST service: towns, budgets, meetings and a community forum

pub mod chat;
pub mod config;
pub mod database;
pub mod error;
pub mod forum;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod state;
pub mod types;
pub mod utils;

use axum::{
    extract::DefaultBodyLimit,
    middleware::from_fn,
    routing::{get, post},
    Router,
};

use handlers::{budgets, chat as chat_handlers, forum as forum_handlers, meetings, system, towns};
use state::AppState;

/// All routes with state, body limit and outcome counters.
/// Rate limiting, CORS and tracing are added by the binary.
pub fn build_router(state: AppState) -> Router {
    let body_limit = state.config.request_body_limit;

    Router::new()
        .route("/healthz", get(system::health_check))
        .route("/meta", get(system::get_meta))
        .route("/admin/stats", get(system::admin_stats))
        .route("/api/status", get(system::db_status))
        .route("/api/debug", get(system::town_index))
        .route("/api/towns", get(towns::list_towns).post(towns::create_town))
        .route("/api/towns/{slug}", get(towns::get_town))
        .route("/api/budgets", get(budgets::list_budgets).post(budgets::create_budget))
        .route(
            "/api/budgets/{id}",
            get(budgets::get_budget)
                .patch(budgets::update_budget)
                .delete(budgets::delete_budget),
        )
        .route(
            "/api/budget-categories",
            get(budgets::list_categories).post(budgets::create_category),
        )
        .route("/api/meetings", get(meetings::list_meetings).post(meetings::create_meeting))
        .route(
            "/api/meetings/{id}",
            get(meetings::get_meeting)
                .patch(meetings::update_meeting)
                .delete(meetings::delete_meeting),
        )
        .route(
            "/api/agenda-items",
            get(meetings::list_agenda_items).post(meetings::create_agenda_item),
        )
        .route(
            "/api/forum/threads",
            get(forum_handlers::list_threads).post(forum_handlers::create_thread),
        )
        .route(
            "/api/forum/threads/{municipality_id}",
            get(forum_handlers::threads_for_municipality),
        )
        .route("/api/forum/comments", post(forum_handlers::create_comment))
        .route(
            "/api/forum/vote",
            post(forum_handlers::cast_vote).delete(forum_handlers::remove_vote),
        )
        .route("/api/chat", post(chat_handlers::chat))
        .route_layer(from_fn(middleware::track_outcomes))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Method, Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::config::Config;
    use crate::database::Database;

    async fn app() -> Router {
        let db = Database::connect_in_memory().await.unwrap();
        build_router(AppState::new(db, Config::for_tests()))
    }

    async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(v) => {
                builder = builder.header("content-type", "application/json");
                Body::from(v.to_string())
            }
            None => Body::empty(),
        };
        let resp = app.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    async fn create_town(app: &Router, slug: &str) -> String {
        let (status, town) = send(
            app,
            Method::POST,
            "/api/towns",
            Some(json!({
                "name": "Somerville",
                "state": "NJ",
                "zipCode": "08876",
                "population": 12423,
                "coordinates": [40.5751, -74.6097],
                "slug": slug,
                "isServiced": true
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        town["id"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn town_slug_conflict_and_lookup() {
        let app = app().await;
        create_town(&app, "somerville-nj").await;

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/towns",
            Some(json!({
                "name": "Other",
                "state": "NJ",
                "zipCode": "08876",
                "population": 1,
                "coordinates": [0, 0],
                "slug": "somerville-nj"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "A town with this slug already exists");

        let (status, town) = send(&app, Method::GET, "/api/towns/somerville-nj", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(town["zipCode"], "08876");
        assert!(town["forumThreads"].as_array().unwrap().is_empty());

        let (status, body) = send(&app, Method::GET, "/api/towns/atlantis", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["availableSlugs"][0]["slug"], "somerville-nj");
    }

    #[tokio::test]
    async fn budget_category_amount_is_validated() {
        let app = app().await;
        let town = create_town(&app, "somerville-nj").await;

        let (status, budget) = send(
            &app,
            Method::POST,
            "/api/budgets",
            Some(json!({"year": 2024, "totalBudget": "25000000", "municipalityId": town})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(budget["municipality"]["slug"], "somerville-nj");
        let budget_id = budget["id"].as_str().unwrap().to_string();

        for amount in [json!(-5), Value::Null] {
            let (status, _) = send(
                &app,
                Method::POST,
                "/api/budget-categories",
                Some(json!({"name": "Parks", "amount": amount, "color": "#fff", "budgetId": budget_id})),
            )
            .await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
        }

        let (status, _) = send(
            &app,
            Method::POST,
            "/api/budget-categories",
            Some(json!({"name": "Parks", "amount": 10, "color": "#fff", "budgetId": "missing"})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, category) = send(
            &app,
            Method::POST,
            "/api/budget-categories",
            Some(json!({"name": "Parks", "amount": 0, "color": "#fff", "budgetId": budget_id})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(category["budget"]["year"], 2024);

        let (status, patched) = send(
            &app,
            Method::PATCH,
            &format!("/api/budgets/{}", budget_id),
            Some(json!({"year": 2025})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(patched["year"], 2025);
        assert_eq!(patched["categories"][0]["name"], "Parks");

        let (status, _) = send(&app, Method::DELETE, "/api/budgets/missing", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn meetings_validate_status_and_date() {
        let app = app().await;
        let town = create_town(&app, "princeton-nj").await;
        let meeting = |status: &str, date: &str| {
            json!({
                "title": "Council Meeting",
                "date": date,
                "time": "7:00 PM",
                "committee": "Town Council",
                "status": status,
                "municipalityId": town
            })
        };

        let (status, _) = send(&app, Method::POST, "/api/meetings", Some(meeting("cancelled", "2024-02-15"))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let (status, _) = send(&app, Method::POST, "/api/meetings", Some(meeting("past", "soon"))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, created) =
            send(&app, Method::POST, "/api/meetings", Some(meeting(" upcoming ", "2024-02-15"))).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["status"], "upcoming");
        assert_eq!(created["date"], "2024-02-15T00:00:00.000Z");

        let (status, item) = send(
            &app,
            Method::POST,
            "/api/agenda-items",
            Some(json!({"content": "Call to order", "order": 1, "meetingId": created["id"]})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(item["meeting"]["municipality"]["slug"], "princeton-nj");

        let (status, list) = send(&app, Method::GET, "/api/meetings?status=upcoming&limit=10", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(list["pagination"]["total"], 1);
        assert_eq!(list["meetings"][0]["agendaItems"][0]["order"], 1);

        let (status, _) = send(&app, Method::GET, "/api/meetings?limit=-1", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let (status, _) = send(&app, Method::GET, "/api/meetings?limit=abc", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn forum_flow() {
        let app = app().await;
        let town = create_town(&app, "madison-wi").await;

        let (status, _) = send(
            &app,
            Method::POST,
            "/api/forum/threads",
            Some(json!({"title": "t", "content": "c", "author": "a", "municipalityId": "missing"})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, thread) = send(
            &app,
            Method::POST,
            "/api/forum/threads",
            Some(json!({
                "title": "Budget questions",
                "content": "Why did parks spending go up?",
                "author": "Resident",
                "municipalityId": town,
                "tags": ["Budget", " Parks "]
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let thread_id = thread["id"].as_str().unwrap().to_string();
        assert_eq!(thread["tags"][1]["name"], "Parks");

        let (status, vote) = send(
            &app,
            Method::POST,
            "/api/forum/vote",
            Some(json!({"threadId": thread_id, "voteType": "up"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(vote, json!({"type": "thread", "id": thread_id, "upvotes": 1, "downvotes": 0}));

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/forum/vote",
            Some(json!({"threadId": thread_id, "commentId": "c", "voteType": "up"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Cannot vote on both thread and comment at the same time");

        let (status, body) = send(&app, Method::POST, "/api/forum/vote", Some(json!({"threadId": thread_id, "voteType": "sideways"}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid vote type. Must be \"up\" or \"down\"");

        let (status, _) = send(
            &app,
            Method::DELETE,
            "/api/forum/vote",
            Some(json!({"commentId": "missing", "voteType": "down"})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, comment) = send(
            &app,
            Method::POST,
            "/api/forum/comments",
            Some(json!({"content": "Good question", "author": "Neighbor", "threadId": thread_id})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(comment["threadId"], thread_id.as_str());

        let (status, list) = send(&app, Method::GET, "/api/forum/threads?tag=Budget", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(list["pagination"]["total"], 1);
        assert_eq!(list["threads"][0]["comments"][0]["content"], "Good question");

        let (status, list) = send(&app, Method::GET, "/api/forum/threads?tag=Transit", None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(list["threads"].as_array().unwrap().is_empty());

        let (status, threads) = send(&app, Method::GET, &format!("/api/forum/threads/{}", town), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(threads[0]["upvotes"], 1);
    }

    #[tokio::test]
    async fn malformed_json_and_chat() {
        let app = app().await;

        let req = Request::builder()
            .method(Method::POST)
            .uri("/api/forum/vote")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let resp = app.clone().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let (status, _) = send(&app, Method::POST, "/api/chat", Some(json!({"messages": []}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, reply) = send(
            &app,
            Method::POST,
            "/api/chat",
            Some(json!({"messages": [{"role": "user", "content": "When is the next meeting?"}], "municipalityName": "Madison"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(reply["content"].as_str().unwrap().contains("Madison"));
        assert_eq!(reply["usage"]["total_tokens"], 150);
    }

    #[tokio::test]
    async fn operational_endpoints() {
        let app = app().await;
        let (status, body) = send(&app, Method::GET, "/api/status", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 0);

        let id = create_town(&app, "somerville-nj").await;
        let (status, index) = send(&app, Method::GET, "/api/debug", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            index,
            json!({ "count": 1, "municipalities": [{ "id": id, "name": "Somerville", "slug": "somerville-nj" }] })
        );

        let (status, meta) = send(&app, Method::GET, "/meta", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(meta["service"], "townhall-service");

        let (status, stats) = send(&app, Method::GET, "/admin/stats", None).await;
        assert_eq!(status, StatusCode::OK);
        let requests = stats["requests_total"].as_array().unwrap();
        assert!(requests.iter().any(|r| r["route"] == "GET /api/status"));
    }
}
