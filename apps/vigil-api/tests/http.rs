use axum::{
	body::{self, Body},
	http::{Request, StatusCode},
};
use sqlx::PgPool;
use time::OffsetDateTime;
use tower::util::ServiceExt;
use uuid::Uuid;

use vigil_api::{routes, state::AppState};
use vigil_config::{Config, Leaderboard, Pagination, Postgres, Security, Service, Storage};
use vigil_testkit::TestDatabase;

fn test_config(dsn: String) -> Config {
	Config {
		service: Service {
			http_bind: "127.0.0.1:0".to_string(),
			log_level: "info".to_string(),
		},
		storage: Storage { postgres: Postgres { dsn, pool_max_conns: 2 } },
		pagination: Pagination { default_limit: 10 },
		leaderboard: Leaderboard { candidate_limit: 20 },
		security: Security { bind_localhost_only: true },
	}
}

async fn test_env() -> Option<TestDatabase> {
	let base_dsn = match vigil_testkit::env_dsn() {
		Some(value) => value,
		None => {
			eprintln!("Skipping HTTP tests; set VIGIL_PG_DSN to run this test.");

			return None;
		},
	};
	let test_db = TestDatabase::new(&base_dsn).await.expect("Failed to create test database.");

	Some(test_db)
}

async fn seed_user(pool: &PgPool, name: &str, role: &str) -> Uuid {
	let id = Uuid::new_v4();
	let now = OffsetDateTime::now_utc();

	sqlx::query(
		"\
INSERT INTO users (user_id, name, email, password_hash, role, created_at, updated_at)
VALUES ($1, $2, $3, $4, $5, $6, $7)",
	)
	.bind(id)
	.bind(name)
	.bind(format!("{name}-{}@example.com", id.simple()))
	.bind("x")
	.bind(role)
	.bind(now)
	.bind(now)
	.execute(pool)
	.await
	.expect("Failed to seed user.");

	id
}

async fn read_json(response: axum::response::Response) -> serde_json::Value {
	let body = body::to_bytes(response.into_body(), usize::MAX)
		.await
		.expect("Failed to read response body.");

	serde_json::from_slice(&body).expect("Failed to parse response.")
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set VIGIL_PG_DSN to run."]
async fn health_ok() {
	let Some(test_db) = test_env().await else {
		return;
	};
	let config = test_config(test_db.dsn().to_string());
	let state = AppState::new(config).await.expect("Failed to initialize app state.");
	let app = routes::router(state);
	let response = app
		.oneshot(
			Request::builder()
				.uri("/health")
				.body(Body::empty())
				.expect("Failed to build request."),
		)
		.await
		.expect("Failed to call /health.");

	assert_eq!(response.status(), StatusCode::OK);

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set VIGIL_PG_DSN to run."]
async fn rejects_missing_identity_headers() {
	let Some(test_db) = test_env().await else {
		return;
	};
	let config = test_config(test_db.dsn().to_string());
	let state = AppState::new(config).await.expect("Failed to initialize app state.");
	let app = routes::router(state);
	let response = app
		.oneshot(
			Request::builder()
				.uri("/v1/vulnerabilities")
				.body(Body::empty())
				.expect("Failed to build request."),
		)
		.await
		.expect("Failed to call list.");

	assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

	let json = read_json(response).await;

	assert_eq!(json["error_code"], "UNAUTHENTICATED");

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set VIGIL_PG_DSN to run."]
async fn create_then_list_roundtrip() {
	let Some(test_db) = test_env().await else {
		return;
	};
	let config = test_config(test_db.dsn().to_string());
	let state = AppState::new(config).await.expect("Failed to initialize app state.");
	let researcher = seed_user(&state.service.db.pool, "alice", "RESEARCHER").await;
	let app = routes::router(state);
	let payload = serde_json::json!({
		"title": "SQL injection in login",
		"description": "Classic quote injection.",
		"asset": "login.example.com",
		"stepsToReproduce": "Submit a single quote.",
		"cvssScore": 9.8,
		"attachments": [{
			"fileName": "poc.txt",
			"fileUrl": "https://files.example.com/poc.txt",
			"fileSize": 128,
			"mimeType": "text/plain"
		}]
	});
	let response = app
		.clone()
		.oneshot(
			Request::builder()
				.method("POST")
				.uri("/v1/vulnerabilities")
				.header(routes::USER_ID_HEADER, researcher.to_string())
				.header(routes::ROLE_HEADER, "RESEARCHER")
				.header("content-type", "application/json")
				.body(Body::from(payload.to_string()))
				.expect("Failed to build request."),
		)
		.await
		.expect("Failed to call create.");

	assert_eq!(response.status(), StatusCode::CREATED);

	let created = read_json(response).await;

	assert_eq!(created["status"], "REPORTED");
	assert_eq!(created["attachments"][0]["fileName"], "poc.txt");

	let response = app
		.oneshot(
			Request::builder()
				.uri("/v1/vulnerabilities?severity=7")
				.header(routes::USER_ID_HEADER, researcher.to_string())
				.header(routes::ROLE_HEADER, "RESEARCHER")
				.body(Body::empty())
				.expect("Failed to build request."),
		)
		.await
		.expect("Failed to call list.");

	assert_eq!(response.status(), StatusCode::OK);

	let listed = read_json(response).await;

	assert_eq!(listed["pagination"]["total"], 1);
	assert_eq!(listed["vulnerabilities"][0]["title"], "SQL injection in login");
	assert_eq!(listed["vulnerabilities"][0]["attachmentCount"], 1);

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set VIGIL_PG_DSN to run."]
async fn researcher_is_denied_admin_surfaces() {
	let Some(test_db) = test_env().await else {
		return;
	};
	let config = test_config(test_db.dsn().to_string());
	let state = AppState::new(config).await.expect("Failed to initialize app state.");
	let researcher = seed_user(&state.service.db.pool, "alice", "RESEARCHER").await;
	let app = routes::router(state);

	for uri in ["/v1/vulnerabilities/analytics/overview", "/v1/users", "/v1/users/leaderboard"] {
		let response = app
			.clone()
			.oneshot(
				Request::builder()
					.uri(uri)
					.header(routes::USER_ID_HEADER, researcher.to_string())
					.header(routes::ROLE_HEADER, "RESEARCHER")
					.body(Body::empty())
					.expect("Failed to build request."),
			)
			.await
			.expect("Failed to call admin surface.");

		assert_eq!(response.status(), StatusCode::FORBIDDEN, "{uri}");

		let json = read_json(response).await;

		assert_eq!(json["error_code"], "SCOPE_DENIED");
	}

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set VIGIL_PG_DSN to run."]
async fn invalid_pagination_is_bad_request() {
	let Some(test_db) = test_env().await else {
		return;
	};
	let config = test_config(test_db.dsn().to_string());
	let state = AppState::new(config).await.expect("Failed to initialize app state.");
	let researcher = seed_user(&state.service.db.pool, "alice", "RESEARCHER").await;
	let app = routes::router(state);
	let response = app
		.oneshot(
			Request::builder()
				.uri("/v1/vulnerabilities?page=zero")
				.header(routes::USER_ID_HEADER, researcher.to_string())
				.header(routes::ROLE_HEADER, "RESEARCHER")
				.body(Body::empty())
				.expect("Failed to build request."),
		)
		.await
		.expect("Failed to call list.");

	assert_eq!(response.status(), StatusCode::BAD_REQUEST);

	let json = read_json(response).await;

	assert_eq!(json["error_code"], "INVALID_PARAMETER");

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}
