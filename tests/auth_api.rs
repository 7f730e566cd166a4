use actix_web::{test, web, App, HttpResponse};
use plenimind_auth::{
    auth::Credential, AppError, AuthState, AuthenticatedUser, Identity, InMemoryDirectory,
    ResourceOwnerCheck, Settings, TokenPair,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

const EMAIL: &str = "ana@example.com";
const PASSWORD: &str = "Calm1@breath";

#[derive(Deserialize)]
struct LoginRequest {
    email: String,
    password: String,
}

#[derive(Deserialize)]
struct RefreshRequest {
    refresh_token: String,
}

async fn login(
    state: web::Data<AuthState>,
    body: web::Json<LoginRequest>,
) -> Result<HttpResponse, AppError> {
    let pair = state.auth_service.login(&body.email, &body.password).await?;
    Ok(HttpResponse::Ok().json(pair))
}

async fn refresh(
    state: web::Data<AuthState>,
    body: web::Json<RefreshRequest>,
) -> Result<HttpResponse, AppError> {
    let pair = state.auth_service.refresh(&body.refresh_token).await?;
    Ok(HttpResponse::Ok().json(pair))
}

async fn read_metrics(
    user: AuthenticatedUser,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let owner = Identity::from(path.into_inner());
    user.authorize(&owner)?;
    Ok(HttpResponse::Ok().json(json!({ "owner": owner, "steps": 8200 })))
}

async fn read_record(
    user: AuthenticatedUser,
    directory: web::Data<InMemoryDirectory>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let record_id = path.into_inner();
    let owner = match directory.owner_of(&record_id).await? {
        Some(owner) => owner,
        None => return Ok(HttpResponse::NotFound().finish()),
    };
    user.authorize(&owner)?;
    Ok(HttpResponse::Ok().json(json!({ "record": record_id })))
}

async fn setup() -> (web::Data<AuthState>, Arc<InMemoryDirectory>) {
    let directory = Arc::new(InMemoryDirectory::new());
    let config = Settings::new_for_test().unwrap();
    let state = AuthState::new(config, directory.clone()).unwrap();

    let credential =
        Credential::register("u1".into(), PASSWORD, &state.hasher, &state.policy).unwrap();
    directory.insert(EMAIL, credential).await.unwrap();

    (web::Data::new(state), directory)
}

macro_rules! app {
    ($state:expr, $directory:expr) => {
        test::init_service(
            App::new()
                .app_data($state.clone())
                .app_data(web::Data::from($directory.clone()))
                .route("/auth/login", web::post().to(login))
                .route("/auth/refresh", web::post().to(refresh))
                .route("/users/{uid}/metrics", web::get().to(read_metrics))
                .route("/records/{id}", web::get().to(read_record)),
        )
        .await
    };
}

#[actix_web::test]
async fn test_login_then_access_own_resource() {
    let (state, directory) = setup().await;
    let app = app!(state, directory);

    let resp = test::TestRequest::post()
        .uri("/auth/login")
        .set_json(json!({ "email": EMAIL, "password": PASSWORD }))
        .send_request(&app)
        .await;
    assert_eq!(resp.status(), 200);
    let pair: TokenPair = test::read_body_json(resp).await;
    assert_eq!(pair.token_type, "bearer");

    let resp = test::TestRequest::get()
        .uri("/users/u1/metrics")
        .insert_header(("Authorization", format!("Bearer {}", pair.access_token)))
        .send_request(&app)
        .await;
    assert_eq!(resp.status(), 200);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["owner"], "u1");
}

#[actix_web::test]
async fn test_other_users_resource_is_forbidden() {
    let (state, directory) = setup().await;
    let app = app!(state, directory);
    let token = state.tokens.issue_access(&"u1".into()).unwrap();

    let resp = test::TestRequest::get()
        .uri("/users/u2/metrics")
        .insert_header(("Authorization", format!("Bearer {}", token)))
        .send_request(&app)
        .await;
    assert_eq!(resp.status(), 403);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"]["code"], "AUTH_003");
}

#[actix_web::test]
async fn test_missing_or_bad_credentials_are_unauthorized() {
    let (state, directory) = setup().await;
    let app = app!(state, directory);
    let refresh_token = state.tokens.issue_refresh(&"u1".into()).unwrap();

    let headers = vec![
        None,
        Some("Basic dXNlcjpwYXNz".to_string()),
        Some("Bearer not.a.token".to_string()),
        Some(format!("Bearer {}", refresh_token)),
    ];

    for header in headers {
        let mut req = test::TestRequest::get().uri("/users/u1/metrics");
        if let Some(value) = &header {
            req = req.insert_header(("Authorization", value.as_str()));
        }
        let resp = req.send_request(&app).await;
        assert_eq!(resp.status(), 401, "header: {:?}", header);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"]["code"], "AUTH_002");
        assert_eq!(body["error"]["message"], "Invalid authentication credentials");
    }
}

#[actix_web::test]
async fn test_refresh_endpoint_rotates_tokens() {
    let (state, directory) = setup().await;
    let app = app!(state, directory);
    let original = state.tokens.issue_pair(&"u1".into()).unwrap();

    let resp = test::TestRequest::post()
        .uri("/auth/refresh")
        .set_json(json!({ "refresh_token": original.refresh_token }))
        .send_request(&app)
        .await;
    assert_eq!(resp.status(), 200);
    let rotated: TokenPair = test::read_body_json(resp).await;
    assert_ne!(rotated.refresh_token, original.refresh_token);

    let resp = test::TestRequest::post()
        .uri("/auth/refresh")
        .set_json(json!({ "refresh_token": original.access_token }))
        .send_request(&app)
        .await;
    assert_eq!(resp.status(), 401);
}

#[actix_web::test]
async fn test_deleted_user_and_bad_password_are_indistinguishable() {
    let (state, directory) = setup().await;
    let app = app!(state, directory);
    let pair = state.tokens.issue_pair(&"u1".into()).unwrap();

    let bad_login = test::TestRequest::post()
        .uri("/auth/login")
        .set_json(json!({ "email": EMAIL, "password": "Wrong1@pass" }))
        .send_request(&app)
        .await;
    assert_eq!(bad_login.status(), 401);
    let bad_login: Value = test::read_body_json(bad_login).await;

    assert!(directory.remove(&"u1".into()).await);
    let gone = test::TestRequest::post()
        .uri("/auth/refresh")
        .set_json(json!({ "refresh_token": pair.refresh_token }))
        .send_request(&app)
        .await;
    assert_eq!(gone.status(), 401);
    let gone: Value = test::read_body_json(gone).await;

    assert_eq!(bad_login, gone);
}

#[actix_web::test]
async fn test_missing_stored_digest_is_internal_error() {
    let (state, directory) = setup().await;
    let app = app!(state, directory);
    directory
        .insert_record(plenimind_auth::StoredCredential {
            identity: "u9".into(),
            email: "broken@example.com".into(),
            password_hash: None,
        })
        .await
        .unwrap();

    let resp = test::TestRequest::post()
        .uri("/auth/login")
        .set_json(json!({ "email": "broken@example.com", "password": PASSWORD }))
        .send_request(&app)
        .await;
    assert_eq!(resp.status(), 500);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"]["message"], "Error during authentication");
}

#[actix_web::test]
async fn test_resource_scoped_route() {
    let (state, directory) = setup().await;
    directory.assign_resource("heart-rate-u1", "u1".into()).await;
    directory.assign_resource("heart-rate-u2", "u2".into()).await;
    let app = app!(state, directory);
    let bearer = format!("Bearer {}", state.tokens.issue_access(&"u1".into()).unwrap());

    let own = test::TestRequest::get()
        .uri("/records/heart-rate-u1")
        .insert_header(("Authorization", bearer.as_str()))
        .send_request(&app)
        .await;
    assert_eq!(own.status(), 200);

    let foreign = test::TestRequest::get()
        .uri("/records/heart-rate-u2")
        .insert_header(("Authorization", bearer.as_str()))
        .send_request(&app)
        .await;
    assert_eq!(foreign.status(), 403);

    let unknown = test::TestRequest::get()
        .uri("/records/heart-rate-u3")
        .insert_header(("Authorization", bearer.as_str()))
        .send_request(&app)
        .await;
    assert_eq!(unknown.status(), 404);
}
