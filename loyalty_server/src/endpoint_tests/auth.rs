use actix_web::{http::StatusCode, test::TestRequest, web, web::ServiceConfig};
use loyalty_engine::{traits::AuthApiError, AuthApi};

use super::{
    helpers::{get_auth_config, send_request, user},
    mocks::MockAuthManager,
};
use crate::{
    auth::{PasswordHasher, TokenIssuer},
    routes::{LoginRoute, RegisterRoute},
};

fn configure(auth_manager: MockAuthManager) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg| {
        cfg.service(RegisterRoute::<MockAuthManager>::new())
            .service(LoginRoute::<MockAuthManager>::new())
            .app_data(web::Data::new(AuthApi::new(auth_manager)));
    }
}

fn credentials(login: &str, password: &str) -> serde_json::Value {
    serde_json::json!({ "login": login, "password": password })
}

fn bearer_user_id(header: &str) -> i64 {
    let token = header.strip_prefix("Bearer ").expect("Bearer token");
    TokenIssuer::new(&get_auth_config()).validate_token(token).unwrap().user_id()
}

#[actix_web::test]
async fn register_issues_a_token() {
    let _ = env_logger::try_init().ok();
    let expected_hash = PasswordHasher::new(get_auth_config().password_key).hash("correct horse").unwrap();
    let mut auth = MockAuthManager::new();
    auth.expect_create_user()
        .withf(move |login, hash| login == "alice" && hash == expected_hash)
        .times(1)
        .returning(|login, _| Ok(user(42, login)));
    let req = TestRequest::post().uri("/api/user/register").set_json(credentials("alice", "correct horse"));
    let res = send_request(req, configure(auth)).await;
    assert_eq!(res.status, StatusCode::OK);
    let header = res.headers.get("Authorization").expect("Authorization header").to_str().unwrap();
    assert_eq!(bearer_user_id(header), 42);
}

#[actix_web::test]
async fn register_taken_login() {
    let mut auth = MockAuthManager::new();
    auth.expect_create_user().returning(|login, _| Err(AuthApiError::LoginTaken(login.to_string())));
    let req = TestRequest::post().uri("/api/user/register").set_json(credentials("alice", "pw"));
    let res = send_request(req, configure(auth)).await;
    assert_eq!(res.status, StatusCode::CONFLICT);
    assert!(res.headers.get("Authorization").is_none());
    assert_eq!(res.json()["error"], "The login 'alice' is already taken");
}

#[actix_web::test]
async fn register_malformed_body() {
    let auth = MockAuthManager::new();
    let req = TestRequest::post()
        .uri("/api/user/register")
        .insert_header(("Content-Type", "application/json"))
        .set_payload("{\"login\": \"alice\"");
    let res = send_request(req, configure(auth)).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert!(res.json()["error"].as_str().unwrap().starts_with("Could not read request body"));
}

#[actix_web::test]
async fn register_requires_a_password() {
    let auth = MockAuthManager::new();
    let req = TestRequest::post().uri("/api/user/register").set_json(credentials("alice", ""));
    let res = send_request(req, configure(auth)).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn login_success() {
    let mut auth = MockAuthManager::new();
    auth.expect_fetch_user_by_login()
        .withf(|login| login == "bob")
        .times(1)
        .returning(|login| Ok(Some(user(7, login))));
    let req = TestRequest::post().uri("/api/user/login").set_json(credentials("bob", "correct horse"));
    let res = send_request(req, configure(auth)).await;
    assert_eq!(res.status, StatusCode::OK);
    let header = res.headers.get("Authorization").expect("Authorization header").to_str().unwrap();
    assert_eq!(bearer_user_id(header), 7);
}

#[actix_web::test]
async fn login_wrong_password() {
    let mut auth = MockAuthManager::new();
    auth.expect_fetch_user_by_login().returning(|login| Ok(Some(user(7, login))));
    let req = TestRequest::post().uri("/api/user/login").set_json(credentials("bob", "battery staple"));
    let res = send_request(req, configure(auth)).await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    assert!(res.headers.get("Authorization").is_none());
}

#[actix_web::test]
async fn login_unknown_user() {
    let mut auth = MockAuthManager::new();
    auth.expect_fetch_user_by_login().returning(|_| Ok(None));
    let req = TestRequest::post().uri("/api/user/login").set_json(credentials("nobody", "correct horse"));
    let res = send_request(req, configure(auth)).await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
}
