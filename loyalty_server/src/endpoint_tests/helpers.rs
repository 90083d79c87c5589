use std::time::Duration;

use actix_web::{
    http::{header::HeaderMap, StatusCode},
    test,
    test::TestRequest,
    web,
    web::ServiceConfig,
    App,
};
use chrono::Utc;
use log::debug;
use loyalty_common::{Points, Secret};
use loyalty_engine::db_types::{Order, OrderNumber, OrderStatusType, UserAccount};

use crate::{
    auth::{bearer_header, PasswordHasher, TokenIssuer},
    config::AuthConfig,
    server::json_error_handler,
};

// Creates a test `AuthConfig` for issuing tokens. DO NOT re-use these keys anywhere.
pub fn get_auth_config() -> AuthConfig {
    AuthConfig {
        jwt_secret: Secret::new("endpoint-test-jwt-secret-a7e8c2".to_string()),
        password_key: Secret::new("endpoint-test-password-key-91b4".to_string()),
        token_duration: Duration::from_secs(3600),
    }
}

pub fn user(id: i64, login: &str) -> UserAccount {
    let password_hash = PasswordHasher::new(get_auth_config().password_key).hash("correct horse").unwrap();
    UserAccount { id, login: login.to_string(), password_hash, created_at: Utc::now() }
}

pub fn order(number: &str, user_id: i64, status: OrderStatusType, accrual: Points) -> Order {
    Order {
        number: OrderNumber::parse(number).unwrap(),
        user_id,
        status,
        accrual,
        uploaded_at: "2024-06-01T12:00:00Z".parse().unwrap(),
    }
}

pub fn issue_token(user_id: i64, login: &str) -> String {
    TokenIssuer::new(&get_auth_config()).issue_token(&user(user_id, login)).unwrap()
}

pub fn with_token(req: TestRequest, token: &str) -> TestRequest {
    req.insert_header(("Authorization", bearer_header(token)))
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl TestResponse {
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).unwrap()
    }
}

pub async fn send_request<F>(req: TestRequest, configure: F) -> TestResponse
where F: FnOnce(&mut ServiceConfig) {
    let config = get_auth_config();
    let app = App::new()
        .app_data(web::JsonConfig::default().error_handler(json_error_handler))
        .app_data(web::Data::new(TokenIssuer::new(&config)))
        .app_data(web::Data::new(PasswordHasher::new(config.password_key.clone())))
        .configure(configure);
    let service = test::init_service(app).await;
    debug!("Making request");
    let res = test::call_service(&service, req.to_request()).await;
    let status = res.status();
    let headers = res.headers().clone();
    let body = String::from_utf8_lossy(&test::read_body(res).await).into_owned();
    TestResponse { status, headers, body }
}
