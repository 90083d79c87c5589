use actix_web::{http::StatusCode, test::TestRequest, web, web::ServiceConfig};
use chrono::Utc;
use loyalty_common::Points;
use loyalty_engine::{
    db_types::{Balance, OrderNumber, Withdrawal},
    traits::AccountApiError,
    AccountApi,
};

use super::{
    helpers::{issue_token, send_request, with_token},
    mocks::MockAccountManager,
};
use crate::routes::{MyBalanceRoute, MyWithdrawalsRoute, WithdrawRoute};

fn configure(db: MockAccountManager) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg| {
        cfg.service(MyBalanceRoute::<MockAccountManager>::new())
            .service(WithdrawRoute::<MockAccountManager>::new())
            .service(MyWithdrawalsRoute::<MockAccountManager>::new())
            .app_data(web::Data::new(AccountApi::new(db)));
    }
}

fn withdraw_request(body: serde_json::Value) -> TestRequest {
    with_token(TestRequest::post().uri("/api/user/balance/withdraw"), &issue_token(5, "dave")).set_json(body)
}

#[actix_web::test]
async fn fetch_balance() {
    let _ = env_logger::try_init().ok();
    let mut db = MockAccountManager::new();
    db.expect_fetch_balance().withf(|id| *id == 5).times(1).returning(|user_id| {
        Ok(Balance { user_id, current: Points::from_hundredths(50_050), withdrawn: Points::from_points(42) })
    });
    let req = with_token(TestRequest::get().uri("/api/user/balance"), &issue_token(5, "dave"));
    let res = send_request(req, configure(db)).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.json(), serde_json::json!({ "current": 500.5, "withdrawn": 42.0 }));
}

#[actix_web::test]
async fn fetch_balance_requires_a_token() {
    let db = MockAccountManager::new();
    let res = send_request(TestRequest::get().uri("/api/user/balance"), configure(db)).await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn withdraw_points() {
    let mut db = MockAccountManager::new();
    db.expect_withdraw()
        .withf(|w| w.user_id == 5 && w.order.as_str() == "2377225624" && w.sum == Points::from_hundredths(75_150))
        .times(1)
        .returning(|w| {
            Ok(Balance { user_id: w.user_id, current: Points::from_hundredths(24_850), withdrawn: w.sum })
        });
    let req = withdraw_request(serde_json::json!({"order": "2377225624", "sum": 751.5}));
    let res = send_request(req, configure(db)).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.json()["current"], 248.5);
}

#[actix_web::test]
async fn withdraw_more_than_the_balance() {
    let mut db = MockAccountManager::new();
    db.expect_withdraw().returning(|w| {
        Err(AccountApiError::InsufficientFunds { balance: Points::from_points(10), requested: w.sum })
    });
    let req = withdraw_request(serde_json::json!({"order": "2377225624", "sum": 11}));
    let res = send_request(req, configure(db)).await;
    assert_eq!(res.status, StatusCode::PAYMENT_REQUIRED);
    assert_eq!(res.json()["error"], "Insufficient funds. Balance: 10.00, requested: 11.00");
}

#[actix_web::test]
async fn withdraw_against_an_invalid_order_number() {
    let db = MockAccountManager::new();
    let req = withdraw_request(serde_json::json!({"order": "2377225625", "sum": 1}));
    let res = send_request(req, configure(db)).await;
    assert_eq!(res.status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[actix_web::test]
async fn withdraw_nothing() {
    let db = MockAccountManager::new();
    let req = withdraw_request(serde_json::json!({"order": "2377225624", "sum": 0}));
    let res = send_request(req, configure(db)).await;
    assert_eq!(res.status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[actix_web::test]
async fn withdraw_malformed_requests() {
    let db = MockAccountManager::new();
    let req = withdraw_request(serde_json::json!({"order": "2377225624", "sum": -5}));
    let res = send_request(req, configure(db)).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    let db = MockAccountManager::new();
    let req = withdraw_request(serde_json::json!({"order": "2377225624"}));
    let res = send_request(req, configure(db)).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn withdrawal_history() {
    let mut db = MockAccountManager::new();
    db.expect_fetch_withdrawals().withf(|id| *id == 5).returning(|user_id| {
        Ok(vec![Withdrawal {
            user_id,
            order: OrderNumber::parse("2377225624").unwrap(),
            sum: Points::from_points(500),
            processed_at: "2024-06-02T08:30:00Z".parse::<chrono::DateTime<Utc>>().unwrap(),
        }])
    });
    let req = with_token(TestRequest::get().uri("/api/user/withdrawals"), &issue_token(5, "dave"));
    let res = send_request(req, configure(db)).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(
        res.json(),
        serde_json::json!([{ "order": "2377225624", "sum": 500.0, "processed_at": "2024-06-02T08:30:00Z" }])
    );
}

#[actix_web::test]
async fn empty_withdrawal_history() {
    let mut db = MockAccountManager::new();
    db.expect_fetch_withdrawals().returning(|_| Ok(vec![]));
    let req = with_token(TestRequest::get().uri("/api/user/withdrawals"), &issue_token(5, "dave"));
    let res = send_request(req, configure(db)).await;
    assert_eq!(res.status, StatusCode::NO_CONTENT);
}
