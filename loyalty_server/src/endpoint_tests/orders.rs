use actix_web::{http::StatusCode, test::TestRequest, web, web::ServiceConfig};
use loyalty_common::Points;
use loyalty_engine::{
    accrual::{OrderQueue, OrderQueueProducer},
    db_types::{Order, OrderStatusType},
    traits::InsertOrderResult,
    AccountApi,
    OrderFlowApi,
};

use super::{
    helpers::{issue_token, order, send_request, with_token},
    mocks::MockAccountManager,
};
use crate::routes::{MyOrdersRoute, UploadOrderRoute};

fn configure(upload_db: MockAccountManager, queue: OrderQueueProducer) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg| {
        cfg.service(UploadOrderRoute::<MockAccountManager>::new())
            .app_data(web::Data::new(OrderFlowApi::new(upload_db, queue)));
    }
}

fn configure_history(db: MockAccountManager) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg| {
        cfg.service(MyOrdersRoute::<MockAccountManager>::new()).app_data(web::Data::new(AccountApi::new(db)));
    }
}

fn upload(number: &str, user_id: i64) -> TestRequest {
    let token = issue_token(user_id, "alice");
    with_token(TestRequest::post().uri("/api/user/orders"), &token)
        .insert_header(("Content-Type", "text/plain"))
        .set_payload(number.to_string())
}

#[actix_web::test]
async fn new_orders_are_accepted_and_queued() {
    let _ = env_logger::try_init().ok();
    let queue = OrderQueue::new();
    let mut db = MockAccountManager::new();
    db.expect_insert_order()
        .withf(|o| o.number.as_str() == "12345678903" && o.user_id == 1)
        .times(1)
        .returning(|o| {
            Ok(InsertOrderResult::Inserted(Order {
                number: o.number,
                user_id: o.user_id,
                status: OrderStatusType::New,
                accrual: Points::zero(),
                uploaded_at: o.uploaded_at,
            }))
        });
    let res = send_request(upload("12345678903\n", 1), configure(db, queue.producer())).await;
    assert_eq!(res.status, StatusCode::ACCEPTED);
    assert_eq!(queue.len(), 1);
}

#[actix_web::test]
async fn repeat_upload_by_owner_is_ok() {
    let queue = OrderQueue::new();
    let mut db = MockAccountManager::new();
    db.expect_insert_order().returning(|o| {
        Ok(InsertOrderResult::AlreadyExists(order(o.number.as_str(), 1, OrderStatusType::Processing, Points::zero())))
    });
    let res = send_request(upload("12345678903", 1), configure(db, queue.producer())).await;
    assert_eq!(res.status, StatusCode::OK);
    assert!(queue.is_empty());
}

#[actix_web::test]
async fn upload_of_another_users_order_conflicts() {
    let queue = OrderQueue::new();
    let mut db = MockAccountManager::new();
    db.expect_insert_order().returning(|o| {
        Ok(InsertOrderResult::AlreadyExists(order(o.number.as_str(), 2, OrderStatusType::New, Points::zero())))
    });
    let res = send_request(upload("12345678903", 1), configure(db, queue.producer())).await;
    assert_eq!(res.status, StatusCode::CONFLICT);
    assert!(queue.is_empty());
}

#[actix_web::test]
async fn luhn_failures_are_unprocessable() {
    let queue = OrderQueue::new();
    let db = MockAccountManager::new();
    let res = send_request(upload("12345678901", 1), configure(db, queue.producer())).await;
    assert_eq!(res.status, StatusCode::UNPROCESSABLE_ENTITY);
    let db = MockAccountManager::new();
    let res = send_request(upload("1234-5678-903", 1), configure(db, queue.producer())).await;
    assert_eq!(res.status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[actix_web::test]
async fn empty_upload_is_a_bad_request() {
    let queue = OrderQueue::new();
    let db = MockAccountManager::new();
    let res = send_request(upload("   ", 1), configure(db, queue.producer())).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn upload_requires_a_token() {
    let queue = OrderQueue::new();
    let db = MockAccountManager::new();
    let req = TestRequest::post().uri("/api/user/orders").set_payload("12345678903");
    let res = send_request(req, configure(db, queue.producer())).await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    assert_eq!(res.json()["error"], "Authentication Error. No access token was provided.");

    let db = MockAccountManager::new();
    let req = with_token(TestRequest::post().uri("/api/user/orders"), "not.a.token").set_payload("12345678903");
    let res = send_request(req, configure(db, queue.producer())).await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    assert!(queue.is_empty());
}

#[actix_web::test]
async fn order_history() {
    let mut db = MockAccountManager::new();
    db.expect_fetch_orders_for_user().withf(|id| *id == 3).returning(|_| {
        Ok(vec![
            order("9278923470", 3, OrderStatusType::Processed, Points::from_hundredths(50_050)),
            order("12345678903", 3, OrderStatusType::Processing, Points::zero()),
            order("79927398713", 3, OrderStatusType::Invalid, Points::zero()),
        ])
    });
    let req = with_token(TestRequest::get().uri("/api/user/orders"), &issue_token(3, "carol"));
    let res = send_request(req, configure_history(db)).await;
    assert_eq!(res.status, StatusCode::OK);
    let json = res.json();
    let orders = json.as_array().unwrap();
    assert_eq!(orders.len(), 3);
    assert_eq!(orders[0]["number"], "9278923470");
    assert_eq!(orders[0]["status"], "PROCESSED");
    assert_eq!(orders[0]["accrual"], 500.5);
    assert_eq!(orders[0]["uploaded_at"], "2024-06-01T12:00:00Z");
    assert_eq!(orders[1]["status"], "PROCESSING");
    assert!(orders[1].get("accrual").is_none());
    assert_eq!(orders[2]["status"], "INVALID");
    assert!(orders[2].get("accrual").is_none());
}

#[actix_web::test]
async fn empty_order_history() {
    let mut db = MockAccountManager::new();
    db.expect_fetch_orders_for_user().returning(|_| Ok(vec![]));
    let req = with_token(TestRequest::get().uri("/api/user/orders"), &issue_token(3, "carol"));
    let res = send_request(req, configure_history(db)).await;
    assert_eq!(res.status, StatusCode::NO_CONTENT);
    assert!(res.body.is_empty());
}
