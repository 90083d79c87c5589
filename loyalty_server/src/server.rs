use std::time::Duration;

use actix_web::{
    dev::Server,
    error::JsonPayloadError,
    http::KeepAlive,
    middleware::Logger,
    web,
    App,
    HttpRequest,
    HttpServer,
};
use log::*;
use loyalty_engine::{
    accrual::{restore_pending_orders, AccrualClient, OrderQueue, OrderQueueProducer},
    AccountApi,
    AuthApi,
    OrderFlowApi,
    SqliteDatabase,
};

use crate::{
    auth::{PasswordHasher, TokenIssuer},
    config::ServerConfig,
    errors::ServerError,
    reconciliation_worker::start_reconciliation_worker,
    routes::{
        health,
        LoginRoute,
        MyBalanceRoute,
        MyOrdersRoute,
        MyWithdrawalsRoute,
        RegisterRoute,
        UploadOrderRoute,
        WithdrawRoute,
    },
};

const MAX_DB_CONNECTIONS: u32 = 25;

/// Opens the database, restores unfinished orders to the reconciliation queue, starts the reconciliation worker and
/// then serves HTTP requests until the server is stopped.
pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, MAX_DB_CONNECTIONS)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    db.run_migrations().await.map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let client = AccrualClient::new(config.accrual.client_config())
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let queue = OrderQueue::new();
    let producer = queue.producer();
    let restored = restore_pending_orders(&db, &producer)
        .await
        .map_err(|e| ServerError::InitializeError(format!("Could not restore unfinished orders. {e}")))?;
    debug!("🚀️ {restored} orders are awaiting reconciliation");
    let _worker = start_reconciliation_worker(db.clone(), client, queue, config.accrual.reconciliation_options());
    let srv = create_server_instance(config, db, producer)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

pub fn create_server_instance(
    config: ServerConfig,
    db: SqliteDatabase,
    producer: OrderQueueProducer,
) -> Result<Server, ServerError> {
    let srv = HttpServer::new(move || {
        let orders_api = OrderFlowApi::new(db.clone(), producer.clone());
        let accounts_api = AccountApi::new(db.clone());
        let auth_api = AuthApi::new(db.clone());
        let jwt_signer = TokenIssuer::new(&config.auth);
        let hasher = PasswordHasher::new(config.auth.password_key.clone());
        App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("loyalty::access_log"))
            .app_data(web::JsonConfig::default().error_handler(json_error_handler))
            .app_data(web::Data::new(orders_api))
            .app_data(web::Data::new(accounts_api))
            .app_data(web::Data::new(auth_api))
            .app_data(web::Data::new(jwt_signer))
            .app_data(web::Data::new(hasher))
            .service(health)
            .service(RegisterRoute::<SqliteDatabase>::new())
            .service(LoginRoute::<SqliteDatabase>::new())
            .service(UploadOrderRoute::<SqliteDatabase>::new())
            .service(MyOrdersRoute::<SqliteDatabase>::new())
            .service(MyBalanceRoute::<SqliteDatabase>::new())
            .service(WithdrawRoute::<SqliteDatabase>::new())
            .service(MyWithdrawalsRoute::<SqliteDatabase>::new())
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((config.host.as_str(), config.port))?
    .run();
    Ok(srv)
}

/// Malformed JSON bodies become 400 responses with the usual `{"error": ...}` body.
pub fn json_error_handler(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    debug!("💻️ Rejected request body. {err}");
    ServerError::InvalidRequestBody(err.to_string()).into()
}
