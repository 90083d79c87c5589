//! Request handler definitions
//!
//! Define each route and it handler here.
//! Handlers that are more than a line or two MUST go into a separate module. Keep this module neat and tidy 🙏
//!
//! A note about performance:
//! Since each worker thread processes its requests sequentially, handlers which block the current thread will cause the
//! current worker to stop processing new requests. Any long, non-cpu-bound operation (database calls in particular)
//! must be awaited, never blocked on.
//!
//! Every route under `/api/user` except `register` and `login` requires an `Authorization: Bearer <token>` header.
//! Handlers opt into this simply by taking a [`JwtClaims`] argument.
use actix_web::{get, http::header::AUTHORIZATION, web, HttpResponse, Responder};
use log::*;
use loyalty_engine::{
    db_types::UserAccount,
    traits::{AccountManagement, AuthManagement},
    AccountApi,
    AuthApi,
    OrderFlowApi,
    UploadResult,
};

use crate::{
    auth::{bearer_header, JwtClaims, PasswordHasher, TokenIssuer},
    data_objects::{BalanceResponse, Credentials, JsonResponse, OrderResponse, WithdrawRequest, WithdrawalResponse},
    errors::ServerError,
};

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+) => {
        paste::paste! { pub struct [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ >( $( core::marker::PhantomData<fn() -> [< T $bounds:camel> ] >,)+ );}
        paste::paste! { impl< $( [< T $bounds:camel> ],)+ > [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ > {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self($( core::marker::PhantomData::<fn() -> [< T $bounds:camel> ] >,)+)
            }
        }}
        paste::paste! { impl<$( [< T $bounds:camel >] , )+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$([<T $bounds:camel>],)+>
        where
            $([<T $bounds:camel>]: $bounds + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::< $( [< T $bounds:camel >], )+>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------------   Auth  ----------------------------------------------------
route!(register => Post "/api/user/register" impl AuthManagement);
/// Route handler for user registration
///
/// Expects a JSON body `{"login": "...", "password": "..."}`. On success the new user is logged in straight away: the
/// response carries an access token in the `Authorization` header.
///
/// * 400 if the body is malformed or either field is empty
/// * 409 if the login is already taken
pub async fn register<A: AuthManagement>(
    body: web::Json<Credentials>,
    api: web::Data<AuthApi<A>>,
    hasher: web::Data<PasswordHasher>,
    signer: web::Data<TokenIssuer>,
) -> Result<HttpResponse, ServerError> {
    let credentials = body.into_inner();
    trace!("💻️ Received registration request for {}", credentials.login);
    if !credentials.is_complete() {
        return Err(ServerError::InvalidRequestBody("Both login and password are required".to_string()));
    }
    let hash = hasher.hash(&credentials.password)?;
    let user = api.register(credentials.login.trim(), &hash).await?;
    info!("💻️ New user #{} registered as '{}'", user.id, user.login);
    authorized_response(&user, signer.as_ref())
}

route!(login => Post "/api/user/login" impl AuthManagement);
/// Route handler for user login
///
/// Same body as `register`. Returns a fresh access token in the `Authorization` header, or 401 if the login and
/// password do not match.
pub async fn login<A: AuthManagement>(
    body: web::Json<Credentials>,
    api: web::Data<AuthApi<A>>,
    hasher: web::Data<PasswordHasher>,
    signer: web::Data<TokenIssuer>,
) -> Result<HttpResponse, ServerError> {
    let credentials = body.into_inner();
    trace!("💻️ Received login request for {}", credentials.login);
    if !credentials.is_complete() {
        return Err(ServerError::InvalidRequestBody("Both login and password are required".to_string()));
    }
    let hash = hasher.hash(&credentials.password)?;
    let user = api.authenticate(credentials.login.trim(), &hash).await?;
    debug!("💻️ User #{} logged in", user.id);
    authorized_response(&user, signer.as_ref())
}

fn authorized_response(user: &UserAccount, signer: &TokenIssuer) -> Result<HttpResponse, ServerError> {
    let token = signer.issue_token(user)?;
    trace!("💻️ Issued access token for user #{}", user.id);
    Ok(HttpResponse::Ok()
        .insert_header((AUTHORIZATION, bearer_header(&token)))
        .json(JsonResponse::success(format!("Logged in as {}", user.login))))
}

//----------------------------------------------   Orders  ----------------------------------------------------
route!(upload_order => Post "/api/user/orders" impl AccountManagement);
/// Route handler for order uploads
///
/// The body is the bare order number as plain text.
///
/// * 202 the order is new and has been queued for reconciliation
/// * 200 this user has already uploaded the order
/// * 400 the body is empty
/// * 409 another user has already uploaded the order
/// * 422 the order number is not a valid Luhn number
pub async fn upload_order<B: AccountManagement>(
    claims: JwtClaims,
    body: String,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ POST order for user #{}", claims.user_id());
    match api.upload_order(claims.user_id(), &body).await? {
        UploadResult::Accepted(order) => {
            Ok(HttpResponse::Accepted().json(JsonResponse::success(format!("Order {} accepted", order.number))))
        },
        UploadResult::AlreadyUploaded(order) => {
            Ok(HttpResponse::Ok().json(JsonResponse::success(format!("Order {} was already uploaded", order.number))))
        },
    }
}

route!(my_orders => Get "/api/user/orders" impl AccountManagement);
/// Route handler for the order history
///
/// Lists the authenticated user's orders, oldest upload first. `accrual` is only included for `PROCESSED` orders.
/// Returns 204 if the user has not uploaded any orders.
pub async fn my_orders<B: AccountManagement>(
    claims: JwtClaims,
    api: web::Data<AccountApi<B>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ GET orders for user #{}", claims.user_id());
    let orders = api.orders_for_user(claims.user_id()).await?;
    if orders.is_empty() {
        return Ok(HttpResponse::NoContent().finish());
    }
    let orders = orders.into_iter().map(OrderResponse::from).collect::<Vec<_>>();
    Ok(HttpResponse::Ok().json(orders))
}

//----------------------------------------------   Balance  ----------------------------------------------------
route!(my_balance => Get "/api/user/balance" impl AccountManagement);
pub async fn my_balance<B: AccountManagement>(
    claims: JwtClaims,
    api: web::Data<AccountApi<B>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ GET balance for user #{}", claims.user_id());
    let balance = api.balance(claims.user_id()).await?;
    Ok(HttpResponse::Ok().json(BalanceResponse::from(balance)))
}

route!(withdraw => Post "/api/user/balance/withdraw" impl AccountManagement);
/// Route handler for spending points
///
/// Expects a JSON body `{"order": "<order number>", "sum": <points>}`.
///
/// * 402 the balance is too low. Nothing is changed.
/// * 422 the order number fails the Luhn check, or the sum is zero
/// * 400 the body is malformed (negative sums included)
pub async fn withdraw<B: AccountManagement>(
    claims: JwtClaims,
    body: web::Json<WithdrawRequest>,
    api: web::Data<AccountApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let WithdrawRequest { order, sum } = body.into_inner();
    debug!("💻️ POST withdraw {sum} for order {order} by user #{}", claims.user_id());
    let balance = api.withdraw(claims.user_id(), &order, sum).await?;
    Ok(HttpResponse::Ok().json(BalanceResponse::from(balance)))
}

route!(my_withdrawals => Get "/api/user/withdrawals" impl AccountManagement);
pub async fn my_withdrawals<B: AccountManagement>(
    claims: JwtClaims,
    api: web::Data<AccountApi<B>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ GET withdrawals for user #{}", claims.user_id());
    let withdrawals = api.withdrawals(claims.user_id()).await?;
    if withdrawals.is_empty() {
        return Ok(HttpResponse::NoContent().finish());
    }
    let withdrawals = withdrawals.into_iter().map(WithdrawalResponse::from).collect::<Vec<_>>();
    Ok(HttpResponse::Ok().json(withdrawals))
}
