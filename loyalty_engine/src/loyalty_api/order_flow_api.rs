use std::fmt::Debug;

use log::*;

use crate::{
    accrual::OrderQueueProducer,
    db_types::{NewOrder, Order, OrderNumber},
    loyalty_api::errors::OrderFlowError,
    traits::{AccountManagement, InsertOrderResult},
};

/// The outcome of a successful order upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadResult {
    /// The order is new. It has been stored and queued for reconciliation.
    Accepted(Order),
    /// The same user uploaded this order before. Nothing changed.
    AlreadyUploaded(Order),
}

/// `OrderFlowApi` is the entry point for orders into the system. It stores uploaded orders and hands each new one to
/// the reconciliation queue exactly once.
pub struct OrderFlowApi<B> {
    db: B,
    queue: OrderQueueProducer,
}

impl<B> Debug for OrderFlowApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderFlowApi ({} orders pending)", self.queue.len())
    }
}

impl<B> OrderFlowApi<B> {
    pub fn new(db: B, queue: OrderQueueProducer) -> Self {
        Self { db, queue }
    }
}

impl<B> OrderFlowApi<B>
where B: AccountManagement
{
    /// Uploads an order number on behalf of `user_id`.
    ///
    /// Surrounding whitespace is ignored. The number must be made of digits and pass the Luhn check. An order can
    /// only belong to one user: uploading a number that another user has already uploaded is an error, while
    /// uploading your own order again is not.
    pub async fn upload_order(&self, user_id: i64, number: &str) -> Result<UploadResult, OrderFlowError> {
        let number = number.trim();
        if number.is_empty() {
            return Err(OrderFlowError::EmptyOrderNumber);
        }
        let number = OrderNumber::parse(number).map_err(|e| OrderFlowError::InvalidOrderNumber(e.0))?;
        match self.db.insert_order(NewOrder::new(number, user_id)).await? {
            InsertOrderResult::Inserted(order) => {
                debug!("🔄️📦️ Order {} uploaded by user #{user_id}", order.number);
                self.queue.enqueue(order.clone());
                Ok(UploadResult::Accepted(order))
            },
            InsertOrderResult::AlreadyExists(order) if order.user_id == user_id => {
                trace!("🔄️📦️ User #{user_id} uploaded order {} again", order.number);
                Ok(UploadResult::AlreadyUploaded(order))
            },
            InsertOrderResult::AlreadyExists(order) => {
                info!(
                    "🔄️📦️ User #{user_id} tried to upload order {}, which belongs to user #{}",
                    order.number, order.user_id
                );
                Err(OrderFlowError::OwnedByAnotherUser(order.number))
            },
        }
    }
}
