use loyalty_common::Points;

use crate::db_types::{Order, OrderStatusType};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertOrderResult {
    Inserted(Order),
    AlreadyExists(Order),
}

/// The result of an attempt to move an order into its final `PROCESSED` state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettleResult {
    /// The order is now `PROCESSED`. The owner's balance was increased by the given amount (zero for a zero accrual).
    Settled(Points),
    /// The order was already in the given final state. Nothing was changed.
    AlreadyFinal(OrderStatusType),
}
