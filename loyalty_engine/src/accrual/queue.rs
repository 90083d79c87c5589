//! The pending order queue.
//!
//! A multi-producer, single-consumer FIFO built on an unbounded tokio channel. Producers never block. The consumer
//! ([`OrderQueue`]) waits for the next item with [`OrderQueue::next`].
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use log::*;
use tokio::{sync::mpsc, time::Instant};

use crate::db_types::Order;

/// An order waiting for reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingOrder {
    pub order: Order,
    /// How many times the worker has tried to reconcile this order so far.
    pub attempts: u32,
    /// How many of those attempts could not find the order in storage.
    pub missing_reads: u32,
    /// The order must not be attempted before this instant.
    pub not_before: Option<Instant>,
}

impl PendingOrder {
    pub fn new(order: Order) -> Self {
        Self { order, attempts: 0, missing_reads: 0, not_before: None }
    }

    /// The same order, one attempt later, eligible again at `not_before`.
    pub fn retry(self, not_before: Option<Instant>) -> Self {
        Self { attempts: self.attempts.saturating_add(1), not_before, ..self }
    }

    /// Like [`PendingOrder::retry`], but also counts a failed storage lookup.
    pub fn retry_missing(self, not_before: Option<Instant>) -> Self {
        let missing_reads = self.missing_reads.saturating_add(1);
        Self { missing_reads, ..self.retry(not_before) }
    }
}

pub struct OrderQueue {
    receiver: mpsc::UnboundedReceiver<PendingOrder>,
    sender: mpsc::UnboundedSender<PendingOrder>,
    depth: Arc<AtomicUsize>,
}

impl Default for OrderQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl OrderQueue {
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self { receiver, sender, depth: Arc::new(AtomicUsize::new(0)) }
    }

    pub fn producer(&self) -> OrderQueueProducer {
        OrderQueueProducer { sender: self.sender.clone(), depth: Arc::clone(&self.depth) }
    }

    /// Waits for the next order. The queue keeps a sender of its own, so this only returns `None` if the channel has
    /// been closed.
    pub async fn next(&mut self) -> Option<PendingOrder> {
        let item = self.receiver.recv().await?;
        self.depth.fetch_sub(1, Ordering::SeqCst);
        Some(item)
    }

    /// Takes the next order if one is immediately available.
    pub fn try_next(&mut self) -> Option<PendingOrder> {
        let item = self.receiver.try_recv().ok()?;
        self.depth.fetch_sub(1, Ordering::SeqCst);
        Some(item)
    }

    /// The number of orders currently waiting.
    pub fn len(&self) -> usize {
        self.depth.load(Ordering::SeqCst)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Clone)]
pub struct OrderQueueProducer {
    sender: mpsc::UnboundedSender<PendingOrder>,
    depth: Arc<AtomicUsize>,
}

impl OrderQueueProducer {
    /// Adds a freshly uploaded order to the back of the queue.
    pub fn enqueue(&self, order: Order) {
        self.push(PendingOrder::new(order));
    }

    /// Puts an order that has already been attempted back at the back of the queue.
    pub fn requeue(&self, item: PendingOrder) {
        self.push(item);
    }

    pub fn len(&self) -> usize {
        self.depth.load(Ordering::SeqCst)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn push(&self, item: PendingOrder) {
        let number = item.order.number.clone();
        self.depth.fetch_add(1, Ordering::SeqCst);
        match self.sender.send(item) {
            Ok(()) => trace!("📬️ Order {number} queued. {} orders pending", self.len()),
            Err(_) => {
                self.depth.fetch_sub(1, Ordering::SeqCst);
                error!(
                    "📬️ The reconciliation queue is closed. Order {number} will only be reconciled after a restart."
                );
            },
        }
    }
}

#[cfg(test)]
mod test {
    use chrono::Utc;
    use loyalty_common::Points;

    use super::*;
    use crate::db_types::{OrderNumber, OrderStatusType};

    fn order(number: &str) -> Order {
        Order {
            number: OrderNumber::parse(number).unwrap(),
            user_id: 1,
            status: OrderStatusType::New,
            accrual: Points::zero(),
            uploaded_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn fifo_across_producers() {
        let _ = env_logger::try_init();
        let mut queue = OrderQueue::new();
        let p1 = queue.producer();
        let p2 = p1.clone();
        p1.enqueue(order("12345678903"));
        p2.enqueue(order("79927398713"));
        p1.enqueue(order("9278923470"));
        assert_eq!(queue.len(), 3);
        let numbers: Vec<String> = [queue.next().await, queue.next().await, queue.next().await]
            .into_iter()
            .map(|i| i.unwrap().order.number.as_str().to_string())
            .collect();
        assert_eq!(numbers, vec!["12345678903", "79927398713", "9278923470"]);
        assert!(queue.is_empty());
        assert!(queue.try_next().is_none());
    }

    #[tokio::test]
    async fn requeued_orders_go_to_the_back() {
        let mut queue = OrderQueue::new();
        let producer = queue.producer();
        producer.enqueue(order("12345678903"));
        producer.enqueue(order("79927398713"));
        let first = queue.next().await.unwrap();
        producer.requeue(first.retry(None));
        assert_eq!(queue.next().await.unwrap().order.number.as_str(), "79927398713");
        let again = queue.next().await.unwrap();
        assert_eq!(again.order.number.as_str(), "12345678903");
        assert_eq!(again.attempts, 1);
    }

    #[tokio::test]
    async fn duplicates_are_not_filtered() {
        let mut queue = OrderQueue::new();
        let producer = queue.producer();
        producer.enqueue(order("12345678903"));
        producer.enqueue(order("12345678903"));
        assert_eq!(producer.len(), 2);
        assert!(queue.try_next().is_some());
        assert!(queue.try_next().is_some());
        assert!(queue.try_next().is_none());
    }

    #[tokio::test]
    async fn next_waits_for_a_producer() {
        let mut queue = OrderQueue::new();
        let producer = queue.producer();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            producer.enqueue(order("12345678903"));
        });
        let item = queue.next().await.unwrap();
        assert_eq!(item.order.number.as_str(), "12345678903");
        handle.await.unwrap();
    }
}
