use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};

use tokio::time::Instant;

use crate::{
    accrual::{AccrualOutcome, AccrualSource},
    db_types::OrderNumber,
};

/// An [`AccrualSource`] that plays back pre-recorded answers, one per call, for each order. Orders with no answers
/// left are reported as not yet known. Every call is recorded along with the (tokio) time it was made.
#[derive(Debug, Clone, Default)]
pub struct ScriptedSource {
    state: Arc<Mutex<ScriptState>>,
}

#[derive(Debug, Default)]
struct ScriptState {
    scripts: HashMap<OrderNumber, VecDeque<AccrualOutcome>>,
    calls: Vec<(OrderNumber, Instant)>,
    stall: Option<Duration>,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, ScriptState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Appends answers for the given order.
    pub fn script<I: IntoIterator<Item = AccrualOutcome>>(&self, number: &OrderNumber, outcomes: I) {
        self.state().scripts.entry(number.clone()).or_default().extend(outcomes);
    }

    /// Makes every subsequent call take `delay` before answering.
    pub fn stall(&self, delay: Duration) {
        self.state().stall = Some(delay);
    }

    pub fn calls(&self) -> Vec<(OrderNumber, Instant)> {
        self.state().calls.clone()
    }

    pub fn call_count(&self) -> usize {
        self.state().calls.len()
    }
}

impl AccrualSource for ScriptedSource {
    async fn fetch_accrual(&self, number: &OrderNumber) -> AccrualOutcome {
        let (outcome, stall) = {
            let mut state = self.state();
            state.calls.push((number.clone(), Instant::now()));
            let outcome = state.scripts.get_mut(number).and_then(|s| s.pop_front()).unwrap_or(AccrualOutcome::NotYetKnown);
            (outcome, state.stall)
        };
        if let Some(delay) = stall {
            tokio::time::sleep(delay).await;
        }
        outcome
    }
}
