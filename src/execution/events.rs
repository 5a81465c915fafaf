//! Unified event type flowing through the execution engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::accounts::AccountStateEvent;
use crate::orders::OrderEventAny;
use crate::positions::PositionEventAny;

/// Any event the engine can receive or forward: order lifecycle events from
/// the brokerage, position events the engine derives from fills, and account
/// state snapshots.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum ExecutionEvent {
    Order(OrderEventAny),
    Position(PositionEventAny),
    Account(AccountStateEvent),
}

impl ExecutionEvent {
    /// Get the event timestamp
    pub fn ts_event(&self) -> DateTime<Utc> {
        match self {
            ExecutionEvent::Order(e) => e.ts_event(),
            ExecutionEvent::Position(e) => e.ts_event(),
            ExecutionEvent::Account(e) => e.ts_event,
        }
    }
}

impl From<OrderEventAny> for ExecutionEvent {
    fn from(e: OrderEventAny) -> Self {
        ExecutionEvent::Order(e)
    }
}

impl From<PositionEventAny> for ExecutionEvent {
    fn from(e: PositionEventAny) -> Self {
        ExecutionEvent::Position(e)
    }
}

impl From<AccountStateEvent> for ExecutionEvent {
    fn from(e: AccountStateEvent) -> Self {
        ExecutionEvent::Account(e)
    }
}
