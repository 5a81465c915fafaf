//! Order lifecycle events.
//!
//! Every state change an order undergoes is represented by an event. Events
//! originating at the brokerage (submission acknowledgements, fills,
//! cancellations) re-enter the engine and are applied to the order, whose
//! event log is the append-only record of its life.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::types::{
    AccountId, ExecutionId, Label, OrderId, OrderPurpose, OrderSide, OrderType, Quantity, Symbol,
    TimeInForce, VenueOrderId, VenuePositionId,
};

/// Unique identifier for an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventId(pub Uuid);

impl EventId {
    /// Generate a new unique event ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Event produced when an order is created by the factory.
///
/// This is always the first entry in an order's event log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderInitialized {
    pub event_id: EventId,
    pub order_id: OrderId,
    pub symbol: Symbol,
    pub label: Option<Label>,
    pub side: OrderSide,
    pub order_type: OrderType,
    pub purpose: OrderPurpose,
    pub quantity: Quantity,
    pub price: Option<Decimal>,
    pub time_in_force: TimeInForce,
    pub expire_time: Option<DateTime<Utc>>,
    pub ts_event: DateTime<Utc>,
}

/// Event produced when an order fails validation before submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderInvalid {
    pub event_id: EventId,
    pub order_id: OrderId,
    pub reason: String,
    pub ts_event: DateTime<Utc>,
}

impl OrderInvalid {
    pub fn new(order_id: OrderId, reason: impl Into<String>, ts_event: DateTime<Utc>) -> Self {
        Self {
            event_id: EventId::new(),
            order_id,
            reason: reason.into(),
            ts_event,
        }
    }
}

/// Event produced when an order is denied by a pre-submission check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderDenied {
    pub event_id: EventId,
    pub order_id: OrderId,
    pub reason: String,
    pub ts_event: DateTime<Utc>,
}

impl OrderDenied {
    pub fn new(order_id: OrderId, reason: impl Into<String>, ts_event: DateTime<Utc>) -> Self {
        Self {
            event_id: EventId::new(),
            order_id,
            reason: reason.into(),
            ts_event,
        }
    }
}

/// Event produced when an order is submitted to the brokerage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderSubmitted {
    pub event_id: EventId,
    pub order_id: OrderId,
    pub account_id: AccountId,
    pub ts_event: DateTime<Utc>,
}

impl OrderSubmitted {
    pub fn new(order_id: OrderId, account_id: AccountId, ts_event: DateTime<Utc>) -> Self {
        Self {
            event_id: EventId::new(),
            order_id,
            account_id,
            ts_event,
        }
    }
}

/// Event produced when the brokerage accepts an order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderAccepted {
    pub event_id: EventId,
    pub order_id: OrderId,
    pub account_id: AccountId,
    pub ts_event: DateTime<Utc>,
}

impl OrderAccepted {
    pub fn new(order_id: OrderId, account_id: AccountId, ts_event: DateTime<Utc>) -> Self {
        Self {
            event_id: EventId::new(),
            order_id,
            account_id,
            ts_event,
        }
    }
}

/// Event produced when the brokerage rejects an order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderRejected {
    pub event_id: EventId,
    pub order_id: OrderId,
    pub account_id: AccountId,
    pub reason: String,
    pub ts_event: DateTime<Utc>,
}

impl OrderRejected {
    pub fn new(
        order_id: OrderId,
        account_id: AccountId,
        reason: impl Into<String>,
        ts_event: DateTime<Utc>,
    ) -> Self {
        Self {
            event_id: EventId::new(),
            order_id,
            account_id,
            reason: reason.into(),
            ts_event,
        }
    }
}

/// Event produced when an order goes live in the venue's book.
///
/// Carries the first sighting of the venue-assigned order id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderWorking {
    pub event_id: EventId,
    pub order_id: OrderId,
    pub venue_order_id: VenueOrderId,
    pub account_id: AccountId,
    pub ts_event: DateTime<Utc>,
}

impl OrderWorking {
    pub fn new(
        order_id: OrderId,
        venue_order_id: VenueOrderId,
        account_id: AccountId,
        ts_event: DateTime<Utc>,
    ) -> Self {
        Self {
            event_id: EventId::new(),
            order_id,
            venue_order_id,
            account_id,
            ts_event,
        }
    }
}

/// Event produced when the brokerage acknowledges an order modification.
///
/// Rewrites quantity and price in place; the order stays working.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderModified {
    pub event_id: EventId,
    pub order_id: OrderId,
    pub account_id: AccountId,
    pub modified_quantity: Quantity,
    pub modified_price: Decimal,
    pub ts_event: DateTime<Utc>,
}

impl OrderModified {
    pub fn new(
        order_id: OrderId,
        account_id: AccountId,
        modified_quantity: Quantity,
        modified_price: Decimal,
        ts_event: DateTime<Utc>,
    ) -> Self {
        Self {
            event_id: EventId::new(),
            order_id,
            account_id,
            modified_quantity,
            modified_price,
            ts_event,
        }
    }
}

/// Event produced when an order is cancelled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderCancelled {
    pub event_id: EventId,
    pub order_id: OrderId,
    pub account_id: AccountId,
    pub ts_event: DateTime<Utc>,
}

impl OrderCancelled {
    pub fn new(order_id: OrderId, account_id: AccountId, ts_event: DateTime<Utc>) -> Self {
        Self {
            event_id: EventId::new(),
            order_id,
            account_id,
            ts_event,
        }
    }
}

/// Event produced when a cancel or modify request is rejected.
///
/// Forwarded to the owning strategy as a warning; order state is unchanged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderCancelReject {
    pub event_id: EventId,
    pub order_id: OrderId,
    pub account_id: AccountId,
    /// The request this reject responds to (e.g., "CANCEL", "MODIFY")
    pub response_to: String,
    pub reason: String,
    pub ts_event: DateTime<Utc>,
}

impl OrderCancelReject {
    pub fn new(
        order_id: OrderId,
        account_id: AccountId,
        response_to: impl Into<String>,
        reason: impl Into<String>,
        ts_event: DateTime<Utc>,
    ) -> Self {
        Self {
            event_id: EventId::new(),
            order_id,
            account_id,
            response_to: response_to.into(),
            reason: reason.into(),
            ts_event,
        }
    }
}

/// Event produced when an order's time-in-force expires.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderExpired {
    pub event_id: EventId,
    pub order_id: OrderId,
    pub account_id: AccountId,
    pub ts_event: DateTime<Utc>,
}

impl OrderExpired {
    pub fn new(order_id: OrderId, account_id: AccountId, ts_event: DateTime<Utc>) -> Self {
        Self {
            event_id: EventId::new(),
            order_id,
            account_id,
            ts_event,
        }
    }
}

/// Event produced for each execution (fill) against an order.
///
/// `filled_quantity` and `average_price` describe this execution only; the
/// order accumulates them into its running totals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderFilled {
    pub event_id: EventId,
    pub order_id: OrderId,
    pub account_id: AccountId,
    pub execution_id: ExecutionId,
    pub venue_position_id: Option<VenuePositionId>,
    pub symbol: Symbol,
    pub side: OrderSide,
    pub filled_quantity: Quantity,
    pub average_price: Decimal,
    pub ts_event: DateTime<Utc>,
}

impl OrderFilled {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        order_id: OrderId,
        account_id: AccountId,
        execution_id: ExecutionId,
        symbol: Symbol,
        side: OrderSide,
        filled_quantity: Quantity,
        average_price: Decimal,
        ts_event: DateTime<Utc>,
    ) -> Self {
        Self {
            event_id: EventId::new(),
            order_id,
            account_id,
            execution_id,
            venue_position_id: None,
            symbol,
            side,
            filled_quantity,
            average_price,
            ts_event,
        }
    }

    /// Attach the venue-assigned position id
    pub fn with_venue_position_id(mut self, id: VenuePositionId) -> Self {
        self.venue_position_id = Some(id);
        self
    }
}

/// Enum containing all possible order events for unified handling.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum OrderEventAny {
    Initialized(OrderInitialized),
    Invalid(OrderInvalid),
    Denied(OrderDenied),
    Submitted(OrderSubmitted),
    Accepted(OrderAccepted),
    Rejected(OrderRejected),
    Working(OrderWorking),
    Modified(OrderModified),
    Cancelled(OrderCancelled),
    CancelReject(OrderCancelReject),
    Expired(OrderExpired),
    Filled(OrderFilled),
}

impl OrderEventAny {
    /// Get the order ID from any event type
    pub fn order_id(&self) -> &OrderId {
        match self {
            OrderEventAny::Initialized(e) => &e.order_id,
            OrderEventAny::Invalid(e) => &e.order_id,
            OrderEventAny::Denied(e) => &e.order_id,
            OrderEventAny::Submitted(e) => &e.order_id,
            OrderEventAny::Accepted(e) => &e.order_id,
            OrderEventAny::Rejected(e) => &e.order_id,
            OrderEventAny::Working(e) => &e.order_id,
            OrderEventAny::Modified(e) => &e.order_id,
            OrderEventAny::Cancelled(e) => &e.order_id,
            OrderEventAny::CancelReject(e) => &e.order_id,
            OrderEventAny::Expired(e) => &e.order_id,
            OrderEventAny::Filled(e) => &e.order_id,
        }
    }

    /// Get the event ID
    pub fn event_id(&self) -> EventId {
        match self {
            OrderEventAny::Initialized(e) => e.event_id,
            OrderEventAny::Invalid(e) => e.event_id,
            OrderEventAny::Denied(e) => e.event_id,
            OrderEventAny::Submitted(e) => e.event_id,
            OrderEventAny::Accepted(e) => e.event_id,
            OrderEventAny::Rejected(e) => e.event_id,
            OrderEventAny::Working(e) => e.event_id,
            OrderEventAny::Modified(e) => e.event_id,
            OrderEventAny::Cancelled(e) => e.event_id,
            OrderEventAny::CancelReject(e) => e.event_id,
            OrderEventAny::Expired(e) => e.event_id,
            OrderEventAny::Filled(e) => e.event_id,
        }
    }

    /// Get the event timestamp
    pub fn ts_event(&self) -> DateTime<Utc> {
        match self {
            OrderEventAny::Initialized(e) => e.ts_event,
            OrderEventAny::Invalid(e) => e.ts_event,
            OrderEventAny::Denied(e) => e.ts_event,
            OrderEventAny::Submitted(e) => e.ts_event,
            OrderEventAny::Accepted(e) => e.ts_event,
            OrderEventAny::Rejected(e) => e.ts_event,
            OrderEventAny::Working(e) => e.ts_event,
            OrderEventAny::Modified(e) => e.ts_event,
            OrderEventAny::Cancelled(e) => e.ts_event,
            OrderEventAny::CancelReject(e) => e.ts_event,
            OrderEventAny::Expired(e) => e.ts_event,
            OrderEventAny::Filled(e) => e.ts_event,
        }
    }

    /// Get the account ID carried by brokerage-originated events
    pub fn account_id(&self) -> Option<&AccountId> {
        match self {
            OrderEventAny::Initialized(_)
            | OrderEventAny::Invalid(_)
            | OrderEventAny::Denied(_) => None,
            OrderEventAny::Submitted(e) => Some(&e.account_id),
            OrderEventAny::Accepted(e) => Some(&e.account_id),
            OrderEventAny::Rejected(e) => Some(&e.account_id),
            OrderEventAny::Working(e) => Some(&e.account_id),
            OrderEventAny::Modified(e) => Some(&e.account_id),
            OrderEventAny::Cancelled(e) => Some(&e.account_id),
            OrderEventAny::CancelReject(e) => Some(&e.account_id),
            OrderEventAny::Expired(e) => Some(&e.account_id),
            OrderEventAny::Filled(e) => Some(&e.account_id),
        }
    }

    /// Returns true if this is a fill event
    pub fn is_fill(&self) -> bool {
        matches!(self, OrderEventAny::Filled(_))
    }
}

impl From<OrderInitialized> for OrderEventAny {
    fn from(e: OrderInitialized) -> Self {
        OrderEventAny::Initialized(e)
    }
}

impl From<OrderInvalid> for OrderEventAny {
    fn from(e: OrderInvalid) -> Self {
        OrderEventAny::Invalid(e)
    }
}

impl From<OrderDenied> for OrderEventAny {
    fn from(e: OrderDenied) -> Self {
        OrderEventAny::Denied(e)
    }
}

impl From<OrderSubmitted> for OrderEventAny {
    fn from(e: OrderSubmitted) -> Self {
        OrderEventAny::Submitted(e)
    }
}

impl From<OrderAccepted> for OrderEventAny {
    fn from(e: OrderAccepted) -> Self {
        OrderEventAny::Accepted(e)
    }
}

impl From<OrderRejected> for OrderEventAny {
    fn from(e: OrderRejected) -> Self {
        OrderEventAny::Rejected(e)
    }
}

impl From<OrderWorking> for OrderEventAny {
    fn from(e: OrderWorking) -> Self {
        OrderEventAny::Working(e)
    }
}

impl From<OrderModified> for OrderEventAny {
    fn from(e: OrderModified) -> Self {
        OrderEventAny::Modified(e)
    }
}

impl From<OrderCancelled> for OrderEventAny {
    fn from(e: OrderCancelled) -> Self {
        OrderEventAny::Cancelled(e)
    }
}

impl From<OrderCancelReject> for OrderEventAny {
    fn from(e: OrderCancelReject) -> Self {
        OrderEventAny::CancelReject(e)
    }
}

impl From<OrderExpired> for OrderEventAny {
    fn from(e: OrderExpired) -> Self {
        OrderEventAny::Expired(e)
    }
}

impl From<OrderFilled> for OrderEventAny {
    fn from(e: OrderFilled) -> Self {
        OrderEventAny::Filled(e)
    }
}
