//! Order entity and atomic (bracket) orders.
//!
//! An `Order` is mutated exclusively through [`Order::apply`]: each event is
//! validated against the state machine, appended to the order's event log,
//! and folded into the derived execution state (filled quantity, average
//! price, slippage).

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

use super::events::{EventId, OrderEventAny, OrderFilled, OrderInitialized, OrderModified};
use super::types::{
    AccountId, ExecutionId, Label, OrderId, OrderPurpose, OrderSide, OrderStatus, OrderType,
    Quantity, Symbol, TimeInForce, VenueOrderId, VenuePositionId,
};

/// A trading order with full lifecycle tracking.
///
/// Orders are created by the [`OrderFactory`](super::factory::OrderFactory)
/// in the `Initialized` state with the initialization event already in the
/// log, and never constructed by hand.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    /// Client-assigned order ID (unique within the trader)
    pub id: OrderId,
    /// Instrument being traded
    pub symbol: Symbol,
    /// Buy or Sell
    pub side: OrderSide,
    /// Order type (Market, Limit, StopMarket, StopLimit, Mit)
    pub order_type: OrderType,
    /// Role inside an atomic submission, if any
    pub purpose: OrderPurpose,
    /// Total quantity ordered
    pub quantity: Quantity,
    /// Order price (present iff the type is priced)
    pub price: Option<Decimal>,
    /// Free-form label
    pub label: Option<Label>,
    /// Time in force
    pub time_in_force: TimeInForce,
    /// Expiration time (required for GTD)
    pub expire_time: Option<DateTime<Utc>>,
    /// When the order was created
    pub timestamp: DateTime<Utc>,
    /// Identifier of the initialization event
    pub init_id: EventId,

    /// Venue-assigned order ID (revealed by `OrderWorking`)
    pub venue_order_id: Option<VenueOrderId>,
    /// Account this order trades under (revealed by the first brokerage event)
    pub account_id: Option<AccountId>,
    /// Venue-assigned position ID (revealed by fills)
    pub venue_position_id: Option<VenuePositionId>,

    /// Current lifecycle status
    pub status: OrderStatus,
    /// Quantity filled so far (running total)
    pub filled_quantity: Quantity,
    /// Volume-weighted average fill price
    pub average_price: Option<Decimal>,
    /// Signed slippage versus the order price, positive = adverse
    pub slippage: Decimal,
    /// Execution IDs seen on this order (duplicates collapse)
    pub execution_ids: HashSet<ExecutionId>,

    events: Vec<OrderEventAny>,
}

impl Order {
    /// Create an order from its initialization event.
    ///
    /// The event becomes the first entry of the order's event log.
    pub fn new(init: OrderInitialized) -> Self {
        Self {
            id: init.order_id.clone(),
            symbol: init.symbol.clone(),
            side: init.side,
            order_type: init.order_type,
            purpose: init.purpose,
            quantity: init.quantity,
            price: init.price,
            label: init.label.clone(),
            time_in_force: init.time_in_force,
            expire_time: init.expire_time,
            timestamp: init.ts_event,
            init_id: init.event_id,
            venue_order_id: None,
            account_id: None,
            venue_position_id: None,
            status: OrderStatus::Initialized,
            filled_quantity: Quantity::zero(),
            average_price: None,
            slippage: Decimal::ZERO,
            execution_ids: HashSet::new(),
            events: vec![OrderEventAny::Initialized(init)],
        }
    }

    /// Returns true if the order is in a terminal state
    pub fn is_completed(&self) -> bool {
        self.status.is_completed()
    }

    /// Returns true if the order is live and expecting fills
    pub fn is_working(&self) -> bool {
        self.status.is_working()
    }

    /// The append-only event log
    pub fn events(&self) -> &[OrderEventAny] {
        &self.events
    }

    /// The most recent event applied
    pub fn last_event(&self) -> &OrderEventAny {
        // The log is never empty: construction seeds it with Initialized.
        self.events.last().expect("order event log cannot be empty")
    }

    /// Number of events applied, including initialization
    pub fn event_count(&self) -> usize {
        self.events.len()
    }

    /// Apply an event to the order.
    ///
    /// The only mutator. Validates the event's order id, account
    /// consistency, and the state transition before folding the event in;
    /// on any error the order is left untouched.
    pub fn apply(&mut self, event: OrderEventAny) -> Result<(), OrderError> {
        if event.order_id() != &self.id {
            return Err(OrderError::IdMismatch {
                order_id: self.id.clone(),
                event_order_id: event.order_id().clone(),
            });
        }
        if let (Some(account_id), Some(event_account_id)) = (&self.account_id, event.account_id()) {
            if account_id != event_account_id {
                return Err(OrderError::AccountMismatch {
                    order_id: self.id.clone(),
                    account_id: account_id.clone(),
                    event_account_id: event_account_id.clone(),
                });
            }
        }

        match &event {
            OrderEventAny::Initialized(_) => {
                return Err(OrderError::InvalidTransition {
                    order_id: self.id.clone(),
                    from: self.status,
                    to: OrderStatus::Initialized,
                });
            }
            OrderEventAny::Invalid(_) => self.transition_to(OrderStatus::Invalid)?,
            OrderEventAny::Denied(_) => self.transition_to(OrderStatus::Denied)?,
            OrderEventAny::Submitted(_) => self.transition_to(OrderStatus::Submitted)?,
            OrderEventAny::Accepted(_) => self.transition_to(OrderStatus::Accepted)?,
            OrderEventAny::Rejected(_) => self.transition_to(OrderStatus::Rejected)?,
            OrderEventAny::Working(e) => {
                self.transition_to(OrderStatus::Working)?;
                self.venue_order_id = Some(e.venue_order_id.clone());
            }
            OrderEventAny::Modified(e) => self.apply_modified(e)?,
            OrderEventAny::Cancelled(_) => self.transition_to(OrderStatus::Cancelled)?,
            OrderEventAny::Expired(_) => self.transition_to(OrderStatus::Expired)?,
            OrderEventAny::CancelReject(_) => {
                // A rejected cancel/modify leaves the order state unchanged.
            }
            OrderEventAny::Filled(e) => self.apply_fill(e)?,
        }

        if self.account_id.is_none() {
            self.account_id = event.account_id().cloned();
        }
        self.events.push(event);
        Ok(())
    }

    fn transition_to(&mut self, target: OrderStatus) -> Result<(), OrderError> {
        if !self.status.can_transition_to(target) {
            return Err(OrderError::InvalidTransition {
                order_id: self.id.clone(),
                from: self.status,
                to: target,
            });
        }
        self.status = target;
        Ok(())
    }

    fn apply_modified(&mut self, event: &OrderModified) -> Result<(), OrderError> {
        if !self.status.can_transition_to(OrderStatus::Working) {
            return Err(OrderError::InvalidTransition {
                order_id: self.id.clone(),
                from: self.status,
                to: OrderStatus::Working,
            });
        }
        self.quantity = event.modified_quantity;
        self.price = Some(event.modified_price);
        // The modification itself does not leave Working, but a shrunken
        // quantity can complete the order against existing fills.
        if !self.filled_quantity.is_zero() {
            self.evaluate_fill_status();
        }
        self.update_slippage();
        Ok(())
    }

    fn apply_fill(&mut self, event: &OrderFilled) -> Result<(), OrderError> {
        if !self.status.can_transition_to(OrderStatus::Filled) {
            return Err(OrderError::InvalidTransition {
                order_id: self.id.clone(),
                from: self.status,
                to: OrderStatus::Filled,
            });
        }

        self.execution_ids.insert(event.execution_id.clone());
        if event.venue_position_id.is_some() {
            self.venue_position_id = event.venue_position_id.clone();
        }

        // Volume-weighted running average across fills.
        let fill_qty = Decimal::from(event.filled_quantity.value());
        let prev_qty = Decimal::from(self.filled_quantity.value());
        let total = prev_qty + fill_qty;
        self.average_price = Some(match self.average_price {
            None => event.average_price,
            Some(avg) => (avg * prev_qty + event.average_price * fill_qty) / total,
        });

        self.filled_quantity += event.filled_quantity;
        self.evaluate_fill_status();
        self.update_slippage();
        Ok(())
    }

    fn evaluate_fill_status(&mut self) {
        self.status = if self.filled_quantity < self.quantity {
            OrderStatus::PartiallyFilled
        } else if self.filled_quantity == self.quantity {
            OrderStatus::Filled
        } else {
            OrderStatus::OverFilled
        };
    }

    fn update_slippage(&mut self) {
        if !self.order_type.is_priced() {
            return;
        }
        if let (Some(price), Some(avg)) = (self.price, self.average_price) {
            let signed = match self.side {
                OrderSide::Buy => avg - price,
                OrderSide::Sell => price - avg,
            };
            self.slippage = signed.round_dp(avg.scale());
        }
    }
}

impl fmt::Display for Order {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Order({} {} {} {} {} @ {} status={} filled={}/{})",
            self.id,
            self.side,
            self.order_type,
            self.quantity,
            self.symbol,
            self.price
                .map(|p| p.to_string())
                .unwrap_or_else(|| "MARKET".to_string()),
            self.status,
            self.filled_quantity,
            self.quantity,
        )
    }
}

/// An atomic bracket of entry, stop-loss and optional take-profit orders,
/// treated as one logical submission.
///
/// Children carry the opposite side of the entry, matching quantity and GTC
/// time-in-force; the stop-loss is always a stop-market order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AtomicOrder {
    /// Identifier: `"A"` prepended to the entry order id
    pub id: OrderId,
    pub entry: Order,
    pub stop_loss: Order,
    pub take_profit: Option<Order>,
}

impl AtomicOrder {
    /// Assemble an atomic order, validating the child constraints.
    pub fn new(
        entry: Order,
        stop_loss: Order,
        take_profit: Option<Order>,
    ) -> Result<Self, OrderError> {
        Self::check_child(&entry, &stop_loss, OrderType::StopMarket)?;
        if let Some(tp) = &take_profit {
            Self::check_child(&entry, tp, OrderType::Limit)?;
        }
        Ok(Self {
            id: OrderId::new(format!("A{}", entry.id)),
            entry,
            stop_loss,
            take_profit,
        })
    }

    fn check_child(entry: &Order, child: &Order, expected: OrderType) -> Result<(), OrderError> {
        if child.side != entry.side.opposite() {
            return Err(OrderError::InvalidAtomicChild {
                order_id: child.id.clone(),
                reason: format!("side {} must oppose entry side {}", child.side, entry.side),
            });
        }
        if child.quantity != entry.quantity {
            return Err(OrderError::InvalidAtomicChild {
                order_id: child.id.clone(),
                reason: format!(
                    "quantity {} must match entry quantity {}",
                    child.quantity, entry.quantity
                ),
            });
        }
        if child.time_in_force != TimeInForce::Gtc {
            return Err(OrderError::InvalidAtomicChild {
                order_id: child.id.clone(),
                reason: format!("time in force {} must be GTC", child.time_in_force),
            });
        }
        if child.order_type != expected {
            return Err(OrderError::InvalidAtomicChild {
                order_id: child.id.clone(),
                reason: format!("order type {} must be {}", child.order_type, expected),
            });
        }
        Ok(())
    }

    /// Returns true if the bracket carries a take-profit child
    pub fn has_take_profit(&self) -> bool {
        self.take_profit.is_some()
    }
}

impl fmt::Display for AtomicOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "AtomicOrder({}, entry={}, stop_loss={}, take_profit={})",
            self.id,
            self.entry.id,
            self.stop_loss.id,
            self.take_profit
                .as_ref()
                .map(|tp| tp.id.to_string())
                .unwrap_or_else(|| "none".to_string()),
        )
    }
}

/// Errors that can occur constructing or mutating orders.
#[derive(Debug, Clone, thiserror::Error)]
pub enum OrderError {
    #[error("Invalid state transition from {from} to {to} for order {order_id}")]
    InvalidTransition {
        order_id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
    },

    #[error("Event order id {event_order_id} does not match order {order_id}")]
    IdMismatch {
        order_id: OrderId,
        event_order_id: OrderId,
    },

    #[error("Event account id {event_account_id} does not match account {account_id} on order {order_id}")]
    AccountMismatch {
        order_id: OrderId,
        account_id: AccountId,
        event_account_id: AccountId,
    },

    #[error("Invalid quantity {quantity}: must be positive")]
    InvalidQuantity { quantity: u64 },

    #[error("{order_type} order requires a price")]
    MissingPrice { order_type: OrderType },

    #[error("{order_type} order cannot carry a price")]
    UnexpectedPrice { order_type: OrderType },

    #[error("GTD orders require an expire time")]
    MissingExpireTime,

    #[error("Expire time {expire_time} is not after order timestamp {timestamp}")]
    ExpireTimeInPast {
        expire_time: DateTime<Utc>,
        timestamp: DateTime<Utc>,
    },

    #[error("Invalid atomic child {order_id}: {reason}")]
    InvalidAtomicChild { order_id: OrderId, reason: String },
}
