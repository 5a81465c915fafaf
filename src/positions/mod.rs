//! Position model and position events.
//!
//! A position is the net exposure produced by fills sharing a `PositionId`.
//! It opens on the first fill, nets subsequent fills against the entry
//! direction, and closes when the net quantity returns to zero, at which
//! point the realized return becomes available.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

use crate::orders::{
    EventId, ExecutionId, OrderFilled, OrderId, OrderSide, PositionId, Quantity, StrategyId,
    Symbol,
};

/// Net exposure resulting from fills sharing one position id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub id: PositionId,
    pub symbol: Symbol,
    /// The order whose first fill opened this position
    pub from_order_id: OrderId,
    /// Side of the opening fill; fills on this side build the position,
    /// fills on the opposite side reduce it
    pub entry_direction: OrderSide,
    /// Execution IDs applied to this position (duplicates collapse)
    pub execution_ids: HashSet<ExecutionId>,
    pub opened_time: DateTime<Utc>,
    pub closed_time: Option<DateTime<Utc>>,
    /// Largest absolute net quantity reached over the position's life
    pub peak_quantity: Quantity,
    /// Volume-weighted average price of entry-direction fills
    pub average_entry_price: Decimal,
    /// Volume-weighted average price of exit-direction fills
    pub average_exit_price: Option<Decimal>,
    /// Realized fractional return, available once closed
    pub return_realized: Option<Decimal>,

    relative_quantity: i64,
    entry_quantity: u64,
    entry_cost: Decimal,
    exit_quantity: u64,
    exit_cost: Decimal,
    fill_count: usize,
}

impl Position {
    /// Open a position from its first fill.
    pub fn new(id: PositionId, fill: &OrderFilled) -> Self {
        let quantity = fill.filled_quantity.value();
        let cost = fill.average_price * Decimal::from(quantity);
        Self {
            id,
            symbol: fill.symbol.clone(),
            from_order_id: fill.order_id.clone(),
            entry_direction: fill.side,
            execution_ids: HashSet::from([fill.execution_id.clone()]),
            opened_time: fill.ts_event,
            closed_time: None,
            peak_quantity: fill.filled_quantity,
            average_entry_price: fill.average_price,
            average_exit_price: None,
            return_realized: None,
            relative_quantity: signed(fill.side, quantity),
            entry_quantity: quantity,
            entry_cost: cost,
            exit_quantity: 0,
            exit_cost: Decimal::ZERO,
            fill_count: 1,
        }
    }

    /// Apply a subsequent fill to the position.
    pub fn apply(&mut self, fill: &OrderFilled) {
        self.execution_ids.insert(fill.execution_id.clone());
        self.fill_count += 1;

        let quantity = fill.filled_quantity.value();
        let cost = fill.average_price * Decimal::from(quantity);
        if fill.side == self.entry_direction {
            self.entry_quantity += quantity;
            self.entry_cost += cost;
            self.average_entry_price = self.entry_cost / Decimal::from(self.entry_quantity);
        } else {
            self.exit_quantity += quantity;
            self.exit_cost += cost;
            self.average_exit_price = Some(self.exit_cost / Decimal::from(self.exit_quantity));
        }

        self.relative_quantity += signed(fill.side, quantity);
        let net = self.relative_quantity.unsigned_abs();
        if net > self.peak_quantity.value() {
            self.peak_quantity = Quantity::new(net);
        }

        if self.relative_quantity == 0 {
            self.closed_time = Some(fill.ts_event);
            self.return_realized = self.average_exit_price.map(|exit| {
                let entry = self.average_entry_price;
                match self.entry_direction {
                    OrderSide::Buy => (exit - entry) / entry,
                    OrderSide::Sell => (entry - exit) / entry,
                }
            });
        }
    }

    /// Current net quantity (unsigned)
    pub fn quantity(&self) -> Quantity {
        Quantity::new(self.relative_quantity.unsigned_abs())
    }

    /// Returns true once the net quantity has returned to zero
    pub fn is_closed(&self) -> bool {
        self.relative_quantity == 0
    }

    /// Returns true while net exposure is positive
    pub fn is_long(&self) -> bool {
        self.relative_quantity > 0
    }

    /// Returns true while net exposure is negative
    pub fn is_short(&self) -> bool {
        self.relative_quantity < 0
    }

    /// Number of fills applied, including the opening fill
    pub fn fill_count(&self) -> usize {
        self.fill_count
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = if self.is_closed() {
            "FLAT".to_string()
        } else if self.is_long() {
            format!("LONG {}", self.quantity())
        } else {
            format!("SHORT {}", self.quantity())
        };
        write!(f, "Position({} {} {})", self.id, self.symbol, state)
    }
}

fn signed(side: OrderSide, quantity: u64) -> i64 {
    match side {
        OrderSide::Buy => quantity as i64,
        OrderSide::Sell => -(quantity as i64),
    }
}

/// Event produced when the first fill on a position id opens a position.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionOpened {
    pub event_id: EventId,
    pub position_id: PositionId,
    pub strategy_id: StrategyId,
    pub symbol: Symbol,
    pub entry_direction: OrderSide,
    pub quantity: Quantity,
    pub ts_event: DateTime<Utc>,
}

impl PositionOpened {
    pub fn new(position: &Position, strategy_id: StrategyId, ts_event: DateTime<Utc>) -> Self {
        Self {
            event_id: EventId::new(),
            position_id: position.id.clone(),
            strategy_id,
            symbol: position.symbol.clone(),
            entry_direction: position.entry_direction,
            quantity: position.quantity(),
            ts_event,
        }
    }
}

/// Event produced when a fill changes an open position without closing it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionModified {
    pub event_id: EventId,
    pub position_id: PositionId,
    pub strategy_id: StrategyId,
    pub symbol: Symbol,
    pub quantity: Quantity,
    pub ts_event: DateTime<Utc>,
}

impl PositionModified {
    pub fn new(position: &Position, strategy_id: StrategyId, ts_event: DateTime<Utc>) -> Self {
        Self {
            event_id: EventId::new(),
            position_id: position.id.clone(),
            strategy_id,
            symbol: position.symbol.clone(),
            quantity: position.quantity(),
            ts_event,
        }
    }
}

/// Event produced when a position's net quantity returns to zero.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionClosed {
    pub event_id: EventId,
    pub position_id: PositionId,
    pub strategy_id: StrategyId,
    pub symbol: Symbol,
    pub return_realized: Decimal,
    pub opened_time: DateTime<Utc>,
    pub ts_event: DateTime<Utc>,
}

impl PositionClosed {
    pub fn new(position: &Position, strategy_id: StrategyId, ts_event: DateTime<Utc>) -> Self {
        Self {
            event_id: EventId::new(),
            position_id: position.id.clone(),
            strategy_id,
            symbol: position.symbol.clone(),
            return_realized: position.return_realized.unwrap_or(Decimal::ZERO),
            opened_time: position.opened_time,
            ts_event,
        }
    }
}

/// Enum containing all position events for unified handling.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PositionEventAny {
    Opened(PositionOpened),
    Modified(PositionModified),
    Closed(PositionClosed),
}

impl PositionEventAny {
    /// Get the position ID from any event type
    pub fn position_id(&self) -> &PositionId {
        match self {
            PositionEventAny::Opened(e) => &e.position_id,
            PositionEventAny::Modified(e) => &e.position_id,
            PositionEventAny::Closed(e) => &e.position_id,
        }
    }

    /// Get the owning strategy ID
    pub fn strategy_id(&self) -> &StrategyId {
        match self {
            PositionEventAny::Opened(e) => &e.strategy_id,
            PositionEventAny::Modified(e) => &e.strategy_id,
            PositionEventAny::Closed(e) => &e.strategy_id,
        }
    }

    /// Get the event timestamp
    pub fn ts_event(&self) -> DateTime<Utc> {
        match self {
            PositionEventAny::Opened(e) => e.ts_event,
            PositionEventAny::Modified(e) => e.ts_event,
            PositionEventAny::Closed(e) => e.ts_event,
        }
    }
}

impl From<PositionOpened> for PositionEventAny {
    fn from(e: PositionOpened) -> Self {
        PositionEventAny::Opened(e)
    }
}

impl From<PositionModified> for PositionEventAny {
    fn from(e: PositionModified) -> Self {
        PositionEventAny::Modified(e)
    }
}

impl From<PositionClosed> for PositionEventAny {
    fn from(e: PositionClosed) -> Self {
        PositionEventAny::Closed(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orders::AccountId;
    use rust_decimal_macros::dec;

    fn fill(
        order_id: &str,
        execution_id: &str,
        side: OrderSide,
        quantity: u64,
        price: Decimal,
    ) -> OrderFilled {
        OrderFilled::new(
            OrderId::from(order_id),
            AccountId::from("ACC1"),
            ExecutionId::from(execution_id),
            Symbol::new("AAPL", "NASDAQ"),
            side,
            Quantity::new(quantity),
            price,
            Utc::now(),
        )
    }

    #[test]
    fn test_position_opens_long() {
        let position = Position::new(
            PositionId::from("P1"),
            &fill("O-1", "E-1", OrderSide::Buy, 100, dec!(150.00)),
        );

        assert!(position.is_long());
        assert!(!position.is_closed());
        assert_eq!(position.quantity(), Quantity::new(100));
        assert_eq!(position.average_entry_price, dec!(150.00));
        assert_eq!(position.fill_count(), 1);
        assert!(position.return_realized.is_none());
    }

    #[test]
    fn test_position_builds_and_reduces() {
        let mut position = Position::new(
            PositionId::from("P1"),
            &fill("O-1", "E-1", OrderSide::Buy, 100, dec!(100.00)),
        );
        position.apply(&fill("O-2", "E-2", OrderSide::Buy, 100, dec!(110.00)));

        assert_eq!(position.quantity(), Quantity::new(200));
        assert_eq!(position.average_entry_price, dec!(105.00));
        assert_eq!(position.peak_quantity, Quantity::new(200));

        position.apply(&fill("O-3", "E-3", OrderSide::Sell, 50, dec!(120.00)));
        assert_eq!(position.quantity(), Quantity::new(150));
        assert!(!position.is_closed());
        assert_eq!(position.peak_quantity, Quantity::new(200));
    }

    #[test]
    fn test_long_position_close_realized_return() {
        let mut position = Position::new(
            PositionId::from("P2"),
            &fill("O-1", "E-1", OrderSide::Buy, 10, dec!(100.00)),
        );
        position.apply(&fill("O-2", "E-2", OrderSide::Sell, 10, dec!(99.00)));

        assert!(position.is_closed());
        assert!(position.closed_time.is_some());
        assert_eq!(position.average_exit_price, Some(dec!(99.00)));
        assert_eq!(position.return_realized, Some(dec!(-0.01)));
    }

    #[test]
    fn test_short_position_close_realized_return() {
        let mut position = Position::new(
            PositionId::from("P3"),
            &fill("O-1", "E-1", OrderSide::Sell, 10, dec!(100.00)),
        );
        assert!(position.is_short());

        position.apply(&fill("O-2", "E-2", OrderSide::Buy, 10, dec!(95.00)));
        assert!(position.is_closed());
        assert_eq!(position.return_realized, Some(dec!(0.05)));
    }

    #[test]
    fn test_duplicate_execution_id_collapses() {
        let mut position = Position::new(
            PositionId::from("P4"),
            &fill("O-1", "E-1", OrderSide::Buy, 100, dec!(100.00)),
        );
        position.apply(&fill("O-1", "E-1", OrderSide::Buy, 100, dec!(100.00)));

        assert_eq!(position.execution_ids.len(), 1);
    }

    #[test]
    fn test_position_events_carry_state() {
        let mut position = Position::new(
            PositionId::from("P5"),
            &fill("O-1", "E-1", OrderSide::Buy, 10, dec!(100.00)),
        );
        let strategy_id = StrategyId::from("S1");

        let opened = PositionOpened::new(&position, strategy_id.clone(), Utc::now());
        assert_eq!(opened.quantity, Quantity::new(10));
        assert_eq!(opened.entry_direction, OrderSide::Buy);

        position.apply(&fill("O-2", "E-2", OrderSide::Sell, 10, dec!(101.00)));
        let closed = PositionClosed::new(&position, strategy_id, Utc::now());
        assert_eq!(closed.return_realized, dec!(0.01));

        let event: PositionEventAny = closed.into();
        assert_eq!(event.position_id().as_str(), "P5");
        assert_eq!(event.strategy_id().as_str(), "S1");
    }
}
