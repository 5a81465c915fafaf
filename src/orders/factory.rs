//! Order factory with validated construction and monotonic id generation.
//!
//! One factory is owned per strategy; ids are scoped by the trader and
//! strategy tags so concurrent strategies never collide.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::clock::SharedClock;

use super::events::{EventId, OrderInitialized};
use super::order::{AtomicOrder, Order, OrderError};
use super::types::{
    Label, OrderId, OrderPurpose, OrderSide, OrderType, Quantity, Symbol, TimeInForce,
};

/// Produces validated orders with monotonic identifiers.
pub struct OrderFactory {
    id_tag_trader: String,
    id_tag_strategy: String,
    clock: SharedClock,
    count: u64,
}

impl OrderFactory {
    /// Create a factory scoped to the given trader and strategy tags.
    pub fn new(
        id_tag_trader: impl Into<String>,
        id_tag_strategy: impl Into<String>,
        clock: SharedClock,
    ) -> Self {
        Self {
            id_tag_trader: id_tag_trader.into(),
            id_tag_strategy: id_tag_strategy.into(),
            clock,
            count: 0,
        }
    }

    /// Number of orders generated so far
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Reset the id counter (new backtest run)
    pub fn reset(&mut self) {
        self.count = 0;
    }

    fn generate_order_id(&mut self) -> OrderId {
        self.count += 1;
        OrderId::new(format!(
            "O-{}-{}-{}",
            self.id_tag_trader, self.id_tag_strategy, self.count
        ))
    }

    /// Create a market order.
    pub fn market(
        &mut self,
        symbol: Symbol,
        side: OrderSide,
        quantity: Quantity,
        label: Option<Label>,
    ) -> Result<Order, OrderError> {
        self.create(
            OrderType::Market,
            symbol,
            side,
            quantity,
            None,
            label,
            OrderPurpose::None,
            TimeInForce::Day,
            None,
        )
    }

    /// Create a limit order.
    pub fn limit(
        &mut self,
        symbol: Symbol,
        side: OrderSide,
        quantity: Quantity,
        price: Decimal,
        label: Option<Label>,
        time_in_force: TimeInForce,
        expire_time: Option<DateTime<Utc>>,
    ) -> Result<Order, OrderError> {
        self.create(
            OrderType::Limit,
            symbol,
            side,
            quantity,
            Some(price),
            label,
            OrderPurpose::None,
            time_in_force,
            expire_time,
        )
    }

    /// Create a stop-market order.
    pub fn stop_market(
        &mut self,
        symbol: Symbol,
        side: OrderSide,
        quantity: Quantity,
        price: Decimal,
        label: Option<Label>,
        time_in_force: TimeInForce,
        expire_time: Option<DateTime<Utc>>,
    ) -> Result<Order, OrderError> {
        self.create(
            OrderType::StopMarket,
            symbol,
            side,
            quantity,
            Some(price),
            label,
            OrderPurpose::None,
            time_in_force,
            expire_time,
        )
    }

    /// Create a stop-limit order.
    pub fn stop_limit(
        &mut self,
        symbol: Symbol,
        side: OrderSide,
        quantity: Quantity,
        price: Decimal,
        label: Option<Label>,
        time_in_force: TimeInForce,
        expire_time: Option<DateTime<Utc>>,
    ) -> Result<Order, OrderError> {
        self.create(
            OrderType::StopLimit,
            symbol,
            side,
            quantity,
            Some(price),
            label,
            OrderPurpose::None,
            time_in_force,
            expire_time,
        )
    }

    /// Create a market-if-touched order.
    pub fn market_if_touched(
        &mut self,
        symbol: Symbol,
        side: OrderSide,
        quantity: Quantity,
        price: Decimal,
        label: Option<Label>,
        time_in_force: TimeInForce,
        expire_time: Option<DateTime<Utc>>,
    ) -> Result<Order, OrderError> {
        self.create(
            OrderType::Mit,
            symbol,
            side,
            quantity,
            Some(price),
            label,
            OrderPurpose::None,
            time_in_force,
            expire_time,
        )
    }

    /// Create an atomic order with a market entry.
    ///
    /// The stop-loss (stop-market) and optional take-profit (limit) children
    /// are derived from the entry: opposite side, equal quantity, GTC.
    pub fn atomic_market(
        &mut self,
        symbol: Symbol,
        side: OrderSide,
        quantity: Quantity,
        stop_loss_price: Decimal,
        take_profit_price: Option<Decimal>,
        label: Option<Label>,
    ) -> Result<AtomicOrder, OrderError> {
        let entry = self.create(
            OrderType::Market,
            symbol,
            side,
            quantity,
            None,
            child_label(&label, "E"),
            OrderPurpose::Entry,
            TimeInForce::Day,
            None,
        )?;
        self.attach_children(entry, stop_loss_price, take_profit_price, label)
    }

    /// Create an atomic order with a limit entry.
    pub fn atomic_limit(
        &mut self,
        symbol: Symbol,
        side: OrderSide,
        quantity: Quantity,
        entry_price: Decimal,
        stop_loss_price: Decimal,
        take_profit_price: Option<Decimal>,
        label: Option<Label>,
    ) -> Result<AtomicOrder, OrderError> {
        let entry = self.create(
            OrderType::Limit,
            symbol,
            side,
            quantity,
            Some(entry_price),
            child_label(&label, "E"),
            OrderPurpose::Entry,
            TimeInForce::Day,
            None,
        )?;
        self.attach_children(entry, stop_loss_price, take_profit_price, label)
    }

    fn attach_children(
        &mut self,
        entry: Order,
        stop_loss_price: Decimal,
        take_profit_price: Option<Decimal>,
        label: Option<Label>,
    ) -> Result<AtomicOrder, OrderError> {
        let stop_loss = self.create(
            OrderType::StopMarket,
            entry.symbol.clone(),
            entry.side.opposite(),
            entry.quantity,
            Some(stop_loss_price),
            child_label(&label, "SL"),
            OrderPurpose::StopLoss,
            TimeInForce::Gtc,
            None,
        )?;
        let take_profit = match take_profit_price {
            Some(price) => Some(self.create(
                OrderType::Limit,
                entry.symbol.clone(),
                entry.side.opposite(),
                entry.quantity,
                Some(price),
                child_label(&label, "TP"),
                OrderPurpose::TakeProfit,
                TimeInForce::Gtc,
                None,
            )?),
            None => None,
        };
        AtomicOrder::new(entry, stop_loss, take_profit)
    }

    #[allow(clippy::too_many_arguments)]
    fn create(
        &mut self,
        order_type: OrderType,
        symbol: Symbol,
        side: OrderSide,
        quantity: Quantity,
        price: Option<Decimal>,
        label: Option<Label>,
        purpose: OrderPurpose,
        time_in_force: TimeInForce,
        expire_time: Option<DateTime<Utc>>,
    ) -> Result<Order, OrderError> {
        if quantity.is_zero() {
            return Err(OrderError::InvalidQuantity {
                quantity: quantity.value(),
            });
        }
        if order_type.is_priced() && price.is_none() {
            return Err(OrderError::MissingPrice { order_type });
        }
        if !order_type.is_priced() && price.is_some() {
            return Err(OrderError::UnexpectedPrice { order_type });
        }

        let timestamp = self.clock.borrow().time_now();
        if time_in_force.requires_expire_time() {
            match expire_time {
                None => return Err(OrderError::MissingExpireTime),
                Some(expire) if expire <= timestamp => {
                    return Err(OrderError::ExpireTimeInPast {
                        expire_time: expire,
                        timestamp,
                    });
                }
                Some(_) => {}
            }
        }

        Ok(Order::new(OrderInitialized {
            event_id: EventId::new(),
            order_id: self.generate_order_id(),
            symbol,
            label,
            side,
            order_type,
            purpose,
            quantity,
            price,
            time_in_force,
            expire_time,
            ts_event: timestamp,
        }))
    }
}

fn child_label(label: &Option<Label>, suffix: &str) -> Option<Label> {
    label
        .as_ref()
        .map(|l| Label::new(format!("{}_{}", l.as_str(), suffix)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::test_clock::TestClock;
    use crate::orders::types::OrderStatus;
    use chrono::Duration;
    use rust_decimal_macros::dec;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn factory() -> OrderFactory {
        let clock = Rc::new(RefCell::new(TestClock::default()));
        OrderFactory::new("001", "S1", clock)
    }

    fn symbol() -> Symbol {
        Symbol::new("AAPL", "NASDAQ")
    }

    #[test]
    fn test_order_ids_are_monotonic_and_scoped() {
        let mut factory = factory();
        let first = factory
            .market(symbol(), OrderSide::Buy, Quantity::new(100), None)
            .unwrap();
        let second = factory
            .market(symbol(), OrderSide::Buy, Quantity::new(100), None)
            .unwrap();

        assert_eq!(first.id.as_str(), "O-001-S1-1");
        assert_eq!(second.id.as_str(), "O-001-S1-2");
        assert_eq!(factory.count(), 2);
    }

    #[test]
    fn test_market_order() {
        let mut factory = factory();
        let order = factory
            .market(symbol(), OrderSide::Buy, Quantity::new(100), None)
            .unwrap();

        assert_eq!(order.order_type, OrderType::Market);
        assert_eq!(order.status, OrderStatus::Initialized);
        assert!(order.price.is_none());
        assert_eq!(order.event_count(), 1);
    }

    #[test]
    fn test_zero_quantity_rejected() {
        let mut factory = factory();
        let result = factory.market(symbol(), OrderSide::Buy, Quantity::zero(), None);
        assert!(matches!(result, Err(OrderError::InvalidQuantity { .. })));
    }

    #[test]
    fn test_gtd_requires_future_expire_time() {
        let mut factory = factory();

        let result = factory.limit(
            symbol(),
            OrderSide::Buy,
            Quantity::new(100),
            dec!(150.00),
            None,
            TimeInForce::Gtd,
            None,
        );
        assert!(matches!(result, Err(OrderError::MissingExpireTime)));

        let now = factory.clock.borrow().time_now();
        let result = factory.limit(
            symbol(),
            OrderSide::Buy,
            Quantity::new(100),
            dec!(150.00),
            None,
            TimeInForce::Gtd,
            Some(now - Duration::seconds(1)),
        );
        assert!(matches!(result, Err(OrderError::ExpireTimeInPast { .. })));

        let order = factory
            .limit(
                symbol(),
                OrderSide::Buy,
                Quantity::new(100),
                dec!(150.00),
                None,
                TimeInForce::Gtd,
                Some(now + Duration::days(1)),
            )
            .unwrap();
        assert_eq!(order.time_in_force, TimeInForce::Gtd);
        assert!(order.expire_time.is_some());
    }

    #[test]
    fn test_atomic_market_children() {
        let mut factory = factory();
        let atomic = factory
            .atomic_market(
                symbol(),
                OrderSide::Buy,
                Quantity::new(10),
                dec!(99.00),
                Some(dec!(101.00)),
                Some(Label::from("S1_SCALP")),
            )
            .unwrap();

        assert_eq!(atomic.id.as_str(), "AO-001-S1-1");
        assert_eq!(atomic.entry.purpose, OrderPurpose::Entry);
        assert_eq!(atomic.entry.label, Some(Label::from("S1_SCALP_E")));

        assert_eq!(atomic.stop_loss.side, OrderSide::Sell);
        assert_eq!(atomic.stop_loss.order_type, OrderType::StopMarket);
        assert_eq!(atomic.stop_loss.time_in_force, TimeInForce::Gtc);
        assert_eq!(atomic.stop_loss.quantity, Quantity::new(10));
        assert_eq!(atomic.stop_loss.purpose, OrderPurpose::StopLoss);
        assert_eq!(atomic.stop_loss.label, Some(Label::from("S1_SCALP_SL")));
        assert_eq!(atomic.stop_loss.price, Some(dec!(99.00)));

        let tp = atomic.take_profit.as_ref().unwrap();
        assert_eq!(tp.side, OrderSide::Sell);
        assert_eq!(tp.order_type, OrderType::Limit);
        assert_eq!(tp.time_in_force, TimeInForce::Gtc);
        assert_eq!(tp.purpose, OrderPurpose::TakeProfit);
        assert_eq!(tp.label, Some(Label::from("S1_SCALP_TP")));
    }

    #[test]
    fn test_atomic_without_take_profit() {
        let mut factory = factory();
        let atomic = factory
            .atomic_limit(
                symbol(),
                OrderSide::Sell,
                Quantity::new(5),
                dec!(150.00),
                dec!(151.00),
                None,
                None,
            )
            .unwrap();

        assert!(!atomic.has_take_profit());
        assert_eq!(atomic.entry.order_type, OrderType::Limit);
        assert_eq!(atomic.stop_loss.side, OrderSide::Buy);
    }
}
