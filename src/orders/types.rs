//! Core identifier and order types for the execution system.
//!
//! This module defines the fundamental types used throughout the execution
//! core:
//! - Identifier newtypes (`TraderId`, `StrategyId`, `OrderId`, ...)
//! - `Quantity` - positive integer order/fill sizes
//! - `OrderSide`, `OrderType`, `OrderPurpose` - order classification
//! - `OrderStatus` - full lifecycle from Initialized to terminal states
//! - `TimeInForce` - order duration policies (DAY, GTC, GTD, FOC, IOC)

use serde::{Deserialize, Serialize};
use std::fmt;

/// Trader identifier, shared by every strategy running under one trader.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TraderId(pub String);

impl TraderId {
    /// Create a new TraderId
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the inner string value
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TraderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for TraderId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Strategy identifier - unique per registered strategy.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StrategyId(pub String);

impl StrategyId {
    /// Create a new StrategyId
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the inner string value
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StrategyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for StrategyId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Client-assigned order identifier, unique within a trader.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OrderId(pub String);

impl OrderId {
    /// Create a new OrderId
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the inner string value
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for OrderId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Position identifier assigned by the submitting strategy.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PositionId(pub String);

impl PositionId {
    /// Create a new PositionId
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the inner string value
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PositionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for PositionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Account identifier assigned by the brokerage.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AccountId(pub String);

impl AccountId {
    /// Create a new AccountId
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the inner string value
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for AccountId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Brokerage / venue name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Brokerage(pub String);

impl Brokerage {
    /// Create a new Brokerage
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Get the inner string value
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Brokerage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Brokerage {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Free-form label attached to orders and timers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Label(pub String);

impl Label {
    /// Create a new Label
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    /// Get the inner string value
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Label {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Execution (fill) identifier assigned by the brokerage.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ExecutionId(pub String);

impl ExecutionId {
    /// Create a new ExecutionId
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the inner string value
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ExecutionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ExecutionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Order identifier assigned by the venue/brokerage.
///
/// Revealed by the first `OrderWorking` event for the order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VenueOrderId(pub String);

impl VenueOrderId {
    /// Create a new VenueOrderId
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the inner string value
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VenueOrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for VenueOrderId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Position identifier assigned by the venue/brokerage, revealed on fills.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VenuePositionId(pub String);

impl VenuePositionId {
    /// Create a new VenuePositionId
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the inner string value
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VenuePositionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for VenuePositionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Tradable instrument identifier.
///
/// Format: `{code}.{venue}` (e.g., "AAPL.NASDAQ")
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Symbol {
    /// The instrument code (e.g., "AAPL")
    pub code: String,
    /// The venue/exchange (e.g., "NASDAQ")
    pub venue: String,
}

impl Symbol {
    /// Create a new Symbol
    pub fn new(code: impl Into<String>, venue: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            venue: venue.into(),
        }
    }

    /// Parse from string format "CODE.VENUE"
    pub fn parse(s: &str) -> Option<Self> {
        let (code, venue) = s.split_once('.')?;
        if code.is_empty() || venue.is_empty() {
            return None;
        }
        Some(Self::new(code, venue))
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.code, self.venue)
    }
}

/// Order or fill quantity - a strictly positive integer at the boundary,
/// zero only as a running-total seed.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub struct Quantity(pub u64);

impl Quantity {
    /// Create a new Quantity
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    /// Zero quantity (running-total seed)
    pub fn zero() -> Self {
        Self(0)
    }

    /// Returns the raw integer value
    pub fn value(&self) -> u64 {
        self.0
    }

    /// Returns true if the quantity is zero
    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl std::ops::Add for Quantity {
    type Output = Quantity;

    fn add(self, rhs: Quantity) -> Quantity {
        Quantity(self.0 + rhs.0)
    }
}

impl std::ops::AddAssign for Quantity {
    fn add_assign(&mut self, rhs: Quantity) {
        self.0 += rhs.0;
    }
}

impl From<u64> for Quantity {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Order side indicating buy or sell direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderSide {
    /// Buy order - acquire the instrument
    Buy,
    /// Sell order - dispose of the instrument
    Sell,
}

impl OrderSide {
    /// Returns the opposite side
    pub fn opposite(&self) -> Self {
        match self {
            OrderSide::Buy => OrderSide::Sell,
            OrderSide::Sell => OrderSide::Buy,
        }
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderSide::Buy => write!(f, "BUY"),
            OrderSide::Sell => write!(f, "SELL"),
        }
    }
}

/// Order type determining execution behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderType {
    /// Market order - execute immediately at best available price
    Market,
    /// Limit order - execute at the limit price or better
    Limit,
    /// Stop-market order - becomes a market order when the stop price trades
    StopMarket,
    /// Stop-limit order - becomes a limit order when the stop price trades
    StopLimit,
    /// Market-if-touched order - becomes a market order when the price is touched
    Mit,
}

impl OrderType {
    /// Returns true if this order type carries a price.
    ///
    /// Every type except Market is priced; for stop types the price is the
    /// trigger level.
    pub fn is_priced(&self) -> bool {
        !matches!(self, OrderType::Market)
    }
}

impl fmt::Display for OrderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderType::Market => write!(f, "MARKET"),
            OrderType::Limit => write!(f, "LIMIT"),
            OrderType::StopMarket => write!(f, "STOP_MARKET"),
            OrderType::StopLimit => write!(f, "STOP_LIMIT"),
            OrderType::Mit => write!(f, "MIT"),
        }
    }
}

/// The role an order plays inside an atomic (bracket) submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderPurpose {
    /// Standalone order
    #[default]
    None,
    /// Bracket entry order
    Entry,
    /// Bracket stop-loss child
    StopLoss,
    /// Bracket take-profit child
    TakeProfit,
}

impl fmt::Display for OrderPurpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderPurpose::None => write!(f, "NONE"),
            OrderPurpose::Entry => write!(f, "ENTRY"),
            OrderPurpose::StopLoss => write!(f, "STOP_LOSS"),
            OrderPurpose::TakeProfit => write!(f, "TAKE_PROFIT"),
        }
    }
}

/// Order status representing the current state in the order lifecycle.
///
/// State transitions:
/// ```text
/// Initialized ─┬→ Invalid
///              ├→ Denied
///              └→ Submitted ─┬→ Rejected
///                            └→ Accepted → Working ─┬→ Cancelled
///                                                   ├→ Expired
///                                                   ├→ (Modified, stays Working)
///                                                   ├→ PartiallyFilled ↻
///                                                   ├→ Filled
///                                                   └→ OverFilled
/// ```
/// Market orders may fill straight from Accepted - no `OrderWorking` event
/// precedes a market fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    /// Order has been created but not yet submitted
    Initialized,
    /// Order failed validation before submission (terminal)
    Invalid,
    /// Order was denied by a pre-submission check (terminal)
    Denied,
    /// Order has been submitted to the brokerage
    Submitted,
    /// Order was rejected by the brokerage (terminal)
    Rejected,
    /// Order has been accepted by the brokerage
    Accepted,
    /// Order is live in the venue's book
    Working,
    /// Order has been cancelled (terminal)
    Cancelled,
    /// Order time-in-force expired (terminal)
    Expired,
    /// Order has fills but quantity remains
    PartiallyFilled,
    /// Order is completely filled (terminal)
    Filled,
    /// Filled quantity exceeds order quantity (terminal, flagged upstream)
    OverFilled,
}

impl OrderStatus {
    /// Returns true if the order is in a terminal state
    pub fn is_completed(&self) -> bool {
        matches!(
            self,
            OrderStatus::Invalid
                | OrderStatus::Denied
                | OrderStatus::Rejected
                | OrderStatus::Cancelled
                | OrderStatus::Expired
                | OrderStatus::Filled
                | OrderStatus::OverFilled
        )
    }

    /// Returns true if the order is live in the book and expecting fills
    pub fn is_working(&self) -> bool {
        matches!(self, OrderStatus::Working | OrderStatus::PartiallyFilled)
    }

    /// Check if a transition from the current status to `target` is valid
    pub fn can_transition_to(&self, target: OrderStatus) -> bool {
        match self {
            OrderStatus::Initialized => matches!(
                target,
                OrderStatus::Invalid | OrderStatus::Denied | OrderStatus::Submitted
            ),
            OrderStatus::Submitted => {
                matches!(target, OrderStatus::Rejected | OrderStatus::Accepted)
            }
            // Market orders fill without ever reaching Working.
            OrderStatus::Accepted => matches!(
                target,
                OrderStatus::Working
                    | OrderStatus::Cancelled
                    | OrderStatus::Expired
                    | OrderStatus::PartiallyFilled
                    | OrderStatus::Filled
                    | OrderStatus::OverFilled
            ),
            OrderStatus::Working | OrderStatus::PartiallyFilled => matches!(
                target,
                OrderStatus::Working
                    | OrderStatus::Cancelled
                    | OrderStatus::Expired
                    | OrderStatus::PartiallyFilled
                    | OrderStatus::Filled
                    | OrderStatus::OverFilled
            ),
            // Terminal states cannot transition.
            OrderStatus::Invalid
            | OrderStatus::Denied
            | OrderStatus::Rejected
            | OrderStatus::Cancelled
            | OrderStatus::Expired
            | OrderStatus::Filled
            | OrderStatus::OverFilled => false,
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderStatus::Initialized => write!(f, "INITIALIZED"),
            OrderStatus::Invalid => write!(f, "INVALID"),
            OrderStatus::Denied => write!(f, "DENIED"),
            OrderStatus::Submitted => write!(f, "SUBMITTED"),
            OrderStatus::Rejected => write!(f, "REJECTED"),
            OrderStatus::Accepted => write!(f, "ACCEPTED"),
            OrderStatus::Working => write!(f, "WORKING"),
            OrderStatus::Cancelled => write!(f, "CANCELLED"),
            OrderStatus::Expired => write!(f, "EXPIRED"),
            OrderStatus::PartiallyFilled => write!(f, "PARTIALLY_FILLED"),
            OrderStatus::Filled => write!(f, "FILLED"),
            OrderStatus::OverFilled => write!(f, "OVER_FILLED"),
        }
    }
}

/// Time-in-force specifying how long an order remains active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TimeInForce {
    /// Day order - expires at end of trading day
    Day,
    /// Good-Till-Cancelled - remains active until filled or cancelled
    #[default]
    Gtc,
    /// Good-Till-Date - remains active until the expire time
    Gtd,
    /// Fill-Or-Cancel - fill the entire quantity immediately or cancel
    Foc,
    /// Immediate-Or-Cancel - fill what is available, cancel the remainder
    Ioc,
}

impl TimeInForce {
    /// Returns true if this TIF requires an expiry timestamp
    pub fn requires_expire_time(&self) -> bool {
        matches!(self, TimeInForce::Gtd)
    }
}

impl fmt::Display for TimeInForce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeInForce::Day => write!(f, "DAY"),
            TimeInForce::Gtc => write!(f, "GTC"),
            TimeInForce::Gtd => write!(f, "GTD"),
            TimeInForce::Foc => write!(f, "FOC"),
            TimeInForce::Ioc => write!(f, "IOC"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_side_opposite() {
        assert_eq!(OrderSide::Buy.opposite(), OrderSide::Sell);
        assert_eq!(OrderSide::Sell.opposite(), OrderSide::Buy);
    }

    #[test]
    fn test_order_type_priced() {
        assert!(!OrderType::Market.is_priced());
        assert!(OrderType::Limit.is_priced());
        assert!(OrderType::StopMarket.is_priced());
        assert!(OrderType::StopLimit.is_priced());
        assert!(OrderType::Mit.is_priced());
    }

    #[test]
    fn test_order_status_partitions() {
        assert!(OrderStatus::Filled.is_completed());
        assert!(OrderStatus::OverFilled.is_completed());
        assert!(OrderStatus::Cancelled.is_completed());
        assert!(OrderStatus::Expired.is_completed());
        assert!(OrderStatus::Invalid.is_completed());
        assert!(OrderStatus::Denied.is_completed());
        assert!(OrderStatus::Rejected.is_completed());

        assert!(OrderStatus::Working.is_working());
        assert!(OrderStatus::PartiallyFilled.is_working());

        // No state is both working and completed.
        for status in [
            OrderStatus::Initialized,
            OrderStatus::Invalid,
            OrderStatus::Denied,
            OrderStatus::Submitted,
            OrderStatus::Rejected,
            OrderStatus::Accepted,
            OrderStatus::Working,
            OrderStatus::Cancelled,
            OrderStatus::Expired,
            OrderStatus::PartiallyFilled,
            OrderStatus::Filled,
            OrderStatus::OverFilled,
        ] {
            assert!(!(status.is_working() && status.is_completed()), "{status}");
        }
    }

    #[test]
    fn test_order_status_transitions() {
        assert!(OrderStatus::Initialized.can_transition_to(OrderStatus::Submitted));
        assert!(OrderStatus::Initialized.can_transition_to(OrderStatus::Invalid));
        assert!(OrderStatus::Submitted.can_transition_to(OrderStatus::Accepted));
        assert!(OrderStatus::Submitted.can_transition_to(OrderStatus::Rejected));
        assert!(OrderStatus::Accepted.can_transition_to(OrderStatus::Working));
        assert!(OrderStatus::Accepted.can_transition_to(OrderStatus::Filled));
        assert!(OrderStatus::Working.can_transition_to(OrderStatus::PartiallyFilled));
        assert!(OrderStatus::PartiallyFilled.can_transition_to(OrderStatus::Filled));
        assert!(OrderStatus::PartiallyFilled.can_transition_to(OrderStatus::OverFilled));

        assert!(!OrderStatus::Filled.can_transition_to(OrderStatus::Cancelled));
        assert!(!OrderStatus::Rejected.can_transition_to(OrderStatus::Accepted));
        assert!(!OrderStatus::Initialized.can_transition_to(OrderStatus::Accepted));
    }

    #[test]
    fn test_time_in_force() {
        assert_eq!(TimeInForce::default(), TimeInForce::Gtc);
        assert!(TimeInForce::Gtd.requires_expire_time());
        assert!(!TimeInForce::Day.requires_expire_time());
    }

    #[test]
    fn test_symbol_parse() {
        let symbol = Symbol::parse("AAPL.NASDAQ").unwrap();
        assert_eq!(symbol.code, "AAPL");
        assert_eq!(symbol.venue, "NASDAQ");
        assert_eq!(symbol.to_string(), "AAPL.NASDAQ");

        assert!(Symbol::parse("AAPL").is_none());
        assert!(Symbol::parse(".NASDAQ").is_none());
    }

    #[test]
    fn test_quantity() {
        let qty = Quantity::new(100);
        assert_eq!(qty.value(), 100);
        assert!(!qty.is_zero());
        assert!(Quantity::zero().is_zero());
        assert_eq!(Quantity::new(40) + Quantity::new(60), Quantity::new(100));
        assert!(Quantity::new(99) < Quantity::new(100));
    }
}
