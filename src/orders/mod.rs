//! Order model for the execution core.
//!
//! - **Types**: identifier newtypes, `Quantity`, order enums
//! - **Events**: the order event taxonomy and `OrderEventAny` sum type
//! - **Order / AtomicOrder**: entities mutated only through `Order::apply`
//! - **OrderFactory**: validated construction with monotonic ids

mod events;
mod factory;
mod order;
mod types;

pub use events::{
    EventId, OrderAccepted, OrderCancelReject, OrderCancelled, OrderDenied, OrderEventAny,
    OrderExpired, OrderFilled, OrderInitialized, OrderInvalid, OrderModified, OrderRejected,
    OrderSubmitted, OrderWorking,
};

pub use factory::OrderFactory;

pub use order::{AtomicOrder, Order, OrderError};

pub use types::{
    AccountId, Brokerage, ExecutionId, Label, OrderId, OrderPurpose, OrderSide, OrderStatus,
    OrderType, PositionId, Quantity, StrategyId, Symbol, TimeInForce, TraderId, VenueOrderId,
    VenuePositionId,
};
