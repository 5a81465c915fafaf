//! Trading commands flowing from strategies into the engine.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::orders::{AtomicOrder, EventId, Order, OrderId, PositionId, Quantity, StrategyId};

/// Request for a fresh account state snapshot from the brokerage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountInquiry {
    pub command_id: EventId,
    pub ts_init: DateTime<Utc>,
}

impl AccountInquiry {
    pub fn new(ts_init: DateTime<Utc>) -> Self {
        Self {
            command_id: EventId::new(),
            ts_init,
        }
    }
}

/// Submit a single order under a strategy and position id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitOrder {
    pub command_id: EventId,
    pub order: Order,
    pub strategy_id: StrategyId,
    pub position_id: PositionId,
    pub ts_init: DateTime<Utc>,
}

impl SubmitOrder {
    pub fn new(
        order: Order,
        strategy_id: StrategyId,
        position_id: PositionId,
        ts_init: DateTime<Utc>,
    ) -> Self {
        Self {
            command_id: EventId::new(),
            order,
            strategy_id,
            position_id,
            ts_init,
        }
    }
}

/// Submit an atomic (bracket) order as one logical unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitAtomicOrder {
    pub command_id: EventId,
    pub atomic_order: AtomicOrder,
    pub strategy_id: StrategyId,
    pub position_id: PositionId,
    pub ts_init: DateTime<Utc>,
}

impl SubmitAtomicOrder {
    pub fn new(
        atomic_order: AtomicOrder,
        strategy_id: StrategyId,
        position_id: PositionId,
        ts_init: DateTime<Utc>,
    ) -> Self {
        Self {
            command_id: EventId::new(),
            atomic_order,
            strategy_id,
            position_id,
            ts_init,
        }
    }
}

/// Request a working order's quantity and price be rewritten.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModifyOrder {
    pub command_id: EventId,
    pub order_id: OrderId,
    pub modified_quantity: Quantity,
    pub modified_price: Decimal,
    pub ts_init: DateTime<Utc>,
}

impl ModifyOrder {
    pub fn new(
        order_id: OrderId,
        modified_quantity: Quantity,
        modified_price: Decimal,
        ts_init: DateTime<Utc>,
    ) -> Self {
        Self {
            command_id: EventId::new(),
            order_id,
            modified_quantity,
            modified_price,
            ts_init,
        }
    }
}

/// Request an order be cancelled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelOrder {
    pub command_id: EventId,
    pub order_id: OrderId,
    pub cancel_reason: String,
    pub ts_init: DateTime<Utc>,
}

impl CancelOrder {
    pub fn new(
        order_id: OrderId,
        cancel_reason: impl Into<String>,
        ts_init: DateTime<Utc>,
    ) -> Self {
        Self {
            command_id: EventId::new(),
            order_id,
            cancel_reason: cancel_reason.into(),
            ts_init,
        }
    }
}

/// Enum containing all trading commands for unified dispatch.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TradingCommand {
    AccountInquiry(AccountInquiry),
    SubmitOrder(SubmitOrder),
    SubmitAtomicOrder(SubmitAtomicOrder),
    ModifyOrder(ModifyOrder),
    CancelOrder(CancelOrder),
}

impl From<AccountInquiry> for TradingCommand {
    fn from(c: AccountInquiry) -> Self {
        TradingCommand::AccountInquiry(c)
    }
}

impl From<SubmitOrder> for TradingCommand {
    fn from(c: SubmitOrder) -> Self {
        TradingCommand::SubmitOrder(c)
    }
}

impl From<SubmitAtomicOrder> for TradingCommand {
    fn from(c: SubmitAtomicOrder) -> Self {
        TradingCommand::SubmitAtomicOrder(c)
    }
}

impl From<ModifyOrder> for TradingCommand {
    fn from(c: ModifyOrder) -> Self {
        TradingCommand::ModifyOrder(c)
    }
}

impl From<CancelOrder> for TradingCommand {
    fn from(c: CancelOrder) -> Self {
        TradingCommand::CancelOrder(c)
    }
}
