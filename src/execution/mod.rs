//! Execution pipeline: commands in, events out, one writer in between.
//!
//! - **Commands**: [`TradingCommand`] and friends, produced by strategies
//! - **Database**: [`ExecutionDatabase`] owning all order/position state
//! - **Engine**: [`ExecutionEngine`], the sole mutator
//! - **Client**: [`ExecutionClient`], the outbound port to the brokerage
//! - **Stubs**: recording test doubles for client and strategy

pub mod stubs;

mod client;
mod commands;
mod database;
mod engine;
mod events;

pub use client::{ClientError, ExecutionClient};
pub use commands::{
    AccountInquiry, CancelOrder, ModifyOrder, SubmitAtomicOrder, SubmitOrder, TradingCommand,
};
pub use database::{DatabaseError, ExecutionDatabase, InMemoryExecutionDatabase};
pub use engine::{CommandSender, EngineError, ExecutionEngine};
pub use events::ExecutionEvent;
