//! Strategy inbound port.

use crate::execution::{CommandSender, ExecutionEvent};
use crate::orders::StrategyId;

/// A trading strategy as seen by the execution engine.
///
/// The engine owns registered strategies in a `StrategyId -> handle`
/// registry and forwards events to them; each strategy receives a
/// [`CommandSender`] at registration as its narrow surface back into the
/// engine. Strategies own their
/// [`OrderFactory`](crate::orders::OrderFactory), which is strategy-scoped
/// and therefore single-threaded.
pub trait Strategy {
    /// Identifier this strategy registers under
    fn id(&self) -> &StrategyId;

    /// Called once at registration with the engine's command surface.
    fn register_execution_engine(&mut self, commands: CommandSender);

    /// Receive an event the engine attributes to this strategy.
    fn handle_event(&mut self, event: &ExecutionEvent);
}
