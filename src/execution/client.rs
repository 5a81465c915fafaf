//! Execution client outbound port.

use super::commands::{AccountInquiry, CancelOrder, ModifyOrder, SubmitAtomicOrder, SubmitOrder};

/// Connection to a brokerage/exchange gateway.
///
/// Implementations carry commands to the wire and feed returning events back
/// through `ExecutionEngine::handle_event`. None of these operations may
/// block the engine thread; an implementation that performs I/O must enqueue
/// internally and return immediately.
pub trait ExecutionClient {
    /// Establish the connection.
    fn connect(&mut self) -> Result<(), ClientError>;

    /// Tear the connection down.
    fn disconnect(&mut self) -> Result<(), ClientError>;

    /// Returns true while the client is usable.
    fn is_connected(&self) -> bool;

    /// Request an account state snapshot.
    fn account_inquiry(&mut self, command: &AccountInquiry) -> Result<(), ClientError>;

    /// Push a single order to the brokerage.
    fn submit_order(&mut self, command: &SubmitOrder) -> Result<(), ClientError>;

    /// Push an atomic order to the brokerage.
    fn submit_atomic_order(&mut self, command: &SubmitAtomicOrder) -> Result<(), ClientError>;

    /// Request an order modification.
    fn modify_order(&mut self, command: &ModifyOrder) -> Result<(), ClientError>;

    /// Request an order cancellation.
    fn cancel_order(&mut self, command: &CancelOrder) -> Result<(), ClientError>;

    /// Clear any client-side state for a fresh run.
    fn reset(&mut self);

    /// Release resources; the client will not be used again.
    fn dispose(&mut self);
}

/// Errors surfaced by execution clients.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ClientError {
    #[error("Client is not connected")]
    NotConnected,

    #[error("Transport failure: {0}")]
    Transport(String),
}
