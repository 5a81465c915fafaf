//! Test doubles for the execution ports.
//!
//! Shipped in-tree so unit, integration and downstream tests can wire up an
//! engine without a brokerage.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::orders::StrategyId;
use crate::strategy::Strategy;

use super::client::{ClientError, ExecutionClient};
use super::commands::{
    AccountInquiry, CancelOrder, ModifyOrder, SubmitAtomicOrder, SubmitOrder, TradingCommand,
};
use super::engine::CommandSender;
use super::events::ExecutionEvent;

/// Shared view over the commands a [`RecordingExecutionClient`] received.
#[derive(Clone, Default)]
pub struct CommandLog(Arc<Mutex<Vec<TradingCommand>>>);

impl CommandLog {
    pub fn len(&self) -> usize {
        self.0.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.lock().is_empty()
    }

    pub fn all(&self) -> Vec<TradingCommand> {
        self.0.lock().clone()
    }

    pub fn last(&self) -> Option<TradingCommand> {
        self.0.lock().last().cloned()
    }

    fn push(&self, command: TradingCommand) {
        self.0.lock().push(command);
    }

    fn clear(&self) {
        self.0.lock().clear();
    }
}

/// Execution client that records every command and acknowledges nothing.
#[derive(Default)]
pub struct RecordingExecutionClient {
    log: CommandLog,
    connected: bool,
}

impl RecordingExecutionClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle to inspect recorded commands after the engine takes ownership.
    pub fn log(&self) -> CommandLog {
        self.log.clone()
    }
}

impl ExecutionClient for RecordingExecutionClient {
    fn connect(&mut self) -> Result<(), ClientError> {
        self.connected = true;
        Ok(())
    }

    fn disconnect(&mut self) -> Result<(), ClientError> {
        self.connected = false;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn account_inquiry(&mut self, command: &AccountInquiry) -> Result<(), ClientError> {
        self.log.push(command.clone().into());
        Ok(())
    }

    fn submit_order(&mut self, command: &SubmitOrder) -> Result<(), ClientError> {
        self.log.push(command.clone().into());
        Ok(())
    }

    fn submit_atomic_order(&mut self, command: &SubmitAtomicOrder) -> Result<(), ClientError> {
        self.log.push(command.clone().into());
        Ok(())
    }

    fn modify_order(&mut self, command: &ModifyOrder) -> Result<(), ClientError> {
        self.log.push(command.clone().into());
        Ok(())
    }

    fn cancel_order(&mut self, command: &CancelOrder) -> Result<(), ClientError> {
        self.log.push(command.clone().into());
        Ok(())
    }

    fn reset(&mut self) {
        self.log.clear();
    }

    fn dispose(&mut self) {
        self.connected = false;
    }
}

/// Shared view over the events a [`RecordingStrategy`] received.
#[derive(Clone, Default)]
pub struct EventLog(Rc<RefCell<Vec<ExecutionEvent>>>);

impl EventLog {
    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }

    pub fn all(&self) -> Vec<ExecutionEvent> {
        self.0.borrow().clone()
    }

    fn push(&self, event: ExecutionEvent) {
        self.0.borrow_mut().push(event);
    }
}

/// Strategy that records every event forwarded to it.
pub struct RecordingStrategy {
    id: StrategyId,
    events: EventLog,
    commands: Option<CommandSender>,
}

impl RecordingStrategy {
    pub fn new(id: StrategyId) -> Self {
        Self {
            id,
            events: EventLog::default(),
            commands: None,
        }
    }

    /// Handle to inspect received events after the engine takes ownership.
    pub fn events(&self) -> EventLog {
        self.events.clone()
    }

    /// The command sender received at registration, if registered.
    pub fn command_sender(&self) -> Option<CommandSender> {
        self.commands.clone()
    }
}

impl Strategy for RecordingStrategy {
    fn id(&self) -> &StrategyId {
        &self.id
    }

    fn register_execution_engine(&mut self, commands: CommandSender) {
        self.commands = Some(commands);
    }

    fn handle_event(&mut self, event: &ExecutionEvent) {
        self.events.push(event.clone());
    }
}
