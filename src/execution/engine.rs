//! Execution engine: the single writer over execution state.
//!
//! Commands from strategies are recorded into the database and forwarded to
//! the execution client; events returning from the brokerage are applied to
//! the referenced order, drive position transitions, and are forwarded to
//! the owning strategy. Everything runs on one logical dispatch thread:
//! producers enqueue commands through a [`CommandSender`], the engine drains
//! them.

use std::collections::HashMap;
use std::sync::mpsc;

use tracing::{error, warn};

use crate::accounts::{Account, AccountStateEvent};
use crate::orders::{OrderEventAny, OrderFilled, StrategyId};
use crate::portfolio::PortfolioAnalyzer;
use crate::positions::{Position, PositionClosed, PositionEventAny, PositionModified, PositionOpened};
use crate::strategy::Strategy;

use super::client::{ClientError, ExecutionClient};
use super::commands::TradingCommand;
use super::database::{DatabaseError, ExecutionDatabase};
use super::events::ExecutionEvent;

/// Cloneable handle strategies use to enqueue commands for the engine.
///
/// This is the narrow command surface a strategy receives at registration;
/// queries go through the engine's database accessor instead.
#[derive(Clone)]
pub struct CommandSender {
    tx: mpsc::Sender<TradingCommand>,
}

impl CommandSender {
    /// Enqueue a command for the engine's next drain.
    pub fn send(&self, command: impl Into<TradingCommand>) -> Result<(), EngineError> {
        self.tx
            .send(command.into())
            .map_err(|_| EngineError::ChannelClosed)
    }
}

/// Dispatches commands outbound and events inbound, preserving the
/// referential integrity of orders, positions, strategies and the account.
pub struct ExecutionEngine {
    database: Box<dyn ExecutionDatabase>,
    account: Account,
    portfolio: Box<dyn PortfolioAnalyzer>,
    client: Option<Box<dyn ExecutionClient>>,
    strategies: HashMap<StrategyId, Box<dyn Strategy>>,
    command_tx: mpsc::Sender<TradingCommand>,
    command_rx: mpsc::Receiver<TradingCommand>,
    command_count: u64,
    event_count: u64,
}

impl ExecutionEngine {
    pub fn new(database: Box<dyn ExecutionDatabase>, portfolio: Box<dyn PortfolioAnalyzer>) -> Self {
        let (command_tx, command_rx) = mpsc::channel();
        Self {
            database,
            account: Account::new(),
            portfolio,
            client: None,
            strategies: HashMap::new(),
            command_tx,
            command_rx,
            command_count: 0,
            event_count: 0,
        }
    }

    /// Register the outbound execution client.
    pub fn register_client(&mut self, client: Box<dyn ExecutionClient>) {
        self.client = Some(client);
    }

    /// Register a strategy: adds it to the database, hands it a command
    /// sender, and takes ownership of its event handle.
    pub fn register_strategy(&mut self, mut strategy: Box<dyn Strategy>) -> Result<(), EngineError> {
        let strategy_id = strategy.id().clone();
        self.database.add_strategy(strategy_id.clone())?;
        strategy.register_execution_engine(self.command_sender());
        self.strategies.insert(strategy_id, strategy);
        Ok(())
    }

    /// Deregister a strategy. Its orders and positions remain in the
    /// database.
    pub fn deregister_strategy(&mut self, strategy_id: &StrategyId) -> Result<(), EngineError> {
        self.database.delete_strategy(strategy_id)?;
        self.strategies.remove(strategy_id);
        Ok(())
    }

    /// A fresh command handle for producers.
    pub fn command_sender(&self) -> CommandSender {
        CommandSender {
            tx: self.command_tx.clone(),
        }
    }

    /// Drain and execute every queued command, returning how many were
    /// processed. Command failures are logged and do not stop the drain.
    pub fn run_pending_commands(&mut self) -> usize {
        let mut processed = 0;
        while let Ok(command) = self.command_rx.try_recv() {
            processed += 1;
            if let Err(err) = self.execute_command(command) {
                error!(%err, "Command execution failed");
            }
        }
        processed
    }

    /// Execute a single command: record intent, then forward to the client.
    pub fn execute_command(&mut self, command: TradingCommand) -> Result<(), EngineError> {
        let Some(client) = self.client.as_deref_mut() else {
            return Err(EngineError::NoClient);
        };
        match &command {
            TradingCommand::AccountInquiry(c) => {
                client.account_inquiry(c)?;
            }
            TradingCommand::SubmitOrder(c) => {
                self.database.add_order(
                    c.order.clone(),
                    c.strategy_id.clone(),
                    c.position_id.clone(),
                )?;
                client.submit_order(c)?;
            }
            TradingCommand::SubmitAtomicOrder(c) => {
                self.database.add_order(
                    c.atomic_order.entry.clone(),
                    c.strategy_id.clone(),
                    c.position_id.clone(),
                )?;
                self.database.add_order(
                    c.atomic_order.stop_loss.clone(),
                    c.strategy_id.clone(),
                    c.position_id.clone(),
                )?;
                if let Some(take_profit) = &c.atomic_order.take_profit {
                    self.database.add_order(
                        take_profit.clone(),
                        c.strategy_id.clone(),
                        c.position_id.clone(),
                    )?;
                }
                client.submit_atomic_order(c)?;
            }
            TradingCommand::ModifyOrder(c) => {
                // Database mutation waits for the OrderModified event.
                client.modify_order(c)?;
            }
            TradingCommand::CancelOrder(c) => {
                client.cancel_order(c)?;
            }
        }
        self.command_count += 1;
        Ok(())
    }

    /// Handle an event returning from the brokerage or derived internally.
    ///
    /// A malformed event never takes the engine down: reference misses and
    /// apply failures are logged and the event is dropped. The event count
    /// reflects receipt, not success.
    pub fn handle_event(&mut self, event: ExecutionEvent) {
        self.event_count += 1;
        match event {
            ExecutionEvent::Order(event) => self.handle_order_event(event),
            ExecutionEvent::Position(event) => self.handle_position_event(event),
            ExecutionEvent::Account(event) => self.handle_account_event(event),
        }
    }

    fn handle_order_event(&mut self, event: OrderEventAny) {
        let order_id = event.order_id().clone();
        let Some(mut order) = self.database.get_order(&order_id) else {
            error!(%order_id, "Event for unknown order dropped");
            return;
        };
        if let Err(err) = order.apply(event.clone()) {
            error!(%order_id, %err, "Order event dropped");
            return;
        }
        if let Err(err) = self.database.update_order(order) {
            error!(%order_id, %err, "Order update failed; event dropped");
            return;
        }
        let Some(strategy_id) = self.database.get_strategy_for_order(&order_id) else {
            error!(%order_id, "No strategy indexed for order; event dropped");
            return;
        };

        match event {
            OrderEventAny::Filled(fill) => self.handle_order_fill(fill, strategy_id),
            other => self.send_to_strategy(&strategy_id, ExecutionEvent::Order(other)),
        }
    }

    /// Fill sub-protocol: open or mutate the position mapped to the filled
    /// order, forward the fill, then run the derived position event back
    /// through the event path (bounded recursion, depth 2).
    fn handle_order_fill(&mut self, fill: OrderFilled, strategy_id: StrategyId) {
        let order_id = fill.order_id.clone();
        let Some(position_id) = self.database.get_position_id(&order_id) else {
            error!(%order_id, "No position id indexed for filled order; fill dropped");
            return;
        };

        let position_event: PositionEventAny = if let Some(mut position) =
            self.database.get_position(&position_id)
        {
            position.apply(&fill);
            let event: PositionEventAny = if position.is_closed() {
                PositionClosed::new(&position, strategy_id.clone(), fill.ts_event).into()
            } else {
                PositionModified::new(&position, strategy_id.clone(), fill.ts_event).into()
            };
            if let Err(err) = self.database.update_position(position) {
                error!(%position_id, %err, "Position update failed; fill dropped");
                return;
            }
            event
        } else {
            let position = Position::new(position_id.clone(), &fill);
            let opened = PositionOpened::new(&position, strategy_id.clone(), fill.ts_event);
            if let Err(err) = self.database.add_position(position, strategy_id.clone()) {
                error!(%position_id, %err, "Position insert failed; fill dropped");
                return;
            }
            opened.into()
        };

        self.send_to_strategy(&strategy_id, ExecutionEvent::Order(OrderEventAny::Filled(fill)));
        self.handle_event(ExecutionEvent::Position(position_event));
    }

    fn handle_position_event(&mut self, event: PositionEventAny) {
        if let PositionEventAny::Closed(closed) = &event {
            self.portfolio.on_position_closed(closed);
        }
        let strategy_id = event.strategy_id().clone();
        self.send_to_strategy(&strategy_id, ExecutionEvent::Position(event));
    }

    fn handle_account_event(&mut self, event: AccountStateEvent) {
        if self.account.initialized() && self.account.id.as_ref() != Some(&event.account_id) {
            warn!(
                account_id = %event.account_id,
                "Account state event for foreign account dropped"
            );
            return;
        }
        if let Err(err) = self.account.apply(event.clone()) {
            warn!(%err, "Account state event dropped");
            return;
        }
        self.database.update_account(&self.account);
        self.portfolio.on_account_state(&event);
    }

    fn send_to_strategy(&mut self, strategy_id: &StrategyId, event: ExecutionEvent) {
        match self.strategies.get_mut(strategy_id) {
            Some(strategy) => strategy.handle_event(&event),
            None => warn!(%strategy_id, "No strategy handle registered; event not forwarded"),
        }
    }

    /// Query surface over the owned database
    pub fn database(&self) -> &dyn ExecutionDatabase {
        self.database.as_ref()
    }

    /// Last-known account state
    pub fn account(&self) -> &Account {
        &self.account
    }

    /// Portfolio analyzer receiving realized returns and transactions
    pub fn portfolio(&self) -> &dyn PortfolioAnalyzer {
        self.portfolio.as_ref()
    }

    /// Commands accepted so far
    pub fn command_count(&self) -> u64 {
        self.command_count
    }

    /// Events received so far, including dropped ones
    pub fn event_count(&self) -> u64 {
        self.event_count
    }

    /// Log any residual working orders or open positions.
    pub fn check_residuals(&self) {
        self.database.check_residuals();
    }

    /// Clear all execution state for a fresh run. Registered strategies are
    /// released and must re-register.
    pub fn reset(&mut self) {
        self.database.reset();
        self.account.reset();
        self.strategies.clear();
        if let Some(client) = self.client.as_mut() {
            client.reset();
        }
        self.command_count = 0;
        self.event_count = 0;
    }
}

/// Errors surfaced by engine command handling.
#[derive(Debug, Clone, thiserror::Error)]
pub enum EngineError {
    #[error("No execution client registered")]
    NoClient,

    #[error("Command channel closed")]
    ChannelClosed,

    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error(transparent)]
    Client(#[from] ClientError),
}
