//! Execution database: the sole owner of order and position state.
//!
//! The database is a pure indexed store. All mutation goes through the
//! execution engine; queries return defensive copies so concurrent readers
//! never observe a partially-updated view.

use std::collections::{HashMap, HashSet};

use tracing::warn;

use crate::accounts::Account;
use crate::orders::{Order, OrderId, PositionId, StrategyId, TraderId};
use crate::positions::Position;

/// Store and index surface backing the execution engine.
///
/// Two families of implementation exist: in-memory (this module) and
/// durable. The engine is written against the trait and cannot tell them
/// apart.
pub trait ExecutionDatabase {
    /// Register a strategy.
    fn add_strategy(&mut self, strategy_id: StrategyId) -> Result<(), DatabaseError>;

    /// Deregister a strategy, detaching its index sets. Orders and positions
    /// remain in the store.
    fn delete_strategy(&mut self, strategy_id: &StrategyId) -> Result<(), DatabaseError>;

    /// Insert a new order under a strategy and position id.
    ///
    /// Fails on any duplicate id, and when `position_id` is already mapped
    /// to a different strategy.
    fn add_order(
        &mut self,
        order: Order,
        strategy_id: StrategyId,
        position_id: PositionId,
    ) -> Result<(), DatabaseError>;

    /// Insert a new position and mark it open.
    fn add_position(
        &mut self,
        position: Position,
        strategy_id: StrategyId,
    ) -> Result<(), DatabaseError>;

    /// Store the order's new state and re-partition it between the working
    /// and completed sets.
    fn update_order(&mut self, order: Order) -> Result<(), DatabaseError>;

    /// Store the position's new state, moving it to the closed set when its
    /// net quantity has returned to zero.
    fn update_position(&mut self, position: Position) -> Result<(), DatabaseError>;

    /// Persist account state. A no-op for the in-memory variant; retained
    /// for durable implementations.
    fn update_account(&mut self, account: &Account);

    /// Registered strategy ids
    fn strategy_ids(&self) -> HashSet<StrategyId>;

    fn order_exists(&self, order_id: &OrderId) -> bool;
    fn is_order_working(&self, order_id: &OrderId) -> bool;
    fn is_order_completed(&self, order_id: &OrderId) -> bool;
    fn get_order(&self, order_id: &OrderId) -> Option<Order>;
    fn get_orders(&self, strategy_id: Option<&StrategyId>) -> HashMap<OrderId, Order>;
    fn get_orders_working(&self, strategy_id: Option<&StrategyId>) -> HashMap<OrderId, Order>;
    fn get_orders_completed(&self, strategy_id: Option<&StrategyId>) -> HashMap<OrderId, Order>;

    /// The strategy an order was submitted under
    fn get_strategy_for_order(&self, order_id: &OrderId) -> Option<StrategyId>;

    /// The position id an order was submitted against
    fn get_position_id(&self, order_id: &OrderId) -> Option<PositionId>;

    fn position_exists(&self, position_id: &PositionId) -> bool;
    fn is_position_open(&self, position_id: &PositionId) -> bool;
    fn is_position_closed(&self, position_id: &PositionId) -> bool;
    fn get_position(&self, position_id: &PositionId) -> Option<Position>;
    fn get_positions(&self, strategy_id: Option<&StrategyId>) -> HashMap<PositionId, Position>;
    fn get_positions_open(&self, strategy_id: Option<&StrategyId>)
        -> HashMap<PositionId, Position>;
    fn get_positions_closed(
        &self,
        strategy_id: Option<&StrategyId>,
    ) -> HashMap<PositionId, Position>;

    /// The strategy owning a position
    fn get_strategy_for_position(&self, position_id: &PositionId) -> Option<StrategyId>;

    fn count_orders_total(&self, strategy_id: Option<&StrategyId>) -> usize;
    fn count_orders_working(&self, strategy_id: Option<&StrategyId>) -> usize;
    fn count_orders_completed(&self, strategy_id: Option<&StrategyId>) -> usize;
    fn count_positions_total(&self, strategy_id: Option<&StrategyId>) -> usize;
    fn count_positions_open(&self, strategy_id: Option<&StrategyId>) -> usize;
    fn count_positions_closed(&self, strategy_id: Option<&StrategyId>) -> usize;

    /// Log any still-working orders or still-open positions. Never mutates.
    fn check_residuals(&self);

    /// Clear every store and index, leaving the database usable.
    fn reset(&mut self);
}

/// In-memory execution database.
pub struct InMemoryExecutionDatabase {
    trader_id: TraderId,

    orders: HashMap<OrderId, Order>,
    positions: HashMap<PositionId, Position>,
    strategies: HashSet<StrategyId>,

    index_order_strategy: HashMap<OrderId, StrategyId>,
    index_order_position: HashMap<OrderId, PositionId>,
    index_position_strategy: HashMap<PositionId, StrategyId>,
    index_position_orders: HashMap<PositionId, HashSet<OrderId>>,
    index_strategy_orders: HashMap<StrategyId, HashSet<OrderId>>,
    index_strategy_positions: HashMap<StrategyId, HashSet<PositionId>>,

    orders_working: HashSet<OrderId>,
    orders_completed: HashSet<OrderId>,
    positions_open: HashSet<PositionId>,
    positions_closed: HashSet<PositionId>,
}

impl InMemoryExecutionDatabase {
    pub fn new(trader_id: TraderId) -> Self {
        Self {
            trader_id,
            orders: HashMap::new(),
            positions: HashMap::new(),
            strategies: HashSet::new(),
            index_order_strategy: HashMap::new(),
            index_order_position: HashMap::new(),
            index_position_strategy: HashMap::new(),
            index_position_orders: HashMap::new(),
            index_strategy_orders: HashMap::new(),
            index_strategy_positions: HashMap::new(),
            orders_working: HashSet::new(),
            orders_completed: HashSet::new(),
            positions_open: HashSet::new(),
            positions_closed: HashSet::new(),
        }
    }

    fn filter_orders(
        &self,
        ids: impl Iterator<Item = OrderId>,
        strategy_id: Option<&StrategyId>,
    ) -> HashMap<OrderId, Order> {
        ids.filter(|id| match strategy_id {
            None => true,
            Some(strategy) => self.index_order_strategy.get(id) == Some(strategy),
        })
        .filter_map(|id| self.orders.get(&id).map(|order| (id, order.clone())))
        .collect()
    }

    fn filter_positions(
        &self,
        ids: impl Iterator<Item = PositionId>,
        strategy_id: Option<&StrategyId>,
    ) -> HashMap<PositionId, Position> {
        ids.filter(|id| match strategy_id {
            None => true,
            Some(strategy) => self.index_position_strategy.get(id) == Some(strategy),
        })
        .filter_map(|id| {
            self.positions
                .get(&id)
                .map(|position| (id, position.clone()))
        })
        .collect()
    }
}

impl ExecutionDatabase for InMemoryExecutionDatabase {
    fn add_strategy(&mut self, strategy_id: StrategyId) -> Result<(), DatabaseError> {
        if !self.strategies.insert(strategy_id.clone()) {
            return Err(DatabaseError::DuplicateStrategy(strategy_id));
        }
        self.index_strategy_orders
            .entry(strategy_id.clone())
            .or_default();
        self.index_strategy_positions.entry(strategy_id).or_default();
        Ok(())
    }

    fn delete_strategy(&mut self, strategy_id: &StrategyId) -> Result<(), DatabaseError> {
        if !self.strategies.remove(strategy_id) {
            return Err(DatabaseError::UnknownStrategy(strategy_id.clone()));
        }
        self.index_strategy_orders.remove(strategy_id);
        self.index_strategy_positions.remove(strategy_id);
        Ok(())
    }

    fn add_order(
        &mut self,
        order: Order,
        strategy_id: StrategyId,
        position_id: PositionId,
    ) -> Result<(), DatabaseError> {
        let order_id = order.id.clone();
        if self.orders.contains_key(&order_id)
            || self.index_order_strategy.contains_key(&order_id)
            || self.index_order_position.contains_key(&order_id)
        {
            return Err(DatabaseError::DuplicateOrder(order_id));
        }
        if let Some(registered) = self.index_position_strategy.get(&position_id) {
            if registered != &strategy_id {
                return Err(DatabaseError::PositionStrategyMismatch {
                    position_id,
                    registered: registered.clone(),
                    given: strategy_id,
                });
            }
        }

        self.index_order_strategy
            .insert(order_id.clone(), strategy_id.clone());
        self.index_order_position
            .insert(order_id.clone(), position_id.clone());
        self.index_position_strategy
            .insert(position_id.clone(), strategy_id.clone());
        self.index_position_orders
            .entry(position_id.clone())
            .or_default()
            .insert(order_id.clone());
        self.index_strategy_orders
            .entry(strategy_id.clone())
            .or_default()
            .insert(order_id.clone());
        self.index_strategy_positions
            .entry(strategy_id)
            .or_default()
            .insert(position_id);
        self.orders.insert(order_id, order);
        Ok(())
    }

    fn add_position(
        &mut self,
        position: Position,
        strategy_id: StrategyId,
    ) -> Result<(), DatabaseError> {
        let position_id = position.id.clone();
        if self.positions.contains_key(&position_id) {
            return Err(DatabaseError::DuplicatePosition(position_id));
        }
        if let Some(registered) = self.index_position_strategy.get(&position_id) {
            if registered != &strategy_id {
                return Err(DatabaseError::PositionStrategyMismatch {
                    position_id,
                    registered: registered.clone(),
                    given: strategy_id,
                });
            }
        }

        self.index_position_strategy
            .insert(position_id.clone(), strategy_id.clone());
        self.index_strategy_positions
            .entry(strategy_id)
            .or_default()
            .insert(position_id.clone());
        self.positions_open.insert(position_id.clone());
        self.positions.insert(position_id, position);
        Ok(())
    }

    fn update_order(&mut self, order: Order) -> Result<(), DatabaseError> {
        if !self.orders.contains_key(&order.id) {
            return Err(DatabaseError::UnknownOrder(order.id));
        }
        // Exactly one partition for working/completed orders, neither for
        // pre-submission states.
        if order.is_working() {
            self.orders_working.insert(order.id.clone());
            self.orders_completed.remove(&order.id);
        } else if order.is_completed() {
            self.orders_completed.insert(order.id.clone());
            self.orders_working.remove(&order.id);
        } else {
            self.orders_working.remove(&order.id);
            self.orders_completed.remove(&order.id);
        }
        self.orders.insert(order.id.clone(), order);
        Ok(())
    }

    fn update_position(&mut self, position: Position) -> Result<(), DatabaseError> {
        if !self.positions.contains_key(&position.id) {
            return Err(DatabaseError::UnknownPosition(position.id));
        }
        if position.is_closed() {
            self.positions_open.remove(&position.id);
            self.positions_closed.insert(position.id.clone());
        } else {
            self.positions_closed.remove(&position.id);
            self.positions_open.insert(position.id.clone());
        }
        self.positions.insert(position.id.clone(), position);
        Ok(())
    }

    fn update_account(&mut self, _account: &Account) {
        // Nothing to persist in memory; the engine owns the live account.
    }

    fn strategy_ids(&self) -> HashSet<StrategyId> {
        self.strategies.clone()
    }

    fn order_exists(&self, order_id: &OrderId) -> bool {
        self.orders.contains_key(order_id)
    }

    fn is_order_working(&self, order_id: &OrderId) -> bool {
        self.orders_working.contains(order_id)
    }

    fn is_order_completed(&self, order_id: &OrderId) -> bool {
        self.orders_completed.contains(order_id)
    }

    fn get_order(&self, order_id: &OrderId) -> Option<Order> {
        self.orders.get(order_id).cloned()
    }

    fn get_orders(&self, strategy_id: Option<&StrategyId>) -> HashMap<OrderId, Order> {
        self.filter_orders(self.orders.keys().cloned(), strategy_id)
    }

    fn get_orders_working(&self, strategy_id: Option<&StrategyId>) -> HashMap<OrderId, Order> {
        self.filter_orders(self.orders_working.iter().cloned(), strategy_id)
    }

    fn get_orders_completed(&self, strategy_id: Option<&StrategyId>) -> HashMap<OrderId, Order> {
        self.filter_orders(self.orders_completed.iter().cloned(), strategy_id)
    }

    fn get_strategy_for_order(&self, order_id: &OrderId) -> Option<StrategyId> {
        self.index_order_strategy.get(order_id).cloned()
    }

    fn get_position_id(&self, order_id: &OrderId) -> Option<PositionId> {
        self.index_order_position.get(order_id).cloned()
    }

    fn position_exists(&self, position_id: &PositionId) -> bool {
        self.positions.contains_key(position_id)
    }

    fn is_position_open(&self, position_id: &PositionId) -> bool {
        self.positions_open.contains(position_id)
    }

    fn is_position_closed(&self, position_id: &PositionId) -> bool {
        self.positions_closed.contains(position_id)
    }

    fn get_position(&self, position_id: &PositionId) -> Option<Position> {
        self.positions.get(position_id).cloned()
    }

    fn get_positions(&self, strategy_id: Option<&StrategyId>) -> HashMap<PositionId, Position> {
        self.filter_positions(self.positions.keys().cloned(), strategy_id)
    }

    fn get_positions_open(
        &self,
        strategy_id: Option<&StrategyId>,
    ) -> HashMap<PositionId, Position> {
        self.filter_positions(self.positions_open.iter().cloned(), strategy_id)
    }

    fn get_positions_closed(
        &self,
        strategy_id: Option<&StrategyId>,
    ) -> HashMap<PositionId, Position> {
        self.filter_positions(self.positions_closed.iter().cloned(), strategy_id)
    }

    fn get_strategy_for_position(&self, position_id: &PositionId) -> Option<StrategyId> {
        self.index_position_strategy.get(position_id).cloned()
    }

    fn count_orders_total(&self, strategy_id: Option<&StrategyId>) -> usize {
        match strategy_id {
            None => self.orders.len(),
            Some(strategy) => self
                .index_strategy_orders
                .get(strategy)
                .map_or(0, |ids| ids.len()),
        }
    }

    fn count_orders_working(&self, strategy_id: Option<&StrategyId>) -> usize {
        match strategy_id {
            None => self.orders_working.len(),
            Some(strategy) => self
                .orders_working
                .iter()
                .filter(|id| self.index_order_strategy.get(*id) == Some(strategy))
                .count(),
        }
    }

    fn count_orders_completed(&self, strategy_id: Option<&StrategyId>) -> usize {
        match strategy_id {
            None => self.orders_completed.len(),
            Some(strategy) => self
                .orders_completed
                .iter()
                .filter(|id| self.index_order_strategy.get(*id) == Some(strategy))
                .count(),
        }
    }

    fn count_positions_total(&self, strategy_id: Option<&StrategyId>) -> usize {
        match strategy_id {
            None => self.positions.len(),
            Some(strategy) => self
                .index_strategy_positions
                .get(strategy)
                .map_or(0, |ids| ids.iter().filter(|id| self.positions.contains_key(*id)).count()),
        }
    }

    fn count_positions_open(&self, strategy_id: Option<&StrategyId>) -> usize {
        match strategy_id {
            None => self.positions_open.len(),
            Some(strategy) => self
                .positions_open
                .iter()
                .filter(|id| self.index_position_strategy.get(*id) == Some(strategy))
                .count(),
        }
    }

    fn count_positions_closed(&self, strategy_id: Option<&StrategyId>) -> usize {
        match strategy_id {
            None => self.positions_closed.len(),
            Some(strategy) => self
                .positions_closed
                .iter()
                .filter(|id| self.index_position_strategy.get(*id) == Some(strategy))
                .count(),
        }
    }

    fn check_residuals(&self) {
        for order_id in &self.orders_working {
            warn!(
                trader_id = %self.trader_id,
                order_id = %order_id,
                "Residual working order at shutdown"
            );
        }
        for position_id in &self.positions_open {
            warn!(
                trader_id = %self.trader_id,
                position_id = %position_id,
                "Residual open position at shutdown"
            );
        }
    }

    fn reset(&mut self) {
        self.orders.clear();
        self.positions.clear();
        self.strategies.clear();
        self.index_order_strategy.clear();
        self.index_order_position.clear();
        self.index_position_strategy.clear();
        self.index_position_orders.clear();
        self.index_strategy_orders.clear();
        self.index_strategy_positions.clear();
        self.orders_working.clear();
        self.orders_completed.clear();
        self.positions_open.clear();
        self.positions_closed.clear();
    }
}

/// Errors raised by execution database operations.
///
/// All of these mark programming errors at the call site; the engine never
/// retries them.
#[derive(Debug, Clone, thiserror::Error)]
pub enum DatabaseError {
    #[error("Strategy {0} is already registered")]
    DuplicateStrategy(StrategyId),

    #[error("Strategy {0} is not registered")]
    UnknownStrategy(StrategyId),

    #[error("Order {0} is already indexed")]
    DuplicateOrder(OrderId),

    #[error("Order {0} is not in the database")]
    UnknownOrder(OrderId),

    #[error("Position {0} is already indexed")]
    DuplicatePosition(PositionId),

    #[error("Position {0} is not in the database")]
    UnknownPosition(PositionId),

    #[error("Position {position_id} is owned by strategy {registered}, not {given}")]
    PositionStrategyMismatch {
        position_id: PositionId,
        registered: StrategyId,
        given: StrategyId,
    },
}
