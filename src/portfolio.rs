//! Portfolio analyzer port.
//!
//! The engine delegates realized-return records and applied account
//! transactions here; analytics beyond recording are out of scope for the
//! execution core.

use std::cell::RefCell;
use std::rc::Rc;

use rust_decimal::Decimal;

use crate::accounts::AccountStateEvent;
use crate::orders::PositionId;
use crate::positions::PositionClosed;

/// Receives realized returns and account transactions from the engine.
pub trait PortfolioAnalyzer {
    /// Called exactly once per position, when it closes.
    fn on_position_closed(&mut self, event: &PositionClosed);

    /// Called for every account state transaction the engine applies.
    fn on_account_state(&mut self, event: &AccountStateEvent);
}

/// In-memory analyzer recording everything it is handed.
///
/// Clones share storage, so a handle kept before boxing the analyzer into
/// the engine still observes every record.
#[derive(Clone, Default)]
pub struct InMemoryPortfolio {
    realized_returns: Rc<RefCell<Vec<(PositionId, Decimal)>>>,
    account_events: Rc<RefCell<Vec<AccountStateEvent>>>,
}

impl InMemoryPortfolio {
    pub fn new() -> Self {
        Self::default()
    }

    /// Realized returns in the order positions closed
    pub fn realized_returns(&self) -> Vec<(PositionId, Decimal)> {
        self.realized_returns.borrow().clone()
    }

    /// Account transactions in the order they were applied
    pub fn account_events(&self) -> Vec<AccountStateEvent> {
        self.account_events.borrow().clone()
    }
}

impl PortfolioAnalyzer for InMemoryPortfolio {
    fn on_position_closed(&mut self, event: &PositionClosed) {
        self.realized_returns
            .borrow_mut()
            .push((event.position_id.clone(), event.return_realized));
    }

    fn on_account_state(&mut self, event: &AccountStateEvent) {
        self.account_events.borrow_mut().push(event.clone());
    }
}
