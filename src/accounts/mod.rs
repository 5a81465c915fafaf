//! Account state tracking.
//!
//! The account is event-sourced from `AccountStateEvent`s returned by the
//! brokerage: the first applied event initializes it, and every subsequent
//! event must carry the same account id.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::orders::{AccountId, Brokerage, EventId};

/// Margin call status reported by the brokerage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MarginCallStatus {
    /// No margin call active
    #[default]
    None,
    /// Margin call issued
    MarginCall,
    /// Positions are being liquidated
    Liquidation,
}

impl fmt::Display for MarginCallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarginCallStatus::None => write!(f, "NONE"),
            MarginCallStatus::MarginCall => write!(f, "MARGIN_CALL"),
            MarginCallStatus::Liquidation => write!(f, "LIQUIDATION"),
        }
    }
}

/// Brokerage-reported snapshot of account balances and margin usage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountStateEvent {
    pub event_id: EventId,
    pub account_id: AccountId,
    pub brokerage: Brokerage,
    /// Account currency code (e.g., "USD")
    pub currency: String,
    pub cash_balance: Decimal,
    pub cash_start_day: Decimal,
    pub cash_activity_day: Decimal,
    pub margin_used_liquidation: Decimal,
    pub margin_used_maintenance: Decimal,
    pub margin_ratio: Decimal,
    pub margin_call_status: MarginCallStatus,
    pub ts_event: DateTime<Utc>,
}

impl AccountStateEvent {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        account_id: AccountId,
        brokerage: Brokerage,
        currency: impl Into<String>,
        cash_balance: Decimal,
        ts_event: DateTime<Utc>,
    ) -> Self {
        Self {
            event_id: EventId::new(),
            account_id,
            brokerage,
            currency: currency.into(),
            cash_balance,
            cash_start_day: cash_balance,
            cash_activity_day: Decimal::ZERO,
            margin_used_liquidation: Decimal::ZERO,
            margin_used_maintenance: Decimal::ZERO,
            margin_ratio: Decimal::ZERO,
            margin_call_status: MarginCallStatus::None,
            ts_event,
        }
    }

    /// Set margin usage figures
    pub fn with_margin(
        mut self,
        used_liquidation: Decimal,
        used_maintenance: Decimal,
        ratio: Decimal,
    ) -> Self {
        self.margin_used_liquidation = used_liquidation;
        self.margin_used_maintenance = used_maintenance;
        self.margin_ratio = ratio;
        self
    }
}

/// Last-known account state, folded from applied events.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Account {
    pub id: Option<AccountId>,
    pub brokerage: Option<Brokerage>,
    pub currency: String,
    pub cash_balance: Decimal,
    pub cash_start_day: Decimal,
    pub cash_activity_day: Decimal,
    pub margin_used_liquidation: Decimal,
    pub margin_used_maintenance: Decimal,
    pub margin_ratio: Decimal,
    pub margin_call_status: MarginCallStatus,
    pub last_updated: Option<DateTime<Utc>>,
    events: Vec<AccountStateEvent>,
}

impl Account {
    /// Create an uninitialized account
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true once the first event has been applied
    pub fn initialized(&self) -> bool {
        self.id.is_some()
    }

    /// Apply a brokerage account snapshot.
    ///
    /// The first event initializes the account; later events must carry the
    /// same account id.
    pub fn apply(&mut self, event: AccountStateEvent) -> Result<(), AccountError> {
        if let Some(id) = &self.id {
            if id != &event.account_id {
                return Err(AccountError::IdMismatch {
                    account_id: id.clone(),
                    event_account_id: event.account_id.clone(),
                });
            }
        }

        self.id = Some(event.account_id.clone());
        self.brokerage = Some(event.brokerage.clone());
        self.currency = event.currency.clone();
        self.cash_balance = event.cash_balance;
        self.cash_start_day = event.cash_start_day;
        self.cash_activity_day = event.cash_activity_day;
        self.margin_used_liquidation = event.margin_used_liquidation;
        self.margin_used_maintenance = event.margin_used_maintenance;
        self.margin_ratio = event.margin_ratio;
        self.margin_call_status = event.margin_call_status;
        self.last_updated = Some(event.ts_event);
        self.events.push(event);
        Ok(())
    }

    /// Equity not committed to margin
    pub fn free_equity(&self) -> Decimal {
        let margin = self.margin_used_liquidation + self.margin_used_maintenance;
        (self.cash_balance - margin).max(Decimal::ZERO)
    }

    /// The append-only event log
    pub fn events(&self) -> &[AccountStateEvent] {
        &self.events
    }

    /// Number of events applied
    pub fn event_count(&self) -> usize {
        self.events.len()
    }

    /// Clear all state, returning the account to uninitialized
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Errors that can occur applying account events.
#[derive(Debug, Clone, thiserror::Error)]
pub enum AccountError {
    #[error("Event for account {event_account_id} applied to account {account_id}")]
    IdMismatch {
        account_id: AccountId,
        event_account_id: AccountId,
    },
}
