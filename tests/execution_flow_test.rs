//! End-to-end tests for the execution pipeline: commands in, broker events
//! back, database and strategies kept coherent.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use trading_execution::accounts::AccountStateEvent;
use trading_execution::clock::TestClock;
use trading_execution::execution::stubs::{
    CommandLog, EventLog, RecordingExecutionClient, RecordingStrategy,
};
use trading_execution::execution::{
    CancelOrder, ExecutionEngine, ExecutionEvent, InMemoryExecutionDatabase, SubmitAtomicOrder,
    SubmitOrder,
};
use trading_execution::orders::{
    AccountId, Brokerage, ExecutionId, Order, OrderCancelled, OrderEventAny, OrderFactory,
    OrderFilled, OrderId, OrderSide, OrderStatus, OrderSubmitted, OrderWorking, PositionId,
    Quantity, StrategyId, Symbol, TimeInForce, TraderId, VenueOrderId,
};
use trading_execution::portfolio::InMemoryPortfolio;
use trading_execution::positions::PositionEventAny;

struct Harness {
    engine: ExecutionEngine,
    portfolio: InMemoryPortfolio,
    client_log: CommandLog,
    strategy_events: EventLog,
    factory: OrderFactory,
}

fn harness(strategy_tag: &str) -> Harness {
    let clock = Rc::new(RefCell::new(TestClock::default()));
    let portfolio = InMemoryPortfolio::new();
    let mut engine = ExecutionEngine::new(
        Box::new(InMemoryExecutionDatabase::new(TraderId::from("TRADER-001"))),
        Box::new(portfolio.clone()),
    );

    let client = RecordingExecutionClient::new();
    let client_log = client.log();
    engine.register_client(Box::new(client));

    let strategy = RecordingStrategy::new(StrategyId::from(strategy_tag));
    let strategy_events = strategy.events();
    engine.register_strategy(Box::new(strategy)).unwrap();

    let factory = OrderFactory::new("001", strategy_tag, clock);
    Harness {
        engine,
        portfolio,
        client_log,
        strategy_events,
        factory,
    }
}

fn at(seconds: i64) -> DateTime<Utc> {
    DateTime::UNIX_EPOCH + Duration::seconds(seconds)
}

fn account() -> AccountId {
    AccountId::from("ACC1")
}

fn symbol() -> Symbol {
    Symbol::new("AAPL", "NASDAQ")
}

fn submitted(order: &Order, t: i64) -> ExecutionEvent {
    ExecutionEvent::Order(OrderSubmitted::new(order.id.clone(), account(), at(t)).into())
}

fn accepted(order: &Order, t: i64) -> ExecutionEvent {
    ExecutionEvent::Order(
        trading_execution::orders::OrderAccepted::new(order.id.clone(), account(), at(t)).into(),
    )
}

fn working(order: &Order, venue_id: &str, t: i64) -> ExecutionEvent {
    ExecutionEvent::Order(
        OrderWorking::new(
            order.id.clone(),
            VenueOrderId::from(venue_id),
            account(),
            at(t),
        )
        .into(),
    )
}

fn cancelled(order: &Order, t: i64) -> ExecutionEvent {
    ExecutionEvent::Order(OrderCancelled::new(order.id.clone(), account(), at(t)).into())
}

fn fill(order: &Order, execution_id: &str, quantity: u64, price: Decimal, t: i64) -> ExecutionEvent {
    ExecutionEvent::Order(
        OrderFilled::new(
            order.id.clone(),
            account(),
            ExecutionId::from(execution_id),
            order.symbol.clone(),
            order.side,
            Quantity::new(quantity),
            price,
            at(t),
        )
        .into(),
    )
}

fn account_state(account_id: &str, cash: Decimal, t: i64) -> ExecutionEvent {
    ExecutionEvent::Account(AccountStateEvent::new(
        AccountId::from(account_id),
        Brokerage::from("SIM"),
        "USD",
        cash,
        at(t),
    ))
}

/// Working/completed partitions never overlap and never exceed the store.
fn assert_partition_invariants(engine: &ExecutionEngine) {
    let db = engine.database();
    let all: HashMap<OrderId, Order> = db.get_orders(None);
    let working = db.get_orders_working(None);
    let completed = db.get_orders_completed(None);

    assert!(working.len() + completed.len() <= all.len());
    for id in working.keys() {
        assert!(!completed.contains_key(id));
        assert!(all.contains_key(id));
    }
    for id in completed.keys() {
        assert!(all.contains_key(id));
    }
}

#[test]
fn test_simple_market_buy_fill() {
    let mut h = harness("S1");
    let order = h
        .factory
        .market(symbol(), OrderSide::Buy, Quantity::new(100), None)
        .unwrap();

    h.engine
        .execute_command(
            SubmitOrder::new(
                order.clone(),
                StrategyId::from("S1"),
                PositionId::from("P1"),
                at(0),
            )
            .into(),
        )
        .unwrap();

    h.engine.handle_event(submitted(&order, 1));
    h.engine.handle_event(accepted(&order, 2));
    h.engine.handle_event(fill(&order, "E-1", 100, dec!(150.00), 3));

    let stored = h.engine.database().get_order(&order.id).unwrap();
    assert_eq!(stored.status, OrderStatus::Filled);
    assert!(stored.is_completed());
    assert!(h.engine.database().is_order_completed(&order.id));
    assert_eq!(stored.average_price, Some(dec!(150.00)));

    let position_id = PositionId::from("P1");
    assert!(h.engine.database().position_exists(&position_id));
    assert!(h.engine.database().is_position_open(&position_id));
    let position = h.engine.database().get_position(&position_id).unwrap();
    assert!(position.is_long());
    assert_eq!(position.quantity(), Quantity::new(100));

    // The strategy saw submission, acceptance, the fill, then the derived
    // position event - in that order.
    let events = h.strategy_events.all();
    assert_eq!(events.len(), 4);
    assert!(matches!(
        events[2],
        ExecutionEvent::Order(OrderEventAny::Filled(_))
    ));
    assert!(matches!(
        events[3],
        ExecutionEvent::Position(PositionEventAny::Opened(_))
    ));

    assert_eq!(h.engine.command_count(), 1);
    // Three broker events plus the derived position event.
    assert_eq!(h.engine.event_count(), 4);
    assert_eq!(h.client_log.len(), 1);
    assert_partition_invariants(&h.engine);
}

#[test]
fn test_partial_fills_to_completion() {
    let mut h = harness("S1");
    let order = h
        .factory
        .limit(
            symbol(),
            OrderSide::Sell,
            Quantity::new(100),
            dec!(150.00),
            None,
            TimeInForce::Gtc,
            None,
        )
        .unwrap();

    h.engine
        .execute_command(
            SubmitOrder::new(
                order.clone(),
                StrategyId::from("S1"),
                PositionId::from("P1"),
                at(0),
            )
            .into(),
        )
        .unwrap();
    h.engine.handle_event(submitted(&order, 1));
    h.engine.handle_event(accepted(&order, 2));
    h.engine.handle_event(working(&order, "B-1", 3));

    h.engine.handle_event(fill(&order, "E-1", 40, dec!(150.10), 4));
    let stored = h.engine.database().get_order(&order.id).unwrap();
    assert_eq!(stored.status, OrderStatus::PartiallyFilled);
    assert!(stored.is_working());
    assert!(h.engine.database().is_order_working(&order.id));

    h.engine.handle_event(fill(&order, "E-2", 60, dec!(150.20), 5));
    let stored = h.engine.database().get_order(&order.id).unwrap();
    assert_eq!(stored.status, OrderStatus::Filled);
    assert_eq!(stored.average_price, Some(dec!(150.16)));
    // Sold 0.16 above the limit; adverse-positive convention makes this negative.
    assert_eq!(stored.slippage, dec!(-0.16));
    assert!(h.engine.database().is_order_completed(&order.id));

    // Both fills are sells building the same exposure under P1.
    let position = h
        .engine
        .database()
        .get_position(&PositionId::from("P1"))
        .unwrap();
    assert!(position.is_short());
    assert_eq!(position.quantity(), Quantity::new(100));
    assert_partition_invariants(&h.engine);
}

#[test]
fn test_atomic_order_entry_and_stop_loss_close() {
    let mut h = harness("S1");
    let atomic = h
        .factory
        .atomic_market(
            symbol(),
            OrderSide::Buy,
            Quantity::new(10),
            dec!(99.00),
            Some(dec!(101.00)),
            None,
        )
        .unwrap();
    let entry = atomic.entry.clone();
    let stop_loss = atomic.stop_loss.clone();
    let position_id = PositionId::from("P2");

    h.engine
        .execute_command(
            SubmitAtomicOrder::new(atomic, StrategyId::from("S1"), position_id.clone(), at(0))
                .into(),
        )
        .unwrap();

    // All three legs are indexed against the same position before transport.
    assert_eq!(h.engine.database().count_orders_total(None), 3);
    assert_eq!(
        h.engine.database().get_position_id(&entry.id),
        Some(position_id.clone())
    );
    assert_eq!(
        h.engine.database().get_position_id(&stop_loss.id),
        Some(position_id.clone())
    );
    assert_eq!(h.client_log.len(), 1);

    // Entry fills at 100.00 and opens the position.
    h.engine.handle_event(submitted(&entry, 1));
    h.engine.handle_event(accepted(&entry, 2));
    h.engine.handle_event(fill(&entry, "E-1", 10, dec!(100.00), 3));
    assert!(h.engine.database().is_position_open(&position_id));

    // Stop loss fills at 99.00 and closes it.
    h.engine.handle_event(submitted(&stop_loss, 4));
    h.engine.handle_event(accepted(&stop_loss, 5));
    h.engine
        .handle_event(fill(&stop_loss, "E-2", 10, dec!(99.00), 6));

    assert!(h.engine.database().is_position_closed(&position_id));
    let position = h.engine.database().get_position(&position_id).unwrap();
    assert!(position.is_closed());
    assert_eq!(position.return_realized, Some(dec!(-0.01)));

    // Realized return reported to the portfolio exactly once.
    let returns = h.portfolio.realized_returns();
    assert_eq!(returns.len(), 1);
    assert_eq!(returns[0], (position_id, dec!(-0.01)));

    let events = h.strategy_events.all();
    assert!(matches!(
        events.last(),
        Some(ExecutionEvent::Position(PositionEventAny::Closed(_)))
    ));
    assert_partition_invariants(&h.engine);
}

#[test]
fn test_fill_for_unknown_order_is_dropped() {
    let mut h = harness("S1");
    let ghost = OrderFilled::new(
        OrderId::from("O-GHOST"),
        account(),
        ExecutionId::from("E-1"),
        symbol(),
        OrderSide::Buy,
        Quantity::new(100),
        dec!(150.00),
        at(1),
    );

    h.engine.handle_event(ExecutionEvent::Order(ghost.into()));

    assert_eq!(h.engine.event_count(), 1);
    assert_eq!(h.engine.database().count_orders_total(None), 0);
    assert_eq!(h.engine.database().count_positions_total(None), 0);
    assert!(h.strategy_events.is_empty());
}

#[test]
fn test_account_mismatch_is_dropped() {
    let mut h = harness("S1");

    h.engine.handle_event(account_state("ACC1", dec!(100000), 1));
    assert!(h.engine.account().initialized());
    assert_eq!(h.portfolio.account_events().len(), 1);

    h.engine.handle_event(account_state("ACC2", dec!(50000), 2));

    assert_eq!(h.engine.account().id, Some(AccountId::from("ACC1")));
    assert_eq!(h.engine.account().cash_balance, dec!(100000));
    assert_eq!(h.portfolio.account_events().len(), 1);
    assert_eq!(h.engine.event_count(), 2);
}

#[test]
fn test_cancel_round_trip() {
    let mut h = harness("S1");
    let order = h
        .factory
        .limit(
            symbol(),
            OrderSide::Buy,
            Quantity::new(100),
            dec!(150.00),
            None,
            TimeInForce::Gtc,
            None,
        )
        .unwrap();

    h.engine
        .execute_command(
            SubmitOrder::new(
                order.clone(),
                StrategyId::from("S1"),
                PositionId::from("P1"),
                at(0),
            )
            .into(),
        )
        .unwrap();
    h.engine.handle_event(submitted(&order, 1));
    h.engine.handle_event(accepted(&order, 2));
    h.engine.handle_event(working(&order, "B-1", 3));
    assert!(h.engine.database().is_order_working(&order.id));

    h.engine
        .execute_command(CancelOrder::new(order.id.clone(), "user cancel", at(4)).into())
        .unwrap();
    assert_eq!(h.engine.command_count(), 2);
    assert_eq!(h.client_log.len(), 2);

    h.engine.handle_event(cancelled(&order, 5));

    let stored = h.engine.database().get_order(&order.id).unwrap();
    assert_eq!(stored.status, OrderStatus::Cancelled);
    assert!(stored.is_completed());
    assert!(h.engine.database().is_order_completed(&order.id));
    assert!(!h.engine.database().is_order_working(&order.id));
    assert_partition_invariants(&h.engine);
}

#[test]
fn test_event_log_is_append_only_and_monotonic() {
    let mut h = harness("S1");
    let order = h
        .factory
        .market(symbol(), OrderSide::Buy, Quantity::new(100), None)
        .unwrap();

    h.engine
        .execute_command(
            SubmitOrder::new(
                order.clone(),
                StrategyId::from("S1"),
                PositionId::from("P1"),
                at(0),
            )
            .into(),
        )
        .unwrap();
    h.engine.handle_event(submitted(&order, 1));
    h.engine.handle_event(accepted(&order, 2));
    h.engine.handle_event(fill(&order, "E-1", 40, dec!(150.00), 3));
    h.engine.handle_event(fill(&order, "E-2", 60, dec!(150.00), 4));

    let stored = h.engine.database().get_order(&order.id).unwrap();
    assert_eq!(stored.event_count(), 5);
    let timestamps: Vec<_> = stored.events().iter().map(|e| e.ts_event()).collect();
    assert!(timestamps.windows(2).all(|pair| pair[0] <= pair[1]));
    assert_eq!(
        stored.last_event().event_id(),
        stored.events().last().unwrap().event_id()
    );
}

#[test]
fn test_reset_and_identical_replay() {
    let mut h = harness("S1");
    let order = h
        .factory
        .limit(
            symbol(),
            OrderSide::Sell,
            Quantity::new(100),
            dec!(150.00),
            None,
            TimeInForce::Gtc,
            None,
        )
        .unwrap();

    let command = SubmitOrder::new(
        order.clone(),
        StrategyId::from("S1"),
        PositionId::from("P1"),
        at(0),
    );
    let events = vec![
        submitted(&order, 1),
        accepted(&order, 2),
        fill(&order, "E-1", 40, dec!(150.10), 3),
        fill(&order, "E-2", 60, dec!(150.20), 4),
    ];

    let run = |h: &mut Harness| {
        h.engine.execute_command(command.clone().into()).unwrap();
        for event in &events {
            h.engine.handle_event(event.clone());
        }
        let db = h.engine.database();
        let order = db.get_order(&command.order.id).unwrap();
        (
            order.status,
            order.filled_quantity,
            order.average_price,
            order.event_count(),
            db.get_orders_working(None).keys().cloned().collect::<Vec<_>>(),
            db.get_orders_completed(None)
                .keys()
                .cloned()
                .collect::<Vec<_>>(),
            db.count_positions_open(None),
            db.count_positions_closed(None),
        )
    };

    let first = run(&mut h);

    h.engine.reset();
    assert_eq!(h.engine.command_count(), 0);
    assert_eq!(h.engine.event_count(), 0);
    assert_eq!(h.engine.database().count_orders_total(None), 0);

    // Strategies are released on reset and must re-register.
    let strategy = RecordingStrategy::new(StrategyId::from("S1"));
    h.strategy_events = strategy.events();
    h.engine.register_strategy(Box::new(strategy)).unwrap();

    let second = run(&mut h);
    assert_eq!(first, second);
}
