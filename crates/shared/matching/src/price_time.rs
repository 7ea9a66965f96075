use exchange_core::{Order, OrderStatus, OrderType, Timestamp, Trade, ValidationError};
use exchange_ports::{MatchReport, MatchingError, MatchingResult};
use log::{debug, warn};
use rust_decimal::Decimal;

use crate::book::SymbolBook;

/// Standard price-time priority matcher (FIFO)
///
/// Orders are matched based on:
/// 1. Best price (highest bid, lowest ask)
/// 2. Time priority (earliest timestamp first at the same price)
///
/// Trades print at the resting order's price. Resting orders from the
/// incoming order's own user are skipped and left in place.
#[derive(Debug, Clone, Copy, Default)]
pub struct PriceTimeMatcher;

impl PriceTimeMatcher {
    pub fn new() -> Self {
        Self
    }

    pub fn name(&self) -> &str {
        "Price-Time Priority"
    }

    /// Match `order` against `book`, mutating both
    ///
    /// Validation happens before anything is touched. On success the
    /// order's status reflects the outcome: a LIMIT remainder rests, a
    /// MARKET remainder is dropped (`Filled` if anything traded, else
    /// `Rejected`).
    pub fn match_order(
        &self,
        book: &mut SymbolBook,
        order: &mut Order,
        now: Timestamp,
    ) -> MatchingResult<MatchReport> {
        order.validate()?;
        if order.status.is_terminal() {
            return Err(ValidationError::TerminalOrder(order.status).into());
        }
        if order.symbol != *book.symbol() {
            return Err(MatchingError::SymbolNotFound(order.symbol.clone()));
        }
        if book.contains(&order.id) {
            return Err(MatchingError::DuplicateOrder(order.id.clone()));
        }

        let symbol = book.symbol().clone();
        let opposite = order.side.opposite();
        let mut report = MatchReport::default();
        let mut consumed = Vec::new();

        for (key, resting) in book.side_mut(opposite).iter_mut() {
            if order.quantity.is_zero() {
                break;
            }
            // Sides are sorted best first, so nothing further can cross
            if !order.crosses(resting.price) {
                break;
            }
            if resting.user_id == order.user_id {
                debug!(
                    "Self-trade prevented: {} skips resting {} for user {}",
                    order.id, resting.id, order.user_id
                );
                continue;
            }

            let fill = order.quantity.min(resting.quantity);
            let (buy_id, sell_id) = if order.side.is_buy() {
                (&order.id, &resting.id)
            } else {
                (&resting.id, &order.id)
            };
            let trade = match Trade::new_with_time(
                buy_id.clone(),
                sell_id.clone(),
                symbol.clone(),
                resting.price,
                fill,
                now,
            ) {
                Ok(trade) => trade,
                Err(e) => {
                    warn!(
                        "No valid trade between {} and {}: {}",
                        order.id, resting.id, e
                    );
                    continue;
                }
            };

            resting.apply_fill(fill)?;
            order.apply_fill(fill)?;

            debug!(
                "Trade {}: {} {} @ {} (buy={}, sell={})",
                trade.id, symbol, trade.quantity, trade.price, trade.buy_order_id, trade.sell_order_id
            );

            if resting.quantity.is_zero() {
                consumed.push(*key);
            }
            report.makers.push(resting.clone());
            report.trades.push(trade);
        }

        for key in &consumed {
            book.remove_key(opposite, key);
        }

        if order.quantity > Decimal::ZERO {
            match order.order_type {
                OrderType::Limit => book.insert(order.clone())?,
                OrderType::Market if order.has_fills() => {
                    debug!(
                        "Market order {} filled {}, discarding {}",
                        order.id, order.filled_quantity, order.quantity
                    );
                    order.update_status(OrderStatus::Filled)?;
                }
                OrderType::Market => {
                    debug!("Market order {} found no liquidity", order.id);
                    order.reject()?;
                }
            }
        }

        book.touch(now);
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use exchange_core::{Price, Quantity, Side};
    use rust_decimal_macros::dec;

    const SYMBOL: &str = "BTCUSD";

    fn limit(id: &str, user: &str, side: Side, price: Price, qty: Quantity, at: Timestamp) -> Order {
        Order::new_limit(id, user, SYMBOL, side, price, qty, at).unwrap()
    }

    fn market(id: &str, user: &str, side: Side, qty: Quantity, at: Timestamp) -> Order {
        Order::new_market(id, user, SYMBOL, side, qty, at).unwrap()
    }

    fn rest(book: &mut SymbolBook, order: Order) {
        let mut order = order;
        let now = order.timestamp;
        let report = PriceTimeMatcher::new()
            .match_order(book, &mut order, now)
            .unwrap();
        assert!(report.trades.is_empty(), "seed order should not trade");
    }

    #[test]
    fn test_limit_buy_rests_on_empty_book() {
        let now = Utc::now();
        let mut book = SymbolBook::new(SYMBOL, now);
        let mut buy = limit("b-1", "bob", Side::Buy, dec!(100), dec!(10), now);

        let report = PriceTimeMatcher::new()
            .match_order(&mut book, &mut buy, now)
            .unwrap();

        assert!(report.trades.is_empty());
        assert_eq!(buy.status, OrderStatus::Pending);
        let snapshot = book.snapshot();
        assert_eq!(snapshot.buy_orders.len(), 1);
        assert_eq!(snapshot.buy_orders[0].quantity, dec!(10));
    }

    #[test]
    fn test_trade_prints_at_resting_price() {
        let now = Utc::now();
        let mut book = SymbolBook::new(SYMBOL, now);
        rest(&mut book, limit("s-1", "alice", Side::Sell, dec!(100), dec!(5), now));

        let mut buy = limit("b-1", "bob", Side::Buy, dec!(101), dec!(10), now);
        let report = PriceTimeMatcher::new()
            .match_order(&mut book, &mut buy, now)
            .unwrap();

        assert_eq!(report.trades.len(), 1);
        let trade = &report.trades[0];
        assert_eq!(trade.price, dec!(100));
        assert_eq!(trade.quantity, dec!(5));
        assert_eq!(trade.buy_order_id, "b-1");
        assert_eq!(trade.sell_order_id, "s-1");

        assert_eq!(report.makers.len(), 1);
        assert_eq!(report.makers[0].status, OrderStatus::Filled);

        assert_eq!(buy.status, OrderStatus::Partial);
        assert_eq!(buy.quantity, dec!(5));

        let snapshot = book.snapshot();
        assert!(snapshot.sell_orders.is_empty());
        assert_eq!(snapshot.buy_orders.len(), 1);
        assert_eq!(snapshot.buy_orders[0].id, "b-1");
        assert_eq!(snapshot.buy_orders[0].status, OrderStatus::Partial);
    }

    #[test]
    fn test_earlier_timestamp_wins_regardless_of_insertion() {
        let t0 = Utc::now();
        let t1 = t0 + Duration::milliseconds(10);
        let mut book = SymbolBook::new(SYMBOL, t0);

        // Later order inserted first
        rest(&mut book, limit("s-late", "alice", Side::Sell, dec!(100), dec!(1), t1));
        rest(&mut book, limit("s-early", "carol", Side::Sell, dec!(100), dec!(1), t0));

        let mut buy = limit("b-1", "bob", Side::Buy, dec!(100), dec!(1), t1);
        let report = PriceTimeMatcher::new()
            .match_order(&mut book, &mut buy, t1)
            .unwrap();

        assert_eq!(report.trades.len(), 1);
        assert_eq!(report.trades[0].sell_order_id, "s-early");
        assert!(book.contains("s-late"));
    }

    #[test]
    fn test_walks_levels_best_price_first() {
        let now = Utc::now();
        let mut book = SymbolBook::new(SYMBOL, now);
        rest(&mut book, limit("b-99", "alice", Side::Buy, dec!(99), dec!(2), now));
        rest(&mut book, limit("b-101", "carol", Side::Buy, dec!(101), dec!(2), now));
        rest(&mut book, limit("b-100", "dave", Side::Buy, dec!(100), dec!(2), now));

        let mut sell = limit("s-1", "bob", Side::Sell, dec!(100), dec!(5), now);
        let report = PriceTimeMatcher::new()
            .match_order(&mut book, &mut sell, now)
            .unwrap();

        let prices: Vec<_> = report.trades.iter().map(|t| t.price).collect();
        assert_eq!(prices, vec![dec!(101), dec!(100)]);
        assert_eq!(sell.status, OrderStatus::Partial);
        assert_eq!(sell.quantity, dec!(1));

        // Remainder rests at 100, the 99 bid is untouched
        assert_eq!(book.best_ask(), Some(dec!(100)));
        assert_eq!(book.best_bid(), Some(dec!(99)));
    }

    #[test]
    fn test_limit_does_not_cross_worse_price() {
        let now = Utc::now();
        let mut book = SymbolBook::new(SYMBOL, now);
        rest(&mut book, limit("s-1", "alice", Side::Sell, dec!(105), dec!(1), now));

        let mut buy = limit("b-1", "bob", Side::Buy, dec!(100), dec!(1), now);
        let report = PriceTimeMatcher::new()
            .match_order(&mut book, &mut buy, now)
            .unwrap();

        assert!(report.trades.is_empty());
        assert_eq!(book.order_count(), 2);
    }

    #[test]
    fn test_market_buy_on_empty_book_is_rejected() {
        let now = Utc::now();
        let mut book = SymbolBook::new(SYMBOL, now);
        let mut buy = market("m-1", "bob", Side::Buy, dec!(3), now);

        let report = PriceTimeMatcher::new()
            .match_order(&mut book, &mut buy, now)
            .unwrap();

        assert!(report.trades.is_empty());
        assert_eq!(buy.status, OrderStatus::Rejected);
        assert!(book.is_empty());
    }

    #[test]
    fn test_market_partial_fill_ends_filled() {
        let now = Utc::now();
        let mut book = SymbolBook::new(SYMBOL, now);
        rest(&mut book, limit("s-1", "alice", Side::Sell, dec!(100), dec!(2), now));

        let mut buy = market("m-1", "bob", Side::Buy, dec!(5), now);
        let report = PriceTimeMatcher::new()
            .match_order(&mut book, &mut buy, now)
            .unwrap();

        assert_eq!(report.trades.len(), 1);
        assert_eq!(buy.status, OrderStatus::Filled);
        assert_eq!(buy.filled_quantity, dec!(2));
        assert!(book.is_empty());
    }

    #[test]
    fn test_self_trade_prevention() {
        let now = Utc::now();
        let mut book = SymbolBook::new(SYMBOL, now);
        rest(&mut book, limit("s-own", "alice", Side::Sell, dec!(100), dec!(2), now));
        rest(&mut book, limit("s-other", "carol", Side::Sell, dec!(101), dec!(2), now));

        let mut buy = limit("b-1", "alice", Side::Buy, dec!(101), dec!(3), now);
        let report = PriceTimeMatcher::new()
            .match_order(&mut book, &mut buy, now)
            .unwrap();

        assert_eq!(report.trades.len(), 1);
        assert_eq!(report.trades[0].sell_order_id, "s-other");
        assert_eq!(report.trades[0].quantity, dec!(2));

        // Own order untouched, remainder of the buy rests
        assert_eq!(book.get("s-own").map(|o| o.quantity), Some(dec!(2)));
        assert_eq!(buy.quantity, dec!(1));
        assert!(book.contains("b-1"));
    }

    #[test]
    fn test_self_trade_only_liquidity_rejects_market() {
        let now = Utc::now();
        let mut book = SymbolBook::new(SYMBOL, now);
        rest(&mut book, limit("s-1", "alice", Side::Sell, dec!(100), dec!(2), now));

        let mut buy = market("m-1", "alice", Side::Buy, dec!(5), now);
        let report = PriceTimeMatcher::new()
            .match_order(&mut book, &mut buy, now)
            .unwrap();

        assert!(report.trades.is_empty());
        assert_eq!(buy.status, OrderStatus::Rejected);
        assert_eq!(book.get("s-1").map(|o| o.quantity), Some(dec!(2)));
    }

    #[test]
    fn test_self_trade_only_liquidity_rests_limit() {
        let now = Utc::now();
        let mut book = SymbolBook::new(SYMBOL, now);
        rest(&mut book, limit("s-1", "alice", Side::Sell, dec!(100), dec!(2), now));

        let mut buy = limit("b-1", "alice", Side::Buy, dec!(101), dec!(1), now);
        let report = PriceTimeMatcher::new()
            .match_order(&mut book, &mut buy, now)
            .unwrap();

        assert!(report.trades.is_empty());
        assert!(report.makers.is_empty());
        assert_eq!(buy.status, OrderStatus::Pending);
        assert_eq!(book.orders(Side::Buy).count(), 1);
        assert_eq!(book.get("b-1").map(|o| o.quantity), Some(dec!(1)));
        assert_eq!(book.get("s-1").map(|o| o.quantity), Some(dec!(2)));
        assert_eq!(book.best_bid(), Some(dec!(101)));
        assert_eq!(book.best_ask(), Some(dec!(100)));
    }

    #[test]
    fn test_quantity_is_conserved() {
        let now = Utc::now();
        let mut book = SymbolBook::new(SYMBOL, now);
        rest(&mut book, limit("s-1", "a", Side::Sell, dec!(100), dec!(1.5), now));
        rest(&mut book, limit("s-2", "b", Side::Sell, dec!(100.5), dec!(2.25), now));
        rest(&mut book, limit("s-3", "c", Side::Sell, dec!(101), dec!(4), now));

        let mut buy = limit("b-1", "d", Side::Buy, dec!(101), dec!(6), now);
        let report = PriceTimeMatcher::new()
            .match_order(&mut book, &mut buy, now)
            .unwrap();

        let traded: Decimal = report.trades.iter().map(|t| t.quantity).sum();
        let maker_filled: Decimal = report.makers.iter().map(|o| o.filled_quantity).sum();
        assert_eq!(traded, dec!(6));
        assert_eq!(buy.filled_quantity, traded);
        assert_eq!(maker_filled, traded);

        let left = book.get("s-3").unwrap();
        assert_eq!(left.quantity + left.filled_quantity, dec!(4));
        assert_eq!(left.quantity, dec!(1.75));
    }

    #[test]
    fn test_invalid_or_terminal_order_leaves_book_unchanged() {
        let now = Utc::now();
        let mut book = SymbolBook::new(SYMBOL, now);
        rest(&mut book, limit("s-1", "alice", Side::Sell, dec!(100), dec!(2), now));
        let before = book.snapshot();

        let mut bad = limit("b-1", "bob", Side::Buy, dec!(100), dec!(1), now);
        bad.quantity = dec!(0);
        let err = PriceTimeMatcher::new().match_order(&mut book, &mut bad, now);
        assert_eq!(
            err,
            Err(MatchingError::Validation(ValidationError::NonPositiveQuantity))
        );

        let mut done = limit("b-2", "bob", Side::Buy, dec!(100), dec!(1), now);
        done.cancel().unwrap();
        let err = PriceTimeMatcher::new().match_order(&mut book, &mut done, now);
        assert!(matches!(
            err,
            Err(MatchingError::Validation(ValidationError::TerminalOrder(
                OrderStatus::Cancelled
            )))
        ));
        assert_eq!(done.quantity, dec!(1));

        assert_eq!(book.snapshot(), before);
    }

    #[test]
    fn test_duplicate_resting_id_is_refused() {
        let now = Utc::now();
        let mut book = SymbolBook::new(SYMBOL, now);
        rest(&mut book, limit("b-1", "alice", Side::Buy, dec!(99), dec!(1), now));

        let mut again = limit("b-1", "alice", Side::Buy, dec!(99), dec!(1), now);
        let err = PriceTimeMatcher::new().match_order(&mut book, &mut again, now);
        assert_eq!(err, Err(MatchingError::DuplicateOrder("b-1".to_string())));
    }
}
