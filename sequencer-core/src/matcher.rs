//! Deterministic price-time priority matching.
//!
//! `match_and_batch` is the single entry point: it consumes a snapshot of
//! the book, classifies it into bids/asks by median price split (the
//! wire order has no explicit side), crosses them up to
//! `max_batch` fills, and returns the remaining orders plus a committed
//! batch (Merkle root + serialized fills) when at least one fill was
//! produced.

use std::cmp::Ordering;

use tracing::warn;

use crate::fill::{serialize_fills, Fill};
use crate::merkle::merkle_root;
use crate::order::{Order, EPSILON};

/// Result of a single matcher run.
#[derive(Debug, Clone, Default)]
pub struct MatchOutcome {
    /// Merkle root over `fills`, present iff at least one fill was produced.
    pub root: Option<[u8; 32]>,
    /// Canonical JSON serialization of `fills`, present iff `root` is.
    pub fills_bytes: Option<Vec<u8>>,
    /// Structured fills produced by this run, in emission order.
    pub fills: Vec<Fill>,
    /// Orders surviving this run, to become the book's next live set.
    pub remaining: Vec<Order>,
}

impl MatchOutcome {
    fn no_match(orders: Vec<Order>) -> Self {
        Self {
            root: None,
            fills_bytes: None,
            fills: Vec::new(),
            remaining: orders,
        }
    }
}

fn sort_key_cmp(a: &Order, b: &Order) -> Ordering {
    // Descending price, ascending timestamp; ties beyond that fall through
    // to Rust's stable sort, which preserves admission order.
    b.price
        .partial_cmp(&a.price)
        .unwrap_or(Ordering::Equal)
        .then_with(|| a.timestamp.cmp(&b.timestamp))
}

/// Consume a book snapshot and produce fills plus a remaining order set.
///
/// `max_batch` bounds `fills.len()`; any crossings beyond that bound are
/// deferred to the next matcher run. A pure function of `orders` and
/// `max_batch`: identical inputs always produce an identical `root`,
/// `fills_bytes`, and `remaining`.
pub fn match_and_batch(orders: Vec<Order>, max_batch: usize) -> MatchOutcome {
    if orders.len() < 2 {
        return MatchOutcome::no_match(orders);
    }

    let (mut usable, unusable): (Vec<Order>, Vec<Order>) = orders
        .iter()
        .cloned()
        .partition(|o| !o.has_unusable_numerics());

    for order in &unusable {
        warn!(
            maker = %order.maker,
            timestamp = order.timestamp,
            "skipping order with non-finite price/amount; batch continues"
        );
    }

    if usable.len() < 2 {
        return MatchOutcome::no_match(orders);
    }

    usable.sort_by(sort_key_cmp);

    let median = usable.len().div_ceil(2);
    let (bids_slice, asks_slice) = usable.split_at(median);
    let mut bids = bids_slice.to_vec();
    let mut asks = asks_slice.to_vec();

    let mut fills = Vec::new();
    let mut i = 0usize;
    let mut j = 0usize;

    while fills.len() < max_batch && i < bids.len() && j < asks.len() {
        if bids[i].price < asks[j].price {
            break;
        }

        let quantity = bids[i].make_amount.min(asks[j].take_amount);
        fills.push(Fill::new(
            bids[i].canonical_hash(),
            asks[j].canonical_hash(),
            quantity,
        ));

        bids[i].make_amount -= quantity;
        asks[j].take_amount -= quantity;

        if bids[i].make_amount <= EPSILON {
            i += 1;
        }
        if asks[j].take_amount <= EPSILON {
            j += 1;
        }
    }

    if fills.is_empty() {
        return MatchOutcome::no_match(orders);
    }

    let mut remaining: Vec<Order> = bids[i..]
        .iter()
        .filter(|o| o.make_amount > EPSILON)
        .cloned()
        .collect();
    remaining.extend(asks[j..].iter().filter(|o| o.take_amount > EPSILON).cloned());

    let root = merkle_root(&fills).expect("fills is non-empty by construction");
    let fills_bytes = serialize_fills(&fills);

    MatchOutcome {
        root: Some(root),
        fills_bytes: Some(fills_bytes),
        fills,
        remaining,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order(maker: &str, make_amount: f64, take_amount: f64, price: f64, ts: u64) -> Order {
        Order::new(maker, "USDC", make_amount, take_amount, price, ts, "sig").unwrap()
    }

    /// Three orders, one crossing fill, two
    /// residual orders.
    #[test]
    fn scenario_one_partial_cross() {
        let orders = vec![
            order("a1", 1000.0, 600.0, 0.60, 1),
            order("a2", 300.0, 500.0, 0.50, 2),
            order("a3", 800.0, 480.0, 0.55, 3),
        ];
        let outcome = match_and_batch(orders, 10);
        assert_eq!(outcome.fills.len(), 1);
        assert_eq!(outcome.remaining.len(), 2);
    }

    /// Scenario 2: a single order never matches.
    #[test]
    fn scenario_two_single_order() {
        let orders = vec![order("a1", 100.0, 50.0, 1.0, 1)];
        let outcome = match_and_batch(orders.clone(), 100);
        assert!(outcome.fills.is_empty());
        assert!(outcome.root.is_none());
        assert_eq!(outcome.remaining, orders);
    }

    /// Scenario 3: bid price below ask price, nothing crosses.
    #[test]
    fn scenario_three_no_crossable_pair() {
        let orders = vec![order("a1", 100.0, 40.0, 0.40, 1), order("a2", 100.0, 60.0, 0.60, 2)];
        let outcome = match_and_batch(orders.clone(), 100);
        assert!(outcome.fills.is_empty());
        assert_eq!(outcome.remaining, orders);
    }

    /// Scenario 4: multiple crossings, highest bid against cheapest asks
    /// first.
    #[test]
    fn scenario_four_multi_fill() {
        let orders = vec![
            order("bid1", 1000.0, 600.0, 0.60, 1),
            order("ask1", 500.0, 250.0, 0.50, 2),
            order("bid2", 1200.0, 696.0, 0.58, 3),
            order("ask2", 700.0, 364.0, 0.52, 4),
            order("ask3", 600.0, 324.0, 0.54, 5),
        ];
        let outcome = match_and_batch(orders, 100);
        assert!(!outcome.fills.is_empty());
        for remaining in &outcome.remaining {
            assert!(remaining.make_amount > EPSILON || remaining.take_amount > EPSILON);
        }
    }

    /// Scenario 5: `max_batch` caps fills even when more crossings exist.
    #[test]
    fn scenario_five_batch_bound() {
        let orders = vec![
            order("bid1", 2000.0, 3200.0, 1.60, 1),
            order("ask1", 500.0, 750.0, 1.50, 2),
            order("ask2", 500.0, 760.0, 1.52, 3),
            order("ask3", 400.0, 616.0, 1.54, 4),
        ];
        let outcome = match_and_batch(orders, 2);
        assert_eq!(outcome.fills.len(), 2);
    }

    /// Scenario 6: identical price+timestamp orders still resolve
    /// deterministically by admission order.
    #[test]
    fn scenario_six_identical_price_and_timestamp_is_deterministic() {
        let orders = vec![
            order("bid1", 100.0, 60.0, 0.60, 5),
            order("bid2", 100.0, 60.0, 0.60, 5),
            order("ask1", 50.0, 30.0, 0.60, 5),
        ];
        let first = match_and_batch(orders.clone(), 100);
        let second = match_and_batch(orders, 100);
        assert_eq!(first.root, second.root);
        assert_eq!(first.fills, second.fills);
    }

    #[test]
    fn single_order_never_matches() {
        let outcome = match_and_batch(vec![order("a", 1.0, 1.0, 1.0, 1)], 10);
        assert!(outcome.fills.is_empty());
    }

    #[test]
    fn batch_bound_is_always_respected() {
        let mut orders = Vec::new();
        for i in 0..20u64 {
            orders.push(order(&format!("bid{i}"), 100.0, 60.0, 0.60 + i as f64 * 0.001, i + 1));
        }
        for i in 0..20u64 {
            orders.push(order(&format!("ask{i}"), 100.0, 60.0, 0.50, 100 + i));
        }
        let outcome = match_and_batch(orders, 5);
        assert!(outcome.fills.len() <= 5);
    }

    #[test]
    fn determinism_across_repeated_calls() {
        let orders = vec![
            order("a1", 1000.0, 600.0, 0.60, 1),
            order("a2", 300.0, 500.0, 0.50, 2),
            order("a3", 800.0, 480.0, 0.55, 3),
        ];
        let first = match_and_batch(orders.clone(), 10);
        let second = match_and_batch(orders, 10);
        assert_eq!(first.root, second.root);
        assert_eq!(first.fills_bytes, second.fills_bytes);
        assert_eq!(
            first.remaining.iter().map(Order::canonical_hash).collect::<Vec<_>>(),
            second.remaining.iter().map(Order::canonical_hash).collect::<Vec<_>>()
        );
    }

    #[test]
    fn mass_conservation() {
        let bid = order("bid", 1000.0, 600.0, 0.60, 1);
        let ask = order("ask", 300.0, 150.0, 0.50, 2);
        let original_bid_amount = bid.make_amount;
        let original_ask_amount = ask.take_amount;
        let outcome = match_and_batch(vec![bid, ask], 10);

        let filled: f64 = outcome
            .fills
            .iter()
            .map(|f| f.quantity.parse::<f64>().unwrap())
            .sum();
        assert!(filled <= original_bid_amount + EPSILON);
        assert!(filled <= original_ask_amount + EPSILON);
    }

    #[test]
    fn skips_orders_with_non_finite_numerics_without_aborting_batch() {
        let mut bad = order("bad", 100.0, 50.0, 0.5, 1);
        bad.price = f64::NAN;
        let good_bid = order("bid", 100.0, 60.0, 0.60, 2);
        let good_ask = order("ask", 100.0, 50.0, 0.50, 3);
        let outcome = match_and_batch(vec![bad, good_bid, good_ask], 10);
        assert_eq!(outcome.fills.len(), 1);
        assert!(!outcome.remaining.iter().any(|o| o.maker == "bad"));
    }
}
