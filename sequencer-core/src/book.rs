//! In-memory order book.
//!
//! The book is intentionally dumb: it holds live orders in admission
//! order and defers all bid/ask classification to the matcher (see
//! the wire order carries no side field). Admission order is
//! preserved by always pushing new orders to the back and never
//! reordering in place; Rust's slice sort is stable, so any sort the
//! matcher performs over a [`Book::snapshot`] keeps admission order as
//! the final tie-break for free.

use crate::errors::AdmissionError;
use crate::order::Order;

/// A set of live orders, ordered by admission sequence.
#[derive(Debug, Clone, Default)]
pub struct Book {
    orders: Vec<Order>,
}

impl Book {
    pub fn new() -> Self {
        Self { orders: Vec::new() }
    }

    /// Validate and append an order. Rejects orders that fail the
    /// admission invariants without mutating the book.
    pub fn admit(&mut self, order: Order) -> Result<(), AdmissionError> {
        order.validate()?;
        self.orders.push(order);
        Ok(())
    }

    /// A cheap, independent copy of the live order set for the matcher (or
    /// any other read-only observer) to operate on.
    pub fn snapshot(&self) -> Vec<Order> {
        self.orders.clone()
    }

    /// Atomically overwrite the live order set, e.g. with a matcher's
    /// `remaining` output.
    pub fn replace(&mut self, new_orders: Vec<Order>) {
        self.orders = new_orders;
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order(maker: &str, ts: u64) -> Order {
        Order::new(maker, "USDC", 1.0, 1.0, 1.0, ts, "sig").unwrap()
    }

    #[test]
    fn admit_rejects_invalid_orders_without_mutating() {
        let mut book = Book::new();
        book.admit(order("a", 1)).unwrap();
        let bad = Order {
            maker: "b".into(),
            taker_asset: "USDC".into(),
            make_amount: -1.0,
            take_amount: 1.0,
            price: 1.0,
            timestamp: 2,
            signature: "s".into(),
        };
        assert!(book.admit(bad).is_err());
        assert_eq!(book.len(), 1);
    }

    #[test]
    fn snapshot_is_independent_copy() {
        let mut book = Book::new();
        book.admit(order("a", 1)).unwrap();
        let mut snap = book.snapshot();
        snap.push(order("b", 2));
        assert_eq!(book.len(), 1);
        assert_eq!(snap.len(), 2);
    }

    #[test]
    fn replace_overwrites_atomically() {
        let mut book = Book::new();
        book.admit(order("a", 1)).unwrap();
        book.admit(order("b", 2)).unwrap();
        book.replace(vec![order("c", 3)]);
        assert_eq!(book.len(), 1);
        assert_eq!(book.snapshot()[0].maker, "c");
    }

    #[test]
    fn preserves_admission_order() {
        let mut book = Book::new();
        for i in 0..5 {
            book.admit(order(&format!("m{i}"), i as u64 + 1)).unwrap();
        }
        let snap = book.snapshot();
        let makers: Vec<_> = snap.iter().map(|o| o.maker.clone()).collect();
        assert_eq!(makers, vec!["m0", "m1", "m2", "m3", "m4"]);
    }
}
