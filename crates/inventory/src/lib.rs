//! Stock ledger domain: immutable movement events and the balance
//! projection derived from them.
//!
//! Movements are append-only. Corrections never rewrite history; a row is
//! soft-deleted (`is_active = false`) and excluded from every projection.

pub mod balance;
pub mod movement;

pub use balance::{
    BalanceReport, BalanceRow, BalanceWindow, MovementSums, current_stock, project_balances,
};
pub use movement::{
    MovementDetail, MovementKind, NewPurchase, NewWastage, SaleLine, SoldKey, StockMovement,
};
