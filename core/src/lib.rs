//! Rancho: meal-fund dashboard over a spreadsheet system of record.
//!
//! Data flows one way per interaction:
//!   store (spreadsheet) → loader (typed Table, cached) → page logic → view
//! Writes go straight back to the store and invalidate the cache.

pub mod cash_flow;
pub mod config;
pub mod connector;
pub mod daily_totals;
pub mod dashboard;
pub mod error;
pub mod loader;
pub mod notice;
pub mod settlement;
pub mod store;
pub mod table;
pub mod types;
pub mod withdrawals;
