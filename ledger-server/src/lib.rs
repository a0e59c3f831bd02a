//! Transit trip ledger server.
//!
//! Records trips taken on public transport lines, computing each trip's
//! distance from catalog stop coordinates and the emissions it avoided.
//! Catalog reads go through a time-limited disk cache; the ledger keeps
//! lines and trips consistent across deletes and restarts.

pub mod cache;
pub mod catalog;
pub mod clock;
pub mod config;
pub mod gateway;
pub mod ledger;
pub mod recorder;
pub mod store;
pub mod web;
