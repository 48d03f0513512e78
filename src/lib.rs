//! Freight marketplace matching service.
//!
//! Scores jobs against trucks with feasibility filters and weighted
//! soft factors, ranks candidates deterministically, coordinates
//! time-bounded truck reservations, and aggregates match analytics
//! from an append-only event history.

pub mod config;
pub mod core;
pub mod models;
pub mod routes;
pub mod services;
