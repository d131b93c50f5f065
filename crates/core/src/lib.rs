//! Ticket domain logic: types, lifecycle rules, consistency checks and
//! dashboard aggregation. Nothing in this crate performs I/O.

pub mod analytics;
pub mod consistency;
pub mod error;
pub mod rules;
pub mod search;
pub mod ticket;
pub mod types;
