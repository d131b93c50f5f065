//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that
//! accept `&PgPool` as the first argument.

pub mod ticket_repo;

pub use ticket_repo::TicketRepo;
