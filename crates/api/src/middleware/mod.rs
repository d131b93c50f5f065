//! Request-scoped extractors.
//!
//! - [`actor::RequestActor`] -- Identifies who made the request, for logging.

pub mod actor;
