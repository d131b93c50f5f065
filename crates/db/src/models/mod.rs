//! Row models and request DTOs.
//!
//! Each submodule contains:
//! - `FromRow` structs matching database rows, converted into core types
//! - `Deserialize` + `Validate` DTOs for inserts and patches

pub mod ticket;
