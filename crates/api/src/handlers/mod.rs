pub mod consistency;
pub mod dashboard;
pub mod tickets;
pub mod webhook;
