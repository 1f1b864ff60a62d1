//! Ports module for the incentive subsystem

pub mod inbound;
pub mod outbound;

pub use inbound::IncentiveApi;
pub use outbound::{BankError, BankGateway};
