//! Command handlers, one module per command group

pub mod config;
pub mod convert;
pub mod database;
pub mod node;
