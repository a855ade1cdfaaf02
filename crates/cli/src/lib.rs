//! Host-side tooling for the tabcast capture panel: the relay endpoint the
//! panel streams into, plus offline helpers for catalogs and configuration.

pub mod cli;
pub mod commands;
pub mod config_store;
pub mod error;
pub mod logging;
pub mod output;
pub mod relay;
