//! # ekyc-guard-cli
//!
//! Command-line front end for the `ekyc-guard` integrity gate.
//!
//! ## Commands
//!
//! - **modules**: executable images loaded into this process
//! - **stack**: audit this process's own call stack
//! - **env**: device and environment probes
//! - **check**: the full gate; exits with status 2 when it fails
//! - **config**: show, locate or initialise the TOML configuration

pub mod cli;
pub mod config;
pub mod output;

pub use cli::run;
