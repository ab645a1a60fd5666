//! Quitanda Core - Shared types library.
//!
//! This crate provides common types used across all Quitanda components:
//! - `store` - The storefront state engine (catalog, cart, sessions)
//! - `cli` - Command-line front end for the engine
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no HTTP clients, no channels.
//! This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, prices, and emails

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
