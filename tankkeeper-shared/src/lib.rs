//! # Tankkeeper Shared Library
//!
//! Core of the Tankkeeper fishkeeping backend: who may call which operation,
//! and how fish, tank and user records stay consistent while they change.
//!
//! ## Module Organization
//!
//! - `models`: Fish, tank and user records
//! - `auth`: Session tokens, caller identity and the access tier gate
//! - `store`: Unit-of-work storage trait with Postgres and in-memory adapters
//! - `db`: Postgres pool and migrations
//! - `repository`: Per-entity repositories
//! - `consistency`: Multi-entity mutations (tank delete, tank update, inventory)
//! - `dispatch`: Operation catalogue and dispatcher
//! - `error`: Failure taxonomy

pub mod auth;
pub mod consistency;
pub mod db;
pub mod dispatch;
pub mod error;
pub mod models;
pub mod repository;
pub mod store;

/// Current version of the Tankkeeper shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
