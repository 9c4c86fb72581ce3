//! # Tankkeeper API Server Library
//!
//! HTTP surface of the Tankkeeper backend: every operation of the catalogue
//! is exposed as `POST /v1/rpc/:operation`, with the caller resolved from an
//! optional bearer token.
//!
//! ## Modules
//!
//! - `app`: Application state and router builder
//! - `config`: Configuration management
//! - `error`: Error handling and HTTP response mapping
//! - `middleware`: Caller identity and security headers
//! - `routes`: API route handlers

pub mod app;
pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
