//! # Company Hub Shared Library
//!
//! Domain models, persistence and the request authorization pipeline used by
//! the Company Hub API server.
//!
//! ## Module Organization
//!
//! - `models`: Users, companies, memberships and invites
//! - `auth`: Token handling, identity resolution, tenancy guard and role gate
//! - `db`: Connection pool and migrations

pub mod auth;
pub mod db;
pub mod models;

/// Current version of the Company Hub shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
