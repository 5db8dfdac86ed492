//! Middleware modules for the API server
//!
//! Authentication and tenancy middleware live in
//! `companyhub_shared::auth::middleware`.

pub mod security;
