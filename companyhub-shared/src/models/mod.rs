//! Database models for Company Hub
//!
//! This module contains all database models and their CRUD operations.
//!
//! # Models
//!
//! - `user`: User accounts and credentials
//! - `company`: Companies (tenants)
//! - `membership`: User-company relationships with roles
//! - `invite`: Token-based invitations to join a company
//!
//! Multi-statement operations (company creation, company deletion, invite
//! acceptance) run inside a single transaction.

pub mod company;
pub mod invite;
pub mod membership;
pub mod user;
