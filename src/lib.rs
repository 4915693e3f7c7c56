//! Orchestrix - versioned resource management service.
//!
//! Every managed resource (tenants, hosts, OAuth clients, users) is kept
//! as an append-only series of versions addressed by a canonical URN.
//! The generic pieces are:
//! - [`entity`]: the per-entity adapter contract and its create/update views
//! - [`urn`]: URN and name grammar, identifier classification
//! - [`store`]: the versioned store trait and its SQLite implementation
//! - [`api`]: REST bindings derived from an entity adapter

pub mod api;
pub mod catalog;
pub mod config;
pub mod entity;
pub mod store;
pub mod urn;
pub mod utils;
