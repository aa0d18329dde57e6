//! `warden-core` — shared identifiers and the RBAC error model.
//!
//! This crate has no storage or transport concerns.

pub mod error;
pub mod id;

pub use error::{RbacError, RbacResult};
pub use id::{ModuleId, RoleId, UserId};
