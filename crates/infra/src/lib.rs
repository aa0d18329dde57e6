//! Infrastructure layer: relational store, bootstrap, resolution and managers.

pub mod config;
pub mod gate;
pub mod managers;
pub mod model;
pub mod resolver;
pub mod seed;
pub mod store;


pub use config::StoreConfig;
pub use gate::AccessGate;
pub use managers::{
    ModuleManager, NewUser, RoleManager, RoleModuleManager, UserManager, UserRoleManager, UserUpdate,
};
pub use model::{Grant, LegacyRole, Module, ModulePermission, Role, User, UserRoleAssignment};
pub use resolver::{PermissionResolver, SqlPermissionResolver};
pub use seed::{SeedData, SeedOutcome};
pub use store::Store;
