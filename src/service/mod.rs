//! Domain services.
//!
//! # Purpose
//! Business logic over the repository contracts. Services compose by plain
//! function call inside one process; they never call each other across a
//! transport boundary.
pub mod authz;
pub mod bootstrap;
pub mod client;
pub mod identity;
pub mod session;
pub mod tenant;

pub use authz::{AuthzService, ProjectInfo, UserInfoClaims, UserRoleAssignment};
pub use bootstrap::BootstrapService;
pub use client::ClientService;
pub use identity::IdentityService;
pub use session::SessionService;
pub use tenant::TenantService;
