//! `tillworks-auth` — identity, capability levels and delegation rules.
//!
//! This crate is intentionally decoupled from HTTP and storage: it models the
//! actor, the leveled permission matrix and the JWT claims, and leaves token
//! transport and persistence to the outer layers.

pub mod actor;
pub mod claims;
pub mod level;
pub mod matrix;
pub mod role;
pub mod schema;
pub mod scope;
pub mod user;

pub use actor::Actor;
pub use claims::{Hs256JwtValidator, JwtClaims, TokenError, TokenValidationError, validate_claims};
pub use level::Level;
pub use matrix::{PermissionMatrix, assert_not_above};
pub use role::{MASTER_ROLE_NAME, NewRole, Role, RolePatch, RoleScope};
pub use schema::{Action, ActionSpec, Category, PermissionSchema};
pub use scope::AccessScope;
pub use user::{NewUser, User, UserPatch, UserStatus};
