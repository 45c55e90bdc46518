//! User records (the authenticated identity behind an actor).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tillworks_core::{DomainError, DomainResult, RoleId, StoreId, UserId};

/// Account status. Inactive users are rejected during authentication, before
/// any authorization check runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum UserStatus {
    Active,
    Inactive,
}

/// A back-office user.
///
/// `password_hash` is opaque here: hashing and verification belong to an
/// upstream collaborator, this layer only stores and echoes the value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Option<RoleId>,
    pub store: Option<StoreId>,
    pub is_master_admin: bool,
    pub is_parent_admin: bool,
    pub accessible_stores: Vec<StoreId>,
    pub status: UserStatus,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a user.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Option<RoleId>,
    pub store: Option<StoreId>,
    #[serde(default)]
    pub is_master_admin: bool,
    #[serde(default)]
    pub is_parent_admin: bool,
    #[serde(default)]
    pub accessible_stores: Vec<StoreId>,
}

/// Partial update for a user. Reference fields (role, store, grants, the
/// master flag) are validated by the user service before application.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct UserPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password_hash: Option<String>,
    #[serde(default)]
    pub role: Option<Option<RoleId>>,
    #[serde(default)]
    pub store: Option<Option<StoreId>>,
    #[serde(default)]
    pub is_master_admin: Option<bool>,
    #[serde(default)]
    pub is_parent_admin: Option<bool>,
    #[serde(default)]
    pub accessible_stores: Option<Vec<StoreId>>,
    #[serde(default)]
    pub status: Option<UserStatus>,
}

impl User {
    pub fn create(input: NewUser, now: DateTime<Utc>) -> DomainResult<Self> {
        let name = input.name.trim().to_string();
        if name.is_empty() {
            return Err(DomainError::validation("user name must not be empty"));
        }
        let email = input.email.trim().to_ascii_lowercase();
        if email.is_empty() || !email.contains('@') {
            return Err(DomainError::validation("user email must be a valid address"));
        }
        Ok(Self {
            id: UserId::new(),
            name,
            email,
            password_hash: input.password_hash,
            role: input.role,
            store: input.store,
            is_master_admin: input.is_master_admin,
            is_parent_admin: input.is_parent_admin,
            accessible_stores: input.accessible_stores,
            status: UserStatus::Active,
            last_login_at: None,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn is_active(&self) -> bool {
        self.status == UserStatus::Active
    }

    /// Apply a validated patch, renormalizing name and email.
    pub fn apply(&mut self, patch: UserPatch, now: DateTime<Utc>) -> DomainResult<()> {
        if let Some(name) = patch.name {
            let name = name.trim().to_string();
            if name.is_empty() {
                return Err(DomainError::validation("user name must not be empty"));
            }
            self.name = name;
        }
        if let Some(email) = patch.email {
            let email = email.trim().to_ascii_lowercase();
            if !email.contains('@') {
                return Err(DomainError::validation("user email must be a valid address"));
            }
            self.email = email;
        }
        if let Some(password_hash) = patch.password_hash {
            self.password_hash = password_hash;
        }
        if let Some(role) = patch.role {
            self.role = role;
        }
        if let Some(store) = patch.store {
            self.store = store;
        }
        if let Some(is_master_admin) = patch.is_master_admin {
            self.is_master_admin = is_master_admin;
        }
        if let Some(is_parent_admin) = patch.is_parent_admin {
            self.is_parent_admin = is_parent_admin;
        }
        if let Some(accessible_stores) = patch.accessible_stores {
            self.accessible_stores = accessible_stores;
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        self.updated_at = now;
        Ok(())
    }
}
