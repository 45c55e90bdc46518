use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tillworks_core::{DomainError, DomainResult, PartyId, StoreId, UserId};

/// Party kind: supplier (purchases come from) or buyer (sales go to).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartyKind {
    Supplier,
    Buyer,
}

impl PartyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PartyKind::Supplier => "supplier",
            PartyKind::Buyer => "buyer",
        }
    }
}

impl core::fmt::Display for PartyKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Contact information for a party. All fields optional; stored as empty
/// strings are normalized to `None` on create.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactInfo {
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}

impl ContactInfo {
    fn normalized(self) -> Self {
        fn clean(value: Option<String>) -> Option<String> {
            value
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        }
        Self {
            phone: clean(self.phone),
            email: clean(self.email),
            address: clean(self.address),
        }
    }
}

/// A supplier or buyer attached to one store.
///
/// Party names are unique per (store, kind); the repository enforces that
/// and surfaces violations as duplicate-key conflicts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Party {
    pub id: PartyId,
    pub kind: PartyKind,
    pub name: String,
    pub contact: ContactInfo,
    pub store: StoreId,
    pub is_active: bool,
    pub created_by: Option<UserId>,
    pub updated_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewParty {
    pub name: String,
    #[serde(flatten)]
    pub contact: ContactInfo,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PartyPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}

impl Party {
    pub fn create(
        input: NewParty,
        kind: PartyKind,
        store: StoreId,
        created_by: Option<UserId>,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let name = input.name.trim().to_string();
        if name.is_empty() {
            return Err(DomainError::validation("name must not be empty"));
        }
        Ok(Self {
            id: PartyId::new(),
            kind,
            name,
            contact: input.contact.normalized(),
            store,
            is_active: true,
            created_by,
            updated_by: created_by,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn apply(&mut self, patch: PartyPatch, updated_by: Option<UserId>, now: DateTime<Utc>) -> DomainResult<()> {
        if let Some(name) = patch.name {
            let name = name.trim().to_string();
            if name.is_empty() {
                return Err(DomainError::validation("name must not be empty"));
            }
            self.name = name;
        }
        if let Some(phone) = patch.phone {
            self.contact.phone = Some(phone).filter(|v| !v.trim().is_empty());
        }
        if let Some(email) = patch.email {
            self.contact.email = Some(email).filter(|v| !v.trim().is_empty());
        }
        if let Some(address) = patch.address {
            self.contact.address = Some(address).filter(|v| !v.trim().is_empty());
        }
        self.updated_by = updated_by;
        self.updated_at = now;
        Ok(())
    }

    pub fn deactivate(&mut self, updated_by: Option<UserId>, now: DateTime<Utc>) {
        self.is_active = false;
        self.updated_by = updated_by;
        self.updated_at = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_party(name: &str) -> NewParty {
        NewParty {
            name: name.into(),
            contact: ContactInfo {
                phone: Some("  ".into()),
                email: Some("ops@acme.example".into()),
                address: None,
            },
        }
    }

    #[test]
    fn create_normalizes_contact_fields() {
        let party = Party::create(
            new_party("  Acme Traders "),
            PartyKind::Supplier,
            StoreId::new(),
            None,
            Utc::now(),
        )
        .unwrap();
        assert_eq!(party.name, "Acme Traders");
        assert_eq!(party.contact.phone, None);
        assert_eq!(party.contact.email.as_deref(), Some("ops@acme.example"));
        assert!(party.is_active);
    }

    #[test]
    fn create_rejects_blank_name() {
        let err = Party::create(
            new_party("   "),
            PartyKind::Buyer,
            StoreId::new(),
            None,
            Utc::now(),
        );
        assert!(matches!(err, Err(DomainError::Validation(_))));
    }

    #[test]
    fn patch_updates_name_and_clears_empty_contact() {
        let mut party = Party::create(
            new_party("Acme"),
            PartyKind::Buyer,
            StoreId::new(),
            None,
            Utc::now(),
        )
        .unwrap();
        party
            .apply(
                PartyPatch {
                    name: Some("Acme Retail".into()),
                    email: Some(String::new()),
                    ..PartyPatch::default()
                },
                None,
                Utc::now(),
            )
            .unwrap();
        assert_eq!(party.name, "Acme Retail");
        assert_eq!(party.contact.email, None);
    }
}
