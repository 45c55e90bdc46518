//! Nested `category → action → level` grant matrix.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use tillworks_core::{DomainError, DomainResult};

use crate::level::Level;
use crate::schema::{Action, Category, PermissionSchema};

/// A sanitized set of capability grants.
///
/// Only ever constructed through [`PermissionMatrix::sanitize`] (for untrusted
/// or persisted input) or explicit [`PermissionMatrix::set`] calls, so every
/// entry is schema-known by the time authorization consults it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionMatrix(BTreeMap<Category, BTreeMap<Action, Level>>);

impl PermissionMatrix {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.values().all(|actions| actions.is_empty())
    }

    pub fn level(&self, category: Category, action: Action) -> Option<Level> {
        self.0.get(&category)?.get(&action).copied()
    }

    /// Rank of the assignment on (category, action); unset entries rank 0.
    pub fn rank(&self, category: Category, action: Action) -> u8 {
        self.level(category, action).map_or(0, Level::rank)
    }

    /// `rank(assigned) >= rank(required)`.
    pub fn grants(&self, category: Category, action: Action, required: Level) -> bool {
        self.rank(category, action) >= required.rank()
    }

    pub fn set(&mut self, category: Category, action: Action, level: Level) {
        self.0.entry(category).or_default().insert(action, level);
    }

    /// Builder form of [`set`](Self::set) for literals and tests.
    pub fn with(mut self, category: Category, action: Action, level: Level) -> Self {
        self.set(category, action, level);
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (Category, Action, Level)> + '_ {
        self.0.iter().flat_map(|(category, actions)| {
            actions
                .iter()
                .map(move |(action, level)| (*category, *action, *level))
        })
    }

    /// Normalize an untrusted nested map against the schema.
    ///
    /// Unknown categories, unknown actions and numeric-looking keys (JSON
    /// arrays arrive as objects with index keys) are dropped. Levels outside
    /// an action's allowed set are coerced by [`ActionSpec::coerce`]; level
    /// strings the vocabulary no longer contains land on
    /// [`ActionSpec::stale_level`]; null/false/empty assignments are dropped.
    ///
    /// [`ActionSpec::coerce`]: crate::schema::ActionSpec::coerce
    /// [`ActionSpec::stale_level`]: crate::schema::ActionSpec::stale_level
    pub fn sanitize(raw: &Value, schema: &PermissionSchema) -> PermissionMatrix {
        let mut out = PermissionMatrix::default();
        let Some(categories) = raw.as_object() else {
            return out;
        };
        for (category_key, actions_value) in categories {
            if is_numeric_key(category_key) {
                continue;
            }
            let Some(category) = Category::from_key(category_key) else {
                tracing::debug!(key = %category_key, "dropping unknown permission category");
                continue;
            };
            let Some(actions) = actions_value.as_object() else {
                continue;
            };
            for (action_key, level_value) in actions {
                if is_numeric_key(action_key) {
                    continue;
                }
                let Some(action) = Action::from_key(action_key) else {
                    tracing::debug!(
                        category = %category,
                        key = %action_key,
                        "dropping unknown permission action"
                    );
                    continue;
                };
                let Some(spec) = schema.action_spec(category, action) else {
                    continue;
                };
                let level = match level_value {
                    Value::String(s) => match Level::from_key(s) {
                        Some(known) => spec.coerce(known),
                        None if s.is_empty() => continue,
                        None => spec.stale_level(),
                    },
                    Value::Null | Value::Bool(false) => continue,
                    _ => spec.stale_level(),
                };
                out.set(category, action, level);
            }
        }
        out
    }

    /// Per-action maximum of two matrices by rank.
    ///
    /// Existing assignments win ties, so an established `read_only` is not
    /// flipped to `download` (or back) by an equal-ranked upgrade.
    pub fn merge_max(&self, upgrade: &PermissionMatrix) -> PermissionMatrix {
        let mut out = self.clone();
        for (category, action, level) in upgrade.iter() {
            if level.rank() > out.rank(category, action) {
                out.set(category, action, level);
            }
        }
        out
    }
}

/// Delegation bound: `requested` may not exceed `ceiling` on any pair.
///
/// Master admins are the ceiling themselves and must not be checked here;
/// callers skip the call for them.
pub fn assert_not_above(
    requested: &PermissionMatrix,
    ceiling: &PermissionMatrix,
) -> DomainResult<()> {
    for (category, action, level) in requested.iter() {
        if level.rank() > ceiling.rank(category, action) {
            return Err(DomainError::forbidden(format!(
                "cannot grant {category}.{action} at {level}: above your own level"
            )));
        }
    }
    Ok(())
}

fn is_numeric_key(key: &str) -> bool {
    !key.is_empty() && key.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn schema() -> PermissionSchema {
        PermissionSchema::retail()
    }

    #[test]
    fn sanitize_drops_unknown_and_numeric_keys() {
        let raw = json!({
            "store_management": { "store_list": "read_only", "bogus": "read_write" },
            "0": { "store_list": "read_write" },
            "inventory": { "1": "read_write", "wastage": "read_write" },
            "payroll": { "salaries": "read_write" },
        });
        let matrix = PermissionMatrix::sanitize(&raw, &schema());
        assert_eq!(
            matrix.level(Category::StoreManagement, Action::StoreList),
            Some(Level::ReadOnly)
        );
        assert_eq!(matrix.level(Category::Inventory, Action::Wastage), Some(Level::ReadWrite));
        assert_eq!(matrix.iter().count(), 2);
    }

    #[test]
    fn sanitize_coerces_read_write_to_download() {
        let raw = json!({
            "store_management": { "invoice_download": "read_write" },
            "inventory": { "stock_report": "read_only" },
        });
        let matrix = PermissionMatrix::sanitize(&raw, &schema());
        assert_eq!(
            matrix.level(Category::StoreManagement, Action::InvoiceDownload),
            Some(Level::Download)
        );
        assert_eq!(
            matrix.level(Category::Inventory, Action::StockReport),
            Some(Level::Download)
        );
    }

    #[test]
    fn sanitize_coerces_download_to_read_write() {
        let raw = json!({ "items": { "item_master": "download" } });
        let matrix = PermissionMatrix::sanitize(&raw, &schema());
        assert_eq!(matrix.level(Category::Items, Action::ItemMaster), Some(Level::ReadWrite));
    }

    #[test]
    fn sanitize_handles_stale_vocabulary_and_falsy_values() {
        let raw = json!({
            "items": { "item_master": "admin", "categories": null },
            "reports": { "sales_report": "full_access" },
            "users": { "users": false, "role": "" },
        });
        let matrix = PermissionMatrix::sanitize(&raw, &schema());
        assert_eq!(matrix.level(Category::Items, Action::ItemMaster), Some(Level::ReadOnly));
        assert_eq!(matrix.level(Category::Reports, Action::SalesReport), Some(Level::Show));
        assert_eq!(matrix.level(Category::Items, Action::Categories), None);
        assert_eq!(matrix.level(Category::Users, Action::Users), None);
        assert_eq!(matrix.level(Category::Users, Action::Role), None);
    }

    #[test]
    fn sanitize_rejects_non_object_input() {
        let matrix = PermissionMatrix::sanitize(&json!(["store_management"]), &schema());
        assert!(matrix.is_empty());
        let matrix = PermissionMatrix::sanitize(&json!("read_write"), &schema());
        assert!(matrix.is_empty());
    }

    #[test]
    fn grants_treats_unset_as_rank_zero() {
        let matrix = PermissionMatrix::new().with(Category::Items, Action::ItemMaster, Level::Show);
        assert!(!matrix.grants(Category::Items, Action::Categories, Level::Show));
        assert!(matrix.grants(Category::Items, Action::ItemMaster, Level::Show));
        assert!(!matrix.grants(Category::Items, Action::ItemMaster, Level::ReadOnly));
    }

    #[test]
    fn delegation_rejects_grants_above_ceiling() {
        let ceiling =
            PermissionMatrix::new().with(Category::Items, Action::ItemMaster, Level::ReadOnly);
        let too_high =
            PermissionMatrix::new().with(Category::Items, Action::ItemMaster, Level::ReadWrite);
        let within =
            PermissionMatrix::new().with(Category::Items, Action::ItemMaster, Level::ReadOnly);

        assert!(matches!(
            assert_not_above(&too_high, &ceiling),
            Err(DomainError::Forbidden(_))
        ));
        assert!(assert_not_above(&within, &ceiling).is_ok());
        assert!(assert_not_above(&PermissionMatrix::new(), &ceiling).is_ok());
    }

    #[test]
    fn delegation_compares_download_and_read_only_as_equal_rank() {
        let ceiling = PermissionMatrix::new().with(
            Category::StoreManagement,
            Action::InvoiceDownload,
            Level::Download,
        );
        let requested = PermissionMatrix::new().with(
            Category::StoreManagement,
            Action::InvoiceDownload,
            Level::Download,
        );
        assert!(assert_not_above(&requested, &ceiling).is_ok());
    }

    #[test]
    fn merge_max_prefers_higher_rank_and_keeps_ties() {
        let base = PermissionMatrix::new()
            .with(Category::Items, Action::ItemMaster, Level::ReadOnly)
            .with(Category::Inventory, Action::StockSold, Level::ReadOnly);
        let upgrade = PermissionMatrix::new()
            .with(Category::Items, Action::ItemMaster, Level::ReadWrite)
            .with(Category::Inventory, Action::StockSold, Level::Show)
            .with(Category::Users, Action::Role, Level::ReadOnly);

        let merged = base.merge_max(&upgrade);
        assert_eq!(merged.level(Category::Items, Action::ItemMaster), Some(Level::ReadWrite));
        assert_eq!(merged.level(Category::Inventory, Action::StockSold), Some(Level::ReadOnly));
        assert_eq!(merged.level(Category::Users, Action::Role), Some(Level::ReadOnly));
    }

    fn category_key() -> impl Strategy<Value = String> {
        prop_oneof![
            Just("store_management".to_string()),
            Just("items".to_string()),
            Just("inventory".to_string()),
            Just("users".to_string()),
            Just("reports".to_string()),
            Just("payroll".to_string()),
            Just("0".to_string()),
            Just("42".to_string()),
        ]
    }

    fn action_key() -> impl Strategy<Value = String> {
        prop_oneof![
            Just("store_list".to_string()),
            Just("invoice_download".to_string()),
            Just("item_master".to_string()),
            Just("stock_sold".to_string()),
            Just("stock_report".to_string()),
            Just("role".to_string()),
            Just("sales_report".to_string()),
            Just("bogus".to_string()),
            Just("7".to_string()),
        ]
    }

    fn level_value() -> impl Strategy<Value = Value> {
        prop_oneof![
            Just(json!("show")),
            Just(json!("read_only")),
            Just(json!("download")),
            Just(json!("read_write")),
            Just(json!("admin")),
            Just(json!("")),
            Just(json!(null)),
            Just(json!(true)),
            Just(json!(3)),
        ]
    }

    fn raw_matrix() -> impl Strategy<Value = Value> {
        proptest::collection::btree_map(
            category_key(),
            proptest::collection::btree_map(action_key(), level_value(), 0..6),
            0..6,
        )
        .prop_map(|map| serde_json::to_value(map).unwrap())
    }

    proptest! {
        #![proptest_config(ProptestConfig { cases: 256, ..ProptestConfig::default() })]

        #[test]
        fn sanitize_output_is_always_schema_valid(raw in raw_matrix()) {
            let schema = schema();
            let matrix = PermissionMatrix::sanitize(&raw, &schema);
            for (category, action, level) in matrix.iter() {
                let spec = schema.action_spec(category, action);
                prop_assert!(spec.is_some());
                prop_assert!(spec.unwrap().allows(level));
            }
        }

        #[test]
        fn sanitize_is_idempotent(raw in raw_matrix()) {
            let schema = schema();
            let once = PermissionMatrix::sanitize(&raw, &schema);
            let twice =
                PermissionMatrix::sanitize(&serde_json::to_value(&once).unwrap(), &schema);
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn merge_max_never_lowers_rank(raw_a in raw_matrix(), raw_b in raw_matrix()) {
            let schema = schema();
            let a = PermissionMatrix::sanitize(&raw_a, &schema);
            let b = PermissionMatrix::sanitize(&raw_b, &schema);
            let merged = a.merge_max(&b);
            for (category, action, _) in a.iter() {
                prop_assert!(merged.rank(category, action) >= a.rank(category, action));
            }
            for (category, action, _) in b.iter() {
                prop_assert!(merged.rank(category, action) >= b.rank(category, action));
            }
        }

        #[test]
        fn delegation_bound_is_reflexive_and_antisymmetric(
            raw_a in raw_matrix(),
            raw_b in raw_matrix(),
        ) {
            let schema = schema();
            let a = PermissionMatrix::sanitize(&raw_a, &schema);
            let b = PermissionMatrix::sanitize(&raw_b, &schema);
            prop_assert!(assert_not_above(&a, &a).is_ok());
            // Mutual bounds force rank agreement on every assigned pair.
            if assert_not_above(&a, &b).is_ok() && assert_not_above(&b, &a).is_ok() {
                for (category, action, _) in a.iter().chain(b.iter()) {
                    prop_assert_eq!(a.rank(category, action), b.rank(category, action));
                }
            }
        }
    }
}
