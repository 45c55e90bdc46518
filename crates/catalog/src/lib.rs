//! `tillworks-catalog` — items, categories and store catalog entries.
//!
//! Everything in here is store-owned: reads and writes are bounded by the
//! caller's access scope before they reach these records.

pub mod category;
pub mod entry;
pub mod item;

pub use category::{Category, CategoryPatch, NewCategory};
pub use entry::{CatalogEntry, EntryKind, EntryPatch, NewEntry};
pub use item::{Item, ItemPatch, NewItem};
