//! Trading partners: the suppliers a store buys from and the buyers it
//! sells to. Both share one record shape and differ only by kind.

pub mod party;

pub use party::{ContactInfo, NewParty, Party, PartyKind, PartyPatch};
