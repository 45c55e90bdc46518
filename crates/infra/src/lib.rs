//! Infrastructure layer: repositories, the in-memory backend, the Postgres
//! stock ledger, and the application services the HTTP surface drives.

pub mod repo;
pub mod services;

#[cfg(test)]
mod integration_tests;
