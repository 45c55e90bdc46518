//! Invoices and their totals arithmetic.
//!
//! An invoice issued at creation time is the only thing that writes SOLD
//! events into the stock ledger; drafts never touch it. That wiring lives in
//! the service layer, this crate holds the records and the math.

pub mod invoice;
pub mod totals;

pub use invoice::{
    CatalogNames, Invoice, InvoiceLine, InvoiceStatus, NewInvoice, NewInvoiceLine, invoice_number,
};
pub use totals::{InvoiceTotals, calculate_totals, line_total};
