//! Invoice totals, computed in exact decimal arithmetic.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::invoice::NewInvoiceLine;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceTotals {
    pub subtotal: Decimal,
    pub tax: Decimal,
    pub discount: Decimal,
    pub total: Decimal,
}

const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

fn clamp_percent(percent: Decimal) -> Decimal {
    percent.clamp(Decimal::ZERO, HUNDRED)
}

/// `qty × price + line tax − line discount` for a single line.
pub fn line_total(line: &NewInvoiceLine) -> Decimal {
    let gross = Decimal::from(line.quantity) * line.unit_price;
    gross + gross * line.tax_rate / HUNDRED - line.discount
}

/// Sums the lines and applies the invoice-level percentage discount.
///
/// The percentage is clamped to [0, 100]; line discounts are absolute
/// amounts and add to the discounted total unclamped.
pub fn calculate_totals(lines: &[NewInvoiceLine], discount_percent: Decimal) -> InvoiceTotals {
    let mut subtotal = Decimal::ZERO;
    let mut tax = Decimal::ZERO;
    let mut line_discounts = Decimal::ZERO;

    for line in lines {
        let gross = Decimal::from(line.quantity) * line.unit_price;
        subtotal += gross;
        tax += gross * line.tax_rate / HUNDRED;
        line_discounts += line.discount;
    }

    let invoice_discount = subtotal * clamp_percent(discount_percent) / HUNDRED;
    let discount = line_discounts + invoice_discount;

    InvoiceTotals {
        subtotal,
        tax,
        discount,
        total: subtotal + tax - discount,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn line(qty: i64, price: i64, tax_rate: i64, discount: i64) -> NewInvoiceLine {
        NewInvoiceLine {
            item: None,
            description: String::new(),
            quantity: qty,
            unit_price: Decimal::from(price),
            tax_rate: Decimal::from(tax_rate),
            discount: Decimal::from(discount),
        }
    }

    #[test]
    fn sums_lines_and_applies_percentage() {
        // 2×100 + 1×50 = 250 subtotal; tax 10% on first line = 20;
        // line discount 5; invoice discount 10% of 250 = 25.
        let lines = vec![line(2, 100, 10, 5), line(1, 50, 0, 0)];
        let totals = calculate_totals(&lines, Decimal::from(10));
        assert_eq!(totals.subtotal, Decimal::from(250));
        assert_eq!(totals.tax, Decimal::from(20));
        assert_eq!(totals.discount, Decimal::from(30));
        assert_eq!(totals.total, Decimal::from(240));
    }

    #[test]
    fn percentage_clamps_to_valid_range() {
        let lines = vec![line(1, 100, 0, 0)];
        let over = calculate_totals(&lines, Decimal::from(250));
        assert_eq!(over.discount, Decimal::from(100));
        assert_eq!(over.total, Decimal::ZERO);

        let under = calculate_totals(&lines, Decimal::from(-40));
        assert_eq!(under.discount, Decimal::ZERO);
        assert_eq!(under.total, Decimal::from(100));
    }

    #[test]
    fn empty_invoice_is_all_zero() {
        let totals = calculate_totals(&[], Decimal::from(50));
        assert_eq!(totals, InvoiceTotals::default());
    }

    #[test]
    fn line_total_matches_component_formula() {
        let l = line(3, 40, 5, 10);
        // 120 + 6 - 10
        assert_eq!(line_total(&l), Decimal::from(116));
    }

    proptest! {
        #![proptest_config(ProptestConfig { cases: 256, ..ProptestConfig::default() })]

        #[test]
        fn total_is_subtotal_plus_tax_minus_discount(
            specs in proptest::collection::vec((0i64..50, 0i64..10_000, 0i64..30, 0i64..100), 0..12),
            percent in -50i64..200,
        ) {
            let lines: Vec<NewInvoiceLine> = specs
                .into_iter()
                .map(|(q, p, t, d)| line(q, p, t, d))
                .collect();
            let totals = calculate_totals(&lines, Decimal::from(percent));
            prop_assert_eq!(totals.total, totals.subtotal + totals.tax - totals.discount);
        }

        #[test]
        fn invoice_discount_never_exceeds_subtotal(
            specs in proptest::collection::vec((0i64..50, 0i64..10_000), 1..12),
            percent in 0i64..500,
        ) {
            let lines: Vec<NewInvoiceLine> = specs
                .into_iter()
                .map(|(q, p)| line(q, p, 0, 0))
                .collect();
            let totals = calculate_totals(&lines, Decimal::from(percent));
            prop_assert!(totals.discount <= totals.subtotal);
        }
    }
}
