//! Stock view tests
//!
//! Covers the free-text filter, the displayed column layout and the
//! roll-edit audit diff.

use chrono::Utc;
use proptest::prelude::*;
use rust_decimal::Decimal;
use shared::stock::{filter_stock, matches_search, stock_row, STOCK_COLUMNS};
use shared::{diff_roll, validate_roll_patch, Roll, RollPatch, RollStatus, WarehouseLocation};
use uuid::Uuid;

fn roll(number: &str, status: RollStatus) -> Roll {
    Roll {
        id: Uuid::new_v4(),
        roll_number: number.to_string(),
        crt_number: "BR4410".to_string(),
        purchase_order: Some("PC-77".to_string()),
        invoice_id: None,
        invoice_number: Some("NF 1020".to_string()),
        sales_order: Some("OV-3".to_string()),
        paper_type: "Miolo".to_string(),
        grammage: 120,
        format: "2200".to_string(),
        weight_kg: Decimal::new(14205, 1),
        origin: Some("Misiones".to_string()),
        exporter: Some("Papelera Misionera".to_string()),
        importer: Some("Embalagens Sul".to_string()),
        location: WarehouseLocation {
            street: Some("3".to_string()),
            block: Some("12".to_string()),
            row: None,
        },
        status,
        load_complete: false,
        created_at: Utc::now(),
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn test_search_covers_displayed_text_fields() {
        let r = roll("BB-01", RollStatus::InStock);
        for query in ["bb-01", "br44", "ov-3", "MIOLO", "misionera", "sul"] {
            assert!(matches_search(&r, query), "{} should match", query);
        }
        // purchase order and invoice are not searched
        assert!(!matches_search(&r, "PC-77"));
        assert!(!matches_search(&r, "NF 1020"));
        assert!(matches_search(&r, "   "));
    }

    #[test]
    fn test_filter_keeps_only_in_stock() {
        let rolls = vec![
            roll("A", RollStatus::InStock),
            roll("B", RollStatus::InTransit),
            roll("C", RollStatus::Loaded),
            roll("D", RollStatus::InStock),
        ];
        let numbers: Vec<&str> = filter_stock(&rolls, None)
            .iter()
            .map(|r| r.roll_number.as_str())
            .collect();
        assert_eq!(numbers, vec!["A", "D"]);
    }

    #[test]
    fn test_row_matches_columns() {
        let row = stock_row(&roll("BB-01", RollStatus::InStock));
        assert_eq!(row.len(), STOCK_COLUMNS.len());
        assert_eq!(row[0], "BB-01");
        assert_eq!(row[8], "1420.5");
        assert_eq!(row[11], "R3-B12");
        assert_eq!(row[12], "Não");
    }

    #[test]
    fn test_patch_cannot_blank_required_fields() {
        let patch = RollPatch {
            format: Some("  ".to_string()),
            ..Default::default()
        };
        assert_eq!(validate_roll_patch(&patch).unwrap_err().field, "format");

        let patch = RollPatch {
            weight_kg: Some(Decimal::new(-1, 0)),
            ..Default::default()
        };
        assert_eq!(validate_roll_patch(&patch).unwrap_err().field, "weight_kg");

        let patch = RollPatch {
            origin: Some(String::new()),
            ..Default::default()
        };
        assert!(validate_roll_patch(&patch).is_ok());
    }

    #[test]
    fn test_apply_then_diff_is_empty() {
        let mut r = roll("BB-01", RollStatus::InStock);
        let patch = RollPatch {
            roll_number: Some(" BB-02 ".to_string()),
            grammage: Some(140),
            importer: Some(String::new()),
            row: Some("4".to_string()),
            ..Default::default()
        };
        assert_eq!(diff_roll(&r, &patch).len(), 4);

        patch.apply_to(&mut r);
        assert_eq!(r.roll_number, "BB-02");
        assert_eq!(r.importer, None);
        assert_eq!(r.location.row.as_deref(), Some("4"));
        assert!(diff_roll(&r, &patch).is_empty());
    }
}

// ============================================================================
// Property Tests
// ============================================================================

fn status_strategy() -> impl Strategy<Value = RollStatus> {
    prop_oneof![
        Just(RollStatus::InTransit),
        Just(RollStatus::InStock),
        Just(RollStatus::Loaded),
    ]
}

proptest! {
    /// Filtering never returns more than the in-stock rolls, and every
    /// returned roll is in stock and matches
    #[test]
    fn prop_filter_is_a_matching_subset(
        specs in prop::collection::vec(("[A-Z]{1,3}-[0-9]{1,3}", status_strategy()), 0..30),
        query in "[a-z0-9-]{0,4}",
    ) {
        let rolls: Vec<Roll> = specs.iter().map(|(n, s)| roll(n, *s)).collect();
        let in_stock = rolls.iter().filter(|r| r.status == RollStatus::InStock).count();
        let filtered = filter_stock(&rolls, Some(query.as_str()));

        prop_assert!(filtered.len() <= in_stock);
        for r in &filtered {
            prop_assert_eq!(r.status, RollStatus::InStock);
            prop_assert!(matches_search(r, &query));
        }
    }

    /// Search is case-insensitive
    #[test]
    fn prop_search_ignores_case(number in "[a-zA-Z]{2,8}") {
        let r = roll(&number, RollStatus::InStock);
        prop_assert!(matches_search(&r, &number.to_uppercase()));
        prop_assert!(matches_search(&r, &number.to_lowercase()));
    }
}
