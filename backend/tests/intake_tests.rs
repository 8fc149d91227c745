//! Intake registration tests
//!
//! Covers CRT normalization and uniqueness, the per-intake limits and the
//! required roll fields.

use proptest::prelude::*;
use rust_decimal::Decimal;
use shared::{
    crt_in_use, normalize_crt, validate_crt_number, validate_intake, IntakeInput, IntakeInvoice, IntakeRoll,
    MAX_INVOICES_PER_INTAKE, MAX_ROLLS_PER_INTAKE,
};

fn invoice(number: &str) -> IntakeInvoice {
    IntakeInvoice {
        number: number.to_string(),
        value: Some(Decimal::from(15_000)),
    }
}

fn roll(number: &str, invoice_index: usize) -> IntakeRoll {
    IntakeRoll {
        roll_number: number.to_string(),
        invoice_index,
        paper_type: "Kraftliner".to_string(),
        grammage: Some(125),
        format: "2400".to_string(),
        weight_kg: Some(Decimal::new(18755, 1)),
        ..Default::default()
    }
}

fn intake(invoices: usize, rolls: usize) -> IntakeInput {
    IntakeInput {
        crt_number: "BR 1234 AR".to_string(),
        invoices: (0..invoices).map(|i| invoice(&format!("NF-{}", i))).collect(),
        rolls: (0..rolls).map(|i| roll(&format!("B-{:04}", i), i % invoices.max(1))).collect(),
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn test_valid_intake_passes() {
        assert!(validate_intake(&intake(2, 10)).is_ok());
    }

    #[test]
    fn test_limits_are_inclusive() {
        assert!(validate_intake(&intake(MAX_INVOICES_PER_INTAKE, MAX_ROLLS_PER_INTAKE)).is_ok());

        let err = validate_intake(&intake(MAX_INVOICES_PER_INTAKE + 1, 1)).unwrap_err();
        assert_eq!(err.field, "invoices");

        let err = validate_intake(&intake(1, MAX_ROLLS_PER_INTAKE + 1)).unwrap_err();
        assert_eq!(err.field, "rolls");
    }

    #[test]
    fn test_empty_lists_are_rejected() {
        assert_eq!(validate_intake(&intake(0, 1)).unwrap_err().field, "invoices");
        assert_eq!(validate_intake(&intake(1, 0)).unwrap_err().field, "rolls");
    }

    #[test]
    fn test_blank_invoice_number_is_rejected() {
        let mut input = intake(2, 2);
        input.invoices[1].number = "   ".to_string();
        assert_eq!(validate_intake(&input).unwrap_err().field, "invoices[1].number");
    }

    fn rejected_field(mutate: impl FnOnce(&mut IntakeRoll)) -> String {
        let mut input = intake(1, 3);
        mutate(&mut input.rolls[2]);
        validate_intake(&input).unwrap_err().field
    }

    #[test]
    fn test_missing_roll_fields_are_reported_by_field() {
        assert_eq!(rejected_field(|r| r.roll_number = " ".to_string()), "rolls[2].roll_number");
        assert_eq!(rejected_field(|r| r.paper_type = String::new()), "rolls[2].paper_type");
        assert_eq!(rejected_field(|r| r.grammage = Some(0)), "rolls[2].grammage");
        assert_eq!(rejected_field(|r| r.grammage = None), "rolls[2].grammage");
        assert_eq!(rejected_field(|r| r.format = String::new()), "rolls[2].format");
        assert_eq!(rejected_field(|r| r.weight_kg = Some(Decimal::ZERO)), "rolls[2].weight_kg");
        assert_eq!(rejected_field(|r| r.weight_kg = None), "rolls[2].weight_kg");
        assert_eq!(rejected_field(|r| r.invoice_index = 5), "rolls[2].invoice_index");
    }

    #[test]
    fn test_values_wider_than_their_columns_are_rejected() {
        assert_eq!(rejected_field(|r| r.roll_number = "B".repeat(61)), "rolls[2].roll_number");
        assert_eq!(rejected_field(|r| r.paper_type = "K".repeat(121)), "rolls[2].paper_type");
        assert_eq!(rejected_field(|r| r.format = "9".repeat(61)), "rolls[2].format");
        assert_eq!(
            rejected_field(|r| r.weight_kg = Some(Decimal::from(1_000_000_000_000i64))),
            "rolls[2].weight_kg"
        );

        let mut input = intake(2, 2);
        input.invoices[1].number = "9".repeat(61);
        assert_eq!(validate_intake(&input).unwrap_err().field, "invoices[1].number");

        let mut input = intake(1, 1);
        input.rolls[0].roll_number = "B".repeat(60);
        input.rolls[0].paper_type = "K".repeat(120);
        input.invoices[0].number = "9".repeat(60);
        assert!(validate_intake(&input).is_ok());
    }

    #[test]
    fn test_repeated_roll_numbers_are_rejected() {
        let mut input = intake(1, 3);
        input.rolls[2].roll_number = " b-0000 ".to_string();
        let err = validate_intake(&input).unwrap_err();
        assert_eq!(err.field, "rolls[2].roll_number");
        assert!(err.message_pt.contains("repetido"));
    }

    #[test]
    fn test_crt_in_use_ignores_spacing_and_case() {
        let existing = ["BR1234AR", "UY77"];
        assert!(crt_in_use(existing.iter().copied(), " br 1234 ar"));
        assert!(crt_in_use(existing.iter().copied(), "uy\t77"));
        assert!(!crt_in_use(existing.iter().copied(), "BR1234"));
    }

    #[test]
    fn test_crt_number_is_required() {
        assert!(validate_crt_number("  \t ").is_err());
        assert_eq!(validate_crt_number(" ar 9 ").unwrap(), "AR9");
    }
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    /// Normalization is idempotent and strips all whitespace
    #[test]
    fn prop_normalize_is_idempotent(raw in "[a-zA-Z0-9 \t]{0,30}") {
        let once = normalize_crt(&raw);
        prop_assert_eq!(normalize_crt(&once), once.clone());
        prop_assert!(!once.chars().any(char::is_whitespace));
    }

    /// A CRT is always in use against its own spaced, lower-cased variant
    #[test]
    fn prop_spaced_variant_is_detected(crt in "[A-Z]{2}[0-9]{1,8}") {
        let variant = crt
            .chars()
            .flat_map(|c| [c.to_ascii_lowercase(), ' '])
            .collect::<String>();
        prop_assert!(crt_in_use([crt.as_str()], &variant));
    }

    /// Any submission within the limits with complete rolls is accepted
    #[test]
    fn prop_complete_submissions_within_limits_pass(
        invoices in 1usize..=MAX_INVOICES_PER_INTAKE,
        rolls in 1usize..=MAX_ROLLS_PER_INTAKE,
    ) {
        prop_assert!(validate_intake(&intake(invoices, rolls)).is_ok());
    }
}
