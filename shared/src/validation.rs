//! Validation rules for the Bobina Tracker
//!
//! Every rule here runs before any write, both in the backend and in the
//! browser through the WASM bindings.

use std::collections::HashSet;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::RollPatch;
use crate::types::Language;

/// Maximum invoices per intake session
pub const MAX_INVOICES_PER_INTAKE: usize = 50;

/// Maximum rolls per intake session
pub const MAX_ROLLS_PER_INTAKE: usize = 300;

/// Maximum destinations (trucks) per order
pub const MAX_DESTINATIONS: usize = 4;

/// Width of the invoice number column
pub const MAX_INVOICE_NUMBER_LEN: usize = 60;

/// Widths of the editable roll text columns: field, English label,
/// Portuguese label, maximum characters
const ROLL_FIELD_WIDTHS: [(&str, &str, &str, usize); 11] = [
    ("roll_number", "Roll number", "Número da bobina", 60),
    ("purchase_order", "Purchase order", "Pedido de compra", 60),
    ("sales_order", "Sales order", "Ordem de venda", 60),
    ("paper_type", "Paper type", "Tipo de papel", 120),
    ("format", "Format", "Formato", 60),
    ("origin", "Origin", "Origem", 120),
    ("exporter", "Exporter", "Exportador", 200),
    ("importer", "Importer", "Importador", 200),
    ("street", "Street", "Rua", 20),
    ("block", "Block", "Quadra", 20),
    ("row", "Row", "Fila", 20),
];

/// Heaviest roll the weight column holds
pub fn max_weight_kg() -> Decimal {
    Decimal::new(999_999_999_999, 2)
}

/// Largest invoice value the value column holds
pub fn max_invoice_value() -> Decimal {
    Decimal::new(99_999_999_999_999, 2)
}

/// A rejected input, with operator-facing messages in both languages
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("{field}: {message_en}")]
pub struct ValidationIssue {
    pub field: String,
    pub message_en: String,
    pub message_pt: String,
}

impl ValidationIssue {
    pub fn new(
        field: impl Into<String>,
        message_en: impl Into<String>,
        message_pt: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            message_en: message_en.into(),
            message_pt: message_pt.into(),
        }
    }

    pub fn message(&self, language: &Language) -> &str {
        match language {
            Language::Portuguese => &self.message_pt,
            Language::English => &self.message_en,
        }
    }
}

// ============================================================================
// CRT rules
// ============================================================================

/// Canonical form of a CRT number: no whitespace anywhere, upper case
pub fn normalize_crt(crt: &str) -> String {
    crt.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_uppercase)
        .collect()
}

/// Whether `candidate` matches any CRT already in use
pub fn crt_in_use<'a>(existing: impl IntoIterator<Item = &'a str>, candidate: &str) -> bool {
    let candidate = normalize_crt(candidate);
    existing.into_iter().any(|crt| normalize_crt(crt) == candidate)
}

pub fn validate_crt_number(crt: &str) -> Result<String, ValidationIssue> {
    let normalized = normalize_crt(crt);
    if normalized.is_empty() {
        return Err(ValidationIssue::new(
            "crt_number",
            "CRT number is required",
            "Informe o número do CRT",
        ));
    }
    if normalized.len() > 40 {
        return Err(ValidationIssue::new(
            "crt_number",
            "CRT number must be at most 40 characters",
            "O número do CRT deve ter no máximo 40 caracteres",
        ));
    }
    Ok(normalized)
}

// ============================================================================
// Intake rules
// ============================================================================

/// Invoice entered during intake
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct IntakeInvoice {
    pub number: String,
    pub value: Option<Decimal>,
}

/// Roll entered during intake, tagged to one of the session's invoices
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct IntakeRoll {
    pub roll_number: String,
    /// Index into [`IntakeInput::invoices`]
    pub invoice_index: usize,
    pub purchase_order: Option<String>,
    pub sales_order: Option<String>,
    pub paper_type: String,
    pub grammage: Option<i32>,
    pub format: String,
    pub weight_kg: Option<Decimal>,
    pub origin: Option<String>,
    pub exporter: Option<String>,
    pub importer: Option<String>,
    pub street: Option<String>,
    pub block: Option<String>,
    pub row: Option<String>,
}

/// A complete intake submission
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct IntakeInput {
    pub crt_number: String,
    pub invoices: Vec<IntakeInvoice>,
    pub rolls: Vec<IntakeRoll>,
}

/// Validate an intake submission, without the store-side uniqueness check
pub fn validate_intake(input: &IntakeInput) -> Result<(), ValidationIssue> {
    validate_crt_number(&input.crt_number)?;

    if input.invoices.is_empty() {
        return Err(ValidationIssue::new(
            "invoices",
            "At least one invoice is required",
            "Informe ao menos uma nota fiscal",
        ));
    }
    if input.invoices.len() > MAX_INVOICES_PER_INTAKE {
        return Err(ValidationIssue::new(
            "invoices",
            format!("At most {} invoices per intake", MAX_INVOICES_PER_INTAKE),
            format!("Máximo de {} notas fiscais por cadastro", MAX_INVOICES_PER_INTAKE),
        ));
    }
    for (i, invoice) in input.invoices.iter().enumerate() {
        let number = invoice.number.trim();
        if number.is_empty() {
            return Err(ValidationIssue::new(
                format!("invoices[{}].number", i),
                format!("Invoice {} has no number", i + 1),
                format!("A nota fiscal {} está sem número", i + 1),
            ));
        }
        if number.chars().count() > MAX_INVOICE_NUMBER_LEN {
            return Err(ValidationIssue::new(
                format!("invoices[{}].number", i),
                format!(
                    "Invoice {} number must be at most {} characters",
                    i + 1,
                    MAX_INVOICE_NUMBER_LEN
                ),
                format!(
                    "O número da nota fiscal {} deve ter no máximo {} caracteres",
                    i + 1,
                    MAX_INVOICE_NUMBER_LEN
                ),
            ));
        }
        if matches!(invoice.value, Some(v) if v < Decimal::ZERO || v > max_invoice_value()) {
            return Err(ValidationIssue::new(
                format!("invoices[{}].value", i),
                format!("Invoice {} value is out of range", i + 1),
                format!("O valor da nota fiscal {} está fora do limite", i + 1),
            ));
        }
    }

    if input.rolls.is_empty() {
        return Err(ValidationIssue::new(
            "rolls",
            "At least one roll is required",
            "Informe ao menos uma bobina",
        ));
    }
    if input.rolls.len() > MAX_ROLLS_PER_INTAKE {
        return Err(ValidationIssue::new(
            "rolls",
            format!("At most {} rolls per intake", MAX_ROLLS_PER_INTAKE),
            format!("Máximo de {} bobinas por cadastro", MAX_ROLLS_PER_INTAKE),
        ));
    }

    let mut seen = HashSet::new();
    for (i, roll) in input.rolls.iter().enumerate() {
        validate_intake_roll(i, roll, input.invoices.len())?;
        if !seen.insert(roll.roll_number.trim().to_uppercase()) {
            return Err(ValidationIssue::new(
                format!("rolls[{}].roll_number", i),
                format!("Roll number {} is repeated", roll.roll_number.trim()),
                format!("O número de bobina {} está repetido", roll.roll_number.trim()),
            ));
        }
    }

    Ok(())
}

fn validate_intake_roll(
    i: usize,
    roll: &IntakeRoll,
    invoice_count: usize,
) -> Result<(), ValidationIssue> {
    let missing = |field: &str, label_en: &str, label_pt: &str| {
        ValidationIssue::new(
            format!("rolls[{}].{}", i, field),
            format!("Roll {} is missing {}", i + 1, label_en),
            format!("A bobina {} está sem {}", i + 1, label_pt),
        )
    };

    if roll.roll_number.trim().is_empty() {
        return Err(missing("roll_number", "its number", "número"));
    }
    if roll.paper_type.trim().is_empty() {
        return Err(missing("paper_type", "a paper type", "tipo de papel"));
    }
    if !matches!(roll.grammage, Some(g) if g > 0) {
        return Err(missing("grammage", "a grammage", "gramatura"));
    }
    if roll.format.trim().is_empty() {
        return Err(missing("format", "a format", "formato"));
    }
    if !matches!(roll.weight_kg, Some(w) if w > Decimal::ZERO) {
        return Err(missing("weight_kg", "a weight", "peso"));
    }
    if matches!(roll.weight_kg, Some(w) if w > max_weight_kg()) {
        return Err(weight_too_large(format!("rolls[{}].weight_kg", i)));
    }
    check_widths(
        &format!("rolls[{}].", i),
        [
            Some(roll.roll_number.as_str()),
            roll.purchase_order.as_deref(),
            roll.sales_order.as_deref(),
            Some(roll.paper_type.as_str()),
            Some(roll.format.as_str()),
            roll.origin.as_deref(),
            roll.exporter.as_deref(),
            roll.importer.as_deref(),
            roll.street.as_deref(),
            roll.block.as_deref(),
            roll.row.as_deref(),
        ],
    )?;
    if roll.invoice_index >= invoice_count {
        return Err(ValidationIssue::new(
            format!("rolls[{}].invoice_index", i),
            format!("Roll {} references an unknown invoice", i + 1),
            format!("A bobina {} referencia uma nota fiscal inexistente", i + 1),
        ));
    }
    Ok(())
}

/// Check roll text values, given in [`ROLL_FIELD_WIDTHS`] order, against
/// their column widths
fn check_widths(prefix: &str, values: [Option<&str>; 11]) -> Result<(), ValidationIssue> {
    for ((field, label_en, label_pt, max), value) in ROLL_FIELD_WIDTHS.iter().zip(values) {
        if matches!(value, Some(v) if v.trim().chars().count() > *max) {
            return Err(ValidationIssue::new(
                format!("{}{}", prefix, field),
                format!("{} must be at most {} characters", label_en, max),
                format!("{} deve ter no máximo {} caracteres", label_pt, max),
            ));
        }
    }
    Ok(())
}

fn weight_too_large(field: String) -> ValidationIssue {
    ValidationIssue::new(
        field,
        format!("Weight must be at most {} kg", max_weight_kg()),
        format!("O peso deve ser de no máximo {} kg", max_weight_kg()),
    )
}

// ============================================================================
// Edit and cancellation rules
// ============================================================================

/// Justifications must contain something other than whitespace
pub fn validate_justification(justification: &str) -> Result<String, ValidationIssue> {
    let trimmed = justification.trim();
    if trimmed.is_empty() {
        return Err(ValidationIssue::new(
            "justification",
            "A justification is required",
            "Informe uma justificativa",
        ));
    }
    Ok(trimmed.to_string())
}

/// Required roll fields may not be blanked and numbers must stay positive
pub fn validate_roll_patch(patch: &RollPatch) -> Result<(), ValidationIssue> {
    let required = [
        ("roll_number", &patch.roll_number, "Roll number", "Número da bobina"),
        ("paper_type", &patch.paper_type, "Paper type", "Tipo de papel"),
        ("format", &patch.format, "Format", "Formato"),
    ];
    for (field, value, label_en, label_pt) in required {
        if matches!(value, Some(v) if v.trim().is_empty()) {
            return Err(ValidationIssue::new(
                field,
                format!("{} cannot be empty", label_en),
                format!("{} não pode ficar vazio", label_pt),
            ));
        }
    }
    if matches!(patch.grammage, Some(g) if g <= 0) {
        return Err(ValidationIssue::new(
            "grammage",
            "Grammage must be positive",
            "A gramatura deve ser positiva",
        ));
    }
    if matches!(patch.weight_kg, Some(w) if w <= Decimal::ZERO) {
        return Err(ValidationIssue::new(
            "weight_kg",
            "Weight must be positive",
            "O peso deve ser positivo",
        ));
    }
    if matches!(patch.weight_kg, Some(w) if w > max_weight_kg()) {
        return Err(weight_too_large("weight_kg".to_string()));
    }
    check_widths(
        "",
        [
            patch.roll_number.as_deref(),
            patch.purchase_order.as_deref(),
            patch.sales_order.as_deref(),
            patch.paper_type.as_deref(),
            patch.format.as_deref(),
            patch.origin.as_deref(),
            patch.exporter.as_deref(),
            patch.importer.as_deref(),
            patch.street.as_deref(),
            patch.block.as_deref(),
            patch.row.as_deref(),
        ],
    )
}

/// Each roll may appear once per edit request
pub fn validate_unique_roll_ids(ids: impl IntoIterator<Item = Uuid>) -> Result<(), ValidationIssue> {
    let mut seen = HashSet::new();
    for (i, id) in ids.into_iter().enumerate() {
        if !seen.insert(id) {
            return Err(ValidationIssue::new(
                format!("rolls[{}].roll_id", i),
                format!("Roll {} is edited more than once", id),
                format!("A bobina {} foi editada mais de uma vez", id),
            ));
        }
    }
    Ok(())
}

/// Trim destinations and check there are between one and four
pub fn validate_destinations(destinations: &[String]) -> Result<Vec<String>, ValidationIssue> {
    let cleaned: Vec<String> = destinations
        .iter()
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty())
        .collect();

    if cleaned.is_empty() {
        return Err(ValidationIssue::new(
            "destinations",
            "At least one destination is required",
            "Informe ao menos um destino",
        ));
    }
    if cleaned.len() > MAX_DESTINATIONS {
        return Err(ValidationIssue::new(
            "destinations",
            format!("At most {} destinations per order", MAX_DESTINATIONS),
            format!("Máximo de {} destinos por pedido", MAX_DESTINATIONS),
        ));
    }
    Ok(cleaned)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roll(number: &str) -> IntakeRoll {
        IntakeRoll {
            roll_number: number.to_string(),
            invoice_index: 0,
            paper_type: "Kraft".to_string(),
            grammage: Some(80),
            format: "1600".to_string(),
            weight_kg: Some(Decimal::from(1200)),
            ..Default::default()
        }
    }

    fn input() -> IntakeInput {
        IntakeInput {
            crt_number: "br 123 ar".to_string(),
            invoices: vec![IntakeInvoice {
                number: "4501".to_string(),
                value: None,
            }],
            rolls: vec![roll("B1"), roll("B2")],
        }
    }

    #[test]
    fn test_normalize_crt() {
        assert_eq!(normalize_crt("  br 123\tar "), "BR123AR");
        assert_eq!(normalize_crt("BR123AR"), "BR123AR");
    }

    #[test]
    fn test_crt_in_use_ignores_case_and_whitespace() {
        let existing = ["BR123AR", "BR999"];
        assert!(crt_in_use(existing, " br123ar"));
        assert!(crt_in_use(existing, "BR 999"));
        assert!(!crt_in_use(existing, "BR124"));
    }

    #[test]
    fn test_valid_intake() {
        assert!(validate_intake(&input()).is_ok());
    }

    #[test]
    fn test_intake_rejects_blank_invoice_number() {
        let mut input = input();
        input.invoices.push(IntakeInvoice {
            number: "   ".to_string(),
            value: None,
        });
        let issue = validate_intake(&input).unwrap_err();
        assert_eq!(issue.field, "invoices[1].number");
    }

    #[test]
    fn test_intake_rejects_missing_roll_fields() {
        let cases: Vec<(Box<dyn Fn(&mut IntakeRoll)>, &str)> = vec![
            (Box::new(|r: &mut IntakeRoll| r.roll_number.clear()), "rolls[0].roll_number"),
            (Box::new(|r: &mut IntakeRoll| r.paper_type = " ".to_string()), "rolls[0].paper_type"),
            (Box::new(|r: &mut IntakeRoll| r.grammage = None), "rolls[0].grammage"),
            (Box::new(|r: &mut IntakeRoll| r.format.clear()), "rolls[0].format"),
            (Box::new(|r: &mut IntakeRoll| r.weight_kg = None), "rolls[0].weight_kg"),
            (Box::new(|r: &mut IntakeRoll| r.weight_kg = Some(Decimal::ZERO)), "rolls[0].weight_kg"),
            (Box::new(|r: &mut IntakeRoll| r.invoice_index = 3), "rolls[0].invoice_index"),
        ];
        for (mutate, field) in cases {
            let mut input = input();
            mutate(&mut input.rolls[0]);
            assert_eq!(validate_intake(&input).unwrap_err().field, field);
        }
    }

    #[test]
    fn test_intake_limits() {
        let mut input = input();
        input.invoices = vec![
            IntakeInvoice {
                number: "1".to_string(),
                value: None
            };
            MAX_INVOICES_PER_INTAKE + 1
        ];
        assert_eq!(validate_intake(&input).unwrap_err().field, "invoices");

        let mut input = self::input();
        input.rolls = (0..=MAX_ROLLS_PER_INTAKE).map(|i| roll(&format!("B{}", i))).collect();
        assert_eq!(validate_intake(&input).unwrap_err().field, "rolls");

        let mut input = self::input();
        input.rolls[0].street = Some("x".repeat(21));
        assert_eq!(validate_intake(&input).unwrap_err().field, "rolls[0].street");
    }

    #[test]
    fn test_patch_widths_and_weight_ceiling() {
        let long = RollPatch {
            exporter: Some("e".repeat(201)),
            ..Default::default()
        };
        assert_eq!(validate_roll_patch(&long).unwrap_err().field, "exporter");
        let heavy = RollPatch {
            weight_kg: Some(max_weight_kg() + Decimal::ONE),
            ..Default::default()
        };
        assert_eq!(validate_roll_patch(&heavy).unwrap_err().field, "weight_kg");
        let fits = RollPatch {
            paper_type: Some("p".repeat(120)),
            weight_kg: Some(max_weight_kg()),
            ..Default::default()
        };
        assert!(validate_roll_patch(&fits).is_ok());
    }

    #[test]
    fn test_repeated_roll_ids() {
        let a = Uuid::from_u128(1);
        let b = Uuid::from_u128(2);
        assert!(validate_unique_roll_ids([a, b]).is_ok());
        assert_eq!(validate_unique_roll_ids([a, b, a]).unwrap_err().field, "rolls[2].roll_id");
    }

    #[test]
    fn test_intake_rejects_repeated_roll_numbers() {
        let mut input = input();
        input.rolls.push(roll(" b1 "));
        assert_eq!(validate_intake(&input).unwrap_err().field, "rolls[2].roll_number");
    }

    #[test]
    fn test_justification() {
        assert!(validate_justification("").is_err());
        assert!(validate_justification(" \n ").is_err());
        assert_eq!(validate_justification(" typo ").unwrap(), "typo");
    }

    #[test]
    fn test_destinations() {
        let ok = validate_destinations(&[" Buenos Aires ".to_string(), "".to_string()]).unwrap();
        assert_eq!(ok, vec!["Buenos Aires".to_string()]);
        assert!(validate_destinations(&[]).is_err());
        let five: Vec<String> = (0..5).map(|i| format!("D{}", i)).collect();
        assert!(validate_destinations(&five).is_err());
    }

    #[test]
    fn test_roll_patch_rules() {
        assert!(validate_roll_patch(&RollPatch::default()).is_ok());
        let blank = RollPatch {
            paper_type: Some("".to_string()),
            ..Default::default()
        };
        assert_eq!(validate_roll_patch(&blank).unwrap_err().field, "paper_type");
        let negative = RollPatch {
            weight_kg: Some(Decimal::from(-1)),
            ..Default::default()
        };
        assert_eq!(validate_roll_patch(&negative).unwrap_err().field, "weight_kg");
    }

    #[test]
    fn test_issue_message_language() {
        let issue = validate_justification("").unwrap_err();
        assert_eq!(issue.message(&Language::English), "A justification is required");
        assert_eq!(issue.message(&Language::Portuguese), "Informe uma justificativa");
    }
}
