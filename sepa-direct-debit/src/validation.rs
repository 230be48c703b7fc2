//! Field validation for direct debit messages
//!
//! Every check returns its finding instead of failing fast, so a single
//! submission yields one [`ValidationReport`] listing all problems.
//!
//! Text fields are limited to the SEPA basic Latin subset
//! `A-Z a-z 0-9 + ? / - : ( ) . , '` and space.

use crate::types::{Amount, MessageHeader, SequenceType, Transaction, TransactionRequest};
use lazy_static::lazy_static;
use regex::Regex;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use std::fmt;

lazy_static! {
    static ref SEPA_TEXT: Regex =
        Regex::new(r"^[A-Za-z0-9+?/\-:().,' ]+$").expect("SEPA text pattern is valid");
    static ref SEPA_TEXT_NO_SPACE: Regex =
        Regex::new(r"^[A-Za-z0-9+?/\-:().,']+$").expect("SEPA identifier pattern is valid");
}

/// Smallest accepted amount (0.01)
pub const MIN_AMOUNT: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// Largest accepted amount (999 999 999.99)
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(1_215_752_191, 23, 0, false, 2);

/// Field a validation issue refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    /// Message identifier
    MessageId,
    /// Document currency
    Currency,
    /// Creditor IBAN
    CreditorIban,
    /// Transaction end-to-end identifier
    EndToEndId,
    /// Debtor IBAN
    DebtorIban,
    /// Debtor name
    DebtorName,
    /// Mandate identifier
    MandateId,
    /// Transaction amount
    Amount,
    /// Remittance text
    Remittance,
    /// Sequence type
    SequenceType,
    /// Ultimate debtor name
    UltimateDebtor,
}

impl Field {
    /// Field name used in reports
    pub fn as_str(&self) -> &'static str {
        match self {
            Field::MessageId => "message_id",
            Field::Currency => "currency",
            Field::CreditorIban => "creditor_iban",
            Field::EndToEndId => "end_to_end_id",
            Field::DebtorIban => "debtor_iban",
            Field::DebtorName => "debtor_name",
            Field::MandateId => "mandate_id",
            Field::Amount => "amount",
            Field::Remittance => "remittance",
            Field::SequenceType => "sequence_type",
            Field::UltimateDebtor => "ultimate_debtor",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of rule that was violated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IssueCode {
    /// Empty or longer than allowed
    InvalidLength,
    /// Character outside the allowed set
    InvalidCharacter,
    /// Numeric value outside the allowed range
    OutOfRange,
    /// Value not in the list of known codes
    UnknownCode,
    /// Running control sum would overflow
    Overflow,
}

/// Validation error detail
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    /// Offending field
    pub field: Field,
    /// Violated rule
    pub code: IssueCode,
    /// Human-readable reason
    pub message: String,
}

impl ValidationIssue {
    /// Create an issue
    pub fn new(field: Field, code: IssueCode, message: impl Into<String>) -> Self {
        Self {
            field,
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// All issues found for one submission
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    /// Empty report
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an issue
    pub fn push(&mut self, issue: ValidationIssue) {
        self.issues.push(issue);
    }

    /// Keep the value of a check, recording its issue on failure
    pub fn check<T>(&mut self, result: Result<T, ValidationIssue>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(issue) => {
                self.push(issue);
                None
            }
        }
    }

    /// No issues recorded
    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    /// Number of issues
    pub fn len(&self) -> usize {
        self.issues.len()
    }

    /// Recorded issues in check order
    pub fn issues(&self) -> &[ValidationIssue] {
        &self.issues
    }

    /// Whether any issue refers to `field`
    pub fn contains(&self, field: Field) -> bool {
        self.issues.iter().any(|issue| issue.field == field)
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, issue) in self.issues.iter().enumerate() {
            if idx > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{}", issue)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationReport {}

/// Length and charset limits of a text field
#[derive(Debug, Clone, Copy)]
pub struct TextRule {
    /// Maximum number of characters
    pub max_len: usize,
    /// Whether the space character is allowed
    pub allow_space: bool,
}

/// Message identifier: 35 minus the `-XXXX` payment information suffix
pub const MESSAGE_ID: TextRule = TextRule { max_len: 29, allow_space: true };
/// End-to-end identifier
pub const END_TO_END_ID: TextRule = TextRule { max_len: 35, allow_space: true };
/// Mandate identifier
pub const MANDATE_ID: TextRule = TextRule { max_len: 35, allow_space: false };
/// Unstructured remittance text
pub const REMITTANCE: TextRule = TextRule { max_len: 140, allow_space: true };
/// Party names
pub const NAME: TextRule = TextRule { max_len: 70, allow_space: true };

/// Check a text field against a rule
pub fn validate_text(field: Field, value: &str, rule: TextRule) -> Result<String, ValidationIssue> {
    let len = value.chars().count();
    if len == 0 || len > rule.max_len {
        return Err(ValidationIssue::new(
            field,
            IssueCode::InvalidLength,
            format!("must be 1-{} characters, got {}", rule.max_len, len),
        ));
    }

    let charset = if rule.allow_space { &*SEPA_TEXT } else { &*SEPA_TEXT_NO_SPACE };
    if !charset.is_match(value) {
        let offending: String = value
            .chars()
            .filter(|c| !charset.is_match(c.encode_utf8(&mut [0u8; 4])))
            .collect();
        return Err(ValidationIssue::new(
            field,
            IssueCode::InvalidCharacter,
            format!("contains characters outside the SEPA character set: {:?}", offending),
        ));
    }

    Ok(value.to_string())
}

/// Message identifier, 1-29 characters
pub fn validate_message_id(value: &str) -> Result<String, ValidationIssue> {
    validate_text(Field::MessageId, value, MESSAGE_ID)
}

/// End-to-end identifier, 1-35 characters
pub fn validate_end_to_end_id(value: &str) -> Result<String, ValidationIssue> {
    validate_text(Field::EndToEndId, value, END_TO_END_ID)
}

/// Mandate identifier, 1-35 characters, no space
pub fn validate_mandate_id(value: &str) -> Result<String, ValidationIssue> {
    validate_text(Field::MandateId, value, MANDATE_ID)
}

/// Remittance text, 1-140 characters
pub fn validate_remittance(value: &str) -> Result<String, ValidationIssue> {
    validate_text(Field::Remittance, value, REMITTANCE)
}

/// Debtor or ultimate debtor name, 1-70 characters
pub fn validate_name(field: Field, value: &str) -> Result<String, ValidationIssue> {
    validate_text(field, value, NAME)
}

/// Convert a decimal amount to minor units.
///
/// Accepts [`MIN_AMOUNT`]..=[`MAX_AMOUNT`]; a third fractional digit is
/// rounded half away from zero.
pub fn validate_amount(amount: Decimal) -> Result<Amount, ValidationIssue> {
    if amount < MIN_AMOUNT || amount > MAX_AMOUNT {
        return Err(ValidationIssue::new(
            Field::Amount,
            IssueCode::OutOfRange,
            format!("must be between {} and {}, got {}", MIN_AMOUNT, MAX_AMOUNT, amount),
        ));
    }

    (amount * Decimal::ONE_HUNDRED)
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_u64()
        .map(Amount::from_minor_units)
        .ok_or_else(|| {
            ValidationIssue::new(Field::Amount, IssueCode::OutOfRange, format!("cannot represent {}", amount))
        })
}

/// Sequence type code
pub fn validate_sequence_type(value: &str) -> Result<SequenceType, ValidationIssue> {
    value
        .parse()
        .map_err(|reason: String| ValidationIssue::new(Field::SequenceType, IssueCode::UnknownCode, reason))
}

/// Non-empty IBAN, upper-cased with all whitespace removed.
///
/// Accepts the grouped print form (`de89 3704 0044 ...`). No checksum or
/// country-length check is applied.
pub fn normalize_iban(field: Field, value: &str) -> Result<String, ValidationIssue> {
    let iban: String = value
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_uppercase();
    if iban.is_empty() {
        return Err(ValidationIssue::new(field, IssueCode::InvalidLength, "IBAN is missing"));
    }
    Ok(iban)
}

/// Upper-cased BIC; blank values count as absent
pub fn normalize_bic(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|bic| !bic.is_empty())
        .map(str::to_uppercase)
}

/// ISO 4217 alphabetic code
pub fn validate_currency(value: &str) -> Result<String, ValidationIssue> {
    if value.len() == 3 && value.chars().all(|c| c.is_ascii_uppercase()) {
        Ok(value.to_string())
    } else {
        Err(ValidationIssue::new(
            Field::Currency,
            IssueCode::UnknownCode,
            format!("must be three upper-case letters, got '{}'", value),
        ))
    }
}

/// Validate a message header, returning it with IBAN/BIC normalized
pub fn validate_header(header: &MessageHeader) -> Result<MessageHeader, ValidationReport> {
    let mut report = ValidationReport::new();

    let message_id = report.check(validate_message_id(&header.message_id));
    let currency = report.check(validate_currency(&header.currency));
    let creditor_iban = report.check(normalize_iban(Field::CreditorIban, &header.creditor.iban));
    let creditor_bic = normalize_bic(header.creditor.bic.as_deref());

    match (message_id, currency, creditor_iban) {
        (Some(message_id), Some(currency), Some(creditor_iban)) if report.is_empty() => {
            let mut normalized = header.clone();
            normalized.message_id = message_id;
            normalized.currency = currency;
            normalized.creditor.iban = creditor_iban;
            normalized.creditor.bic = creditor_bic;
            Ok(normalized)
        }
        _ => Err(report),
    }
}

/// Run every field rule over a request.
///
/// Either all fields pass and the validated [`Transaction`] is returned, or
/// the report lists every failing field.
pub fn validate_transaction(request: &TransactionRequest) -> Result<Transaction, ValidationReport> {
    let mut report = ValidationReport::new();

    let end_to_end_id = report.check(validate_end_to_end_id(&request.end_to_end_id));
    let debtor_iban = report.check(normalize_iban(Field::DebtorIban, &request.debtor_iban));
    let debtor_bic = normalize_bic(request.debtor_bic.as_deref());
    let mandate_id = report.check(validate_mandate_id(&request.mandate_id));
    let remittance = report.check(validate_remittance(&request.remittance));
    let debtor_name = report.check(validate_name(Field::DebtorName, &request.debtor_name));
    let ultimate_debtor = match request.ultimate_debtor.as_deref() {
        Some(name) => report.check(validate_name(Field::UltimateDebtor, name)).map(Some),
        None => Some(None),
    };
    let amount = report.check(validate_amount(request.amount));
    let sequence_type = report.check(validate_sequence_type(&request.sequence_type));

    match (
        end_to_end_id,
        debtor_iban,
        mandate_id,
        remittance,
        debtor_name,
        ultimate_debtor,
        amount,
        sequence_type,
    ) {
        (
            Some(end_to_end_id),
            Some(debtor_iban),
            Some(mandate_id),
            Some(remittance),
            Some(debtor_name),
            Some(ultimate_debtor),
            Some(amount),
            Some(sequence_type),
        ) => Ok(Transaction {
            end_to_end_id,
            debtor_iban,
            debtor_bic,
            debtor_name,
            mandate_id,
            mandate_signed_on: request.mandate_signed_on,
            amount,
            remittance,
            sequence_type,
            ultimate_debtor,
        }),
        _ => Err(report),
    }
}
