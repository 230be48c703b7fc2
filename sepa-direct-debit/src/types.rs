//! Core types for direct debit messages

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Position of a debit within the lifecycle of its mandate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SequenceType {
    /// First collection of a recurring mandate
    #[serde(rename = "FRST")]
    First,
    /// Follow-up collection of a recurring mandate
    #[serde(rename = "RCUR")]
    Recurring,
    /// Single collection under a one-off mandate
    #[serde(rename = "OOFF")]
    OneOff,
    /// Last collection of a recurring mandate
    #[serde(rename = "FNAL")]
    Final,
}

impl SequenceType {
    /// All sequence types
    pub const ALL: [SequenceType; 4] = [
        SequenceType::First,
        SequenceType::Recurring,
        SequenceType::OneOff,
        SequenceType::Final,
    ];

    /// ISO 20022 `SeqTp` code
    pub fn code(&self) -> &'static str {
        match self {
            SequenceType::First => "FRST",
            SequenceType::Recurring => "RCUR",
            SequenceType::OneOff => "OOFF",
            SequenceType::Final => "FNAL",
        }
    }
}

impl FromStr for SequenceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SequenceType::ALL
            .into_iter()
            .find(|seq| seq.code() == s)
            .ok_or_else(|| format!("unknown sequence type '{}', expected one of FRST, RCUR, OOFF, FNAL", s))
    }
}

impl fmt::Display for SequenceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// SEPA direct debit scheme (`LclInstrm/Cd`)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LocalInstrument {
    /// SEPA Core direct debit
    #[default]
    #[serde(rename = "CORE")]
    Core,
    /// SEPA business-to-business direct debit
    #[serde(rename = "B2B")]
    B2b,
    /// SEPA Core with one-day presentation
    #[serde(rename = "COR1")]
    Cor1,
}

impl LocalInstrument {
    /// ISO 20022 code
    pub fn code(&self) -> &'static str {
        match self {
            LocalInstrument::Core => "CORE",
            LocalInstrument::B2b => "B2B",
            LocalInstrument::Cor1 => "COR1",
        }
    }
}

impl FromStr for LocalInstrument {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CORE" => Ok(LocalInstrument::Core),
            "B2B" => Ok(LocalInstrument::B2b),
            "COR1" => Ok(LocalInstrument::Cor1),
            other => Err(format!("unknown local instrument '{}', expected CORE, B2B or COR1", other)),
        }
    }
}

impl fmt::Display for LocalInstrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Monetary amount in minor currency units (cents)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Amount(u64);

impl Amount {
    /// Zero
    pub const ZERO: Amount = Amount(0);

    /// Wrap a minor-unit count
    pub const fn from_minor_units(minor_units: u64) -> Self {
        Self(minor_units)
    }

    /// Minor-unit count
    pub const fn minor_units(&self) -> u64 {
        self.0
    }

    /// Add, returning `None` on overflow
    pub fn checked_add(self, other: Amount) -> Option<Amount> {
        self.0.checked_add(other.0).map(Amount)
    }

    /// Exact decimal value (two fractional digits)
    pub fn to_decimal(&self) -> Decimal {
        Decimal::from(self.0) / Decimal::ONE_HUNDRED
    }
}

/// `<integer part>.<two-digit fraction>`, e.g. `1234` → `12.34`
impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

/// Creditor collecting the debits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Creditor {
    /// Account holder name
    pub name: String,

    /// Account IBAN
    pub iban: String,

    /// Bank BIC
    pub bic: Option<String>,

    /// Creditor scheme identifier (Gläubiger-ID)
    pub scheme_id: String,
}

impl Creditor {
    /// Create a creditor
    pub fn new(
        name: impl Into<String>,
        iban: impl Into<String>,
        bic: Option<String>,
        scheme_id: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            iban: iban.into(),
            bic,
            scheme_id: scheme_id.into(),
        }
    }
}

/// Document-level data, fixed for the lifetime of a message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageHeader {
    /// Message identifier, also the prefix of every `PmtInfId`
    pub message_id: String,

    /// Initiating party name
    pub initiating_party: String,

    /// Requested collection date
    pub collection_date: NaiveDate,

    /// Creditor
    pub creditor: Creditor,

    /// ISO 4217 currency code
    pub currency: String,

    /// Direct debit scheme
    pub local_instrument: LocalInstrument,

    /// Batch booking request; `None` leaves the element out
    pub batch_booking: Option<bool>,
}

impl MessageHeader {
    /// Create a header with EUR, CORE and no batch booking preference
    pub fn new(
        message_id: impl Into<String>,
        initiating_party: impl Into<String>,
        collection_date: NaiveDate,
        creditor: Creditor,
    ) -> Self {
        Self {
            message_id: message_id.into(),
            initiating_party: initiating_party.into(),
            collection_date,
            creditor,
            currency: "EUR".to_string(),
            local_instrument: LocalInstrument::Core,
            batch_booking: None,
        }
    }

    /// Set the currency
    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = currency.into();
        self
    }

    /// Set the direct debit scheme
    pub fn with_local_instrument(mut self, local_instrument: LocalInstrument) -> Self {
        self.local_instrument = local_instrument;
        self
    }

    /// Request (or refuse) batch booking
    pub fn with_batch_booking(mut self, batch_booking: bool) -> Self {
        self.batch_booking = Some(batch_booking);
        self
    }
}

/// Raw debit instruction as submitted by the caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRequest {
    /// End-to-end identifier
    pub end_to_end_id: String,

    /// Debtor IBAN
    pub debtor_iban: String,

    /// Debtor bank BIC
    #[serde(default)]
    pub debtor_bic: Option<String>,

    /// Debtor account holder name
    pub debtor_name: String,

    /// Mandate identifier
    pub mandate_id: String,

    /// Date the mandate was signed
    pub mandate_signed_on: NaiveDate,

    /// Amount in currency units, at most two fractional digits are kept
    pub amount: Decimal,

    /// Unstructured remittance text
    pub remittance: String,

    /// Sequence type code (`FRST`, `RCUR`, `OOFF`, `FNAL`)
    pub sequence_type: String,

    /// Economic payer, when different from the account holder
    #[serde(default)]
    pub ultimate_debtor: Option<String>,
}

/// Validated debit, immutable once accepted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub(crate) end_to_end_id: String,
    pub(crate) debtor_iban: String,
    pub(crate) debtor_bic: Option<String>,
    pub(crate) debtor_name: String,
    pub(crate) mandate_id: String,
    pub(crate) mandate_signed_on: NaiveDate,
    pub(crate) amount: Amount,
    pub(crate) remittance: String,
    pub(crate) sequence_type: SequenceType,
    pub(crate) ultimate_debtor: Option<String>,
}

impl Transaction {
    /// End-to-end identifier
    pub fn end_to_end_id(&self) -> &str {
        &self.end_to_end_id
    }

    /// Debtor IBAN, upper case
    pub fn debtor_iban(&self) -> &str {
        &self.debtor_iban
    }

    /// Debtor BIC, upper case
    pub fn debtor_bic(&self) -> Option<&str> {
        self.debtor_bic.as_deref()
    }

    /// Debtor name
    pub fn debtor_name(&self) -> &str {
        &self.debtor_name
    }

    /// Mandate identifier
    pub fn mandate_id(&self) -> &str {
        &self.mandate_id
    }

    /// Mandate signature date
    pub fn mandate_signed_on(&self) -> NaiveDate {
        self.mandate_signed_on
    }

    /// Amount in minor units
    pub fn amount(&self) -> Amount {
        self.amount
    }

    /// Remittance text
    pub fn remittance(&self) -> &str {
        &self.remittance
    }

    /// Sequence type
    pub fn sequence_type(&self) -> SequenceType {
        self.sequence_type
    }

    /// Ultimate debtor name
    pub fn ultimate_debtor(&self) -> Option<&str> {
        self.ultimate_debtor.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequence_type_codes() {
        for seq in SequenceType::ALL {
            assert_eq!(seq.code().parse::<SequenceType>().unwrap(), seq);
        }
        assert!("RECURRING".parse::<SequenceType>().is_err());
        assert!("rcur".parse::<SequenceType>().is_err());
    }

    #[test]
    fn test_local_instrument() {
        assert_eq!(LocalInstrument::default(), LocalInstrument::Core);
        assert_eq!("COR1".parse::<LocalInstrument>().unwrap(), LocalInstrument::Cor1);
        assert_eq!(LocalInstrument::B2b.to_string(), "B2B");
        assert!("SDD".parse::<LocalInstrument>().is_err());
    }

    #[test]
    fn test_amount_display() {
        assert_eq!(Amount::from_minor_units(1234).to_string(), "12.34");
        assert_eq!(Amount::from_minor_units(100_000_000).to_string(), "1000000.00");
        assert_eq!(Amount::from_minor_units(5).to_string(), "0.05");
        assert_eq!(Amount::ZERO.to_string(), "0.00");
        assert_eq!(Amount::from_minor_units(1234).to_decimal(), Decimal::new(1234, 2));
    }

    #[test]
    fn test_amount_checked_add() {
        let a = Amount::from_minor_units(100);
        assert_eq!(a.checked_add(Amount::from_minor_units(250)), Some(Amount::from_minor_units(350)));
        assert_eq!(Amount::from_minor_units(u64::MAX).checked_add(a), None);
    }

    #[test]
    fn test_header_defaults() {
        let creditor = Creditor::new("Verein e.V.", "DE02120300000000202051", None, "DE98ZZZ09999999999");
        let header = MessageHeader::new(
            "MSG-1",
            "Verein e.V.",
            NaiveDate::from_ymd_opt(2025, 10, 1).unwrap(),
            creditor,
        );
        assert_eq!(header.currency, "EUR");
        assert_eq!(header.local_instrument, LocalInstrument::Core);
        assert_eq!(header.batch_booking, None);
        assert_eq!(header.with_batch_booking(false).batch_booking, Some(false));
    }
}
