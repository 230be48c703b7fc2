//! SEPA Direct Debit Message Builder
//!
//! Builds ISO 20022 `pain.008` customer direct debit initiation documents.
//!
//! # Architecture
//!
//! A message moves through two states:
//!
//! 1. **Building**: transactions are validated field by field and, if every
//!    rule passes, appended to the group of their sequence type
//!    (`FRST`, `RCUR`, `OOFF`, `FNAL`)
//! 2. **Serialized**: the document is rendered, one `PmtInf` block per group,
//!    and optionally checked against the pain.008 XSD
//!
//! Amounts are kept as integer minor units, so control sums are exact.
//!
//! # Example
//!
//! ```no_run
//! use chrono::NaiveDate;
//! use rust_decimal::Decimal;
//! use sepa_direct_debit::{Config, Creditor, DirectDebitMessage, MessageHeader, TransactionRequest};
//!
//! fn main() -> sepa_direct_debit::Result<()> {
//!     let config = Config::from_env()?;
//!     let creditor = Creditor::new(
//!         "Sportverein e.V.",
//!         "DE02120300000000202051",
//!         Some("BYLADEM1001".to_string()),
//!         "DE98ZZZ09999999999",
//!     );
//!     let header = MessageHeader::new(
//!         "BEITRAG-2025-10",
//!         "Sportverein e.V.",
//!         NaiveDate::from_ymd_opt(2025, 10, 1).unwrap(),
//!         creditor,
//!     );
//!
//!     let mut message = DirectDebitMessage::new(header, config)?;
//!     message.add_transaction(&TransactionRequest {
//!         end_to_end_id: "MITGLIED-0042".to_string(),
//!         debtor_iban: "DE89370400440532013000".to_string(),
//!         debtor_bic: Some("COBADEFFXXX".to_string()),
//!         debtor_name: "Erika Mustermann".to_string(),
//!         mandate_id: "M-0042".to_string(),
//!         mandate_signed_on: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
//!         amount: Decimal::new(1250, 2),
//!         remittance: "Mitgliedsbeitrag Oktober".to_string(),
//!         sequence_type: "RCUR".to_string(),
//!         ultimate_debtor: None,
//!     })?;
//!
//!     println!("{}", message.finish()?);
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod config;
pub mod error;
pub mod iso20022;
pub mod message;
pub mod schema_validator;
pub mod store;
pub mod types;
pub mod validation;
mod xsd;

// Re-exports
pub use config::Config;
pub use error::{Error, Result, SchemaViolation};
pub use message::DirectDebitMessage;
pub use schema_validator::SchemaValidator;
pub use store::{SequenceGroup, TransactionStore};
pub use types::*;
pub use validation::{Field, IssueCode, ValidationIssue, ValidationReport};
