//! Direct debit message
//!
//! Owns the validated header and the grouped transactions, and ties together
//! rendering and schema conformance checking.

use crate::{
    config::Config,
    iso20022::Pain008Generator,
    schema_validator::SchemaValidator,
    store::{SequenceGroup, TransactionStore},
    types::*,
    validation, Result,
};
use chrono::{DateTime, Utc};

/// A pain.008 message under construction
#[derive(Debug, Clone)]
pub struct DirectDebitMessage {
    /// Validated header
    header: MessageHeader,

    /// Accepted transactions
    store: TransactionStore,

    /// XML generator
    generator: Pain008Generator,

    /// Post-render schema check
    validator: SchemaValidator,
}

impl DirectDebitMessage {
    /// Create a message, validating the header
    pub fn new(header: MessageHeader, config: Config) -> Result<Self> {
        let header = validation::validate_header(&header).map_err(|report| {
            tracing::warn!("Rejected message header {}: {}", header.message_id, report);
            report
        })?;

        let generator = Pain008Generator::new(config.schema.clone(), config.output.pretty_print);
        let validator = SchemaValidator::new(config.schema);

        tracing::info!(
            "Created direct debit message {} ({}, collection on {})",
            header.message_id,
            header.local_instrument,
            header.collection_date
        );

        Ok(Self {
            header,
            store: TransactionStore::new(),
            generator,
            validator,
        })
    }

    /// Submit a transaction.
    ///
    /// On [`Error::Validation`](crate::Error::Validation) the message is unchanged.
    pub fn add_transaction(&mut self, request: &TransactionRequest) -> Result<()> {
        match self.store.insert(request) {
            Ok(()) => {
                tracing::debug!(
                    "Accepted {} ({} {}, {})",
                    request.end_to_end_id,
                    request.amount,
                    self.header.currency,
                    request.sequence_type
                );
                Ok(())
            }
            Err(report) => {
                tracing::warn!("Rejected {}: {}", request.end_to_end_id, report);
                Err(report.into())
            }
        }
    }

    /// Validated header
    pub fn header(&self) -> &MessageHeader {
        &self.header
    }

    /// Groups in first-seen order
    pub fn groups(&self) -> &[SequenceGroup] {
        self.store.groups()
    }

    /// Group for one sequence type
    pub fn group(&self, sequence_type: SequenceType) -> Option<&SequenceGroup> {
        self.store.group(sequence_type)
    }

    /// Number of accepted transactions
    pub fn total_count(&self) -> usize {
        self.store.total_count()
    }

    /// Sum of all accepted amounts
    pub fn total_sum(&self) -> Amount {
        self.store.total_sum()
    }

    /// Render the document stamped with the current time, without schema checking
    pub fn render(&self) -> Result<String> {
        self.render_at(Utc::now())
    }

    /// Render the document with an explicit creation timestamp
    pub fn render_at(&self, created_at: DateTime<Utc>) -> Result<String> {
        let xml = self.generator.render(&self.header, &self.store, created_at)?;

        tracing::info!(
            "Rendered message {}: {} transaction(s) in {} group(s), control sum {}",
            self.header.message_id,
            self.total_count(),
            self.groups().len(),
            self.total_sum()
        );

        Ok(xml)
    }

    /// Render and check the document against the configured schema
    pub fn to_xml(&self) -> Result<String> {
        let xml = self.render()?;
        self.validator.validate(&xml)?;
        Ok(xml)
    }

    /// Render, check and consume the message
    pub fn finish(self) -> Result<String> {
        self.to_xml()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::Field;
    use crate::Error;
    use chrono::{NaiveDate, TimeZone};
    use rust_decimal::Decimal;

    fn header(message_id: &str) -> MessageHeader {
        MessageHeader::new(
            message_id,
            "Sportverein e.V.",
            NaiveDate::from_ymd_opt(2025, 10, 1).unwrap(),
            Creditor::new(
                "Sportverein e.V.",
                "DE02 1203 0000 0000 2020 51",
                Some("BYLADEM1001".to_string()),
                "DE98ZZZ09999999999",
            ),
        )
    }

    fn request(id: &str, amount: Decimal, sequence_type: &str) -> TransactionRequest {
        TransactionRequest {
            end_to_end_id: id.to_string(),
            debtor_iban: "DE89370400440532013000".to_string(),
            debtor_bic: Some("COBADEFFXXX".to_string()),
            debtor_name: "Erika Mustermann".to_string(),
            mandate_id: format!("MNDT-{}", id),
            mandate_signed_on: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            amount,
            remittance: "Beitrag 2025".to_string(),
            sequence_type: sequence_type.to_string(),
            ultimate_debtor: None,
        }
    }

    #[test]
    fn test_header_is_normalized() {
        let message = DirectDebitMessage::new(header("MSG-1"), Config::default()).unwrap();
        assert_eq!(message.header().creditor.iban, "DE02120300000000202051");
        assert_eq!(message.total_count(), 0);
    }

    #[test]
    fn test_invalid_message_id_rejected() {
        let result = DirectDebitMessage::new(header(&"M".repeat(30)), Config::default());
        match result {
            Err(Error::Validation(report)) => assert!(report.contains(Field::MessageId)),
            other => panic!("expected validation error, got {:?}", other),
        }

        let result = DirectDebitMessage::new(header("MSG_1"), Config::default());
        assert!(matches!(result, Err(Error::Validation(_))));
    }

    #[test]
    fn test_add_transaction() {
        let mut message = DirectDebitMessage::new(header("MSG-1"), Config::default()).unwrap();
        message.add_transaction(&request("E1", Decimal::new(1234, 2), "RCUR")).unwrap();
        message.add_transaction(&request("E2", Decimal::new(500, 2), "FRST")).unwrap();

        let err = message
            .add_transaction(&request("E3", Decimal::new(100, 2), "MONTHLY"))
            .unwrap_err();
        match err {
            Error::Validation(report) => assert!(report.contains(Field::SequenceType)),
            other => panic!("expected validation error, got {:?}", other),
        }

        assert_eq!(message.total_count(), 2);
        assert_eq!(message.total_sum().minor_units(), 1734);
        assert_eq!(message.groups().len(), 2);
        assert_eq!(message.group(SequenceType::Recurring).unwrap().len(), 1);
    }

    #[test]
    fn test_render_is_repeatable() {
        let mut message = DirectDebitMessage::new(header("MSG-1"), Config::default()).unwrap();
        message.add_transaction(&request("E1", Decimal::ONE, "OOFF")).unwrap();

        let at = Utc.with_ymd_and_hms(2025, 9, 30, 8, 0, 0).unwrap();
        let first = message.render_at(at).unwrap();
        assert_eq!(first, message.render_at(at).unwrap());
        assert!(first.contains("<CreDtTm>2025-09-30T08:00:00Z</CreDtTm>"));

        message.add_transaction(&request("E2", Decimal::ONE, "OOFF")).unwrap();
        assert!(message.render_at(at).unwrap().contains("<NbOfTxs>2</NbOfTxs>"));
    }

    #[test]
    fn test_finish_without_schema_dir() {
        let mut message = DirectDebitMessage::new(header("MSG-1"), Config::default()).unwrap();
        message.add_transaction(&request("E1", Decimal::ONE, "FNAL")).unwrap();

        let xml = message.finish().unwrap();
        assert!(xml.contains("<PmtInfId>MSG-1-FNAL</PmtInfId>"));
    }

    #[test]
    fn test_finish_with_missing_schema() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.schema.dir = Some(temp_dir.path().to_path_buf());

        let message = DirectDebitMessage::new(header("MSG-1"), config).unwrap();
        assert!(message.render().is_ok());
        assert!(matches!(message.finish(), Err(Error::SchemaFileMissing(_))));
    }
}
