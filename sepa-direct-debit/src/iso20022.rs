//! ISO 20022 message generation
//!
//! Generates pain.008 (CustomerDirectDebitInitiation) documents from the
//! grouped transactions of a [`TransactionStore`].
//!
//! # Standards
//!
//! - ISO 20022: Universal financial industry message scheme
//! - pain.008.002.02 / pain.008.003.02: SEPA Customer Direct Debit Initiation
//!
//! # Example Output
//!
//! ```xml
//! <?xml version="1.0" encoding="UTF-8"?>
//! <Document xmlns="urn:iso:std:iso:20022:tech:xsd:pain.008.002.02" ...>
//!   <CstmrDrctDbtInitn>
//!     <GrpHdr>
//!       <MsgId>ABC</MsgId>
//!       <CreDtTm>2025-09-30T12:00:00Z</CreDtTm>
//!       <NbOfTxs>1</NbOfTxs>
//!       <CtrlSum>12.34</CtrlSum>
//!       <InitgPty><Nm>Verein</Nm></InitgPty>
//!     </GrpHdr>
//!     <PmtInf>
//!       <PmtInfId>ABC-RCUR</PmtInfId>
//!       ...
//!       <DrctDbtTxInf>...</DrctDbtTxInf>
//!     </PmtInf>
//!   </CstmrDrctDbtInitn>
//! </Document>
//! ```

use crate::{
    config::SchemaConfig,
    store::{SequenceGroup, TransactionStore},
    types::{MessageHeader, Transaction},
    Error, Result,
};
use chrono::{DateTime, NaiveDate, Utc};
use quick_xml::{events::Event, se::Serializer, Reader, Writer};
use serde::Serialize;

const XSI_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema-instance";
const PAYMENT_METHOD_DIRECT_DEBIT: &str = "DD";
const SERVICE_LEVEL_SEPA: &str = "SEPA";
const CHARGE_BEARER_SERVICE_LEVEL: &str = "SLEV";
const SCHEME_NAME_SEPA: &str = "SEPA";

/// pain.008 document generator
#[derive(Debug, Clone)]
pub struct Pain008Generator {
    /// Namespace and schema location source
    schema: SchemaConfig,

    /// Pretty print
    pretty_print: bool,
}

impl Pain008Generator {
    /// Create new generator
    pub fn new(schema: SchemaConfig, pretty_print: bool) -> Self {
        Self {
            schema,
            pretty_print,
        }
    }

    /// Render the document for `header` and the grouped transactions in `store`.
    ///
    /// Reads only; calling it again yields the same document for the same
    /// `created_at`.
    pub fn render(
        &self,
        header: &MessageHeader,
        store: &TransactionStore,
        created_at: DateTime<Utc>,
    ) -> Result<String> {
        let document = self.build_document(header, store, created_at);
        self.serialize_xml(&document)
    }

    /// Build pain.008 document structure
    fn build_document(
        &self,
        header: &MessageHeader,
        store: &TransactionStore,
        created_at: DateTime<Utc>,
    ) -> Pain008Document {
        let namespace = self.schema.namespace();
        let schema_location = format!("{} {}", namespace, self.schema.file_name());

        let group_header = GroupHeader {
            msg_id: header.message_id.clone(),
            cre_dt_tm: created_at.format("%Y-%m-%dT%H:%M:%SZ").to_string(),
            nb_of_txs: store.total_count(),
            ctrl_sum: store.total_sum().to_string(),
            initg_pty: PartyName::new(&header.initiating_party),
        };

        let payment_information = store
            .groups()
            .iter()
            .map(|group| build_payment_information(header, group))
            .collect();

        Pain008Document {
            xmlns: namespace,
            xmlns_xsi: XSI_NAMESPACE,
            schema_location,
            cstmr_drct_dbt_initn: CustomerDirectDebitInitiation {
                grp_hdr: group_header,
                pmt_inf: payment_information,
            },
        }
    }

    /// Serialize to XML
    fn serialize_xml(&self, document: &Pain008Document) -> Result<String> {
        let mut body = String::new();
        document
            .serialize(Serializer::new(&mut body))
            .map_err(|e| Error::Xml(format!("XML serialization failed: {}", e)))?;

        // indent afterwards so `$text` stays on the line of its attributes
        let body = if self.pretty_print { indent(&body)? } else { body };

        // Add XML declaration
        let mut xml = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        xml.push_str(&body);
        xml.push('\n');
        Ok(xml)
    }
}

/// Re-emit compact XML with two-space indentation, keeping text-only elements on one line
fn indent(compact: &str) -> Result<String> {
    let mut reader = Reader::from_str(compact);
    reader.trim_text(true);
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);

    loop {
        match reader.read_event() {
            Ok(Event::Eof) => break,
            Ok(event) => writer
                .write_event(event)
                .map_err(|e| Error::Xml(format!("XML indentation failed: {}", e)))?,
            Err(e) => {
                return Err(Error::Xml(format!(
                    "XML re-read failed at {}: {}",
                    reader.buffer_position(),
                    e
                )))
            }
        }
    }

    String::from_utf8(writer.into_inner())
        .map_err(|e| Error::Xml(format!("indented XML is not UTF-8: {}", e)))
}

/// `PmtInf` block for one sequence group
fn build_payment_information(header: &MessageHeader, group: &SequenceGroup) -> PaymentInformation {
    let sequence_code = group.sequence_type().code();

    PaymentInformation {
        pmt_inf_id: format!("{}-{}", header.message_id, sequence_code),
        pmt_mtd: PAYMENT_METHOD_DIRECT_DEBIT,
        btch_bookg: header.batch_booking,
        nb_of_txs: group.len(),
        ctrl_sum: group.control_sum().to_string(),
        pmt_tp_inf: PaymentTypeInformation {
            svc_lvl: Code { cd: SERVICE_LEVEL_SEPA },
            lcl_instrm: Code {
                cd: header.local_instrument.code(),
            },
            seq_tp: sequence_code,
        },
        reqd_colltn_dt: format_date(header.collection_date),
        cdtr: PartyName::new(&header.creditor.name),
        cdtr_acct: CashAccount::iban(&header.creditor.iban),
        cdtr_agt: Agent::bic(header.creditor.bic.as_deref()),
        chrg_br: CHARGE_BEARER_SERVICE_LEVEL,
        cdtr_schme_id: SchemeIdentification {
            id: SchemeParty {
                prvt_id: PrivateIdentification {
                    othr: GenericIdentification {
                        id: header.creditor.scheme_id.clone(),
                        schme_nm: SchemeName {
                            prtry: SCHEME_NAME_SEPA,
                        },
                    },
                },
            },
        },
        drct_dbt_tx_inf: group
            .transactions()
            .iter()
            .map(|tx| build_transaction(header, tx))
            .collect(),
    }
}

/// `DrctDbtTxInf` block for one debit
fn build_transaction(header: &MessageHeader, tx: &Transaction) -> DirectDebitTransactionInformation {
    DirectDebitTransactionInformation {
        pmt_id: PaymentIdentification {
            end_to_end_id: tx.end_to_end_id().to_string(),
        },
        instd_amt: InstructedAmount {
            ccy: header.currency.clone(),
            value: tx.amount().to_string(),
        },
        drct_dbt_tx: DirectDebitTransaction {
            mndt_rltd_inf: MandateRelatedInformation {
                mndt_id: tx.mandate_id().to_string(),
                dt_of_sgntr: format_date(tx.mandate_signed_on()),
            },
        },
        dbtr_agt: Agent::bic(tx.debtor_bic()),
        dbtr: PartyName::new(tx.debtor_name()),
        dbtr_acct: CashAccount::iban(tx.debtor_iban()),
        ultmt_dbtr: tx.ultimate_debtor().map(PartyName::new),
        rmt_inf: RemittanceInformation {
            ustrd: tx.remittance().to_string(),
        },
    }
}

fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

// ISO 20022 pain.008 structures

#[derive(Debug, Serialize)]
#[serde(rename = "Document")]
struct Pain008Document {
    #[serde(rename = "@xmlns")]
    xmlns: String,

    #[serde(rename = "@xmlns:xsi")]
    xmlns_xsi: &'static str,

    #[serde(rename = "@xsi:schemaLocation")]
    schema_location: String,

    #[serde(rename = "CstmrDrctDbtInitn")]
    cstmr_drct_dbt_initn: CustomerDirectDebitInitiation,
}

#[derive(Debug, Serialize)]
struct CustomerDirectDebitInitiation {
    #[serde(rename = "GrpHdr")]
    grp_hdr: GroupHeader,

    #[serde(rename = "PmtInf")]
    pmt_inf: Vec<PaymentInformation>,
}

#[derive(Debug, Serialize)]
struct GroupHeader {
    #[serde(rename = "MsgId")]
    msg_id: String,

    #[serde(rename = "CreDtTm")]
    cre_dt_tm: String,

    #[serde(rename = "NbOfTxs")]
    nb_of_txs: usize,

    #[serde(rename = "CtrlSum")]
    ctrl_sum: String,

    #[serde(rename = "InitgPty")]
    initg_pty: PartyName,
}

#[derive(Debug, Serialize)]
struct PartyName {
    #[serde(rename = "Nm")]
    nm: String,
}

impl PartyName {
    fn new(name: &str) -> Self {
        Self { nm: name.to_string() }
    }
}

#[derive(Debug, Serialize)]
struct PaymentInformation {
    #[serde(rename = "PmtInfId")]
    pmt_inf_id: String,

    #[serde(rename = "PmtMtd")]
    pmt_mtd: &'static str,

    #[serde(rename = "BtchBookg", skip_serializing_if = "Option::is_none")]
    btch_bookg: Option<bool>,

    #[serde(rename = "NbOfTxs")]
    nb_of_txs: usize,

    #[serde(rename = "CtrlSum")]
    ctrl_sum: String,

    #[serde(rename = "PmtTpInf")]
    pmt_tp_inf: PaymentTypeInformation,

    #[serde(rename = "ReqdColltnDt")]
    reqd_colltn_dt: String,

    #[serde(rename = "Cdtr")]
    cdtr: PartyName,

    #[serde(rename = "CdtrAcct")]
    cdtr_acct: CashAccount,

    #[serde(rename = "CdtrAgt")]
    cdtr_agt: Agent,

    #[serde(rename = "ChrgBr")]
    chrg_br: &'static str,

    #[serde(rename = "CdtrSchmeId")]
    cdtr_schme_id: SchemeIdentification,

    #[serde(rename = "DrctDbtTxInf")]
    drct_dbt_tx_inf: Vec<DirectDebitTransactionInformation>,
}

#[derive(Debug, Serialize)]
struct PaymentTypeInformation {
    #[serde(rename = "SvcLvl")]
    svc_lvl: Code,

    #[serde(rename = "LclInstrm")]
    lcl_instrm: Code,

    #[serde(rename = "SeqTp")]
    seq_tp: &'static str,
}

#[derive(Debug, Serialize)]
struct Code {
    #[serde(rename = "Cd")]
    cd: &'static str,
}

#[derive(Debug, Serialize)]
struct CashAccount {
    #[serde(rename = "Id")]
    id: AccountIdentification,
}

impl CashAccount {
    fn iban(iban: &str) -> Self {
        Self {
            id: AccountIdentification {
                iban: iban.to_string(),
            },
        }
    }
}

#[derive(Debug, Serialize)]
struct AccountIdentification {
    #[serde(rename = "IBAN")]
    iban: String,
}

#[derive(Debug, Serialize)]
struct Agent {
    #[serde(rename = "FinInstnId")]
    fin_instn_id: FinancialInstitutionId,
}

impl Agent {
    fn bic(bic: Option<&str>) -> Self {
        Self {
            fin_instn_id: FinancialInstitutionId {
                bic: bic.map(str::to_string),
            },
        }
    }
}

#[derive(Debug, Serialize)]
struct FinancialInstitutionId {
    #[serde(rename = "BIC", skip_serializing_if = "Option::is_none")]
    bic: Option<String>,
}

#[derive(Debug, Serialize)]
struct SchemeIdentification {
    #[serde(rename = "Id")]
    id: SchemeParty,
}

#[derive(Debug, Serialize)]
struct SchemeParty {
    #[serde(rename = "PrvtId")]
    prvt_id: PrivateIdentification,
}

#[derive(Debug, Serialize)]
struct PrivateIdentification {
    #[serde(rename = "Othr")]
    othr: GenericIdentification,
}

#[derive(Debug, Serialize)]
struct GenericIdentification {
    #[serde(rename = "Id")]
    id: String,

    #[serde(rename = "SchmeNm")]
    schme_nm: SchemeName,
}

#[derive(Debug, Serialize)]
struct SchemeName {
    #[serde(rename = "Prtry")]
    prtry: &'static str,
}

#[derive(Debug, Serialize)]
struct DirectDebitTransactionInformation {
    #[serde(rename = "PmtId")]
    pmt_id: PaymentIdentification,

    #[serde(rename = "InstdAmt")]
    instd_amt: InstructedAmount,

    #[serde(rename = "DrctDbtTx")]
    drct_dbt_tx: DirectDebitTransaction,

    #[serde(rename = "DbtrAgt")]
    dbtr_agt: Agent,

    #[serde(rename = "Dbtr")]
    dbtr: PartyName,

    #[serde(rename = "DbtrAcct")]
    dbtr_acct: CashAccount,

    #[serde(rename = "UltmtDbtr", skip_serializing_if = "Option::is_none")]
    ultmt_dbtr: Option<PartyName>,

    #[serde(rename = "RmtInf")]
    rmt_inf: RemittanceInformation,
}

#[derive(Debug, Serialize)]
struct PaymentIdentification {
    #[serde(rename = "EndToEndId")]
    end_to_end_id: String,
}

#[derive(Debug, Serialize)]
struct InstructedAmount {
    #[serde(rename = "@Ccy")]
    ccy: String,

    #[serde(rename = "$text")]
    value: String,
}

#[derive(Debug, Serialize)]
struct DirectDebitTransaction {
    #[serde(rename = "MndtRltdInf")]
    mndt_rltd_inf: MandateRelatedInformation,
}

#[derive(Debug, Serialize)]
struct MandateRelatedInformation {
    #[serde(rename = "MndtId")]
    mndt_id: String,

    #[serde(rename = "DtOfSgntr")]
    dt_of_sgntr: String,
}

#[derive(Debug, Serialize)]
struct RemittanceInformation {
    #[serde(rename = "Ustrd")]
    ustrd: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Creditor, SequenceType, TransactionRequest};
    use chrono::TimeZone;
    use rust_decimal::Decimal;

    fn header() -> MessageHeader {
        MessageHeader::new(
            "ABC",
            "Sportverein Musterstadt",
            NaiveDate::from_ymd_opt(2025, 10, 15).unwrap(),
            Creditor::new(
                "Sportverein Musterstadt",
                "DE02120300000000202051",
                Some("BYLADEM1001".to_string()),
                "DE98ZZZ09999999999",
            ),
        )
    }

    fn request(id: &str, cents: i64, sequence_type: SequenceType) -> TransactionRequest {
        TransactionRequest {
            end_to_end_id: id.to_string(),
            debtor_iban: "DE89370400440532013000".to_string(),
            debtor_bic: None,
            debtor_name: "Max Mustermann".to_string(),
            mandate_id: format!("MNDT-{}", id),
            mandate_signed_on: NaiveDate::from_ymd_opt(2023, 11, 2).unwrap(),
            amount: Decimal::new(cents, 2),
            remittance: "Beitrag Oktober".to_string(),
            sequence_type: sequence_type.code().to_string(),
            ultimate_debtor: None,
        }
    }

    fn created_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 9, 30, 12, 0, 0).unwrap()
    }

    fn child<'a, 'input>(node: roxmltree::Node<'a, 'input>, name: &str) -> roxmltree::Node<'a, 'input> {
        node.children()
            .find(|n| n.tag_name().name() == name)
            .unwrap_or_else(|| panic!("missing <{}>", name))
    }

    fn text<'a>(node: roxmltree::Node<'a, '_>, path: &[&str]) -> &'a str {
        let mut current = node;
        for name in path {
            current = child(current, name);
        }
        current.text().unwrap_or_default()
    }

    #[test]
    fn test_document_structure() {
        let mut store = TransactionStore::new();
        store.insert(&request("TX-1", 1234, SequenceType::Recurring)).unwrap();

        let generator = Pain008Generator::new(SchemaConfig::default(), true);
        let xml = generator.render(&header(), &store, created_at()).unwrap();
        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));

        let doc = roxmltree::Document::parse(&xml).unwrap();
        let root = doc.root_element();
        assert_eq!(root.tag_name().name(), "Document");
        assert_eq!(
            root.tag_name().namespace(),
            Some("urn:iso:std:iso:20022:tech:xsd:pain.008.002.02")
        );
        assert_eq!(
            root.attribute((XSI_NAMESPACE, "schemaLocation")),
            Some("urn:iso:std:iso:20022:tech:xsd:pain.008.002.02 pain.008.002.02.xsd")
        );

        let initiation = child(root, "CstmrDrctDbtInitn");
        assert_eq!(text(initiation, &["GrpHdr", "MsgId"]), "ABC");
        assert_eq!(text(initiation, &["GrpHdr", "CreDtTm"]), "2025-09-30T12:00:00Z");
        assert_eq!(text(initiation, &["GrpHdr", "NbOfTxs"]), "1");
        assert_eq!(text(initiation, &["GrpHdr", "CtrlSum"]), "12.34");
        assert_eq!(text(initiation, &["GrpHdr", "InitgPty", "Nm"]), "Sportverein Musterstadt");

        let pmt_inf = child(initiation, "PmtInf");
        assert_eq!(text(pmt_inf, &["PmtInfId"]), "ABC-RCUR");
        assert_eq!(text(pmt_inf, &["PmtMtd"]), "DD");
        assert!(pmt_inf.children().all(|n| n.tag_name().name() != "BtchBookg"));
        assert_eq!(text(pmt_inf, &["PmtTpInf", "SvcLvl", "Cd"]), "SEPA");
        assert_eq!(text(pmt_inf, &["PmtTpInf", "LclInstrm", "Cd"]), "CORE");
        assert_eq!(text(pmt_inf, &["PmtTpInf", "SeqTp"]), "RCUR");
        assert_eq!(text(pmt_inf, &["ReqdColltnDt"]), "2025-10-15");
        assert_eq!(text(pmt_inf, &["CdtrAgt", "FinInstnId", "BIC"]), "BYLADEM1001");
        assert_eq!(text(pmt_inf, &["ChrgBr"]), "SLEV");
        assert_eq!(
            text(pmt_inf, &["CdtrSchmeId", "Id", "PrvtId", "Othr", "Id"]),
            "DE98ZZZ09999999999"
        );
        assert_eq!(
            text(pmt_inf, &["CdtrSchmeId", "Id", "PrvtId", "Othr", "SchmeNm", "Prtry"]),
            "SEPA"
        );

        let tx = child(pmt_inf, "DrctDbtTxInf");
        assert_eq!(text(tx, &["PmtId", "EndToEndId"]), "TX-1");
        assert_eq!(text(tx, &["InstdAmt"]), "12.34");
        assert_eq!(child(tx, "InstdAmt").attribute("Ccy"), Some("EUR"));
        assert_eq!(text(tx, &["DrctDbtTx", "MndtRltdInf", "MndtId"]), "MNDT-TX-1");
        assert_eq!(text(tx, &["DrctDbtTx", "MndtRltdInf", "DtOfSgntr"]), "2023-11-02");
        assert!(child(child(tx, "DbtrAgt"), "FinInstnId").children().all(|n| !n.is_element()));
        assert_eq!(text(tx, &["DbtrAcct", "Id", "IBAN"]), "DE89370400440532013000");
        assert!(tx.children().all(|n| n.tag_name().name() != "UltmtDbtr"));
        assert_eq!(text(tx, &["RmtInf", "Ustrd"]), "Beitrag Oktober");
    }

    #[test]
    fn test_pretty_output_keeps_leaves_inline() {
        let mut store = TransactionStore::new();
        store.insert(&request("TX-1", 1234, SequenceType::Recurring)).unwrap();
        store.insert(&request("TX-2", 99_999_999_999, SequenceType::Recurring)).unwrap();

        let generator = Pain008Generator::new(SchemaConfig::default(), true);
        let xml = generator.render(&header(), &store, created_at()).unwrap();

        assert!(xml.contains("\n  <CstmrDrctDbtInitn>\n    <GrpHdr>\n      <MsgId>ABC</MsgId>"));
        assert!(xml.contains("<InstdAmt Ccy=\"EUR\">12.34</InstdAmt>"));
        assert!(xml.contains("<InstdAmt Ccy=\"EUR\">999999999.99</InstdAmt>"));
        assert!(xml.ends_with("</Document>\n"));
    }

    #[test]
    fn test_groups_and_optional_elements() {
        let mut store = TransactionStore::new();
        store.insert(&request("F-1", 100, SequenceType::First)).unwrap();
        let mut with_extras = request("R-1", 5000, SequenceType::Recurring);
        with_extras.debtor_bic = Some("cobadeffxxx".to_string());
        with_extras.ultimate_debtor = Some("Lisa Mustermann".to_string());
        store.insert(&with_extras).unwrap();
        store.insert(&request("F-2", 250, SequenceType::First)).unwrap();

        let header = header()
            .with_batch_booking(false)
            .with_local_instrument(crate::types::LocalInstrument::Cor1);
        let generator = Pain008Generator::new(SchemaConfig::default(), false);
        let xml = generator.render(&header, &store, created_at()).unwrap();
        assert!(!xml.contains("\n  <"));

        let doc = roxmltree::Document::parse(&xml).unwrap();
        let initiation = child(doc.root_element(), "CstmrDrctDbtInitn");
        assert_eq!(text(initiation, &["GrpHdr", "NbOfTxs"]), "3");
        assert_eq!(text(initiation, &["GrpHdr", "CtrlSum"]), "53.50");

        let blocks: Vec<_> = initiation
            .children()
            .filter(|n| n.tag_name().name() == "PmtInf")
            .collect();
        assert_eq!(blocks.len(), 2);
        assert_eq!(text(blocks[0], &["PmtInfId"]), "ABC-FRST");
        assert_eq!(text(blocks[0], &["BtchBookg"]), "false");
        assert_eq!(text(blocks[0], &["NbOfTxs"]), "2");
        assert_eq!(text(blocks[0], &["CtrlSum"]), "3.50");
        assert_eq!(text(blocks[0], &["PmtTpInf", "LclInstrm", "Cd"]), "COR1");
        assert_eq!(text(blocks[1], &["PmtInfId"]), "ABC-RCUR");

        let ids: Vec<_> = blocks[0]
            .children()
            .filter(|n| n.tag_name().name() == "DrctDbtTxInf")
            .map(|n| text(n, &["PmtId", "EndToEndId"]))
            .collect();
        assert_eq!(ids, vec!["F-1", "F-2"]);

        let tx = child(blocks[1], "DrctDbtTxInf");
        assert_eq!(text(tx, &["DbtrAgt", "FinInstnId", "BIC"]), "COBADEFFXXX");
        assert_eq!(text(tx, &["UltmtDbtr", "Nm"]), "Lisa Mustermann");
    }

    #[test]
    fn test_schema_version_selects_namespace() {
        let schema = SchemaConfig {
            version: "008.003.02".to_string(),
            dir: None,
        };
        let generator = Pain008Generator::new(schema, true);
        let xml = generator
            .render(&header(), &TransactionStore::new(), created_at())
            .unwrap();
        assert!(xml.contains("xmlns=\"urn:iso:std:iso:20022:tech:xsd:pain.008.003.02\""));
        assert!(xml.contains("pain.008.003.02.xsd\""));
    }

    #[test]
    fn test_render_is_repeatable() {
        let mut store = TransactionStore::new();
        store.insert(&request("TX-1", 999, SequenceType::OneOff)).unwrap();
        let generator = Pain008Generator::new(SchemaConfig::default(), true);

        let first = generator.render(&header(), &store, created_at()).unwrap();
        let second = generator.render(&header(), &store, created_at()).unwrap();
        assert_eq!(first, second);
        assert_eq!(store.total_count(), 1);
    }
}
