//! Validated transactions grouped by sequence type

use crate::types::{Amount, SequenceType, Transaction, TransactionRequest};
use crate::validation::{self, Field, IssueCode, ValidationIssue, ValidationReport};

/// Transactions sharing a sequence type, in insertion order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceGroup {
    sequence_type: SequenceType,
    transactions: Vec<Transaction>,
    control_sum: Amount,
}

impl SequenceGroup {
    fn new(sequence_type: SequenceType) -> Self {
        Self {
            sequence_type,
            transactions: Vec::new(),
            control_sum: Amount::ZERO,
        }
    }

    /// Sequence type of every member
    pub fn sequence_type(&self) -> SequenceType {
        self.sequence_type
    }

    /// Members in insertion order
    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    /// Number of members
    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    /// Whether the group has no members
    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    /// Exact sum of member amounts
    pub fn control_sum(&self) -> Amount {
        self.control_sum
    }
}

/// Accumulates validated transactions per sequence type.
///
/// Groups are created on first use of a sequence type and keep that order.
#[derive(Debug, Clone, Default)]
pub struct TransactionStore {
    groups: Vec<SequenceGroup>,
    total_sum: Amount,
}

impl TransactionStore {
    /// Empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate a request and, only if every field passes, append it to its group.
    pub fn insert(&mut self, request: &TransactionRequest) -> Result<(), ValidationReport> {
        let transaction = validation::validate_transaction(request)?;
        self.commit(transaction)
    }

    fn commit(&mut self, transaction: Transaction) -> Result<(), ValidationReport> {
        let amount = transaction.amount();
        let idx = match self
            .groups
            .iter()
            .position(|group| group.sequence_type == transaction.sequence_type())
        {
            Some(idx) => idx,
            None => {
                self.groups.push(SequenceGroup::new(transaction.sequence_type()));
                self.groups.len() - 1
            }
        };

        let sums = self.groups[idx]
            .control_sum
            .checked_add(amount)
            .zip(self.total_sum.checked_add(amount));
        let Some((group_sum, total_sum)) = sums else {
            if self.groups[idx].is_empty() {
                self.groups.pop();
            }
            let mut report = ValidationReport::new();
            report.push(ValidationIssue::new(
                Field::Amount,
                IssueCode::Overflow,
                "control sum would overflow",
            ));
            return Err(report);
        };

        let group = &mut self.groups[idx];
        group.control_sum = group_sum;
        group.transactions.push(transaction);
        self.total_sum = total_sum;
        Ok(())
    }

    /// Groups in first-seen order
    pub fn groups(&self) -> &[SequenceGroup] {
        &self.groups
    }

    /// Group for a sequence type, if any transaction used it
    pub fn group(&self, sequence_type: SequenceType) -> Option<&SequenceGroup> {
        self.groups
            .iter()
            .find(|group| group.sequence_type == sequence_type)
    }

    /// Number of transactions across all groups
    pub fn total_count(&self) -> usize {
        self.groups.iter().map(SequenceGroup::len).sum()
    }

    /// Sum of all group control sums
    pub fn total_sum(&self) -> Amount {
        self.total_sum
    }

    /// No transaction accepted yet
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}
