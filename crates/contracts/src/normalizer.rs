//! Normalizer trait - attribute flattening interface

use crate::{Attributes, ContractError, NormalizedRecord};

/// Flattens a record's attribute tree before serialization.
///
/// Called once per record by the owning flush worker. An error drops that
/// single record; the buffer keeps running.
pub trait Normalizer: Send + Sync {
    /// Flatten `attributes` of the record identified by `record_id`.
    ///
    /// # Errors
    /// Returns `ContractError::Normalization` when the attributes cannot be
    /// represented as a flat mapping.
    fn normalize(
        &self,
        record_id: &str,
        attributes: &Attributes,
    ) -> Result<NormalizedRecord, ContractError>;
}
