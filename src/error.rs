//! Domain errors for segmentation and transaction validation

use thiserror::Error;

/// Failures that the segmentation engine can report.
///
/// Neither variant is fatal to the application: `InsufficientData` degrades
/// the segmentation view and `MalformedRecord` drops a single input row.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RfmError {
    /// No transaction in the input carries a usable date.
    #[error("segmentation unavailable: no transaction has a usable date")]
    InsufficientData,

    /// A sales row could not be turned into a transaction.
    #[error("malformed record at row {row}: {reason}")]
    MalformedRecord { row: usize, reason: String },
}

pub type RfmResult<T> = std::result::Result<T, RfmError>;
