//!
//! # GdsDb Errors
//!

// Local Imports
use crate::data::{GdsContext, GdsDataType, GdsRecord, GdsRecordType};

///
/// # GdsDb Error Enumeration
///
/// Most errors are tied in some sense to parsing and decoding.
/// Once a valid [GdsLibrary](crate::GdsLibrary) is created in memory,
/// it can generally be streamed to bytes, other than the length limits of GDSII records.
/// Hierarchy-level operations (flattening, subtree extraction, validation)
/// add the reference-resolution variants.
///
#[derive(Debug, thiserror::Error)]
pub enum GdsError {
    /// Truncated or otherwise malformed record bytes
    #[error("malformed GDSII data at byte {offset}: {msg}")]
    Format { msg: String, offset: u64 },
    /// Known record type with an invalid data-type or length
    #[error("invalid {rtype:?} record, with data-type {dtype:?} and length {len}, at byte {offset}")]
    RecordDecode {
        rtype: GdsRecordType,
        dtype: GdsDataType,
        len: u16,
        offset: u64,
    },
    /// Invalid record length: either decoded, or too long to be encoded
    #[error("invalid record length {0}")]
    RecordLen(usize),
    /// Unknown or unimplemented record type. Recoverable unless reading in strict mode.
    #[error("unsupported record type 0x{rtype:02x} at byte {offset}")]
    Unsupported { rtype: u8, offset: u64 },
    /// Records out of their required order, or a duplicate cell definition
    #[error("{msg} (record #{recordnum}, at byte {offset}, in {ctx:?})")]
    Structural {
        msg: String,
        record: Option<GdsRecord>,
        recordnum: usize,
        offset: u64,
        ctx: Vec<GdsContext>,
    },
    /// Insertion of a cell whose name is already defined
    #[error("duplicate cell name `{0}`")]
    DuplicateName(String),
    /// Requested cell is not defined
    #[error("cell `{0}` not found")]
    CellNotFound(String),
    /// Cell `cell` references undefined cell `name`
    #[error("cell `{cell}` references undefined cell `{name}`")]
    MissingReference { cell: String, name: String },
    /// Reference cycle, starting and ending with the same cell
    #[error("cyclic cell reference: {}", .path.join(" -> "))]
    CyclicReference { path: Vec<String> },
    /// Flattening produced more than `limit` elements
    #[error("flattening exceeds the limit of {limit} elements")]
    ElementLimit { limit: usize },
    /// Source or sink failure
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// Text serialization failure
    #[error(transparent)]
    Serialization(#[from] gdsdbutils::ser::Error),
}

/// Result type alias
pub type GdsResult<T> = Result<T, GdsError>;
