//!
//! # GdsDb Data Model
//!
//! Records, elements, and cells, stored on GDSII's terms.
//! The library-level database type [GdsLibrary](crate::GdsLibrary) lives in [crate::library].
//!

// Crates.io
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use chrono::{Datelike, NaiveDateTime, SubsecRound, Timelike, Utc};
use derive_builder::Builder;
use derive_more::{Add, AddAssign};
use num_derive::FromPrimitive;
use serde::{Deserialize, Serialize};

// Local Imports
use crate::error::{GdsError, GdsResult};

///
/// # Gds Record Types
///
/// In the numeric-order specified by GDSII, for automatic [FromPrimitive] conversions.
///
#[derive(FromPrimitive, Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Hash)]
pub enum GdsRecordType {
    Header = 0x00,
    BgnLib,
    LibName,
    Units,
    EndLib,
    BgnStruct,
    StructName, // STRNAME
    EndStruct,
    Boundary,
    Path,
    StructRef,
    ArrayRef,
    Text,
    Layer,
    DataType,
    Width,
    Xy,
    EndElement,
    StructRefName, // SNAME
    ColRow,
    TextNode, // "Not currently used"
    Node,
    TextType,
    Presentation,
    Spacing, // "Discontinued"
    String,
    Strans,
    Mag,
    Angle,
    Uinteger, // "No longer used"
    Ustring,  // "No longer used"
    RefLibs,
    Fonts,
    PathType,
    Generations,
    AttrTable,
    StypTable, // "Unreleased Feature"
    StrType,   // "Unreleased Feature"
    ElemFlags,
    ElemKey,  // "Unreleased Feature"
    LinkType, // "Unreleased Feature"
    LinkKeys, // "Unreleased Feature"
    Nodetype,
    PropAttr,
    PropValue,
    Box,
    BoxType,
    Plex,
    BeginExtn, // "Only occurs in CustomPlus"
    EndExtn,   // "Only occurs in CustomPlus"
    TapeNum,
    TapeCode,
    StrClass, // "Only for Calma internal use"
    Reserved, // "Reserved for future use"
    Format,
    Mask,
    EndMasks,
    LibDirSize,
    SrfName,
    LibSecur,
}
impl GdsRecordType {
    /// Boolean indication of whether we decode this record type.
    /// The remainder are deprecated, or were provisioned and never released,
    /// and are skipped as unsupported when found in a stream.
    pub fn valid(&self) -> bool {
        !matches!(
            self,
            Self::TextNode
                | Self::Spacing
                | Self::Uinteger
                | Self::Ustring
                | Self::StypTable
                | Self::StrType
                | Self::ElemKey
                | Self::LinkType
                | Self::LinkKeys
                | Self::StrClass
                | Self::Reserved
        )
    }
    /// The sole [GdsDataType] valid for each record type
    pub fn dtype(&self) -> GdsDataType {
        use GdsDataType::*;
        match self {
            Self::EndLib
            | Self::EndStruct
            | Self::Boundary
            | Self::Path
            | Self::StructRef
            | Self::ArrayRef
            | Self::Text
            | Self::EndElement
            | Self::TextNode
            | Self::Node
            | Self::Box
            | Self::EndMasks => NoData,
            Self::Presentation | Self::Strans | Self::ElemFlags => BitArray,
            Self::Header
            | Self::BgnLib
            | Self::BgnStruct
            | Self::Layer
            | Self::DataType
            | Self::ColRow
            | Self::TextType
            | Self::Spacing
            | Self::PathType
            | Self::Generations
            | Self::Nodetype
            | Self::PropAttr
            | Self::BoxType
            | Self::TapeNum
            | Self::TapeCode
            | Self::StrClass
            | Self::Format
            | Self::LibDirSize
            | Self::LibSecur
            | Self::StrType
            | Self::LinkType
            | Self::ElemKey => I16,
            Self::Width
            | Self::Xy
            | Self::Uinteger
            | Self::Plex
            | Self::BeginExtn
            | Self::EndExtn
            | Self::LinkKeys
            | Self::Reserved => I32,
            Self::Units | Self::Mag | Self::Angle => F64,
            Self::LibName
            | Self::StructName
            | Self::StructRefName
            | Self::String
            | Self::Ustring
            | Self::RefLibs
            | Self::Fonts
            | Self::AttrTable
            | Self::StypTable
            | Self::PropValue
            | Self::Mask
            | Self::SrfName => Str,
        }
    }
    /// Payload length in bytes, for fixed-length record types.
    /// `None` for variable-length records: strings and coordinate lists.
    pub fn fixed_len(&self) -> Option<u16> {
        match self {
            Self::BgnLib | Self::BgnStruct => Some(24),
            Self::Units => Some(16),
            Self::TapeCode => Some(12),
            Self::Mag | Self::Angle => Some(8),
            Self::ColRow => Some(4),
            Self::Xy => None,
            _ => match self.dtype() {
                GdsDataType::NoData => Some(0),
                GdsDataType::BitArray | GdsDataType::I16 => Some(2),
                GdsDataType::I32 | GdsDataType::F32 => Some(4),
                GdsDataType::F64 => Some(8),
                GdsDataType::Str => None,
            },
        }
    }
}

/// # Gds DataType Enumeration
/// In order as decoded from the fourth byte of each record header
#[derive(FromPrimitive, Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
pub enum GdsDataType {
    NoData = 0,
    BitArray = 1,
    I16 = 2,
    I32 = 3,
    F32 = 4,
    F64 = 5,
    Str = 6,
}

/// # Gds Record Header
/// Decoded contents of a record's four header bytes.
/// `len` is the payload length, i.e. excluding the header itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GdsRecordHeader {
    pub rtype: GdsRecordType,
    pub dtype: GdsDataType,
    pub len: u16,
}

///
/// # Gds Record Enumeration
///
/// Keeps each record in relatively "raw" form,
/// other than assuring correct data-types,
/// and converting one-entry arrays into scalars.
/// Invalid record-types are not included.
///
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GdsRecord {
    Header { version: i16 },
    BgnLib { dates: [i16; 12] },
    LibName(String),
    Units(f64, f64),
    EndLib,
    BgnStruct { dates: [i16; 12] },
    StructName(String),    // STRNAME Record
    StructRefName(String), // SNAME Record
    EndStruct,
    Boundary,
    Path,
    StructRef,
    ArrayRef,
    Text,
    Layer(i16),
    DataType(i16),
    Width(i32),
    Xy(Vec<i32>),
    EndElement,
    ColRow { cols: i16, rows: i16 },
    Node,
    TextType(i16),
    Presentation(u8, u8),
    String(String),
    Strans(u8, u8),
    Mag(f64),
    Angle(f64),
    RefLibs(String),
    Fonts(String),
    PathType(i16),
    Generations(i16),
    AttrTable(String),
    ElemFlags(u8, u8),
    Nodetype(i16),
    PropAttr(i16),
    PropValue(String),
    Box,
    BoxType(i16),
    Plex(i32),
    BeginExtn(i32),
    EndExtn(i32),
    TapeNum(i16),
    TapeCode([i16; 6]),
    Format(i16),
    Mask(String),
    EndMasks,
    LibDirSize(i16),
    SrfName(String),
    LibSecur(i16),
}
impl GdsRecord {
    /// Get our [GdsRecordType]
    pub fn rtype(&self) -> GdsRecordType {
        use GdsRecordType as T;
        match self {
            Self::Header { .. } => T::Header,
            Self::BgnLib { .. } => T::BgnLib,
            Self::LibName(_) => T::LibName,
            Self::Units(..) => T::Units,
            Self::EndLib => T::EndLib,
            Self::BgnStruct { .. } => T::BgnStruct,
            Self::StructName(_) => T::StructName,
            Self::StructRefName(_) => T::StructRefName,
            Self::EndStruct => T::EndStruct,
            Self::Boundary => T::Boundary,
            Self::Path => T::Path,
            Self::StructRef => T::StructRef,
            Self::ArrayRef => T::ArrayRef,
            Self::Text => T::Text,
            Self::Layer(_) => T::Layer,
            Self::DataType(_) => T::DataType,
            Self::Width(_) => T::Width,
            Self::Xy(_) => T::Xy,
            Self::EndElement => T::EndElement,
            Self::ColRow { .. } => T::ColRow,
            Self::Node => T::Node,
            Self::TextType(_) => T::TextType,
            Self::Presentation(..) => T::Presentation,
            Self::String(_) => T::String,
            Self::Strans(..) => T::Strans,
            Self::Mag(_) => T::Mag,
            Self::Angle(_) => T::Angle,
            Self::RefLibs(_) => T::RefLibs,
            Self::Fonts(_) => T::Fonts,
            Self::PathType(_) => T::PathType,
            Self::Generations(_) => T::Generations,
            Self::AttrTable(_) => T::AttrTable,
            Self::ElemFlags(..) => T::ElemFlags,
            Self::Nodetype(_) => T::Nodetype,
            Self::PropAttr(_) => T::PropAttr,
            Self::PropValue(_) => T::PropValue,
            Self::Box => T::Box,
            Self::BoxType(_) => T::BoxType,
            Self::Plex(_) => T::Plex,
            Self::BeginExtn(_) => T::BeginExtn,
            Self::EndExtn(_) => T::EndExtn,
            Self::TapeNum(_) => T::TapeNum,
            Self::TapeCode(_) => T::TapeCode,
            Self::Format(_) => T::Format,
            Self::Mask(_) => T::Mask,
            Self::EndMasks => T::EndMasks,
            Self::LibDirSize(_) => T::LibDirSize,
            Self::SrfName(_) => T::SrfName,
            Self::LibSecur(_) => T::LibSecur,
        }
    }
    /// Decode a record of type `rtype` from its `payload` bytes.
    ///
    /// Callers are responsible for checking the record's data-type and length
    /// against [GdsRecordType::dtype] and [GdsRecordType::fixed_len];
    /// see [GdsReader](crate::read::GdsReader).
    pub(crate) fn decode(rtype: GdsRecordType, payload: &[u8]) -> GdsResult<GdsRecord> {
        use GdsRecordType as T;
        let mut p = payload;
        let record = match rtype {
            // Library-Level Records
            T::Header => Self::Header {
                version: p.read_i16::<BigEndian>()?,
            },
            T::BgnLib => Self::BgnLib {
                dates: read_i16_array(&mut p)?,
            },
            T::LibName => Self::LibName(read_str(payload)?),
            T::Units => Self::Units(read_f64(&mut p)?, read_f64(&mut p)?),
            T::EndLib => Self::EndLib,

            // Structure (Cell) Level Records
            T::BgnStruct => Self::BgnStruct {
                dates: read_i16_array(&mut p)?,
            },
            T::StructName => Self::StructName(read_str(payload)?),
            T::StructRefName => Self::StructRefName(read_str(payload)?),
            T::EndStruct => Self::EndStruct,

            // Element-Level Records
            T::Boundary => Self::Boundary,
            T::Path => Self::Path,
            T::StructRef => Self::StructRef,
            T::ArrayRef => Self::ArrayRef,
            T::Text => Self::Text,
            T::Node => Self::Node,
            T::Box => Self::Box,
            T::EndElement => Self::EndElement,
            T::Layer => Self::Layer(p.read_i16::<BigEndian>()?),
            T::DataType => Self::DataType(p.read_i16::<BigEndian>()?),
            T::Width => Self::Width(p.read_i32::<BigEndian>()?),
            T::Xy => {
                let mut xy = vec![0; payload.len() / 4];
                p.read_i32_into::<BigEndian>(&mut xy)?;
                Self::Xy(xy)
            }
            T::ColRow => Self::ColRow {
                cols: p.read_i16::<BigEndian>()?,
                rows: p.read_i16::<BigEndian>()?,
            },
            T::TextType => Self::TextType(p.read_i16::<BigEndian>()?),
            T::Presentation => Self::Presentation(payload[0], payload[1]),
            T::String => Self::String(read_str(payload)?),
            T::Strans => Self::Strans(payload[0], payload[1]),
            T::Mag => Self::Mag(read_f64(&mut p)?),
            T::Angle => Self::Angle(read_f64(&mut p)?),
            T::PathType => Self::PathType(p.read_i16::<BigEndian>()?),
            T::ElemFlags => Self::ElemFlags(payload[0], payload[1]),
            T::Nodetype => Self::Nodetype(p.read_i16::<BigEndian>()?),
            T::PropAttr => Self::PropAttr(p.read_i16::<BigEndian>()?),
            T::PropValue => Self::PropValue(read_str(payload)?),
            T::BoxType => Self::BoxType(p.read_i16::<BigEndian>()?),
            T::Plex => Self::Plex(p.read_i32::<BigEndian>()?),
            T::BeginExtn => Self::BeginExtn(p.read_i32::<BigEndian>()?),
            T::EndExtn => Self::EndExtn(p.read_i32::<BigEndian>()?),

            // Library-level records which are decoded, but not otherwise supported
            T::RefLibs => Self::RefLibs(read_str(payload)?),
            T::Fonts => Self::Fonts(read_str(payload)?),
            T::Generations => Self::Generations(p.read_i16::<BigEndian>()?),
            T::AttrTable => Self::AttrTable(read_str(payload)?),
            T::TapeNum => Self::TapeNum(p.read_i16::<BigEndian>()?),
            T::TapeCode => {
                let mut d = [0; 6];
                p.read_i16_into::<BigEndian>(&mut d)?;
                Self::TapeCode(d)
            }
            T::Format => Self::Format(p.read_i16::<BigEndian>()?),
            T::Mask => Self::Mask(read_str(payload)?),
            T::EndMasks => Self::EndMasks,
            T::LibDirSize => Self::LibDirSize(p.read_i16::<BigEndian>()?),
            T::SrfName => Self::SrfName(read_str(payload)?),
            T::LibSecur => Self::LibSecur(p.read_i16::<BigEndian>()?),

            // Filtered out by [GdsRecordType::valid] before we get here
            T::TextNode
            | T::Spacing
            | T::Uinteger
            | T::Ustring
            | T::StypTable
            | T::StrType
            | T::ElemKey
            | T::LinkType
            | T::LinkKeys
            | T::StrClass
            | T::Reserved => {
                return Err(GdsError::Format {
                    msg: format!("undecodable record type {:?}", rtype),
                    offset: 0,
                })
            }
        };
        Ok(record)
    }
    /// Encode our payload (everything after the four header bytes) onto `dest`
    pub(crate) fn encode_payload(&self, dest: &mut impl std::io::Write) -> std::io::Result<()> {
        match self {
            // NoData
            Self::EndLib
            | Self::EndStruct
            | Self::Boundary
            | Self::Path
            | Self::StructRef
            | Self::ArrayRef
            | Self::Text
            | Self::EndElement
            | Self::Node
            | Self::Box
            | Self::EndMasks => (),

            // BitArrays
            Self::Presentation(d0, d1) | Self::Strans(d0, d1) | Self::ElemFlags(d0, d1) => {
                dest.write_all(&[*d0, *d1])?
            }
            // Single I16s
            Self::Header { version: d }
            | Self::Layer(d)
            | Self::DataType(d)
            | Self::TextType(d)
            | Self::PathType(d)
            | Self::Generations(d)
            | Self::Nodetype(d)
            | Self::PropAttr(d)
            | Self::BoxType(d)
            | Self::TapeNum(d)
            | Self::Format(d)
            | Self::LibDirSize(d)
            | Self::LibSecur(d) => dest.write_i16::<BigEndian>(*d)?,

            // Single I32s
            Self::Width(d) | Self::Plex(d) | Self::BeginExtn(d) | Self::EndExtn(d) => {
                dest.write_i32::<BigEndian>(*d)?
            }
            // F64s
            Self::Mag(d) | Self::Angle(d) => dest.write_u64::<BigEndian>(GdsFloat64::encode(*d))?,
            Self::Units(d0, d1) => {
                dest.write_u64::<BigEndian>(GdsFloat64::encode(*d0))?;
                dest.write_u64::<BigEndian>(GdsFloat64::encode(*d1))?;
            }
            // Vectors & fixed-size arrays
            Self::ColRow { cols, rows } => {
                dest.write_i16::<BigEndian>(*cols)?;
                dest.write_i16::<BigEndian>(*rows)?;
            }
            Self::BgnLib { dates } | Self::BgnStruct { dates } => {
                for val in dates.iter() {
                    dest.write_i16::<BigEndian>(*val)?;
                }
            }
            Self::TapeCode(d) => {
                for val in d.iter() {
                    dest.write_i16::<BigEndian>(*val)?;
                }
            }
            Self::Xy(d) => {
                for val in d.iter() {
                    dest.write_i32::<BigEndian>(*val)?;
                }
            }
            // Strings
            Self::LibName(s)
            | Self::StructName(s)
            | Self::StructRefName(s)
            | Self::String(s)
            | Self::RefLibs(s)
            | Self::Fonts(s)
            | Self::AttrTable(s)
            | Self::PropValue(s)
            | Self::Mask(s)
            | Self::SrfName(s) => {
                dest.write_all(s.as_bytes())?;
                if s.len() % 2 != 0 {
                    // GDSII strings are even-length; pad odd ones with a NUL
                    dest.write_u8(0x00)?;
                }
            }
        };
        Ok(())
    }
}
/// Read a fixed twelve-entry array of `i16`s, as used by the date records
fn read_i16_array(p: &mut &[u8]) -> std::io::Result<[i16; 12]> {
    let mut d = [0; 12];
    p.read_i16_into::<BigEndian>(&mut d)?;
    Ok(d)
}
/// Read an eight-byte GDSII float
fn read_f64(p: &mut &[u8]) -> std::io::Result<f64> {
    Ok(GdsFloat64::decode(p.read_u64::<BigEndian>()?))
}
/// Convert `payload` to a `String`, stripping its optional NUL padding
fn read_str(payload: &[u8]) -> GdsResult<String> {
    let mut data = payload;
    while let [rest @ .., 0x00] = data {
        data = rest;
    }
    match std::str::from_utf8(data) {
        Ok(s) => Ok(s.to_string()),
        Err(e) => Err(GdsError::Format {
            msg: format!("invalid string data: {}", e),
            offset: 0,
        }),
    }
}

/// # Gds Floating Point
/// ## GDSII's Home-Grown Floating-Point Format
///
/// GDSII predates IEEE754, and stores reals as a sign bit, a seven-bit excess-64
/// base-sixteen exponent, and a 56-bit mantissa normalized to the range (1/16, 1).
///
/// [GdsFloat64] is not a data-store, but a namespace for conversions
/// to and from IEEE754 double-precision format.
///
pub struct GdsFloat64;
impl GdsFloat64 {
    /// Decode GDSII's eight-byte representation, stored as a `u64`, to `f64`
    pub fn decode(val: u64) -> f64 {
        let neg = (val & 0x8000_0000_0000_0000) != 0;
        let exp: i32 = ((val & 0x7F00_0000_0000_0000) >> 56) as i32 - 64;
        let mantissa = (val & 0x00FF_FFFF_FFFF_FFFF) as f64 / 2f64.powi(56);
        let magnitude = mantissa * 16f64.powi(exp);
        if neg {
            -magnitude
        } else {
            magnitude
        }
    }
    /// Encode `f64` to GDSII's eight bytes, stored as `u64`
    pub fn encode(mut val: f64) -> u64 {
        if val == 0.0 {
            return 0;
        };
        let mut top: u8 = 0;
        if val < 0.0 {
            top = 0x80;
            val = -val;
        }
        let fexp: f64 = 0.25 * val.log2();
        let mut exponent = fexp.ceil() as i32;
        if fexp == fexp.ceil() {
            exponent += 1;
        }
        let mantissa: u64 = (val * 16_f64.powi(14 - exponent)).round() as u64;
        top += (64 + exponent) as u8;
        (top as u64).wrapping_shl(56) | (mantissa & 0x00FF_FFFF_FFFF_FFFF)
    }
}

/// Our helper for "do not serialize default `false` boolean values".
fn is_false(b: &bool) -> bool {
    !b
}

/// # Gds Translation Settings
/// Reflection, rotation, and magnification for text-elements and references.
/// As configured by `STRANS`, `MAG`, and `ANGLE` records.
#[derive(Default, Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct GdsStrans {
    /// Reflection, about the x-axis.
    /// Applied before rotation.
    #[serde(default, skip_serializing_if = "is_false")]
    pub reflected: bool,
    /// Absolute Magnification Setting
    #[serde(default, skip_serializing_if = "is_false")]
    pub abs_mag: bool,
    /// Absolute Angle Setting
    #[serde(default, skip_serializing_if = "is_false")]
    pub abs_angle: bool,
    /// Magnification Factor. Interpreted as unit-scaling (mag==1.0) if not specified.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mag: Option<f64>,
    /// Angle, in degrees counter-clockwise. Defaults to zero if not specified.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub angle: Option<f64>,
}

/// # Gds Text-Presentation Flags
/// Sets fonts, text justification, and the like. Stored in raw form.
#[derive(Default, Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct GdsPresentation(pub u8, pub u8);

/// # Gds Element Flags
/// Two bytes of bit-fields from `ELFLAGS` records, stored in raw form.
#[derive(Default, Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct GdsElemFlags(pub u8, pub u8);

/// # Gds Plex
/// "A unique positive number which is common to all elements of the Plex to which this element belongs."
/// Rarely used; carried through for round-trips.
#[derive(Default, Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct GdsPlex(pub i32);

/// # Gds Library Units
///
/// Each GDSII library has two length-units: "DB Units" and "User Units".
/// All spatial data is denoted in DB units.
///
/// From the `UNITS` record-description:
/// ```text
/// Contains two eight-byte real numbers.
/// The first number is the size of a database-unit, in user-units.
/// The second is the size of a database-unit in meters.
/// ```
///
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct GdsUnits(pub f64, pub f64);
impl GdsUnits {
    /// Create a new [GdsUnits]
    pub fn new(num1: f64, num2: f64) -> Self {
        Self(num1, num2)
    }
    /// Get the database-unit size, in meters. Used for all spatial data.
    pub fn db_unit(&self) -> f64 {
        self.1
    }
    /// Get the user-unit size, in meters. Largely for display.
    pub fn user_unit(&self) -> f64 {
        self.1 / self.0
    }
}
impl Default for GdsUnits {
    /// Default values for GDS Units:
    /// * DB-Unit = 1nm
    /// * User-Unit = 1µm (1000x the DB-Unit)
    fn default() -> Self {
        Self(1e-3, 1e-9)
    }
}

/// # Gds Spatial Point
/// Coordinate in (x,y) layout-space, in its library's database units.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, Hash)]
pub struct GdsPoint {
    pub x: i32,
    pub y: i32,
}
impl GdsPoint {
    /// Create a new [GdsPoint]
    pub fn new(x: i32, y: i32) -> Self {
        GdsPoint { x, y }
    }
    /// Create a vector of [GdsPoint] from an array of tuples
    pub fn vec(pts: &[(i32, i32)]) -> Vec<Self> {
        pts.iter().map(|pt| Self::new(pt.0, pt.1)).collect()
    }
    /// Convert an n-element slice of `i32` into an n/2-element vector of [GdsPoint]s.
    /// Returns `None` for odd-length input.
    pub(crate) fn parse_vec(from: &[i32]) -> Option<Vec<GdsPoint>> {
        if from.len() % 2 != 0 {
            return None;
        }
        Some(
            from.chunks_exact(2)
                .map(|c| GdsPoint::new(c[0], c[1]))
                .collect(),
        )
    }
    /// Flatten a slice of [GdsPoint]s to a 2n-element i32 vector
    pub(crate) fn flatten_vec(src: &[GdsPoint]) -> Vec<i32> {
        src.iter().flat_map(|p| [p.x, p.y]).collect()
    }
}

/// # Gds Property
/// An (attribute, value) pair attached to an element.
/// ```text
/// PROPATTR PROPVALUE
/// ```
#[derive(Default, Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct GdsProperty {
    /// Attribute Number
    pub attr: i16,
    /// Attribute Value
    pub value: String,
}

///
/// # Gds Path Element
///
/// ```text
/// PATH [ELFLAGS] [PLEX] LAYER DATATYPE [PATHTYPE] [WIDTH] XY [BGNEXTN] [ENDEXTN]
/// ```
///
#[derive(Default, Clone, Builder, Debug, Deserialize, Serialize, PartialEq)]
#[builder(pattern = "owned", setter(into))]
pub struct GdsPath {
    // Required Fields
    /// Layer Number
    pub layer: i16,
    /// DataType ID
    pub datatype: i16,
    /// Vector of x,y coordinates
    pub xy: Vec<GdsPoint>,

    // Optional Fields
    /// Width. Negative values denote absolute widths, unaffected by magnification.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(strip_option))]
    pub width: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(strip_option))]
    pub path_type: Option<i16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(strip_option))]
    pub begin_extn: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(strip_option))]
    pub end_extn: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(strip_option))]
    pub elflags: Option<GdsElemFlags>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(strip_option))]
    pub plex: Option<GdsPlex>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    #[builder(default)]
    pub properties: Vec<GdsProperty>,
}

///
/// # Gds Boundary Element
///
/// The most common type for closed-form shapes in GDSII.
/// GDSII dictates that the first and final coordinates of each boundary be identical,
/// "closing" the polygon; an N-sided polygon has an (N+1)-point `xy` vector.
/// Boundaries are stored as decoded, including the closing point.
///
/// ```text
/// BOUNDARY [ELFLAGS] [PLEX] LAYER DATATYPE XY
/// ```
///
#[derive(Default, Clone, Builder, Debug, Deserialize, Serialize, PartialEq)]
#[builder(pattern = "owned", setter(into))]
pub struct GdsBoundary {
    // Required Fields
    /// Layer Number
    pub layer: i16,
    /// DataType ID
    pub datatype: i16,
    /// Vector of x,y coordinates
    pub xy: Vec<GdsPoint>,

    // Optional Fields
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(strip_option))]
    pub elflags: Option<GdsElemFlags>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(strip_option))]
    pub plex: Option<GdsPlex>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    #[builder(default)]
    pub properties: Vec<GdsProperty>,
}

///
/// # Gds Struct Reference (Cell Instance)
///
/// A single instance of the cell named `name`, placed at `xy`.
/// Reflection, rotation, and magnification are configured by `strans`.
/// The referenced cell need not exist when decoded; it must exist when flattened.
///
/// ```text
/// SREF [ELFLAGS] [PLEX] SNAME [<strans>] XY
/// ```
///
#[derive(Default, Clone, Builder, Debug, Deserialize, Serialize, PartialEq)]
#[builder(pattern = "owned", setter(into))]
pub struct GdsStructRef {
    // Required Fields
    /// Struct (Cell) Name
    pub name: String,
    /// Location x,y coordinates
    pub xy: GdsPoint,

    // Optional Fields
    /// Translation & Reflection Options
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(strip_option))]
    pub strans: Option<GdsStrans>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(strip_option))]
    pub elflags: Option<GdsElemFlags>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(strip_option))]
    pub plex: Option<GdsPlex>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    #[builder(default)]
    pub properties: Vec<GdsProperty>,
}

///
/// # Gds Array Reference
///
/// A two-dimensional, `cols` by `rows` array of instances of the cell named `name`.
///
/// Its three `xy` points are, in order:
/// * The origin of the first instance
/// * The origin displaced by `cols` column-steps
/// * The origin displaced by `rows` row-steps
///
/// Both displacements are expressed in the coordinates of the cell holding the array,
/// i.e. after the array's own reflection and rotation.
///
/// ```text
/// AREF [ELFLAGS] [PLEX] SNAME [<strans>] COLROW XY
/// ```
///
#[derive(Default, Clone, Builder, Debug, Deserialize, Serialize, PartialEq)]
#[builder(pattern = "owned", setter(into))]
pub struct GdsArrayRef {
    // Required Fields
    /// Struct (Cell) Name
    pub name: String,
    /// Origin, column-extent, and row-extent coordinates
    pub xy: [GdsPoint; 3],
    /// Number of columns
    pub cols: i16,
    /// Number of rows
    pub rows: i16,

    // Optional Fields
    /// Translation & Reflection Options
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(strip_option))]
    pub strans: Option<GdsStrans>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(strip_option))]
    pub elflags: Option<GdsElemFlags>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(strip_option))]
    pub plex: Option<GdsPlex>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    #[builder(default)]
    pub properties: Vec<GdsProperty>,
}
impl GdsArrayRef {
    /// Displacement between adjacent columns, in the holding cell's coordinates
    pub fn col_step(&self) -> (f64, f64) {
        let n = f64::from(self.cols.max(1));
        (
            (f64::from(self.xy[1].x) - f64::from(self.xy[0].x)) / n,
            (f64::from(self.xy[1].y) - f64::from(self.xy[0].y)) / n,
        )
    }
    /// Displacement between adjacent rows, in the holding cell's coordinates
    pub fn row_step(&self) -> (f64, f64) {
        let n = f64::from(self.rows.max(1));
        (
            (f64::from(self.xy[2].x) - f64::from(self.xy[0].x)) / n,
            (f64::from(self.xy[2].y) - f64::from(self.xy[0].y)) / n,
        )
    }
    /// Total number of instances
    pub fn len(&self) -> usize {
        self.cols.max(0) as usize * self.rows.max(0) as usize
    }
    /// Boolean indication of an (invalid) zero-instance array
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

///
/// # Gds Text Element
///
/// ```text
/// TEXT [ELFLAGS] [PLEX] LAYER
/// TEXTTYPE [PRESENTATION] [PATHTYPE] [WIDTH] [<strans>] XY STRING
/// ```
#[derive(Default, Clone, Builder, Debug, Deserialize, Serialize, PartialEq)]
#[builder(pattern = "owned", setter(into))]
pub struct GdsTextElem {
    // Required Fields
    /// Text Value
    pub string: String,
    /// Layer Number
    pub layer: i16,
    /// Text-Type ID
    pub texttype: i16,
    /// Location x,y coordinates
    pub xy: GdsPoint,

    // Optional Fields
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(strip_option))]
    pub presentation: Option<GdsPresentation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(strip_option))]
    pub path_type: Option<i16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(strip_option))]
    pub width: Option<i32>,
    /// Translation & Reflection Options
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(strip_option))]
    pub strans: Option<GdsStrans>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(strip_option))]
    pub elflags: Option<GdsElemFlags>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(strip_option))]
    pub plex: Option<GdsPlex>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    #[builder(default)]
    pub properties: Vec<GdsProperty>,
}

///
/// # Gds Node Element
///
/// ```text
/// NODE [ELFLAGS] [PLEX] LAYER NODETYPE XY
/// ```
///
#[derive(Default, Clone, Builder, Debug, Deserialize, Serialize, PartialEq)]
#[builder(pattern = "owned", setter(into))]
pub struct GdsNode {
    // Required Fields
    /// Layer Number
    pub layer: i16,
    /// Node-Type ID
    pub nodetype: i16,
    /// Vector of x,y coordinates
    pub xy: Vec<GdsPoint>,

    // Optional Fields
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(strip_option))]
    pub elflags: Option<GdsElemFlags>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(strip_option))]
    pub plex: Option<GdsPlex>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    #[builder(default)]
    pub properties: Vec<GdsProperty>,
}

///
/// # Gds Box Element
///
/// ```text
/// BOX [ELFLAGS] [PLEX] LAYER BOXTYPE XY
/// ```
///
#[derive(Default, Clone, Builder, Debug, Deserialize, Serialize, PartialEq)]
#[builder(pattern = "owned", setter(into))]
pub struct GdsBox {
    // Required Fields
    /// Layer Number
    pub layer: i16,
    /// Box-Type ID
    pub boxtype: i16,
    /// Five x,y coordinates, the last repeating the first
    pub xy: [GdsPoint; 5],

    // Optional Fields
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(strip_option))]
    pub elflags: Option<GdsElemFlags>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(strip_option))]
    pub plex: Option<GdsPlex>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    #[builder(default)]
    pub properties: Vec<GdsProperty>,
}

///
/// # Gds Element Enumeration
///
/// Primary union of geometric elements, instances, and arrays which comprise a GDSII struct (cell).
///
/// ```text
/// {<boundary> | <path> | <SREF> | <AREF> | <text> | <node> | <box>} {<property>}* ENDEL
/// ```
///
/// Note the `properties` vectors are pushed down to each enum variant.
///
#[derive(derive_more::From, Debug, Clone, Deserialize, Serialize, PartialEq)]
pub enum GdsElement {
    GdsBoundary(GdsBoundary),
    GdsPath(GdsPath),
    GdsStructRef(GdsStructRef),
    GdsArrayRef(GdsArrayRef),
    GdsTextElem(GdsTextElem),
    GdsNode(GdsNode),
    GdsBox(GdsBox),
}
impl GdsElement {
    /// Name of the referenced cell, for [GdsStructRef]s and [GdsArrayRef]s.
    /// `None` for all primitive elements.
    pub fn ref_name(&self) -> Option<&str> {
        match self {
            Self::GdsStructRef(r) => Some(&r.name),
            Self::GdsArrayRef(a) => Some(&a.name),
            _ => None,
        }
    }
    /// Boolean indication of whether we are a hierarchical reference
    pub fn is_ref(&self) -> bool {
        self.ref_name().is_some()
    }
    /// Human-readable, single-line summary
    pub fn describe(&self) -> String {
        match self {
            Self::GdsBoundary(b) => format!(
                "boundary {}/{} with {} points",
                b.layer,
                b.datatype,
                b.xy.len()
            ),
            Self::GdsPath(p) => format!(
                "path {}/{} with {} points, width {}",
                p.layer,
                p.datatype,
                p.xy.len(),
                p.width.unwrap_or(0)
            ),
            Self::GdsStructRef(r) => format!("sref of `{}` at ({}, {})", r.name, r.xy.x, r.xy.y),
            Self::GdsArrayRef(a) => format!(
                "aref of `{}`, {} cols x {} rows at ({}, {})",
                a.name, a.cols, a.rows, a.xy[0].x, a.xy[0].y
            ),
            Self::GdsTextElem(t) => format!("text {}/{} `{}`", t.layer, t.texttype, t.string),
            Self::GdsNode(n) => format!("node {}/{}", n.layer, n.nodetype),
            Self::GdsBox(b) => format!("box {}/{}", b.layer, b.boxtype),
        }
    }
}

/// # Gds Summary Stats
///
/// Numbers of cells and elements of each type, in a library or cell.
#[derive(Debug, Default, Clone, Deserialize, Serialize, PartialEq, Eq, Add, AddAssign)]
pub struct GdsStats {
    pub libraries: usize,
    pub structs: usize,
    pub boundaries: usize,
    pub paths: usize,
    pub struct_refs: usize,
    pub array_refs: usize,
    pub text_elems: usize,
    pub nodes: usize,
    pub boxes: usize,
}

/// # Gds Date & Time
///
/// ```text
/// Two-Byte Signed Integer
/// Contains last modification time of library (two bytes
/// each for year, month, day, hour, minute, and second)
/// ```
///
/// Values are stored as-is when decoded; no validation of real dates & times is performed,
/// so that any GDSII data round-trips.
/// New objects default to their creation time, as produced by [`chrono::Utc::now()`].
///
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct GdsDateTime {
    pub year: i16, // GDSII uses 1900 as the base year
    pub month: i16,
    pub day: i16,
    pub hour: i16,
    pub minute: i16,
    pub second: i16,
}
impl GdsDateTime {
    /// Get the current time, rounded to GDSII's whole-second precision
    pub fn now() -> Self {
        Utc::now().naive_utc().round_subsecs(0).into()
    }
    /// Encode in GDSII's six-entry format
    fn encode(&self) -> [i16; 6] {
        [
            self.year,
            self.month,
            self.day,
            self.hour,
            self.minute,
            self.second,
        ]
    }
}
impl Default for GdsDateTime {
    fn default() -> Self {
        Self::now()
    }
}
impl From<NaiveDateTime> for GdsDateTime {
    fn from(dt: NaiveDateTime) -> Self {
        Self {
            year: dt.year() as i16 - 1900,
            month: dt.month() as i16,
            day: dt.day() as i16,
            hour: dt.hour() as i16,
            minute: dt.minute() as i16,
            second: dt.second() as i16,
        }
    }
}
impl From<&[i16]> for GdsDateTime {
    /// Convert from the first six entries of `d`, in the order prescribed by GDSII
    fn from(d: &[i16]) -> Self {
        Self {
            year: d[0],
            month: d[1],
            day: d[2],
            hour: d[3],
            minute: d[4],
            second: d[5],
        }
    }
}

/// # Gds Modification & Access Dates & Times
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct GdsDateTimes {
    /// Last Modification Date & Time
    pub modified: GdsDateTime,
    /// Last Access Date & Time
    pub accessed: GdsDateTime,
}
impl GdsDateTimes {
    /// Decode from the twelve entries of a `BGNLIB` or `BGNSTR` record
    pub fn decode(d: &[i16; 12]) -> Self {
        Self {
            modified: GdsDateTime::from(&d[0..6]),
            accessed: GdsDateTime::from(&d[6..12]),
        }
    }
    /// Encode to the twelve entries of a `BGNLIB` or `BGNSTR` record
    pub fn encode(&self) -> [i16; 12] {
        let mut rv = [0; 12];
        rv[0..6].copy_from_slice(&self.modified.encode());
        rv[6..12].copy_from_slice(&self.accessed.encode());
        rv
    }
}
impl Default for GdsDateTimes {
    /// Both dates are set from a single call to `Utc::now()`, so they match.
    fn default() -> Self {
        let now = GdsDateTime::now();
        Self {
            modified: now.clone(),
            accessed: now,
        }
    }
}
impl From<GdsDateTime> for GdsDateTimes {
    fn from(dt: GdsDateTime) -> Self {
        Self {
            modified: dt.clone(),
            accessed: dt,
        }
    }
}

///
/// # Gds Struct (Cell) Definition
///
/// GDSII's hierarchical layout-definition object is its "struct",
/// which most other layout systems would call a "cell".
/// Each is principally an ordered vector of [GdsElement]s.
/// Element order is preserved through decoding and encoding.
///
/// ```text
/// BGNSTR STRNAME [STRCLASS] {<element>}* ENDSTR
/// ```
///
#[derive(Default, Clone, Builder, Debug, Deserialize, Serialize, PartialEq)]
#[builder(pattern = "owned", setter(into))]
pub struct GdsStruct {
    /// Struct Name
    pub name: String,
    /// Modification & Access Dates & Times
    #[builder(default)]
    pub dates: GdsDateTimes,
    /// Elements List
    #[builder(default)]
    pub elems: Vec<GdsElement>,
}
impl GdsStruct {
    /// Create a new and empty [GdsStruct]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
    /// Iterate over the names of all cells we reference, in element order.
    /// Names referenced more than once are repeated.
    pub fn refs(&self) -> impl Iterator<Item = &str> {
        self.elems.iter().filter_map(GdsElement::ref_name)
    }
    /// Count and return our element statistics
    pub fn stats(&self) -> GdsStats {
        let mut stats = GdsStats {
            structs: 1,
            ..Default::default()
        };
        for elem in &self.elems {
            use GdsElement::*;
            match elem {
                GdsBoundary(_) => stats.boundaries += 1,
                GdsPath(_) => stats.paths += 1,
                GdsStructRef(_) => stats.struct_refs += 1,
                GdsArrayRef(_) => stats.array_refs += 1,
                GdsTextElem(_) => stats.text_elems += 1,
                GdsNode(_) => stats.nodes += 1,
                GdsBox(_) => stats.boxes += 1,
            };
        }
        stats
    }
}

/// # Gds Context
/// Enumeration of each context in which a record can be parsed, for error reporting
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GdsContext {
    Library,
    Struct(String),
    StructRef,
    ArrayRef,
    Boundary,
    Box,
    Path,
    Text,
    Node,
    Property,
}
