//!
//! # GdsDb Reading & Decoding
//!
//! Two layers:
//! * [GdsReader] splits a byte-stream into [GdsRecord]s, one at a time
//! * [GdsParser] assembles those records into a [GdsLibrary]
//!

// Std-Lib
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

// Crates.io
use derive_builder::Builder;
use log::{debug, info, warn};
use num_traits::FromPrimitive;
use serde::{Deserialize, Serialize};

// Workspace Imports
use gdsdbutils::error::{ErrorHelper, Unwrapper};

// Local Imports
use crate::data::*;
use crate::error::{GdsError, GdsResult};
use crate::library::GdsLibrary;

/// # Gds Reading Options
#[derive(Debug, Clone, Default, Builder, Deserialize, Serialize, PartialEq, Eq)]
#[builder(pattern = "owned", default)]
pub struct GdsReadOptions {
    /// Fail on unsupported records, rather than skipping them
    pub strict: bool,
}

/// # Skipped Record
/// Type and location of an unsupported record, skipped while parsing
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
pub struct GdsSkippedRecord {
    /// Record-type byte, as found in the record header
    pub rtype: u8,
    /// Byte offset of the record header
    pub offset: u64,
}

/// # GdsReader
///
/// Splits a byte-stream into [GdsRecord]s.
/// Each call to [GdsReader::read_record] consumes exactly one record,
/// including those of unknown or unsupported type, whether or not it decodes.
///
pub struct GdsReader<R: Read> {
    /// Byte source
    src: R,
    /// Read/conversion buffer
    buf: Vec<u8>,
    /// Bytes consumed so far
    pos: u64,
}
impl GdsReader<BufReader<File>> {
    /// Create a [GdsReader], opening [File] at path `fname`
    pub fn open(fname: impl AsRef<Path>) -> GdsResult<Self> {
        Ok(Self::new(BufReader::new(File::open(fname)?)))
    }
}
impl<R: Read> GdsReader<R> {
    /// Create a [GdsReader] of `src`
    pub fn new(src: R) -> Self {
        Self {
            src,
            buf: Vec::with_capacity(1024),
            pos: 0,
        }
    }
    /// Get our current byte offset
    pub fn pos(&self) -> u64 {
        self.pos
    }
    /// Read exactly `n` bytes into the front of our buffer
    fn fill(&mut self, n: usize) -> GdsResult<()> {
        if self.buf.len() < n {
            self.buf.resize(n, 0);
        }
        match self.src.read_exact(&mut self.buf[..n]) {
            Ok(()) => {
                self.pos += n as u64;
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Err(GdsError::Format {
                msg: "unexpected end of stream".into(),
                offset: self.pos,
            }),
            Err(e) => Err(e.into()),
        }
    }
    /// Read and decode the next [GdsRecord].
    ///
    /// Unknown and unsupported record types produce [GdsError::Unsupported].
    /// Their content is consumed, so that reading can continue at the next record.
    pub fn read_record(&mut self) -> GdsResult<GdsRecord> {
        let offset = self.pos;

        // Header: 16-bit total length (including these four bytes), record-type, data-type
        self.fill(4)?;
        let len = u16::from_be_bytes([self.buf[0], self.buf[1]]);
        let (rbyte, dbyte) = (self.buf[2], self.buf[3]);
        if len < 4 || len % 2 != 0 {
            return Err(GdsError::RecordLen(len.into()));
        }
        let len = len - 4;

        // Consume the content before checking the types, so unknown records are skipped whole
        self.fill(len.into())?;
        let rtype = match GdsRecordType::from_u8(rbyte) {
            Some(rtype) if rtype.valid() => rtype,
            _ => return Err(GdsError::Unsupported { rtype: rbyte, offset }),
        };
        let dtype: GdsDataType = match FromPrimitive::from_u8(dbyte) {
            Some(dtype) => dtype,
            None => {
                return Err(GdsError::Format {
                    msg: format!("invalid data type 0x{:02x}", dbyte),
                    offset,
                })
            }
        };
        let header = GdsRecordHeader { rtype, dtype, len };
        self.decode(&header, offset)
    }
    /// Decode the content of a record with `header`, already loaded into our buffer
    fn decode(&self, header: &GdsRecordHeader, offset: u64) -> GdsResult<GdsRecord> {
        let GdsRecordHeader { rtype, dtype, len } = *header;
        let len_ok = match rtype.fixed_len() {
            Some(n) => len == n,
            None if dtype == GdsDataType::I32 => len % 4 == 0,
            None => true,
        };
        if dtype != rtype.dtype() || !len_ok {
            return Err(GdsError::RecordDecode {
                rtype,
                dtype,
                len,
                offset,
            });
        }
        GdsRecord::decode(rtype, &self.buf[..usize::from(len)]).map_err(|e| match e {
            GdsError::Format { msg, .. } => GdsError::Format { msg, offset },
            GdsError::Io(e) => GdsError::Format {
                msg: e.to_string(),
                offset,
            },
            e => e,
        })
    }
}

/// Optional fields shared by all element types
#[derive(Default)]
struct ElemCommon {
    elflags: Option<GdsElemFlags>,
    plex: Option<GdsPlex>,
    properties: Vec<GdsProperty>,
}

/// # GdsParser
///
/// A peekable iterator over the records of a [GdsReader],
/// which converts them into a tree of Gds data structures.
///
pub struct GdsParser<R: Read> {
    /// Record source
    rdr: GdsReader<R>,
    /// Options
    opts: GdsReadOptions,
    /// Next record, stored for peeking
    nxt: GdsRecord,
    /// Byte offset of `nxt`
    nxt_offset: u64,
    /// Byte offset of the most recently returned record
    offset: u64,
    /// Number of records read
    numread: usize,
    /// Context Stack
    ctx_stack: Vec<GdsContext>,
    /// Unsupported records skipped so far
    skipped: Vec<GdsSkippedRecord>,
    /// Whether any absolute magnification or angle has been found
    found_abs: bool,
}
impl GdsParser<BufReader<File>> {
    /// Create a new [GdsParser] for the file at path `fname`
    pub fn open(fname: impl AsRef<Path>) -> GdsResult<Self> {
        Self::new(GdsReader::open(fname)?)
    }
}
impl<R: Read> GdsParser<R> {
    /// Create a new [GdsParser] with default options
    pub fn new(rdr: GdsReader<R>) -> GdsResult<Self> {
        Self::with_options(rdr, GdsReadOptions::default())
    }
    /// Create a new [GdsParser] with [GdsReadOptions] `opts`
    pub fn with_options(rdr: GdsReader<R>, opts: GdsReadOptions) -> GdsResult<Self> {
        let mut me = Self {
            rdr,
            opts,
            nxt: GdsRecord::EndLib,
            nxt_offset: 0,
            offset: 0,
            numread: 0,
            ctx_stack: Vec::new(),
            skipped: Vec::new(),
            found_abs: false,
        };
        // Decode the first record to initialize our "peeker"
        let (nxt, nxt_offset) = me.read_next()?;
        me.nxt = nxt;
        me.nxt_offset = nxt_offset;
        Ok(me)
    }
    /// Get the unsupported records skipped so far
    pub fn skipped(&self) -> &[GdsSkippedRecord] {
        &self.skipped
    }
    /// Read the next record from our reader, skipping unsupported ones unless in strict mode
    fn read_next(&mut self) -> GdsResult<(GdsRecord, u64)> {
        loop {
            let offset = self.rdr.pos();
            match self.rdr.read_record() {
                Ok(record) => return Ok((record, offset)),
                Err(GdsError::Unsupported { rtype, offset }) if !self.opts.strict => {
                    self.skip(rtype, offset)
                }
                Err(e) => return Err(e),
            }
        }
    }
    /// Log and note a skipped record
    fn skip(&mut self, rtype: u8, offset: u64) {
        warn!(
            "Skipping unsupported GDSII record type 0x{:02x} at byte {}",
            rtype, offset
        );
        self.skipped.push(GdsSkippedRecord { rtype, offset });
    }
    /// Handle a decoded but unsupported `record`
    fn unsupported(&mut self, record: &GdsRecord) -> GdsResult<()> {
        let rtype = record.rtype() as u8;
        if self.opts.strict {
            return Err(GdsError::Unsupported {
                rtype,
                offset: self.offset,
            });
        }
        self.skip(rtype, self.offset);
        Ok(())
    }
    /// Advance our iterator and return the next record
    fn next(&mut self) -> GdsResult<GdsRecord> {
        if self.nxt == GdsRecord::EndLib {
            // Once we reach [GdsRecord::EndLib], keep returning it forever.
            // Anything after it, e.g. block-padding, is never read.
            self.offset = self.nxt_offset;
            return Ok(GdsRecord::EndLib);
        }
        let (rv, offset) = self.read_next()?;
        self.offset = std::mem::replace(&mut self.nxt_offset, offset);
        self.numread += 1;
        Ok(std::mem::replace(&mut self.nxt, rv))
    }
    /// Peek at our next record, without advancing
    fn peek(&self) -> &GdsRecord {
        &self.nxt
    }
    /// Parse a [GdsLibrary]. Generally the start-state when reading a GDS file.
    pub fn parse_lib(&mut self) -> GdsResult<GdsLibrary> {
        self.ctx_stack.push(GdsContext::Library);
        // Read the Header and its version data
        let version = match self.next()? {
            GdsRecord::Header { version } => version,
            _ => return self.fail("Invalid library: missing GDS HEADER record"),
        };
        // Read the begin-lib
        let dates = match self.next()? {
            GdsRecord::BgnLib { dates } => GdsDateTimes::decode(&dates),
            _ => return self.fail("Invalid library: missing GDS BGNLIB record"),
        };
        let mut name = None;
        let mut units = None;
        let mut lib = GdsLibrary {
            version,
            dates,
            ..Default::default()
        };
        // Iterate over all others
        loop {
            let r = self.next()?;
            match r {
                GdsRecord::EndLib => break, // End-of-library
                GdsRecord::LibName(d) => name = Some(d),
                GdsRecord::Units(d0, d1) => units = Some(GdsUnits(d0, d1)),
                GdsRecord::BgnStruct { dates } => {
                    let strukt = self.parse_struct(dates)?;
                    self.commit(&mut lib, strukt)?;
                }
                // Valid GDSII, but unsupported here
                GdsRecord::LibDirSize(_)
                | GdsRecord::SrfName(_)
                | GdsRecord::LibSecur(_)
                | GdsRecord::RefLibs(_)
                | GdsRecord::Fonts(_)
                | GdsRecord::AttrTable(_)
                | GdsRecord::Generations(_)
                | GdsRecord::Format(_)
                | GdsRecord::Mask(_)
                | GdsRecord::EndMasks
                | GdsRecord::TapeNum(_)
                | GdsRecord::TapeCode(_) => self.unsupported(&r)?,
                GdsRecord::EndStruct => return self.fail("ENDSTR without matching BGNSTR"),
                // Invalid
                _ => return self.invalid(r),
            };
        }
        lib.name = name.unwrapper(self, "Invalid library: missing LIBNAME record")?;
        lib.units = units.unwrapper(self, "Invalid library: missing UNITS record")?;
        self.ctx_stack.pop();
        info!(
            "Read GDSII library `{}`: {} cells, {} records",
            lib.name,
            lib.len(),
            self.numread
        );
        Ok(lib)
    }
    /// Add a completed [GdsStruct] to `lib`, failing if its name is already defined
    fn commit(&mut self, lib: &mut GdsLibrary, strukt: GdsStruct) -> GdsResult<()> {
        if lib.contains(&strukt.name) {
            return self.fail(format!("Duplicate definition of cell `{}`", strukt.name));
        }
        debug!(
            "Read cell `{}` with {} elements",
            strukt.name,
            strukt.elems.len()
        );
        lib.insert(strukt)
    }
    /// Parse a cell ([GdsStruct])
    fn parse_struct(&mut self, dates: [i16; 12]) -> GdsResult<GdsStruct> {
        let name = match self.next()? {
            GdsRecord::StructName(d) => d,
            _ => return self.fail("Missing Gds StructName"),
        };
        self.ctx_stack.push(GdsContext::Struct(name.clone()));
        // Parse [GdsElement] records until hitting a [GdsRecord::EndStruct]
        let mut elems = Vec::<GdsElement>::new();
        loop {
            let r = self.next()?;
            match r {
                GdsRecord::EndStruct => break, // End-of-struct
                GdsRecord::Boundary => elems.push(self.parse_boundary()?.into()),
                GdsRecord::Text => elems.push(self.parse_text_elem()?.into()),
                GdsRecord::Path => elems.push(self.parse_path()?.into()),
                GdsRecord::Box => elems.push(self.parse_box()?.into()),
                GdsRecord::StructRef => elems.push(self.parse_struct_ref()?.into()),
                GdsRecord::ArrayRef => elems.push(self.parse_array_ref()?.into()),
                GdsRecord::Node => elems.push(self.parse_node()?.into()),
                GdsRecord::BgnStruct { .. } => {
                    return self.fail(format!("BGNSTR inside unterminated cell `{}`", name))
                }
                GdsRecord::EndLib => {
                    return self.fail(format!("ENDLIB inside unterminated cell `{}`", name))
                }
                // Invalid
                _ => return self.invalid(r),
            };
        }
        let strukt = GdsStructBuilder::default()
            .name(name)
            .dates(GdsDateTimes::decode(&dates))
            .elems(elems);
        let strukt = self.built(strukt.build())?;
        self.ctx_stack.pop();
        Ok(strukt)
    }
    /// Parse one of the optional records common to all elements,
    /// failing if `record` is not among them
    fn parse_common(&mut self, record: GdsRecord, common: &mut ElemCommon) -> GdsResult<()> {
        match record {
            GdsRecord::ElemFlags(d0, d1) => common.elflags = Some(GdsElemFlags(d0, d1)),
            GdsRecord::Plex(d) => common.plex = Some(GdsPlex(d)),
            GdsRecord::PropAttr(attr) => common.properties.push(self.parse_property(attr)?),
            _ => return self.invalid(record),
        };
        Ok(())
    }
    /// Parse a [GdsBoundary]
    fn parse_boundary(&mut self) -> GdsResult<GdsBoundary> {
        self.ctx_stack.push(GdsContext::Boundary);
        let mut b = GdsBoundaryBuilder::default();
        let mut common = ElemCommon::default();
        loop {
            b = match self.next()? {
                GdsRecord::EndElement => break, // End-of-element
                GdsRecord::Layer(d) => b.layer(d),
                GdsRecord::DataType(d) => b.datatype(d),
                GdsRecord::Xy(d) => {
                    let xy = self.parse_points(&d)?;
                    if xy.len() < 3 {
                        return Err(self.malformed("Boundary with fewer than three points"));
                    }
                    b.xy(xy)
                }
                r => {
                    self.parse_common(r, &mut common)?;
                    b
                }
            };
        }
        let mut elem = self.built(b.build())?;
        (elem.elflags, elem.plex, elem.properties) = (common.elflags, common.plex, common.properties);
        self.ctx_stack.pop();
        Ok(elem)
    }
    /// Parse a [GdsPath]
    fn parse_path(&mut self) -> GdsResult<GdsPath> {
        self.ctx_stack.push(GdsContext::Path);
        let mut b = GdsPathBuilder::default();
        let mut common = ElemCommon::default();
        loop {
            b = match self.next()? {
                GdsRecord::EndElement => break, // End-of-element
                GdsRecord::Layer(d) => b.layer(d),
                GdsRecord::DataType(d) => b.datatype(d),
                GdsRecord::Xy(d) => b.xy(self.parse_points(&d)?),
                GdsRecord::Width(d) => b.width(d),
                GdsRecord::PathType(d) => b.path_type(d),
                GdsRecord::BeginExtn(d) => b.begin_extn(d),
                GdsRecord::EndExtn(d) => b.end_extn(d),
                r => {
                    self.parse_common(r, &mut common)?;
                    b
                }
            };
        }
        let mut elem = self.built(b.build())?;
        (elem.elflags, elem.plex, elem.properties) = (common.elflags, common.plex, common.properties);
        self.ctx_stack.pop();
        Ok(elem)
    }
    /// Parse a [GdsTextElem].
    /// Requires the initial `Text` record has already been parsed.
    fn parse_text_elem(&mut self) -> GdsResult<GdsTextElem> {
        self.ctx_stack.push(GdsContext::Text);
        let mut b = GdsTextElemBuilder::default();
        let mut common = ElemCommon::default();
        loop {
            b = match self.next()? {
                GdsRecord::EndElement => break, // End-of-element
                GdsRecord::Layer(d) => b.layer(d),
                GdsRecord::TextType(d) => b.texttype(d),
                GdsRecord::Xy(d) => b.xy(self.parse_point(&d)?),
                GdsRecord::String(d) => b.string(d),
                GdsRecord::Presentation(d0, d1) => b.presentation(GdsPresentation(d0, d1)),
                GdsRecord::PathType(d) => b.path_type(d),
                GdsRecord::Width(d) => b.width(d),
                GdsRecord::Strans(d0, d1) => b.strans(self.parse_strans(d0, d1)?),
                r => {
                    self.parse_common(r, &mut common)?;
                    b
                }
            };
        }
        let mut elem = self.built(b.build())?;
        (elem.elflags, elem.plex, elem.properties) = (common.elflags, common.plex, common.properties);
        self.ctx_stack.pop();
        Ok(elem)
    }
    /// Parse a [GdsNode]
    fn parse_node(&mut self) -> GdsResult<GdsNode> {
        self.ctx_stack.push(GdsContext::Node);
        let mut b = GdsNodeBuilder::default();
        let mut common = ElemCommon::default();
        loop {
            b = match self.next()? {
                GdsRecord::EndElement => break, // End-of-element
                GdsRecord::Layer(d) => b.layer(d),
                GdsRecord::Nodetype(d) => b.nodetype(d),
                GdsRecord::Xy(d) => b.xy(self.parse_points(&d)?),
                r => {
                    self.parse_common(r, &mut common)?;
                    b
                }
            };
        }
        let mut elem = self.built(b.build())?;
        (elem.elflags, elem.plex, elem.properties) = (common.elflags, common.plex, common.properties);
        self.ctx_stack.pop();
        Ok(elem)
    }
    /// Parse a [GdsBox]
    fn parse_box(&mut self) -> GdsResult<GdsBox> {
        self.ctx_stack.push(GdsContext::Box);
        let mut b = GdsBoxBuilder::default();
        let mut common = ElemCommon::default();
        loop {
            b = match self.next()? {
                GdsRecord::EndElement => break, // End-of-element
                GdsRecord::Layer(d) => b.layer(d),
                GdsRecord::BoxType(d) => b.boxtype(d),
                GdsRecord::Xy(d) => {
                    let xy: [GdsPoint; 5] = match self.parse_points(&d)?.try_into() {
                        Ok(xy) => xy,
                        Err(_) => return Err(self.malformed("Box XY must have five points")),
                    };
                    b.xy(xy)
                }
                r => {
                    self.parse_common(r, &mut common)?;
                    b
                }
            };
        }
        let mut elem = self.built(b.build())?;
        (elem.elflags, elem.plex, elem.properties) = (common.elflags, common.plex, common.properties);
        self.ctx_stack.pop();
        Ok(elem)
    }
    /// Parse a [GdsStructRef]
    fn parse_struct_ref(&mut self) -> GdsResult<GdsStructRef> {
        self.ctx_stack.push(GdsContext::StructRef);
        let mut b = GdsStructRefBuilder::default();
        let mut common = ElemCommon::default();
        loop {
            b = match self.next()? {
                GdsRecord::EndElement => break, // End-of-element
                GdsRecord::StructRefName(d) => b.name(d),
                GdsRecord::Xy(d) => b.xy(self.parse_point(&d)?),
                GdsRecord::Strans(d0, d1) => b.strans(self.parse_strans(d0, d1)?),
                r => {
                    self.parse_common(r, &mut common)?;
                    b
                }
            };
        }
        let mut elem = self.built(b.build())?;
        (elem.elflags, elem.plex, elem.properties) = (common.elflags, common.plex, common.properties);
        self.ctx_stack.pop();
        Ok(elem)
    }
    /// Parse a [GdsArrayRef]
    fn parse_array_ref(&mut self) -> GdsResult<GdsArrayRef> {
        self.ctx_stack.push(GdsContext::ArrayRef);
        let mut b = GdsArrayRefBuilder::default();
        let mut common = ElemCommon::default();
        loop {
            b = match self.next()? {
                GdsRecord::EndElement => break, // End-of-element
                GdsRecord::StructRefName(d) => b.name(d),
                GdsRecord::ColRow { cols, rows } => {
                    if cols < 1 || rows < 1 {
                        return Err(self.malformed(format!(
                            "Invalid array dimensions {} cols x {} rows",
                            cols, rows
                        )));
                    }
                    b.cols(cols).rows(rows)
                }
                GdsRecord::Xy(d) => {
                    let xy: [GdsPoint; 3] = match self.parse_points(&d)?.try_into() {
                        Ok(xy) => xy,
                        Err(_) => return Err(self.malformed("ArrayRef XY must have three points")),
                    };
                    b.xy(xy)
                }
                GdsRecord::Strans(d0, d1) => b.strans(self.parse_strans(d0, d1)?),
                r => {
                    self.parse_common(r, &mut common)?;
                    b
                }
            };
        }
        let mut elem = self.built(b.build())?;
        (elem.elflags, elem.plex, elem.properties) = (common.elflags, common.plex, common.properties);
        self.ctx_stack.pop();
        Ok(elem)
    }
    /// Parse a [GdsStrans] from records. Header bytes are passed as arguments `d0`, `d1`.
    fn parse_strans(&mut self, d0: u8, d1: u8) -> GdsResult<GdsStrans> {
        let mut s = GdsStrans {
            reflected: d0 & 0x80 != 0,
            abs_mag: d1 & 0x04 != 0,
            abs_angle: d1 & 0x02 != 0,
            ..Default::default()
        };
        if (s.abs_mag || s.abs_angle) && !self.found_abs {
            // Warn once per library
            self.found_abs = true;
            warn!("Absolute magnification and angle are treated as relative when flattening");
        }
        // And parse optional magnitude & angle
        loop {
            let (mag, angle) = match self.peek() {
                GdsRecord::Mag(d) => (Some(*d), None),
                GdsRecord::Angle(d) => (None, Some(*d)),
                _ => break,
            };
            self.next()?; // Advance the iterator
            if let Some(mag) = mag {
                if !(mag > 0.0) {
                    return Err(self.malformed(format!("Invalid magnification {}", mag)));
                }
                s.mag = Some(mag);
            }
            if angle.is_some() {
                s.angle = angle;
            }
        }
        Ok(s)
    }
    /// Parse a [GdsProperty]
    /// Numeric attribute `attr` is collected beforehand, as its record is the indication to parse an (attr, value) pair.
    fn parse_property(&mut self, attr: i16) -> GdsResult<GdsProperty> {
        self.ctx_stack.push(GdsContext::Property);
        // `PropAttr` records must *immediately* be followed by `PropValue`
        let value = match self.next()? {
            GdsRecord::PropValue(v) => v,
            _ => return self.fail("Gds Property without PropValue"),
        };
        self.ctx_stack.pop();
        Ok(GdsProperty { attr, value })
    }
    /// Parse an XY record's coordinates into points
    fn parse_points(&self, d: &[i32]) -> GdsResult<Vec<GdsPoint>> {
        match GdsPoint::parse_vec(d) {
            Some(pts) => Ok(pts),
            None => Err(self.malformed("XY record with an odd number of coordinates")),
        }
    }
    /// Parse an XY record holding exactly one point
    fn parse_point(&self, d: &[i32]) -> GdsResult<GdsPoint> {
        match d {
            [x, y] => Ok(GdsPoint::new(*x, *y)),
            _ => Err(self.malformed("XY record must hold a single point")),
        }
    }
    /// Convert a builder result, failing on missing required fields
    fn built<T, E: std::fmt::Display>(&self, res: Result<T, E>) -> GdsResult<T> {
        res.or_else(|e| self.fail(format!("Incomplete element: {}", e)))
    }
    /// Error helper for malformed record content
    fn malformed(&self, msg: impl Into<String>) -> GdsError {
        GdsError::Format {
            msg: msg.into(),
            offset: self.offset,
        }
    }
    /// Error helper for an invalid record
    fn invalid<T>(&self, record: GdsRecord) -> GdsResult<T> {
        Err(GdsError::Structural {
            msg: format!("Unexpected {:?} record", record.rtype()),
            record: Some(record),
            recordnum: self.numread,
            offset: self.offset,
            ctx: self.ctx_stack.clone(),
        })
    }
}
impl<R: Read> ErrorHelper for GdsParser<R> {
    type Error = GdsError;

    /// Create a [GdsError::Structural], annotated with our position and context
    fn err(&self, msg: impl Into<String>) -> GdsError {
        GdsError::Structural {
            msg: msg.into(),
            record: None,
            recordnum: self.numread,
            offset: self.offset,
            ctx: self.ctx_stack.clone(),
        }
    }
}
impl GdsParser<BufReader<File>> {
    /// Open a GDS file `gds` and write all of its records to JSON file `json`.
    ///
    /// Each entry is a (record-number, byte-offset, record) triple.
    /// Unsupported records are omitted. Records stream one at a time, rather than loading all into memory.
    pub fn dump(gds: impl AsRef<Path>, json: impl AsRef<Path>) -> GdsResult<()> {
        let mut rdr = GdsReader::open(gds)?;
        let mut w = BufWriter::new(File::create(json)?);
        writeln!(w, "[")?;
        let mut numread = 0;
        loop {
            let offset = rdr.pos();
            let record = match rdr.read_record() {
                Ok(r) => r,
                Err(GdsError::Unsupported { .. }) => continue,
                Err(e) => return Err(e),
            };
            if numread > 0 {
                writeln!(w, ",")?;
            }
            numread += 1;
            let done = record == GdsRecord::EndLib;
            let entry = (numread, offset, record);
            write!(w, "  ")?;
            serde_json::to_writer(&mut w, &entry).map_err(gdsdbutils::ser::Error::from)?;
            if done {
                break;
            }
        }
        writeln!(w, "\n]")?;
        w.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::write::GdsWriter;

    /// Encode a library holding one cell, with references carrying `strans`
    fn lib_bytes(nrefs: usize, strans: (u8, u8)) -> Vec<u8> {
        let mut records = vec![
            GdsRecord::Header { version: 3 },
            GdsRecord::BgnLib { dates: [0; 12] },
            GdsRecord::LibName("lib".into()),
            GdsRecord::Units(1e-3, 1e-9),
            GdsRecord::BgnStruct { dates: [0; 12] },
            GdsRecord::StructName("TOP".into()),
        ];
        for i in 0..nrefs {
            records.extend([
                GdsRecord::StructRef,
                GdsRecord::StructRefName("UNIT".into()),
                GdsRecord::Strans(strans.0, strans.1),
                GdsRecord::Mag(2.0),
                GdsRecord::Xy(vec![i as i32, 0]),
                GdsRecord::EndElement,
            ]);
        }
        records.extend([GdsRecord::EndStruct, GdsRecord::EndLib]);
        let mut bytes = Vec::new();
        let mut wr = GdsWriter::new(&mut bytes);
        for r in records.iter() {
            wr.write_record(r).unwrap();
        }
        drop(wr);
        bytes
    }

    #[test]
    fn notes_absolute_strans_once() -> GdsResult<()> {
        let bytes = lib_bytes(3, (0, 0x04));
        let mut parser = GdsParser::new(GdsReader::new(&bytes[..]))?;
        let lib = parser.parse_lib()?;
        assert!(parser.found_abs);
        for elem in lib.get("TOP").unwrap().elems.iter() {
            match elem {
                GdsElement::GdsStructRef(r) => {
                    let strans = r.strans.as_ref().unwrap();
                    assert!(strans.abs_mag);
                    assert!(!strans.abs_angle);
                    assert_eq!(strans.mag, Some(2.0));
                }
                other => panic!("unexpected element {:?}", other),
            }
        }

        let bytes = lib_bytes(3, (0x80, 0));
        let mut parser = GdsParser::new(GdsReader::new(&bytes[..]))?;
        parser.parse_lib()?;
        assert!(!parser.found_abs);
        Ok(())
    }
}
