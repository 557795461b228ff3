//!
//! # GdsDb Byte-Encoding and Writing
//!

// Std-Lib
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

// Crates.io
use derive_builder::Builder;
use log::info;
use serde::{Deserialize, Serialize};

// Local Imports
use crate::data::*;
use crate::error::{GdsError, GdsResult};
use crate::library::GdsLibrary;

/// Maximum encoded length of a record, including its four header bytes
const MAX_RECORD_LEN: usize = u16::MAX as usize;

/// # Gds Writing Options
#[derive(Debug, Clone, Default, Builder, Deserialize, Serialize, PartialEq, Eq)]
#[builder(pattern = "owned", default)]
pub struct GdsWriteOptions {
    /// Write only this cell, and those it transitively references
    #[builder(setter(into, strip_option))]
    pub root: Option<String>,
    /// Check that all references resolve before writing anything
    pub validate: bool,
}

/// Gds Writing Helper
pub struct GdsWriter<'wr> {
    /// Write Destination
    dest: Box<dyn Write + 'wr>,
    /// Options
    opts: GdsWriteOptions,
    /// Payload encoding buffer
    buf: Vec<u8>,
}
impl<'wr> GdsWriter<'wr> {
    /// Create new [GdsWriter] with destination file `fname`
    pub fn open(fname: impl AsRef<Path>) -> GdsResult<Self> {
        let file = BufWriter::new(File::create(fname)?);
        Ok(Self::new(file))
    }
    /// Create a new [GdsWriter] to destination `dest`
    pub fn new(dest: impl Write + 'wr) -> Self {
        Self::with_options(dest, GdsWriteOptions::default())
    }
    /// Create a new [GdsWriter] to destination `dest`, with [GdsWriteOptions] `opts`
    pub fn with_options(dest: impl Write + 'wr, opts: GdsWriteOptions) -> Self {
        Self {
            dest: Box::new(dest),
            opts,
            buf: Vec::with_capacity(1024),
        }
    }
    /// Write a [GdsLibrary] to the destination.
    /// Fields are written in the Gds-recommended order, and cells in `lib`'s order.
    pub fn write_lib(&mut self, lib: &GdsLibrary) -> GdsResult<()> {
        // Filter down to a subtree, if requested
        let extracted;
        let lib = match self.opts.root.clone() {
            Some(root) => {
                extracted = lib.extract_subtree(&root)?;
                &extracted
            }
            None => lib,
        };
        if self.opts.validate {
            lib.validate()?;
        }
        self.write_record(&GdsRecord::Header {
            version: lib.version,
        })?;
        self.write_record(&GdsRecord::BgnLib {
            dates: lib.dates.encode(),
        })?;
        self.write_record(&GdsRecord::LibName(lib.name.clone()))?;
        self.write_record(&GdsRecord::Units(lib.units.0, lib.units.1))?;
        for strukt in lib.structs() {
            self.write_struct(strukt)?;
        }
        self.write_record(&GdsRecord::EndLib)?;
        self.dest.flush()?;
        info!("Wrote GDSII library `{}`: {} cells", lib.name, lib.len());
        Ok(())
    }
    /// Write [GdsStruct] `strukt` to the destination
    pub fn write_struct(&mut self, strukt: &GdsStruct) -> GdsResult<()> {
        self.write_record(&GdsRecord::BgnStruct {
            dates: strukt.dates.encode(),
        })?;
        self.write_record(&GdsRecord::StructName(strukt.name.clone()))?;
        for elem in strukt.elems.iter() {
            elem.encode(self)?;
        }
        self.write_record(&GdsRecord::EndStruct)
    }
    /// Encode and write [GdsRecord] `record`
    pub fn write_record(&mut self, record: &GdsRecord) -> GdsResult<()> {
        self.buf.clear();
        record.encode_payload(&mut self.buf)?;
        let len = self.buf.len() + 4;
        if len > MAX_RECORD_LEN {
            return Err(GdsError::RecordLen(len));
        }
        let rtype = record.rtype();
        self.dest.write_all(&(len as u16).to_be_bytes())?;
        self.dest.write_all(&[rtype as u8, rtype.dtype() as u8])?;
        self.dest.write_all(&self.buf)?;
        Ok(())
    }
    /// Write the properties shared by all elements, and the closing `ENDEL`
    fn write_elem_tail(&mut self, properties: &[GdsProperty]) -> GdsResult<()> {
        for prop in properties {
            self.write_record(&GdsRecord::PropAttr(prop.attr))?;
            self.write_record(&GdsRecord::PropValue(prop.value.clone()))?;
        }
        self.write_record(&GdsRecord::EndElement)
    }
    /// Write the optional leading `ELFLAGS` and `PLEX` records shared by all elements
    fn write_elem_head(
        &mut self,
        elflags: &Option<GdsElemFlags>,
        plex: &Option<GdsPlex>,
    ) -> GdsResult<()> {
        if let Some(f) = elflags {
            self.write_record(&GdsRecord::ElemFlags(f.0, f.1))?;
        }
        if let Some(p) = plex {
            self.write_record(&GdsRecord::Plex(p.0))?;
        }
        Ok(())
    }
}

/// # Gds Encoding Trait
/// Writes an object as its sequence of [GdsRecord]s
pub trait GdsEncode {
    fn encode(&self, wr: &mut GdsWriter) -> GdsResult<()>;
}
impl GdsEncode for GdsStrans {
    fn encode(&self, wr: &mut GdsWriter) -> GdsResult<()> {
        let d0 = if self.reflected { 0x80 } else { 0 };
        let d1 = (if self.abs_mag { 0x04 } else { 0 }) | (if self.abs_angle { 0x02 } else { 0 });
        wr.write_record(&GdsRecord::Strans(d0, d1))?;
        if let Some(mag) = self.mag {
            wr.write_record(&GdsRecord::Mag(mag))?;
        }
        if let Some(angle) = self.angle {
            wr.write_record(&GdsRecord::Angle(angle))?;
        }
        Ok(())
    }
}
impl GdsEncode for GdsBoundary {
    fn encode(&self, wr: &mut GdsWriter) -> GdsResult<()> {
        wr.write_record(&GdsRecord::Boundary)?;
        wr.write_elem_head(&self.elflags, &self.plex)?;
        wr.write_record(&GdsRecord::Layer(self.layer))?;
        wr.write_record(&GdsRecord::DataType(self.datatype))?;
        wr.write_record(&GdsRecord::Xy(GdsPoint::flatten_vec(&self.xy)))?;
        wr.write_elem_tail(&self.properties)
    }
}
impl GdsEncode for GdsPath {
    fn encode(&self, wr: &mut GdsWriter) -> GdsResult<()> {
        wr.write_record(&GdsRecord::Path)?;
        wr.write_elem_head(&self.elflags, &self.plex)?;
        wr.write_record(&GdsRecord::Layer(self.layer))?;
        wr.write_record(&GdsRecord::DataType(self.datatype))?;
        if let Some(t) = self.path_type {
            wr.write_record(&GdsRecord::PathType(t))?;
        }
        if let Some(w) = self.width {
            wr.write_record(&GdsRecord::Width(w))?;
        }
        if let Some(e) = self.begin_extn {
            wr.write_record(&GdsRecord::BeginExtn(e))?;
        }
        if let Some(e) = self.end_extn {
            wr.write_record(&GdsRecord::EndExtn(e))?;
        }
        wr.write_record(&GdsRecord::Xy(GdsPoint::flatten_vec(&self.xy)))?;
        wr.write_elem_tail(&self.properties)
    }
}
impl GdsEncode for GdsStructRef {
    fn encode(&self, wr: &mut GdsWriter) -> GdsResult<()> {
        wr.write_record(&GdsRecord::StructRef)?;
        wr.write_elem_head(&self.elflags, &self.plex)?;
        wr.write_record(&GdsRecord::StructRefName(self.name.clone()))?;
        if let Some(s) = &self.strans {
            s.encode(wr)?;
        }
        wr.write_record(&GdsRecord::Xy(vec![self.xy.x, self.xy.y]))?;
        wr.write_elem_tail(&self.properties)
    }
}
impl GdsEncode for GdsArrayRef {
    fn encode(&self, wr: &mut GdsWriter) -> GdsResult<()> {
        wr.write_record(&GdsRecord::ArrayRef)?;
        wr.write_elem_head(&self.elflags, &self.plex)?;
        wr.write_record(&GdsRecord::StructRefName(self.name.clone()))?;
        if let Some(s) = &self.strans {
            s.encode(wr)?;
        }
        wr.write_record(&GdsRecord::ColRow {
            cols: self.cols,
            rows: self.rows,
        })?;
        wr.write_record(&GdsRecord::Xy(GdsPoint::flatten_vec(&self.xy)))?;
        wr.write_elem_tail(&self.properties)
    }
}
impl GdsEncode for GdsTextElem {
    fn encode(&self, wr: &mut GdsWriter) -> GdsResult<()> {
        wr.write_record(&GdsRecord::Text)?;
        wr.write_elem_head(&self.elflags, &self.plex)?;
        wr.write_record(&GdsRecord::Layer(self.layer))?;
        wr.write_record(&GdsRecord::TextType(self.texttype))?;
        if let Some(p) = &self.presentation {
            wr.write_record(&GdsRecord::Presentation(p.0, p.1))?;
        }
        if let Some(t) = self.path_type {
            wr.write_record(&GdsRecord::PathType(t))?;
        }
        if let Some(w) = self.width {
            wr.write_record(&GdsRecord::Width(w))?;
        }
        if let Some(s) = &self.strans {
            s.encode(wr)?;
        }
        wr.write_record(&GdsRecord::Xy(vec![self.xy.x, self.xy.y]))?;
        wr.write_record(&GdsRecord::String(self.string.clone()))?;
        wr.write_elem_tail(&self.properties)
    }
}
impl GdsEncode for GdsNode {
    fn encode(&self, wr: &mut GdsWriter) -> GdsResult<()> {
        wr.write_record(&GdsRecord::Node)?;
        wr.write_elem_head(&self.elflags, &self.plex)?;
        wr.write_record(&GdsRecord::Layer(self.layer))?;
        wr.write_record(&GdsRecord::Nodetype(self.nodetype))?;
        wr.write_record(&GdsRecord::Xy(GdsPoint::flatten_vec(&self.xy)))?;
        wr.write_elem_tail(&self.properties)
    }
}
impl GdsEncode for GdsBox {
    fn encode(&self, wr: &mut GdsWriter) -> GdsResult<()> {
        wr.write_record(&GdsRecord::Box)?;
        wr.write_elem_head(&self.elflags, &self.plex)?;
        wr.write_record(&GdsRecord::Layer(self.layer))?;
        wr.write_record(&GdsRecord::BoxType(self.boxtype))?;
        wr.write_record(&GdsRecord::Xy(GdsPoint::flatten_vec(&self.xy)))?;
        wr.write_elem_tail(&self.properties)
    }
}
impl GdsEncode for GdsElement {
    fn encode(&self, wr: &mut GdsWriter) -> GdsResult<()> {
        use GdsElement::*;
        match self {
            GdsBoundary(e) => e.encode(wr),
            GdsPath(e) => e.encode(wr),
            GdsStructRef(e) => e.encode(wr),
            GdsArrayRef(e) => e.encode(wr),
            GdsTextElem(e) => e.encode(wr),
            GdsNode(e) => e.encode(wr),
            GdsBox(e) => e.encode(wr),
        }
    }
}
