//!
//! # GdsDb Layout Database
//!
//! The [GdsLibrary] type: a named, ordered collection of cells,
//! and the hierarchy-level operations upon it.
//!

// Std-Lib
use std::collections::HashSet;
use std::io::{Read, Write};
use std::path::Path;

// Crates.io
use indexmap::IndexMap;
use log::warn;
use serde::{Deserialize, Serialize};

// Workspace Imports
use gdsdbutils::{DepGraph, SerdeFile};

// Local Imports
use crate::data::*;
use crate::error::{GdsError, GdsResult};
use crate::flatten::{GdsFlattenOptions, GdsFlattener};
use crate::read::{GdsParser, GdsReadOptions, GdsReader};
use crate::write::{GdsWriteOptions, GdsWriter};

///
/// # Gds Library
///
/// The Gds Library is the primary layout-database object.
/// It holds a set of uniquely-named [GdsStruct]s (cells),
/// in the order in which they were added, along with library-level metadata.
///
/// References between cells are by name, and need not resolve.
/// Operations which traverse the hierarchy, such as [GdsLibrary::flatten],
/// [GdsLibrary::extract_subtree], and [GdsLibrary::validate], require that they do.
///
/// ```text
/// HEADER BGNLIB [LIBDIRSIZE] [SRFNAME] [LIBSECUR] LIBNAME [REFLIBS] [FONTS] [ATTRTABLE] [GENERATIONS] [<FormatType>]
/// UNITS {<structure>}* ENDLIB
/// ```
///
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct GdsLibrary {
    /// Library Name
    pub name: String,
    /// GDSII Stream Version
    pub version: i16,
    /// Modification & Access Dates & Times
    pub dates: GdsDateTimes,
    /// Spatial Units
    pub units: GdsUnits,
    /// Struct (Cell) Definitions, keyed by name
    pub(crate) structs: IndexMap<String, GdsStruct>,
}
impl Default for GdsLibrary {
    fn default() -> Self {
        Self {
            name: String::new(),
            version: 3,
            dates: GdsDateTimes::default(),
            units: GdsUnits::default(),
            structs: IndexMap::new(),
        }
    }
}
impl GdsLibrary {
    /// Create a new and empty [GdsLibrary]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
    /// Read a GDS loaded from file at path `fname`
    pub fn open(fname: impl AsRef<Path>) -> GdsResult<GdsLibrary> {
        GdsParser::open(fname)?.parse_lib()
    }
    /// Read a GDS loaded from file at path `fname`, with [GdsReadOptions] `opts`
    pub fn open_with(fname: impl AsRef<Path>, opts: GdsReadOptions) -> GdsResult<GdsLibrary> {
        GdsParser::with_options(GdsReader::open(fname)?, opts)?.parse_lib()
    }
    /// Read a [GdsLibrary] from byte-slice `bytes`
    pub fn from_bytes(bytes: &[u8]) -> GdsResult<GdsLibrary> {
        Self::read(bytes)
    }
    /// Read a [GdsLibrary] from `src`
    pub fn read(src: impl Read) -> GdsResult<GdsLibrary> {
        GdsParser::new(GdsReader::new(src))?.parse_lib()
    }
    /// Save to file `fname`
    pub fn save(&self, fname: impl AsRef<Path>) -> GdsResult<()> {
        GdsWriter::open(fname)?.write_lib(self)
    }
    /// Save to file `fname`, with [GdsWriteOptions] `opts`
    pub fn save_with(&self, fname: impl AsRef<Path>, opts: GdsWriteOptions) -> GdsResult<()> {
        let file = std::io::BufWriter::new(std::fs::File::create(fname)?);
        GdsWriter::with_options(file, opts).write_lib(self)
    }
    /// Write to destination `dest`
    pub fn write(&self, dest: impl Write) -> GdsResult<()> {
        GdsWriter::new(dest).write_lib(self)
    }
    /// Encode to a byte-vector
    pub fn to_bytes(&self) -> GdsResult<Vec<u8>> {
        let mut bytes = Vec::new();
        self.write(&mut bytes)?;
        Ok(bytes)
    }

    /// Add [GdsStruct] `strukt`. Fails if a cell of the same name is already defined.
    pub fn insert(&mut self, strukt: GdsStruct) -> GdsResult<()> {
        if self.structs.contains_key(&strukt.name) {
            return Err(GdsError::DuplicateName(strukt.name));
        }
        self.structs.insert(strukt.name.clone(), strukt);
        Ok(())
    }
    /// Add [GdsStruct] `strukt`, replacing and returning any existing cell of the same name.
    /// A replaced cell keeps its position in our order.
    pub fn insert_or_replace(&mut self, strukt: GdsStruct) -> Option<GdsStruct> {
        self.structs.insert(strukt.name.clone(), strukt)
    }
    /// Get a reference to the cell named `name`
    pub fn get(&self, name: &str) -> Option<&GdsStruct> {
        self.structs.get(name)
    }
    /// Get a mutable reference to the cell named `name`
    pub fn get_mut(&mut self, name: &str) -> Option<&mut GdsStruct> {
        self.structs.get_mut(name)
    }
    /// Boolean indication of whether a cell named `name` is defined
    pub fn contains(&self, name: &str) -> bool {
        self.structs.contains_key(name)
    }
    /// Remove and return the cell named `name`. The order of all others is unchanged.
    /// References to it from other cells are left in place, unresolved.
    pub fn remove(&mut self, name: &str) -> Option<GdsStruct> {
        self.structs.shift_remove(name)
    }
    /// Iterate over our cells, in order
    pub fn structs(&self) -> impl Iterator<Item = &GdsStruct> {
        self.structs.values()
    }
    /// Iterate mutably over our cells, in order.
    /// Cell names must not be changed through these references.
    pub fn structs_mut(&mut self) -> impl Iterator<Item = &mut GdsStruct> {
        self.structs.values_mut()
    }
    /// Iterate over our cell names, in order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.structs.keys().map(String::as_str)
    }
    /// Number of cells
    pub fn len(&self) -> usize {
        self.structs.len()
    }
    /// Boolean indication of an empty library
    pub fn is_empty(&self) -> bool {
        self.structs.is_empty()
    }

    /// Create a new library holding the cell named `root` and every cell it transitively references,
    /// in our order. Library-level metadata is copied.
    ///
    /// Fails with [GdsError::CellNotFound] if `root` is not defined,
    /// or [GdsError::MissingReference] if any reachable reference does not resolve.
    /// Reference cycles are not an error here; each cell is copied once.
    pub fn extract_subtree(&self, root: &str) -> GdsResult<GdsLibrary> {
        let top = self
            .get(root)
            .ok_or_else(|| GdsError::CellNotFound(root.to_string()))?;
        let mut keep: HashSet<&str> = HashSet::from([top.name.as_str()]);
        let mut stack = vec![top];
        while let Some(cell) = stack.pop() {
            for name in cell.refs() {
                if keep.contains(name) {
                    continue;
                }
                let child = self.get(name).ok_or_else(|| GdsError::MissingReference {
                    cell: cell.name.clone(),
                    name: name.to_string(),
                })?;
                keep.insert(name);
                stack.push(child);
            }
        }
        let structs = self
            .structs
            .iter()
            .filter(|(name, _)| keep.contains(name.as_str()))
            .map(|(name, s)| (name.clone(), s.clone()))
            .collect();
        Ok(GdsLibrary {
            name: self.name.clone(),
            version: self.version,
            dates: self.dates.clone(),
            units: self.units.clone(),
            structs,
        })
    }
    /// Check that every reference resolves, and that references are free of cycles.
    /// Returns all cell names in dependency order, each cell after every cell it references.
    pub fn validate(&self) -> GdsResult<Vec<String>> {
        let names: Vec<String> = self.structs.keys().cloned().collect();
        self.dep_order(&names)
    }
    /// Get the names of all cells which no other cell references, in our order
    pub fn top_cells(&self) -> Vec<&str> {
        let referenced: HashSet<&str> = self.structs().flat_map(GdsStruct::refs).collect();
        self.names().filter(|n| !referenced.contains(n)).collect()
    }

    /// Flatten the cell named `root` into a new, reference-free [GdsStruct] named `name`.
    /// We are left unmodified.
    pub fn flatten(&self, root: &str, name: impl Into<String>) -> GdsResult<GdsStruct> {
        self.flatten_with(root, name, GdsFlattenOptions::default())
    }
    /// Flatten with [GdsFlattenOptions] `opts`. See [GdsLibrary::flatten].
    pub fn flatten_with(
        &self,
        root: &str,
        name: impl Into<String>,
        opts: GdsFlattenOptions,
    ) -> GdsResult<GdsStruct> {
        GdsFlattener::new(self, opts).flatten(root, name)
    }
    /// Flatten the cell named `root`, and add the result to ourselves as cell `name`.
    /// An existing cell named `name` is replaced.
    pub fn flatten_into(&mut self, root: &str, name: impl Into<String>) -> GdsResult<()> {
        let flat = self.flatten(root, name)?;
        let flat_name = flat.name.clone();
        if self.insert_or_replace(flat).is_some() {
            warn!("Replaced existing cell `{}` with flattened `{}`", flat_name, root);
        }
        Ok(())
    }

    /// Collect and return the library's aggregate statistics
    /// (numbers of structs, elements by type)
    pub fn stats(&self) -> GdsStats {
        let mut stats = GdsStats {
            libraries: 1,
            ..Default::default()
        };
        for strukt in self.structs() {
            stats += strukt.stats();
        }
        stats
    }
    /// Set the library and all its structs' modification and access times
    pub fn set_all_dates(&mut self, time: impl Into<GdsDateTime>) {
        let time: GdsDateTime = time.into();
        let dates = GdsDateTimes::from(time);
        for strukt in self.structs.values_mut() {
            strukt.dates = dates.clone();
        }
        self.dates = dates;
    }
}
impl DepGraph for GdsLibrary {
    type Item = String;
    type Error = GdsError;

    /// Get the names referenced by cell `item`, failing if any are undefined
    fn deps(&self, item: &String) -> GdsResult<Vec<String>> {
        let cell = self
            .get(item)
            .ok_or_else(|| GdsError::CellNotFound(item.clone()))?;
        let mut deps: Vec<String> = Vec::new();
        for name in cell.refs() {
            if !self.contains(name) {
                return Err(GdsError::MissingReference {
                    cell: item.clone(),
                    name: name.to_string(),
                });
            }
            if !deps.iter().any(|d| d == name) {
                deps.push(name.to_string());
            }
        }
        Ok(deps)
    }
    fn cycle(&self, path: Vec<String>) -> GdsError {
        GdsError::CyclicReference { path }
    }
}
// Enable [GdsLibrary] and [GdsStruct] serialization to file, in each of `gdsdbutils` supported formats.
impl SerdeFile for GdsLibrary {}
impl SerdeFile for GdsStruct {}
