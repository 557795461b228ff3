//!
//! # GdsDb Hierarchical Layout Database
//!
//! GDSII is the IC industry's de facto standard for storing and sharing layout data.
//! GdsDb reads GDSII streams into an in-memory database of named cells,
//! writes them back out, and manipulates their hierarchy:
//! extracting the subtree beneath a cell, validating references, and flattening.
//! Layout data is stored on GDSII's terms, using GDSII's idioms and naming conventions.
//!
//! Layout data is represented in three primary forms:
//!
//! * A short tree with three layers:
//!   * The root is a [GdsLibrary], which primarily consists of a set of uniquely-named cells ([GdsStruct]s), and secondarily a set of metadata.
//!     Each [GdsLibrary] is a universe unto itself, in that it has no mechanisms for comprehending layout cells defined outside itself.
//!   * Cells ([GdsStruct]s) consist of ordered vectors of [GdsElement]s.
//!   * [GdsElement]s include polygons ([GdsBoundary]), paths ([GdsPath]),
//!     single and arrayed instances of other cells ([GdsStructRef], [GdsArrayRef]), text ([GdsTextElem]), and a few others.
//!     Instances refer to cells by name. Names need not resolve until the hierarchy is traversed.
//! * For storage, the [GdsLibrary] tree is converted to a series of [GdsRecord]s.
//! * Records are stored in binary form, each with a length, record-type, and data-type header.
//!   These raw bytes are never stored by GdsDb, only produced and consumed on their way into and out of [Read](std::io::Read) and [Write](std::io::Write) objects.
//!
//! ## Flattening
//!
//! [GdsLibrary::flatten] resolves all instances beneath a cell into a single cell of primitive elements,
//! each placed through the [Transform]s of every instance above it.
//! Reference cycles and undefined references are reported as errors.
//!
//! ## Alternate Serialization
//!
//! Each element in the [GdsLibrary] tree is [serde]-serializable,
//! to JSON and YAML via [gdsdbutils::SerializationFormat].
//!
//! ## Usage
//!
//! Creating a [GdsLibrary], adding cells, and flattening:
//!
//! ```
//! use gdsdb::{GdsBoundary, GdsLibrary, GdsPoint, GdsStruct, GdsStructRef};
//!
//! let mut lib = GdsLibrary::new("mylib");
//! let mut unit = GdsStruct::new("unit");
//! unit.elems.push(GdsBoundary {
//!     layer: 1,
//!     datatype: 0,
//!     xy: GdsPoint::vec(&[(0, 0), (1, 0), (1, 1), (0, 0)]),
//!     ..Default::default()
//! }.into());
//! lib.insert(unit).unwrap();
//!
//! let mut top = GdsStruct::new("top");
//! top.elems.push(GdsStructRef {
//!     name: "unit".into(),
//!     xy: GdsPoint::new(10, 20),
//!     ..Default::default()
//! }.into());
//! lib.insert(top).unwrap();
//!
//! let flat = lib.flatten("top", "top_flat").unwrap();
//! assert_eq!(flat.elems.len(), 1);
//! ```
//!
//! Loading and saving:
//!
//! ```skip
//! let lib = GdsLibrary::open("sample.gds")?;
//! lib.save("copy.gds")?;
//! ```
//!

pub mod data;
pub use data::*;
pub mod error;
pub use error::*;
pub mod flatten;
pub use flatten::*;
pub mod library;
pub use library::*;
pub mod read;
pub use read::*;
pub mod transform;
pub use transform::*;
pub mod write;
pub use write::*;

#[cfg(test)]
mod tests;

/// Check `lib` matches across a write-read round-trip cycle
#[cfg(any(test, feature = "selftest"))]
pub fn roundtrip(lib: &GdsLibrary) -> GdsResult<()> {
    use std::io::{BufReader, Seek, SeekFrom};
    use tempfile::tempfile;

    // Write to a temporary file
    let mut file = tempfile()?;
    lib.write(&mut file)?;
    // Rewind to the file-start, and read it back
    file.seek(SeekFrom::Start(0))?;
    let lib2 = GdsLibrary::read(BufReader::new(file))?;
    // And check the two line up, including cell order
    assert_eq!(*lib, lib2);
    assert!(lib.names().eq(lib2.names()));
    Ok(())
}
