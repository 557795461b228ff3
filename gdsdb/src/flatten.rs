//!
//! # Hierarchy Flattening
//!
//! Resolves every [GdsStructRef] and [GdsArrayRef] beneath a cell into transformed copies
//! of the referenced cells' primitive elements, producing a single reference-free cell.
//!

// Std-Lib
use std::collections::HashMap;

// Crates.io
use derive_builder::Builder;
use log::info;
use serde::{Deserialize, Serialize};

// Local Imports
use crate::data::*;
use crate::error::{GdsError, GdsResult};
use crate::library::GdsLibrary;
use crate::transform::{Transform, Transformable};

/// Default cap on the number of flattened elements
pub const DEFAULT_MAX_ELEMENTS: usize = 10_000_000;

/// # Gds Flattening Options
#[derive(Debug, Clone, Builder, Deserialize, Serialize, PartialEq, Eq)]
#[builder(pattern = "owned", default)]
pub struct GdsFlattenOptions {
    /// Maximum number of elements in the flattened result. `None` for no limit.
    pub max_elements: Option<usize>,
}
impl Default for GdsFlattenOptions {
    fn default() -> Self {
        Self {
            max_elements: Some(DEFAULT_MAX_ELEMENTS),
        }
    }
}

///
/// # Gds Flattener
///
/// Flattens in two depth-first passes over a [GdsLibrary]'s reference hierarchy.
///
/// The first counts the primitives each reachable cell flattens to, once per cell.
/// It tracks the path of cells from the root to its current position,
/// failing upon revisiting any of them, or upon any undefined reference.
/// A total above [GdsFlattenOptions::max_elements] fails before any element is copied.
///
/// The second copies each primitive through the composition of every placement above it,
/// skipping references to cells which flatten to nothing.
/// Primitives under an identity transform are copied unchanged.
/// Array instances are visited row by row, and column by column within each row.
///
pub struct GdsFlattener<'lib> {
    /// Source library
    lib: &'lib GdsLibrary,
    /// Options
    opts: GdsFlattenOptions,
    /// Number of flattened primitives per cell, for each cell counted so far
    counts: HashMap<&'lib str, usize>,
    /// Cells currently being counted, from the root down
    path: Vec<&'lib str>,
    /// Flattened elements
    elems: Vec<GdsElement>,
}
impl<'lib> GdsFlattener<'lib> {
    /// Create a new [GdsFlattener] over `lib`
    pub fn new(lib: &'lib GdsLibrary, opts: GdsFlattenOptions) -> Self {
        Self {
            lib,
            opts,
            counts: HashMap::new(),
            path: Vec::new(),
            elems: Vec::new(),
        }
    }
    /// Flatten the cell named `root` into a new [GdsStruct] named `name`
    pub fn flatten(mut self, root: &str, name: impl Into<String>) -> GdsResult<GdsStruct> {
        let top = self
            .lib
            .get(root)
            .ok_or_else(|| GdsError::CellNotFound(root.to_string()))?;
        let total = self.count(top)?;
        if let Some(limit) = self.opts.max_elements {
            if total > limit {
                return Err(GdsError::ElementLimit { limit });
            }
        }
        self.flatten_cell(top, &Transform::identity())?;
        let name = name.into();
        info!(
            "Flattened cell `{}` into `{}`: {} elements",
            root,
            name,
            self.elems.len()
        );
        Ok(GdsStruct {
            name,
            dates: GdsDateTimes::default(),
            elems: self.elems,
        })
    }
    /// Count the primitives `cell` flattens to, saturating at `usize::MAX`.
    /// Fails on reference cycles and undefined references.
    fn count(&mut self, cell: &'lib GdsStruct) -> GdsResult<usize> {
        if let Some(n) = self.counts.get(cell.name.as_str()) {
            return Ok(*n);
        }
        if let Some(start) = self.path.iter().position(|p| *p == cell.name) {
            let mut path: Vec<String> = self.path[start..].iter().map(|p| p.to_string()).collect();
            path.push(cell.name.clone());
            return Err(GdsError::CyclicReference { path });
        }
        self.path.push(&cell.name);
        let mut total: usize = 0;
        for elem in cell.elems.iter() {
            let n = match elem {
                GdsElement::GdsStructRef(sref) => {
                    let child = self.resolve(cell, &sref.name)?;
                    self.count(child)?
                }
                GdsElement::GdsArrayRef(aref) => {
                    let child = self.resolve(cell, &aref.name)?;
                    self.count(child)?.saturating_mul(aref.len())
                }
                _ => 1,
            };
            total = total.saturating_add(n);
        }
        self.path.pop();
        self.counts.insert(&cell.name, total);
        Ok(total)
    }
    /// Add the elements of `cell`, and of all cells it references, under transform `trans`
    fn flatten_cell(&mut self, cell: &'lib GdsStruct, trans: &Transform) -> GdsResult<()> {
        for elem in cell.elems.iter() {
            match elem {
                GdsElement::GdsStructRef(sref) => {
                    let child = self.resolve(cell, &sref.name)?;
                    if self.is_empty(child) {
                        continue;
                    }
                    let local = Transform::from_strans(&sref.xy, sref.strans.as_ref());
                    self.flatten_cell(child, &Transform::cascade(trans, &local))?;
                }
                GdsElement::GdsArrayRef(aref) => {
                    let child = self.resolve(cell, &aref.name)?;
                    if self.is_empty(child) {
                        continue;
                    }
                    let base = Transform::from_strans(&aref.xy[0], aref.strans.as_ref());
                    let (col_step, row_step) = (aref.col_step(), aref.row_step());
                    for row in 0..aref.rows {
                        for col in 0..aref.cols {
                            let (c, r) = (f64::from(col), f64::from(row));
                            // Steps are in our own coordinates, so offset the instance before cascading
                            let local = Transform {
                                dx: base.dx + c * col_step.0 + r * row_step.0,
                                dy: base.dy + c * col_step.1 + r * row_step.1,
                                ..base
                            };
                            self.flatten_cell(child, &Transform::cascade(trans, &local))?;
                        }
                    }
                }
                prim => self.push(prim, trans),
            }
        }
        Ok(())
    }
    /// Look up the cell named `name`, referenced from `cell`
    fn resolve(&self, cell: &GdsStruct, name: &str) -> GdsResult<&'lib GdsStruct> {
        self.lib.get(name).ok_or_else(|| GdsError::MissingReference {
            cell: cell.name.clone(),
            name: name.to_string(),
        })
    }
    /// Boolean indication of whether `cell` was counted as flattening to no primitives
    fn is_empty(&self, cell: &GdsStruct) -> bool {
        self.counts.get(cell.name.as_str()) == Some(&0)
    }
    /// Add a transformed copy of primitive `elem`
    fn push(&mut self, elem: &GdsElement, trans: &Transform) {
        let elem = if trans.is_identity() {
            elem.clone()
        } else {
            match elem {
                GdsElement::GdsBoundary(e) => e.transform(trans).into(),
                GdsElement::GdsPath(e) => e.transform(trans).into(),
                GdsElement::GdsTextElem(e) => e.transform(trans).into(),
                GdsElement::GdsNode(e) => e.transform(trans).into(),
                GdsElement::GdsBox(e) => e.transform(trans).into(),
                // References are resolved by the caller, and never reach here
                GdsElement::GdsStructRef(_) | GdsElement::GdsArrayRef(_) => elem.clone(),
            }
        };
        self.elems.push(elem);
    }
}
