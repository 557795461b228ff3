//!
//! # Error-Helper Utilities
//!
//! ```rust
//! use gdsdbutils::error::{ErrorHelper, Unwrapper};
//!
//! /// Tree-walker which reports its current depth upon failure
//! struct Walker {
//!     depth: usize,
//! }
//! impl ErrorHelper for Walker {
//!     type Error = String;
//!     fn err(&self, msg: impl Into<String>) -> Self::Error {
//!         format!("{} (at depth {})", msg.into(), self.depth)
//!     }
//! }
//! impl Walker {
//!     fn walk(&self) -> Result<i32, String> {
//!         let x = Some(5).unwrapper(self, "missing x")?;
//!         self.assert(x > 0, "x must be positive")?;
//!         Ok(x)
//!     }
//! }
//! assert_eq!(Walker { depth: 3 }.walk(), Ok(5));
//! ```
//!

///
/// # ErrorHelper
///
/// Shared by the parsers and tree-walkers which carry state worth reporting on failure,
/// e.g. a byte offset or a stack of nested contexts.
/// Implementers provide `err`; the remaining methods are default-implemented on top of it.
///
pub trait ErrorHelper {
    type Error;

    /// Create a [Self::Error], annotated with our current state
    fn err(&self, msg: impl Into<String>) -> Self::Error;
    /// Return failure
    fn fail<T>(&self, msg: impl Into<String>) -> Result<T, Self::Error> {
        Err(self.err(msg))
    }
    /// Unwrap `opt`, failing with `msg` if it is [None]
    fn unwrap<T>(&self, opt: Option<T>, msg: impl Into<String>) -> Result<T, Self::Error> {
        match opt {
            Some(val) => Ok(val),
            None => self.fail(msg),
        }
    }
    /// Fail with `msg` unless `cond` holds
    fn assert(&self, cond: bool, msg: impl Into<String>) -> Result<(), Self::Error> {
        if cond {
            Ok(())
        } else {
            self.fail(msg)
        }
    }
}

///
/// # Unwrapper
///
/// Post-fix form of [ErrorHelper::unwrap], implemented for [Option] and [Result].
/// Failures are routed through the helper's `fail` rather than panicking.
/// The original error of a [Result] is discarded in favor of the helper's.
///
pub trait Unwrapper {
    type Ok;
    fn unwrapper<H: ErrorHelper>(self, helper: &H, msg: impl Into<String>) -> Result<Self::Ok, H::Error>;
}
impl<T> Unwrapper for Option<T> {
    type Ok = T;
    fn unwrapper<H: ErrorHelper>(self, helper: &H, msg: impl Into<String>) -> Result<T, H::Error> {
        helper.unwrap(self, msg)
    }
}
impl<T, E> Unwrapper for Result<T, E> {
    type Ok = T;
    fn unwrapper<H: ErrorHelper>(self, helper: &H, msg: impl Into<String>) -> Result<T, H::Error> {
        helper.unwrap(self.ok(), msg)
    }
}
