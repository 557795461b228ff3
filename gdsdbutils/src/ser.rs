//!
//! # Text Serialization Utilities
//!
//! Dumping and loading of [serde]-compatible data to and from JSON and YAML,
//! typically for inspection and golden-data comparison of binary layout.
//!

// Std-Lib
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

// Crates.io
use serde::de::DeserializeOwned;
use serde::Serialize;
use textwrap::dedent;

/// # Supported Text Serialization Formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SerializationFormat {
    Json,
    Yaml,
}
impl SerializationFormat {
    /// Infer the format from the extension of file-path `fname`.
    /// Returns `None` for unknown or missing extensions.
    pub fn from_path(fname: impl AsRef<Path>) -> Option<Self> {
        let ext = fname.as_ref().extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "json" => Some(Self::Json),
            "yaml" | "yml" => Some(Self::Yaml),
            _ => None,
        }
    }
    /// Serialize `data` to a string
    pub fn to_string(&self, data: &impl Serialize) -> Result<String, Error> {
        let s = match self {
            Self::Json => serde_json::to_string_pretty(data)?,
            Self::Yaml => serde_yaml::to_string(data)?,
        };
        Ok(s)
    }
    /// Parse `s`. Leading indentation common to all lines is removed first,
    /// so that indented string-literals in tests parse as expected.
    pub fn from_str<T: DeserializeOwned>(&self, s: &str) -> Result<T, Error> {
        let s = dedent(s);
        let rv = match self {
            Self::Json => serde_json::from_str(&s)?,
            Self::Yaml => serde_yaml::from_str(&s)?,
        };
        Ok(rv)
    }
    /// Save `data` to file `fname`
    pub fn save(&self, data: &impl Serialize, fname: impl AsRef<Path>) -> Result<(), Error> {
        let mut file = BufWriter::new(std::fs::File::create(fname)?);
        match self {
            Self::Json => serde_json::to_writer_pretty(&mut file, data)?,
            Self::Yaml => serde_yaml::to_writer(&mut file, data)?,
        };
        file.flush()?;
        Ok(())
    }
    /// Load from file `fname`
    pub fn open<T: DeserializeOwned>(&self, fname: impl AsRef<Path>) -> Result<T, Error> {
        let file = BufReader::new(std::fs::File::open(fname)?);
        let rv = match self {
            Self::Json => serde_json::from_reader(file)?,
            Self::Yaml => serde_yaml::from_reader(file)?,
        };
        Ok(rv)
    }
}

/// # Serialization to & from File
///
/// Fully default-implemented; serde-compatible types opt in with an empty `impl`.
pub trait SerdeFile: Serialize + DeserializeOwned {
    /// Save in format `fmt` to file `fname`
    fn save_as(&self, fmt: SerializationFormat, fname: impl AsRef<Path>) -> Result<(), Error> {
        fmt.save(self, fname)
    }
    /// Open from format-`fmt` file `fname`
    fn open_as(fname: impl AsRef<Path>, fmt: SerializationFormat) -> Result<Self, Error> {
        fmt.open(fname)
    }
}

/// # Serialization Errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("yaml: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}
