//!
//! # GdsDb Command-Line Tools
//!
//! Library half of the `gdsrw` program: reads a GDSII library, writes it back out,
//! and optionally extracts and flattens the hierarchy beneath a root cell.
//!

// Std-Lib
use std::fmt;
use std::path::PathBuf;

// Crates.io
use clap::Parser;
use log::info;

// Workspace Imports
use gdsdb::{GdsError, GdsFlattenOptions, GdsLibrary, GdsReadOptions};
use gdsdbutils::SerializationFormat;

// => The doc-comment on `ProgramOptions` here is displayed by the `clap`-generated help docs =>

/// GDSII Read, Write & Flatten
#[derive(Parser, Debug, Clone)]
#[command(name = "gdsrw", version)]
pub struct ProgramOptions {
    /// GDS Input File
    pub input: PathBuf,
    /// GDS Output File
    pub output: PathBuf,
    /// Flattened GDS Output File
    #[arg(requires = "root")]
    pub flat_output: Option<PathBuf>,
    /// Root cell to extract and flatten
    pub root: Option<String>,
    /// Log level. One of (off, error, warn, info, debug, trace)
    #[arg(long, default_value = "warn")]
    pub log_level: String,
    /// Print library statistics
    #[arg(long)]
    pub stats: bool,
    /// Serialize the input library to this JSON or YAML file
    #[arg(long)]
    pub dump: Option<PathBuf>,
    /// Fail on unsupported records, rather than skipping them
    #[arg(long)]
    pub strict: bool,
    /// Maximum number of flattened elements. Zero for no limit.
    #[arg(long)]
    pub max_elements: Option<usize>,
}

/// # Program Stages
/// Each failure is reported with the stage it occurred in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Read,
    Write,
    Extract,
    Flatten,
    Dump,
}
impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Read => "read",
            Self::Write => "write",
            Self::Extract => "extract",
            Self::Flatten => "flatten",
            Self::Dump => "dump",
        };
        write!(f, "{}", s)
    }
}

/// # Stage Error
#[derive(Debug, thiserror::Error)]
#[error("{stage} failed: {source}")]
pub struct StageError {
    pub stage: Stage,
    pub source: GdsError,
}

/// Create a closure tagging a [GdsError] with `stage`, for use with `map_err`
fn at(stage: Stage) -> impl Fn(GdsError) -> StageError {
    move |source| StageError { stage, source }
}

/// Run the program with `options`
pub fn run(options: &ProgramOptions) -> Result<(), StageError> {
    let read_opts = GdsReadOptions {
        strict: options.strict,
    };
    let lib = GdsLibrary::open_with(&options.input, read_opts).map_err(at(Stage::Read))?;
    for name in lib.names() {
        println!("cell: {}", name);
    }
    if options.stats {
        println!("{:#?}", lib.stats());
    }
    if let Some(dump) = &options.dump {
        let fmt = SerializationFormat::from_path(dump).unwrap_or(SerializationFormat::Json);
        fmt.save(&lib, dump)
            .map_err(|e| at(Stage::Dump)(e.into()))?;
        info!("Dumped `{}` to {:?}", lib.name, dump);
    }
    lib.save(&options.output).map_err(at(Stage::Write))?;

    if let (Some(flat_output), Some(root)) = (&options.flat_output, &options.root) {
        let sub = lib.extract_subtree(root).map_err(at(Stage::Extract))?;
        let flat_opts = GdsFlattenOptions {
            max_elements: match options.max_elements {
                Some(0) => None,
                Some(n) => Some(n),
                None => GdsFlattenOptions::default().max_elements,
            },
        };
        let flat = sub
            .flatten_with(root, root.clone(), flat_opts)
            .map_err(at(Stage::Flatten))?;
        let mut flat_lib = GdsLibrary::new(lib.name.clone());
        flat_lib.units = lib.units.clone();
        flat_lib.insert(flat).map_err(at(Stage::Flatten))?;
        flat_lib.save(flat_output).map_err(at(Stage::Write))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use gdsdb::{GdsBoundary, GdsElement, GdsPoint, GdsStruct, GdsStructRef};
    use tempfile::TempDir;

    /// Write a two-level library to `dir`, returning its path
    fn sample(dir: &TempDir, dangling: bool) -> PathBuf {
        let mut lib = GdsLibrary::new("sample");
        let mut unit = GdsStruct::new("UNIT");
        unit.elems.push(
            GdsBoundary {
                layer: 1,
                datatype: 0,
                xy: GdsPoint::vec(&[(0, 0), (10, 0), (10, 10), (0, 0)]),
                ..Default::default()
            }
            .into(),
        );
        lib.insert(unit).unwrap();
        let mut top = GdsStruct::new("TOP");
        let target = if dangling { "GHOST" } else { "UNIT" };
        top.elems.push(
            GdsStructRef {
                name: target.into(),
                xy: GdsPoint::new(10, 20),
                ..Default::default()
            }
            .into(),
        );
        lib.insert(top).unwrap();
        let path = dir.path().join("sample.gds");
        lib.save(&path).unwrap();
        path
    }
    fn options(args: &[&str]) -> ProgramOptions {
        let mut argv = vec!["gdsrw"];
        argv.extend_from_slice(args);
        ProgramOptions::try_parse_from(argv).unwrap()
    }

    #[test]
    fn parses_arguments() {
        let opts = options(&["in.gds", "out.gds"]);
        assert_eq!(opts.input, PathBuf::from("in.gds"));
        assert_eq!(opts.flat_output, None);
        assert_eq!(opts.log_level, "warn");

        let opts = options(&["in.gds", "out.gds", "flat.gds", "TOP", "--strict", "--max-elements", "5"]);
        assert_eq!(opts.root.as_deref(), Some("TOP"));
        assert!(opts.strict);
        assert_eq!(opts.max_elements, Some(5));

        // A flattened output requires a root cell
        assert!(ProgramOptions::try_parse_from(["gdsrw", "in.gds", "out.gds", "flat.gds"]).is_err());
    }

    #[test]
    fn reads_writes_and_flattens() {
        let dir = TempDir::new().unwrap();
        let input = sample(&dir, false);
        let output = dir.path().join("out.gds");
        let flat = dir.path().join("flat.gds");
        let dump = dir.path().join("dump.yaml");
        let opts = ProgramOptions {
            dump: Some(dump.clone()),
            stats: true,
            ..options(&[
                input.to_str().unwrap(),
                output.to_str().unwrap(),
                flat.to_str().unwrap(),
                "TOP",
            ])
        };
        run(&opts).unwrap();

        let written = GdsLibrary::open(&output).unwrap();
        assert_eq!(written, GdsLibrary::open(&input).unwrap());
        gdsdb::roundtrip(&written).unwrap();

        let flat = GdsLibrary::open(&flat).unwrap();
        assert_eq!(flat.names().collect::<Vec<_>>(), vec!["TOP"]);
        match &flat.get("TOP").unwrap().elems[..] {
            [GdsElement::GdsBoundary(b)] => assert_eq!(b.xy[2], GdsPoint::new(20, 30)),
            other => panic!("unexpected flattened elements {:?}", other),
        }

        let dumped: GdsLibrary = SerializationFormat::Yaml.open(&dump).unwrap();
        assert_eq!(dumped, written);
    }

    #[test]
    fn reports_failing_stage() {
        let dir = TempDir::new().unwrap();
        let input = sample(&dir, true);
        let output = dir.path().join("out.gds");
        let flat = dir.path().join("flat.gds");

        // Dangling references survive the round-trip, but not extraction
        let err = run(&options(&[
            input.to_str().unwrap(),
            output.to_str().unwrap(),
            flat.to_str().unwrap(),
            "TOP",
        ]))
        .unwrap_err();
        assert_eq!(err.stage, Stage::Extract);
        assert!(output.exists());
        assert!(err.to_string().starts_with("extract failed"));

        let missing = dir.path().join("missing.gds");
        let err = run(&options(&[missing.to_str().unwrap(), output.to_str().unwrap()])).unwrap_err();
        assert_eq!(err.stage, Stage::Read);
    }

    #[test]
    fn limits_flattened_elements() {
        let dir = TempDir::new().unwrap();
        let input = sample(&dir, false);
        let output = dir.path().join("out.gds");
        let flat = dir.path().join("flat.gds");
        let args = [
            input.to_str().unwrap(),
            output.to_str().unwrap(),
            flat.to_str().unwrap(),
            "TOP",
        ];
        let opts = ProgramOptions {
            max_elements: Some(1),
            ..options(&args)
        };
        assert!(run(&opts).is_ok());
        let opts = ProgramOptions {
            max_elements: Some(0),
            ..options(&args)
        };
        assert!(run(&opts).is_ok());
    }
}
