use super::*;
use gdsdbutils::{SerdeFile, SerializationFormat};

/// Fixed dates, so that constructed libraries compare equal
fn dates() -> GdsDateTimes {
    GdsDateTime {
        year: 124,
        month: 10,
        day: 18,
        hour: 9,
        minute: 30,
        second: 0,
    }
    .into()
}
/// Create a cell named `name` with elements `elems`
fn cell(name: &str, elems: Vec<GdsElement>) -> GdsStruct {
    GdsStruct {
        name: name.into(),
        dates: dates(),
        elems,
    }
}
/// Create a library of `cells`
fn library(cells: Vec<GdsStruct>) -> GdsLibrary {
    let mut lib = GdsLibrary::new("testlib");
    lib.dates = dates();
    for c in cells {
        lib.insert(c).unwrap();
    }
    lib
}
/// A 10x10 square boundary with its corner at the origin
fn square() -> GdsElement {
    GdsBoundary {
        layer: 1,
        datatype: 0,
        xy: GdsPoint::vec(&[(0, 0), (10, 0), (10, 10), (0, 10), (0, 0)]),
        ..Default::default()
    }
    .into()
}
/// A reference to `name` at (x,y)
fn sref(name: &str, x: i32, y: i32) -> GdsElement {
    GdsStructRef {
        name: name.into(),
        xy: GdsPoint::new(x, y),
        ..Default::default()
    }
    .into()
}
/// Get the points of boundary `elem`
fn boundary_xy(elem: &GdsElement) -> &[GdsPoint] {
    match elem {
        GdsElement::GdsBoundary(b) => &b.xy,
        _ => panic!("expected a boundary, got {:?}", elem),
    }
}
/// Encode a sequence of records
fn encode(records: &[GdsRecord]) -> Vec<u8> {
    let mut bytes = Vec::new();
    let mut wr = GdsWriter::new(&mut bytes);
    for r in records {
        wr.write_record(r).unwrap();
    }
    drop(wr);
    bytes
}
/// Records opening a library
fn lib_head() -> Vec<GdsRecord> {
    vec![
        GdsRecord::Header { version: 3 },
        GdsRecord::BgnLib { dates: [0; 12] },
        GdsRecord::LibName("testlib".into()),
        GdsRecord::Units(1e-3, 1e-9),
    ]
}
/// Records of an empty cell named `name`
fn empty_cell(name: &str) -> Vec<GdsRecord> {
    vec![
        GdsRecord::BgnStruct { dates: [0; 12] },
        GdsRecord::StructName(name.into()),
        GdsRecord::EndStruct,
    ]
}

#[test]
fn floats() {
    let vals = vec![1.0, 0.5, -2.0, 1e-3, 1e-9, 1e-11, 90.0, 123.456];
    for val in vals {
        assert_eq!(val, GdsFloat64::decode(GdsFloat64::encode(val)));
    }
    assert_eq!(GdsFloat64::encode(0.0), 0);
    assert_eq!(GdsFloat64::encode(1.0), 0x4110_0000_0000_0000);
    assert_eq!(GdsFloat64::decode(0xC110_0000_0000_0000), -1.0);
}

#[test]
fn it_instantiates() -> GdsResult<()> {
    let lib = library(vec![
        cell("unit", vec![square()]),
        cell("top", vec![sref("unit", 10, 20)]),
    ]);
    assert_eq!(lib.len(), 2);
    assert_eq!(lib.names().collect::<Vec<_>>(), vec!["unit", "top"]);
    roundtrip(&lib)
}

#[test]
fn it_roundtrips_every_element() -> GdsResult<()> {
    let unit = cell(
        "unit",
        vec![
            GdsBoundary {
                layer: 1,
                datatype: 2,
                xy: GdsPoint::vec(&[(0, 0), (5, 0), (5, 5), (0, 0)]),
                elflags: Some(GdsElemFlags(0, 1)),
                plex: Some(GdsPlex(7)),
                properties: vec![GdsProperty {
                    attr: 1,
                    value: "net=vdd".into(),
                }],
            }
            .into(),
            GdsPath {
                layer: 3,
                datatype: 0,
                xy: GdsPoint::vec(&[(0, 0), (0, 100), (50, 100)]),
                width: Some(6),
                path_type: Some(4),
                begin_extn: Some(2),
                end_extn: Some(3),
                ..Default::default()
            }
            .into(),
            GdsTextElem {
                string: "hello".into(),
                layer: 10,
                texttype: 0,
                xy: GdsPoint::new(3, 4),
                presentation: Some(GdsPresentation(0, 5)),
                strans: Some(GdsStrans {
                    angle: Some(90.0),
                    ..Default::default()
                }),
                ..Default::default()
            }
            .into(),
            GdsNode {
                layer: 4,
                nodetype: 1,
                xy: GdsPoint::vec(&[(1, 1), (2, 2)]),
                ..Default::default()
            }
            .into(),
            GdsBox {
                layer: 5,
                boxtype: 0,
                xy: [
                    GdsPoint::new(0, 0),
                    GdsPoint::new(4, 0),
                    GdsPoint::new(4, 4),
                    GdsPoint::new(0, 4),
                    GdsPoint::new(0, 0),
                ],
                ..Default::default()
            }
            .into(),
        ],
    );
    let top = cell(
        "top",
        vec![
            GdsStructRef {
                name: "unit".into(),
                xy: GdsPoint::new(-10, 20),
                strans: Some(GdsStrans {
                    reflected: true,
                    abs_mag: false,
                    abs_angle: false,
                    mag: Some(2.0),
                    angle: Some(270.0),
                }),
                ..Default::default()
            }
            .into(),
            GdsArrayRef {
                name: "unit".into(),
                xy: [
                    GdsPoint::new(0, 0),
                    GdsPoint::new(300, 0),
                    GdsPoint::new(0, 400),
                ],
                cols: 3,
                rows: 2,
                ..Default::default()
            }
            .into(),
        ],
    );
    let lib = library(vec![unit, top]);
    roundtrip(&lib)?;

    // Decoding our own encoding reproduces our own encoding
    let bytes = lib.to_bytes()?;
    assert_eq!(GdsLibrary::from_bytes(&bytes)?.to_bytes()?, bytes);
    Ok(())
}

#[test]
fn record_too_long() {
    let xy: Vec<(i32, i32)> = (0..16_400).map(|i| (i, i)).collect();
    let lib = library(vec![cell(
        "big",
        vec![GdsBoundary {
            layer: 0,
            datatype: 0,
            xy: GdsPoint::vec(&xy),
            ..Default::default()
        }
        .into()],
    )]);
    assert!(matches!(lib.to_bytes(), Err(GdsError::RecordLen(_))));
}

#[test]
fn flattens_single_reference() -> GdsResult<()> {
    let lib = library(vec![
        cell("UNIT", vec![square()]),
        cell("TOP", vec![sref("UNIT", 10, 20)]),
    ]);
    let flat = lib.flatten("TOP", "TOP_FLAT")?;
    assert_eq!(flat.name, "TOP_FLAT");
    assert_eq!(flat.elems.len(), 1);
    assert_eq!(
        boundary_xy(&flat.elems[0]),
        GdsPoint::vec(&[(10, 20), (20, 20), (20, 30), (10, 30), (10, 20)])
    );
    // The source library is unchanged
    assert_eq!(lib.len(), 2);
    assert_eq!(lib.get("TOP").unwrap().elems, vec![sref("UNIT", 10, 20)]);
    Ok(())
}

#[test]
fn flattens_nested_rotated_references() -> GdsResult<()> {
    let rotated = GdsStructRef {
        name: "MID".into(),
        xy: GdsPoint::new(100, 0),
        strans: Some(GdsStrans {
            angle: Some(90.0),
            ..Default::default()
        }),
        ..Default::default()
    };
    let lib = library(vec![
        cell("UNIT", vec![square()]),
        cell("MID", vec![sref("UNIT", 5, 0)]),
        cell("TOP", vec![rotated.into()]),
    ]);
    let flat = lib.flatten("TOP", "FLAT")?;
    assert_eq!(flat.elems.len(), 1);
    assert_eq!(
        boundary_xy(&flat.elems[0]),
        GdsPoint::vec(&[(100, 5), (100, 15), (90, 15), (90, 5), (100, 5)])
    );
    Ok(())
}

#[test]
fn flattens_reflected_reference() -> GdsResult<()> {
    let reflected = GdsStructRef {
        name: "UNIT".into(),
        xy: GdsPoint::new(0, 0),
        strans: Some(GdsStrans {
            reflected: true,
            ..Default::default()
        }),
        ..Default::default()
    };
    let lib = library(vec![
        cell("UNIT", vec![square()]),
        cell("TOP", vec![reflected.into()]),
    ]);
    let flat = lib.flatten("TOP", "FLAT")?;
    assert_eq!(
        boundary_xy(&flat.elems[0]),
        GdsPoint::vec(&[(0, 0), (10, 0), (10, -10), (0, -10), (0, 0)])
    );
    Ok(())
}

#[test]
fn it_arrays() -> GdsResult<()> {
    let aref = GdsArrayRef {
        name: "UNIT".into(),
        xy: [
            GdsPoint::new(0, 0),
            GdsPoint::new(300, 0),
            GdsPoint::new(0, 400),
        ],
        cols: 3,
        rows: 2,
        ..Default::default()
    };
    let lib = library(vec![
        cell("UNIT", vec![square()]),
        cell("TOP", vec![aref.into()]),
    ]);
    let flat = lib.flatten("TOP", "FLAT")?;
    assert_eq!(flat.elems.len(), 6);
    // Instances are ordered row by row, column by column
    let origins: Vec<GdsPoint> = flat.elems.iter().map(|e| boundary_xy(e)[0]).collect();
    assert_eq!(
        origins,
        GdsPoint::vec(&[(0, 0), (100, 0), (200, 0), (0, 200), (100, 200), (200, 200)])
    );
    Ok(())
}

#[test]
fn it_arrays_rotated() -> GdsResult<()> {
    // A 90-degree rotated array, with its steps expressed in the parent's coordinates
    let aref = GdsArrayRef {
        name: "UNIT".into(),
        xy: [
            GdsPoint::new(0, 0),
            GdsPoint::new(0, 300),
            GdsPoint::new(-400, 0),
        ],
        cols: 3,
        rows: 2,
        strans: Some(GdsStrans {
            angle: Some(90.0),
            ..Default::default()
        }),
        ..Default::default()
    };
    let lib = library(vec![
        cell("UNIT", vec![square()]),
        cell("TOP", vec![aref.into()]),
    ]);
    let flat = lib.flatten("TOP", "FLAT")?;
    assert_eq!(flat.elems.len(), 6);
    // Instance (col=1, row=1) sits at (-200, 100); its (10,0) corner rotates to (0,10)
    assert_eq!(boundary_xy(&flat.elems[4])[1], GdsPoint::new(-200, 110));
    Ok(())
}

#[test]
fn flatten_has_no_references_and_is_idempotent() -> GdsResult<()> {
    let mut lib = library(vec![
        cell("UNIT", vec![square()]),
        cell("MID", vec![sref("UNIT", 0, 0), sref("UNIT", 20, 0), square()]),
        cell("TOP", vec![sref("MID", 0, 100), sref("UNIT", 7, 7)]),
    ]);
    let flat = lib.flatten("TOP", "FLAT")?;
    assert_eq!(flat.elems.len(), 4);
    assert!(flat.elems.iter().all(|e| !e.is_ref()));

    lib.insert(flat.clone())?;
    let again = lib.flatten("FLAT", "FLAT2")?;
    assert_eq!(again.elems, flat.elems);
    Ok(())
}

#[test]
fn flatten_into_replaces() -> GdsResult<()> {
    let mut lib = library(vec![
        cell("UNIT", vec![square()]),
        cell("TOP", vec![sref("UNIT", 1, 1)]),
    ]);
    lib.flatten_into("TOP", "FLAT")?;
    assert_eq!(lib.names().collect::<Vec<_>>(), vec!["UNIT", "TOP", "FLAT"]);
    lib.flatten_into("TOP", "FLAT")?;
    assert_eq!(lib.len(), 3);
    assert_eq!(lib.get("FLAT").unwrap().elems.len(), 1);
    Ok(())
}

#[test]
fn flatten_element_limit() {
    let aref = GdsArrayRef {
        name: "UNIT".into(),
        xy: [
            GdsPoint::new(0, 0),
            GdsPoint::new(30, 0),
            GdsPoint::new(0, 20),
        ],
        cols: 3,
        rows: 2,
        ..Default::default()
    };
    let lib = library(vec![
        cell("UNIT", vec![square()]),
        cell("TOP", vec![aref.into()]),
    ]);
    let opts = GdsFlattenOptionsBuilder::default()
        .max_elements(Some(5))
        .build()
        .unwrap();
    assert!(matches!(
        lib.flatten_with("TOP", "FLAT", opts),
        Err(GdsError::ElementLimit { limit: 5 })
    ));
    let opts = GdsFlattenOptions {
        max_elements: Some(6),
    };
    assert_eq!(lib.flatten_with("TOP", "FLAT", opts).unwrap().elems.len(), 6);
}

#[test]
fn flattens_extreme_array_coordinates() -> GdsResult<()> {
    // Array corners spanning the full i32 range
    let aref = GdsArrayRef {
        name: "UNIT".into(),
        xy: [
            GdsPoint::new(i32::MIN, 0),
            GdsPoint::new(i32::MAX, 0),
            GdsPoint::new(i32::MIN, i32::MAX),
        ],
        cols: 1,
        rows: 1,
        ..Default::default()
    };
    let lib = library(vec![
        cell("UNIT", vec![square()]),
        cell("TOP", vec![aref.into()]),
    ]);
    let lib = GdsLibrary::from_bytes(&lib.to_bytes()?)?;
    let flat = lib.flatten("TOP", "FLAT")?;
    assert_eq!(flat.elems.len(), 1);
    assert_eq!(boundary_xy(&flat.elems[0])[0], GdsPoint::new(i32::MIN, 0));
    assert_eq!(boundary_xy(&flat.elems[0])[2], GdsPoint::new(i32::MIN + 10, 10));
    Ok(())
}

#[test]
fn flattens_nested_arrays_of_empty_cells() -> GdsResult<()> {
    let aref = |name: &str| -> GdsElement {
        GdsArrayRef {
            name: name.into(),
            xy: [
                GdsPoint::new(0, 0),
                GdsPoint::new(32767, 0),
                GdsPoint::new(0, 32767),
            ],
            cols: 32767,
            rows: 32767,
            ..Default::default()
        }
        .into()
    };
    let opts = GdsFlattenOptions {
        max_elements: Some(10),
    };
    // A billion-fold array of a billion-fold array of nothing flattens to nothing, promptly
    let lib = library(vec![
        cell("EMPTY", vec![]),
        cell("MID", vec![aref("EMPTY")]),
        cell("TOP", vec![aref("MID")]),
    ]);
    let flat = lib.flatten_with("TOP", "FLAT", opts.clone())?;
    assert!(flat.elems.is_empty());

    // With any content, the limit is hit before anything is copied
    let lib = library(vec![
        cell("EMPTY", vec![]),
        cell("MID", vec![aref("EMPTY"), square()]),
        cell("TOP", vec![aref("MID")]),
    ]);
    assert!(matches!(
        lib.flatten_with("TOP", "FLAT", opts),
        Err(GdsError::ElementLimit { limit: 10 })
    ));
    Ok(())
}

#[test]
fn detects_cycles() {
    let lib = library(vec![
        cell("A", vec![sref("B", 0, 0)]),
        cell("B", vec![square(), sref("A", 0, 0)]),
    ]);
    match lib.flatten("A", "FLAT") {
        Err(GdsError::CyclicReference { path }) => assert_eq!(path, vec!["A", "B", "A"]),
        other => panic!("expected a cycle, got {:?}", other),
    }
    match lib.validate() {
        Err(GdsError::CyclicReference { path }) => assert_eq!(path, vec!["A", "B", "A"]),
        other => panic!("expected a cycle, got {:?}", other),
    }
    // Extraction copies each cell once
    assert_eq!(lib.extract_subtree("B").unwrap().len(), 2);

    let lib = library(vec![cell("SELF", vec![sref("SELF", 1, 1)])]);
    match lib.flatten("SELF", "FLAT") {
        Err(GdsError::CyclicReference { path }) => assert_eq!(path, vec!["SELF", "SELF"]),
        other => panic!("expected a cycle, got {:?}", other),
    }
}

#[test]
fn missing_references() -> GdsResult<()> {
    let lib = library(vec![
        cell("UNIT", vec![square()]),
        cell("TOP", vec![sref("UNIT", 0, 0), sref("GHOST", 0, 0)]),
    ]);
    // Decoding tolerates the dangling reference
    let lib = GdsLibrary::from_bytes(&lib.to_bytes()?)?;
    assert_eq!(lib.len(), 2);

    let is_ghost = |e: &GdsError| {
        matches!(e, GdsError::MissingReference { cell, name } if cell == "TOP" && name == "GHOST")
    };
    assert!(is_ghost(&lib.flatten("TOP", "FLAT").unwrap_err()));
    assert!(is_ghost(&lib.extract_subtree("TOP").unwrap_err()));
    assert!(is_ghost(&lib.validate().unwrap_err()));
    // Cells which don't reach it remain usable
    assert_eq!(lib.extract_subtree("UNIT")?.len(), 1);
    assert!(matches!(
        lib.flatten("NOPE", "FLAT"),
        Err(GdsError::CellNotFound(_))
    ));
    Ok(())
}

#[test]
fn database_operations() -> GdsResult<()> {
    let mut lib = library(vec![cell("A", vec![]), cell("B", vec![]), cell("C", vec![])]);
    assert!(matches!(
        lib.insert(cell("B", vec![square()])),
        Err(GdsError::DuplicateName(n)) if n == "B"
    ));
    assert!(lib.get("B").unwrap().elems.is_empty());
    assert!(lib.contains("C"));

    let removed = lib.remove("B").unwrap();
    assert_eq!(removed.name, "B");
    assert!(lib.remove("B").is_none());
    assert_eq!(lib.names().collect::<Vec<_>>(), vec!["A", "C"]);

    lib.get_mut("A").unwrap().elems.push(square());
    assert_eq!(lib.get("A").unwrap().elems.len(), 1);

    let old = lib.insert_or_replace(cell("A", vec![]));
    assert_eq!(old.unwrap().elems.len(), 1);
    assert_eq!(lib.names().collect::<Vec<_>>(), vec!["A", "C"]);
    Ok(())
}

#[test]
fn extracts_subtrees_in_source_order() -> GdsResult<()> {
    let lib = library(vec![
        cell("LEAF", vec![square()]),
        cell("OTHER", vec![square()]),
        cell("MID", vec![sref("LEAF", 0, 0)]),
        cell("TOP", vec![sref("MID", 0, 0), sref("LEAF", 5, 5)]),
    ]);
    let sub = lib.extract_subtree("TOP")?;
    assert_eq!(sub.names().collect::<Vec<_>>(), vec!["LEAF", "MID", "TOP"]);
    assert_eq!(sub.name, lib.name);
    assert_eq!(sub.units, lib.units);

    assert_eq!(lib.validate()?, vec!["LEAF", "OTHER", "MID", "TOP"]);
    assert_eq!(lib.top_cells(), vec!["OTHER", "TOP"]);
    Ok(())
}

#[test]
fn write_options() -> GdsResult<()> {
    let lib = library(vec![
        cell("LEAF", vec![square()]),
        cell("OTHER", vec![sref("GHOST", 0, 0)]),
        cell("TOP", vec![sref("LEAF", 0, 0)]),
    ]);
    let opts = GdsWriteOptionsBuilder::default()
        .root("TOP")
        .validate(true)
        .build()
        .unwrap();
    let mut bytes = Vec::new();
    GdsWriter::with_options(&mut bytes, opts).write_lib(&lib)?;
    let sub = GdsLibrary::from_bytes(&bytes)?;
    assert_eq!(sub.names().collect::<Vec<_>>(), vec!["LEAF", "TOP"]);

    // Validation fails before anything is written
    let opts = GdsWriteOptions {
        root: None,
        validate: true,
    };
    let mut bytes = Vec::new();
    let res = GdsWriter::with_options(&mut bytes, opts).write_lib(&lib);
    assert!(matches!(res, Err(GdsError::MissingReference { .. })));
    assert!(bytes.is_empty());
    Ok(())
}

#[test]
fn skips_unsupported_records() -> GdsResult<()> {
    let mut bytes = encode(&lib_head());
    let unknown_offset = bytes.len() as u64;
    // Record-type 0x70 is not defined by GDSII
    bytes.extend_from_slice(&[0x00, 0x06, 0x70, 0x02, 0x12, 0x34]);
    let fonts_offset = bytes.len() as u64;
    bytes.extend(encode(&[GdsRecord::Fonts("fonts.txt".into())]));
    let mut rest = empty_cell("A");
    rest.push(GdsRecord::EndLib);
    bytes.extend(encode(&rest));

    let mut parser = GdsParser::new(GdsReader::new(&bytes[..]))?;
    let lib = parser.parse_lib()?;
    assert_eq!(lib.names().collect::<Vec<_>>(), vec!["A"]);
    assert_eq!(
        parser.skipped(),
        &[
            GdsSkippedRecord {
                rtype: 0x70,
                offset: unknown_offset
            },
            GdsSkippedRecord {
                rtype: GdsRecordType::Fonts as u8,
                offset: fonts_offset
            },
        ]
    );

    // Strict mode rejects the first of them
    let strict = GdsReadOptions { strict: true };
    let res = GdsParser::with_options(GdsReader::new(&bytes[..]), strict).and_then(|mut p| p.parse_lib());
    match res {
        Err(GdsError::Unsupported { rtype, offset }) => {
            assert_eq!(rtype, 0x70);
            assert_eq!(offset, unknown_offset);
        }
        other => panic!("expected an unsupported-record error, got {:?}", other),
    }
    Ok(())
}

#[test]
fn ignores_trailing_bytes() -> GdsResult<()> {
    let lib = library(vec![cell("UNIT", vec![square()])]);
    let mut bytes = lib.to_bytes()?;
    bytes.resize(2048, 0);
    assert_eq!(GdsLibrary::from_bytes(&bytes)?, lib);
    Ok(())
}

#[test]
fn rejects_truncated_streams() -> GdsResult<()> {
    let lib = library(vec![cell("UNIT", vec![square()])]);
    let bytes = lib.to_bytes()?;
    for len in [0, 10, bytes.len() / 2, bytes.len() - 3] {
        match GdsLibrary::from_bytes(&bytes[..len]) {
            Err(GdsError::Format { .. }) => (),
            other => panic!("expected a format error at length {}, got {:?}", len, other),
        }
    }
    Ok(())
}

#[test]
fn rejects_malformed_records() {
    // Odd record length
    let mut bytes = encode(&lib_head());
    bytes.extend_from_slice(&[0x00, 0x05, 0x0D, 0x02, 0x00]);
    assert!(matches!(
        GdsLibrary::from_bytes(&bytes),
        Err(GdsError::RecordLen(5))
    ));

    // LAYER record with I32 data
    let mut bytes = encode(&lib_head());
    bytes.extend(encode(&[
        GdsRecord::BgnStruct { dates: [0; 12] },
        GdsRecord::StructName("A".into()),
        GdsRecord::Boundary,
    ]));
    bytes.extend_from_slice(&[0x00, 0x08, 0x0D, 0x03, 0x00, 0x00, 0x00, 0x01]);
    assert!(matches!(
        GdsLibrary::from_bytes(&bytes),
        Err(GdsError::RecordDecode {
            rtype: GdsRecordType::Layer,
            dtype: GdsDataType::I32,
            ..
        })
    ));
}

#[test]
fn rejects_nested_struct() {
    let mut records = lib_head();
    records.extend([
        GdsRecord::BgnStruct { dates: [0; 12] },
        GdsRecord::StructName("A".into()),
    ]);
    records.extend(empty_cell("B"));
    records.extend([GdsRecord::EndStruct, GdsRecord::EndLib]);
    match GdsLibrary::from_bytes(&encode(&records)) {
        Err(GdsError::Structural { ctx, .. }) => {
            assert_eq!(ctx, vec![GdsContext::Library, GdsContext::Struct("A".into())]);
        }
        other => panic!("expected a structural error, got {:?}", other),
    }
}

#[test]
fn rejects_duplicate_struct() {
    let mut records = lib_head();
    records.extend(empty_cell("A"));
    records.extend(empty_cell("A"));
    records.push(GdsRecord::EndLib);
    assert!(matches!(
        GdsLibrary::from_bytes(&encode(&records)),
        Err(GdsError::Structural { .. })
    ));
}

#[test]
fn rejects_zero_magnification() {
    let mut records = lib_head();
    records.extend([
        GdsRecord::BgnStruct { dates: [0; 12] },
        GdsRecord::StructName("TOP".into()),
        GdsRecord::StructRef,
        GdsRecord::StructRefName("A".into()),
        GdsRecord::Strans(0, 0),
        GdsRecord::Mag(0.0),
        GdsRecord::Xy(vec![0, 0]),
        GdsRecord::EndElement,
        GdsRecord::EndStruct,
        GdsRecord::EndLib,
    ]);
    assert!(matches!(
        GdsLibrary::from_bytes(&encode(&records)),
        Err(GdsError::Format { .. })
    ));
}

#[test]
fn rejects_missing_units() {
    let records = vec![
        GdsRecord::Header { version: 3 },
        GdsRecord::BgnLib { dates: [0; 12] },
        GdsRecord::LibName("testlib".into()),
        GdsRecord::EndLib,
    ];
    assert!(matches!(
        GdsLibrary::from_bytes(&encode(&records)),
        Err(GdsError::Structural { .. })
    ));
}

#[test]
fn rejects_missing_libname() {
    let records = vec![
        GdsRecord::Header { version: 3 },
        GdsRecord::BgnLib { dates: [0; 12] },
        GdsRecord::Units(1e-3, 1e-9),
        GdsRecord::EndLib,
    ];
    match GdsLibrary::from_bytes(&encode(&records)) {
        Err(GdsError::Structural { msg, .. }) => assert!(msg.contains("LIBNAME")),
        other => panic!("expected a structural error, got {:?}", other),
    }
}

#[test]
fn it_counts_stats() {
    let aref = GdsArrayRef {
        name: "UNIT".into(),
        cols: 1,
        rows: 1,
        ..Default::default()
    };
    let lib = library(vec![
        cell("UNIT", vec![square()]),
        cell("TOP", vec![sref("UNIT", 0, 0), aref.into()]),
    ]);
    assert_eq!(
        lib.stats(),
        GdsStats {
            libraries: 1,
            structs: 2,
            boundaries: 1,
            struct_refs: 1,
            array_refs: 1,
            ..Default::default()
        }
    );
}

#[test]
fn it_sets_dates() {
    let mut lib = library(vec![cell("UNIT", vec![square()])]);
    let when = GdsDateTime {
        year: 100,
        month: 1,
        day: 2,
        hour: 3,
        minute: 4,
        second: 5,
    };
    lib.set_all_dates(when.clone());
    assert_eq!(lib.dates.modified, when);
    assert_eq!(lib.get("UNIT").unwrap().dates.accessed, when);
}

#[test]
fn serializes_to_text() -> Result<(), Box<dyn std::error::Error>> {
    let lib = library(vec![
        cell("UNIT", vec![square()]),
        cell("TOP", vec![sref("UNIT", 10, 20)]),
    ]);
    let dir = tempfile::tempdir()?;
    for fmt in [SerializationFormat::Json, SerializationFormat::Yaml] {
        let path = dir.path().join("lib.txt");
        lib.save_as(fmt, &path)?;
        let back = GdsLibrary::open_as(&path, fmt)?;
        assert_eq!(back, lib);
        assert!(back.names().eq(lib.names()));
    }
    Ok(())
}

#[test]
fn dumps_records() -> Result<(), Box<dyn std::error::Error>> {
    let lib = library(vec![cell("UNIT", vec![square()])]);
    let dir = tempfile::tempdir()?;
    let (gds, json) = (dir.path().join("lib.gds"), dir.path().join("lib.json"));
    lib.save(&gds)?;
    GdsParser::dump(&gds, &json)?;

    let text = std::fs::read_to_string(&json)?;
    let records: serde_json::Value = serde_json::from_str(&text)?;
    let records = records.as_array().unwrap();
    // HEADER BGNLIB LIBNAME UNITS BGNSTR STRNAME BOUNDARY LAYER DATATYPE XY ENDEL ENDSTR ENDLIB
    assert_eq!(records.len(), 13);
    assert_eq!(records[0][1], 0);
    assert_eq!(records[12][2], "EndLib");
    Ok(())
}

#[test]
fn opens_and_saves_files() -> GdsResult<()> {
    let lib = library(vec![
        cell("UNIT", vec![square()]),
        cell("TOP", vec![sref("UNIT", 10, 20)]),
    ]);
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("lib.gds");
    lib.save(&path)?;
    assert_eq!(GdsLibrary::open(&path)?, lib);

    let opts = GdsWriteOptions {
        root: Some("UNIT".into()),
        validate: false,
    };
    lib.save_with(&path, opts)?;
    let opened = GdsLibrary::open_with(&path, GdsReadOptions { strict: true })?;
    assert_eq!(opened.names().collect::<Vec<_>>(), vec!["UNIT"]);
    Ok(())
}
