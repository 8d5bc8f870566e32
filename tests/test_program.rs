use dxf::entities::EntityType;
use dxf::Drawing;
use gearpair::program::main;
use ordered_float::OrderedFloat;
use std::collections::HashMap;
use std::fs::create_dir_all;
use std::fs::read;
use std::fs::write;

#[macro_export]
macro_rules! test_name {
    () => {{
        fn f() {}
        fn type_name_of<T>(_: T) -> &'static str {
            std::any::type_name::<T>()
        }
        let name = type_name_of(f);
        let prefix = &name[..name.len() - 3];
        let offset = prefix.rfind("::").unwrap();
        &prefix[offset + 2..]
    }};
}

#[macro_export]
macro_rules! test_case {
    ($name:ident, $suffix:literal, $flags:expr) => {
        #[test]
        fn $name() {
            let file_name = format!("{}.{}", test_name!(), $suffix);
            run_program(&file_name, &$flags);
            assert_closed_outlines(&file_name);
            impl_assert_output(&file_name);
        }
    };
}

fn run_program(file_name: &str, flags: &[&str]) {
    for directory in vec!["tests/expected", "tests/actual"].iter() {
        create_dir_all(directory).unwrap_or_else(|_| {
            // BEGIN NOT TESTED
            panic!("failed to create {} results directory", directory)
            // END NOT TESTED
        });
    }

    let mut flags: Vec<String> = flags.iter().map(|string| string.to_string()).collect();
    flags.push("--output".to_string());
    flags.push(format!("tests/actual/{}", file_name));
    main(&flags).unwrap();
}

fn assert_closed_outlines(file_name: &str) {
    let actual_path = format!("tests/actual/{}", file_name);
    let svg = String::from_utf8(read(actual_path.clone()).unwrap()).unwrap();
    let polylines = svg2polylines::parse(&svg).unwrap();
    assert!(!polylines.is_empty(), "no paths in {}", actual_path);

    let mut degrees = HashMap::new();
    for polyline in &polylines {
        assert!(polyline.len() == 2);
        for point in polyline {
            *degrees
                .entry((OrderedFloat(point.x), OrderedFloat(point.y)))
                .or_insert(0) += 1;
        }
    }
    assert!(
        degrees.values().all(|degree| degree % 2 == 0),
        "the outlines in {} are not closed",
        actual_path
    );
}

fn impl_assert_output(file_name: &str) {
    let actual_path = format!("tests/actual/{}", file_name);
    let actual_bytes = read(actual_path.clone()).unwrap();

    let expected_path = format!("tests/expected/{}", file_name);
    let expected_bytes = read(expected_path.clone()).unwrap_or_else(|_| {
        // BEGIN NOT TESTED
        write(expected_path.clone(), &actual_bytes).unwrap_or_else(|_| {
            panic!("failed to write expected results file {}", expected_path);
        });
        eprintln!(
            "WARNING: created expected results file {}, verify its contents",
            expected_path
        );
        actual_bytes.clone().to_vec()
        // END NOT TESTED
    });

    assert!(
        expected_bytes == actual_bytes,
        "The actual results file {} is different from the expected results file {}",
        expected_path,
        actual_path
    );
}

test_case! {
    defaults,
    "svg",
    vec!["test"]
}

test_case! {
    scaled_by_size,
    "svg",
    vec!["test", "-X", "100pt", "-Y", "100pt"]
}

test_case! {
    single_circle,
    "svg",
    vec!["test", "--shape", "circle", "--teeth", "20", "--single", "--inner-radius", "0.25"]
}

test_case! {
    single_ellipse,
    "svg",
    vec!["test", "--teeth", "30", "--single"]
}

test_case! {
    eccentric_pair,
    "svg",
    vec!["test", "-e", "0.3", "-n", "1", "-t", "24", "-p", "1", "-c", "1.0"]
}

test_case! {
    superellipse_pair,
    "svg",
    vec!["test", "--shape", "superellipse", "-t", "24", "-p", "1", "-c", "1.5"]
}

test_case! {
    offset_pair,
    "svg",
    vec!["test", "--offset", "-e", "0.2", "-n", "1", "-t", "20"]
}

#[test]
fn dxf_pair() {
    let file_name = "dxf_pair.dxf";
    run_program(file_name, &["test", "--format", "dxf", "--depth", "0.5"]);

    let drawing = Drawing::load_file(&format!("tests/actual/{}", file_name)).unwrap();
    let mut lines_count = 0;
    for entity in drawing.entities() {
        if let EntityType::Line(line) = &entity.specific {
            assert!(entity.common.layer == "GEAR");
            assert!(line.thickness == 0.5);
            lines_count += 1;
        }
    }
    assert!(lines_count > 0);
}

#[test]
fn invalid_eccentricity() {
    let flags: Vec<String> = vec!["test", "-e", "1.2", "--output", "tests/actual/invalid.svg"]
        .iter()
        .map(|string| string.to_string())
        .collect();
    assert!(main(&flags).is_err());
}

#[test]
fn invalid_odd_circle() {
    let flags: Vec<String> = vec![
        "test",
        "--shape",
        "circle",
        "--teeth",
        "21",
        "--single",
        "--output",
        "tests/actual/invalid_odd_circle.svg",
    ]
    .iter()
    .map(|string| string.to_string())
    .collect();
    assert!(main(&flags).is_err());
}
