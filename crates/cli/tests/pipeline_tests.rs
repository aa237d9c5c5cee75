use featurematch::pipeline::{recognize, Database};
use featurematch_core::dataset::{write_keypoints, Keypoint, LoadError};
use featurematch_core::{FeatureIndex, Prediction};
use std::fmt::Write as _;
use std::path::Path;
use tempfile::TempDir;

const DIM: usize = 4;

/// Two well-separated classes plus a name-only third label.
fn write_fixture(dir: &Path) {
    std::fs::write(
        dir.join("object.txt"),
        "0\tbonsai\n1\tbrain\n\n2\tbuddha\n",
    )
    .expect("Failed to write object.txt");

    let mut rows = String::new();
    for i in 0..10 {
        let offset = i as f32 * 0.01;
        writeln!(rows, "0\tbonsai_{i}\t{offset}\t0\t0\t0").unwrap();
        writeln!(rows, "1\tbrain_{i}\t5\t5\t{offset}\t5").unwrap();
    }
    std::fs::write(dir.join("description.txt"), rows).expect("Failed to write description.txt");
}

fn keypoint(descriptor: [f32; DIM]) -> Keypoint {
    Keypoint {
        x: 1.0,
        y: 2.0,
        size: 9.0,
        laplacian: 1,
        descriptor: descriptor.to_vec(),
    }
}

fn load(dir: &Path) -> Database {
    Database::load(&dir.join("object.txt"), &dir.join("description.txt"))
        .expect("Failed to load database")
}

#[test]
fn test_database_load() {
    let tmp_dir = TempDir::new().expect("Failed to create temp dir");
    write_fixture(tmp_dir.path());
    let db = load(tmp_dir.path());

    assert_eq!(db.names().len(), 3);
    assert_eq!(db.name(2), Some("buddha"));
    assert_eq!(db.descriptors().vectors.len(), 20);
    assert_eq!(db.descriptors().vectors.dimension(), DIM);
    assert_eq!(db.descriptors().provenance[1], "brain_0");
    assert_eq!(db.num_classes(), 3);
}

#[test]
fn test_recognize_majority_class() {
    let tmp_dir = TempDir::new().expect("Failed to create temp dir");
    write_fixture(tmp_dir.path());
    let db = load(tmp_dir.path());
    let index = FeatureIndex::build(&db.descriptors().vectors, 4).expect("Failed to build index");

    let query = tmp_dir.path().join("query.surf");
    write_keypoints(
        &query,
        &[
            keypoint([5.1, 4.9, 0.0, 5.0]),
            keypoint([0.1, 0.0, 0.1, 0.0]),
            keypoint([4.8, 5.0, 0.05, 5.2]),
        ],
    )
    .expect("Failed to write query");

    let report = recognize(&index, &db, &query, 250).expect("Recognition failed");
    assert_eq!(report.descriptors, 3);
    assert_eq!(
        report.prediction,
        Prediction::Match {
            label: 1,
            votes: 2,
            total: 3
        }
    );
    assert_eq!(report.name.as_deref(), Some("brain"));
    assert!(report.summary().contains("Result: brain (2/3 votes"));
}

#[test]
fn test_recognize_tie_reports_lowest_label() {
    let tmp_dir = TempDir::new().expect("Failed to create temp dir");
    write_fixture(tmp_dir.path());
    let db = load(tmp_dir.path());
    let index = FeatureIndex::build(&db.descriptors().vectors, 4).expect("Failed to build index");

    let query = tmp_dir.path().join("tie.surf");
    write_keypoints(
        &query,
        &[keypoint([5.0, 5.0, 0.0, 5.0]), keypoint([0.0, 0.0, 0.0, 0.0])],
    )
    .expect("Failed to write query");

    let report = recognize(&index, &db, &query, 250).expect("Recognition failed");
    assert_eq!(report.prediction.label(), Some(0));
    assert_eq!(report.name.as_deref(), Some("bonsai"));
}

#[test]
fn test_recognize_empty_query_is_no_match() {
    let tmp_dir = TempDir::new().expect("Failed to create temp dir");
    write_fixture(tmp_dir.path());
    let db = load(tmp_dir.path());
    let index = FeatureIndex::build(&db.descriptors().vectors, 4).expect("Failed to build index");

    let query = tmp_dir.path().join("empty.surf");
    write_keypoints(&query, &[]).expect("Failed to write query");

    let report = recognize(&index, &db, &query, 250).expect("Recognition failed");
    assert_eq!(report.descriptors, 0);
    assert_eq!(report.prediction, Prediction::NoMatch);
    assert_eq!(report.name, None);
    assert!(report.summary().contains("Result: no match"));
}

#[test]
fn test_recognize_missing_query_file() {
    let tmp_dir = TempDir::new().expect("Failed to create temp dir");
    write_fixture(tmp_dir.path());
    let db = load(tmp_dir.path());
    let index = FeatureIndex::build(&db.descriptors().vectors, 4).expect("Failed to build index");

    let err = recognize(&index, &db, &tmp_dir.path().join("absent.surf"), 250).unwrap_err();
    assert!(matches!(err, LoadError::Io { .. }));
}

#[test]
fn test_recognize_wrong_query_dimension() {
    let tmp_dir = TempDir::new().expect("Failed to create temp dir");
    write_fixture(tmp_dir.path());
    let db = load(tmp_dir.path());
    let index = FeatureIndex::build(&db.descriptors().vectors, 4).expect("Failed to build index");

    let query = tmp_dir.path().join("wide.surf");
    std::fs::write(&query, "1 6\n1 2 9 1 0 0 0 0 0 0\n").expect("Failed to write query");

    let err = recognize(&index, &db, &query, 250).unwrap_err();
    assert!(matches!(err, LoadError::Invalid(_)));
}

#[test]
fn test_missing_database_file() {
    let tmp_dir = TempDir::new().expect("Failed to create temp dir");
    let err = Database::load(
        &tmp_dir.path().join("object.txt"),
        &tmp_dir.path().join("description.txt"),
    )
    .unwrap_err();
    assert!(err.to_string().contains("object.txt"));
}

#[test]
fn test_reserved_label_in_database() {
    let tmp_dir = TempDir::new().expect("Failed to create temp dir");
    std::fs::write(tmp_dir.path().join("object.txt"), "0\tbonsai\n")
        .expect("Failed to write object.txt");
    std::fs::write(tmp_dir.path().join("description.txt"), "4294967295\tx\t1\t2\n")
        .expect("Failed to write description.txt");

    let err = Database::load(
        &tmp_dir.path().join("object.txt"),
        &tmp_dir.path().join("description.txt"),
    )
    .unwrap_err();
    assert!(matches!(err, LoadError::Parse { line: 1, .. }), "got {err:?}");
}

#[test]
fn test_malformed_query_header_is_an_error() {
    let tmp_dir = TempDir::new().expect("Failed to create temp dir");
    write_fixture(tmp_dir.path());
    let db = load(tmp_dir.path());
    let index = FeatureIndex::build(&db.descriptors().vectors, 4).expect("Failed to build index");

    let huge_count = tmp_dir.path().join("huge_count.surf");
    std::fs::write(&huge_count, "18446744073709551615 4\n").expect("Failed to write query");
    let err = recognize(&index, &db, &huge_count, 250).unwrap_err();
    assert!(matches!(err, LoadError::Parse { line: 1, .. }), "got {err:?}");

    let huge_dim = tmp_dir.path().join("huge_dim.surf");
    std::fs::write(&huge_dim, "1 18446744073709551615\n1 2 3 1 0.5\n")
        .expect("Failed to write query");
    let err = recognize(&index, &db, &huge_dim, 250).unwrap_err();
    assert!(matches!(err, LoadError::Dimension { line: 2, .. }), "got {err:?}");
}
