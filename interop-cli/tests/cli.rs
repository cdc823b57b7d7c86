use std::path::{Path, PathBuf};

use assert_cmd::Command;
use fs_err as fs;
use predicates::prelude::*;
use tempfile::TempDir;

use interop_core::{
    Config, ConversionRegistry, Convert, DataFrame, DomainConverter, Matrix, Record, SparseMatrix,
    TypedValue, CONFIG_FILE_NAME,
};

fn interop(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("interop").unwrap();
    cmd.current_dir(dir);
    cmd
}

fn write_value(dir: &Path, name: &str, value: &TypedValue) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, value.to_json_pretty().unwrap()).unwrap();
    path
}

fn sparse_value() -> TypedValue {
    SparseMatrix::new(
        6,
        6,
        vec![4, 4, 1, 5, 0, 1],
        vec![0, 1, 2, 2, 4, 4, 6],
        vec![1.0; 6],
    )
    .unwrap()
    .lift()
    .unwrap()
}

#[test]
fn init_writes_config_once() {
    let tmp = TempDir::new().unwrap();
    interop(tmp.path())
        .args(["init", "--on-conflict", "overwrite"])
        .assert()
        .success()
        .stdout(predicate::str::contains(CONFIG_FILE_NAME));

    let config = Config::load(tmp.path().join(CONFIG_FILE_NAME)).unwrap();
    assert_eq!(config.converters, DomainConverter::ALL.to_vec());

    interop(tmp.path())
        .arg("init")
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn init_rejects_unknown_policy() {
    let tmp = TempDir::new().unwrap();
    interop(tmp.path())
        .args(["init", "--on-conflict", "sometimes"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown conflict policy"));
    assert!(!tmp.path().join(CONFIG_FILE_NAME).exists());
}

#[test]
fn converters_lists_custom_and_builtin() {
    let tmp = TempDir::new().unwrap();
    interop(tmp.path())
        .args(["converters", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            r#"{"type_name":"SparseMatrix","origin":"custom"}"#,
        ))
        .stdout(predicate::str::contains(r#"{"type_name":"f64","origin":"builtin"}"#));
}

#[test]
fn inspect_reports_shape() {
    let tmp = TempDir::new().unwrap();
    let matrix = Matrix::new(2, 3, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
    let value = ConversionRegistry::new().lift(matrix).unwrap();
    let file = write_value(tmp.path(), "matrix.json", &value);

    interop(tmp.path())
        .arg("inspect")
        .arg(&file)
        .assert()
        .success()
        .stdout(predicate::str::contains("kind: opaque<double>"))
        .stdout(predicate::str::contains("length: 6"))
        .stdout(predicate::str::contains("dim: 2 x 3"));
}

#[test]
fn convert_sparse_round_trips() {
    let tmp = TempDir::new().unwrap();
    let file = write_value(tmp.path(), "sparse.json", &sparse_value());

    interop(tmp.path())
        .args(["convert", "--as", "sparse-col"])
        .arg(&file)
        .assert()
        .success()
        .stdout(predicate::str::contains("sparse-col 6x6 with 6 non-zeros (sum 6)"))
        .stdout(predicate::str::contains("\"col_ptr\""));
}

#[test]
fn convert_data_frame_as_json() {
    let tmp = TempDir::new().unwrap();
    let columns = Record::from_fields([
        ("x", TypedValue::opaque(vec![1.0, 2.0, 3.0])),
        ("y", TypedValue::strings(["a", "b", "c"])),
    ])
    .unwrap();
    let value = DataFrame::new(columns).unwrap().lift().unwrap();
    let file = write_value(tmp.path(), "frame.json", &value);

    interop(tmp.path())
        .args(["convert", "--json", "--as", "data-frame"])
        .arg(&file)
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""summary":"data frame 3x2 (x, y)""#));
}

#[test]
fn convert_with_wrong_class_fails() {
    let tmp = TempDir::new().unwrap();
    let file = write_value(tmp.path(), "sparse.json", &sparse_value());

    interop(tmp.path())
        .args(["convert", "--as", "factor"])
        .arg(&file)
        .assert()
        .failure()
        .stderr(predicate::str::contains("type mismatch"));
}

#[test]
fn config_flag_limits_converters() {
    let tmp = TempDir::new().unwrap();
    let config_dir = tmp.path().join("conf");
    fs::create_dir(&config_dir).unwrap();
    let config = Config {
        converters: vec![DomainConverter::Date],
        ..Config::default()
    };
    config.save(&config_dir).unwrap();
    let file = write_value(tmp.path(), "sparse.json", &sparse_value());

    interop(tmp.path())
        .arg("--config")
        .arg(config_dir.join(CONFIG_FILE_NAME))
        .args(["convert", "--as", "sparse-col"])
        .arg(&file)
        .assert()
        .failure()
        .stderr(predicate::str::contains("no converter registered"));
}
