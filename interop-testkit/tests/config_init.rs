use fs_err as fs;
use interop_core::domain::{INDEX, TZONE};
use interop_core::{
    init, Config, DataFrame, Dates, DomainConverter, OnConflict, RegularSeries, TypedValue,
    XtsSeries, CONFIG_FILE_NAME,
};
use interop_testkit::fixtures::{daily_xts, small_frame};

#[test]
fn saved_config_drives_init() {
    let tmp = tempfile::tempdir().unwrap();
    let config = Config {
        converters: vec![DomainConverter::Xts, DomainConverter::DataFrame],
        on_conflict: OnConflict::Reject,
        default_tzone: "Asia/Tokyo".to_string(),
    };
    config.save(tmp.path()).unwrap();
    let written = fs::read_to_string(tmp.path().join(CONFIG_FILE_NAME)).unwrap();
    assert!(written.contains("\"data-frame\""));

    let loaded = Config::find(tmp.path()).unwrap().unwrap();
    let registry = init(&loaded).unwrap();
    assert!(registry.is_sealed());
    assert!(registry.contains::<XtsSeries>());
    assert!(registry.contains::<DataFrame>());
    assert!(!registry.contains::<RegularSeries>());
    assert!(!registry.contains::<Dates>());

    let lifted = registry.lift(daily_xts(5).unwrap()).unwrap();
    assert_eq!(lifted.attr(TZONE).unwrap().as_str().unwrap(), "Asia/Tokyo");
    assert_eq!(
        lifted.attr(INDEX).unwrap().attr(TZONE).unwrap().as_str().unwrap(),
        "Asia/Tokyo"
    );
}

#[test]
fn frame_survives_json_and_registry() {
    let registry = init(&Config::default()).unwrap();
    let frame = small_frame().unwrap();
    let lifted = registry.lift(frame.clone()).unwrap();

    let json = lifted.to_json_pretty().unwrap();
    let parsed = TypedValue::from_json(&json).unwrap();
    let back: DataFrame = registry.project(&parsed).unwrap();
    assert_eq!(back.nrow(), 3);
    assert_eq!(back.column_names(), frame.column_names());
    let x = back.column("x").unwrap().as_doubles().unwrap();
    assert_eq!(x[..2], [1.5, 2.5]);
    assert!(interop_core::is_na_real(x[2]));
}

#[test]
fn bad_config_file_is_reported() {
    let tmp = tempfile::tempdir().unwrap();
    fs::write(tmp.path().join(CONFIG_FILE_NAME), "on_conflict = \"sometimes\"\n").unwrap();
    let err = Config::find(tmp.path()).unwrap().unwrap_err();
    assert_eq!(err.error_type(), "toml_error");
}
