use std::fs;
use std::path::Path;

use calib_model::{
    AppliesTo, ArtifactKind, ContentDigest, ModelError, RunNumber, StateFingerprint, Version,
};
use calib_store::{DataStore, ExportRequest, RecordRequest, StoreConfig, StoreError};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PeakFit {
    crystal_d_min: f64,
    peak_window: u32,
}

fn params(peak_window: u32) -> PeakFit {
    PeakFit {
        crystal_d_min: 0.4,
        peak_window,
    }
}

fn fingerprint() -> StateFingerprint {
    StateFingerprint::from_readings(-65.3, 104.95, 2.1, 59.56, 1).expect("fingerprint")
}

fn store_in(dir: &Path) -> DataStore {
    DataStore::new(StoreConfig::with_data_root(dir.join("data"))).expect("store")
}

fn initialized(dir: &Path) -> (DataStore, ContentDigest) {
    let store = store_in(dir);
    let config = store.init_state(&fingerprint()).expect("init state");
    (store, config.state_id)
}

fn export(store: &DataStore, state: &ContentDigest, run: u64, applies_to: &str, window: u32) -> u32 {
    let applies_to: AppliesTo = applies_to.parse().expect("appliesTo");
    let request = ExportRequest::new(RunNumber::new(run), false, params(window))
        .applies_to(applies_to)
        .author("diamond")
        .comments("fit");
    let entry = store
        .write_record(state, ArtifactKind::Calibration, request)
        .expect("write record");
    entry.version.as_concrete().expect("concrete version")
}

fn request(run: u64, version: Version) -> RecordRequest {
    RecordRequest {
        fingerprint: fingerprint(),
        kind: ArtifactKind::Calibration,
        run_number: RunNumber::new(run),
        use_lite_mode: false,
        version,
    }
}

#[test]
fn latest_follows_applicability() {
    let dir = tempfile::tempdir().expect("tempdir");
    let (store, state) = initialized(dir.path());
    assert_eq!(export(&store, &state, 120, ">100", 7), 1);
    assert_eq!(export(&store, &state, 90, "<=100", 9), 2);

    let high = store
        .read_record::<PeakFit>(&request(150, Version::Latest))
        .expect("resolve for run 150");
    assert_eq!(high.entry.version, Version::Concrete(1));
    assert_eq!(high.record.calculation_parameters, params(7));

    for run in [50, 100] {
        let low = store
            .read_record::<PeakFit>(&request(run, Version::Default))
            .expect("resolve for low run");
        assert_eq!(low.record.version, Version::Concrete(2));
    }

    let pinned = store
        .read_record::<PeakFit>(&request(150, Version::Concrete(2)))
        .expect("pinned version ignores appliesTo");
    assert_eq!(pinned.record.calculation_parameters, params(9));

    assert!(
        dir.path()
            .join("data")
            .join(state.as_str())
            .join("native/calibration/v0002/CalibrationRecord.json")
            .is_file()
    );
}

#[test]
fn no_applicable_version_is_typed() {
    let dir = tempfile::tempdir().expect("tempdir");
    let (store, state) = initialized(dir.path());
    export(&store, &state, 120, ">100", 7);

    let err = store
        .read_record::<PeakFit>(&request(10, Version::Latest))
        .unwrap_err();
    assert!(matches!(
        err,
        StoreError::Model(ModelError::NoApplicableVersion { run_number: 10, .. })
    ));

    let err = store
        .read_record::<PeakFit>(&request(120, Version::Next))
        .unwrap_err();
    assert!(matches!(
        err.model_error(),
        Some(ModelError::NoApplicableVersion { .. })
    ));
    assert!(err.suggestion().is_some());

    let err = store
        .read_record::<PeakFit>(&request(120, Version::Concrete(0)))
        .unwrap_err();
    assert!(matches!(
        err.model_error(),
        Some(ModelError::VersionOutOfRange { floor: 1, .. })
    ));
}

#[test]
fn symbolic_export_version_is_rejected() {
    let dir = tempfile::tempdir().expect("tempdir");
    let (store, state) = initialized(dir.path());
    let mut request = ExportRequest::new(RunNumber::new(1), false, params(1));
    request.version = Version::Latest;

    let err = store
        .write_record(&state, ArtifactKind::Calibration, request)
        .unwrap_err();
    assert!(matches!(
        err,
        StoreError::Model(ModelError::UnresolvedSymbolicVersion { .. })
    ));
}

#[test]
fn writing_requires_an_initialized_state() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = store_in(dir.path());
    let state = store.state_id(&fingerprint()).expect("state id");
    let request = ExportRequest::new(RunNumber::new(1), false, params(1));

    let err = store
        .write_record(&state, ArtifactKind::Normalization, request)
        .unwrap_err();
    assert!(matches!(err, StoreError::StateNotFound { .. }));
    assert!(err.user_message().contains(state.as_str()));
}

#[test]
fn modified_record_fails_digest_check() {
    let dir = tempfile::tempdir().expect("tempdir");
    let (store, state) = initialized(dir.path());
    export(&store, &state, 120, "120", 7);

    let path = store
        .layout()
        .record_path(&state, false, ArtifactKind::Calibration, 1);
    let mut record: Value = serde_json::from_slice(&fs::read(&path).expect("read")).expect("json");
    record["calculationParameters"]["peakWindow"] = json!(8);
    fs::write(&path, serde_json::to_vec_pretty(&record).expect("encode")).expect("write");

    let err = store
        .read_record::<PeakFit>(&request(120, Version::Latest))
        .unwrap_err();
    assert!(matches!(err, StoreError::DigestMismatch { .. }));
}

#[test]
fn moved_record_fails_state_check() {
    let dir = tempfile::tempdir().expect("tempdir");
    let (store, state) = initialized(dir.path());
    export(&store, &state, 120, "120", 7);

    // Drop the digest so the state check is what trips.
    let index_path = store
        .layout()
        .index_path(&state, false, ArtifactKind::Calibration);
    let mut index: Value =
        serde_json::from_slice(&fs::read(&index_path).expect("read")).expect("json");
    index[0]
        .as_object_mut()
        .expect("entry object")
        .remove("recordDigest");
    fs::write(&index_path, serde_json::to_vec(&index).expect("encode")).expect("write");

    let record_path = store
        .layout()
        .record_path(&state, false, ArtifactKind::Calibration, 1);
    let mut record: Value =
        serde_json::from_slice(&fs::read(&record_path).expect("read")).expect("json");
    record["stateId"] = json!("ffffffffffffffff");
    fs::write(&record_path, serde_json::to_vec(&record).expect("encode")).expect("write");

    let err = store
        .read_record::<PeakFit>(&request(120, Version::Latest))
        .unwrap_err();
    assert!(matches!(
        err.model_error(),
        Some(ModelError::StateIdentityMismatch { .. })
    ));
}

#[test]
fn missing_record_is_reported() {
    let dir = tempfile::tempdir().expect("tempdir");
    let (store, state) = initialized(dir.path());
    export(&store, &state, 120, "120", 7);
    let path = store
        .layout()
        .record_path(&state, false, ArtifactKind::Calibration, 1);
    fs::remove_file(&path).expect("remove record");

    let err = store
        .read_record::<PeakFit>(&request(120, Version::Concrete(1)))
        .unwrap_err();
    assert!(matches!(err, StoreError::RecordMissing { .. }));
}

#[test]
fn orphan_version_directory_blocks_reuse() {
    let dir = tempfile::tempdir().expect("tempdir");
    let (store, state) = initialized(dir.path());
    let orphan = store
        .layout()
        .version_dir(&state, false, ArtifactKind::Calibration, 1);
    fs::create_dir_all(&orphan).expect("orphan dir");

    let request = ExportRequest::new(RunNumber::new(1), false, params(1));
    let err = store
        .write_record(&state, ArtifactKind::Calibration, request)
        .unwrap_err();
    assert!(matches!(err, StoreError::VersionExists { .. }));
    let index = store
        .read_index(&state, ArtifactKind::Calibration, false)
        .expect("index");
    assert!(index.is_empty());
}

#[test]
fn modes_and_kinds_have_independent_indexes() {
    let dir = tempfile::tempdir().expect("tempdir");
    let (store, state) = initialized(dir.path());
    export(&store, &state, 1, "1", 1);
    export(&store, &state, 2, "2", 2);

    let lite = ExportRequest::new(RunNumber::new(1), true, params(3));
    let entry = store
        .write_record(&state, ArtifactKind::Calibration, lite)
        .expect("lite export");
    assert_eq!(entry.version, Version::Concrete(1));

    let norm = ExportRequest::new(RunNumber::new(1), false, json!({"smoothing": 0.5}));
    let entry = store
        .write_record(&state, ArtifactKind::Normalization, norm)
        .expect("normalization export");
    assert_eq!(entry.version, Version::Concrete(1));

    let native = store
        .read_index(&state, ArtifactKind::Calibration, false)
        .expect("native index");
    assert_eq!(native.versions().collect::<Vec<_>>(), vec![1, 2]);
}

#[test]
fn legacy_index_entries_are_coerced() {
    let dir = tempfile::tempdir().expect("tempdir");
    let (store, state) = initialized(dir.path());
    let index_path = store
        .layout()
        .index_path(&state, false, ArtifactKind::Reduction);
    fs::create_dir_all(index_path.parent().expect("parent")).expect("kind dir");
    fs::write(
        &index_path,
        serde_json::to_vec(&json!([{
            "runNumber": 57514,
            "useLiteMode": false,
            "version": 1,
            "appliesTo": ">=57000",
            "timestamp": 1_711_715_400_250_i64,
        }]))
        .expect("encode"),
    )
    .expect("write index");
    let record_path = store
        .layout()
        .record_path(&state, false, ArtifactKind::Reduction, 1);
    fs::create_dir_all(record_path.parent().expect("parent")).expect("version dir");
    fs::write(
        &record_path,
        serde_json::to_vec(&json!({
            "runNumber": "57514",
            "useLiteMode": false,
            "version": 1,
            "stateId": state.as_str(),
            "calculationParameters": {"keepUnfocused": true},
        }))
        .expect("encode"),
    )
    .expect("write record");

    let resolved = store
        .read_record_for_state::<Value>(
            &state,
            ArtifactKind::Reduction,
            RunNumber::new(57600),
            false,
            Version::Latest,
        )
        .expect("legacy record");
    assert_eq!(resolved.entry.run_number, RunNumber::new(57514));
    assert!(resolved.entry.record_digest.is_none());
    assert_eq!(resolved.record.calculation_parameters["keepUnfocused"], json!(true));
}

#[test]
fn string_versions_in_index_are_rejected() {
    let dir = tempfile::tempdir().expect("tempdir");
    let (store, state) = initialized(dir.path());
    let index_path = store
        .layout()
        .index_path(&state, false, ArtifactKind::Calibration);
    fs::create_dir_all(index_path.parent().expect("parent")).expect("kind dir");
    fs::write(
        &index_path,
        r#"[{"runNumber": "1", "useLiteMode": false, "version": "1", "timestamp": "2024-03-29T12:30:00Z"}]"#,
    )
    .expect("write index");

    let err = store
        .read_index(&state, ArtifactKind::Calibration, false)
        .unwrap_err();
    assert!(matches!(err, StoreError::Json { .. }));
}

#[test]
fn init_state_seeds_default_grouping_map_once() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = store_in(dir.path());
    let groupings = store.config().grouping_root();
    fs::create_dir_all(&groupings).expect("grouping root");
    fs::write(groupings.join("Column.xml"), "<grouping/>").expect("column");
    fs::write(groupings.join("All.nxs"), b"\x89HDF").expect("all");
    fs::write(
        groupings.join("defaultGroupingMap.json"),
        serde_json::to_vec(&json!({
            "stateId": "0000000000000000",
            "nativeFocusGroups": [
                {"name": "Column", "definition": "Column.xml"},
                {"name": "Bank", "definition": "Bank.xml"},
            ],
            "liteFocusGroups": [
                {"name": "All", "definition": "All.nxs"},
            ],
        }))
        .expect("encode"),
    )
    .expect("default map");

    let first = store.init_state(&fingerprint()).expect("init");
    assert_eq!(first.grouping_map.state_id, first.state_id.as_str());
    let second = store.init_state(&fingerprint()).expect("re-init");
    assert_eq!(
        calib_model::timestamp::format(&first.created_at),
        calib_model::timestamp::format(&second.created_at)
    );

    let map = store.grouping_map(&first.state_id).expect("grouping map");
    assert_eq!(
        map.groups(false).keys().collect::<Vec<_>>(),
        vec!["Column"]
    );
    assert!(map.get(true, "All").is_some());
    assert_eq!(store.list_states().expect("list"), vec![first.state_id]);
}

#[test]
fn foreign_state_config_is_rejected() {
    let dir = tempfile::tempdir().expect("tempdir");
    let (store, state) = initialized(dir.path());
    let path = store.layout().state_config_path(&state);
    let mut config: Value = serde_json::from_slice(&fs::read(&path).expect("read")).expect("json");
    config["groupingMap"]["stateId"] = json!("ffffffffffffffff");
    fs::write(&path, serde_json::to_vec(&config).expect("encode")).expect("write");

    let err = store.state_config(&state).unwrap_err();
    assert!(matches!(
        err,
        StoreError::InvalidArtifact {
            source: ModelError::StateIdentityMismatch { .. },
            ..
        }
    ));
}
