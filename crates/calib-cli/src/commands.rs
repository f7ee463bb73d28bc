use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use tracing::{debug, info_span};

use calib_model::{
    AppliesTo, ArtifactKind, ContentDigest, DetectorState, RunNumber, StateFingerprint, Version,
};
use calib_store::{DataStore, ExportRequest, StoreConfig};

use crate::types::{
    ExportOptions, ExportReport, GroupsReport, IndexReport, ResolveReport, StateIdReport,
    StateSelector,
};

/// Build the store from an optional config file, `CALIB_DATA_ROOT` and an
/// optional `--data-root`, in increasing precedence.
pub fn open_store(config_path: Option<&Path>, data_root: Option<PathBuf>) -> Result<DataStore> {
    let config = match config_path {
        Some(path) => StoreConfig::load(path)
            .with_context(|| format!("load config {}", path.display()))?,
        None => StoreConfig::default(),
    };
    let mut config = config.with_env_overrides();
    if let Some(root) = data_root {
        config.data_root = root;
    }
    debug!(data_root = %config.data_root.display(), "opening store");
    DataStore::new(config).context("open store")
}

fn fingerprint_of(selector: &StateSelector) -> Result<Option<StateFingerprint>> {
    let fingerprint = match selector {
        StateSelector::Id(_) => return Ok(None),
        StateSelector::Detector(path) => {
            let bytes =
                std::fs::read(path).with_context(|| format!("read {}", path.display()))?;
            let detector: DetectorState = serde_json::from_slice(&bytes)
                .with_context(|| format!("parse detector readings {}", path.display()))?;
            detector.fingerprint()?
        }
        StateSelector::Readings {
            arc1,
            arc2,
            wavelength,
            frequency,
            position,
        } => StateFingerprint::from_readings(*arc1, *arc2, *wavelength, *frequency, *position)?,
    };
    Ok(Some(fingerprint))
}

/// The state identifier a selector names, plus its fingerprint when the
/// selector carried readings.
pub fn resolve_state(
    store: &DataStore,
    selector: &StateSelector,
) -> Result<(ContentDigest, Option<StateFingerprint>)> {
    if let Some(fingerprint) = fingerprint_of(selector)? {
        let state_id = store.state_id(&fingerprint)?;
        return Ok((state_id, Some(fingerprint)));
    }
    match selector {
        StateSelector::Id(text) => {
            let state_id = ContentDigest::from_hex(text)
                .with_context(|| format!("invalid state identifier {text:?}"))?;
            Ok((state_id, None))
        }
        _ => Err(anyhow!("no state selected")),
    }
}

pub fn run_state_id(store: &DataStore, selector: &StateSelector, init: bool) -> Result<StateIdReport> {
    let fingerprint = fingerprint_of(selector)?
        .ok_or_else(|| anyhow!("state-id needs detector readings, not a state identifier"))?;
    let state_id = store.state_id(&fingerprint)?;
    if init {
        store.init_state(&fingerprint).context("initialize state")?;
    }
    Ok(StateIdReport {
        fingerprint,
        state_dir: store.layout().state_dir(&state_id),
        initialized: store.layout().state_config_path(&state_id).is_file(),
        state_id,
    })
}

pub fn run_states(store: &DataStore) -> Result<Vec<ContentDigest>> {
    store.list_states().context("list states")
}

pub fn run_index(
    store: &DataStore,
    selector: &StateSelector,
    kind: ArtifactKind,
    use_lite_mode: bool,
) -> Result<IndexReport> {
    let (state_id, _) = resolve_state(store, selector)?;
    let index = store
        .read_index(&state_id, kind, use_lite_mode)
        .with_context(|| format!("read {kind} index for state {state_id}"))?;
    Ok(IndexReport {
        state_id,
        kind,
        use_lite_mode,
        entries: index.into_entries(),
    })
}

pub fn run_resolve(
    store: &DataStore,
    selector: &StateSelector,
    kind: ArtifactKind,
    use_lite_mode: bool,
    run_number: u64,
    requested: Version,
) -> Result<ResolveReport> {
    let (state_id, _) = resolve_state(store, selector)?;
    let resolved = store
        .read_record_for_state::<serde_json::Value>(
            &state_id,
            kind,
            RunNumber::new(run_number),
            use_lite_mode,
            requested,
        )
        .with_context(|| format!("resolve {requested} {kind} for run {run_number}"))?;
    let version = resolved.record.version.require_concrete("record", "version")?;
    Ok(ResolveReport {
        record_path: store
            .layout()
            .record_path(&state_id, use_lite_mode, kind, version),
        state_id,
        kind,
        run_number,
        requested,
        entry: resolved.entry,
        record: resolved.record,
    })
}

pub fn run_groups(store: &DataStore, selector: &StateSelector) -> Result<GroupsReport> {
    let (state_id, _) = resolve_state(store, selector)?;
    let config = store
        .state_config(&state_id)
        .with_context(|| format!("load state config for {state_id}"))?;
    let mut map = config
        .grouping_map
        .resolved_against(&store.config().grouping_root());
    let pruned = map.validate();
    Ok(GroupsReport {
        state_id,
        map,
        pruned,
    })
}

/// Store a payload file as the next version. A selector carrying readings
/// initializes the state first.
pub fn run_export(
    store: &DataStore,
    selector: &StateSelector,
    options: &ExportOptions,
) -> Result<ExportReport> {
    let (state_id, fingerprint) = resolve_state(store, selector)?;
    let _span = info_span!("export", state_id = %state_id, kind = %options.kind).entered();
    if let Some(fingerprint) = fingerprint {
        store.init_state(&fingerprint).context("initialize state")?;
    }

    let bytes = std::fs::read(&options.payload)
        .with_context(|| format!("read payload {}", options.payload.display()))?;
    let payload: serde_json::Value = serde_json::from_slice(&bytes)
        .with_context(|| format!("parse payload {}", options.payload.display()))?;
    let applies_to = options
        .applies_to
        .as_deref()
        .map(str::parse::<AppliesTo>)
        .transpose()
        .context("parse --applies-to")?;

    let mut request = ExportRequest::new(
        RunNumber::new(options.run_number),
        options.use_lite_mode,
        payload,
    )
    .comments(options.comments.clone())
    .author(options.author.clone());
    request.applies_to = applies_to;

    let entry = store
        .write_record(&state_id, options.kind, request)
        .with_context(|| format!("export {} for run {}", options.kind, options.run_number))?;
    let version = entry.version.require_concrete("index entry", "version")?;
    Ok(ExportReport {
        record_path: store
            .layout()
            .record_path(&state_id, options.use_lite_mode, options.kind, version),
        state_id,
        kind: options.kind,
        entry,
    })
}
