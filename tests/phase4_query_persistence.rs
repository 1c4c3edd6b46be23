//! Phase 4 tests: live queries, cost, runtime tuning and .mmdb persistence.

use std::sync::{Arc, Mutex};

use motion_match::cli::commands::{parse_mask, parse_vector};
use motion_match::config::MatcherConfig;
use motion_match::database::PoseDatabase;
use motion_match::engine::{match_cost, MatchSnapshot, MotionMatcher, QueryEngine, QueryParams};
use motion_match::features::{
    Blackboard, ChannelFeature, CharacterContext, FeatureProvider, ProviderConfig,
};
use motion_match::format::compression::{compress_names, decompress_names};
use motion_match::format::MmdbReader;
use motion_match::index::DistanceMetric;
use motion_match::stats::DatasetStats;
use motion_match::types::{
    AnimationClip, CategoryFilter, ClipLibrary, FeatureVector, MotionError,
};

use tempfile::NamedTempFile;

const IDLE: u64 = 0b01;
const RUN: u64 = 0b10;

fn library() -> ClipLibrary {
    let mut library = ClipLibrary::new();
    library.add(
        AnimationClip::new("idle", 2.0, true)
            .with_channel("pos", vec![(0.0, vec![0.0]), (2.0, vec![2.0])])
            .with_category_track("tags", vec![(0.0, IDLE)]),
    );
    library.add(
        AnimationClip::new("run", 2.0, true)
            .with_channel("pos", vec![(0.0, vec![10.0]), (2.0, vec![12.0])])
            .with_category_track("tags", vec![(0.0, RUN)]),
    );
    library
}

fn config() -> MatcherConfig {
    MatcherConfig {
        category_tracks: vec!["tags".into()],
        providers: vec![ProviderConfig::channel("pos", "pos", 1)],
        ..MatcherConfig::default()
    }
}

fn baked() -> MotionMatcher {
    let mut matcher = MotionMatcher::from_config(config()).unwrap();
    matcher.setup(CharacterContext::default()).unwrap();
    matcher.bake(&library()).unwrap();
    matcher
}

/// Two-dimensional provider whose weight hint can be changed from outside.
struct Tunable {
    hint: Arc<Mutex<Vec<f32>>>,
}

impl FeatureProvider for Tunable {
    fn name(&self) -> &str {
        "tunable"
    }

    fn dimension(&self) -> usize {
        2
    }

    fn sample_at(&mut self, clip: &AnimationClip, time: f32) -> FeatureVector {
        let pos = clip.channel_at("pos", time).unwrap_or_default();
        pos.iter().flat_map(|&p| [p, -p]).collect()
    }

    fn sample_live(&mut self, state: &Blackboard, _dt: f32) -> FeatureVector {
        let pos = state.get("pos").unwrap_or_default();
        pos.iter().flat_map(|&p| [p, -p]).collect()
    }

    fn weight_hint(&self) -> Vec<f32> {
        self.hint.lock().unwrap().clone()
    }
}

/// Three 2-dim poses: idle [0,0] and [1,0], run [5,5], identity stats.
fn small_snapshot() -> MatchSnapshot {
    let database = PoseDatabase::from_parts(
        2,
        vec![0.0, 0.0, 1.0, 0.0, 5.0, 5.0],
        vec![0, 0, 1],
        vec![0.1, 0.2, 0.1],
        vec![IDLE, RUN, IDLE],
        vec!["idle".into(), "run".into()],
        DatasetStats::identity(2),
    )
    .unwrap();
    MatchSnapshot::from_database(database, vec![], DistanceMetric::Manhattan, 2, 0).unwrap()
}

// ==================== Query Engine Tests ====================

#[test]
fn test_engine_nearest_pose_with_cost() {
    let results = QueryEngine::new()
        .search(&small_snapshot(), &[0.9, 0.0], &QueryParams::default())
        .unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].clip_name, "idle");
    assert!((results[0].timestamp - 0.2).abs() < 1e-6);
    assert!((results[0].cost - 0.1).abs() < 1e-6);
}

#[test]
fn test_engine_filter_respects_masks() {
    let params = QueryParams::filtered(IDLE, 0).with_max_results(5);
    let results = QueryEngine::new()
        .search(&small_snapshot(), &[0.9, 0.0], &params)
        .unwrap();
    assert_eq!(results.len(), 2);
    assert!((results[0].timestamp - 0.1).abs() < 1e-6);
    assert_eq!(results[1].clip_name, "run");
}

#[test]
fn test_engine_raw_search_and_empty_snapshot() {
    let hits = QueryEngine::new()
        .search_raw(&small_snapshot(), &[5.0, 4.0], 1, None)
        .unwrap();
    assert_eq!(hits[0].row, 2);
    assert_eq!(hits[0].category, IDLE);
    assert_eq!(hits[0].distance, 1.0);

    let empty = MatchSnapshot::empty(2, DistanceMetric::Manhattan);
    assert!(QueryEngine::new()
        .search(&empty, &[0.0, 0.0], &QueryParams::default())
        .unwrap()
        .is_empty());
}

#[test]
fn test_cost_indexes_weights_by_dimension() {
    assert_eq!(match_cost(&[2.0, 0.5], &[1.0, 4.0], &[0.0, 0.0]), 4.0);
    assert_eq!(match_cost(&[], &[1.0, 4.0], &[0.0, 0.0]), 5.0);
}

// ==================== Query Tests ====================

#[test]
fn test_unbound_matcher_refuses_to_bake() {
    let mut empty = MotionMatcher::new(MatcherConfig::default());
    assert!(matches!(empty.bake(&library()), Err(MotionError::NoProviders)));

    let mut unbound = MotionMatcher::new(config());
    unbound.add_provider(Box::new(ChannelFeature::new("pos", "pos", 1, vec![])));
    assert!(matches!(
        unbound.bake(&library()),
        Err(MotionError::ContextUnbound)
    ));
}

#[test]
fn test_query_pose_finds_exact_pose() {
    let mut matcher = baked();
    matcher.blackboard_mut().set("pos", vec![1.0]);

    let results = matcher.query_pose(u64::MAX, 0).unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].clip_name, "idle");
    assert!((results[0].timestamp - 1.0).abs() < 1e-4);
    assert!(results[0].cost.abs() < 1e-6);
}

#[test]
fn test_query_pose_respects_include_and_exclude() {
    let mut matcher = baked();
    matcher.blackboard_mut().set("pos", vec![1.0]);

    let only_run = matcher.query_pose(RUN, 0).unwrap();
    assert_eq!(only_run[0].clip_name, "run");
    assert!((only_run[0].timestamp - 0.1).abs() < 1e-4);

    let not_idle = matcher.query_pose(u64::MAX, IDLE).unwrap();
    assert_eq!(not_idle, only_run);

    assert!(matcher.query_pose(0b100, 0).unwrap().is_empty());
    assert!(matcher.query_pose(u64::MAX, IDLE | RUN).unwrap().is_empty());
}

#[test]
fn test_k_results_are_sorted_by_cost() {
    let mut matcher = baked();
    matcher.blackboard_mut().set("pos", vec![1.03]);

    let results = matcher.query_pose_k(u64::MAX, 0, 5).unwrap();
    assert_eq!(results.len(), 5);
    assert!(results.iter().all(|r| r.clip_name == "idle"));
    assert!(results.windows(2).all(|w| w[0].cost <= w[1].cost));
    assert!((results[0].timestamp - 1.0).abs() < 1e-4);
}

#[test]
fn test_cost_matches_weighted_difference() {
    let mut matcher = baked();
    matcher.blackboard_mut().set("pos", vec![11.04]);
    let result = matcher.query_pose(u64::MAX, 0).unwrap().remove(0);

    let snapshot = matcher.snapshot();
    let query = snapshot.database.stats().normalize(&[11.04]).unwrap();
    let hit = matcher.search_raw(&query, 1, None).unwrap().remove(0);
    let row = snapshot.database.pose(hit.row).unwrap();
    assert_eq!(hit.clip_name, result.clip_name);
    assert_eq!(result.cost, match_cost(&snapshot.weights, row, &query));
}

#[test]
fn test_live_length_mismatch_is_an_error() {
    let mut matcher = baked();
    assert!(matches!(
        matcher.query_pose(u64::MAX, 0),
        Err(MotionError::DimensionMismatch {
            expected: 1,
            got: 0
        })
    ));
}

#[test]
fn test_stale_clip_index_is_skipped() {
    // row 1 points at a clip that has no name
    let database = PoseDatabase::from_parts(
        1,
        vec![0.0, 0.1, 5.0],
        vec![0, 3, 0],
        vec![0.1, 0.2, 0.3],
        vec![0, 0, 0],
        vec!["idle".into()],
        DatasetStats::identity(1),
    )
    .unwrap();
    let snapshot =
        MatchSnapshot::from_database(database, vec![], DistanceMetric::Manhattan, 4, 0).unwrap();

    let params = QueryParams::default().with_max_results(3);
    let results = QueryEngine::new().search(&snapshot, &[0.1], &params).unwrap();
    assert_eq!(results.len(), 2);
    assert!(results.iter().all(|r| r.clip_name == "idle"));
    assert!((results[0].timestamp - 0.1).abs() < 1e-6);
}

// ==================== Runtime Tuning ====================

#[test]
fn test_recalculate_weights_is_copy_on_write() {
    let hint = Arc::new(Mutex::new(vec![1.0, 1.0]));
    let mut matcher = MotionMatcher::new(config());
    matcher.add_provider(Box::new(Tunable {
        hint: Arc::clone(&hint),
    }));
    matcher.setup(CharacterContext::default()).unwrap();
    matcher.bake(&library()).unwrap();
    let held = matcher.snapshot();
    assert_eq!(held.weights, vec![1.0, 1.0]);

    *hint.lock().unwrap() = vec![3.0, 1.0];
    let weights = matcher.recalculate_weights().unwrap();
    assert!((weights[0] - 3.0).abs() < 1e-5);
    assert!((weights[1] - 1.0).abs() < 1e-5);

    assert_eq!(held.weights, vec![1.0, 1.0]);
    assert_eq!(matcher.snapshot().weights, weights);
    assert_eq!(matcher.snapshot().index.distance().weights, weights);
    assert_eq!(matcher.snapshot().database, held.database);
}

#[test]
fn test_recalculate_weights_before_bake() {
    let mut matcher = MotionMatcher::from_config(config()).unwrap();
    assert_eq!(matcher.recalculate_weights().unwrap(), vec![1.0]);
    assert!(matcher.snapshot().is_empty());

    let mut none = MotionMatcher::new(MatcherConfig::default());
    assert!(matches!(
        none.recalculate_weights(),
        Err(MotionError::NoProviders)
    ));
}

#[test]
fn test_set_metric_keeps_results_valid() {
    let mut matcher = baked();
    matcher.blackboard_mut().set("pos", vec![1.0]);
    let before = matcher.query_pose(u64::MAX, 0).unwrap();

    for metric in [DistanceMetric::Chebyshev, DistanceMetric::SquaredEuclidean] {
        matcher.set_metric(metric);
        assert_eq!(matcher.snapshot().metric(), metric);
        assert_eq!(matcher.config().metric, metric);
        let after = matcher.query_pose(u64::MAX, 0).unwrap();
        // one dimension: every metric ranks identically
        assert_eq!(after[0].clip_name, before[0].clip_name);
        assert_eq!(after[0].timestamp, before[0].timestamp);
    }
}

#[test]
fn test_tick_reaches_velocity_provider() {
    let mut config = config();
    config.providers = vec![ProviderConfig::velocity("vel", "pos", 1)];
    let mut matcher = MotionMatcher::from_config(config).unwrap();
    matcher.setup(CharacterContext::default()).unwrap();

    matcher.blackboard_mut().set("pos", vec![0.0]);
    assert_eq!(matcher.live_features().unwrap(), vec![0.0]);

    matcher.tick(0.25);
    matcher.tick(0.25);
    matcher.blackboard_mut().set("pos", vec![1.0]);
    let velocity = matcher.live_features().unwrap();
    assert!((velocity[0] - 2.0).abs() < 1e-5);
}

#[test]
fn test_snapshot_queried_from_threads() {
    let matcher = baked();
    let snapshot = matcher.snapshot();
    let query = snapshot.database.stats().normalize(&[1.5]).unwrap();
    let params = QueryParams::filtered(u64::MAX, 0).with_max_results(3);
    let expected = QueryEngine::new().search(&snapshot, &query, &params).unwrap();

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let snapshot = Arc::clone(&snapshot);
            let query = query.clone();
            std::thread::spawn(move || QueryEngine::new().search(&snapshot, &query, &params).unwrap())
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.join().unwrap(), expected);
    }
}

#[test]
fn test_any_filter_matches_unfiltered_search() {
    let matcher = baked();
    let snapshot = matcher.snapshot();
    let query = snapshot.database.stats().normalize(&[10.7]).unwrap();
    let filtered = matcher.search_raw(&query, 4, Some(&CategoryFilter::ANY)).unwrap();
    let plain = matcher.search_raw(&query, 4, None).unwrap();
    assert_eq!(filtered, plain);
    assert!(plain.iter().all(|h| h.category == RUN));
}

#[test]
fn test_install_checks_dimension() {
    let mut matcher = baked();
    let before = matcher.snapshot();
    assert!(matches!(
        matcher.install(small_snapshot()),
        Err(MotionError::DimensionMismatch {
            expected: 1,
            got: 2
        })
    ));
    assert!(Arc::ptr_eq(&before, &matcher.snapshot()));

    let mut other = baked();
    other.set_metric(DistanceMetric::Chebyshev);
    matcher.install((*other.snapshot()).clone()).unwrap();
    assert_eq!(matcher.config().metric, DistanceMetric::Chebyshev);

    // without providers any dimension is accepted
    let mut raw = MotionMatcher::new(MatcherConfig::default());
    raw.install(small_snapshot()).unwrap();
    assert_eq!(raw.snapshot().dimension(), 2);
}

// ==================== Persistence Tests ====================

#[test]
fn test_save_load_roundtrip() {
    let mut matcher = baked();
    matcher.set_metric(DistanceMetric::SquaredEuclidean);
    let tmp = NamedTempFile::new().unwrap();
    matcher.save(tmp.path()).unwrap();

    let header = MmdbReader::read_header(tmp.path()).unwrap();
    assert_eq!(header.pose_count, matcher.snapshot().len() as u64);
    assert_eq!(header.dimension, 1);
    assert_eq!(header.clip_count, 2);

    let mut loaded = MotionMatcher::from_config(config()).unwrap();
    loaded.setup(CharacterContext::default()).unwrap();
    loaded.load(tmp.path()).unwrap();

    let (a, b) = (matcher.snapshot(), loaded.snapshot());
    assert_eq!(a.database, b.database);
    assert_eq!(a.weights, b.weights);
    assert_eq!(a.baked_at, b.baked_at);
    assert_eq!(b.metric(), DistanceMetric::SquaredEuclidean);
    assert_eq!(loaded.config().metric, DistanceMetric::SquaredEuclidean);

    for pos in [0.4, 1.7, 10.2, 11.9] {
        matcher.blackboard_mut().set("pos", vec![pos]);
        loaded.blackboard_mut().set("pos", vec![pos]);
        assert_eq!(
            matcher.query_pose_k(u64::MAX, 0, 3).unwrap(),
            loaded.query_pose_k(u64::MAX, 0, 3).unwrap()
        );
    }
}

#[test]
fn test_load_without_providers_supports_raw_search() {
    let matcher = baked();
    let tmp = NamedTempFile::new().unwrap();
    matcher.save(tmp.path()).unwrap();

    let mut reader = MotionMatcher::new(MatcherConfig::default());
    reader.load(tmp.path()).unwrap();
    let query = reader.snapshot().database.stats().normalize(&[11.0]).unwrap();
    let hits = reader.search_raw(&query, 1, None).unwrap();
    assert_eq!(hits[0].clip_name, "run");
    assert!((hits[0].timestamp - 1.0).abs() < 1e-4);
}

#[test]
fn test_load_rejects_wrong_dimension() {
    let matcher = baked();
    let tmp = NamedTempFile::new().unwrap();
    matcher.save(tmp.path()).unwrap();

    let mut config = config();
    config.providers.push(ProviderConfig::velocity("vel", "pos", 1));
    let mut wider = MotionMatcher::from_config(config).unwrap();
    assert!(matches!(
        wider.load(tmp.path()),
        Err(MotionError::DimensionMismatch {
            expected: 2,
            got: 1
        })
    ));
    assert!(wider.snapshot().is_empty());
}

#[test]
fn test_corrupt_files_keep_current_snapshot() {
    let mut matcher = baked();
    let before = matcher.snapshot();
    let tmp = NamedTempFile::new().unwrap();
    matcher.save(tmp.path()).unwrap();
    let bytes = std::fs::read(tmp.path()).unwrap();

    let mut bad_magic = bytes.clone();
    bad_magic[..4].copy_from_slice(b"NOPE");
    std::fs::write(tmp.path(), &bad_magic).unwrap();
    assert!(matches!(
        matcher.load(tmp.path()),
        Err(MotionError::InvalidMagic)
    ));

    std::fs::write(tmp.path(), &bytes[..bytes.len() / 2]).unwrap();
    assert!(matcher.load(tmp.path()).is_err());

    std::fs::write(tmp.path(), &bytes[..40]).unwrap();
    assert!(matches!(
        matcher.load(tmp.path()),
        Err(MotionError::Truncated)
    ));

    assert!(Arc::ptr_eq(&before, &matcher.snapshot()));
}

#[test]
fn test_missing_file_is_io_error() {
    let mut matcher = baked();
    let dir = tempfile::tempdir().unwrap();
    assert!(matches!(
        matcher.load(&dir.path().join("missing.mmdb")),
        Err(MotionError::Io(_))
    ));
}

#[test]
fn test_short_input_is_truncated() {
    let mut input = std::io::Cursor::new(vec![0u8; 10]);
    assert!(matches!(
        MmdbReader::read_from(&mut input, 8),
        Err(MotionError::Truncated)
    ));
}

#[test]
fn test_clip_names_survive_compression() {
    let names = vec!["idle".to_string(), String::new(), "walk\nturn".to_string()];
    let packed = compress_names(&names);
    assert_eq!(decompress_names(&packed, 3).unwrap(), names);
    assert!(decompress_names(&packed, 4).is_err());
    assert!(decompress_names(&packed, 2).is_err());

    assert!(matches!(
        decompress_names(&[16, 0, 0, 0, 0xF0], 1),
        Err(MotionError::Compression(_))
    ));
}

// ==================== CLI Parsing ====================

#[test]
fn test_masks_in_any_base() {
    assert_eq!(parse_mask("5").unwrap(), 5);
    assert_eq!(parse_mask("0x10").unwrap(), 16);
    assert_eq!(parse_mask("0b0101").unwrap(), 5);
    assert_eq!(parse_mask("0xFFFF_FFFF_FFFF_FFFF").unwrap(), u64::MAX);
    assert!(parse_mask("walk").is_err());
}

#[test]
fn test_vectors_from_commas() {
    assert_eq!(parse_vector("0.5, -1,2").unwrap(), vec![0.5, -1.0, 2.0]);
    assert!(parse_vector("1,,2").is_err());
}
