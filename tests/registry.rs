use kami_params::encoder::{History, HISTORY_LENGTH};
use kami_params::params::*;
use kami_params::{
    FillEmptyHistory, OptionKind, OptionValue, OptionsDict, OptionsError, OptionsParser,
    SearchParams,
};

use chess::Board;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

fn options() -> OptionsDict {
    let mut parser = OptionsParser::new();
    SearchParams::populate(&mut parser).expect("populate failed");
    parser.defaults()
}

/// Tests every getter returns its declared default.
#[test]
fn defaults_are_served() {
    let opts = options();
    let p = SearchParams::new(&opts).unwrap();

    assert_eq!(p.get_mini_batch_size(), 256);
    assert_eq!(p.get_max_prefetch_batch(), 32);
    assert_eq!(p.get_cpuct(), 3.0);
    assert_eq!(p.get_trade_penalty(), 0.0);
    assert_eq!(p.get_trade_penalty2(), 0.0);
    assert_eq!(p.get_temperature(), 0.0);
    assert_eq!(p.get_temperature_visit_offset(), 0.0);
    assert_eq!(p.get_temp_decay_moves(), 0);
    assert!(!p.get_noise());
    assert!(!p.get_verbose_stats());
    assert_eq!(p.get_smart_pruning_factor(), 1.33);
    assert_eq!(p.get_fpu_reduction(), 1.2);
    assert_eq!(p.get_cache_history_length(), 0);
    assert_eq!(p.get_policy_softmax_temp(), 2.2);
    assert_eq!(p.get_max_collision_events(), 32);
    assert_eq!(p.get_max_collision_visits(), 9999);
    assert!(p.get_out_of_order_eval());
    assert_eq!(p.get_multi_pv(), 1);
    assert_eq!(p.get_score_type(), "centipawn");
    assert_eq!(p.get_history_fill(), FillEmptyHistory::FenOnly);
}

/// Tests every declared default matches the value resolved from an empty dictionary.
#[test]
fn declared_defaults_resolve() {
    let opts = options();

    for def in SEARCH_OPTIONS.iter() {
        assert_eq!(opts.value(def.key()).unwrap(), def.default_value());
    }
}

/// Tests cached values do not follow later writes.
#[test]
fn cached_values_are_stable() {
    let opts = options();
    let p = SearchParams::new(&opts).unwrap();
    let before = *p.cached();

    opts.set(&CPUCT, 2.5).unwrap();
    opts.set(&TRADE_PENALTY, 1.0).unwrap();
    opts.set(&TRADE_PENALTY2, -1.0).unwrap();
    opts.set(&NOISE, true).unwrap();
    opts.set(&SMART_PRUNING_FACTOR, 0.0).unwrap();
    opts.set(&FPU_REDUCTION, 0.5).unwrap();
    opts.set(&CACHE_HISTORY_LENGTH, 7_i64).unwrap();
    opts.set(&POLICY_SOFTMAX_TEMP, 1.0).unwrap();
    opts.set(&MAX_COLLISION_EVENTS, 1_i64).unwrap();
    opts.set(&MAX_COLLISION_VISITS, 1_i64).unwrap();
    opts.set(&OUT_OF_ORDER_EVAL, false).unwrap();
    opts.set(&HISTORY_FILL, "no").unwrap();

    assert_eq!(*p.cached(), before);
    assert_eq!(p.get_cpuct(), 3.0);
    assert_eq!(p.get_trade_penalty(), 0.0);
    assert_eq!(p.get_trade_penalty2(), 0.0);
    assert!(!p.get_noise());
    assert_eq!(p.get_smart_pruning_factor(), 1.33);
    assert_eq!(p.get_fpu_reduction(), 1.2);
    assert_eq!(p.get_cache_history_length(), 0);
    assert_eq!(p.get_policy_softmax_temp(), 2.2);
    assert_eq!(p.get_max_collision_events(), 32);
    assert_eq!(p.get_max_collision_visits(), 9999);
    assert!(p.get_out_of_order_eval());
    assert_eq!(p.get_history_fill(), FillEmptyHistory::FenOnly);

    // A new view picks the changes up.
    let next = SearchParams::new(&opts).unwrap();
    assert_eq!(next.get_cpuct(), 2.5);
    assert_eq!(next.get_history_fill(), FillEmptyHistory::No);
}

/// Tests live values follow later writes.
#[test]
fn live_values_follow_writes() {
    let opts = options();
    let p = SearchParams::new(&opts).unwrap();

    opts.set(&MINI_BATCH_SIZE, 64_i64).unwrap();
    opts.set(&MAX_PREFETCH_BATCH, 0_i64).unwrap();
    opts.set(&TEMPERATURE, 1.0).unwrap();
    opts.set(&TEMPERATURE_VISIT_OFFSET, -0.5).unwrap();
    opts.set(&TEMP_DECAY_MOVES, 10_i64).unwrap();
    opts.set(&VERBOSE_STATS, true).unwrap();
    opts.set(&MULTI_PV, 4_i64).unwrap();
    opts.set(&SCORE_TYPE, "win_percentage").unwrap();

    assert_eq!(p.get_mini_batch_size(), 64);
    assert_eq!(p.get_max_prefetch_batch(), 0);
    assert_eq!(p.get_temperature(), 1.0);
    assert_eq!(p.get_temperature_visit_offset(), -0.5);
    assert_eq!(p.get_temp_decay_moves(), 10);
    assert!(p.get_verbose_stats());
    assert_eq!(p.get_multi_pv(), 4);
    assert_eq!(p.get_score_type(), "win_percentage");
}

/// Tests the mixed reconfiguration scenario: live minibatch, cached cpuct.
#[test]
fn reconfigure_minibatch_and_cpuct() {
    let opts = options();
    opts.set(&MINI_BATCH_SIZE, 32_i64).unwrap();
    opts.set(&CPUCT, 3.0).unwrap();

    let p = SearchParams::new(&opts).unwrap();

    opts.set_str("MinibatchSize", "64").unwrap();
    opts.set_str("cpuct", "2.5").unwrap();

    assert_eq!(p.get_mini_batch_size(), 64);
    assert_eq!(p.get_cpuct(), 3.0);
}

/// Tests a missing history-fill entry falls back to its default.
#[test]
fn missing_history_fill_uses_default() {
    let opts = options();
    opts.set(&HISTORY_FILL, "always").unwrap();
    opts.remove(HISTORY_FILL.key());

    let p = SearchParams::new(&opts).unwrap();

    assert_eq!(p.get_history_fill(), FillEmptyHistory::FenOnly);
}

/// Tests an unrecognized score type is refused at lookup.
#[test]
fn unknown_score_type_is_refused() {
    let opts = options();

    assert!(matches!(
        opts.set(&SCORE_TYPE, "pawns"),
        Err(OptionsError::InvalidValue { .. })
    ));

    opts.insert_raw("score-type", OptionValue::String("pawns".to_string()));

    assert!(matches!(
        opts.get::<String>(&SCORE_TYPE),
        Err(OptionsError::InvalidValue { .. })
    ));
    assert!(SearchParams::new(&opts).is_err());
}

/// Tests the same identity cannot be declared twice.
#[test]
fn duplicate_identity_is_refused() {
    let mut parser = OptionsParser::new();
    let kind = OptionKind::Float {
        default: 3.0,
        min: 0.0,
        max: 100.0,
    };

    parser.add(CPUCT, kind).unwrap();

    assert!(matches!(
        parser.add(CPUCT, kind),
        Err(OptionsError::DuplicateOption(_))
    ));
    assert!(matches!(
        SearchParams::populate(&mut parser),
        Err(OptionsError::DuplicateOption(_))
    ));
}

/// Tests a default outside its own bounds is refused.
#[test]
fn default_out_of_bounds_is_refused() {
    let mut parser = OptionsParser::new();
    let multi_pv = OptionKind::Int {
        default: 0,
        min: 1,
        max: 500,
    };
    let score_type = OptionKind::Choice {
        default: "pawns",
        choices: SCORE_TYPES,
    };

    assert!(matches!(
        parser.add(MULTI_PV, multi_pv),
        Err(OptionsError::DefaultOutOfBounds { .. })
    ));
    assert!(matches!(
        parser.add(SCORE_TYPE, score_type),
        Err(OptionsError::DefaultOutOfBounds { .. })
    ));
}

/// Tests workers read a stable cached value while the options are rewritten.
#[test]
fn concurrent_readers_see_stable_cache() {
    let opts = options();
    let p = SearchParams::new(&opts).unwrap();
    let done = AtomicBool::new(false);
    let (params, done) = (&p, &done);

    thread::scope(|s| {
        let mut readers = Vec::new();

        for _ in 0..4 {
            readers.push(s.spawn(move || {
                while !done.load(Ordering::Relaxed) {
                    assert_eq!(params.get_cpuct(), 3.0);
                    assert_eq!(params.get_max_collision_visits(), 9999);

                    let batch = params.get_mini_batch_size();
                    assert!(batch == 256 || batch == 128);
                }
            }));
        }

        for i in 0..1000 {
            let batch = if i % 2 == 0 { 128_i64 } else { 256_i64 };

            opts.set(&CPUCT, (i % 100) as f64 / 10.0).unwrap();
            opts.set(&MAX_COLLISION_VISITS, (i + 1) as i64).unwrap();
            opts.set(&MINI_BATCH_SIZE, batch).unwrap();
        }

        done.store(true, Ordering::Relaxed);

        for r in readers {
            r.join().expect("reader panicked");
        }
    });
}

/// Tests the cached history-fill policy drives the encoder padding.
#[test]
fn history_fill_drives_encoder() {
    let opts = options();
    opts.set_str("HistoryFill", "always").unwrap();

    let p = SearchParams::new(&opts).unwrap();
    let h = History::new(&Board::default());
    let window = h.window(HISTORY_LENGTH, p.get_history_fill());

    assert_eq!(window.len(), HISTORY_LENGTH);
    assert!(window.iter().all(|f| !f.is_empty()));
}
