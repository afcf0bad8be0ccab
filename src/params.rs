//! Search parameters.
//!
//! [`SearchParams::populate`] declares every search option. [`SearchParams::new`]
//! then builds a per-search view over a resolved [`OptionsDict`]. Options that sit
//! on hot paths, or that must not change while a search is running, are copied
//! into [`CachedParams`] once. The rest are looked up on every call so they can
//! be reconfigured between or during searches.

use crate::encoder::FillEmptyHistory;
use crate::error::Result;
use crate::options::{
    FromOptionValue, OptionDef, OptionId, OptionKind, OptionsDict, OptionsParser,
};

use tracing::info;

pub const MINI_BATCH_SIZE: OptionId = OptionId::new(
    "minibatch-size",
    "MinibatchSize",
    "How many positions the engine tries to batch together for parallel NN computation. \
     Larger batches may reduce strength a bit, especially with a small number of playouts.",
);

pub const MAX_PREFETCH_BATCH: OptionId = OptionId::new(
    "max-prefetch",
    "MaxPrefetch",
    "When the engine cannot gather a large enough batch for immediate use, try to prefetch \
     up to X positions which are likely to be useful soon, and put them into cache.",
);

pub const CPUCT: OptionId = OptionId::new(
    "cpuct",
    "CPuct",
    "cpuct_init constant from the UCT search algorithm. Higher values promote more \
     exploration/wider search, lower values promote less exploration/deeper search.",
);

pub const TRADE_PENALTY: OptionId = OptionId::new(
    "trade-penalty",
    "TradePenalty",
    "Adjustment applied to the evaluation of captures that trade material. \
     Positive values discourage trades.",
);

pub const TRADE_PENALTY2: OptionId = OptionId::new(
    "trade-penalty2",
    "TradePenalty2",
    "Second-order trade adjustment, scaled by the amount of material left on the board.",
);

pub const TEMPERATURE: OptionId = OptionId::new(
    "temperature",
    "Temperature",
    "Tau value from softmax formula for the first move. If equal to 0, the engine picks the \
     best move to make. Larger values increase randomness while making the move.",
);

pub const TEMP_DECAY_MOVES: OptionId = OptionId::new(
    "tempdecay-moves",
    "TempDecayMoves",
    "Reduce temperature for every move from the game start to this number of moves, \
     decreasing linearly from initial temperature to 0. A value of 0 disables tempdecay.",
);

pub const TEMPERATURE_VISIT_OFFSET: OptionId = OptionId::new(
    "temp-visit-offset",
    "TempVisitOffset",
    "Adjusts visits by this value when picking a move with a temperature. If a negative \
     offset reduces visits for a particular move below zero, that move is not picked. If no \
     moves can be picked, no temperature is used.",
);

pub const NOISE: OptionId = OptionId::new(
    "noise",
    "DirichletNoise",
    "Add Dirichlet noise to root node prior probabilities. This allows the engine to discover \
     new ideas during training by exploring moves which are known to be bad. Not normally \
     used during play.",
);

pub const VERBOSE_STATS: OptionId = OptionId::new(
    "verbose-move-stats",
    "VerboseMoveStats",
    "Display Q, V, N, U and P values of every move candidate after each move.",
);

pub const SMART_PRUNING_FACTOR: OptionId = OptionId::new(
    "smart-pruning-factor",
    "SmartPruningFactor",
    "Do not spend time on the moves which cannot become bestmove. The larger the number, \
     the more aggressive the pruning. 0 disables smart pruning.",
);

pub const FPU_REDUCTION: OptionId = OptionId::new(
    "fpu-reduction",
    "FpuReduction",
    "First Play Urgency reduction. Normally when a move has no visits, its eval is assumed \
     to be equal to parent's eval. With non-zero FPU reduction, eval of unvisited move is \
     decreased by that value, discouraging visits of unvisited moves.",
);

pub const CACHE_HISTORY_LENGTH: OptionId = OptionId::new(
    "cache-history-length",
    "CacheHistoryLength",
    "Length of history, in half-moves, to include into the cache key. When this value is \
     less than history that NN uses to eval a position, it's possible that the search will \
     use eval of the same position with different history taken from cache.",
);

pub const POLICY_SOFTMAX_TEMP: OptionId = OptionId::new(
    "policy-softmax-temp",
    "PolicyTemperature",
    "Policy softmax temperature. Higher values make priors of move candidates closer to \
     each other, widening the search.",
);

pub const MAX_COLLISION_EVENTS: OptionId = OptionId::new(
    "max-collision-events",
    "MaxCollisionEvents",
    "Allowed node collision events, per batch.",
);

pub const MAX_COLLISION_VISITS: OptionId = OptionId::new(
    "max-collision-visits",
    "MaxCollisionVisits",
    "Total allowed node collision visits, per batch.",
);

pub const OUT_OF_ORDER_EVAL: OptionId = OptionId::new(
    "out-of-order-eval",
    "OutOfOrderEval",
    "During the gathering of a batch for NN to eval, if position happens to be in the cache \
     or is terminal, evaluate it right away without sending the batch to the NN. When off, \
     this may only happen with the very first node of a batch; when on, this can happen \
     with any node.",
);

pub const MULTI_PV: OptionId = OptionId::new(
    "multipv",
    "MultiPV",
    "Number of game play lines (principal variations) to show in UCI info output.",
);

pub const SCORE_TYPE: OptionId = OptionId::new(
    "score-type",
    "ScoreType",
    "What to display as score. Either centipawns (the UCI default), win percentage or Q \
     (the actual internal score) multiplied by 100.",
);

pub const HISTORY_FILL: OptionId = OptionId::new(
    "history-fill",
    "HistoryFill",
    "Neural network uses 7 previous board positions in addition to the current one. During \
     the first moves of the game such historical positions don't exist, but they can be \
     synthesized. This parameter defines when to synthesize them (always, never, or only at \
     non-standard fen position).",
);

/// Recognized `score-type` values.
pub const SCORE_TYPES: &[&str] = &["centipawn", "win_percentage", "Q"];

/// Every search option with its default and bounds, in declaration order.
pub const SEARCH_OPTIONS: [OptionDef; 20] = [
    OptionDef {
        id: MINI_BATCH_SIZE,
        kind: OptionKind::Int {
            default: 256,
            min: 1,
            max: 1024,
        },
    },
    OptionDef {
        id: MAX_PREFETCH_BATCH,
        kind: OptionKind::Int {
            default: 32,
            min: 0,
            max: 1024,
        },
    },
    OptionDef {
        id: CPUCT,
        kind: OptionKind::Float {
            default: 3.0,
            min: 0.0,
            max: 100.0,
        },
    },
    OptionDef {
        id: TRADE_PENALTY,
        kind: OptionKind::Float {
            default: 0.0,
            min: -100.0,
            max: 100.0,
        },
    },
    OptionDef {
        id: TRADE_PENALTY2,
        kind: OptionKind::Float {
            default: 0.0,
            min: -100.0,
            max: 100.0,
        },
    },
    OptionDef {
        id: TEMPERATURE,
        kind: OptionKind::Float {
            default: 0.0,
            min: 0.0,
            max: 100.0,
        },
    },
    OptionDef {
        id: TEMP_DECAY_MOVES,
        kind: OptionKind::Int {
            default: 0,
            min: 0,
            max: 100,
        },
    },
    OptionDef {
        id: TEMPERATURE_VISIT_OFFSET,
        kind: OptionKind::Float {
            default: 0.0,
            min: -1000.0,
            max: 1000.0,
        },
    },
    OptionDef {
        id: NOISE,
        kind: OptionKind::Bool { default: false },
    },
    OptionDef {
        id: VERBOSE_STATS,
        kind: OptionKind::Bool { default: false },
    },
    OptionDef {
        id: SMART_PRUNING_FACTOR,
        kind: OptionKind::Float {
            default: 1.33,
            min: 0.0,
            max: 10.0,
        },
    },
    OptionDef {
        id: FPU_REDUCTION,
        kind: OptionKind::Float {
            default: 1.2,
            min: -100.0,
            max: 100.0,
        },
    },
    OptionDef {
        id: CACHE_HISTORY_LENGTH,
        kind: OptionKind::Int {
            default: 0,
            min: 0,
            max: 7,
        },
    },
    OptionDef {
        id: POLICY_SOFTMAX_TEMP,
        kind: OptionKind::Float {
            default: 2.2,
            min: 0.1,
            max: 10.0,
        },
    },
    OptionDef {
        id: MAX_COLLISION_EVENTS,
        kind: OptionKind::Int {
            default: 32,
            min: 1,
            max: 1024,
        },
    },
    OptionDef {
        id: MAX_COLLISION_VISITS,
        kind: OptionKind::Int {
            default: 9999,
            min: 1,
            max: 1_000_000,
        },
    },
    OptionDef {
        id: OUT_OF_ORDER_EVAL,
        kind: OptionKind::Bool { default: true },
    },
    OptionDef {
        id: MULTI_PV,
        kind: OptionKind::Int {
            default: 1,
            min: 1,
            max: 500,
        },
    },
    OptionDef {
        id: SCORE_TYPE,
        kind: OptionKind::Choice {
            default: "centipawn",
            choices: SCORE_TYPES,
        },
    },
    OptionDef {
        id: HISTORY_FILL,
        kind: OptionKind::Choice {
            default: "fen_only",
            choices: FillEmptyHistory::CHOICES,
        },
    },
];

/// Values read once when a [`SearchParams`] is built.
///
/// These must stay fixed for a whole search, either because they feed the
/// per-node hot path or because concurrent workers have to agree on them.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CachedParams {
    pub cpuct: f64,
    pub trade_penalty: f64,
    pub trade_penalty2: f64,
    pub noise: bool,
    pub smart_pruning_factor: f64,
    pub fpu_reduction: f64,
    pub cache_history_length: usize,
    pub policy_softmax_temp: f64,
    pub max_collision_events: usize,
    pub max_collision_visits: usize,
    pub out_of_order_eval: bool,
    pub history_fill: FillEmptyHistory,
}

impl CachedParams {
    /// Reads every cached value from the dictionary.
    pub fn read(options: &OptionsDict) -> Result<Self> {
        Ok(CachedParams {
            cpuct: options.get(&CPUCT)?,
            trade_penalty: options.get(&TRADE_PENALTY)?,
            trade_penalty2: options.get(&TRADE_PENALTY2)?,
            noise: options.get(&NOISE)?,
            smart_pruning_factor: options.get(&SMART_PRUNING_FACTOR)?,
            fpu_reduction: options.get(&FPU_REDUCTION)?,
            cache_history_length: options.get(&CACHE_HISTORY_LENGTH)?,
            policy_softmax_temp: options.get(&POLICY_SOFTMAX_TEMP)?,
            max_collision_events: options.get(&MAX_COLLISION_EVENTS)?,
            max_collision_visits: options.get(&MAX_COLLISION_VISITS)?,
            out_of_order_eval: options.get(&OUT_OF_ORDER_EVAL)?,
            history_fill: options.get(&HISTORY_FILL)?,
        })
    }
}

/// Read-only view of the search parameters for one search.
///
/// Borrows the resolved options, which must outlive it. Not clonable: build a
/// new one for the next search instead.
#[derive(Debug)]
pub struct SearchParams<'a> {
    options: &'a OptionsDict,
    cached: CachedParams,
}

impl<'a> SearchParams<'a> {
    /// Declares every search option in `parser`.
    pub fn populate(parser: &mut OptionsParser) -> Result<()> {
        for def in SEARCH_OPTIONS.iter() {
            parser.add(def.id, def.kind)?;
        }

        Ok(())
    }

    /// Builds the view, caching the values that must stay fixed for the search.
    ///
    /// Every live option is also read once here, so a view that builds
    /// successfully does not fail on later reads unless the dictionary is
    /// corrupted behind its back.
    pub fn new(options: &'a OptionsDict) -> Result<Self> {
        let cached = CachedParams::read(options)?;

        options.get::<usize>(&MINI_BATCH_SIZE)?;
        options.get::<usize>(&MAX_PREFETCH_BATCH)?;
        options.get::<f64>(&TEMPERATURE)?;
        options.get::<f64>(&TEMPERATURE_VISIT_OFFSET)?;
        options.get::<usize>(&TEMP_DECAY_MOVES)?;
        options.get::<bool>(&VERBOSE_STATS)?;
        options.get::<usize>(&MULTI_PV)?;
        options.get::<String>(&SCORE_TYPE)?;

        info!(
            cpuct = cached.cpuct,
            fpu_reduction = cached.fpu_reduction,
            policy_softmax_temp = cached.policy_softmax_temp,
            noise = cached.noise,
            history_fill = %cached.history_fill,
            "search parameters ready"
        );

        Ok(SearchParams {
            options: options,
            cached: cached,
        })
    }

    /// Lookup failures here mean the option was never declared or was written
    /// with a bad value through an unchecked path. Neither is recoverable.
    fn live<T: FromOptionValue>(&self, id: &OptionId) -> T {
        match self.options.get(id) {
            Ok(v) => v,
            Err(e) => panic!("search parameter lookup failed: {}", e),
        }
    }

    pub fn options(&self) -> &'a OptionsDict {
        self.options
    }

    pub fn cached(&self) -> &CachedParams {
        &self.cached
    }

    pub fn get_mini_batch_size(&self) -> usize {
        self.live(&MINI_BATCH_SIZE)
    }

    pub fn get_max_prefetch_batch(&self) -> usize {
        self.live(&MAX_PREFETCH_BATCH)
    }

    pub fn get_cpuct(&self) -> f64 {
        self.cached.cpuct
    }

    pub fn get_trade_penalty(&self) -> f64 {
        self.cached.trade_penalty
    }

    pub fn get_trade_penalty2(&self) -> f64 {
        self.cached.trade_penalty2
    }

    pub fn get_temperature(&self) -> f64 {
        self.live(&TEMPERATURE)
    }

    pub fn get_temperature_visit_offset(&self) -> f64 {
        self.live(&TEMPERATURE_VISIT_OFFSET)
    }

    pub fn get_temp_decay_moves(&self) -> usize {
        self.live(&TEMP_DECAY_MOVES)
    }

    pub fn get_noise(&self) -> bool {
        self.cached.noise
    }

    pub fn get_verbose_stats(&self) -> bool {
        self.live(&VERBOSE_STATS)
    }

    pub fn get_smart_pruning_factor(&self) -> f64 {
        self.cached.smart_pruning_factor
    }

    pub fn get_fpu_reduction(&self) -> f64 {
        self.cached.fpu_reduction
    }

    pub fn get_cache_history_length(&self) -> usize {
        self.cached.cache_history_length
    }

    pub fn get_policy_softmax_temp(&self) -> f64 {
        self.cached.policy_softmax_temp
    }

    pub fn get_max_collision_events(&self) -> usize {
        self.cached.max_collision_events
    }

    pub fn get_max_collision_visits(&self) -> usize {
        self.cached.max_collision_visits
    }

    pub fn get_out_of_order_eval(&self) -> bool {
        self.cached.out_of_order_eval
    }

    pub fn get_multi_pv(&self) -> usize {
        self.live(&MULTI_PV)
    }

    pub fn get_score_type(&self) -> String {
        self.live(&SCORE_TYPE)
    }

    pub fn get_history_fill(&self) -> FillEmptyHistory {
        self.cached.history_fill
    }
}
