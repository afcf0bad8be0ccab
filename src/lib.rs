//! Kami search parameters.
//!
//! Declares the tunable options of the kami tree search and serves their
//! resolved values to a running search.

pub mod config;
pub mod encoder;
pub mod error;
pub mod options;
pub mod params;

pub use encoder::FillEmptyHistory;
pub use error::{OptionsError, Result};
pub use options::{
    OptionDef, OptionId, OptionKind, OptionValue, OptionsDict, OptionsParser, Schema,
};
pub use params::{CachedParams, SearchParams};
