//! Generic option declarations and the resolved option store.
//!
//! Options are declared once into an [`OptionsParser`], which freezes them into
//! a shared [`Schema`]. An [`OptionsDict`] holds the resolved values for that
//! schema and may be rewritten at any time by configuration sources.

use crate::error::{OptionsError, Result};

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::debug;

/// Stable identity of a single option.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct OptionId {
    key: &'static str,
    uci_name: &'static str,
    help: &'static str,
}

impl OptionId {
    pub const fn new(key: &'static str, uci_name: &'static str, help: &'static str) -> Self {
        OptionId {
            key: key,
            uci_name: uci_name,
            help: help,
        }
    }

    /// Dictionary key, also used as the long command-line flag.
    pub fn key(&self) -> &'static str {
        self.key
    }

    /// Name shown to UCI clients.
    pub fn uci_name(&self) -> &'static str {
        self.uci_name
    }

    pub fn help(&self) -> &'static str {
        self.help
    }
}

impl fmt::Display for OptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key)
    }
}

/// Semantic type of an option, with its default and legal bounds.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum OptionKind {
    Int { default: i64, min: i64, max: i64 },
    Float { default: f64, min: f64, max: f64 },
    Bool { default: bool },
    Choice {
        default: &'static str,
        choices: &'static [&'static str],
    },
}

impl OptionKind {
    pub fn type_name(&self) -> &'static str {
        match self {
            OptionKind::Int { .. } => "int",
            OptionKind::Float { .. } => "float",
            OptionKind::Bool { .. } => "bool",
            OptionKind::Choice { .. } => "choice",
        }
    }

    pub fn default_value(&self) -> OptionValue {
        match *self {
            OptionKind::Int { default, .. } => OptionValue::Int(default),
            OptionKind::Float { default, .. } => OptionValue::Float(default),
            OptionKind::Bool { default } => OptionValue::Bool(default),
            OptionKind::Choice { default, .. } => OptionValue::String(default.to_string()),
        }
    }

    /// Checks the bounds themselves are well formed.
    fn check_bounds(&self) -> std::result::Result<(), String> {
        match *self {
            OptionKind::Int { min, max, .. } if min > max => {
                Err(format!("min {} is greater than max {}", min, max))
            }
            OptionKind::Float { min, max, .. } if min.is_nan() || max.is_nan() => {
                Err("bounds must not be NaN".to_string())
            }
            OptionKind::Float { min, max, .. } if min > max => {
                Err(format!("min {} is greater than max {}", min, max))
            }
            OptionKind::Choice { choices, .. } if choices.is_empty() => {
                Err("choice set is empty".to_string())
            }
            _ => Ok(()),
        }
    }
}

/// A concrete option value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptionValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl OptionValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            OptionValue::Bool(_) => "bool",
            OptionValue::Int(_) => "int",
            OptionValue::Float(_) => "float",
            OptionValue::String(_) => "string",
        }
    }
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionValue::Bool(v) => write!(f, "{}", v),
            OptionValue::Int(v) => write!(f, "{}", v),
            OptionValue::Float(v) => write!(f, "{}", v),
            OptionValue::String(v) => f.write_str(v),
        }
    }
}

impl From<bool> for OptionValue {
    fn from(v: bool) -> Self {
        OptionValue::Bool(v)
    }
}

impl From<i64> for OptionValue {
    fn from(v: i64) -> Self {
        OptionValue::Int(v)
    }
}

impl From<f64> for OptionValue {
    fn from(v: f64) -> Self {
        OptionValue::Float(v)
    }
}

impl From<&str> for OptionValue {
    fn from(v: &str) -> Self {
        OptionValue::String(v.to_string())
    }
}

impl From<String> for OptionValue {
    fn from(v: String) -> Self {
        OptionValue::String(v)
    }
}

/// Conversion from a stored value into a typed getter result.
pub trait FromOptionValue: Sized {
    /// Name used in type mismatch errors.
    const TYPE_NAME: &'static str;

    fn from_option(value: &OptionValue) -> Option<Self>;
}

impl FromOptionValue for i64 {
    const TYPE_NAME: &'static str = "int";

    fn from_option(value: &OptionValue) -> Option<Self> {
        match value {
            OptionValue::Int(v) => Some(*v),
            _ => None,
        }
    }
}

impl FromOptionValue for usize {
    const TYPE_NAME: &'static str = "int";

    fn from_option(value: &OptionValue) -> Option<Self> {
        match value {
            OptionValue::Int(v) => usize::try_from(*v).ok(),
            _ => None,
        }
    }
}

impl FromOptionValue for f64 {
    const TYPE_NAME: &'static str = "float";

    fn from_option(value: &OptionValue) -> Option<Self> {
        match value {
            OptionValue::Float(v) => Some(*v),
            _ => None,
        }
    }
}

impl FromOptionValue for bool {
    const TYPE_NAME: &'static str = "bool";

    fn from_option(value: &OptionValue) -> Option<Self> {
        match value {
            OptionValue::Bool(v) => Some(*v),
            _ => None,
        }
    }
}

impl FromOptionValue for String {
    const TYPE_NAME: &'static str = "string";

    fn from_option(value: &OptionValue) -> Option<Self> {
        match value {
            OptionValue::String(v) => Some(v.clone()),
            _ => None,
        }
    }
}

/// A declared option: identity plus type, default and bounds.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OptionDef {
    pub id: OptionId,
    pub kind: OptionKind,
}

impl OptionDef {
    pub fn key(&self) -> &'static str {
        self.id.key()
    }

    pub fn default_value(&self) -> OptionValue {
        self.kind.default_value()
    }

    /// Checks a value has the declared type and lies within the declared bounds.
    pub fn validate(&self, value: &OptionValue) -> Result<()> {
        let invalid = |reason: String| OptionsError::InvalidValue {
            option: self.key().to_string(),
            reason: reason,
        };

        match (&self.kind, value) {
            (OptionKind::Int { min, max, .. }, OptionValue::Int(v)) => {
                if v < min || v > max {
                    return Err(invalid(format!("{} is outside [{}, {}]", v, min, max)));
                }
            }
            (OptionKind::Float { min, max, .. }, OptionValue::Float(v)) => {
                if v.is_nan() || v < min || v > max {
                    return Err(invalid(format!("{} is outside [{}, {}]", v, min, max)));
                }
            }
            (OptionKind::Bool { .. }, OptionValue::Bool(_)) => {}
            (OptionKind::Choice { choices, .. }, OptionValue::String(v)) => {
                if !choices.contains(&v.as_str()) {
                    return Err(invalid(format!(
                        "'{}' is not one of {}",
                        v,
                        choices.join(", ")
                    )));
                }
            }
            (kind, value) => {
                return Err(OptionsError::TypeMismatch {
                    option: self.key().to_string(),
                    expected: kind.type_name(),
                    got: value.type_name(),
                })
            }
        }

        Ok(())
    }

    /// Normalizes a value before it is validated.
    ///
    /// Integers written to float options are widened, and choices are matched
    /// case-insensitively and stored in their declared spelling.
    pub fn coerce(&self, value: OptionValue) -> OptionValue {
        match (&self.kind, value) {
            (OptionKind::Float { .. }, OptionValue::Int(v)) => OptionValue::Float(v as f64),
            (OptionKind::Choice { choices, .. }, OptionValue::String(s)) => {
                match choices.iter().find(|c| c.eq_ignore_ascii_case(&s)) {
                    Some(c) => OptionValue::String(c.to_string()),
                    None => OptionValue::String(s),
                }
            }
            (_, value) => value,
        }
    }

    /// Parses option text (command line or UCI `setoption`) into a value.
    /// The result still has to pass [`OptionDef::validate`].
    pub fn parse(&self, text: &str) -> Result<OptionValue> {
        let text = text.trim();
        let parse_err = |reason: String| OptionsError::Parse {
            option: self.key().to_string(),
            reason: reason,
        };

        match self.kind {
            OptionKind::Int { .. } => text
                .parse::<i64>()
                .map(OptionValue::Int)
                .map_err(|_| parse_err(format!("invalid integer: '{}'", text))),
            OptionKind::Float { .. } => text
                .parse::<f64>()
                .map(OptionValue::Float)
                .map_err(|_| parse_err(format!("invalid number: '{}'", text))),
            OptionKind::Bool { .. } => parse_bool(text).map(OptionValue::Bool).ok_or_else(|| {
                parse_err(format!(
                    "invalid boolean: '{}' (expected true/false, yes/no, on/off, 1/0)",
                    text
                ))
            }),
            OptionKind::Choice { .. } => Ok(self.coerce(OptionValue::String(text.to_string()))),
        }
    }

    /// Renders the UCI `option` line announcing this option.
    /// UCI has no float type, so floats are announced as strings.
    pub fn uci_declaration(&self) -> String {
        let name = self.id.uci_name();

        match self.kind {
            OptionKind::Int { default, min, max } => format!(
                "option name {} type spin default {} min {} max {}",
                name, default, min, max
            ),
            OptionKind::Float { default, .. } => {
                format!("option name {} type string default {}", name, default)
            }
            OptionKind::Bool { default } => {
                format!("option name {} type check default {}", name, default)
            }
            OptionKind::Choice { default, choices } => {
                let mut out = format!("option name {} type combo default {}", name, default);

                for c in choices {
                    out.push_str(" var ");
                    out.push_str(c);
                }

                out
            }
        }
    }
}

fn parse_bool(text: &str) -> Option<bool> {
    match text.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Frozen table of declared options, in declaration order.
#[derive(Clone, Debug, Default)]
pub struct Schema {
    defs: Vec<OptionDef>,
    by_key: HashMap<&'static str, usize>,
}

impl Schema {
    /// Looks up a declaration by dictionary key.
    pub fn get(&self, key: &str) -> Option<&OptionDef> {
        self.by_key.get(key).map(|&i| &self.defs[i])
    }

    /// Looks up a declaration by key or by UCI name (case-insensitive).
    pub fn find(&self, name: &str) -> Option<&OptionDef> {
        self.get(name).or_else(|| {
            self.defs
                .iter()
                .find(|d| d.id.uci_name().eq_ignore_ascii_case(name))
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = &OptionDef> {
        self.defs.iter()
    }

    pub fn len(&self) -> usize {
        self.defs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }
}

/// Collects option declarations.
#[derive(Debug, Default)]
pub struct OptionsParser {
    schema: Schema,
}

impl OptionsParser {
    pub fn new() -> Self {
        OptionsParser::default()
    }

    /// Declares a new option.
    ///
    /// Fails if the key or UCI name is already taken, if the bounds are malformed,
    /// or if the default does not satisfy them.
    pub fn add(&mut self, id: OptionId, kind: OptionKind) -> Result<()> {
        if self.schema.by_key.contains_key(id.key()) {
            return Err(OptionsError::DuplicateOption(id.key().to_string()));
        }

        if self
            .schema
            .defs
            .iter()
            .any(|d| d.id.uci_name().eq_ignore_ascii_case(id.uci_name()))
        {
            return Err(OptionsError::DuplicateOption(id.uci_name().to_string()));
        }

        kind.check_bounds()
            .map_err(|reason| OptionsError::InvalidBounds {
                option: id.key().to_string(),
                reason: reason,
            })?;

        let def = OptionDef { id: id, kind: kind };

        def.validate(&def.default_value())
            .map_err(|e| OptionsError::DefaultOutOfBounds {
                option: id.key().to_string(),
                reason: e.to_string(),
            })?;

        debug!(key = id.key(), kind = kind.type_name(), "registered option");

        self.schema.by_key.insert(id.key(), self.schema.defs.len());
        self.schema.defs.push(def);

        Ok(())
    }

    /// Returns a frozen copy of everything declared so far.
    pub fn schema(&self) -> Arc<Schema> {
        Arc::new(self.schema.clone())
    }

    /// Returns a dictionary in which every declared option holds its default.
    pub fn defaults(&self) -> OptionsDict {
        OptionsDict::new(self.schema())
    }
}

/// Resolved option values.
///
/// Values missing from the dictionary resolve to their declared default.
/// Writes go through `&self` so the dictionary can be reconfigured while
/// readers borrow it.
#[derive(Debug)]
pub struct OptionsDict {
    schema: Arc<Schema>,
    values: RwLock<HashMap<String, OptionValue>>,
}

impl OptionsDict {
    /// Creates an empty dictionary over a schema.
    pub fn new(schema: Arc<Schema>) -> Self {
        OptionsDict {
            schema: schema,
            values: RwLock::new(HashMap::new()),
        }
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    fn def(&self, key: &str) -> Result<&OptionDef> {
        self.schema
            .get(key)
            .ok_or_else(|| OptionsError::UnknownOption(key.to_string()))
    }

    /// Resolves an option to a validated value.
    pub fn value(&self, key: &str) -> Result<OptionValue> {
        let def = self.def(key)?;
        let values = self.values.read().unwrap_or_else(PoisonError::into_inner);

        match values.get(key) {
            Some(v) => {
                def.validate(v)?;
                Ok(v.clone())
            }
            None => Ok(def.default_value()),
        }
    }

    /// Typed lookup.
    pub fn get<T: FromOptionValue>(&self, id: &OptionId) -> Result<T> {
        let value = self.value(id.key())?;

        T::from_option(&value).ok_or_else(|| OptionsError::TypeMismatch {
            option: id.key().to_string(),
            expected: T::TYPE_NAME,
            got: value.type_name(),
        })
    }

    /// Validated write.
    pub fn set(&self, id: &OptionId, value: impl Into<OptionValue>) -> Result<()> {
        let def = self.def(id.key())?;
        self.commit(vec![(def, value.into())]).map(|_| ())
    }

    /// Validated write addressed by key or UCI name.
    pub fn set_value(&self, name: &str, value: OptionValue) -> Result<()> {
        let def = self.find(name)?;
        self.commit(vec![(def, value)]).map(|_| ())
    }

    /// Parses and writes option text, addressed by key or UCI name.
    pub fn set_str(&self, name: &str, text: &str) -> Result<()> {
        let def = self.find(name)?;
        let value = def.parse(text)?;

        self.commit(vec![(def, value)]).map(|_| ())
    }

    /// Writes a group of values addressed by key or UCI name.
    ///
    /// Either every entry is written or none is. The group fails if any entry
    /// is unknown or invalid, or if two entries name the same option.
    /// Returns the number of values written.
    pub fn set_values<I, S>(&self, entries: I) -> Result<usize>
    where
        I: IntoIterator<Item = (S, OptionValue)>,
        S: AsRef<str>,
    {
        let staged = entries
            .into_iter()
            .map(|(name, value)| -> Result<_> { Ok((self.find(name.as_ref())?, value)) })
            .collect::<Result<Vec<_>>>()?;

        self.commit(staged)
    }

    /// Parses and writes a group of option texts. Same rules as [`OptionsDict::set_values`].
    pub fn set_strs<I, S, T>(&self, entries: I) -> Result<usize>
    where
        I: IntoIterator<Item = (S, T)>,
        S: AsRef<str>,
        T: AsRef<str>,
    {
        let staged = entries
            .into_iter()
            .map(|(name, text)| -> Result<_> {
                let def = self.find(name.as_ref())?;
                Ok((def, def.parse(text.as_ref())?))
            })
            .collect::<Result<Vec<_>>>()?;

        self.commit(staged)
    }

    fn find(&self, name: &str) -> Result<&OptionDef> {
        self.schema
            .find(name)
            .ok_or_else(|| OptionsError::UnknownOption(name.to_string()))
    }

    /// Validates every staged value, then writes them all under one lock.
    fn commit(&self, staged: Vec<(&OptionDef, OptionValue)>) -> Result<usize> {
        let mut ready: Vec<(&OptionDef, OptionValue)> = Vec::with_capacity(staged.len());

        for (def, value) in staged {
            if ready.iter().any(|(d, _)| d.key() == def.key()) {
                return Err(OptionsError::RepeatedOption(def.key().to_string()));
            }

            let value = def.coerce(value);
            def.validate(&value)?;
            ready.push((def, value));
        }

        let count = ready.len();
        let mut values = self.values.write().unwrap_or_else(PoisonError::into_inner);

        for (def, value) in ready {
            debug!(key = def.key(), value = %value, "set option");
            values.insert(def.key().to_string(), value);
        }

        Ok(count)
    }

    /// Unchecked write. The value is validated when it is next read.
    pub fn insert_raw(&self, key: &str, value: OptionValue) {
        self.values
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value);
    }

    /// Drops an explicit value, reverting the option to its default.
    pub fn remove(&self, key: &str) -> Option<OptionValue> {
        self.values
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key)
    }

    /// Returns every declared option with its current (unvalidated) value.
    pub fn values(&self) -> BTreeMap<String, OptionValue> {
        let values = self.values.read().unwrap_or_else(PoisonError::into_inner);

        self.schema
            .iter()
            .map(|def| {
                let v = values
                    .get(def.key())
                    .cloned()
                    .unwrap_or_else(|| def.default_value());

                (def.key().to_string(), v)
            })
            .collect()
    }
}
