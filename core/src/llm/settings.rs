use crate::{KoboldError, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use tracing::{info, warn};

/// A raw numeric candidate that remembers how it was written.
///
/// Some validators care whether a value is an integer or a float
/// (`rep_pen` must be a float, `top_k` an integer), so the distinction
/// survives deserialization instead of collapsing into `f64`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Int(i64),
    Float(f64),
}

impl Scalar {
    pub fn is_int(self) -> bool {
        matches!(self, Scalar::Int(_))
    }

    pub fn as_f64(self) -> f64 {
        match self {
            Scalar::Int(v) => v as f64,
            Scalar::Float(v) => v,
        }
    }

    /// Truncates floats toward zero.
    pub fn as_i64(self) -> i64 {
        match self {
            Scalar::Int(v) => v,
            Scalar::Float(v) => v as i64,
        }
    }
}

impl From<i64> for Scalar {
    fn from(v: i64) -> Self {
        Scalar::Int(v)
    }
}

impl From<i32> for Scalar {
    fn from(v: i32) -> Self {
        Scalar::Int(v as i64)
    }
}

impl From<f64> for Scalar {
    fn from(v: f64) -> Self {
        Scalar::Float(v)
    }
}

impl FromStr for Scalar {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(v) = s.parse::<i64>() {
            return Ok(Scalar::Int(v));
        }
        s.parse::<f64>()
            .map(Scalar::Float)
            .map_err(|e| format!("not a number: {e}"))
    }
}

/// Raw, unvalidated candidates for every KoboldCpp generation setting.
///
/// `None` means "not provided". A value of the wrong type (a string where a
/// number belongs, a list with non-numeric entries) is dropped with a warning
/// instead of failing the whole document. Validation and defaulting happen in
/// [`crate::KoboldConfig::from_settings`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KoboldSettings {
    #[serde(deserialize_with = "lenient")]
    pub uri: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub model: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub prompt_prefix: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub prompt_suffix: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub max_context_length: Option<i64>,
    #[serde(deserialize_with = "lenient")]
    pub max_length: Option<i64>,
    #[serde(deserialize_with = "lenient")]
    pub rep_pen: Option<Scalar>,
    #[serde(deserialize_with = "lenient")]
    pub rep_pen_range: Option<Scalar>,
    #[serde(deserialize_with = "lenient")]
    pub sampler_order: Option<Vec<Scalar>>,
    #[serde(deserialize_with = "lenient")]
    pub sampler_seed: Option<i64>,
    #[serde(deserialize_with = "lenient")]
    pub stop_sequence: Option<Vec<String>>,
    #[serde(deserialize_with = "lenient")]
    pub temperature: Option<Scalar>,
    #[serde(deserialize_with = "lenient")]
    pub tfs: Option<Scalar>,
    #[serde(deserialize_with = "lenient")]
    pub top_a: Option<Scalar>,
    #[serde(deserialize_with = "lenient")]
    pub top_k: Option<Scalar>,
    #[serde(deserialize_with = "lenient")]
    pub top_p: Option<Scalar>,
    #[serde(deserialize_with = "lenient")]
    pub min_p: Option<Scalar>,
    #[serde(deserialize_with = "lenient")]
    pub typical: Option<Scalar>,
    #[serde(deserialize_with = "lenient")]
    pub use_default_badwordsids: Option<bool>,
    #[serde(deserialize_with = "lenient")]
    pub mirostat: Option<i64>,
    #[serde(deserialize_with = "lenient")]
    pub mirostat_tau: Option<f64>,
    #[serde(deserialize_with = "lenient")]
    pub mirostat_eta: Option<f64>,
    #[serde(deserialize_with = "lenient")]
    pub grammar: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub grammar_retain_state: Option<bool>,
    #[serde(deserialize_with = "lenient")]
    pub memory: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub trim_stop: Option<bool>,
    #[serde(deserialize_with = "lenient")]
    pub request_timeout_ms: Option<u64>,
}

macro_rules! overlay_fields {
    ($top:ident, $base:ident; $($field:ident),+ $(,)?) => {
        $(
            if $top.$field.is_some() {
                $base.$field = $top.$field;
            }
        )+
    };
}

impl KoboldSettings {
    /// Read candidates from `KOBOLD_*` environment variables.
    ///
    /// Empty variables are treated as unset. List settings
    /// (`KOBOLD_SAMPLER_ORDER`, `KOBOLD_STOP_SEQUENCE`) are JSON arrays.
    pub fn from_env() -> Self {
        Self {
            uri: env_string("KOBOLD_URI"),
            model: env_string("KOBOLD_MODEL"),
            prompt_prefix: env_string("KOBOLD_PROMPT_PREFIX"),
            prompt_suffix: env_string("KOBOLD_PROMPT_SUFFIX"),
            max_context_length: env_int("KOBOLD_MAX_CONTEXT_LENGTH"),
            max_length: env_int("KOBOLD_MAX_LENGTH"),
            rep_pen: env_parse("KOBOLD_REP_PEN"),
            rep_pen_range: env_parse("KOBOLD_REP_PEN_RANGE"),
            sampler_order: env_json("KOBOLD_SAMPLER_ORDER"),
            sampler_seed: env_int("KOBOLD_SAMPLER_SEED"),
            stop_sequence: env_json("KOBOLD_STOP_SEQUENCE"),
            temperature: env_parse("KOBOLD_TEMPERATURE"),
            tfs: env_parse("KOBOLD_TFS"),
            top_a: env_parse("KOBOLD_TOP_A"),
            top_k: env_parse("KOBOLD_TOP_K"),
            top_p: env_parse("KOBOLD_TOP_P"),
            min_p: env_parse("KOBOLD_MIN_P"),
            typical: env_parse("KOBOLD_TYPICAL"),
            use_default_badwordsids: env_parse("KOBOLD_USE_DEFAULT_BADWORDSIDS"),
            mirostat: env_int("KOBOLD_MIROSTAT"),
            mirostat_tau: env_parse("KOBOLD_MIROSTAT_TAU"),
            mirostat_eta: env_parse("KOBOLD_MIROSTAT_ETA"),
            grammar: env_string("KOBOLD_GRAMMAR"),
            grammar_retain_state: env_parse("KOBOLD_GRAMMAR_RETAIN_STATE"),
            memory: env_string("KOBOLD_MEMORY"),
            trim_stop: env_parse("KOBOLD_TRIM_STOP"),
            request_timeout_ms: env_parse("KOBOLD_REQUEST_TIMEOUT_MS"),
        }
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| KoboldError::Config(format!("Invalid TOML settings: {e}")))
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&raw)
    }

    /// Environment candidates with an optional TOML file laid over them.
    /// A missing file is not an error.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let base = Self::from_env();
        let path = path.as_ref();
        if !path.exists() {
            info!(target: "kobold_config", path = %path.display(), "No TOML settings found; using env/defaults");
            return Ok(base);
        }
        let file = Self::from_file(path)?;
        info!(target: "kobold_config", path = %path.display(), "Loaded TOML settings");
        Ok(file.overlay(base))
    }

    /// Fields set in `self` replace the ones in `base`.
    pub fn overlay(self, mut base: KoboldSettings) -> KoboldSettings {
        let top = self;
        overlay_fields!(top, base;
            uri, model, prompt_prefix, prompt_suffix, max_context_length, max_length,
            rep_pen, rep_pen_range, sampler_order, sampler_seed, stop_sequence,
            temperature, tfs, top_a, top_k, top_p, min_p, typical,
            use_default_badwordsids, mirostat, mirostat_tau, mirostat_eta,
            grammar, grammar_retain_state, memory, trim_stop, request_timeout_ms,
        );
        base
    }
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|s| !s.is_empty())
}

fn env_parse<T>(key: &str) -> Option<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = env_string(key)?;
    match raw.trim().parse::<T>() {
        Ok(v) => Some(v),
        Err(e) => {
            warn!(target: "kobold_config", key, value = %raw, error = %e, "Ignoring unparsable env var");
            None
        }
    }
}

/// Integer settings also take floats, truncated toward zero.
fn env_int(key: &str) -> Option<i64> {
    env_parse::<Scalar>(key).map(Scalar::as_i64)
}

fn env_json<T: DeserializeOwned>(key: &str) -> Option<T> {
    let raw = env_string(key)?;
    match serde_json::from_str(&raw) {
        Ok(v) => Some(v),
        Err(e) => {
            warn!(target: "kobold_config", key, value = %raw, error = %e, "Ignoring env var that is not a JSON array");
            None
        }
    }
}

/// Shape check for one raw candidate. `None` means the value has the wrong type.
trait Candidate: Sized {
    fn from_raw(v: &Value) -> Option<Self>;
}

impl Candidate for String {
    fn from_raw(v: &Value) -> Option<Self> {
        v.as_str().map(str::to_string)
    }
}

impl Candidate for bool {
    fn from_raw(v: &Value) -> Option<Self> {
        v.as_bool()
    }
}

impl Candidate for f64 {
    fn from_raw(v: &Value) -> Option<Self> {
        v.as_f64()
    }
}

impl Candidate for u64 {
    fn from_raw(v: &Value) -> Option<Self> {
        v.as_u64()
    }
}

// Floats are truncated, the way the server-side `int(...)` casts treat them.
impl Candidate for i64 {
    fn from_raw(v: &Value) -> Option<Self> {
        v.as_i64().or_else(|| v.as_f64().map(|f| f as i64))
    }
}

impl Candidate for Scalar {
    fn from_raw(v: &Value) -> Option<Self> {
        v.as_i64()
            .map(Scalar::Int)
            .or_else(|| v.as_f64().map(Scalar::Float))
    }
}

// All elements must fit; one bad entry drops the whole list.
impl<T: Candidate> Candidate for Vec<T> {
    fn from_raw(v: &Value) -> Option<Self> {
        v.as_array()?.iter().map(T::from_raw).collect()
    }
}

fn lenient<'de, D, T>(de: D) -> std::result::Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Candidate,
{
    let raw = Value::deserialize(de)?;
    if raw.is_null() {
        return Ok(None);
    }
    let parsed = T::from_raw(&raw);
    if parsed.is_none() {
        warn!(target: "kobold_config", value = %raw, "Ignoring mistyped setting; using default");
    }
    Ok(parsed)
}
