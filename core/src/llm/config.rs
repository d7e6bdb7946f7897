use super::settings::{KoboldSettings, Scalar};
use super::validate::{accept_or_default, clean_url, is_valid_fraction, is_valid_sampler_order};
use tracing::debug;

pub const DEFAULT_URI: &str = "http://host.docker.internal:5001";
pub const DEFAULT_MODEL: &str = "default";
pub const DEFAULT_MAX_CONTEXT_LENGTH: i64 = 4096;
pub const DEFAULT_MAX_LENGTH: i64 = 80;
pub const DEFAULT_REP_PEN: f64 = 1.1;
pub const DEFAULT_REP_PEN_RANGE: i64 = 320;
pub const DEFAULT_SAMPLER_ORDER: [i64; 7] = [6, 0, 1, 3, 4, 2, 5];
pub const DEFAULT_SAMPLER_SEED: i64 = -1;
pub const DEFAULT_TEMPERATURE: f64 = 0.7;
pub const DEFAULT_TFS: f64 = 1.0;
pub const DEFAULT_TOP_A: f64 = 0.0;
pub const DEFAULT_TOP_K: i64 = 100;
pub const DEFAULT_TOP_P: f64 = 0.92;
pub const DEFAULT_MIN_P: f64 = 0.0;
pub const DEFAULT_TYPICAL: f64 = 1.0;
pub const DEFAULT_MIROSTAT_TAU: f64 = 5.0;
pub const DEFAULT_MIROSTAT_ETA: f64 = 0.1;

/// Seeds are only honoured while the raw `rep_pen_range` candidate lies in this window.
const SEED_GATE: std::ops::RangeInclusive<f64> = -1.0..=999_999.0;

/// Validated KoboldCpp generation settings.
///
/// Built once from [`KoboldSettings`]; every rejected candidate has already
/// been replaced by its default, and nothing mutates it afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct KoboldConfig {
    uri: String,
    model: String,
    prompt_prefix: String,
    prompt_suffix: String,
    max_context_length: i64,
    max_length: i64,
    rep_pen: f64,
    rep_pen_range: i64,
    sampler_order: Vec<i64>,
    sampler_seed: i64,
    stop_sequence: Option<Vec<String>>,
    temperature: f64,
    tfs: f64,
    top_a: f64,
    top_k: i64,
    top_p: f64,
    min_p: f64,
    typical: f64,
    use_default_badwordsids: bool,
    mirostat: i64,
    mirostat_tau: f64,
    mirostat_eta: f64,
    grammar: String,
    grammar_retain_state: bool,
    memory: String,
    trim_stop: bool,
    request_timeout_ms: Option<u64>,
}

impl Default for KoboldConfig {
    fn default() -> Self {
        Self::from_settings(KoboldSettings::default())
    }
}

impl KoboldConfig {
    pub fn from_env() -> Self {
        Self::from_settings(KoboldSettings::from_env())
    }

    /// Validate raw candidates field by field. Never fails: anything that
    /// does not pass its check falls back to the documented default.
    pub fn from_settings(s: KoboldSettings) -> Self {
        let uri = match s.uri.as_deref() {
            Some(u) if !u.is_empty() => clean_url(u),
            _ => DEFAULT_URI.to_string(),
        };

        // The seed gate reads the raw range candidate, not the validated range.
        let raw_range = s
            .rep_pen_range
            .map(Scalar::as_f64)
            .unwrap_or(DEFAULT_REP_PEN_RANGE as f64);
        let seed_gate_open = SEED_GATE.contains(&raw_range);

        let cfg = Self {
            uri,
            model: s.model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            prompt_prefix: s.prompt_prefix.unwrap_or_default(),
            prompt_suffix: s.prompt_suffix.unwrap_or_default(),
            max_context_length: s
                .max_context_length
                .filter(|v| *v != 0)
                .unwrap_or(DEFAULT_MAX_CONTEXT_LENGTH),
            max_length: s
                .max_length
                .filter(|v| *v != 0)
                .unwrap_or(DEFAULT_MAX_LENGTH),
            rep_pen: accept_or_default(
                "rep_pen",
                s.rep_pen,
                |v| matches!(v, Scalar::Float(p) if *p >= 1.0),
                Scalar::Float(DEFAULT_REP_PEN),
            )
            .as_f64(),
            rep_pen_range: accept_or_default(
                "rep_pen_range",
                s.rep_pen_range,
                |v| v.as_f64() >= 0.0,
                Scalar::Int(DEFAULT_REP_PEN_RANGE),
            )
            .as_i64(),
            sampler_order: accept_or_default(
                "sampler_order",
                s.sampler_order,
                |v| is_valid_sampler_order(v),
                DEFAULT_SAMPLER_ORDER.iter().map(|&n| Scalar::Int(n)).collect(),
            )
            .into_iter()
            .map(Scalar::as_i64)
            .collect(),
            sampler_seed: accept_or_default(
                "sampler_seed",
                s.sampler_seed,
                |_| seed_gate_open,
                DEFAULT_SAMPLER_SEED,
            ),
            stop_sequence: s.stop_sequence,
            temperature: fraction("temperature", s.temperature, DEFAULT_TEMPERATURE),
            tfs: fraction("tfs", s.tfs, DEFAULT_TFS),
            top_a: fraction("top_a", s.top_a, DEFAULT_TOP_A),
            top_k: accept_or_default(
                "top_k",
                s.top_k,
                |v| matches!(v, Scalar::Int(k) if *k >= 0),
                Scalar::Int(DEFAULT_TOP_K),
            )
            .as_i64(),
            top_p: fraction("top_p", s.top_p, DEFAULT_TOP_P),
            min_p: fraction("min_p", s.min_p, DEFAULT_MIN_P),
            typical: fraction("typical", s.typical, DEFAULT_TYPICAL),
            use_default_badwordsids: s.use_default_badwordsids.unwrap_or(false),
            mirostat: s.mirostat.unwrap_or(0),
            mirostat_tau: s
                .mirostat_tau
                .filter(|v| *v != 0.0)
                .unwrap_or(DEFAULT_MIROSTAT_TAU),
            mirostat_eta: s
                .mirostat_eta
                .filter(|v| *v != 0.0)
                .unwrap_or(DEFAULT_MIROSTAT_ETA),
            grammar: s.grammar.unwrap_or_default(),
            grammar_retain_state: s.grammar_retain_state.unwrap_or(false),
            memory: s.memory.unwrap_or_default(),
            trim_stop: s.trim_stop.unwrap_or(false),
            request_timeout_ms: s.request_timeout_ms,
        };
        debug!(target: "kobold_config", uri = %cfg.uri, model = %cfg.model, "Validated KoboldCpp settings");
        cfg
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Informational only; KoboldCpp serves whatever model it was started with.
    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn prompt_prefix(&self) -> &str {
        &self.prompt_prefix
    }

    pub fn prompt_suffix(&self) -> &str {
        &self.prompt_suffix
    }

    pub fn max_context_length(&self) -> i64 {
        self.max_context_length
    }

    pub fn max_length(&self) -> i64 {
        self.max_length
    }

    pub fn rep_pen(&self) -> f64 {
        self.rep_pen
    }

    pub fn rep_pen_range(&self) -> i64 {
        self.rep_pen_range
    }

    pub fn sampler_order(&self) -> &[i64] {
        &self.sampler_order
    }

    pub fn sampler_seed(&self) -> i64 {
        self.sampler_seed
    }

    pub fn stop_sequence(&self) -> Option<&[String]> {
        self.stop_sequence.as_deref()
    }

    pub fn temperature(&self) -> f64 {
        self.temperature
    }

    pub fn tfs(&self) -> f64 {
        self.tfs
    }

    pub fn top_a(&self) -> f64 {
        self.top_a
    }

    pub fn top_k(&self) -> i64 {
        self.top_k
    }

    pub fn top_p(&self) -> f64 {
        self.top_p
    }

    pub fn min_p(&self) -> f64 {
        self.min_p
    }

    pub fn typical(&self) -> f64 {
        self.typical
    }

    pub fn use_default_badwordsids(&self) -> bool {
        self.use_default_badwordsids
    }

    pub fn mirostat(&self) -> i64 {
        self.mirostat
    }

    pub fn mirostat_tau(&self) -> f64 {
        self.mirostat_tau
    }

    pub fn mirostat_eta(&self) -> f64 {
        self.mirostat_eta
    }

    pub fn grammar(&self) -> &str {
        &self.grammar
    }

    pub fn grammar_retain_state(&self) -> bool {
        self.grammar_retain_state
    }

    pub fn memory(&self) -> &str {
        &self.memory
    }

    pub fn trim_stop(&self) -> bool {
        self.trim_stop
    }

    pub fn request_timeout_ms(&self) -> Option<u64> {
        self.request_timeout_ms
    }
}

fn fraction(field: &str, candidate: Option<Scalar>, default: f64) -> f64 {
    accept_or_default(
        field,
        candidate,
        |v| is_valid_fraction(*v, false),
        Scalar::Float(default),
    )
    .as_f64()
}
