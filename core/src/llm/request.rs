use serde::Serialize;

use super::config::KoboldConfig;

/// JSON body for `POST /api/v1/generate`.
///
/// Conditional keys are `None` (and therefore absent from the JSON) unless
/// the setting that activates them is on.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerateRequest<'a> {
    pub prompt: String,
    pub max_context_length: i64,
    pub max_length: i64,
    pub rep_pen: f64,
    pub rep_pen_range: i64,
    pub sampler_order: &'a [i64],
    pub temperature: f64,
    pub tfs: f64,
    pub top_a: f64,
    pub top_k: i64,
    pub top_p: f64,
    pub min_p: f64,
    pub typical: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sampler_seed: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub use_default_badwordsids: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grammar: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grammar_retain_state: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mirostat: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mirostat_tau: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mirostat_eta: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_sequence: Option<&'a [String]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trim_stop: Option<bool>,
}

impl<'a> GenerateRequest<'a> {
    /// Wrap `prompt` in the configured prefix/suffix and shape the body.
    ///
    /// `reserved_tokens` is taken off `max_length`; the result is not
    /// clamped and may be negative.
    pub fn build(cfg: &'a KoboldConfig, prompt: &str, reserved_tokens: i64) -> Self {
        let grammar_on = !cfg.grammar().is_empty();
        let mirostat_on = cfg.mirostat() > 0;
        let stops = cfg.stop_sequence();

        Self {
            prompt: format!("{}{}{}", cfg.prompt_prefix(), prompt, cfg.prompt_suffix()),
            max_context_length: cfg.max_context_length(),
            max_length: cfg.max_length().saturating_sub(reserved_tokens),
            rep_pen: cfg.rep_pen(),
            rep_pen_range: cfg.rep_pen_range(),
            sampler_order: cfg.sampler_order(),
            temperature: cfg.temperature(),
            tfs: cfg.tfs(),
            top_a: cfg.top_a(),
            top_k: cfg.top_k(),
            top_p: cfg.top_p(),
            min_p: cfg.min_p(),
            typical: cfg.typical(),
            sampler_seed: (cfg.sampler_seed() > 0).then_some(cfg.sampler_seed()),
            use_default_badwordsids: cfg.use_default_badwordsids().then_some(true),
            memory: (!cfg.memory().is_empty()).then_some(cfg.memory()),
            grammar: grammar_on.then_some(cfg.grammar()),
            grammar_retain_state: grammar_on.then_some(cfg.grammar_retain_state()),
            mirostat: mirostat_on.then_some(cfg.mirostat()),
            mirostat_tau: mirostat_on.then_some(cfg.mirostat_tau()),
            mirostat_eta: mirostat_on.then_some(cfg.mirostat_eta()),
            stop_sequence: stops,
            trim_stop: (cfg.trim_stop() && stops.is_some()).then_some(true),
        }
    }
}

/// Pull `results[0].text` out of a KoboldCpp response.
pub fn extract_text(v: &serde_json::Value) -> Option<&str> {
    v.get("results")?.get(0)?.get("text")?.as_str()
}

/// Trim surrounding whitespace, then drop the first configured stop
/// sequence found at the end of the text (and the whitespace before it).
pub fn trim_stop_sequences(text: &str, stops: Option<&[String]>) -> String {
    let text = text.trim();
    let Some(stops) = stops else {
        return text.to_string();
    };
    // Empty stops match everything and strip nothing.
    for stop in stops.iter().filter(|s| !s.is_empty()) {
        if let Some(stripped) = text.strip_suffix(stop.as_str()) {
            return stripped.trim_end().to_string();
        }
    }
    text.to_string()
}
