//! LLM module: KoboldCpp settings, validation, payload shaping and HTTP client
//!
//! This module provides:
//! - `KoboldSettings` raw candidates loaded from env vars or TOML
//! - `KoboldConfig` the validated, immutable configuration
//! - `GenerateRequest` the `/api/v1/generate` JSON body
//! - `KoboldClient` for talking to a KoboldCpp-compatible backend

mod client;
mod config;
mod request;
mod settings;
mod validate;

pub use client::KoboldClient;
pub use config::{
    KoboldConfig, DEFAULT_MAX_CONTEXT_LENGTH, DEFAULT_MAX_LENGTH, DEFAULT_MIN_P, DEFAULT_MIROSTAT_ETA,
    DEFAULT_MIROSTAT_TAU, DEFAULT_MODEL, DEFAULT_REP_PEN, DEFAULT_REP_PEN_RANGE,
    DEFAULT_SAMPLER_ORDER, DEFAULT_SAMPLER_SEED, DEFAULT_TEMPERATURE, DEFAULT_TFS,
    DEFAULT_TOP_A, DEFAULT_TOP_K, DEFAULT_TOP_P, DEFAULT_TYPICAL, DEFAULT_URI,
};
pub use request::{extract_text, trim_stop_sequences, GenerateRequest};
pub use settings::{KoboldSettings, Scalar};
pub use validate::{accept_or_default, clean_url, is_valid_fraction, is_valid_sampler_order};
