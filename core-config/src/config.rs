//! `RunConfig`: the configuration snapshot shared by every core component.
//!
//! Loaded strictly from environment variables (see [`RunConfig::from_env`]),
//! following the `env_opt_*` pattern used throughout this codebase's LLM
//! configuration loaders; every field has a default, so no variable is
//! mandatory. A config snapshot is embedded verbatim into each Run Record
//! for provenance.

use serde::{Deserialize, Serialize};

use crate::error::{Result, env_opt, env_opt_f64, env_opt_u32, env_opt_u64};

/// Diffusion backbone preset selected for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiffusionPreset {
    Fast,
    Balanced,
    Quality,
    Mock,
}

impl DiffusionPreset {
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "fast" => Some(Self::Fast),
            "balanced" => Some(Self::Balanced),
            "quality" => Some(Self::Quality),
            "mock" => Some(Self::Mock),
            _ => None,
        }
    }
}

/// Order in which Stage 2 (semantic) checkers are tried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CheckerPreference {
    StricterFirst,
    LooserFirst,
}

impl CheckerPreference {
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "stricter-first" => Some(Self::StricterFirst),
            "looser-first" => Some(Self::LooserFirst),
            _ => None,
        }
    }
}

/// Shape of the discrete noise schedule used by the denoising driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoiseScheduleKind {
    Linear,
    Cosine,
    Sqrt,
}

impl NoiseScheduleKind {
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "linear" => Some(Self::Linear),
            "cosine" => Some(Self::Cosine),
            "sqrt" => Some(Self::Sqrt),
            _ => None,
        }
    }
}

/// Planner provider selection (one of a fixed set).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlannerProvider {
    OpenAi,
    Anthropic,
    Mock,
}

impl PlannerProvider {
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "openai" => Some(Self::OpenAi),
            "anthropic" => Some(Self::Anthropic),
            "mock" => Some(Self::Mock),
            _ => None,
        }
    }
}

/// Per-call timeout budget, one field per external collaborator (§5).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Timeouts {
    pub planning_secs: u64,
    pub generation_secs: u64,
    pub type_check_secs: u64,
    pub type_check_probe_secs: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            planning_secs: 30,
            generation_secs: 150,
            type_check_secs: 30,
            type_check_probe_secs: 5,
        }
    }
}

/// Retry/backoff policy for transient adapter failures, distinct from
/// the C5 semantic-retry budget.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BackoffPolicy {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub factor: u32,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 1000,
            factor: 2,
        }
    }
}

/// The full configuration snapshot for one run (or one batch).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    pub planner_provider: PlannerProvider,
    pub diffusion_preset: DiffusionPreset,
    pub checker_preference: CheckerPreference,
    pub noise_schedule: NoiseScheduleKind,

    pub num_sampling_steps: u32,
    pub guidance_scale: f64,
    pub max_retries: u32,
    pub autoregressive_fallback: bool,

    pub artifacts_dir: String,

    /// HTTP endpoint for the diffusion backbone. Unused when
    /// `diffusion_preset` is `Mock`.
    pub diffusion_endpoint: Option<String>,

    pub timeouts: Timeouts,
    pub backoff: BackoffPolicy,

    /// Bearer tokens, keyed by logical endpoint name. Never logged.
    #[serde(skip)]
    pub api_keys: ApiKeys,
}

#[derive(Debug, Clone, Default)]
pub struct ApiKeys {
    pub planner: Option<String>,
    pub compressor: Option<String>,
    pub diffusion: Option<String>,
}

impl RunConfig {
    /// Loads configuration strictly from environment variables.
    ///
    /// Recognized variables:
    /// - `REFACTOR_PLANNER_PROVIDER` (openai|anthropic|mock, default mock)
    /// - `REFACTOR_DIFFUSION_PRESET` (fast|balanced|quality|mock, default mock)
    /// - `REFACTOR_CHECKER_PREFERENCE` (stricter-first|looser-first, default stricter-first)
    /// - `REFACTOR_NOISE_SCHEDULE` (linear|cosine|sqrt, default cosine)
    /// - `REFACTOR_SAMPLING_STEPS` (u32, default 8)
    /// - `REFACTOR_GUIDANCE_SCALE` (f64, default 1.5)
    /// - `REFACTOR_MAX_RETRIES` (u32, default 2)
    /// - `REFACTOR_AUTOREGRESSIVE_FALLBACK` ("true"/"false", default "false")
    /// - `REFACTOR_ARTIFACTS_DIR` (default "code_data/refactor_runs")
    /// - `PLANNER_API_KEY`, `COMPRESSOR_API_KEY`, `DIFFUSION_API_KEY`
    pub fn from_env() -> Result<Self> {
        let planner_provider = env_opt("REFACTOR_PLANNER_PROVIDER")
            .map(|s| {
                PlannerProvider::from_str_loose(&s).ok_or_else(|| {
                    crate::error::ConfigError::UnsupportedValue {
                        var: "REFACTOR_PLANNER_PROVIDER",
                        value: s.clone(),
                    }
                })
            })
            .transpose()?
            .unwrap_or(PlannerProvider::Mock);

        let diffusion_preset = env_opt("REFACTOR_DIFFUSION_PRESET")
            .map(|s| {
                DiffusionPreset::from_str_loose(&s).ok_or_else(|| {
                    crate::error::ConfigError::UnsupportedValue {
                        var: "REFACTOR_DIFFUSION_PRESET",
                        value: s.clone(),
                    }
                })
            })
            .transpose()?
            .unwrap_or(DiffusionPreset::Mock);

        let checker_preference = env_opt("REFACTOR_CHECKER_PREFERENCE")
            .map(|s| {
                CheckerPreference::from_str_loose(&s).ok_or_else(|| {
                    crate::error::ConfigError::UnsupportedValue {
                        var: "REFACTOR_CHECKER_PREFERENCE",
                        value: s.clone(),
                    }
                })
            })
            .transpose()?
            .unwrap_or(CheckerPreference::StricterFirst);

        let noise_schedule = env_opt("REFACTOR_NOISE_SCHEDULE")
            .map(|s| {
                NoiseScheduleKind::from_str_loose(&s).ok_or_else(|| {
                    crate::error::ConfigError::UnsupportedValue {
                        var: "REFACTOR_NOISE_SCHEDULE",
                        value: s.clone(),
                    }
                })
            })
            .transpose()?
            .unwrap_or(NoiseScheduleKind::Cosine);

        let num_sampling_steps = env_opt_u32("REFACTOR_SAMPLING_STEPS")?.unwrap_or(8);
        let guidance_scale = env_opt_f64("REFACTOR_GUIDANCE_SCALE")?.unwrap_or(1.5);
        let max_retries = env_opt_u32("REFACTOR_MAX_RETRIES")?.unwrap_or(2);
        let autoregressive_fallback = env_opt("REFACTOR_AUTOREGRESSIVE_FALLBACK")
            .map(|v| v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        let artifacts_dir = env_opt("REFACTOR_ARTIFACTS_DIR")
            .unwrap_or_else(|| "code_data/refactor_runs".to_string());

        let diffusion_endpoint = env_opt("REFACTOR_DIFFUSION_ENDPOINT");

        let timeouts = Timeouts {
            planning_secs: env_opt_u64("REFACTOR_TIMEOUT_PLANNING_SECS")?
                .unwrap_or(Timeouts::default().planning_secs),
            generation_secs: env_opt_u64("REFACTOR_TIMEOUT_GENERATION_SECS")?
                .unwrap_or(Timeouts::default().generation_secs),
            type_check_secs: env_opt_u64("REFACTOR_TIMEOUT_TYPECHECK_SECS")?
                .unwrap_or(Timeouts::default().type_check_secs),
            type_check_probe_secs: env_opt_u64("REFACTOR_TIMEOUT_TYPECHECK_PROBE_SECS")?
                .unwrap_or(Timeouts::default().type_check_probe_secs),
        };

        let backoff = BackoffPolicy {
            max_attempts: env_opt_u32("REFACTOR_BACKOFF_MAX_ATTEMPTS")?
                .unwrap_or(BackoffPolicy::default().max_attempts),
            base_delay_ms: env_opt_u64("REFACTOR_BACKOFF_BASE_DELAY_MS")?
                .unwrap_or(BackoffPolicy::default().base_delay_ms),
            factor: env_opt_u32("REFACTOR_BACKOFF_FACTOR")?.unwrap_or(BackoffPolicy::default().factor),
        };

        let api_keys = ApiKeys {
            planner: env_opt("PLANNER_API_KEY"),
            compressor: env_opt("COMPRESSOR_API_KEY"),
            diffusion: env_opt("DIFFUSION_API_KEY"),
        };

        tracing::info!(
            planner_provider = ?planner_provider,
            diffusion_preset = ?diffusion_preset,
            checker_preference = ?checker_preference,
            noise_schedule = ?noise_schedule,
            num_sampling_steps,
            guidance_scale,
            max_retries,
            "RunConfig loaded from environment"
        );

        Ok(Self {
            planner_provider,
            diffusion_preset,
            checker_preference,
            noise_schedule,
            num_sampling_steps,
            guidance_scale,
            max_retries,
            autoregressive_fallback,
            artifacts_dir,
            diffusion_endpoint,
            timeouts,
            backoff,
            api_keys,
        })
    }

    /// Config used by the demo binary and by tests: mock backbone,
    /// no external processes, single-shot retries.
    pub fn mock() -> Self {
        Self {
            planner_provider: PlannerProvider::Mock,
            diffusion_preset: DiffusionPreset::Mock,
            checker_preference: CheckerPreference::StricterFirst,
            noise_schedule: NoiseScheduleKind::Cosine,
            num_sampling_steps: 4,
            guidance_scale: 1.5,
            max_retries: 2,
            autoregressive_fallback: false,
            artifacts_dir: "code_data/refactor_runs".to_string(),
            diffusion_endpoint: None,
            timeouts: Timeouts::default(),
            backoff: BackoffPolicy::default(),
            api_keys: ApiKeys::default(),
        }
    }

    /// A serializable snapshot safe to embed in a Run Record (no secrets).
    pub fn snapshot(&self) -> serde_json::Value {
        serde_json::json!({
            "planner_provider": self.planner_provider,
            "diffusion_preset": self.diffusion_preset,
            "checker_preference": self.checker_preference,
            "noise_schedule": self.noise_schedule,
            "num_sampling_steps": self.num_sampling_steps,
            "guidance_scale": self.guidance_scale,
            "max_retries": self.max_retries,
            "autoregressive_fallback": self.autoregressive_fallback,
            "artifacts_dir": self.artifacts_dir,
        })
    }
}

impl Timeouts {
    pub fn planning(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.planning_secs)
    }

    pub fn generation(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.generation_secs)
    }

    pub fn type_check(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.type_check_secs)
    }

    pub fn type_check_probe(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.type_check_probe_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_config_has_sane_defaults() {
        let cfg = RunConfig::mock();
        assert_eq!(cfg.diffusion_preset, DiffusionPreset::Mock);
        assert_eq!(cfg.max_retries, 2);
        assert!(cfg.num_sampling_steps > 0);
    }

    #[test]
    fn snapshot_excludes_secrets() {
        let mut cfg = RunConfig::mock();
        cfg.api_keys.planner = Some("super-secret".to_string());
        let snap = cfg.snapshot();
        assert!(!snap.to_string().contains("super-secret"));
    }

    #[test]
    fn loose_parsing_is_case_insensitive() {
        assert_eq!(
            DiffusionPreset::from_str_loose("MOCK"),
            Some(DiffusionPreset::Mock)
        );
        assert_eq!(
            CheckerPreference::from_str_loose("Stricter-First"),
            Some(CheckerPreference::StricterFirst)
        );
    }
}
