use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

/// Top-level config (dispatcher.toml + DISPATCH_* env overrides).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatcherConfig {
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub confidence: ConfidenceConfig,
    #[serde(default)]
    pub scheduling: SchedulingConfig,
    #[serde(default)]
    pub timeouts: TimeoutsConfig,
    #[serde(default)]
    pub categories: CategoriesConfig,
    #[serde(default)]
    pub webhooks: WebhooksConfig,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            gateway: GatewayConfig::default(),
            database: DatabaseConfig::default(),
            providers: ProvidersConfig::default(),
            confidence: ConfidenceConfig::default(),
            scheduling: SchedulingConfig::default(),
            timeouts: TimeoutsConfig::default(),
            categories: CategoriesConfig::default(),
            webhooks: WebhooksConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            bind: default_bind(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProvidersConfig {
    pub anthropic: Option<AnthropicConfig>,
    pub calendar: Option<CalendarConfig>,
    pub vector_index: Option<VectorIndexConfig>,
    pub workspace: Option<WorkspaceConfig>,
    #[serde(default)]
    pub user_surfaces: Vec<UserSurfaceConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceConfig {
    pub base_url: String,
    pub api_key: Option<String>,
}

/// Outbound callback target for one user-facing surface (e.g. `web-chat`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserSurfaceConfig {
    pub name: String,
    pub base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnthropicConfig {
    pub api_key: String,
    #[serde(default = "default_anthropic_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarConfig {
    pub base_url: String,
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorIndexConfig {
    pub base_url: Option<String>,
}

/// Per-category confidence thresholds driving the Orchestrator's escalation
/// gate. See SPEC_FULL.md §4.9.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfidenceConfig {
    #[serde(default = "default_high_conf_general")]
    pub high_conf_general: f64,
    #[serde(default = "default_high_conf_compliance")]
    pub high_conf_compliance: f64,
    #[serde(default = "default_med_conf_cap")]
    pub med_conf_cap: f64,
    #[serde(default = "default_low_confidence_ceil")]
    pub low_confidence_ceil: f64,
    /// Size (e.g. seat count) at or above which a pricing question is
    /// escalated without an answer stub rather than answered with a
    /// call-to-action suffix. See SPEC_FULL.md §9.
    #[serde(default = "default_pricing_escalation_size_threshold")]
    pub pricing_escalation_size_threshold: u32,
}

impl Default for ConfidenceConfig {
    fn default() -> Self {
        Self {
            high_conf_general: default_high_conf_general(),
            high_conf_compliance: default_high_conf_compliance(),
            med_conf_cap: default_med_conf_cap(),
            low_confidence_ceil: default_low_confidence_ceil(),
            pricing_escalation_size_threshold: default_pricing_escalation_size_threshold(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulingConfig {
    #[serde(default = "default_business_hour_start")]
    pub business_hour_start: u8,
    #[serde(default = "default_business_hour_end")]
    pub business_hour_end: u8,
    #[serde(default = "default_buffer_minutes")]
    pub buffer_minutes: i64,
    #[serde(default = "default_slot_duration_minutes")]
    pub slot_duration_minutes: i64,
    #[serde(default = "default_max_offers")]
    pub max_offers: usize,
    #[serde(default = "default_lookahead_days")]
    pub lookahead_business_days: u32,
    /// IANA timezone name (e.g. `America/New_York`) that business hours are
    /// local to. Falls back to UTC if it fails to parse as a known zone.
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

impl Default for SchedulingConfig {
    fn default() -> Self {
        Self {
            business_hour_start: default_business_hour_start(),
            business_hour_end: default_business_hour_end(),
            buffer_minutes: default_buffer_minutes(),
            slot_duration_minutes: default_slot_duration_minutes(),
            max_offers: default_max_offers(),
            lookahead_business_days: default_lookahead_days(),
            timezone: default_timezone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeoutsConfig {
    #[serde(default = "default_llm_timeout_secs")]
    pub llm_secs: u64,
    #[serde(default = "default_vector_timeout_secs")]
    pub vector_secs: u64,
    #[serde(default = "default_calendar_timeout_secs")]
    pub calendar_secs: u64,
    #[serde(default = "default_workspace_timeout_secs")]
    pub workspace_secs: u64,
}

impl Default for TimeoutsConfig {
    fn default() -> Self {
        Self {
            llm_secs: default_llm_timeout_secs(),
            vector_secs: default_vector_timeout_secs(),
            calendar_secs: default_calendar_timeout_secs(),
            workspace_secs: default_workspace_timeout_secs(),
        }
    }
}

/// Lexicons used by the pattern-pass classifier and the escalation gate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoriesConfig {
    #[serde(default = "default_compliance_terms")]
    pub compliance_terms: Vec<String>,
    #[serde(default = "default_urgency_keywords")]
    pub urgency_keywords: Vec<String>,
    #[serde(default = "default_abuse_lexicon")]
    pub abuse_lexicon: Vec<String>,
    #[serde(default = "default_pricing_triggers")]
    pub pricing_triggers: Vec<String>,
}

impl Default for CategoriesConfig {
    fn default() -> Self {
        Self {
            compliance_terms: default_compliance_terms(),
            urgency_keywords: default_urgency_keywords(),
            abuse_lexicon: default_abuse_lexicon(),
            pricing_triggers: default_pricing_triggers(),
        }
    }
}

/// Authentication mode for an incoming webhook source.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum WebhookAuthMode {
    /// HMAC-SHA256 over the raw request body (GitHub-style X-Hub-Signature-256).
    HmacSha256,
    /// Static bearer token in the Authorization header.
    BearerToken,
    /// No authentication — trusted-network deployments only.
    None,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookSourceConfig {
    /// Identifier used in the route, e.g. "user" -> POST /user/events.
    pub name: String,
    pub secret: Option<String>,
    pub auth_mode: WebhookAuthMode,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct WebhooksConfig {
    #[serde(default)]
    pub sources: Vec<WebhookSourceConfig>,
}

fn default_port() -> u16 {
    8089
}
fn default_bind() -> String {
    "127.0.0.1".to_string()
}
fn default_model() -> String {
    "claude-sonnet-4-6".to_string()
}
fn default_anthropic_base_url() -> String {
    "https://api.anthropic.com".to_string()
}
fn default_db_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{home}/.dispatcher/dispatcher.db")
}
fn default_high_conf_general() -> f64 {
    0.70
}
fn default_high_conf_compliance() -> f64 {
    0.75
}
fn default_med_conf_cap() -> f64 {
    0.65
}
fn default_low_confidence_ceil() -> f64 {
    0.50
}
fn default_pricing_escalation_size_threshold() -> u32 {
    50
}
fn default_business_hour_start() -> u8 {
    9
}
fn default_business_hour_end() -> u8 {
    17
}
fn default_buffer_minutes() -> i64 {
    15
}
fn default_slot_duration_minutes() -> i64 {
    30
}
fn default_max_offers() -> usize {
    6
}
fn default_lookahead_days() -> u32 {
    5
}
fn default_timezone() -> String {
    "America/New_York".to_string()
}
fn default_llm_timeout_secs() -> u64 {
    25
}
fn default_vector_timeout_secs() -> u64 {
    3
}
fn default_calendar_timeout_secs() -> u64 {
    5
}
fn default_workspace_timeout_secs() -> u64 {
    5
}
fn default_compliance_terms() -> Vec<String> {
    ["soc2", "hipaa", "gdpr", "iso27001", "compliance", "privacy policy", "dpa"]
        .into_iter()
        .map(String::from)
        .collect()
}
fn default_urgency_keywords() -> Vec<String> {
    ["down", "outage", "urgent", "production", "failing", "error 500", "500"]
        .into_iter()
        .map(String::from)
        .collect()
}
fn default_abuse_lexicon() -> Vec<String> {
    [
        "idiot",
        "idiots",
        "stupid",
        "useless",
        "shut up",
        "screw you",
        "go to hell",
        "f*** you",
        "damn you",
        "piece of garbage",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}
fn default_pricing_triggers() -> Vec<String> {
    ["enterprise pricing", "enterprise plan", "seats", "volume discount"]
        .into_iter()
        .map(String::from)
        .collect()
}

impl Default for WebhookAuthMode {
    fn default() -> Self {
        WebhookAuthMode::None
    }
}

impl DispatcherConfig {
    /// Load config from a TOML file with DISPATCH_* env var overrides.
    ///
    /// Checks in order:
    ///   1. Explicit path argument
    ///   2. ~/.dispatcher/dispatcher.toml
    pub fn load(config_path: Option<&str>) -> crate::error::Result<Self> {
        let path = config_path
            .map(String::from)
            .unwrap_or_else(default_config_path);

        let config: DispatcherConfig = Figment::new()
            .merge(Toml::file(&path))
            .merge(Env::prefixed("DISPATCH_").split("_"))
            .extract()
            .map_err(|e| crate::error::DispatcherError::Config(e.to_string()))?;

        Ok(config)
    }
}

fn default_config_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{home}/.dispatcher/dispatcher.toml")
}
