//! One configured backend and its mutable health record
//!
//! Cooldowns are stored as expiry timestamps and cleared lazily by
//! [`Backend::is_ready`]; there are no background timers. Every read-modify-write
//! of the health record happens under one lock so concurrent executor calls
//! never lose an update.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{Mutex, MutexGuard, PoisonError, RwLock};
use std::time::Duration;

use crate::transport::Endpoint;
use genforge_config::{BackendConfig, BackendFamily};
use genforge_utils::error::{ConfigError, LlmError};

/// Coarse health state, derived from the record at a point in time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum HealthState {
    Healthy,
    RateLimited,
    CoolingDown,
    /// Disabled until reset or reload
    Unavailable,
}

#[derive(Debug, Clone, Default)]
struct HealthRecord {
    last_error: Option<String>,
    error_count: u64,
    request_count: u64,
    success_count: u64,
    rate_limited_until: Option<DateTime<Utc>>,
    cooldown_until: Option<DateTime<Utc>>,
    disabled: bool,
    last_failure_at: Option<DateTime<Utc>>,
}

impl HealthRecord {
    fn clear_expired(&mut self, now: DateTime<Utc>) {
        if self.rate_limited_until.is_some_and(|until| now >= until) {
            self.rate_limited_until = None;
        }
        if self.cooldown_until.is_some_and(|until| now >= until) {
            self.cooldown_until = None;
        }
    }

    fn state(&self) -> HealthState {
        if self.disabled {
            HealthState::Unavailable
        } else if self.rate_limited_until.is_some() {
            HealthState::RateLimited
        } else if self.cooldown_until.is_some() {
            HealthState::CoolingDown
        } else {
            HealthState::Healthy
        }
    }

    fn record_error(&mut self, now: DateTime<Utc>, message: String) {
        self.request_count += 1;
        self.error_count += 1;
        self.last_error = Some(message);
        self.last_failure_at = Some(now);
    }
}

/// Point-in-time view of a backend's health, for status reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendStatus {
    pub name: String,
    pub family: BackendFamily,
    pub model: String,
    pub state: HealthState,
    pub available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    pub error_count: u64,
    pub request_count: u64,
    pub success_count: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rate_limited_until: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cooldown_until: Option<DateTime<Utc>>,
}

#[derive(Debug)]
pub struct Backend {
    config: BackendConfig,
    credential: RwLock<Option<String>>,
    health: Mutex<HealthRecord>,
}

impl Backend {
    /// Build a backend, resolving its credential now.
    ///
    /// A backend whose credential cannot be resolved is created disabled,
    /// with the resolution failure as its last error.
    #[must_use]
    pub fn new(config: BackendConfig) -> Self {
        let (credential, health) = initial_state(&config);
        Self {
            config,
            credential: RwLock::new(credential),
            health: Mutex::new(health),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.config.name
    }

    #[must_use]
    pub fn family(&self) -> BackendFamily {
        self.config.family
    }

    #[must_use]
    pub fn model(&self) -> &str {
        &self.config.model
    }

    #[must_use]
    pub fn config(&self) -> &BackendConfig {
        &self.config
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.config.timeout()
    }

    fn health(&self) -> MutexGuard<'_, HealthRecord> {
        self.health.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Connection details for one call.
    ///
    /// # Errors
    ///
    /// `LlmError::Misconfiguration` when the backend has no credential.
    pub fn endpoint(&self) -> Result<Endpoint, LlmError> {
        let credential = self
            .credential
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or_else(|| {
                LlmError::Misconfiguration(format!("backend '{}' has no credential", self.name()))
            })?;
        Ok(Endpoint {
            name: self.config.name.clone(),
            family: self.config.family,
            base_url: self.config.base_url.clone(),
            credential,
        })
    }

    /// Usable right now. Expired cooldowns are cleared as a side effect.
    pub fn is_ready(&self, now: DateTime<Utc>) -> bool {
        let mut health = self.health();
        health.clear_expired(now);
        health.state() == HealthState::Healthy
    }

    /// Disabled until reset or reload; fallback selection never picks these.
    #[must_use]
    pub fn is_disabled(&self) -> bool {
        self.health().disabled
    }

    #[must_use]
    pub fn error_count(&self) -> u64 {
        self.health().error_count
    }

    #[must_use]
    pub fn last_failure_at(&self) -> Option<DateTime<Utc>> {
        self.health().last_failure_at
    }

    pub fn record_success(&self) {
        let mut health = self.health();
        health.request_count += 1;
        health.success_count += 1;
        health.rate_limited_until = None;
        health.cooldown_until = None;
    }

    /// Mark unavailable until `now + cooldown`. An existing later expiry is kept.
    pub fn record_rate_limited(&self, now: DateTime<Utc>, cooldown: Duration, message: String) {
        let mut health = self.health();
        health.record_error(now, message);
        let until = expiry(now, cooldown);
        health.rate_limited_until = Some(health.rate_limited_until.map_or(until, |u| u.max(until)));
    }

    pub fn record_server_error(&self, now: DateTime<Utc>, cooldown: Duration, message: String) {
        let mut health = self.health();
        health.record_error(now, message);
        let until = expiry(now, cooldown);
        health.cooldown_until = Some(health.cooldown_until.map_or(until, |u| u.max(until)));
    }

    pub fn record_auth_failure(&self, now: DateTime<Utc>, message: String) {
        let mut health = self.health();
        health.record_error(now, message);
        health.disabled = true;
    }

    /// Count a failure that does not change availability.
    pub fn record_failure(&self, now: DateTime<Utc>, message: String) {
        self.health().record_error(now, message);
    }

    /// Forget all health history. A backend without a credential stays disabled.
    pub fn reset(&self) {
        let has_credential = self
            .credential
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some();
        let mut health = self.health();
        if has_credential {
            *health = HealthRecord::default();
        } else {
            let (_, fresh) = initial_state(&self.config);
            *health = fresh;
        }
    }

    /// Re-resolve the credential from `config` and reset health.
    ///
    /// Only the credential sources of `config` are used; name, family,
    /// endpoint and model stay as constructed.
    pub fn reload(&self, config: &BackendConfig) {
        let (credential, health) = initial_state(config);
        *self
            .credential
            .write()
            .unwrap_or_else(PoisonError::into_inner) = credential;
        *self.health() = health;
    }

    pub fn status(&self, now: DateTime<Utc>) -> BackendStatus {
        let mut health = self.health();
        health.clear_expired(now);
        let state = health.state();
        BackendStatus {
            name: self.config.name.clone(),
            family: self.config.family,
            model: self.config.model.clone(),
            state,
            available: state == HealthState::Healthy,
            last_error: health.last_error.clone(),
            error_count: health.error_count,
            request_count: health.request_count,
            success_count: health.success_count,
            rate_limited_until: health.rate_limited_until,
            cooldown_until: health.cooldown_until,
        }
    }
}

fn initial_state(config: &BackendConfig) -> (Option<String>, HealthRecord) {
    match config.resolve_credential() {
        Ok(credential) => (Some(credential), HealthRecord::default()),
        Err(err) => (None, disabled_record(&err)),
    }
}

fn disabled_record(err: &ConfigError) -> HealthRecord {
    HealthRecord {
        last_error: Some(err.to_string()),
        disabled: true,
        ..HealthRecord::default()
    }
}

fn expiry(now: DateTime<Utc>, cooldown: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(cooldown)
        .ok()
        .and_then(|d| now.checked_add_signed(d))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn backend() -> Backend {
        Backend::new(
            BackendConfig::new("a", BackendFamily::Chat, "https://a", "gpt-4o-mini")
                .with_api_key("k"),
        )
    }

    fn t0() -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000, 0).single().unwrap()
    }

    #[test]
    fn test_new_backend_is_ready() {
        let backend = backend();
        assert!(backend.is_ready(t0()));
        assert_eq!(backend.status(t0()).state, HealthState::Healthy);
        assert_eq!(backend.endpoint().unwrap().credential, "k");
    }

    #[test]
    fn test_missing_credential_starts_unavailable() {
        let backend = Backend::new(
            BackendConfig::new("a", BackendFamily::Chat, "https://a", "m")
                .with_api_key_env("GENFORGE_TEST_NEVER_SET_BACKEND_KEY"),
        );
        assert!(!backend.is_ready(t0()));
        assert!(backend.is_disabled());
        let status = backend.status(t0());
        assert_eq!(status.state, HealthState::Unavailable);
        assert!(status.last_error.unwrap().contains("GENFORGE_TEST_NEVER_SET_BACKEND_KEY"));
        assert!(matches!(
            backend.endpoint(),
            Err(LlmError::Misconfiguration(_))
        ));
    }

    #[test]
    fn test_rate_limit_expires_exactly_at_deadline() {
        let backend = backend();
        backend.record_rate_limited(t0(), Duration::from_secs(60), "429".to_string());

        assert!(!backend.is_ready(t0()));
        assert!(!backend.is_ready(t0() + chrono::Duration::seconds(59)));
        assert!(!backend.is_ready(t0() + chrono::Duration::milliseconds(59_999)));
        assert!(backend.is_ready(t0() + chrono::Duration::seconds(60)));
    }

    #[test]
    fn test_server_error_cooldown_expires_on_its_own() {
        let backend = backend();
        backend.record_server_error(t0(), Duration::from_secs(30), "503".to_string());

        let almost = t0() + chrono::Duration::milliseconds(29_999);
        assert!(!backend.is_ready(almost));
        assert_eq!(backend.status(almost).state, HealthState::CoolingDown);

        let deadline = t0() + chrono::Duration::seconds(30);
        assert!(backend.is_ready(deadline));
        let status = backend.status(deadline);
        assert_eq!(status.state, HealthState::Healthy);
        assert_eq!(status.cooldown_until, None);
        assert_eq!(status.error_count, 1);
    }

    #[test]
    fn test_counters() {
        let backend = backend();
        backend.record_success();
        backend.record_failure(t0(), "boom".to_string());
        backend.record_server_error(t0(), Duration::from_secs(30), "503".to_string());

        let status = backend.status(t0());
        assert_eq!(status.request_count, 3);
        assert_eq!(status.success_count, 1);
        assert_eq!(status.error_count, 2);
        assert_eq!(status.state, HealthState::CoolingDown);
        assert_eq!(status.last_error.as_deref(), Some("503"));
    }

    #[test]
    fn test_auth_failure_is_permanent_until_reset() {
        let backend = backend();
        backend.record_auth_failure(t0(), "401".to_string());
        assert!(!backend.is_ready(t0() + chrono::Duration::days(1)));

        backend.reset();
        assert!(backend.is_ready(t0()));
        assert_eq!(backend.status(t0()).request_count, 0);
    }

    #[test]
    fn test_success_clears_cooldown() {
        let backend = backend();
        backend.record_server_error(t0(), Duration::from_secs(30), "500".to_string());
        assert!(!backend.is_ready(t0()));
        backend.record_success();
        assert!(backend.is_ready(t0()));
    }

    #[test]
    fn test_reload_restores_credential() {
        let backend = Backend::new(
            BackendConfig::new("a", BackendFamily::Chat, "https://a", "m")
                .with_api_key_env("GENFORGE_TEST_NEVER_SET_RELOAD_KEY"),
        );
        assert!(backend.is_disabled());

        backend.reload(
            &BackendConfig::new("a", BackendFamily::Chat, "https://a", "m").with_api_key("new"),
        );
        assert!(backend.is_ready(t0()));
        assert_eq!(backend.endpoint().unwrap().credential, "new");
    }
}
