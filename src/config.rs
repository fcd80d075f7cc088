//! Ambient tunables, built with a small typed-builder idiom: the builder
//! consumes `self` by value and returns it, rather than a separate
//! builder type.

/// Backoff constants for [`crate::store::PendingOperation`] retry scheduling.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackoffConfig {
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub backoff_multiplier: f64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_backoff_ms: 1_000,
            max_backoff_ms: 60_000,
            backoff_multiplier: 2.0,
        }
    }
}

/// Crate-wide tunables for the parser, generator, and backoff schedule.
#[derive(Debug, Clone, PartialEq)]
pub struct CalSyncConfig {
    /// Ceiling on total parser input size, in bytes. Exceeding it is
    /// `ParseError::InputTooLarge`.
    pub max_input_bytes: usize,
    /// Ceiling on the number of instances an RRULE expansion may produce.
    /// Exceeding it is `ExpandError::RRuleExplosion`.
    pub max_rrule_instances: usize,
    /// `PRODID` emitted by the generator.
    pub prod_id: String,
    pub backoff: BackoffConfig,
    /// URL schemes accepted for subscription endpoints and `URL`-typed
    /// properties. Anything else yields `UnsafeScheme`.
    pub allowed_schemes: Vec<String>,
}

impl Default for CalSyncConfig {
    fn default() -> Self {
        Self {
            max_input_bytes: 10 * 1024 * 1024,
            max_rrule_instances: 1000,
            prod_id: "-//icalsync//icalsync 1.0//EN".to_string(),
            backoff: BackoffConfig::default(),
            allowed_schemes: vec!["https".into(), "http".into(), "webcal".into()],
        }
    }
}

impl CalSyncConfig {
    pub fn builder() -> CalSyncConfigBuilder {
        CalSyncConfigBuilder(Self::default())
    }
}

/// Consuming builder over [`CalSyncConfig`].
pub struct CalSyncConfigBuilder(CalSyncConfig);

impl CalSyncConfigBuilder {
    pub fn max_input_bytes(mut self, value: usize) -> Self {
        self.0.max_input_bytes = value;
        self
    }

    pub fn max_rrule_instances(mut self, value: usize) -> Self {
        self.0.max_rrule_instances = value;
        self
    }

    pub fn prod_id(mut self, value: impl Into<String>) -> Self {
        self.0.prod_id = value.into();
        self
    }

    pub fn backoff(mut self, value: BackoffConfig) -> Self {
        self.0.backoff = value;
        self
    }

    pub fn build(self) -> CalSyncConfig {
        self.0
    }
}
