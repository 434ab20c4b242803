//! Import policy: matcher settings, reconciliation thresholds and run options,
//! loadable from TOML.

use std::num::NonZeroUsize;
use std::thread;

use serde::{Deserialize, Serialize};

use pricesync_core::{Currency, EngineError, EngineResult};
use pricesync_matching::MatchSettings;
use pricesync_reconcile::ReconcilePolicy;

/// Options that shape a run rather than a single decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportOptions {
    /// Worker threads for the match phase. `None` uses available parallelism.
    #[serde(default)]
    pub workers: Option<usize>,
    /// When `false` the run is a dry run and no catalog price is written.
    #[serde(default = "default_update_existing_prices")]
    pub update_existing_prices: bool,
    /// Currency for rows that do not state one.
    #[serde(default = "default_currency")]
    pub default_currency: Currency,
    /// When non-empty, rows priced in other currencies fail validation.
    #[serde(default)]
    pub allowed_currencies: Vec<Currency>,
    /// Relative price change against the matched entry that validation warns
    /// about (0.5 == 50%).
    #[serde(default = "default_max_price_deviation")]
    pub max_price_deviation: f64,
}

fn default_update_existing_prices() -> bool {
    true
}

fn default_currency() -> Currency {
    Currency::rub()
}

fn default_max_price_deviation() -> f64 {
    0.5
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            workers: None,
            update_existing_prices: default_update_existing_prices(),
            default_currency: default_currency(),
            allowed_currencies: Vec::new(),
            max_price_deviation: default_max_price_deviation(),
        }
    }
}

impl ImportOptions {
    pub fn currency_allowed(&self, currency: &Currency) -> bool {
        self.allowed_currencies.is_empty() || self.allowed_currencies.contains(currency)
    }
}

/// Everything `import_batch` needs besides rows and the index.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImportPolicy {
    #[serde(default)]
    pub matching: MatchSettings,
    #[serde(default)]
    pub reconcile: ReconcilePolicy,
    #[serde(default)]
    pub import: ImportOptions,
}

impl ImportPolicy {
    /// Parse and validate a TOML document. Missing sections and keys take
    /// their defaults.
    pub fn from_toml(input: &str) -> EngineResult<Self> {
        let policy: ImportPolicy =
            toml::from_str(input).map_err(|e| EngineError::config(e.to_string()))?;
        policy.validate()?;
        Ok(policy)
    }

    pub fn validate(&self) -> EngineResult<()> {
        self.matching.validate()?;
        self.reconcile.validate()?;

        if self.import.workers == Some(0) {
            return Err(EngineError::config("import.workers must be at least 1"));
        }
        let deviation = self.import.max_price_deviation;
        if !deviation.is_finite() || deviation < 0.0 {
            return Err(EngineError::config(
                "import.max_price_deviation must be finite and non-negative",
            ));
        }
        Ok(())
    }

    pub fn with_auto_apply_min(mut self, value: f64) -> Self {
        self.reconcile.auto_apply_min = value;
        self
    }

    pub fn with_review_min(mut self, value: f64) -> Self {
        self.reconcile.review_min = value;
        self
    }

    pub fn with_price_epsilon(mut self, value: f64) -> Self {
        self.reconcile.price_epsilon = value;
        self
    }

    pub fn with_threshold(mut self, value: f64) -> Self {
        self.matching.threshold = value;
        self
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.matching.top_k = top_k;
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.import.workers = Some(workers);
        self
    }

    pub fn with_update_existing_prices(mut self, update: bool) -> Self {
        self.import.update_existing_prices = update;
        self
    }

    pub fn with_default_currency(mut self, currency: Currency) -> Self {
        self.import.default_currency = currency;
        self
    }

    pub fn with_allowed_currencies(mut self, currencies: impl IntoIterator<Item = Currency>) -> Self {
        self.import.allowed_currencies = currencies.into_iter().collect();
        self
    }

    /// Effective worker count.
    pub fn worker_count(&self) -> usize {
        self.import.workers.unwrap_or_else(|| {
            thread::available_parallelism()
                .map(NonZeroUsize::get)
                .unwrap_or(1)
        })
    }
}
