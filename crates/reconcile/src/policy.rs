use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use pricesync_core::{Currency, EngineError, EngineResult};

/// Thresholds that turn a ranked candidate list into a decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconcilePolicy {
    /// Minimum top confidence for an automatic price update.
    #[serde(default = "default_auto_apply_min")]
    pub auto_apply_min: f64,
    /// Minimum confidence for a candidate to be worth a human look.
    #[serde(default = "default_review_min")]
    pub review_min: f64,
    /// Top two candidates closer than this are ambiguous.
    #[serde(default = "default_ambiguity_band")]
    pub ambiguity_band: f64,
    /// Price differences up to this amount are not changes.
    #[serde(default = "default_price_epsilon")]
    pub price_epsilon: f64,
    /// Per-currency epsilon overrides keyed by currency code (e.g. `JPY = 1.0`).
    #[serde(default)]
    pub currency_epsilon: BTreeMap<String, f64>,
}

fn default_auto_apply_min() -> f64 {
    0.9
}

fn default_review_min() -> f64 {
    0.5
}

fn default_ambiguity_band() -> f64 {
    0.05
}

fn default_price_epsilon() -> f64 {
    0.01
}

impl Default for ReconcilePolicy {
    fn default() -> Self {
        Self {
            auto_apply_min: default_auto_apply_min(),
            review_min: default_review_min(),
            ambiguity_band: default_ambiguity_band(),
            price_epsilon: default_price_epsilon(),
            currency_epsilon: BTreeMap::new(),
        }
    }
}

impl ReconcilePolicy {
    pub fn with_auto_apply_min(mut self, value: f64) -> Self {
        self.auto_apply_min = value;
        self
    }

    pub fn with_review_min(mut self, value: f64) -> Self {
        self.review_min = value;
        self
    }

    pub fn with_ambiguity_band(mut self, value: f64) -> Self {
        self.ambiguity_band = value;
        self
    }

    pub fn with_price_epsilon(mut self, value: f64) -> Self {
        self.price_epsilon = value;
        self
    }

    pub fn with_currency_epsilon(mut self, currency: &Currency, value: f64) -> Self {
        self.currency_epsilon.insert(currency.code().to_string(), value);
        self
    }

    /// Epsilon for prices in `currency`.
    pub fn epsilon_for(&self, currency: &Currency) -> f64 {
        self.currency_epsilon
            .get(currency.code())
            .copied()
            .unwrap_or(self.price_epsilon)
    }

    pub fn validate(&self) -> EngineResult<()> {
        for (name, value) in [
            ("auto_apply_min", self.auto_apply_min),
            ("review_min", self.review_min),
            ("ambiguity_band", self.ambiguity_band),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(EngineError::config(format!(
                    "reconcile.{name} must be within [0, 1], got {value}"
                )));
            }
        }
        if self.review_min > self.auto_apply_min {
            return Err(EngineError::config(format!(
                "reconcile.review_min ({}) must not exceed auto_apply_min ({})",
                self.review_min, self.auto_apply_min
            )));
        }
        if !self.price_epsilon.is_finite() || self.price_epsilon < 0.0 {
            return Err(EngineError::config("reconcile.price_epsilon must be finite and non-negative"));
        }
        for (code, eps) in &self.currency_epsilon {
            Currency::parse(code)
                .map_err(|_| EngineError::config(format!("reconcile.currency_epsilon: bad currency '{code}'")))?;
            if !eps.is_finite() || *eps < 0.0 {
                return Err(EngineError::config(format!(
                    "reconcile.currency_epsilon.{code} must be finite and non-negative"
                )));
            }
        }
        Ok(())
    }
}
