#![forbid(unsafe_code)]

//! Binding options.
//!
//! With the `policy-config` feature, options can be loaded from TOML or JSON:
//!
//! ```toml
//! event_key = "$event"
//! strict = true
//! ```
//!
//! Missing fields take their defaults; every loaded document is validated.

use statelink_core::EvalFlags;

use crate::error::ConfigError;

/// Default name the current event is injected under.
pub const DEFAULT_EVENT_KEY: &str = "$event";

/// Tunables for a state-dispatch binding.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "policy-config", derive(serde::Deserialize, serde::Serialize))]
#[cfg_attr(feature = "policy-config", serde(default))]
pub struct BindingOptions {
    /// Override-context key the current event is visible under while the
    /// event expression evaluates.
    pub event_key: String,
    /// Evaluate the event expression strictly (unknown names are errors).
    pub strict: bool,
}

impl Default for BindingOptions {
    fn default() -> Self {
        Self {
            event_key: DEFAULT_EVENT_KEY.to_owned(),
            strict: false,
        }
    }
}

impl BindingOptions {
    /// Check invariants.
    ///
    /// # Errors
    ///
    /// [`ConfigError::EmptyEventKey`] when the event key is blank.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.event_key.trim().is_empty() {
            return Err(ConfigError::EmptyEventKey);
        }
        Ok(())
    }

    /// Evaluation flags implied by these options.
    #[must_use]
    pub fn eval_flags(&self) -> EvalFlags {
        if self.strict {
            EvalFlags::STRICT
        } else {
            EvalFlags::empty()
        }
    }

    /// Parse and validate options from a TOML document.
    ///
    /// # Errors
    ///
    /// Parse failures and validation failures.
    #[cfg(feature = "policy-config")]
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let options: Self = toml::from_str(input)?;
        options.validate()?;
        Ok(options)
    }

    /// Parse and validate options from a JSON document.
    ///
    /// # Errors
    ///
    /// Parse failures and validation failures.
    #[cfg(feature = "policy-config")]
    pub fn from_json_str(input: &str) -> Result<Self, ConfigError> {
        let options: Self = serde_json::from_str(input)?;
        options.validate()?;
        Ok(options)
    }
}
