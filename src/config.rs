use chrono::Weekday;
use serde::{Deserialize, Serialize};

use crate::errors::{LedgerError, Result};
use crate::types::PaymentKind;

/// longest term accepted at origination (50 years)
pub const DEFAULT_MAX_TERM_MONTHS: u32 = 600;

/// widest due-soon window accepted (ten years)
pub const MAX_DUE_SOON_DAYS: u32 = 3_650;

/// ledger configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// loans longer than this are rejected as invalid terms
    pub max_term_months: u32,
    /// loans ending within this many days are reported as due soon
    pub due_soon_days: u32,
    /// default row count for the top clients report
    pub top_clients_limit: usize,
    /// first day of the week for weekly summaries
    pub week_start: Weekday,
    /// kind recorded when a payment does not name one
    pub default_payment_kind: PaymentKind,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            max_term_months: DEFAULT_MAX_TERM_MONTHS,
            due_soon_days: 7,
            top_clients_limit: 10,
            week_start: Weekday::Sun,
            default_payment_kind: PaymentKind::Installment,
        }
    }
}

impl LedgerConfig {
    /// parse from json; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self> {
        let config: LedgerConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// load from a json file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_term_months == 0 {
            return Err(LedgerError::InvalidConfiguration {
                message: "max_term_months must be at least 1".to_string(),
            });
        }

        if self.due_soon_days > MAX_DUE_SOON_DAYS {
            return Err(LedgerError::InvalidConfiguration {
                message: format!(
                    "due_soon_days of {} exceeds maximum of {}",
                    self.due_soon_days, MAX_DUE_SOON_DAYS
                ),
            });
        }

        if self.top_clients_limit == 0 {
            return Err(LedgerError::InvalidConfiguration {
                message: "top_clients_limit must be at least 1".to_string(),
            });
        }

        Ok(())
    }

    pub fn with_max_term_months(mut self, months: u32) -> Self {
        self.max_term_months = months;
        self
    }

    pub fn with_due_soon_days(mut self, days: u32) -> Self {
        self.due_soon_days = days;
        self
    }

    pub fn with_week_start(mut self, day: Weekday) -> Self {
        self.week_start = day;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = LedgerConfig::default();
        assert_eq!(config.max_term_months, 600);
        assert_eq!(config.due_soon_days, 7);
        assert_eq!(config.top_clients_limit, 10);
        assert_eq!(config.week_start, Weekday::Sun);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = LedgerConfig::from_json(r#"{"due_soon_days": 14, "week_start": "Mon"}"#)
            .unwrap();
        assert_eq!(config.due_soon_days, 14);
        assert_eq!(config.week_start, Weekday::Mon);
        assert_eq!(config.max_term_months, DEFAULT_MAX_TERM_MONTHS);
        assert_eq!(config.default_payment_kind, PaymentKind::Installment);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let err = LedgerConfig::from_json(r#"{"max_term_months": 0}"#).unwrap_err();
        assert!(matches!(err, LedgerError::InvalidConfiguration { .. }));

        let err = LedgerConfig::from_json("not json").unwrap_err();
        assert!(matches!(err, LedgerError::Serialization(_)));
    }

    #[test]
    fn test_due_soon_window_is_bounded() {
        assert!(LedgerConfig::default().with_due_soon_days(MAX_DUE_SOON_DAYS).validate().is_ok());

        let err = LedgerConfig::default().with_due_soon_days(u32::MAX).validate().unwrap_err();
        assert!(matches!(err, LedgerError::InvalidConfiguration { .. }));

        let err = LedgerConfig::from_json(r#"{"due_soon_days": 3651}"#).unwrap_err();
        assert!(matches!(err, LedgerError::InvalidConfiguration { .. }));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.json");
        let config = LedgerConfig::default()
            .with_max_term_months(120)
            .with_week_start(Weekday::Mon);
        std::fs::write(&path, serde_json::to_string_pretty(&config).unwrap()).unwrap();

        assert_eq!(LedgerConfig::from_file(&path).unwrap(), config);

        std::fs::write(&path, r#"{"top_clients_limit": 0}"#).unwrap();
        assert!(matches!(
            LedgerConfig::from_file(&path),
            Err(LedgerError::InvalidConfiguration { .. })
        ));

        let missing = LedgerConfig::from_file(dir.path().join("missing.json")).unwrap_err();
        assert!(matches!(missing, LedgerError::Io(_)));
    }
}
