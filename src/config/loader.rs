//! Configuration loading functionality.
//!
//! This module provides the [`ConfigLoader`] for reading rule sets and
//! financing tables from YAML, and the immutable [`RuleBook`] they load into.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::OnceLock;

use tracing::warn;

use crate::error::{EngineError, EngineResult};
use crate::models::Jurisdiction;

use super::schedule::RuleSet;
use super::types::{FinancingConfig, RuleSetFile};

/// Every rule set and financing table the engine needs.
///
/// A `RuleBook` is built once and never mutated, so any number of queries
/// may share one (behind an `Arc` or a `'static` reference) without locking.
#[derive(Debug, Clone)]
pub struct RuleBook {
    rule_sets: BTreeMap<Jurisdiction, RuleSet>,
    financing: FinancingConfig,
}

impl RuleBook {
    /// Creates a rule book from compiled rule sets and financing tables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigParseError` if two rule sets claim the same jurisdiction.
    pub fn new(rule_sets: Vec<RuleSet>, financing: FinancingConfig) -> EngineResult<Self> {
        let mut by_code = BTreeMap::new();
        for rule_set in rule_sets {
            let code = rule_set.jurisdiction();
            if by_code.insert(code, rule_set).is_some() {
                return Err(EngineError::ConfigParseError {
                    path: code.to_string(),
                    message: "more than one active rule set for jurisdiction".to_string(),
                });
            }
        }
        Ok(Self {
            rule_sets: by_code,
            financing,
        })
    }

    /// Returns the rule set for a jurisdiction regardless of its status.
    pub fn rule_set(&self, jurisdiction: Jurisdiction) -> EngineResult<&RuleSet> {
        self.rule_sets
            .get(&jurisdiction)
            .ok_or_else(|| EngineError::UnsupportedJurisdiction {
                code: jurisdiction.to_string(),
            })
    }

    /// Returns the rule set for a jurisdiction, refusing draft figures.
    ///
    /// # Errors
    ///
    /// - `UnsupportedJurisdiction` if no rule set is loaded for it
    /// - `RuleSetNotReady` if the rule set is not marked ready
    pub fn ready_rule_set(&self, jurisdiction: Jurisdiction) -> EngineResult<&RuleSet> {
        let rule_set = self.rule_set(jurisdiction)?;
        if !rule_set.is_ready() {
            warn!(
                jurisdiction = %jurisdiction,
                status = rule_set.meta().status.as_str(),
                "Refusing to compute with a rule set that is not ready"
            );
            return Err(EngineError::RuleSetNotReady {
                jurisdiction: jurisdiction.to_string(),
                status: rule_set.meta().status.as_str().to_string(),
            });
        }
        Ok(rule_set)
    }

    /// Whether a rule set is loaded for the jurisdiction.
    pub fn supports(&self, jurisdiction: Jurisdiction) -> bool {
        self.rule_sets.contains_key(&jurisdiction)
    }

    /// Iterates loaded rule sets in jurisdiction order.
    pub fn rule_sets(&self) -> impl Iterator<Item = &RuleSet> {
        self.rule_sets.values()
    }

    /// Returns the financing collaborator tables.
    pub fn financing(&self) -> &FinancingConfig {
        &self.financing
    }
}

const BUILTIN_RULE_SETS: [(&str, &str); 8] = [
    ("config/rules/act.yaml", include_str!("../../config/rules/act.yaml")),
    ("config/rules/nsw.yaml", include_str!("../../config/rules/nsw.yaml")),
    ("config/rules/nt.yaml", include_str!("../../config/rules/nt.yaml")),
    ("config/rules/qld.yaml", include_str!("../../config/rules/qld.yaml")),
    ("config/rules/sa.yaml", include_str!("../../config/rules/sa.yaml")),
    ("config/rules/tas.yaml", include_str!("../../config/rules/tas.yaml")),
    ("config/rules/vic.yaml", include_str!("../../config/rules/vic.yaml")),
    ("config/rules/wa.yaml", include_str!("../../config/rules/wa.yaml")),
];

const BUILTIN_FINANCING: (&str, &str) = (
    "config/financing.yaml",
    include_str!("../../config/financing.yaml"),
);

static BUILTIN: OnceLock<RuleBook> = OnceLock::new();

/// Loads rule books from YAML.
///
/// # Directory Structure
///
/// ```text
/// config/
/// ├── financing.yaml      # Mortgage insurance, guarantee caps, ancillary fees
/// └── rules/
///     ├── act.yaml        # One rule set per jurisdiction
///     └── ...
/// ```
///
/// # Example
///
/// ```no_run
/// use stamp_duty_engine::config::ConfigLoader;
/// use stamp_duty_engine::models::Jurisdiction;
///
/// let rules = ConfigLoader::load("./config")?;
/// let nsw = rules.ready_rule_set(Jurisdiction::Nsw)?;
/// println!("NSW figures for {}", nsw.meta().financial_year);
/// # Ok::<(), stamp_duty_engine::error::EngineError>(())
/// ```
pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads a rule book from the specified directory.
    ///
    /// # Returns
    ///
    /// Returns a [`RuleBook`] on success, or an error if:
    /// - `financing.yaml` or the `rules` directory is missing
    /// - Any file contains invalid YAML
    /// - Any schedule or concession rule is inconsistent
    pub fn load<P: AsRef<Path>>(path: P) -> EngineResult<RuleBook> {
        let path = path.as_ref();

        let financing_path = path.join("financing.yaml");
        let financing = Self::parse_yaml::<FinancingConfig>(
            &financing_path.display().to_string(),
            &Self::read(&financing_path)?,
        )?;

        let rules_dir = path.join("rules");
        let rules_dir_str = rules_dir.display().to_string();
        let entries = fs::read_dir(&rules_dir).map_err(|_| EngineError::ConfigNotFound {
            path: rules_dir_str.clone(),
        })?;

        let mut rule_sets = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|_| EngineError::ConfigNotFound {
                path: rules_dir_str.clone(),
            })?;
            let file_path = entry.path();
            if file_path.extension().is_some_and(|ext| ext == "yaml") {
                let content = Self::read(&file_path)?;
                rule_sets.push(Self::parse_rule_set(
                    &file_path.display().to_string(),
                    &content,
                )?);
            }
        }

        if rule_sets.is_empty() {
            return Err(EngineError::ConfigNotFound {
                path: format!("{} (no rule set files found)", rules_dir_str),
            });
        }

        RuleBook::new(rule_sets, financing)
    }

    /// Builds a rule book from in-memory YAML documents.
    ///
    /// Each source is a `(label, content)` pair; the label is only used in
    /// error messages.
    pub fn from_sources(
        rule_sets: &[(&str, &str)],
        financing: (&str, &str),
    ) -> EngineResult<RuleBook> {
        let financing = Self::parse_yaml::<FinancingConfig>(financing.0, financing.1)?;
        let rule_sets = rule_sets
            .iter()
            .map(|(label, content)| Self::parse_rule_set(label, content))
            .collect::<EngineResult<Vec<_>>>()?;
        RuleBook::new(rule_sets, financing)
    }

    /// Returns the rule book compiled into the binary.
    ///
    /// The embedded files are parsed on first use and cached for the life
    /// of the process.
    pub fn builtin() -> EngineResult<&'static RuleBook> {
        if let Some(book) = BUILTIN.get() {
            return Ok(book);
        }
        let book = Self::from_sources(&BUILTIN_RULE_SETS, BUILTIN_FINANCING)?;
        Ok(BUILTIN.get_or_init(|| book))
    }

    /// Parses and compiles one rule set document.
    pub fn parse_rule_set(label: &str, content: &str) -> EngineResult<RuleSet> {
        let file = Self::parse_yaml::<RuleSetFile>(label, content)?;
        RuleSet::compile(file)
    }

    fn read(path: &Path) -> EngineResult<String> {
        fs::read_to_string(path).map_err(|_| EngineError::ConfigNotFound {
            path: path.display().to_string(),
        })
    }

    fn parse_yaml<T: serde::de::DeserializeOwned>(label: &str, content: &str) -> EngineResult<T> {
        serde_yaml::from_str(content).map_err(|e| EngineError::ConfigParseError {
            path: label.to_string(),
            message: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn config_path() -> &'static str {
        "./config"
    }

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_load_valid_configuration() {
        let result = ConfigLoader::load(config_path());
        assert!(result.is_ok(), "Failed to load config: {:?}", result.err());

        let book = result.unwrap();
        for jurisdiction in Jurisdiction::ALL {
            assert!(book.supports(jurisdiction), "missing {}", jurisdiction);
        }
    }

    #[test]
    fn test_builtin_matches_directory() {
        let loaded = ConfigLoader::load(config_path()).unwrap();
        let builtin = ConfigLoader::builtin().unwrap();

        for (a, b) in loaded.rule_sets().zip(builtin.rule_sets()) {
            assert_eq!(a.jurisdiction(), b.jurisdiction());
            assert_eq!(a.established().unwrap(), b.established().unwrap());
        }
        assert_eq!(loaded.financing(), builtin.financing());
    }

    #[test]
    fn test_builtin_is_cached() {
        let first = ConfigLoader::builtin().unwrap() as *const RuleBook;
        let second = ConfigLoader::builtin().unwrap() as *const RuleBook;
        assert_eq!(first, second);
    }

    #[test]
    fn test_sa_upper_bound_rows_are_normalized() {
        let book = ConfigLoader::builtin().unwrap();
        let sa = book.rule_set(Jurisdiction::Sa).unwrap();
        let rows = &sa.established().unwrap().rows;

        assert_eq!(rows.len(), 9);
        assert_eq!(rows[8].lower_inclusive, dec("500000"));
        assert_eq!(rows[8].applies_above_threshold, dec("500000"));
        assert_eq!(rows[8].upper_exclusive, None);
    }

    #[test]
    fn test_financing_tables_loaded_correctly() {
        let book = ConfigLoader::builtin().unwrap();
        let financing = book.financing();

        assert_eq!(financing.mortgage_insurance.no_premium_at_or_below, dec("0.80"));
        assert_eq!(financing.mortgage_insurance.max_leverage, dec("0.95"));
        assert_eq!(financing.mortgage_insurance.bands.len(), 5);
        assert_eq!(
            financing.guarantee_scheme.caps[&Jurisdiction::Nsw]["metro"],
            dec("1500000")
        );
        assert_eq!(
            financing.ancillary_fees.for_jurisdiction(Jurisdiction::Vic),
            dec("3000")
        );
    }

    #[test]
    fn test_load_missing_directory_returns_error() {
        match ConfigLoader::load("/nonexistent/path") {
            Err(EngineError::ConfigNotFound { path }) => {
                assert!(path.contains("financing.yaml"));
            }
            other => panic!("Expected ConfigNotFound error, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_yaml_reports_label() {
        let result = ConfigLoader::parse_rule_set("broken.yaml", "meta: [unclosed");
        match result {
            Err(EngineError::ConfigParseError { path, .. }) => assert_eq!(path, "broken.yaml"),
            other => panic!("Expected ConfigParseError, got {:?}", other),
        }
    }

    #[test]
    fn test_duplicate_jurisdiction_is_rejected() {
        let result = ConfigLoader::from_sources(
            &[BUILTIN_RULE_SETS[1], BUILTIN_RULE_SETS[1]],
            BUILTIN_FINANCING,
        );
        assert!(matches!(result, Err(EngineError::ConfigParseError { .. })));
    }

    #[test]
    fn test_draft_rule_set_is_refused() {
        let draft = BUILTIN_RULE_SETS[4].1.replace("status: ready", "status: draft");
        let book =
            ConfigLoader::from_sources(&[("sa.yaml", draft.as_str())], BUILTIN_FINANCING).unwrap();

        assert!(book.rule_set(Jurisdiction::Sa).is_ok());
        match book.ready_rule_set(Jurisdiction::Sa) {
            Err(EngineError::RuleSetNotReady {
                jurisdiction,
                status,
            }) => {
                assert_eq!(jurisdiction, "SA");
                assert_eq!(status, "draft");
            }
            other => panic!("Expected RuleSetNotReady, got {:?}", other),
        }
    }

    #[test]
    fn test_unloaded_jurisdiction_is_unsupported() {
        let book =
            ConfigLoader::from_sources(&[BUILTIN_RULE_SETS[4]], BUILTIN_FINANCING).unwrap();
        assert!(matches!(
            book.ready_rule_set(Jurisdiction::Nsw),
            Err(EngineError::UnsupportedJurisdiction { .. })
        ));
    }
}
