//! Configuration types for the cleaning engine.
//!
//! The configuration document is validated once, when it is loaded, against a
//! fixed shape: every column declaration must carry a known `dtype`, the
//! imputation strategy is a closed set, thresholds are fractions, and column
//! names are already canonical. Nothing is checked ad hoc while tables are
//! being cleaned.
//!
//! # Example
//!
//! ```rust,ignore
//! use table_sanitizer::config::*;
//!
//! let config = CleaningConfig::builder()
//!     .drop_column_threshold(0.5)
//!     .drop_row_threshold(0.5)
//!     .table(
//!         "insurance_claims",
//!         TableConfig::new(vec![
//!             ColumnConfig::new("claimid", DeclaredType::String).critical(),
//!             ColumnConfig::new("claimamount", DeclaredType::Float).impute(ImputeStrategy::Median),
//!         ]),
//!     )
//!     .build()?;
//! ```

use crate::cleaner::normalize_column_name;
use crate::error::{CleaningError, Result};
use serde::de::{self, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

/// Default threshold for both column and row elimination.
pub const DEFAULT_DROP_THRESHOLD: f64 = 0.5;

/// Fill value used by the `constant` strategy when none is configured,
/// and by `mode` when no mode can be computed.
pub const UNKNOWN_FILL: &str = "Unknown";

/// Semantic type a column is coerced to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeclaredType {
    String,
    Int,
    Float,
    Datetime,
}

impl DeclaredType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Int => "int",
            Self::Float => "float",
            Self::Datetime => "datetime",
        }
    }
}

impl fmt::Display for DeclaredType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rule used to fill the missing values of a column.
///
/// This is a closed set: an unrecognised strategy in the configuration
/// document is rejected when the document is loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ImputeStrategy {
    /// Leave missing values as they are.
    Skip,
    /// Median of the non-missing numeric values, `0` when there are none.
    Median,
    /// Most frequent non-missing value, `"Unknown"` when there is none.
    Mode,
    /// The configured constant, `"Unknown"` when none is configured.
    Constant,
    /// Median for numeric columns, mode otherwise.
    #[default]
    Default,
}

impl ImputeStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Skip => "skip",
            Self::Median => "median",
            Self::Mode => "mode",
            Self::Constant => "constant",
            Self::Default => "default",
        }
    }
}

impl fmt::Display for ImputeStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Scalar fill value for the `constant` strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FillValue {
    Int(i64),
    Float(f64),
    Bool(bool),
    Text(String),
}

impl FillValue {
    /// Numeric view of the value, if it has one.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(v) => Some(*v as f64),
            Self::Float(v) => Some(*v),
            Self::Bool(_) | Self::Text(_) => None,
        }
    }
}

impl fmt::Display for FillValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Text(v) => f.write_str(v),
        }
    }
}

/// Declaration of a single column.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnConfig {
    pub name: String,
    pub dtype: DeclaredType,
    /// Critical columns are never dropped, and a row missing one is.
    pub critical: bool,
    pub impute: ImputeStrategy,
    /// Constant for the `constant` strategy.
    pub value: Option<FillValue>,
}

impl ColumnConfig {
    pub fn new(name: impl Into<String>, dtype: DeclaredType) -> Self {
        Self {
            name: name.into(),
            dtype,
            critical: false,
            impute: ImputeStrategy::default(),
            value: None,
        }
    }

    /// Mark the column critical. Critical columns default to `skip`.
    pub fn critical(mut self) -> Self {
        self.critical = true;
        self.impute = ImputeStrategy::Skip;
        self
    }

    pub fn impute(mut self, strategy: ImputeStrategy) -> Self {
        self.impute = strategy;
        self
    }

    /// Use the `constant` strategy with the given fill value.
    pub fn value(mut self, value: FillValue) -> Self {
        self.impute = ImputeStrategy::Constant;
        self.value = Some(value);
        self
    }
}

/// Wire form of a column declaration; the name is the map key.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct ColumnDecl {
    dtype: DeclaredType,
    #[serde(default)]
    critical: bool,
    /// Absent means `skip` for critical columns and `default` otherwise.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    impute: Option<ImputeStrategy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    value: Option<FillValue>,
}

impl From<&ColumnConfig> for ColumnDecl {
    fn from(column: &ColumnConfig) -> Self {
        Self {
            dtype: column.dtype,
            critical: column.critical,
            impute: Some(column.impute),
            value: column.value.clone(),
        }
    }
}

/// Column declarations for one table, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TableConfig {
    #[serde(with = "columns_in_order")]
    pub columns: Vec<ColumnConfig>,
}

impl TableConfig {
    pub fn new(columns: Vec<ColumnConfig>) -> Self {
        Self { columns }
    }

    /// Look up a column declaration by name.
    pub fn column(&self, name: &str) -> Option<&ColumnConfig> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Names of the critical columns, in declaration order.
    pub fn critical_columns(&self) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|c| c.critical)
            .map(|c| c.name.as_str())
            .collect()
    }

    pub fn is_critical(&self, name: &str) -> bool {
        self.column(name).is_some_and(|c| c.critical)
    }

    /// Strategy for a column; undeclared columns use `default`.
    pub fn impute_strategy(&self, name: &str) -> ImputeStrategy {
        self.column(name).map(|c| c.impute).unwrap_or_default()
    }
}

/// Keeps the `columns` object in document order and rejects duplicate keys.
mod columns_in_order {
    use super::*;

    pub(super) fn serialize<S>(columns: &[ColumnConfig], serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(columns.len()))?;
        for column in columns {
            map.serialize_entry(&column.name, &ColumnDecl::from(column))?;
        }
        map.end()
    }

    pub(super) fn deserialize<'de, D>(deserializer: D) -> std::result::Result<Vec<ColumnConfig>, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_map(ColumnsVisitor)
    }

    struct ColumnsVisitor;

    impl<'de> Visitor<'de> for ColumnsVisitor {
        type Value = Vec<ColumnConfig>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a map from column name to column declaration")
        }

        fn visit_map<A>(self, mut map: A) -> std::result::Result<Self::Value, A::Error>
        where
            A: MapAccess<'de>,
        {
            let mut columns: Vec<ColumnConfig> = Vec::with_capacity(map.size_hint().unwrap_or(0));
            while let Some((name, decl)) = map.next_entry::<String, ColumnDecl>()? {
                if columns.iter().any(|c| c.name == name) {
                    return Err(de::Error::custom(format!(
                        "column '{name}' is declared more than once"
                    )));
                }
                let impute = decl.impute.unwrap_or(if decl.critical {
                    ImputeStrategy::Skip
                } else {
                    ImputeStrategy::Default
                });
                columns.push(ColumnConfig {
                    name,
                    dtype: decl.dtype,
                    critical: decl.critical,
                    impute,
                    value: decl.value,
                });
            }
            Ok(columns)
        }
    }
}

fn default_threshold() -> f64 {
    DEFAULT_DROP_THRESHOLD
}

/// Configuration document for a cleaning run.
///
/// Immutable for the duration of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CleaningConfig {
    /// Non-critical columns whose null ratio exceeds this are dropped.
    /// Default: 0.5
    #[serde(default = "default_threshold")]
    pub drop_column_threshold: f64,

    /// Rows whose null ratio across the remaining columns exceeds this are dropped.
    /// Default: 0.5
    #[serde(default = "default_threshold")]
    pub drop_row_threshold: f64,

    /// Per-table column declarations.
    #[serde(default)]
    pub tables: BTreeMap<String, TableConfig>,
}

impl Default for CleaningConfig {
    fn default() -> Self {
        Self {
            drop_column_threshold: DEFAULT_DROP_THRESHOLD,
            drop_row_threshold: DEFAULT_DROP_THRESHOLD,
            tables: BTreeMap::new(),
        }
    }
}

impl CleaningConfig {
    /// Create a new configuration builder.
    pub fn builder() -> CleaningConfigBuilder {
        CleaningConfigBuilder::default()
    }

    /// Parse and validate a JSON configuration document.
    ///
    /// # Errors
    ///
    /// Returns [`CleaningError::InvalidConfig`] when the document does not have
    /// the expected shape (including unknown `dtype` or `impute` values) or
    /// fails validation.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: CleaningConfig = serde_json::from_str(json)
            .map_err(|e| CleaningError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`CleaningError::Io`] if the file cannot be read and
    /// [`CleaningError::InvalidConfig`] if it is malformed.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
            .map_err(|e| e.with_context(format!("Loading config from {}", path.display())))
    }

    /// Configuration for a table, if one is declared.
    pub fn table(&self, name: &str) -> Option<&TableConfig> {
        self.tables.get(name)
    }

    /// Validate the configuration and return errors if invalid.
    pub fn validate(&self) -> std::result::Result<(), ConfigValidationError> {
        if !(0.0..=1.0).contains(&self.drop_column_threshold) {
            return Err(ConfigValidationError::InvalidThreshold {
                field: "drop_column_threshold".to_string(),
                value: self.drop_column_threshold,
            });
        }

        if !(0.0..=1.0).contains(&self.drop_row_threshold) {
            return Err(ConfigValidationError::InvalidThreshold {
                field: "drop_row_threshold".to_string(),
                value: self.drop_row_threshold,
            });
        }

        for (table, table_config) in &self.tables {
            for column in &table_config.columns {
                let canonical = normalize_column_name(&column.name);
                if canonical != column.name {
                    return Err(ConfigValidationError::NonCanonicalColumnName {
                        table: table.clone(),
                        column: column.name.clone(),
                        canonical,
                    });
                }

                if column.value.is_some() && column.impute != ImputeStrategy::Constant {
                    return Err(ConfigValidationError::UnexpectedValue {
                        table: table.clone(),
                        column: column.name.clone(),
                        strategy: column.impute,
                    });
                }
            }
        }

        Ok(())
    }
}

/// Errors that can occur during configuration validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Invalid threshold for '{field}': {value} (must be between 0.0 and 1.0)")]
    InvalidThreshold { field: String, value: f64 },

    #[error("Column '{column}' in table '{table}' is not a canonical name (expected '{canonical}')")]
    NonCanonicalColumnName {
        table: String,
        column: String,
        canonical: String,
    },

    #[error("Column '{column}' in table '{table}' sets a value but uses the '{strategy}' strategy")]
    UnexpectedValue {
        table: String,
        column: String,
        strategy: ImputeStrategy,
    },
}

impl From<ConfigValidationError> for CleaningError {
    fn from(err: ConfigValidationError) -> Self {
        CleaningError::InvalidConfig(err.to_string())
    }
}

/// Builder for [`CleaningConfig`] with fluent API.
#[derive(Debug, Default)]
pub struct CleaningConfigBuilder {
    drop_column_threshold: Option<f64>,
    drop_row_threshold: Option<f64>,
    tables: BTreeMap<String, TableConfig>,
}

impl CleaningConfigBuilder {
    /// Set the null ratio above which non-critical columns are dropped.
    ///
    /// # Arguments
    /// * `threshold` - Value between 0.0 and 1.0 (e.g., 0.5 = 50%)
    pub fn drop_column_threshold(mut self, threshold: f64) -> Self {
        self.drop_column_threshold = Some(threshold);
        self
    }

    /// Set the null ratio above which rows are dropped.
    ///
    /// # Arguments
    /// * `threshold` - Value between 0.0 and 1.0 (e.g., 0.5 = 50%)
    pub fn drop_row_threshold(mut self, threshold: f64) -> Self {
        self.drop_row_threshold = Some(threshold);
        self
    }

    /// Declare the columns of a table. Replaces an earlier declaration.
    pub fn table(mut self, name: impl Into<String>, table: TableConfig) -> Self {
        self.tables.insert(name.into(), table);
        self
    }

    /// Build the configuration.
    ///
    /// Returns a validated `CleaningConfig` or an error if validation fails.
    pub fn build(self) -> std::result::Result<CleaningConfig, ConfigValidationError> {
        let config = CleaningConfig {
            drop_column_threshold: self.drop_column_threshold.unwrap_or(DEFAULT_DROP_THRESHOLD),
            drop_row_threshold: self.drop_row_threshold.unwrap_or(DEFAULT_DROP_THRESHOLD),
            tables: self.tables,
        };

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CLAIMS_JSON: &str = r#"{
        "drop_column_threshold": 0.4,
        "drop_row_threshold": 0.6,
        "tables": {
            "insurance_claims": {
                "columns": {
                    "claimid": {"dtype": "string", "critical": true, "impute": "skip"},
                    "policyid": {"dtype": "string", "critical": true, "impute": "skip"},
                    "claimdate": {"dtype": "datetime", "impute": "mode"},
                    "claimamount": {"dtype": "float", "impute": "median"},
                    "claimstatus": {"dtype": "string", "impute": "constant", "value": "pending"},
                    "reason": {"dtype": "string"}
                }
            }
        }
    }"#;

    #[test]
    fn test_default_config() {
        let config = CleaningConfig::default();
        assert_eq!(config.drop_column_threshold, 0.5);
        assert_eq!(config.drop_row_threshold, 0.5);
        assert!(config.tables.is_empty());
    }

    #[test]
    fn test_from_json_keeps_declaration_order() {
        let config = CleaningConfig::from_json_str(CLAIMS_JSON).unwrap();
        assert_eq!(config.drop_column_threshold, 0.4);
        assert_eq!(config.drop_row_threshold, 0.6);

        let claims = config.table("insurance_claims").unwrap();
        let names: Vec<&str> = claims.columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(
            names,
            ["claimid", "policyid", "claimdate", "claimamount", "claimstatus", "reason"]
        );
        assert_eq!(claims.critical_columns(), ["claimid", "policyid"]);
        assert_eq!(claims.impute_strategy("reason"), ImputeStrategy::Default);
        assert_eq!(claims.impute_strategy("not_declared"), ImputeStrategy::Default);
        assert_eq!(
            claims.column("claimstatus").unwrap().value,
            Some(FillValue::Text("pending".to_string()))
        );
    }

    #[test]
    fn test_critical_column_without_strategy_defaults_to_skip() {
        let json = r#"{"tables": {"t": {"columns": {
            "id": {"dtype": "string", "critical": true},
            "note": {"dtype": "string"},
            "code": {"dtype": "int", "critical": true, "impute": "mode"}
        }}}}"#;
        let config = CleaningConfig::from_json_str(json).unwrap();
        let table = config.table("t").unwrap();

        assert_eq!(table.impute_strategy("id"), ImputeStrategy::Skip);
        assert_eq!(table.impute_strategy("note"), ImputeStrategy::Default);
        assert_eq!(table.impute_strategy("code"), ImputeStrategy::Mode);
        assert_eq!(
            table.column("id"),
            Some(&ColumnConfig::new("id", DeclaredType::String).critical())
        );
    }

    #[test]
    fn test_thresholds_default_when_absent() {
        let config = CleaningConfig::from_json_str(r#"{"tables": {}}"#).unwrap();
        assert_eq!(config.drop_column_threshold, DEFAULT_DROP_THRESHOLD);
        assert_eq!(config.drop_row_threshold, DEFAULT_DROP_THRESHOLD);
    }

    #[test]
    fn test_unknown_strategy_rejected_at_load() {
        let json = r#"{"tables": {"t": {"columns": {"a": {"dtype": "int", "impute": "knn"}}}}}"#;
        let err = CleaningConfig::from_json_str(json).unwrap_err();
        assert!(matches!(err, CleaningError::InvalidConfig(_)));
        assert!(err.to_string().contains("knn"));
    }

    #[test]
    fn test_missing_dtype_rejected() {
        let json = r#"{"tables": {"t": {"columns": {"a": {"impute": "mode"}}}}}"#;
        let err = CleaningConfig::from_json_str(json).unwrap_err();
        assert!(err.to_string().contains("dtype"));
    }

    #[test]
    fn test_unknown_field_rejected() {
        let json = r#"{"tables": {"t": {"columns": {"a": {"dtype": "int", "nullable": true}}}}}"#;
        assert!(CleaningConfig::from_json_str(json).is_err());
    }

    #[test]
    fn test_duplicate_column_rejected() {
        let json = r#"{"tables": {"t": {"columns": {
            "a": {"dtype": "int"},
            "a": {"dtype": "float"}
        }}}}"#;
        let err = CleaningConfig::from_json_str(json).unwrap_err();
        assert!(err.to_string().contains("more than once"));
    }

    #[test]
    fn test_non_canonical_column_name_rejected() {
        let result = CleaningConfig::builder()
            .table(
                "customers",
                TableConfig::new(vec![ColumnConfig::new("Customer ID", DeclaredType::String)]),
            )
            .build();

        assert!(matches!(
            result.unwrap_err(),
            ConfigValidationError::NonCanonicalColumnName { canonical, .. } if canonical == "customer_id"
        ));
    }

    #[test]
    fn test_value_without_constant_strategy_rejected() {
        let json = r#"{"tables": {"t": {"columns": {"a": {"dtype": "int", "impute": "median", "value": 3}}}}}"#;
        let err = CleaningConfig::from_json_str(json).unwrap_err();
        assert!(err.is_configuration_error());
    }

    #[test]
    fn test_validation_invalid_threshold() {
        let result = CleaningConfig::builder().drop_row_threshold(1.5).build();
        assert!(matches!(
            result.unwrap_err(),
            ConfigValidationError::InvalidThreshold { .. }
        ));
    }

    #[test]
    fn test_column_builder() {
        let id = ColumnConfig::new("customerid", DeclaredType::String).critical();
        assert!(id.critical);
        assert_eq!(id.impute, ImputeStrategy::Skip);

        let status = ColumnConfig::new("status", DeclaredType::String)
            .value(FillValue::Text("open".to_string()));
        assert_eq!(status.impute, ImputeStrategy::Constant);
    }

    #[test]
    fn test_config_serialization_round_trip() {
        let config = CleaningConfig::from_json_str(CLAIMS_JSON).unwrap();
        let json = serde_json::to_string(&config).unwrap();
        let deserialized = CleaningConfig::from_json_str(&json).unwrap();
        assert_eq!(config, deserialized);
    }

    #[test]
    fn test_fill_value_untagged() {
        let values: Vec<FillValue> = serde_json::from_str(r#"[3, 2.5, true, "n/a"]"#).unwrap();
        assert_eq!(
            values,
            vec![
                FillValue::Int(3),
                FillValue::Float(2.5),
                FillValue::Bool(true),
                FillValue::Text("n/a".to_string()),
            ]
        );
        assert_eq!(values[0].as_f64(), Some(3.0));
        assert_eq!(values[3].as_f64(), None);
    }
}
