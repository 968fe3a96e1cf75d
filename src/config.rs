//! Per-invocation configuration.
//!
//! The provisioning stack hands us everything through the Lambda environment.
//! We snapshot the raw text once per invocation with [`FetchConfig::from_env`]
//! and only interpret it in [`FetchConfig::validate`], so that a bad deployment
//! surfaces as a `ConfigurationMissing` failure of the invocation rather than a
//! crash of the whole runtime process.

use once_cell::sync::Lazy;
use std::{collections::HashMap, env, time::Duration};

use crate::error::IngestionError;

pub const API_URL_VAR: &str = "API_URL";
pub const REQUESTS_TIMEOUT_VAR: &str = "REQUESTS_TIMEOUT";
pub const BUCKET_NAME_VAR: &str = "BUCKET_NAME";
pub const NUMERIC_COLUMNS_VAR: &str = "NUMERIC_COLUMNS";

/// Which flavor of the handler is running.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Mode {
    /// Fetch and count the records; nothing is written anywhere.
    CountOnly,

    /// Fetch, normalize, and upload a Parquet file to the data bucket.
    Persist,
}

/// The integer width of an allow-listed numeric column.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum NumericWidth {
    Int32,
    Int64,
}

impl NumericWidth {
    fn parse(text: &str) -> Option<Self> {
        match text.trim().to_ascii_lowercase().as_str() {
            "" | "int64" | "i64" | "bigint" => Some(NumericWidth::Int64),
            "int32" | "i32" | "int" => Some(NumericWidth::Int32),
            _ => None,
        }
    }

    /// Whether `value` is representable at this width.
    pub fn contains(&self, value: i64) -> bool {
        match self {
            NumericWidth::Int32 => i32::try_from(value).is_ok(),
            NumericWidth::Int64 => true,
        }
    }
}

// The columns that the catalog crawler should see as integers. Everything else
// in the users payload is stored as text.
static DEFAULT_NUMERIC_COLUMNS: Lazy<HashMap<String, NumericWidth>> = Lazy::new(|| {
    [
        ("location.street.number", NumericWidth::Int64),
        ("location.postcode", NumericWidth::Int64),
        ("dob.age", NumericWidth::Int64),
        ("registered.age", NumericWidth::Int64),
    ]
    .iter()
    .map(|t| (t.0.to_owned(), t.1))
    .collect()
});

/// The allow-list of flattened column names that get integer typing.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct NumericColumns {
    widths: HashMap<String, NumericWidth>,
}

impl Default for NumericColumns {
    fn default() -> Self {
        NumericColumns {
            widths: DEFAULT_NUMERIC_COLUMNS.clone(),
        }
    }
}

impl NumericColumns {
    /// Parse a table of the form `dob.age:int64,location.postcode:int32`.
    ///
    /// The width may be omitted, in which case it is `int64`. Empty entries
    /// are skipped, so an empty string yields an empty allow-list.
    pub fn parse(text: &str) -> Result<Self, IngestionError> {
        let mut widths = HashMap::new();

        for entry in text.split(',') {
            let entry = entry.trim();

            if entry.is_empty() {
                continue;
            }

            let (name, width) = match entry.split_once(':') {
                Some((name, width)) => (name.trim(), width),
                None => (entry, ""),
            };

            if name.is_empty() {
                return Err(IngestionError::configuration_missing(format!(
                    "{NUMERIC_COLUMNS_VAR} entry `{entry}` has no column name"
                )));
            }

            let width = NumericWidth::parse(width).ok_or_else(|| {
                IngestionError::configuration_missing(format!(
                    "{NUMERIC_COLUMNS_VAR} entry `{entry}` has an unknown width (expected int32 or int64)"
                ))
            })?;

            widths.insert(name.to_owned(), width);
        }

        Ok(NumericColumns { widths })
    }

    pub fn width(&self, column: &str) -> Option<NumericWidth> {
        self.widths.get(column).copied()
    }

    pub fn len(&self) -> usize {
        self.widths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.widths.is_empty()
    }
}

/// The configuration of one invocation, as raw environment text.
#[derive(Clone, Debug, Default)]
pub struct FetchConfig {
    pub source_url: Option<String>,
    pub timeout_seconds: Option<String>,
    pub destination_container: Option<String>,
    pub numeric_columns: Option<String>,
}

/// A [`FetchConfig`] that has passed validation.
#[derive(Clone, Debug)]
pub struct ValidatedConfig {
    pub source_url: String,
    pub timeout: Duration,

    /// Always `Some` in [`Mode::Persist`].
    pub destination_container: Option<String>,

    pub numeric_columns: NumericColumns,
}

impl FetchConfig {
    pub fn from_env() -> Self {
        FetchConfig {
            source_url: env::var(API_URL_VAR).ok(),
            timeout_seconds: env::var(REQUESTS_TIMEOUT_VAR).ok(),
            destination_container: env::var(BUCKET_NAME_VAR).ok(),
            numeric_columns: env::var(NUMERIC_COLUMNS_VAR).ok(),
        }
    }

    pub fn validate(&self, mode: Mode) -> Result<ValidatedConfig, IngestionError> {
        let source_url = non_empty(&self.source_url).ok_or_else(|| {
            IngestionError::configuration_missing(format!(
                "{API_URL_VAR} environment variable is not configured."
            ))
        })?;

        let timeout_seconds = non_empty(&self.timeout_seconds)
            .and_then(|t| t.parse::<i64>().ok())
            .filter(|t| *t > 0)
            .ok_or_else(|| {
                IngestionError::configuration_missing(format!(
                    "{REQUESTS_TIMEOUT_VAR} environment variable is not configured \
                     as a positive number of seconds."
                ))
            })?;

        let destination_container = match mode {
            Mode::CountOnly => None,
            Mode::Persist => Some(non_empty(&self.destination_container).ok_or_else(|| {
                IngestionError::configuration_missing(format!(
                    "{BUCKET_NAME_VAR} environment variable is not configured."
                ))
            })?),
        };

        let numeric_columns = match &self.numeric_columns {
            Some(text) => NumericColumns::parse(text)?,
            None => NumericColumns::default(),
        };

        Ok(ValidatedConfig {
            source_url: source_url.to_owned(),
            timeout: Duration::from_secs(timeout_seconds as u64),
            destination_container: destination_container.map(|s| s.to_owned()),
            numeric_columns,
        })
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn complete() -> FetchConfig {
        FetchConfig {
            source_url: Some("https://randomuser.me/api/?results=10".to_owned()),
            timeout_seconds: Some("10".to_owned()),
            destination_container: Some("mps-data-lake".to_owned()),
            numeric_columns: None,
        }
    }

    fn missing(cfg: FetchConfig, mode: Mode) -> String {
        let err = cfg.validate(mode).unwrap_err();
        assert_eq!(err.kind, ErrorKind::ConfigurationMissing);
        err.message
    }

    #[test]
    fn complete_config_validates() {
        let v = complete().validate(Mode::Persist).unwrap();
        assert_eq!(v.source_url, "https://randomuser.me/api/?results=10");
        assert_eq!(v.timeout, Duration::from_secs(10));
        assert_eq!(v.destination_container.as_deref(), Some("mps-data-lake"));
        assert_eq!(v.numeric_columns, NumericColumns::default());
    }

    #[test]
    fn each_missing_field_is_named() {
        let mut cfg = complete();
        cfg.source_url = None;
        assert!(missing(cfg, Mode::Persist).contains(API_URL_VAR));

        let mut cfg = complete();
        cfg.source_url = Some("   ".to_owned());
        assert!(missing(cfg, Mode::CountOnly).contains(API_URL_VAR));

        let mut cfg = complete();
        cfg.timeout_seconds = None;
        assert!(missing(cfg, Mode::Persist).contains(REQUESTS_TIMEOUT_VAR));

        let mut cfg = complete();
        cfg.destination_container = Some(String::new());
        assert!(missing(cfg, Mode::Persist).contains(BUCKET_NAME_VAR));
    }

    #[test]
    fn timeout_must_be_a_positive_integer() {
        for bad in ["0", "-5", "ten", "1.5"] {
            let mut cfg = complete();
            cfg.timeout_seconds = Some(bad.to_owned());
            assert!(missing(cfg, Mode::CountOnly).contains(REQUESTS_TIMEOUT_VAR), "{bad}");
        }
    }

    #[test]
    fn count_only_does_not_need_a_bucket() {
        let mut cfg = complete();
        cfg.destination_container = None;
        let v = cfg.validate(Mode::CountOnly).unwrap();
        assert_eq!(v.destination_container, None);
    }

    #[test]
    fn default_allow_list() {
        let cols = NumericColumns::default();
        assert_eq!(cols.len(), 4);
        assert_eq!(cols.width("dob.age"), Some(NumericWidth::Int64));
        assert_eq!(cols.width("location.street.number"), Some(NumericWidth::Int64));
        assert_eq!(cols.width("email"), None);
    }

    #[test]
    fn parse_allow_list() {
        let cols = NumericColumns::parse("dob.age:int32, location.postcode ,registered.age:I64,").unwrap();
        assert_eq!(cols.len(), 3);
        assert_eq!(cols.width("dob.age"), Some(NumericWidth::Int32));
        assert_eq!(cols.width("location.postcode"), Some(NumericWidth::Int64));
        assert_eq!(cols.width("registered.age"), Some(NumericWidth::Int64));

        assert!(NumericColumns::parse("").unwrap().is_empty());
    }

    #[test]
    fn malformed_allow_list_is_a_config_error() {
        let mut cfg = complete();
        cfg.numeric_columns = Some("dob.age:float".to_owned());
        assert!(missing(cfg, Mode::Persist).contains(NUMERIC_COLUMNS_VAR));

        let mut cfg = complete();
        cfg.numeric_columns = Some(":int64".to_owned());
        assert!(missing(cfg, Mode::Persist).contains(NUMERIC_COLUMNS_VAR));
    }

    #[test]
    fn width_ranges() {
        assert!(NumericWidth::Int32.contains(i32::MAX as i64));
        assert!(!NumericWidth::Int32.contains(i32::MAX as i64 + 1));
        assert!(NumericWidth::Int64.contains(i64::MIN));
    }
}
