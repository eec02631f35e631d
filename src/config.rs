use crate::error::{ProcessingError, Result};
use crate::models::{Granularity, SourceTags};
use crate::processors::time_axis::parse_timezone;
use crate::utils::constants::{
    COMPRESSION_GZIP, COMPRESSION_LZ4, COMPRESSION_NONE, COMPRESSION_SNAPPY, COMPRESSION_ZSTD,
    DEFAULT_ESTIMATE_TAG, DEFAULT_PRIMARY_TAG, DEFAULT_REANALYSIS_ORIGIN, DEFAULT_REANALYSIS_TAG,
    DEFAULT_ROW_GROUP_SIZE, DEFAULT_SECONDARY_TAG, DEFAULT_TIMEZONE, TAG_EMPTY, TAG_OOR,
    TAG_RELH_CAP,
};
use chrono_tz::Tz;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;
use validator::Validate;

/// Environment variable prefix, e.g. `STATION_QC_TIMEZONE`
pub const ENV_PREFIX: &str = "STATION_QC";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct EngineConfig {
    #[validate(length(min = 1))]
    pub timezone: String,

    #[validate(length(min = 1))]
    pub granularity: String,

    #[validate(length(min = 1, max = 64))]
    pub primary_tag: String,

    #[validate(length(min = 1, max = 64))]
    pub secondary_tag: String,

    #[validate(length(min = 1, max = 64))]
    pub estimate_tag: String,

    #[validate(length(min = 1, max = 64))]
    pub reanalysis_tag: String,

    pub reanalysis_origins: Vec<String>,

    #[validate(range(min = 1, max = 1024))]
    pub max_workers: usize,

    pub compression: String,

    #[validate(range(min = 1, max = 10_000_000))]
    pub row_group_size: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            timezone: DEFAULT_TIMEZONE.to_string(),
            granularity: Granularity::Hourly.as_str().to_string(),
            primary_tag: DEFAULT_PRIMARY_TAG.to_string(),
            secondary_tag: DEFAULT_SECONDARY_TAG.to_string(),
            estimate_tag: DEFAULT_ESTIMATE_TAG.to_string(),
            reanalysis_tag: DEFAULT_REANALYSIS_TAG.to_string(),
            reanalysis_origins: vec![DEFAULT_REANALYSIS_ORIGIN.to_string()],
            max_workers: num_cpus::get(),
            compression: COMPRESSION_SNAPPY.to_string(),
            row_group_size: DEFAULT_ROW_GROUP_SIZE,
        }
    }
}

impl EngineConfig {
    /// Defaults, then `path` if given, then `STATION_QC_*` variables
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder().add_source(Config::try_from(&Self::default())?);

        if let Some(path) = path {
            if !path.exists() {
                return Err(ProcessingError::Config(format!(
                    "configuration file not found: {}",
                    path.display()
                )));
            }
            builder = builder.add_source(File::from(path).required(true));
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("reanalysis_origins"),
        );

        let config: EngineConfig = builder.build()?.try_deserialize()?;
        config.check()?;
        debug!(?config, "loaded configuration");
        Ok(config)
    }

    /// Field validation plus the checks that need parsing
    pub fn check(&self) -> Result<()> {
        self.validate()?;
        self.tz()?;
        self.granularity()?;

        let compression = self.compression.to_lowercase();
        let known = [
            COMPRESSION_SNAPPY,
            COMPRESSION_GZIP,
            COMPRESSION_LZ4,
            COMPRESSION_ZSTD,
            COMPRESSION_NONE,
        ];
        if !known.contains(&compression.as_str()) {
            return Err(ProcessingError::Config(format!(
                "unknown compression '{}'",
                self.compression
            )));
        }

        let tags = [
            &self.primary_tag,
            &self.secondary_tag,
            &self.estimate_tag,
            &self.reanalysis_tag,
        ];
        for (i, tag) in tags.iter().enumerate() {
            if [TAG_EMPTY, TAG_OOR, TAG_RELH_CAP].contains(&tag.as_str()) {
                return Err(ProcessingError::Config(format!(
                    "attribution label '{}' is reserved",
                    tag
                )));
            }
            if tags[i + 1..].contains(tag) {
                return Err(ProcessingError::Config(format!(
                    "attribution label '{}' is used twice",
                    tag
                )));
            }
        }

        Ok(())
    }

    pub fn tz(&self) -> Result<Tz> {
        parse_timezone(&self.timezone)
    }

    pub fn granularity(&self) -> Result<Granularity> {
        Granularity::parse(&self.granularity)
    }

    pub fn source_tags(&self) -> SourceTags {
        SourceTags {
            primary: self.primary_tag.clone(),
            secondary: self.secondary_tag.clone(),
            estimate: self.estimate_tag.clone(),
            reanalysis_estimate: self.reanalysis_tag.clone(),
            reanalysis_origins: self.reanalysis_origins.clone(),
        }
    }
}
