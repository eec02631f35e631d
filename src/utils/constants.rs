/// Out-of-band raw value marking a reading the logger flagged as bad
pub const SENTINEL: f64 = -9999.0;

/// Suffix of the attribution column paired with every tracked variable
pub const SOURCE_SUFFIX: &str = "_src";

/// Number of hourly records a daily estimate requires
pub const HOURS_PER_DAY: usize = 24;

/// Identifying column names
pub const COL_DATE: &str = "date";
pub const COL_HOUR: &str = "hour";
pub const COL_TIME: &str = "time";
pub const COL_YEAR: &str = "year";
pub const COL_DAY_OF_YEAR: &str = "julday";
pub const COL_REPORT_TIME: &str = "report_time";

/// Fixed attribution labels
pub const TAG_EMPTY: &str = "EMPTY";
pub const TAG_OOR: &str = "OOR";
pub const TAG_RELH_CAP: &str = "RELH_CAP";

/// Configurable attribution label defaults
pub const DEFAULT_PRIMARY_TAG: &str = "primary";
pub const DEFAULT_SECONDARY_TAG: &str = "secondary";
pub const DEFAULT_ESTIMATE_TAG: &str = "estimate";
pub const DEFAULT_REANALYSIS_TAG: &str = "EMPTYQC";
pub const DEFAULT_REANALYSIS_ORIGIN: &str = "reanalysis";

/// Civil timezone of the station network
pub const DEFAULT_TIMEZONE: &str = "America/Los_Angeles";

/// Relative humidity capping thresholds (%)
pub const RELH_MAX: f64 = 100.0;
pub const RELH_CAP_LIMIT: f64 = 105.0;

/// General temperature range when no timestamp is available (°C)
pub const TEMP_GENERAL_MIN: f64 = -40.0;
pub const TEMP_GENERAL_MAX: f64 = 46.0;

/// Processing defaults
pub const DEFAULT_CHUNK_SIZE: usize = 1000;
pub const DEFAULT_ROW_GROUP_SIZE: usize = 10000;
pub const DEFAULT_BUFFER_SIZE: usize = 8192 * 16; // 128KB

/// Parquet compression options
pub const COMPRESSION_SNAPPY: &str = "snappy";
pub const COMPRESSION_GZIP: &str = "gzip";
pub const COMPRESSION_LZ4: &str = "lz4";
pub const COMPRESSION_ZSTD: &str = "zstd";
pub const COMPRESSION_NONE: &str = "none";
