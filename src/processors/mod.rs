pub mod aggregate_estimator;
pub mod derived_fields;
pub mod integrity_checker;
pub mod parallel_processor;
pub mod range_validator;
pub mod record_assembler;
pub mod source_reconciler;
pub mod time_axis;

pub use aggregate_estimator::AggregateEstimator;
pub use integrity_checker::{FieldViolation, IntegrityChecker, IntegrityReport, ViolationType};
pub use parallel_processor::{BucketFailure, ParallelProcessor, ReconciliationReport};
pub use range_validator::{is_valid_reading, RangeValidator};
pub use record_assembler::{FlatRecord, RecordAssembler};
pub use source_reconciler::{BucketState, SecondaryMaterial, SourceReconciler};
pub use time_axis::{parse_date, parse_timezone, TimeAxis};
