pub mod attribution;
pub mod bucket;
pub mod measurement;
pub mod observation;
pub mod reconciled;
pub mod units;
pub mod variable;

pub use attribution::{Attribution, SourceTags};
pub use bucket::{Bucket, BucketKey};
pub use measurement::{
    Evapotranspiration, HumidityFlag, Measurement, NetRadiation, Precipitation, RelativeHumidity,
    Temperature, WindSpeed,
};
pub use observation::ObservationRecord;
pub use reconciled::{BucketIdentity, ReconciledField, ReconciledRecord, ReconciledRecordBuilder};
pub use units::{Dimension, Unit};
pub use variable::{
    Category, DailyAggregation, DerivedFrom, Granularity, SensorKind, VariableDefinition,
    VariableRegistry,
};
