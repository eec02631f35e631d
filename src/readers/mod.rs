pub mod concurrent_reader;
pub mod observation_reader;
pub mod schema_reader;

pub use concurrent_reader::{ConcurrentReader, EngineInputs};
pub use observation_reader::ObservationReader;
pub use schema_reader::SchemaReader;
