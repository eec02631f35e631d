use crate::error::Result;
use crate::models::ObservationRecord;
use crate::readers::ObservationReader;
use std::path::PathBuf;
use tokio::task::JoinHandle;
use tracing::info;

/// Primary and secondary inputs of one run
#[derive(Debug, Clone, Default)]
pub struct EngineInputs {
    pub primary: Vec<ObservationRecord>,
    pub secondary: Vec<ObservationRecord>,
}

/// Reads the input files of a run on blocking worker threads
pub struct ConcurrentReader {
    use_mmap: bool,
}

impl ConcurrentReader {
    pub fn new() -> Self {
        Self { use_mmap: false }
    }

    pub fn with_mmap(mut self, use_mmap: bool) -> Self {
        self.use_mmap = use_mmap;
        self
    }

    /// Read primary and (optional) secondary files concurrently
    pub async fn read_inputs(
        &self,
        primary: PathBuf,
        secondary: Option<PathBuf>,
    ) -> Result<EngineInputs> {
        let primary_handle = self.spawn_read(Some(primary));
        let secondary_handle = self.spawn_read(secondary);

        let (primary, secondary) = tokio::try_join!(primary_handle, secondary_handle)?;
        let inputs = EngineInputs {
            primary: primary?,
            secondary: secondary?,
        };

        info!(
            primary = inputs.primary.len(),
            secondary = inputs.secondary.len(),
            "inputs loaded"
        );
        Ok(inputs)
    }

    fn spawn_read(&self, path: Option<PathBuf>) -> JoinHandle<Result<Vec<ObservationRecord>>> {
        let use_mmap = self.use_mmap;
        tokio::task::spawn_blocking(move || match path {
            Some(path) => ObservationReader::with_mmap(use_mmap).read(&path),
            None => Ok(Vec::new()),
        })
    }
}

impl Default for ConcurrentReader {
    fn default() -> Self {
        Self::new()
    }
}
