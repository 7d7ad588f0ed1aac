use std::sync::Mutex;

use crate::analyzer::summary::SlaSummary;
use crate::error::AppError;
use crate::parser::types::{Ticket, ValidationError};

/// The one dataset currently loaded. Replaced wholesale by each import.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub source: String,
    pub records: Vec<Ticket>,
    pub errors: Vec<ValidationError>,
    pub sla_summary: SlaSummary,
}

#[derive(Debug, Default)]
pub struct AppState {
    pub dataset: Mutex<Option<Dataset>>,
}

pub trait DatasetAccess {
    fn dataset<F, T>(&self, f: F) -> Result<T, AppError>
    where
        F: FnOnce(&Dataset) -> T;

    /// Swap in a new dataset, returning the one it replaces.
    fn replace_dataset(&self, dataset: Dataset) -> Result<Option<Dataset>, AppError>;
}

impl DatasetAccess for AppState {
    fn dataset<F, T>(&self, f: F) -> Result<T, AppError>
    where
        F: FnOnce(&Dataset) -> T,
    {
        let guard = self
            .dataset
            .lock()
            .map_err(|e| AppError::Custom(format!("Mutex poisoned: {}", e)))?;
        let dataset = guard.as_ref().ok_or(AppError::NoDataset)?;
        Ok(f(dataset))
    }

    fn replace_dataset(&self, dataset: Dataset) -> Result<Option<Dataset>, AppError> {
        let mut guard = self
            .dataset
            .lock()
            .map_err(|e| AppError::Custom(format!("Mutex poisoned: {}", e)))?;
        Ok(guard.replace(dataset))
    }
}
