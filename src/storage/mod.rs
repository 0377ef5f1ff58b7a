pub mod batch;
pub mod disk;
pub mod validation;

pub use batch::{BatchItemError, BatchReport, WorkerPool};
pub use disk::DriveStorage;
pub use validation::{ReconcileReport, ValidationManager};
