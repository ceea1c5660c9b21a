// Postgres storage layer: the durable run/step-run state the
// orchestrator treats as its idempotency anchor.

pub mod error;
pub mod models;
pub mod repositories;
pub mod testing;
pub mod traits;

pub use error::{StorageError, StorageResult};
pub use models::{RunRow, StepRunRow, UpdateRunStatus, UpdateStep};
pub use repositories::Database;
pub use testing::InMemoryRepository;
pub use traits::RunRepository;
