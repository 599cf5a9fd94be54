pub mod driver;
pub mod scheduler;
pub mod state;

pub use driver::{BuildDriver, BuildOutcome};
pub use scheduler::{BatchRunner, BatchScheduler, Summary};
pub use state::{BuildState, InProgressGuard};
