pub mod batch;
pub mod batcher;
pub mod queue;

pub use batch::{Batch, FlushTrigger};
pub use batcher::{BatchConfig, Batcher};
pub use queue::{EventQueue, RequeueOutcome};
