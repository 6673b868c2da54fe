//! Scheduler layer
//!
//! Sequences the pipeline stages and owns the waiting: bounded status
//! polling, transient retries and cancellation.

pub mod cancel;
pub mod pipeline;
pub mod poller;

pub use cancel::CancelToken;
pub use pipeline::PipelineOrchestrator;
pub use poller::{PollCeiling, PollError, PollOutcome, PollPolicy, StatusPoller, TerminalStates};
