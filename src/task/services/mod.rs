//! Application services for task lifecycle orchestration.
//!
//! Each lifecycle operation is its own orchestrator driving an explicit
//! step union across the store, the escrow contract, and the repository
//! forge. The shared flow machinery lives in [`flow`].

mod apply;
mod cancel;
mod completion;
mod create;
mod flow;
mod overdue;
mod review;

pub use apply::{ApplyEvent, ApplyOutcome, ApplyRequest, ApplyService, ApplyStep};
pub use cancel::{CancelEvent, CancelOutcome, CancelStep, CancelTaskService};
pub use completion::{
    ApproveEvent, ApproveOutcome, ApproveStep, CompletionService, GithubReport,
    ReviewUpdateStep, SubActionResult,
};
pub use create::{
    CreateTaskEvent, CreateTaskOutcome, CreateTaskRequest, CreateTaskService, CreateTaskStep,
};
pub use flow::{DiscardSteps, FailureKind, FlowError, RecordingSink, StepSink};
pub use overdue::{OverdueSweepService, SweepReport};
pub use review::{
    AcceptEvent, AcceptOutcome, AcceptStep, DeveloperReviewService, RejectEvent, RejectStep,
};
