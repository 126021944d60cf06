//! Domain model for the paid-task lifecycle.
//!
//! The task domain models escrow-backed task creation, developer
//! application and assignment, workspace provisioning, review verdicts, and
//! the on-chain audit trail, while keeping all infrastructure concerns
//! outside of the domain boundary.

mod developer;
mod error;
mod ids;
mod money;
mod task;
mod transaction;
mod workspace;

pub use developer::{
    ApplicationMessage, DeveloperAssignment, ReviewVerdict, application_max_age,
};
pub use error::{
    ParseTaskStatusError, ParseTransactionKindError, TaskDomainError,
};
pub use ids::{ClientId, GithubLogin, RepositoryName, TaskId, TxHash, WalletAddress};
pub use money::{PLATFORM_FEE_PERCENT, WEI_PER_ETHER, WeiAmount};
pub use task::{PersistedTaskData, Task, TaskDraft, TaskStatus};
pub use transaction::{TransactionKind, TransactionOutcome, TransactionRecord};
pub use workspace::Workspace;
