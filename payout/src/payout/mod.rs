pub mod claim;
pub mod executor;
pub mod manager;

pub use claim::{claimable_amount, ClaimCoordinator, ClaimFailure};
pub use executor::{ExecutionSummary, PayoutExecutor, PayoutReport, TransferReport, TransferStatus};
pub use manager::{Collaborators, PayoutRun, RunOutcome};
