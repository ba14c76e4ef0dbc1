pub mod git;
pub mod quota;
pub mod session;

pub use git::WorkingTreeStatus;
pub use quota::{Overage, QuotaReport, SpendReport, UsageQuota, WindowUsage};
pub use session::{HookJson, SessionSnapshot};
