/// Branch and change counts from a single `git status` scan.
///
/// A path is counted as untracked or as staged/modified, never both.
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct WorkingTreeStatus {
    pub branch: String,
    pub staged_count: usize,
    pub modified_count: usize,
    pub untracked_count: usize,
    /// Browsable https form of `remote.origin.url`, when derivable.
    pub remote_url: Option<String>,
}
