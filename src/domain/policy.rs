use std::num::NonZeroUsize;

/// How many co-owner approvals unlock a withdrawal for execution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ApprovalPolicy {
    /// Every owner except the requester must approve.
    #[default]
    Unanimous,
    /// At least `n` co-owners must approve, capped at the number of
    /// co-owners.
    AtLeast(NonZeroUsize),
}

impl ApprovalPolicy {
    pub fn required_approvals(&self, owner_count: usize) -> usize {
        let co_owners = owner_count.saturating_sub(1);
        match self {
            ApprovalPolicy::Unanimous => co_owners,
            ApprovalPolicy::AtLeast(n) => n.get().min(co_owners),
        }
    }
}

impl core::fmt::Display for ApprovalPolicy {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ApprovalPolicy::Unanimous => f.write_str("unanimous"),
            ApprovalPolicy::AtLeast(n) => write!(f, "{}", n),
        }
    }
}

impl core::str::FromStr for ApprovalPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("unanimous") {
            return Ok(ApprovalPolicy::Unanimous);
        }
        s.parse::<NonZeroUsize>()
            .map(ApprovalPolicy::AtLeast)
            .map_err(|_| format!("Invalid approval policy: {} (expected `unanimous` or a positive integer)", s))
    }
}
