//! On-chain rate proposals.

/// Lifecycle of a rate proposal on the `StakePortalRate` contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProposalStatus {
    /// No vote has been cast yet.
    Inactive,

    /// Voting is in progress.
    Active,

    /// The vote threshold was reached and the rate was applied.
    Executed,

    /// A status value this relay does not know about. Treated as final and never voted on.
    Rejected(u8),
}

impl From<u8> for ProposalStatus {
    fn from(raw: u8) -> Self {
        match raw {
            0 => ProposalStatus::Inactive,
            1 => ProposalStatus::Active,
            2 => ProposalStatus::Executed,
            other => ProposalStatus::Rejected(other),
        }
    }
}

/// A rate proposal as read from the contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Proposal {
    /// Current status.
    pub status: ProposalStatus,

    /// Number of votes in favour so far.
    pub yes_votes: u16,
}

impl Proposal {
    /// Whether the proposal has been executed.
    pub fn is_executed(&self) -> bool {
        self.status == ProposalStatus::Executed
    }
}
