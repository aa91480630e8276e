//! # `stake-relay-contracts`
//!
//! Typed access to the two staking contracts the relay keeps in sync: the `StakeManager` on the
//! primary chain and the `StakePortalRate` mirror on the secondary chain.
//!
//! The traits in this crate are what the sync engines depend on; the `*Contract` types implement
//! them on top of a [`ChainLink`](chain_link::ChainLink) by ABI-encoding calls and decoding their
//! return data.

#[allow(missing_docs)]
pub mod abi;
pub mod calls;
pub mod errors;
pub mod proposal;
pub mod stake_manager;
pub mod stake_portal_rate;

pub use errors::ContractError;
pub use proposal::{Proposal, ProposalStatus};
pub use stake_manager::{StakeManager, StakeManagerContract};
pub use stake_portal_rate::{StakePortalRate, StakePortalRateContract};
