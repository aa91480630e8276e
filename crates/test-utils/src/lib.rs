//! Test utilities shared by the relay crates.
//!
//! The main export is [`MockChain`], an in-memory EVM chain that stands in for both the primary
//! and the secondary chain: it implements [`ChainBackend`](chain_link::ChainBackend) for the
//! links and both contract traits for the engines, and applies the effects of `newEra` and
//! `voteRate` transactions to its state when they are broadcast.

pub mod mock_chain;

pub use mock_chain::{
    MockChain, MockProposal, MockState, SentTx, PORTAL_ADDRESS, STAKE_MANAGER_ADDRESS,
};
