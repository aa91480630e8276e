//! Solidity interfaces of the staking contracts.

use alloy_sol_types::sol;

sol! {
    interface IStakeManager {
        function currentEra() external view returns (uint256);
        function latestEra() external view returns (uint256);
        function getRate() external view returns (uint256);
        function getBondedPools() external view returns (address[] memory);
        function newEra() external;
    }

    interface IStakePortalRate {
        function getRate() external view returns (uint256);
        function proposals(bytes32 proposalId)
            external
            view
            returns (uint8 status, uint16 yesVotes, uint8 yesVotesTotal);
        function hasVoted(bytes32 proposalId, address voter) external view returns (bool);
        function voteRate(bytes32 proposalId, uint256 rate) external;
    }
}
