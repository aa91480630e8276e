//! Deterministic rate proposal ids.

use alloy_primitives::{keccak256, B256, U256};

use crate::constants::VOTE_RATE_TAG;

/// Derives the id every relay uses when voting `rate` for `era`.
///
/// Independent relays observing the same era and rate must arrive at the same id so that their
/// votes accumulate on one proposal.
pub fn proposal_id(era: u32, rate: U256, factor: u64) -> B256 {
    keccak256(format!("era-{era}-{VOTE_RATE_TAG}-{rate}-{factor}"))
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn id_hashes_the_decimal_rendering() {
        let id = proposal_id(5, U256::from(1_050_000u64), 0);
        assert_eq!(id, keccak256("era-5-voteRate-1050000-0"));
    }

    proptest! {
        #[test]
        fn id_is_a_pure_function(era: u32, rate: u128, factor in 0u64..4) {
            let rate = U256::from(rate);
            prop_assert_eq!(proposal_id(era, rate, factor), proposal_id(era, rate, factor));
        }

        #[test]
        fn different_eras_give_different_ids(era in 0u32..u32::MAX, rate: u64) {
            let rate = U256::from(rate);
            prop_assert_ne!(proposal_id(era, rate, 0), proposal_id(era + 1, rate, 0));
        }
    }
}
