use log::debug;
use rayon::prelude::*;

use crate::{BlockHash, Compact, ConsensusParams, HeaderInfo, PowError, U256};

/// Decodes `bits` and checks it lies in `(0, pow_limit]`.
pub fn check_target_range(bits: Compact, params: &ConsensusParams) -> Result<U256, PowError> {
    let decoded = bits.decode();

    if decoded.negative {
        return Err(PowError::NegativeTarget(bits));
    }
    if decoded.overflow {
        return Err(PowError::TargetOverflow(bits));
    }
    if decoded.value.is_zero() {
        return Err(PowError::ZeroTarget(bits));
    }
    if decoded.value > params.pow_limit {
        return Err(PowError::TargetAboveLimit(bits));
    }

    Ok(decoded.value)
}

/// Checks that `hash` satisfies the target encoded in `bits`.
pub fn check_proof_of_work(
    hash: &BlockHash,
    bits: Compact,
    params: &ConsensusParams,
) -> Result<(), PowError> {
    let result = check_target_range(bits, params).and_then(|target| {
        if hash.meets_target(&target) {
            Ok(())
        } else {
            Err(PowError::HashAboveTarget { hash: *hash, bits })
        }
    });

    if let Err(e) = &result {
        debug!("Proof-of-work rejected: {}", e);
    }
    result
}

/// Stateless proof-of-work check of every header against its own bits, in parallel.
/// Results are in the same order as `headers`.
pub fn check_headers_pow(
    headers: &[HeaderInfo],
    params: &ConsensusParams,
) -> Vec<Result<(), PowError>> {
    headers
        .par_iter()
        .map(|header| check_proof_of_work(&header.hash, header.bits, params))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Network;

    fn main_params() -> ConsensusParams {
        ConsensusParams::for_network(Network::Main)
    }

    fn genesis_hash() -> BlockHash {
        "000000000019d6689c085ae165831e934ff763ae46a2a6c172b3f1b60a8ce26f"
            .parse()
            .unwrap()
    }

    #[test]
    fn test_accepts_mainnet_genesis() {
        assert_eq!(
            check_proof_of_work(&genesis_hash(), Compact(0x1d00ffff), &main_params()),
            Ok(())
        );
    }

    #[test]
    fn test_hash_equal_to_target_is_accepted() {
        let params = main_params();
        let target = Compact(0x1c05a3f4).decode().value;
        assert!(check_proof_of_work(&BlockHash(target), Compact(0x1c05a3f4), &params).is_ok());

        let above = BlockHash(target + U256::one());
        assert_eq!(
            check_proof_of_work(&above, Compact(0x1c05a3f4), &params),
            Err(PowError::HashAboveTarget {
                hash: above,
                bits: Compact(0x1c05a3f4)
            })
        );
    }

    #[test]
    fn test_rejects_out_of_range_targets() {
        let params = main_params();
        let hash = BlockHash::zero();

        assert_eq!(
            check_proof_of_work(&hash, Compact(0x04923456), &params),
            Err(PowError::NegativeTarget(Compact(0x04923456)))
        );
        assert_eq!(
            check_proof_of_work(&hash, Compact(0xff123456), &params),
            Err(PowError::TargetOverflow(Compact(0xff123456)))
        );
        assert_eq!(
            check_proof_of_work(&hash, Compact(0x1d000000), &params),
            Err(PowError::ZeroTarget(Compact(0x1d000000)))
        );
        // Regtest's limit is far above mainnet's.
        assert_eq!(
            check_proof_of_work(&hash, Compact(0x207fffff), &params),
            Err(PowError::TargetAboveLimit(Compact(0x207fffff)))
        );
        assert_eq!(
            check_proof_of_work(&hash, Compact(0x1d010000), &params),
            Err(PowError::TargetAboveLimit(Compact(0x1d010000)))
        );

        let regtest = ConsensusParams::for_network(Network::Regtest);
        assert!(check_proof_of_work(&hash, Compact(0x207fffff), &regtest).is_ok());
    }

    #[test]
    fn test_verification_is_idempotent() {
        let params = main_params();
        let hash = genesis_hash();
        for bits in [Compact(0x1d00ffff), Compact(0x1b0404cb), Compact(0x00000000)] {
            let first = check_proof_of_work(&hash, bits, &params);
            let second = check_proof_of_work(&hash, bits, &params);
            assert_eq!(first, second);
        }
    }

    #[test]
    fn test_parallel_check_keeps_order() {
        let params = main_params();
        let good = HeaderInfo::new(genesis_hash(), BlockHash::zero(), 0, Compact(0x1d00ffff));
        let bad = HeaderInfo::new(genesis_hash(), BlockHash::zero(), 0, Compact(0x1b0404cb));

        let headers: Vec<HeaderInfo> = (0..64)
            .map(|i| if i % 3 == 0 { bad.clone() } else { good.clone() })
            .collect();
        let results = check_headers_pow(&headers, &params);

        assert_eq!(results.len(), 64);
        for (i, result) in results.iter().enumerate() {
            assert_eq!(result.is_err(), i % 3 == 0, "header {}", i);
        }
    }
}
