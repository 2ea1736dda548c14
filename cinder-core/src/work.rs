use crate::{BlockIndexEntry, Compact, ConsensusParams, U256};

/// Expected number of hashes needed to find a block at `bits`, i.e. `2^256 / (target + 1)`.
/// Invalid encodings carry no work.
pub fn block_proof(bits: Compact) -> U256 {
    let Some(target) = bits.to_target() else {
        return U256::zero();
    };
    // 2^256 does not fit, but 2^256 / (t + 1) == (2^256 - t - 1) / (t + 1) + 1 == !t / (t + 1) + 1.
    // A decoded target is a 23-bit mantissa shifted left by whole bytes, so its lowest bit
    // is clear whenever it is wider than 23 bits and `target + 1` cannot overflow.
    (!target / (target + U256::one())) + U256::one()
}

/// How long, at the current difficulty of `tip`, the network would need to produce
/// the work separating `from` and `to`. Negative when `to` has less work.
/// Saturates at `i64::MAX` in either direction.
pub fn equivalent_time(
    to: &BlockIndexEntry,
    from: &BlockIndexEntry,
    tip: &BlockIndexEntry,
    params: &ConsensusParams,
) -> i64 {
    let (delta, sign) = if to.chain_work() > from.chain_work() {
        (*to.chain_work() - *from.chain_work(), 1)
    } else {
        (*from.chain_work() - *to.chain_work(), -1)
    };

    let tip_proof = block_proof(tip.bits());
    let scaled = delta.checked_mul(U256::from(params.target_spacing as u64));
    let r = match scaled {
        Some(scaled) if !tip_proof.is_zero() => scaled / tip_proof,
        _ => return sign * i64::MAX,
    };

    if r.bits() > 63 {
        return sign * i64::MAX;
    }
    sign * r.low_u64() as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BlockHash, BlockTree, ChainIndex, Network};
    use rand::Rng;

    #[test]
    fn test_block_proof_values() {
        // Mainnet genesis difficulty: 2^256 / (0xffff * 2^208 + 1).
        assert_eq!(
            block_proof(Compact(0x1d00ffff)),
            U256::from(0x0001_0001_0001u64)
        );
        // 0x7fffff * 2^232 + 1 divides 2^256 just twice.
        assert_eq!(block_proof(Compact(0x207fffff)), U256::from(2u64));
        assert_eq!(block_proof(Compact(0x01010000)), U256::one() << 255);
        // Targets near the top of the range still leave room for the `+ 1`.
        assert_eq!(block_proof(Compact(0x2100ffff)), U256::one());
        assert_eq!(block_proof(Compact(0x20400000)), U256::from(3u64));
    }

    #[test]
    fn test_block_proof_of_invalid_bits_is_zero() {
        assert!(block_proof(Compact(0x04923456)).is_zero());
        assert!(block_proof(Compact(0xff123456)).is_zero());
        assert!(block_proof(Compact(0x00000000)).is_zero());
    }

    #[test]
    fn test_block_proof_decreases_as_target_grows() {
        let limit = crate::MAIN_POW_LIMIT;
        let mut previous: Option<U256> = None;
        for shift in (8..224).step_by(7) {
            let target = Compact::from_target(&((U256::one() << shift) | U256::from(0xabu64)));
            if target.decode().value > limit {
                break;
            }
            let proof = block_proof(target);
            if let Some(previous) = previous {
                assert!(proof < previous, "work did not drop at shift {}", shift);
            }
            previous = Some(proof);
        }

        let easy = block_proof(Compact(0x1d00ffff));
        let harder = block_proof(Compact(0x1d00fffe));
        assert!(harder > easy);
    }

    fn build_equal_work_chain(len: u64, params: &ConsensusParams) -> BlockTree {
        let mut tree = BlockTree::new();
        let mut prev = None;
        for i in 0..len {
            let id = tree
                .insert(
                    prev,
                    BlockHash(U256::from(i + 1)),
                    1_269_211_443 + i as i64 * params.target_spacing,
                    Compact(0x207fffff),
                )
                .unwrap();
            prev = Some(id);
        }
        tree
    }

    #[test]
    fn test_equivalent_time_matches_time_difference() {
        let params = ConsensusParams::for_network(Network::Main);
        let tree = build_equal_work_chain(10_000, &params);
        let mut rng = rand::thread_rng();

        for _ in 0..1000 {
            let p1 = tree.at_height(rng.gen_range(0..10_000)).unwrap();
            let p2 = tree.at_height(rng.gen_range(0..10_000)).unwrap();
            let p3 = tree.at_height(rng.gen_range(0..10_000)).unwrap();
            let (p1, p2, p3) = (tree.entry(p1), tree.entry(p2), tree.entry(p3));

            let tdiff = equivalent_time(p1, p2, p3, &params);
            assert_eq!(tdiff, p1.time() - p2.time());
        }
    }

    #[test]
    fn test_equivalent_time_saturates() {
        let params = ConsensusParams::for_network(Network::Main);
        let mut tree = BlockTree::new();
        let genesis = tree
            .insert(None, BlockHash(U256::from(1u64)), 0, Compact(0x207fffff))
            .unwrap();
        // 0x03000001 is a target of 1: each such block carries 2^255 work.
        let heavy = tree
            .insert(Some(genesis), BlockHash(U256::from(2u64)), 600, Compact(0x03000001))
            .unwrap();

        let (genesis, heavy) = (tree.entry(genesis), tree.entry(heavy));
        assert_eq!(equivalent_time(heavy, genesis, genesis, &params), i64::MAX);
        assert_eq!(equivalent_time(genesis, heavy, genesis, &params), -i64::MAX);
        assert_eq!(equivalent_time(heavy, heavy, genesis, &params), 0);
    }
}
