use log::{debug, info, warn};

use crate::{BlockIndexEntry, ChainIndex, Compact, ConsensusParams, EntryId, RetargetError, U256};

/// Compact target the block built on `tip` must carry.
///
/// `tip` is `None` when the candidate is the genesis block. `candidate_time` is the
/// candidate header's timestamp and only matters for the min-difficulty rule.
pub fn next_work_required<C: ChainIndex + ?Sized>(
    chain: &C,
    tip: Option<EntryId>,
    candidate_time: i64,
    params: &ConsensusParams,
) -> Result<Compact, RetargetError> {
    let pow_limit = params.pow_limit_compact();

    let Some(last_id) = tip else {
        return Ok(pow_limit);
    };
    let last = chain.entry(last_id);

    if params.is_fork_activation(last.height()) {
        info!(
            "Fork block difficulty reset at height {}, keeping bits {}",
            last.height(),
            last.bits()
        );
        return Ok(last.bits());
    }

    let interval = params.retarget_interval_at(last.height());
    if interval == 0 {
        return Err(RetargetError::ZeroInterval(last.height()));
    }
    debug!(
        "Retarget interval {} with timespan {} at height {}",
        interval,
        params.target_timespan_at(last.height()),
        last.height()
    );

    if (last.height() + 1) % interval != 0 {
        if params.allow_min_difficulty_blocks && !params.force_retarget {
            // A block more than two spacings late may be mined at minimum difficulty.
            let lateness = candidate_time.saturating_sub(last.time());
            if lateness > params.target_spacing.saturating_mul(2) {
                return Ok(pow_limit);
            }
            return Ok(last_regular_bits(chain, last_id, interval, pow_limit));
        }
        return Ok(last.bits());
    }

    let first_height = first_block_height(last.height(), interval, params)?;
    let first_id = chain.ancestor(last_id, first_height).ok_or(
        RetargetError::MissingAncestor {
            tip_height: last.height(),
            height: first_height,
        },
    )?;

    Ok(calculate_next_work_required(
        last,
        chain.entry(first_id).time(),
        params,
    ))
}

/// Bits of the most recent block that was not mined under the min-difficulty rule.
fn last_regular_bits<C: ChainIndex + ?Sized>(
    chain: &C,
    from: EntryId,
    interval: u64,
    pow_limit: Compact,
) -> Compact {
    let mut entry = chain.entry(from);
    while let Some(prev) = entry.prev() {
        if entry.height() % interval == 0 || entry.bits() != pow_limit {
            break;
        }
        entry = chain.entry(prev);
    }
    entry.bits()
}

/// Height of the block whose timestamp opens the measured window.
fn first_block_height(
    tip_height: u64,
    interval: u64,
    params: &ConsensusParams,
) -> Result<u64, RetargetError> {
    // Past the fork the reset block shifts every window forward by one.
    let shift = u64::from(params.is_past_fork(tip_height));
    (tip_height + shift)
        .checked_sub(interval - 1)
        .ok_or(RetargetError::AncestorBelowGenesis {
            tip_height,
            interval,
        })
}

/// Rescales the target of `last` by the time the window actually took.
pub fn calculate_next_work_required(
    last: &BlockIndexEntry,
    first_block_time: i64,
    params: &ConsensusParams,
) -> Compact {
    if params.no_retargeting && !params.force_retarget {
        return last.bits();
    }

    let mut actual_timespan = last.time().saturating_sub(first_block_time);
    debug!("Actual timespan {} before bounds", actual_timespan);

    let target_timespan = params.target_timespan_at(last.height());
    if actual_timespan < target_timespan / 4 {
        actual_timespan = target_timespan / 4;
    }
    if actual_timespan > target_timespan.saturating_mul(4) {
        actual_timespan = target_timespan.saturating_mul(4);
    }

    let Some(old_target) = last.bits().to_target() else {
        warn!(
            "Previous bits {} at height {} do not decode to a valid target",
            last.bits(),
            last.height()
        );
        return last.bits();
    };

    let pow_limit = params.pow_limit;
    let mut new_target = match old_target.checked_mul(U256::from(actual_timespan as u64)) {
        Some(scaled) => scaled / U256::from(target_timespan as u64),
        None => {
            warn!(
                "Retarget overflowed 256 bits at height {}, using the proof-of-work limit",
                last.height()
            );
            pow_limit
        }
    };

    if new_target > pow_limit {
        new_target = pow_limit;
    }
    if new_target.is_zero() {
        warn!("Retarget at height {} rounded down to zero", last.height());
        new_target = U256::one();
    }

    let new_bits = Compact::from_target(&new_target);

    info!("Retarget at height {}", last.height());
    info!(
        "Target timespan = {}    actual timespan = {}",
        target_timespan, actual_timespan
    );
    info!("Before: {}  {:x}", last.bits(), old_target);
    info!("After:  {}  {:x}", new_bits, new_target);

    new_bits
}
