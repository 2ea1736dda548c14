pub mod chain;
pub mod compact;
pub mod error;
pub mod hash;
pub mod header;
pub mod params;
pub mod pow;
pub mod retarget;
pub mod utils;
pub mod work;

use serde::{Deserialize, Serialize};
use uint::construct_uint;

construct_uint! {
   #[derive(Serialize, Deserialize)]
   pub struct U256(4);
}

pub use chain::{BlockIndexEntry, BlockTree, ChainIndex, EntryId};
pub use compact::{Compact, DecodedTarget};
pub use error::{ChainError, ParamsError, PowError, RetargetError};
pub use hash::BlockHash;
pub use header::{HeaderChain, HeaderInfo};
pub use params::{ConsensusParams, ForkParams, Network, TimespanStep};
pub use pow::check_proof_of_work;
pub use retarget::{calculate_next_work_required, next_work_required};
pub use work::{block_proof, equivalent_time};

// 00000000ffffffffffffffffffffffffffffffffffffffffffffffffffffffff
pub const MAIN_POW_LIMIT: U256 = U256([
    0xFFFF_FFFF_FFFF_FFFF, // word0
    0xFFFF_FFFF_FFFF_FFFF, // word1
    0xFFFF_FFFF_FFFF_FFFF, // word2
    0x0000_0000_FFFF_FFFF, // word3
]);

// 7fffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffff
pub const REGTEST_POW_LIMIT: U256 = U256([
    0xFFFF_FFFF_FFFF_FFFF,
    0xFFFF_FFFF_FFFF_FFFF,
    0xFFFF_FFFF_FFFF_FFFF,
    0x7FFF_FFFF_FFFF_FFFF,
]);

pub const MAIN_TARGET_SPACING: i64 = 10 * 60; // 10 minutes in seconds
pub const MAIN_TARGET_TIMESPAN: i64 = 14 * 24 * 60 * 60; // two weeks in seconds
