use std::collections::HashMap;

use log::{debug, info};

use crate::{
    pow::check_proof_of_work, retarget::next_work_required, work::block_proof, BlockHash,
    ChainError, Compact, ConsensusParams, HeaderInfo, U256,
};

/// Index of an entry inside the [`BlockTree`] that created it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryId(usize);

impl EntryId {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// One accepted block. Never changes once inserted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockIndexEntry {
    hash: BlockHash,
    prev: Option<EntryId>,
    height: u64,
    time: i64,
    bits: Compact,
    chain_work: U256,
}

impl BlockIndexEntry {
    pub fn new(
        hash: BlockHash,
        prev: Option<EntryId>,
        height: u64,
        time: i64,
        bits: Compact,
        chain_work: U256,
    ) -> Self {
        BlockIndexEntry {
            hash,
            prev,
            height,
            time,
            bits,
            chain_work,
        }
    }

    pub fn hash(&self) -> &BlockHash {
        &self.hash
    }

    pub fn prev(&self) -> Option<EntryId> {
        self.prev
    }

    pub fn height(&self) -> u64 {
        self.height
    }

    pub fn time(&self) -> i64 {
        self.time
    }

    pub fn bits(&self) -> Compact {
        self.bits
    }

    /// Total work from genesis up to and including this block.
    pub fn chain_work(&self) -> &U256 {
        &self.chain_work
    }
}

/// Read access to linked block entries. This is all the retarget scheduler needs.
pub trait ChainIndex {
    /// Panics if `id` was not handed out by this index.
    fn entry(&self, id: EntryId) -> &BlockIndexEntry;

    /// The ancestor of `id` at `height`, or `id` itself at its own height.
    fn ancestor(&self, id: EntryId, height: u64) -> Option<EntryId>;
}

/// Append-only arena of block entries with an active (most work) chain.
#[derive(Clone, Debug, Default)]
pub struct BlockTree {
    entries: Vec<BlockIndexEntry>,
    by_hash: HashMap<BlockHash, EntryId>,
    active: Vec<EntryId>,
}

impl BlockTree {
    pub fn new() -> Self {
        BlockTree::default()
    }

    /// Connects `headers` in order, checking difficulty and proof-of-work for each.
    pub fn from_headers(
        headers: &[HeaderInfo],
        params: &ConsensusParams,
    ) -> Result<Self, ChainError> {
        let mut tree = BlockTree::new();
        for header in headers {
            tree.connect_header(header, params)?;
        }
        Ok(tree)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: EntryId) -> Option<&BlockIndexEntry> {
        self.entries.get(id.0)
    }

    pub fn find(&self, hash: &BlockHash) -> Option<EntryId> {
        self.by_hash.get(hash).copied()
    }

    /// Tip of the chain with the most work.
    pub fn tip(&self) -> Option<EntryId> {
        self.active.last().copied()
    }

    /// Entry at `height` on the active chain.
    pub fn at_height(&self, height: u64) -> Option<EntryId> {
        usize::try_from(height)
            .ok()
            .and_then(|h| self.active.get(h))
            .copied()
    }

    pub fn is_active(&self, id: EntryId) -> bool {
        let height = self.entries[id.0].height;
        self.at_height(height) == Some(id)
    }

    /// Links a new entry under `prev` without any consensus checks. The entry is fully
    /// built before it becomes reachable.
    pub fn insert(
        &mut self,
        prev: Option<EntryId>,
        hash: BlockHash,
        time: i64,
        bits: Compact,
    ) -> Result<EntryId, ChainError> {
        if self.by_hash.contains_key(&hash) {
            return Err(ChainError::DuplicateBlock(hash));
        }

        let (height, parent_work) = match prev {
            Some(prev_id) => {
                let parent = self
                    .get(prev_id)
                    .ok_or(ChainError::UnknownEntry(prev_id))?;
                (parent.height + 1, parent.chain_work)
            }
            None if !self.entries.is_empty() => return Err(ChainError::GenesisAlreadySet),
            None => (0, U256::zero()),
        };

        let chain_work = parent_work.saturating_add(block_proof(bits));
        let entry = BlockIndexEntry::new(hash, prev, height, time, bits, chain_work);

        let id = EntryId(self.entries.len());
        self.entries.push(entry);
        self.by_hash.insert(hash, id);

        let has_more_work = match self.tip() {
            Some(tip) => self.entries[id.0].chain_work > self.entries[tip.0].chain_work,
            None => true,
        };
        if has_more_work {
            self.set_active_tip(id);
        }

        Ok(id)
    }

    /// Accepts a candidate header: its parent must be known, its bits must equal the
    /// scheduled target and its hash must satisfy them.
    pub fn connect_header(
        &mut self,
        header: &HeaderInfo,
        params: &ConsensusParams,
    ) -> Result<EntryId, ChainError> {
        if self.by_hash.contains_key(&header.hash) {
            return Err(ChainError::DuplicateBlock(header.hash));
        }

        let prev = if header.is_genesis() {
            None
        } else {
            Some(
                self.find(&header.prev_hash)
                    .ok_or(ChainError::UnknownParent(header.prev_hash))?,
            )
        };

        let expected = next_work_required(&*self, prev, header.time, params)?;
        if header.bits != expected {
            return Err(ChainError::BadDifficulty {
                hash: header.hash,
                expected,
                found: header.bits,
            });
        }

        check_proof_of_work(&header.hash, header.bits, params)?;

        let id = self.insert(prev, header.hash, header.time, header.bits)?;
        debug!(
            "Connected block {} at height {} with bits {}",
            header.hash, self.entries[id.0].height, header.bits
        );
        Ok(id)
    }

    fn set_active_tip(&mut self, tip: EntryId) {
        let old_tip = self.tip();
        let height = self.entries[tip.0].height as usize;
        self.active.truncate(height + 1);
        self.active.resize(height + 1, tip);

        // Rewrite heights until the new branch meets the old active chain.
        let mut cursor = Some(tip);
        while let Some(id) = cursor {
            let entry = &self.entries[id.0];
            let h = entry.height as usize;
            if self.active[h] == id && id != tip {
                break;
            }
            self.active[h] = id;
            cursor = entry.prev;
        }

        if let Some(old_tip) = old_tip {
            if self.entries[tip.0].prev != Some(old_tip) {
                info!(
                    "Active chain switched from {} to {} at height {}",
                    self.entries[old_tip.0].hash, self.entries[tip.0].hash, height
                );
            }
        }
    }
}

impl ChainIndex for BlockTree {
    fn entry(&self, id: EntryId) -> &BlockIndexEntry {
        &self.entries[id.0]
    }

    fn ancestor(&self, id: EntryId, height: u64) -> Option<EntryId> {
        let entry = self.get(id)?;
        if height > entry.height {
            return None;
        }
        if self.is_active(id) {
            return self.at_height(height);
        }

        let mut cursor = id;
        while self.entries[cursor.0].height > height {
            cursor = self.entries[cursor.0].prev?;
            if self.is_active(cursor) {
                return self.at_height(height);
            }
        }
        Some(cursor)
    }
}
