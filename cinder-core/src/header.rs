use std::io::{Error as IoError, ErrorKind as IoErrorKind, Read, Result as IoResult, Write};
use std::ops::Deref;

use serde::{Deserialize, Serialize};

use crate::{utils::Saveable, BlockHash, Compact};

/// The parts of a candidate block header the difficulty rules look at.
/// A genesis header has an all-zero `prev_hash`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct HeaderInfo {
    pub hash: BlockHash,
    pub prev_hash: BlockHash,
    pub time: i64,
    pub bits: Compact,
}

impl HeaderInfo {
    pub fn new(hash: BlockHash, prev_hash: BlockHash, time: i64, bits: Compact) -> Self {
        HeaderInfo {
            hash,
            prev_hash,
            time,
            bits,
        }
    }

    pub fn is_genesis(&self) -> bool {
        self.prev_hash.is_zero()
    }
}

/// Headers in connection order, as stored in a chain file.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(transparent)]
pub struct HeaderChain(pub Vec<HeaderInfo>);

impl Deref for HeaderChain {
    type Target = [HeaderInfo];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<Vec<HeaderInfo>> for HeaderChain {
    fn from(headers: Vec<HeaderInfo>) -> Self {
        HeaderChain(headers)
    }
}

impl Saveable for HeaderChain {
    fn load<I: Read>(reader: I) -> IoResult<Self> {
        serde_json::from_reader(reader).map_err(|e| {
            IoError::new(
                IoErrorKind::InvalidData,
                format!("Failed to deserialize header chain: {}", e),
            )
        })
    }

    fn save<O: Write>(&self, writer: O) -> IoResult<()> {
        serde_json::to_writer_pretty(writer, self).map_err(|e| {
            IoError::new(
                IoErrorKind::InvalidData,
                format!("Failed to serialize header chain: {}", e),
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::U256;

    fn sample_chain() -> HeaderChain {
        let genesis = HeaderInfo::new(
            BlockHash(U256::from(7u64)),
            BlockHash::zero(),
            1_296_688_602,
            Compact(0x207fffff),
        );
        let next = HeaderInfo::new(
            BlockHash(U256::from(8u64)),
            genesis.hash,
            1_296_689_202,
            Compact(0x207fffff),
        );
        HeaderChain(vec![genesis, next])
    }

    #[test]
    fn test_save_and_load() {
        let chain = sample_chain();
        let mut buffer = Vec::new();
        chain.save(&mut buffer).unwrap();

        let text = String::from_utf8(buffer.clone()).unwrap();
        assert!(text.contains("\"bits\": \"207fffff\""));

        let loaded = HeaderChain::load(buffer.as_slice()).unwrap();
        assert_eq!(loaded, chain);
        assert!(loaded[0].is_genesis());
        assert!(!loaded[1].is_genesis());
    }

    #[test]
    fn test_load_rejects_garbage() {
        let err = HeaderChain::load("{\"not\": \"a chain\"}".as_bytes()).unwrap_err();
        assert_eq!(err.kind(), IoErrorKind::InvalidData);
    }
}
