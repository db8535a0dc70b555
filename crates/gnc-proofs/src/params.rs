//! Fixed 256-byte parameter block stored on the ledger next to the
//! 32-byte commitment hash.
//!
//! Layout (length-prefixed, zero-padded):
//! ```text
//! offset  size  field
//! 0       4     magic "GNCP"
//! 4       1     layout version (1)
//! 5       1     proof kind tag
//! 6       1     algorithm tag length L (<= 48)
//! 7       L     algorithm tag, UTF-8
//! 7+L     32    claim hash
//! 39+L    16    commitment prefix
//! 55+L    8     timestamp, unix seconds, big-endian
//! 63+L    2     body length B, big-endian
//! 65+L    B     body, canonical JSON
//! 65+L+B  ..    zero padding
//! ```

use gnc_core::canonical::canonical_json;
use gnc_core::config::PARAMETER_BLOCK_SIZE;
use gnc_core::{GncError, GncResult};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const MAGIC: &[u8; 4] = b"GNCP";
pub const LAYOUT_VERSION: u8 = 1;
pub const MAX_ALGORITHM_LEN: usize = 48;
pub const COMMITMENT_PREFIX_LEN: usize = 16;

/// Bytes before the algorithm tag
const HEADER_LEN: usize = 7;
/// Claim hash + prefix + timestamp + body length
const FIXED_TAIL_LEN: usize = 32 + COMMITMENT_PREFIX_LEN + 8 + 2;

#[derive(Debug, Clone, PartialEq)]
pub struct ParameterBlock {
    pub kind_tag: u8,
    pub algorithm: String,
    pub claim_hash: [u8; 32],
    pub commitment_prefix: [u8; COMMITMENT_PREFIX_LEN],
    /// Unix seconds
    pub timestamp: u64,
    pub body: Value,
}

/// Body of presence and absence blocks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneBody {
    pub privacy_level: String,
    pub include_confidence: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantBody {
    pub variant_type: gnc_core::types::VariantType,
    pub confidence_threshold: f64,
    pub include_quality: bool,
    pub privacy_level: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateBody {
    pub statistic: crate::claim::Statistic,
    pub data_size: u64,
    /// Reduced statistic value, integral values as JSON integers
    pub result: Value,
    pub confidence_level: f64,
    pub precision: String,
    pub privacy_level: String,
}

impl ParameterBlock {
    /// Serialize into exactly [`PARAMETER_BLOCK_SIZE`] bytes.
    pub fn encode(&self) -> GncResult<Vec<u8>> {
        let algorithm = self.algorithm.as_bytes();
        if algorithm.len() > MAX_ALGORITHM_LEN {
            return Err(GncError::InvalidParameter(format!(
                "algorithm tag is {} bytes, limit {MAX_ALGORITHM_LEN}",
                algorithm.len()
            )));
        }
        let body = canonical_json(&self.body)?;

        let size = HEADER_LEN + algorithm.len() + FIXED_TAIL_LEN + body.len();
        if size > PARAMETER_BLOCK_SIZE {
            return Err(GncError::ParameterOverflow {
                size,
                max: PARAMETER_BLOCK_SIZE,
            });
        }

        let mut out = Vec::with_capacity(PARAMETER_BLOCK_SIZE);
        out.extend_from_slice(MAGIC);
        out.push(LAYOUT_VERSION);
        out.push(self.kind_tag);
        out.push(algorithm.len() as u8);
        out.extend_from_slice(algorithm);
        out.extend_from_slice(&self.claim_hash);
        out.extend_from_slice(&self.commitment_prefix);
        out.extend_from_slice(&self.timestamp.to_be_bytes());
        out.extend_from_slice(&(body.len() as u16).to_be_bytes());
        out.extend_from_slice(&body);
        out.resize(PARAMETER_BLOCK_SIZE, 0);
        Ok(out)
    }

    /// Parse a block produced by [`encode`](Self::encode).
    pub fn decode(bytes: &[u8]) -> GncResult<Self> {
        if bytes.len() != PARAMETER_BLOCK_SIZE {
            return Err(malformed(format!(
                "parameter block must be {PARAMETER_BLOCK_SIZE} bytes, got {}",
                bytes.len()
            )));
        }
        if &bytes[..4] != MAGIC {
            return Err(malformed("bad parameter block magic"));
        }
        if bytes[4] != LAYOUT_VERSION {
            return Err(malformed(format!("unsupported layout version {}", bytes[4])));
        }
        let kind_tag = bytes[5];
        let alg_len = bytes[6] as usize;
        if alg_len > MAX_ALGORITHM_LEN {
            return Err(malformed(format!("algorithm tag length {alg_len} out of bounds")));
        }

        let mut reader = Reader::new(bytes, HEADER_LEN);
        let algorithm = std::str::from_utf8(reader.take(alg_len)?)
            .map_err(|_| malformed("algorithm tag is not UTF-8"))?
            .to_string();
        let claim_hash = reader.array::<32>()?;
        let commitment_prefix = reader.array::<COMMITMENT_PREFIX_LEN>()?;
        let timestamp = u64::from_be_bytes(reader.array::<8>()?);
        let body_len = u16::from_be_bytes(reader.array::<2>()?) as usize;
        let body: Value = serde_json::from_slice(reader.take(body_len)?)
            .map_err(|e| malformed(format!("parameter body: {e}")))?;

        if reader.rest().iter().any(|&b| b != 0) {
            return Err(malformed("non-zero bytes after parameter body"));
        }

        Ok(Self {
            kind_tag,
            algorithm,
            claim_hash,
            commitment_prefix,
            timestamp,
            body,
        })
    }

    /// Typed view of the body.
    pub fn body_as<T: DeserializeOwned>(&self) -> GncResult<T> {
        serde_json::from_value(self.body.clone()).map_err(|e| malformed(format!("parameter body: {e}")))
    }
}

fn malformed(msg: impl Into<String>) -> GncError {
    GncError::MalformedProof(msg.into())
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(bytes: &'a [u8], pos: usize) -> Self {
        Self { bytes, pos }
    }

    fn take(&mut self, n: usize) -> GncResult<&'a [u8]> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|&end| end <= self.bytes.len())
            .ok_or_else(|| malformed("parameter block field runs past the end"))?;
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn array<const N: usize>(&mut self) -> GncResult<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    fn rest(&self) -> &'a [u8] {
        &self.bytes[self.pos..]
    }
}
