use gnc_core::codec::{base64_bytes, hex_bytes};
use gnc_core::GncResult;
use serde::{Deserialize, Serialize};

use crate::kind::ProofKind;
use crate::params::ParameterBlock;

/// A generated proof: the two ledger fields plus local metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProofRecord {
    pub proof_kind: u8,
    /// 32 bytes
    #[serde(with = "hex_bytes")]
    pub commitment_hash: Vec<u8>,
    /// 256 bytes
    #[serde(with = "base64_bytes")]
    pub parameter_block: Vec<u8>,
    /// Unix ms
    pub generated_at: u64,
    pub metadata: ProofMetadata,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProofMetadata {
    pub version: String,
    /// Witness confidence. Informational only, never hashed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    pub claim_summary: String,
}

/// The opaque pair handed to the ledger collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEntry {
    pub commitment_hash: [u8; 32],
    pub parameter_block: Vec<u8>,
}

impl ProofRecord {
    pub fn kind(&self) -> GncResult<ProofKind> {
        ProofKind::try_from(self.proof_kind)
    }

    pub fn parameters(&self) -> GncResult<ParameterBlock> {
        ParameterBlock::decode(&self.parameter_block)
    }

    pub fn to_ledger(&self) -> GncResult<LedgerEntry> {
        let commitment_hash = <[u8; 32]>::try_from(self.commitment_hash.as_slice()).map_err(|_| {
            gnc_core::GncError::MalformedProof(format!(
                "commitment hash must be 32 bytes, got {}",
                self.commitment_hash.len()
            ))
        })?;
        self.parameters()?;
        Ok(LedgerEntry {
            commitment_hash,
            parameter_block: self.parameter_block.clone(),
        })
    }
}
