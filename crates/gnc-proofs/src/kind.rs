use gnc_core::{GncError, GncResult};
use std::fmt;

/// Proof kinds shared by generators and the verifier. The numeric tag is
/// what the ledger stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum ProofKind {
    GenePresence = 1,
    GeneAbsence = 2,
    GeneVariant = 3,
    Aggregate = 4,
}

impl ProofKind {
    pub const ALL: [ProofKind; 4] = [
        ProofKind::GenePresence,
        ProofKind::GeneAbsence,
        ProofKind::GeneVariant,
        ProofKind::Aggregate,
    ];

    pub fn tag(self) -> u8 {
        self as u8
    }

    /// Algorithm identifier written into the parameter block.
    pub fn algorithm(self) -> &'static str {
        match self {
            ProofKind::GenePresence => "simplified-zk-snark",
            ProofKind::GeneAbsence => "simplified-zk-snark-absence",
            ProofKind::GeneVariant => "simplified-zk-snark-variant",
            ProofKind::Aggregate => "simplified-zk-snark-aggregate",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ProofKind::GenePresence => "gene_presence",
            ProofKind::GeneAbsence => "gene_absence",
            ProofKind::GeneVariant => "gene_variant",
            ProofKind::Aggregate => "aggregate",
        }
    }
}

impl TryFrom<u8> for ProofKind {
    type Error = GncError;

    fn try_from(tag: u8) -> GncResult<Self> {
        match tag {
            1 => Ok(ProofKind::GenePresence),
            2 => Ok(ProofKind::GeneAbsence),
            3 => Ok(ProofKind::GeneVariant),
            4 => Ok(ProofKind::Aggregate),
            other => Err(GncError::MalformedProof(format!("unknown proof kind: {other}"))),
        }
    }
}

impl fmt::Display for ProofKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tags_roundtrip() {
        for kind in ProofKind::ALL {
            assert_eq!(ProofKind::try_from(kind.tag()).unwrap(), kind);
        }
        assert!(matches!(ProofKind::try_from(0), Err(GncError::MalformedProof(_))));
        assert!(matches!(ProofKind::try_from(5), Err(GncError::MalformedProof(_))));
    }

    #[test]
    fn test_algorithms_are_distinct() {
        let mut algorithms: Vec<_> = ProofKind::ALL.iter().map(|k| k.algorithm()).collect();
        algorithms.sort();
        algorithms.dedup();
        assert_eq!(algorithms.len(), 4);
    }
}
