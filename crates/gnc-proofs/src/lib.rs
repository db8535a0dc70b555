//! gnc-proofs: claim proofs over genetic datasets, sized for a ledger that
//! stores a 32-byte hash and a 256-byte parameter block.
//!
//! These are hash commitments, not zero-knowledge proofs. A record binds a
//! claim to a commitment over a privacy-reduced snapshot of the dataset, and
//! the [`ProofVerifier`] checks claim/record consistency. Nothing here lets
//! a verifier confirm the snapshot satisfies the claim without trusting the
//! generator, and verification needs the claim in full.
//!
//! ```text
//! dataset ──snapshot──▶ commit(snapshot, nonce) ──┐
//! claim ──canonical──▶ claim hash ────────────────┼──▶ SHA-256 ──▶ commitmentHash (32)
//! witness search ──▶ witness hash ────────────────┘
//! claim hash + commitment prefix + options ──────────▶ parameterBlock (256)
//! ```

pub mod claim;
pub mod commitment;
pub mod generators;
pub mod kind;
pub mod params;
pub mod record;
pub mod snapshot;
pub mod verifier;

pub use claim::{AggregateQuery, GeneClaim, ProofClaim, QueryType, Statistic, VariantClaim};
pub use commitment::{commit, verify_commitment, Commitment};
pub use generators::{
    AggregateGenerator, ClaimGenerator, GeneAbsenceGenerator, GenePresenceGenerator,
    GeneVariantGenerator, GenerateOptions, ProofGenerator,
};
pub use kind::ProofKind;
pub use params::ParameterBlock;
pub use record::{LedgerEntry, ProofRecord};
pub use verifier::{BatchReport, ProofVerifier, Rejection, Verification, VerifyOptions};
