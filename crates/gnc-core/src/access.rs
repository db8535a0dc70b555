//! Access tiers and the AEAD suites they map to.

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::GncError;

/// Ordinal access level. Each tier is keyed independently: holding one
/// tier's key reveals nothing about any other tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AccessTier {
    /// Aggregate counts only
    Basic = 1,
    /// Filtered variants, reduced gene list, phenotypes
    Detailed = 2,
    /// The whole dataset
    Full = 3,
}

impl AccessTier {
    pub const ALL: [AccessTier; 3] = [AccessTier::Basic, AccessTier::Detailed, AccessTier::Full];

    pub fn level(self) -> u8 {
        self as u8
    }

    pub fn name(self) -> &'static str {
        match self {
            AccessTier::Basic => "basic",
            AccessTier::Detailed => "detailed",
            AccessTier::Full => "full",
        }
    }
}

impl TryFrom<u8> for AccessTier {
    type Error = GncError;

    fn try_from(level: u8) -> Result<Self, Self::Error> {
        match level {
            1 => Ok(AccessTier::Basic),
            2 => Ok(AccessTier::Detailed),
            3 => Ok(AccessTier::Full),
            other => Err(GncError::InvalidAccessLevel(other)),
        }
    }
}

impl FromStr for AccessTier {
    type Err = GncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "basic" => Ok(AccessTier::Basic),
            "detailed" => Ok(AccessTier::Detailed),
            "full" => Ok(AccessTier::Full),
            other => {
                let level: u8 = other
                    .parse()
                    .map_err(|_| GncError::InvalidParameter(format!("unknown access tier: {other}")))?;
                AccessTier::try_from(level)
            }
        }
    }
}

impl fmt::Display for AccessTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.level())
    }
}

impl Serialize for AccessTier {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.level())
    }
}

struct TierVisitor;

impl<'de> Visitor<'de> for TierVisitor {
    type Value = AccessTier;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("an access tier (1, 2 or 3)")
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<AccessTier, E> {
        u8::try_from(v)
            .ok()
            .and_then(|l| AccessTier::try_from(l).ok())
            .ok_or_else(|| E::custom(format!("invalid access tier: {v}")))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<AccessTier, E> {
        u64::try_from(v)
            .map_err(|_| E::custom(format!("invalid access tier: {v}")))
            .and_then(|v| self.visit_u64(v))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<AccessTier, E> {
        v.parse().map_err(|e: GncError| E::custom(e.to_string()))
    }
}

/// Accepts both numbers and numeric strings, so tiers work as JSON map keys.
impl<'de> Deserialize<'de> for AccessTier {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(TierVisitor)
    }
}

/// AES-GCM suites, named the way they appear in packages and config files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AeadAlgorithm {
    #[serde(rename = "aes-128-gcm")]
    Aes128Gcm,
    #[serde(rename = "aes-192-gcm")]
    Aes192Gcm,
    #[serde(rename = "aes-256-gcm")]
    Aes256Gcm,
}

impl AeadAlgorithm {
    pub fn key_size(self) -> usize {
        match self {
            AeadAlgorithm::Aes128Gcm => 16,
            AeadAlgorithm::Aes192Gcm => 24,
            AeadAlgorithm::Aes256Gcm => 32,
        }
    }

    pub fn for_key_size(key_size: usize) -> Option<Self> {
        match key_size {
            16 => Some(AeadAlgorithm::Aes128Gcm),
            24 => Some(AeadAlgorithm::Aes192Gcm),
            32 => Some(AeadAlgorithm::Aes256Gcm),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AeadAlgorithm::Aes128Gcm => "aes-128-gcm",
            AeadAlgorithm::Aes192Gcm => "aes-192-gcm",
            AeadAlgorithm::Aes256Gcm => "aes-256-gcm",
        }
    }
}

impl fmt::Display for AeadAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// serde adapter for tier-keyed maps in formats that only allow string keys (TOML).
pub mod tier_map {
    use super::AccessTier;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::collections::BTreeMap;

    pub fn serialize<V, S>(map: &BTreeMap<AccessTier, V>, serializer: S) -> Result<S::Ok, S::Error>
    where
        V: Serialize,
        S: Serializer,
    {
        let keyed: BTreeMap<String, &V> = map.iter().map(|(k, v)| (k.to_string(), v)).collect();
        keyed.serialize(serializer)
    }

    pub fn deserialize<'de, V, D>(deserializer: D) -> Result<BTreeMap<AccessTier, V>, D::Error>
    where
        V: Deserialize<'de>,
        D: Deserializer<'de>,
    {
        let keyed = BTreeMap::<String, V>::deserialize(deserializer)?;
        keyed
            .into_iter()
            .map(|(k, v)| {
                k.parse::<AccessTier>()
                    .map(|tier| (tier, v))
                    .map_err(|e| serde::de::Error::custom(e.to_string()))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_tier_from_level() {
        assert_eq!(AccessTier::try_from(2).unwrap(), AccessTier::Detailed);
        assert!(matches!(
            AccessTier::try_from(4),
            Err(GncError::InvalidAccessLevel(4))
        ));
        assert!(matches!(
            AccessTier::try_from(0),
            Err(GncError::InvalidAccessLevel(0))
        ));
    }

    #[test]
    fn test_tier_as_json_map_key() {
        let mut map = BTreeMap::new();
        map.insert(AccessTier::Basic, "a");
        map.insert(AccessTier::Full, "c");

        let json = serde_json::to_string(&map).unwrap();
        assert_eq!(json, r#"{"1":"a","3":"c"}"#);

        let back: BTreeMap<AccessTier, String> = serde_json::from_str(&json).unwrap();
        assert_eq!(back[&AccessTier::Full], "c");
    }

    #[test]
    fn test_tier_as_json_value() {
        let tiers: Vec<AccessTier> = serde_json::from_str("[1, 2, 3]").unwrap();
        assert_eq!(tiers, AccessTier::ALL.to_vec());
        assert!(serde_json::from_str::<AccessTier>("7").is_err());
    }

    #[test]
    fn test_algorithm_key_sizes() {
        for algorithm in [
            AeadAlgorithm::Aes128Gcm,
            AeadAlgorithm::Aes192Gcm,
            AeadAlgorithm::Aes256Gcm,
        ] {
            assert_eq!(AeadAlgorithm::for_key_size(algorithm.key_size()), Some(algorithm));
        }
        assert_eq!(AeadAlgorithm::for_key_size(20), None);
        assert_eq!(
            serde_json::to_string(&AeadAlgorithm::Aes192Gcm).unwrap(),
            r#""aes-192-gcm""#
        );
    }
}
