//! Password policy, strength estimate and generation

use gnc_core::config::PasswordPolicyConfig;
use gnc_core::{GncError, GncResult};
use rand::Rng;
use serde::Serialize;

const SPECIAL_CHARS: &str = "!@#$%^&*(),.?\":{}|<>";
const GENERATOR_ALPHABET: &[u8] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789!@#$%^&*";

#[derive(Debug, Clone)]
pub struct PasswordPolicy {
    pub min_length: usize,
    pub require_uppercase: bool,
    pub require_lowercase: bool,
    pub require_numbers: bool,
    pub require_special_chars: bool,
    pub forbidden_patterns: Vec<String>,
}

impl From<&PasswordPolicyConfig> for PasswordPolicy {
    fn from(config: &PasswordPolicyConfig) -> Self {
        Self {
            min_length: config.min_length,
            require_uppercase: config.require_uppercase,
            require_lowercase: config.require_lowercase,
            require_numbers: config.require_numbers,
            require_special_chars: config.require_special_chars,
            forbidden_patterns: config.forbidden_patterns.clone(),
        }
    }
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self::from(&PasswordPolicyConfig::default())
    }
}

impl PasswordPolicy {
    /// Every violated rule, in policy order.
    pub fn violations(&self, password: &str) -> Vec<String> {
        let mut violations = Vec::new();

        if password.chars().count() < self.min_length {
            violations.push(format!("must be at least {} characters", self.min_length));
        }
        if self.require_uppercase && !password.chars().any(|c| c.is_ascii_uppercase()) {
            violations.push("must contain an uppercase letter".into());
        }
        if self.require_lowercase && !password.chars().any(|c| c.is_ascii_lowercase()) {
            violations.push("must contain a lowercase letter".into());
        }
        if self.require_numbers && !password.chars().any(|c| c.is_ascii_digit()) {
            violations.push("must contain a number".into());
        }
        if self.require_special_chars && !password.chars().any(is_special) {
            violations.push("must contain a special character".into());
        }

        let lowered = password.to_lowercase();
        for pattern in &self.forbidden_patterns {
            if !pattern.is_empty() && lowered.contains(&pattern.to_lowercase()) {
                violations.push(format!("must not contain \"{pattern}\""));
            }
        }
        violations
    }

    pub fn check(&self, password: &str) -> GncResult<()> {
        let violations = self.violations(password);
        if violations.is_empty() {
            Ok(())
        } else {
            Err(GncError::InvalidParameter(format!(
                "password {}",
                violations.join("; ")
            )))
        }
    }
}

fn is_special(c: char) -> bool {
    SPECIAL_CHARS.contains(c)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StrengthLevel {
    VeryWeak,
    Weak,
    Medium,
    Strong,
    VeryStrong,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordStrength {
    pub length: usize,
    pub has_lowercase: bool,
    pub has_uppercase: bool,
    pub has_numbers: bool,
    pub has_special_chars: bool,
    /// Bits: length × log2(character pool)
    pub entropy: f64,
    pub strength: StrengthLevel,
}

pub fn analyze_strength(password: &str) -> PasswordStrength {
    let length = password.chars().count();
    let has_lowercase = password.chars().any(|c| c.is_ascii_lowercase());
    let has_uppercase = password.chars().any(|c| c.is_ascii_uppercase());
    let has_numbers = password.chars().any(|c| c.is_ascii_digit());
    let has_special_chars = password.chars().any(is_special);

    let pool = u32::from(has_lowercase) * 26
        + u32::from(has_uppercase) * 26
        + u32::from(has_numbers) * 10
        + u32::from(has_special_chars) * 32;
    let entropy = if pool == 0 {
        0.0
    } else {
        length as f64 * f64::from(pool).log2()
    };

    let strength = if entropy >= 60.0 && length >= 12 {
        StrengthLevel::VeryStrong
    } else if entropy >= 50.0 && length >= 10 {
        StrengthLevel::Strong
    } else if entropy >= 40.0 && length >= 8 {
        StrengthLevel::Medium
    } else if entropy >= 30.0 {
        StrengthLevel::Weak
    } else {
        StrengthLevel::VeryWeak
    };

    PasswordStrength {
        length,
        has_lowercase,
        has_uppercase,
        has_numbers,
        has_special_chars,
        entropy,
        strength,
    }
}

/// Random password drawn uniformly from letters, digits and `!@#$%^&*`.
pub fn generate_secure_password(length: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..length)
        .map(|_| char::from(GENERATOR_ALPHABET[rng.gen_range(0..GENERATOR_ALPHABET.len())]))
        .collect()
}
