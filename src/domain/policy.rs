//! Password composition rules.
//!
//! Character classes are ASCII-only: `É` is neither upper- nor lowercase here,
//! but it does count as a symbol because it falls outside `[A-Za-z0-9]`.

use regex::Regex;
use std::sync::LazyLock;

pub const MIN_PASSWORD_LENGTH: usize = 10;

pub const POLICY_DESCRIPTION: &str = "Password must be at least 10 characters and include uppercase, lowercase, number, and symbol";

static UPPERCASE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[A-Z]").expect("static regex"));
static LOWERCASE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[a-z]").expect("static regex"));
static DIGIT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[0-9]").expect("static regex"));
static SYMBOL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9]").expect("static regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PasswordPolicy {
    pub min_length: usize,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self {
            min_length: MIN_PASSWORD_LENGTH,
        }
    }
}

impl PasswordPolicy {
    /// A configured minimum below the baseline is raised to the baseline.
    #[must_use]
    pub fn with_min_length(min_length: usize) -> Self {
        Self {
            min_length: min_length.max(MIN_PASSWORD_LENGTH),
        }
    }

    #[must_use]
    pub fn is_valid(&self, candidate: &str) -> bool {
        candidate.chars().count() >= self.min_length
            && UPPERCASE.is_match(candidate)
            && LOWERCASE.is_match(candidate)
            && DIGIT.is_match(candidate)
            && SYMBOL.is_match(candidate)
    }
}

/// Checks `candidate` against the baseline policy.
///
/// ```rust
/// use dirhub::domain::policy::is_password_valid;
///
/// assert!(is_password_valid("Password123!"));
/// assert!(!is_password_valid("Password123"));
/// ```
#[must_use]
pub fn is_password_valid(candidate: &str) -> bool {
    PasswordPolicy::default().is_valid(candidate)
}
