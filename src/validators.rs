// ✅ Field Validators - pure predicates over a single contact value
//
// Anchoring is deliberately asymmetric and must stay that way to reproduce
// existing reports:
//   - email: prefix match. `a@b.co<script>` is accepted because matching
//     stops at the word boundary after the TLD.
//   - name: full match. "O'Brien" and "Jean-Luc" are rejected.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Legacy email rule: start-anchored, first char must be a word character,
/// TLD must end on a word boundary. Anything after that is ignored.
static EMAIL_PREFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b")
        .expect("email pattern is valid")
});

static EMAIL_FULL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$")
        .expect("strict email pattern is valid")
});

static NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z\s]{1,50}$").expect("name pattern is valid"));

/// Whether `value` looks like `local@domain.tld` (prefix match)
pub fn is_valid_email(value: Option<&str>) -> bool {
    match value {
        Some(email) if !email.is_empty() => EMAIL_PREFIX.is_match(email),
        _ => false,
    }
}

/// Fully anchored variant: no trailing content allowed after the TLD
pub fn is_valid_email_strict(value: Option<&str>) -> bool {
    match value {
        Some(email) if !email.is_empty() => EMAIL_FULL.is_match(email),
        _ => false,
    }
}

/// 1 to 50 characters, ASCII letters and whitespace only
pub fn is_valid_name(value: Option<&str>) -> bool {
    match value {
        Some(name) => NAME.is_match(name),
        None => false,
    }
}

// ============================================================================
// EMAIL RULE SELECTION
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmailRule {
    /// Prefix match, parity with existing reports
    #[default]
    Legacy,
    /// Full match
    Strict,
}

impl EmailRule {
    pub fn check(&self, value: Option<&str>) -> bool {
        match self {
            EmailRule::Legacy => is_valid_email(value),
            EmailRule::Strict => is_valid_email_strict(value),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            EmailRule::Legacy => "legacy",
            EmailRule::Strict => "strict",
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
