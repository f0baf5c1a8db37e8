//! Test fixtures for Gatehouse development and testing.
//!
//! Pre-built user records shared by the test suites of the workspace.
//!
//! # Example
//!
//! ```
//! use gatehouse_core::fixtures;
//!
//! let alice = fixtures::alice();
//! assert_eq!(alice.identification, "alice");
//! assert!(!alice.two_factor_enabled());
//! ```

use crate::user::UserRecord;

/// Two-factor code used by [`alice_with_two_factor`].
pub const ALICE_TWO_FACTOR_CODE: u32 = 123_456;

/// `alice` / `pw`, no second factor.
#[must_use]
pub fn alice() -> UserRecord {
    UserRecord::new("alice", "pw")
}

/// `alice` / `pw` with two-factor code [`ALICE_TWO_FACTOR_CODE`].
#[must_use]
pub fn alice_with_two_factor() -> UserRecord {
    alice().with_two_factor(ALICE_TWO_FACTOR_CODE)
}

/// `bob` / `correct horse`, with a display name and extra claims.
#[must_use]
pub fn bob() -> UserRecord {
    UserRecord::new("bob", "correct horse")
        .with_display_name("Bob Builder")
        .with_claim("role", "admin")
        .with_claim("tenant", "acme")
}

/// All fixture users without a second factor.
#[must_use]
pub fn all_users() -> Vec<UserRecord> {
    vec![alice(), bob()]
}
