//! Durable string key-value storage shared by configuration and history.
//!
//! Values are opaque strings and every operation is synchronous. Callers
//! own the encoding of what they persist.

pub mod error;
pub mod file;
pub mod memory;

pub use {
    error::{Error, Result},
    file::FileStore,
    memory::MemoryStore,
};

/// Key holding the versioned configuration record.
pub const SETTING_KEY: &str = "setting";

/// Key holding the ordered message history.
pub const MESSAGES_KEY: &str = "messages";

/// Synchronous string-keyed get/set over a durable backend.
pub trait KvStore: Send + Sync {
    /// Returns `None` when nothing was ever stored under `key`.
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
}

/// Reject keys that cannot be mapped onto a single file name.
pub(crate) fn check_key(key: &str) -> Result<()> {
    let valid = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(Error::InvalidKey {
            key: key.to_string(),
        })
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, rstest::rstest};

    #[rstest]
    #[case("setting")]
    #[case("messages")]
    #[case("a-b_c9")]
    fn accepts_plain_keys(#[case] key: &str) {
        assert!(check_key(key).is_ok());
    }

    #[rstest]
    #[case("")]
    #[case("../etc/passwd")]
    #[case("a/b")]
    #[case("with space")]
    #[case("dot.ted")]
    fn rejects_path_like_keys(#[case] key: &str) {
        assert!(matches!(check_key(key), Err(Error::InvalidKey { .. })));
    }
}
