//! Content hashing for file-modification events.

use sha2::{Digest, Sha256};

pub fn hash_content(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_content_hashes_identically() {
        assert_eq!(hash_content("abc"), hash_content("abc"));
    }

    #[test]
    fn different_content_hashes_differently() {
        assert_ne!(hash_content("abc"), hash_content("abd"));
    }
}
