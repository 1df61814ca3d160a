//! SHA-256 helpers for deriving store keys and gateway receipts.

use sha2::{Digest, Sha256};

/// Hex-encoded SHA-256 of an identifier.
///
/// Store backends use this as a file name so gateway- or user-supplied ids
/// never reach the filesystem verbatim.
pub fn document_key(id: &str) -> String {
    hex::encode(Sha256::digest(id.as_bytes()))
}

/// Hex-encoded SHA-256 over several parts joined with `\n`.
pub fn composite_key(parts: &[&str]) -> String {
    document_key(&parts.join("\n"))
}

/// Build a gateway receipt reference for a purchase attempt.
///
/// Gateways cap receipt length (40 chars on Razorpay), so the
/// user/content/time tuple is hashed and truncated.
pub fn order_receipt(user_id: &str, content_ref: &str, nonce: &str) -> String {
    let hash = composite_key(&[user_id, content_ref, nonce]);
    format!("rcpt_{}", &hash[..24])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_key_empty() {
        assert_eq!(
            document_key(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_document_key_is_path_safe() {
        let key = document_key("../../etc/passwd");
        assert_eq!(key.len(), 64);
        assert!(key.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_composite_key_separates_parts() {
        // "ab" + "c" must not collide with "a" + "bc"
        assert_ne!(composite_key(&["ab", "c"]), composite_key(&["a", "bc"]));
    }

    #[test]
    fn test_order_receipt_fits_gateway_limit() {
        let receipt = order_receipt("user-1", "doc/guide.pdf", "2025-01-15T12:00:00Z");
        assert!(receipt.starts_with("rcpt_"));
        assert!(receipt.len() <= 40);
        assert_eq!(
            receipt,
            order_receipt("user-1", "doc/guide.pdf", "2025-01-15T12:00:00Z")
        );
    }
}
