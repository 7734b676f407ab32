//! Tests for signature module

use super::*;
use crate::testing::sign;

const SECRET: &[u8] = b"It's a Secret to Everybody";
const BODY: &[u8] = b"Hello, World!";

// Test vector published in GitHub's webhook validation documentation.
const EXPECTED: &str =
    "sha256=757107ea0eb2509fc211221cce984b8a37570b6d7586c22c46f4379c8b043e17";

#[test]
fn test_sign_matches_github_test_vector() {
    assert_eq!(sign(BODY, SECRET).as_deref(), Some(EXPECTED));
}

#[test]
fn test_valid_signature_is_accepted() {
    assert!(verify_signature(BODY, EXPECTED, SECRET));
}

#[test]
fn test_tampered_body_is_rejected() {
    assert!(!verify_signature(b"Hello, World?", EXPECTED, SECRET));
}

#[test]
fn test_wrong_secret_is_rejected() {
    assert!(!verify_signature(BODY, EXPECTED, b"another secret"));
}

#[test]
fn test_malformed_headers_are_rejected() {
    assert!(!verify_signature(BODY, "", SECRET));
    assert!(!verify_signature(BODY, "sha1=abcdef", SECRET));
    assert!(!verify_signature(BODY, "sha256=not-hex", SECRET));
}
