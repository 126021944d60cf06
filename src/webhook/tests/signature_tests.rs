//! Unit tests for webhook signature verification.

use crate::webhook::signature::{WebhookSecret, sign, verify};
use rstest::{fixture, rstest};

#[fixture]
fn secret() -> WebhookSecret {
    WebhookSecret::new("it's a secret to everybody")
}

#[rstest]
fn signature_round_trips(secret: WebhookSecret) {
    let body = br#"{"action":"opened"}"#;
    let header = sign(&secret, body);

    assert!(header.starts_with("sha256="));
    assert_eq!(header.len(), 7 + 64);
    assert!(verify(&secret, Some(&header), body));
}

#[rstest]
fn tampered_body_fails_verification(secret: WebhookSecret) {
    let header = sign(&secret, br#"{"action":"opened"}"#);
    assert!(!verify(&secret, Some(&header), br#"{"action":"closed"}"#));
}

#[rstest]
fn wrong_secret_fails_verification(secret: WebhookSecret) {
    let body = br#"{"action":"opened"}"#;
    let header = sign(&WebhookSecret::new("another secret"), body);
    assert!(!verify(&secret, Some(&header), body));
}

#[rstest]
fn missing_header_fails_verification(secret: WebhookSecret) {
    assert!(!verify(&secret, None, b"{}"));
}

#[rstest]
#[case("sha1=abcdef")]
#[case("abcdef")]
#[case("sha256=")]
#[case("sha256=zznothex")]
fn malformed_headers_fail_verification(secret: WebhookSecret, #[case] header: &str) {
    assert!(!verify(&secret, Some(header), b"{}"));
}
