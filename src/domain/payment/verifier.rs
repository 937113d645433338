//! Webhook signature verification.
//!
//! Stripe signs `"{timestamp}.{payload}"` with HMAC-SHA256 and sends the
//! result in the `Stripe-Signature` header as `t=<ts>,v1=<hex>`.

use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use super::errors::WebhookError;
use super::event::{PaymentEvent, StripeEvent};

/// Maximum allowed age for webhook events (5 minutes).
const MAX_EVENT_AGE_SECS: i64 = 300;

/// Maximum allowed clock skew for future events (1 minute).
const MAX_CLOCK_SKEW_SECS: i64 = 60;

/// Parsed components of the signature header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureHeader {
    pub timestamp: i64,
    /// All `v1` signatures; several are sent while a secret is being rolled.
    pub v1_signatures: Vec<Vec<u8>>,
}

impl SignatureHeader {
    /// Parses `t=<timestamp>,v1=<signature>[,v1=...][,v0=...]`.
    ///
    /// Unknown keys are ignored.
    pub fn parse(header: &str) -> Result<Self, WebhookError> {
        let mut timestamp: Option<i64> = None;
        let mut v1_signatures = Vec::new();

        for part in header.split(',') {
            let (key, value) = part
                .trim()
                .split_once('=')
                .ok_or_else(|| WebhookError::ParseError("invalid header format".to_string()))?;

            match key {
                "t" => {
                    timestamp = Some(value.parse().map_err(|_| {
                        WebhookError::ParseError("invalid timestamp".to_string())
                    })?);
                }
                "v1" => {
                    v1_signatures.push(hex::decode(value).map_err(|_| {
                        WebhookError::ParseError("invalid v1 signature hex".to_string())
                    })?);
                }
                _ => {}
            }
        }

        let timestamp =
            timestamp.ok_or_else(|| WebhookError::ParseError("missing timestamp".to_string()))?;
        if v1_signatures.is_empty() {
            return Err(WebhookError::ParseError("missing v1 signature".to_string()));
        }

        Ok(SignatureHeader {
            timestamp,
            v1_signatures,
        })
    }
}

/// Verifier for payment webhooks, holding the shared signing secret.
#[derive(Clone)]
pub struct WebhookVerifier {
    secret: SecretString,
}

impl std::fmt::Debug for WebhookVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookVerifier").finish_non_exhaustive()
    }
}

impl WebhookVerifier {
    pub fn new(secret: SecretString) -> Self {
        Self { secret }
    }

    /// Verifies the signature against the current clock, then decodes the event.
    pub fn verify_and_parse(
        &self,
        payload: &[u8],
        signature_header: &str,
    ) -> Result<PaymentEvent, WebhookError> {
        self.verify_and_parse_at(payload, signature_header, chrono::Utc::now().timestamp())
    }

    /// Same as [`verify_and_parse`](Self::verify_and_parse) with an explicit clock.
    ///
    /// Nothing in the payload is looked at before the signature checks out.
    pub fn verify_and_parse_at(
        &self,
        payload: &[u8],
        signature_header: &str,
        now: i64,
    ) -> Result<PaymentEvent, WebhookError> {
        let header = SignatureHeader::parse(signature_header)?;

        let age = now - header.timestamp;
        if age > MAX_EVENT_AGE_SECS {
            return Err(WebhookError::TimestampOutOfRange);
        }
        if age < -MAX_CLOCK_SKEW_SECS {
            return Err(WebhookError::InvalidTimestamp);
        }

        let expected = self.compute_signature(header.timestamp, payload)?;
        let matched = header
            .v1_signatures
            .iter()
            .any(|candidate| constant_time_compare(&expected, candidate));
        if !matched {
            return Err(WebhookError::InvalidSignature);
        }

        let event: StripeEvent = serde_json::from_slice(payload)
            .map_err(|e| WebhookError::ParseError(e.to_string()))?;
        PaymentEvent::try_from(event)
    }

    fn compute_signature(&self, timestamp: i64, payload: &[u8]) -> Result<Vec<u8>, WebhookError> {
        let mut mac = Hmac::<Sha256>::new_from_slice(self.secret.expose_secret().as_bytes())
            .map_err(|_| WebhookError::InvalidSignature)?;
        mac.update(timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(payload);
        Ok(mac.finalize().into_bytes().to_vec())
    }
}

fn constant_time_compare(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}

#[cfg(test)]
pub(crate) fn sign_for_test(secret: &str, timestamp: i64, payload: &str) -> String {
    let mut mac =
        Hmac::<Sha256>::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key");
    mac.update(format!("{}.{}", timestamp, payload).as_bytes());
    format!("t={},v1={}", timestamp, hex::encode(mac.finalize().into_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::payment::CheckoutOutcome;

    const TEST_SECRET: &str = "whsec_test_secret_12345";
    const NOW: i64 = 1_700_000_000;

    fn verifier() -> WebhookVerifier {
        WebhookVerifier::new(SecretString::new(TEST_SECRET.to_string()))
    }

    fn completed_payload() -> String {
        serde_json::json!({
            "id": "evt_1",
            "type": "checkout.session.completed",
            "created": NOW,
            "livemode": false,
            "data": {"object": {"id": "cs_test_1"}}
        })
        .to_string()
    }

    // ══════════════════════════════════════════════════════════════
    // SignatureHeader Parsing Tests
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn parses_timestamp_and_signature() {
        let header = SignatureHeader::parse("t=123,v1=abcd").unwrap();
        assert_eq!(header.timestamp, 123);
        assert_eq!(header.v1_signatures, vec![vec![0xab, 0xcd]]);
    }

    #[test]
    fn collects_every_v1_signature_and_ignores_unknown_keys() {
        let header = SignatureHeader::parse("t=1,v1=aa,v0=bb,v1=cc,x=y").unwrap();
        assert_eq!(header.v1_signatures.len(), 2);
    }

    #[test]
    fn rejects_missing_timestamp() {
        assert!(matches!(
            SignatureHeader::parse("v1=abcd"),
            Err(WebhookError::ParseError(_))
        ));
    }

    #[test]
    fn rejects_missing_signature() {
        assert!(SignatureHeader::parse("t=123").is_err());
    }

    #[test]
    fn rejects_non_hex_signature() {
        assert!(SignatureHeader::parse("t=123,v1=zz").is_err());
    }

    #[test]
    fn rejects_garbage_header() {
        assert!(SignatureHeader::parse("garbage").is_err());
    }

    // ══════════════════════════════════════════════════════════════
    // Verification Tests
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn accepts_valid_signature() {
        let payload = completed_payload();
        let header = sign_for_test(TEST_SECRET, NOW, &payload);

        let event = verifier()
            .verify_and_parse_at(payload.as_bytes(), &header, NOW)
            .unwrap();
        assert_eq!(event.session.as_str(), "cs_test_1");
        assert_eq!(event.outcome, CheckoutOutcome::Completed);
    }

    #[test]
    fn rejects_signature_from_other_secret() {
        let payload = completed_payload();
        let header = sign_for_test("whsec_other", NOW, &payload);

        assert!(matches!(
            verifier().verify_and_parse_at(payload.as_bytes(), &header, NOW),
            Err(WebhookError::InvalidSignature)
        ));
    }

    #[test]
    fn rejects_tampered_payload() {
        let payload = completed_payload();
        let header = sign_for_test(TEST_SECRET, NOW, &payload);
        let tampered = payload.replace("cs_test_1", "cs_test_2");

        assert!(matches!(
            verifier().verify_and_parse_at(tampered.as_bytes(), &header, NOW),
            Err(WebhookError::InvalidSignature)
        ));
    }

    #[test]
    fn rejects_stale_event() {
        let payload = completed_payload();
        let header = sign_for_test(TEST_SECRET, NOW - 301, &payload);

        assert!(matches!(
            verifier().verify_and_parse_at(payload.as_bytes(), &header, NOW),
            Err(WebhookError::TimestampOutOfRange)
        ));
    }

    #[test]
    fn tolerates_small_clock_skew_but_not_large() {
        let payload = completed_payload();

        let slightly_ahead = sign_for_test(TEST_SECRET, NOW + 30, &payload);
        assert!(verifier()
            .verify_and_parse_at(payload.as_bytes(), &slightly_ahead, NOW)
            .is_ok());

        let far_ahead = sign_for_test(TEST_SECRET, NOW + 120, &payload);
        assert!(matches!(
            verifier().verify_and_parse_at(payload.as_bytes(), &far_ahead, NOW),
            Err(WebhookError::InvalidTimestamp)
        ));
    }

    #[test]
    fn signed_unsupported_event_is_rejected_after_verification() {
        let payload = serde_json::json!({
            "id": "evt_2",
            "type": "customer.created",
            "data": {"object": {"id": "cus_1"}}
        })
        .to_string();
        let header = sign_for_test(TEST_SECRET, NOW, &payload);

        assert!(matches!(
            verifier().verify_and_parse_at(payload.as_bytes(), &header, NOW),
            Err(WebhookError::UnsupportedEvent(_))
        ));
    }

    #[test]
    fn debug_output_hides_secret() {
        assert!(!format!("{:?}", verifier()).contains(TEST_SECRET));
    }
}
