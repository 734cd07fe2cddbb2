//! Token codec for the opaque per-recipient tracking token.
//!
//! Wire format: URL-safe base64 of the UTF-8 string
//! `org|campaign|subscriber|email[|link]`, carried with a hex HMAC-SHA256
//! signature over the encoded segment. Decoding verifies the signature
//! before trusting any field.

use base64::alphabet;
use base64::engine::{DecodePaddingMode, Engine, GeneralPurpose, GeneralPurposeConfig};
use thiserror::Error;
use tracing::warn;
use url::Url;

use super::signature;
use crate::event::EventKind;

/// URL-safe engine that emits unpadded tokens but accepts padded input.
/// Emails are rendered by third-party clients that sometimes re-encode
/// query paths, so both forms show up in the wild.
const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Why a token was rejected.
///
/// Clients never see these variants; the per-route policy maps them to a
/// fixed artifact (pixel) or a generic 400.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TokenError {
    /// Bad base64, bad UTF-8, too few fields, empty required field, or an
    /// unparseable link URL.
    #[error("malformed token")]
    Malformed,
    /// The signature does not match the encoded segment.
    #[error("token signature invalid")]
    SignatureInvalid,
}

/// Decoded token fields, in wire order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenFields {
    pub org_id: String,
    pub campaign_id: String,
    pub subscriber_id: String,
    pub email_id: Option<String>,
    pub link_url: Option<String>,
}

/// Encoder/decoder holding the immutable signing secret.
///
/// A token, once issued, may be decoded any number of times; mail clients
/// prefetch and re-open, and every hit decodes independently.
pub struct TokenCodec {
    signing_key: String,
}

impl TokenCodec {
    pub fn new(signing_key: impl Into<String>) -> Self {
        Self {
            signing_key: signing_key.into(),
        }
    }

    /// Encode fields into the wire segment.
    ///
    /// The outbound send pipeline is the production caller; the codec keeps
    /// encode and decode together so the round-trip law is testable here.
    pub fn encode(&self, fields: &TokenFields) -> String {
        let mut parts = vec![
            fields.org_id.as_str(),
            fields.campaign_id.as_str(),
            fields.subscriber_id.as_str(),
        ];
        let email = fields.email_id.as_deref().unwrap_or("");
        match &fields.link_url {
            Some(link) => {
                parts.push(email);
                parts.push(link);
            }
            None => {
                if !email.is_empty() {
                    parts.push(email);
                }
            }
        }
        URL_SAFE_LENIENT.encode(parts.join("|"))
    }

    /// Compute the signature segment for an encoded token.
    pub fn sign(&self, raw: &str) -> String {
        signature::sign(&self.signing_key, raw)
    }

    /// Verify and decode a token received from the network.
    ///
    /// The signature gate runs first; no field is parsed out of an
    /// unverified segment. Field minima depend on the event kind: open and
    /// unsubscribe tokens need three fields, click tokens need five.
    pub fn decode(
        &self,
        kind: EventKind,
        raw: &str,
        sig: &str,
    ) -> Result<TokenFields, TokenError> {
        if !signature::verify(&self.signing_key, raw, sig) {
            return Err(TokenError::SignatureInvalid);
        }

        let bytes = URL_SAFE_LENIENT.decode(raw).map_err(|_| {
            warn!(raw_length = raw.len(), "token_invalid_base64");
            TokenError::Malformed
        })?;
        let payload = String::from_utf8(bytes).map_err(|_| {
            warn!("token_invalid_utf8");
            TokenError::Malformed
        })?;

        let parts: Vec<&str> = payload.split('|').collect();
        if parts.len() < min_fields(kind) {
            warn!(
                field_count = parts.len(),
                required = min_fields(kind),
                event_kind = kind.as_str(),
                "token_too_few_fields"
            );
            return Err(TokenError::Malformed);
        }

        let org_id = parts[0];
        let campaign_id = parts[1];
        let subscriber_id = parts[2];
        if org_id.is_empty() || campaign_id.is_empty() || subscriber_id.is_empty() {
            warn!("token_empty_required_field");
            return Err(TokenError::Malformed);
        }

        let email_id = parts
            .get(3)
            .filter(|s| !s.is_empty())
            .map(|s| s.to_string());

        let link_url = match kind {
            EventKind::Click => {
                // The link is the last field and may itself contain the
                // delimiter, so rejoin the tail rather than taking one part.
                let link = parts[4..].join("|");
                if Url::parse(&link).is_err() {
                    warn!("token_invalid_link_url");
                    return Err(TokenError::Malformed);
                }
                Some(link)
            }
            EventKind::Open | EventKind::Unsubscribe => None,
        };

        Ok(TokenFields {
            org_id: org_id.to_string(),
            campaign_id: campaign_id.to_string(),
            subscriber_id: subscriber_id.to_string(),
            email_id,
            link_url,
        })
    }
}

/// Minimum delimited field count per event kind.
fn min_fields(kind: EventKind) -> usize {
    match kind {
        EventKind::Open | EventKind::Unsubscribe => 3,
        EventKind::Click => 5,
    }
}
