// Admin API token signing.
//
// The platform authenticates admin clients with short-lived HS256 JWTs:
// the header carries the client id as `kid`, the payload is scoped to the
// Admin API of one version through the `aud` claim, and the signing key is
// the hex-decoded client secret.

use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Lifetime of an issued token, in seconds.
pub const TOKEN_TTL_SECS: i64 = 5 * 60;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    pub iat: i64,
    pub exp: i64,
    pub aud: String,
}

impl TokenClaims {
    pub fn new(version: &str, issued_at: i64) -> Self {
        TokenClaims {
            iat: issued_at,
            exp: issued_at + TOKEN_TTL_SECS,
            aud: audience(version),
        }
    }
}

fn audience(version: &str) -> String {
    format!("/{version}/admin/")
}

/// Sign a token for `client_id` valid from now for [`TOKEN_TTL_SECS`].
pub fn issue_token(client_id: &str, client_secret: &str, version: &str) -> Result<String> {
    issue_token_at(client_id, client_secret, version, Utc::now().timestamp())
}

pub(crate) fn issue_token_at(
    client_id: &str,
    client_secret: &str,
    version: &str,
    issued_at: i64,
) -> Result<String> {
    let secret = hex::decode(client_secret)?;
    let key = EncodingKey::from_secret(&secret);

    let mut header = Header::new(Algorithm::HS256);
    header.kid = Some(client_id.to_string());

    let claims = TokenClaims::new(version, issued_at);
    Ok(encode(&header, &claims, &key)?)
}

/// Check a token's signature, expiry and audience against the same secret
/// it was issued with.
pub fn verify_token(token: &str, client_secret: &str, version: &str) -> Result<TokenClaims> {
    let secret = hex::decode(client_secret)?;
    let key = DecodingKey::from_secret(&secret);

    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_audience(&[audience(version)]);
    // The platform allows no clock skew, so neither do we.
    validation.leeway = 0;

    let data = decode::<TokenClaims>(token, &key, &validation)?;
    Ok(data.claims)
}
