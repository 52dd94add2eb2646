//! JWT generation helpers for tests

use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::Value;

/// Mint an HS256 token carrying `claims`.
///
/// The client never verifies signatures, so the secret only has to make the
/// token look like what a real backend issues.
pub fn mint_token(claims: Value) -> String {
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(b"test_secret_key_for_testing_purposes_only"),
    )
    .expect("should mint token successfully")
}
