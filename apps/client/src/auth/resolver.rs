//! Identity resolution from the login response.
//!
//! Backends answer `POST /api/auth/login` in one of three shapes. Each shape
//! is an explicit attempt, tried in a fixed order; the first attempt that
//! yields a complete identity wins.

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use super::credential::Credential;
use super::identity::{dedupe_roles, string_or_number, Identity};
use super::token_codec::{self, DecodeError, UnverifiedClaims};

/// Body of a successful login call, as loose as the backends we talk to.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
    /// Accepted and ignored: rotation is not supported.
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub user: Option<Value>,
    #[serde(default, deserialize_with = "optional_id")]
    pub id: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub roles: Option<Vec<String>>,
}

impl LoginResponse {
    /// `accessToken` takes precedence over `token`; blank values count as absent.
    pub fn credential(&self) -> Option<Credential> {
        [self.access_token.as_deref(), self.token.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|t| !t.is_empty())
            .map(Credential::from)
    }
}

fn optional_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    struct Wrapper(#[serde(deserialize_with = "string_or_number")] String);

    Ok(Option::<Wrapper>::deserialize(deserializer)?.map(|Wrapper(s)| s))
}

/// Which response shape produced the identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionSource {
    Nested,
    Flat,
    Claims,
}

impl ResolutionSource {
    pub const PRIORITY: [ResolutionSource; 3] = [
        ResolutionSource::Nested,
        ResolutionSource::Flat,
        ResolutionSource::Claims,
    ];
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolutionFailure {
    #[error("could not decode credential claims: {0}")]
    Undecodable(#[from] DecodeError),
    #[error("no user id or email could be determined")]
    Incomplete,
}

/// Resolve the identity for a freshly issued credential.
pub fn resolve(
    response: &LoginResponse,
    credential: &Credential,
) -> Result<(Identity, ResolutionSource), ResolutionFailure> {
    let mut last_failure = ResolutionFailure::Incomplete;

    for source in ResolutionSource::PRIORITY {
        let attempt = match source {
            ResolutionSource::Nested => Ok(from_nested(response)),
            ResolutionSource::Flat => Ok(from_flat(response)),
            ResolutionSource::Claims => token_codec::decode(credential)
                .map(|claims| from_claims(&claims))
                .map_err(ResolutionFailure::from),
        };

        match attempt {
            Ok(Some(identity)) if identity.is_complete() => {
                debug!(?source, "identity resolved");
                return Ok((identity, source));
            }
            Ok(_) => continue,
            Err(failure) => last_failure = failure,
        }
    }

    Err(last_failure)
}

/// Claims-only resolution, used when a stored credential has lost its identity.
pub fn resolve_from_credential(credential: &Credential) -> Result<Identity, ResolutionFailure> {
    let claims = token_codec::decode(credential)?;
    from_claims(&claims)
        .filter(Identity::is_complete)
        .ok_or(ResolutionFailure::Incomplete)
}

fn from_nested(response: &LoginResponse) -> Option<Identity> {
    let user = response.user.as_ref()?;
    if user.is_null() {
        return None;
    }
    serde_json::from_value::<Identity>(user.clone()).ok()
}

fn from_flat(response: &LoginResponse) -> Option<Identity> {
    let email = response.email.as_deref().filter(|e| !e.is_empty())?;
    let id = response
        .id
        .as_deref()
        .filter(|id| !id.is_empty())
        .unwrap_or(email);

    Some(
        Identity::new(id, email)
            .with_names(
                response.first_name.clone().unwrap_or_default(),
                response.last_name.clone().unwrap_or_default(),
            )
            .with_roles(response.roles.clone().unwrap_or_default()),
    )
}

fn from_claims(claims: &UnverifiedClaims) -> Option<Identity> {
    let email = claims.email().or_else(|| claims.sub())?;
    let id = claims
        .user_id()
        .or_else(|| claims.id())
        .or_else(|| claims.sub())?;
    let roles = claims
        .roles()
        .or_else(|| claims.authorities())
        .unwrap_or_default();

    let first_name = claims.first_name().unwrap_or_else(|| {
        email
            .split('@')
            .next()
            .filter(|local| !local.is_empty())
            .unwrap_or("User")
            .to_string()
    });
    let last_name = claims.last_name().unwrap_or_default();

    Some(Identity {
        id,
        email,
        first_name,
        last_name,
        roles: dedupe_roles(roles.into_iter()),
    })
}
