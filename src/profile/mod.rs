use crate::helpers::stringify;
use crate::types::{
    CharacterId, CharacterName, CharacterOwnerHash, EveProvider, ExpiresOn, ProfileTokenType,
    Scopes,
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use serde_with::skip_serializing_none;
use thiserror::Error;

use std::ops::Deref;
use std::str::FromStr;

#[cfg(test)]
mod tests;

const CHARACTER_ID: &str = "CharacterID";
const CHARACTER_NAME: &str = "CharacterName";
const CHARACTER_OWNER_HASH: &str = "CharacterOwnerHash";
const EXPIRES_ON: &str = "ExpiresOn";
const SCOPES: &str = "Scopes";
const TOKEN_TYPE: &str = "TokenType";

/// Character profile normalized from the SSO's verify response.
///
/// Mapping is lenient: a field that the provider omitted (or sent as `null`) is `None`, and no
/// field is ever rejected for having an unexpected type. Non-string scalars are stringified,
/// which is how a numeric `CharacterID` becomes the string [`id`](Self::id).
///
/// Serializes as `{provider, id, name, expires, scopes, tokenType, characterOwnerHash}` with
/// absent fields omitted.
#[skip_serializing_none]
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EveProfile {
    #[serde(default)]
    provider: EveProvider,
    id: Option<CharacterId>,
    name: Option<CharacterName>,
    expires: Option<ExpiresOn>,
    scopes: Option<Scopes>,
    token_type: Option<ProfileTokenType>,
    character_owner_hash: Option<CharacterOwnerHash>,
}
impl EveProfile {
    /// Normalizes an already-parsed verify response.
    ///
    /// Never fails. A value that is not a JSON object produces a profile with every field
    /// except [`provider`](Self::provider) absent.
    pub fn from_value(json: &Value) -> Self {
        let field = |name: &str| json.get(name).filter(|value| !value.is_null());

        EveProfile {
            provider: EveProvider,
            id: field(CHARACTER_ID).and_then(stringify).map(CharacterId::new),
            name: field(CHARACTER_NAME)
                .and_then(stringify)
                .map(CharacterName::new),
            expires: field(EXPIRES_ON).and_then(stringify).map(ExpiresOn::new),
            scopes: field(SCOPES).map(|value| match value {
                Value::Array(scopes) => Scopes::List(
                    scopes
                        .iter()
                        .map(|scope| stringify(scope).unwrap_or_else(|| scope.to_string()))
                        .collect(),
                ),
                other => Scopes::Delimited(stringify(other).unwrap_or_default()),
            }),
            token_type: field(TOKEN_TYPE)
                .and_then(stringify)
                .map(ProfileTokenType::new),
            character_owner_hash: field(CHARACTER_OWNER_HASH)
                .and_then(stringify)
                .map(CharacterOwnerHash::new),
        }
    }

    /// Provider tag; always `"eve"`.
    pub fn provider(&self) -> &'static str {
        self.provider.as_str()
    }
    /// Character identifier (`CharacterID`).
    pub fn id(&self) -> Option<&CharacterId> {
        self.id.as_ref()
    }
    /// Character name (`CharacterName`).
    pub fn name(&self) -> Option<&CharacterName> {
        self.name.as_ref()
    }
    /// Token expiry exactly as reported (`ExpiresOn`).
    pub fn expires(&self) -> Option<&ExpiresOn> {
        self.expires.as_ref()
    }
    /// Token expiry as a UTC instant, if present and in a recognized format.
    ///
    /// See [`ExpiresOn::to_utc`].
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires.as_ref().and_then(ExpiresOn::to_utc)
    }
    /// Granted scopes (`Scopes`).
    pub fn scopes(&self) -> Option<&Scopes> {
        self.scopes.as_ref()
    }
    /// Token type (`TokenType`).
    pub fn token_type(&self) -> Option<&ProfileTokenType> {
        self.token_type.as_ref()
    }
    /// Owner hash (`CharacterOwnerHash`).
    pub fn character_owner_hash(&self) -> Option<&CharacterOwnerHash> {
        self.character_owner_hash.as_ref()
    }
}
impl From<&Value> for EveProfile {
    fn from(json: &Value) -> Self {
        EveProfile::from_value(json)
    }
}
impl FromStr for EveProfile {
    type Err = ProfileParseError;

    /// Parses a serialized verify response and normalizes it.
    fn from_str(json: &str) -> Result<Self, Self::Err> {
        let value: Value = serde_json::from_str(json).map_err(ProfileParseError)?;
        Ok(EveProfile::from_value(&value))
    }
}

/// A serialized verify response passed to [`EveProfile::from_str`] was not valid JSON.
#[derive(Debug, Error)]
#[error("Failed to parse character profile JSON")]
pub struct ProfileParseError(#[source] pub serde_json::Error);

/// Profile returned by a successful fetch: the normalized [`EveProfile`] together with the raw
/// response it was built from.
///
/// Dereferences to [`EveProfile`].
#[derive(Clone, Debug, PartialEq)]
pub struct UserProfile {
    profile: EveProfile,
    raw: String,
    json: Value,
}
impl UserProfile {
    /// Normalizes `json` and keeps it alongside the response body it was parsed from.
    pub fn new(raw: String, json: Value) -> Self {
        UserProfile {
            profile: EveProfile::from_value(&json),
            raw,
            json,
        }
    }

    /// Normalized profile.
    pub fn profile(&self) -> &EveProfile {
        &self.profile
    }
    /// Response body exactly as received.
    pub fn raw(&self) -> &str {
        &self.raw
    }
    /// Parsed response body.
    pub fn json(&self) -> &Value {
        &self.json
    }
    /// Splits into the normalized profile, the raw body, and the parsed body.
    pub fn into_parts(self) -> (EveProfile, String, Value) {
        (self.profile, self.raw, self.json)
    }
}
impl Deref for UserProfile {
    type Target = EveProfile;
    fn deref(&self) -> &EveProfile {
        &self.profile
    }
}
