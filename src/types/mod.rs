use chrono::{DateTime, NaiveDateTime, Utc};
use serde::de::{Deserializer, Error as _, Unexpected};
use serde::{Deserialize, Serialize, Serializer};
use url::Url;

use std::fmt::{Debug, Formatter, Result as FormatterResult};
use std::hash::{Hash, Hasher};
use std::ops::Deref;


/// Name under which the strategy registers itself, and the `provider` tag of every profile.
pub const PROVIDER_NAME: &str = "eve";

/// Provider tag of a normalized profile.
///
/// This is a zero-sized marker that always serializes as `"eve"` and refuses to deserialize from
/// anything else, so a profile's provider can never disagree with the strategy that produced it.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct EveProvider;
impl EveProvider {
    /// Returns the provider tag (`"eve"`).
    pub fn as_str(&self) -> &'static str {
        PROVIDER_NAME
    }
}
impl AsRef<str> for EveProvider {
    fn as_ref(&self) -> &str {
        PROVIDER_NAME
    }
}
impl Serialize for EveProvider {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(PROVIDER_NAME)
    }
}
impl<'de> Deserialize<'de> for EveProvider {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        if value == PROVIDER_NAME {
            Ok(EveProvider)
        } else {
            Err(D::Error::invalid_value(
                Unexpected::Str(&value),
                &"the provider tag \"eve\"",
            ))
        }
    }
}

/// URL of the SSO endpoint that returns the character associated with an access token.
#[derive(Clone)]
pub struct CharacterUrl(Url, String);
impl CharacterUrl {
    /// Parse a string as a character URL.
    pub fn new(url: String) -> Result<Self, url::ParseError> {
        Ok(CharacterUrl(Url::parse(&url)?, url))
    }
    /// Create a character URL from an already-parsed `Url`.
    pub fn from_url(url: Url) -> Self {
        let s = url.to_string();
        CharacterUrl(url, s)
    }
    /// Return this URL as a parsed `Url`.
    pub fn url(&self) -> &Url {
        &self.0
    }
    /// Return this URL exactly as it was configured.
    pub fn as_str(&self) -> &str {
        &self.1
    }
}
impl Deref for CharacterUrl {
    type Target = String;
    fn deref(&self) -> &String {
        &self.1
    }
}
impl Debug for CharacterUrl {
    fn fmt(&self, f: &mut Formatter) -> FormatterResult {
        f.debug_tuple("CharacterUrl").field(&self.1).finish()
    }
}
impl PartialEq for CharacterUrl {
    fn eq(&self, other: &Self) -> bool {
        self.1 == other.1
    }
}
impl Eq for CharacterUrl {}
impl Hash for CharacterUrl {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.1.hash(state);
    }
}
impl Serialize for CharacterUrl {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.1)
    }
}
impl<'de> Deserialize<'de> for CharacterUrl {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let url = String::deserialize(deserializer)?;
        CharacterUrl::new(url).map_err(D::Error::custom)
    }
}

new_type![
    /// Character identifier, stringified from the provider's `CharacterID` field.
    #[derive(Deserialize, Serialize)]
    CharacterId(String)
];

new_type![
    /// Name of the authenticated character.
    #[derive(Deserialize, Serialize)]
    CharacterName(String)
];

new_type![
    /// Hash identifying the account that currently owns the character.
    ///
    /// The hash changes when the character is transferred to another account, so applications
    /// should compare it on each login when linking characters to users.
    #[derive(Deserialize, Serialize)]
    CharacterOwnerHash(String)
];

new_type![
    /// Type of the access token the profile was fetched with (typically `Character`).
    #[derive(Deserialize, Serialize)]
    ProfileTokenType(String)
];

new_type![
    /// Expiry timestamp exactly as reported by the provider.
    #[derive(Deserialize, Serialize)]
    ExpiresOn(String)
    impl {
        /// Interprets the timestamp as a UTC instant.
        ///
        /// The SSO reports `ExpiresOn` without a zone designator (e.g. `2024-01-01T00:00:00`,
        /// optionally with fractional seconds), which is UTC. RFC 3339 timestamps are accepted
        /// too. Returns `None` if the value matches neither form.
        pub fn to_utc(&self) -> Option<DateTime<Utc>> {
            NaiveDateTime::parse_from_str(&self.0, "%Y-%m-%dT%H:%M:%S%.f")
                .map(|naive| naive.and_utc())
                .or_else(|_| {
                    DateTime::parse_from_rfc3339(&self.0).map(|dt| dt.with_timezone(&Utc))
                })
                .ok()
        }
    }
];

/// Scopes granted to the access token, in the shape the provider returned them.
///
/// The SSO sends a single space-delimited string, but the value is passed through unchanged so
/// that providers (or proxies) returning an array are preserved as well.
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Scopes {
    /// Space-delimited scope string.
    Delimited(String),
    /// Scope list.
    List(Vec<String>),
}
impl Scopes {
    /// Iterates over the individual scopes, splitting a delimited string on whitespace.
    pub fn iter(&self) -> Box<dyn Iterator<Item = &str> + '_> {
        match self {
            Scopes::Delimited(scopes) => Box::new(scopes.split_whitespace()),
            Scopes::List(scopes) => Box::new(scopes.iter().map(String::as_str)),
        }
    }

    /// Returns `true` if `scope` was granted.
    pub fn contains(&self, scope: &str) -> bool {
        self.iter().any(|granted| granted == scope)
    }
}
