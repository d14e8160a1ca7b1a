use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::errors::OidcError;

/// Decoded userinfo response.
///
/// Construction guarantees a JSON object with a non-empty `email` claim;
/// everything else is read through typed accessors.
#[derive(Debug, Clone, PartialEq)]
pub struct Profile {
    claims: Map<String, Value>,
}

impl Profile {
    pub fn from_value(value: Value) -> Result<Self, OidcError> {
        let Value::Object(claims) = value else {
            return Err(OidcError::Authentication(
                "The userinfo response is not a JSON object".to_string(),
            ));
        };

        let has_email = claims
            .get("email")
            .and_then(Value::as_str)
            .is_some_and(|e| !e.is_empty());
        if !has_email {
            return Err(OidcError::Authentication(
                "An email field was not returned in the profile parameter, but is required."
                    .to_string(),
            ));
        }

        Ok(Self { claims })
    }

    pub fn email(&self) -> &str {
        self.string("email").unwrap_or_default()
    }

    pub fn name(&self) -> Option<&str> {
        self.string("name")
    }

    pub fn username(&self) -> Option<&str> {
        self.string("username")
    }

    /// `sub`, falling back to `id`. Numeric identifiers are rendered as strings.
    pub fn subject(&self) -> Option<String> {
        ["sub", "id"]
            .iter()
            .filter_map(|key| match self.claims.get(*key) {
                Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
                Some(Value::Number(n)) => Some(n.to_string()),
                _ => None,
            })
            .next()
    }

    pub fn picture(&self) -> Option<&str> {
        self.string("picture")
    }

    /// Group labels in the order the identity provider returned them.
    ///
    /// The order is whatever the provider sends and is not sorted here.
    /// A missing claim is an empty list; non-string entries are skipped.
    pub fn groups(&self) -> Vec<&str> {
        self.claims
            .get("groups")
            .and_then(Value::as_array)
            .map(|groups| groups.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }

    pub fn claim(&self, path: &ClaimPath) -> Option<&str> {
        path.resolve(&self.claims)
    }

    fn string(&self, key: &str) -> Option<&str> {
        self.claims
            .get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }
}

/// Dot-separated path to a string claim, e.g. `preferred_username` or
/// `attributes.login`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimPath {
    segments: Vec<String>,
}

impl ClaimPath {
    pub fn parse(path: &str) -> Self {
        Self {
            segments: path
                .split('.')
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
        }
    }

    fn resolve<'a>(&self, claims: &'a Map<String, Value>) -> Option<&'a str> {
        let (last, parents) = self.segments.split_last()?;
        let mut current = claims;
        for segment in parents {
            current = current.get(segment)?.as_object()?;
        }
        current
            .get(last)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }
}

/// Query or form parameters the identity provider sends to the callback.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthResponse {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

/// Token endpoint response.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TokenSet {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub id_token: Option<String>,
}

/// Which client started the login.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Client {
    #[default]
    Web,
    Desktop,
}

impl Client {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Web => "web",
            Self::Desktop => "desktop",
        }
    }
}

impl std::str::FromStr for Client {
    type Err = OidcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "web" => Ok(Self::Web),
            "desktop" => Ok(Self::Desktop),
            _ => Err(OidcError::StateMismatch(format!("Unknown client: {s}"))),
        }
    }
}

/// Content of the state cookie: `<host>|<nonce>|<client>`.
///
/// `host` is the team domain the login was started from and decides the
/// secondary tenant switch at callback time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginState {
    pub host: String,
    pub nonce: String,
    pub client: Client,
}

impl LoginState {
    pub fn encode(&self) -> String {
        format!("{}|{}|{}", self.host, self.nonce, self.client.as_str())
    }

    pub fn parse(value: &str) -> Result<Self, OidcError> {
        let mut parts = value.split('|');
        let host = parts.next().unwrap_or_default().to_string();
        let nonce = parts
            .next()
            .filter(|n| !n.is_empty())
            .ok_or_else(|| OidcError::StateMismatch("State cookie has no nonce".to_string()))?
            .to_string();
        let client = match parts.next() {
            Some(c) if !c.is_empty() => c.parse()?,
            _ => Client::default(),
        };
        Ok(Self {
            host,
            nonce,
            client,
        })
    }
}
