use serde::{Deserialize, Serialize};

/// The client secrets file downloaded from the Cloud Console.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ClientSecretsFile {
    pub installed: Option<ClientSecrets>,
    pub web: Option<ClientSecrets>,
}

impl ClientSecretsFile {
    /// Desktop (`installed`) credentials take precedence over `web` ones.
    pub fn secrets(&self) -> Option<&ClientSecrets> {
        self.installed.as_ref().or(self.web.as_ref())
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ClientSecrets {
    pub client_id: String,
    pub client_secret: String,
    #[serde(default)]
    pub redirect_uris: Vec<String>,
    #[serde(default = "default_auth_uri")]
    pub auth_uri: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
    pub project_id: Option<String>,
}

pub fn default_auth_uri() -> String {
    "https://accounts.google.com/o/oauth2/auth".to_string()
}

pub fn default_token_uri() -> String {
    "https://oauth2.googleapis.com/token".to_string()
}

/// Body returned by the token endpoint.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,
    /// Absolute expiry in epoch milliseconds, filled in before persisting.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiry_date: Option<i64>,
}

#[derive(Deserialize, Debug)]
pub struct TokenErrorResponse {
    pub error: String,
    pub error_description: Option<String>,
}

/// Contents of `token.json`. Both the raw token shape and the
/// `authorized_user` shape deserialize into this.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct StoredToken {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub token_kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiry_date: Option<i64>,
}

impl StoredToken {
    pub fn authorized_user(secrets: &ClientSecrets, refresh_token: &str) -> Self {
        Self {
            token_kind: Some("authorized_user".to_string()),
            client_id: Some(secrets.client_id.clone()),
            client_secret: Some(secrets.client_secret.clone()),
            refresh_token: Some(refresh_token.to_string()),
            ..Default::default()
        }
    }
}

impl From<TokenResponse> for StoredToken {
    fn from(token: TokenResponse) -> Self {
        Self {
            token_kind: None,
            access_token: Some(token.access_token),
            refresh_token: token.refresh_token,
            client_id: None,
            client_secret: None,
            scope: token.scope,
            token_type: token.token_type,
            expiry_date: token.expiry_date,
        }
    }
}
