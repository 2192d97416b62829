//! Google OAuth2 installed-app flow: consent URL, code exchange, refresh
//! and `token.json` persistence.

use axum::{extract::Query, extract::State, routing::get, Router};
use chrono::Utc;
use reqwest::{header, Client};
use serde::Deserialize;
use std::{fs, path::Path, sync::Arc};
use tokio::{
    net::TcpListener,
    sync::{oneshot, Mutex},
};
use tracing::{error, info, warn};
use url::{form_urlencoded, Url};

use crate::error::{GoalsError, Result};
use crate::models::oauth::{
    ClientSecrets, ClientSecretsFile, StoredToken, TokenErrorResponse, TokenResponse,
};

pub const DEFAULT_SCOPES: [&str; 4] = [
    "https://www.googleapis.com/auth/gmail.modify",
    "https://www.googleapis.com/auth/calendar",
    "https://www.googleapis.com/auth/gmail.send",
    "https://www.googleapis.com/auth/spreadsheets.readonly",
];

pub fn load_client_secrets<P: AsRef<Path>>(path: P) -> Result<ClientSecrets> {
    let path = path.as_ref();
    info!("Loading client secrets from {}", path.display());

    let text = fs::read_to_string(path).map_err(|e| {
        error!("Failed to read {}: {}", path.display(), e);
        GoalsError::Config(format!(
            "could not read client secrets at {}: {e}",
            path.display()
        ))
    })?;
    let file: ClientSecretsFile = serde_json::from_str(&text)?;

    file.secrets().cloned().ok_or_else(|| {
        GoalsError::Config(format!(
            "{} has neither an 'installed' nor a 'web' section",
            path.display()
        ))
    })
}

/// Consent page URL requesting offline access, so a refresh token is issued.
pub fn authorization_url(secrets: &ClientSecrets, redirect_uri: &str, scopes: &[&str]) -> Result<Url> {
    let mut url = Url::parse(&secrets.auth_uri)
        .map_err(|e| GoalsError::Config(format!("invalid auth_uri '{}': {e}", secrets.auth_uri)))?;

    url.query_pairs_mut()
        .append_pair("client_id", &secrets.client_id)
        .append_pair("redirect_uri", redirect_uri)
        .append_pair("response_type", "code")
        .append_pair("scope", &scopes.join(" "))
        .append_pair("access_type", "offline")
        .append_pair("prompt", "consent");

    info!("Generated authorization URL for client {}", secrets.client_id);
    Ok(url)
}

/// First registered redirect URI, falling back to plain localhost.
pub fn default_redirect_uri(secrets: &ClientSecrets) -> String {
    secrets
        .redirect_uris
        .first()
        .cloned()
        .unwrap_or_else(|| "http://localhost".to_string())
}

async fn post_token_form(client: &Client, token_uri: &str, params: &[(&str, &str)]) -> Result<TokenResponse> {
    let body = form_urlencoded::Serializer::new(String::new())
        .extend_pairs(params)
        .finish();

    let response = match client
        .post(token_uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(body)
        .send()
        .await
    {
        Ok(resp) => resp,
        Err(e) => {
            error!("Failed to send request to token endpoint: {}", e);
            return Err(e.into());
        }
    };

    let status = response.status();
    let text = response.text().await?;

    if !status.is_success() {
        error!("Token endpoint returned error status {}: {}", status, text);
        return Err(match serde_json::from_str::<TokenErrorResponse>(&text) {
            Ok(err) => GoalsError::OAuth(match err.error_description {
                Some(desc) => format!("{}: {desc}", err.error),
                None => err.error,
            }),
            Err(_) => GoalsError::Api {
                status: status.as_u16(),
                body: text,
            },
        });
    }

    let mut token: TokenResponse = serde_json::from_str(&text)?;
    if let Some(expires_in) = token.expires_in {
        token.expiry_date = Some(
            Utc::now()
                .timestamp_millis()
                .saturating_add(expires_in.saturating_mul(1000)),
        );
    }
    Ok(token)
}

pub async fn exchange_code(
    client: &Client,
    secrets: &ClientSecrets,
    code: &str,
    redirect_uri: &str,
) -> Result<TokenResponse> {
    info!("Exchanging authorization code for tokens");

    let token = post_token_form(
        client,
        &secrets.token_uri,
        &[
            ("grant_type", "authorization_code"),
            ("code", code),
            ("client_id", secrets.client_id.as_str()),
            ("client_secret", secrets.client_secret.as_str()),
            ("redirect_uri", redirect_uri),
        ],
    )
    .await?;

    if token.refresh_token.is_none() {
        warn!("Token response carried no refresh token; revoke access and re-consent to get one");
    }
    info!("Authorization code exchanged successfully");
    Ok(token)
}

pub async fn refresh_access_token(
    client: &Client,
    token_uri: &str,
    client_id: &str,
    client_secret: &str,
    refresh_token: &str,
) -> Result<TokenResponse> {
    info!("Refreshing access token");

    let token = post_token_form(
        client,
        token_uri,
        &[
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", client_id),
            ("client_secret", client_secret),
        ],
    )
    .await?;

    info!("Access token refreshed, expires in {:?}s", token.expires_in);
    Ok(token)
}

pub fn save_token<P: AsRef<Path>>(path: P, token: &StoredToken) -> Result<()> {
    let path = path.as_ref();
    let json = serde_json::to_string_pretty(token)?;
    fs::write(path, json)?;
    info!("Tokens saved to {}", path.display());
    Ok(())
}

pub fn load_token<P: AsRef<Path>>(path: P) -> Result<StoredToken> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|e| {
        error!("Failed to read {}: {}", path.display(), e);
        GoalsError::Config(format!("could not read token file {}: {e}", path.display()))
    })?;
    Ok(serde_json::from_str(&text)?)
}

/// `GOOGLE_CLIENT_ID`, `GOOGLE_CLIENT_SECRET` and `GOOGLE_REFRESH_TOKEN`,
/// for deployments that carry no `token.json`.
#[derive(Debug, Clone, Default)]
pub struct EnvCredentials {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub refresh_token: Option<String>,
}

impl EnvCredentials {
    /// An `authorized_user` token, only when all three values are set.
    pub fn stored_token(&self) -> Option<StoredToken> {
        match (&self.client_id, &self.client_secret, &self.refresh_token) {
            (Some(id), Some(secret), Some(refresh)) => Some(StoredToken {
                token_kind: Some("authorized_user".to_string()),
                client_id: Some(id.clone()),
                client_secret: Some(secret.clone()),
                refresh_token: Some(refresh.clone()),
                ..Default::default()
            }),
            _ => None,
        }
    }
}

/// Token from the environment when fully set, otherwise from `path`.
pub fn load_stored_token<P: AsRef<Path>>(env: &EnvCredentials, path: P) -> Result<StoredToken> {
    match env.stored_token() {
        Some(token) => {
            info!("Using refresh credentials from the environment");
            Ok(token)
        }
        None => load_token(path),
    }
}

/// Client credentials used when refreshing. These win over any client id or
/// secret stored in `token.json`.
#[derive(Debug, Clone, Default)]
pub struct RefreshCredentials {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub token_uri: Option<String>,
}

/// An access token usable right now: refreshed when a refresh token and
/// client credentials are at hand, otherwise the stored access token.
pub async fn resolve_access_token(
    client: &Client,
    stored: &StoredToken,
    creds: &RefreshCredentials,
) -> Result<String> {
    let client_id = creds.client_id.as_ref().or(stored.client_id.as_ref());
    let client_secret = creds.client_secret.as_ref().or(stored.client_secret.as_ref());

    match (&stored.refresh_token, client_id, client_secret) {
        (Some(refresh_token), Some(id), Some(secret)) => {
            let default_uri = crate::models::oauth::default_token_uri();
            let token_uri = creds.token_uri.as_deref().unwrap_or(&default_uri);
            let token = refresh_access_token(client, token_uri, id, secret, refresh_token).await?;
            Ok(token.access_token)
        }
        _ => match &stored.access_token {
            Some(access_token) => {
                warn!("No refresh credentials available, using stored access token as-is");
                Ok(access_token.clone())
            }
            None => Err(GoalsError::OAuth(
                "token file has neither a usable refresh token nor an access token".to_string(),
            )),
        },
    }
}

#[derive(Deserialize)]
struct RedirectParams {
    code: Option<String>,
    error: Option<String>,
}

type CodeSender = Arc<Mutex<Option<oneshot::Sender<Result<String>>>>>;

async fn redirect_handler(
    State(sender): State<CodeSender>,
    Query(params): Query<RedirectParams>,
) -> &'static str {
    let (outcome, page) = match (params.code, params.error) {
        (Some(code), _) => (Ok(code), "Authorization complete. You can close this tab."),
        (None, Some(err)) => (
            Err(GoalsError::OAuth(format!("authorization denied: {err}"))),
            "Authorization failed. Check the terminal for details.",
        ),
        (None, None) => return "Waiting for an authorization code.",
    };

    if let Some(tx) = sender.lock().await.take() {
        let _ = tx.send(outcome);
    }
    page
}

/// Serves the loopback redirect on `listener` until the first code (or
/// error) arrives, then shuts down.
pub async fn capture_redirect(listener: TcpListener) -> Result<String> {
    let (tx, rx) = oneshot::channel();
    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let sender: CodeSender = Arc::new(Mutex::new(Some(tx)));

    let app = Router::new()
        .route("/", get(redirect_handler))
        .with_state(sender);

    info!("Waiting for OAuth redirect on {:?}", listener.local_addr().ok());
    let server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = stop_rx.await;
            })
            .await
    });

    let outcome = rx
        .await
        .map_err(|_| GoalsError::OAuth("redirect listener closed before a code arrived".to_string()));
    let _ = stop_tx.send(());

    match server.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => error!("Redirect listener failed: {}", e),
        Err(e) => error!("Redirect listener task panicked: {}", e),
    }

    outcome?
}
