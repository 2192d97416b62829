use reqwest::{header, Client, Response};
use tracing::{error, info, warn};
use url::Url;

use crate::error::{GoalsError, Result};
use crate::models::{
    goals::SheetRange,
    sheets::{Spreadsheet, ValueRange},
};

pub const SHEETS_API_BASE: &str = "https://sheets.googleapis.com";

pub fn sheets_client_init(access_token: &str) -> Result<Client> {
    info!("Initializing Sheets client");

    let bearer = match header::HeaderValue::from_str(&format!("Bearer {access_token}")) {
        Ok(mut value) => {
            value.set_sensitive(true);
            value
        }
        Err(e) => {
            error!("Failed to create Authorization header value: {}", e);
            return Err(GoalsError::OAuth(format!("invalid access token: {e}")));
        }
    };

    let mut headers = header::HeaderMap::new();
    headers.insert(header::AUTHORIZATION, bearer);
    headers.insert(
        header::ACCEPT,
        header::HeaderValue::from_static("application/json"),
    );

    match Client::builder().default_headers(headers).build() {
        Ok(client) => {
            info!("Sheets client initialized successfully");
            Ok(client)
        }
        Err(e) => {
            error!("Failed to build Sheets client: {}", e);
            Err(e.into())
        }
    }
}

/// `{base}/v4/spreadsheets/{id}` plus any extra path segments, each
/// percent-encoded (A1 ranges contain spaces and `!`).
fn spreadsheet_url(base_url: &str, spreadsheet_id: &str, extra: &[&str]) -> Result<Url> {
    let mut url = Url::parse(base_url)
        .map_err(|e| GoalsError::Config(format!("invalid Sheets API base url '{base_url}': {e}")))?;
    {
        let mut segments = url
            .path_segments_mut()
            .map_err(|_| GoalsError::Config(format!("Sheets API base url '{base_url}' cannot be a base")))?;
        segments.pop_if_empty();
        segments.extend(["v4", "spreadsheets", spreadsheet_id]);
        segments.extend(extra);
    }
    Ok(url)
}

async fn checked(response: Response, spreadsheet_id: &str) -> Result<String> {
    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        error!("Sheets API returned error status {}: {}", status, body);
        if status == reqwest::StatusCode::FORBIDDEN {
            warn!(
                "Permission denied for spreadsheet {}. Make sure it is shared with the authenticated account.",
                spreadsheet_id
            );
        }
        return Err(GoalsError::Api {
            status: status.as_u16(),
            body,
        });
    }

    match response.text().await {
        Ok(text) => Ok(text),
        Err(e) => {
            error!("Failed to read response body: {}", e);
            Err(e.into())
        }
    }
}

pub async fn fetch_values(
    client: &Client,
    base_url: &str,
    spreadsheet_id: &str,
    range: &str,
) -> Result<SheetRange> {
    let url = spreadsheet_url(base_url, spreadsheet_id, &["values", range])?;
    info!("Reading range '{}' from spreadsheet {}", range, spreadsheet_id);

    let response = match client.get(url).send().await {
        Ok(resp) => resp,
        Err(e) => {
            error!("Failed to send request to Sheets API: {}", e);
            return Err(e.into());
        }
    };
    let text = checked(response, spreadsheet_id).await?;

    match serde_json::from_str::<ValueRange>(&text) {
        Ok(value_range) => {
            info!(
                "Received {} rows for range {:?}",
                value_range.values.len(),
                value_range.range
            );
            Ok(value_range.into())
        }
        Err(e) => {
            error!("Failed to parse values response: {}", e);
            error!("Raw response: {}", text);
            Err(e.into())
        }
    }
}

pub async fn fetch_spreadsheet(
    client: &Client,
    base_url: &str,
    spreadsheet_id: &str,
) -> Result<Spreadsheet> {
    let url = spreadsheet_url(base_url, spreadsheet_id, &[])?;
    info!("Retrieving spreadsheet metadata for {}", spreadsheet_id);

    let response = match client.get(url).send().await {
        Ok(resp) => resp,
        Err(e) => {
            error!("Failed to send request to Sheets API: {}", e);
            return Err(e.into());
        }
    };
    let text = checked(response, spreadsheet_id).await?;

    match serde_json::from_str::<Spreadsheet>(&text) {
        Ok(sheet) => {
            info!(
                "Spreadsheet '{}' has {} tabs",
                sheet.properties.title,
                sheet.sheets.len()
            );
            Ok(sheet)
        }
        Err(e) => {
            error!("Failed to parse spreadsheet response: {}", e);
            Err(e.into())
        }
    }
}
