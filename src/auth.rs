use std::fs;
use std::path::Path;
use std::time::Instant;
use std::collections::HashSet;

use anyhow::Result;
use chrono::{DateTime, Utc};
use rspotify::Token;

const SPOTIFY_CLIENT_ID: &str = "492e1e45ea814fa3ac555fe1576aaf5b";
const SPOTIFY_REDIRECT_URI: &str = "http://127.0.0.1:8898/login";
pub const SCOPES: &str =
    "playlist-read-private playlist-read-collaborative playlist-modify-private playlist-modify-public user-top-read";

const RESPONSE: &str = r#"
<!doctype html>
<html>
<head><title>Success</title></head>
<body><h1>Authentication Successful!</h1><script>window.close();</script></body>
</html>
"#;
const CACHE: &str = ".cache";
const REFRESH_TOKEN_FILE: &str = ".cache/refresh_token";

#[derive(Clone)]
pub struct AuthResult {
    pub rspotify_token: Token,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
}

/// Access token obtained from a refresh
pub struct RefreshedToken {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
}

fn oauth_builder() -> librespot_oauth::OAuthClientBuilder {
    librespot_oauth::OAuthClientBuilder::new(
        SPOTIFY_CLIENT_ID,
        SPOTIFY_REDIRECT_URI,
        SCOPES.split_whitespace().collect(),
    )
}

fn to_utc(expires_at: Instant) -> DateTime<Utc> {
    let remaining = expires_at.saturating_duration_since(Instant::now());
    Utc::now() + chrono::Duration::from_std(remaining).unwrap_or_else(|_| chrono::Duration::seconds(3600))
}

fn store_refresh_token(refresh_token: &str) {
    let cache_dir = Path::new(CACHE);
    if !cache_dir.exists() {
        let _ = fs::create_dir_all(cache_dir);
    }
    if let Err(e) = fs::write(REFRESH_TOKEN_FILE, refresh_token) {
        tracing::warn!(error = %e, "Could not persist refresh token");
    } else {
        tracing::debug!("Saved refresh token to disk");
    }
}

pub fn rspotify_token(access_token: String, expires_at: DateTime<Utc>) -> Token {
    Token {
        access_token,
        expires_in: expires_at - Utc::now(),
        expires_at: Some(expires_at),
        scopes: SCOPES
            .split_whitespace()
            .map(|s| s.to_string())
            .collect::<HashSet<String>>(),
        refresh_token: None,
    }
}

async fn perform_browser_auth() -> Result<RefreshedToken> {
    tracing::info!("Starting browser-based OAuth flow");
    let client = oauth_builder()
        .open_in_browser()
        .with_custom_message(RESPONSE)
        .build()?;

    let token = client.get_access_token_async().await?;
    store_refresh_token(&token.refresh_token);

    tracing::info!("Browser authentication completed successfully");
    Ok(RefreshedToken {
        access_token: token.access_token,
        refresh_token: token.refresh_token,
        expires_at: to_utc(token.expires_at),
    })
}

pub async fn refresh_access_token(refresh_token: &str) -> Result<RefreshedToken> {
    let client = oauth_builder().build()?;
    let token = client.refresh_token_async(refresh_token).await?;
    store_refresh_token(&token.refresh_token);

    Ok(RefreshedToken {
        access_token: token.access_token,
        refresh_token: token.refresh_token,
        expires_at: to_utc(token.expires_at),
    })
}

pub async fn perform_oauth_flow() -> Result<AuthResult> {
    let stored_refresh_token = fs::read_to_string(REFRESH_TOKEN_FILE).ok();

    let token = if let Some(refresh_token) = stored_refresh_token {
        tracing::info!("Found cached refresh token");
        match refresh_access_token(refresh_token.trim()).await {
            Ok(token) => {
                tracing::debug!("Token refreshed successfully");
                token
            }
            Err(e) => {
                tracing::warn!(error = %e, "Cached refresh token failed, re-authenticating");
                perform_browser_auth().await?
            }
        }
    } else {
        tracing::info!("No cached credentials found, starting browser authentication");
        perform_browser_auth().await?
    };

    Ok(AuthResult {
        rspotify_token: rspotify_token(token.access_token, token.expires_at),
        refresh_token: token.refresh_token,
        expires_at: token.expires_at,
    })
}
