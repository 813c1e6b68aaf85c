use anyhow::{Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

const AUTH_ENDPOINT: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const TOKEN_ENDPOINT: &str = "https://oauth2.googleapis.com/token";
const USERINFO_ENDPOINT: &str = "https://www.googleapis.com/oauth2/v2/userinfo";

/// Identity returned by the provider after a successful code exchange.
#[derive(Debug, Clone, Deserialize)]
pub struct GoogleProfile {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    pub picture: Option<String>,
}

#[derive(Serialize)]
struct TokenRequest<'a> {
    code: &'a str,
    client_id: &'a str,
    client_secret: &'a str,
    redirect_uri: &'a str,
    grant_type: &'a str,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Google OAuth2 client: consent URL, code exchange, profile fetch.
#[derive(Clone)]
pub struct GoogleOAuthClient {
    client: Client,
    client_id: String,
    client_secret: String,
    redirect_url: String,
}

impl GoogleOAuthClient {
    pub fn new(client_id: String, client_secret: String, redirect_url: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .user_agent("genai-chat/oauth")
            .build()
            .expect("Failed to build reqwest client");

        Self {
            client,
            client_id,
            client_secret,
            redirect_url,
        }
    }

    /// Consent-screen URL the browser is redirected to.
    pub fn authorize_url(&self) -> String {
        let mut url = Url::parse(AUTH_ENDPOINT).expect("static endpoint URL");
        url.query_pairs_mut()
            .append_pair("client_id", &self.client_id)
            .append_pair("redirect_uri", &self.redirect_url)
            .append_pair("response_type", "code")
            .append_pair("scope", "profile email")
            .append_pair("prompt", "select_account");
        url.to_string()
    }

    /// Exchange an authorization code for the user's profile.
    pub async fn exchange_code(&self, code: &str) -> Result<GoogleProfile> {
        let request = TokenRequest {
            code,
            client_id: &self.client_id,
            client_secret: &self.client_secret,
            redirect_uri: &self.redirect_url,
            grant_type: "authorization_code",
        };

        let response = self
            .client
            .post(TOKEN_ENDPOINT)
            .form(&request)
            .send()
            .await
            .context("Failed to reach Google token endpoint")?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            anyhow::bail!("Google token exchange failed {}: {}", status, text);
        }

        let token: TokenResponse = response
            .json()
            .await
            .context("Failed to parse token response")?;

        let response = self
            .client
            .get(USERINFO_ENDPOINT)
            .bearer_auth(&token.access_token)
            .send()
            .await
            .context("Failed to reach Google userinfo endpoint")?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            anyhow::bail!("Google userinfo failed {}: {}", status, text);
        }

        response
            .json()
            .await
            .context("Failed to parse Google profile")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authorize_url_carries_client_and_redirect() {
        let client = GoogleOAuthClient::new(
            "cid".into(),
            "secret".into(),
            "http://localhost:3000/google-auth/callback".into(),
        );
        let url = Url::parse(&client.authorize_url()).unwrap();
        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();

        assert!(pairs.contains(&("client_id".into(), "cid".into())));
        assert!(pairs.contains(&("response_type".into(), "code".into())));
        assert!(pairs
            .iter()
            .any(|(k, v)| k == "redirect_uri" && v.contains("/google-auth/callback")));
    }
}
