use std::collections::BTreeMap;

use http::header::HeaderMap;
use url::Url;

use crate::oidc::config::LOGIN_QUERY_KEYS;
use crate::oidc::errors::OidcError;
use crate::oidc::strategy::OidcStrategy;
use crate::oidc::types::{Client, LoginState, TokenSet};
use crate::utils::gen_random_string;

use super::utils::set_state_cookie;

impl OidcStrategy {
    /// Authorization endpoint URL for one login attempt.
    ///
    /// The hook sees the original query without [`LOGIN_QUERY_KEYS`]. Its
    /// parameters go in first and the strategy's own are written over them.
    pub fn authorization_url(
        &self,
        original_query: &[(String, String)],
        nonce: &str,
    ) -> Result<String, OidcError> {
        let config = &self.config;

        let forwarded: Vec<(String, String)> = original_query
            .iter()
            .filter(|(key, _)| !LOGIN_QUERY_KEYS.contains(&key.as_str()))
            .cloned()
            .collect();

        let mut params: BTreeMap<String, String> = self
            .params
            .authorization_params(&forwarded)
            .into_iter()
            .collect();

        params.insert("response_type".to_string(), "code".to_string());
        params.insert("client_id".to_string(), config.client_id.clone());
        params.insert("redirect_uri".to_string(), config.callback_url.clone());
        params.insert("scope".to_string(), config.scopes.join(" "));
        params.insert("state".to_string(), nonce.to_string());

        let mut url = Url::parse(&config.auth_uri).map_err(|e| {
            OidcError::Configuration(format!("Invalid OIDC_AUTH_URI '{}': {e}", config.auth_uri))
        })?;
        url.query_pairs_mut().extend_pairs(params.iter());

        Ok(url.into())
    }

    /// Start a login: pick a nonce, remember it with the originating host and
    /// client in the state cookie, and return the URL to redirect to.
    pub fn prepare_oidc_auth_request(
        &self,
        original_query: &[(String, String)],
        host: &str,
        client: Client,
    ) -> Result<(String, HeaderMap), OidcError> {
        let state = LoginState {
            host: host.to_string(),
            nonce: gen_random_string(32)?,
            client,
        };

        let auth_url = self.authorization_url(original_query, &state.nonce)?;

        let mut headers = HeaderMap::new();
        set_state_cookie(&mut headers, &self.config, &state)?;

        tracing::debug!(host, client = client.as_str(), "Redirecting to identity provider");

        Ok((auth_url, headers))
    }

    /// Exchange an authorization code at the token endpoint.
    pub async fn exchange_code(&self, code: &str) -> Result<TokenSet, OidcError> {
        let config = &self.config;
        let response = self
            .client
            .post(&config.token_uri)
            .header(http::header::ACCEPT, "application/json")
            .form(&[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("client_id", config.client_id.as_str()),
                ("client_secret", config.client_secret.as_str()),
                ("redirect_uri", config.callback_url.as_str()),
            ])
            .send()
            .await
            .map_err(|e| OidcError::TokenExchange(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::debug!("Token exchange failed with {status}: {body}");
            return Err(OidcError::TokenExchange(status.to_string()));
        }

        let tokens: TokenSet = response
            .json()
            .await
            .map_err(|e| OidcError::TokenExchange(e.to_string()))?;

        if tokens.access_token.is_empty() {
            return Err(OidcError::TokenExchange(
                "Access token not present in response".to_string(),
            ));
        }

        Ok(tokens)
    }
}
