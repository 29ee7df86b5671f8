//! Blocking REST plumbing shared by the provider clients.

use log::debug;
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::StatusCode;
use serde::Serialize;

use crate::config::ClientConfig;
use crate::constants::USER_AGENT;
use crate::error::{Error, Result};
use crate::repository::ProviderKind;

/// A basic-auth HTTP client bound to one provider account.
pub struct RestClient {
    client: Client,
    provider: ProviderKind,
    username: String,
    secret: String,
}

impl RestClient {
    pub fn new(config: &ClientConfig, provider: ProviderKind) -> Result<Self> {
        let client = Client::builder().user_agent(USER_AGENT).timeout(config.timeout).build()?;
        Ok(Self {
            client,
            provider,
            username: config.username.clone(),
            secret: config.secret.clone(),
        })
    }

    fn send(&self, request: RequestBuilder) -> Result<Response> {
        Ok(request.basic_auth(&self.username, Some(&self.secret)).send()?)
    }

    pub fn get(&self, url: &str) -> Result<Response> {
        debug!("GET {url}");
        self.send(self.client.get(url))
    }

    pub fn post_json<T: Serialize + ?Sized>(&self, url: &str, body: &T) -> Result<Response> {
        debug!("POST {url}");
        self.send(self.client.post(url).json(body))
    }

    pub fn put_json<T: Serialize + ?Sized>(&self, url: &str, body: &T) -> Result<Response> {
        debug!("PUT {url}");
        self.send(self.client.put(url).json(body))
    }

    /// Maps an existence probe onto 200 → true and 404 → false.
    ///
    /// # Errors
    /// * `Error::UnauthorizedError` on 401
    /// * `Error::UnexpectedStatusError` on any other status
    pub fn exists(&self, url: &str) -> Result<bool> {
        let response = self.get(url)?;
        match response.status() {
            StatusCode::OK => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            status => Err(self.status_error(status, url)),
        }
    }

    /// Passes successful responses through and turns the rest into errors.
    pub fn expect_success(&self, response: Response, url: &str) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        Err(self.status_error(status, url))
    }

    fn status_error(&self, status: StatusCode, url: &str) -> Error {
        if status == StatusCode::UNAUTHORIZED {
            return Error::UnauthorizedError {
                provider: self.provider.to_string(),
                url: url.to_string(),
            };
        }
        Error::UnexpectedStatusError { status: status.as_u16(), url: url.to_string() }
    }
}
