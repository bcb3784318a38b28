// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Caller-facing authenticated API client.
//!
//! Every call goes out with the current credential. An expired-credential
//! response is handed to the [`RefreshCoordinator`], which renews once for the
//! whole process and reissues the call; callers only ever see the final
//! success or failure.

use std::sync::Arc;

use reqwest::cookie::Jar;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::authenticator::RequestAuthenticator;
use crate::config::ClientConfig;
use crate::coordinator::RefreshCoordinator;
use crate::credential::{Credential, CredentialStore};
use crate::dispatcher::RetryDispatcher;
use crate::error::RequestError;
use crate::event::{AuthEvent, EVENT_CHANNEL_CAPACITY};
use crate::renewal::{RenewalExchange, TokenResponse};
use crate::request::{ApiResponse, RequestDescriptor};
use crate::signal::ExpirySignal;
use crate::terminator::{Navigator, SessionTerminator};
use crate::tls::ensure_crypto_provider;

pub struct AuthClient {
    config: ClientConfig,
    store: CredentialStore,
    authenticator: RequestAuthenticator,
    dispatcher: RetryDispatcher,
    coordinator: Arc<RefreshCoordinator>,
    terminator: SessionTerminator,
    events: broadcast::Sender<AuthEvent>,
}

impl AuthClient {
    /// Build a client and its coordination state from `config`.
    ///
    /// `navigator` is invoked whenever the session ends.
    pub fn new(config: ClientConfig, navigator: Arc<dyn Navigator>) -> Result<Self, RequestError> {
        config.validate()?;
        ensure_crypto_provider();

        let jar = Arc::new(Jar::default());
        if let Some(ref cookie) = config.session_cookie {
            seed_cookie(&jar, cookie, &config.refresh_url())?;
        }

        let mut builder = reqwest::Client::builder().cookie_provider(Arc::clone(&jar));
        if let Some(timeout) = config.timeout() {
            builder = builder.timeout(timeout);
        }
        let http = builder
            .build()
            .map_err(|e| RequestError::Config(format!("failed to build HTTP client: {e}")))?;

        let store = match config.token {
            Some(ref token) if !token.trim().is_empty() => {
                CredentialStore::with_credential(Credential::new(token.trim()))
            }
            _ => CredentialStore::new(),
        };

        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let terminator = SessionTerminator::new(
            store.clone(),
            navigator,
            config.sign_in_url.clone(),
            events.clone(),
        );
        let dispatcher = RetryDispatcher::new(http.clone());
        let coordinator = RefreshCoordinator::new(
            ExpirySignal::new(config.expired_code.clone()),
            RenewalExchange::new(http, config.refresh_url()),
            dispatcher.clone(),
            store.clone(),
            terminator.clone(),
            events.clone(),
        );

        debug!(base_url = %config.base_url, "client ready");
        Ok(Self {
            authenticator: RequestAuthenticator::new(store.clone()),
            config,
            store,
            dispatcher,
            coordinator,
            terminator,
            events,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn credentials(&self) -> &CredentialStore {
        &self.store
    }

    pub fn coordinator(&self) -> &Arc<RefreshCoordinator> {
        &self.coordinator
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }

    /// Descriptor for `method` on `path`, resolved against the base URL.
    pub fn request(&self, method: Method, path: &str) -> RequestDescriptor {
        RequestDescriptor::new(method, self.config.url(path))
    }

    /// Send a call with the current credential, renewing it transparently if
    /// the server reports it expired.
    pub async fn send(&self, descriptor: RequestDescriptor) -> Result<ApiResponse, RequestError> {
        let headers = self.authenticator.authorize(&descriptor.headers);
        let response = self.dispatcher.send(&descriptor, headers).await?;
        if response.is_success() {
            return Ok(response);
        }
        debug!(
            method = %descriptor.method,
            url = %descriptor.url,
            status = response.status.as_u16(),
            "request failed"
        );
        self.coordinator.recover(descriptor, response).await
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, RequestError> {
        self.send(self.request(Method::GET, path)).await?.json()
    }

    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, RequestError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send(self.request(Method::POST, path).json(body)?).await?.json()
    }

    pub async fn put_json<B, T>(&self, path: &str, body: &B) -> Result<T, RequestError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send(self.request(Method::PUT, path).json(body)?).await?.json()
    }

    pub async fn patch_json<B, T>(&self, path: &str, body: &B) -> Result<T, RequestError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send(self.request(Method::PATCH, path).json(body)?).await?.json()
    }

    pub async fn delete(&self, path: &str) -> Result<(), RequestError> {
        self.send(self.request(Method::DELETE, path)).await.map(drop)
    }

    /// Exchange sign-in material for a credential and install it.
    ///
    /// Goes out without a bearer header; the server may also set the session
    /// cookie used by later renewals.
    pub async fn sign_in<B: Serialize + ?Sized>(&self, body: &B) -> Result<Credential, RequestError> {
        let descriptor = self.request(Method::POST, &self.config.sign_in_path).json(body)?;
        let headers = descriptor.headers.clone();
        let response = self.dispatcher.send(&descriptor, headers).await?.into_result()?;
        let credential = TokenResponse::credential_from(&response)?;
        self.store.replace(credential.clone());
        info!("signed in");
        let _ = self.events.send(AuthEvent::SignedIn);
        Ok(credential)
    }

    /// Invalidate the server-side session, then end the local one.
    ///
    /// The local session ends even if the server call fails; that failure is
    /// still returned.
    pub async fn sign_out(&self) -> Result<(), RequestError> {
        let descriptor = self.request(Method::POST, &self.config.sign_out_path);
        let headers = self.authenticator.authorize(&descriptor.headers);
        let result = match self.dispatcher.send(&descriptor, headers).await {
            Ok(response) => response.into_result().map(drop),
            Err(e) => Err(e),
        };
        self.terminator.terminate("signed out");
        result
    }
}

/// Put `cookie` in the jar for the host of `url`, scoped to the whole site.
fn seed_cookie(jar: &Jar, cookie: &str, url: &str) -> Result<(), RequestError> {
    let url = reqwest::Url::parse(url)
        .map_err(|e| RequestError::Config(format!("invalid renewal URL {url:?}: {e}")))?;
    let cookie = cookie.trim();
    let has_path = cookie.split(';').skip(1).any(|attr| {
        attr.trim().get(..5).is_some_and(|name| name.eq_ignore_ascii_case("path="))
    });
    if has_path {
        jar.add_cookie_str(cookie, &url);
    } else {
        jar.add_cookie_str(&format!("{cookie}; Path=/"), &url);
    }
    Ok(())
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
