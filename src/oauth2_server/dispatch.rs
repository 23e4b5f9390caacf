// ABOUTME: Ordered grant dispatch registry for the token endpoint
// ABOUTME: The first converter that recognizes grant_type builds the typed request for its provider
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Inhibitor Contributors

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use super::context::GrantContext;
use super::models::{GrantRequest, OAuth2Error, TokenParameters, TokenResult};

/// Turns raw parameters into a typed grant request
pub trait GrantConverter: Send + Sync {
    /// `Ok(None)` when the request is not for this converter's grant type
    ///
    /// # Errors
    ///
    /// Returns `invalid_request` for a recognized grant with malformed parameters
    fn convert(&self, params: &TokenParameters) -> Result<Option<GrantRequest>, OAuth2Error>;
}

/// Authenticates a typed grant request and issues tokens
#[async_trait]
pub trait GrantProvider: Send + Sync {
    /// Run the grant
    ///
    /// # Errors
    ///
    /// Returns the OAuth2 error describing why the grant was refused
    async fn authenticate(
        &self,
        request: GrantRequest,
        context: &GrantContext,
    ) -> Result<TokenResult, OAuth2Error>;
}

struct GrantBinding {
    grant_type: &'static str,
    converter: Arc<dyn GrantConverter>,
    provider: Arc<dyn GrantProvider>,
}

/// Converter and provider pairs in registration order
#[derive(Default)]
pub struct GrantRegistry {
    bindings: Vec<GrantBinding>,
}

impl GrantRegistry {
    /// Empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a binding; earlier bindings win
    #[must_use]
    pub fn register(
        mut self,
        grant_type: &'static str,
        converter: Arc<dyn GrantConverter>,
        provider: Arc<dyn GrantProvider>,
    ) -> Self {
        info!(grant_type, position = self.bindings.len(), "Registered grant binding");
        self.bindings.push(GrantBinding {
            grant_type,
            converter,
            provider,
        });
        self
    }

    /// Registered grant types in order
    #[must_use]
    pub fn grant_types(&self) -> Vec<&'static str> {
        self.bindings.iter().map(|b| b.grant_type).collect()
    }

    /// Dispatch to the first converter that recognizes the request
    ///
    /// # Errors
    ///
    /// Returns `unsupported_grant_type` when no converter matches, or the
    /// converter's or provider's error
    pub async fn dispatch(
        &self,
        params: &TokenParameters,
        context: &GrantContext,
    ) -> Result<TokenResult, OAuth2Error> {
        for binding in &self.bindings {
            if let Some(request) = binding.converter.convert(params)? {
                debug!(
                    grant_type = binding.grant_type,
                    client_id = %context.client.client_id,
                    "Grant converter matched"
                );
                return binding.provider.authenticate(request, context).await;
            }
        }
        warn!(
            grant_type = params.first("grant_type").unwrap_or_default(),
            client_id = %context.client.client_id,
            "No grant converter matched"
        );
        Err(OAuth2Error::unsupported_grant_type())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use chrono::Utc;
    use inhibitor_core::models::{IssuedToken, RegisteredClient, TokenMetadata};

    use super::*;
    use crate::oauth2_server::models::RefreshGrantRequest;

    struct MatchGrant(&'static str);

    impl GrantConverter for MatchGrant {
        fn convert(&self, params: &TokenParameters) -> Result<Option<GrantRequest>, OAuth2Error> {
            if params.first("grant_type") != Some(self.0) {
                return Ok(None);
            }
            Ok(Some(GrantRequest::Refresh(RefreshGrantRequest {
                refresh_token: self.0.to_owned(),
                scopes: Default::default(),
            })))
        }
    }

    struct CountingProvider(AtomicUsize, i64);

    #[async_trait]
    impl GrantProvider for CountingProvider {
        async fn authenticate(
            &self,
            _request: GrantRequest,
            context: &GrantContext,
        ) -> Result<TokenResult, OAuth2Error> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(TokenResult {
                client_id: context.client.client_id.clone(),
                provider_id: self.1,
                scopes: Default::default(),
                access_token: IssuedToken {
                    value: "a".to_owned(),
                    issued_at: context.now,
                    expires_at: None,
                    metadata: TokenMetadata::default(),
                },
                refresh_token: None,
                id_token: None,
            })
        }
    }

    fn context() -> GrantContext {
        let client = RegisteredClient {
            id: "1".to_owned(),
            client_id: "c".to_owned(),
            client_id_issued_at: Utc::now(),
            client_secret_hash: None,
            client_name: "c".to_owned(),
            authentication_methods: Default::default(),
            grant_types: Default::default(),
            redirect_uris: Default::default(),
            scopes: Default::default(),
            client_settings: Default::default(),
            token_settings: Default::default(),
        };
        GrantContext::new(client, "client_secret_basic", "req_test")
    }

    fn params(grant_type: &str) -> TokenParameters {
        TokenParameters::from_pairs(vec![("grant_type".to_owned(), grant_type.to_owned())])
    }

    #[tokio::test]
    async fn test_first_matching_binding_wins() {
        let first = Arc::new(CountingProvider(AtomicUsize::new(0), 1));
        let second = Arc::new(CountingProvider(AtomicUsize::new(0), 2));
        let registry = GrantRegistry::new()
            .register("a", Arc::new(MatchGrant("a")), first.clone())
            .register("a2", Arc::new(MatchGrant("a")), second.clone());

        let result = registry.dispatch(&params("a"), &context()).await.unwrap();
        assert_eq!(result.provider_id, 1);
        assert_eq!(first.0.load(Ordering::SeqCst), 1);
        assert_eq!(second.0.load(Ordering::SeqCst), 0);
        assert_eq!(registry.grant_types(), vec!["a", "a2"]);
    }

    #[tokio::test]
    async fn test_unmatched_grant_is_unsupported() {
        let registry = GrantRegistry::new().register(
            "a",
            Arc::new(MatchGrant("a")),
            Arc::new(CountingProvider(AtomicUsize::new(0), 1)),
        );
        let err = registry
            .dispatch(&params("authorization_code"), &context())
            .await
            .unwrap_err();
        assert_eq!(err.error, "unsupported_grant_type");
    }
}
