// ABOUTME: Revokes every authorization of a principal and blacklists the access-token jtis
// ABOUTME: Backs the admin and self-service "log out everywhere" endpoints
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Inhibitor Contributors

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::accounts::AccountService;
use crate::database::AuthorizationStore;
use crate::errors::{AppError, AppResult};
use crate::tokens::TokenBlacklist;

/// Summary of a principal-wide revocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrincipalRevocation {
    /// Principal name (username)
    pub principal: String,
    /// Authorization rows deleted
    pub revoked_authorizations: u64,
    /// Access-token jtis written to the blacklist
    pub blacklisted_tokens: usize,
}

/// Principal-wide revocation
#[derive(Clone)]
pub struct PrincipalRevocationService {
    authorizations: Arc<dyn AuthorizationStore>,
    blacklist: TokenBlacklist,
    accounts: AccountService,
}

impl PrincipalRevocationService {
    /// Creates a new principal revocation service
    #[must_use]
    pub fn new(
        authorizations: Arc<dyn AuthorizationStore>,
        blacklist: TokenBlacklist,
        accounts: AccountService,
    ) -> Self {
        Self {
            authorizations,
            blacklist,
            accounts,
        }
    }

    /// Blacklist every captured jti, then delete every authorization of the principal
    ///
    /// # Errors
    ///
    /// Returns an error if the store or the blacklist write fails
    pub async fn revoke_by_username(&self, principal_name: &str) -> AppResult<PrincipalRevocation> {
        let authorizations = self
            .authorizations
            .find_by_principal_name(principal_name)
            .await?;

        let mut jtis = Vec::with_capacity(authorizations.len());
        for authorization in &authorizations {
            match authorization.access_token_jti() {
                Some(jti) => jtis.push(jti.to_owned()),
                None => warn!(
                    authorization_id = %authorization.id,
                    "No jti in stored access token; row is deleted without blacklisting"
                ),
            }
        }

        let blacklisted_tokens = self.blacklist.revoke_all(&jtis).await?;
        let revoked_authorizations = self
            .authorizations
            .remove_all_by_principal_name(principal_name)
            .await?;

        info!(
            principal = %principal_name,
            revoked_authorizations,
            blacklisted_tokens,
            "Revoked all tokens of principal"
        );
        Ok(PrincipalRevocation {
            principal: principal_name.to_owned(),
            revoked_authorizations,
            blacklisted_tokens,
        })
    }

    /// Revoke by account id
    ///
    /// # Errors
    ///
    /// Returns `ResourceNotFound` for an unknown account
    pub async fn revoke_by_account_id(&self, account_id: i64) -> AppResult<PrincipalRevocation> {
        let account = self.accounts.find_account(account_id).await?.ok_or_else(|| {
            AppError::not_found(format!("Account {account_id}"))
                .with_resource_id(account_id.to_string())
        })?;
        self.revoke_by_username(&account.username).await
    }
}
