//! Bearer credentials for the upstream APIs.
//!
//! Obtaining and refreshing credentials (browser login, TOTP derivation) is
//! not done here. The HTTP clients only ask an [`AuthProvider`] for a token
//! before each request and observe whether the request succeeds.

use std::{fmt, str::FromStr};

use async_trait::async_trait;
use veil::Redact;

use crate::error::{Error, Result};

/// A bearer token to put in an `Authorization` header.
///
/// Redacted when debug printed so that it does not end up in logs.
#[derive(Clone, PartialEq, Eq, Hash, Redact)]
#[redact(all)]
pub struct BearerToken(String);

impl BearerToken {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for BearerToken {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let token = s.trim();
        if token.is_empty() {
            return Err(Error::unauthenticated("bearer token is empty"));
        }

        // Tokens go into a header value verbatim.
        if token.contains(|chr: char| chr.is_whitespace() || chr.is_control() || !chr.is_ascii()) {
            return Err(Error::invalid_argument(
                "bearer token contains illegal characters",
            ));
        }

        Ok(Self(token.to_owned()))
    }
}

/// Only for building the `Authorization` header; never log this.
impl fmt::Display for BearerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Supplies a valid bearer token on demand.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn bearer(&self) -> Result<BearerToken>;
}

/// A provider that hands out the same token until the process exits.
#[derive(Clone, Debug)]
pub struct StaticToken(BearerToken);

impl StaticToken {
    #[must_use]
    pub fn new(token: BearerToken) -> Self {
        Self(token)
    }
}

#[async_trait]
impl AuthProvider for StaticToken {
    async fn bearer(&self) -> Result<BearerToken> {
        Ok(self.0.clone())
    }
}
