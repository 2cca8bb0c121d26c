// # Token Source Trait
//
// Supplies bearer tokens to DNS providers that call authenticated APIs.

use async_trait::async_trait;

/// Trait for access token suppliers
#[async_trait]
pub trait TokenSource: Send + Sync {
    /// Return a bearer token valid for at least the next request
    ///
    /// # Returns
    ///
    /// - `Ok(String)`: The token
    /// - `Err(Error::Authentication)`: No token could be obtained
    async fn access_token(&self) -> Result<String, crate::Error>;
}

/// A token source that always returns the same token
#[derive(Clone)]
pub struct StaticTokenSource {
    token: String,
}

impl StaticTokenSource {
    /// Create a static token source
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

impl std::fmt::Debug for StaticTokenSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticTokenSource")
            .field("token", &"<REDACTED>")
            .finish()
    }
}

#[async_trait]
impl TokenSource for StaticTokenSource {
    async fn access_token(&self) -> Result<String, crate::Error> {
        if self.token.is_empty() {
            return Err(crate::Error::auth("static access token is empty"));
        }
        Ok(self.token.clone())
    }
}
