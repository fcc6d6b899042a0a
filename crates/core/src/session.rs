/// Caller identity threaded explicitly into the coordinator and every remote call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionContext {
    user: String,
    token: Option<String>,
}

impl SessionContext {
    pub fn new(user: impl Into<String>) -> Self {
        Self {
            user: user.into().trim().to_string(),
            token: None,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        let token = token.into();
        self.token = if token.trim().is_empty() {
            None
        } else {
            Some(token)
        };
        self
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn is_authenticated(&self) -> bool {
        !self.user.is_empty()
    }

    /// Authorization header value for transports that send one.
    pub fn bearer(&self) -> Option<String> {
        self.token.as_ref().map(|token| format!("Bearer {token}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bearer_renders_only_with_token() {
        let session = SessionContext::new("alice");
        assert!(session.is_authenticated());
        assert_eq!(session.bearer(), None);

        let session = session.with_token("abc123");
        assert_eq!(session.bearer().as_deref(), Some("Bearer abc123"));
        assert_eq!(session.with_token("  ").token(), None);
    }

    #[test]
    fn blank_user_is_anonymous() {
        assert!(!SessionContext::new("  ").is_authenticated());
    }
}
