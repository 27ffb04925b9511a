pub type PlinthResult<T> = Result<T, PlinthError>;

#[derive(thiserror::Error, Debug)]
pub enum PlinthError {
    #[error("config error: {0}")]
    Config(String),

    /// Transient catalog/network failure. The only retryable kind.
    #[error("transport error: {0}")]
    Transport(String),

    /// A retry budget was exhausted.
    #[error("catalog unavailable: {0}")]
    CatalogUnavailable(String),

    #[error("auth error: {0}")]
    Auth(String),

    #[error("metadata error: {0}")]
    Metadata(String),

    #[error("display error: {0}")]
    Display(String),

    #[error("render error: {0}")]
    Render(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl PlinthError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    pub fn catalog_unavailable(msg: impl Into<String>) -> Self {
        Self::CatalogUnavailable(msg.into())
    }

    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Auth(msg.into())
    }

    pub fn metadata(msg: impl Into<String>) -> Self {
        Self::Metadata(msg.into())
    }

    pub fn display(msg: impl Into<String>) -> Self {
        Self::Display(msg.into())
    }

    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(msg.into())
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_prefixes_are_stable() {
        assert!(
            PlinthError::config("x")
                .to_string()
                .contains("config error:")
        );
        assert!(
            PlinthError::transport("x")
                .to_string()
                .contains("transport error:")
        );
        assert!(
            PlinthError::auth("x").to_string().contains("auth error:")
        );
        assert!(
            PlinthError::metadata("x")
                .to_string()
                .contains("metadata error:")
        );
        assert!(
            PlinthError::catalog_unavailable("x")
                .to_string()
                .contains("catalog unavailable:")
        );
    }

    #[test]
    fn only_transport_is_retryable() {
        assert!(PlinthError::transport("x").is_retryable());
        assert!(!PlinthError::auth("x").is_retryable());
        assert!(!PlinthError::metadata("x").is_retryable());
        assert!(!PlinthError::catalog_unavailable("x").is_retryable());
    }

    #[test]
    fn other_preserves_source() {
        let base = std::io::Error::other("boom");
        let err = PlinthError::Other(anyhow::Error::new(base));
        assert!(err.to_string().contains("boom"));
    }
}
