//! Top-level error type for docview.
//!
//! Each subsystem defines its own error type with miette `#[diagnostic]`
//! derives; `DocviewError` wraps them transparently so codes and help text
//! survive up to the CLI.

use miette::Diagnostic;
use thiserror::Error;

use crate::client::ClientError;
use crate::config::ConfigError;
use crate::paths::PathError;
use crate::theme::ThemeError;

#[derive(Debug, Error, Diagnostic)]
pub enum DocviewError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Client(#[from] ClientError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Paths(#[from] PathError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Theme(#[from] ThemeError),

    #[cfg(feature = "dev-server")]
    #[error(transparent)]
    #[diagnostic(transparent)]
    DevServer(#[from] crate::devserver::DevServerError),
}

/// Convenience alias for functions returning docview results.
pub type DocviewResult<T> = std::result::Result<T, DocviewError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_error_converts_and_keeps_message() {
        let err = ClientError::Status {
            context: "Search failed",
            status: 500,
            status_text: "Internal Server Error".into(),
        };
        let top: DocviewError = err.into();
        assert!(matches!(top, DocviewError::Client(ClientError::Status { .. })));
        assert_eq!(top.to_string(), "Search failed: Internal Server Error");
    }

    #[test]
    fn diagnostic_code_passes_through() {
        let top: DocviewError = ThemeError::Unknown {
            value: "sepia".into(),
        }
        .into();
        let code = top.code().map(|c| c.to_string());
        assert_eq!(code.as_deref(), Some("docview::theme::unknown"));
    }
}
