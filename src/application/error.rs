use thiserror::Error;

use crate::config::LoadError;
use crate::infra::error::InfraError;
use crate::infra::http::ApiError;

/// Failures that stop the binary. Tool operations never produce these; they
/// render upstream errors into their text output instead.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("failed to load configuration: {0}")]
    Config(#[from] LoadError),
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error("failed to connect to Mealie API: {0}")]
    Api(#[from] ApiError),
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::Infra(InfraError::from(err))
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error as _;

    use reqwest::StatusCode;

    use super::*;

    fn layer(err: &AppError) -> &'static str {
        match err {
            AppError::Config(_) => "config",
            AppError::Infra(_) => "infra",
            AppError::Api(_) => "api",
        }
    }

    #[test]
    fn api_errors_keep_their_message() {
        let err = AppError::from(ApiError::status(StatusCode::UNAUTHORIZED, b"bad key"));
        assert_eq!(
            err.to_string(),
            "failed to connect to Mealie API: HTTP 401 Unauthorized: bad key"
        );
    }

    #[test]
    fn io_errors_are_infrastructure_failures() {
        let err = AppError::from(std::io::Error::other("stdin closed"));
        assert!(matches!(err, AppError::Infra(InfraError::Io(_))));
    }

    #[test]
    fn every_failure_comes_from_a_lower_layer() {
        let failures = [
            AppError::from(ApiError::Request("connection refused".into())),
            AppError::from(std::io::Error::other("stdout closed")),
        ];
        for err in &failures {
            assert!(err.source().is_some(), "{} error lost its cause", layer(err));
        }
        assert_eq!(layer(&failures[0]), "api");
        assert_eq!(layer(&failures[1]), "infra");
    }
}
