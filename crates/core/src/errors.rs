use thiserror::Error;

use crate::flows::FlowTransitionError;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("{0} is required")]
    MissingField(&'static str),
    #[error("unknown service `{0}`")]
    UnknownService(String),
    #[error("session `{0}` was not found")]
    SessionNotFound(String),
    #[error(transparent)]
    FlowTransition(#[from] FlowTransitionError),
    #[error("domain invariant violation: {0}")]
    InvariantViolation(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("persistence failure: {0}")]
    Persistence(String),
    #[error("integration failure: {0}")]
    Integration(String),
    #[error("configuration failure: {0}")]
    Configuration(String),
}

/// Errors as the HTTP surface reports them. Only `Unprocessable` and `Conflict` carry a
/// message meant for the caller; the rest expose a fixed user message.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("unprocessable request: {message}")]
    Unprocessable { message: String, correlation_id: String },
    #[error("not found: {message}")]
    NotFound { message: String, correlation_id: String },
    #[error("conflict: {message}")]
    Conflict { message: String, correlation_id: String },
    #[error("service unavailable: {message}")]
    ServiceUnavailable { message: String, correlation_id: String },
    #[error("internal error: {message}")]
    Internal { message: String, correlation_id: String },
}

impl InterfaceError {
    pub fn user_message(&self) -> &str {
        match self {
            Self::Unprocessable { message, .. } | Self::Conflict { message, .. } => message.as_str(),
            Self::NotFound { .. } => "The requested questionnaire does not exist or has expired.",
            Self::ServiceUnavailable { .. } => {
                "The service is temporarily unavailable. Please retry shortly."
            }
            Self::Internal { .. } => "An unexpected internal error occurred.",
        }
    }

    pub fn correlation_id(&self) -> &str {
        match self {
            Self::Unprocessable { correlation_id, .. }
            | Self::NotFound { correlation_id, .. }
            | Self::Conflict { correlation_id, .. }
            | Self::ServiceUnavailable { correlation_id, .. }
            | Self::Internal { correlation_id, .. } => correlation_id,
        }
    }
}

impl ApplicationError {
    pub fn into_interface(self, correlation_id: impl Into<String>) -> InterfaceError {
        let correlation_id = correlation_id.into();
        let mut mapped = InterfaceError::from(self);
        match &mut mapped {
            InterfaceError::Unprocessable { correlation_id: id, .. }
            | InterfaceError::NotFound { correlation_id: id, .. }
            | InterfaceError::Conflict { correlation_id: id, .. }
            | InterfaceError::ServiceUnavailable { correlation_id: id, .. }
            | InterfaceError::Internal { correlation_id: id, .. } => *id = correlation_id,
        }
        mapped
    }
}

impl From<ApplicationError> for InterfaceError {
    fn from(value: ApplicationError) -> Self {
        let correlation_id = "unassigned".to_owned();
        match value {
            ApplicationError::Domain(
                error @ (DomainError::MissingField(_) | DomainError::UnknownService(_)),
            ) => Self::Unprocessable { message: error.to_string(), correlation_id },
            ApplicationError::Domain(DomainError::SessionNotFound(id)) => {
                Self::NotFound { message: format!("session `{id}` not found"), correlation_id }
            }
            ApplicationError::Domain(DomainError::FlowTransition(
                FlowTransitionError::SessionCompleted,
            )) => Self::Conflict {
                message: "questionnaire is already completed".to_owned(),
                correlation_id,
            },
            ApplicationError::Domain(DomainError::FlowTransition(error)) => {
                Self::Conflict { message: error.to_string(), correlation_id }
            }
            ApplicationError::Domain(DomainError::InvariantViolation(message))
            | ApplicationError::Configuration(message) => Self::Internal { message, correlation_id },
            ApplicationError::Persistence(message) | ApplicationError::Integration(message) => {
                Self::ServiceUnavailable { message, correlation_id }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::errors::{ApplicationError, DomainError, InterfaceError};
    use crate::flows::FlowTransitionError;

    #[test]
    fn completed_session_maps_to_conflict() {
        let interface = ApplicationError::from(DomainError::from(
            FlowTransitionError::SessionCompleted,
        ))
        .into_interface("req-1");

        assert!(matches!(
            interface,
            InterfaceError::Conflict {
                ref correlation_id,
                ..
            } if correlation_id == "req-1"
        ));
        assert_eq!(interface.user_message(), "questionnaire is already completed");
    }

    #[test]
    fn missing_field_and_unknown_service_are_unprocessable() {
        let missing = ApplicationError::from(DomainError::MissingField("text")).into_interface("r");
        assert!(matches!(missing, InterfaceError::Unprocessable { .. }));
        assert_eq!(missing.user_message(), "text is required");

        let unknown = ApplicationError::from(DomainError::UnknownService("plumbing".to_owned()))
            .into_interface("r");
        assert_eq!(unknown.user_message(), "unknown service `plumbing`");
    }

    #[test]
    fn missing_session_maps_to_not_found() {
        let interface = ApplicationError::from(DomainError::SessionNotFound("q_1".to_owned()))
            .into_interface("req-2");

        assert!(matches!(interface, InterfaceError::NotFound { .. }));
        assert_eq!(interface.correlation_id(), "req-2");
    }

    #[test]
    fn integration_error_maps_to_service_unavailable() {
        let interface = ApplicationError::Integration("model timed out".to_owned())
            .into_interface("req-3");

        assert!(matches!(interface, InterfaceError::ServiceUnavailable { .. }));
        assert_eq!(
            interface.user_message(),
            "The service is temporarily unavailable. Please retry shortly."
        );
    }

    #[test]
    fn configuration_error_hides_detail() {
        let interface = ApplicationError::Configuration("registry missing".to_owned())
            .into_interface("req-4");

        assert!(matches!(interface, InterfaceError::Internal { .. }));
        assert_eq!(interface.user_message(), "An unexpected internal error occurred.");
    }
}
