//! HTTP handlers, one module per resource.

pub mod actions;
pub mod signers;
pub mod workflows;

use axum::http::{HeaderMap, StatusCode};
use engine::{ClientMeta, EngineError};

/// Map engine failures onto HTTP status codes.
pub(crate) fn status_for(err: &EngineError) -> StatusCode {
    match err {
        EngineError::WorkflowNotFound(_) | EngineError::WorkflowCodeNotFound(_) => {
            StatusCode::NOT_FOUND
        }
        EngineError::InvalidTopology(_) => StatusCode::UNPROCESSABLE_ENTITY,
        EngineError::NoEligibleSigners { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        EngineError::NoPendingAction { .. }
        | EngineError::WorkflowNotActive { .. }
        | EngineError::DuplicateSubmission { .. } => StatusCode::CONFLICT,
        EngineError::Directory(_) | EngineError::Database(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

/// Originating-client metadata for audit attribution.
pub(crate) fn client_meta(headers: &HeaderMap) -> ClientMeta {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned)
    };
    ClientMeta {
        ip_address: header("x-forwarded-for"),
        user_agent: header("user-agent"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn engine_errors_map_to_expected_status_codes() {
        let wf = Uuid::new_v4();
        let signer = Uuid::new_v4();
        assert_eq!(
            status_for(&EngineError::WorkflowNotFound(wf)),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_for(&EngineError::WorkflowCodeNotFound("A1B2-C3D4-E5F6-G7H8".into())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_for(&EngineError::InvalidTopology("no lines".into())),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status_for(&EngineError::DuplicateSubmission {
                workflow_id: wf,
                signer_id: signer,
            }),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn client_meta_reads_forwarding_headers() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", "203.0.113.9".parse().unwrap());
        headers.insert("user-agent", "curl/8.4".parse().unwrap());

        let meta = client_meta(&headers);
        assert_eq!(meta.ip_address.as_deref(), Some("203.0.113.9"));
        assert_eq!(meta.user_agent.as_deref(), Some("curl/8.4"));
    }
}
