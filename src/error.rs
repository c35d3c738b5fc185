use actix_web::{HttpResponse, http::StatusCode};
use derive_more::Display;
use serde_json::json;

/// Service-level error kinds. Every variant renders a distinct, actionable
/// JSON message; none of them leak a raw stack trace to the UI.
#[derive(Debug, Display)]
pub enum AppError {
    /// Bad month name, bad date, malformed payload.
    #[display(fmt = "{}", _0)]
    Validation(String),

    #[display(fmt = "{} not found", _0)]
    NotFound(String),

    /// A newly provisioned month table never became queryable within the
    /// retry budget.
    #[display(fmt = "table {} is not ready yet, try again shortly", _0)]
    NotReady(String),

    /// Bulk write where some rows failed. Succeeded writes are kept; the
    /// failed member ids are reported so the caller can retry just those.
    #[display(fmt = "{} attendance writes failed", "failed.len()")]
    PartialFailure { failed: Vec<u64> },

    /// Badge processing attempted before every Sunday has at least one
    /// recorded entry.
    #[display(fmt = "month {} is not complete", month)]
    MonthIncomplete { month: String, missing: Vec<String> },

    /// Reentrancy guard: badge processing for this month is already running.
    #[display(fmt = "badge processing already running for {}", _0)]
    ProcessingInProgress(String),

    /// Schema evolution failed, usually a privileges problem. A different
    /// conversation with the operator than a plain write error.
    #[display(fmt = "cannot create attendance field {}", _0)]
    CannotCreateField(String),

    /// Opaque store failure, original message passed through.
    #[display(fmt = "{}", _0)]
    Store(sqlx::Error),
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        AppError::Store(e)
    }
}

impl actix_web::ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::NotReady(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::PartialFailure { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::MonthIncomplete { .. } => StatusCode::CONFLICT,
            AppError::ProcessingInProgress(_) => StatusCode::CONFLICT,
            AppError::CannotCreateField(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let body = match self {
            AppError::PartialFailure { failed } => json!({
                "message": self.to_string(),
                "failed_member_ids": failed,
            }),
            AppError::MonthIncomplete { missing, .. } => json!({
                "message": self.to_string(),
                "missing_sundays": missing,
            }),
            // Store errors keep the original message in the log, a generic
            // one in the response body.
            AppError::Store(e) => {
                tracing::error!(error = %e, "store error");
                json!({ "message": "Something went wrong, contact the system admin" })
            }
            _ => json!({ "message": self.to_string() }),
        };
        HttpResponse::build(self.status_code()).json(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::ResponseError;

    #[test]
    fn each_kind_maps_to_a_distinct_condition() {
        assert_eq!(
            AppError::Validation("bad month".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::NotReady("month_january_2026".into()).status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            AppError::MonthIncomplete {
                month: "January_2026".into(),
                missing: vec!["2026-01-25".into()],
            }
            .status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::ProcessingInProgress("January_2026".into()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::PartialFailure { failed: vec![3] }.status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn messages_are_actionable() {
        let e = AppError::CannotCreateField("d_2026_01_04".into());
        assert_eq!(e.to_string(), "cannot create attendance field d_2026_01_04");

        let e = AppError::PartialFailure {
            failed: vec![1, 2, 3],
        };
        assert_eq!(e.to_string(), "3 attendance writes failed");
    }
}
