//! Error handling for the Bobina Tracker
//!
//! Provides consistent error responses in English and Portuguese

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use shared::consolidation::{CancelBlock, DeleteBlock, GenerateBlock, LoadCompleteBlock};
use shared::{QuoteError, ValidationIssue};
use thiserror::Error;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Authentication errors
    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Insufficient permissions")]
    InsufficientPermissions,

    // Validation errors
    #[error("Validation error: {message}")]
    Validation {
        field: String,
        message: String,
        message_pt: String,
    },

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Duplicate entry: {0}")]
    DuplicateEntry(String),

    #[error("Conflict: {message}")]
    Conflict {
        resource: String,
        message: String,
        message_pt: String,
    },

    #[error("Resource not found: {0}")]
    NotFound(String),

    // Business logic errors
    #[error("Invalid state transition: {0}")]
    InvalidStateTransition(String),

    // Database errors
    #[error("Database error: {0}")]
    DatabaseError(#[source] sqlx::Error),

    // Internal errors
    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Internal server error")]
    InternalError(#[from] anyhow::Error),
}

impl AppError {
    pub fn conflict(
        resource: impl Into<String>,
        message: impl Into<String>,
        message_pt: impl Into<String>,
    ) -> Self {
        AppError::Conflict {
            resource: resource.into(),
            message: message.into(),
            message_pt: message_pt.into(),
        }
    }
}

/// Unique violations become duplicate rejections; everything else is a store failure
impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.code().as_deref() == Some("23505") {
                let constraint = db_err.constraint().unwrap_or("unique key").to_string();
                return AppError::DuplicateEntry(constraint);
            }
        }
        AppError::DatabaseError(err)
    }
}

impl From<ValidationIssue> for AppError {
    fn from(issue: ValidationIssue) -> Self {
        AppError::Validation {
            field: issue.field,
            message: issue.message_en,
            message_pt: issue.message_pt,
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let field = errors
            .field_errors()
            .keys()
            .next()
            .map(|f| f.to_string())
            .unwrap_or_default();
        AppError::Validation {
            message: errors.to_string(),
            message_pt: format!("Campo inválido: {}", field),
            field,
        }
    }
}

impl From<LoadCompleteBlock> for AppError {
    fn from(block: LoadCompleteBlock) -> Self {
        let message_pt = match &block {
            LoadCompleteBlock::AlreadyComplete(crt) => {
                format!("A carga do CRT {} já está marcada como completa", crt)
            }
            LoadCompleteBlock::AlreadyGenerated(crt) => {
                format!("Já existe um pedido gerado para o CRT {}", crt)
            }
            LoadCompleteBlock::RollsInTransit { crt, count } => {
                format!("O CRT {} ainda tem {} bobina(s) em trânsito", crt, count)
            }
            LoadCompleteBlock::NothingInStock(crt) => {
                format!("O CRT {} não tem bobinas em estoque", crt)
            }
        };
        AppError::conflict("load_complete", block.to_string(), message_pt)
    }
}

impl From<GenerateBlock> for AppError {
    fn from(block: GenerateBlock) -> Self {
        let message_pt = match &block {
            GenerateBlock::LoadNotComplete(crt) => {
                format!("A carga do CRT {} não está completa", crt)
            }
            GenerateBlock::AlreadyGenerated(crt) => {
                format!("Já existe um pedido gerado para o CRT {}", crt)
            }
        };
        AppError::conflict("order", block.to_string(), message_pt)
    }
}

impl From<CancelBlock> for AppError {
    fn from(block: CancelBlock) -> Self {
        AppError::InvalidStateTransition(block.to_string())
    }
}

impl From<DeleteBlock> for AppError {
    fn from(block: DeleteBlock) -> Self {
        let message_pt = match &block {
            DeleteBlock::RollsLoaded { crt, count } => {
                format!("O CRT {} já tem {} bobina(s) carregada(s)", crt, count)
            }
        };
        AppError::conflict("crt_number", block.to_string(), message_pt)
    }
}

impl From<QuoteError> for AppError {
    fn from(err: QuoteError) -> Self {
        let message_pt = match &err {
            QuoteError::OverCapacity { weight_kg, capacity_kg } => format!(
                "Carga de {} kg excede a capacidade do veículo ({} kg)",
                weight_kg, capacity_kg
            ),
            QuoteError::VehicleMismatch => "A tarifa não pertence ao veículo".to_string(),
        };
        AppError::Validation {
            field: "vehicle_id".to_string(),
            message: err.to_string(),
            message_pt,
        }
    }
}

/// Error response structure
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message_en: String,
    pub message_pt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_detail) = match &self {
            AppError::TokenExpired => (
                StatusCode::UNAUTHORIZED,
                ErrorDetail {
                    code: "TOKEN_EXPIRED".to_string(),
                    message_en: "Token has expired".to_string(),
                    message_pt: "O token expirou".to_string(),
                    field: None,
                },
            ),
            AppError::InvalidToken => (
                StatusCode::UNAUTHORIZED,
                ErrorDetail {
                    code: "INVALID_TOKEN".to_string(),
                    message_en: "Invalid token".to_string(),
                    message_pt: "Token inválido".to_string(),
                    field: None,
                },
            ),
            AppError::InsufficientPermissions => (
                StatusCode::FORBIDDEN,
                ErrorDetail {
                    code: "INSUFFICIENT_PERMISSIONS".to_string(),
                    message_en: "You do not have permission to perform this action".to_string(),
                    message_pt: "Você não tem permissão para esta ação".to_string(),
                    field: None,
                },
            ),
            AppError::Validation { field, message, message_pt } => (
                StatusCode::BAD_REQUEST,
                ErrorDetail {
                    code: "VALIDATION_ERROR".to_string(),
                    message_en: message.clone(),
                    message_pt: message_pt.clone(),
                    field: Some(field.clone()),
                },
            ),
            AppError::ValidationError(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorDetail {
                    code: "VALIDATION_ERROR".to_string(),
                    message_en: msg.clone(),
                    message_pt: format!("Dados inválidos: {}", msg),
                    field: None,
                },
            ),
            AppError::DuplicateEntry(field) => (
                StatusCode::CONFLICT,
                ErrorDetail {
                    code: "DUPLICATE_ENTRY".to_string(),
                    message_en: format!("A record with this {} already exists", field),
                    message_pt: format!("Já existe um registro com este {}", field),
                    field: Some(field.clone()),
                },
            ),
            AppError::Conflict { resource, message, message_pt } => (
                StatusCode::CONFLICT,
                ErrorDetail {
                    code: "CONFLICT".to_string(),
                    message_en: message.clone(),
                    message_pt: message_pt.clone(),
                    field: Some(resource.clone()),
                },
            ),
            AppError::NotFound(resource) => (
                StatusCode::NOT_FOUND,
                ErrorDetail {
                    code: "NOT_FOUND".to_string(),
                    message_en: format!("{} not found", resource),
                    message_pt: format!("{} não encontrado", resource),
                    field: None,
                },
            ),
            AppError::InvalidStateTransition(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorDetail {
                    code: "INVALID_STATE_TRANSITION".to_string(),
                    message_en: msg.clone(),
                    message_pt: format!("Não é possível alterar o status: {}", msg),
                    field: None,
                },
            ),
            AppError::DatabaseError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail {
                    code: "DATABASE_ERROR".to_string(),
                    message_en: "A database error occurred".to_string(),
                    message_pt: "Ocorreu um erro no banco de dados".to_string(),
                    field: None,
                },
            ),
            AppError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail {
                    code: "INTERNAL_ERROR".to_string(),
                    message_en: msg.clone(),
                    message_pt: "Erro interno do servidor".to_string(),
                    field: None,
                },
            ),
            AppError::InternalError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail {
                    code: "INTERNAL_ERROR".to_string(),
                    message_en: "An internal server error occurred".to_string(),
                    message_pt: "Erro interno do servidor".to_string(),
                    field: None,
                },
            ),
        };

        if status.is_server_error() {
            tracing::error!("Error: {:?}", self);
        } else {
            tracing::debug!("Rejected request: {}", self);
        }

        (status, Json(ErrorResponse { error: error_detail })).into_response()
    }
}

/// Result type alias for handlers
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_issue_keeps_both_languages() {
        let issue = ValidationIssue::new("justification", "A justification is required", "Informe uma justificativa");
        match AppError::from(issue) {
            AppError::Validation { field, message, message_pt } => {
                assert_eq!(field, "justification");
                assert_eq!(message, "A justification is required");
                assert_eq!(message_pt, "Informe uma justificativa");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_load_complete_block_is_a_conflict() {
        let err = AppError::from(LoadCompleteBlock::AlreadyComplete("BR1".to_string()));
        assert_eq!(err.into_response().status(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_generate_block_is_a_conflict() {
        let err = AppError::from(GenerateBlock::LoadNotComplete("BR1".to_string()));
        assert_eq!(err.into_response().status(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_not_found_status() {
        let err = AppError::NotFound("Order".to_string());
        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);
    }
}
