use actix_session::{SessionGetError, SessionInsertError};
use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde::Serialize;
use thiserror::Error;

/// Erreurs de l'application, du formulaire jusqu'à la base de données
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("Un contenu avec cette page ou section existe déjà")]
    DuplicateSlot,

    #[error("{0} non trouvé")]
    NotFound(&'static str),

    #[error("{0}")]
    Upload(String),

    #[error("Erreur de base de données : {0}")]
    Database(#[from] sqlx::Error),

    #[error("Erreur d'entrée/sortie : {0}")]
    Io(#[from] std::io::Error),

    #[error("Erreur de session : {0}")]
    Session(String),

    #[error("Erreur de hachage : {0}")]
    Hash(#[from] bcrypt::BcryptError),
}

impl From<SessionInsertError> for AppError {
    fn from(value: SessionInsertError) -> Self {
        AppError::Session(value.to_string())
    }
}

impl From<SessionGetError> for AppError {
    fn from(value: SessionGetError) -> Self {
        AppError::Session(value.to_string())
    }
}

impl AppError {
    /// Vrai pour les erreurs dont le détail ne doit jamais sortir vers le client
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            AppError::Database(_) | AppError::Io(_) | AppError::Session(_) | AppError::Hash(_)
        )
    }

    /// Message présentable à l'utilisateur (flash ou corps JSON)
    pub fn public_message(&self) -> String {
        if self.is_internal() {
            "Une erreur est survenue".to_string()
        } else {
            self.to_string()
        }
    }
}

/// Corps JSON des réponses d'erreur
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::DuplicateSlot | AppError::Upload(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if self.is_internal() {
            tracing::error!(error = %self, "erreur interne");
        }
        HttpResponse::build(self.status_code()).json(ErrorResponse {
            success: false,
            error: self.public_message(),
        })
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
