use actix_web::http::StatusCode;
use actix_web::ResponseError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Database(#[from] mongodb::error::Error),
    #[error("couldn't encode the record: {0}")]
    Encode(#[from] bson::ser::Error),
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("couldn't find the desired group")]
    GroupNotFound,
    #[error("{0}")]
    InvalidInput(String),
    #[error("`{0}` is already a member")]
    DuplicateMember(String),
    #[error("`{0}` is not a member of this group")]
    UnknownMember(String),
    #[error("cannot remove the last member")]
    LastMember,
    #[error("no exchange rate from `{0}` to `{1}`")]
    UnknownCurrency(String, String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::GroupNotFound | ApiError::UnknownMember(_) => StatusCode::NOT_FOUND,
            ApiError::InvalidInput(_) | ApiError::UnknownCurrency(_, _) => StatusCode::BAD_REQUEST,
            ApiError::DuplicateMember(_) | ApiError::LastMember => StatusCode::CONFLICT,
            ApiError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
