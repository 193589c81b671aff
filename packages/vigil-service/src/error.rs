pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Unauthenticated: {message}")]
	Unauthenticated { message: String },
	#[error("Invalid parameter: {message}")]
	InvalidParameter { message: String },
	#[error("Scope denied: {message}")]
	ScopeDenied { message: String },
	#[error("Not found: {message}")]
	NotFound { message: String },
	#[error("Storage error: {message}")]
	Storage { message: String },
}
impl From<sqlx::Error> for Error {
	fn from(err: sqlx::Error) -> Self {
		Self::Storage { message: err.to_string() }
	}
}

impl From<vigil_storage::Error> for Error {
	fn from(err: vigil_storage::Error) -> Self {
		match err {
			vigil_storage::Error::Sqlx(inner) => Self::Storage { message: inner.to_string() },
		}
	}
}
