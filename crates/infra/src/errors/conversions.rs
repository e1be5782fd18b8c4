//! Conversions from external infrastructure errors into domain errors.

use carindex_domain::CarIndexError;
use r2d2::Error as PoolError;
use reqwest::Error as HttpError;
use rusqlite::Error as SqlError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub CarIndexError);

impl From<InfraError> for CarIndexError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<CarIndexError> for InfraError {
    fn from(value: CarIndexError) -> Self {
        InfraError(value)
    }
}

trait IntoCarIndexError {
    fn into_carindex(self) -> CarIndexError;
}

/* -------------------------------------------------------------------------- */
/* rusqlite::Error → CarIndexError */
/* -------------------------------------------------------------------------- */

impl IntoCarIndexError for SqlError {
    fn into_carindex(self) -> CarIndexError {
        use rusqlite::ffi::ErrorCode;
        use rusqlite::Error as RE;

        match self {
            RE::SqliteFailure(err, maybe_message) => {
                let message = maybe_message.unwrap_or_default();
                match (err.code, err.extended_code) {
                    (ErrorCode::DatabaseBusy, _) => CarIndexError::Database("database is busy".into()),
                    (ErrorCode::DatabaseLocked, _) => {
                        CarIndexError::Database("database is locked".into())
                    }
                    (ErrorCode::ConstraintViolation, 2067) => {
                        CarIndexError::Database("unique constraint violation".into())
                    }
                    (ErrorCode::CannotOpen, _) => {
                        CarIndexError::Database(format!("unable to open database: {message}"))
                    }
                    _ => CarIndexError::Database(format!(
                        "sqlite failure {:?} (code {}): {}",
                        err.code, err.extended_code, message
                    )),
                }
            }
            RE::QueryReturnedNoRows => CarIndexError::NotFound("no rows returned by query".into()),
            RE::FromSqlConversionFailure(_, _, cause) => {
                CarIndexError::Database(format!("failed to convert sqlite value: {cause}"))
            }
            RE::InvalidColumnType(_, name, ty) => {
                CarIndexError::Database(format!("invalid column type for {name}: {ty}"))
            }
            RE::InvalidPath(path) => CarIndexError::Database(format!(
                "invalid database path: {}",
                path.to_string_lossy()
            )),
            other => CarIndexError::Database(other.to_string()),
        }
    }
}

impl From<SqlError> for InfraError {
    fn from(value: SqlError) -> Self {
        InfraError(value.into_carindex())
    }
}

/* -------------------------------------------------------------------------- */
/* r2d2::Error → CarIndexError */
/* -------------------------------------------------------------------------- */

impl From<PoolError> for InfraError {
    fn from(value: PoolError) -> Self {
        InfraError(CarIndexError::Database(format!("connection pool error: {value}")))
    }
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → CarIndexError */
/* -------------------------------------------------------------------------- */

impl IntoCarIndexError for HttpError {
    fn into_carindex(self) -> CarIndexError {
        if self.is_timeout() {
            return CarIndexError::Network("HTTP request timed out".into());
        }

        if self.is_connect() {
            return CarIndexError::Network("HTTP connection failure".into());
        }

        if self.is_builder() {
            return CarIndexError::Config(format!("invalid HTTP request: {self}"));
        }

        if let Some(status) = self.status() {
            let code = status.as_u16();
            let message =
                format!("HTTP {} {}", code, status.canonical_reason().unwrap_or("unknown status"));

            return match code {
                401 | 403 => CarIndexError::Auth(message),
                404 => CarIndexError::NotFound(message),
                400..=499 if code != 429 => CarIndexError::InvalidInput(message),
                _ => CarIndexError::Network(message),
            };
        }

        CarIndexError::Network(self.to_string())
    }
}

impl From<HttpError> for InfraError {
    fn from(value: HttpError) -> Self {
        InfraError(value.into_carindex())
    }
}

/// Map a `spawn_blocking` join failure.
pub fn map_join_error(err: tokio::task::JoinError) -> CarIndexError {
    CarIndexError::Internal(format!("blocking database task failed: {err}"))
}
