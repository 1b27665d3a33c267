use axum::{
    Json,
    response::{IntoResponse, Redirect, Response},
};
use serde::Serialize;

use crate::{auth::AuthContext, error::AppError};

/// Outcome
///
/// Result of a loader or form action. A handler either returns data, sends the browser
/// somewhere else, or fails with a typed error. Callers match on all three.
#[derive(Debug)]
pub enum Outcome<T> {
    Data(T),
    /// 303 See Other to the given location.
    Redirect(String),
    Error(AppError),
}

impl<T> Outcome<T> {
    pub fn redirect(location: impl Into<String>) -> Self {
        Outcome::Redirect(location.into())
    }
}

impl<T> From<Result<T, AppError>> for Outcome<T> {
    fn from(result: Result<T, AppError>) -> Self {
        match result {
            Ok(data) => Outcome::Data(data),
            Err(err) => Outcome::Error(err),
        }
    }
}

impl<T> From<AppError> for Outcome<T> {
    fn from(err: AppError) -> Self {
        Outcome::Error(err)
    }
}

impl<T: Serialize> IntoResponse for Outcome<T> {
    fn into_response(self) -> Response {
        match self {
            Outcome::Data(data) => Json(data).into_response(),
            Outcome::Redirect(location) => Redirect::to(&location).into_response(),
            Outcome::Error(err) => err.into_response(),
        }
    }
}

/// Page
///
/// Gated loader payload with the caller's identity merged in: the data fields stay at the top
/// level and the identity sits under `user`.
#[derive(Debug, Serialize)]
pub struct Page<T> {
    #[serde(flatten)]
    pub data: T,
    pub user: AuthContext,
}

impl<T> Page<T> {
    pub fn new(user: AuthContext, data: T) -> Self {
        Self { data, user }
    }
}

/// attempt
///
/// Unwraps a `Result` inside a handler returning [`Outcome`], short-circuiting with
/// `Outcome::Error` on failure.
macro_rules! attempt {
    ($result:expr) => {
        match $result {
            Ok(value) => value,
            Err(err) => return $crate::response::Outcome::Error(err.into()),
        }
    };
}

pub(crate) use attempt;
