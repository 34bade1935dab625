use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{self, request},
};
use ballot_api::{Error as ApiError, UserId, Uuid};

use crate::{db::PgStore, Error};

#[derive(Clone, axum::extract::FromRef)]
pub struct AppState {
    pub db: PgStore,
}

/// The identity provider sits upstream and hands us a verified user id as
/// `Authorization: Bearer <uuid>`; this only parses it out.
fn bearer_uid(header: &str) -> Option<UserId> {
    let mut parts = header.split(' ');
    if !parts.next()?.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = parts.next()?;
    if parts.next().is_some() {
        return None;
    }
    Uuid::try_from(token).ok().map(UserId)
}

/// The caller's identity, when there is one. A missing header is an anonymous
/// caller; a malformed one is rejected. Mutating operations reject anonymous
/// callers themselves, read operations degrade to an unpersonalized view.
pub struct MaybeAuth(pub Option<UserId>);

#[async_trait]
impl<S: Sync> FromRequestParts<S> for MaybeAuth {
    type Rejection = Error;

    async fn from_request_parts(req: &mut request::Parts, _state: &S) -> Result<MaybeAuth, Error> {
        match req.headers.get(http::header::AUTHORIZATION) {
            None => Ok(MaybeAuth(None)),
            Some(header) => {
                let header = header
                    .to_str()
                    .map_err(|_| Error::Api(ApiError::NotAuthenticated))?;
                Ok(MaybeAuth(Some(
                    bearer_uid(header).ok_or(Error::Api(ApiError::NotAuthenticated))?,
                )))
            }
        }
    }
}
