use std::str::FromStr;

use anyhow::{anyhow, Context};
use serde_json::json;
use uuid::Uuid;

#[derive(Debug, Eq, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("Poll {0} not found")]
    PollNotFound(Uuid),

    #[error("Option {0:?} is not one of this poll's options")]
    InvalidOption(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),
}

impl Error {
    /// Store failures are retryable from the caller's point of view; everything
    /// the store reported is folded into the message.
    pub fn store_unavailable(err: anyhow::Error) -> Error {
        Error::StoreUnavailable(format!("{err:#}"))
    }

    pub fn status_code(&self) -> http::StatusCode {
        use http::StatusCode;
        match self {
            Error::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Error::NotAuthenticated => StatusCode::UNAUTHORIZED,
            Error::PollNotFound(_) => StatusCode::NOT_FOUND,
            Error::InvalidOption(_) => StatusCode::BAD_REQUEST,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    pub fn contents(&self) -> Vec<u8> {
        serde_json::to_vec(&match self {
            Error::InvalidInput(msg) => json!({
                "message": msg,
                "type": "invalid-input",
            }),
            Error::NotAuthenticated => json!({
                "message": "not authenticated",
                "type": "not-authenticated",
            }),
            Error::PollNotFound(id) => json!({
                "message": "poll not found",
                "type": "poll-not-found",
                "poll": id,
            }),
            Error::InvalidOption(opt) => json!({
                "message": "option is not one of this poll's options",
                "type": "invalid-option",
                "option": opt,
            }),
            Error::NotFound(what) => json!({
                "message": "not found",
                "type": "not-found",
                "what": what,
            }),
            Error::StoreUnavailable(msg) => json!({
                "message": msg,
                "type": "store-unavailable",
            }),
        })
        .expect("serializing error contents")
    }

    pub fn parse(body: &[u8]) -> anyhow::Result<Error> {
        let data: serde_json::Value =
            serde_json::from_slice(body).context("parsing error contents")?;
        Ok(
            match data
                .get("type")
                .and_then(|t| t.as_str())
                .ok_or_else(|| anyhow!("error type is not a string"))?
            {
                "invalid-input" => Error::InvalidInput(String::from(
                    data.get("message")
                        .and_then(|msg| msg.as_str())
                        .unwrap_or(""),
                )),
                "not-authenticated" => Error::NotAuthenticated,
                "poll-not-found" => Error::PollNotFound(
                    data.get("poll")
                        .and_then(|id| id.as_str())
                        .and_then(|id| Uuid::from_str(id).ok())
                        .ok_or_else(|| anyhow!("poll-not-found error without a proper poll id"))?,
                ),
                "invalid-option" => Error::InvalidOption(String::from(
                    data.get("option")
                        .and_then(|o| o.as_str())
                        .ok_or_else(|| anyhow!("invalid-option error without an option"))?,
                )),
                "not-found" => Error::NotFound(String::from(
                    data.get("what")
                        .and_then(|w| w.as_str())
                        .ok_or_else(|| anyhow!("not-found error without a subject"))?,
                )),
                "store-unavailable" => Error::StoreUnavailable(String::from(
                    data.get("message")
                        .and_then(|msg| msg.as_str())
                        .unwrap_or(""),
                )),
                _ => return Err(anyhow!("error contents has unknown type")),
            },
        )
    }
}
