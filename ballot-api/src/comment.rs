use uuid::Uuid;

use crate::{Error, PollId, Time, UserId, STUB_UUID};

#[derive(
    Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, serde::Deserialize, serde::Serialize,
)]
pub struct CommentId(pub Uuid);

impl CommentId {
    pub fn stub() -> CommentId {
        CommentId(STUB_UUID)
    }
}

/// Append-only; comments are never edited or deleted, and display order is
/// strictly `created_at` ascending.
#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Comment {
    pub id: CommentId,
    pub poll_id: PollId,
    pub user_id: UserId,
    pub text: String,
    pub created_at: Time,
}

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct NewComment {
    pub text: String,
}

impl NewComment {
    pub fn validate(&self) -> Result<(), Error> {
        crate::validate_string(&self.text)
    }
}

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct CommentAuthor {
    pub username: String,
    pub profile_picture: Option<String>,
}

/// A comment with its author's display fields resolved. `author` is `None`
/// when the author's profile could not be resolved; the comment itself is
/// still listed.
#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct CommentView {
    pub comment: Comment,
    pub author: Option<CommentAuthor>,
}
