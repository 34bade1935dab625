pub mod comment;
pub mod error;
pub mod ops;
pub mod poll;
pub mod profile;
pub mod store;

pub use comment::{Comment, CommentAuthor, CommentId, CommentView, NewComment};
pub use error::Error;
pub use poll::{FeedEntry, NewPoll, NewVote, Poll, PollId, VoteOutcome, MAX_POLL_OPTIONS};
pub use profile::{NewProfile, Profile, ProfileView};
pub use store::Store;

pub use uuid::{uuid, Uuid};
pub type Time = chrono::DateTime<chrono::Utc>;

pub const STUB_UUID: Uuid = uuid!("ffffffff-ffff-ffff-ffff-ffffffffffff");

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, serde::Deserialize, serde::Serialize)]
pub struct UserId(pub Uuid);

impl UserId {
    pub fn stub() -> UserId {
        UserId(STUB_UUID)
    }
}

pub(crate) fn validate_string(s: &str) -> Result<(), Error> {
    if s.trim().is_empty() {
        return Err(Error::InvalidInput(String::from(
            "text must not be empty or whitespace-only",
        )));
    }
    if s.contains('\0') {
        return Err(Error::InvalidInput(String::from(
            "null byte in string is not allowed",
        )));
    }
    Ok(())
}
