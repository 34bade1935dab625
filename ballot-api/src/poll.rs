use std::collections::HashMap;

use uuid::Uuid;

use crate::{Error, Time, UserId, STUB_UUID};

/// Creation-time cap on the number of options in a poll.
pub const MAX_POLL_OPTIONS: usize = 5;

#[derive(
    Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, serde::Deserialize, serde::Serialize,
)]
pub struct PollId(pub Uuid);

impl PollId {
    pub fn stub() -> PollId {
        PollId(STUB_UUID)
    }
}

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Poll {
    pub id: PollId,

    pub question: String,

    /// Options in submission order. The order is the display order, and the
    /// option text is the addressing key for votes: two options with the same
    /// text share a single tally bucket.
    pub options: Vec<String>,

    /// Tally per option text. Keys are exactly the option set, zeroed at
    /// creation; only ever incremented.
    pub votes: HashMap<String, u64>,

    /// Which option each user chose. A missing key means "has not voted".
    pub voters: HashMap<UserId, String>,

    pub creator_id: UserId,
    pub created_at: Time,
}

impl Poll {
    pub fn tally(&self, option: &str) -> u64 {
        self.votes.get(option).copied().unwrap_or(0)
    }

    pub fn total_votes(&self) -> u64 {
        self.votes.values().sum()
    }

    pub fn vote_of(&self, user: &UserId) -> Option<&str> {
        self.voters.get(user).map(|o| o as &str)
    }

    /// The tally map a freshly created poll starts with: one zeroed bucket per
    /// distinct option text.
    pub fn blank_tallies(options: &[String]) -> HashMap<String, u64> {
        options.iter().map(|o| (o.clone(), 0)).collect()
    }
}

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct NewPoll {
    pub question: String,
    pub options: Vec<String>,
}

impl NewPoll {
    pub fn validate(&self) -> Result<(), Error> {
        crate::validate_string(&self.question)?;
        if self.options.is_empty() {
            return Err(Error::InvalidInput(String::from(
                "a poll needs at least one option",
            )));
        }
        if self.options.len() > MAX_POLL_OPTIONS {
            return Err(Error::InvalidInput(format!(
                "a poll can have at most {MAX_POLL_OPTIONS} options"
            )));
        }
        for option in &self.options {
            crate::validate_string(option)?;
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct NewVote {
    pub option: String,
}

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub enum VoteOutcome {
    /// The vote was recorded; `count` is the new tally for `option`.
    Recorded { option: String, count: u64 },

    /// The user had already voted on this poll; `option` is their original
    /// choice, which stays unchanged.
    AlreadyCast { option: String },
}

impl VoteOutcome {
    pub fn option(&self) -> &str {
        match self {
            VoteOutcome::Recorded { option, .. } => option,
            VoteOutcome::AlreadyCast { option } => option,
        }
    }
}

/// One feed item: the poll with its live tallies, plus the viewer's own
/// recorded choice when there is a viewer and they have voted.
#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct FeedEntry {
    pub poll: Poll,
    pub viewer_vote: Option<String>,
}
