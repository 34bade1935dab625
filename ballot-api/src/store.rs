use async_trait::async_trait;

use crate::{Comment, Poll, PollId, Profile, UserId, VoteOutcome};

/// Document-style store contract the aggregation operations run against.
///
/// Implementations assign ids and `created_at` timestamps themselves; the
/// timestamps must be usable for ordering. Methods return `anyhow::Result`,
/// and the ops layer maps any failure to `Error::StoreUnavailable` — a store
/// that times out must surface the failure, not swallow it.
#[async_trait]
pub trait Store {
    /// Writes a new poll with zeroed tallies and an empty voter map.
    async fn insert_poll(
        &self,
        question: String,
        options: Vec<String>,
        creator: UserId,
    ) -> anyhow::Result<Poll>;

    async fn poll(&self, id: PollId) -> anyhow::Result<Option<Poll>>;

    /// All polls, `created_at` descending.
    async fn polls_newest_first(&self) -> anyhow::Result<Vec<Poll>>;

    /// Polls with `creator_id == creator`, `created_at` descending.
    async fn polls_by_creator(&self, creator: UserId) -> anyhow::Result<Vec<Poll>>;

    /// Atomically records `user`'s vote for `option` on `poll`: if the user
    /// has no recorded vote yet, the tally increment and the voter-map write
    /// happen as one transaction; if they do, nothing changes and the original
    /// choice comes back as `VoteOutcome::AlreadyCast`.
    ///
    /// Returns `None` when the poll does not exist. Callers must already have
    /// checked that `option` is one of the poll's options; options are
    /// immutable after creation, so that check cannot go stale.
    async fn record_vote(
        &self,
        poll: PollId,
        user: UserId,
        option: &str,
    ) -> anyhow::Result<Option<VoteOutcome>>;

    /// Appends a comment; returns `None` when the poll does not exist.
    async fn insert_comment(
        &self,
        poll: PollId,
        user: UserId,
        text: String,
    ) -> anyhow::Result<Option<Comment>>;

    /// Comments on `poll`, `created_at` ascending. Empty when the poll has no
    /// comments (or does not exist).
    async fn comments_oldest_first(&self, poll: PollId) -> anyhow::Result<Vec<Comment>>;

    async fn profile(&self, user: UserId) -> anyhow::Result<Option<Profile>>;

    /// Unique lookup; usernames are assumed unique by the store.
    async fn profile_by_username(&self, username: &str) -> anyhow::Result<Option<Profile>>;

    async fn upsert_profile(&self, profile: Profile) -> anyhow::Result<()>;
}
