//! In-memory [`Store`] used as the test double for the aggregation
//! operations. One mutex around the whole state makes every method a single
//! atomic step, which is exactly the consistency the real store provides per
//! record.

use std::collections::HashMap;

use async_trait::async_trait;
use ballot_api::{Comment, CommentId, Poll, PollId, Profile, Store, UserId, VoteOutcome};
use chrono::Utc;
use tokio::sync::Mutex;
use uuid::Uuid;

pub struct MemStore(Mutex<Inner>);

#[derive(Default)]
struct Inner {
    polls: HashMap<PollId, Poll>,
    // Creation order; same-instant timestamps keep their insertion order.
    poll_order: Vec<PollId>,
    comments: HashMap<PollId, Vec<Comment>>,
    profiles: HashMap<UserId, Profile>,
}

impl MemStore {
    pub fn new() -> MemStore {
        MemStore(Mutex::new(Inner::default()))
    }

    /// Number of polls currently stored.
    pub async fn test_num_polls(&self) -> usize {
        self.0.lock().await.polls.len()
    }
}

impl Default for MemStore {
    fn default() -> MemStore {
        MemStore::new()
    }
}

#[async_trait]
impl Store for MemStore {
    async fn insert_poll(
        &self,
        question: String,
        options: Vec<String>,
        creator: UserId,
    ) -> anyhow::Result<Poll> {
        let mut inner = self.0.lock().await;
        let poll = Poll {
            id: PollId(Uuid::new_v4()),
            votes: Poll::blank_tallies(&options),
            voters: HashMap::new(),
            question,
            options,
            creator_id: creator,
            created_at: Utc::now(),
        };
        inner.poll_order.push(poll.id);
        inner.polls.insert(poll.id, poll.clone());
        Ok(poll)
    }

    async fn poll(&self, id: PollId) -> anyhow::Result<Option<Poll>> {
        Ok(self.0.lock().await.polls.get(&id).cloned())
    }

    async fn polls_newest_first(&self) -> anyhow::Result<Vec<Poll>> {
        let inner = self.0.lock().await;
        Ok(inner
            .poll_order
            .iter()
            .rev()
            .map(|id| inner.polls[id].clone())
            .collect())
    }

    async fn polls_by_creator(&self, creator: UserId) -> anyhow::Result<Vec<Poll>> {
        let inner = self.0.lock().await;
        Ok(inner
            .poll_order
            .iter()
            .rev()
            .map(|id| &inner.polls[id])
            .filter(|p| p.creator_id == creator)
            .cloned()
            .collect())
    }

    async fn record_vote(
        &self,
        poll: PollId,
        user: UserId,
        option: &str,
    ) -> anyhow::Result<Option<VoteOutcome>> {
        let mut inner = self.0.lock().await;
        let poll = match inner.polls.get_mut(&poll) {
            None => return Ok(None),
            Some(p) => p,
        };
        if let Some(previous) = poll.voters.get(&user) {
            return Ok(Some(VoteOutcome::AlreadyCast {
                option: previous.clone(),
            }));
        }
        let count = poll.votes.entry(option.to_string()).or_insert(0);
        *count += 1;
        let count = *count;
        poll.voters.insert(user, option.to_string());
        Ok(Some(VoteOutcome::Recorded {
            option: option.to_string(),
            count,
        }))
    }

    async fn insert_comment(
        &self,
        poll: PollId,
        user: UserId,
        text: String,
    ) -> anyhow::Result<Option<Comment>> {
        let mut inner = self.0.lock().await;
        if !inner.polls.contains_key(&poll) {
            return Ok(None);
        }
        let comment = Comment {
            id: CommentId(Uuid::new_v4()),
            poll_id: poll,
            user_id: user,
            text,
            created_at: Utc::now(),
        };
        inner.comments.entry(poll).or_default().push(comment.clone());
        Ok(Some(comment))
    }

    async fn comments_oldest_first(&self, poll: PollId) -> anyhow::Result<Vec<Comment>> {
        Ok(self
            .0
            .lock()
            .await
            .comments
            .get(&poll)
            .cloned()
            .unwrap_or_default())
    }

    async fn profile(&self, user: UserId) -> anyhow::Result<Option<Profile>> {
        Ok(self.0.lock().await.profiles.get(&user).cloned())
    }

    async fn profile_by_username(&self, username: &str) -> anyhow::Result<Option<Profile>> {
        Ok(self
            .0
            .lock()
            .await
            .profiles
            .values()
            .find(|p| p.username == username)
            .cloned())
    }

    async fn upsert_profile(&self, profile: Profile) -> anyhow::Result<()> {
        self.0.lock().await.profiles.insert(profile.user_id, profile);
        Ok(())
    }
}

#[cfg(test)]
mod tests;
