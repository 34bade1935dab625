use std::collections::HashMap;

use anyhow::Context;
use async_trait::async_trait;
use ballot_api::{Comment, CommentId, Poll, PollId, Profile, Store, UserId, VoteOutcome};
use sqlx::{postgres::PgRow, Row};
use uuid::Uuid;

#[derive(Clone)]
pub struct PgStore(sqlx::PgPool);

impl PgStore {
    pub fn new(pool: sqlx::PgPool) -> PgStore {
        PgStore(pool)
    }

    /// Folds the votes table into the in-memory tally and voter maps of the
    /// given polls. One query for the whole batch.
    async fn load_votes(&self, polls: &mut [Poll]) -> anyhow::Result<()> {
        if polls.is_empty() {
            return Ok(());
        }
        let ids: Vec<Uuid> = polls.iter().map(|p| p.id.0).collect();
        let index: HashMap<PollId, usize> = polls
            .iter()
            .enumerate()
            .map(|(i, p)| (p.id, i))
            .collect();
        let rows = sqlx::query("SELECT poll_id, user_id, option FROM votes WHERE poll_id = ANY($1)")
            .bind(&ids)
            .fetch_all(&self.0)
            .await
            .context("querying votes table")?;
        for row in rows {
            let poll = PollId(row.try_get("poll_id").context("retrieving the poll_id field")?);
            let user = UserId(row.try_get("user_id").context("retrieving the user_id field")?);
            let option: String = row.try_get("option").context("retrieving the option field")?;
            if let Some(&i) = index.get(&poll) {
                let p = &mut polls[i];
                *p.votes.entry(option.clone()).or_insert(0) += 1;
                p.voters.insert(user, option);
            }
        }
        Ok(())
    }
}

fn poll_from_row(row: &PgRow) -> anyhow::Result<Poll> {
    let options: Vec<String> = row
        .try_get("options")
        .context("retrieving the options field")?;
    Ok(Poll {
        id: PollId(row.try_get("id").context("retrieving the id field")?),
        question: row
            .try_get("question")
            .context("retrieving the question field")?,
        votes: Poll::blank_tallies(&options),
        voters: HashMap::new(),
        options,
        creator_id: UserId(
            row.try_get("creator_id")
                .context("retrieving the creator_id field")?,
        ),
        created_at: row
            .try_get("created_at")
            .context("retrieving the created_at field")?,
    })
}

fn profile_from_row(row: &PgRow) -> anyhow::Result<Profile> {
    Ok(Profile {
        user_id: UserId(row.try_get("user_id").context("retrieving the user_id field")?),
        username: row
            .try_get("username")
            .context("retrieving the username field")?,
        bio: row.try_get("bio").context("retrieving the bio field")?,
        profile_picture: row
            .try_get("profile_picture")
            .context("retrieving the profile_picture field")?,
    })
}

#[async_trait]
impl Store for PgStore {
    async fn insert_poll(
        &self,
        question: String,
        options: Vec<String>,
        creator: UserId,
    ) -> anyhow::Result<Poll> {
        let id = Uuid::new_v4();
        let row = sqlx::query(
            "
                INSERT INTO polls (id, question, options, creator_id)
                VALUES ($1, $2, $3, $4)
                RETURNING created_at
            ",
        )
        .bind(id)
        .bind(&question)
        .bind(&options)
        .bind(creator.0)
        .fetch_one(&self.0)
        .await
        .context("inserting into polls table")?;
        Ok(Poll {
            id: PollId(id),
            votes: Poll::blank_tallies(&options),
            voters: HashMap::new(),
            question,
            options,
            creator_id: creator,
            created_at: row
                .try_get("created_at")
                .context("retrieving the created_at field")?,
        })
    }

    async fn poll(&self, id: PollId) -> anyhow::Result<Option<Poll>> {
        let row = sqlx::query(
            "SELECT id, question, options, creator_id, created_at FROM polls WHERE id = $1",
        )
        .bind(id.0)
        .fetch_optional(&self.0)
        .await
        .context("querying polls table")?;
        let mut polls = match row {
            None => return Ok(None),
            Some(row) => vec![poll_from_row(&row)?],
        };
        self.load_votes(&mut polls).await?;
        Ok(polls.pop())
    }

    async fn polls_newest_first(&self) -> anyhow::Result<Vec<Poll>> {
        let rows = sqlx::query(
            "
                SELECT id, question, options, creator_id, created_at
                    FROM polls
                ORDER BY created_at DESC
            ",
        )
        .fetch_all(&self.0)
        .await
        .context("querying polls table")?;
        let mut polls = rows
            .iter()
            .map(poll_from_row)
            .collect::<anyhow::Result<Vec<_>>>()?;
        self.load_votes(&mut polls).await?;
        Ok(polls)
    }

    async fn polls_by_creator(&self, creator: UserId) -> anyhow::Result<Vec<Poll>> {
        let rows = sqlx::query(
            "
                SELECT id, question, options, creator_id, created_at
                    FROM polls
                WHERE creator_id = $1
                ORDER BY created_at DESC
            ",
        )
        .bind(creator.0)
        .fetch_all(&self.0)
        .await
        .context("querying polls table by creator")?;
        let mut polls = rows
            .iter()
            .map(poll_from_row)
            .collect::<anyhow::Result<Vec<_>>>()?;
        self.load_votes(&mut polls).await?;
        Ok(polls)
    }

    async fn record_vote(
        &self,
        poll: PollId,
        user: UserId,
        option: &str,
    ) -> anyhow::Result<Option<VoteOutcome>> {
        let mut tx = self.0.begin().await.context("beginning vote transaction")?;
        let exists = sqlx::query("SELECT 1 FROM polls WHERE id = $1")
            .bind(poll.0)
            .fetch_optional(&mut *tx)
            .await
            .context("checking poll existence")?;
        if exists.is_none() {
            return Ok(None);
        }
        // First submission wins: the (poll_id, user_id) primary key turns any
        // re-cast into a zero-row insert, and the tally is derived from the
        // same table, so there is nothing to double-count.
        let inserted = sqlx::query(
            "
                INSERT INTO votes (poll_id, user_id, option)
                VALUES ($1, $2, $3)
                ON CONFLICT (poll_id, user_id) DO NOTHING
            ",
        )
        .bind(poll.0)
        .bind(user.0)
        .bind(option)
        .execute(&mut *tx)
        .await
        .context("inserting vote")?;
        let outcome = if inserted.rows_affected() == 0 {
            let row = sqlx::query("SELECT option FROM votes WHERE poll_id = $1 AND user_id = $2")
                .bind(poll.0)
                .bind(user.0)
                .fetch_one(&mut *tx)
                .await
                .context("fetching pre-existing vote")?;
            VoteOutcome::AlreadyCast {
                option: row.try_get("option").context("retrieving the option field")?,
            }
        } else {
            let row = sqlx::query(
                "SELECT COUNT(*) AS count FROM votes WHERE poll_id = $1 AND option = $2",
            )
            .bind(poll.0)
            .bind(option)
            .fetch_one(&mut *tx)
            .await
            .context("counting votes for option")?;
            let count: i64 = row.try_get("count").context("retrieving the count field")?;
            VoteOutcome::Recorded {
                option: option.to_string(),
                count: count as u64,
            }
        };
        tx.commit().await.context("committing vote transaction")?;
        Ok(Some(outcome))
    }

    async fn insert_comment(
        &self,
        poll: PollId,
        user: UserId,
        text: String,
    ) -> anyhow::Result<Option<Comment>> {
        // Polls are never deleted, so the existence check cannot go stale
        // before the insert; the foreign key is the backstop.
        let exists = sqlx::query("SELECT 1 FROM polls WHERE id = $1")
            .bind(poll.0)
            .fetch_optional(&self.0)
            .await
            .context("checking poll existence")?;
        if exists.is_none() {
            return Ok(None);
        }
        let id = Uuid::new_v4();
        let row = sqlx::query(
            "
                INSERT INTO comments (id, poll_id, user_id, text)
                VALUES ($1, $2, $3, $4)
                RETURNING created_at
            ",
        )
        .bind(id)
        .bind(poll.0)
        .bind(user.0)
        .bind(&text)
        .fetch_one(&self.0)
        .await
        .context("inserting into comments table")?;
        Ok(Some(Comment {
            id: CommentId(id),
            poll_id: poll,
            user_id: user,
            text,
            created_at: row
                .try_get("created_at")
                .context("retrieving the created_at field")?,
        }))
    }

    async fn comments_oldest_first(&self, poll: PollId) -> anyhow::Result<Vec<Comment>> {
        let rows = sqlx::query(
            "
                SELECT id, user_id, text, created_at
                    FROM comments
                WHERE poll_id = $1
                ORDER BY created_at
            ",
        )
        .bind(poll.0)
        .fetch_all(&self.0)
        .await
        .context("querying comments table")?;
        rows.iter()
            .map(|row| {
                Ok(Comment {
                    id: CommentId(row.try_get("id").context("retrieving the id field")?),
                    poll_id: poll,
                    user_id: UserId(
                        row.try_get("user_id")
                            .context("retrieving the user_id field")?,
                    ),
                    text: row.try_get("text").context("retrieving the text field")?,
                    created_at: row
                        .try_get("created_at")
                        .context("retrieving the created_at field")?,
                })
            })
            .collect()
    }

    async fn profile(&self, user: UserId) -> anyhow::Result<Option<Profile>> {
        let row = sqlx::query(
            "SELECT user_id, username, bio, profile_picture FROM profiles WHERE user_id = $1",
        )
        .bind(user.0)
        .fetch_optional(&self.0)
        .await
        .context("querying profiles table")?;
        row.as_ref().map(profile_from_row).transpose()
    }

    async fn profile_by_username(&self, username: &str) -> anyhow::Result<Option<Profile>> {
        let row = sqlx::query(
            "SELECT user_id, username, bio, profile_picture FROM profiles WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.0)
        .await
        .context("querying profiles table by username")?;
        row.as_ref().map(profile_from_row).transpose()
    }

    async fn upsert_profile(&self, profile: Profile) -> anyhow::Result<()> {
        sqlx::query(
            "
                INSERT INTO profiles (user_id, username, bio, profile_picture)
                VALUES ($1, $2, $3, $4)
                ON CONFLICT (user_id) DO UPDATE
                    SET username = EXCLUDED.username,
                        bio = EXCLUDED.bio,
                        profile_picture = EXCLUDED.profile_picture
            ",
        )
        .bind(profile.user_id.0)
        .bind(&profile.username)
        .bind(&profile.bio)
        .bind(&profile.profile_picture)
        .execute(&self.0)
        .await
        .context("upserting into profiles table")?;
        Ok(())
    }
}
