use std::sync::Arc;

use anyhow::anyhow;
use async_trait::async_trait;
use ballot_api::{
    ops, Comment, Error, NewComment, NewPoll, NewProfile, Poll, PollId, Profile, Store, UserId,
    Uuid, VoteOutcome,
};

use crate::MemStore;

fn user() -> Option<UserId> {
    Some(UserId(Uuid::new_v4()))
}

fn new_poll(question: &str, options: &[&str]) -> NewPoll {
    NewPoll {
        question: question.to_string(),
        options: options.iter().map(|o| o.to_string()).collect(),
    }
}

async fn tea_or_coffee(store: &MemStore, creator: Option<UserId>) -> Poll {
    ops::create_poll(store, creator, new_poll("Tea or coffee?", &["Tea", "Coffee"]))
        .await
        .expect("creating poll")
}

#[tokio::test]
async fn created_poll_starts_zeroed() {
    let store = MemStore::new();
    let poll = tea_or_coffee(&store, user()).await;
    assert_eq!(poll.options, vec!["Tea", "Coffee"]);
    assert_eq!(poll.votes.len(), 2);
    assert_eq!(poll.tally("Tea"), 0);
    assert_eq!(poll.tally("Coffee"), 0);
    assert!(poll.voters.is_empty());
}

#[tokio::test]
async fn create_poll_rejects_invalid_input_without_writing() {
    let store = MemStore::new();
    for bad in [
        new_poll("", &["Tea"]),
        new_poll("   ", &["Tea"]),
        new_poll("Tea or coffee?", &[]),
        new_poll("Tea or coffee?", &["Tea", ""]),
        new_poll("Pick one", &["a", "b", "c", "d", "e", "f"]),
    ] {
        assert!(matches!(
            ops::create_poll(&store, user(), bad).await,
            Err(Error::InvalidInput(_))
        ));
    }
    assert_eq!(store.test_num_polls().await, 0);
}

#[tokio::test]
async fn create_poll_requires_a_user() {
    let store = MemStore::new();
    assert_eq!(
        ops::create_poll(&store, None, new_poll("Tea or coffee?", &["Tea"])).await,
        Err(Error::NotAuthenticated)
    );
}

#[tokio::test]
async fn duplicate_option_texts_share_one_bucket() {
    let store = MemStore::new();
    let poll = ops::create_poll(&store, user(), new_poll("Tea or tea?", &["Tea", "Tea"]))
        .await
        .expect("creating poll");
    assert_eq!(poll.options.len(), 2);
    assert_eq!(poll.votes.len(), 1);

    let voter = user();
    ops::cast_vote(&store, voter, poll.id, "Tea")
        .await
        .expect("voting");
    let poll = store.poll(poll.id).await.unwrap().unwrap();
    assert_eq!(poll.tally("Tea"), 1);
    assert_eq!(poll.total_votes(), 1);
}

#[tokio::test]
async fn vote_then_revote_then_second_user() {
    let store = MemStore::new();
    let poll = tea_or_coffee(&store, user()).await;
    let (u1, u2) = (user(), user());

    let outcome = ops::cast_vote(&store, u1, poll.id, "Coffee").await.unwrap();
    assert_eq!(
        outcome,
        VoteOutcome::Recorded {
            option: String::from("Coffee"),
            count: 1
        }
    );
    let state = store.poll(poll.id).await.unwrap().unwrap();
    assert_eq!(state.tally("Tea"), 0);
    assert_eq!(state.tally("Coffee"), 1);
    assert_eq!(state.vote_of(&u1.unwrap()), Some("Coffee"));

    // Re-casting, even for a different option, changes nothing and returns
    // the original choice.
    let outcome = ops::cast_vote(&store, u1, poll.id, "Tea").await.unwrap();
    assert_eq!(
        outcome,
        VoteOutcome::AlreadyCast {
            option: String::from("Coffee")
        }
    );
    let state = store.poll(poll.id).await.unwrap().unwrap();
    assert_eq!(state.tally("Tea"), 0);
    assert_eq!(state.tally("Coffee"), 1);
    assert_eq!(state.vote_of(&u1.unwrap()), Some("Coffee"));

    let outcome = ops::cast_vote(&store, u2, poll.id, "Tea").await.unwrap();
    assert_eq!(
        outcome,
        VoteOutcome::Recorded {
            option: String::from("Tea"),
            count: 1
        }
    );
    let state = store.poll(poll.id).await.unwrap().unwrap();
    assert_eq!(state.tally("Tea"), 1);
    assert_eq!(state.tally("Coffee"), 1);
    assert_eq!(state.total_votes() as usize, state.voters.len());
}

#[tokio::test]
async fn vote_on_unknown_option_changes_nothing() {
    let store = MemStore::new();
    let poll = tea_or_coffee(&store, user()).await;
    assert_eq!(
        ops::cast_vote(&store, user(), poll.id, "Soda").await,
        Err(Error::InvalidOption(String::from("Soda")))
    );
    let state = store.poll(poll.id).await.unwrap().unwrap();
    assert_eq!(state.total_votes(), 0);
    assert!(state.voters.is_empty());
}

#[tokio::test]
async fn vote_errors_on_missing_poll_or_user() {
    let store = MemStore::new();
    let gone = PollId(Uuid::new_v4());
    assert_eq!(
        ops::cast_vote(&store, user(), gone, "Tea").await,
        Err(Error::PollNotFound(gone.0))
    );
    let poll = tea_or_coffee(&store, user()).await;
    assert_eq!(
        ops::cast_vote(&store, None, poll.id, "Tea").await,
        Err(Error::NotAuthenticated)
    );
}

#[tokio::test]
async fn concurrent_votes_lose_no_updates() {
    const VOTERS: usize = 32;
    let store = Arc::new(MemStore::new());
    let poll = tea_or_coffee(&store, user()).await;

    let tasks = (0..VOTERS).map(|_| {
        let store = store.clone();
        let poll_id = poll.id;
        tokio::spawn(async move {
            ops::cast_vote(&*store, user(), poll_id, "Tea")
                .await
                .expect("voting")
        })
    });
    for result in futures::future::join_all(tasks).await {
        result.expect("vote task panicked");
    }

    let state = store.poll(poll.id).await.unwrap().unwrap();
    assert_eq!(state.tally("Tea"), VOTERS as u64);
    assert_eq!(state.voters.len(), VOTERS);
    assert_eq!(state.total_votes(), VOTERS as u64);
}

#[tokio::test]
async fn feed_is_newest_first_and_tolerates_empty_store() {
    let store = MemStore::new();
    assert_eq!(ops::list_feed(&store, None).await.unwrap(), vec![]);

    let creator = user();
    let first = tea_or_coffee(&store, creator).await;
    let second = ops::create_poll(&store, creator, new_poll("Cats or dogs?", &["Cats", "Dogs"]))
        .await
        .unwrap();
    let third = ops::create_poll(&store, creator, new_poll("Rain or shine?", &["Rain", "Shine"]))
        .await
        .unwrap();

    let feed = ops::list_feed(&store, None).await.unwrap();
    assert_eq!(
        feed.iter().map(|e| e.poll.id).collect::<Vec<_>>(),
        vec![third.id, second.id, first.id]
    );
    for window in feed.windows(2) {
        assert!(window[0].poll.created_at >= window[1].poll.created_at);
    }
}

#[tokio::test]
async fn feed_carries_per_viewer_vote_state() {
    let store = MemStore::new();
    let poll = tea_or_coffee(&store, user()).await;
    let voter = user();
    ops::cast_vote(&store, voter, poll.id, "Coffee").await.unwrap();

    let feed = ops::list_feed(&store, voter).await.unwrap();
    assert_eq!(feed[0].viewer_vote.as_deref(), Some("Coffee"));
    assert_eq!(feed[0].poll.tally("Coffee"), 1);

    let feed = ops::list_feed(&store, user()).await.unwrap();
    assert_eq!(feed[0].viewer_vote, None);

    let feed = ops::list_feed(&store, None).await.unwrap();
    assert_eq!(feed[0].viewer_vote, None);
}

#[tokio::test]
async fn comments_list_oldest_first() {
    let store = MemStore::new();
    let poll = tea_or_coffee(&store, user()).await;
    assert_eq!(ops::list_comments(&store, poll.id).await.unwrap(), vec![]);

    let commenter = user();
    for text in ["first", "second", "third"] {
        ops::add_comment(
            &store,
            commenter,
            poll.id,
            NewComment {
                text: text.to_string(),
            },
        )
        .await
        .expect("commenting");
    }

    let comments = ops::list_comments(&store, poll.id).await.unwrap();
    assert_eq!(
        comments
            .iter()
            .map(|c| &c.comment.text as &str)
            .collect::<Vec<_>>(),
        vec!["first", "second", "third"]
    );
    for window in comments.windows(2) {
        assert!(window[0].comment.created_at <= window[1].comment.created_at);
    }
}

#[tokio::test]
async fn add_comment_validates_before_writing() {
    let store = MemStore::new();
    let poll = tea_or_coffee(&store, user()).await;
    assert!(matches!(
        ops::add_comment(&store, user(), poll.id, NewComment { text: String::from("  ") }).await,
        Err(Error::InvalidInput(_))
    ));
    assert_eq!(
        ops::add_comment(&store, None, poll.id, NewComment { text: String::from("hi") }).await,
        Err(Error::NotAuthenticated)
    );
    let gone = PollId(Uuid::new_v4());
    assert_eq!(
        ops::add_comment(&store, user(), gone, NewComment { text: String::from("hi") }).await,
        Err(Error::PollNotFound(gone.0))
    );
    assert!(ops::list_comments(&store, poll.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn comment_authors_resolve_once_per_user() {
    let store = MemStore::new();
    let poll = tea_or_coffee(&store, user()).await;
    let known = user();
    let unknown = user();

    ops::update_profile(
        &store,
        known,
        NewProfile {
            username: String::from("alice"),
            bio: String::from("tea person"),
            profile_picture: Some(String::from("https://example.com/alice.png")),
        },
    )
    .await
    .unwrap();

    for (who, text) in [(known, "mine"), (unknown, "ghost"), (known, "again")] {
        ops::add_comment(&store, who, poll.id, NewComment { text: text.to_string() })
            .await
            .unwrap();
    }

    let comments = ops::list_comments(&store, poll.id).await.unwrap();
    assert_eq!(comments.len(), 3);
    assert_eq!(
        comments[0].author.as_ref().map(|a| &a.username as &str),
        Some("alice")
    );
    // No profile record: the comment still shows up, author unresolved.
    assert_eq!(comments[1].author, None);
    assert_eq!(comments[2].author, comments[0].author);
}

/// Delegates to a [`MemStore`] but fails every profile lookup, to check that a
/// broken profile store degrades the listing instead of aborting it.
struct BrokenProfiles(MemStore);

#[async_trait]
impl Store for BrokenProfiles {
    async fn insert_poll(
        &self,
        question: String,
        options: Vec<String>,
        creator: UserId,
    ) -> anyhow::Result<Poll> {
        self.0.insert_poll(question, options, creator).await
    }

    async fn poll(&self, id: PollId) -> anyhow::Result<Option<Poll>> {
        self.0.poll(id).await
    }

    async fn polls_newest_first(&self) -> anyhow::Result<Vec<Poll>> {
        self.0.polls_newest_first().await
    }

    async fn polls_by_creator(&self, creator: UserId) -> anyhow::Result<Vec<Poll>> {
        self.0.polls_by_creator(creator).await
    }

    async fn record_vote(
        &self,
        poll: PollId,
        user: UserId,
        option: &str,
    ) -> anyhow::Result<Option<VoteOutcome>> {
        self.0.record_vote(poll, user, option).await
    }

    async fn insert_comment(
        &self,
        poll: PollId,
        user: UserId,
        text: String,
    ) -> anyhow::Result<Option<Comment>> {
        self.0.insert_comment(poll, user, text).await
    }

    async fn comments_oldest_first(&self, poll: PollId) -> anyhow::Result<Vec<Comment>> {
        self.0.comments_oldest_first(poll).await
    }

    async fn profile(&self, _user: UserId) -> anyhow::Result<Option<Profile>> {
        Err(anyhow!("profile backend is down"))
    }

    async fn profile_by_username(&self, _username: &str) -> anyhow::Result<Option<Profile>> {
        Err(anyhow!("profile backend is down"))
    }

    async fn upsert_profile(&self, profile: Profile) -> anyhow::Result<()> {
        self.0.upsert_profile(profile).await
    }
}

#[tokio::test]
async fn failed_author_lookup_does_not_abort_the_listing() {
    let store = BrokenProfiles(MemStore::new());
    let poll = tea_or_coffee(&store.0, user()).await;
    ops::add_comment(&store, user(), poll.id, NewComment { text: String::from("hello") })
        .await
        .unwrap();

    let comments = ops::list_comments(&store, poll.id).await.unwrap();
    assert_eq!(comments.len(), 1);
    assert_eq!(comments[0].author, None);

    // A direct profile-page lookup against the same backend is a hard failure.
    assert!(matches!(
        ops::profile_by_username(&store, "alice").await,
        Err(Error::StoreUnavailable(_))
    ));
}

#[tokio::test]
async fn profile_pages_list_authored_polls_newest_first() {
    let store = MemStore::new();
    let alice = user();
    let bob = user();

    ops::update_profile(
        &store,
        alice,
        NewProfile {
            username: String::from("alice"),
            bio: String::new(),
            profile_picture: None,
        },
    )
    .await
    .unwrap();

    let p1 = tea_or_coffee(&store, alice).await;
    let _other = tea_or_coffee(&store, bob).await;
    let p2 = ops::create_poll(&store, alice, new_poll("Cats or dogs?", &["Cats", "Dogs"]))
        .await
        .unwrap();

    let page = ops::profile_by_username(&store, "alice").await.unwrap();
    assert_eq!(page.profile.user_id, alice.unwrap());
    assert_eq!(
        page.polls.iter().map(|p| p.id).collect::<Vec<_>>(),
        vec![p2.id, p1.id]
    );

    let own = ops::own_profile(&store, alice).await.unwrap();
    assert_eq!(own, page);
}

#[tokio::test]
async fn profile_lookups_miss_cleanly() {
    let store = MemStore::new();
    assert!(matches!(
        ops::profile_by_username(&store, "nobody").await,
        Err(Error::NotFound(_))
    ));
    // Authenticated but no profile record yet: the state right after account
    // creation.
    assert!(matches!(
        ops::own_profile(&store, user()).await,
        Err(Error::NotFound(_))
    ));
    assert_eq!(
        ops::own_profile(&store, None).await,
        Err(Error::NotAuthenticated)
    );
}

#[tokio::test]
async fn update_profile_upserts() {
    let store = MemStore::new();
    let alice = user();
    let first = ops::update_profile(
        &store,
        alice,
        NewProfile {
            username: String::from("alice"),
            bio: String::from("old bio"),
            profile_picture: None,
        },
    )
    .await
    .unwrap();
    assert_eq!(first.bio, "old bio");

    let second = ops::update_profile(
        &store,
        alice,
        NewProfile {
            username: String::from("alice"),
            bio: String::from("new bio"),
            profile_picture: Some(String::from("https://example.com/a.png")),
        },
    )
    .await
    .unwrap();
    assert_eq!(second.bio, "new bio");

    let page = ops::own_profile(&store, alice).await.unwrap();
    assert_eq!(page.profile, second);

    assert!(matches!(
        ops::update_profile(
            &store,
            alice,
            NewProfile {
                username: String::from("  "),
                bio: String::new(),
                profile_picture: None,
            },
        )
        .await,
        Err(Error::InvalidInput(_))
    ));
}
