//! The aggregation operations, generic over any [`Store`].
//!
//! The caller's identity is always threaded in explicitly as an
//! `Option<UserId>` (an absent id is what the identity provider reports for an
//! anonymous caller); mutating operations reject it, read operations degrade
//! to an unpersonalized view. Validation happens before any store write, and
//! store failures surface as [`Error::StoreUnavailable`] without retries.

use std::collections::{hash_map, HashMap};

use crate::{
    Comment, CommentAuthor, CommentView, Error, FeedEntry, NewComment, NewPoll, NewProfile, Poll,
    PollId, Profile, ProfileView, Store, UserId, VoteOutcome,
};

pub async fn create_poll<S: Store>(
    store: &S,
    user: Option<UserId>,
    poll: NewPoll,
) -> Result<Poll, Error> {
    let user = user.ok_or(Error::NotAuthenticated)?;
    poll.validate()?;
    store
        .insert_poll(poll.question, poll.options, user)
        .await
        .map_err(Error::store_unavailable)
}

pub async fn cast_vote<S: Store>(
    store: &S,
    user: Option<UserId>,
    poll_id: PollId,
    option: &str,
) -> Result<VoteOutcome, Error> {
    let user = user.ok_or(Error::NotAuthenticated)?;
    let poll = store
        .poll(poll_id)
        .await
        .map_err(Error::store_unavailable)?
        .ok_or(Error::PollNotFound(poll_id.0))?;
    if !poll.options.iter().any(|o| o == option) {
        return Err(Error::InvalidOption(option.to_string()));
    }
    // Options are immutable after creation, so the membership check above
    // still holds when the store transaction runs. The check-and-increment
    // itself is the store's single atomic region.
    store
        .record_vote(poll_id, user, option)
        .await
        .map_err(Error::store_unavailable)?
        .ok_or(Error::PollNotFound(poll_id.0))
}

pub async fn add_comment<S: Store>(
    store: &S,
    user: Option<UserId>,
    poll_id: PollId,
    comment: NewComment,
) -> Result<Comment, Error> {
    let user = user.ok_or(Error::NotAuthenticated)?;
    comment.validate()?;
    store
        .insert_comment(poll_id, user, comment.text)
        .await
        .map_err(Error::store_unavailable)?
        .ok_or(Error::PollNotFound(poll_id.0))
}

/// Lists a poll's comments oldest-first, resolving each author's display
/// fields with one profile lookup per distinct author. A lookup that misses or
/// fails leaves that comment with `author: None` instead of aborting the
/// listing.
pub async fn list_comments<S: Store>(
    store: &S,
    poll_id: PollId,
) -> Result<Vec<CommentView>, Error> {
    let comments = store
        .comments_oldest_first(poll_id)
        .await
        .map_err(Error::store_unavailable)?;

    let mut authors: HashMap<UserId, Option<CommentAuthor>> = HashMap::new();
    let mut views = Vec::with_capacity(comments.len());
    for comment in comments {
        let author = match authors.entry(comment.user_id) {
            hash_map::Entry::Occupied(entry) => entry.get().clone(),
            hash_map::Entry::Vacant(entry) => {
                let resolved = match store.profile(comment.user_id).await {
                    Ok(Some(p)) => Some(CommentAuthor {
                        username: p.username,
                        profile_picture: p.profile_picture,
                    }),
                    Ok(None) => None,
                    Err(err) => {
                        tracing::warn!(user = ?comment.user_id, ?err, "failed resolving comment author");
                        None
                    }
                };
                entry.insert(resolved).clone()
            }
        };
        views.push(CommentView { comment, author });
    }
    Ok(views)
}

/// The reverse-chronological feed, annotated with the viewer's own vote on
/// each poll when there is a viewer.
pub async fn list_feed<S: Store>(
    store: &S,
    viewer: Option<UserId>,
) -> Result<Vec<FeedEntry>, Error> {
    let polls = store
        .polls_newest_first()
        .await
        .map_err(Error::store_unavailable)?;
    Ok(polls
        .into_iter()
        .map(|poll| {
            let viewer_vote = viewer
                .as_ref()
                .and_then(|u| poll.vote_of(u))
                .map(String::from);
            FeedEntry { poll, viewer_vote }
        })
        .collect())
}

pub async fn profile_by_username<S: Store>(
    store: &S,
    username: &str,
) -> Result<ProfileView, Error> {
    let profile = store
        .profile_by_username(username)
        .await
        .map_err(Error::store_unavailable)?
        .ok_or_else(|| Error::NotFound(format!("profile {username:?}")))?;
    profile_view(store, profile).await
}

/// Same page as [`profile_by_username`] but keyed by the authenticated id.
/// `NotFound` here is a legitimate state right after account creation, before
/// profile setup.
pub async fn own_profile<S: Store>(
    store: &S,
    user: Option<UserId>,
) -> Result<ProfileView, Error> {
    let user = user.ok_or(Error::NotAuthenticated)?;
    let profile = store
        .profile(user)
        .await
        .map_err(Error::store_unavailable)?
        .ok_or_else(|| Error::NotFound(format!("profile of user {}", user.0)))?;
    profile_view(store, profile).await
}

async fn profile_view<S: Store>(store: &S, profile: Profile) -> Result<ProfileView, Error> {
    let polls = store
        .polls_by_creator(profile.user_id)
        .await
        .map_err(Error::store_unavailable)?;
    Ok(ProfileView { profile, polls })
}

/// Profile setup: creates or replaces the caller's profile record.
pub async fn update_profile<S: Store>(
    store: &S,
    user: Option<UserId>,
    profile: NewProfile,
) -> Result<Profile, Error> {
    let user = user.ok_or(Error::NotAuthenticated)?;
    profile.validate()?;
    let profile = Profile {
        user_id: user,
        username: profile.username,
        bio: profile.bio,
        profile_picture: profile.profile_picture,
    };
    store
        .upsert_profile(profile.clone())
        .await
        .map_err(Error::store_unavailable)?;
    Ok(profile)
}
