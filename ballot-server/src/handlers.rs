use axum::{
    extract::{Path, State},
    Json,
};
use ballot_api::{
    ops, Comment, CommentView, FeedEntry, NewComment, NewPoll, NewProfile, NewVote, Poll, PollId,
    Profile, ProfileView, Uuid, VoteOutcome,
};

use crate::{db::PgStore, extractors::MaybeAuth, Error};

pub async fn create_poll(
    MaybeAuth(user): MaybeAuth,
    State(db): State<PgStore>,
    Json(data): Json<NewPoll>,
) -> Result<Json<Poll>, Error> {
    Ok(Json(ops::create_poll(&db, user, data).await?))
}

pub async fn list_feed(
    MaybeAuth(viewer): MaybeAuth,
    State(db): State<PgStore>,
) -> Result<Json<Vec<FeedEntry>>, Error> {
    Ok(Json(ops::list_feed(&db, viewer).await?))
}

pub async fn cast_vote(
    MaybeAuth(user): MaybeAuth,
    State(db): State<PgStore>,
    Path(poll_id): Path<Uuid>,
    Json(data): Json<NewVote>,
) -> Result<Json<VoteOutcome>, Error> {
    Ok(Json(
        ops::cast_vote(&db, user, PollId(poll_id), &data.option).await?,
    ))
}

pub async fn add_comment(
    MaybeAuth(user): MaybeAuth,
    State(db): State<PgStore>,
    Path(poll_id): Path<Uuid>,
    Json(data): Json<NewComment>,
) -> Result<Json<Comment>, Error> {
    Ok(Json(
        ops::add_comment(&db, user, PollId(poll_id), data).await?,
    ))
}

pub async fn list_comments(
    State(db): State<PgStore>,
    Path(poll_id): Path<Uuid>,
) -> Result<Json<Vec<CommentView>>, Error> {
    Ok(Json(ops::list_comments(&db, PollId(poll_id)).await?))
}

pub async fn own_profile(
    MaybeAuth(user): MaybeAuth,
    State(db): State<PgStore>,
) -> Result<Json<ProfileView>, Error> {
    Ok(Json(ops::own_profile(&db, user).await?))
}

pub async fn update_profile(
    MaybeAuth(user): MaybeAuth,
    State(db): State<PgStore>,
    Json(data): Json<NewProfile>,
) -> Result<Json<Profile>, Error> {
    Ok(Json(ops::update_profile(&db, user, data).await?))
}

pub async fn profile_by_username(
    State(db): State<PgStore>,
    Path(username): Path<String>,
) -> Result<Json<ProfileView>, Error> {
    Ok(Json(ops::profile_by_username(&db, &username).await?))
}
