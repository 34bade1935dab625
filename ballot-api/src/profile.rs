use crate::{Error, Poll, UserId};

/// Display fields for one user. Owned by the profile store; the core only
/// reads it, keyed by user id or (uniquely) by username.
#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Profile {
    pub user_id: UserId,
    pub username: String,
    pub bio: String,
    pub profile_picture: Option<String>,
}

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct NewProfile {
    pub username: String,
    pub bio: String,
    pub profile_picture: Option<String>,
}

impl NewProfile {
    pub fn validate(&self) -> Result<(), Error> {
        crate::validate_string(&self.username)?;
        if let Some(picture) = &self.profile_picture {
            crate::validate_string(picture)?;
        }
        // An empty bio is fine, a null byte in it is not.
        if self.bio.contains('\0') {
            return Err(Error::InvalidInput(String::from(
                "null byte in string is not allowed",
            )));
        }
        Ok(())
    }
}

/// A profile page: the profile plus the polls its owner created, newest first.
#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct ProfileView {
    pub profile: Profile,
    pub polls: Vec<Poll>,
}
