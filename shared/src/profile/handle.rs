use serde::{Deserialize, Serialize};

/// Profile completion form.
///
/// `programme` and `branch` are sent by name (ex. `B.Tech`, `CSE`)
/// and validated by the server.
#[derive(Serialize, Deserialize, Clone)]
pub struct CompleteProfileDescriptor {
    pub name: String,
    pub programme: String,
    pub branch: String,
    pub year_of_admission: u16,
    pub batch: Option<u16>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub phone: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CompleteProfileOutcome {
    /// The profile is waiting for admin verification.
    /// The session used has been logged out.
    Completed { registration_number: String },
    /// The account has no profile to complete (administrative accounts).
    NothingToComplete,
}

/// Profile edits, `None` fields are left untouched.
#[derive(Serialize, Deserialize, Default, Clone)]
pub struct EditProfileDescriptor {
    pub name: Option<String>,
    pub batch: Option<u16>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub phone: Option<String>,
}

/// Directory search, as query parameters. Missing filters match anything.
///
/// `programme` and `branch` are names, like in [`CompleteProfileDescriptor`].
#[derive(Serialize, Deserialize, Default, Clone)]
pub struct SearchProfilesDescriptor {
    pub batch: Option<u16>,
    pub programme: Option<String>,
    pub branch: Option<String>,
}

/// A list of profiles, ordered by registration number.
#[derive(Serialize, Deserialize, Debug)]
pub struct ProfilesRes {
    pub profiles: Vec<super::ProfileView>,
}
