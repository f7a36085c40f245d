pub mod activation;
pub mod registration;
pub mod session;

use alumni_shared::{
    account::{handle::SessionRes, Role},
    profile::{handle::EditProfileDescriptor, Branch, Degree, ProfileView},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha256::digest;
use subtle::ConstantTimeEq;

use crate::Error;

use registration::{Programme, RegistrationNumber};
use session::Sessions;

/// Identity of a user.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct User {
    /// The only id of this user.
    pub id: u64,
    /// Login name, which is the roll number for members.
    pub username: String,
    pub email: lettre::Address,
    /// Hash of this user's password.
    pub password_sha: String,
    pub is_active: bool,
    pub is_staff: bool,
    pub date_joined: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
    /// Bumped on every login. Activation tokens are bound to it.
    pub state_version: u32,
}

impl User {
    /// Creates an inactive, non-staff user.
    pub fn new(
        id: u64,
        username: String,
        email: lettre::Address,
        password: &str,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            username,
            email,
            password_sha: digest(password),
            is_active: false,
            is_staff: false,
            date_joined: now,
            last_login: None,
            state_version: 0,
        }
    }

    pub fn check_password(&self, password: &str) -> bool {
        digest(password)
            .as_bytes()
            .ct_eq(self.password_sha.as_bytes())
            .into()
    }

    /// Records a successful login, which kills issued activation tokens.
    pub fn record_login(&mut self, now: DateTime<Utc>) {
        self.last_login = Some(now);
        self.state_version = self.state_version.wrapping_add(1);
    }
}

/// Academic record of a member.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Profile {
    pub role: Role,
    pub name: String,
    pub programme: Option<Degree>,
    pub branch: Option<Branch>,
    pub year_of_admission: Option<u16>,
    /// Graduation year.
    pub batch: Option<u16>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub phone: Option<String>,
    /// Assigned once when the profile is completed.
    registration_number: Option<RegistrationNumber>,
    /// Set by staff, required to log in.
    pub verified: bool,
}

impl Profile {
    /// Creates the empty profile made on signup.
    pub fn new(role: Role) -> Self {
        Self {
            role,
            name: String::new(),
            programme: None,
            branch: None,
            year_of_admission: None,
            batch: None,
            city: None,
            state: None,
            country: None,
            phone: None,
            registration_number: None,
            verified: false,
        }
    }

    /// Whether the profile has been submitted or verified.
    #[inline]
    pub fn is_completed(&self) -> bool {
        self.verified || self.registration_number.is_some()
    }

    #[inline]
    pub fn registration_number(&self) -> Option<&RegistrationNumber> {
        self.registration_number.as_ref()
    }

    /// Fills the programme and assigns the registration number.
    ///
    /// # Errors
    ///
    /// - Errors if the profile already has a registration number.
    pub fn complete(
        &mut self,
        programme: Programme,
        number: RegistrationNumber,
    ) -> Result<(), Error> {
        if self.registration_number.is_some() {
            return Err(Error::ProfileAlreadyCompleted);
        }
        self.programme = Some(programme.degree);
        self.branch = Some(programme.branch);
        self.year_of_admission = Some(programme.year_of_admission);
        self.registration_number = Some(number);
        Ok(())
    }

    /// Applies the editable fields of `desc`.
    pub fn edit(&mut self, desc: EditProfileDescriptor) {
        let EditProfileDescriptor {
            name,
            batch,
            city,
            state,
            country,
            phone,
        } = desc;
        if let Some(name) = name {
            self.name = name;
        }
        if batch.is_some() {
            self.batch = batch;
        }
        if city.is_some() {
            self.city = city;
        }
        if state.is_some() {
            self.state = state;
        }
        if country.is_some() {
            self.country = country;
        }
        if phone.is_some() {
            self.phone = phone;
        }
    }

    pub fn view(&self, user: &User) -> ProfileView {
        ProfileView {
            username: user.username.clone(),
            name: self.name.clone(),
            role: self.role,
            programme: self.programme,
            branch: self.branch,
            year_of_admission: self.year_of_admission,
            batch: self.batch,
            city: self.city.clone(),
            state: self.state.clone(),
            country: self.country.clone(),
            phone: self.phone.clone(),
            registration_number: self.registration_number.as_ref().map(ToString::to_string),
            verified: self.verified,
        }
    }
}

/// A user with its profile and sessions.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Account {
    pub user: User,
    /// `None` for administrative accounts.
    pub profile: Option<Profile>,
    #[serde(skip)]
    pub sessions: Sessions,
}

impl Account {
    /// Creates an inactive member account waiting for activation.
    pub fn new_member(user: User, role: Role) -> Self {
        Self {
            user,
            profile: Some(Profile::new(role)),
            sessions: Sessions::new(),
        }
    }

    /// Creates an active staff account without profile.
    pub fn new_staff(mut user: User) -> Self {
        user.is_active = true;
        user.is_staff = true;
        Self {
            user,
            profile: None,
            sessions: Sessions::new(),
        }
    }

    /// Whether the profile of this account has been submitted.
    pub fn profile_completed(&self) -> bool {
        self.profile.as_ref().map_or(false, Profile::is_completed)
    }

    /// Whether this account may log in, credentials aside.
    ///
    /// # Errors
    ///
    /// - Errors if the account is not activated.
    /// - Errors if the account is not staff and its profile is not verified.
    pub fn login_permitted(&self) -> Result<(), Error> {
        if !self.user.is_active {
            return Err(Error::AccountInactive);
        }
        if self.user.is_staff || self.profile.as_ref().map_or(false, |p| p.verified) {
            Ok(())
        } else {
            Err(Error::ProfileNotVerified)
        }
    }

    /// Login into the account and return back a session.
    pub fn login(
        &mut self,
        password: &str,
        expire_days: u16,
        now: DateTime<Utc>,
    ) -> Result<SessionRes, Error> {
        if !self.user.check_password(password) {
            return Err(Error::UsernameOrPasswordIncorrect);
        }
        self.login_permitted()?;
        Ok(self.start_session(expire_days, now))
    }

    /// Activates the account and logs it in.
    pub fn activate(&mut self, expire_days: u16, now: DateTime<Utc>) -> SessionRes {
        self.user.is_active = true;
        self.start_session(expire_days, now)
    }

    fn start_session(&mut self, expire_days: u16, now: DateTime<Utc>) -> SessionRes {
        self.user.record_login(now);
        self.sessions.refresh(now);
        let (token, expire_at) = self.sessions.new_token(self.user.id, expire_days, now);
        SessionRes {
            account_id: self.user.id,
            token,
            expire_at: expire_at.map(|t| t.timestamp()),
        }
    }
}
