use std::{
    path::PathBuf,
    sync::atomic::{AtomicU64, Ordering},
};

use alumni_shared::{
    account::Role,
    profile::{Branch, Degree, ProfileView},
};
use chrono::{DateTime, Utc};
use dashmap::{
    mapref::{
        entry::Entry,
        one::{Ref, RefMut},
    },
    DashMap,
};
use parking_lot::Mutex;

use crate::{
    account::{
        registration::{Programme, RegistrationNumber, Sequences},
        Account, User,
    },
    config, Error,
};

/// Times a registration number claim is retried when the number is taken.
const CLAIM_ATTEMPTS: usize = 8;

/// Accounts with their indexes.
///
/// Accounts are persisted as `<data_dir>/accounts/<id>.toml` if a data
/// directory is set.
///
/// Don't call methods iterating over all accounts while holding a
/// reference from [`Self::get`] or [`Self::get_mut`].
pub struct Store {
    accounts: DashMap<u64, Account>,
    usernames: DashMap<String, u64>,
    /// Lowercased emails.
    emails: DashMap<String, u64>,
    registrations: DashMap<RegistrationNumber, u64>,
    sequences: Sequences,
    next_id: AtomicU64,
    data_dir: Option<PathBuf>,
    write_lock: Mutex<()>,
}

impl Store {
    /// Creates an empty store living in memory only.
    pub fn new() -> Self {
        Self {
            accounts: DashMap::new(),
            usernames: DashMap::new(),
            emails: DashMap::new(),
            registrations: DashMap::new(),
            sequences: Sequences::new(),
            next_id: AtomicU64::new(1),
            data_dir: None,
            write_lock: Mutex::new(()),
        }
    }

    /// Reads and creates a store from `<data_dir>/accounts`.
    pub fn open(data_dir: impl Into<PathBuf>) -> Result<Self, Error> {
        let data_dir = data_dir.into();
        let dir = data_dir.join("accounts");
        std::fs::create_dir_all(&dir)?;

        let mut accounts = Vec::new();
        for entry in std::fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.extension().map_or(true, |ext| ext != "toml") {
                continue;
            }
            let account: Account = toml::from_str(&std::fs::read_to_string(&path)?)?;
            accounts.push(account);
        }

        let store = Self {
            data_dir: Some(data_dir),
            ..Self::new()
        };
        let len = accounts.len();
        for account in accounts {
            store.index(account)?;
        }
        tracing::info!("loaded {len} accounts from {}", dir.display());
        Ok(store)
    }

    /// Adds an account to the indexes without saving it.
    fn index(&self, account: Account) -> Result<(), Error> {
        let id = account.user.id;
        let username = account.user.username.clone();
        let email = account.user.email.to_string().to_lowercase();

        match self.usernames.entry(username.clone()) {
            Entry::Occupied(_) => return Err(Error::UsernameTaken),
            Entry::Vacant(entry) => {
                entry.insert(id);
            }
        }
        match self.emails.entry(email.clone()) {
            Entry::Occupied(_) => {
                self.usernames.remove(&username);
                return Err(Error::EmailTaken);
            }
            Entry::Vacant(entry) => {
                entry.insert(id);
            }
        }

        if let Some(profile) = &account.profile {
            if let Some(number) = profile.registration_number() {
                match self.registrations.entry(number.clone()) {
                    Entry::Occupied(_) => {
                        self.usernames.remove(&username);
                        self.emails.remove(&email);
                        return Err(Error::DuplicateRegistrationNumber(number.to_string()));
                    }
                    Entry::Vacant(entry) => {
                        entry.insert(id);
                    }
                }
                if let (Some(year), Some(sequence)) =
                    (profile.year_of_admission, number.sequence())
                {
                    self.sequences.observe(year, sequence);
                }
            }
        }

        self.next_id.fetch_max(id + 1, Ordering::SeqCst);
        self.accounts.insert(id, account);
        Ok(())
    }

    /// Adds and saves an account.
    ///
    /// # Errors
    ///
    /// - Errors if the username, the email or the registration number is taken.
    /// - Errors if the account can't be saved, leaving the store unchanged.
    pub fn insert(&self, account: Account) -> Result<u64, Error> {
        let id = account.user.id;
        self.index(account)?;
        let saved = self.accounts.get(&id).map(|account| self.save(&account));
        if let Some(Err(err)) = saved {
            self.unindex(id);
            return Err(err);
        }
        Ok(id)
    }

    /// Changes an account through `f` and saves it.
    ///
    /// The change is applied to a copy, which replaces the account only
    /// once it is saved. Don't touch this account from `f` through the store.
    ///
    /// # Errors
    ///
    /// - Errors if the account doesn't exist.
    /// - Errors if `f` fails or the account can't be saved, leaving the account
    /// unchanged.
    pub fn update<T>(
        &self,
        id: u64,
        f: impl FnOnce(&mut Account) -> Result<T, Error>,
    ) -> Result<T, Error> {
        let mut account = self.accounts.get_mut(&id).ok_or(Error::AccountNotFound)?;
        let mut updated = account.clone();
        let value = f(&mut updated)?;
        self.save(&updated)?;
        *account = updated;
        Ok(value)
    }

    /// Creates an inactive member account with an empty profile.
    pub fn create_member(
        &self,
        username: String,
        email: lettre::Address,
        password: &str,
        role: Role,
        now: DateTime<Utc>,
    ) -> Result<u64, Error> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.insert(Account::new_member(
            User::new(id, username, email, password, now),
            role,
        ))
    }

    /// Creates the configured staff account if its username is free.
    ///
    /// Returns whether the account was created.
    pub fn seed_staff(&self, admin: &config::Admin, now: DateTime<Utc>) -> Result<bool, Error> {
        if self.id_of(&admin.username).is_some() {
            return Ok(false);
        }
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.insert(Account::new_staff(User::new(
            id,
            admin.username.clone(),
            admin.email.clone(),
            &admin.password,
            now,
        )))?;
        tracing::info!("created staff account {}", admin.username);
        Ok(true)
    }

    /// Removes an account from memory and its indexes.
    fn unindex(&self, id: u64) -> Option<Account> {
        let (_, account) = self.accounts.remove(&id)?;
        self.usernames.remove(&account.user.username);
        self.emails
            .remove(&account.user.email.to_string().to_lowercase());
        if let Some(number) = account
            .profile
            .as_ref()
            .and_then(|p| p.registration_number())
        {
            self.registrations.remove(number);
        }
        Some(account)
    }

    /// Removes an account and its file.
    pub fn remove(&self, id: u64) -> Option<Account> {
        let account = self.unindex(id)?;
        if let Some(path) = self.path_of(id) {
            let _guard = self.write_lock.lock();
            if let Err(err) = std::fs::remove_file(&path) {
                tracing::error!("failed to remove {}: {err}", path.display());
            }
        }
        Some(account)
    }

    /// Id of the account with this username.
    pub fn id_of(&self, username: &str) -> Option<u64> {
        self.usernames.get(username).map(|id| *id.value())
    }

    pub fn get(&self, id: u64) -> Option<Ref<'_, u64, Account>> {
        self.accounts.get(&id)
    }

    pub fn get_mut(&self, id: u64) -> Option<RefMut<'_, u64, Account>> {
        self.accounts.get_mut(&id)
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    /// Takes a fresh registration number for account `id`.
    ///
    /// Numbers already owned by another account are skipped, up to
    /// a few times.
    ///
    /// # Errors
    ///
    /// - Errors if the admission year ran out of sequences.
    /// - Errors if every attempted number was taken.
    pub fn claim_registration_number(
        &self,
        id: u64,
        programme: Programme,
    ) -> Result<RegistrationNumber, Error> {
        let mut last = String::new();
        for _ in 0..CLAIM_ATTEMPTS {
            let sequence = self.sequences.next(programme.year_of_admission)?;
            let number = RegistrationNumber::new(programme, sequence)?;
            match self.registrations.entry(number.clone()) {
                Entry::Occupied(_) => {
                    tracing::warn!("registration number {number} already taken, retrying");
                    last = number.to_string();
                }
                Entry::Vacant(entry) => {
                    entry.insert(id);
                    return Ok(number);
                }
            }
        }
        Err(Error::DuplicateRegistrationNumber(last))
    }

    /// Gives back a claimed registration number that was never stored.
    ///
    /// The sequence is not reused.
    pub fn release_registration_number(&self, id: u64, number: &RegistrationNumber) {
        self.registrations.remove_if(number, |_, owner| *owner == id);
    }

    /// Completed profiles waiting for verification.
    pub fn pending_profiles(&self) -> Vec<ProfileView> {
        let mut profiles: Vec<ProfileView> = self
            .accounts
            .iter()
            .filter_map(|account| {
                let profile = account.profile.as_ref()?;
                (profile.is_completed() && !profile.verified).then(|| profile.view(&account.user))
            })
            .collect();
        profiles.sort_by(|a, b| a.registration_number.cmp(&b.registration_number));
        profiles
    }

    /// Verified profiles matching every given filter.
    pub fn search_profiles(
        &self,
        batch: Option<u16>,
        degree: Option<Degree>,
        branch: Option<Branch>,
    ) -> Vec<ProfileView> {
        let mut profiles: Vec<ProfileView> = self
            .accounts
            .iter()
            .filter_map(|account| {
                let profile = account.profile.as_ref()?;
                let matches = profile.verified
                    && batch.map_or(true, |b| profile.batch == Some(b))
                    && degree.map_or(true, |d| profile.programme == Some(d))
                    && branch.map_or(true, |b| profile.branch == Some(b));
                matches.then(|| profile.view(&account.user))
            })
            .collect();
        profiles.sort_by(|a, b| {
            (&a.registration_number, &a.username).cmp(&(&b.registration_number, &b.username))
        });
        profiles
    }

    fn path_of(&self, id: u64) -> Option<PathBuf> {
        self.data_dir
            .as_ref()
            .map(|dir| dir.join("accounts").join(format!("{id}.toml")))
    }

    /// Save this account, nothing happens for in-memory stores.
    pub fn save(&self, account: &Account) -> Result<(), Error> {
        let Some(path) = self.path_of(account.user.id) else {
            return Ok(());
        };
        let data = toml::to_string(account)?;
        let tmp = path.with_extension("toml.tmp");

        let _guard = self.write_lock.lock();
        std::fs::write(&tmp, data)?;
        std::fs::rename(&tmp, &path)?;
        Ok(())
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}
