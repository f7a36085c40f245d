use alumni_shared::profile::{
    handle::{
        CompleteProfileDescriptor, CompleteProfileOutcome, EditProfileDescriptor, ProfilesRes,
        SearchProfilesDescriptor,
    },
    Branch, Degree, ProfileView,
};
use axum::{
    extract::{Path, Query, State},
    Json,
};

use crate::{account::registration::Programme, Auth, Error, Global};

/// Completes the profile of the logged in account and assigns its
/// registration number.
///
/// The account is logged out everywhere afterwards, it can log in
/// again once staff verifies the profile.
pub async fn complete(
    auth: Auth,
    State(Global { store, .. }): State<Global>,
    Json(CompleteProfileDescriptor {
        name,
        programme,
        branch,
        year_of_admission,
        batch,
        city,
        state,
        country,
        phone,
    }): Json<CompleteProfileDescriptor>,
) -> Result<Json<CompleteProfileOutcome>, Error> {
    let programme = Programme::parse(&programme, &branch, year_of_admission)?;
    let name = name.trim().to_owned();
    if name.is_empty() {
        return Err(Error::InvalidInput("name is empty".to_owned()));
    }

    {
        let account = store.get(auth.account_id).ok_or(Error::NotLoggedIn)?;
        let Some(profile) = &account.profile else {
            // administrative accounts have nothing to complete
            return Ok(Json(CompleteProfileOutcome::NothingToComplete));
        };
        if profile.is_completed() {
            return Err(Error::ProfileAlreadyCompleted);
        }
    }

    let number = store.claim_registration_number(auth.account_id, programme)?;
    let completed = store.update(auth.account_id, |account| {
        let profile = account.profile.as_mut().ok_or(Error::AccountNotFound)?;
        profile.complete(programme, number.clone())?;
        profile.name = name;
        profile.batch = batch;
        profile.city = city;
        profile.state = state;
        profile.country = country;
        profile.phone = phone;
        account.sessions.clear();
        Ok(())
    });
    if let Err(err) = completed {
        store.release_registration_number(auth.account_id, &number);
        return Err(err);
    }
    tracing::info!(
        "account {} completed its profile as {number}, waiting for verification",
        auth.account_id
    );

    Ok(Json(CompleteProfileOutcome::Completed {
        registration_number: number.to_string(),
    }))
}

pub async fn view(
    _auth: Auth,
    State(Global { store, .. }): State<Global>,
    Path(username): Path<String>,
) -> Result<Json<ProfileView>, Error> {
    let id = store.id_of(&username).ok_or(Error::AccountNotFound)?;
    let account = store.get(id).ok_or(Error::AccountNotFound)?;
    let profile = account.profile.as_ref().ok_or(Error::AccountNotFound)?;
    Ok(Json(profile.view(&account.user)))
}

/// Searches verified profiles by batch, programme and branch.
pub async fn search(
    _auth: Auth,
    State(Global { store, .. }): State<Global>,
    Query(SearchProfilesDescriptor {
        batch,
        programme,
        branch,
    }): Query<SearchProfilesDescriptor>,
) -> Result<Json<ProfilesRes>, Error> {
    let degree = programme
        .map(|name| name.parse::<Degree>())
        .transpose()
        .map_err(|err| Error::InvalidInput(err.to_string()))?;
    let branch = branch
        .map(|name| name.parse::<Branch>())
        .transpose()
        .map_err(|err| Error::InvalidInput(err.to_string()))?;

    Ok(Json(ProfilesRes {
        profiles: store.search_profiles(batch, degree, branch),
    }))
}

/// Edits the profile of the logged in account.
pub async fn edit(
    auth: Auth,
    State(Global { store, .. }): State<Global>,
    Path(username): Path<String>,
    Json(desc): Json<EditProfileDescriptor>,
) -> Result<Json<ProfileView>, Error> {
    if store.id_of(&username) != Some(auth.account_id) {
        return Err(Error::PermissionDenied);
    }

    let desc = EditProfileDescriptor {
        name: desc.name.map(|name| name.trim().to_owned()),
        ..desc
    };
    if desc.name.as_ref().map_or(false, String::is_empty) {
        return Err(Error::InvalidInput("name is empty".to_owned()));
    }

    store.update(auth.account_id, |account| {
        let profile = account.profile.as_mut().ok_or(Error::AccountNotFound)?;
        profile.edit(desc);
        Ok(Json(profile.view(&account.user)))
    })
}
