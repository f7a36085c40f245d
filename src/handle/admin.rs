use alumni_shared::profile::{handle::ProfilesRes, ProfileView};
use axum::{
    extract::{Path, State},
    Json,
};

use crate::{Auth, Error, Global};

/// Completed profiles waiting for verification, staff only.
pub async fn pending(
    auth: Auth,
    State(Global { store, .. }): State<Global>,
) -> Result<Json<ProfilesRes>, Error> {
    auth.require_staff(&store)?;
    Ok(Json(ProfilesRes {
        profiles: store.pending_profiles(),
    }))
}

/// Verifies a completed profile, allowing its account to log in.
pub async fn verify(
    auth: Auth,
    State(Global { store, .. }): State<Global>,
    Path(username): Path<String>,
) -> Result<Json<ProfileView>, Error> {
    auth.require_staff(&store)?;

    let id = store.id_of(&username).ok_or(Error::AccountNotFound)?;
    let view = store.update(id, |account| {
        let profile = account.profile.as_mut().ok_or(Error::AccountNotFound)?;
        if profile.registration_number().is_none() {
            return Err(Error::ProfileNotCompleted);
        }
        profile.verified = true;
        Ok(profile.view(&account.user))
    })?;
    tracing::info!("profile of {username} verified by account {}", auth.account_id);
    Ok(Json(view))
}
