use alumni_shared::account::handle::{
    ActivationOutcome, LoginDescriptor, ResendOutcome, SessionRes, SignupDescriptor, SignupRes,
};
use axum::{
    extract::{Path, State},
    Json,
};
use chrono::Utc;

use crate::{
    account::activation::{self, activation_link, resend_link},
    mail, Auth, Error, Global,
};

/// Where a freshly activated account goes next.
const COMPLETE_PROFILE: &str = "/complete_profile/";

/// Builds the activation email for account `id` in its current state.
fn activation_message(global: &Global, id: u64) -> Result<lettre::Message, Error> {
    let account = global.store.get(id).ok_or(Error::AccountNotFound)?;
    let token = global.tokens.make_token(&account.user, Utc::now());
    mail::activation_email(
        &global.config.smtp,
        &account.user,
        &activation_link(&global.config.site, &account.user, &token),
        &resend_link(&global.config.site, &account.user, &token),
    )
}

pub async fn signup(
    State(global): State<Global>,
    Json(SignupDescriptor {
        username,
        email,
        password,
        role,
    }): Json<SignupDescriptor>,
) -> Result<Json<SignupRes>, Error> {
    let username = username.trim().to_owned();
    if username.is_empty() {
        return Err(Error::InvalidInput("username is empty".to_owned()));
    }
    if password.is_empty() {
        return Err(Error::InvalidInput("password is empty".to_owned()));
    }

    let id = global
        .store
        .create_member(username, email, &password, role, Utc::now())?;

    let sent = match activation_message(&global, id) {
        Ok(message) => global.mailer.send(message).await,
        Err(err) => Err(err),
    };
    if let Err(err) = sent {
        // let the user sign up again
        global.store.remove(id);
        return Err(err);
    }

    tracing::info!("account {id} signed up, activation mail sent");
    Ok(Json(SignupRes { account_id: id }))
}

pub async fn activate(
    State(Global {
        store,
        config,
        tokens,
        ..
    }): State<Global>,
    Path((uid, token)): Path<(String, String)>,
) -> Result<Json<ActivationOutcome>, Error> {
    let id = activation::decode_uid(&uid).ok_or(Error::InvalidLink)?;
    {
        let account = store.get(id).ok_or(Error::InvalidLink)?;
        // do not log in users with complete profiles
        if account.profile_completed() {
            return Ok(Json(ActivationOutcome::LogInWithPassword));
        }
    }

    let now = Utc::now();
    let session = store.update(id, |account| {
        if !tokens.check_token(&account.user, &token, now) {
            return Err(Error::InvalidLink);
        }
        Ok(account.activate(config.session.expire_days, now))
    })?;
    tracing::info!("account {id} activated");

    Ok(Json(ActivationOutcome::Activated {
        session,
        next: COMPLETE_PROFILE.to_owned(),
    }))
}

/// Sends a new activation link, given the old one.
pub async fn resend_activation(
    State(global): State<Global>,
    Path((uid, token)): Path<(String, String)>,
) -> Result<Json<ResendOutcome>, Error> {
    let id = activation::decode_uid(&uid).ok_or(Error::InvalidLink)?;
    {
        let account = global.store.get(id).ok_or(Error::InvalidLink)?;
        if account.profile.is_none() {
            return Err(Error::InvalidLink);
        }
        if account.profile_completed() {
            return Ok(Json(ResendOutcome::AlreadyCompleted));
        }
        // the presented link still works, sending another one is noise
        if global.tokens.check_token(&account.user, &token, Utc::now()) {
            return Ok(Json(ResendOutcome::LinkActive));
        }
    }

    let message = activation_message(&global, id)?;
    global.mailer.send(message).await?;
    tracing::info!("activation mail sent again for account {id}");
    Ok(Json(ResendOutcome::MailSent))
}

/// Logs in, only if the account is staff or its profile is verified.
pub async fn login(
    State(Global { store, config, .. }): State<Global>,
    Json(LoginDescriptor { username, password }): Json<LoginDescriptor>,
) -> Result<Json<SessionRes>, Error> {
    let id = store
        .id_of(&username)
        .ok_or(Error::UsernameOrPasswordIncorrect)?;
    let session = store.update(id, |account| {
        account.login(&password, config.session.expire_days, Utc::now())
    })?;
    Ok(Json(session))
}

pub async fn logout(auth: Auth, State(Global { store, .. }): State<Global>) -> Result<(), Error> {
    let mut account = store.get_mut(auth.account_id).ok_or(Error::NotLoggedIn)?;
    if account.sessions.remove(&auth.token) {
        Ok(())
    } else {
        Err(Error::NotLoggedIn)
    }
}
