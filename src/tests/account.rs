use super::*;

use alumni_shared::account::handle::SignupDescriptor;
use chrono::Duration;

use crate::account::activation::encode_uid;

fn signup_body(username: &str) -> serde_json::Value {
    serde_json::to_value(SignupDescriptor {
        username: username.to_owned(),
        email: address(username),
        password: "password123456".to_owned(),
        role: Role::Alumni,
    })
    .unwrap()
}

/// Makes the activation path of an account as it is now.
fn activation_path(global: &Global, id: u64, now: DateTime<Utc>) -> String {
    let token = global
        .tokens
        .make_token(&global.store.get(id).unwrap().user, now);
    format!("{}/{token}", encode_uid(id))
}

/// Test: sign up and activate through the emailed link.
#[tokio::test]
async fn signup_and_activate() {
    let outbox = Outbox::default();
    let global = global(&outbox);
    let app = crate::router(global.clone());

    let (status, json) = send(
        &app,
        "POST",
        "/api/account/signup",
        None,
        Some(signup_body("2019001")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(outbox.len(), 1);

    let id = json["account_id"].as_u64().unwrap();
    {
        let account = global.store.get(id).unwrap();
        assert!(!account.user.is_active);
        assert!(!account.profile_completed());
    }

    let path = activation_path(&global, id, Utc::now());
    let (status, json) = send(&app, "GET", &format!("/activate/{path}"), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "activated");
    assert_eq!(json["next"], "/complete_profile/");
    assert_eq!(json["session"]["account_id"], id);
    assert!(global.store.get(id).unwrap().user.is_active);

    // the login moved the state the link was bound to
    let (status, json) = send(&app, "GET", &format!("/activate/{path}"), None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "activation link is invalid");
}

#[tokio::test]
async fn signup_taken() {
    let outbox = Outbox::default();
    let app = crate::router(global(&outbox));

    let (status, _) = send(
        &app,
        "POST",
        "/api/account/signup",
        None,
        Some(signup_body("2019001")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, json) = send(
        &app,
        "POST",
        "/api/account/signup",
        None,
        Some(signup_body("2019001")),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["error"], "username already taken");
    assert_eq!(outbox.len(), 1);
}

#[tokio::test]
async fn signup_empty_username() {
    let outbox = Outbox::default();
    let app = crate::router(global(&outbox));

    let (status, _) = send(
        &app,
        "POST",
        "/api/account/signup",
        None,
        Some(serde_json::json!({
            "username": "  ",
            "email": "blank@example.edu",
            "password": "password123456",
            "role": "Alumni",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(outbox.len(), 0);
}

/// Test: a failed activation mail fails the signup and leaves nothing behind.
#[tokio::test]
async fn signup_mail_failure() {
    let outbox = Outbox::default();
    let global = global(&outbox);
    let app = crate::router(global.clone());

    outbox.set_failing(true);
    let (status, json) = send(
        &app,
        "POST",
        "/api/account/signup",
        None,
        Some(signup_body("2019001")),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(json["error"].as_str().unwrap().contains("relay refused"));
    assert!(global.store.id_of("2019001").is_none());
    assert!(global.store.is_empty());

    outbox.set_failing(false);
    let (status, _) = send(
        &app,
        "POST",
        "/api/account/signup",
        None,
        Some(signup_body("2019001")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn activate_invalid_links() {
    let outbox = Outbox::default();
    let global = global(&outbox);
    let app = crate::router(global.clone());

    let id = global
        .store
        .create_member(
            "2019001".to_owned(),
            address("2019001"),
            "password",
            Role::Alumni,
            Utc::now(),
        )
        .unwrap();

    let expired = activation_path(&global, id, Utc::now() - Duration::hours(73));
    let valid = activation_path(&global, id, Utc::now());
    let (_, token) = valid.split_once('/').unwrap();

    for path in [
        expired,
        format!("{}/{token}", encode_uid(id + 1)),
        format!("not-base64!/{token}"),
        format!("{}/1-deadbeef", encode_uid(id)),
    ] {
        let (status, json) = send(&app, "GET", &format!("/activate/{path}"), None, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{path}");
        assert_eq!(json["error"], "activation link is invalid");
    }
    assert!(!global.store.get(id).unwrap().user.is_active);
}

/// Test: links of completed profiles don't log in anymore.
#[tokio::test]
async fn activate_completed_profile() {
    let outbox = Outbox::default();
    let global = global(&outbox);
    let app = crate::router(global.clone());

    let programme = Programme::parse("B.Tech", "CSE", 2023).unwrap();
    completed_member(&global.store, 7, programme, 1, Utc::now());

    let path = activation_path(&global, 7, Utc::now());
    let (status, json) = send(&app, "GET", &format!("/activate/{path}"), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "log_in_with_password");
    assert!(global.store.get(7).unwrap().sessions.is_empty());
}

/// Test: asking for a new link while the old one works sends nothing.
#[tokio::test]
async fn resend_active_link() {
    let outbox = Outbox::default();
    let global = global(&outbox);
    let app = crate::router(global.clone());

    let (_, json) = send(
        &app,
        "POST",
        "/api/account/signup",
        None,
        Some(signup_body("2019001")),
    )
    .await;
    let id = json["account_id"].as_u64().unwrap();
    assert_eq!(outbox.len(), 1);

    let path = activation_path(&global, id, Utc::now());
    let (status, json) = send(
        &app,
        "GET",
        &format!("/resend-activation/{path}"),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "link_active");
    assert_eq!(outbox.len(), 1);

    // the old link still works
    let (status, _) = send(&app, "GET", &format!("/activate/{path}"), None, None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn resend_expired_link() {
    let outbox = Outbox::default();
    let global = global(&outbox);
    let app = crate::router(global.clone());

    let id = global
        .store
        .create_member(
            "2019001".to_owned(),
            address("2019001"),
            "password",
            Role::Alumni,
            Utc::now(),
        )
        .unwrap();

    let expired = activation_path(&global, id, Utc::now() - Duration::days(4));
    let (status, json) = send(
        &app,
        "GET",
        &format!("/resend-activation/{expired}"),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "mail_sent");
    assert_eq!(outbox.len(), 1);

    let formatted = String::from_utf8(outbox.sent.lock()[0].formatted()).unwrap();
    assert!(formatted.contains("[noreply] SAC Account Activation"));
}

#[tokio::test]
async fn resend_mail_failure() {
    let outbox = Outbox::default();
    let global = global(&outbox);
    let app = crate::router(global.clone());

    let id = global
        .store
        .create_member(
            "2019001".to_owned(),
            address("2019001"),
            "password",
            Role::Alumni,
            Utc::now(),
        )
        .unwrap();

    outbox.set_failing(true);
    let expired = activation_path(&global, id, Utc::now() - Duration::days(4));
    let (status, _) = send(
        &app,
        "GET",
        &format!("/resend-activation/{expired}"),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn resend_completed_or_unknown() {
    let outbox = Outbox::default();
    let global = global(&outbox);
    let app = crate::router(global.clone());

    let programme = Programme::parse("B.Des", "NA", 2020).unwrap();
    completed_member(&global.store, 7, programme, 1, Utc::now());

    let path = activation_path(&global, 7, Utc::now() - Duration::days(4));
    let (status, json) = send(
        &app,
        "GET",
        &format!("/resend-activation/{path}"),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "already_completed");

    let (status, _) = send(
        &app,
        "GET",
        &format!("/resend-activation/{}/1-abc", encode_uid(8)),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(outbox.len(), 0);
}

fn login_body(username: &str, password: &str) -> serde_json::Value {
    serde_json::json!({ "username": username, "password": password })
}

/// Test: only staff and verified profiles log in.
#[tokio::test]
async fn login_gate() {
    let outbox = Outbox::default();
    let global = global(&outbox);
    let app = crate::router(global.clone());

    // inactive
    global
        .store
        .create_member(
            "inactive".to_owned(),
            address("inactive"),
            "password",
            Role::Alumni,
            Utc::now(),
        )
        .unwrap();
    let (status, json) = send(
        &app,
        "POST",
        "/api/account/login",
        None,
        Some(login_body("inactive", "password")),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(json["error"], "this account is inactive");

    // completed but not verified
    let programme = Programme::parse("M.Tech", "ECE", 2021).unwrap();
    completed_member(&global.store, 7, programme, 1, Utc::now());
    let (status, json) = send(
        &app,
        "POST",
        "/api/account/login",
        None,
        Some(login_body("member7", "password")),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(
        json["error"],
        "profile either not completed or not verified by admin, can't login"
    );

    // wrong password
    let (status, json) = send(
        &app,
        "POST",
        "/api/account/login",
        None,
        Some(login_body("member7", "nope")),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(json["error"], "username or password incorrect");

    // verified
    global
        .store
        .get_mut(7)
        .unwrap()
        .profile
        .as_mut()
        .unwrap()
        .verified = true;
    let (status, json) = send(
        &app,
        "POST",
        "/api/account/login",
        None,
        Some(login_body("member7", "password")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["account_id"], 7);

    // staff, no profile
    let _ = staff(&global);
    let (status, _) = send(
        &app,
        "POST",
        "/api/account/login",
        None,
        Some(login_body("admin", "admin")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(
        &app,
        "POST",
        "/api/account/login",
        None,
        Some(login_body("nobody", "password")),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn logout() {
    let outbox = Outbox::default();
    let global = global(&outbox);
    let app = crate::router(global.clone());

    let session = active_member(&global, "2019001");
    let (status, _) = send(&app, "POST", "/api/account/logout", Some(&session), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, "POST", "/api/account/logout", Some(&session), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, "POST", "/api/account/logout", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
