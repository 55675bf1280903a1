mod common;

use application::ApplicationError;
use common::{clients, collector};
use domain::{ProfileUpdate, UserId};

fn uid(id: &str) -> UserId {
    UserId::from(id)
}

#[tokio::test]
async fn status_updates_are_forwarded_without_dedup() {
    let clients = clients(&[("u1", "Ann"), ("u2", "Bob")]).await;
    let (callback, mut pushes) = collector();
    let _subscription = clients[1]
        .engine()
        .presence()
        .on_user_status(&uid("u1"), callback)
        .await
        .unwrap();

    let presence = clients[0].engine().presence();
    presence.update_user_status(&uid("u1"), true).await.unwrap();
    let online = pushes.next().await;
    assert!(online.is_online);

    presence.update_user_status(&uid("u1"), true).await.unwrap();
    let again = pushes.next().await;
    assert!(again.is_online);
    assert!(again.last_seen > online.last_seen);

    presence.update_user_status(&uid("u1"), false).await.unwrap();
    assert!(!pushes.next().await.is_online);

    let stored = clients[1]
        .engine()
        .presence()
        .get_user_status(&uid("u1"))
        .await
        .unwrap()
        .unwrap();
    assert!(!stored.is_online);
}

#[tokio::test]
async fn users_only_update_their_own_status() {
    let clients = clients(&[("u1", "Ann"), ("u2", "Bob")]).await;
    let result = clients[0]
        .engine()
        .presence()
        .update_user_status(&uid("u2"), true)
        .await;
    assert!(matches!(result, Err(ApplicationError::Unauthorized)));
    assert!(clients[0]
        .engine()
        .presence()
        .get_user_status(&uid("u2"))
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn profile_is_created_once_and_partially_updated() {
    let clients = clients(&[("u1", "Ann")]).await;
    let directory = clients[0].engine().directory();

    let profile = directory.get_user(&uid("u1")).await.unwrap().unwrap();
    assert_eq!(profile.name, "Ann");
    assert_eq!(profile.email, "ann@pets.example");

    directory
        .update_profile(&ProfileUpdate {
            bio: Some("Owner of two corgis".into()),
            ..ProfileUpdate::default()
        })
        .await
        .unwrap();
    let ensured = directory.ensure_profile().await.unwrap();
    assert_eq!(ensured.name, "Ann");
    assert_eq!(ensured.bio.as_deref(), Some("Owner of two corgis"));
}
