use docspace_rs::io::remote::ApiError;
use docspace_rs::model::privilege::RawPrivilege;
use docspace_rs::DsErrKind;
use test_utils::*;

#[tokio::test]
async fn concurrent_readers_share_one_fetch() {
    let remote = InMemoryRemote::default();
    let space_id = remote.add_space("engineering", &[RawPrivilege::Read, RawPrivilege::Write]);
    let ds = test_session(&remote).await;
    remote.hold("get_privileges");

    let readers: Vec<_> = (0..3)
        .map(|_| {
            let ds = ds.clone();
            tokio::spawn(async move { ds.populate_privileges(space_id).await })
        })
        .collect();
    while remote.calls_to("get_privileges").is_empty() {
        tokio::task::yield_now().await;
    }
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }

    assert_eq!(remote.calls_to("get_privileges").len(), 1);
    assert!(!ds.is_authorized_for(space_id, RawPrivilege::Read));
    assert!(ds.privileges.get(space_id).unwrap().loading);

    remote.release("get_privileges");
    for reader in readers {
        let privileges = reader.await.unwrap().unwrap();
        assert!(privileges.write);
        assert!(!privileges.membership);
    }
    assert!(ds.is_authorized_for(space_id, RawPrivilege::Write));
    assert!(!ds.is_authorized_for(space_id, RawPrivilege::Membership));

    ds.populate_privileges(space_id).await.unwrap();
    assert_eq!(remote.calls_to("get_privileges").len(), 1);
}

#[tokio::test]
async fn failed_resolution_denies_everything() {
    let remote = InMemoryRemote::default();
    let space_id = remote.add_space("engineering", &[RawPrivilege::Read]);
    let ds = test_session(&remote).await;
    remote.fail("get_privileges", ApiError::Endpoint { status: 500, reason: None });

    let err = ds.populate_privileges(space_id).await.unwrap_err();
    assert_eq!(err.kind, DsErrKind::ServerRejected { status: 500, reason: None });
    assert!(ds.privileges.get(space_id).unwrap().errored);
    assert!(!ds.is_authorized_for(space_id, RawPrivilege::Read));
}

#[tokio::test]
async fn global_admins_skip_the_cache() {
    let remote = InMemoryRemote::default();
    let space_id = remote.add_space("engineering", &[]);
    let ds = test_session(&remote).await;
    ds.set_user(global_admin());

    assert!(ds.is_authorized_for(space_id, RawPrivilege::Membership));
    assert!(remote.calls().is_empty());
}

#[tokio::test]
async fn reset_abandons_populations_in_flight() {
    let remote = InMemoryRemote::default();
    let space_id = remote.add_space("engineering", &[RawPrivilege::Read]);
    let ds = test_session(&remote).await;
    remote.hold("get_privileges");

    let reader = tokio::spawn({
        let ds = ds.clone();
        async move { ds.populate_privileges(space_id).await }
    });
    while remote.calls_to("get_privileges").is_empty() {
        tokio::task::yield_now().await;
    }

    ds.reset_privileges();
    remote.release("get_privileges");

    assert_eq!(reader.await.unwrap().unwrap_err().kind, DsErrKind::Cancelled);
    assert_eq!(ds.privileges.get(space_id), None);
    assert!(!ds.is_authorized_for(space_id, RawPrivilege::Read));
}

#[tokio::test]
async fn selecting_another_space_forgets_the_previous_grants() {
    let remote = InMemoryRemote::default();
    let first = remote.add_space("engineering", &[RawPrivilege::Read]);
    let second = remote.add_space("legal", &[RawPrivilege::Read, RawPrivilege::Write]);
    let ds = test_session(&remote).await;

    ds.select_space(Some(first)).await.unwrap();
    ds.populate_privileges(first).await.unwrap();
    assert!(ds.is_authorized_for(first, RawPrivilege::Read));

    ds.select_space(Some(second)).await.unwrap();
    assert_eq!(ds.privileges.get(first), None);
    ds.populate_privileges(second).await.unwrap();
    assert!(ds.is_authorized_for(second, RawPrivilege::Write));
    assert!(!ds.is_authorized_for(first, RawPrivilege::Read));
}
