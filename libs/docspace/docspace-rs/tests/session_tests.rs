use docspace_rs::io::remote::ApiError;
use docspace_rs::model::privilege::RawPrivilege;
use docspace_rs::service::events::{Event, Notice};
use docspace_rs::service::listing::{ListingSource, ViewKind};
use docspace_rs::service::menu::{ActionOutcome, EntryAction};
use docspace_rs::DsErrKind;
use test_utils::assert::{drain, notices};
use test_utils::*;

#[tokio::test]
async fn a_new_space_request_supersedes_the_previous() {
    let remote = InMemoryRemote::default();
    let space_id = remote.add_space("engineering", &[]);
    let ds = test_session(&remote).await;
    remote.hold("list_spaces");

    let first = tokio::spawn({
        let ds = ds.clone();
        async move { ds.refresh_spaces().await }
    });
    while remote.calls_to("list_spaces").len() < 1 {
        tokio::task::yield_now().await;
    }
    let second = tokio::spawn({
        let ds = ds.clone();
        async move { ds.refresh_spaces().await }
    });
    while remote.calls_to("list_spaces").len() < 2 {
        tokio::task::yield_now().await;
    }
    remote.release("list_spaces");

    assert!(first.await.unwrap().unwrap().is_none());
    let spaces = second.await.unwrap().unwrap().unwrap();
    assert_eq!(spaces[0].id, space_id);
    assert_eq!(ds.spaces(), spaces);
}

#[tokio::test]
async fn failed_space_requests_are_reported() {
    let remote = InMemoryRemote::default();
    let ds = test_session(&remote).await;
    remote.fail("list_spaces", ApiError::Endpoint { status: 503, reason: Some("down".into()) });
    let mut events = ds.subscribe();

    let err = ds.refresh_spaces().await.unwrap_err();
    assert_eq!(err.kind, DsErrKind::ServerRejected { status: 503, reason: Some("down".into()) });
    assert_eq!(notices(&mut events), [Notice::Error("down".to_string())]);
    assert!(ds.spaces().is_empty());
}

#[tokio::test]
async fn selection_changes_are_announced_once() {
    let remote = InMemoryRemote::default();
    let space_id = remote.add_space("engineering", &[RawPrivilege::Read]);
    let ds = test_session(&remote).await;

    ds.select_space(Some(space_id)).await.unwrap();
    ds.select_space(Some(space_id)).await.unwrap();
    assert_eq!(ds.selected_space(), Some(space_id));
    assert_eq!(remote.calls_to("get_favorites").len(), 1);

    ds.select_space(None).await.unwrap();
    assert_eq!(ds.selected_space(), None);
}

#[tokio::test]
async fn menus_reflect_the_view_and_the_grants() {
    let (ds, _remote, space_id) = session_in_space(&[RawPrivilege::Read]).await;
    let report = file(space_id, "", "q1.pdf");
    assert_eq!(
        ds.menu_for(ViewKind::Browse, &report),
        [EntryAction::Copy, EntryAction::AddFavorite]
    );

    let (ds, _remote, space_id) = session_in_space(&[RawPrivilege::Read, RawPrivilege::Write]).await;
    let reports = folder(space_id, "", "reports");
    assert_eq!(
        ds.menu_for(ViewKind::Browse, &reports),
        [
            EntryAction::Open,
            EntryAction::Rename,
            EntryAction::Cut,
            EntryAction::Copy,
            EntryAction::Archive,
            EntryAction::AddFavorite
        ]
    );
    assert_eq!(
        ds.menu_for(ViewKind::Archive, &reports),
        [EntryAction::Restore, EntryAction::Purge]
    );

    ds.copy_selection(&[file(space_id, "", "a.txt")], space_id);
    assert!(ds
        .menu_for(ViewKind::Browse, &reports)
        .contains(&EntryAction::Paste));
}

#[tokio::test]
async fn opening_a_folder_navigates_the_view() {
    let (ds, _remote, space_id) = session_in_space(&[RawPrivilege::Read]).await;
    let view = ds.open_listing(ListingSource::browse(space_id, ""));
    let reports = folder(space_id, "", "reports");

    let outcome = ds
        .run_action(&view, EntryAction::Open, &reports, &[])
        .await
        .unwrap();
    let ActionOutcome::Navigated(source) = outcome else { panic!("expected navigation") };
    assert_eq!(source, ListingSource::browse(space_id, "reports"));
    assert_eq!(view.source(), source);
}

#[tokio::test]
async fn archiving_from_the_menu_asks_for_confirmation() {
    let (ds, remote, space_id) = session_in_space(&[RawPrivilege::Read, RawPrivilege::Write]).await;
    let report = file(space_id, "", "q1.pdf");
    remote.add_entries([report.clone()]);
    remote.clear_calls();
    let view = ds.open_listing(ListingSource::browse(space_id, ""));

    let outcome = ds
        .run_action(&view, EntryAction::Archive, &report, &[])
        .await
        .unwrap();
    let ActionOutcome::ConfirmArchive(confirmation) = outcome else {
        panic!("expected a confirmation")
    };
    assert!(remote.calls().is_empty());

    assert!(ds.archive_selected(confirmation).await.is_complete());
    assert_eq!(remote.calls_to("batch_archive").len(), 1);
}

#[tokio::test]
async fn actions_outside_the_menu_are_refused() {
    let (ds, remote, space_id) = session_in_space(&[RawPrivilege::Read]).await;
    remote.clear_calls();
    let view = ds.open_listing(ListingSource::browse(space_id, ""));

    let err = ds
        .run_action(&view, EntryAction::Archive, &file(space_id, "", "a.txt"), &[])
        .await
        .err()
        .unwrap();
    assert_eq!(err.kind, DsErrKind::InsufficientPermission);
    assert!(remote.calls().is_empty());
}

#[tokio::test]
async fn renames_refetch_the_view() {
    let (ds, remote, space_id) = session_in_space(&[RawPrivilege::Read, RawPrivilege::Write]).await;
    let draft = file(space_id, "reports", "draft.pdf");
    remote.add_entries([draft.clone(), file(space_id, "reports", "final.pdf")]);
    let view = ds.open_listing(ListingSource::browse(space_id, "reports"));
    let mut events = ds.subscribe();

    ds.rename(&view, &draft, " q1.pdf ").await.unwrap();
    assert!(view.take_refetch());
    assert_eq!(keys(&remote.entries_in(space_id, "reports")), ["q1.pdf", "final.pdf"]);

    let renamed = file(space_id, "reports", "q1.pdf");
    let err = ds.rename(&view, &renamed, "final.pdf").await.unwrap_err();
    assert_eq!(err.kind, DsErrKind::Conflict("final.pdf already exists".to_string()));
    assert!(view.take_refetch());

    let events = drain(&mut events);
    assert!(events.contains(&Event::Notice(Notice::Error("final.pdf already exists".into()))));
}

#[tokio::test]
async fn invalid_names_never_reach_the_remote() {
    let (ds, remote, space_id) = session_in_space(&[RawPrivilege::Read, RawPrivilege::Write]).await;
    remote.clear_calls();
    let view = ds.open_listing(ListingSource::browse(space_id, ""));
    let target = file(space_id, "", "a.txt");

    let err = ds.rename(&view, &target, "").await.unwrap_err();
    assert_eq!(err.kind, DsErrKind::FileNameEmpty);
    let err = ds.rename(&view, &target, "b/c.txt").await.unwrap_err();
    assert_eq!(err.kind, DsErrKind::FileNameContainsSlash);
    assert!(remote.calls().is_empty());
    assert!(!view.should_refetch());
}
