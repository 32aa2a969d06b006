use docspace_rs::io::remote::ApiError;
use docspace_rs::model::privilege::RawPrivilege;
use docspace_rs::service::archive::ArchiveState;
use docspace_rs::service::events::Notice;
use docspace_rs::service::listing::ListingSource;
use docspace_rs::DsErrKind;
use test_utils::assert::notices;
use test_utils::*;

#[tokio::test]
async fn archiving_issues_one_call_per_folder() {
    let (ds, remote, space_id) = session_in_space(&[RawPrivilege::Read, RawPrivilege::Write]).await;
    let selection = vec![
        file(space_id, "reports", "q1.pdf"),
        file(space_id, "people", "roster.csv"),
        file(space_id, "reports", "q2.pdf"),
    ];
    remote.add_entries(selection.clone());
    remote.clear_calls();

    let view = ds.open_listing(ListingSource::browse(space_id, "reports"));
    let archive_view = ds.open_listing(ListingSource::Archive);
    let mut events = ds.subscribe();

    let confirmation = ds.request_archive(&view, selection).unwrap();
    assert_eq!(confirmation.entries().len(), 3);
    assert!(remote.calls().is_empty());

    let outcome = ds.archive_selected(confirmation).await;
    assert!(outcome.is_complete());
    assert_eq!(outcome.succeeded, 2);

    assert_eq!(
        remote.calls(),
        [
            Call::BatchArchive {
                space_id,
                path: "reports".to_string(),
                keys: vec!["q1.pdf".to_string(), "q2.pdf".to_string()]
            },
            Call::BatchArchive {
                space_id,
                path: "people".to_string(),
                keys: vec!["roster.csv".to_string()]
            },
        ]
    );
    assert_eq!(remote.state().archived.len(), 3);
    assert!(view.should_refetch());
    assert!(archive_view.should_refetch());
    assert_eq!(notices(&mut events), [Notice::Success("Selection archived".to_string())]);
}

#[tokio::test]
async fn failed_buckets_are_reported_without_success() {
    let (ds, remote, space_id) = session_in_space(&[RawPrivilege::Read, RawPrivilege::Write]).await;
    remote.fail("batch_archive", ApiError::Endpoint { status: 500, reason: None });
    let view = ds.open_listing(ListingSource::browse(space_id, ""));
    let mut events = ds.subscribe();

    let confirmation = ds
        .request_archive(&view, vec![file(space_id, "a", "1"), file(space_id, "b", "2")])
        .unwrap();
    let outcome = ds.archive_selected(confirmation).await;

    assert_eq!(outcome.succeeded, 0);
    assert_eq!(outcome.failed.len(), 2);
    assert_eq!(
        notices(&mut events),
        [
            Notice::Error("Failed to fetch data".to_string()),
            Notice::Error("Failed to fetch data".to_string())
        ]
    );
    assert!(view.should_refetch());
}

#[tokio::test]
async fn restore_sends_path_qualified_names() {
    let (ds, remote, space_id) = session_in_space(&[RawPrivilege::Read, RawPrivilege::Write]).await;
    let archived = vec![file(space_id, "", "a.txt"), file(space_id, "reports", "a.txt")];
    remote.add_archived(archived.clone());
    remote.clear_calls();

    let archive_view = ds.open_listing(ListingSource::Archive);
    let outcome = ds.restore_selected(&archive_view, &archived).await.unwrap();

    assert!(outcome.is_complete());
    assert_eq!(
        remote.calls(),
        [Call::BatchUnarchive {
            space_id,
            qualified_paths: vec!["a.txt".to_string(), "reports/a.txt".to_string()]
        }]
    );
    assert!(remote.state().archived.is_empty());
    assert!(archive_view.should_refetch());
}

#[tokio::test]
async fn only_archived_entries_can_be_restored() {
    let (ds, _remote, space_id) = session_in_space(&[RawPrivilege::Read, RawPrivilege::Write]).await;
    let view = ds.open_listing(ListingSource::browse(space_id, ""));

    let err = ds
        .restore_selected(&view, &[file(space_id, "", "a.txt")])
        .await
        .unwrap_err();
    assert_eq!(
        err.kind,
        DsErrKind::InvalidTransition { from: ArchiveState::Active, to: ArchiveState::Active }
    );
}

#[tokio::test]
async fn archived_entries_cannot_be_archived_again() {
    let (ds, _remote, space_id) = session_in_space(&[RawPrivilege::Read, RawPrivilege::Write]).await;
    let archive_view = ds.open_listing(ListingSource::Archive);

    let err = ds
        .request_archive(&archive_view, vec![file(space_id, "", "a.txt")])
        .err()
        .unwrap();
    assert_eq!(
        err.kind,
        DsErrKind::InvalidTransition { from: ArchiveState::Archived, to: ArchiveState::Archived }
    );
}

#[tokio::test]
async fn purge_is_only_offered_from_the_archive_view() {
    let (ds, remote, space_id) = session_in_space(&[RawPrivilege::Read, RawPrivilege::Write]).await;
    let doomed = vec![file(space_id, "reports", "old.pdf")];
    remote.add_archived(doomed.clone());
    remote.clear_calls();

    let browse = ds.open_listing(ListingSource::browse(space_id, "reports"));
    let err = ds.request_purge(&browse, doomed.clone()).await.err().unwrap();
    assert_eq!(err.kind, DsErrKind::PurgeRequiresArchiveView);

    let archive_view = ds.open_listing(ListingSource::Archive);
    let confirmation = ds.request_purge(&archive_view, doomed).await.unwrap();
    let outcome = ds.purge_selected(confirmation).await;

    assert!(outcome.is_complete());
    assert_eq!(
        remote.calls(),
        [Call::Purge {
            space_id,
            path: "reports".to_string(),
            keys: vec!["old.pdf".to_string()]
        }]
    );
    assert!(remote.state().archived.is_empty());
}

#[tokio::test]
async fn archiving_needs_write() {
    let (ds, remote, space_id) = session_in_space(&[RawPrivilege::Read]).await;
    remote.clear_calls();
    let view = ds.open_listing(ListingSource::browse(space_id, ""));

    let err = ds
        .request_archive(&view, vec![file(space_id, "", "a.txt")])
        .err()
        .unwrap();
    assert_eq!(err.kind, DsErrKind::InsufficientPermission);
    assert!(remote.calls().is_empty());
}

#[tokio::test]
async fn restore_spans_spaces_other_than_the_selected_one() {
    let (ds, remote, s1) = session_in_space(&[RawPrivilege::Read, RawPrivilege::Write]).await;
    let s2 = remote.add_space("finance", &[RawPrivilege::Read, RawPrivilege::Write]);
    let archived = vec![file(s1, "", "a.txt"), file(s2, "", "b.txt")];
    remote.add_archived(archived.clone());
    remote.clear_calls();

    let archive_view = ds.open_listing(ListingSource::Archive);
    let outcome = ds.restore_selected(&archive_view, &archived).await.unwrap();

    assert!(outcome.is_complete());
    assert_eq!(
        remote.calls_to("batch_unarchive"),
        [
            Call::BatchUnarchive { space_id: s1, qualified_paths: vec!["a.txt".to_string()] },
            Call::BatchUnarchive { space_id: s2, qualified_paths: vec!["b.txt".to_string()] },
        ]
    );
    assert!(remote.state().archived.is_empty());
}

#[tokio::test]
async fn purge_spans_spaces_other_than_the_selected_one() {
    let (ds, remote, s1) = session_in_space(&[RawPrivilege::Read, RawPrivilege::Write]).await;
    let s2 = remote.add_space("finance", &[RawPrivilege::Read, RawPrivilege::Write]);
    let doomed = vec![file(s1, "reports", "old.pdf"), file(s2, "ledgers", "2019.csv")];
    remote.add_archived(doomed.clone());
    remote.clear_calls();

    let archive_view = ds.open_listing(ListingSource::Archive);
    let confirmation = ds.request_purge(&archive_view, doomed).await.unwrap();
    let outcome = ds.purge_selected(confirmation).await;

    assert!(outcome.is_complete());
    assert_eq!(
        remote.calls_to("purge"),
        [
            Call::Purge {
                space_id: s1,
                path: "reports".to_string(),
                keys: vec!["old.pdf".to_string()]
            },
            Call::Purge {
                space_id: s2,
                path: "ledgers".to_string(),
                keys: vec!["2019.csv".to_string()]
            },
        ]
    );
    assert!(remote.state().archived.is_empty());
}

#[tokio::test]
async fn other_spaces_without_write_still_refuse_restore() {
    let (ds, remote, s1) = session_in_space(&[RawPrivilege::Read, RawPrivilege::Write]).await;
    let s2 = remote.add_space("finance", &[RawPrivilege::Read]);
    let archived = vec![file(s1, "", "a.txt"), file(s2, "", "b.txt")];
    remote.add_archived(archived.clone());
    remote.clear_calls();

    let archive_view = ds.open_listing(ListingSource::Archive);
    let err = ds.restore_selected(&archive_view, &archived).await.unwrap_err();

    assert_eq!(err.kind, DsErrKind::InsufficientPermission);
    assert!(remote.calls_to("batch_unarchive").is_empty());
}
