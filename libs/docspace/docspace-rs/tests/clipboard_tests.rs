use docspace_rs::io::remote::ApiError;
use docspace_rs::model::privilege::RawPrivilege;
use docspace_rs::service::clipboard::PasteOutcome;
use docspace_rs::service::events::Notice;
use docspace_rs::service::listing::ListingSource;
use docspace_rs::DsErrKind;
use indexmap::IndexMap;
use test_utils::assert::notices;
use test_utils::*;

#[tokio::test]
async fn cut_and_paste_across_spaces_is_one_batch_move() {
    let (ds, remote, source) = session_in_space(&[RawPrivilege::Read, RawPrivilege::Write]).await;
    let dest = remote.add_space("legal", &[RawPrivilege::Read, RawPrivilege::Write]);
    ds.populate_privileges(dest).await.unwrap();

    let selection = [
        file(source, "reports", "q1.pdf"),
        file(source, "reports", "q2.pdf"),
        folder(source, "reports", "drafts"),
    ];
    remote.add_entries(selection.clone());
    remote.clear_calls();

    ds.cut_selection(&selection, source);
    assert!(!ds.clipboard().unwrap().is_copy_operation);

    let outcome = ds.paste(dest, "/inbox/").await.unwrap();
    assert_eq!(outcome, PasteOutcome::Moved(3));
    assert!(ds.clipboard().is_none());

    let items: IndexMap<String, String> = [
        ("reports/q1.pdf", "inbox/q1.pdf"),
        ("reports/q2.pdf", "inbox/q2.pdf"),
        ("reports/drafts", "inbox/drafts"),
    ]
    .into_iter()
    .map(|(from, to)| (from.to_string(), to.to_string()))
    .collect();
    assert_eq!(remote.calls(), [Call::BatchMove { dest, source, items }]);

    assert!(remote.entries_in(source, "reports").is_empty());
    assert_eq!(remote.entries_in(dest, "inbox").len(), 3);
}

#[tokio::test]
async fn copies_land_at_the_root_without_a_prefix() {
    let (ds, remote, space_id) = session_in_space(&[RawPrivilege::Read, RawPrivilege::Write]).await;
    let original = file(space_id, "reports", "q1.pdf");
    remote.add_entries([original.clone()]);

    ds.copy_selection(&[original], space_id);
    assert_eq!(ds.paste(space_id, "").await.unwrap(), PasteOutcome::Copied(1));

    assert_eq!(keys(&remote.entries_in(space_id, "")), ["q1.pdf"]);
    assert_eq!(remote.entries_in(space_id, "reports").len(), 1);
}

#[tokio::test]
async fn a_new_selection_replaces_the_previous_one() {
    let (ds, _remote, space_id) = session_in_space(&[RawPrivilege::Read]).await;

    ds.cut_selection(&[file(space_id, "", "a.txt")], space_id);
    ds.copy_selection(&[file(space_id, "", "b.txt")], space_id);

    let selection = ds.clipboard().unwrap();
    assert!(selection.is_copy_operation);
    assert_eq!(selection.items, ["b.txt"]);
}

#[tokio::test]
async fn failed_pastes_still_empty_the_clipboard() {
    let (ds, remote, space_id) = session_in_space(&[RawPrivilege::Read, RawPrivilege::Write]).await;
    remote.fail("batch_copy", ApiError::Conflict("inbox/a.txt already exists".to_string()));
    let mut events = ds.subscribe();

    ds.copy_selection(&[file(space_id, "", "a.txt")], space_id);
    let err = ds.paste(space_id, "inbox").await.unwrap_err();

    assert_eq!(err.kind, DsErrKind::Conflict("inbox/a.txt already exists".to_string()));
    assert!(ds.clipboard().is_none());
    assert_eq!(
        notices(&mut events),
        [Notice::Error("inbox/a.txt already exists".to_string())]
    );
}

#[tokio::test]
async fn pasting_nothing_is_reported() {
    let (ds, remote, space_id) = session_in_space(&[RawPrivilege::Read, RawPrivilege::Write]).await;
    remote.clear_calls();
    let mut events = ds.subscribe();

    assert_eq!(ds.paste(space_id, "").await.unwrap(), PasteOutcome::NothingToPaste);
    assert_eq!(notices(&mut events), [Notice::NothingToPaste]);
    assert!(remote.calls().is_empty());
}

#[tokio::test]
async fn pasting_needs_write_on_the_destination() {
    let (ds, remote, space_id) = session_in_space(&[RawPrivilege::Read]).await;
    remote.clear_calls();

    ds.cut_selection(&[file(space_id, "", "a.txt")], space_id);
    assert!(!ds.can_paste_into(&ListingSource::browse(space_id, "")));

    let err = ds.paste(space_id, "inbox").await.unwrap_err();
    assert_eq!(err.kind, DsErrKind::InsufficientPermission);
    assert!(ds.clipboard().is_none());
    assert!(remote.calls().is_empty());
}

#[tokio::test]
async fn moves_flag_the_destination_and_source_folders_only() {
    let (ds, remote, space_id) = session_in_space(&[RawPrivilege::Read, RawPrivilege::Write]).await;
    let moved = file(space_id, "reports", "q1.pdf");
    remote.add_entries([moved.clone()]);

    let destination = ds.open_listing(ListingSource::browse(space_id, "archive/2024"));
    let origin = ds.open_listing(ListingSource::browse(space_id, "reports"));
    let unrelated = ds.open_listing(ListingSource::browse(space_id, "people"));
    assert!(!ds.can_paste_into(&destination.source()));

    ds.cut_selection(&[moved], space_id);
    assert!(ds.can_paste_into(&destination.source()));
    ds.paste(space_id, "archive/2024").await.unwrap();

    assert!(destination.should_refetch());
    assert!(origin.should_refetch());
    assert!(!unrelated.should_refetch());
}

#[tokio::test]
async fn an_empty_selection_discards_the_previous_one() {
    let (ds, remote, space_id) = session_in_space(&[RawPrivilege::Read, RawPrivilege::Write]).await;
    remote.clear_calls();

    ds.copy_selection(&[file(space_id, "", "a.txt")], space_id);
    assert!(ds.clipboard().is_some());

    ds.cut_selection(&[], space_id);
    assert!(ds.clipboard().is_none());

    assert_eq!(ds.paste(space_id, "inbox").await.unwrap(), PasteOutcome::NothingToPaste);
    assert!(remote.calls().is_empty());
}
