//! Mutation engine behaviour: uniqueness, acyclicity and optimistic concurrency

use conflagent::confluence::TransportError;
use conflagent::error::ErrorCode;
use conflagent::mutation::MutationEngine;
use conflagent::testing_utils::{InMemoryTransport, TestEndpointFactory};
use std::sync::Arc;

fn setup() -> (Arc<InMemoryTransport>, MutationEngine) {
    let _ = env_logger::builder().is_test(true).try_init();

    let transport = TestEndpointFactory::transport();
    let engine = MutationEngine::new(
        Arc::new(TestEndpointFactory::endpoint("team-a", "secret")),
        transport.clone(),
    );
    (transport, engine)
}

#[tokio::test]
async fn create_then_resolve_returns_matching_page() {
    let (transport, engine) = setup();
    let created = engine.create("Notes", None, Some("hello")).await.unwrap();
    assert_eq!(created.title, "Notes");

    let page = engine.resolver().resolve("Notes").await.unwrap();
    assert_eq!(page.id, created.id);
    assert_eq!(page.parent_id.as_deref(), Some("1"));
    assert_eq!(transport.body(&created.id).unwrap().trim(), "<p>hello</p>");
}

#[tokio::test]
async fn create_under_explicit_parent() {
    let (transport, engine) = setup();
    let guides = transport.add_page("Guides", "1", "");

    let created = engine.create("Setup", Some("Guides"), None).await.unwrap();
    let page = transport.page(&created.id).unwrap();
    assert_eq!(page.parent_id.as_deref(), Some(guides.as_str()));
    assert_eq!(transport.body(&created.id).unwrap(), "");
}

#[tokio::test]
async fn create_with_title_path_uses_existing_parents() {
    let (transport, engine) = setup();
    let guides = transport.add_page("Guides", "1", "");
    let linux = transport.add_page("Linux", &guides, "");

    let created = engine.create("Guides/Linux/Install", None, None).await.unwrap();
    assert_eq!(created.title, "Install");
    let page = transport.page(&created.id).unwrap();
    assert_eq!(page.parent_id.as_deref(), Some(linux.as_str()));
}

#[tokio::test]
async fn create_with_missing_parent_path_creates_nothing() {
    let (transport, engine) = setup();
    let before = transport.page_count();

    let err = engine.create("Missing/Child", None, None).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::NotFound);
    assert_eq!(transport.page_count(), before);
    assert_eq!(transport.write_count(), 0);
}

#[tokio::test]
async fn duplicate_sibling_title_is_rejected() {
    let (transport, engine) = setup();
    transport.add_page("Roadmap", "1", "original");
    let before = transport.page_count();

    let err = engine.create("Roadmap", None, Some("copy")).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidOperation);
    assert_eq!(transport.page_count(), before);
    assert_eq!(transport.write_count(), 0);
}

#[tokio::test]
async fn same_title_under_different_parents_is_allowed() {
    let (transport, engine) = setup();
    transport.add_page("Roadmap", "1", "");
    transport.add_page("Archive", "1", "");

    let created = engine.create("Roadmap", Some("Archive"), None).await.unwrap();
    assert_eq!(created.title, "Roadmap");
}

#[tokio::test]
async fn rename_round_trip_preserves_body_and_parent() {
    let (transport, engine) = setup();
    let parent = transport.add_page("Team", "1", "");
    let id = transport.add_page("Alpha", &parent, "<p>keep me</p>");

    let renamed = engine.rename("Alpha", "Beta").await.unwrap();
    assert_eq!(renamed.old_title, "Alpha");
    assert_eq!(renamed.new_title, "Beta");
    assert_eq!(renamed.version, 2);

    engine.rename("Beta", "Alpha").await.unwrap();
    let page = transport.page(&id).unwrap();
    assert_eq!(page.title, "Alpha");
    assert_eq!(page.parent_id.as_deref(), Some(parent.as_str()));
    assert_eq!(page.version, 3);
    assert_eq!(transport.body(&id).unwrap(), "<p>keep me</p>");
}

#[tokio::test]
async fn rename_to_existing_sibling_title_is_rejected() {
    let (transport, engine) = setup();
    transport.add_page("One", "1", "");
    transport.add_page("Two", "1", "");

    let err = engine.rename("One", "Two").await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidOperation);
    assert_eq!(transport.write_count(), 0);
}

#[tokio::test]
async fn renamed_page_is_no_longer_found_by_old_title() {
    let (_transport, engine) = setup();
    engine.create("Notes", None, None).await.unwrap();
    engine.rename("Notes", "Docs").await.unwrap();

    let err = engine.resolver().resolve("Notes").await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::NotFound);
    assert!(engine.resolver().resolve("Docs").await.is_ok());
}

#[tokio::test]
async fn update_replaces_body_and_bumps_version() {
    let (transport, engine) = setup();
    let id = transport.add_page("Notes", "1", "<p>old</p>");

    let updated = engine.update("Notes", "## New").await.unwrap();
    assert_eq!(updated.version, 2);
    assert!(transport.body(&id).unwrap().contains("<h2>New</h2>"));
}

#[tokio::test]
async fn update_racing_another_writer_is_a_version_conflict() {
    let (transport, engine) = setup();
    let id = transport.add_page("Notes", "1", "<p>v1</p>");
    transport.schedule_concurrent_write(&id, "<p>theirs</p>");

    let err = engine.update("Notes", "<p>ours</p>").await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::VersionConflict);
    assert_eq!(transport.body(&id).unwrap(), "<p>theirs</p>");
}

#[tokio::test]
async fn move_into_own_descendant_is_rejected_and_tree_unchanged() {
    let (transport, engine) = setup();
    let x = transport.add_page("X", "1", "");
    let child = transport.add_page("Child", &x, "");
    transport.add_page("Grandchild", &child, "");

    for target in ["Grandchild", "Child", "X"] {
        let err = engine.move_page("X", target).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidOperation, "target {}", target);
    }
    assert_eq!(transport.page(&x).unwrap().parent_id.as_deref(), Some("1"));
    assert_eq!(transport.child_titles("1"), vec!["X".to_string()]);
    assert_eq!(transport.write_count(), 0);
}

#[tokio::test]
async fn move_reparents_and_reports_titles() {
    let (transport, engine) = setup();
    let from = transport.add_page("From", "1", "");
    let to = transport.add_page("To", "1", "");
    let id = transport.add_page("Leaf", &from, "");

    let moved = engine.move_page("From/Leaf", "To").await.unwrap();
    assert_eq!(moved.title, "Leaf");
    assert_eq!(moved.old_parent_title.as_deref(), Some("From"));
    assert_eq!(moved.new_parent_title, "To");

    assert_eq!(transport.page(&id).unwrap().parent_id.as_deref(), Some(to.as_str()));
    assert!(transport.child_titles(&from).is_empty());
    assert_eq!(transport.child_titles(&to), vec!["Leaf".to_string()]);
}

#[tokio::test]
async fn move_onto_title_clash_is_rejected() {
    let (transport, engine) = setup();
    let a = transport.add_page("A", "1", "");
    let b = transport.add_page("B", "1", "");
    transport.add_page("Same", &a, "");
    transport.add_page("Same", &b, "");

    let err = engine.move_page("A/Same", "B").await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidOperation);
    assert_eq!(transport.write_count(), 0);
}

#[tokio::test]
async fn upstream_timeout_surfaces_as_internal_error() {
    let (transport, engine) = setup();
    transport.add_page("Notes", "1", "");
    transport.set_failure(Some(TransportError::Timeout("30s elapsed".to_string())));

    let err = engine.update("Notes", "body").await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::InternalError);
    assert_eq!(err.public_message(), "An unexpected error occurred.");
}
