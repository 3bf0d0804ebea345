//! End-to-end reconciliation tests against the in-memory directory.

mod helpers;

use coldap_directory::{
    AttributeSet, Directory, DirectoryError, DryRunDirectory, InMemoryDirectory, OrgAddress,
    WriteOperation,
};
use coldap_notify::{InMemoryPublisher, LoggingPublisher};
use coldap_sync::plan::{ADMINS, MEMBERS_ACTIVE, MEMBERS_ALL};
use coldap_sync::{Orchestrator, SyncError};
use helpers::test_data::{
    admin, member, membership, options, organizations_owned_by, physics, physics_with_alice, run,
    seed_organization, snapshot, CollaborationBuilder, BASE, FOREIGN_HOST, HOST,
};

// ═══════════════════════════════════════════════════════════════════════════
// Scenario A: first sync of a single collaboration
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_first_sync_creates_organization_tree() {
    let directory = InMemoryDirectory::new(BASE);
    let publisher = InMemoryPublisher::new();

    let report = run(&directory, &publisher, &physics_with_alice())
        .await
        .unwrap();

    let org = physics();
    let attrs = directory.entry(org.dn()).await.unwrap();
    assert_eq!(attrs.first("host"), Some(HOST));
    assert!(directory.contains(&org.people()).await);
    assert!(directory.contains(&org.groups()).await);

    let alice = directory.entry(&org.person("alice")).await.unwrap();
    assert_eq!(alice.first("mail"), Some("alice@example.org"));
    assert_eq!(alice.first("cn"), Some("Alice Example"));

    let alice_dn = org.person("alice");
    for role in ["CO:Physics", MEMBERS_ALL, MEMBERS_ACTIVE, ADMINS] {
        let group = directory
            .entry(&org.group(role))
            .await
            .unwrap_or_else(|| panic!("missing group {role}"));
        assert_eq!(group.get("member").unwrap(), &[alice_dn.clone()]);
        assert_eq!(group.first("o"), Some("Physics"));
    }
    assert_eq!(
        directory
            .entry(&org.group("CO:Physics"))
            .await
            .unwrap()
            .first("businessCategory"),
        Some("co")
    );
    assert_eq!(
        directory
            .entry(&org.group(ADMINS))
            .await
            .unwrap()
            .first("businessCategory"),
        Some("group")
    );

    assert_eq!(report.organizations.created, 1);
    assert_eq!(report.persons.created, 1);
    assert_eq!(report.groups.created, 4);
    // Many writes for one collaboration collapse into one message.
    assert_eq!(publisher.messages().await, vec!["ldap:Physics"]);
    assert_eq!(report.notifications, 1);
}

// ═══════════════════════════════════════════════════════════════════════════
// Idempotence and convergence
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_second_run_is_idempotent() {
    let directory = InMemoryDirectory::new(BASE);
    let publisher = InMemoryPublisher::new();
    let source = snapshot(vec![
        CollaborationBuilder::new(1, "Physics")
            .organisation(10)
            .service("https://sp.example.org")
            .member(admin("alice"))
            .member(membership("bob", "member", Some("suspended")))
            .group(5, "staff", vec![member("alice"), member("carol")])
            .build(),
        CollaborationBuilder::new(2, "Chemistry")
            .member(member("dave"))
            .build(),
    ]);

    run(&directory, &publisher, &source).await.unwrap();
    directory.clear_operations().await;
    publisher.clear().await;

    let report = run(&directory, &publisher, &source).await.unwrap();

    assert_eq!(directory.write_count().await, 0);
    assert!(publisher.messages().await.is_empty());
    assert!(!report.has_changes());
    assert_eq!(report.notifications, 0);
}

#[tokio::test]
async fn test_same_name_collaborations_are_idempotent() {
    let directory = InMemoryDirectory::new(BASE);
    let publisher = InMemoryPublisher::new();
    let source = snapshot(vec![
        CollaborationBuilder::new(1, "Physics")
            .description("first")
            .member(admin("alice"))
            .build(),
        CollaborationBuilder::new(2, "Physics")
            .description("second")
            .member(member("bob"))
            .build(),
    ]);

    let first = run(&directory, &publisher, &source).await.unwrap();
    assert_eq!(first.organizations.created, 1);
    assert_eq!(
        directory
            .entry(physics().dn())
            .await
            .unwrap()
            .first("description"),
        Some("first")
    );
    assert!(directory.contains(&physics().person("bob")).await);

    directory.clear_operations().await;
    publisher.clear().await;
    let second = run(&directory, &publisher, &source).await.unwrap();

    assert_eq!(directory.write_count().await, 0);
    assert!(publisher.messages().await.is_empty());
    assert!(!second.has_changes());
}

#[tokio::test]
async fn test_owned_organizations_match_snapshot() {
    let directory = InMemoryDirectory::new(BASE);
    let publisher = InMemoryPublisher::new();
    seed_organization(&directory, "Biology", FOREIGN_HOST).await;
    seed_organization(&directory, "Stale", HOST).await;

    let source = snapshot(vec![
        CollaborationBuilder::new(1, "Physics")
            .member(member("alice"))
            .build(),
        CollaborationBuilder::new(2, "Chemistry").build(),
    ]);
    run(&directory, &publisher, &source).await.unwrap();

    assert_eq!(
        organizations_owned_by(&directory, HOST).await,
        vec!["Chemistry", "Physics"]
    );
    assert_eq!(
        organizations_owned_by(&directory, FOREIGN_HOST).await,
        vec!["Biology"]
    );
}

#[tokio::test]
async fn test_description_change_modifies_organization() {
    let directory = InMemoryDirectory::new(BASE);
    let publisher = InMemoryPublisher::new();
    run(&directory, &publisher, &physics_with_alice())
        .await
        .unwrap();
    publisher.clear().await;
    directory.clear_operations().await;

    let changed = snapshot(vec![CollaborationBuilder::new(1, "Physics")
        .description("Particle physics")
        .member(admin("alice"))
        .build()]);
    let report = run(&directory, &publisher, &changed).await.unwrap();

    assert_eq!(report.organizations.modified, 1);
    assert_eq!(
        directory.operations().await,
        vec![(WriteOperation::Modify, physics().dn().to_string())]
    );
    assert_eq!(
        directory
            .entry(physics().dn())
            .await
            .unwrap()
            .first("description"),
        Some("Particle physics")
    );
    assert_eq!(publisher.messages().await, vec!["ldap:Physics"]);
}

#[tokio::test]
async fn test_overlapping_service_list_does_not_trigger_update() {
    let directory = InMemoryDirectory::new(BASE);
    let publisher = InMemoryPublisher::new();
    let one_service = snapshot(vec![CollaborationBuilder::new(1, "Physics")
        .service("https://a.example.org")
        .build()]);
    run(&directory, &publisher, &one_service).await.unwrap();
    directory.clear_operations().await;
    publisher.clear().await;

    let two_services = snapshot(vec![CollaborationBuilder::new(1, "Physics")
        .service("https://a.example.org")
        .service("https://b.example.org")
        .build()]);
    let report = run(&directory, &publisher, &two_services).await.unwrap();

    assert_eq!(report.organizations.unchanged, 1);
    assert_eq!(directory.write_count().await, 0);
    assert!(publisher.messages().await.is_empty());
}

// ═══════════════════════════════════════════════════════════════════════════
// Scenario B: removed collaboration
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_removed_collaboration_deletes_subtree() {
    let directory = InMemoryDirectory::new(BASE);
    let publisher = InMemoryPublisher::new();
    run(&directory, &publisher, &physics_with_alice())
        .await
        .unwrap();
    directory.clear_operations().await;
    publisher.clear().await;

    let report = run(&directory, &publisher, &snapshot(Vec::new()))
        .await
        .unwrap();

    assert!(directory.is_empty().await);
    assert_eq!(report.organizations.deleted, 1);
    // org, People, Groups, alice, four groups
    assert_eq!(report.entries_deleted, 8);
    assert_eq!(publisher.messages().await, vec!["ldap:Physics"]);

    let operations = directory.operations().await;
    assert!(operations.iter().all(|(op, _)| *op == WriteOperation::Delete));
    assert_eq!(operations.last().unwrap().1, physics().dn());
}

#[tokio::test]
async fn test_departed_member_is_deleted_and_groups_keep_reference() {
    let directory = InMemoryDirectory::new(BASE);
    let publisher = InMemoryPublisher::new();
    let both = snapshot(vec![CollaborationBuilder::new(1, "Physics")
        .member(admin("alice"))
        .member(member("bob"))
        .build()]);
    run(&directory, &publisher, &both).await.unwrap();
    publisher.clear().await;

    let report = run(&directory, &publisher, &physics_with_alice())
        .await
        .unwrap();

    let org = physics();
    assert!(!directory.contains(&org.person("bob")).await);
    assert!(directory.contains(&org.person("alice")).await);
    assert_eq!(report.persons.deleted, 1);
    assert_eq!(publisher.messages().await, vec!["ldap:Physics"]);

    let all = directory.entry(&org.group(MEMBERS_ALL)).await.unwrap();
    assert!(all.contains_value("member", &org.person("bob")));
}

#[tokio::test]
async fn test_departed_member_is_pruned_from_groups_when_enabled() {
    let directory = InMemoryDirectory::new(BASE);
    let publisher = InMemoryPublisher::new();
    let both = snapshot(vec![CollaborationBuilder::new(1, "Physics")
        .member(admin("alice"))
        .member(member("bob"))
        .group(5, "bobs", vec![member("bob")])
        .build()]);
    run(&directory, &publisher, &both).await.unwrap();

    let report = Orchestrator::new(&directory, &publisher, options().with_group_pruning(true))
        .run(&physics_with_alice())
        .await
        .unwrap();

    let org = physics();
    let all = directory.entry(&org.group(MEMBERS_ALL)).await.unwrap();
    assert!(!all.contains_value("member", &org.person("bob")));
    assert!(all.contains_value("member", &org.person("alice")));
    assert!(!directory.contains(&org.group("GRP:bobs")).await);
    assert_eq!(report.groups.deleted, 1);
}

// ═══════════════════════════════════════════════════════════════════════════
// Scenario C: organizations owned by another source
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_foreign_organization_is_never_deleted() {
    let directory = InMemoryDirectory::new(BASE);
    let publisher = InMemoryPublisher::new();
    seed_organization(&directory, "Physics", FOREIGN_HOST).await;

    let report = run(&directory, &publisher, &snapshot(Vec::new()))
        .await
        .unwrap();

    assert!(directory.contains(physics().dn()).await);
    assert!(directory.contains(&physics().people()).await);
    assert_eq!(report.foreign_skipped, 1);
    assert_eq!(directory.write_count().await, 0);
    assert!(publisher.messages().await.is_empty());
}

#[tokio::test]
async fn test_foreign_organization_in_snapshot_is_not_taken_over() {
    let directory = InMemoryDirectory::new(BASE);
    let publisher = InMemoryPublisher::new();
    seed_organization(&directory, "Physics", FOREIGN_HOST).await;
    let before = directory.entry(physics().dn()).await.unwrap();

    let report = run(&directory, &publisher, &physics_with_alice())
        .await
        .unwrap();

    assert_eq!(directory.entry(physics().dn()).await.unwrap(), before);
    assert!(!directory.contains(&physics().person("alice")).await);
    assert!(directory.children(&physics().groups()).await.is_empty());
    assert_eq!(directory.write_count().await, 0);
    assert!(publisher.messages().await.is_empty());
    assert_eq!(report.foreign_skipped, 1);
    assert!(!report.has_changes());

    // Dropping the name later must not delete the other source's tree.
    run(&directory, &publisher, &snapshot(Vec::new()))
        .await
        .unwrap();
    assert!(directory.contains(physics().dn()).await);
    assert_eq!(
        organizations_owned_by(&directory, FOREIGN_HOST).await,
        vec!["Physics"]
    );
}

// ═══════════════════════════════════════════════════════════════════════════
// Group membership accumulation
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_membership_is_added_once() {
    let directory = InMemoryDirectory::new(BASE);
    let publisher = InMemoryPublisher::new();
    let source = snapshot(vec![CollaborationBuilder::new(1, "Physics")
        .member(member("alice"))
        .group(5, "staff", vec![member("alice"), member("alice")])
        .build()]);

    run(&directory, &publisher, &source).await.unwrap();
    run(&directory, &publisher, &source).await.unwrap();

    let staff = directory.entry(&physics().group("GRP:staff")).await.unwrap();
    assert_eq!(staff.get("member").unwrap().len(), 1);
}

#[tokio::test]
async fn test_new_member_is_appended() {
    let directory = InMemoryDirectory::new(BASE);
    let publisher = InMemoryPublisher::new();
    run(&directory, &publisher, &physics_with_alice())
        .await
        .unwrap();

    let with_bob = snapshot(vec![CollaborationBuilder::new(1, "Physics")
        .member(admin("alice"))
        .member(member("bob"))
        .build()]);
    let report = run(&directory, &publisher, &with_bob).await.unwrap();

    let org = physics();
    let all = directory.entry(&org.group(MEMBERS_ALL)).await.unwrap();
    assert_eq!(all.get("member").unwrap().len(), 2);
    let admins = directory.entry(&org.group(ADMINS)).await.unwrap();
    assert_eq!(admins.get("member").unwrap(), &[org.person("alice")]);
    assert_eq!(report.persons.created, 1);
    assert_eq!(report.groups.modified, 3);
}

// ═══════════════════════════════════════════════════════════════════════════
// Failure semantics
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_rejected_write_aborts_run() {
    let directory = InMemoryDirectory::new(BASE);
    let publisher = InMemoryPublisher::new();
    directory.reject_writes_to(&physics().person("alice")).await;

    let err = run(&directory, &publisher, &physics_with_alice())
        .await
        .unwrap_err();

    match err {
        SyncError::Directory(DirectoryError::WriteRejected {
            operation,
            dn,
            payload,
            ..
        }) => {
            assert_eq!(operation, WriteOperation::Add);
            assert_eq!(dn, physics().person("alice"));
            assert!(payload.contains("alice@example.org"));
        }
        other => panic!("Expected WriteRejected, got {:?}", other),
    }
    // Nothing after the failed write ran.
    assert!(!directory.contains(&physics().group(MEMBERS_ALL)).await);
    assert!(publisher.messages().await.is_empty());
}

#[tokio::test]
async fn test_duplicate_person_entries_are_fatal() {
    let directory = InMemoryDirectory::new(BASE);
    let publisher = InMemoryPublisher::new();
    seed_organization(&directory, "Physics", HOST).await;
    let person = AttributeSet::new()
        .with("objectClass", "organizationalPerson")
        .with("uid", "alice");
    directory
        .seed(&physics().person("alice"), person.clone())
        .await;
    directory
        .seed(&format!("cn=alice,{}", physics().people()), person)
        .await;

    let err = run(&directory, &publisher, &physics_with_alice())
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "NOT_UNIQUE");
}

// ═══════════════════════════════════════════════════════════════════════════
// Dry run
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_dry_run_leaves_directory_untouched() {
    let directory = InMemoryDirectory::new(BASE);
    seed_organization(&directory, "Stale", HOST).await;
    let dry = DryRunDirectory::new(directory.clone());

    let report = Orchestrator::new(&dry, &LoggingPublisher, options().with_dry_run(true))
        .run(&physics_with_alice())
        .await
        .unwrap();

    assert!(report.dry_run);
    assert_eq!(report.organizations.created, 1);
    assert_eq!(report.organizations.deleted, 1);
    assert!(dry.skipped() > 0);
    assert_eq!(directory.write_count().await, 0);
    assert!(directory.contains(OrgAddress::new(BASE, "Stale").dn()).await);
    assert!(dry.read(physics().dn()).await.unwrap().is_none());
}
