//! The tenancy router over the SeaORM store, on SQLite in-memory.

#![cfg(feature = "database")]

use serde_json::json;
use std::sync::Arc;
use stockroom::auth::Identity;
use stockroom::organizations::{
    Invitation, InvitationConfig, InvitationManager, InvitationStatus, InvitationStore, Member,
    MembershipManager, MembershipStore, OrgAuditEvent, OrgAuditStore, Organization,
    OrganizationConfig, OrganizationContext, OrganizationDetails, OrganizationError,
    OrganizationManager, OrganizationStore, Role, SeaOrmTenancyStore, TenancyServices, routes,
};
use stockroom::session::{InMemorySessionStore, SessionConfig, SessionIdentityResolver};
use stockroom::testing::{self, RecordingMailer, TestDb};

struct App {
    _db: TestDb,
    store: SeaOrmTenancyStore,
    sessions: SessionIdentityResolver<InMemorySessionStore>,
    router: axum::Router,
}

impl App {
    async fn new() -> Self {
        let db = TestDb::new().await.unwrap();
        let store = SeaOrmTenancyStore::new(db.connection());
        let sessions =
            SessionIdentityResolver::new(InMemorySessionStore::new(), SessionConfig::default());
        let services = TenancyServices::new(
            store.clone(),
            OrganizationConfig::default(),
            InvitationConfig::default(),
        )
        .with_mailer(Arc::new(RecordingMailer::new()));
        let router = routes::router(store.clone(), sessions.clone(), services);
        Self {
            _db: db,
            store,
            sessions,
            router,
        }
    }

    async fn login(&self, user_id: &str) -> String {
        self.sessions
            .issue(&Identity::new(user_id, format!("{user_id}@example.com")))
            .await
            .unwrap()
    }
}

#[tokio::test]
async fn test_invitation_flow_persists() {
    let app = App::new().await;
    let alice = app.login("alice").await;
    let bob = app.login("bob").await;

    let acme: Organization = testing::post(app.router.clone(), "/organizations")
        .bearer_token(&alice)
        .json_body(&json!({ "name": "Acme", "slug": "acme" }))
        .execute()
        .await
        .assert_created()
        .json()
        .await;

    let invitation: Invitation = testing::post(app.router.clone(), "/organization/invitations")
        .bearer_token(&alice)
        .org(&acme.id)
        .json_body(&json!({ "email": "bob@example.com" }))
        .execute()
        .await
        .assert_created()
        .json()
        .await;

    let accept = format!("/invitations/{}/accept", invitation.id);
    testing::post(app.router.clone(), &accept)
        .bearer_token(&bob)
        .execute()
        .await
        .assert_ok();
    testing::post(app.router.clone(), &accept)
        .bearer_token(&bob)
        .execute()
        .await
        .assert_conflict();

    let details: OrganizationDetails = testing::get(app.router.clone(), "/organization")
        .bearer_token(&bob)
        .org(&acme.id)
        .execute()
        .await
        .assert_ok()
        .json()
        .await;
    assert_eq!(details.role, Role::Member);
    assert_eq!(details.member_count, 2);
    assert!(details.subscription.is_some());

    let stored = app
        .store
        .find_invitation(&invitation.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.status, InvitationStatus::Accepted);
}

#[tokio::test]
async fn test_duplicate_slug_is_rejected_by_the_database() {
    let app = App::new().await;
    let alice = app.login("alice").await;
    let bob = app.login("bob").await;

    testing::post(app.router.clone(), "/organizations")
        .bearer_token(&alice)
        .json_body(&json!({ "name": "Acme", "slug": "acme" }))
        .execute()
        .await
        .assert_created();
    testing::post(app.router.clone(), "/organizations")
        .bearer_token(&bob)
        .json_body(&json!({ "name": "Acme Two", "slug": "acme" }))
        .execute()
        .await
        .assert_conflict();

    let listed: Vec<serde_json::Value> = testing::get(app.router.clone(), "/organizations")
        .bearer_token(&bob)
        .execute()
        .await
        .assert_ok()
        .json()
        .await;
    assert!(listed.is_empty());
}

#[tokio::test]
async fn test_last_owner_guard_and_delete_cascade() {
    let app = App::new().await;
    let alice = app.login("alice").await;

    let acme: Organization = testing::post(app.router.clone(), "/organizations")
        .bearer_token(&alice)
        .json_body(&json!({ "name": "Acme", "slug": "acme" }))
        .execute()
        .await
        .assert_created()
        .json()
        .await;

    testing::post(app.router.clone(), "/organization/leave")
        .bearer_token(&alice)
        .org(&acme.id)
        .execute()
        .await
        .assert_conflict();
    assert_eq!(
        app.store
            .count_with_role(&acme.id, Role::Owner)
            .await
            .unwrap(),
        1
    );

    testing::post(app.router.clone(), "/organization/invitations")
        .bearer_token(&alice)
        .org(&acme.id)
        .json_body(&json!({ "email": "bob@example.com" }))
        .execute()
        .await
        .assert_created();

    testing::delete(app.router.clone(), "/organization")
        .bearer_token(&alice)
        .org(&acme.id)
        .execute()
        .await
        .assert_no_content();

    assert!(app.store.find_by_id(&acme.id).await.unwrap().is_none());
    assert!(app.store.list_members(&acme.id).await.unwrap().is_empty());
    assert!(
        app.store
            .list_pending(&acme.id, 0)
            .await
            .unwrap()
            .is_empty()
    );

    // The audit trail outlives the organization.
    let log = app.store.org_audit_log(&acme.id, 10).await.unwrap();
    assert!(log.iter().any(|e| e.event == OrgAuditEvent::OrgDeleted));
    assert!(log.iter().any(|e| e.event == OrgAuditEvent::OrgCreated));
}

fn context(org: &Organization, user_id: &str, role: Role) -> OrganizationContext {
    OrganizationContext {
        organization_id: org.id.clone(),
        name: org.name.clone(),
        slug: org.slug.clone(),
        role,
        user_id: user_id.to_string(),
    }
}

async fn concurrent_creation_with_one_slug(store: SeaOrmTenancyStore) {
    let manager = Arc::new(OrganizationManager::new(
        store.clone(),
        store.clone(),
        OrganizationConfig::default(),
    ));

    let mut handles = Vec::new();
    for i in 0..8 {
        let manager = Arc::clone(&manager);
        handles.push(tokio::spawn(async move {
            manager
                .create_organization(&format!("user_{i}"), "Acme", "acme")
                .await
        }));
    }

    let mut winners = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => winners += 1,
            Err(e) => assert!(matches!(e, OrganizationError::SlugTaken { .. }), "{e}"),
        }
    }
    assert_eq!(winners, 1);

    let org = store.find_by_slug("acme").await.unwrap().unwrap();
    assert_eq!(store.list_members(&org.id).await.unwrap().len(), 1);
}

async fn concurrent_demotion_of_two_owners(store: SeaOrmTenancyStore) {
    let orgs = OrganizationManager::new(store.clone(), store.clone(), OrganizationConfig::default());
    let org = orgs.create_organization("alice", "Acme", "acme").await.unwrap();
    store
        .add_member(&Member {
            organization_id: org.id.clone(),
            user_id: "bob".to_string(),
            role: Role::Owner,
            created_at: 1,
            updated_at: 1,
        })
        .await
        .unwrap();

    let members = Arc::new(MembershipManager::new(store.clone()));
    let alice = context(&org, "alice", Role::Owner);
    let bob = context(&org, "bob", Role::Owner);

    let m1 = Arc::clone(&members);
    let first = tokio::spawn(async move { m1.update_member_role(&alice, "bob", Role::Member).await });
    let m2 = Arc::clone(&members);
    let second = tokio::spawn(async move { m2.remove_member(&bob, "alice").await.map(|_| ()) });

    let first = first.await.unwrap().map(|_| ());
    let second = second.await.unwrap();
    let results = [first, second];
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(
        results
            .iter()
            .any(|r| matches!(r, Err(OrganizationError::LastOwner)))
    );
    assert_eq!(store.count_with_role(&org.id, Role::Owner).await.unwrap(), 1);
}

async fn concurrent_invitations_for_one_address(store: SeaOrmTenancyStore) {
    let orgs = OrganizationManager::new(store.clone(), store.clone(), OrganizationConfig::default());
    let org = orgs.create_organization("alice", "Acme", "acme").await.unwrap();
    let invitations = Arc::new(InvitationManager::new(
        store.clone(),
        store.clone(),
        InvitationConfig::default(),
    ));
    let ctx = Arc::new(context(&org, "alice", Role::Owner));

    let mut handles = Vec::new();
    for _ in 0..8 {
        let invitations = Arc::clone(&invitations);
        let ctx = Arc::clone(&ctx);
        handles.push(tokio::spawn(async move {
            invitations
                .invite_member(&ctx, "carol@example.com", Role::Member)
                .await
        }));
    }

    let mut ids = Vec::new();
    for handle in handles {
        ids.push(handle.await.unwrap().unwrap().id);
    }
    ids.dedup();
    assert_eq!(ids.len(), 1);

    let pending = invitations.list_pending(&ctx).await.unwrap();
    assert_eq!(pending.len(), 1);
}

async fn sqlite_store() -> (TestDb, SeaOrmTenancyStore) {
    let db = TestDb::new().await.unwrap();
    let store = SeaOrmTenancyStore::new(db.connection());
    (db, store)
}

async fn postgres_store() -> (TestDb, SeaOrmTenancyStore) {
    let db = TestDb::postgres().await.unwrap();
    let store = SeaOrmTenancyStore::new(db.connection());
    (db, store)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_creation_with_one_slug() {
    let (_db, store) = sqlite_store().await;
    concurrent_creation_with_one_slug(store).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_demotion_of_two_owners() {
    let (_db, store) = sqlite_store().await;
    concurrent_demotion_of_two_owners(store).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_invitations_for_one_address() {
    let (_db, store) = sqlite_store().await;
    concurrent_invitations_for_one_address(store).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore = "requires TEST_DATABASE_URL pointing at Postgres"]
async fn test_postgres_concurrent_creation_with_one_slug() {
    let (_db, store) = postgres_store().await;
    concurrent_creation_with_one_slug(store).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore = "requires TEST_DATABASE_URL pointing at Postgres"]
async fn test_postgres_concurrent_demotion_of_two_owners() {
    let (_db, store) = postgres_store().await;
    concurrent_demotion_of_two_owners(store).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore = "requires TEST_DATABASE_URL pointing at Postgres"]
async fn test_postgres_concurrent_invitations_for_one_address() {
    let (_db, store) = postgres_store().await;
    concurrent_invitations_for_one_address(store).await;
}
