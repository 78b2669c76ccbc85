//! The organization invariants under concurrency and random operation
//! sequences: unique slugs, and never zero owners.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;
use stockroom::organizations::{
    InMemoryTenancyStore, Member, MembershipManager, MembershipStore, OrganizationConfig,
    OrganizationContext, OrganizationError, OrganizationManager, OrganizationStore, Role,
};

fn context(org_id: &str, user_id: &str, role: Role) -> OrganizationContext {
    OrganizationContext {
        organization_id: org_id.to_string(),
        name: "Acme".to_string(),
        slug: "acme".to_string(),
        role,
        user_id: user_id.to_string(),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_creation_with_one_slug_has_one_winner() {
    let store = InMemoryTenancyStore::new();
    let manager = Arc::new(OrganizationManager::new(
        store.clone(),
        store.clone(),
        OrganizationConfig::default(),
    ));

    let mut handles = Vec::new();
    for i in 0..16 {
        let manager = Arc::clone(&manager);
        handles.push(tokio::spawn(async move {
            manager
                .create_organization(&format!("user_{i}"), "Acme", "acme")
                .await
        }));
    }

    let mut winners = Vec::new();
    for handle in handles {
        match handle.await.unwrap() {
            Ok(org) => winners.push(org),
            Err(e) => assert!(matches!(e, OrganizationError::SlugTaken { .. }), "{e}"),
        }
    }
    assert_eq!(winners.len(), 1);

    let org = store.find_by_slug("acme").await.unwrap().unwrap();
    assert_eq!(org.id, winners[0].id);
    assert_eq!(store.list_members(&org.id).await.unwrap().len(), 1);
    assert!(store.find_subscription(&org.id).await.unwrap().is_some());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_demotion_of_two_owners_keeps_one() {
    let store = InMemoryTenancyStore::new();
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
    let alice = context(&org.id, "alice", Role::Owner);
    let bob = context(&org.id, "bob", Role::Owner);

    let m1 = Arc::clone(&members);
    let first = tokio::spawn(async move { m1.update_member_role(&alice, "bob", Role::Member).await });
    let m2 = Arc::clone(&members);
    let second = tokio::spawn(async move { m2.update_member_role(&bob, "alice", Role::Member).await });

    let results = [first.await.unwrap(), second.await.unwrap()];
    let succeeded = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(succeeded, 1);
    assert!(
        results
            .iter()
            .any(|r| matches!(r, Err(OrganizationError::LastOwner)))
    );
    assert_eq!(store.count_with_role(&org.id, Role::Owner).await.unwrap(), 1);
}

#[tokio::test]
async fn test_random_membership_changes_never_orphan_an_organization() {
    let store = InMemoryTenancyStore::new();
    let orgs = OrganizationManager::new(store.clone(), store.clone(), OrganizationConfig::default());
    let org = orgs.create_organization("user_0", "Acme", "acme").await.unwrap();
    let members = MembershipManager::new(store.clone());

    let mut rng = StdRng::seed_from_u64(0x5eed);
    let roles = [Role::Owner, Role::Admin, Role::Member];

    for step in 0..500 {
        let current = store.list_members(&org.id).await.unwrap();
        let owners: Vec<&Member> = current.iter().filter(|m| m.role == Role::Owner).collect();
        assert!(!owners.is_empty(), "no owner left after step {step}");

        let actor = owners[rng.gen_range(0..owners.len())];
        let ctx = context(&org.id, &actor.user_id, Role::Owner);
        let target = current[rng.gen_range(0..current.len())].user_id.clone();

        let result = match rng.gen_range(0..4) {
            0 => members.remove_member(&ctx, &target).await.map(|_| ()),
            1 => members.leave_organization(&ctx).await,
            2 => {
                let role = roles[rng.gen_range(0..roles.len())];
                members.update_member_role(&ctx, &target, role).await.map(|_| ())
            }
            _ => {
                let user_id = format!("user_{}", rng.gen_range(1..12));
                let role = roles[rng.gen_range(0..roles.len())];
                store
                    .add_member(&Member {
                        organization_id: org.id.clone(),
                        user_id,
                        role,
                        created_at: step,
                        updated_at: step,
                    })
                    .await
            }
        };

        if let Err(e) = result {
            assert!(
                matches!(
                    e,
                    OrganizationError::LastOwner | OrganizationError::AlreadyMember
                ),
                "unexpected error at step {step}: {e}"
            );
        }
    }

    assert!(store.count_with_role(&org.id, Role::Owner).await.unwrap() >= 1);
}
