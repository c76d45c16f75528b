//! Service-level guarantees that hold regardless of the HTTP layer: what the
//! store ends up holding after the account and lifecycle use cases run.

use std::sync::Arc;

use domains::{
    Actor, DomainError, PasswordResetRepository, ResourceStore, Scope, Thread, UserRepository,
};
use integration_tests::{forum_services, Outbox};
use services::{
    CategoryInput, ForgotPasswordInput, IdField, LoginInput, RegisterInput, ThreadInput,
};
use storage_adapters::MemoryStore;

fn actor_for(user: &domains::User) -> Actor {
    Actor {
        id: user.id,
        username: user.username.clone(),
        email_verified: user.has_verified_email(),
    }
}

fn registration(username: &str) -> RegisterInput {
    RegisterInput {
        username: Some(username.into()),
        email: Some(format!("{username}@example.com")),
        password: Some("correct-horse".into()),
        password_confirmation: Some("correct-horse".into()),
    }
}

#[tokio::test]
async fn passwords_and_reset_tokens_are_stored_as_digests() {
    let store = Arc::new(MemoryStore::new());
    let outbox = Arc::new(Outbox::new());
    let services = forum_services(store.clone(), outbox.clone()).await;

    let auth = services.accounts.register(&registration("alice")).await.unwrap();
    let stored = store.find_by_id(auth.user.id).await.unwrap().unwrap();
    assert!(stored.password_hash.starts_with("$argon2id$"));
    assert!(!stored.password_hash.contains("correct-horse"));

    services
        .accounts
        .send_reset_link(&ForgotPasswordInput {
            email: Some("alice@example.com".into()),
        })
        .await
        .unwrap();
    let token = outbox.reset_token("alice@example.com").unwrap();
    let record = PasswordResetRepository::find(store.as_ref(), "alice@example.com")
        .await
        .unwrap()
        .unwrap();
    assert_ne!(record.token_hash, token);
    assert_eq!(record.token_hash.len(), 64);
}

#[tokio::test]
async fn failed_logins_do_not_reveal_which_half_was_wrong() {
    let store = Arc::new(MemoryStore::new());
    let services = forum_services(store, Arc::new(Outbox::new())).await;
    services.accounts.register(&registration("alice")).await.unwrap();

    let unknown_user = services
        .accounts
        .login(
            &LoginInput {
                identity: Some("nobody".into()),
                password: Some("correct-horse".into()),
                remember: None,
            },
            "127.0.0.1",
        )
        .await
        .unwrap_err();
    let wrong_password = services
        .accounts
        .login(
            &LoginInput {
                identity: Some("alice".into()),
                password: Some("wrong-horse".into()),
                remember: None,
            },
            "127.0.0.1",
        )
        .await
        .unwrap_err();

    match (unknown_user, wrong_password) {
        (DomainError::Validation(a), DomainError::Validation(b)) => assert_eq!(a, b),
        other => panic!("expected validation errors, got {other:?}"),
    }
}

#[tokio::test]
async fn thread_lifecycle_round_trip() {
    let store = Arc::new(MemoryStore::new());
    let services = forum_services(store.clone(), Arc::new(Outbox::new())).await;

    let owner = services.accounts.register(&registration("owner")).await.unwrap().user;
    let moderator = services.accounts.register(&registration("moderator")).await.unwrap().user;
    domains::RoleStore::assign_role(store.as_ref(), moderator.id, services::roles::MODERATOR)
        .await
        .unwrap();
    let owner = actor_for(&owner);
    let moderator = actor_for(&moderator);

    let category = services
        .categories
        .create(
            Some(&moderator),
            &CategoryInput {
                name: Some("General".into()),
                slug: Some("general".into()),
                description: None,
            },
        )
        .await
        .unwrap();
    let created = services
        .threads
        .create(
            Some(&owner),
            &ThreadInput {
                category_id: Some(IdField::Number(category.id.0)),
                title: Some("Hello".into()),
                slug: Some("hello".into()),
                body: Some("World".into()),
            },
        )
        .await
        .unwrap();
    assert_eq!(created.path, "/community/categories/general/threads/hello");
    let id = created.resource.id;

    let archived = services.threads.soft_delete(Some(&owner), id).await.unwrap();
    assert!(archived.lifecycle.is_soft_deleted());
    let restored = services.threads.restore(Some(&owner), id).await.unwrap();
    assert!(restored.lifecycle.is_active());
    assert_eq!(
        ResourceStore::<Thread>::find(store.as_ref(), id, Scope::Active)
            .await
            .unwrap(),
        Some(created.resource)
    );

    assert!(matches!(
        services.threads.destroy(Some(&owner), id).await,
        Err(DomainError::Forbidden(_))
    ));
    services.threads.destroy(Some(&moderator), id).await.unwrap();
    assert!(ResourceStore::<Thread>::find(store.as_ref(), id, Scope::WithTrashed)
        .await
        .unwrap()
        .is_none());
}
