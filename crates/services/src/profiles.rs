use std::sync::Arc;
use tracing::instrument;

use domains::{
    Actor, DomainError, DomainResult, Profile, ProfileChanges, User, UserRepository, UserView,
};

use crate::policy::Policy;
use crate::validation::Validator;

pub struct ProfileService {
    users: Arc<dyn UserRepository>,
}

/// Blank strings clear the field.
fn normalize(field: Option<String>) -> Option<String> {
    field
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

impl ProfileService {
    pub fn new(users: Arc<dyn UserRepository>) -> Self {
        Self { users }
    }

    pub async fn index(&self) -> DomainResult<Vec<Profile>> {
        self.users.list_profiles().await
    }

    async fn user(&self, username: &str) -> DomainResult<User> {
        self.users
            .find_by_username(username)
            .await?
            .ok_or_else(|| DomainError::not_found("user", username))
    }

    pub async fn show(&self, username: &str) -> DomainResult<UserView> {
        let user = self.user(username).await?;
        let profile = self.users.profile(user.id).await?;
        Ok(UserView::new(user, profile))
    }

    /// Replaces every profile field. Only the profile's own user may do this.
    #[instrument(skip(self, actor, changes))]
    pub async fn update(
        &self,
        actor: Option<&Actor>,
        username: &str,
        changes: ProfileChanges,
    ) -> DomainResult<UserView> {
        let actor = Policy::authenticated(actor)?;
        let user = self.user(username).await?;
        if user.id != actor.id {
            return Err(DomainError::forbidden("update profile"));
        }

        let mut v = Validator::new();
        v.max_len("preferred_name", changes.preferred_name.as_deref(), 255);
        v.max_len("first_name", changes.first_name.as_deref(), 255);
        v.max_len("last_name", changes.last_name.as_deref(), 255);
        v.finish()?;

        let profile = self
            .users
            .update_profile(
                user.id,
                ProfileChanges {
                    preferred_name: normalize(changes.preferred_name),
                    first_name: normalize(changes.first_name),
                    last_name: normalize(changes.last_name),
                    bio: normalize(changes.bio),
                },
            )
            .await?;
        tracing::info!(user = %user.id, "profile updated");
        Ok(UserView::new(user, profile))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domains::{MockUserRepository, NewUser};
    use mockall::predicate::function;
    use storage_adapters::memory::MemoryStore;

    async fn seeded() -> (ProfileService, Actor, Actor) {
        let store = Arc::new(MemoryStore::new());
        let mut actors = Vec::new();
        for name in ["steve", "tony"] {
            let user = store
                .create(NewUser {
                    username: name.into(),
                    email: format!("{name}@example.com"),
                    password_hash: "x".into(),
                })
                .await
                .unwrap();
            actors.push(Actor {
                id: user.id,
                username: user.username,
                email_verified: true,
            });
        }
        let tony = actors.pop().unwrap();
        let steve = actors.pop().unwrap();
        (ProfileService::new(store), steve, tony)
    }

    #[tokio::test]
    async fn new_users_have_an_empty_profile() {
        let (service, steve, _) = seeded().await;
        let view = service.show("steve").await.unwrap();
        assert_eq!(view.profile.user_id, steve.id);
        assert_eq!(view.profile.first_name, None);
        assert_eq!(view.display_name, "@steve");
        assert_eq!(service.index().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn users_update_their_own_profile() {
        let (service, steve, _) = seeded().await;
        let view = service
            .update(
                Some(&steve),
                "steve",
                ProfileChanges {
                    first_name: Some("Steve".into()),
                    last_name: Some("Rogers".into()),
                    preferred_name: Some("  ".into()),
                    bio: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(view.display_name, "Steve Rogers");
        assert_eq!(view.profile.preferred_name, None);
    }

    #[tokio::test]
    async fn other_users_are_forbidden() {
        let (service, _, tony) = seeded().await;
        let result = service
            .update(Some(&tony), "steve", ProfileChanges::default())
            .await;
        assert!(matches!(result, Err(DomainError::Forbidden(_))));
        assert!(matches!(
            service.update(None, "steve", ProfileChanges::default()).await,
            Err(DomainError::Unauthenticated)
        ));
    }

    #[tokio::test]
    async fn unknown_users_are_not_found() {
        let mut users = MockUserRepository::new();
        users
            .expect_find_by_username()
            .with(function(|name: &str| name == "ghost"))
            .returning(|_| Ok(None));
        users.expect_profile().never();
        let service = ProfileService::new(Arc::new(users));
        assert!(matches!(
            service.show("ghost").await,
            Err(DomainError::NotFound { .. })
        ));
    }
}
