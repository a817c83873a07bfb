use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use super::{sort_newest_first, NewUser, Result, StoreError, User, UserRepository};

/// Process-local user table.
///
/// Single-instance only and lost on restart; the default backend and
/// the one the tests run against.
#[derive(Default)]
pub struct InMemoryUserRepository {
    inner: RwLock<Inner>,
}

#[derive(Default)]
struct Inner {
    users: BTreeMap<u64, User>,
    last_id: u64,
}

impl Inner {
    fn email_owner(&self, email: &str) -> Option<u64> {
        self.users
            .values()
            .find(|u| u.email == email)
            .map(|u| u.id)
    }
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn insert(&self, user: NewUser, created_at: DateTime<Utc>) -> Result<User> {
        let mut inner = self.inner.write();
        if inner.email_owner(&user.email).is_some() {
            return Err(StoreError::DuplicateEmail(user.email));
        }

        inner.last_id += 1;
        let stored = User {
            id: inner.last_id,
            first_name: user.first_name,
            last_name: user.last_name,
            email: user.email,
            age: user.age,
            created_at,
            updated_at: created_at,
        };
        inner.users.insert(stored.id, stored.clone());

        tracing::debug!(id = stored.id, "user inserted");
        Ok(stored)
    }

    async fn find_by_id(&self, id: u64) -> Result<Option<User>> {
        Ok(self.inner.read().users.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let inner = self.inner.read();
        Ok(inner
            .email_owner(email)
            .and_then(|id| inner.users.get(&id).cloned()))
    }

    async fn update(&self, id: u64, user: NewUser) -> Result<User> {
        let mut inner = self.inner.write();
        if !inner.users.contains_key(&id) {
            return Err(StoreError::NotFound(id));
        }
        if inner.email_owner(&user.email).is_some_and(|owner| owner != id) {
            return Err(StoreError::DuplicateEmail(user.email));
        }

        let existing = inner.users.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        existing.first_name = user.first_name;
        existing.last_name = user.last_name;
        existing.email = user.email;
        existing.age = user.age;
        existing.updated_at = Utc::now();

        tracing::debug!(id, "user updated");
        Ok(existing.clone())
    }

    async fn delete(&self, id: u64) -> Result<()> {
        match self.inner.write().users.remove(&id) {
            Some(_) => {
                tracing::debug!(id, "user deleted");
                Ok(())
            }
            None => Err(StoreError::NotFound(id)),
        }
    }

    async fn find_all(&self) -> Result<Vec<User>> {
        let mut users: Vec<User> = self.inner.read().users.values().cloned().collect();
        sort_newest_first(&mut users);
        Ok(users)
    }

    async fn count(&self) -> Result<u64> {
        Ok(self.inner.read().users.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn new_user(first: &str, email: &str) -> NewUser {
        NewUser {
            first_name: first.into(),
            last_name: "Tester".into(),
            email: email.into(),
            age: Some(30),
        }
    }

    #[tokio::test]
    async fn insert_assigns_sequential_ids() {
        let repo = InMemoryUserRepository::new();
        let now = Utc::now();
        let a = repo.insert(new_user("Ann", "ann@gmail.com"), now).await.unwrap();
        let b = repo.insert(new_user("Bob", "bob@gmail.com"), now).await.unwrap();
        assert_eq!(a.id, 1);
        assert_eq!(b.id, 2);
        assert_eq!(a.created_at, a.updated_at);
        assert_eq!(repo.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let repo = InMemoryUserRepository::new();
        repo.insert(new_user("Ann", "ann@gmail.com"), Utc::now()).await.unwrap();
        let err = repo
            .insert(new_user("Other", "ann@gmail.com"), Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateEmail(e) if e == "ann@gmail.com"));
        assert_eq!(repo.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn update_keeps_creation_time_and_checks_email_ownership() {
        let repo = InMemoryUserRepository::new();
        let created = Utc::now() - Duration::days(3);
        let ann = repo.insert(new_user("Ann", "ann@gmail.com"), created).await.unwrap();
        repo.insert(new_user("Bob", "bob@gmail.com"), created).await.unwrap();

        // Keeping your own email is fine
        let updated = repo.update(ann.id, new_user("Anna", "ann@gmail.com")).await.unwrap();
        assert_eq!(updated.first_name, "Anna");
        assert_eq!(updated.created_at, created);
        assert!(updated.updated_at > created);

        let err = repo
            .update(ann.id, new_user("Anna", "bob@gmail.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateEmail(_)));

        let err = repo.update(99, new_user("X", "x@gmail.com")).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(99)));
    }

    #[tokio::test]
    async fn delete_and_lookups() {
        let repo = InMemoryUserRepository::new();
        let ann = repo.insert(new_user("Ann", "ann@gmail.com"), Utc::now()).await.unwrap();

        assert!(repo.exists_by_email("ann@gmail.com").await.unwrap());
        assert_eq!(repo.find_by_email("ann@gmail.com").await.unwrap(), Some(ann.clone()));
        assert_eq!(repo.find_by_id(ann.id).await.unwrap(), Some(ann.clone()));

        repo.delete(ann.id).await.unwrap();
        assert!(repo.find_by_id(ann.id).await.unwrap().is_none());
        assert!(!repo.exists_by_email("ann@gmail.com").await.unwrap());
        assert!(matches!(repo.delete(ann.id).await, Err(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn find_all_is_newest_first() {
        let repo = InMemoryUserRepository::new();
        let now = Utc::now();
        repo.insert(new_user("Old", "old@gmail.com"), now - Duration::days(2)).await.unwrap();
        repo.insert(new_user("New", "new@gmail.com"), now).await.unwrap();
        repo.insert(new_user("Mid", "mid@gmail.com"), now - Duration::days(1)).await.unwrap();

        let names: Vec<String> = repo
            .find_all()
            .await
            .unwrap()
            .into_iter()
            .map(|u| u.first_name)
            .collect();
        assert_eq!(names, vec!["New", "Mid", "Old"]);
    }
}
