//! User directory service

use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::user::{CreateUser, UpdateUser, UserDto},
    repository::{Access, Repository},
};

#[derive(Clone)]
pub struct UsersService {
    repository: Repository,
}

impl UsersService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Register a user; emails are unique regardless of case
    pub async fn create(&self, user: CreateUser) -> AppResult<UserDto> {
        user.validate()?;
        let uow = self.repository.begin(Access::ReadWrite).await?;

        if uow.repository.users.email_taken(&user.email, None).await? {
            return Err(AppError::AlreadyExists(format!(
                "Email {} is already registered",
                user.email
            )));
        }

        let created = uow.repository.users.create(&user).await?;
        uow.commit().await?;
        tracing::info!(user_id = created.id, "User created");
        Ok(created.into())
    }

    /// Partially update a user
    pub async fn update(&self, user_id: i64, update: UpdateUser) -> AppResult<UserDto> {
        update.validate()?;
        let uow = self.repository.begin(Access::ReadWrite).await?;

        let mut user = uow
            .repository
            .users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", user_id)))?;

        if let Some(email) = &update.email {
            if uow.repository.users.email_taken(email, Some(user_id)).await? {
                return Err(AppError::AlreadyExists(format!(
                    "Email {} is already registered",
                    email
                )));
            }
        }

        user.apply_update(update);
        let updated = uow.repository.users.update(&user).await?;
        uow.commit().await?;
        tracing::info!(user_id, "User updated");
        Ok(updated.into())
    }

    pub async fn delete(&self, user_id: i64) -> AppResult<()> {
        let uow = self.repository.begin(Access::ReadWrite).await?;
        if !uow.repository.users.delete_by_id(user_id).await? {
            return Err(AppError::NotFound(format!("User with id {} not found", user_id)));
        }
        uow.commit().await?;
        tracing::info!(user_id, "User deleted");
        Ok(())
    }

    pub async fn get(&self, user_id: i64) -> AppResult<UserDto> {
        let uow = self.repository.begin(Access::ReadOnly).await?;
        let user = uow
            .repository
            .users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", user_id)))?;
        uow.commit().await?;
        Ok(user.into())
    }

    /// All users ordered by id
    pub async fn list(&self) -> AppResult<Vec<UserDto>> {
        let uow = self.repository.begin(Access::ReadOnly).await?;
        let users = uow.repository.users.find_all().await?;
        uow.commit().await?;
        Ok(users.into_iter().map(UserDto::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::repository::MockUserRepository;
    use crate::test_support::memory_services;

    fn create(name: &str, email: &str) -> CreateUser {
        CreateUser {
            name: name.to_string(),
            email: email.to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let (services, _) = memory_services();

        let anna = services.users.create(create("Anna", "anna@example.org")).await.unwrap();
        let fetched = services.users.get(anna.id).await.unwrap();

        assert_eq!(fetched, anna);
        assert_eq!(services.users.list().await.unwrap(), vec![anna]);
    }

    #[tokio::test]
    async fn test_create_rejects_invalid_input() {
        let (services, _) = memory_services();

        let blank = services.users.create(create("  ", "anna@example.org")).await;
        assert!(matches!(blank, Err(AppError::Validation(_))));

        let bad_email = services.users.create(create("Anna", "not-an-email")).await;
        assert!(matches!(bad_email, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_duplicate_email_ignores_case() {
        let (services, _) = memory_services();
        services.users.create(create("Anna", "anna@example.org")).await.unwrap();

        let result = services.users.create(create("Other", "ANNA@example.org")).await;
        assert!(matches!(result, Err(AppError::AlreadyExists(_))));
    }

    #[tokio::test]
    async fn test_partial_update() {
        let (services, _) = memory_services();
        let anna = services.users.create(create("Anna", "anna@example.org")).await.unwrap();
        let bob = services.users.create(create("Bob", "bob@example.org")).await.unwrap();

        let renamed = services
            .users
            .update(
                anna.id,
                UpdateUser {
                    name: Some("Annie".to_string()),
                    email: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(renamed.name, "Annie");
        assert_eq!(renamed.email, "anna@example.org");

        // keeping one's own email is not a conflict
        let same = services
            .users
            .update(
                anna.id,
                UpdateUser {
                    name: None,
                    email: Some("Anna@Example.org".to_string()),
                },
            )
            .await;
        tokio_test::assert_ok!(same);

        let taken = services
            .users
            .update(
                anna.id,
                UpdateUser {
                    name: None,
                    email: Some(bob.email.clone()),
                },
            )
            .await;
        assert!(matches!(taken, Err(AppError::AlreadyExists(_))));

        let missing = services.users.update(999, UpdateUser::default()).await;
        assert!(matches!(missing, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_delete() {
        let (services, _) = memory_services();
        let anna = services.users.create(create("Anna", "anna@example.org")).await.unwrap();

        tokio_test::assert_ok!(services.users.delete(anna.id).await);

        tokio_test::assert_err!(services.users.get(anna.id).await);
        assert!(matches!(services.users.delete(anna.id).await, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_create_skips_insert_when_email_taken() {
        let mut users = MockUserRepository::new();
        users.expect_email_taken().returning(|_, _| Ok(true));
        users.expect_create().never();

        let mut repository = Repository::in_memory();
        repository.users = Arc::new(users);
        let service = UsersService::new(repository);

        let result = service.create(create("Anna", "anna@example.org")).await;
        assert!(matches!(result, Err(AppError::AlreadyExists(_))));
    }
}
