//! Item request board

use std::sync::Arc;

use mockable::Clock;
use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::request::{items_by_request, CreateItemRequest, ItemRequest, ItemRequestDto, NewItemRequest},
    repository::{Access, Repository},
};

use super::ensure_user;

#[derive(Clone)]
pub struct RequestsService {
    repository: Repository,
    clock: Arc<dyn Clock>,
}

impl RequestsService {
    pub fn new(repository: Repository, clock: Arc<dyn Clock>) -> Self {
        Self { repository, clock }
    }

    pub async fn create(&self, user_id: i64, request: CreateItemRequest) -> AppResult<ItemRequestDto> {
        request.validate()?;
        let uow = self.repository.begin(Access::ReadWrite).await?;
        ensure_user(&uow.repository, user_id).await?;

        let created = uow
            .repository
            .requests
            .create(NewItemRequest {
                description: request.description,
                requestor_id: user_id,
                created: self.clock.utc(),
            })
            .await?;
        uow.commit().await?;

        tracing::info!(request_id = created.id, requestor_id = user_id, "Item request created");
        Ok(ItemRequestDto::new(&created, &[]))
    }

    /// Requests posted by the user, oldest first
    pub async fn list_own(&self, user_id: i64) -> AppResult<Vec<ItemRequestDto>> {
        let uow = self.repository.begin(Access::ReadOnly).await?;
        ensure_user(&uow.repository, user_id).await?;
        let requests = uow.repository.requests.find_by_requestor(user_id).await?;
        let dtos = with_items(&uow.repository, requests).await?;
        uow.commit().await?;
        Ok(dtos)
    }

    /// Requests posted by everyone else, oldest first
    pub async fn list_others(&self, user_id: i64) -> AppResult<Vec<ItemRequestDto>> {
        let uow = self.repository.begin(Access::ReadOnly).await?;
        ensure_user(&uow.repository, user_id).await?;
        let requests = uow.repository.requests.find_by_other_requestors(user_id).await?;
        let dtos = with_items(&uow.repository, requests).await?;
        uow.commit().await?;
        Ok(dtos)
    }

    pub async fn get(&self, request_id: i64) -> AppResult<ItemRequestDto> {
        let uow = self.repository.begin(Access::ReadOnly).await?;
        let request = uow
            .repository
            .requests
            .find_by_id(request_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Request with id {} not found", request_id)))?;
        let mut dtos = with_items(&uow.repository, vec![request]).await?;
        uow.commit().await?;

        dtos.pop()
            .ok_or_else(|| AppError::NotFound(format!("Request with id {} not found", request_id)))
    }
}

/// Attach answering items with one lookup keyed by request id
async fn with_items(repository: &Repository, requests: Vec<ItemRequest>) -> AppResult<Vec<ItemRequestDto>> {
    if requests.is_empty() {
        return Ok(Vec::new());
    }
    let ids: Vec<i64> = requests.iter().map(|r| r.id).collect();
    let mut items = items_by_request(repository.items.find_by_request_ids(&ids).await?);

    Ok(requests
        .iter()
        .map(|request| ItemRequestDto::new(request, &items.remove(&request.id).unwrap_or_default()))
        .collect())
}
