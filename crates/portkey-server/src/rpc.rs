use std::sync::Arc;

use portkey_auth::mint_user_id;
use portkey_core::{LinkRepository, StorageError};
use portkey_proto::v1 as proto;
use portkey_proto::v1::shortener_server::{Shortener, ShortenerServer};
use tonic::{Request, Response, Status};
use tracing::error;

use crate::service::ShortenService;

/// The RPC surface, sharing one storage with the HTTP handlers.
///
/// The user id travels in the request message instead of a cookie; an
/// empty user id gets a freshly minted one, mirroring the identity
/// middleware.
pub struct ShortenerRpc {
    storage: Arc<dyn LinkRepository>,
    service: ShortenService,
    base_url: String,
}

impl ShortenerRpc {
    pub fn new(
        storage: Arc<dyn LinkRepository>,
        service: ShortenService,
        base_url: String,
    ) -> Self {
        Self {
            storage,
            service,
            base_url,
        }
    }

    /// Wraps this service for registration with a tonic server.
    pub fn into_server(self) -> ShortenerServer<Self> {
        ShortenerServer::new(self)
    }

    fn short_url(&self, short: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), short)
    }
}

fn storage_status(err: StorageError) -> Status {
    match err {
        StorageError::Canceled => Status::cancelled("request canceled"),
        StorageError::NotFound(_) => Status::not_found("URL not found"),
        StorageError::Conflict(_) | StorageError::IdCollision(_) | StorageError::Io(_) => {
            Status::internal("storage operation failed")
        }
    }
}

fn effective_user_id(user_id: String) -> String {
    if user_id.is_empty() {
        mint_user_id()
    } else {
        user_id
    }
}

#[tonic::async_trait]
impl Shortener for ShortenerRpc {
    async fn create_short(
        &self,
        request: Request<proto::CreateShortRequest>,
    ) -> Result<Response<proto::CreateShortResponse>, Status> {
        let request = request.into_inner();
        if request.url.is_empty() {
            return Err(Status::invalid_argument("url is required"));
        }

        let user_id = effective_user_id(request.user_id);
        let outcome = self
            .service
            .create(&request.url, &user_id)
            .await
            .map_err(|e| {
                error!(error = %e, "failed to create short URL");
                storage_status(e)
            })?;

        Ok(Response::new(proto::CreateShortResponse {
            short_url: self.short_url(&outcome.link().short),
        }))
    }

    async fn get_original(
        &self,
        request: Request<proto::GetOriginalRequest>,
    ) -> Result<Response<proto::GetOriginalResponse>, Status> {
        let request = request.into_inner();
        if request.short.is_empty() {
            return Err(Status::invalid_argument("short id is required"));
        }

        let link = self
            .storage
            .get_by_short(&request.short)
            .await
            .map_err(storage_status)?;
        if link.deleted {
            return Err(Status::not_found("URL deleted"));
        }

        Ok(Response::new(proto::GetOriginalResponse {
            original: link.original,
        }))
    }

    async fn ping(
        &self,
        _request: Request<proto::PingRequest>,
    ) -> Result<Response<proto::PingResponse>, Status> {
        self.storage
            .ping()
            .await
            .map_err(|_| Status::internal("storage unavailable"))?;
        Ok(Response::new(proto::PingResponse {
            result: "OK".to_string(),
        }))
    }

    async fn short_batch(
        &self,
        request: Request<proto::ShortBatchRequest>,
    ) -> Result<Response<proto::ShortBatchResponse>, Status> {
        let request = request.into_inner();
        if request.urls.is_empty() {
            return Err(Status::invalid_argument("urls are required"));
        }

        let user_id = effective_user_id(request.user_id);
        let originals: Vec<String> = request
            .urls
            .iter()
            .map(|entry| entry.original_url.clone())
            .collect();

        let links = self
            .service
            .create_batch(&originals, &user_id)
            .await
            .map_err(|e| {
                error!(error = %e, "failed to insert URL batch");
                storage_status(e)
            })?;

        let urls = request
            .urls
            .iter()
            .zip(&links)
            .map(|(entry, link)| proto::BatchResult {
                correlation_id: entry.correlation_id.clone(),
                short_url: self.short_url(&link.short),
            })
            .collect();

        Ok(Response::new(proto::ShortBatchResponse { urls }))
    }

    async fn list_user_urls(
        &self,
        request: Request<proto::ListUserUrlsRequest>,
    ) -> Result<Response<proto::ListUserUrlsResponse>, Status> {
        let request = request.into_inner();
        if request.user_id.is_empty() {
            return Err(Status::invalid_argument("user_id is required"));
        }

        let links = self
            .storage
            .list_by_user(&request.user_id)
            .await
            .map_err(storage_status)?;

        let urls = links
            .into_iter()
            .map(|link| proto::UserUrl {
                short_url: self.short_url(&link.short),
                original_url: link.original,
            })
            .collect();

        Ok(Response::new(proto::ListUserUrlsResponse { urls }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use portkey_core::{AlphaGenerator, Link};
    use portkey_storage::MemoryRepository;
    use tonic::Code;

    fn rpc() -> (Arc<MemoryRepository>, ShortenerRpc) {
        let storage = Arc::new(MemoryRepository::new());
        let service = ShortenService::new(
            storage.clone() as Arc<dyn LinkRepository>,
            Arc::new(AlphaGenerator::new()),
        );
        let rpc = ShortenerRpc::new(
            storage.clone() as Arc<dyn LinkRepository>,
            service,
            "http://localhost:8080".to_string(),
        );
        (storage, rpc)
    }

    #[tokio::test]
    async fn create_short_returns_full_url() {
        let (_, rpc) = rpc();
        let response = rpc
            .create_short(Request::new(proto::CreateShortRequest {
                url: "https://example.com".into(),
                user_id: "u1".into(),
            }))
            .await
            .unwrap()
            .into_inner();

        assert!(response.short_url.starts_with("http://localhost:8080/"));
    }

    #[tokio::test]
    async fn create_short_rejects_empty_url() {
        let (_, rpc) = rpc();
        let status = rpc
            .create_short(Request::new(proto::CreateShortRequest {
                url: String::new(),
                user_id: "u1".into(),
            }))
            .await
            .unwrap_err();
        assert_eq!(status.code(), Code::InvalidArgument);
    }

    #[tokio::test]
    async fn create_short_conflict_falls_back_to_existing() {
        let (_, rpc) = rpc();
        let first = rpc
            .create_short(Request::new(proto::CreateShortRequest {
                url: "https://example.com".into(),
                user_id: "u1".into(),
            }))
            .await
            .unwrap()
            .into_inner();

        let second = rpc
            .create_short(Request::new(proto::CreateShortRequest {
                url: "https://example.com".into(),
                user_id: "u2".into(),
            }))
            .await
            .unwrap()
            .into_inner();

        assert_eq!(first.short_url, second.short_url);
    }

    #[tokio::test]
    async fn get_original_round_trips() {
        let (storage, rpc) = rpc();
        storage
            .insert(&Link::new("abc", "https://example.com", "u1"))
            .await
            .unwrap();

        let response = rpc
            .get_original(Request::new(proto::GetOriginalRequest {
                short: "abc".into(),
            }))
            .await
            .unwrap()
            .into_inner();
        assert_eq!(response.original, "https://example.com");
    }

    #[tokio::test]
    async fn get_original_maps_unknown_to_not_found() {
        let (_, rpc) = rpc();
        let status = rpc
            .get_original(Request::new(proto::GetOriginalRequest {
                short: "missing".into(),
            }))
            .await
            .unwrap_err();
        assert_eq!(status.code(), Code::NotFound);
    }

    #[tokio::test]
    async fn get_original_hides_tombstoned_links() {
        let (storage, rpc) = rpc();
        storage
            .insert(&Link::new("abc", "https://example.com", "u1"))
            .await
            .unwrap();
        storage.mark_deleted("u1", "abc").await.unwrap();

        let status = rpc
            .get_original(Request::new(proto::GetOriginalRequest {
                short: "abc".into(),
            }))
            .await
            .unwrap_err();
        assert_eq!(status.code(), Code::NotFound);
    }

    #[tokio::test]
    async fn short_batch_correlates_ids() {
        let (_, rpc) = rpc();
        let response = rpc
            .short_batch(Request::new(proto::ShortBatchRequest {
                urls: vec![
                    proto::BatchEntry {
                        correlation_id: "1".into(),
                        original_url: "https://a.example".into(),
                    },
                    proto::BatchEntry {
                        correlation_id: "2".into(),
                        original_url: "https://b.example".into(),
                    },
                ],
                user_id: String::new(),
            }))
            .await
            .unwrap()
            .into_inner();

        assert_eq!(response.urls.len(), 2);
        assert_eq!(response.urls[0].correlation_id, "1");
        assert_eq!(response.urls[1].correlation_id, "2");
        assert_ne!(response.urls[0].short_url, response.urls[1].short_url);
    }

    #[tokio::test]
    async fn short_batch_rejects_empty_input() {
        let (_, rpc) = rpc();
        let status = rpc
            .short_batch(Request::new(proto::ShortBatchRequest {
                urls: Vec::new(),
                user_id: "u1".into(),
            }))
            .await
            .unwrap_err();
        assert_eq!(status.code(), Code::InvalidArgument);
    }

    #[tokio::test]
    async fn list_user_urls_requires_user_id() {
        let (_, rpc) = rpc();
        let status = rpc
            .list_user_urls(Request::new(proto::ListUserUrlsRequest {
                user_id: String::new(),
            }))
            .await
            .unwrap_err();
        assert_eq!(status.code(), Code::InvalidArgument);
    }

    #[tokio::test]
    async fn list_user_urls_filters_by_owner() {
        let (storage, rpc) = rpc();
        storage
            .insert(&Link::new("mine", "https://mine.example", "u1"))
            .await
            .unwrap();
        storage
            .insert(&Link::new("theirs", "https://theirs.example", "u2"))
            .await
            .unwrap();

        let response = rpc
            .list_user_urls(Request::new(proto::ListUserUrlsRequest {
                user_id: "u1".into(),
            }))
            .await
            .unwrap()
            .into_inner();

        assert_eq!(response.urls.len(), 1);
        assert_eq!(response.urls[0].original_url, "https://mine.example");
    }

    #[tokio::test]
    async fn ping_reports_ok() {
        let (_, rpc) = rpc();
        let response = rpc
            .ping(Request::new(proto::PingRequest {}))
            .await
            .unwrap()
            .into_inner();
        assert_eq!(response.result, "OK");
    }
}
