use std::sync::Arc;

use ipnet::IpNet;
use portkey_auth::TokenKeys;
use portkey_core::LinkRepository;
use tokio::sync::watch;
use typed_builder::TypedBuilder;

use crate::service::ShortenService;

/// Shared per-request state for both front-ends.
#[derive(Clone, TypedBuilder)]
pub struct AppState {
    /// The storage backend behind the whole service.
    storage: Arc<dyn LinkRepository>,
    /// The shared insert path (generation, retry, conflict recovery).
    service: ShortenService,
    /// Base URL prepended to every short id in responses.
    base_url: String,
    /// Keys for issuing and verifying identity tokens.
    keys: Arc<TokenKeys>,
    /// CIDR allowed to call the stats endpoint, parsed once at startup.
    #[builder(default)]
    trusted_subnet: Option<IpNet>,
    /// Process shutdown signal; doubles as the deletion pipeline's done
    /// signal.
    shutdown: watch::Receiver<bool>,
}

impl AppState {
    pub fn storage(&self) -> &Arc<dyn LinkRepository> {
        &self.storage
    }

    pub fn service(&self) -> &ShortenService {
        &self.service
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn keys(&self) -> &TokenKeys {
        &self.keys
    }

    pub fn trusted_subnet(&self) -> Option<&IpNet> {
        self.trusted_subnet.as_ref()
    }

    pub fn shutdown(&self) -> watch::Receiver<bool> {
        self.shutdown.clone()
    }
}
