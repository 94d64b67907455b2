//! Provider adapter tests
//!
//! Each directory is mocked with wiremock; the assertions cover the
//! request the adapter sends and the records it produces.

use std::sync::Arc;

use mcpreg_core::{ProviderKey, ProviderSet, SyncEngine, SyncResult};
use tests::harness::config_for;
use tests::MockTokenVault;
use wiremock::MockServer;


/// Run one sync against an empty registry with `token` stored
async fn sync_once(server: &MockServer, provider: ProviderKey, token: &str) -> SyncResult {
    let vault = Arc::new(MockTokenVault::new().with_token(provider, token));
    let providers =
        ProviderSet::from_config(&config_for(server), vault.clone()).expect("provider set");
    SyncEngine::new(providers, vault).sync(provider, None, &[]).await
}
