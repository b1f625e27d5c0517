use anyhow::{Context, Result};
use rquest::Client;
use rquest_util::Emulation;
use std::time::Duration;

#[derive(Debug, Clone, Copy)]
pub enum ClientType {
    /// Plain client for API endpoints and header probes.
    Plain,
    /// Browser-emulating client for fetching real pages.
    Emulated,
}

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Factory for the two HTTP client flavors used across validators.
pub fn create_client(client_type: ClientType) -> Result<Client> {
    let builder = Client::builder().timeout(DEFAULT_TIMEOUT);

    match client_type {
        ClientType::Emulated => builder
            .emulation(Emulation::Firefox136)
            .build()
            .context("Failed to build emulated rquest client"),
        ClientType::Plain => builder
            .build()
            .context("Failed to build plain rquest client"),
    }
}
