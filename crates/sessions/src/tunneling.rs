// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tunnel records and the tunnel manager.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use mutagen_compress::Algorithm;
use mutagen_core::{new_identifier, Selection, PREFIX_TOKEN, PREFIX_TUNNEL};
use serde::{Deserialize, Serialize};

use crate::manager::{Manager, ManagerError};
use crate::prompting::{Prompter, SilentPrompter};
use crate::registry::Record;

/// Tunnel behavior configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TunnelConfiguration {
    /// Compression applied to connections multiplexed over the tunnel.
    #[serde(default)]
    pub compression: Algorithm,
}

/// Opaque credential blob consumed by the remote host process.
pub type TunnelHostCredentials = Vec<u8>;

/// A persistent tunnel record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tunnel {
    pub identifier: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub labels: HashMap<String, String>,
    pub configuration: TunnelConfiguration,
    pub created_at: DateTime<Utc>,
    pub paused: bool,
    pub version: u64,
    /// Daemon-side copy of the credentials handed to the host process.
    #[serde(with = "mutagen_wire::base64_bytes")]
    pub host_credentials: TunnelHostCredentials,
}

impl Record for Tunnel {
    fn identifier(&self) -> &str {
        &self.identifier
    }

    fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    fn labels(&self) -> &HashMap<String, String> {
        &self.labels
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn paused(&self) -> bool {
        self.paused
    }

    fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    fn bump_version(&mut self) {
        self.version += 1;
    }
}

/// Parameters for tunnel creation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TunnelCreateSpec {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub labels: HashMap<String, String>,
    #[serde(default)]
    pub configuration: TunnelConfiguration,
    #[serde(default)]
    pub paused: bool,
}

/// Manager for tunnel records.
pub type TunnelManager = Manager<Tunnel>;

impl Manager<Tunnel> {
    /// Create a tunnel, provisioning host credentials and starting the
    /// hosting loop unless the tunnel starts paused.
    pub async fn create_tunnel(
        &self,
        spec: TunnelCreateSpec,
        prompter: &dyn Prompter,
    ) -> Result<(Tunnel, TunnelHostCredentials), ManagerError> {
        let identifier = new_identifier(PREFIX_TUNNEL)?;
        let host_credentials = provision_credentials(&identifier)?;

        let tunnel = Tunnel {
            identifier,
            name: spec.name.filter(|name| !name.is_empty()),
            labels: spec.labels,
            configuration: spec.configuration,
            created_at: Utc::now(),
            paused: spec.paused,
            version: 1,
            host_credentials: host_credentials.clone(),
        };

        let tunnel = self.create(tunnel, prompter).await?;

        // Creation is all-or-nothing: a prompting failure after the
        // record landed on disk rolls the record back.
        let created = prompter.message(&format!("Created tunnel {}", tunnel.identifier)).await;
        if let Err(error) = created {
            let selection = Selection::Specifications {
                specifications: vec![tunnel.identifier.clone()],
            };
            let _ = self.terminate(&selection, &SilentPrompter).await;
            return Err(error.into());
        }
        Ok((tunnel, host_credentials))
    }
}

/// Build the opaque credential blob for a tunnel. The daemon treats it
/// as bytes; only the host process interprets the contents.
fn provision_credentials(identifier: &str) -> Result<TunnelHostCredentials, ManagerError> {
    let secret = new_identifier(PREFIX_TOKEN)?;
    let credentials = serde_json::json!({
        "tunnel": identifier,
        "secret": secret,
        "version": 1,
    });
    Ok(serde_json::to_vec(&credentials)?)
}

#[cfg(test)]
#[path = "tunneling_tests.rs"]
mod tests;
