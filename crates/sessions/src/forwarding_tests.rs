// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::sync::Arc;

use mutagen_core::Selection;

use crate::passive::PassiveConnector;
use crate::prompting::SilentPrompter;

fn spec(name: &str) -> ForwardingCreateSpec {
    ForwardingCreateSpec {
        name: Some(name.to_string()),
        configuration: ForwardingConfiguration {
            source: "tcp:localhost:8080".to_string(),
            destination: "tcp:localhost:9090".to_string(),
        },
        ..Default::default()
    }
}

#[tokio::test]
async fn session_lifecycle() {
    let directory = tempfile::tempdir().unwrap();
    let manager = ForwardingManager::open(
        directory.path().to_path_buf(),
        Arc::new(PassiveConnector),
    )
    .unwrap();

    let session = manager.create_session(spec("web"), &SilentPrompter).await.unwrap();
    assert!(session.identifier.starts_with("fwrd_"));

    let selection = Selection::Specifications { specifications: vec!["web".to_string()] };
    let (_, states) = manager.list(&selection, 0).await.unwrap();
    assert_eq!(states.len(), 1);
    assert_eq!(states[0].object.configuration.source, "tcp:localhost:8080");

    manager.pause(&selection, &SilentPrompter).await.unwrap();
    manager.resume(&selection, &SilentPrompter).await.unwrap();
    manager.terminate(&selection, &SilentPrompter).await.unwrap();

    let (_, states) = manager.list(&Selection::All, 0).await.unwrap();
    assert!(states.is_empty());
}

#[tokio::test]
async fn version_counter_tracks_mutations() {
    let directory = tempfile::tempdir().unwrap();
    let manager = ForwardingManager::open(
        directory.path().to_path_buf(),
        Arc::new(PassiveConnector),
    )
    .unwrap();

    let session = manager.create_session(spec("versioned"), &SilentPrompter).await.unwrap();
    assert_eq!(session.version, 1);

    let selection =
        Selection::Specifications { specifications: vec![session.identifier.clone()] };
    manager.pause(&selection, &SilentPrompter).await.unwrap();
    manager.resume(&selection, &SilentPrompter).await.unwrap();

    let (_, states) = manager.list(&selection, 0).await.unwrap();
    assert_eq!(states[0].object.version, 3);
}
