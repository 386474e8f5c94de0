//! Persistence through the SQLite store across restarts

use std::sync::Arc;

use convergedoc::backend::collab::state::CollabState;
use convergedoc::backend::server::ServerConfig;
use convergedoc::backend::storage::{DocumentStore, SqliteStore};
use convergedoc::shared::{DocumentSnapshot, Operation};
use pretty_assertions::assert_eq;

use crate::assert_ok;
use crate::common::{TestClient, TestServer};

fn database_url(dir: &tempfile::TempDir) -> String {
    format!("sqlite://{}", dir.path().join("documents.db").display())
}

#[tokio::test]
async fn test_documents_survive_restart() {
    let dir = assert_ok!(tempfile::tempdir());
    let url = database_url(&dir);

    {
        let store: Arc<dyn DocumentStore> = Arc::new(assert_ok!(SqliteStore::connect(&url).await));
        let state = CollabState::new(store);
        let doc = assert_ok!(state.get_or_open("notes").await);
        assert_ok!(doc.submit(None, vec![Operation::insert(0, "first line")], 0).await);
        assert_ok!(doc.submit(None, vec![Operation::insert(5, "ish")], 1).await);
        // Stale: split around the insert above, committed as versions 3 and 4.
        assert_ok!(doc.submit(None, vec![Operation::delete(0, 6)], 1).await);
    }

    let store: Arc<dyn DocumentStore> = Arc::new(assert_ok!(SqliteStore::connect(&url).await));
    let state = CollabState::new(store.clone());
    let doc = assert_ok!(state.get_or_open("notes").await);
    assert_eq!(
        doc.load().await,
        DocumentSnapshot { content: "ishline".to_string(), version: 4 }
    );

    // Editing continues from the restored version.
    let outcome = assert_ok!(doc.submit(None, vec![Operation::insert(7, "!")], 4).await);
    assert_eq!(outcome.version, 5);
    assert_eq!(assert_ok!(store.list_documents().await), vec!["notes".to_string()]);
}

#[tokio::test]
async fn test_server_on_sqlite_store() {
    let dir = assert_ok!(tempfile::tempdir());
    let config = assert_ok!(ServerConfig::builder().database_url(database_url(&dir)).build());
    let store = convergedoc::backend::server::load_store(&config).await;
    assert_eq!(store.backend_name(), "sqlite");

    let server = TestServer::with_config(config, store).await;
    let mut client = TestClient::connect(&server.ws_url("shared")).await;
    client.send_op(Operation::insert(0, "persisted"), 0).await;
    client.recv_commits(1).await;

    let stored = assert_ok!(server.store.load_document("shared").await);
    let stored = stored.expect("document was written");
    assert_eq!(stored.content, "persisted");
    assert_eq!(stored.operations.len(), 1);
}
