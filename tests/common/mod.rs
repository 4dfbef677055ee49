//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::net::TcpListener;
use tokio::sync::oneshot;

use app_dispatch::auth::{AuthenticatedUser, Role};
use app_dispatch::config::ListenerConfig;
use app_dispatch::db::MemoryDb;
use app_dispatch::events::BoxError;
use app_dispatch::{Dispatcher, HttpServer};

/// A database holding the account `pete` / `hunter2` with the editor role.
pub fn db_with_pete() -> Arc<MemoryDb> {
    let db = Arc::new(MemoryDb::new());
    let mut fields = BTreeMap::new();
    fields.insert("alias".to_string(), "mr.pete".to_string());
    AuthenticatedUser::register(db.as_ref(), "pete", "hunter2", Role::EDITOR, fields).unwrap();
    db
}

/// Observer recording the listener calls it receives.
#[derive(Default)]
pub struct Recorder {
    calls: Mutex<Vec<String>>,
}

impl Recorder {
    pub fn record(&self, call: impl Into<String>) -> Result<(), BoxError> {
        self.calls.lock().push(call.into());
        Ok(())
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }
}

/// A server running `dispatcher` on an ephemeral port. Dropping the
/// returned sender shuts it down.
pub async fn start_server(dispatcher: Dispatcher, config: ListenerConfig) -> (SocketAddr, oneshot::Sender<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = oneshot::channel::<()>();

    let server = HttpServer::new(Arc::new(dispatcher), config);
    tokio::spawn(async move {
        server
            .run(listener, async {
                let _ = rx.await;
            })
            .await
            .unwrap();
    });
    (addr, tx)
}
