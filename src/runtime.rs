use std::io;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::info;

use crate::config::Config;
use crate::dispatch::Dispatcher;
use crate::engine::BookingService;
use crate::notify::NotifyHub;
use crate::store::Store;

/// A ready booking service: store (journaled or in-memory), push hub, and a
/// running notification dispatcher.
pub struct Runtime {
    pub service: BookingService<Store>,
    pub store: Arc<Store>,
    pub hub: Arc<NotifyHub>,
    dispatcher: JoinHandle<()>,
}

impl Runtime {
    /// Must be called inside a tokio runtime. Installs the tracing subscriber
    /// unless the host already has one.
    pub fn start(config: &Config) -> io::Result<Self> {
        crate::observability::init_tracing();
        crate::observability::init(config.metrics_port).map_err(io::Error::other)?;

        let store = match config.journal_path() {
            Some(path) => {
                if let Some(dir) = path.parent() {
                    std::fs::create_dir_all(dir)?;
                }
                info!("journal: {}", path.display());
                Store::open(&path)?
            }
            None => {
                info!("no data dir configured, running in memory");
                Store::in_memory()
            }
        };
        let store = Arc::new(store);
        let hub = Arc::new(NotifyHub::new());

        let (tx, rx) = mpsc::channel(config.dispatch_queue);
        let dispatcher = Dispatcher::new(store.clone(), hub.clone());
        let dispatcher = tokio::spawn(dispatcher.run(rx));

        Ok(Self {
            service: BookingService::new(store.clone(), tx),
            store,
            hub,
            dispatcher,
        })
    }

    /// Drop the service and wait for queued notifications to go out.
    /// Clones of the service handed out earlier must be dropped first.
    pub async fn shutdown(self) {
        drop(self.service);
        if let Err(e) = self.dispatcher.await {
            tracing::error!("dispatcher task failed: {e}");
        }
        info!("tandem stopped");
    }
}
