mod external_syncer;
mod http_provider;
mod scheduler;

pub use external_syncer::{ExternalSyncer, ExternalTask, ExternalTaskProvider};
pub use http_provider::HttpExternalTaskProvider;
pub use scheduler::{BatchSyncReport, SyncFailure, SyncScheduler};
