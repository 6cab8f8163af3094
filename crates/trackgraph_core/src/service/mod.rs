//! Mutation orchestrator and query facade.
//!
//! # Responsibility
//! - Be the single write path for trackers, functions, groups, graphs and
//!   data points.
//! - Run every mutation in one store transaction, including its cascades.
//! - Publish the mutation's change events after commit.
//!
//! # Invariants
//! - Validation happens before the first write of a mutation.
//! - A failed mutation leaves no partial write and publishes no event.
//! - Every mutation logs one `event=mutation` line.

mod cascade;
mod data_point_ops;
mod function_ops;
mod graph_ops;
mod group_ops;
mod ordering;
mod scope;
mod tracker_ops;

pub use ordering::ComponentRef;
pub use scope::TxScope;

use crate::config::EngineConfig;
use crate::db::Store;
use crate::error::{CoreError, CoreResult};
use crate::events::{ChangeBus, ChangeEvent, ChangeSubscription};
use crate::logging::{default_log_level, init_logging};
use log::{error, info, warn};
use std::time::Instant;

/// Entity store plus the change bus fed by its mutations.
pub struct DataService {
    store: Store,
    bus: ChangeBus,
}

impl DataService {
    /// Opens the store described by `config`, starting logging when a log
    /// directory is configured.
    pub fn open(config: &EngineConfig) -> CoreResult<Self> {
        config
            .validate()
            .map_err(|err| CoreError::InvalidArgument(err.to_string()))?;

        if let Some(log_dir) = &config.log_dir {
            let level = config.log_level.as_deref().unwrap_or(default_log_level());
            init_logging(level, log_dir)
                .map_err(|err| CoreError::InvalidArgument(err.to_string()))?;
        }

        let store = match &config.db_path {
            Some(path) => Store::open(path)?,
            None => Store::open_in_memory()?,
        };
        info!(
            "event=service_open module=service status=ok mode={} event_buffer_capacity={}",
            if config.db_path.is_some() { "file" } else { "memory" },
            config.event_buffer_capacity
        );
        Ok(Self::from_parts(
            store,
            ChangeBus::new(config.event_buffer_capacity),
        ))
    }

    /// In-memory service with default settings.
    pub fn open_in_memory() -> CoreResult<Self> {
        Self::open(&EngineConfig::in_memory())
    }

    pub fn from_parts(store: Store, bus: ChangeBus) -> Self {
        Self { store, bus }
    }

    /// New independent subscription; earlier events are not replayed.
    pub fn subscribe(&self) -> ChangeSubscription {
        self.bus.subscribe()
    }

    pub fn bus(&self) -> &ChangeBus {
        &self.bus
    }

    /// Announces that global notes changed.
    pub fn notify_global_notes_changed(&self) {
        self.bus.publish(ChangeEvent::GlobalNote);
    }

    /// Announces that reminders changed.
    pub fn notify_reminders_changed(&self) {
        self.bus.publish(ChangeEvent::ReminderChanged);
    }

    /// Announces that an import replaced data behind the service's back.
    pub fn notify_external_import(&self) {
        self.bus.publish(ChangeEvent::Unknown);
    }

    /// Runs `block` in one transaction and publishes its recorded events
    /// after commit.
    ///
    /// Events go out while the store is still locked, so announcements of
    /// successive writes arrive in commit order.
    pub(crate) fn write<T>(
        &self,
        op: &'static str,
        block: impl FnOnce(&mut TxScope<'_>) -> CoreResult<T>,
    ) -> CoreResult<T> {
        let started_at = Instant::now();
        let outcome = self.store.run_in_transaction_then(
            |tx| {
                let mut scope = TxScope::new(tx);
                let value = block(&mut scope)?;
                Ok::<_, CoreError>((value, scope.into_events()))
            },
            |(_, events): &(T, Vec<ChangeEvent>)| self.bus.publish_all(events.iter().copied()),
        );

        match outcome {
            Ok((value, events)) => {
                info!(
                    "event=mutation module=service op={op} status=ok duration_ms={} events={}",
                    started_at.elapsed().as_millis(),
                    events.len()
                );
                Ok(value)
            }
            Err(CoreError::StorageFailure(err)) => {
                error!(
                    "event=mutation module=service op={op} status=error duration_ms={} error_code=storage_failure error={err}",
                    started_at.elapsed().as_millis()
                );
                Err(CoreError::StorageFailure(err))
            }
            Err(err) => {
                warn!(
                    "event=mutation module=service op={op} status=rejected duration_ms={} error_code={}",
                    started_at.elapsed().as_millis(),
                    err.code()
                );
                Err(err)
            }
        }
    }

    /// Runs a read-only block; it cannot record events.
    pub(crate) fn read<T>(&self, block: impl FnOnce(&TxScope<'_>) -> CoreResult<T>) -> CoreResult<T> {
        self.store.read(|conn| block(&TxScope::new(conn)))
    }
}
