// ── Optimistic transaction runner ──
//
// Builds a batch from a fresh machine snapshot, applies it against the
// snapshot's revision, and rebuilds from scratch when the machine changed
// underneath. Each attempt sees a clean copy of its inputs.

use tracing::{debug, warn};

use crate::error::CoreError;
use crate::merge::{LinkLayerMerge, MergeOptions};
use crate::model::{IncomingSnapshot, MachineId};
use crate::operation::MergeOutcome;
use crate::store::{MachineSnapshot, ModelStore};

const DEFAULT_MAX_ATTEMPTS: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxnOptions {
    /// Total attempts, including the first. Values below 1 are treated as 1.
    pub max_attempts: u32,
}

impl Default for TxnOptions {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

/// What a successful run did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxnReport {
    /// Attempt that produced `outcome`, starting at 1.
    pub attempts: u32,
    pub outcome: MergeOutcome,
    /// Machine revision after the run; unchanged if nothing was applied.
    pub revision: u64,
}

impl TxnReport {
    pub fn applied(&self) -> bool {
        !self.outcome.operations().is_empty()
    }
}

pub struct TxnRunner<'s> {
    store: &'s ModelStore,
    options: TxnOptions,
}

impl<'s> TxnRunner<'s> {
    pub fn new(store: &'s ModelStore, options: TxnOptions) -> Self {
        Self { store, options }
    }

    /// Run `build` against fresh snapshots until its batch applies cleanly.
    ///
    /// `build` receives the snapshot and the attempt number. A
    /// [`MergeOutcome::NoOperations`] result or an empty batch is returned
    /// without touching the store.
    pub fn run<F>(&self, machine_id: &MachineId, mut build: F) -> Result<TxnReport, CoreError>
    where
        F: FnMut(&MachineSnapshot, u32) -> Result<MergeOutcome, CoreError>,
    {
        let max_attempts = self.options.max_attempts.max(1);
        for attempt in 1..=max_attempts {
            let snapshot = self.store.machine(machine_id)?;
            let outcome = build(&snapshot, attempt)?;

            if outcome.operations().is_empty() {
                debug!(machine = %machine_id, attempt, skip = outcome.is_skip(), "nothing to apply");
                return Ok(TxnReport {
                    attempts: attempt,
                    outcome,
                    revision: snapshot.revision(),
                });
            }

            match self
                .store
                .apply(machine_id, snapshot.revision(), outcome.operations())
            {
                Ok(revision) => {
                    return Ok(TxnReport {
                        attempts: attempt,
                        outcome,
                        revision,
                    });
                }
                Err(e) if e.is_conflict() => {
                    debug!(machine = %machine_id, attempt, "transaction conflict, retrying");
                }
                Err(e) => return Err(e),
            }
        }

        warn!(machine = %machine_id, attempts = max_attempts, "giving up on link-layer merge");
        Err(CoreError::RetriesExhausted {
            attempts: max_attempts,
        })
    }
}

/// Merge `incoming` into one machine of `store`, retrying on conflicts.
pub fn reconcile_machine(
    store: &ModelStore,
    machine_id: &MachineId,
    incoming: &IncomingSnapshot,
    merge: &MergeOptions,
    txn: &TxnOptions,
) -> Result<TxnReport, CoreError> {
    TxnRunner::new(store, *txn).run(machine_id, |snapshot, _attempt| {
        LinkLayerMerge::new(snapshot, incoming.devices.clone(), merge.clone()).build()
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::{DeviceRecord, DeviceType, IncomingDevice, Life, MachineRecord, ProviderId};

    fn store() -> (ModelStore, MachineId) {
        let store = ModelStore::new();
        store
            .insert_machine(
                MachineRecord::new("0")
                    .with_device(DeviceRecord::new("eth0", "aa:bb", DeviceType::Ethernet)),
            )
            .unwrap();
        (store, MachineId::from("0"))
    }

    fn incoming() -> IncomingSnapshot {
        IncomingSnapshot::new(vec![IncomingDevice::new("eth0", "aa:bb", "eni-0")])
    }

    #[test]
    fn applies_on_first_attempt() {
        let (store, id) = store();
        let report =
            reconcile_machine(&store, &id, &incoming(), &MergeOptions::default(), &TxnOptions::default())
                .unwrap();

        assert_eq!(report.attempts, 1);
        assert!(report.applied());
        assert_eq!(report.revision, 1);
        assert_eq!(
            store.machine(&id).unwrap().devices()[0].provider_id,
            ProviderId::parse("eni-0").unwrap()
        );
    }

    #[test]
    fn rebuilds_after_concurrent_change() {
        let (store, id) = store();
        let runner = TxnRunner::new(&store, TxnOptions::default());

        let report = runner
            .run(&id, |snapshot, attempt| {
                if attempt == 1 {
                    store.update_machine(&id, |_| {})?;
                }
                LinkLayerMerge::new(snapshot, incoming().devices, MergeOptions::default()).build()
            })
            .unwrap();

        assert_eq!(report.attempts, 2);
        assert_eq!(store.revision(&id), Some(2));
    }

    #[test]
    fn gives_up_after_max_attempts() {
        let (store, id) = store();
        let runner = TxnRunner::new(&store, TxnOptions { max_attempts: 2 });
        let mut calls = 0;

        let err = runner
            .run(&id, |snapshot, _| {
                calls += 1;
                store.update_machine(&id, |_| {})?;
                LinkLayerMerge::new(snapshot, incoming().devices, MergeOptions::default()).build()
            })
            .unwrap_err();

        assert!(matches!(err, CoreError::RetriesExhausted { attempts: 2 }));
        assert_eq!(calls, 2);
    }

    #[test]
    fn skip_outcome_is_not_applied() {
        let store = ModelStore::new();
        store.insert_machine(MachineRecord::new("0")).unwrap();
        let id = MachineId::from("0");

        let report =
            reconcile_machine(&store, &id, &incoming(), &MergeOptions::default(), &TxnOptions::default())
                .unwrap();

        assert!(report.outcome.is_skip());
        assert!(!report.applied());
        assert_eq!(store.revision(&id), Some(0));
    }

    #[test]
    fn dead_machine_is_not_retried() {
        let (store, id) = store();
        store.update_machine(&id, |m| m.life = Life::Dead).unwrap();

        let err =
            reconcile_machine(&store, &id, &incoming(), &MergeOptions::default(), &TxnOptions::default())
                .unwrap_err();

        assert!(matches!(err, CoreError::MachineNotAlive { .. }));
    }
}
