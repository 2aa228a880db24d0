#![allow(clippy::unwrap_used)]
// Integration tests for single link-layer merge passes against the
// in-memory model store.

use std::io;
use std::sync::{Arc, Mutex};

use pretty_assertions::assert_eq;

use fleetlink_core::{
    AddressRecord, CoreError, DeviceRecord, DeviceType, IncomingAddress, IncomingDevice,
    IncomingSnapshot, MachineId, MachineRecord, MergeOptions, MergeOutcome, MixedNamingPolicy,
    ModelStore, Operation, Origin, ProviderId, merge_link_layer,
};

// ── Helpers ─────────────────────────────────────────────────────────

fn pid(raw: &str) -> Option<ProviderId> {
    ProviderId::parse(raw).unwrap()
}

fn mid() -> MachineId {
    MachineId::from("0")
}

fn store_with(machine: MachineRecord) -> ModelStore {
    let store = ModelStore::new();
    store.insert_machine(machine).unwrap();
    store
}

fn run(store: &ModelStore, incoming: Vec<IncomingDevice>) -> MergeOutcome {
    run_with(store, incoming, &MergeOptions::default())
}

fn run_with(store: &ModelStore, incoming: Vec<IncomingDevice>, options: &MergeOptions) -> MergeOutcome {
    let snapshot = store.machine(&mid()).unwrap();
    merge_link_layer(&snapshot, &IncomingSnapshot::new(incoming), options).unwrap()
}

fn apply(store: &ModelStore, outcome: &MergeOutcome) {
    let revision = store.revision(&mid()).unwrap();
    store.apply(&mid(), revision, outcome.operations()).unwrap();
}

fn alive() -> Operation {
    Operation::AssertAlive { machine: mid() }
}

fn set_device_pid(device: &str, raw: &str) -> Operation {
    Operation::SetDeviceProviderId {
        machine: mid(),
        device: device.into(),
        provider_id: pid(raw),
    }
}

fn set_address_pid(device: &str, address: &str, raw: &str) -> Operation {
    Operation::SetAddressProviderId {
        machine: mid(),
        device: device.into(),
        address: address.into(),
        provider_id: pid(raw),
    }
}

fn set_origin(device: &str, address: &str, origin: Origin) -> Operation {
    Operation::SetAddressOrigin {
        machine: mid(),
        device: device.into(),
        address: address.into(),
        origin,
    }
}

/// Run `f` with a subscriber writing plain-text DEBUG logs into a buffer.
fn capture_logs(f: impl FnOnce()) -> String {
    let buf = Arc::new(Mutex::new(Vec::new()));
    let writer = Arc::clone(&buf);
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .with_writer(move || SharedBuf(Arc::clone(&writer)))
        .finish();
    tracing::subscriber::with_default(subscriber, f);
    let bytes = buf.lock().unwrap().clone();
    String::from_utf8(bytes).unwrap()
}

struct SharedBuf(Arc<Mutex<Vec<u8>>>);

impl io::Write for SharedBuf {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

// ── Skip and adoption ───────────────────────────────────────────────

#[test]
fn test_empty_model_is_skipped() {
    let store = store_with(MachineRecord::new("0"));

    let outcome = run(&store, vec![IncomingDevice::new("eth0", "aa:bb", "p-1")]);

    assert_eq!(outcome, MergeOutcome::NoOperations);
}

#[test]
fn test_matched_device_adopts_provider_id() {
    let store = store_with(
        MachineRecord::new("0").with_device(DeviceRecord::new("eth0", "aa:bb", DeviceType::Ethernet)),
    );

    let outcome = run(&store, vec![IncomingDevice::new("eth0", "aa:bb", "p-1")]);

    assert_eq!(outcome, MergeOutcome::Batch(vec![alive(), set_device_pid("eth0", "p-1")]));
}

#[test]
fn test_bare_hex_mac_matches_device() {
    let store = store_with(MachineRecord::new("0").with_device(DeviceRecord::new(
        "eth0",
        "aa:bb:cc:00:11:22",
        DeviceType::Ethernet,
    )));

    let outcome = run(&store, vec![IncomingDevice::new("eth0", "AABBCC001122", "p-1")]);

    assert_eq!(outcome, MergeOutcome::Batch(vec![alive(), set_device_pid("eth0", "p-1")]));
}

#[test]
fn test_in_sync_model_yields_empty_batch() {
    let store = store_with(
        MachineRecord::new("0").with_device(
            DeviceRecord::new("eth0", "aa:bb", DeviceType::Ethernet)
                .with_provider_id(pid("p-1").unwrap()),
        ),
    );

    let outcome = run(&store, vec![IncomingDevice::new("eth0", "aa:bb", "p-1")]);

    assert_eq!(outcome, MergeOutcome::Batch(Vec::new()));
    assert!(!outcome.is_skip());
}

#[test]
fn test_conflicting_provider_id_is_kept_and_warned() {
    let store = store_with(
        MachineRecord::new("0").with_device(
            DeviceRecord::new("eth0", "aa:bb", DeviceType::Ethernet)
                .with_provider_id(pid("p-1").unwrap()),
        ),
    );

    let mut outcome = None;
    let logs = capture_logs(|| {
        outcome = Some(run(&store, vec![IncomingDevice::new("eth0", "aa:bb", "p-2")]));
    });

    assert_eq!(outcome.unwrap(), MergeOutcome::Batch(Vec::new()));
    assert!(logs.contains("not changing provider ID for device"), "{logs}");
    assert!(logs.contains("p-2"), "{logs}");
}

// ── Relinquishment ──────────────────────────────────────────────────

#[test]
fn test_missing_device_relinquishes_provider_authority() {
    let store = store_with(
        MachineRecord::new("0").with_device(
            DeviceRecord::new("eth0", "aa:bb", DeviceType::Ethernet)
                .with_provider_id(pid("p-1").unwrap())
                .with_address(AddressRecord::new("10.0.0.5").with_origin(Origin::Provider)),
        ),
    );

    let outcome = run(&store, vec![IncomingDevice::new("eth1", "cc:dd", "p-9")]);

    assert_eq!(
        outcome,
        MergeOutcome::Batch(vec![
            alive(),
            set_device_pid("eth0", ""),
            set_origin("eth0", "10.0.0.5", Origin::Machine),
        ])
    );
}

#[test]
fn test_name_mismatch_on_same_mac_relinquishes() {
    let store = store_with(
        MachineRecord::new("0").with_device(
            DeviceRecord::new("eth0", "aa:bb", DeviceType::Ethernet)
                .with_provider_id(pid("p-1").unwrap()),
        ),
    );

    let outcome = run(&store, vec![IncomingDevice::new("ens3", "aa:bb", "p-1")]);

    assert_eq!(outcome, MergeOutcome::Batch(vec![alive(), set_device_pid("eth0", "")]));
}

#[test]
fn test_unmatched_address_returns_to_machine() {
    let store = store_with(
        MachineRecord::new("0").with_device(
            DeviceRecord::new("eth0", "aa:bb", DeviceType::Ethernet)
                .with_address(AddressRecord::new("10.0.0.5").with_origin(Origin::Provider))
                .with_address(AddressRecord::new("10.0.0.6")),
        ),
    );
    let incoming = IncomingDevice::new("eth0", "aa:bb", "")
        .with_address(IncomingAddress::new("192.168.1.4/24").with_provider_ids("a-1", "", ""));

    let outcome = run(&store, vec![incoming]);
    apply(&store, &outcome);

    assert_eq!(
        outcome,
        MergeOutcome::Batch(vec![alive(), set_origin("eth0", "10.0.0.5", Origin::Machine)])
    );
    let snap = store.machine(&mid()).unwrap();
    let eth0 = snap.record().device("eth0").unwrap();
    assert!(eth0.addresses.iter().all(|a| a.origin == Origin::Machine));
}

// ── Address linking ─────────────────────────────────────────────────

#[test]
fn test_address_gets_provider_ids() {
    let store = store_with(
        MachineRecord::new("0").with_device(
            DeviceRecord::new("eth0", "aa:bb", DeviceType::Ethernet)
                .with_address(AddressRecord::new("10.0.0.5")),
        ),
    );
    let incoming = IncomingDevice::new("eth0", "aa:bb", "")
        .with_address(IncomingAddress::new("10.0.0.5/24").with_provider_ids("pid-9", "", ""));

    let outcome = run(&store, vec![incoming]);

    assert_eq!(
        outcome,
        MergeOutcome::Batch(vec![alive(), set_address_pid("eth0", "10.0.0.5", "pid-9")])
    );
}

#[test]
fn test_address_gets_network_and_subnet_ids() {
    let store = store_with(
        MachineRecord::new("0").with_device(
            DeviceRecord::new("eth0", "aa:bb", DeviceType::Ethernet)
                .with_address(AddressRecord::new("10.0.0.5")),
        ),
    );
    let incoming = IncomingDevice::new("eth0", "aa:bb", "eni-1").with_address(
        IncomingAddress::new("10.0.0.5/24").with_provider_ids("pid-9", "vpc-1", "subnet-1"),
    );

    apply(&store, &run(&store, vec![incoming]));

    let snap = store.machine(&mid()).unwrap();
    let addr = snap.record().device("eth0").unwrap().address("10.0.0.5").unwrap().clone();
    assert_eq!(addr.provider_id, pid("pid-9"));
    assert_eq!(addr.provider_network_id.as_deref(), Some("vpc-1"));
    assert_eq!(addr.provider_subnet_id.as_deref(), Some("subnet-1"));
    assert_eq!(addr.origin, Origin::Provider);
}

#[test]
fn test_first_matching_candidate_wins() {
    let store = store_with(
        MachineRecord::new("0").with_device(
            DeviceRecord::new("eth0", "aa:bb", DeviceType::Ethernet)
                .with_address(AddressRecord::new("10.0.0.5")),
        ),
    );
    let incoming = IncomingDevice::new("eth0", "aa:bb", "")
        .with_address(IncomingAddress::new("10.0.0.5/24").with_provider_ids("a-1", "", ""))
        .with_address(IncomingAddress::new("10.0.0.5/32").with_provider_ids("a-2", "", ""));

    let outcome = run(&store, vec![incoming]);

    assert_eq!(
        outcome,
        MergeOutcome::Batch(vec![alive(), set_address_pid("eth0", "10.0.0.5", "a-1")])
    );
}

#[test]
fn test_address_match_is_prefix_based() {
    let store = store_with(
        MachineRecord::new("0").with_device(
            DeviceRecord::new("eth0", "aa:bb", DeviceType::Ethernet)
                .with_address(AddressRecord::new("10.0.0.5")),
        ),
    );
    let incoming = IncomingDevice::new("eth0", "aa:bb", "")
        .with_address(IncomingAddress::new("10.0.0.50/24").with_provider_ids("a-50", "", ""));

    let outcome = run(&store, vec![incoming]);

    assert_eq!(
        outcome,
        MergeOutcome::Batch(vec![alive(), set_address_pid("eth0", "10.0.0.5", "a-50")])
    );
}

#[test]
fn test_addresses_merge_across_duplicate_incoming_devices() {
    let store = store_with(
        MachineRecord::new("0").with_device(
            DeviceRecord::new("eth0", "aa:bb", DeviceType::Ethernet)
                .with_address(AddressRecord::new("10.0.0.5"))
                .with_address(AddressRecord::new("10.0.1.5")),
        ),
    );
    let incoming = vec![
        IncomingDevice::new("eth0", "aa:bb", "")
            .with_address(IncomingAddress::new("10.0.0.5/24").with_provider_ids("a-1", "", "")),
        IncomingDevice::new("eth0", "aa:bb", "")
            .with_address(IncomingAddress::new("10.0.1.5/24").with_provider_ids("a-2", "", "")),
    ];

    let outcome = run(&store, incoming);

    assert_eq!(
        outcome,
        MergeOutcome::Batch(vec![
            alive(),
            set_address_pid("eth0", "10.0.0.5", "a-1"),
            set_address_pid("eth0", "10.0.1.5", "a-2"),
        ])
    );
}

// ── Name normalization ──────────────────────────────────────────────

fn shared_mac_machine(bridge_pid: Option<&str>) -> MachineRecord {
    let mut bridge = DeviceRecord::new("br0", "aa:bb", DeviceType::Bridge)
        .with_address(AddressRecord::new("10.0.0.5"));
    if let Some(raw) = bridge_pid {
        bridge = bridge.with_provider_id(pid(raw).unwrap());
    }
    MachineRecord::new("0")
        .with_device(bridge)
        .with_device(
            DeviceRecord::new("eth0", "aa:bb", DeviceType::Ethernet)
                .with_address(AddressRecord::new("10.0.0.5")),
        )
}

fn nameless_incoming(provider_id: &str) -> IncomingDevice {
    IncomingDevice::new("", "aa:bb", provider_id)
        .with_address(IncomingAddress::new("10.0.0.5/24").with_provider_ids("a-1", "", ""))
}

#[test]
fn test_nameless_device_prefers_ethernet() {
    let store = store_with(shared_mac_machine(None));

    let outcome = run(&store, vec![nameless_incoming("p-1")]);

    assert_eq!(
        outcome,
        MergeOutcome::Batch(vec![
            alive(),
            set_device_pid("eth0", "p-1"),
            set_address_pid("eth0", "10.0.0.5", "a-1"),
        ])
    );
}

#[test]
fn test_nameless_device_prefers_provider_linked_device() {
    let store = store_with(shared_mac_machine(Some("p-br")));

    let outcome = run(&store, vec![nameless_incoming("p-br")]);

    assert_eq!(
        outcome,
        MergeOutcome::Batch(vec![alive(), set_address_pid("br0", "10.0.0.5", "a-1")])
    );
}

#[test]
fn test_devices_sharing_donor_mac_are_not_relinquished() {
    let store = store_with(
        MachineRecord::new("0")
            .with_device(
                DeviceRecord::new("br0", "aa:bb", DeviceType::Bridge)
                    .with_provider_id(pid("p-br").unwrap()),
            )
            .with_device(
                DeviceRecord::new("eth0", "aa:bb", DeviceType::Ethernet)
                    .with_provider_id(pid("p-eth").unwrap())
                    .with_address(AddressRecord::new("10.0.0.6").with_origin(Origin::Provider)),
            ),
    );

    // br0 donates its name; eth0 shares the hardware address and keeps
    // everything it has.
    let outcome = run(&store, vec![IncomingDevice::new("", "aa:bb", "p-br")]);

    assert_eq!(outcome, MergeOutcome::Batch(Vec::new()));
}

#[test]
fn test_mixed_naming_policy() {
    let machine = MachineRecord::new("0")
        .with_device(
            DeviceRecord::new("eth0", "aa:bb", DeviceType::Ethernet)
                .with_provider_id(pid("p-0").unwrap()),
        )
        .with_device(
            DeviceRecord::new("eth1", "cc:dd", DeviceType::Ethernet)
                .with_provider_id(pid("p-1").unwrap()),
        );
    let incoming = vec![
        IncomingDevice::new("", "aa:bb", "p-0"),
        IncomingDevice::new("eth1", "cc:dd", "p-1"),
    ];

    let store = store_with(machine);
    let first_device = run(&store, incoming.clone());

    let mut skipped = None;
    let logs = capture_logs(|| {
        skipped = Some(run_with(
            &store,
            incoming,
            &MergeOptions {
                mixed_naming: MixedNamingPolicy::Skip,
            },
        ));
    });

    assert_eq!(first_device, MergeOutcome::Batch(Vec::new()));
    assert_eq!(
        skipped.unwrap(),
        MergeOutcome::Batch(vec![alive(), set_device_pid("eth0", "")])
    );
    assert!(logs.contains("mix of named and nameless interfaces"), "{logs}");
}

// ── Diagnostics ─────────────────────────────────────────────────────

#[test]
fn test_unrecognised_incoming_device_is_logged() {
    let store = store_with(
        MachineRecord::new("0").with_device(DeviceRecord::new("eth0", "aa:bb", DeviceType::Ethernet)),
    );

    let logs = capture_logs(|| {
        run(
            &store,
            vec![
                IncomingDevice::new("eth0", "aa:bb", ""),
                IncomingDevice::new("eth9", "ff:ff", "p-9")
                    .with_address(IncomingAddress::new("172.16.0.9/16")),
            ],
        );
    });

    assert!(logs.contains("ignoring unrecognised device"), "{logs}");
    assert!(logs.contains("eth9"), "{logs}");
    assert!(logs.contains("172.16.0.9/16"), "{logs}");
}

#[test]
fn test_invalid_incoming_provider_id_carries_device_context() {
    let store = store_with(
        MachineRecord::new("0").with_device(DeviceRecord::new("eth0", "aa:bb", DeviceType::Ethernet)),
    );
    let snapshot = store.machine(&mid()).unwrap();
    let incoming = IncomingSnapshot::new(vec![IncomingDevice::new("eth0", "aa:bb", "eni 0")]);

    let err = merge_link_layer(&snapshot, &incoming, &MergeOptions::default()).unwrap_err();

    assert!(matches!(err, CoreError::Device { .. }), "{err:?}");
    assert!(matches!(err.root_cause(), CoreError::InvalidProviderId { .. }));
    assert!(err.to_string().contains("eth0"));
}

#[test]
fn test_provider_id_held_by_other_machine_fails() {
    let store = ModelStore::new();
    store
        .insert_machine(
            MachineRecord::new("0").with_device(DeviceRecord::new("eth0", "aa:bb", DeviceType::Ethernet)),
        )
        .unwrap();
    store
        .insert_machine(
            MachineRecord::new("1").with_device(
                DeviceRecord::new("eth0", "cc:dd", DeviceType::Ethernet)
                    .with_provider_id(pid("eni-0").unwrap()),
            ),
        )
        .unwrap();
    let snapshot = store.machine(&mid()).unwrap();
    let incoming = IncomingSnapshot::new(vec![IncomingDevice::new("eth0", "aa:bb", "eni-0")]);

    let err = merge_link_layer(&snapshot, &incoming, &MergeOptions::default()).unwrap_err();

    assert!(matches!(err.root_cause(), CoreError::DuplicateProviderId { .. }));
}
