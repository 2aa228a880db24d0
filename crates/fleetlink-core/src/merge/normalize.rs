// ── Incoming name normalization ──
//
// Some providers know hardware addresses but not interface names. Names are
// filled in from persisted devices sharing the hardware address so that the
// name + hardware address matching in the device reconciler can work.

use std::collections::{HashMap, HashSet};

use tracing::{debug, warn};

use super::MixedNamingPolicy;
use crate::link_layer::LinkLayerDevice;
use crate::model::{IncomingDevice, MacAddress};

/// How the provider named the interfaces of one snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamingMode {
    Empty,
    Named,
    Nameless,
    Mixed,
}

pub fn naming_mode(incoming: &[IncomingDevice]) -> NamingMode {
    let named = incoming
        .iter()
        .filter(|d| !d.interface_name.is_empty())
        .count();
    match (named, incoming.len()) {
        (_, 0) => NamingMode::Empty,
        (0, _) => NamingMode::Nameless,
        (n, total) if n == total => NamingMode::Named,
        _ => NamingMode::Mixed,
    }
}

/// Pick one persisted device per hardware address.
///
/// The first device seen is picked. Once the pick carries a provider ID it
/// is kept; until then a later ethernet device displaces it (bridges share
/// their member NIC's hardware address).
fn best_device_by_hw_addr<D: LinkLayerDevice>(existing: &[D]) -> HashMap<&MacAddress, &D> {
    let mut by_hw_addr: HashMap<&MacAddress, &D> = HashMap::new();
    for dev in existing {
        let Some(current) = by_hw_addr.get(dev.mac_address()) else {
            by_hw_addr.insert(dev.mac_address(), dev);
            continue;
        };

        if current.provider_id().is_some() {
            continue;
        }

        if dev.device_type().is_ethernet() {
            by_hw_addr.insert(dev.mac_address(), dev);
        }
    }
    by_hw_addr
}

/// Assign names to nameless incoming devices, in place.
///
/// Returns the hardware addresses whose persisted device donated a name.
/// Providers are expected to name all interfaces or none, so the first
/// incoming device decides whether anything is done at all.
pub(crate) fn normalize_incoming<D: LinkLayerDevice>(
    incoming: &mut [IncomingDevice],
    existing: &[D],
    policy: MixedNamingPolicy,
) -> HashSet<MacAddress> {
    let mut synthesized = HashSet::new();

    let mode = naming_mode(incoming);
    if mode == NamingMode::Mixed {
        let named = incoming
            .iter()
            .filter(|d| !d.interface_name.is_empty())
            .count();
        warn!(
            named,
            nameless = incoming.len() - named,
            ?policy,
            "provider reported a mix of named and nameless interfaces"
        );
        if policy == MixedNamingPolicy::Skip {
            return synthesized;
        }
    }

    if incoming
        .first()
        .is_none_or(|first| !first.interface_name.is_empty())
    {
        return synthesized;
    }

    let by_hw_addr = best_device_by_hw_addr(existing);
    for dev in incoming.iter_mut() {
        if !dev.interface_name.is_empty() {
            continue;
        }
        if let Some(donor) = by_hw_addr.get(&dev.mac_address) {
            debug!(
                mac = %dev.mac_address,
                name = donor.name(),
                "assigning name to nameless incoming device"
            );
            synthesized.insert(dev.mac_address.clone());
            donor.name().clone_into(&mut dev.interface_name);
        }
    }

    synthesized
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CoreError;
    use crate::model::{DeviceType, ProviderId};
    use crate::operation::Operation;

    struct Dev {
        name: &'static str,
        mac: MacAddress,
        kind: DeviceType,
        provider_id: Option<ProviderId>,
    }

    fn dev(name: &'static str, mac: &str, kind: DeviceType, pid: &str) -> Dev {
        Dev {
            name,
            mac: MacAddress::new(mac),
            kind,
            provider_id: ProviderId::parse(pid).ok().flatten(),
        }
    }

    impl LinkLayerDevice for Dev {
        fn name(&self) -> &str {
            self.name
        }
        fn mac_address(&self) -> &MacAddress {
            &self.mac
        }
        fn device_type(&self) -> DeviceType {
            self.kind
        }
        fn provider_id(&self) -> Option<&ProviderId> {
            self.provider_id.as_ref()
        }
        fn set_provider_id_ops(&self, _: &str) -> Result<Vec<Operation>, CoreError> {
            Ok(Vec::new())
        }
    }

    fn nameless(mac: &str) -> IncomingDevice {
        IncomingDevice::new("", mac, "")
    }

    #[test]
    fn naming_mode_classifies_snapshots() {
        assert_eq!(naming_mode(&[]), NamingMode::Empty);
        assert_eq!(naming_mode(&[nameless("aa")]), NamingMode::Nameless);
        assert_eq!(
            naming_mode(&[IncomingDevice::new("eth0", "aa", "")]),
            NamingMode::Named
        );
        assert_eq!(
            naming_mode(&[nameless("aa"), IncomingDevice::new("eth0", "bb", "")]),
            NamingMode::Mixed
        );
    }

    #[test]
    fn named_snapshot_is_left_alone() {
        let existing = [dev("eth0", "aa:bb", DeviceType::Ethernet, "")];
        let mut incoming = vec![IncomingDevice::new("ens3", "aa:bb", "p-1")];

        let synthesized =
            normalize_incoming(&mut incoming, &existing, MixedNamingPolicy::FirstDevice);

        assert!(synthesized.is_empty());
        assert_eq!(incoming[0].interface_name, "ens3");
    }

    #[test]
    fn later_ethernet_displaces_pick_without_provider_id() {
        let existing = [
            dev("eth0", "aa:bb", DeviceType::Ethernet, ""),
            dev("eth1", "aa:bb", DeviceType::Ethernet, ""),
        ];
        let mut incoming = vec![nameless("aa:bb")];
        normalize_incoming(&mut incoming, &existing, MixedNamingPolicy::FirstDevice);
        // A later ethernet device displaces an earlier one without provider ID.
        assert_eq!(incoming[0].interface_name, "eth1");

        let existing = [
            dev("br0", "aa:bb", DeviceType::Bridge, ""),
            dev("br1", "aa:bb", DeviceType::Bridge, ""),
        ];
        let mut incoming = vec![nameless("aa:bb")];
        normalize_incoming(&mut incoming, &existing, MixedNamingPolicy::FirstDevice);
        assert_eq!(incoming[0].interface_name, "br0");
    }

    #[test]
    fn ethernet_preferred_over_bridge() {
        let existing = [
            dev("br0", "aa:bb", DeviceType::Bridge, ""),
            dev("eth0", "aa:bb", DeviceType::Ethernet, ""),
        ];
        let mut incoming = vec![nameless("aa:bb")];

        let synthesized =
            normalize_incoming(&mut incoming, &existing, MixedNamingPolicy::FirstDevice);

        assert_eq!(incoming[0].interface_name, "eth0");
        assert!(synthesized.contains(&MacAddress::new("aa:bb")));
    }

    #[test]
    fn device_with_provider_id_is_sticky() {
        let existing = [
            dev("br0", "aa:bb", DeviceType::Bridge, "p-br"),
            dev("eth0", "aa:bb", DeviceType::Ethernet, ""),
        ];
        let mut incoming = vec![nameless("aa:bb")];

        normalize_incoming(&mut incoming, &existing, MixedNamingPolicy::FirstDevice);

        assert_eq!(incoming[0].interface_name, "br0");
    }

    #[test]
    fn unknown_hw_addr_stays_nameless() {
        let existing = [dev("eth0", "aa:bb", DeviceType::Ethernet, "")];
        let mut incoming = vec![nameless("cc:dd")];

        let synthesized =
            normalize_incoming(&mut incoming, &existing, MixedNamingPolicy::FirstDevice);

        assert!(incoming[0].interface_name.is_empty());
        assert!(synthesized.is_empty());
    }

    #[test]
    fn mixed_snapshot_follows_policy() {
        let existing = [
            dev("eth0", "aa:bb", DeviceType::Ethernet, ""),
            dev("eth1", "cc:dd", DeviceType::Ethernet, ""),
        ];
        let snapshot = vec![nameless("aa:bb"), IncomingDevice::new("eth1", "cc:dd", "")];

        let mut incoming = snapshot.clone();
        normalize_incoming(&mut incoming, &existing, MixedNamingPolicy::FirstDevice);
        assert_eq!(incoming[0].interface_name, "eth0");

        let mut incoming = snapshot;
        let synthesized = normalize_incoming(&mut incoming, &existing, MixedNamingPolicy::Skip);
        assert!(incoming[0].interface_name.is_empty());
        assert!(synthesized.is_empty());
    }

    #[test]
    fn mixed_snapshot_with_named_first_device_is_not_repaired() {
        let existing = [dev("eth0", "aa:bb", DeviceType::Ethernet, "")];
        let mut incoming = vec![IncomingDevice::new("eth9", "cc:dd", ""), nameless("aa:bb")];

        normalize_incoming(&mut incoming, &existing, MixedNamingPolicy::FirstDevice);

        assert!(incoming[1].interface_name.is_empty());
    }
}
