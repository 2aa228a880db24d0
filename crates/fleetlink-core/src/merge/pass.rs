// ── Pass-scoped bookkeeping ──
//
// Built fresh for every reconciliation pass and dropped with it. Nothing in
// here survives to the next attempt.

use std::collections::HashSet;

use crate::model::{IncomingDevice, MacAddress};

type DeviceKey = (String, MacAddress);
type AddressKey = (String, MacAddress, String);

#[derive(Debug, Default)]
pub(crate) struct PassState {
    /// Hardware addresses that donated a name to a nameless incoming device.
    name_synthesized: HashSet<MacAddress>,
    processed_devices: HashSet<DeviceKey>,
    processed_addresses: HashSet<AddressKey>,
}

impl PassState {
    pub(crate) fn new(name_synthesized: HashSet<MacAddress>) -> Self {
        Self {
            name_synthesized,
            ..Self::default()
        }
    }

    pub(crate) fn is_name_synthesized(&self, mac: &MacAddress) -> bool {
        self.name_synthesized.contains(mac)
    }

    pub(crate) fn mark_device_processed(&mut self, name: &str, mac: &MacAddress) {
        self.processed_devices.insert((name.to_owned(), mac.clone()));
    }

    pub(crate) fn is_incoming_processed(&self, dev: &IncomingDevice) -> bool {
        self.processed_devices
            .contains(&(dev.interface_name.clone(), dev.mac_address.clone()))
    }

    pub(crate) fn mark_address_processed(&mut self, name: &str, mac: &MacAddress, value: &str) {
        self.processed_addresses
            .insert((name.to_owned(), mac.clone(), value.to_owned()));
    }

    pub(crate) fn is_address_processed(&self, name: &str, mac: &MacAddress, value: &str) -> bool {
        self.processed_addresses
            .contains(&(name.to_owned(), mac.clone(), value.to_owned()))
    }
}
