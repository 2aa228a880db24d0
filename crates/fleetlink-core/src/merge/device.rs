// ── Device reconciliation ──

use tracing::{trace, warn};

use super::Pass;
use crate::error::CoreError;
use crate::link_layer::{LinkLayerAddress, LinkLayerDevice};
use crate::model::Origin;
use crate::operation::Operation;

fn in_device<D: LinkLayerDevice>(dev: &D, operation: &'static str, source: CoreError) -> CoreError {
    CoreError::Device {
        name: dev.name().to_owned(),
        mac: dev.mac_address().clone(),
        operation,
        source: Box::new(source),
    }
}

impl<A: LinkLayerAddress> Pass<'_, A> {
    /// Adopt the provider identity of the matching incoming device and link
    /// its addresses, or relinquish the device if nothing matches.
    pub(super) fn process_existing_device<D: LinkLayerDevice>(
        &mut self,
        dev: &D,
    ) -> Result<Vec<Operation>, CoreError> {
        let Some(incoming_dev) = self.matching_incoming(dev.name(), dev.mac_address()) else {
            // The device lent its name to a nameless incoming device that
            // then failed to match; it keeps whatever it has.
            if self.state.is_name_synthesized(dev.mac_address()) {
                trace!(device = dev.name(), "unmatched device donated a name, leaving as-is");
                return Ok(Vec::new());
            }
            return self.relinquish_device(dev);
        };

        let mut ops = Vec::new();
        match dev.provider_id() {
            Some(current) if current.as_str() != incoming_dev.provider_id => {
                warn!(
                    device = dev.name(),
                    mac = %dev.mac_address(),
                    current = %current,
                    incoming = %incoming_dev.provider_id,
                    "not changing provider ID for device"
                );
            }
            _ => {
                ops = dev
                    .set_provider_id_ops(&incoming_dev.provider_id)
                    .map_err(|e| in_device(dev, "set provider ID", e))?;
            }
        }

        // Shadow addresses reported by the provider are not processed.
        let incoming_addrs = self.matching_incoming_addrs(dev.name(), dev.mac_address());
        for addr in self.addresses_of(dev.name()) {
            ops.extend(self.process_existing_address(dev, addr, &incoming_addrs)?);
        }

        self.state.mark_device_processed(dev.name(), dev.mac_address());
        Ok(ops)
    }

    /// The provider no longer reports this device: drop its provider ID and
    /// hand every address on it back to the machine agent.
    fn relinquish_device<D: LinkLayerDevice>(&self, dev: &D) -> Result<Vec<Operation>, CoreError> {
        let mut ops = dev
            .set_provider_id_ops("")
            .map_err(|e| in_device(dev, "clear provider ID", e))?;

        for addr in self.addresses_of(dev.name()) {
            ops.extend(addr.set_origin_ops(Origin::Machine));
        }
        Ok(ops)
    }
}
