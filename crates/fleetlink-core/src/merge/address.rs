// ── Address reconciliation ──

use super::Pass;
use crate::error::CoreError;
use crate::link_layer::{LinkLayerAddress, LinkLayerDevice};
use crate::model::{IncomingAddress, Origin};
use crate::operation::Operation;

impl<A: LinkLayerAddress> Pass<'_, A> {
    /// Link a persisted address to the incoming address it corresponds to,
    /// or relinquish it to the machine agent if there is none.
    ///
    /// Persisted values carry no prefix length, so an incoming address
    /// matches when it starts with the persisted value.
    pub(super) fn process_existing_address<D: LinkLayerDevice>(
        &mut self,
        dev: &D,
        addr: &A,
        incoming_addrs: &[&IncomingAddress],
    ) -> Result<Vec<Operation>, CoreError> {
        let value = addr.value();
        let name = dev.name();
        let mac = dev.mac_address();

        for incoming in incoming_addrs {
            if !incoming.cidr_address.starts_with(value) {
                continue;
            }
            if self.state.is_address_processed(name, mac, value) {
                continue;
            }

            let mut ops = addr
                .set_provider_id_ops(&incoming.provider_id)
                .map_err(|source| CoreError::Address {
                    device: name.to_owned(),
                    value: value.to_owned(),
                    operation: "set provider ID",
                    source: Box::new(source),
                })?;

            self.state.mark_address_processed(name, mac, value);

            ops.extend(addr.set_provider_net_ids_ops(
                &incoming.provider_network_id,
                &incoming.provider_subnet_id,
            ));
            return Ok(ops);
        }

        Ok(addr.set_origin_ops(Origin::Machine))
    }
}
