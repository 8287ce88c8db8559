//! Switch address resolution.
//!
//! A switch is reached either at the address its controller reports for the
//! management interface, or at the IPv6 link-local address derived from its
//! MAC. [`AddressResolver`] tries both in that order.

use std::future::Future;
use std::net::Ipv6Addr;

use indexmap::IndexMap;
use log::debug;

use crate::dialect::Controller;
use crate::error::{DecodeError, Result};
use crate::transport::Spawner;

/// Parse `aa:bb:cc:dd:ee:ff`.
fn parse_mac(mac: &str) -> std::result::Result<[u8; 6], DecodeError> {
    let bad = || DecodeError::BadMac {
        value: mac.to_string(),
    };

    let mut octets = [0u8; 6];
    let mut parts = mac.trim().split(':');
    for octet in &mut octets {
        let part = parts.next().ok_or_else(bad)?;
        if part.is_empty() || part.len() > 2 {
            return Err(bad());
        }
        *octet = u8::from_str_radix(part, 16).map_err(|_| bad())?;
    }
    if parts.next().is_some() {
        return Err(bad());
    }
    Ok(octets)
}

/// Link-local address with a modified EUI-64 interface identifier: the
/// universal/local bit flipped and `ff:fe` inserted in the middle.
pub fn eui64_link_local(mac: &str) -> std::result::Result<Ipv6Addr, DecodeError> {
    let m = parse_mac(mac)?;
    let word = |hi: u8, lo: u8| (u16::from(hi) << 8) | u16::from(lo);
    Ok(Ipv6Addr::new(
        0xfe80,
        0,
        0,
        0,
        word(m[0] ^ 0x02, m[1]),
        word(m[2], 0xff),
        word(0xfe, m[3]),
        word(m[4], m[5]),
    ))
}

/// [`eui64_link_local`] as a connectable string, scoped to `interface` when
/// given.
pub fn link_local_address(
    mac: &str,
    interface: Option<&str>,
) -> std::result::Result<String, DecodeError> {
    let addr = eui64_link_local(mac)?;
    Ok(match interface {
        Some(interface) => format!("{addr}%{interface}"),
        None => addr.to_string(),
    })
}

/// Address of `interface` in a switch running-config, without its prefix
/// length.
///
/// Reads the first `interface <iface> ip-address <addr>/<len>` line.
pub fn switch_address_from_config(config: &str, interface: &str) -> Option<String> {
    let prefix = format!("interface {interface} ip-address");
    let line = config.lines().find(|line| line.starts_with(&prefix))?;
    let token = line.split_whitespace().nth(3)?;
    let addr = token.split_once('/').map_or(token, |(addr, _)| addr);
    Some(addr.to_string())
}

/// MAC addresses of switches known outside the controller.
pub trait Inventory: Send + Sync {
    /// MAC of `switch`, if known.
    fn switch_mac(&self, switch: &str) -> impl Future<Output = Result<Option<String>>> + Send;
}

/// An [`Inventory`] backed by a fixed table.
#[derive(Debug, Clone, Default)]
pub struct StaticInventory(IndexMap<String, String>);

impl StaticInventory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a switch.
    pub fn with_switch(mut self, switch: impl Into<String>, mac: impl Into<String>) -> Self {
        self.0.insert(switch.into(), mac.into());
        self
    }
}

impl FromIterator<(String, String)> for StaticInventory {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Inventory for StaticInventory {
    async fn switch_mac(&self, switch: &str) -> Result<Option<String>> {
        Ok(self.0.get(switch).cloned())
    }
}

/// Resolves a switch name to an address.
///
/// Tries the controller's running-config, then a link-local address built
/// from the inventory MAC.
pub struct AddressResolver<'c, 'l, S: Spawner, I: Inventory> {
    controller: &'c Controller<'l, S>,
    inventory: I,
    scope: Option<String>,
}

impl<'c, 'l, S: Spawner, I: Inventory> AddressResolver<'c, 'l, S, I> {
    pub fn new(controller: &'c Controller<'l, S>, inventory: I) -> Self {
        Self {
            controller,
            inventory,
            scope: None,
        }
    }

    /// Scope derived link-local addresses to a local interface.
    pub fn with_scope(mut self, interface: impl Into<String>) -> Self {
        self.scope = Some(interface.into());
        self
    }

    /// Address of `switch`, or `None` if no source knows it.
    pub async fn resolve(&self, switch: &str) -> Result<Option<String>> {
        if let Some(addr) = self.controller.switch_address(switch).await? {
            debug!("{switch}: address {addr} from controller config");
            return Ok(Some(addr));
        }

        let Some(mac) = self.inventory.switch_mac(switch).await? else {
            debug!("{switch}: no address found");
            return Ok(None);
        };
        let addr = link_local_address(&mac, self.scope.as_deref())?;
        debug!("{switch}: address {addr} from MAC {mac}");
        Ok(Some(addr))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::tests::lab_config;
    use crate::driver::Lab;
    use crate::transport::CommandOutput;
    use crate::transport::scripted::ScriptedSpawner;

    const RUNNING_CONFIG: &str = "\
! switch
switch leaf1
  mac 00:11:22:33:44:55
interface ma1 ip-address 10.0.0.21/24
interface ma1 ip-address 10.0.0.22/24
";

    #[test]
    fn test_eui64_link_local() {
        assert_eq!(
            eui64_link_local("aa:bb:cc:dd:ee:ff").unwrap().to_string(),
            "fe80::a8bb:ccff:fedd:eeff"
        );
        assert_eq!(
            eui64_link_local("00:11:22:33:44:55").unwrap().to_string(),
            "fe80::211:22ff:fe33:4455"
        );
    }

    #[test]
    fn test_link_local_scope() {
        assert_eq!(
            link_local_address("00:11:22:33:44:55", Some("eth1")).unwrap(),
            "fe80::211:22ff:fe33:4455%eth1"
        );
    }

    #[test]
    fn test_bad_mac() {
        for mac in ["", "00:11:22:33:44", "00:11:22:33:44:55:66", "00:11:22:33:44:zz", "000:1:2:3:4:5"] {
            assert!(eui64_link_local(mac).is_err(), "{mac}");
        }
    }

    #[test]
    fn test_switch_address_from_config() {
        assert_eq!(
            switch_address_from_config(RUNNING_CONFIG, "ma1").as_deref(),
            Some("10.0.0.21")
        );
        assert_eq!(switch_address_from_config(RUNNING_CONFIG, "eth0"), None);
        assert_eq!(
            switch_address_from_config("interface ma1 ip-address dhcp\n", "ma1").as_deref(),
            Some("dhcp")
        );
    }

    #[tokio::test]
    async fn test_resolver_prefers_controller() {
        let spawner = ScriptedSpawner::new();
        spawner.push_output(CommandOutput::new(RUNNING_CONFIG, 0));
        let lab = Lab::new(spawner, lab_config());
        let controller = Controller::new(&lab, "ctl");
        let inventory = StaticInventory::new().with_switch("leaf1", "00:11:22:33:44:55");

        let resolver = AddressResolver::new(&controller, inventory);
        assert_eq!(resolver.resolve("leaf1").await.unwrap().as_deref(), Some("10.0.0.21"));
    }

    #[tokio::test]
    async fn test_resolver_falls_back_to_mac() {
        let spawner = ScriptedSpawner::new();
        spawner.push_output(CommandOutput::new("error: unknown switch\n", 1));
        spawner.push_output(CommandOutput::new("", 1));
        let lab = Lab::new(spawner, lab_config());
        let controller = Controller::new(&lab, "ctl");
        let inventory = StaticInventory::new().with_switch("leaf1", "00:11:22:33:44:55");

        let resolver = AddressResolver::new(&controller, inventory).with_scope("eth1");
        assert_eq!(
            resolver.resolve("leaf1").await.unwrap().as_deref(),
            Some("fe80::211:22ff:fe33:4455%eth1")
        );
        assert_eq!(resolver.resolve("spine1").await.unwrap(), None);
    }
}
