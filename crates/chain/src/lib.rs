//! Node access for argus: RPC endpoint settings with named Infura presets,
//! and a JSON-RPC client speaking HTTP or the local geth IPC socket.

pub mod client;

pub use client::NodeClient;

/// Raw RPC endpoint settings. A named preset overrides all three fields as a
/// unit; the individual flags only apply when no preset is selected.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RpcSettings {
    pub host: String,
    pub port: u16,
    pub tls: bool,
}

impl RpcSettings {
    pub fn new(host: impl Into<String>, port: u16, tls: bool) -> Self {
        Self {
            host: host.into(),
            port,
            tls,
        }
    }

    pub fn url(&self) -> String {
        let scheme = if self.tls { "https" } else { "http" };
        format!("{}://{}:{}", scheme, self.host, self.port)
    }
}

impl Default for RpcSettings {
    /// A node on the local machine, plain HTTP.
    fn default() -> Self {
        Self::new("localhost", 8545, false)
    }
}

/// Well-known public node service regions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Preset {
    Mainnet,
    Rinkeby,
    Kovan,
    Ropsten,
}

impl Preset {
    pub fn settings(self) -> RpcSettings {
        let host = match self {
            Self::Mainnet => "mainnet.infura.io",
            Self::Rinkeby => "rinkeby.infura.io",
            Self::Kovan => "kovan.infura.io",
            Self::Ropsten => "ropsten.infura.io",
        };
        RpcSettings::new(host, 443, true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings_target_local_node() {
        let settings = RpcSettings::default();
        assert_eq!(settings.url(), "http://localhost:8545");
    }

    #[test]
    fn presets_override_host_port_tls_as_a_unit() {
        let settings = Preset::Mainnet.settings();
        assert_eq!(settings.host, "mainnet.infura.io");
        assert_eq!(settings.port, 443);
        assert!(settings.tls);
        assert_eq!(settings.url(), "https://mainnet.infura.io:443");
    }
}
