use clap::Args;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

/// RPC server arguments.
#[derive(Args, Debug, Clone)]
pub struct RpcArgs {
    /// IP address for the RPC server to listen on.
    #[arg(long = "rpc.addr", env = "RPC_ADDR", default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
    pub rpc_address: IpAddr,

    /// Port for the RPC server to listen on.
    #[arg(long = "rpc.port", env = "API_PORT", default_value_t = 8080)]
    pub rpc_port: u16,
}

impl RpcArgs {
    /// Returns the socket the RPC server binds to.
    pub const fn socket(&self) -> SocketAddr {
        SocketAddr::new(self.rpc_address, self.rpc_port)
    }
}
