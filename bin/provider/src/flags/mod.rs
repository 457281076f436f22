//! CLI flags, grouped by the component they configure.

mod archive;
pub use archive::ArchiveArgs;

mod consensus;
pub use consensus::ConsensusArgs;

mod monitor;
pub use monitor::MonitorArgs;

mod rpc;
pub use rpc::RpcArgs;

mod metrics;
pub use metrics::MetricsArgs;
