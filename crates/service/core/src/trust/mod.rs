//! Archive trust state, the monitor that maintains it and the gate that enforces it.

mod state;
pub use state::{CheckFailures, TrustEvaluation, TrustHandle, TrustReason, TrustWriter, trust_state};

mod gate;
pub use gate::{TrustError, TrustGate};

mod node;
pub use node::{GraphQlNodeClient, NodeHeightError, NodeHeightSource};

mod monitor;
pub use monitor::{MonitorConfig, TrustStateMonitor};

mod metrics;
pub(crate) use metrics::Metrics;
