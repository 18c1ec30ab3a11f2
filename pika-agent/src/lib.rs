pub mod collector;
pub mod config;
pub mod error;
pub mod outbound;
pub mod reporter;

pub use collector::{
    Collector, CpuCollector, DiskCollector, HostCollector, MemoryCollector, NetworkCollector,
    default_collectors,
};
pub use config::AgentConfig;
pub use error::{AgentError, AgentResult};
pub use outbound::{BufferFlusher, FlushOutcome, OutboundBuffer, OutboundSink, OutboundWriter};
pub use reporter::Reporter;
