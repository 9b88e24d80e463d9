//! QML Puppet Core Library
//!
//! This crate provides the node-instance channel between a visual designer
//! and its out-of-process QML worker, including the command codec, the
//! instance-signal spy, the designer-side proxy and worker supervision.

pub mod capture;
pub mod config;
pub mod error;
pub mod instance;
pub mod protocol;
pub mod proxy;
pub mod server;
pub mod spy;
pub mod supervisor;
pub mod transport;

// Re-export commonly used types
pub use capture::{CaptureSet, CaptureWriter, ControlStream, Divergence};
pub use config::{PuppetConfig, load_config};
pub use error::{PuppetError, PuppetResult};
pub use instance::{InstanceTable, NodeInstance};
pub use protocol::{Command, CommandKind, FrameCodec, PROTOCOL_VERSION, RawFrame};
pub use proxy::{ConnectionExit, ConnectionState, HandlerRegistry, NodeInstanceProxy, ProxyEvent};
pub use server::{NodeInstanceServer, PuppetMode, ServerExit, run_server};
pub use spy::{MemoryScene, ObjectModel, SceneBackend, SignalSpy};
pub use supervisor::{ShutdownOutcome, WorkerState, WorkerSupervisor};
