//! 核心类型：错误与运行状态

pub mod error;
pub mod state;

pub use error::EngineError;
pub use state::{RunState, INITIAL_L1};
