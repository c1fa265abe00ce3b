//! 引擎层：结构化调用客户端、响应契约与阶段图执行器

pub mod call;
pub mod executor;
pub mod protocol;

pub use call::{RetryPolicy, StructuredCall};
pub use executor::{Engine, EngineConfig, EngineDirs, RunOutcome, RunReport, DEFAULT_PURPOSE};
pub use protocol::{DistillResponse, StepResponse, TERMINAL_STAGE};
