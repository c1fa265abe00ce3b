//! Weaver - Rust 阶段图智能体引擎
//!
//! 模块划分：
//! - **audit**: 每次运行的原始响应审计日志
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 错误类型与运行状态
//! - **engine**: 结构化调用客户端、响应契约与阶段图执行器
//! - **llm**: LLM 客户端抽象与实现（OpenAI 兼容 / Mock）
//! - **memory**: 版本化长期经验与蒸馏
//! - **stage**: 沙箱化阶段指令库

pub mod audit;
pub mod config;
pub mod core;
pub mod engine;
pub mod llm;
pub mod memory;
pub mod stage;

pub use engine::{Engine, EngineConfig, EngineDirs, RetryPolicy, RunOutcome, RunReport};
