//! 引擎错误类型
//!
//! 与调用层配合：RateLimited 在 LlmError 内部退避消化，JsonParse 在自我修复循环内消化；
//! 走到这里的变体都是步骤级致命错误，会中止整次运行。

use thiserror::Error;

use crate::llm::LlmError;

/// 一次运行中可能出现的致命错误（调用耗尽、路径逃逸、I/O 等）
#[derive(Error, Debug)]
pub enum EngineError {
    /// 后端返回终止性错误（限流以外的失败，不重试）
    #[error("LLM call failed: {0}")]
    Llm(#[from] LlmError),

    /// 结构化输出解析失败（仅在调用层内部流转）
    #[error("JSON parse error: {0}")]
    JsonParse(String),

    /// 预算内所有尝试都没有产出合法结构化输出
    #[error("no valid structured output after {attempts} attempts at step {step}")]
    CallExhausted { step: String, attempts: usize },

    /// 阶段名解析到阶段库之外，或目标不存在；零次模型调用，立即中止
    #[error("stage escapes store root or does not exist: {0}")]
    SecurityViolation(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
