//! LLM 层：客户端抽象与实现（OpenAI 兼容 / Mock）

use std::sync::Arc;

pub mod mock;
pub mod openai;
pub mod traits;

pub use mock::{MockLlmClient, ScriptedLlmClient};
pub use openai::{OpenAiClient, TokenUsage};
pub use traits::{LlmClient, LlmError};

use crate::config::AppConfig;

/// 根据配置创建 LLM 客户端
///
/// provider 为 "mock"、或未设置 OPENAI_API_KEY 时退回 Mock 客户端，保证离线可跑通。
pub fn create_llm_from_config(cfg: &AppConfig) -> Arc<dyn LlmClient> {
    if cfg.llm.provider == "mock" {
        tracing::warn!("Provider set to mock, using Mock LLM");
        return Arc::new(MockLlmClient);
    }
    if std::env::var("OPENAI_API_KEY").is_err() {
        tracing::warn!("OPENAI_API_KEY not set, using Mock LLM");
        return Arc::new(MockLlmClient);
    }
    tracing::info!(model = %cfg.llm.model, "Using OpenAI-compatible LLM");
    Arc::new(OpenAiClient::new(
        cfg.llm.base_url.as_deref(),
        &cfg.llm.model,
        None,
    ))
}
