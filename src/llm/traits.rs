//! LLM 客户端抽象
//!
//! 所有后端（OpenAI 兼容 / Mock）实现 LlmClient：complete 一次阻塞式往返。
//! 错误只区分三类：RateLimited 可退避重试，其余全部立即向上传播。

use async_trait::async_trait;
use thiserror::Error;

/// LLM 调用错误
///
/// RateLimited 表示服务端限流，调用层可以退避后原样重发；
/// EmptyResponse 与 Api 都是终止性错误，不做重试。
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LlmError {
    #[error("rate limited by provider")]
    RateLimited,

    #[error("empty response from provider")]
    EmptyResponse,

    #[error("API error: {0}")]
    Api(String),
}

/// LLM 客户端 trait：一段 prompt 进，一段文本出
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// 非流式完成，阻塞到响应返回
    async fn complete(&self, prompt: &str) -> Result<String, LlmError>;

    /// 获取累计 token 使用统计：(prompt_tokens, completion_tokens, total_tokens)
    /// 默认返回 (0, 0, 0)，具体实现可覆盖
    fn token_usage(&self) -> (u64, u64, u64) {
        (0, 0, 0)
    }
}
