//! 结构化调用客户端
//!
//! 对一次逻辑调用强制执行结构化输出契约：限流按指数退避原样重发，
//! 解析失败把错误详情拼回原 prompt 让模型自我修复，两者共用同一份尝试预算。
//! 成功后先写审计日志再返回解析结果；失败的尝试不留任何审计记录。

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;

use crate::audit::AuditLog;
use crate::core::EngineError;
use crate::engine::protocol::parse_structured;
use crate::llm::{LlmClient, LlmError};

/// 重试策略：纯数值，不含任何 I/O，退避计划可单独测试
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// 每次逻辑调用的尝试上限
    pub max_attempts: usize,
    /// 首次退避时长
    pub base_delay: Duration,
    /// 每次退避的倍增系数
    pub multiplier: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(20),
            multiplier: 2,
        }
    }
}

impl RetryPolicy {
    /// 第 attempt 次（从 0 起）限流后的等待时长：base * multiplier^attempt
    pub fn backoff_delay(&self, attempt: usize) -> Duration {
        self.base_delay * self.multiplier.saturating_pow(attempt as u32)
    }
}

impl From<&crate::config::RetrySection> for RetryPolicy {
    fn from(section: &crate::config::RetrySection) -> Self {
        Self {
            max_attempts: section.max_attempts,
            base_delay: Duration::from_secs(section.base_delay_secs),
            multiplier: section.multiplier,
        }
    }
}

/// 结构化调用客户端：持有 LLM 句柄与重试策略
pub struct StructuredCall {
    llm: Arc<dyn LlmClient>,
    policy: RetryPolicy,
}

impl StructuredCall {
    pub fn new(llm: Arc<dyn LlmClient>, policy: RetryPolicy) -> Self {
        Self { llm, policy }
    }

    /// 累计 token 使用统计，转发自底层客户端
    pub fn token_usage(&self) -> (u64, u64, u64) {
        self.llm.token_usage()
    }

    /// 执行一次逻辑调用，返回解析好的契约类型
    ///
    /// 成功时恰好写入一条审计记录（原始未解析文本，键为 step_label）。
    /// 预算耗尽返回 CallExhausted；限流以外的后端错误立即上抛。
    pub async fn invoke<T: DeserializeOwned>(
        &self,
        prompt: &str,
        step_label: &str,
        audit: &AuditLog,
    ) -> Result<T, EngineError> {
        let mut current_prompt = prompt.to_string();

        for attempt in 0..self.policy.max_attempts {
            match self.llm.complete(&current_prompt).await {
                Ok(raw) => match parse_structured::<T>(&raw) {
                    Ok(record) => {
                        audit.record(step_label, &raw)?;
                        return Ok(record);
                    }
                    Err(parse_err) => {
                        tracing::warn!(
                            step = step_label,
                            attempt = attempt + 1,
                            error = %parse_err,
                            "structured output invalid, feeding error back"
                        );
                        // 修复提示始终拼在原始 prompt 上，不叠加历次错误
                        current_prompt = format!(
                            "{prompt}\n\n【系统错误】上一次的输出不是合法的 JSON。\
                            请修正以下错误，只输出严格的 JSON。\n错误详情: {parse_err}"
                        );
                    }
                },
                Err(LlmError::RateLimited) => {
                    let delay = self.policy.backoff_delay(attempt);
                    tracing::warn!(
                        step = step_label,
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        "provider rate limited, backing off"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) => return Err(EngineError::Llm(err)),
            }
        }

        Err(EngineError::CallExhausted {
            step: step_label.to_string(),
            attempts: self.policy.max_attempts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_schedule_is_exponential() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff_delay(0), Duration::from_secs(20));
        assert_eq!(policy.backoff_delay(1), Duration::from_secs(40));
        assert_eq!(policy.backoff_delay(2), Duration::from_secs(80));
    }

    #[test]
    fn test_default_budget_is_three_attempts() {
        assert_eq!(RetryPolicy::default().max_attempts, 3);
    }
}
