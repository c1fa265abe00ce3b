//! Mock LLM 客户端（用于测试与无 API Key 的离线运行）
//!
//! MockLlmClient 固定返回一条指向终态的合法 JSON，便于本地空跑整条流水线；
//! ScriptedLlmClient 按脚本逐条吐出预设响应，并记录收到的每个 prompt，供测试断言。

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::llm::{LlmClient, LlmError};

/// Mock 客户端：回显 prompt 开头并立即路由到终态
#[derive(Debug, Default)]
pub struct MockLlmClient;

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        let head: String = prompt.chars().take(60).collect();
        Ok(format!(
            r#"{{"thought_process": "mock run", "artifact": "Echo from Mock: {}", "l1_memory": "mock step done", "next_stage": "END"}}"#,
            head.replace('"', "'").replace('\n', " ")
        ))
    }
}

/// 脚本化客户端：按序弹出预设响应，脚本耗尽后返回 Api 错误
pub struct ScriptedLlmClient {
    responses: Mutex<VecDeque<Result<String, LlmError>>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedLlmClient {
    pub fn new(responses: Vec<Result<String, LlmError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().collect()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// 已收到的全部 prompt（按调用顺序）
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    /// 实际发生的调用次数
    pub fn call_count(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[async_trait]
impl LlmClient for ScriptedLlmClient {
    async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(LlmError::Api("script exhausted".to_string())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_output_is_valid_step_json() {
        let client = MockLlmClient;
        let out = client.complete("写一首关于秋天的诗").await.unwrap();
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["next_stage"], "END");
    }

    #[tokio::test]
    async fn test_scripted_client_pops_in_order_then_errors() {
        let client = ScriptedLlmClient::new(vec![
            Ok("one".to_string()),
            Err(LlmError::RateLimited),
        ]);
        assert_eq!(client.complete("a").await.unwrap(), "one");
        assert_eq!(client.complete("b").await.unwrap_err(), LlmError::RateLimited);
        assert!(matches!(
            client.complete("c").await.unwrap_err(),
            LlmError::Api(_)
        ));
        assert_eq!(client.call_count(), 3);
        assert_eq!(client.prompts(), vec!["a", "b", "c"]);
    }
}
