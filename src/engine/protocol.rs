//! 结构化响应契约
//!
//! 模型输出必须整体可解析为 JSON 对象；单个字段全部可缺省，由调用方回退处理。
//! extract_json 容忍 Markdown 围栏（```json ... ``` 或裸花括号前后夹杂文字）。

use serde::de::DeserializeOwned;
use serde::Deserialize;

/// 终态哨兵：next_stage 等于它（或缺失）即结束运行
pub const TERMINAL_STAGE: &str = "END";

/// 每步调用的结构化响应
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StepResponse {
    /// 思考过程，仅供审计，不写入状态
    pub thought_process: Option<String>,
    /// 更新后的工作产物全文
    pub artifact: Option<String>,
    /// 传给下一阶段的短期记忆
    pub l1_memory: Option<String>,
    /// 下一个阶段文件名，完成时为 "END"
    pub next_stage: Option<String>,
}

/// 蒸馏调用的结构化响应
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DistillResponse {
    /// 删除旧规则的理由
    pub deleted_rules: Option<String>,
    /// 新增规则的理由
    pub added_rules: Option<String>,
    /// 完整替换的长期经验文本
    pub new_l2_markdown: Option<String>,
}

/// 从模型输出中切出 JSON 片段
///
/// 优先取 ```json 围栏内的内容，其次任意 ``` 围栏，最后取首个 '{' 到末个 '}'。
pub fn extract_json(raw: &str) -> &str {
    let trimmed = raw.trim();

    if let Some(start) = trimmed.find("```json") {
        let rest = &trimmed[start + 7..];
        return match rest.find("```") {
            Some(end) => rest[..end].trim(),
            None => rest.trim(),
        };
    }
    if let Some(start) = trimmed.find("```") {
        let rest = &trimmed[start + 3..];
        if let Some(end) = rest.find("```") {
            return rest[..end].trim();
        }
    }
    match (trimmed.find('{'), trimmed.rfind('}')) {
        (Some(start), Some(end)) if end >= start => &trimmed[start..=end],
        _ => trimmed,
    }
}

/// 解析为契约类型；失败时返回解析错误文本，供自我修复反馈使用
pub fn parse_structured<T: DeserializeOwned>(raw: &str) -> Result<T, String> {
    let json_str = extract_json(raw);
    serde_json::from_str(json_str).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_json_fenced() {
        let raw = "说明文字\n```json\n{\"artifact\": \"a\"}\n```\n收尾";
        assert_eq!(extract_json(raw), "{\"artifact\": \"a\"}");
    }

    #[test]
    fn test_extract_json_generic_fence() {
        let raw = "```\n{\"l1_memory\": \"b\"}\n```";
        assert_eq!(extract_json(raw), "{\"l1_memory\": \"b\"}");
    }

    #[test]
    fn test_extract_json_bare_braces_with_prose() {
        let raw = "好的，结果如下：{\"next_stage\": \"END\"} 以上。";
        assert_eq!(extract_json(raw), "{\"next_stage\": \"END\"}");
    }

    #[test]
    fn test_parse_step_missing_fields_are_none() {
        let step: StepResponse = parse_structured("{\"artifact\": \"只有成果\"}").unwrap();
        assert_eq!(step.artifact.as_deref(), Some("只有成果"));
        assert!(step.l1_memory.is_none());
        assert!(step.next_stage.is_none());
    }

    #[test]
    fn test_parse_rejects_non_object() {
        assert!(parse_structured::<StepResponse>("42").is_err());
        assert!(parse_structured::<StepResponse>("这不是 JSON").is_err());
    }

    #[test]
    fn test_parse_distill_contract() {
        let raw = r#"```json
{"deleted_rules": "过时", "added_rules": "新增", "new_l2_markdown": "- 规则一"}
```"#;
        let d: DistillResponse = parse_structured(raw).unwrap();
        assert_eq!(d.new_l2_markdown.as_deref(), Some("- 规则一"));
    }
}
