//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `WEAVER__*` 覆盖（双下划线表示嵌套，
//! 如 `WEAVER__LLM__PROVIDER=mock`）。

use std::path::PathBuf;

use serde::Deserialize;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    #[serde(default)]
    pub app: AppSection,
    #[serde(default)]
    pub engine: EngineSection,
    #[serde(default)]
    pub llm: LlmSection,
    #[serde(default)]
    pub retry: RetrySection,
}

/// [app] 段：应用名与数据根目录
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppSection {
    pub name: Option<String>,
    /// order / stages / workspace / runs 的父目录，未设置时用当前目录
    pub data_root: Option<PathBuf>,
}

/// [engine] 段：入口阶段与步数预算
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineSection {
    #[serde(default = "default_entry_stage")]
    pub entry_stage: String,
    #[serde(default = "default_max_steps")]
    pub max_steps: usize,
}

impl Default for EngineSection {
    fn default() -> Self {
        Self {
            entry_stage: default_entry_stage(),
            max_steps: default_max_steps(),
        }
    }
}

fn default_entry_stage() -> String {
    "01_init.txt".to_string()
}

fn default_max_steps() -> usize {
    15
}

/// [llm] 段：后端选择
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmSection {
    /// 后端：openai / mock；无 OPENAI_API_KEY 时自动退回 mock
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// OpenAI 兼容端点，未设置时用官方默认
    pub base_url: Option<String>,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            base_url: None,
        }
    }
}

fn default_provider() -> String {
    "openai".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

/// [retry] 段：调用预算与限流退避
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetrySection {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: usize,
    #[serde(default = "default_base_delay_secs")]
    pub base_delay_secs: u64,
    #[serde(default = "default_multiplier")]
    pub multiplier: u32,
}

impl Default for RetrySection {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_secs: default_base_delay_secs(),
            multiplier: default_multiplier(),
        }
    }
}

fn default_max_attempts() -> usize {
    3
}

fn default_base_delay_secs() -> u64 {
    20
}

fn default_multiplier() -> u32 {
    2
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            app: AppSection::default(),
            engine: EngineSection::default(),
            llm: LlmSection::default(),
            retry: RetrySection::default(),
        }
    }
}

/// 从 config 目录加载配置，环境变量 WEAVER__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 WEAVER__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("WEAVER")
            .separator("__")
            .try_parsing(true),
    );

    let c = builder.build()?;
    c.try_deserialize()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_engine_contract() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.engine.entry_stage, "01_init.txt");
        assert_eq!(cfg.engine.max_steps, 15);
        assert_eq!(cfg.retry.max_attempts, 3);
        assert_eq!(cfg.retry.base_delay_secs, 20);
        assert_eq!(cfg.retry.multiplier, 2);
    }
}
