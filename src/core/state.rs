//! 运行状态
//!
//! 一次运行内穿行的全部可变状态。purpose 全程不变；l2 在启动时加载一次；
//! l1 与 artifact 每步由结构化响应改写，缺失字段回退到上一步的值。

use crate::engine::protocol::{StepResponse, TERMINAL_STAGE};

/// 运行开始时的短期记忆占位
pub const INITIAL_L1: &str = "INITIAL_STATE";

/// 运行状态：仅由执行器在每步结束时更新，运行结束即丢弃
#[derive(Debug, Clone)]
pub struct RunState {
    /// 本次运行的最高指令，全程不变
    pub purpose: String,
    /// 长期经验内容（启动时取最新版本）
    pub l2_memory: String,
    /// 长期经验版本号
    pub l2_version: u32,
    /// 短期记忆，每步改写，只在本次运行内存活
    pub l1_memory: String,
    /// 演化中的工作产物，每步改写
    pub artifact: String,
    /// 已执行步数，单调递增
    pub step_count: usize,
}

impl RunState {
    pub fn new(purpose: impl Into<String>, l2_memory: impl Into<String>, l2_version: u32) -> Self {
        Self {
            purpose: purpose.into(),
            l2_memory: l2_memory.into(),
            l2_version,
            l1_memory: INITIAL_L1.to_string(),
            artifact: String::new(),
            step_count: 0,
        }
    }

    /// 应用一步的结构化结果并返回下一个阶段名
    ///
    /// artifact 与 l1_memory 缺失时保留旧值；next_stage 缺失时视为终态。
    /// thought_process 仅用于审计，不进入状态。
    pub fn apply(&mut self, step: &StepResponse) -> String {
        if let Some(artifact) = &step.artifact {
            self.artifact = artifact.clone();
        }
        if let Some(l1) = &step.l1_memory {
            self.l1_memory = l1.clone();
        }
        step.next_stage
            .clone()
            .unwrap_or_else(|| TERMINAL_STAGE.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> RunState {
        RunState::new("目标", "经验", 2)
    }

    #[test]
    fn test_new_state_defaults() {
        let s = state();
        assert_eq!(s.l1_memory, INITIAL_L1);
        assert_eq!(s.artifact, "");
        assert_eq!(s.step_count, 0);
        assert_eq!(s.l2_version, 2);
    }

    #[test]
    fn test_apply_full_response() {
        let mut s = state();
        let next = s.apply(&StepResponse {
            thought_process: Some("想法".to_string()),
            artifact: Some("成果 v1".to_string()),
            l1_memory: Some("注意边界".to_string()),
            next_stage: Some("02_review.txt".to_string()),
        });
        assert_eq!(s.artifact, "成果 v1");
        assert_eq!(s.l1_memory, "注意边界");
        assert_eq!(next, "02_review.txt");
    }

    #[test]
    fn test_apply_missing_fields_keep_previous() {
        let mut s = state();
        s.artifact = "旧成果".to_string();
        s.l1_memory = "旧记忆".to_string();
        let next = s.apply(&StepResponse::default());
        assert_eq!(s.artifact, "旧成果");
        assert_eq!(s.l1_memory, "旧记忆");
        assert_eq!(next, TERMINAL_STAGE);
    }
}
