//! 运行审计日志
//!
//! 每次运行一个独立目录（runs/<run_id>/），每次成功的模型调用一条记录，
//! 文件名取步骤标签，内容为未解析的原始响应。只追加，从不改写。

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// 一次运行的审计命名空间
#[derive(Debug, Clone)]
pub struct AuditLog {
    run_dir: PathBuf,
}

impl AuditLog {
    /// 在 runs_root 下创建本次运行的目录
    pub fn create(runs_root: &Path, run_id: &str) -> io::Result<Self> {
        let run_dir = runs_root.join(run_id);
        fs::create_dir_all(&run_dir)?;
        Ok(Self { run_dir })
    }

    /// 写入一条原始响应记录：<step_label>_raw.txt
    pub fn record(&self, step_label: &str, raw: &str) -> io::Result<()> {
        // 步骤标签可能带目录分隔符（阶段名含子目录时），落盘前压平
        let safe_label: String = step_label
            .chars()
            .map(|c| if c == '/' || c == '\\' { '_' } else { c })
            .collect();
        fs::write(self.run_dir.join(format!("{}_raw.txt", safe_label)), raw)
    }

    pub fn run_dir(&self) -> &Path {
        &self.run_dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_writes_raw_text() {
        let tmp = tempfile::tempdir().unwrap();
        let audit = AuditLog::create(tmp.path(), "20260806-120000").unwrap();
        audit.record("step1_01_init.txt", "原始响应").unwrap();

        let written = fs::read_to_string(
            tmp.path().join("20260806-120000").join("step1_01_init.txt_raw.txt"),
        )
        .unwrap();
        assert_eq!(written, "原始响应");
    }

    #[test]
    fn test_record_flattens_path_separators() {
        let tmp = tempfile::tempdir().unwrap();
        let audit = AuditLog::create(tmp.path(), "run").unwrap();
        audit.record("step2_sub/stage.txt", "x").unwrap();
        assert!(tmp.path().join("run").join("step2_sub_stage.txt_raw.txt").exists());
    }
}
