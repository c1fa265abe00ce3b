//! 沙箱化阶段库
//!
//! 阶段名即文件名，内容为自由文本指令，运行期间只读。
//! 所有阶段名先经 resolve 校验必须落在库根目录之下（禁止 ../ 逃逸），
//! 解析失败或文件不存在都视为路由安全错误，调用方须立即中止运行。

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::core::EngineError;

/// 阶段库：绑定根目录，按名取指令
#[derive(Debug, Clone)]
pub struct StageStore {
    root: PathBuf,
}

impl StageStore {
    /// 绑定根目录；目录不存在时自动创建
    pub fn new(root: impl AsRef<Path>) -> io::Result<Self> {
        fs::create_dir_all(root.as_ref())?;
        let root = root.as_ref().canonicalize()?;
        Ok(Self { root })
    }

    /// 将阶段名解析为根目录下的真实路径
    ///
    /// 模型声明的阶段名是不可信输入：canonicalize 后必须仍以根目录为前缀，
    /// 否则（含目标不存在）返回 SecurityViolation。
    pub fn resolve(&self, name: &str) -> Result<PathBuf, EngineError> {
        let full = self.root.join(name);
        let canonical = full
            .canonicalize()
            .map_err(|_| EngineError::SecurityViolation(name.to_string()))?;
        if canonical.starts_with(&self.root) && canonical.is_file() {
            Ok(canonical)
        } else {
            Err(EngineError::SecurityViolation(name.to_string()))
        }
    }

    /// 读取阶段指令文本
    pub fn load(&self, name: &str) -> Result<String, EngineError> {
        let path = self.resolve(name)?;
        Ok(fs::read_to_string(path)?.trim().to_string())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with_stage() -> (tempfile::TempDir, StageStore) {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("01_init.txt"), "起草一份提纲。").unwrap();
        let store = StageStore::new(tmp.path()).unwrap();
        (tmp, store)
    }

    #[test]
    fn test_load_known_stage() {
        let (_tmp, store) = store_with_stage();
        assert_eq!(store.load("01_init.txt").unwrap(), "起草一份提纲。");
    }

    #[test]
    fn test_escape_is_rejected() {
        let (_tmp, store) = store_with_stage();
        let err = store.resolve("../../etc/passwd").unwrap_err();
        assert!(matches!(err, EngineError::SecurityViolation(_)));
    }

    #[test]
    fn test_missing_stage_is_rejected() {
        let (_tmp, store) = store_with_stage();
        let err = store.resolve("99_ghost.txt").unwrap_err();
        assert!(matches!(err, EngineError::SecurityViolation(_)));
    }
}
