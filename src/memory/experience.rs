//! 版本化长期经验存储
//!
//! workspace/ 下以 core_experience_v{N}.md 持久化长期经验（L2），N 严格递增。
//! 只增不改：已写入的版本从不被修改或删除。"最新" 取现存最大版本号；
//! 库为空时返回占位文本与版本 0。

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// 经验文件名前缀
pub const EXPERIENCE_PREFIX: &str = "core_experience_v";

/// 库为空时的占位经验
pub const DEFAULT_EXPERIENCE: &str = "尚无历史经验。";

/// 蒸馏响应缺失替换文本时写入的哨兵，便于下次加载时识别坏版本
pub const DISTILL_ERROR_SENTINEL: &str = "ERROR: 蒸馏未产出替换经验文本";

/// 从文件名提取版本号
///
/// 约定：`core_experience_v{N}.md`，N 为十进制非负整数；不匹配返回 None。
pub fn parse_version(file_name: &str) -> Option<u32> {
    let digits = file_name
        .strip_prefix(EXPERIENCE_PREFIX)?
        .strip_suffix(".md")?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// 经验库：绑定 workspace 目录
#[derive(Debug, Clone)]
pub struct ExperienceStore {
    root: PathBuf,
}

impl ExperienceStore {
    /// 绑定目录；不存在时自动创建
    pub fn new(root: impl AsRef<Path>) -> io::Result<Self> {
        fs::create_dir_all(root.as_ref())?;
        Ok(Self {
            root: root.as_ref().to_path_buf(),
        })
    }

    /// 取最新版本的内容与版本号；库为空返回 (占位文本, 0)
    pub fn latest(&self) -> io::Result<(String, u32)> {
        let mut best: Option<(u32, PathBuf)> = None;
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if let Some(version) = parse_version(name) {
                if best.as_ref().map_or(true, |(v, _)| version > *v) {
                    best = Some((version, entry.path()));
                }
            }
        }
        match best {
            Some((version, path)) => {
                let content = fs::read_to_string(path)?.trim().to_string();
                Ok((content, version))
            }
            None => Ok((DEFAULT_EXPERIENCE.to_string(), 0)),
        }
    }

    /// 写入下一个版本（prev_version + 1），返回新版本号
    pub fn write_next(&self, prev_version: u32, content: &str) -> io::Result<u32> {
        let version = prev_version + 1;
        let path = self
            .root
            .join(format!("{}{}.md", EXPERIENCE_PREFIX, version));
        fs::write(path, content)?;
        Ok(version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_version_contract() {
        assert_eq!(parse_version("core_experience_v7.md"), Some(7));
        assert_eq!(parse_version("core_experience_v0.md"), Some(0));
        assert_eq!(parse_version("core_experience_v.md"), None);
        assert_eq!(parse_version("core_experience_v-1.md"), None);
        assert_eq!(parse_version("other_v3.md"), None);
        assert_eq!(parse_version("core_experience_v3.txt"), None);
    }

    #[test]
    fn test_latest_on_empty_store_is_placeholder() {
        let tmp = tempfile::tempdir().unwrap();
        let store = ExperienceStore::new(tmp.path()).unwrap();
        let (content, version) = store.latest().unwrap();
        assert_eq!(content, DEFAULT_EXPERIENCE);
        assert_eq!(version, 0);
    }

    #[test]
    fn test_latest_picks_max_version_with_gaps() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("core_experience_v1.md"), "第一版").unwrap();
        fs::write(tmp.path().join("core_experience_v3.md"), "第三版").unwrap();
        fs::write(tmp.path().join("notes.md"), "无关文件").unwrap();
        let store = ExperienceStore::new(tmp.path()).unwrap();
        let (content, version) = store.latest().unwrap();
        assert_eq!(content, "第三版");
        assert_eq!(version, 3);
    }

    #[test]
    fn test_write_next_increments_version() {
        let tmp = tempfile::tempdir().unwrap();
        let store = ExperienceStore::new(tmp.path()).unwrap();
        let v = store.write_next(3, "- 规则").unwrap();
        assert_eq!(v, 4);
        let (content, version) = store.latest().unwrap();
        assert_eq!(content, "- 规则");
        assert_eq!(version, 4);
    }
}
