//! 记忆层：版本化长期经验（L2）与运行末尾的蒸馏

pub mod distiller;
pub mod experience;

pub use distiller::{Distiller, DISTILL_STEP_LABEL};
pub use experience::{
    parse_version, ExperienceStore, DEFAULT_EXPERIENCE, DISTILL_ERROR_SENTINEL, EXPERIENCE_PREFIX,
};
