//! 骨骼层级、部位与侧面

mod bone;
mod manager;
mod part;

pub use bone::Bone;
pub use manager::{BoneLocator, BoneManager, ROOT_BONE_NAME};
pub use part::{EnumPart, Side};
