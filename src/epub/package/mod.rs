//! 包文档解析模块
//!
//! 提供Rendition包文档的解析功能，包括元数据、清单、脊柱等信息的提取。

mod manifest;
mod metadata;
mod parser;
mod spine;

// 重新导出公共类型以保持API兼容性
pub use manifest::{Manifest, ManifestItem};
pub use metadata::{Metadatum, PackageMetadata};
pub use parser::PackageDocument;
pub use spine::{Spine, SpineItem};
