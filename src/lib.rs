pub mod epub;

// === 核心API重新导出 ===

/// 出版物对象模型（主要接口）
pub use epub::Publication;

/// 错误处理
pub use epub::{EpubError, Result};

/// 解析选项
pub use epub::ParseOptions;

// === 数据结构 ===

/// 容器与Rendition
pub use epub::{Container, Manifestation, Rendition};

/// 包文档组件
pub use epub::{
    Manifest,
    ManifestItem,
    Metadatum,
    PackageDocument,
    PackageMetadata,
    Spine,
    SpineItem,
};

/// 导航组件
pub use epub::{Landmark, NavDocument, Navigation, NcxToc, TocNode};

/// 媒体叠加、加密与映射组件
pub use epub::{Encryption, MediaOverlay, ObfuscationScheme, RenditionMapping};

// === 底层组件（高级用法） ===

/// 资源注册表条目与存储后端
pub use epub::{Asset, AssetStore};

/// 容器级元数据
pub use epub::MetadataDocument;

/// 结构化导出能力
pub use epub::JsonExport;

// === 库信息 ===

/// BookBinder库的版本信息
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// BookBinder库的描述
pub const DESCRIPTION: &str = "一个用于将EPUB出版物解析为内存对象模型的Rust库";

// === 便捷函数 ===

/// 以默认选项打开并解析EPUB出版物
///
/// 这是 `Publication::from_path` 的便捷包装函数。
///
/// # 参数
/// * `path` - EPUB文件或未压缩目录的路径
///
/// # 返回值
/// * `Result<Publication>` - 解析后的出版物
///
/// # 示例
///
/// ```rust,no_run
/// let publication = bookbinder::open("book.epub")?;
/// println!("版本: {:?}", publication.version());
/// # Ok::<(), bookbinder::EpubError>(())
/// ```
pub fn open<P: AsRef<std::path::Path>>(path: P) -> Result<Publication> {
    Publication::from_path(path, ParseOptions::default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_open_missing_path() {
        let result = open("no_such_file.epub");
        assert!(matches!(result, Err(EpubError::LocationNotFound(_))));
    }
}
