//! EPUB常量定义模块
//!
//! 提供容器的保留内部路径、媒体类型、混淆算法标识符
//! 以及EPUB3结构语义词汇表。

use once_cell::sync::Lazy;
use std::collections::HashSet;

/// mimetype文件的内部路径
pub const INTERNAL_PATH_MIMETYPE: &str = "mimetype";
/// container.xml的内部路径
pub const INTERNAL_PATH_CONTAINER_XML: &str = "META-INF/container.xml";
/// encryption.xml的内部路径
pub const INTERNAL_PATH_ENCRYPTION_XML: &str = "META-INF/encryption.xml";
/// 容器级metadata.xml的内部路径
pub const INTERNAL_PATH_METADATA_XML: &str = "META-INF/metadata.xml";
/// manifest.xml的内部路径
pub const INTERNAL_PATH_MANIFEST_XML: &str = "META-INF/manifest.xml";
/// rights.xml的内部路径
pub const INTERNAL_PATH_RIGHTS_XML: &str = "META-INF/rights.xml";
/// signatures.xml的内部路径
pub const INTERNAL_PATH_SIGNATURES_XML: &str = "META-INF/signatures.xml";
/// 保留目录META-INF
pub const META_INF_DIR: &str = "META-INF";

/// EPUB容器的mimetype内容
pub const MEDIA_TYPE_EPUB: &str = "application/epub+zip";
/// 包文档的媒体类型
pub const MEDIA_TYPE_PACKAGE: &str = "application/oebps-package+xml";
/// NCX导航控制文件的媒体类型
pub const MEDIA_TYPE_NCX: &str = "application/x-dtbncx+xml";
/// 媒体叠加文档(SMIL)的媒体类型
pub const MEDIA_TYPE_SMIL: &str = "application/smil+xml";
/// XHTML内容文档的媒体类型
pub const MEDIA_TYPE_XHTML: &str = "application/xhtml+xml";

/// Adobe字体混淆算法的标识符
pub const ALGORITHM_ADOBE: &str = "http://ns.adobe.com/pdf/enc#RC";
/// IDPF字体混淆算法的标识符
pub const ALGORITHM_IDPF: &str = "http://www.idpf.org/2008/embedding";

/// EPUB3结构语义词汇表
pub static STRUCTURAL_VOCABULARY: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        // 文档分区
        "cover",
        "frontmatter",
        "bodymatter",
        "backmatter",
        // 文档划分
        "volume",
        "part",
        "chapter",
        "subchapter",
        "division",
        // 章节与组成部分
        "abstract",
        "foreword",
        "preface",
        "prologue",
        "introduction",
        "preamble",
        "conclusion",
        "epilogue",
        "afterword",
        "epigraph",
        // 文档导航
        "toc",
        "toc-brief",
        "landmarks",
        "loa",
        "loi",
        "lot",
        "lov",
        // 参考性章节
        "appendix",
        "colophon",
        "credits",
        "keywords",
        // 索引
        "index",
        "index-headnotes",
        "index-legend",
        "index-group",
        "index-entry-list",
        "index-entry",
        "index-term",
        "index-locator",
        "index-locator-list",
        "index-locator-range",
        // 术语表与书目
        "glossary",
        "glossterm",
        "glossdef",
        "bibliography",
        "biblioentry",
        // 前置章节
        "titlepage",
        "halftitlepage",
        "copyright-page",
        "seriespage",
        "acknowledgments",
        "imprint",
        "imprimatur",
        "contributors",
        "other-credits",
        "errata",
        "dedication",
        "revision-history",
        // 标题
        "halftitle",
        "fulltitle",
        "covertitle",
        "title",
        "subtitle",
        "label",
        "ordinal",
        "bridgehead",
        // 注释
        "annotation",
        "note",
        "footnote",
        "rearnote",
        "footnotes",
        "rearnotes",
        // 引用
        "annoref",
        "biblioref",
        "glossref",
        "noteref",
        "referrer",
        // 分页
        "pagebreak",
        "page-list",
        // 表格与列表
        "table",
        "table-row",
        "table-cell",
        "list",
        "list-item",
        "figure",
    ]
    .into_iter()
    .collect()
});

/// 检查给定名称是否属于EPUB3结构语义词汇表
pub fn is_structural_semantic(name: &str) -> bool {
    STRUCTURAL_VOCABULARY.contains(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_structural_vocabulary() {
        assert!(is_structural_semantic("cover"));
        assert!(is_structural_semantic("toc"));
        assert!(is_structural_semantic("landmarks"));
        assert!(!is_structural_semantic("not-a-semantic"));
    }

    #[test]
    fn test_reserved_paths() {
        assert!(INTERNAL_PATH_CONTAINER_XML.starts_with(META_INF_DIR));
        assert!(INTERNAL_PATH_ENCRYPTION_XML.starts_with(META_INF_DIR));
        assert_eq!(INTERNAL_PATH_MIMETYPE, "mimetype");
    }
}
