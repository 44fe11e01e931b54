//! 清单模块
//!
//! 提供Rendition中资源清单的结构定义与按类型筛选的视图。

use crate::epub::consts;

/// 清单项信息
#[derive(Debug, Clone)]
pub struct ManifestItem {
    /// 项目ID
    pub id: String,
    /// 声明的原始路径(相对于包文档)
    pub href: String,
    /// 相对容器根的规范内部路径
    pub internal_path: String,
    /// 媒体类型
    pub media_type: String,
    /// 属性(如nav、cover-image等)
    pub properties: Option<String>,
}

impl ManifestItem {
    /// 检查是否包含指定属性
    pub fn has_property(&self, property: &str) -> bool {
        if let Some(properties) = &self.properties {
            properties.split_whitespace().any(|p| p == property)
        } else {
            false
        }
    }

    /// 检查是否为导航文档
    pub fn is_nav(&self) -> bool {
        self.has_property("nav")
    }

    /// 检查是否为封面图片
    pub fn is_cover_image(&self) -> bool {
        self.has_property("cover-image")
    }

    /// 检查是否带脚本
    pub fn is_scripted(&self) -> bool {
        self.has_property("scripted")
    }

    /// 检查是否为图片文件
    pub fn is_image(&self) -> bool {
        self.media_type.starts_with("image/")
    }

    /// 检查是否为NCX文件
    pub fn is_ncx(&self) -> bool {
        self.media_type == consts::MEDIA_TYPE_NCX
    }

    /// 检查是否为媒体叠加文档
    pub fn is_mo_document(&self) -> bool {
        self.media_type == consts::MEDIA_TYPE_SMIL
    }

    /// 检查是否为XHTML文件
    pub fn is_xhtml(&self) -> bool {
        self.media_type == consts::MEDIA_TYPE_XHTML
    }
}

/// Rendition的资源清单
#[derive(Debug, Clone, Default)]
pub struct Manifest {
    /// 按声明顺序排列的清单项
    items: Vec<ManifestItem>,
}

impl Manifest {
    /// 创建空清单
    pub fn new() -> Self {
        Self::default()
    }

    /// 添加清单项
    ///
    /// 同一个规范内部路径在清单中只保留第一次声明。
    ///
    /// # 返回值
    /// * `bool` - 条目是否实际加入
    pub fn push(&mut self, item: ManifestItem) -> bool {
        if self
            .items
            .iter()
            .any(|existing| existing.internal_path == item.internal_path)
        {
            return false;
        }
        self.items.push(item);
        true
    }

    /// 全部清单项
    pub fn items(&self) -> &[ManifestItem] {
        &self.items
    }

    /// 清单项数量
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// 清单是否为空
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// 根据ID获取清单项
    pub fn item_by_id(&self, id: &str) -> Option<&ManifestItem> {
        self.items.iter().find(|item| item.id == id)
    }

    /// 按媒体类型筛选清单项
    pub fn items_by_media_type(&self, media_type: &str) -> Vec<&ManifestItem> {
        self.items
            .iter()
            .filter(|item| item.media_type == media_type)
            .collect()
    }

    /// 全部图片条目
    pub fn image_items(&self) -> Vec<&ManifestItem> {
        self.items.iter().filter(|item| item.is_image()).collect()
    }

    /// 全部带脚本条目
    pub fn scripted_items(&self) -> Vec<&ManifestItem> {
        self.items.iter().filter(|item| item.is_scripted()).collect()
    }

    /// 全部媒体叠加文档条目
    pub fn mo_document_items(&self) -> Vec<&ManifestItem> {
        self.items
            .iter()
            .filter(|item| item.is_mo_document())
            .collect()
    }

    /// 导航文档条目(每个Rendition至多使用一个)
    pub fn nav_item(&self) -> Option<&ManifestItem> {
        self.items.iter().find(|item| item.is_nav())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: &str, href: &str, internal_path: &str, media_type: &str) -> ManifestItem {
        ManifestItem {
            id: id.to_string(),
            href: href.to_string(),
            internal_path: internal_path.to_string(),
            media_type: media_type.to_string(),
            properties: None,
        }
    }

    #[test]
    fn test_has_property() {
        let mut nav = item("nav", "nav.xhtml", "OEBPS/nav.xhtml", "application/xhtml+xml");
        nav.properties = Some("nav scripted".to_string());
        assert!(nav.is_nav());
        assert!(nav.is_scripted());
        assert!(!nav.is_cover_image());
    }

    #[test]
    fn test_duplicate_internal_path_kept_once() {
        let mut manifest = Manifest::new();
        assert!(manifest.push(item("a", "ch1.xhtml", "OEBPS/ch1.xhtml", "application/xhtml+xml")));
        // 规范内部路径相同的后续声明被丢弃
        assert!(!manifest.push(item("b", "./ch1.xhtml", "OEBPS/ch1.xhtml", "application/xhtml+xml")));
        assert_eq!(manifest.len(), 1);
        assert!(manifest.item_by_id("a").is_some());
        assert!(manifest.item_by_id("b").is_none());
    }

    #[test]
    fn test_filtered_views() {
        let mut manifest = Manifest::new();
        manifest.push(item("c1", "ch1.xhtml", "OEBPS/ch1.xhtml", "application/xhtml+xml"));
        manifest.push(item("img", "cover.png", "OEBPS/cover.png", "image/png"));
        manifest.push(item("smil", "ch1.smil", "OEBPS/ch1.smil", "application/smil+xml"));

        assert_eq!(manifest.image_items().len(), 1);
        assert_eq!(manifest.mo_document_items().len(), 1);
        assert_eq!(manifest.items_by_media_type("image/png").len(), 1);
        assert!(manifest.nav_item().is_none());
    }
}
