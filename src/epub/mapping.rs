//! Rendition映射文档模块
//!
//! 解析多Rendition出版物的映射文档：一个epub:type为resource-map的
//! nav块，其中每个ul对应一处Location，把同一内容位置映射到
//! 各Rendition中的资源。

use crate::epub::error::{EpubError, Result};
use crate::epub::export::JsonExport;
use crate::epub::path;
use scraper::{ElementRef, Html, Selector};
use serde_json::json;

/// 一处映射位置中的单个资源指针
#[derive(Debug, Clone)]
pub struct MappingPoint {
    /// 所属Rendition(epub:rendition属性)
    pub rendition: Option<String>,
    /// 目标资源的规范内部路径
    pub internal_path: String,
    /// 片段标识符
    pub fragment: Option<String>,
}

/// 跨Rendition的一处映射位置
#[derive(Debug, Clone, Default)]
pub struct MappingLocation {
    /// 指向各Rendition的资源指针
    pub points: Vec<MappingPoint>,
}

/// Rendition映射文档解析结果
#[derive(Debug, Clone)]
pub struct RenditionMapping {
    /// nav块的epub:type属性值
    pub epub_type: Option<String>,
    /// 按文档顺序排列的映射位置
    pub locations: Vec<MappingLocation>,
}

impl RenditionMapping {
    /// 解析Rendition映射文档内容
    ///
    /// 没有resource-map类型的nav块视为格式错误；
    /// 单个格式错误的位置被跳过，不影响其余位置。
    ///
    /// # 参数
    /// * `xhtml_content` - 映射文档的XHTML内容
    /// * `internal_path` - 映射文档自身的规范内部路径，用于解析href引用
    ///
    /// # 返回值
    /// * `Result<RenditionMapping>` - 解析后的映射文档信息
    pub fn parse(xhtml_content: &str, internal_path: &str) -> Result<RenditionMapping> {
        let document = Html::parse_document(xhtml_content);
        let nav_selector = Selector::parse("nav")
            .map_err(|e| EpubError::MappingParse(format!("无效的选择器: {}", e)))?;

        let nav = document
            .select(&nav_selector)
            .find(|element| element.value().attr("epub:type") == Some("resource-map"))
            .ok_or_else(|| {
                EpubError::MappingParse("没有找到resource-map类型的nav元素".to_string())
            })?;

        let ul_selector = Selector::parse("ul")
            .map_err(|e| EpubError::MappingParse(format!("无效的选择器: {}", e)))?;

        let mut mapping = RenditionMapping {
            epub_type: nav.value().attr("epub:type").map(str::to_string),
            locations: Vec::new(),
        };
        for ul in nav.select(&ul_selector) {
            let location = Self::parse_location(ul, internal_path);
            if !location.points.is_empty() {
                mapping.locations.push(location);
            }
        }

        Ok(mapping)
    }

    /// 解析单个ul元素对应的映射位置
    fn parse_location(ul: ElementRef, internal_path: &str) -> MappingLocation {
        let mut location = MappingLocation::default();
        for li in ul.children().filter_map(ElementRef::wrap) {
            if li.value().name() != "li" {
                continue;
            }
            for anchor in li.children().filter_map(ElementRef::wrap) {
                if anchor.value().name() != "a" {
                    continue;
                }
                let Some(href) = anchor.value().attr("href") else {
                    continue;
                };
                let (_, fragment) = path::split_fragment(href);
                location.points.push(MappingPoint {
                    rendition: anchor.value().attr("epub:rendition").map(str::to_string),
                    internal_path: path::norm_join_parent(internal_path, href),
                    fragment: fragment.map(str::to_string),
                });
            }
        }
        location
    }
}

impl JsonExport for RenditionMapping {
    fn json_object(&self, recursive: bool) -> serde_json::Value {
        let mut obj = json!({
            "epub_type": self.epub_type,
            "locations": self.locations.len(),
        });
        if recursive {
            if let Some(map) = obj.as_object_mut() {
                map.insert(
                    "locations".to_string(),
                    serde_json::Value::Array(
                        self.locations
                            .iter()
                            .map(|location| {
                                serde_json::Value::Array(
                                    location
                                        .points
                                        .iter()
                                        .map(|point| {
                                            json!({
                                                "rendition": point.rendition,
                                                "internal_path": point.internal_path,
                                                "fragment": point.fragment,
                                            })
                                        })
                                        .collect(),
                                )
                            })
                            .collect(),
                    ),
                );
            }
        }
        obj
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAPPING_XHTML: &str = r#"<?xml version="1.0"?>
<html xmlns="http://www.w3.org/1999/xhtml" xmlns:epub="http://www.idpf.org/2007/ops">
<body>
<nav epub:type="resource-map">
<ul>
<li><a epub:rendition="reflow.opf" href="reflow/ch1.xhtml#p1">位置一</a></li>
<li><a epub:rendition="fixed.opf" href="fixed/page12.xhtml">位置一</a></li>
</ul>
<ul>
<li><a href="reflow/ch2.xhtml"></a></li>
<li><a href="fixed/page34.xhtml"></a></li>
</ul>
</nav>
</body>
</html>"#;

    #[test]
    fn test_parse_mapping() {
        let mapping = RenditionMapping::parse(MAPPING_XHTML, "META-INF/mapping.xhtml").unwrap();
        assert_eq!(mapping.epub_type.as_deref(), Some("resource-map"));
        assert_eq!(mapping.locations.len(), 2);

        let first = &mapping.locations[0];
        assert_eq!(first.points.len(), 2);
        assert_eq!(first.points[0].rendition.as_deref(), Some("reflow.opf"));
        // href相对映射文档所在目录解析
        assert_eq!(first.points[0].internal_path, "META-INF/reflow/ch1.xhtml");
        assert_eq!(first.points[0].fragment.as_deref(), Some("p1"));
        assert_eq!(first.points[1].fragment, None);
    }

    #[test]
    fn test_missing_resource_map_is_error() {
        let xhtml = r#"<html><body><nav epub:type="toc"><ol></ol></nav></body></html>"#;
        let result = RenditionMapping::parse(xhtml, "META-INF/mapping.xhtml");
        assert!(matches!(result, Err(EpubError::MappingParse(_))));
    }
}
