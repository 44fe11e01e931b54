//! 导航文档解析模块
//!
//! 解析EPUB3的XHTML导航文档，按epub:type识别目录、地标与页列表
//! 三类nav块，每块都是嵌套的列表结构。

use crate::epub::error::{EpubError, Result};
use crate::epub::export::JsonExport;
use crate::epub::nav::ncx::toc_node_json;
use crate::epub::nav::{Landmark, TocNode};
use crate::epub::path;
use scraper::{ElementRef, Html, Selector};
use serde_json::json;

/// 导航文档解析结果
#[derive(Debug, Clone, Default)]
pub struct NavDocument {
    /// 目录树
    pub toc: Vec<TocNode>,
    /// 语义地标列表
    pub landmarks: Vec<Landmark>,
    /// 页列表
    pub page_list: Vec<TocNode>,
}

impl NavDocument {
    /// 解析导航文档内容
    ///
    /// 没有epub:type属性的nav块按目录处理。文档中一个nav元素都没有
    /// 视为格式错误。
    ///
    /// # 参数
    /// * `xhtml_content` - 导航文档的XHTML内容
    /// * `internal_path` - 导航文档自身的规范内部路径，用于解析href引用
    ///
    /// # 返回值
    /// * `Result<NavDocument>` - 解析后的导航文档信息
    pub fn parse(xhtml_content: &str, internal_path: &str) -> Result<NavDocument> {
        let document = Html::parse_document(xhtml_content);
        let nav_selector = Selector::parse("nav")
            .map_err(|e| EpubError::NavParse(format!("无效的选择器: {}", e)))?;

        let mut nav_document = NavDocument::default();
        let mut found_nav = false;

        for nav in document.select(&nav_selector) {
            found_nav = true;
            match nav.value().attr("epub:type").unwrap_or("toc") {
                "toc" => nav_document.toc = Self::parse_list(nav, internal_path),
                "landmarks" => {
                    nav_document.landmarks = Self::parse_landmarks(nav, internal_path)
                }
                "page-list" => nav_document.page_list = Self::parse_list(nav, internal_path),
                _ => {}
            }
        }

        if !found_nav {
            return Err(EpubError::NavParse("没有找到任何nav元素".to_string()));
        }

        Ok(nav_document)
    }

    /// 解析nav块中的第一层有序列表，得到导航树
    fn parse_list(nav: ElementRef, internal_path: &str) -> Vec<TocNode> {
        Self::child_elements(nav, "ol")
            .into_iter()
            .next()
            .map(|ol| Self::parse_ol(ol, internal_path))
            .unwrap_or_default()
    }

    fn parse_ol(ol: ElementRef, internal_path: &str) -> Vec<TocNode> {
        let mut nodes = Vec::new();
        for li in Self::child_elements(ol, "li") {
            if let Some(node) = Self::parse_li(li, internal_path) {
                nodes.push(node);
            }
        }
        nodes
    }

    /// 解析单个列表项：a或span给出标签与目标，嵌套的ol给出子节点
    fn parse_li(li: ElementRef, internal_path: &str) -> Option<TocNode> {
        let mut node: Option<TocNode> = None;
        for child in li.children() {
            let Some(element) = ElementRef::wrap(child) else {
                continue;
            };
            match element.value().name() {
                "a" => {
                    let mut toc_node = TocNode::new(Self::element_text(element));
                    if let Some(href) = element.value().attr("href") {
                        let (_, fragment) = path::split_fragment(href);
                        toc_node.target = Some(path::norm_join_parent(internal_path, href));
                        toc_node.fragment = fragment.map(str::to_string);
                    }
                    node = Some(toc_node);
                }
                "span" => {
                    if node.is_none() {
                        node = Some(TocNode::new(Self::element_text(element)));
                    }
                }
                "ol" => {
                    let children = Self::parse_ol(element, internal_path);
                    match node.as_mut() {
                        Some(existing) => existing.children = children,
                        None => {
                            let mut unnamed = TocNode::new(String::new());
                            unnamed.children = children;
                            node = Some(unnamed);
                        }
                    }
                }
                _ => {}
            }
        }
        node
    }

    /// 解析landmarks块，角色取自链接的epub:type属性
    fn parse_landmarks(nav: ElementRef, internal_path: &str) -> Vec<Landmark> {
        let mut landmarks = Vec::new();
        let Ok(anchor_selector) = Selector::parse("li > a") else {
            return landmarks;
        };
        for anchor in nav.select(&anchor_selector) {
            let Some(epub_type) = anchor.value().attr("epub:type") else {
                continue;
            };
            let mut landmark = Landmark {
                epub_type: epub_type.to_string(),
                label: Self::element_text(anchor),
                target: None,
                fragment: None,
            };
            if let Some(href) = anchor.value().attr("href") {
                let (_, fragment) = path::split_fragment(href);
                landmark.target = Some(path::norm_join_parent(internal_path, href));
                landmark.fragment = fragment.map(str::to_string);
            }
            landmarks.push(landmark);
        }
        landmarks
    }

    /// 直接子元素中名称匹配的元素
    fn child_elements<'a>(parent: ElementRef<'a>, name: &str) -> Vec<ElementRef<'a>> {
        parent
            .children()
            .filter_map(ElementRef::wrap)
            .filter(|element| element.value().name() == name)
            .collect()
    }

    /// 元素的纯文本内容，空白折叠
    fn element_text(element: ElementRef) -> String {
        element
            .text()
            .collect::<String>()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl JsonExport for NavDocument {
    fn json_object(&self, recursive: bool) -> serde_json::Value {
        if recursive {
            json!({
                "toc": self.toc.iter().map(toc_node_json).collect::<Vec<_>>(),
                "landmarks": self.landmarks.iter().map(|landmark| {
                    json!({
                        "epub_type": landmark.epub_type,
                        "label": landmark.label,
                        "target": landmark.target,
                        "fragment": landmark.fragment,
                    })
                }).collect::<Vec<_>>(),
                "page_list": self.page_list.iter().map(toc_node_json).collect::<Vec<_>>(),
            })
        } else {
            json!({
                "toc": self.toc.len(),
                "landmarks": self.landmarks.len(),
                "page_list": self.page_list.len(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NAV_XHTML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<html xmlns="http://www.w3.org/1999/xhtml" xmlns:epub="http://www.idpf.org/2007/ops">
<head><title>目录</title></head>
<body>
<nav epub:type="toc">
<ol>
<li><a href="text/ch1.xhtml">第一章</a>
<ol>
<li><a href="text/ch1.xhtml#s1">第一节</a></li>
</ol>
</li>
<li><span>未链接的部分</span></li>
</ol>
</nav>
<nav epub:type="landmarks">
<ol>
<li><a epub:type="cover" href="cover.xhtml">封面</a></li>
<li><a epub:type="bodymatter" href="text/ch1.xhtml">正文</a></li>
</ol>
</nav>
<nav epub:type="page-list">
<ol>
<li><a href="text/ch1.xhtml#p1">1</a></li>
</ol>
</nav>
</body>
</html>"#;

    #[test]
    fn test_parse_nav_document() {
        let nav = NavDocument::parse(NAV_XHTML, "OEBPS/nav.xhtml").unwrap();

        assert_eq!(nav.toc.len(), 2);
        assert_eq!(nav.toc[0].label, "第一章");
        assert_eq!(nav.toc[0].target.as_deref(), Some("OEBPS/text/ch1.xhtml"));
        assert_eq!(nav.toc[0].children.len(), 1);
        assert_eq!(nav.toc[0].children[0].fragment.as_deref(), Some("s1"));
        // span条目没有目标
        assert_eq!(nav.toc[1].label, "未链接的部分");
        assert_eq!(nav.toc[1].target, None);
    }

    #[test]
    fn test_parse_landmarks() {
        let nav = NavDocument::parse(NAV_XHTML, "OEBPS/nav.xhtml").unwrap();
        assert_eq!(nav.landmarks.len(), 2);
        assert_eq!(nav.landmarks[0].epub_type, "cover");
        assert_eq!(nav.landmarks[0].target.as_deref(), Some("OEBPS/cover.xhtml"));
        assert!(nav.landmarks[0].is_structural());
    }

    #[test]
    fn test_parse_page_list() {
        let nav = NavDocument::parse(NAV_XHTML, "OEBPS/nav.xhtml").unwrap();
        assert_eq!(nav.page_list.len(), 1);
        assert_eq!(nav.page_list[0].label, "1");
    }

    #[test]
    fn test_missing_nav_is_error() {
        let result = NavDocument::parse("<html><body><p>没有导航</p></body></html>", "nav.xhtml");
        assert!(matches!(result, Err(EpubError::NavParse(_))));
    }

    #[test]
    fn test_empty_landmarks_is_empty_list() {
        let xhtml = r#"<html xmlns:epub="http://www.idpf.org/2007/ops"><body>
<nav epub:type="toc"><ol><li><a href="a.xhtml">A</a></li></ol></nav>
<nav epub:type="landmarks"><ol></ol></nav>
</body></html>"#;
        let nav = NavDocument::parse(xhtml, "nav.xhtml").unwrap();
        // 存在landmarks块但没有条目：空列表，而非"不适用"
        assert!(nav.landmarks.is_empty());
    }
}
