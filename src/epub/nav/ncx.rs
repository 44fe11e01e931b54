//! NCX目录解析模块
//!
//! 解析EPUB2的NCX导航控制文件，得到带层级的导航点树。
//! NCX声明的dtb:uid保留下来，供流水线与包文档的唯一标识符交叉校验。

use crate::epub::error::{EpubError, Result};
use crate::epub::export::JsonExport;
use crate::epub::nav::TocNode;
use crate::epub::path;
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use serde_json::json;

/// 解析过程中带playOrder的导航点
#[derive(Debug, Clone)]
struct PendingNavPoint {
    play_order: u32,
    label: String,
    target: Option<String>,
    fragment: Option<String>,
    children: Vec<PendingNavPoint>,
}

impl PendingNavPoint {
    fn new(play_order: u32) -> Self {
        Self {
            play_order,
            label: String::new(),
            target: None,
            fragment: None,
            children: Vec::new(),
        }
    }

    /// 按playOrder排序子节点并转换为导航树节点
    fn into_node(mut self) -> TocNode {
        self.children.sort_by_key(|child| child.play_order);
        TocNode {
            label: self.label,
            target: self.target,
            fragment: self.fragment,
            children: self
                .children
                .into_iter()
                .map(PendingNavPoint::into_node)
                .collect(),
        }
    }
}

/// NCX文件解析结果
#[derive(Debug, Clone)]
pub struct NcxToc {
    /// dtb:uid声明的唯一标识符
    pub uid: Option<String>,
    /// 文档标题
    pub doc_title: Option<String>,
    /// 导航点树(按playOrder排序)
    pub nav_points: Vec<TocNode>,
}

impl NcxToc {
    /// 解析NCX文件内容
    ///
    /// # 参数
    /// * `xml_content` - NCX文件的XML内容
    /// * `internal_path` - NCX文件自身的规范内部路径，用于解析content引用
    ///
    /// # 返回值
    /// * `Result<NcxToc>` - 解析后的NCX信息
    pub fn parse_xml(xml_content: &str, internal_path: &str) -> Result<NcxToc> {
        let mut reader = Reader::from_str(xml_content);
        reader.config_mut().trim_text(true);
        reader.config_mut().expand_empty_elements = true;

        let mut uid = None;
        let mut doc_title = None;
        let mut roots: Vec<PendingNavPoint> = Vec::new();
        let mut saw_nav_map = false;

        let mut buf = Vec::new();
        let mut current_section = String::new();
        let mut text_content = String::new();

        // 导航点解析状态
        let mut nav_point_stack: Vec<PendingNavPoint> = Vec::new();
        let mut current_nav_point: Option<PendingNavPoint> = None;

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(ref e) => {
                    let local_name_bytes = e.local_name();
                    let local_name = String::from_utf8_lossy(local_name_bytes.as_ref());

                    match local_name.as_ref() {
                        "head" => {
                            current_section = "head".to_string();
                        }
                        "docTitle" => {
                            current_section = "docTitle".to_string();
                        }
                        "navMap" => {
                            current_section = "navMap".to_string();
                            saw_nav_map = true;
                        }
                        "meta" if current_section == "head" => {
                            if let Some(value) = Self::parse_head_meta(e)? {
                                uid = Some(value);
                            }
                        }
                        "navPoint" if current_section == "navMap" => {
                            let play_order = Self::parse_play_order(e)?;

                            // 未完成的导航点先推入栈中
                            if let Some(nav_point) = current_nav_point.take() {
                                nav_point_stack.push(nav_point);
                            }
                            current_nav_point = Some(PendingNavPoint::new(play_order));
                        }
                        "content" if current_section == "navMap" => {
                            if let Some(src) = Self::parse_content_src(e)? {
                                if let Some(ref mut nav_point) = current_nav_point {
                                    let (_, fragment) = path::split_fragment(&src);
                                    nav_point.fragment = fragment.map(str::to_string);
                                    nav_point.target =
                                        Some(path::norm_join_parent(internal_path, &src));
                                }
                            }
                        }
                        _ => {}
                    }
                    text_content.clear();
                }
                Event::End(ref e) => {
                    let local_name_bytes = e.local_name();
                    let local_name = String::from_utf8_lossy(local_name_bytes.as_ref());

                    match local_name.as_ref() {
                        "head" | "navMap" => {
                            current_section.clear();
                        }
                        "docTitle" => {
                            let text = text_content.trim();
                            if !text.is_empty() {
                                doc_title = Some(text.to_string());
                            }
                            current_section.clear();
                        }
                        "text" if current_section == "navMap" => {
                            if let Some(ref mut nav_point) = current_nav_point {
                                if nav_point.label.is_empty() {
                                    nav_point.label = text_content.trim().to_string();
                                }
                            }
                        }
                        "navPoint" if current_section == "navMap" => {
                            if let Some(finished) = current_nav_point.take() {
                                match nav_point_stack.pop() {
                                    Some(mut parent) => {
                                        parent.children.push(finished);
                                        current_nav_point = Some(parent);
                                    }
                                    None => roots.push(finished),
                                }
                            }
                        }
                        _ => {}
                    }
                }
                Event::Text(e) => {
                    text_content.push_str(&e.unescape()?);
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        if !saw_nav_map {
            return Err(EpubError::NcxParse("没有找到navMap元素".to_string()));
        }

        roots.sort_by_key(|nav_point| nav_point.play_order);
        Ok(NcxToc {
            uid,
            doc_title,
            nav_points: roots.into_iter().map(PendingNavPoint::into_node).collect(),
        })
    }

    /// 解析head中的meta元素，返回dtb:uid的值
    fn parse_head_meta(e: &BytesStart) -> Result<Option<String>> {
        let mut name = String::new();
        let mut content = String::new();
        for attr_result in e.attributes() {
            let attr = attr_result
                .map_err(|err| EpubError::Xml(quick_xml::Error::InvalidAttr(err)))?;
            match attr.key.local_name().as_ref() {
                b"name" => {
                    name = String::from_utf8_lossy(&attr.value).to_string();
                }
                b"content" => {
                    content = String::from_utf8_lossy(&attr.value).to_string();
                }
                _ => {}
            }
        }
        if name == "dtb:uid" && !content.is_empty() {
            Ok(Some(content))
        } else {
            Ok(None)
        }
    }

    /// 解析navPoint元素的playOrder属性
    fn parse_play_order(e: &BytesStart) -> Result<u32> {
        for attr_result in e.attributes() {
            let attr = attr_result
                .map_err(|err| EpubError::Xml(quick_xml::Error::InvalidAttr(err)))?;
            if attr.key.local_name().as_ref() == b"playOrder" {
                return Ok(String::from_utf8_lossy(&attr.value)
                    .parse::<u32>()
                    .unwrap_or(0));
            }
        }
        Ok(0)
    }

    /// 解析content元素的src属性
    fn parse_content_src(e: &BytesStart) -> Result<Option<String>> {
        for attr_result in e.attributes() {
            let attr = attr_result
                .map_err(|err| EpubError::Xml(quick_xml::Error::InvalidAttr(err)))?;
            if attr.key.local_name().as_ref() == b"src" {
                return Ok(Some(String::from_utf8_lossy(&attr.value).to_string()));
            }
        }
        Ok(None)
    }

    /// 导航树的最大深度
    pub fn depth(&self) -> u32 {
        self.nav_points
            .iter()
            .map(|nav_point| nav_point.depth())
            .max()
            .unwrap_or(0)
    }

    /// 平铺得到所有导航点
    pub fn flatten(&self) -> Vec<&TocNode> {
        let mut nodes = Vec::new();
        for nav_point in &self.nav_points {
            nodes.extend(nav_point.flatten());
        }
        nodes
    }
}

impl JsonExport for NcxToc {
    fn json_object(&self, recursive: bool) -> serde_json::Value {
        let mut obj = json!({
            "dtb_uid": self.uid,
            "doc_title": self.doc_title,
            "nav_points": self.flatten().len(),
        });
        if recursive {
            if let Some(map) = obj.as_object_mut() {
                map.insert(
                    "nav_points".to_string(),
                    serde_json::Value::Array(
                        self.nav_points.iter().map(toc_node_json).collect(),
                    ),
                );
            }
        }
        obj
    }
}

/// 导航树节点的递归投影
pub(crate) fn toc_node_json(node: &TocNode) -> serde_json::Value {
    json!({
        "label": node.label,
        "target": node.target,
        "fragment": node.fragment,
        "children": node.children.iter().map(toc_node_json).collect::<Vec<_>>(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const NCX_XML: &str = r#"<?xml version="1.0"?>
<ncx xmlns="http://www.daisy.org/z3986/2005/ncx/" version="2005-1">
<head>
<meta name="dtb:uid" content="urn:uuid:83136816"/>
<meta name="dtb:depth" content="2"/>
</head>
<docTitle><text>测试书籍</text></docTitle>
<navMap>
<navPoint id="n2" playOrder="2">
<navLabel><text>第二章</text></navLabel>
<content src="text/ch2.xhtml"/>
</navPoint>
<navPoint id="n1" playOrder="1">
<navLabel><text>第一章</text></navLabel>
<content src="text/ch1.xhtml#start"/>
<navPoint id="n1-1" playOrder="3">
<navLabel><text>第一节</text></navLabel>
<content src="text/ch1.xhtml#s1"/>
</navPoint>
</navPoint>
</navMap>
</ncx>"#;

    #[test]
    fn test_parse_ncx() {
        let ncx = NcxToc::parse_xml(NCX_XML, "OEBPS/toc.ncx").unwrap();
        assert_eq!(ncx.uid.as_deref(), Some("urn:uuid:83136816"));
        assert_eq!(ncx.doc_title.as_deref(), Some("测试书籍"));
        assert_eq!(ncx.nav_points.len(), 2);
        assert_eq!(ncx.depth(), 2);
    }

    #[test]
    fn test_play_order_sorting() {
        let ncx = NcxToc::parse_xml(NCX_XML, "OEBPS/toc.ncx").unwrap();
        // 顶层导航点按playOrder排序
        assert_eq!(ncx.nav_points[0].label, "第一章");
        assert_eq!(ncx.nav_points[1].label, "第二章");
        assert_eq!(ncx.nav_points[0].children.len(), 1);
        assert_eq!(ncx.nav_points[0].children[0].label, "第一节");
    }

    #[test]
    fn test_missing_nav_map_is_error() {
        let xml = r#"<ncx xmlns="http://www.daisy.org/z3986/2005/ncx/" version="2005-1">
<head><meta name="dtb:uid" content="urn:uuid:1"/></head>
<docTitle><text>没有navMap</text></docTitle>
</ncx>"#;
        let result = NcxToc::parse_xml(xml, "OEBPS/toc.ncx");
        assert!(matches!(result, Err(EpubError::NcxParse(_))));
    }

    #[test]
    fn test_targets_are_canonical() {
        let ncx = NcxToc::parse_xml(NCX_XML, "OEBPS/toc.ncx").unwrap();
        let first = &ncx.nav_points[0];
        // content引用相对NCX文件所在目录解析，片段单独保留
        assert_eq!(first.target.as_deref(), Some("OEBPS/text/ch1.xhtml"));
        assert_eq!(first.fragment.as_deref(), Some("start"));
        assert_eq!(ncx.nav_points[1].fragment, None);
    }
}
