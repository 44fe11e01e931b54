//! 容器描述文件解析模块
//!
//! 解析META-INF/container.xml，得到按声明顺序排列的Rendition列表、
//! 默认Rendition以及可选的Rendition映射文档指针。

use crate::epub::consts;
use crate::epub::error::{EpubError, Result};
use crate::epub::export::JsonExport;
use crate::epub::mapping::RenditionMapping;
use crate::epub::nav::nav_doc::NavDocument;
use crate::epub::nav::ncx::NcxToc;
use crate::epub::nav::{Landmark, Navigation, TocNode};
use crate::epub::overlay::MediaOverlay;
use crate::epub::package::PackageDocument;
use quick_xml::events::Event;
use quick_xml::reader::Reader;
use serde_json::json;

/// 容器中的一个Rendition
#[derive(Debug, Clone)]
pub struct Rendition {
    /// 包文档的内部路径(container.xml中声明的full-path)
    pub full_path: String,
    /// 声明的媒体类型
    pub media_type: String,
    /// 解析后的包文档
    pub package: Option<PackageDocument>,
    /// 导航文档(EPUB3)
    pub nav_document: Option<NavDocument>,
    /// NCX目录(EPUB2)
    pub ncx_toc: Option<NcxToc>,
    /// 媒体叠加文档，按声明它的清单项id索引
    pub media_overlays: Vec<(String, MediaOverlay)>,
}

impl Rendition {
    /// 创建尚未解析的Rendition
    pub fn new(full_path: String, media_type: String) -> Self {
        Self {
            full_path,
            media_type,
            package: None,
            nav_document: None,
            ncx_toc: None,
            media_overlays: Vec::new(),
        }
    }

    /// 是否声明为包文档类型
    pub fn is_package(&self) -> bool {
        self.media_type == consts::MEDIA_TYPE_PACKAGE
    }

    /// 统一的导航能力视图，优先使用导航文档，其次NCX
    pub fn navigation(&self) -> Option<Navigation<'_>> {
        if let Some(nav) = &self.nav_document {
            return Some(Navigation::Nav(nav));
        }
        self.ncx_toc.as_ref().map(Navigation::Ncx)
    }

    /// 目录树的顶层节点列表
    pub fn table_of_contents(&self) -> Option<&[TocNode]> {
        self.navigation()
            .map(|navigation| navigation.table_of_contents())
    }

    /// 语义地标列表
    ///
    /// 只有NCX目录的Rendition没有地标概念，返回`None`(不适用)。
    pub fn landmarks(&self) -> Option<&[Landmark]> {
        self.navigation()?.landmarks()
    }

    /// 查找声明于指定清单项的媒体叠加文档
    pub fn media_overlay_for(&self, item_id: &str) -> Option<&MediaOverlay> {
        self.media_overlays
            .iter()
            .find(|(id, _)| id == item_id)
            .map(|(_, overlay)| overlay)
    }
}

impl JsonExport for Rendition {
    fn json_object(&self, recursive: bool) -> serde_json::Value {
        let mut obj = json!({
            "full_path": self.full_path,
            "media_type": self.media_type,
            "media_overlays": self.media_overlays.len(),
        });
        if recursive {
            if let Some(map) = obj.as_object_mut() {
                map.insert(
                    "package".to_string(),
                    self.package
                        .as_ref()
                        .map(|package| package.json_object(true))
                        .unwrap_or(serde_json::Value::Null),
                );
                map.insert(
                    "nav_document".to_string(),
                    self.nav_document
                        .as_ref()
                        .map(|nav| nav.json_object(true))
                        .unwrap_or(serde_json::Value::Null),
                );
                map.insert(
                    "ncx_toc".to_string(),
                    self.ncx_toc
                        .as_ref()
                        .map(|ncx| ncx.json_object(true))
                        .unwrap_or(serde_json::Value::Null),
                );
                map.insert(
                    "media_overlays".to_string(),
                    serde_json::Value::Array(
                        self.media_overlays
                            .iter()
                            .map(|(_, overlay)| overlay.json_object(true))
                            .collect(),
                    ),
                );
            }
        }
        obj
    }
}

/// container.xml的解析结果
#[derive(Debug, Clone)]
pub struct Container {
    /// 按声明顺序排列的Rendition列表
    pub renditions: Vec<Rendition>,
    /// Rendition映射文档的内部路径(link rel="mapping")
    pub mapping_href: Option<String>,
    /// 解析后的Rendition映射文档
    pub rm_document: Option<RenditionMapping>,
}

impl Container {
    /// 解析container.xml内容
    ///
    /// # 参数
    /// * `xml_content` - container.xml的文件内容
    ///
    /// # 返回值
    /// * `Result<Container>` - 解析后的Container信息
    pub fn parse_xml(xml_content: &str) -> Result<Container> {
        let mut reader = Reader::from_str(xml_content);
        reader.config_mut().trim_text(true);
        reader.config_mut().expand_empty_elements = true;

        let mut renditions = Vec::new();
        let mut mapping_href = None;
        let mut buf = Vec::new();
        let mut in_rootfiles = false;

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(ref e) | Event::Empty(ref e) => {
                    let local_name = e.local_name();
                    match local_name.as_ref() {
                        b"rootfiles" => {
                            in_rootfiles = true;
                        }
                        b"rootfile" if in_rootfiles => {
                            let mut full_path = String::new();
                            let mut media_type = String::new();

                            for attr_result in e.attributes() {
                                let attr = attr_result.map_err(|err| {
                                    EpubError::Xml(quick_xml::Error::InvalidAttr(err))
                                })?;
                                match attr.key.local_name().as_ref() {
                                    b"full-path" => {
                                        full_path =
                                            String::from_utf8_lossy(&attr.value).to_string();
                                    }
                                    b"media-type" => {
                                        media_type =
                                            String::from_utf8_lossy(&attr.value).to_string();
                                    }
                                    _ => {}
                                }
                            }

                            if !full_path.is_empty() && !media_type.is_empty() {
                                renditions.push(Rendition::new(full_path, media_type));
                            }
                        }
                        b"link" => {
                            let mut rel = String::new();
                            let mut href = String::new();
                            for attr_result in e.attributes() {
                                let attr = attr_result.map_err(|err| {
                                    EpubError::Xml(quick_xml::Error::InvalidAttr(err))
                                })?;
                                match attr.key.local_name().as_ref() {
                                    b"rel" => {
                                        rel = String::from_utf8_lossy(&attr.value).to_string();
                                    }
                                    b"href" => {
                                        href = String::from_utf8_lossy(&attr.value).to_string();
                                    }
                                    _ => {}
                                }
                            }
                            if rel.split_whitespace().any(|r| r == "mapping") && !href.is_empty() {
                                mapping_href = Some(href);
                            }
                        }
                        _ => {}
                    }
                }
                Event::End(ref e) => {
                    if e.local_name().as_ref() == b"rootfiles" {
                        in_rootfiles = false;
                    }
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        if renditions.is_empty() {
            return Err(EpubError::ContainerParse(
                "没有找到任何rootfile条目".to_string(),
            ));
        }

        Ok(Container {
            renditions,
            mapping_href,
            rm_document: None,
        })
    }

    /// 默认Rendition(按惯例为第一个声明的条目)
    pub fn default_rendition(&self) -> Option<&Rendition> {
        self.renditions.first()
    }

    /// 默认Rendition的可变引用
    pub fn default_rendition_mut(&mut self) -> Option<&mut Rendition> {
        self.renditions.first_mut()
    }
}

impl JsonExport for Container {
    fn json_object(&self, recursive: bool) -> serde_json::Value {
        let mut obj = json!({
            "renditions": self.renditions.len(),
            "mapping_href": self.mapping_href,
        });
        if recursive {
            if let Some(map) = obj.as_object_mut() {
                map.insert(
                    "renditions".to_string(),
                    serde_json::Value::Array(
                        self.renditions
                            .iter()
                            .map(|rendition| rendition.json_object(true))
                            .collect(),
                    ),
                );
                map.insert(
                    "rm_document".to_string(),
                    self.rm_document
                        .as_ref()
                        .map(|mapping| mapping.json_object(true))
                        .unwrap_or(serde_json::Value::Null),
                );
            }
        }
        obj
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_container_xml() {
        let container_xml = r#"<?xml version="1.0"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
    <rootfiles>
        <rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/>
        <rootfile full-path="OEBPS/toc.ncx" media-type="application/x-dtbncx+xml"/>
    </rootfiles>
</container>"#;

        let container = Container::parse_xml(container_xml).unwrap();
        assert_eq!(container.renditions.len(), 2);

        let first = &container.renditions[0];
        assert_eq!(first.full_path, "OEBPS/content.opf");
        assert_eq!(first.media_type, "application/oebps-package+xml");
        assert!(first.is_package());

        // 媒体类型不是包文档的条目保留在列表中
        let second = &container.renditions[1];
        assert_eq!(second.full_path, "OEBPS/toc.ncx");
        assert!(!second.is_package());
    }

    #[test]
    fn test_default_rendition_is_first() {
        let container_xml = r#"<?xml version="1.0"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
    <rootfiles>
        <rootfile full-path="reflow.opf" media-type="application/oebps-package+xml"/>
        <rootfile full-path="fixed.opf" media-type="application/oebps-package+xml"/>
    </rootfiles>
</container>"#;

        let container = Container::parse_xml(container_xml).unwrap();
        assert_eq!(
            container.default_rendition().map(|r| r.full_path.as_str()),
            Some("reflow.opf")
        );
    }

    #[test]
    fn test_parse_mapping_link() {
        let container_xml = r#"<?xml version="1.0"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
    <rootfiles>
        <rootfile full-path="content.opf" media-type="application/oebps-package+xml"/>
    </rootfiles>
    <links>
        <link href="META-INF/mapping.xhtml" rel="mapping" media-type="application/xhtml+xml"/>
    </links>
</container>"#;

        let container = Container::parse_xml(container_xml).unwrap();
        assert_eq!(
            container.mapping_href.as_deref(),
            Some("META-INF/mapping.xhtml")
        );
        assert!(container.rm_document.is_none());
    }

    #[test]
    fn test_zero_rootfiles_is_fatal() {
        let container_xml = r#"<?xml version="1.0"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
    <rootfiles></rootfiles>
</container>"#;

        let result = Container::parse_xml(container_xml);
        assert!(matches!(result, Err(EpubError::ContainerParse(_))));
    }

    #[test]
    fn test_rendition_navigation_preference() {
        let mut rendition = Rendition::new(
            "content.opf".to_string(),
            consts::MEDIA_TYPE_PACKAGE.to_string(),
        );
        assert!(rendition.navigation().is_none());
        assert!(rendition.table_of_contents().is_none());
        assert!(rendition.landmarks().is_none());

        rendition.ncx_toc = Some(NcxToc {
            uid: None,
            doc_title: None,
            nav_points: vec![TocNode::new("第一章".to_string())],
        });
        // 只有NCX时使用NCX，地标为"不适用"
        assert_eq!(rendition.table_of_contents().map(|toc| toc.len()), Some(1));
        assert!(rendition.landmarks().is_none());

        rendition.nav_document = Some(NavDocument::default());
        // 出现导航文档后优先使用导航文档
        assert_eq!(rendition.table_of_contents().map(|toc| toc.len()), Some(0));
        assert_eq!(rendition.landmarks().map(|landmarks| landmarks.len()), Some(0));
    }
}
