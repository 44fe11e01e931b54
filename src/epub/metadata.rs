//! 容器级元数据模块
//!
//! 解析META-INF/metadata.xml，即多Rendition出版物在容器层面
//! 声明唯一标识符与修改时间的描述文件。

use crate::epub::error::{EpubError, Result};
use crate::epub::export::JsonExport;
use quick_xml::events::Event;
use quick_xml::reader::Reader;
use serde_json::json;

/// META-INF/metadata.xml的解析结果
#[derive(Debug, Clone, Default)]
pub struct MetadataDocument {
    /// unique-identifier属性引用的元素id
    pub unique_identifier_id: Option<String>,
    /// (元素id, 文本)形式的标识符列表，按文档顺序
    pub identifiers: Vec<(Option<String>, String)>,
    /// dcterms:modified时间戳
    pub dcterms_modified: Option<String>,
}

impl MetadataDocument {
    /// 解析metadata.xml内容
    ///
    /// # 参数
    /// * `xml_content` - metadata.xml的文件内容
    ///
    /// # 返回值
    /// * `Result<MetadataDocument>` - 解析后的容器级元数据
    pub fn parse_xml(xml_content: &str) -> Result<MetadataDocument> {
        let mut reader = Reader::from_str(xml_content);
        reader.config_mut().trim_text(true);
        reader.config_mut().expand_empty_elements = true;

        let mut document = MetadataDocument::default();
        let mut buf = Vec::new();
        let mut text_content = String::new();
        let mut current_identifier_id: Option<String> = None;
        let mut in_identifier = false;
        let mut in_modified = false;
        let mut saw_root = false;

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(ref e) => {
                    let local_name_bytes = e.local_name();
                    match local_name_bytes.as_ref() {
                        b"metadata" => {
                            saw_root = true;
                            for attr_result in e.attributes() {
                                let attr = attr_result.map_err(|err| {
                                    EpubError::Xml(quick_xml::Error::InvalidAttr(err))
                                })?;
                                if attr.key.local_name().as_ref() == b"unique-identifier" {
                                    document.unique_identifier_id =
                                        Some(String::from_utf8_lossy(&attr.value).to_string());
                                }
                            }
                        }
                        b"identifier" => {
                            in_identifier = true;
                            current_identifier_id = None;
                            for attr_result in e.attributes() {
                                let attr = attr_result.map_err(|err| {
                                    EpubError::Xml(quick_xml::Error::InvalidAttr(err))
                                })?;
                                if attr.key.local_name().as_ref() == b"id" {
                                    current_identifier_id =
                                        Some(String::from_utf8_lossy(&attr.value).to_string());
                                }
                            }
                            text_content.clear();
                        }
                        b"meta" => {
                            for attr_result in e.attributes() {
                                let attr = attr_result.map_err(|err| {
                                    EpubError::Xml(quick_xml::Error::InvalidAttr(err))
                                })?;
                                if attr.key.local_name().as_ref() == b"property"
                                    && attr.value.as_ref() == b"dcterms:modified"
                                {
                                    in_modified = true;
                                }
                            }
                            text_content.clear();
                        }
                        _ => {}
                    }
                }
                Event::End(ref e) => {
                    let local_name_bytes = e.local_name();
                    match local_name_bytes.as_ref() {
                        b"identifier" if in_identifier => {
                            document.identifiers.push((
                                current_identifier_id.take(),
                                text_content.trim().to_string(),
                            ));
                            in_identifier = false;
                        }
                        b"meta" if in_modified => {
                            let text = text_content.trim();
                            if !text.is_empty() {
                                document.dcterms_modified = Some(text.to_string());
                            }
                            in_modified = false;
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

        if !saw_root {
            return Err(EpubError::MetadataParse(
                "没有找到metadata根元素".to_string(),
            ));
        }

        Ok(document)
    }

    /// 容器层面声明的唯一标识符
    ///
    /// 优先解析unique-identifier属性引用的标识符，
    /// 引用无法解析时回退到第一条标识符。
    pub fn unique_identifier(&self) -> Option<String> {
        if let Some(id) = &self.unique_identifier_id {
            if let Some((_, text)) = self
                .identifiers
                .iter()
                .find(|(identifier_id, _)| identifier_id.as_deref() == Some(id))
            {
                return Some(text.clone());
            }
        }
        self.identifiers.first().map(|(_, text)| text.clone())
    }

    /// 容器层面的Release Identifier
    ///
    /// 唯一标识符与修改时间以`@`连接；没有修改时间时即为唯一标识符。
    pub fn release_identifier(&self) -> Option<String> {
        let unique_identifier = self.unique_identifier()?;
        match &self.dcterms_modified {
            Some(modified) => Some(format!("{}@{}", unique_identifier, modified)),
            None => Some(unique_identifier),
        }
    }
}

impl JsonExport for MetadataDocument {
    fn json_object(&self, _recursive: bool) -> serde_json::Value {
        json!({
            "unique_identifier": self.unique_identifier(),
            "dcterms_modified": self.dcterms_modified,
            "release_identifier": self.release_identifier(),
        })
    }
}
