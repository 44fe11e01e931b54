//! 包文档解析器模块
//!
//! 提供Rendition包文档的XML解析功能。

use crate::epub::error::{EpubError, Result};
use crate::epub::export::JsonExport;
use crate::epub::package::{
    manifest::{Manifest, ManifestItem},
    metadata::{Metadatum, PackageMetadata},
    spine::{Spine, SpineItem},
};
use crate::epub::path;
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use serde_json::json;

/// 包文档解析结果
#[derive(Debug, Clone)]
pub struct PackageDocument {
    /// EPUB版本
    pub version: String,
    /// unique-identifier属性引用的元素id
    pub unique_identifier_id: Option<String>,
    /// 包文档自身的规范内部路径
    pub internal_path: String,
    /// 元数据
    pub metadata: PackageMetadata,
    /// 清单(文件列表)
    pub manifest: Manifest,
    /// 脊柱(阅读顺序)
    pub spine: Spine,
}

impl PackageDocument {
    /// 解析包文档内容
    ///
    /// 清单href以包文档自身所在目录为基准解析为规范内部路径。
    ///
    /// # 参数
    /// * `xml_content` - 包文档的XML内容
    /// * `internal_path` - 包文档自身的规范内部路径
    ///
    /// # 返回值
    /// * `Result<PackageDocument>` - 解析后的包文档信息
    pub fn parse_xml(xml_content: &str, internal_path: &str) -> Result<PackageDocument> {
        let mut reader = Reader::from_str(xml_content);
        reader.config_mut().trim_text(true);
        reader.config_mut().expand_empty_elements = true;

        let mut version = String::new();
        let mut unique_identifier_id = None;
        let mut metadata = PackageMetadata::new();
        let mut manifest = Manifest::new();
        let mut spine = Spine::default();

        let mut buf = Vec::new();
        let mut current_section = String::new();
        let mut text_content = String::new();
        let mut pending: Option<Metadatum> = None;

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(ref e) => {
                    let local_name_bytes = e.local_name();
                    let local_name = String::from_utf8_lossy(local_name_bytes.as_ref());

                    match local_name.as_ref() {
                        "package" => {
                            let (package_version, identifier_id) = Self::parse_package_attributes(e)?;
                            version = package_version;
                            unique_identifier_id = identifier_id;
                        }
                        "metadata" => {
                            current_section = "metadata".to_string();
                        }
                        "manifest" => {
                            current_section = "manifest".to_string();
                        }
                        "spine" => {
                            current_section = "spine".to_string();
                            spine.toc = Self::parse_spine_toc(e)?;
                        }
                        "item" if current_section == "manifest" => {
                            Self::parse_manifest_item(e, internal_path, &mut manifest)?;
                        }
                        "itemref" if current_section == "spine" => {
                            Self::parse_spine_item(e, &mut spine)?;
                        }
                        "meta" if current_section == "metadata" => {
                            pending = Self::parse_meta_start(e, &mut metadata)?;
                            text_content.clear();
                        }
                        _ if current_section == "metadata" => {
                            pending = Some(Self::parse_term_start(e)?);
                            text_content.clear();
                        }
                        _ => {}
                    }
                }
                Event::End(ref e) => {
                    let local_name_bytes = e.local_name();
                    let local_name = String::from_utf8_lossy(local_name_bytes.as_ref());

                    match local_name.as_ref() {
                        "metadata" | "manifest" | "spine" => {
                            current_section.clear();
                        }
                        _ if current_section == "metadata" => {
                            if let Some(mut metadatum) = pending.take() {
                                metadatum.text = text_content.trim().to_string();
                                if !metadatum.term.is_empty() {
                                    metadata.push(metadatum);
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

        Ok(PackageDocument {
            version,
            unique_identifier_id,
            internal_path: internal_path.to_string(),
            metadata,
            manifest,
            spine,
        })
    }

    /// 解析package元素的version与unique-identifier属性
    fn parse_package_attributes(e: &BytesStart) -> Result<(String, Option<String>)> {
        let mut version = String::new();
        let mut unique_identifier_id = None;
        for attr_result in e.attributes() {
            let attr = attr_result
                .map_err(|err| EpubError::Xml(quick_xml::Error::InvalidAttr(err)))?;
            match attr.key.local_name().as_ref() {
                b"version" => {
                    version = String::from_utf8_lossy(&attr.value).to_string();
                }
                b"unique-identifier" => {
                    unique_identifier_id = Some(String::from_utf8_lossy(&attr.value).to_string());
                }
                _ => {}
            }
        }
        Ok((version, unique_identifier_id))
    }

    /// 解析spine元素的toc属性
    fn parse_spine_toc(e: &BytesStart) -> Result<Option<String>> {
        for attr_result in e.attributes() {
            let attr = attr_result
                .map_err(|err| EpubError::Xml(quick_xml::Error::InvalidAttr(err)))?;
            if attr.key.local_name().as_ref() == b"toc" {
                return Ok(Some(String::from_utf8_lossy(&attr.value).to_string()));
            }
        }
        Ok(None)
    }

    /// 解析带命名空间前缀的元数据元素开始标签
    ///
    /// 词项由"前缀:本地名"构成，例如`<dc:title>`记为"dc:title"。
    fn parse_term_start(e: &BytesStart) -> Result<Metadatum> {
        let qname = e.name();
        let local_name = String::from_utf8_lossy(e.local_name().as_ref()).to_string();
        let term = match qname.prefix() {
            Some(prefix) => format!("{}:{}", String::from_utf8_lossy(prefix.as_ref()), local_name),
            None => local_name,
        };

        let mut metadatum = Metadatum::new(term, String::new());
        for attr_result in e.attributes() {
            let attr = attr_result
                .map_err(|err| EpubError::Xml(quick_xml::Error::InvalidAttr(err)))?;
            match attr.key.local_name().as_ref() {
                b"id" => {
                    metadatum.id = Some(String::from_utf8_lossy(&attr.value).to_string());
                }
                b"scheme" => {
                    metadatum.scheme = Some(String::from_utf8_lossy(&attr.value).to_string());
                }
                _ => {}
            }
        }
        Ok(metadatum)
    }

    /// 处理meta开始标签
    ///
    /// EPUB2的name/content形式立即入表；EPUB3的property形式返回
    /// 待填充文本的条目，refines属性去除开头的#号。
    fn parse_meta_start(
        e: &BytesStart,
        metadata: &mut PackageMetadata,
    ) -> Result<Option<Metadatum>> {
        let mut name = String::new();
        let mut content = String::new();
        let mut property = String::new();
        let mut refines = None;
        let mut scheme = None;
        let mut id = None;

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
                b"property" => {
                    property = String::from_utf8_lossy(&attr.value).to_string();
                }
                b"refines" => {
                    let mut value = String::from_utf8_lossy(&attr.value).to_string();
                    // 移除开头的#号（如果存在）
                    if value.starts_with('#') {
                        value = value[1..].to_string();
                    }
                    refines = Some(value);
                }
                b"scheme" => {
                    scheme = Some(String::from_utf8_lossy(&attr.value).to_string());
                }
                b"id" => {
                    id = Some(String::from_utf8_lossy(&attr.value).to_string());
                }
                _ => {}
            }
        }

        // EPUB2形式：<meta name="cover" content="cover-image"/>
        if !name.is_empty() && !content.is_empty() {
            metadata.push(Metadatum::new(name, content));
            return Ok(None);
        }

        // EPUB3形式：<meta property="dcterms:modified">...</meta>
        if !property.is_empty() {
            let mut metadatum = Metadatum::new(property, String::new());
            metadatum.refines = refines;
            metadatum.scheme = scheme;
            metadatum.id = id;
            return Ok(Some(metadatum));
        }

        Ok(None)
    }

    /// 解析清单项
    fn parse_manifest_item(
        e: &BytesStart,
        internal_path: &str,
        manifest: &mut Manifest,
    ) -> Result<()> {
        let mut id = String::new();
        let mut href = String::new();
        let mut media_type = String::new();
        let mut properties = None;

        for attr_result in e.attributes() {
            let attr = attr_result
                .map_err(|err| EpubError::Xml(quick_xml::Error::InvalidAttr(err)))?;
            match attr.key.local_name().as_ref() {
                b"id" => {
                    id = String::from_utf8_lossy(&attr.value).to_string();
                }
                b"href" => {
                    href = String::from_utf8_lossy(&attr.value).to_string();
                }
                b"media-type" => {
                    media_type = String::from_utf8_lossy(&attr.value).to_string();
                }
                b"properties" => {
                    properties = Some(String::from_utf8_lossy(&attr.value).to_string());
                }
                _ => {}
            }
        }

        if !id.is_empty() && !href.is_empty() && !media_type.is_empty() {
            let item_internal_path = path::norm_join_parent(internal_path, &href);
            manifest.push(ManifestItem {
                id,
                href,
                internal_path: item_internal_path,
                media_type,
                properties,
            });
        }

        Ok(())
    }

    /// 解析脊柱项
    fn parse_spine_item(e: &BytesStart, spine: &mut Spine) -> Result<()> {
        let mut spine_item = SpineItem::new(String::new());

        for attr_result in e.attributes() {
            let attr = attr_result
                .map_err(|err| EpubError::Xml(quick_xml::Error::InvalidAttr(err)))?;
            match attr.key.local_name().as_ref() {
                b"idref" => {
                    spine_item.idref = String::from_utf8_lossy(&attr.value).to_string();
                }
                b"linear" => {
                    let linear_value = String::from_utf8_lossy(&attr.value);
                    spine_item.linear = linear_value != "no";
                }
                _ => {}
            }
        }

        if !spine_item.idref.is_empty() {
            spine.itemrefs.push(spine_item);
        }

        Ok(())
    }

    /// 解析出版物声明的唯一标识符
    ///
    /// 解析unique-identifier属性引用的元数据条目并返回其文本；
    /// 引用缺失或无法解析时返回`None`，而不是错误。
    pub fn unique_identifier(&self) -> Option<String> {
        let id = self.unique_identifier_id.as_deref()?;
        let metadatum = self.metadata.by_id(id)?;
        Some(metadatum.text.clone())
    }

    /// 出版物级的修改时间
    pub fn dcterms_modified(&self) -> Option<String> {
        self.metadata.dcterms_modified()
    }

    /// 导航文档的规范内部路径
    pub fn internal_path_nav_document(&self) -> Option<String> {
        self.manifest
            .nav_item()
            .map(|item| item.internal_path.clone())
    }

    /// NCX目录的规范内部路径
    ///
    /// 优先使用spine的toc属性引用，其次回退到媒体类型为NCX的清单项。
    pub fn internal_path_ncx_toc(&self) -> Option<String> {
        if let Some(toc_id) = &self.spine.toc {
            if let Some(item) = self.manifest.item_by_id(toc_id) {
                return Some(item.internal_path.clone());
            }
        }
        self.manifest
            .items()
            .iter()
            .find(|item| item.is_ncx())
            .map(|item| item.internal_path.clone())
    }

    /// 封面图片的规范内部路径
    ///
    /// 优先检查cover-image属性，其次回退到EPUB2的meta name="cover"条目。
    pub fn internal_path_cover_image(&self) -> Option<String> {
        if let Some(item) = self.manifest.items().iter().find(|item| item.is_cover_image()) {
            return Some(item.internal_path.clone());
        }
        let cover_id = self
            .metadata
            .by_term("cover")
            .first()
            .map(|metadatum| metadatum.text.clone())?;
        self.manifest
            .item_by_id(&cover_id)
            .map(|item| item.internal_path.clone())
    }

    /// 指定内部路径在脊柱中的位置
    ///
    /// # 返回值
    /// * `Option<usize>` - 位置；路径不在脊柱中时返回`None`
    pub fn spine_index_by_internal_path(&self, internal_path: &str) -> Option<usize> {
        self.spine.itemrefs.iter().position(|itemref| {
            self.manifest
                .item_by_id(&itemref.idref)
                .map(|item| item.internal_path == internal_path)
                .unwrap_or(false)
        })
    }

    /// 指定内部路径在只计线性条目时的脊柱位置
    ///
    /// 位于该条目之前的非线性条目不计入位置；
    /// 路径对应的条目本身为非线性时返回`None`。
    pub fn spine_linear_index_by_internal_path(&self, internal_path: &str) -> Option<usize> {
        let mut linear_index = 0;
        for itemref in &self.spine.itemrefs {
            let matches = self
                .manifest
                .item_by_id(&itemref.idref)
                .map(|item| item.internal_path == internal_path)
                .unwrap_or(false);
            if matches {
                return if itemref.is_linear() {
                    Some(linear_index)
                } else {
                    None
                };
            }
            if itemref.is_linear() {
                linear_index += 1;
            }
        }
        None
    }

    /// 清单中引用的全部文件(按声明顺序)
    pub fn files_referenced_manifest(&self) -> Vec<String> {
        self.manifest
            .items()
            .iter()
            .map(|item| item.internal_path.clone())
            .collect()
    }

    /// 脊柱中引用的全部文件(按阅读顺序)
    pub fn files_referenced_spine(&self) -> Vec<String> {
        self.spine
            .itemrefs
            .iter()
            .filter_map(|itemref| self.manifest.item_by_id(&itemref.idref))
            .map(|item| item.internal_path.clone())
            .collect()
    }

    /// 脊柱中linear="yes"或缺省的文件(按阅读顺序)
    pub fn files_referenced_spine_linear(&self) -> Vec<String> {
        self.spine
            .itemrefs
            .iter()
            .filter(|itemref| itemref.is_linear())
            .filter_map(|itemref| self.manifest.item_by_id(&itemref.idref))
            .map(|item| item.internal_path.clone())
            .collect()
    }
}

impl JsonExport for PackageDocument {
    fn json_object(&self, recursive: bool) -> serde_json::Value {
        let mut obj = json!({
            "internal_path": self.internal_path,
            "version": self.version,
            "unique_identifier": self.unique_identifier(),
            "metadata": self.metadata.entries.len(),
            "manifest": self.manifest.len(),
            "spine": self.spine.len(),
        });
        if recursive {
            if let Some(map) = obj.as_object_mut() {
                map.insert(
                    "metadata".to_string(),
                    serde_json::Value::Array(
                        self.metadata
                            .entries
                            .iter()
                            .map(|metadatum| {
                                json!({
                                    "term": metadatum.term,
                                    "text": metadatum.text,
                                    "id": metadatum.id,
                                    "refines": metadatum.refines,
                                })
                            })
                            .collect(),
                    ),
                );
                map.insert(
                    "manifest".to_string(),
                    serde_json::Value::Array(
                        self.manifest
                            .items()
                            .iter()
                            .map(|item| {
                                json!({
                                    "id": item.id,
                                    "href": item.href,
                                    "internal_path": item.internal_path,
                                    "media_type": item.media_type,
                                    "properties": item.properties,
                                })
                            })
                            .collect(),
                    ),
                );
                map.insert(
                    "spine".to_string(),
                    serde_json::Value::Array(
                        self.spine
                            .itemrefs
                            .iter()
                            .map(|itemref| {
                                json!({
                                    "idref": itemref.idref,
                                    "linear": itemref.linear,
                                })
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

    const PACKAGE_XML: &str = r##"<?xml version="1.0"?>
<package xmlns="http://www.idpf.org/2007/opf" version="3.0" unique-identifier="pub-id">
<metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
<dc:identifier id="pub-id">urn:uuid:1111-2222</dc:identifier>
<dc:title>测试书籍</dc:title>
<dc:language>zh-CN</dc:language>
<meta property="dcterms:modified">2014-06-01T12:00:00Z</meta>
<meta refines="#pub-id" property="identifier-type" scheme="onix:codelist5">22</meta>
</metadata>
<manifest>
<item id="nav" href="nav.xhtml" media-type="application/xhtml+xml" properties="nav"/>
<item id="ncx" href="toc.ncx" media-type="application/x-dtbncx+xml"/>
<item id="cover" href="images/cover.png" media-type="image/png" properties="cover-image"/>
<item id="c1" href="text/ch1.xhtml" media-type="application/xhtml+xml"/>
<item id="c2" href="text/ch2.xhtml" media-type="application/xhtml+xml"/>
<item id="smil1" href="smil/ch1.smil" media-type="application/smil+xml"/>
</manifest>
<spine toc="ncx">
<itemref idref="c1"/>
<itemref idref="cover-page" linear="no"/>
<itemref idref="c2"/>
</spine>
</package>"##;

    fn parse() -> PackageDocument {
        PackageDocument::parse_xml(PACKAGE_XML, "OEBPS/content.opf").expect("解析包文档失败")
    }

    #[test]
    fn test_basic_structure() {
        let package = parse();
        assert_eq!(package.version, "3.0");
        assert_eq!(package.metadata.title(), Some("测试书籍".to_string()));
        assert_eq!(package.metadata.language(), Some("zh-CN".to_string()));
        assert_eq!(package.manifest.len(), 6);
        assert_eq!(package.spine.len(), 3);
        assert_eq!(package.spine.toc.as_deref(), Some("ncx"));
    }

    #[test]
    fn test_unique_identifier() {
        let package = parse();
        assert_eq!(
            package.unique_identifier(),
            Some("urn:uuid:1111-2222".to_string())
        );
        assert_eq!(
            package.dcterms_modified(),
            Some("2014-06-01T12:00:00Z".to_string())
        );
    }

    #[test]
    fn test_unique_identifier_unresolvable() {
        let xml = r#"<package version="2.0" unique-identifier="missing">
<metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
<dc:identifier id="other">urn:uuid:3333</dc:identifier>
</metadata>
<manifest></manifest>
<spine></spine>
</package>"#;
        let package = PackageDocument::parse_xml(xml, "content.opf").unwrap();
        // 引用无法解析时返回None而不是错误
        assert_eq!(package.unique_identifier(), None);
    }

    #[test]
    fn test_refines_metadata() {
        let package = parse();
        let refinements = package.metadata.refinements_of("pub-id");
        assert_eq!(refinements.len(), 1);
        assert_eq!(refinements[0].term, "identifier-type");
        assert_eq!(refinements[0].text, "22");
        assert_eq!(refinements[0].scheme.as_deref(), Some("onix:codelist5"));
    }

    #[test]
    fn test_internal_paths() {
        let package = parse();
        // 清单href相对包文档所在目录解析
        assert_eq!(
            package.internal_path_nav_document(),
            Some("OEBPS/nav.xhtml".to_string())
        );
        assert_eq!(
            package.internal_path_ncx_toc(),
            Some("OEBPS/toc.ncx".to_string())
        );
        assert_eq!(
            package.internal_path_cover_image(),
            Some("OEBPS/images/cover.png".to_string())
        );
    }

    #[test]
    fn test_cover_image_epub2_fallback() {
        let xml = r#"<package version="2.0" unique-identifier="id">
<metadata>
<meta name="cover" content="cover-img"/>
</metadata>
<manifest>
<item id="cover-img" href="images/cover.jpg" media-type="image/jpeg"/>
</manifest>
<spine></spine>
</package>"#;
        let package = PackageDocument::parse_xml(xml, "OPS/package.opf").unwrap();
        assert_eq!(
            package.internal_path_cover_image(),
            Some("OPS/images/cover.jpg".to_string())
        );
    }

    #[test]
    fn test_spine_indexes() {
        let package = parse();
        assert_eq!(
            package.spine_index_by_internal_path("OEBPS/text/ch1.xhtml"),
            Some(0)
        );
        // cover-page条目不在清单中，ch2位于脊柱第2位
        assert_eq!(
            package.spine_index_by_internal_path("OEBPS/text/ch2.xhtml"),
            Some(2)
        );
        // 只计线性条目时ch2位于第1位
        assert_eq!(
            package.spine_linear_index_by_internal_path("OEBPS/text/ch2.xhtml"),
            Some(1)
        );
        assert_eq!(package.spine_index_by_internal_path("missing.xhtml"), None);
        assert_eq!(
            package.spine_linear_index_by_internal_path("missing.xhtml"),
            None
        );
    }

    #[test]
    fn test_filtered_files() {
        let package = parse();
        assert_eq!(package.files_referenced_manifest().len(), 6);
        // 脊柱中cover-page无法解析，只剩两个文件
        assert_eq!(
            package.files_referenced_spine(),
            vec!["OEBPS/text/ch1.xhtml", "OEBPS/text/ch2.xhtml"]
        );
        assert_eq!(package.files_referenced_spine_linear().len(), 2);
        assert_eq!(package.manifest.mo_document_items().len(), 1);
        assert_eq!(package.manifest.image_items().len(), 1);
    }
}
