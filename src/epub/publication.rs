//! Publication模块
//!
//! 出版物对象模型的根：驱动整个装配流水线，持有全局资源注册表，
//! 并在解析完成后按需计算各派生属性。解析只在构造时进行一次，
//! 此后整个对象图只读。

use crate::epub::asset::Asset;
use crate::epub::consts;
use crate::epub::container::{Container, Rendition};
use crate::epub::encryption::{Encryption, ObfuscationScheme};
use crate::epub::error::{EpubError, Result};
use crate::epub::export::JsonExport;
use crate::epub::mapping::RenditionMapping;
use crate::epub::metadata::MetadataDocument;
use crate::epub::nav::nav_doc::NavDocument;
use crate::epub::nav::ncx::NcxToc;
use crate::epub::options::ParseOptions;
use crate::epub::overlay::MediaOverlay;
use crate::epub::package::PackageDocument;
use crate::epub::path;
use crate::epub::store::AssetStore;
use serde_json::json;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

/// 出版物的存储形态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Manifestation {
    /// 内存中的虚拟容器
    Memory,
    /// 未压缩目录
    Uncompressed,
    /// ZIP压缩档
    Compressed,
}

impl Manifestation {
    /// 存储形态名称
    pub fn as_str(&self) -> &'static str {
        match self {
            Manifestation::Memory => "memory",
            Manifestation::Uncompressed => "uncompressed",
            Manifestation::Compressed => "compressed",
        }
    }
}

/// 一个EPUB出版物
#[derive(Debug)]
pub struct Publication {
    /// 来源位置(内存出版物为None)
    pub path: Option<PathBuf>,
    /// 存储形态
    pub manifestation: Manifestation,
    /// 解析选项
    pub options: ParseOptions,
    /// 资源注册表：规范内部路径 → Asset
    pub assets: HashMap<String, Asset>,
    /// 容器描述
    pub container: Option<Container>,
    /// 容器级元数据(多Rendition出版物)
    pub metadata: Option<MetadataDocument>,
    /// 加密描述
    pub encryption: Option<Encryption>,
    /// 解析过程中记录的非致命问题
    pub warnings: Vec<String>,
    store: AssetStore,
}

impl Publication {
    /// 创建空的内存出版物(不执行解析)
    pub fn new() -> Self {
        Self::empty(
            AssetStore::Memory(HashMap::new()),
            Manifestation::Memory,
            None,
            ParseOptions::default(),
        )
    }

    fn empty(
        store: AssetStore,
        manifestation: Manifestation,
        path: Option<PathBuf>,
        options: ParseOptions,
    ) -> Self {
        Self {
            path,
            manifestation,
            options,
            assets: HashMap::new(),
            container: None,
            metadata: None,
            encryption: None,
            warnings: Vec::new(),
            store,
        }
    }

    /// 从文件或目录解析出版物
    ///
    /// 路径不存在时立即返回`LocationNotFound`，与解析过程中的任何
    /// 错误相区别。目录按未压缩容器处理，其余按ZIP压缩档处理。
    ///
    /// # 参数
    /// * `path` - EPUB文件或未压缩目录的路径
    /// * `options` - 解析选项
    ///
    /// # 返回值
    /// * `Result<Publication>` - 解析后的出版物
    pub fn from_path<P: AsRef<Path>>(path: P, options: ParseOptions) -> Result<Publication> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(EpubError::LocationNotFound(path.display().to_string()));
        }
        let (store, manifestation) = if path.is_dir() {
            (
                AssetStore::Directory(path.to_path_buf()),
                Manifestation::Uncompressed,
            )
        } else {
            (
                AssetStore::Archive(path.to_path_buf()),
                Manifestation::Compressed,
            )
        };
        let mut publication =
            Self::empty(store, manifestation, Some(path.to_path_buf()), options);
        publication.parse()?;
        Ok(publication)
    }

    /// 从内存中的文件集合解析出版物
    ///
    /// # 参数
    /// * `files` - 内部路径到内容字节的映射
    /// * `options` - 解析选项
    pub fn from_memory(
        files: HashMap<String, Vec<u8>>,
        options: ParseOptions,
    ) -> Result<Publication> {
        let mut publication = Self::empty(
            AssetStore::Memory(files),
            Manifestation::Memory,
            None,
            options,
        );
        publication.parse()?;
        Ok(publication)
    }

    /// 执行装配流水线
    ///
    /// 每一步都先在注册表中登记资源，再交给对应的子解析器。
    fn parse(&mut self) -> Result<()> {
        // mimetype(必需，缺失致命；内容不正确只记录警告)
        self.register_asset(consts::INTERNAL_PATH_MIMETYPE, consts::INTERNAL_PATH_MIMETYPE);
        match self.store.read(consts::INTERNAL_PATH_MIMETYPE)? {
            Some(content) => {
                let content = String::from_utf8_lossy(&content);
                let trimmed = content.trim();
                if trimmed != consts::MEDIA_TYPE_EPUB {
                    self.warn(format!(
                        "mimetype内容不正确: 期望{}, 实际{}",
                        consts::MEDIA_TYPE_EPUB,
                        trimmed
                    ));
                }
            }
            None => return Err(EpubError::MissingMimetype),
        }

        // container.xml(必需)
        self.register_asset(
            consts::INTERNAL_PATH_CONTAINER_XML,
            consts::INTERNAL_PATH_CONTAINER_XML,
        );
        let container_xml = self
            .read_text(consts::INTERNAL_PATH_CONTAINER_XML)?
            .ok_or(EpubError::MissingContainer)?;
        self.container = Some(Container::parse_xml(&container_xml)?);

        if self.options.multiple_renditions {
            self.parse_multiple_renditions()?;
        }
        self.parse_renditions()?;
        if self.options.encryption {
            self.parse_encryption()?;
        }
        Ok(())
    }

    /// 解析META-INF/metadata.xml与Rendition映射文档(均为可选)
    fn parse_multiple_renditions(&mut self) -> Result<()> {
        let metadata_path = consts::INTERNAL_PATH_METADATA_XML;
        if let Some(content) = self.read_text(metadata_path)? {
            match MetadataDocument::parse_xml(&content) {
                Ok(document) => {
                    self.register_asset(metadata_path, metadata_path);
                    self.metadata = Some(document);
                }
                Err(e) => self.warn(format!("忽略无法解析的{}: {}", metadata_path, e)),
            }
        }

        let mapping_href = self
            .container
            .as_ref()
            .and_then(|container| container.mapping_href.clone());
        if let Some(href) = mapping_href {
            let internal_path = path::normalize(&href);
            if let Some(content) = self.read_text(&internal_path)? {
                match RenditionMapping::parse(&content, &internal_path) {
                    Ok(mapping) => {
                        self.register_asset(&href, &internal_path);
                        if let Some(container) = self.container.as_mut() {
                            container.rm_document = Some(mapping);
                        }
                    }
                    Err(e) => self.warn(format!(
                        "忽略无法解析的Rendition映射文档{}: {}",
                        internal_path, e
                    )),
                }
            }
        }
        Ok(())
    }

    /// 按选项解析全部或默认Rendition
    fn parse_renditions(&mut self) -> Result<()> {
        let count = self
            .container
            .as_ref()
            .map(|container| container.renditions.len())
            .unwrap_or(0);
        let selected = if self.options.multiple_renditions {
            count
        } else {
            count.min(1)
        };
        for index in 0..selected {
            self.parse_rendition(index)?;
        }
        Ok(())
    }

    /// 解析指定位置的Rendition
    fn parse_rendition(&mut self, index: usize) -> Result<()> {
        let Some((full_path, media_type)) = self
            .container
            .as_ref()
            .and_then(|container| container.renditions.get(index))
            .map(|rendition| (rendition.full_path.clone(), rendition.media_type.clone()))
        else {
            debug_assert!(false, "Rendition下标越界: {}", index);
            return Ok(());
        };

        // 媒体类型不是包文档的Rendition保留在列表中，但跳过解析
        if media_type != consts::MEDIA_TYPE_PACKAGE {
            self.warn(format!(
                "跳过媒体类型为{}的Rendition: {}",
                media_type, full_path
            ));
            return Ok(());
        }

        // 包文档(必需)
        let internal_path = path::normalize(&full_path);
        self.register_asset(&full_path, &internal_path);
        let package_xml = self
            .read_text(&internal_path)?
            .ok_or_else(|| EpubError::PackageParse(format!("包文档不存在: {}", internal_path)))?;
        let mut package = PackageDocument::parse_xml(&package_xml, &internal_path)?;

        // 为清单中的每个条目注册资源
        if self.options.asset_refs {
            let items: Vec<(String, String)> = package
                .manifest
                .items()
                .iter()
                .map(|item| (item.href.clone(), item.internal_path.clone()))
                .collect();
            for (href, item_internal_path) in items {
                self.register_asset(&href, &item_internal_path);
            }
        }

        // 每个Rendition至多一个导航文档
        let nav_count = package
            .manifest
            .items()
            .iter()
            .filter(|item| item.is_nav())
            .count();
        if nav_count > 1 {
            self.warn(format!(
                "{}: 清单中声明了{}个导航文档，只使用第一个",
                internal_path, nav_count
            ));
        }

        // 导航文档(可选)
        let mut nav_document = None;
        if self.options.nav {
            if let Some(nav_path) = package.internal_path_nav_document() {
                match self.read_text(&nav_path)? {
                    Some(content) => match NavDocument::parse(&content, &nav_path) {
                        Ok(parsed) => {
                            self.register_asset(&nav_path, &nav_path);
                            nav_document = Some(parsed);
                        }
                        Err(e) => {
                            self.warn(format!("忽略无法解析的导航文档{}: {}", nav_path, e))
                        }
                    },
                    None => self.warn(format!("导航文档不存在: {}", nav_path)),
                }
            }
        }

        // NCX目录(可选)
        let mut ncx_toc = None;
        if self.options.ncx {
            if let Some(ncx_path) = package.internal_path_ncx_toc() {
                match self.read_text(&ncx_path)? {
                    Some(content) => match NcxToc::parse_xml(&content, &ncx_path) {
                        Ok(parsed) => {
                            // NCX声明的标识符与包文档交叉校验，不一致只记录警告
                            if let (Some(ncx_uid), Some(package_uid)) =
                                (parsed.uid.as_deref(), package.unique_identifier())
                            {
                                if ncx_uid != package_uid {
                                    self.warn(format!(
                                        "{}: dtb:uid({})与包文档唯一标识符({})不一致",
                                        ncx_path, ncx_uid, package_uid
                                    ));
                                }
                            }
                            self.register_asset(&ncx_path, &ncx_path);
                            ncx_toc = Some(parsed);
                        }
                        Err(e) => self.warn(format!("忽略无法解析的NCX文件{}: {}", ncx_path, e)),
                    },
                    None => self.warn(format!("NCX文件不存在: {}", ncx_path)),
                }
            }
        }

        // 媒体叠加文档(可选，逐条解析，单条失败只影响该条目)
        let mut media_overlays = Vec::new();
        if self.options.media_overlay {
            let mo_items: Vec<(String, String, String)> = package
                .manifest
                .mo_document_items()
                .iter()
                .map(|item| (item.id.clone(), item.href.clone(), item.internal_path.clone()))
                .collect();
            for (item_id, href, mo_path) in mo_items {
                match self.read_text(&mo_path)? {
                    Some(content) => match MediaOverlay::parse_xml(&content, &mo_path) {
                        Ok(parsed) => {
                            self.register_asset(&href, &mo_path);
                            media_overlays.push((item_id, parsed));
                        }
                        Err(e) => self.warn(format!(
                            "忽略清单项{}的媒体叠加文档{}: {}",
                            item_id, mo_path, e
                        )),
                    },
                    None => self.warn(format!(
                        "清单项{}的媒体叠加文档不存在: {}",
                        item_id, mo_path
                    )),
                }
            }
        }

        // 脊柱条目必须指向存在的清单项，无法解析的条目被丢弃
        let known_ids: HashSet<String> = package
            .manifest
            .items()
            .iter()
            .map(|item| item.id.clone())
            .collect();
        let unresolved: Vec<String> = package
            .spine
            .itemrefs
            .iter()
            .filter(|itemref| !known_ids.contains(&itemref.idref))
            .map(|itemref| itemref.idref.clone())
            .collect();
        if !unresolved.is_empty() {
            for idref in &unresolved {
                self.warn(format!(
                    "{}: 脊柱条目引用了不存在的清单项: {}",
                    internal_path, idref
                ));
            }
            package
                .spine
                .itemrefs
                .retain(|itemref| known_ids.contains(&itemref.idref));
        }

        let Some(rendition) = self
            .container
            .as_mut()
            .and_then(|container| container.renditions.get_mut(index))
        else {
            debug_assert!(false, "Rendition在解析过程中消失: {}", index);
            return Ok(());
        };
        rendition.package = Some(package);
        rendition.nav_document = nav_document;
        rendition.ncx_toc = ncx_toc;
        rendition.media_overlays = media_overlays;
        Ok(())
    }

    /// 解析META-INF/encryption.xml并把混淆元数据回填到已注册的资源上
    fn parse_encryption(&mut self) -> Result<()> {
        let encryption_path = consts::INTERNAL_PATH_ENCRYPTION_XML;
        let Some(content) = self.read_text(encryption_path)? else {
            return Ok(());
        };
        let encryption = match Encryption::parse_xml(&content) {
            Ok(parsed) => parsed,
            Err(e) => {
                self.warn(format!("忽略无法解析的{}: {}", encryption_path, e));
                return Ok(());
            }
        };
        self.register_asset(encryption_path, encryption_path);

        // 混淆密钥素材是此刻已经解析出的出版物唯一标识符
        let key = self.unique_identifier();
        for internal_path in &encryption.adobe_obfuscated_assets {
            if let Some(asset) = self.assets.get_mut(internal_path) {
                asset.obfuscation_key = key.clone();
                asset.obfuscation_algorithm = Some(ObfuscationScheme::Adobe);
            }
        }
        for internal_path in &encryption.idpf_obfuscated_assets {
            if let Some(asset) = self.assets.get_mut(internal_path) {
                asset.obfuscation_key = key.clone();
                asset.obfuscation_algorithm = Some(ObfuscationScheme::Idpf);
            }
        }
        self.encryption = Some(encryption);
        Ok(())
    }

    /// 在注册表中登记一个资源
    ///
    /// 注册表是资源的唯一所有者，其他组件只持有内部路径作为查找键。
    fn register_asset(&mut self, relative_path: &str, internal_path: &str) {
        if !self.assets.contains_key(internal_path) {
            self.assets.insert(
                internal_path.to_string(),
                Asset::new(
                    self.path.clone(),
                    relative_path.to_string(),
                    internal_path.to_string(),
                ),
            );
        }
    }

    /// 记录一条非致命问题
    fn warn(&mut self, message: String) {
        self.warnings.push(message);
    }

    /// 读取并以UTF-8解码指定资源
    fn read_text(&self, internal_path: &str) -> Result<Option<String>> {
        Ok(self
            .store
            .read(internal_path)?
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned()))
    }

    /// 查询注册表中的资源
    pub fn asset(&self, internal_path: &str) -> Option<&Asset> {
        self.assets.get(internal_path)
    }

    /// 读取指定内部路径的资源内容
    ///
    /// 每次调用都会重新访问存储后端，不缓存结果。
    pub fn asset_contents(&self, internal_path: &str) -> Result<Option<Vec<u8>>> {
        self.store.read(internal_path)
    }

    /// 默认Rendition
    pub fn default_rendition(&self) -> Option<&Rendition> {
        self.container.as_ref()?.default_rendition()
    }

    /// 默认Rendition的包文档
    fn default_package(&self) -> Option<&PackageDocument> {
        self.default_rendition()?.package.as_ref()
    }

    /// EPUB版本(默认Rendition包文档声明的version属性)
    ///
    /// 任一环节缺失时返回`None`。
    pub fn version(&self) -> Option<String> {
        self.default_package().map(|package| package.version.clone())
    }

    /// 出版物的唯一标识符
    ///
    /// 优先取容器级metadata.xml声明的标识符(多Rendition出版物)，
    /// 其次取默认Rendition包文档声明的标识符。
    pub fn unique_identifier(&self) -> Option<String> {
        if let Some(metadata) = &self.metadata {
            if let Some(identifier) = metadata.unique_identifier() {
                return Some(identifier);
            }
        }
        self.default_package()?.unique_identifier()
    }

    /// 出版物的最后修改时间
    ///
    /// 优先取容器级metadata.xml的时间戳，其次取默认Rendition自身的
    /// dcterms:modified元数据。
    pub fn dcterms_modified(&self) -> Option<String> {
        if let Some(metadata) = &self.metadata {
            if let Some(modified) = &metadata.dcterms_modified {
                return Some(modified.clone());
            }
        }
        self.default_package()?.dcterms_modified()
    }

    /// 出版物的Release Identifier
    ///
    /// 存在容器级metadata.xml时使用其预先计算的值；否则为唯一标识符
    /// 与修改时间以`@`连接的结果；没有修改时间时即为唯一标识符本身。
    /// 最终值中的所有空白字符都会被去除。
    pub fn release_identifier(&self) -> Option<String> {
        let mut raw = self.unique_identifier();
        if let Some(metadata) = &self.metadata {
            if let Some(release) = metadata.release_identifier() {
                raw = Some(release);
            }
        } else if let (Some(unique_identifier), Some(modified)) =
            (raw.clone(), self.dcterms_modified())
        {
            raw = Some(format!("{}@{}", unique_identifier, modified));
        }
        raw.map(|value| value.chars().filter(|c| !c.is_whitespace()).collect())
    }

    /// 封面图片的规范内部路径
    pub fn internal_path_cover_image(&self) -> Option<String> {
        self.default_package()?.internal_path_cover_image()
    }

    /// 出版物的字节大小
    ///
    /// 压缩档为档案文件的大小，目录为其中所有文件大小的递归总和，
    /// 内存出版物没有大小概念，返回`None`。
    pub fn size(&self) -> Option<u64> {
        self.store.size()
    }
}

impl Default for Publication {
    fn default() -> Self {
        Self::new()
    }
}

impl JsonExport for Publication {
    fn json_object(&self, recursive: bool) -> serde_json::Value {
        let mut obj = json!({
            "manifestation": self.manifestation.as_str(),
            "size": self.size(),
            "path": self.path.as_ref().map(|path| path.display().to_string()),
            "release_identifier": self.release_identifier(),
            "unique_identifier": self.unique_identifier(),
            "assets": self.assets.len(),
            "warnings": self.warnings,
        });
        if recursive {
            if let Some(map) = obj.as_object_mut() {
                map.insert(
                    "metadata".to_string(),
                    self.metadata
                        .as_ref()
                        .map(|metadata| metadata.json_object(true))
                        .unwrap_or(serde_json::Value::Null),
                );
                map.insert(
                    "container".to_string(),
                    self.container
                        .as_ref()
                        .map(|container| container.json_object(true))
                        .unwrap_or(serde_json::Value::Null),
                );
                map.insert(
                    "encryption".to_string(),
                    self.encryption
                        .as_ref()
                        .map(|encryption| encryption.json_object(true))
                        .unwrap_or(serde_json::Value::Null),
                );
            }
        }
        obj
    }
}
