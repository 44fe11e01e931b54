use std::io;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, EpubError>;

/// Epub解析相关的错误类型
///
/// 只有结构性缺陷(mimetype或container.xml缺失、没有任何Rendition、
/// 必需的包文档缺失或损坏)会从Publication解析中返回；
/// 可选文件的错误在流水线层被降级为警告。
#[derive(Error, Debug)]
pub enum EpubError {
    #[error("IO错误: {0}")]
    Io(#[from] io::Error),

    #[error("Zip文件错误: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("XML解析错误: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("路径不存在或无法读取: {0}")]
    LocationNotFound(String),

    #[error("缺少mimetype文件")]
    MissingMimetype,

    #[error("缺少META-INF/container.xml文件")]
    MissingContainer,

    #[error("container.xml解析错误: {0}")]
    ContainerParse(String),

    #[error("包文档解析错误: {0}")]
    PackageParse(String),

    #[error("导航文档解析错误: {0}")]
    NavParse(String),

    #[error("NCX文件解析错误: {0}")]
    NcxParse(String),

    #[error("媒体叠加文档解析错误: {0}")]
    OverlayParse(String),

    #[error("encryption.xml解析错误: {0}")]
    EncryptionParse(String),

    #[error("Rendition映射文档解析错误: {0}")]
    MappingParse(String),

    #[error("metadata.xml解析错误: {0}")]
    MetadataParse(String),

    #[error("配置文件错误: {0}")]
    ConfigError(String),
}
