pub mod asset;
pub mod consts;
pub mod container;
pub mod encryption;
pub mod error;
pub mod export;
pub mod mapping;
pub mod metadata;
pub mod nav;
pub mod options;
pub mod overlay;
pub mod package;
pub mod path;
pub mod publication;
pub mod store;

// 重新导出错误处理
pub use error::{EpubError, Result};

// 重新导出Publication与解析选项
pub use options::ParseOptions;
pub use publication::{Manifestation, Publication};

// 重新导出资源相关
pub use asset::Asset;
pub use store::AssetStore;

// 重新导出容器相关
pub use container::{Container, Rendition};
pub use metadata::MetadataDocument;

// 重新导出包文档相关
pub use package::{Manifest, ManifestItem, Metadatum, PackageDocument, PackageMetadata, Spine, SpineItem};

// 重新导出导航相关
pub use nav::{Landmark, NavDocument, Navigation, NcxToc, TocNode};

// 重新导出媒体叠加、加密与映射
pub use encryption::{Encryption, ObfuscationScheme};
pub use mapping::{MappingLocation, MappingPoint, RenditionMapping};
pub use overlay::{MediaOverlay, SmilAudio, SmilNode, SmilPar, SmilText};

// 重新导出结构化导出能力
pub use export::JsonExport;
