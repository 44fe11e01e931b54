//! 解析选项模块
//!
//! 控制Publication装配流水线中各可选阶段的开关。
//! 多Rendition支持与媒体叠加解析默认关闭，
//! 以保持单Rendition快速解析的兼容行为；其余阶段默认开启。

use crate::epub::error::{EpubError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

fn default_on() -> bool {
    true
}

/// Publication解析选项
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParseOptions {
    /// 是否为manifest中的每个条目注册资源引用
    #[serde(default = "default_on")]
    pub asset_refs: bool,
    /// 是否解析META-INF/encryption.xml
    #[serde(default = "default_on")]
    pub encryption: bool,
    /// 是否解析导航文档
    #[serde(default = "default_on")]
    pub nav: bool,
    /// 是否解析NCX目录
    #[serde(default = "default_on")]
    pub ncx: bool,
    /// 是否解析媒体叠加文档(SMIL)
    #[serde(default)]
    pub media_overlay: bool,
    /// 是否解析META-INF/metadata.xml与全部Rendition
    #[serde(default)]
    pub multiple_renditions: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            asset_refs: true,
            encryption: true,
            nav: true,
            ncx: true,
            media_overlay: false,
            multiple_renditions: false,
        }
    }
}

impl ParseOptions {
    /// 创建默认解析选项
    pub fn new() -> Self {
        Self::default()
    }

    /// 创建开启全部阶段的解析选项
    pub fn full() -> Self {
        Self {
            asset_refs: true,
            encryption: true,
            nav: true,
            ncx: true,
            media_overlay: true,
            multiple_renditions: true,
        }
    }

    /// 从YAML配置文件加载解析选项
    ///
    /// 文件中缺省的开关采用各自的默认值。
    ///
    /// # 参数
    /// * `path` - 配置文件路径
    ///
    /// # 返回值
    /// * `Result<Self>` - 加载成功返回选项实例，失败返回`ConfigError`
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .map_err(|e| EpubError::ConfigError(format!("无法读取配置文件: {}", e)))?;
        serde_yml::from_str(&content)
            .map_err(|e| EpubError::ConfigError(format!("配置文件格式错误: {}", e)))
    }
}
