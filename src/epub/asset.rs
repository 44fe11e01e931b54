//! 资源模块
//!
//! 出版物中的每个文件对应一个Asset，以规范内部路径为唯一标识，
//! 由Publication的资源注册表独占持有。内容按需从存储后端读取，
//! 不做缓存；混淆元数据在解析encryption.xml之后回填。

use crate::epub::encryption::ObfuscationScheme;
use crate::epub::error::Result;
use crate::epub::export::JsonExport;
use crate::epub::store::AssetStore;
use serde_json::json;
use std::path::PathBuf;

/// 容器内的一个资源文件
#[derive(Debug, Clone)]
pub struct Asset {
    /// 容器所在的绝对位置(内存容器为None)
    pub absolute_path: Option<PathBuf>,
    /// 引用文档中声明的原始路径
    pub relative_path: String,
    /// 相对容器根的规范内部路径(注册表键)
    pub internal_path: String,
    /// 混淆密钥素材(出版物唯一标识符)
    pub obfuscation_key: Option<String>,
    /// 混淆算法
    pub obfuscation_algorithm: Option<ObfuscationScheme>,
}

impl Asset {
    /// 创建新的资源
    pub fn new(
        absolute_path: Option<PathBuf>,
        relative_path: String,
        internal_path: String,
    ) -> Self {
        Self {
            absolute_path,
            relative_path,
            internal_path,
            obfuscation_key: None,
            obfuscation_algorithm: None,
        }
    }

    /// 从存储后端读取资源内容
    ///
    /// 每次调用都会重新访问存储后端，不缓存结果。
    ///
    /// # 返回值
    /// * `Result<Option<Vec<u8>>>` - 内容字节，文件不存在时返回`None`
    pub fn read(&self, store: &AssetStore) -> Result<Option<Vec<u8>>> {
        store.read(&self.internal_path)
    }

    /// 是否被混淆
    pub fn is_obfuscated(&self) -> bool {
        self.obfuscation_algorithm.is_some()
    }

    /// 按所属混淆算法推导出的密钥字节
    pub fn obfuscation_key_bytes(&self) -> Option<Vec<u8>> {
        let scheme = self.obfuscation_algorithm.as_ref()?;
        let key = self.obfuscation_key.as_deref()?;
        Some(scheme.derive_key(key))
    }
}

impl JsonExport for Asset {
    fn json_object(&self, _recursive: bool) -> serde_json::Value {
        json!({
            "internal_path": self.internal_path,
            "relative_path": self.relative_path,
            "obfuscation_algorithm": self.obfuscation_algorithm.map(|scheme| scheme.as_str()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_read_from_store() {
        let mut files = HashMap::new();
        files.insert("OEBPS/ch1.xhtml".to_string(), b"<html/>".to_vec());
        let store = AssetStore::Memory(files);

        let asset = Asset::new(None, "ch1.xhtml".to_string(), "OEBPS/ch1.xhtml".to_string());
        assert_eq!(asset.read(&store).unwrap(), Some(b"<html/>".to_vec()));

        let missing = Asset::new(None, "x.png".to_string(), "OEBPS/x.png".to_string());
        assert_eq!(missing.read(&store).unwrap(), None);
    }

    #[test]
    fn test_obfuscation_key_bytes() {
        let mut asset = Asset::new(None, "f.ttf".to_string(), "OEBPS/f.ttf".to_string());
        assert!(!asset.is_obfuscated());
        assert_eq!(asset.obfuscation_key_bytes(), None);

        asset.obfuscation_key = Some("urn:uuid:1234".to_string());
        asset.obfuscation_algorithm = Some(ObfuscationScheme::Idpf);
        assert!(asset.is_obfuscated());
        let key = asset.obfuscation_key_bytes().unwrap();
        assert_eq!(key, ObfuscationScheme::Idpf.derive_key("urn:uuid:1234"));
    }
}
