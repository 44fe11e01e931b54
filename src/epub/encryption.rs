//! 加密与混淆模块
//!
//! 解析META-INF/encryption.xml，按算法标识符把受影响的资源
//! 归入Adobe或IDPF两个互斥的混淆集合。实际解密不在处理范围内，
//! 这里只记录混淆归属以及推导密钥所需的素材。

use crate::epub::consts;
use crate::epub::error::{EpubError, Result};
use crate::epub::export::JsonExport;
use crate::epub::path;
use quick_xml::events::Event;
use quick_xml::reader::Reader;
use serde_json::json;

/// 字体混淆算法
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObfuscationScheme {
    /// Adobe混淆算法
    Adobe,
    /// IDPF混淆算法
    Idpf,
}

impl ObfuscationScheme {
    /// 算法标识符
    pub fn algorithm(&self) -> &'static str {
        match self {
            ObfuscationScheme::Adobe => consts::ALGORITHM_ADOBE,
            ObfuscationScheme::Idpf => consts::ALGORITHM_IDPF,
        }
    }

    /// 从出版物唯一标识符推导混淆密钥字节
    ///
    /// 两种算法都由唯一标识符确定性推导，字节推导方式各不相同：
    /// IDPF对去除空白后的标识符做SHA-1摘要；
    /// Adobe取标识符中UUID的十六进制数字解码为16字节。
    pub fn derive_key(&self, unique_identifier: &str) -> Vec<u8> {
        match self {
            ObfuscationScheme::Idpf => {
                let stripped: String = unique_identifier
                    .chars()
                    .filter(|c| !c.is_whitespace())
                    .collect();
                sha1_smol::Sha1::from(stripped.as_bytes())
                    .digest()
                    .bytes()
                    .to_vec()
            }
            ObfuscationScheme::Adobe => {
                let hex: String = unique_identifier
                    .trim()
                    .trim_start_matches("urn:uuid:")
                    .chars()
                    .filter(|c| c.is_ascii_hexdigit())
                    .collect();
                hex.as_bytes()
                    .chunks(2)
                    .filter(|pair| pair.len() == 2)
                    .filter_map(|pair| {
                        let high = (pair[0] as char).to_digit(16)?;
                        let low = (pair[1] as char).to_digit(16)?;
                        Some((high * 16 + low) as u8)
                    })
                    .collect()
            }
        }
    }

    /// 算法名称
    pub fn as_str(&self) -> &'static str {
        match self {
            ObfuscationScheme::Adobe => "adobe",
            ObfuscationScheme::Idpf => "idpf",
        }
    }
}

/// encryption.xml的解析结果
#[derive(Debug, Clone, Default)]
pub struct Encryption {
    /// 以Adobe算法混淆的资源内部路径
    pub adobe_obfuscated_assets: Vec<String>,
    /// 以IDPF算法混淆的资源内部路径
    pub idpf_obfuscated_assets: Vec<String>,
}

impl Encryption {
    /// 解析encryption.xml内容
    ///
    /// 每个EncryptedData条目由其EncryptionMethod的Algorithm标识符分类；
    /// 两个集合互斥，不认识的算法(一般加密，而非混淆)被忽略。
    ///
    /// # 参数
    /// * `xml_content` - encryption.xml的文件内容
    ///
    /// # 返回值
    /// * `Result<Encryption>` - 解析后的混淆集合
    pub fn parse_xml(xml_content: &str) -> Result<Encryption> {
        let mut reader = Reader::from_str(xml_content);
        reader.config_mut().trim_text(true);
        reader.config_mut().expand_empty_elements = true;

        let mut encryption = Encryption::default();
        let mut buf = Vec::new();
        let mut current_algorithm: Option<String> = None;
        let mut current_uri: Option<String> = None;
        let mut saw_root = false;

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(ref e) | Event::Empty(ref e) => match e.local_name().as_ref() {
                    b"encryption" => {
                        saw_root = true;
                    }
                    b"EncryptedData" => {
                        current_algorithm = None;
                        current_uri = None;
                    }
                    b"EncryptionMethod" => {
                        for attr_result in e.attributes() {
                            let attr = attr_result.map_err(|err| {
                                EpubError::Xml(quick_xml::Error::InvalidAttr(err))
                            })?;
                            if attr.key.local_name().as_ref() == b"Algorithm" {
                                current_algorithm =
                                    Some(String::from_utf8_lossy(&attr.value).to_string());
                            }
                        }
                    }
                    b"CipherReference" => {
                        for attr_result in e.attributes() {
                            let attr = attr_result.map_err(|err| {
                                EpubError::Xml(quick_xml::Error::InvalidAttr(err))
                            })?;
                            if attr.key.local_name().as_ref() == b"URI" {
                                current_uri =
                                    Some(String::from_utf8_lossy(&attr.value).to_string());
                            }
                        }
                    }
                    _ => {}
                },
                Event::End(ref e) => {
                    if e.local_name().as_ref() == b"EncryptedData" {
                        if let (Some(algorithm), Some(uri)) =
                            (current_algorithm.take(), current_uri.take())
                        {
                            encryption.classify(&algorithm, &uri);
                        }
                    }
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        if !saw_root {
            return Err(EpubError::EncryptionParse(
                "没有找到encryption根元素".to_string(),
            ));
        }

        Ok(encryption)
    }

    /// 按算法标识符归类一条混淆声明
    fn classify(&mut self, algorithm: &str, uri: &str) {
        let internal_path = path::normalize(uri);
        // 同一路径只属于一个集合
        if self.scheme_for(&internal_path).is_some() {
            return;
        }
        match algorithm {
            consts::ALGORITHM_ADOBE => self.adobe_obfuscated_assets.push(internal_path),
            consts::ALGORITHM_IDPF => self.idpf_obfuscated_assets.push(internal_path),
            _ => {}
        }
    }

    /// 查询指定内部路径的混淆算法
    pub fn scheme_for(&self, internal_path: &str) -> Option<ObfuscationScheme> {
        if self.adobe_obfuscated_assets.iter().any(|p| p == internal_path) {
            return Some(ObfuscationScheme::Adobe);
        }
        if self.idpf_obfuscated_assets.iter().any(|p| p == internal_path) {
            return Some(ObfuscationScheme::Idpf);
        }
        None
    }
}

impl JsonExport for Encryption {
    fn json_object(&self, recursive: bool) -> serde_json::Value {
        if recursive {
            json!({
                "adobe_obfuscated_assets": self.adobe_obfuscated_assets,
                "idpf_obfuscated_assets": self.idpf_obfuscated_assets,
            })
        } else {
            json!({
                "adobe_obfuscated_assets": self.adobe_obfuscated_assets.len(),
                "idpf_obfuscated_assets": self.idpf_obfuscated_assets.len(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ENCRYPTION_XML: &str = r#"<?xml version="1.0"?>
<encryption xmlns="urn:oasis:names:tc:opendocument:xmlns:container"
            xmlns:enc="http://www.w3.org/2001/04/xmlenc#">
    <enc:EncryptedData>
        <enc:EncryptionMethod Algorithm="http://ns.adobe.com/pdf/enc#RC"/>
        <enc:CipherData>
            <enc:CipherReference URI="OEBPS/fonts/adobe.ttf"/>
        </enc:CipherData>
    </enc:EncryptedData>
    <enc:EncryptedData>
        <enc:EncryptionMethod Algorithm="http://www.idpf.org/2008/embedding"/>
        <enc:CipherData>
            <enc:CipherReference URI="OEBPS/fonts/idpf.ttf"/>
        </enc:CipherData>
    </enc:EncryptedData>
    <enc:EncryptedData>
        <enc:EncryptionMethod Algorithm="http://www.w3.org/2001/04/xmlenc#aes128-cbc"/>
        <enc:CipherData>
            <enc:CipherReference URI="OEBPS/secret.xhtml"/>
        </enc:CipherData>
    </enc:EncryptedData>
</encryption>"#;

    #[test]
    fn test_parse_encryption_xml() {
        let encryption = Encryption::parse_xml(ENCRYPTION_XML).unwrap();

        assert_eq!(encryption.adobe_obfuscated_assets, vec!["OEBPS/fonts/adobe.ttf"]);
        assert_eq!(encryption.idpf_obfuscated_assets, vec!["OEBPS/fonts/idpf.ttf"]);
        // 不认识的算法不属于混淆
        assert_eq!(encryption.scheme_for("OEBPS/secret.xhtml"), None);
        assert_eq!(
            encryption.scheme_for("OEBPS/fonts/adobe.ttf"),
            Some(ObfuscationScheme::Adobe)
        );
    }

    #[test]
    fn test_missing_root_is_error() {
        let result = Encryption::parse_xml("<signatures></signatures>");
        assert!(matches!(result, Err(EpubError::EncryptionParse(_))));
    }

    #[test]
    fn test_obfuscation_sets_are_disjoint() {
        let encryption = Encryption::parse_xml(ENCRYPTION_XML).unwrap();
        for internal_path in &encryption.adobe_obfuscated_assets {
            assert!(!encryption.idpf_obfuscated_assets.contains(internal_path));
        }
    }

    #[test]
    fn test_derive_key_idpf() {
        let key = ObfuscationScheme::Idpf.derive_key("urn:uuid:1234 5678");
        // SHA-1摘要固定为20字节，空白在摘要前被去除
        assert_eq!(key.len(), 20);
        assert_eq!(key, ObfuscationScheme::Idpf.derive_key("urn:uuid:12345678"));
    }

    #[test]
    fn test_derive_key_adobe() {
        let key =
            ObfuscationScheme::Adobe.derive_key("urn:uuid:83136816-fa25-11e2-93d4-001cc0a62c0b");
        assert_eq!(key.len(), 16);
        assert_eq!(key[0], 0x83);
        assert_eq!(key[1], 0x13);
    }
}
