//! 媒体叠加模块
//!
//! 解析SMIL媒体叠加文档：由顺序容器与并行容器组成的树，
//! 叶节点把内容文档中的文本片段引用与音频剪辑引用配对。

use crate::epub::error::{EpubError, Result};
use crate::epub::export::JsonExport;
use crate::epub::path;
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use serde_json::json;

/// 文本片段引用
#[derive(Debug, Clone)]
pub struct SmilText {
    /// 内容文档的规范内部路径
    pub src: String,
    /// 片段标识符
    pub fragment: Option<String>,
}

/// 音频剪辑引用
#[derive(Debug, Clone)]
pub struct SmilAudio {
    /// 音频文件的规范内部路径
    pub src: String,
    /// 剪辑起点
    pub clip_begin: Option<String>,
    /// 剪辑终点
    pub clip_end: Option<String>,
}

/// 并行容器，把文本与音频配对
#[derive(Debug, Clone, Default)]
pub struct SmilPar {
    /// 文本片段引用
    pub text: Option<SmilText>,
    /// 音频剪辑引用
    pub audio: Option<SmilAudio>,
}

/// 媒体叠加树节点
#[derive(Debug, Clone)]
pub enum SmilNode {
    /// 顺序容器
    Seq(Vec<SmilNode>),
    /// 并行容器
    Par(SmilPar),
}

/// 媒体叠加文档解析结果
#[derive(Debug, Clone)]
pub struct MediaOverlay {
    /// 文档自身的规范内部路径
    pub internal_path: String,
    /// body中的顶层节点序列
    pub body: Vec<SmilNode>,
}

impl MediaOverlay {
    /// 解析媒体叠加文档内容
    ///
    /// # 参数
    /// * `xml_content` - SMIL文档的XML内容
    /// * `internal_path` - 文档自身的规范内部路径，用于解析src引用
    ///
    /// # 返回值
    /// * `Result<MediaOverlay>` - 解析后的媒体叠加信息
    pub fn parse_xml(xml_content: &str, internal_path: &str) -> Result<MediaOverlay> {
        let mut reader = Reader::from_str(xml_content);
        reader.config_mut().trim_text(true);
        reader.config_mut().expand_empty_elements = true;

        let mut buf = Vec::new();
        // 栈底帧对应body，seq每嵌套一层压入一帧
        let mut frames: Vec<Vec<SmilNode>> = vec![Vec::new()];
        let mut current_par: Option<SmilPar> = None;

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(ref e) => match e.local_name().as_ref() {
                    b"seq" => frames.push(Vec::new()),
                    b"par" => current_par = Some(SmilPar::default()),
                    b"text" => {
                        if let Some(ref mut par) = current_par {
                            par.text = Self::parse_text(e, internal_path)?;
                        }
                    }
                    b"audio" => {
                        if let Some(ref mut par) = current_par {
                            par.audio = Self::parse_audio(e, internal_path)?;
                        }
                    }
                    _ => {}
                },
                Event::End(ref e) => match e.local_name().as_ref() {
                    b"seq" => {
                        if frames.len() > 1 {
                            let children = frames.pop().unwrap_or_default();
                            if let Some(top) = frames.last_mut() {
                                top.push(SmilNode::Seq(children));
                            }
                        }
                    }
                    b"par" => {
                        if let Some(par) = current_par.take() {
                            if let Some(top) = frames.last_mut() {
                                top.push(SmilNode::Par(par));
                            }
                        }
                    }
                    _ => {}
                },
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        let body = frames.pop().unwrap_or_default();
        if body.is_empty() {
            return Err(EpubError::OverlayParse(
                "文档中没有任何seq或par元素".to_string(),
            ));
        }

        Ok(MediaOverlay {
            internal_path: internal_path.to_string(),
            body,
        })
    }

    /// 解析text元素
    fn parse_text(e: &BytesStart, internal_path: &str) -> Result<Option<SmilText>> {
        for attr_result in e.attributes() {
            let attr = attr_result
                .map_err(|err| EpubError::Xml(quick_xml::Error::InvalidAttr(err)))?;
            if attr.key.local_name().as_ref() == b"src" {
                let src = String::from_utf8_lossy(&attr.value).to_string();
                let (_, fragment) = path::split_fragment(&src);
                return Ok(Some(SmilText {
                    fragment: fragment.map(str::to_string),
                    src: path::norm_join_parent(internal_path, &src),
                }));
            }
        }
        Ok(None)
    }

    /// 解析audio元素
    fn parse_audio(e: &BytesStart, internal_path: &str) -> Result<Option<SmilAudio>> {
        let mut src = None;
        let mut clip_begin = None;
        let mut clip_end = None;
        for attr_result in e.attributes() {
            let attr = attr_result
                .map_err(|err| EpubError::Xml(quick_xml::Error::InvalidAttr(err)))?;
            match attr.key.local_name().as_ref() {
                b"src" => {
                    src = Some(String::from_utf8_lossy(&attr.value).to_string());
                }
                b"clipBegin" => {
                    clip_begin = Some(String::from_utf8_lossy(&attr.value).to_string());
                }
                b"clipEnd" => {
                    clip_end = Some(String::from_utf8_lossy(&attr.value).to_string());
                }
                _ => {}
            }
        }
        Ok(src.map(|src| SmilAudio {
            src: path::norm_join_parent(internal_path, &src),
            clip_begin,
            clip_end,
        }))
    }

    /// 引用的全部音频文件(按出现顺序去重)
    pub fn referenced_audio_files(&self) -> Vec<String> {
        let mut files = Vec::new();
        self.visit_pars(&mut |par| {
            if let Some(audio) = &par.audio {
                if !files.contains(&audio.src) {
                    files.push(audio.src.clone());
                }
            }
        });
        files
    }

    /// 引用的全部文本片段标识符(按文档顺序去重)
    pub fn referenced_fragment_identifiers(&self) -> Vec<String> {
        let mut fragments = Vec::new();
        self.visit_pars(&mut |par| {
            if let Some(text) = &par.text {
                if let Some(fragment) = &text.fragment {
                    if !fragments.contains(fragment) {
                        fragments.push(fragment.clone());
                    }
                }
            }
        });
        fragments
    }

    /// 按所属文本文件分组的片段标识符
    ///
    /// 分组与组内成员都保持首次出现的顺序，不需要重新解析文档。
    pub fn grouped_referenced_fragment_identifiers(&self) -> Vec<(String, Vec<String>)> {
        let mut groups: Vec<(String, Vec<String>)> = Vec::new();
        self.visit_pars(&mut |par| {
            let Some(text) = &par.text else {
                return;
            };
            let Some(fragment) = &text.fragment else {
                return;
            };
            match groups.iter_mut().find(|(src, _)| src == &text.src) {
                Some((_, members)) => {
                    if !members.contains(fragment) {
                        members.push(fragment.clone());
                    }
                }
                None => groups.push((text.src.clone(), vec![fragment.clone()])),
            }
        });
        groups
    }

    /// 以文档顺序访问所有并行容器
    fn visit_pars<F: FnMut(&SmilPar)>(&self, visit: &mut F) {
        fn walk<F: FnMut(&SmilPar)>(nodes: &[SmilNode], visit: &mut F) {
            for node in nodes {
                match node {
                    SmilNode::Par(par) => visit(par),
                    SmilNode::Seq(children) => walk(children, visit),
                }
            }
        }
        walk(&self.body, visit);
    }
}

impl JsonExport for MediaOverlay {
    fn json_object(&self, recursive: bool) -> serde_json::Value {
        if recursive {
            json!({
                "internal_path": self.internal_path,
                "referenced_audio_files": self.referenced_audio_files(),
                "referenced_fragment_identifiers": self.referenced_fragment_identifiers(),
            })
        } else {
            json!({
                "internal_path": self.internal_path,
                "referenced_audio_files": self.referenced_audio_files().len(),
                "referenced_fragment_identifiers": self.referenced_fragment_identifiers().len(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SMIL_XML: &str = r#"<?xml version="1.0"?>
<smil xmlns="http://www.w3.org/ns/SMIL" xmlns:epub="http://www.idpf.org/2007/ops" version="3.0">
<body>
<seq id="s1">
<par id="p1">
<text src="../text/ch1.xhtml#f1"/>
<audio src="../audio/ch1.mp3" clipBegin="0:00:00" clipEnd="0:00:05"/>
</par>
<par id="p2">
<text src="../text/ch1.xhtml#f2"/>
<audio src="../audio/ch1.mp3" clipBegin="0:00:05" clipEnd="0:00:10"/>
</par>
</seq>
<par id="p3">
<text src="../text/ch2.xhtml#f3"/>
<audio src="../audio/ch2.mp3"/>
</par>
</body>
</smil>"#;

    fn parse() -> MediaOverlay {
        MediaOverlay::parse_xml(SMIL_XML, "OEBPS/smil/ch1.smil").expect("解析SMIL失败")
    }

    #[test]
    fn test_tree_structure() {
        let overlay = parse();
        assert_eq!(overlay.body.len(), 2);
        match &overlay.body[0] {
            SmilNode::Seq(children) => assert_eq!(children.len(), 2),
            SmilNode::Par(_) => panic!("第一个节点应为seq"),
        }
    }

    #[test]
    fn test_referenced_audio_files() {
        let overlay = parse();
        // 同一音频文件只出现一次，顺序按首次出现
        assert_eq!(
            overlay.referenced_audio_files(),
            vec!["OEBPS/audio/ch1.mp3", "OEBPS/audio/ch2.mp3"]
        );
    }

    #[test]
    fn test_referenced_fragment_identifiers() {
        let overlay = parse();
        assert_eq!(
            overlay.referenced_fragment_identifiers(),
            vec!["f1", "f2", "f3"]
        );
    }

    #[test]
    fn test_grouped_fragment_identifiers() {
        let overlay = parse();
        let grouped = overlay.grouped_referenced_fragment_identifiers();
        assert_eq!(grouped.len(), 2);
        assert_eq!(grouped[0].0, "OEBPS/text/ch1.xhtml");
        assert_eq!(grouped[0].1, vec!["f1", "f2"]);
        assert_eq!(grouped[1].0, "OEBPS/text/ch2.xhtml");
        assert_eq!(grouped[1].1, vec!["f3"]);
    }

    #[test]
    fn test_clip_attributes() {
        let overlay = parse();
        let SmilNode::Seq(children) = &overlay.body[0] else {
            panic!("第一个节点应为seq");
        };
        let SmilNode::Par(par) = &children[0] else {
            panic!("seq的子节点应为par");
        };
        let audio = par.audio.as_ref().unwrap();
        assert_eq!(audio.clip_begin.as_deref(), Some("0:00:00"));
        assert_eq!(audio.clip_end.as_deref(), Some("0:00:05"));
    }

    #[test]
    fn test_empty_document_is_error() {
        let result = MediaOverlay::parse_xml("<smil><body></body></smil>", "a.smil");
        assert!(matches!(result, Err(EpubError::OverlayParse(_))));
    }
}
