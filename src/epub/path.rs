//! 路径解析工具模块
//!
//! 容器内所有跨文件引用(清单href、导航目标、媒体叠加的音频与文本引用、
//! Rendition映射位置)统一经由此模块解析为相对容器根的规范内部路径，
//! 以保证资源注册表的键一致。

use percent_encoding::percent_decode_str;

/// 分离引用中的片段标识符
///
/// # 返回值
/// * `(&str, Option<&str>)` - (不含片段的路径, 片段标识符)
pub fn split_fragment(reference: &str) -> (&str, Option<&str>) {
    match reference.find('#') {
        Some(pos) => (&reference[..pos], Some(&reference[pos + 1..])),
        None => (reference, None),
    }
}

/// 规范化内部路径
///
/// 折叠`.`与`..`段并去除空段。对已经规范的路径是恒等变换。
pub fn normalize(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments.join("/")
}

/// 以引用文档自身所在目录为基准解析引用
///
/// 引用相对于引用它的文档所在目录解析，而不是容器根目录。
/// 片段标识符在解析前被剥离，百分号编码被解码。
///
/// # 参数
/// * `base` - 引用所在文档的规范内部路径
/// * `reference` - 文档中出现的引用字符串
///
/// # 返回值
/// * `String` - 被引用资源的规范内部路径
pub fn norm_join_parent(base: &str, reference: &str) -> String {
    let (reference, _) = split_fragment(reference);
    let decoded = percent_decode_str(reference).decode_utf8_lossy();
    let parent = match base.rfind('/') {
        Some(pos) => &base[..pos],
        None => "",
    };
    if parent.is_empty() {
        normalize(&decoded)
    } else {
        normalize(&format!("{}/{}", parent, decoded))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_fragment() {
        assert_eq!(split_fragment("text/ch1.xhtml#p1"), ("text/ch1.xhtml", Some("p1")));
        assert_eq!(split_fragment("text/ch1.xhtml"), ("text/ch1.xhtml", None));
        assert_eq!(split_fragment("#p1"), ("", Some("p1")));
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("OEBPS/./text/ch1.xhtml"), "OEBPS/text/ch1.xhtml");
        assert_eq!(normalize("OEBPS/text/../images/cover.png"), "OEBPS/images/cover.png");
        assert_eq!(normalize("a//b"), "a/b");
        // 已规范的路径保持不变
        assert_eq!(normalize("OEBPS/text/ch1.xhtml"), "OEBPS/text/ch1.xhtml");
    }

    #[test]
    fn test_norm_join_parent() {
        assert_eq!(
            norm_join_parent("OEBPS/content.opf", "text/ch1.xhtml"),
            "OEBPS/text/ch1.xhtml"
        );
        assert_eq!(
            norm_join_parent("OEBPS/content.opf", "../cover.png"),
            "cover.png"
        );
        assert_eq!(norm_join_parent("content.opf", "ch1.xhtml"), "ch1.xhtml");
        // 片段标识符在解析前被剥离
        assert_eq!(
            norm_join_parent("OEBPS/nav.xhtml", "text/ch1.xhtml#p1"),
            "OEBPS/text/ch1.xhtml"
        );
        // 百分号编码被解码
        assert_eq!(
            norm_join_parent("OEBPS/content.opf", "text/ch%201.xhtml"),
            "OEBPS/text/ch 1.xhtml"
        );
    }

    #[test]
    fn test_resolution_is_idempotent() {
        let canonical = norm_join_parent("OEBPS/content.opf", "text/ch1.xhtml");
        // 以自身所在目录为基准再次解析，结果不变
        assert_eq!(norm_join_parent(&canonical, "ch1.xhtml"), canonical);
        assert_eq!(normalize(&canonical), canonical);
    }
}
