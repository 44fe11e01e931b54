//! 导航模型模块
//!
//! 把EPUB3导航文档与EPUB2的NCX目录统一到同一套导航能力之后。
//! 两种变体共享同样的树节点类型，但在地标语义上保持各自的行为：
//! NCX格式没有地标概念，查询地标得到"不适用"而不是错误。

pub mod nav_doc;
pub mod ncx;

pub use nav_doc::NavDocument;
pub use ncx::NcxToc;

use crate::epub::consts;

/// 导航树节点
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TocNode {
    /// 显示标签
    pub label: String,
    /// 目标内容文档的规范内部路径
    pub target: Option<String>,
    /// 目标中的片段标识符
    pub fragment: Option<String>,
    /// 子节点
    pub children: Vec<TocNode>,
}

impl TocNode {
    /// 创建新的导航节点
    pub fn new(label: String) -> Self {
        Self {
            label,
            target: None,
            fragment: None,
            children: Vec::new(),
        }
    }

    /// 树的最大深度
    pub fn depth(&self) -> u32 {
        1 + self
            .children
            .iter()
            .map(|child| child.depth())
            .max()
            .unwrap_or(0)
    }

    /// 平铺得到包括自身在内的所有节点
    pub fn flatten(&self) -> Vec<&TocNode> {
        let mut nodes = vec![self];
        for child in &self.children {
            nodes.extend(child.flatten());
        }
        nodes
    }
}

/// 语义地标
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Landmark {
    /// epub:type声明的语义角色
    pub epub_type: String,
    /// 显示标签
    pub label: String,
    /// 目标内容文档的规范内部路径
    pub target: Option<String>,
    /// 目标中的片段标识符
    pub fragment: Option<String>,
}

impl Landmark {
    /// 角色是否属于EPUB3结构语义词汇表
    pub fn is_structural(&self) -> bool {
        consts::is_structural_semantic(&self.epub_type)
    }
}

/// 统一的导航能力视图
#[derive(Debug, Clone, Copy)]
pub enum Navigation<'a> {
    /// EPUB3导航文档
    Nav(&'a NavDocument),
    /// EPUB2的NCX目录
    Ncx(&'a NcxToc),
}

impl<'a> Navigation<'a> {
    /// 目录树的顶层节点列表
    pub fn table_of_contents(&self) -> &'a [TocNode] {
        match self {
            Navigation::Nav(nav) => &nav.toc,
            Navigation::Ncx(ncx) => &ncx.nav_points,
        }
    }

    /// 地标列表
    ///
    /// NCX格式没有地标概念，返回`None`表示"不适用"；
    /// 导航文档中地标为空时返回`Some`空切片，两者含义不同。
    pub fn landmarks(&self) -> Option<&'a [Landmark]> {
        match self {
            Navigation::Nav(nav) => Some(&nav.landmarks),
            Navigation::Ncx(_) => None,
        }
    }
}
