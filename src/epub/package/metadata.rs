//! 包文档元数据模块
//!
//! 以声明顺序保存包文档中的元数据条目。条目允许重复，
//! 并通过refines指针把细化信息关联到被细化的条目
//! (例如把时长或修改时间挂到某条具体元数据上)。

/// 一条元数据
#[derive(Debug, Clone)]
pub struct Metadatum {
    /// 带命名空间前缀的词项(如"dc:identifier"、"dcterms:modified"或EPUB2的name值)
    pub term: String,
    /// 文本内容
    pub text: String,
    /// 元素id
    pub id: Option<String>,
    /// 被细化条目的id(不含#前缀)
    pub refines: Option<String>,
    /// scheme属性
    pub scheme: Option<String>,
}

impl Metadatum {
    /// 创建新的元数据条目
    pub fn new(term: String, text: String) -> Self {
        Self {
            term,
            text,
            id: None,
            refines: None,
            scheme: None,
        }
    }
}

/// 包文档的元数据集合
#[derive(Debug, Clone, Default)]
pub struct PackageMetadata {
    /// 按文档顺序排列的元数据条目
    pub entries: Vec<Metadatum>,
}

impl PackageMetadata {
    /// 创建空的元数据集合
    pub fn new() -> Self {
        Self::default()
    }

    /// 添加一条元数据
    pub fn push(&mut self, metadatum: Metadatum) {
        self.entries.push(metadatum);
    }

    /// 按词项查找全部条目
    pub fn by_term(&self, term: &str) -> Vec<&Metadatum> {
        self.entries
            .iter()
            .filter(|metadatum| metadatum.term == term)
            .collect()
    }

    /// 按元素id查找条目
    pub fn by_id(&self, id: &str) -> Option<&Metadatum> {
        self.entries
            .iter()
            .find(|metadatum| metadatum.id.as_deref() == Some(id))
    }

    /// 查找细化指定条目的全部元数据
    pub fn refinements_of(&self, id: &str) -> Vec<&Metadatum> {
        self.entries
            .iter()
            .filter(|metadatum| metadatum.refines.as_deref() == Some(id))
            .collect()
    }

    /// 出版物级的dcterms:modified时间戳
    ///
    /// 只取不带refines的顶层条目，挂在其他条目上的修改时间不算。
    pub fn dcterms_modified(&self) -> Option<String> {
        self.entries
            .iter()
            .find(|metadatum| metadatum.term == "dcterms:modified" && metadatum.refines.is_none())
            .map(|metadatum| metadatum.text.clone())
    }

    /// 标题(第一条dc:title)
    pub fn title(&self) -> Option<String> {
        self.by_term("dc:title")
            .first()
            .map(|metadatum| metadatum.text.clone())
    }

    /// 语言(第一条dc:language)
    pub fn language(&self) -> Option<String> {
        self.by_term("dc:language")
            .first()
            .map(|metadatum| metadatum.text.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_and_duplicates() {
        let mut metadata = PackageMetadata::new();
        metadata.push(Metadatum::new("dc:subject".to_string(), "horror".to_string()));
        metadata.push(Metadatum::new("dc:subject".to_string(), "weird fiction".to_string()));

        let subjects = metadata.by_term("dc:subject");
        assert_eq!(subjects.len(), 2);
        // 重复条目保持声明顺序
        assert_eq!(subjects[0].text, "horror");
        assert_eq!(subjects[1].text, "weird fiction");
    }

    #[test]
    fn test_refinements() {
        let mut metadata = PackageMetadata::new();
        let mut creator = Metadatum::new("dc:creator".to_string(), "H.P. Lovecraft".to_string());
        creator.id = Some("creator1".to_string());
        metadata.push(creator);

        let mut role = Metadatum::new("role".to_string(), "aut".to_string());
        role.refines = Some("creator1".to_string());
        metadata.push(role);

        assert_eq!(metadata.by_id("creator1").unwrap().text, "H.P. Lovecraft");
        let refinements = metadata.refinements_of("creator1");
        assert_eq!(refinements.len(), 1);
        assert_eq!(refinements[0].text, "aut");
    }

    #[test]
    fn test_dcterms_modified_ignores_refined() {
        let mut metadata = PackageMetadata::new();
        let mut refined = Metadatum::new("dcterms:modified".to_string(), "2001-01-01".to_string());
        refined.refines = Some("something".to_string());
        metadata.push(refined);
        assert_eq!(metadata.dcterms_modified(), None);

        metadata.push(Metadatum::new(
            "dcterms:modified".to_string(),
            "2014-06-01T12:00:00Z".to_string(),
        ));
        assert_eq!(
            metadata.dcterms_modified(),
            Some("2014-06-01T12:00:00Z".to_string())
        );
    }
}
