//! 结构化导出模块
//!
//! 模型中的每个组件都能把自身状态投影为保持顺序的键值结构，
//! 供诊断输出与快照测试使用。递归模式展开全部子对象，
//! 非递归模式只报告标量与汇总字段(例如以计数代替完整列表)。

use serde_json::Value;

/// 结构化导出能力
pub trait JsonExport {
    /// 将自身状态投影为JSON对象
    ///
    /// # 参数
    /// * `recursive` - 是否递归展开子对象；为false时只输出标量与计数
    fn json_object(&self, recursive: bool) -> Value;

    /// 导出为JSON字符串
    fn json_string(&self, recursive: bool, pretty: bool) -> String {
        let value = self.json_object(recursive);
        if pretty {
            serde_json::to_string_pretty(&value).unwrap_or_default()
        } else {
            serde_json::to_string(&value).unwrap_or_default()
        }
    }
}
