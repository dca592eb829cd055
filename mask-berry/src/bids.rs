//! BIDS 命名约定的最小解析.
//!
//! 整个 crate 只关心一件事: 从 mask 文件路径中取出 `sub-<token>`
//! 受试者标签来构造输出文件名. 显式文法: 取路径中第一个以 `sub-`
//! 开头的组成部分, 标签为 `sub-` 之后、第一个 `_` 之前的非空字符串.
//! 找不到这样的组成部分是致命的命名错误, 绝不静默地拼出残缺文件名.

use std::fmt;
use std::path::Path;

use crate::{MaskError, Result};

/// 从 BIDS 路径解析出的受试者标签, 例如 `sub-PT004_xxx` 中的 `PT004`.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct SubjectTag(String);

impl SubjectTag {
    /// 解析 `path` 中第一个 `sub-<token>` 形式的组成部分.
    ///
    /// 目录名和文件名都参与匹配. 不存在合法标签时返回
    /// [`MaskError::MissingSubjectTag`].
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        path.components()
            .filter_map(|c| c.as_os_str().to_str())
            .find_map(parse_component)
            .map(Self)
            .ok_or_else(|| MaskError::MissingSubjectTag(path.to_path_buf()))
    }

    /// 标签内容, 不含 `sub-` 前缀.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SubjectTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 对单个路径组成部分应用标签文法. 非法时返回 `None`.
fn parse_component(component: &str) -> Option<String> {
    let rest = component.strip_prefix("sub-")?;
    let token = rest.split('_').next().unwrap_or("");
    (!token.is_empty()).then(|| token.to_owned())
}
