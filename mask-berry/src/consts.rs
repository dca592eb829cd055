//! 通用常量.

/// mask 体素 label 值.
pub mod label {
    /// 背景体素值.
    pub const BACKGROUND: u16 = 0;

    /// 前景 (mask 内部) 体素值.
    pub const FOREGROUND: u16 = 1;

    /// 标记图中, 经过膨胀后重新刻上的精确中心体素值.
    /// 与膨胀斑块的 1 区分, 以便在查看器中定位准确位置.
    pub const MARKER_CORE: u16 = 10;

    /// 体素是否是背景?
    #[inline]
    pub const fn is_background(p: u16) -> bool {
        matches!(p, BACKGROUND)
    }

    /// 体素是否是前景? 任何非零 label 均视为前景.
    #[inline]
    pub const fn is_foreground(p: u16) -> bool {
        !is_background(p)
    }
}

/// 标记斑块的膨胀迭代次数. 纯粹为了可视化 (让单个体素在常见显示分辨率下可见),
/// 对数值结果没有影响.
pub const MARKER_DILATE_ITERS: usize = 5;

/// affine 元素级比较的相对容差. 与 `numpy.allclose` 的默认值一致.
pub const AFFINE_RTOL: f64 = 1e-5;

/// affine 元素级比较的绝对容差. 与 `numpy.allclose` 的默认值一致.
pub const AFFINE_ATOL: f64 = 1e-8;
