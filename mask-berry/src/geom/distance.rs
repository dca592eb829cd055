//! 穷举式最近体素搜索.
//!
//! 对两个点集做 O(|A|·|B|) 的毫米空间欧氏距离稠密计算, 不使用任何
//! 空间索引或剪枝. 这是本工具已知的可扩展性上限: 输入预期是局部小区域
//! mask (病灶, 刺激球, 纤维束投影之类), 而不是全脑体积.
//!
//! 并列最小值的处理: 当多个体素对以浮点相等的方式取得同一个最小距离时,
//! **全部** 并列者都会被记录, 而不是任选其一.

use itertools::Itertools;
use ordered_float::OrderedFloat;

use super::{Cog, VoxelSet};
use crate::Coord3d;

cfg_if::cfg_if! {
    if #[cfg(feature = "rayon")] {
        use rayon::iter::{IntoParallelIterator, ParallelIterator};
    }
}

/// 两个毫米坐标之间的欧氏距离.
#[inline]
pub fn euclidean(a: &Coord3d, b: &Coord3d) -> f64 {
    let dx = a[0] - b[0];
    let dy = a[1] - b[1];
    let dz = a[2] - b[2];
    (dx * dx + dy * dy + dz * dz).sqrt()
}

/// 点集对点集的最小距离及全部并列取得者.
#[derive(Debug, Clone, PartialEq)]
pub struct PairMin {
    /// 全局最小距离, 毫米.
    pub dist: f64,

    /// 所有取得最小距离的 `(a, b)` 下标对, 下标指向两个输入点集.
    /// 按 (a, b) 字典序排列.
    pub pairs: Vec<(usize, usize)>,
}

/// 点集对单点的最小距离及全部并列取得者.
#[derive(Debug, Clone, PartialEq)]
pub struct PointMin {
    /// 最小距离, 毫米.
    pub dist: f64,

    /// 所有取得最小距离的点集下标, 升序排列.
    pub indices: Vec<usize>,
}

/// 计算 `a` 与 `b` 之间所有体素对的最小欧氏距离.
///
/// 任一点集为空时无定义, 返回 `None`. 两遍扫描: 先求最小值,
/// 再收集全部浮点相等的并列对.
pub fn min_pairwise(a: &VoxelSet, b: &VoxelSet) -> Option<PairMin> {
    if a.is_empty() || b.is_empty() {
        return None;
    }

    let dist = a
        .coords()
        .iter()
        .cartesian_product(b.coords().iter())
        .map(|(pa, pb)| OrderedFloat(euclidean(pa, pb)))
        .min()?
        .0;

    let pairs = collect_tied_pairs(a, b, dist);
    Some(PairMin { dist, pairs })
}

/// 收集所有距离恰好等于 `dist` 的 `(a, b)` 下标对, 按字典序.
fn collect_tied_pairs(a: &VoxelSet, b: &VoxelSet, dist: f64) -> Vec<(usize, usize)> {
    (0..a.len())
        .cartesian_product(0..b.len())
        .filter(|&(i, j)| euclidean(&a.xyz(i), &b.xyz(j)) == dist)
        .collect()
}

/// 计算 `set` 中每个体素到定点 `p` 的距离列的最小值.
///
/// 点集为空时无定义, 返回 `None`.
pub fn min_to_point(set: &VoxelSet, p: &Coord3d) -> Option<PointMin> {
    if set.is_empty() {
        return None;
    }

    let dist = set
        .coords()
        .iter()
        .map(|q| OrderedFloat(euclidean(q, p)))
        .min()?
        .0;

    let indices = set
        .coords()
        .iter()
        .positions(|q| euclidean(q, p) == dist)
        .collect();
    Some(PointMin { dist, indices })
}

/// 两个质心之间的毫米空间直线距离.
#[inline]
pub fn cog_to_cog(a: &Cog, b: &Cog) -> f64 {
    euclidean(&a.mm, &b.mm)
}

/// 并发操作部分
#[cfg(feature = "rayon")]
mod par {
    use super::*;

    /// 借助 `rayon`, 并行地计算 [`min_pairwise`].
    ///
    /// 体素对之间没有顺序依赖, 仅最终的最小值归约需要确定性:
    /// 结果 (含并列对集合及其顺序) 与串行版本逐位一致.
    pub fn par_min_pairwise(a: &VoxelSet, b: &VoxelSet) -> Option<PairMin> {
        if a.is_empty() || b.is_empty() {
            return None;
        }

        let dist = (0..a.len())
            .into_par_iter()
            .map(|i| {
                let pa = a.xyz(i);
                b.coords()
                    .iter()
                    .map(|pb| OrderedFloat(euclidean(&pa, pb)))
                    .min()
                    .unwrap_or(OrderedFloat(f64::INFINITY))
            })
            .min()?
            .0;

        // 并列对的收集保持字典序, 与串行路径一致.
        let pairs = (0..a.len())
            .into_par_iter()
            .flat_map_iter(|i| {
                let pa = a.xyz(i);
                (0..b.len())
                    .filter(move |&j| euclidean(&pa, &b.xyz(j)) == dist)
                    .map(move |j| (i, j))
            })
            .collect();
        Some(PairMin { dist, pairs })
    }
}

#[cfg(feature = "rayon")]
pub use par::par_min_pairwise;
