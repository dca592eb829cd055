//! mask 配对几何分析工作流.
//!
//! 数据流: 两个同空间 mask 进入 -> 兼容性检查 -> 退化检查 ->
//! 重叠检测选择分支 -> 轮廓/质心/最近体素距离 -> 标量与坐标结果聚合.
//! 全部派生结构每次调用现算, 运行之间不保留任何状态.

use ndarray::Array3;

use crate::data::{morph, VolumeMeta};
use crate::geom::distance::{self, PairMin, PointMin};
use crate::geom::overlap::{self, OverlapRegion};
use crate::geom::{Cog, VoxelSet};
use crate::{MaskError, MaskRole, MaskVolume, Result};

mod emit;
mod report;

pub use emit::{emit_all, OutputLayout};
pub use report::{cli_summary, common_measures, preamble};

/// 重叠分支的附加测量. 仅当初始重叠非空时计算.
#[derive(Debug, Clone)]
pub struct OverlapAnalysis {
    /// 重叠区域本身.
    pub region: OverlapRegion,

    /// mask A 轮廓各体素到重叠质心的距离列最小值.
    pub a_edge_to_ov_cog: PointMin,

    /// 重叠各体素到 mask A 质心的距离列最小值.
    pub ov_to_cog_a: PointMin,

    /// 重叠各体素到 mask B 质心的距离列最小值.
    pub ov_to_cog_b: PointMin,
}

/// 一次配对分析的全部结果.
///
/// 距离下标的指向关系: [`Self::nearest`] 和 `*_to_cog_*` 的下标
/// 指向对应的轮廓点集 ([`Self::edge_a`], [`Self::edge_b`]);
/// 重叠分支的下标见 [`OverlapAnalysis`] 各字段说明.
#[derive(Debug, Clone)]
pub struct PairAnalysis {
    /// mask A 的单次腐蚀结果 (0/1).
    pub eroded_a: Array3<u16>,

    /// mask B 的单次腐蚀结果 (0/1).
    pub eroded_b: Array3<u16>,

    /// mask A 的一层厚外轮廓 (0/1).
    pub outline_a: Array3<u16>,

    /// mask B 的一层厚外轮廓 (0/1).
    pub outline_b: Array3<u16>,

    /// mask A 轮廓点集.
    pub edge_a: VoxelSet,

    /// mask B 轮廓点集.
    pub edge_b: VoxelSet,

    /// mask A 的加权质心.
    pub cog_a: Cog,

    /// mask B 的加权质心.
    pub cog_b: Cog,

    /// 两轮廓间的全局最小距离和全部并列体素对.
    pub nearest: PairMin,

    /// mask B 轮廓各体素到 mask A 质心的距离列最小值.
    pub b_to_cog_a: PointMin,

    /// mask A 轮廓各体素到 mask B 质心的距离列最小值.
    pub a_to_cog_b: PointMin,

    /// 两质心之间的直线距离.
    pub cog_dist: f64,

    /// 重叠分支结果. 无初始重叠时为 `None`.
    pub overlap: Option<OverlapAnalysis>,
}

impl PairAnalysis {
    /// 是否走了重叠分支?
    #[inline]
    pub fn has_overlap(&self) -> bool {
        self.overlap.is_some()
    }
}

/// 空点集的距离查询无定义, 一律折算为对应 mask 的退化错误.
#[inline]
fn guard<T>(v: Option<T>, role: MaskRole) -> Result<T> {
    v.ok_or(MaskError::DegenerateMask(role))
}

/// 对两个 mask 执行完整的配对几何分析.
///
/// 检查顺序是契约的一部分: 空间兼容性最先 (不兼容时不做任何计算),
/// 然后是两个 mask 的退化检查, 之后才进入重叠检测和距离测量.
///
/// # 约定
///
/// mask A 应当是较小、更局部的区域, mask B 是较大的参考区域.
/// 该约定仅用于解读结果, 不做强制.
pub fn analyse(a: &MaskVolume, b: &MaskVolume) -> Result<PairAnalysis> {
    a.compatible_with(b)?;

    if a.is_degenerate() {
        return Err(MaskError::DegenerateMask(MaskRole::A));
    }
    if b.is_degenerate() {
        return Err(MaskError::DegenerateMask(MaskRole::B));
    }

    // 重叠检测只做一次, 分支结果全程复用.
    let region = overlap::detect(a, b);

    let eroded_a = morph::erode(a.data());
    let eroded_b = morph::erode(b.data());
    let outline_a = morph::outline(a.data());
    let outline_b = morph::outline(b.data());

    let (aff_a, aff_b) = (a.affine4(), b.affine4());
    let edge_a = VoxelSet::from_nonzero(outline_a.view(), &aff_a);
    let edge_b = VoxelSet::from_nonzero(outline_b.view(), &aff_b);

    // 退化检查已经通过, 质心必然存在.
    let cog_a = guard(Cog::of_volume(a), MaskRole::A)?;
    let cog_b = guard(Cog::of_volume(b), MaskRole::B)?;

    cfg_if::cfg_if! {
        if #[cfg(feature = "rayon")] {
            let nearest = distance::par_min_pairwise(&edge_a, &edge_b);
        } else {
            let nearest = distance::min_pairwise(&edge_a, &edge_b);
        }
    }
    let nearest = guard(nearest, MaskRole::A)?;

    let b_to_cog_a = guard(distance::min_to_point(&edge_b, &cog_a.mm), MaskRole::B)?;
    let a_to_cog_b = guard(distance::min_to_point(&edge_a, &cog_b.mm), MaskRole::A)?;
    let cog_dist = distance::cog_to_cog(&cog_a, &cog_b);

    let overlap = match region {
        None => None,
        Some(region) => {
            let a_edge_to_ov_cog =
                guard(distance::min_to_point(&edge_a, &region.cog.mm), MaskRole::A)?;
            let ov_to_cog_a =
                guard(distance::min_to_point(&region.voxels, &cog_a.mm), MaskRole::A)?;
            let ov_to_cog_b =
                guard(distance::min_to_point(&region.voxels, &cog_b.mm), MaskRole::B)?;
            Some(OverlapAnalysis {
                region,
                a_edge_to_ov_cog,
                ov_to_cog_a,
                ov_to_cog_b,
            })
        }
    };

    Ok(PairAnalysis {
        eroded_a,
        eroded_b,
        outline_a,
        outline_b,
        edge_a,
        edge_b,
        cog_a,
        cog_b,
        nearest,
        b_to_cog_a,
        a_to_cog_b,
        cog_dist,
        overlap,
    })
}
