//! 人类可读的测量报告.
//!
//! 报告文本分两段: 分支前言 (重叠/无重叠) 先写, 公共测量随后追加.
//! 行文与坐标格式是外部消费者依赖的可观察契约, 不要随意改动.
//! 并列取得最小值的体素 **全部** 列出, 以 `; ` 分隔.

use std::fmt::Write as _;

use itertools::Itertools;

use super::{OverlapAnalysis, PairAnalysis};
use crate::geom::VoxelSet;
use crate::{Coord3d, Idx3d};

/// 连续坐标格式: `x, y, z`.
fn fmt_coord(c: &Coord3d) -> String {
    format!("{}, {}, {}", c[0], c[1], c[2])
}

/// 体素索引格式: `x, y, z`.
fn fmt_idx((x, y, z): Idx3d) -> String {
    format!("{x}, {y}, {z}")
}

/// 列出 `set` 中给定下标的体素坐标, `; ` 分隔.
fn fmt_ijk_list<I: IntoIterator<Item = usize>>(set: &VoxelSet, indices: I) -> String {
    indices.into_iter().map(|i| fmt_idx(set.ijk(i))).join("; ")
}

/// 列出 `set` 中给定下标的毫米坐标, `; ` 分隔.
fn fmt_xyz_list<I: IntoIterator<Item = usize>>(set: &VoxelSet, indices: I) -> String {
    indices
        .into_iter()
        .map(|i| fmt_coord(&set.xyz(i)))
        .join("; ")
}

/// 分支前言: 重叠分支包含重叠测量, 无重叠分支只有一行说明.
/// 这是报告文件的第一段, 以覆盖模式写入.
pub fn preamble(an: &PairAnalysis) -> String {
    match &an.overlap {
        Some(ov) => overlap_preamble(ov),
        None => "No overlap found between both masks, \
                 distance calculations done using external outlines and COGs only\n\n"
            .to_owned(),
    }
}

fn overlap_preamble(ov: &OverlapAnalysis) -> String {
    let mut s = String::new();
    let _ = writeln!(
        s,
        "Initial overlap found between both masks, distance calculations using \
         overlapping voxels, their COG, as well as external outlines and COGs of both masks\n"
    );
    let _ = writeln!(
        s,
        "Minimum distance between COG of overlapping voxels and all voxels of mask A = {}mm",
        ov.a_edge_to_ov_cog.dist
    );
    let _ = writeln!(
        s,
        "Minimum distance between COG of mask A and all overlapping voxels = {}mm",
        ov.ov_to_cog_a.dist
    );
    let _ = writeln!(
        s,
        "Minimum distance between COG of mask B and all overlapping voxels = {}mm\n",
        ov.ov_to_cog_b.dist
    );
    let _ = writeln!(
        s,
        "Number of overlapping voxels between both masks: {} voxels",
        ov.region.count
    );
    let _ = writeln!(
        s,
        "Percent volume overlap between masks relative to mask A = {}%",
        ov.region.percent_of_a
    );
    let _ = writeln!(
        s,
        "Percent volume overlap between masks relative to mask B = {}%\n",
        ov.region.percent_of_b
    );
    s
}

/// 公共测量段: 两分支共享, 以追加模式写在前言之后.
pub fn common_measures(an: &PairAnalysis) -> String {
    // 并列体素对里 A/B 两侧可能各自重复, 去重但保持出现顺序.
    let a_win = an.nearest.pairs.iter().map(|p| p.0).unique();
    let b_win = an.nearest.pairs.iter().map(|p| p.1).unique();

    let mut s = String::new();
    let _ = writeln!(
        s,
        "Minimum distance between all voxels of mask A and mask B: {}mm",
        an.nearest.dist
    );
    let _ = writeln!(s, "This is found between:-");
    let _ = writeln!(
        s,
        "Mask A voxel(s) at voxel coordinates: {}",
        fmt_ijk_list(&an.edge_a, a_win.clone())
    );
    let _ = writeln!(
        s,
        "Mask A voxel(s) at mm coordinates: {}",
        fmt_xyz_list(&an.edge_a, a_win)
    );
    let _ = writeln!(
        s,
        "Mask B voxel(s) at voxel coordinates: {}",
        fmt_ijk_list(&an.edge_b, b_win.clone())
    );
    let _ = writeln!(
        s,
        "Mask B voxel(s) at mm coordinates: {}\n",
        fmt_xyz_list(&an.edge_b, b_win)
    );

    let _ = writeln!(
        s,
        "Minimum distance between COG of mask A and COG of mask B: {}mm",
        an.cog_dist
    );
    let _ = writeln!(
        s,
        "COG of mask A voxel coordinates: {}",
        fmt_coord(&an.cog_a.vox)
    );
    let _ = writeln!(s, "COG of mask A mm coordinates: {}", fmt_coord(&an.cog_a.mm));
    let _ = writeln!(
        s,
        "COG of mask B voxel coordinates: {}",
        fmt_coord(&an.cog_b.vox)
    );
    let _ = writeln!(
        s,
        "COG of mask B mm coordinates: {}\n",
        fmt_coord(&an.cog_b.mm)
    );

    let _ = writeln!(
        s,
        "Minimum distance between COG of mask A and all voxels of mask B: {}mm",
        an.b_to_cog_a.dist
    );
    let _ = writeln!(
        s,
        "Mask B voxel(s) with shortest distance to mask A COG voxel coordinates: {}",
        fmt_ijk_list(&an.edge_b, an.b_to_cog_a.indices.iter().copied())
    );
    let _ = writeln!(
        s,
        "Mask B voxel(s) with shortest distance to mask A COG mm coordinates: {}\n",
        fmt_xyz_list(&an.edge_b, an.b_to_cog_a.indices.iter().copied())
    );

    let _ = writeln!(
        s,
        "Minimum distance between COG of mask B and all voxels of mask A: {}mm",
        an.a_to_cog_b.dist
    );
    let _ = writeln!(
        s,
        "Mask A voxel(s) with shortest distance to mask B COG voxel coordinates: {}",
        fmt_ijk_list(&an.edge_a, an.a_to_cog_b.indices.iter().copied())
    );
    let _ = writeln!(
        s,
        "Mask A voxel(s) with shortest distance to mask B COG mm coordinates: {}",
        fmt_xyz_list(&an.edge_a, an.a_to_cog_b.indices.iter().copied())
    );
    s
}

/// 面向 CLI stdout 的标量摘要. 内容是报告的子集, 便于交互检视.
pub fn cli_summary(an: &PairAnalysis) -> String {
    let mut s = String::new();
    let _ = writeln!(
        s,
        "COG of mask A in mm: {} (voxels: {})",
        fmt_coord(&an.cog_a.mm),
        fmt_coord(&an.cog_a.vox)
    );
    let _ = writeln!(
        s,
        "COG of mask B in mm: {} (voxels: {})",
        fmt_coord(&an.cog_b.mm),
        fmt_coord(&an.cog_b.vox)
    );
    let _ = writeln!(
        s,
        "Minimum distance between all voxels of mask A and all voxels of mask B = {}",
        an.nearest.dist
    );
    let _ = writeln!(
        s,
        "Minimum distance between COG of mask A and all voxels of mask B = {}",
        an.b_to_cog_a.dist
    );
    let _ = writeln!(
        s,
        "Minimum distance between COG of mask B and all voxels of mask A = {}",
        an.a_to_cog_b.dist
    );
    let _ = writeln!(
        s,
        "Minimum distance between COG of mask A and COG of mask B = {}",
        an.cog_dist
    );

    if let Some(ov) = &an.overlap {
        let _ = writeln!(
            s,
            "Number of overlapping voxels between both masks: {} voxels",
            ov.region.count
        );
        let _ = writeln!(
            s,
            "Percent volume overlap between masks relative to mask A = {}%",
            ov.region.percent_of_a
        );
        let _ = writeln!(
            s,
            "Percent volume overlap between masks relative to mask B = {}%",
            ov.region.percent_of_b
        );
    }
    s
}

#[cfg(test)]
mod tests {
    use crate::analysis::{analyse, cli_summary, common_measures, preamble};
    use crate::geom::identity_affine;
    use crate::MaskVolume;
    use ndarray::{s, Array3};

    fn cube_at(lo: usize) -> MaskVolume {
        let mut data = Array3::zeros((16, 16, 16));
        data.slice_mut(s![lo..lo + 3, lo..lo + 3, lo..lo + 3])
            .fill(1u16);
        MaskVolume::synthetic(data, identity_affine())
    }

    #[test]
    fn test_no_overlap_report_content() {
        let an = analyse(&cube_at(0), &cube_at(10)).unwrap();

        let pre = preamble(&an);
        assert!(pre.starts_with("No overlap found between both masks"));

        let common = common_measures(&an);
        assert!(common.contains(
            "Minimum distance between all voxels of mask A and mask B: 13.856406460551018mm"
        ));
        assert!(common.contains("Mask A voxel(s) at voxel coordinates: 2, 2, 2"));
        assert!(common.contains("Mask B voxel(s) at voxel coordinates: 10, 10, 10"));
        assert!(common.contains("COG of mask A voxel coordinates: 1, 1, 1"));
        assert!(common.contains("COG of mask B mm coordinates: 11, 11, 11"));
    }

    #[test]
    fn test_overlap_report_content() {
        let an = analyse(&cube_at(4), &cube_at(4)).unwrap();

        let pre = preamble(&an);
        assert!(pre.starts_with("Initial overlap found between both masks"));
        assert!(pre.contains("Number of overlapping voxels between both masks: 27 voxels"));
        assert!(pre.contains("Percent volume overlap between masks relative to mask A = 100%"));

        let summary = cli_summary(&an);
        assert!(summary.contains("COG of mask A in mm: 5, 5, 5"));
        assert!(summary.contains("Percent volume overlap between masks relative to mask B = 100%"));
    }

    #[test]
    fn test_ties_are_listed_with_separator() {
        // 对称构造, 两个并列体素对.
        let mut da = Array3::zeros((16, 16, 16));
        da[(8, 8, 8)] = 1u16;
        let a = MaskVolume::synthetic(da, identity_affine());

        let mut db = Array3::zeros((16, 16, 16));
        db[(5, 8, 8)] = 1u16;
        db[(11, 8, 8)] = 1u16;
        let b = MaskVolume::synthetic(db, identity_affine());

        let common = common_measures(&analyse(&a, &b).unwrap());
        assert!(common.contains("Mask B voxel(s) at voxel coordinates: 5, 8, 8; 11, 8, 8"));
        assert!(common
            .contains("Mask A voxel(s) at voxel coordinates: 8, 8, 8\n"));
    }
}
