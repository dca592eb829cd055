//! 重叠区域检测与统计.

use ndarray::{Array3, Zip};

use super::{Cog, VoxelSet};
use crate::consts::label::*;
use crate::data::VolumeMeta;
use crate::MaskVolume;

/// 两个 mask 同时非零的体素区域.
///
/// 仅当区域非空时存在. 检测只做一次, 结果在整个工作流里复用.
#[derive(Debug, Clone)]
pub struct OverlapRegion {
    /// 0/1 重叠图, 与输入同形状.
    pub map: Array3<u16>,

    /// 重叠体素集合 (全部体素, 不是轮廓).
    pub voxels: VoxelSet,

    /// 重叠体素个数.
    pub count: usize,

    /// 重叠区域的质心.
    pub cog: Cog,

    /// 重叠体积占 mask A 非零体积的百分比.
    pub percent_of_a: f64,

    /// 重叠体积占 mask B 非零体积的百分比.
    pub percent_of_b: f64,
}

/// 对两个同空间 mask 做元素级逻辑与, 检测初始重叠.
///
/// 两个输入都先二值化: 非 0/1 的 label 若直接相乘会把权值带进
/// 重叠图, 这里刻意避免. 没有任何共同非零体素时返回 `None`,
/// 工作流走无重叠分支.
///
/// # 注意
///
/// 调用前必须已通过 `MaskVolume::compatible_with` 检查, 形状一致由其保证.
pub fn detect(a: &MaskVolume, b: &MaskVolume) -> Option<OverlapRegion> {
    let mut map = Array3::zeros(a.data().dim());
    Zip::from(&mut map)
        .and(a.data())
        .and(b.data())
        .for_each(|o, &pa, &pb| {
            if is_foreground(pa) && is_foreground(pb) {
                *o = FOREGROUND;
            }
        });

    let count = map.iter().filter(|p| is_foreground(**p)).count();
    if count == 0 {
        return None;
    }

    let aff = b.affine4();
    let voxels = VoxelSet::from_nonzero(map.view(), &aff);

    // count != 0, 质心必然存在.
    let cog = Cog::of_weighted(map.view(), &aff)?;

    let percent_of_a = 100.0 * count as f64 / a.count_nonzero() as f64;
    let percent_of_b = 100.0 * count as f64 / b.count_nonzero() as f64;

    Some(OverlapRegion {
        map,
        voxels,
        count,
        cog,
        percent_of_a,
        percent_of_b,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::identity_affine;
    use ndarray::{s, Array3};

    fn vol_with_box(lo: usize, hi: usize) -> MaskVolume {
        let mut data = Array3::zeros((8, 8, 8));
        data.slice_mut(s![lo..=hi, lo..=hi, lo..=hi]).fill(1u16);
        MaskVolume::synthetic(data, identity_affine())
    }

    #[test]
    fn test_disjoint_masks_have_no_overlap() {
        let a = vol_with_box(0, 2);
        let b = vol_with_box(5, 7);
        assert!(detect(&a, &b).is_none());
    }

    #[test]
    fn test_identical_masks_fully_overlap() {
        let a = vol_with_box(1, 3);
        let b = vol_with_box(1, 3);

        let ov = detect(&a, &b).unwrap();
        assert_eq!(ov.count, 27);
        assert_eq!(ov.voxels.len(), 27);
        assert_eq!(ov.percent_of_a, 100.0);
        assert_eq!(ov.percent_of_b, 100.0);
        assert_eq!(ov.cog.trunc_idx(), (2, 2, 2));
    }

    #[test]
    fn test_partial_overlap_percentages() {
        // A: 27 体素, B: 64 体素, 交集: 2x2x2 = 8 体素.
        let a = vol_with_box(0, 2);
        let b = vol_with_box(1, 4);

        let ov = detect(&a, &b).unwrap();
        assert_eq!(ov.count, 8);
        assert!((ov.percent_of_a - 100.0 * 8.0 / 27.0).abs() < 1e-12);
        assert!((ov.percent_of_b - 100.0 * 8.0 / 64.0).abs() < 1e-12);
    }

    #[test]
    fn test_overlap_ignores_label_scale() {
        // label 为 7 的体素参与重叠, 且重叠图仍是 0/1.
        let mut da = Array3::zeros((4, 4, 4));
        da[(1, 1, 1)] = 7u16;
        let mut db = Array3::zeros((4, 4, 4));
        db[(1, 1, 1)] = 3u16;

        let a = MaskVolume::synthetic(da, identity_affine());
        let b = MaskVolume::synthetic(db, identity_affine());

        let ov = detect(&a, &b).unwrap();
        assert_eq!(ov.count, 1);
        assert_eq!(ov.map[(1, 1, 1)], 1);
        assert_eq!(ov.percent_of_a, 100.0);
    }
}
