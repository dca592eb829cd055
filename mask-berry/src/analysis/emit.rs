//! 结果落盘: 文本报告与辅助标记 nii 文件.
//!
//! 文件命名是外部消费者依赖的可观察契约. 所有输出位于
//! `<prefix>_output/` 目录下, 网格文件名为
//! `<prefix>_<tag><后缀>.nii.gz`, 报告为
//! `<prefix>_output_<tag>_output_measures.txt`.
//!
//! 标记图对数值结果没有影响, 纯粹是可视化产物: 目标体素以 1 落点,
//! 经固定次数膨胀形成肉眼可见的斑块, 再把精确中心重新刻为
//! [`MARKER_CORE`](crate::consts::label::MARKER_CORE).
//!
//! 失败时已经写出的文件按原样留在磁盘上, 不做事务性清理.
//! 已知的改进方向是先写到运行级临时目录再原子重命名, 目前未实现.

use std::fs::OpenOptions;
use std::io::Write as _;
use std::path::{Path, PathBuf};

use itertools::Itertools;
use ndarray::Array3;
use nifti::NiftiHeader;

use super::{report, PairAnalysis};
use crate::consts::label::*;
use crate::consts::MARKER_DILATE_ITERS;
use crate::data::{morph, VolumeMeta};
use crate::bids::SubjectTag;
use crate::{Idx3d, MaskError, MaskVolume, Result};

/// 输出目录与文件命名规则.
#[derive(Debug, Clone)]
pub struct OutputLayout {
    dir: PathBuf,
    prefix: String,
    tag: SubjectTag,
}

impl OutputLayout {
    /// 在 `base` 下规划 `<prefix>_output/` 输出目录.
    ///
    /// `tag` 从 mask A 的路径解析而来, 参与所有文件名.
    pub fn new<P: AsRef<Path>>(base: P, prefix: &str, tag: SubjectTag) -> Self {
        Self {
            dir: base.as_ref().join(format!("{prefix}_output")),
            prefix: prefix.to_owned(),
            tag,
        }
    }

    /// 输出目录路径.
    #[inline]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// 创建输出目录 (连同缺失的父级).
    pub fn create_dir(&self) -> Result<()> {
        std::fs::create_dir_all(&self.dir).map_err(|source| MaskError::Io {
            path: self.dir.clone(),
            source,
        })
    }

    /// 网格文件路径. `suffix` 以下划线开头, 如 `_mask_A_edge`.
    pub fn grid_path(&self, suffix: &str) -> PathBuf {
        self.dir
            .join(format!("{}_{}{suffix}.nii.gz", self.prefix, self.tag))
    }

    /// 测量报告文件路径.
    pub fn measures_path(&self) -> PathBuf {
        self.dir
            .join(format!("{}_output_{}_output_measures.txt", self.prefix, self.tag))
    }
}

/// 把文本写入 `path`. `append` 为 `false` 时覆盖已有内容.
fn write_text(path: &Path, text: &str, append: bool) -> Result<()> {
    let io_err = |source| MaskError::Io {
        path: path.to_path_buf(),
        source,
    };
    let mut f = OpenOptions::new()
        .create(true)
        .write(true)
        .append(append)
        .truncate(!append)
        .open(path)
        .map_err(io_err)?;
    f.write_all(text.as_bytes()).map_err(io_err)
}

/// 构造标记图: 在 `voxels` 各处落点, 膨胀固定次数,
/// 再把每个精确中心重新刻为 [`MARKER_CORE`].
///
/// 并列取得最小值的体素全部落点, 而不是任选其一.
fn marker_map(shape: Idx3d, voxels: &[Idx3d]) -> Array3<u16> {
    let mut seed = Array3::zeros(shape);
    for &pos in voxels {
        seed[pos] = FOREGROUND;
    }
    let mut blob = morph::dilate(seed.view(), MARKER_DILATE_ITERS);
    for &pos in voxels {
        blob[pos] = MARKER_CORE;
    }
    blob
}

/// 以 `header` 的空间信息把派生数组写到 `path`.
fn save_grid(header: &NiftiHeader, data: Array3<u16>, path: &Path) -> Result<()> {
    MaskVolume::with_header(header, data).save(path)
}

/// 将一次配对分析的全部产物写入磁盘, 返回报告文件路径.
///
/// 写入顺序: 输出目录 -> 分支前言 (覆盖) -> 重叠网格 (如有) ->
/// 轮廓/原始/腐蚀网格 -> 公共测量 (追加) -> 最近体素与质心标记图.
/// A 侧派生网格沿用 mask A 的 header, B 侧与重叠网格沿用 mask B 的.
pub fn emit_all(
    layout: &OutputLayout,
    a: &MaskVolume,
    b: &MaskVolume,
    an: &PairAnalysis,
) -> Result<PathBuf> {
    layout.create_dir()?;
    let shape = a.shape();
    let measures = layout.measures_path();

    // 分支前言先行, 覆盖旧报告.
    write_text(&measures, &report::preamble(an), false)?;

    if let Some(ov) = &an.overlap {
        save_grid(
            b.header(),
            ov.region.map.clone(),
            &layout.grid_path("_initial_overlapping_voxels"),
        )?;
        save_grid(
            b.header(),
            marker_map(shape, &[ov.region.cog.trunc_idx()]),
            &layout.grid_path("_initial_overlapping_voxels_COG"),
        )?;

        let a_win: Vec<_> = ov
            .a_edge_to_ov_cog
            .indices
            .iter()
            .map(|&i| an.edge_a.ijk(i))
            .collect();
        save_grid(
            a.header(),
            marker_map(shape, &a_win),
            &layout.grid_path("_maskA_vox_mindist_2_overlap_COG"),
        )?;

        let to_a: Vec<_> = ov
            .ov_to_cog_a
            .indices
            .iter()
            .map(|&i| ov.region.voxels.ijk(i))
            .collect();
        save_grid(
            b.header(),
            marker_map(shape, &to_a),
            &layout.grid_path("_overlap_vox_mindist_2_mask_A_COG"),
        )?;

        let to_b: Vec<_> = ov
            .ov_to_cog_b
            .indices
            .iter()
            .map(|&i| ov.region.voxels.ijk(i))
            .collect();
        save_grid(
            b.header(),
            marker_map(shape, &to_b),
            &layout.grid_path("_overlap_vox_mindist_2_mask_B_COG"),
        )?;
    }

    // 中间网格: 轮廓, 原始数据, 腐蚀结果.
    save_grid(a.header(), an.outline_a.clone(), &layout.grid_path("_mask_A_edge"))?;
    save_grid(b.header(), an.outline_b.clone(), &layout.grid_path("_mask_B_edge"))?;
    a.save(layout.grid_path("_mask_A"))?;
    b.save(layout.grid_path("_mask_B"))?;
    save_grid(a.header(), an.eroded_a.clone(), &layout.grid_path("_mask_A_eroded"))?;
    save_grid(b.header(), an.eroded_b.clone(), &layout.grid_path("_mask_B_eroded"))?;

    write_text(&measures, &report::common_measures(an), true)?;

    // 最近体素标记: 并列对两侧各自去重后全部落点.
    let a_win: Vec<_> = an
        .nearest
        .pairs
        .iter()
        .map(|p| an.edge_a.ijk(p.0))
        .unique()
        .collect();
    let b_win: Vec<_> = an
        .nearest
        .pairs
        .iter()
        .map(|p| an.edge_b.ijk(p.1))
        .unique()
        .collect();
    save_grid(
        a.header(),
        marker_map(shape, &a_win),
        &layout.grid_path("_mask_A_vox_mindist_2_all_B_mask_vox"),
    )?;
    save_grid(
        b.header(),
        marker_map(shape, &b_win),
        &layout.grid_path("_mask_B_vox_mindist_2_all_A_mask_vox"),
    )?;

    // 质心标记: 质心坐标向零取整落点.
    save_grid(
        a.header(),
        marker_map(shape, &[an.cog_a.trunc_idx()]),
        &layout.grid_path("_mask_A_COG"),
    )?;
    save_grid(
        b.header(),
        marker_map(shape, &[an.cog_b.trunc_idx()]),
        &layout.grid_path("_mask_B_COG"),
    )?;

    Ok(measures)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::analyse;
    use crate::geom::identity_affine;
    use ndarray::{s, Array3};

    fn cube_at(lo: usize) -> MaskVolume {
        let mut data = Array3::zeros((24, 24, 24));
        data.slice_mut(s![lo..lo + 3, lo..lo + 3, lo..lo + 3])
            .fill(1u16);
        MaskVolume::synthetic(data, identity_affine())
    }

    fn tag() -> SubjectTag {
        SubjectTag::from_path("/data/sub-T001_session/mask.nii.gz").unwrap()
    }

    #[test]
    fn test_layout_naming_contract() {
        let layout = OutputLayout::new("/tmp/x", "trial", tag());
        assert_eq!(layout.dir(), Path::new("/tmp/x/trial_output"));
        assert_eq!(
            layout.grid_path("_mask_A_edge"),
            Path::new("/tmp/x/trial_output/trial_T001_mask_A_edge.nii.gz")
        );
        assert_eq!(
            layout.measures_path(),
            Path::new("/tmp/x/trial_output/trial_output_T001_output_measures.txt")
        );
    }

    #[test]
    fn test_marker_map_blob_and_core() {
        let m = marker_map((24, 24, 24), &[(12, 12, 12)]);
        assert_eq!(m[(12, 12, 12)], MARKER_CORE);
        // 膨胀 5 次后, 斑块沿轴向伸展 5 体素.
        assert_eq!(m[(17, 12, 12)], FOREGROUND);
        assert_eq!(m[(12, 12, 18)], BACKGROUND);
    }

    #[test]
    fn test_emit_no_overlap_writes_expected_files() {
        let dir = tempfile::tempdir().unwrap();
        let (a, b) = (cube_at(0), cube_at(10));
        let an = analyse(&a, &b).unwrap();

        let layout = OutputLayout::new(dir.path(), "KUL_EDs", tag());
        let measures = emit_all(&layout, &a, &b, &an).unwrap();

        for suffix in [
            "_mask_A_edge",
            "_mask_B_edge",
            "_mask_A",
            "_mask_B",
            "_mask_A_eroded",
            "_mask_B_eroded",
            "_mask_A_vox_mindist_2_all_B_mask_vox",
            "_mask_B_vox_mindist_2_all_A_mask_vox",
            "_mask_A_COG",
            "_mask_B_COG",
        ] {
            assert!(layout.grid_path(suffix).is_file(), "{suffix}");
        }
        // 无重叠分支不产生重叠网格.
        assert!(!layout.grid_path("_initial_overlapping_voxels").exists());

        let text = std::fs::read_to_string(&measures).unwrap();
        assert!(text.starts_with("No overlap found between both masks"));
        assert!(text.contains("Minimum distance between all voxels of mask A and mask B"));

        // 标记图可以按 mask 格式读回, 中心为 MARKER_CORE.
        let marker = MaskVolume::open(layout.grid_path("_mask_A_COG")).unwrap();
        assert_eq!(marker[(1, 1, 1)], MARKER_CORE);
        assert!(marker.count_nonzero() > 1);
    }

    #[test]
    fn test_emit_overlap_writes_overlap_set() {
        let dir = tempfile::tempdir().unwrap();
        let (a, b) = (cube_at(6), cube_at(6));
        let an = analyse(&a, &b).unwrap();

        let layout = OutputLayout::new(dir.path(), "ov", tag());
        let measures = emit_all(&layout, &a, &b, &an).unwrap();

        for suffix in [
            "_initial_overlapping_voxels",
            "_initial_overlapping_voxels_COG",
            "_maskA_vox_mindist_2_overlap_COG",
            "_overlap_vox_mindist_2_mask_A_COG",
            "_overlap_vox_mindist_2_mask_B_COG",
        ] {
            assert!(layout.grid_path(suffix).is_file(), "{suffix}");
        }

        let text = std::fs::read_to_string(&measures).unwrap();
        assert!(text.starts_with("Initial overlap found between both masks"));
        // 前言在前, 公共测量追加在后.
        assert!(
            text.find("Number of overlapping voxels").unwrap()
                < text.find("Minimum distance between all voxels").unwrap()
        );

        let ov_map = MaskVolume::open(layout.grid_path("_initial_overlapping_voxels")).unwrap();
        assert_eq!(ov_map.count_nonzero(), 27);
    }
}
