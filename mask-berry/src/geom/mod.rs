//! 体素点集, 质心与仿射坐标变换.

use ndarray::ArrayView3;

use crate::consts::label::*;
use crate::data::VolumeMeta;
use crate::{Affine4, Coord3d, Idx3d, MaskVolume};

pub mod distance;
pub mod overlap;

/// 4x4 单位仿射. 体素索引与毫米坐标一一对应.
pub const fn identity_affine() -> Affine4 {
    let mut m = [[0.0f64; 4]; 4];
    m[0][0] = 1.0;
    m[1][1] = 1.0;
    m[2][2] = 1.0;
    m[3][3] = 1.0;
    m
}

/// 将连续体素坐标映射到毫米物理坐标: `mm = A · [x, y, z, 1]ᵗ`,
/// 输出时丢弃齐次分量.
#[inline]
pub fn apply_affine(aff: &Affine4, [x, y, z]: [f64; 3]) -> Coord3d {
    let mut out = [0.0f64; 3];
    for (o, row) in out.iter_mut().zip(aff.iter()) {
        *o = row[0] * x + row[1] * y + row[2] * z + row[3];
    }
    out
}

/// [`apply_affine`] 的整数索引版本.
#[inline]
pub fn apply_affine_idx(aff: &Affine4, (x, y, z): Idx3d) -> Coord3d {
    apply_affine(aff, [x as f64, y as f64, z as f64])
}

/// 一个网格的非零体素集合, 以及经 affine 换算到毫米空间的平行数组.
///
/// 两个数组下标一一对应, 顺序为行优先遍历序.
#[derive(Debug, Clone)]
pub struct VoxelSet {
    ijk: Vec<Idx3d>,
    xyz: Vec<Coord3d>,
}

impl VoxelSet {
    /// 收集 `data` 中所有非零体素, 并用 `aff` 换算毫米坐标.
    pub fn from_nonzero(data: ArrayView3<'_, u16>, aff: &Affine4) -> Self {
        let ijk: Vec<Idx3d> = data
            .indexed_iter()
            .filter_map(|(pos, p)| is_foreground(*p).then_some(pos))
            .collect();
        let xyz = ijk.iter().map(|&pos| apply_affine_idx(aff, pos)).collect();
        Self { ijk, xyz }
    }

    /// 收集 `vol` 中所有非零体素, affine 取自其 header.
    #[inline]
    pub fn from_volume(vol: &MaskVolume) -> Self {
        Self::from_nonzero(vol.data(), &vol.affine4())
    }

    /// 点集大小.
    #[inline]
    pub fn len(&self) -> usize {
        self.ijk.len()
    }

    /// 点集是否为空? 对空点集的一切距离查询均无定义.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ijk.is_empty()
    }

    /// 第 `i` 个体素索引.
    #[inline]
    pub fn ijk(&self, i: usize) -> Idx3d {
        self.ijk[i]
    }

    /// 第 `i` 个体素的毫米坐标.
    #[inline]
    pub fn xyz(&self, i: usize) -> Coord3d {
        self.xyz[i]
    }

    /// 全部体素索引.
    #[inline]
    pub fn indices(&self) -> &[Idx3d] {
        &self.ijk
    }

    /// 全部毫米坐标.
    #[inline]
    pub fn coords(&self) -> &[Coord3d] {
        &self.xyz
    }
}

/// mask 的重心 (label 加权平均体素索引), 以及经 affine 换算的毫米坐标.
#[derive(Debug, Copy, Clone)]
pub struct Cog {
    /// 连续体素空间坐标.
    pub vox: [f64; 3],

    /// 毫米空间坐标.
    pub mm: Coord3d,
}

impl Cog {
    /// 计算 `data` 的加权质心, 权值为体素的原始 label 值.
    ///
    /// 全零网格的质心不存在, 返回 `None`. 调用方必须在上游挡掉这种情况.
    pub fn of_weighted(data: ArrayView3<'_, u16>, aff: &Affine4) -> Option<Self> {
        let mut acc = [0.0f64; 3];
        let mut total = 0.0f64;
        for ((x, y, z), p) in data.indexed_iter() {
            let w = *p as f64;
            if w != 0.0 {
                acc[0] += w * x as f64;
                acc[1] += w * y as f64;
                acc[2] += w * z as f64;
                total += w;
            }
        }
        (total != 0.0).then(|| {
            let vox = acc.map(|v| v / total);
            Self {
                vox,
                mm: apply_affine(aff, vox),
            }
        })
    }

    /// 计算 `vol` 的加权质心, affine 取自其 header.
    #[inline]
    pub fn of_volume(vol: &MaskVolume) -> Option<Self> {
        Self::of_weighted(vol.data(), &vol.affine4())
    }

    /// 质心坐标向零取整得到的体素索引, 用于在标记图中落点.
    #[inline]
    pub fn trunc_idx(&self) -> Idx3d {
        (
            self.vox[0] as usize,
            self.vox[1] as usize,
            self.vox[2] as usize,
        )
    }
}
