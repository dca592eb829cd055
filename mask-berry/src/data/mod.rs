use std::ops::{Index, IndexMut};
use std::path::Path;

use ndarray::{Array3, ArrayView, ArrayViewMut, Ix3};
use nifti::{IntoNdArray, NiftiHeader, NiftiObject, ReaderOptions};

use crate::consts::label::*;
use crate::consts::{AFFINE_ATOL, AFFINE_RTOL};
use crate::{Affine4, Idx3d, MaskError, Result};

pub mod morph;

/// `NiftiHeader` 是栈上大对象, 移动该对象的开销很可观.
/// 因此我们将其分配到堆上.
type BoxedHeader = Box<NiftiHeader>;

/// 从 header 获取数据形状. 保持 nifti 原生的 (x, y, z) 轴序,
/// 这样体素索引可以不经置换直接喂给 affine.
#[inline]
fn get_shape_from_header(h: &NiftiHeader) -> Idx3d {
    // [x, y, z]. 体素个数数组.
    let [_, x, y, z, ..] = h.dim;
    (x as usize, y as usize, z as usize)
}

/// 元素级 `allclose` 判定. 语义与 `numpy.allclose` 一致:
/// `|a - b| <= atol + rtol * |b|`.
#[inline]
fn allclose(a: f64, b: f64) -> bool {
    (a - b).abs() <= AFFINE_ATOL + AFFINE_RTOL * b.abs()
}

/// 3D mask nii 文件 header 的共用属性和部分通用操作.
pub trait VolumeMeta {
    /// 获取 header 部分.
    fn header(&self) -> &NiftiHeader;

    /// 获取数据形状大小, (x, y, z) 轴序.
    #[inline]
    fn shape(&self) -> Idx3d {
        get_shape_from_header(self.header())
    }

    /// 获取数据体素个数.
    #[inline]
    fn size(&self) -> usize {
        let (x, y, z) = self.shape();
        x * y * z
    }

    /// 检查索引是否合法.
    #[inline]
    fn check(&self, (x0, y0, z0): &Idx3d) -> bool {
        let (x, y, z) = self.shape();
        *x0 < x && *y0 < y && *z0 < z
    }

    /// 获取该 3D 文件的 4x4 仿射变换: 体素索引 -> 毫米物理坐标.
    ///
    /// 优先采用 sform, 其次 qform, 最后退化为 pixdim 缩放
    /// (优先级由 `nifti` crate 依照 nifti-1 标准决定).
    #[inline]
    fn affine4(&self) -> Affine4 {
        let m = self.header().affine::<f64>();
        let mut out = [[0.0f64; 4]; 4];
        for (i, row) in out.iter_mut().enumerate() {
            for (j, v) in row.iter_mut().enumerate() {
                *v = m[(i, j)];
            }
        }
        out
    }

    /// 获取单个体素分辨率, 以毫米为单位, (x, y, z) 轴序.
    #[inline]
    fn pix_dim(&self) -> [f64; 3] {
        let [_, x, y, z, ..] = self.header().pixdim;
        [x as f64, y as f64, z as f64]
    }

    /// 体素分辨率在三个维度上是否是各向同的?
    #[inline]
    fn is_isotropic(&self) -> bool {
        let [x, y, z] = self.pix_dim();
        x == y && x == z
    }

    /// 获取体素的实际体积值, 以立方毫米为单位.
    #[inline]
    fn voxel_mm3(&self) -> f64 {
        self.pix_dim().iter().product()
    }
}

/// nii 格式 3D mask, 包括 header 和 label 数据. label 值以 `u16` 保存
/// (与原始流水线的 uint16 约定一致).
#[derive(Debug, Clone)]
pub struct MaskVolume {
    header: BoxedHeader,
    data: Array3<u16>,
}

impl VolumeMeta for MaskVolume {
    #[inline]
    fn header(&self) -> &NiftiHeader {
        &self.header
    }
}

impl Index<Idx3d> for MaskVolume {
    type Output = u16;

    #[inline]
    fn index(&self, index: Idx3d) -> &Self::Output {
        &self.data[index]
    }
}

impl IndexMut<Idx3d> for MaskVolume {
    #[inline]
    fn index_mut(&mut self, index: Idx3d) -> &mut Self::Output {
        &mut self.data[index]
    }
}

impl MaskVolume {
    /// 打开 nii (或 nii.gz) 文件格式的 3D mask. `path` 为文件的本地路径.
    /// 如果打开成功, 则返回 `Ok(Self)`, 否则返回携带路径的 `Err`.
    ///
    /// 文件必须是三维体数据, 体素值会被转换为 `u16` 存储.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let nifti_err = |source| MaskError::Nifti {
            path: path.to_path_buf(),
            source,
        };

        let obj = ReaderOptions::new().read_file(path).map_err(&nifti_err)?;
        let header = Box::new(obj.header().clone());

        let ndim = header.dim[0];
        if ndim != 3 {
            return Err(MaskError::NotVolume3d {
                path: path.to_path_buf(),
                ndim,
            });
        }

        // [x, y, z] 轴序按原样保留, 不做置换.
        let data = obj
            .into_volume()
            .into_ndarray::<u16>()
            .map_err(&nifti_err)?;

        // ndim 已经检查过, 该转换不会失败.
        let data = data.into_dimensionality::<Ix3>().map_err(|_| {
            MaskError::NotVolume3d {
                path: path.to_path_buf(),
                ndim,
            }
        })?;

        Ok(Self { header, data })
    }

    /// 将数据写入 `path`. 以 `.nii.gz` 结尾的路径会自动压缩.
    ///
    /// header 的 affine 与 pixdim 沿用本结构的 header,
    /// 形状和数据类型由 `nifti` crate 依照数据自动适配.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        nifti::writer::WriterOptions::new(path)
            .reference_header(&self.header)
            .write_nifti(&self.data)
            .map_err(|source| MaskError::Nifti {
                path: path.to_path_buf(),
                source,
            })
    }

    /// 根据已有 header 和裸数据直接创建 `MaskVolume` 实体.
    /// 用于将派生数组 (轮廓, 标记图等) 包装回与输入同空间的体数据.
    ///
    /// # 注意
    ///
    /// `data` 的形状必须与 `header` 声明的形状一致, 否则程序 panic.
    pub fn with_header(header: &NiftiHeader, data: Array3<u16>) -> Self {
        let header = Box::new(header.clone());
        assert_eq!(
            get_shape_from_header(&header),
            data.dim(),
            "header 与数据形状不一致"
        );
        Self { header, data }
    }

    /// 根据裸数据和 affine 直接创建 `MaskVolume` 实体.
    ///
    /// # 注意
    ///
    /// 该方法可能会创建不一致的实体, 因此你应仅将其用于实验和测试目的.
    pub fn synthetic(data: Array3<u16>, affine: Affine4) -> Self {
        let (x, y, z) = data.dim();

        let mut header = Box::<NiftiHeader>::default();
        header.dim = [3, x as u16, y as u16, z as u16, 1, 1, 1, 1];

        // pixdim 取 affine 各列的范数.
        for j in 0..3 {
            let norm = (0..3).map(|i| affine[i][j] * affine[i][j]).sum::<f64>();
            header.pixdim[j + 1] = (norm.sqrt()) as f32;
        }

        header.sform_code = 1;
        header.srow_x = affine[0].map(|v| v as f32);
        header.srow_y = affine[1].map(|v| v as f32);
        header.srow_z = affine[2].map(|v| v as f32);

        header.intent_name[..4].copy_from_slice(b"synt");

        Self { header, data }
    }

    /// 判断该结构是否是由 [`Self::synthetic`] 手动拼接的.
    pub fn is_synthetic(&self) -> bool {
        self.header.intent_name.starts_with(b"synt")
    }

    /// 检查 `self` 与 `other` 是否位于同一物理空间:
    /// 形状一致, 且 affine 在 `allclose` 容差内元素级相等.
    ///
    /// 这是整个配对分析的第一道检查. 空间不一致时所有距离都没有意义,
    /// 因此失败是致命的, 不做任何后续计算.
    pub fn compatible_with(&self, other: &Self) -> Result<()> {
        if self.shape() != other.shape() {
            return Err(MaskError::IncompatibleGeometry(format!(
                "shape {:?} vs {:?}",
                self.shape(),
                other.shape()
            )));
        }

        let (a, b) = (self.affine4(), other.affine4());
        for i in 0..4 {
            for j in 0..4 {
                if !allclose(a[i][j], b[i][j]) {
                    return Err(MaskError::IncompatibleGeometry(format!(
                        "affine element ({i}, {j}): {} vs {}",
                        a[i][j], b[i][j]
                    )));
                }
            }
        }
        Ok(())
    }

    /// 获取非零体素个数.
    #[inline]
    pub fn count_nonzero(&self) -> usize {
        self.data.iter().filter(|p| is_foreground(**p)).count()
    }

    /// mask 是否不包含任何前景体素?
    #[inline]
    pub fn is_degenerate(&self) -> bool {
        self.data.iter().all(|p| is_background(*p))
    }

    /// 收集所有前景体素对应的下标. 结果按行优先存储.
    pub fn foreground_pos(&self) -> Vec<Idx3d> {
        self.data
            .indexed_iter()
            .filter_map(|(pos, p)| is_foreground(*p).then_some(pos))
            .collect()
    }

    /// 获得一份同形状、同 header 的全零副本.
    #[inline]
    pub fn empty_like(&self) -> Self {
        Self::with_header(&self.header, Array3::zeros(self.data.dim()))
    }

    /// 获得一份 label 归一化到 0/1 的副本. 任何非零 label 都映射为
    /// [`FOREGROUND`].
    pub fn binarized(&self) -> Self {
        let data = self.data.mapv(|p| {
            if is_foreground(p) {
                FOREGROUND
            } else {
                BACKGROUND
            }
        });
        Self::with_header(&self.header, data)
    }

    /// 获得数据的一份不可变 shallow copy.
    #[inline]
    pub fn data(&self) -> ArrayView<'_, u16, Ix3> {
        self.data.view()
    }

    /// 获得数据的一份可变 shallow copy.
    #[inline]
    pub fn data_mut(&mut self) -> ArrayViewMut<'_, u16, Ix3> {
        self.data.view_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom;
    use ndarray::Array3;

    fn unit_cube_at(shape: Idx3d, at: Idx3d) -> MaskVolume {
        let mut data = Array3::zeros(shape);
        data[at] = 1u16;
        MaskVolume::synthetic(data, geom::identity_affine())
    }

    #[test]
    fn test_synthetic_meta() {
        let vol = unit_cube_at((4, 5, 6), (1, 2, 3));
        assert!(vol.is_synthetic());
        assert_eq!(vol.shape(), (4, 5, 6));
        assert_eq!(vol.size(), 120);
        assert_eq!(vol.count_nonzero(), 1);
        assert_eq!(vol.pix_dim(), [1.0, 1.0, 1.0]);
        assert!(vol.is_isotropic());
        assert!(vol.check(&(3, 4, 5)));
        assert!(!vol.check(&(4, 0, 0)));
    }

    #[test]
    fn test_affine_roundtrip_via_header() {
        let mut aff = geom::identity_affine();
        aff[0][0] = 2.0;
        aff[1][3] = -7.5;
        let vol = MaskVolume::synthetic(Array3::zeros((2, 2, 2)), aff);

        let got = vol.affine4();
        for i in 0..4 {
            for j in 0..4 {
                assert!((got[i][j] - aff[i][j]).abs() < 1e-5, "({i}, {j})");
            }
        }
    }

    #[test]
    fn test_compatibility() {
        let a = unit_cube_at((3, 3, 3), (0, 0, 0));
        let b = unit_cube_at((3, 3, 3), (2, 2, 2));
        assert!(a.compatible_with(&b).is_ok());

        // 形状不一致.
        let c = unit_cube_at((3, 3, 4), (0, 0, 0));
        assert!(matches!(
            a.compatible_with(&c),
            Err(MaskError::IncompatibleGeometry(_))
        ));

        // affine 缩放 2 倍.
        let mut aff = geom::identity_affine();
        aff[0][0] = 2.0;
        aff[1][1] = 2.0;
        aff[2][2] = 2.0;
        let d = MaskVolume::synthetic(Array3::zeros((3, 3, 3)), aff);
        assert!(matches!(
            a.compatible_with(&d),
            Err(MaskError::IncompatibleGeometry(_))
        ));
    }

    #[test]
    fn test_binarized_and_positions() {
        let mut data = Array3::zeros((2, 2, 2));
        data[(0, 0, 0)] = 7u16;
        data[(1, 1, 1)] = 1u16;
        let vol = MaskVolume::synthetic(data, geom::identity_affine());

        let bin = vol.binarized();
        assert_eq!(bin[(0, 0, 0)], 1);
        assert_eq!(bin[(1, 1, 1)], 1);
        assert_eq!(bin.count_nonzero(), 2);
        assert_eq!(vol.foreground_pos(), vec![(0, 0, 0), (1, 1, 1)]);
        assert!(!vol.is_degenerate());
        assert!(vol.empty_like().is_degenerate());
    }

    #[test]
    fn test_save_open_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sub-0001_roundtrip.nii.gz");

        let mut data = Array3::zeros((3, 4, 5));
        data[(1, 2, 3)] = 1u16;
        data[(2, 0, 4)] = 1u16;
        let mut aff = geom::identity_affine();
        aff[0][3] = -10.0;
        let vol = MaskVolume::synthetic(data, aff);

        vol.save(&path).unwrap();
        let back = MaskVolume::open(&path).unwrap();

        assert_eq!(back.shape(), vol.shape());
        assert_eq!(back.count_nonzero(), 2);
        assert_eq!(back[(1, 2, 3)], 1);
        assert!(vol.compatible_with(&back).is_ok());
    }

    #[test]
    fn test_open_missing_file() {
        let err = MaskVolume::open("/no/such/file.nii.gz").unwrap_err();
        assert!(matches!(err, MaskError::Nifti { .. }));
    }
}
