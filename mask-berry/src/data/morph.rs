//! 3D 二值形态学操作.
//!
//! 所有操作都把任何非零体素当作前景, 使用 6-邻域 (钻石型) 结构元,
//! 即 `scipy.ndimage.generate_binary_structure(3, 1)` 的默认连通性.
//! 数据范围之外一律视为背景, 因此位于网格边界上的前景体素
//! 在腐蚀时总会被去掉.

use ndarray::{Array3, ArrayView3};

use crate::consts::label::*;
use crate::Idx3d;

/// `pos` 的前后上下左右六个邻居是否全部存在且均为前景?
///
/// 越界邻居视为背景, 直接返回 `false`.
fn diamond_all_foreground(data: ArrayView3<'_, u16>, (x, y, z): Idx3d) -> bool {
    let (nx, ny, nz) = data.dim();
    if x == 0 || y == 0 || z == 0 || x + 1 >= nx || y + 1 >= ny || z + 1 >= nz {
        return false;
    }
    is_foreground(data[(x - 1, y, z)])
        && is_foreground(data[(x + 1, y, z)])
        && is_foreground(data[(x, y - 1, z)])
        && is_foreground(data[(x, y + 1, z)])
        && is_foreground(data[(x, y, z - 1)])
        && is_foreground(data[(x, y, z + 1)])
}

/// `pos` 的六个邻居中是否存在前景? 越界邻居视为背景.
fn diamond_any_foreground(data: ArrayView3<'_, u16>, (x, y, z): Idx3d) -> bool {
    let (nx, ny, nz) = data.dim();
    (x > 0 && is_foreground(data[(x - 1, y, z)]))
        || (x + 1 < nx && is_foreground(data[(x + 1, y, z)]))
        || (y > 0 && is_foreground(data[(x, y - 1, z)]))
        || (y + 1 < ny && is_foreground(data[(x, y + 1, z)]))
        || (z > 0 && is_foreground(data[(x, y, z - 1)]))
        || (z + 1 < nz && is_foreground(data[(x, y, z + 1)]))
}

/// 单次 6-邻域二值腐蚀.
///
/// 输出为 0/1 网格: 仅当体素本身为前景且六个邻居全部为前景时保留.
/// 单个孤立体素腐蚀后为空.
pub fn erode(data: ArrayView3<'_, u16>) -> Array3<u16> {
    let mut out = Array3::zeros(data.dim());
    for (pos, p) in data.indexed_iter() {
        if is_foreground(*p) && diamond_all_foreground(data, pos) {
            out[pos] = FOREGROUND;
        }
    }
    out
}

/// `iterations` 次 6-邻域二值膨胀.
///
/// 输出为 0/1 网格. `iterations` 为 0 时等价于纯二值化.
pub fn dilate(data: ArrayView3<'_, u16>, iterations: usize) -> Array3<u16> {
    let mut cur = data.mapv(|p| if is_foreground(p) { FOREGROUND } else { BACKGROUND });
    for _ in 0..iterations {
        let mut next = cur.clone();
        for (pos, p) in cur.indexed_iter() {
            if is_background(*p) && diamond_any_foreground(cur.view(), pos) {
                next[pos] = FOREGROUND;
            }
        }
        cur = next;
    }
    cur
}

/// 提取一层体素厚的外轮廓: 二值化原图与单次腐蚀图之差.
///
/// 位于网格边界上的前景体素永远属于轮廓. 对单个孤立体素,
/// 轮廓就是它本身.
pub fn outline(data: ArrayView3<'_, u16>) -> Array3<u16> {
    let eroded = erode(data);
    let mut out = Array3::zeros(data.dim());
    for (pos, p) in data.indexed_iter() {
        if is_foreground(*p) && is_background(eroded[pos]) {
            out[pos] = FOREGROUND;
        }
    }
    out
}
