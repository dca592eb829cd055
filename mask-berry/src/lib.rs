#![warn(missing_docs)] // <= 合适时移除它.

//! 核心库. 提供 BIDS 格式脑 MRI 二值 mask (nii 文件) 的结构化信息和几何分析算法.
//!
//! 该 crate 目前仅提供 `safe` 接口.
//!
//! # 注意
//!
//! 1. 该 crate 主要处理由神经影像流水线 (dcm2bids, samseg 等外部工具)
//!   产出的二值 mask 数据. 任何非零 label 都被视为前景.
//! 2. 两个参与比较的 mask 必须位于同一物理空间 (affine 一致且形状一致),
//!   否则所有距离都没有意义, 程序在任何计算之前直接报错.
//! 3. 在非期望情况下, 程序返回类型化错误而不会导致内存错误. As what Rust promises.
//!
//! # 功能概览
//!
//! ### mask 轮廓提取与质心计算 ✅
//!
//! 单次 6-邻域二值腐蚀, 原图与腐蚀图之差即一层体素厚的外轮廓.
//! 质心按 label 加权平均计算, 全零 mask 的质心不存在.
//!
//! 实现位于 `mask-berry/src/data/morph.rs` 和 `mask-berry/src/geom`.
//!
//! ### 穷举式最近体素搜索 ✅
//!
//! 对两个轮廓点集做 O(|A|·|B|) 的毫米空间欧氏距离稠密计算,
//! 记录全局最小值和 **所有** 并列取得最小值的体素对.
//! 该算法没有空间索引加速, 仅适用于局部小区域 mask (已知可扩展性上限).
//!
//! 实现位于 `mask-berry/src/geom/distance.rs`.
//!
//! ### 重叠区域分析 ✅
//!
//! 两个 mask 同时非零的体素集合, 及其体素计数、质心、
//! 相对双方体积的重叠百分比.
//!
//! 实现位于 `mask-berry/src/geom/overlap.rs`.
//!
//! ### 配对分析工作流与结果落盘 ✅
//!
//! 兼容性检查 -> 退化检查 -> 重叠检测分支 -> 距离测量 ->
//! 文本报告 + 辅助标记 nii 文件.
//!
//! 实现位于 `mask-berry/src/analysis`.
//!
//! ### 小功能 ✅
//!
//! 1. BIDS `sub-<token>` 受试者标签的显式解析. ✅
//! 2. 外部影像工具 (mrconvert, antsApplyTransforms 等) 的类型化调用封装. ✅

/// 三维体素索引, 同时也可一定程度上用作非负整数向量.
///
/// 分量依次为 nifti 原生的 (x, y, z) 轴序, 与 affine 直接对应.
pub type Idx3d = (usize, usize, usize);

/// 连续三维坐标. 依据上下文, 单位为体素或毫米.
pub type Coord3d = [f64; 3];

/// 4x4 齐次仿射变换, 将体素索引映射到毫米物理坐标.
pub type Affine4 = [[f64; 4]; 4];

/// 3D mask nii 文件基础数据结构.
mod data;

pub use data::{morph, MaskVolume, VolumeMeta};

pub mod consts;

pub mod error;

pub use error::{MaskError, MaskRole, Result};

pub mod geom;

pub mod analysis;

pub mod bids;

pub mod shell;

pub mod prelude;
