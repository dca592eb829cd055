//! 运行时错误.
//!
//! 所有致命条件都会以类型化错误的形式向上传播, 由批处理入口统一输出诊断
//! 并以非零状态码退出. 本工具是一次性批处理, 任何错误都不会重试.

use std::fmt;
use std::path::PathBuf;

/// `Result` 别名.
pub type Result<T> = std::result::Result<T, MaskError>;

/// 参与配对分析的 mask 角色.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum MaskRole {
    /// 第一个 (约定上较小、更局部的) mask.
    A,

    /// 第二个 (约定上较大的参考) mask.
    B,
}

impl fmt::Display for MaskRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MaskRole::A => write!(f, "A"),
            MaskRole::B => write!(f, "B"),
        }
    }
}

/// 几何分析的运行时错误.
#[derive(Debug)]
pub enum MaskError {
    /// 两个 mask 不在同一物理空间 (affine 超出容差或形状不一致).
    ///
    /// 携带的字符串描述具体的不一致之处.
    IncompatibleGeometry(String),

    /// mask 不包含任何非零体素, 质心与距离均无定义.
    DegenerateMask(MaskRole),

    /// mask A 路径中不存在 `sub-<token>` 形式的 BIDS 受试者标签,
    /// 无法构造输出文件名.
    MissingSubjectTag(PathBuf),

    /// nii 文件不是三维体数据.
    NotVolume3d {
        /// 文件路径.
        path: PathBuf,

        /// 文件头中声明的维度数.
        ndim: u16,
    },

    /// nii 文件读写错误.
    Nifti {
        /// 出错的文件路径.
        path: PathBuf,

        /// 底层错误.
        source: nifti::NiftiError,
    },

    /// 普通 I/O 错误.
    Io {
        /// 出错的文件或目录路径.
        path: PathBuf,

        /// 底层错误.
        source: std::io::Error,
    },

    /// 外部工具无法启动.
    ToolSpawn {
        /// 命令名.
        command: String,

        /// 底层错误.
        source: std::io::Error,
    },

    /// 外部工具以非零状态退出. 状态码绝不被吞掉.
    ToolFailed {
        /// 命令名.
        command: String,

        /// 退出状态码. 进程被信号终止时为 `None`.
        code: Option<i32>,

        /// 捕获到的 stderr 内容.
        stderr: String,
    },
}

impl fmt::Display for MaskError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MaskError::IncompatibleGeometry(detail) => {
                write!(f, "the input masks are not in the same space: {detail}")
            }
            MaskError::DegenerateMask(role) => {
                write!(
                    f,
                    "mask {role} has no nonzero voxels, center of gravity is undefined"
                )
            }
            MaskError::MissingSubjectTag(path) => {
                write!(
                    f,
                    "no `sub-<token>` path component in `{}`, cannot name outputs",
                    path.display()
                )
            }
            MaskError::NotVolume3d { path, ndim } => {
                write!(
                    f,
                    "`{}` is not a 3D volume (got {ndim} dimensions)",
                    path.display()
                )
            }
            MaskError::Nifti { path, source } => {
                write!(f, "nifti error on `{}`: {source}", path.display())
            }
            MaskError::Io { path, source } => {
                write!(f, "i/o error on `{}`: {source}", path.display())
            }
            MaskError::ToolSpawn { command, source } => {
                write!(f, "failed to spawn external tool `{command}`: {source}")
            }
            MaskError::ToolFailed {
                command,
                code,
                stderr,
            } => match code {
                Some(c) => write!(f, "external tool `{command}` exited with {c}: {stderr}"),
                None => write!(f, "external tool `{command}` killed by signal: {stderr}"),
            },
        }
    }
}

impl std::error::Error for MaskError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MaskError::Nifti { source, .. } => Some(source),
            MaskError::Io { source, .. } | MaskError::ToolSpawn { source, .. } => Some(source),
            _ => None,
        }
    }
}
