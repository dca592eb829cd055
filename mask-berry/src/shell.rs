//! 外部影像工具调用.
//!
//! 研究流水线里的重活 (mrconvert, mrinfo, mri_robust_template,
//! antsApplyTransforms, samseg) 全部由第三方工具完成, 本 crate 不实现
//! 它们的任何算法, 只提供一个类型化的调用入口: 捕获 stdout,
//! 检查退出状态. 退出码绝不被吞掉, 非零即错误.

use std::ffi::OsStr;
use std::process::Command;

use crate::{MaskError, Result};

/// 外部工具的一次成功调用结果.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    /// 捕获到的 stdout, 按 UTF-8 (lossy) 解码.
    pub stdout: String,

    /// 退出状态码. 成功路径下恒为 0.
    pub code: i32,
}

/// 运行外部命令 `command args...`, 等待其结束并捕获输出.
///
/// 1. 无法启动 (命令不存在等) 时返回 [`MaskError::ToolSpawn`];
/// 2. 以非零状态退出时返回 [`MaskError::ToolFailed`], 携带状态码和 stderr;
/// 3. 否则返回捕获到的 stdout.
pub fn run_tool<S, I>(command: &str, args: I) -> Result<ToolOutput>
where
    S: AsRef<OsStr>,
    I: IntoIterator<Item = S>,
{
    let output = Command::new(command)
        .args(args)
        .output()
        .map_err(|source| MaskError::ToolSpawn {
            command: command.to_owned(),
            source,
        })?;

    if !output.status.success() {
        return Err(MaskError::ToolFailed {
            command: command.to_owned(),
            code: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        });
    }

    Ok(ToolOutput {
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        code: output.status.code().unwrap_or(0),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stdout_is_captured() {
        let out = run_tool("echo", ["hello", "mask"]).unwrap();
        assert_eq!(out.stdout.trim(), "hello mask");
        assert_eq!(out.code, 0);
    }

    #[test]
    fn test_nonzero_exit_is_an_error() {
        let err = run_tool("sh", ["-c", "echo oops >&2; exit 3"]).unwrap_err();
        match err {
            MaskError::ToolFailed {
                command,
                code,
                stderr,
            } => {
                assert_eq!(command, "sh");
                assert_eq!(code, Some(3));
                assert_eq!(stderr.trim(), "oops");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_missing_binary_is_a_spawn_error() {
        let err = run_tool("definitely-not-a-real-tool-2026", [""; 0]).unwrap_err();
        assert!(matches!(err, MaskError::ToolSpawn { .. }));
    }
}
