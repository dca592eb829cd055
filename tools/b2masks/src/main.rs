//! 两个二值 mask 的配对几何分析命令行入口.
//!
//! 读入同一受试者空间下的 mask A (较小的局部区域) 与 mask B
//! (较大的参考区域), 运行完整分析, 把标量结果打印到终端,
//! 并把文本报告与全部标记 nii 文件写入 `<prefix>_output/`.

use std::env;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use mask_berry::prelude::*;

#[derive(Parser)]
#[command(name = "b2masks")]
#[command(about = "Pairwise geometric analysis of two binary masks", long_about = None)]
struct Cli {
    /// First mask (the smaller, focal region), NIfTI format
    #[arg(short = 'a', long = "in1")]
    mask_a: PathBuf,

    /// Second mask (the larger, reference region), NIfTI format
    #[arg(short = 'b', long = "in2")]
    mask_b: PathBuf,

    /// Output prefix for the report and marker volumes
    #[arg(short = 'o', long = "out", default_value = "KUL_EDs")]
    prefix: String,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let tag = SubjectTag::from_path(&cli.mask_a)?;
    let a = MaskVolume::open(&cli.mask_a)
        .with_context(|| format!("cannot load mask A from {}", cli.mask_a.display()))?;
    let b = MaskVolume::open(&cli.mask_b)
        .with_context(|| format!("cannot load mask B from {}", cli.mask_b.display()))?;

    let an = analyse(&a, &b)?;
    print!("{}", mask_berry::analysis::cli_summary(&an));

    let cwd = env::current_dir().context("cannot resolve working directory")?;
    let layout = OutputLayout::new(cwd, &cli.prefix, tag);
    let measures = emit_all(&layout, &a, &b, &an)?;
    println!("Measures written to {}", measures.display());

    Ok(())
}
