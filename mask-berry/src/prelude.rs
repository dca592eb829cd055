//! 🍇欢迎光临🍓
//!
//! 涵盖了本 crate 一系列常用的功能.

pub use crate::{Affine4, Coord3d, Idx3d};

pub use crate::data::{morph, MaskVolume, VolumeMeta};

pub use crate::consts::label::{BACKGROUND, FOREGROUND, MARKER_CORE};
pub use crate::consts::{AFFINE_ATOL, AFFINE_RTOL, MARKER_DILATE_ITERS};

pub use crate::geom::distance::{PairMin, PointMin};
pub use crate::geom::overlap::OverlapRegion;
pub use crate::geom::{Cog, VoxelSet};

pub use crate::analysis::{analyse, emit_all, OutputLayout, PairAnalysis};

pub use crate::bids::SubjectTag;
pub use crate::error::{MaskError, MaskRole, Result};
