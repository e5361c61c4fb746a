//! Box-filtered mip levels built once per tile on load.

use crate::voxel::VoxelBuffer;

/// Linear reduction factor between successive levels.
const FACTOR: u32 = 4;

/// Resolution a sample is read at.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MipLevel {
    /// Native tile resolution.
    Full,
    /// One voxel per 4×4 block.
    Mip4,
    /// One voxel per 16×16 block.
    Mip16,
}

impl MipLevel {
    /// Shift applied to local coordinates for this level.
    pub fn shift(self) -> u32 {
        match self {
            MipLevel::Full => 0,
            MipLevel::Mip4 => 2,
            MipLevel::Mip16 => 4,
        }
    }
}

/// The 4×4 and 16×16 averages of a tile.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Mips {
    mip4: VoxelBuffer,
    mip4_edge: u32,
    mip16: VoxelBuffer,
    mip16_edge: u32,
}

impl Mips {
    /// Build both levels from a full-resolution buffer with edge `edge`.
    pub fn build(full: &VoxelBuffer, edge: u32) -> Self {
        let (mip4, mip4_edge) = downsample(full, edge);
        let (mip16, mip16_edge) = downsample(&mip4, mip4_edge);
        Self {
            mip4,
            mip4_edge,
            mip16,
            mip16_edge,
        }
    }

    /// Buffer and edge for `level`. `None` for [`MipLevel::Full`].
    pub fn level(&self, level: MipLevel) -> Option<(&VoxelBuffer, u32)> {
        match level {
            MipLevel::Full => None,
            MipLevel::Mip4 => Some((&self.mip4, self.mip4_edge)),
            MipLevel::Mip16 => Some((&self.mip16, self.mip16_edge)),
        }
    }
}

/// One level down: each output record is the truncated mean of a 4×4 block.
/// Blocks running past the input edge replicate the edge record.
pub fn downsample(fine: &VoxelBuffer, edge: u32) -> (VoxelBuffer, u32) {
    let coarse_edge = (edge / FACTOR).max(1);
    let buffer = match fine {
        VoxelBuffer::FullColor(records) => {
            VoxelBuffer::FullColor(box_filter(records, edge, coarse_edge))
        }
        VoxelBuffer::Monochrome(records) => {
            VoxelBuffer::Monochrome(box_filter(records, edge, coarse_edge))
        }
    };
    (buffer, coarse_edge)
}

fn box_filter<const N: usize>(fine: &[[u8; N]], edge: u32, coarse_edge: u32) -> Vec<[u8; N]> {
    let edge = edge as usize;
    let coarse_edge = coarse_edge as usize;
    let factor = FACTOR as usize;
    let mut out = Vec::with_capacity(coarse_edge * coarse_edge);

    for cy in 0..coarse_edge {
        for cx in 0..coarse_edge {
            let mut sums = [0u32; N];
            for dy in 0..factor {
                let y = (cy * factor + dy).min(edge - 1);
                for dx in 0..factor {
                    let x = (cx * factor + dx).min(edge - 1);
                    let record = &fine[y * edge + x];
                    for (sum, &channel) in sums.iter_mut().zip(record) {
                        *sum += channel as u32;
                    }
                }
            }
            out.push(sums.map(|sum| (sum / (factor * factor) as u32) as u8));
        }
    }

    out
}
