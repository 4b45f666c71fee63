//! Double-buffered position grid.
//!
//! Two identical `Rg16Uint` textures alternate roles every trace step. The slot holding
//! the authoritative grid is the *primary*; the other one is the next write target.

use glam::UVec2;

use super::{create_data_texture, read_texture, POSITION_FORMAT};
use crate::error::Result;
use crate::positions::{initial_grid_data, PositionGrid};

/// Which of the two textures a role refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PositionSlot {
    A,
    B,
}

impl PositionSlot {
    pub fn other(self) -> Self {
        match self {
            PositionSlot::A => PositionSlot::B,
            PositionSlot::B => PositionSlot::A,
        }
    }

    pub fn index(self) -> usize {
        match self {
            PositionSlot::A => 0,
            PositionSlot::B => 1,
        }
    }
}

pub struct PositionTextures {
    textures: [wgpu::Texture; 2],
    views: [wgpu::TextureView; 2],
    primary: PositionSlot,
    num_lines: u32,
    num_line_points: u32,
}

impl PositionTextures {
    /// Allocate both grids and upload the seeded starting rows into each.
    ///
    /// A grid of zero points per line still allocates its starting row.
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        seed: &str,
        num_lines: u32,
        num_line_points: u32,
    ) -> Result<Self> {
        let rows = num_line_points.max(1);
        let size = UVec2::new(num_lines, rows);
        let textures = [
            create_data_texture(device, "Positions A", size, POSITION_FORMAT)?,
            create_data_texture(device, "Positions B", size, POSITION_FORMAT)?,
        ];

        let data = initial_grid_data(seed, num_lines, rows);
        for texture in &textures {
            queue.write_texture(
                wgpu::TexelCopyTextureInfo {
                    texture,
                    mip_level: 0,
                    origin: wgpu::Origin3d::ZERO,
                    aspect: wgpu::TextureAspect::All,
                },
                bytemuck::cast_slice(&data),
                wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(num_lines * 4),
                    rows_per_image: Some(rows),
                },
                texture.size(),
            );
        }

        let views = [
            textures[0].create_view(&wgpu::TextureViewDescriptor::default()),
            textures[1].create_view(&wgpu::TextureViewDescriptor::default()),
        ];

        tracing::debug!(num_lines, num_line_points, seed, "allocated position grids");

        Ok(Self {
            textures,
            views,
            primary: PositionSlot::A,
            num_lines,
            num_line_points,
        })
    }

    pub fn primary(&self) -> PositionSlot {
        self.primary
    }

    /// Exchange primary and temp roles.
    pub fn swap(&mut self) {
        self.primary = self.primary.other();
    }

    pub fn view(&self, slot: PositionSlot) -> &wgpu::TextureView {
        &self.views[slot.index()]
    }

    pub fn texture(&self, slot: PositionSlot) -> &wgpu::Texture {
        &self.textures[slot.index()]
    }

    pub fn primary_view(&self) -> &wgpu::TextureView {
        self.view(self.primary)
    }

    pub fn num_lines(&self) -> u32 {
        self.num_lines
    }

    pub fn num_line_points(&self) -> u32 {
        self.num_line_points
    }

    /// Bytes held by both grids.
    pub fn byte_size(&self) -> u64 {
        2 * self.num_lines as u64 * self.num_line_points.max(1) as u64 * 4
    }

    /// Copy one grid to the CPU.
    pub fn read(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        slot: PositionSlot,
    ) -> Result<PositionGrid> {
        let bytes = read_texture(device, queue, self.texture(slot), 4)?;
        let len = self.num_lines as usize * self.num_line_points as usize;
        let data = bytes
            .chunks_exact(4)
            .take(len)
            .map(|texel| {
                [
                    u16::from_le_bytes([texel[0], texel[1]]),
                    u16::from_le_bytes([texel[2], texel[3]]),
                ]
            })
            .collect();
        Ok(PositionGrid {
            num_lines: self.num_lines,
            num_line_points: self.num_line_points,
            data,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_other_and_index() {
        assert_eq!(PositionSlot::A.other(), PositionSlot::B);
        assert_eq!(PositionSlot::B.other(), PositionSlot::A);
        assert_eq!(PositionSlot::A.other().other(), PositionSlot::A);
        assert_ne!(PositionSlot::A.index(), PositionSlot::B.index());
    }
}
