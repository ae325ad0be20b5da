//! Per-frame wrap and unwrap of a flat coordinate buffer.
//!
//! A [`FrameProcessor`] is built once per run from a selection and its block
//! layout, then fed one frame at a time. Wrapping is stateless and can be shared
//! across threads through [`FrameProcessor::wrap_frame`]. Unwrapping remembers the
//! previous reference position of every block and must see frames in order.

use super::config::{ConfigError, Mode};
use super::error::EngineError;
use super::partition::{Block, BlockLayout, BlockTrack};
use super::provider::ProviderError;
use crate::core::geometry::{PeriodicBox, accumulate_unwrap_shift, wrap_shift};
use nalgebra::Vector3;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct FrameProcessor {
    mode: Mode,
    num_atoms: usize,
    selection: Vec<usize>,
    layout: BlockLayout,
    reference_mask: Option<Vec<bool>>,
    center_group: Option<Vec<usize>>,
    tracks: Vec<BlockTrack>,
    primed: bool,
}

impl FrameProcessor {
    /// Validates the inputs and allocates per-block state.
    ///
    /// `reference_mask`, when present, has one entry per selected atom. Every block
    /// must contain at least one masked atom.
    pub fn new(
        mode: Mode,
        num_atoms: usize,
        selection: Vec<usize>,
        layout: BlockLayout,
        reference_mask: Option<Vec<bool>>,
        center_group: Option<Vec<usize>>,
    ) -> Result<Self, EngineError> {
        if mode == Mode::Unwrap && center_group.is_some() {
            return Err(ConfigError::CenterWithUnwrap.into());
        }

        let out_of_range = selection
            .iter()
            .chain(center_group.iter().flatten())
            .find(|&&index| index >= num_atoms);
        if let Some(&index) = out_of_range {
            return Err(ProviderError::AtomOutOfRange { index, num_atoms }.into());
        }

        let covered = layout.blocks().last().map_or(0, |b| b.end);
        if covered != selection.len() {
            return Err(EngineError::BufferSize {
                expected: selection.len(),
                found: covered,
            });
        }
        if let Some(mask) = &reference_mask {
            if mask.len() != selection.len() {
                return Err(EngineError::BufferSize {
                    expected: selection.len(),
                    found: mask.len(),
                });
            }
            if let Some(block) = layout
                .blocks()
                .iter()
                .find(|b| !mask[b.range()].iter().any(|&m| m))
            {
                return Err(EngineError::NoReferenceAtoms { block: block.id });
            }
        }

        let tracks = match mode {
            Mode::Wrap => Vec::new(),
            Mode::Unwrap => layout.unwrap_state(),
        };

        Ok(Self {
            mode,
            num_atoms,
            selection,
            layout,
            reference_mask,
            center_group,
            tracks,
            primed: false,
        })
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn layout(&self) -> &BlockLayout {
        &self.layout
    }

    pub fn num_selected(&self) -> usize {
        self.selection.len()
    }

    /// Whether the next call to [`process_frame`](Self::process_frame) will read a box.
    pub fn needs_box(&self) -> bool {
        match self.mode {
            Mode::Wrap => true,
            Mode::Unwrap => self.primed,
        }
    }

    /// Processes one frame in place.
    ///
    /// `load_box` is only called when the frame actually needs a box, and always
    /// before `coords` is modified.
    pub fn process_frame<F>(&mut self, coords: &mut [f32], load_box: F) -> Result<(), EngineError>
    where
        F: FnOnce() -> Result<PeriodicBox, EngineError>,
    {
        self.check_buffer(coords)?;
        match self.mode {
            Mode::Wrap => {
                let pbc = load_box()?;
                self.wrap_frame(coords, &pbc)
            }
            Mode::Unwrap if !self.primed => {
                self.record_references(coords)?;
                self.primed = true;
                debug!(blocks = self.tracks.len(), "Recorded initial block references");
                Ok(())
            }
            Mode::Unwrap => {
                let pbc = load_box()?;
                self.unwrap_frame(coords, &pbc)
            }
        }
    }

    /// Centers (if configured) and folds every block into the primary cell.
    pub fn wrap_frame(&self, coords: &mut [f32], pbc: &PeriodicBox) -> Result<(), EngineError> {
        self.check_buffer(coords)?;
        let center = self
            .center_group
            .as_ref()
            .and_then(|group| mean_position(coords, group.iter().copied()));
        if let Some(center) = center {
            translate(coords, 0..self.num_atoms, &center);
        }
        for block in self.layout.blocks() {
            let reference = self.reference_position(coords, block)?;
            let shift = wrap_shift(&reference, pbc);
            translate(coords, self.block_atoms(block), &shift);
        }
        Ok(())
    }

    fn record_references(&mut self, coords: &[f32]) -> Result<(), EngineError> {
        for block in self.layout.blocks() {
            let reference = self.reference_position(coords, block)?;
            self.tracks[block.id].previous_reference = reference;
        }
        Ok(())
    }

    fn unwrap_frame(&mut self, coords: &mut [f32], pbc: &PeriodicBox) -> Result<(), EngineError> {
        for block in self.layout.blocks() {
            let reference = self.reference_position(coords, block)?;
            let track = &mut self.tracks[block.id];
            let displacement = reference - track.previous_reference;
            track.previous_reference = reference;
            accumulate_unwrap_shift(&displacement, pbc, &mut track.cumulative_shift);
            let shift = track.cumulative_shift;
            translate(coords, self.block_atoms(block), &shift);
        }
        Ok(())
    }

    fn block_atoms(&self, block: &Block) -> impl Iterator<Item = usize> + '_ {
        self.selection[block.range()].iter().copied()
    }

    fn reference_position(&self, coords: &[f32], block: &Block) -> Result<Vector3<f64>, EngineError> {
        let atoms = self.selection[block.range()].iter().copied();
        let reference = match &self.reference_mask {
            Some(mask) => {
                let flags = &mask[block.range()];
                mean_position(coords, atoms.zip(flags).filter(|(_, m)| **m).map(|(i, _)| i))
            }
            None => mean_position(coords, atoms),
        };
        reference.ok_or(EngineError::NoReferenceAtoms { block: block.id })
    }

    fn check_buffer(&self, coords: &[f32]) -> Result<(), EngineError> {
        let expected = 3 * self.num_atoms;
        if coords.len() != expected {
            return Err(EngineError::BufferSize {
                expected,
                found: coords.len(),
            });
        }
        Ok(())
    }
}

/// Mean position of the given atoms, accumulated in double precision.
fn mean_position(coords: &[f32], atoms: impl Iterator<Item = usize>) -> Option<Vector3<f64>> {
    let mut sum = Vector3::zeros();
    let mut count = 0usize;
    for i in atoms {
        let p = &coords[3 * i..3 * i + 3];
        sum += Vector3::new(p[0] as f64, p[1] as f64, p[2] as f64);
        count += 1;
    }
    (count > 0).then(|| sum / count as f64)
}

fn translate(coords: &mut [f32], atoms: impl Iterator<Item = usize>, shift: &Vector3<f64>) {
    for i in atoms {
        for axis in 0..3 {
            let value = &mut coords[3 * i + axis];
            *value = (*value as f64 - shift[axis]) as f32;
        }
    }
}
