use super::ModelError;
use super::frame::Frame;
use super::topology::Topology;

/// An in-memory trajectory: a fixed topology and an ordered list of frames.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Trajectory {
    topology: Topology,
    frames: Vec<Frame>,
}

impl Trajectory {
    pub fn new(topology: Topology, frames: Vec<Frame>) -> Result<Self, ModelError> {
        let expected = 3 * topology.num_atoms();
        for (frame, f) in frames.iter().enumerate() {
            if f.coords.len() != expected {
                return Err(ModelError::FrameSize {
                    frame,
                    expected,
                    found: f.coords.len(),
                });
            }
        }
        Ok(Self { topology, frames })
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn frames_mut(&mut self) -> &mut [Frame] {
        &mut self.frames
    }

    pub fn num_frames(&self) -> usize {
        self.frames.len()
    }

    pub fn num_atoms(&self) -> usize {
        self.topology.num_atoms()
    }
}
