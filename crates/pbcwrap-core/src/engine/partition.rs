use super::config::Compound;
use nalgebra::Vector3;
use std::ops::Range;

/// A run of consecutive selected atoms that is shifted as one rigid unit.
///
/// `start..end` indexes into the selection, not into the full coordinate buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Block {
    pub id: usize,
    pub start: usize,
    pub end: usize,
}

impl Block {
    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Per-block history carried from one unwrap frame to the next.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BlockTrack {
    pub previous_reference: Vector3<f64>,
    pub cumulative_shift: Vector3<f64>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct BlockLayout {
    blocks: Vec<Block>,
}

impl BlockLayout {
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn num_blocks(&self) -> usize {
        self.blocks.len()
    }

    /// Allocates one zeroed [`BlockTrack`] per block, indexed by block id.
    pub fn unwrap_state(&self) -> Vec<BlockTrack> {
        vec![BlockTrack::default(); self.blocks.len()]
    }
}

/// Splits a tag sequence into blocks of consecutive equal tags.
///
/// Tags are not sorted first: `[1, 1, 2, 1]` yields three blocks. With
/// [`Compound::None`] every atom becomes its own block regardless of its tag.
pub fn partition(tags: &[i64], compound: Compound) -> BlockLayout {
    let mut blocks: Vec<Block> = Vec::new();
    for (i, tag) in tags.iter().enumerate() {
        let continues = compound != Compound::None && i > 0 && tags[i - 1] == *tag;
        if let Some(block) = blocks.last_mut().filter(|_| continues) {
            block.end = i + 1;
            continue;
        }
        let id = blocks.len();
        blocks.push(Block {
            id,
            start: i,
            end: i + 1,
        });
    }
    BlockLayout { blocks }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spans(layout: &BlockLayout) -> Vec<(usize, usize, usize)> {
        layout
            .blocks()
            .iter()
            .map(|b| (b.id, b.start, b.end))
            .collect()
    }

    #[test]
    fn consecutive_equal_tags_form_blocks() {
        let layout = partition(&[5, 5, 5, 7, 7, 2, 2, 2], Compound::Residue);
        assert_eq!(spans(&layout), vec![(0, 0, 3), (1, 3, 5), (2, 5, 8)]);
        assert_eq!(layout.num_blocks(), 3);
    }

    #[test]
    fn repeated_tags_are_not_merged() {
        let layout = partition(&[1, 1, 2, 1], Compound::Beta);
        assert_eq!(spans(&layout), vec![(0, 0, 2), (1, 2, 3), (2, 3, 4)]);
    }

    #[test]
    fn compound_none_gives_one_block_per_atom() {
        let layout = partition(&[4, 4, 4], Compound::None);
        assert_eq!(spans(&layout), vec![(0, 0, 1), (1, 1, 2), (2, 2, 3)]);
    }

    #[test]
    fn blocks_cover_the_selection_exactly() {
        let tags = [0, 0, 3, 3, 3, -1, 8, 8];
        let layout = partition(&tags, Compound::Fragment);
        let total: usize = layout.blocks().iter().map(Block::len).sum();
        assert_eq!(total, tags.len());
        for pair in layout.blocks().windows(2) {
            assert_eq!(pair[0].end, pair[1].start);
        }
    }

    #[test]
    fn empty_tags_give_empty_layout() {
        let layout = partition(&[], Compound::Residue);
        assert_eq!(layout.num_blocks(), 0);
        assert!(layout.unwrap_state().is_empty());
    }

    #[test]
    fn unwrap_state_is_zeroed_per_block() {
        let layout = partition(&[1, 2, 2], Compound::Residue);
        let state = layout.unwrap_state();
        assert_eq!(state.len(), 2);
        assert!(state.iter().all(|t| *t == BlockTrack::default()));
        assert_eq!(state[1].cumulative_shift, Vector3::zeros());
    }
}
