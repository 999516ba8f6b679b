//! Selection index
//!
//! Maps between move index, move id and source line for one published move
//! list. An index remembers the generation it was built for; once the job
//! publishes a newer list or resets, every lookup through the old index
//! fails with [`IndexError::Stale`].

use nckit_core::{IndexError, MoveId};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::moves::{Move, MoveList};

/// Lookup tables derived from one move list
#[derive(Debug, Clone)]
pub struct SelectionIndex {
    moves: Arc<MoveList>,
    by_id: HashMap<MoveId, usize>,
    by_line: BTreeMap<usize, Vec<usize>>,
    generation: u64,
    live_generation: Arc<AtomicU64>,
}

impl SelectionIndex {
    /// Build an index for `moves`, published as `generation`
    ///
    /// `live_generation` is the job's currently published generation.
    pub fn new(moves: Arc<MoveList>, generation: u64, live_generation: Arc<AtomicU64>) -> Self {
        let mut by_id = HashMap::with_capacity(moves.len());
        let mut by_line: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
        for (index, mv) in moves.iter().enumerate() {
            by_id.insert(mv.id, index);
            by_line.entry(mv.line).or_default().push(index);
        }
        Self {
            moves,
            by_id,
            by_line,
            generation,
            live_generation,
        }
    }

    /// Index that is never invalidated, for a move list outside a job
    pub fn detached(moves: Arc<MoveList>) -> Self {
        Self::new(moves, 0, Arc::new(AtomicU64::new(0)))
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_stale(&self) -> bool {
        self.live_generation.load(Ordering::SeqCst) != self.generation
    }

    pub fn len(&self) -> usize {
        self.moves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.moves.is_empty()
    }

    fn check(&self) -> Result<(), IndexError> {
        let current = self.live_generation.load(Ordering::SeqCst);
        if current != self.generation {
            return Err(IndexError::Stale {
                index_generation: self.generation,
                current_generation: current,
            });
        }
        Ok(())
    }

    /// Move at an execution-order index
    pub fn move_at(&self, index: usize) -> Result<&Move, IndexError> {
        self.check()?;
        self.moves.get(index).ok_or(IndexError::OutOfRange {
            index,
            len: self.moves.len(),
        })
    }

    /// Execution-order index of a move id
    pub fn index_of(&self, id: MoveId) -> Result<usize, IndexError> {
        self.check()?;
        self.by_id
            .get(&id)
            .copied()
            .ok_or(IndexError::UnknownMove { id })
    }

    /// Source line of the move at an index
    pub fn line_of(&self, index: usize) -> Result<usize, IndexError> {
        self.move_at(index).map(|mv| mv.line)
    }

    /// Indices of all moves produced by one source line, in order
    pub fn moves_on_line(&self, line: usize) -> Result<&[usize], IndexError> {
        self.check()?;
        Ok(self.by_line.get(&line).map(Vec::as_slice).unwrap_or(&[]))
    }
}
