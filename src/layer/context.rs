use super::{NeuraLayer, NeuraLayerStructure};
use crate::err::{NeuraErr, NeuraResult};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NeuraContextKind {
    /// Single step, no neighbours
    Empty,
    /// Only a previous step: the last step of a sequence
    Back,
    /// Only a next step: the first step of a sequence
    Front,
    /// Both neighbours: an interior step
    Bilateral,
}

/// Gives a layer structure access to the structures of the same layer at the previous and
/// at the next time step. It only borrows them from the sequence held by the processor.
#[derive(Clone, Copy, Debug)]
pub struct NeuraContextWindow<'a> {
    before: &'a [NeuraLayerStructure],
    after: &'a [NeuraLayerStructure],
}

impl<'a> NeuraContextWindow<'a> {
    pub fn empty() -> Self {
        Self {
            before: &[],
            after: &[],
        }
    }

    pub fn back(prev: &'a NeuraLayerStructure) -> Self {
        Self {
            before: std::slice::from_ref(prev),
            after: &[],
        }
    }

    pub fn front(next: &'a NeuraLayerStructure) -> Self {
        Self {
            before: &[],
            after: std::slice::from_ref(next),
        }
    }

    pub fn bilateral(prev: &'a NeuraLayerStructure, next: &'a NeuraLayerStructure) -> Self {
        Self {
            before: std::slice::from_ref(prev),
            after: std::slice::from_ref(next),
        }
    }

    /// Splits `sequence` at `index`, returning the structure at that step and the window
    /// over its neighbours.
    pub fn split(
        sequence: &'a mut [NeuraLayerStructure],
        index: usize,
    ) -> NeuraResult<(&'a mut NeuraLayerStructure, Self)> {
        if index >= sequence.len() {
            return Err(NeuraErr::InvalidOperation("time step out of the sequence"));
        }

        let (before, rest) = sequence.split_at_mut(index);
        let (current, after) = rest.split_at_mut(1);

        Ok((
            &mut current[0],
            Self {
                before: &*before,
                after: &*after,
            },
        ))
    }

    /// Same as [`Self::split`], without mutable access to the current step.
    pub fn around(sequence: &'a [NeuraLayerStructure], index: usize) -> NeuraResult<(&'a NeuraLayerStructure, Self)> {
        let current = sequence
            .get(index)
            .ok_or(NeuraErr::InvalidOperation("time step out of the sequence"))?;

        Ok((
            current,
            Self {
                before: &sequence[..index],
                after: &sequence[index + 1..],
            },
        ))
    }

    pub fn kind(&self) -> NeuraContextKind {
        match (self.before.is_empty(), self.after.is_empty()) {
            (true, true) => NeuraContextKind::Empty,
            (false, true) => NeuraContextKind::Back,
            (true, false) => NeuraContextKind::Front,
            (false, false) => NeuraContextKind::Bilateral,
        }
    }

    pub fn prev_structure(&self) -> Option<&'a NeuraLayerStructure> {
        self.before.last()
    }

    pub fn next_structure(&self) -> Option<&'a NeuraLayerStructure> {
        self.after.first()
    }

    /// The previous step as an `L`; fails if it belongs to another architecture.
    pub fn prev_state_layer<L: NeuraLayer>(&self) -> NeuraResult<Option<&'a L>> {
        Self::downcast(self.prev_structure())
    }

    /// The next step as an `L`; fails if it belongs to another architecture.
    pub fn next_state_layer<L: NeuraLayer>(&self) -> NeuraResult<Option<&'a L>> {
        Self::downcast(self.next_structure())
    }

    fn downcast<L: NeuraLayer>(
        structure: Option<&'a NeuraLayerStructure>,
    ) -> NeuraResult<Option<&'a L>> {
        match structure {
            None => Ok(None),
            Some(structure) => structure
                .downcast::<L>()
                .map(Some)
                .ok_or(NeuraErr::IncompatibleArchitecture {
                    expected: L::KIND,
                    got: structure.kind(),
                }),
        }
    }
}
