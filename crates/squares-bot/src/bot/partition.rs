/// A fixed arena split by an externally owned cursor: slots `[0, cursor)`
/// are consumed (in the order they were consumed) and `[cursor, N)` are
/// open, in no particular order. Values move between the halves only by
/// swapping, so the arena is always a permutation of its initial contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionedArray<T, const N: usize> {
    slots: [T; N],
}

impl<T: Copy + PartialEq, const N: usize> PartitionedArray<T, N> {
    pub const fn new(slots: [T; N]) -> Self {
        Self { slots }
    }

    pub fn reset(&mut self, slots: [T; N]) {
        self.slots = slots;
    }

    pub const fn capacity(&self) -> usize {
        N
    }

    pub fn get(&self, position: usize) -> T {
        self.slots[position]
    }

    pub fn consumed(&self, cursor: usize) -> &[T] {
        &self.slots[..cursor]
    }

    pub fn open(&self, cursor: usize) -> &[T] {
        &self.slots[cursor..]
    }

    /// Position of `value` within the open half, if it is there.
    pub fn find_open(&self, cursor: usize, value: T) -> Option<usize> {
        self.slots[cursor..]
            .iter()
            .position(|slot| *slot == value)
            .map(|offset| cursor + offset)
    }

    /// Swap `value` from the open half into slot `cursor`. Returns the
    /// position it came from so the move can be reverted.
    pub fn promote(&mut self, cursor: usize, value: T) -> Option<usize> {
        let from = self.find_open(cursor, value)?;
        self.slots.swap(cursor, from);
        Some(from)
    }

    pub fn swap(&mut self, a: usize, b: usize) {
        self.slots.swap(a, b);
    }

    pub fn as_slice(&self) -> &[T] {
        &self.slots
    }
}
