/// Bounded linear undo/redo history, generic over the stored action type.
///
/// The manager only moves a pointer over recorded actions; executing whatever
/// the action describes is the caller's job. That separation lets the same
/// engine drive undo/redo for any reversible effect.
#[derive(Debug, Clone)]
pub struct HistoryManager<A> {
    entries: Vec<A>,
    /// Number of applied actions; the classic -1-based pointer is
    /// `applied as isize - 1`.
    applied: usize,
    max_size: usize,
}

impl<A> HistoryManager<A> {
    pub const DEFAULT_CAPACITY: usize = 50;

    pub fn new(max_size: usize) -> Self {
        Self {
            entries: Vec::new(),
            applied: 0,
            max_size: max_size.max(1),
        }
    }

    /// Records an already-executed action. Truncates any redo tail beyond the
    /// pointer, then evicts from the front once over capacity.
    pub fn add(&mut self, action: A) {
        self.entries.truncate(self.applied);
        self.entries.push(action);
        if self.entries.len() > self.max_size {
            self.entries.remove(0);
        }
        self.applied = self.entries.len();
    }

    /// Steps the pointer back and returns the action to revert, or `None`
    /// when there is nothing left to undo.
    pub fn undo(&mut self) -> Option<&A> {
        if self.applied == 0 {
            return None;
        }
        self.applied -= 1;
        Some(&self.entries[self.applied])
    }

    /// Steps the pointer forward and returns the action to re-apply.
    pub fn redo(&mut self) -> Option<&A> {
        if self.applied == self.entries.len() {
            return None;
        }
        let action = &self.entries[self.applied];
        self.applied += 1;
        Some(action)
    }

    pub fn can_undo(&self) -> bool {
        self.applied > 0
    }

    pub fn can_redo(&self) -> bool {
        self.applied < self.entries.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.applied = 0;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<A> Default for HistoryManager<A> {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY)
    }
}
