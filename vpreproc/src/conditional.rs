//! Conditional-compilation bookkeeping.
//!
//! The [`ConditionalStack`] is shared by a top-level run and every file it
//! includes, while each scan level owns its own [`ExclusionCursor`]. A frame
//! is `suppressing` only when it is the one that started the cursor's current
//! exclusion; nested frames opened inside an excluded block never are, which
//! keeps their `else`/`endif` inert.

use crate::region::Region;

/// One open `ifdef`/`ifndef` block
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ConditionalFrame {
    /// Whether the currently selected branch of this block is the kept one
    pub branch_active: bool,
    /// Whether this frame started the current exclusion
    pub suppressing: bool,
}

/// Exclusion state of a single scan level
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ExclusionCursor {
    /// Whether text being scanned is inactive
    pub excluding: bool,
    /// Offset where the current exclusion began
    pub start: usize,
}

impl ExclusionCursor {
    fn begin(&mut self, start: usize) {
        self.excluding = true;
        self.start = start;
    }

    fn end(&mut self, end: usize) -> Region {
        self.excluding = false;
        Region::new(self.start, end)
    }
}

/// Stack of open conditional frames, innermost last
#[derive(Clone, Debug, Default)]
pub struct ConditionalStack {
    frames: Vec<ConditionalFrame>,
}

impl ConditionalStack {
    /// Create an empty stack
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a block whose first branch is kept iff `take`.
    ///
    /// Starts an exclusion at `directive_start` unless one is already running.
    pub fn open(&mut self, take: bool, cursor: &mut ExclusionCursor, directive_start: usize) {
        let suppressing = !cursor.excluding && !take;
        if suppressing {
            cursor.begin(directive_start);
        }
        self.frames.push(ConditionalFrame {
            branch_active: take,
            suppressing,
        });
    }

    /// Switch the innermost block to its `else` branch.
    ///
    /// `else_start`/`else_end` delimit the `` `else `` keyword. Returns the
    /// region that ends here, if this frame owned the exclusion.
    pub fn switch_branch(
        &mut self,
        cursor: &mut ExclusionCursor,
        else_start: usize,
        else_end: usize,
    ) -> Option<Region> {
        let frame = self.frames.last_mut()?;
        if !cursor.excluding {
            frame.branch_active = true;
            frame.suppressing = true;
            cursor.begin(else_end);
            None
        } else if frame.suppressing {
            frame.branch_active = !frame.branch_active;
            frame.suppressing = false;
            Some(cursor.end(else_start))
        } else {
            None
        }
    }

    /// Close the innermost block at `endif_end`.
    ///
    /// Returns the region that ends here, if this frame owned the exclusion.
    pub fn close(&mut self, cursor: &mut ExclusionCursor, endif_end: usize) -> Option<Region> {
        let frame = self.frames.pop()?;
        (cursor.excluding && frame.suppressing).then(|| cursor.end(endif_end))
    }

    /// Innermost open frame
    #[must_use]
    pub fn top(&self) -> Option<&ConditionalFrame> {
        self.frames.last()
    }

    /// Number of open blocks
    #[must_use]
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Drop every open frame
    pub fn clear(&mut self) {
        self.frames.clear();
    }
}
