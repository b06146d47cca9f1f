use serde::Serialize;

/// Half-open byte range `[start, end)` of inactive text in the scanned buffer
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Region {
    /// First inactive byte
    pub start: usize,
    /// One past the last inactive byte
    pub end: usize,
}

impl Region {
    /// Create a region
    #[must_use]
    pub const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Length in bytes
    #[must_use]
    pub const fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    /// Whether the region covers nothing
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    /// The covered text, if the region lies inside `content`
    #[must_use]
    pub fn slice<'a>(&self, content: &'a str) -> Option<&'a str> {
        content.get(self.start..self.end)
    }
}

/// Accumulates regions of a single buffer in document order
#[derive(Debug, Default)]
pub(crate) struct RegionCollector {
    regions: Vec<Region>,
}

impl RegionCollector {
    pub(crate) fn push(&mut self, region: Region) {
        debug_assert!(
            self.regions.last().is_none_or(|last| last.end <= region.start),
            "regions must be emitted in order without overlap"
        );
        self.regions.push(region);
    }

    pub(crate) fn into_regions(self) -> Vec<Region> {
        self.regions
    }
}
