//! Evenly spaced points along a straight segment.

/// `count` evenly spaced points from `start` to `end` inclusive.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Segment {
    pub start: (f32, f32),
    pub end: (f32, f32),
    pub count: usize,
}

impl Segment {
    pub fn new(x0: f32, y0: f32, x1: f32, y1: f32, count: usize) -> Self {
        Self {
            start: (x0, y0),
            end: (x1, y1),
            count,
        }
    }

    /// Point `index`. `count == 1` always yields the start.
    pub fn point(&self, index: usize) -> (f32, f32) {
        if self.count <= 1 {
            return self.start;
        }
        let t = index as f32 / (self.count - 1) as f32;
        (
            self.start.0 * (1.0 - t) + self.end.0 * t,
            self.start.1 * (1.0 - t) + self.end.1 * t,
        )
    }

    /// A fresh iterator over every point.
    pub fn points(self) -> SegmentPoints {
        SegmentPoints {
            segment: self,
            next: 0,
        }
    }
}

impl IntoIterator for Segment {
    type Item = (f32, f32);
    type IntoIter = SegmentPoints;

    fn into_iter(self) -> SegmentPoints {
        self.points()
    }
}

/// Iterator over the points of a [`Segment`].
#[derive(Clone, Debug)]
pub struct SegmentPoints {
    segment: Segment,
    next: usize,
}

impl Iterator for SegmentPoints {
    type Item = (f32, f32);

    fn next(&mut self) -> Option<(f32, f32)> {
        if self.next >= self.segment.count {
            return None;
        }
        let point = self.segment.point(self.next);
        self.next += 1;
        Some(point)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.segment.count.saturating_sub(self.next);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for SegmentPoints {}
