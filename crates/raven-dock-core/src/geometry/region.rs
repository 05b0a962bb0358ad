use smallvec::SmallVec;
use std::ops::SubAssign;

use super::Rect;

/// Horizontal spans `[x0, x1)` of one band
type Spans = SmallVec<[(i32, i32); 4]>;

#[derive(Clone, Copy)]
enum Op {
    Union,
    Intersect,
    Subtract,
}

/// A set of pixels described by disjoint rectangles.
///
/// The rectangles are kept y-x banded: the plane is cut into horizontal
/// bands, each band holds sorted, non-touching spans, and vertically
/// adjacent bands with identical spans are merged. Enumeration order is
/// therefore top-to-bottom, then left-to-right, which makes "first
/// rectangle" choices deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Region {
    rects: Vec<Rect>,
}

impl Region {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.rects.is_empty()
    }

    /// Rectangles in band order
    pub fn rects(&self) -> &[Rect] {
        &self.rects
    }

    pub fn iter(&self) -> impl Iterator<Item = &Rect> {
        self.rects.iter()
    }

    pub fn rect_count(&self) -> usize {
        self.rects.len()
    }

    pub fn bounding_rect(&self) -> Rect {
        self.rects
            .iter()
            .fold(Rect::default(), |acc, rect| acc.united(rect))
    }

    pub fn united(&self, other: &Region) -> Region {
        self.combine(other, Op::Union)
    }

    pub fn intersected(&self, other: &Region) -> Region {
        self.combine(other, Op::Intersect)
    }

    pub fn subtracted(&self, other: &Region) -> Region {
        self.combine(other, Op::Subtract)
    }

    pub fn intersected_rect(&self, rect: Rect) -> Region {
        self.intersected(&Region::from(rect))
    }

    pub fn subtracted_rect(&self, rect: Rect) -> Region {
        self.subtracted(&Region::from(rect))
    }

    /// True when every pixel of `rect` belongs to this region
    pub fn contains_rect(&self, rect: Rect) -> bool {
        Region::from(rect).subtracted(self).is_empty()
    }

    pub fn intersects_rect(&self, rect: Rect) -> bool {
        self.rects.iter().any(|r| r.intersects(&rect))
    }

    fn combine(&self, other: &Region, op: Op) -> Region {
        let mut ys: Vec<i32> = self
            .rects
            .iter()
            .chain(other.rects.iter())
            .flat_map(|r| [r.top(), r.bottom()])
            .collect();
        ys.sort_unstable();
        ys.dedup();

        let mut bands: Vec<(i32, i32, Spans)> = Vec::new();

        for window in ys.windows(2) {
            let (y0, y1) = (window[0], window[1]);
            let a = spans_in_band(&self.rects, y0, y1);
            let b = spans_in_band(&other.rects, y0, y1);

            let spans = match op {
                Op::Union => union_spans(&a, &b),
                Op::Intersect => intersect_spans(&a, &b),
                Op::Subtract => subtract_spans(&a, &b),
            };

            if spans.is_empty() {
                continue;
            }

            if let Some(last) = bands.last_mut() {
                if last.1 == y0 && last.2 == spans {
                    last.1 = y1;
                    continue;
                }
            }

            bands.push((y0, y1, spans));
        }

        let rects = bands
            .into_iter()
            .flat_map(|(y0, y1, spans)| {
                spans
                    .into_iter()
                    .map(move |(x0, x1)| Rect::from_edges(x0, y0, x1, y1))
            })
            .collect();

        Region { rects }
    }
}

impl From<Rect> for Region {
    fn from(rect: Rect) -> Self {
        if rect.is_empty() {
            Region::default()
        } else {
            Region { rects: vec![rect] }
        }
    }
}

impl SubAssign<Rect> for Region {
    fn sub_assign(&mut self, rect: Rect) {
        if !rect.is_empty() {
            *self = self.subtracted_rect(rect);
        }
    }
}

/// Spans of every rect fully covering the band `[y0, y1)`, merged.
///
/// Band limits come from all rect edges, so a rect either covers a band
/// completely or not at all.
fn spans_in_band(rects: &[Rect], y0: i32, y1: i32) -> Spans {
    let mut spans: Spans = rects
        .iter()
        .filter(|r| r.top() <= y0 && r.bottom() >= y1)
        .map(|r| (r.left(), r.right()))
        .collect();
    spans.sort_unstable();
    merge_sorted(spans)
}

fn merge_sorted(spans: Spans) -> Spans {
    let mut merged: Spans = SmallVec::new();
    for (x0, x1) in spans {
        match merged.last_mut() {
            Some(last) if x0 <= last.1 => last.1 = last.1.max(x1),
            _ => merged.push((x0, x1)),
        }
    }
    merged
}

fn union_spans(a: &Spans, b: &Spans) -> Spans {
    let mut all: Spans = a.iter().chain(b.iter()).copied().collect();
    all.sort_unstable();
    merge_sorted(all)
}

fn intersect_spans(a: &Spans, b: &Spans) -> Spans {
    let mut out: Spans = SmallVec::new();
    let (mut i, mut j) = (0, 0);

    while i < a.len() && j < b.len() {
        let x0 = a[i].0.max(b[j].0);
        let x1 = a[i].1.min(b[j].1);
        if x0 < x1 {
            out.push((x0, x1));
        }
        if a[i].1 < b[j].1 {
            i += 1;
        } else {
            j += 1;
        }
    }

    out
}

fn subtract_spans(a: &Spans, b: &Spans) -> Spans {
    let mut out: Spans = SmallVec::new();

    for &(start, end) in a {
        let mut cursor = start;
        for &(cut0, cut1) in b {
            if cut1 <= cursor || cut0 >= end {
                continue;
            }
            if cut0 > cursor {
                out.push((cursor, cut0));
            }
            cursor = cursor.max(cut1);
            if cursor >= end {
                break;
            }
        }
        if cursor < end {
            out.push((cursor, end));
        }
    }

    out
}
