//! Collapses inserted rectangles into fewer, possibly-overlapping rectangles while
//! bounding total wasted (redrawn-but-unchanged) area.

use crate::geometry::Rect;

/// Greedy rectangle merger gated by a waste-ratio threshold.
#[derive(Debug, Clone)]
pub struct RectangleMerger {
    rects: Vec<Rect>,
    waste_ratio: f32,
}

impl RectangleMerger {
    pub fn new(waste_ratio: f32) -> Self {
        RectangleMerger {
            rects: Vec::new(),
            waste_ratio,
        }
    }

    fn may_merge(&self, r: &Rect, s: &Rect) -> bool {
        let u = r.grow(s);
        if !u.valid() {
            return false;
        }
        (r.area() + s.area()) as f64 >= self.waste_ratio as f64 * u.area() as f64
    }

    /// Insert `r`, merging it into the first existing rectangle (scanned in
    /// reverse insertion order) that satisfies the waste-ratio rule; otherwise
    /// append it as a new entry.
    pub fn insert(&mut self, r: Rect) {
        if !r.valid() {
            return;
        }
        for existing in self.rects.iter_mut().rev() {
            if self.waste_ratio_allows(existing, &r) {
                *existing = existing.grow(&r);
                return;
            }
        }
        self.rects.push(r);
    }

    fn waste_ratio_allows(&self, r: &Rect, s: &Rect) -> bool {
        self.may_merge(r, s)
    }

    /// Repeatedly rescan the whole list, merging any pair that satisfies the
    /// waste-ratio rule, until a full pass produces no new merges.
    pub fn merge(&mut self) {
        loop {
            let mut merged_any = false;
            let mut i = 0;
            while i < self.rects.len() {
                let mut j = i + 1;
                while j < self.rects.len() {
                    if self.may_merge(&self.rects[i], &self.rects[j]) {
                        self.rects[i] = self.rects[i].grow(&self.rects[j]);
                        self.rects.remove(j);
                        merged_any = true;
                    } else {
                        j += 1;
                    }
                }
                i += 1;
            }
            self.rects.retain(|r| r.valid());
            if !merged_any {
                break;
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Rect> {
        self.rects.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.rects.is_empty()
    }

    pub fn clear(&mut self) {
        self.rects.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overlapping_rects_merge_into_one() {
        let mut m = RectangleMerger::new(0.5);
        m.insert(Rect::new(0, 0, 9, 9));
        m.insert(Rect::new(5, 5, 14, 14));
        m.merge();
        let all: Vec<_> = m.iter().collect();
        assert_eq!(all.len(), 1);
        assert_eq!(*all[0], Rect::new(0, 0, 14, 14));
    }

    #[test]
    fn distant_rects_stay_separate_under_strict_ratio() {
        let mut m = RectangleMerger::new(0.99);
        m.insert(Rect::new(0, 0, 1, 1));
        m.insert(Rect::new(100, 100, 101, 101));
        m.merge();
        assert_eq!(m.iter().count(), 2);
    }

    #[test]
    fn lenient_ratio_merges_distant_rects() {
        let mut m = RectangleMerger::new(0.0);
        m.insert(Rect::new(0, 0, 1, 1));
        m.insert(Rect::new(10, 10, 11, 11));
        m.merge();
        assert_eq!(m.iter().count(), 1);
    }

    #[test]
    fn invalid_rect_insert_is_ignored() {
        let mut m = RectangleMerger::new(0.5);
        m.insert(Rect::invalid());
        assert!(m.is_empty());
    }
}
