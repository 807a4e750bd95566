// src/align.rs
use serde::Deserialize;

use crate::types::{AlignedRow, DiffRow, Matched, Sample, Series, Timestamp};

/// Which companion sample a reference timestamp picks up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Latest companion sample at or before the reference time.
    #[default]
    Backward,
    /// Closest companion sample either side; the earlier one wins a tie.
    Nearest,
}

fn sorted(samples: &[Sample]) -> Vec<Sample> {
    let mut v = samples.to_vec();
    v.sort_by_key(|s| s.ts);
    v
}

/// As-of join of one companion onto an ascending reference grid.
/// `grid` must already be sorted; the result has one entry per grid point.
fn join(grid: &[Timestamp], companion: &[Sample], direction: Direction) -> Vec<Option<Matched>> {
    let comp = sorted(companion);
    let mut out = Vec::with_capacity(grid.len());
    // comp[..j] are all <= current grid time
    let mut j = 0usize;

    for &t in grid {
        while j < comp.len() && comp[j].ts <= t {
            j += 1;
        }
        let before = j.checked_sub(1).map(|i| &comp[i]);
        let picked = match direction {
            Direction::Backward => before,
            Direction::Nearest => match (before, comp.get(j)) {
                (Some(b), Some(a)) => {
                    if (a.ts - t) < (t - b.ts) { Some(a) } else { Some(b) }
                }
                (b, a) => b.or(a),
            },
        };
        out.push(picked.map(Matched::from_sample));
    }
    out
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Aligner {
    pub direction: Direction,
}

impl Aligner {
    pub fn new(direction: Direction) -> Self {
        Self { direction }
    }

    pub fn backward() -> Self {
        Self::new(Direction::Backward)
    }

    /// Joins every companion independently onto the reference timestamps.
    /// Returns the sorted reference samples and, per companion, one match per row.
    pub fn align_many(&self, reference: &Series, companions: &[&Series]) -> (Vec<Sample>, Vec<Vec<Option<Matched>>>) {
        let reference = sorted(&reference.samples);
        let grid: Vec<Timestamp> = reference.iter().map(|s| s.ts).collect();
        let joined = companions
            .iter()
            .map(|c| join(&grid, &c.samples, self.direction))
            .collect();
        (reference, joined)
    }

    /// Funding reference with borrow and lend companions.
    pub fn align(&self, funding: &Series, borrow: &Series, lend: &Series) -> Vec<AlignedRow> {
        let (reference, joined) = self.align_many(funding, &[borrow, lend]);
        let (borrow, lend) = (&joined[0], &joined[1]);
        reference
            .iter()
            .enumerate()
            .map(|(i, s)| AlignedRow {
                reference_time: s.ts,
                funding_rate: s.value,
                borrow: borrow[i],
                lend: lend[i],
            })
            .collect()
    }

    /// Exchange A's funding as reference, exchange B's joined onto it.
    pub fn align_pair(&self, a: &Series, b: &Series) -> Vec<DiffRow> {
        let (reference, joined) = self.align_many(a, &[b]);
        reference
            .iter()
            .zip(&joined[0])
            .map(|(s, m)| DiffRow {
                time: s.ts,
                funding_a: s.value,
                funding_b: *m,
                differential: None,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::Normalizer;
    use crate::types::SeriesId;

    fn at(ms: i64) -> Timestamp {
        Normalizer::new(chrono_tz::Asia::Singapore).from_millis(ms).unwrap()
    }

    fn series(kind: &str, points: &[(i64, f64)]) -> Series {
        Series::new(
            SeriesId::new(kind, "x"),
            points.iter().map(|(t, v)| Sample::new(at(*t), Some(*v))).collect(),
        )
    }

    #[test]
    fn companion_after_reference_is_absent_not_wrapped() {
        let r = series("funding", &[(0, 0.01), (1000, 0.02)]);
        let c = series("borrow", &[(500, 5.0)]);
        let rows = Aligner::backward().align(&r, &c, &Series::empty(SeriesId::lend("x")));

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].borrow, None);
        assert_eq!(rows[1].borrow_rate(), Some(5.0));
        assert_eq!(rows[1].borrow.unwrap().time, at(500));
        assert!(rows.iter().all(|r| r.lend.is_none()));
    }

    #[test]
    fn exact_timestamp_matches_and_latest_duplicate_wins() {
        let r = series("funding", &[(100, 1.0)]);
        let c = series("borrow", &[(100, 7.0), (100, 8.0), (101, 9.0)]);
        let rows = Aligner::backward().align(&r, &c, &c);
        assert_eq!(rows[0].borrow_rate(), Some(8.0));
    }

    #[test]
    fn unsorted_inputs_are_sorted_by_the_aligner() {
        let r = series("funding", &[(300, 3.0), (100, 1.0), (200, 2.0)]);
        let c = series("lend", &[(250, 25.0), (50, 5.0), (150, 15.0)]);
        let rows = Aligner::backward().align(&r, &Series::empty(SeriesId::borrow("x")), &c);

        let times: Vec<_> = rows.iter().map(|r| r.reference_time).collect();
        assert_eq!(times, vec![at(100), at(200), at(300)]);
        let lend: Vec<_> = rows.iter().map(|r| r.lend_rate()).collect();
        assert_eq!(lend, vec![Some(5.0), Some(15.0), Some(25.0)]);
        for row in &rows {
            if let Some(m) = row.lend {
                assert!(m.time <= row.reference_time);
            }
        }
    }

    #[test]
    fn companions_join_independently() {
        let r = series("funding", &[(10, 1.0), (20, 1.0)]);
        let borrow = series("borrow", &[(15, 6.0)]);
        let lend = series("lend", &[(5, 4.0)]);
        let rows = Aligner::backward().align(&r, &borrow, &lend);
        assert_eq!(rows[0].borrow_rate(), None);
        assert_eq!(rows[0].lend_rate(), Some(4.0));
        assert_eq!(rows[1].borrow_rate(), Some(6.0));
        assert_eq!(rows[1].lend_rate(), Some(4.0));
    }

    #[test]
    fn missing_companion_value_stays_missing() {
        let r = series("funding", &[(10, 1.0)]);
        let borrow = Series::new(SeriesId::borrow("x"), vec![Sample::new(at(5), None)]);
        let rows = Aligner::backward().align(&r, &borrow, &borrow);
        assert!(rows[0].borrow.is_some());
        assert_eq!(rows[0].borrow_rate(), None);
    }

    #[test]
    fn nearest_looks_both_ways() {
        let r = series("a", &[(0, 1.0), (10, 1.0), (20, 1.0)]);
        let b = series("b", &[(4, 40.0), (16, 160.0)]);
        let rows = Aligner::new(Direction::Nearest).align_pair(&r, &b);
        let picked: Vec<_> = rows.iter().map(|r| r.funding_b.and_then(|m| m.value)).collect();
        // 10 is equidistant from 4 and 16 -> earlier sample
        assert_eq!(picked, vec![Some(40.0), Some(40.0), Some(160.0)]);
    }

    #[test]
    fn empty_reference_gives_no_rows() {
        let c = series("borrow", &[(1, 1.0)]);
        assert!(Aligner::backward().align(&Series::empty(SeriesId::funding("x")), &c, &c).is_empty());
    }
}
