//! Pure predicates over a junction's circular crossing-index space.
//!
//! Every incoming and leaving lane of a junction is assigned a crossing
//! index, placing all lanes on one circle of size `supremum`. A vehicle's
//! intended crossing is a maneuver from an origin index to a destination
//! index. Whether two maneuvers block each other, and which of two
//! conflicting maneuvers starts further left, can both be decided purely on
//! these indices.

use smallvec::SmallVec;

/// Ordered indices swept by one maneuver, origin and destination inclusive.
type IndexRun = SmallVec<[u8; 16]>;

/// Decides whether two maneuvers over the same junction cross each other.
///
/// Walks the index circle starting just after `origin1` with a two state
/// automaton. While in the first state, meeting an endpoint of the second
/// maneuver switches states, and meeting `destination1` first proves the
/// maneuvers disjoint. In the second state, reaching `destination1` (or
/// sharing it with `destination2`) proves a conflict, while meeting the
/// second maneuver's remaining endpoint first proves the arcs nested rather
/// than crossed. The walk is bounded by `2 * supremum` steps and is
/// symmetric in the two maneuvers.
pub fn are_indices_crossing(
    origin1: u8,
    destination1: u8,
    origin2: u8,
    destination2: u8,
    supremum: u8,
) -> bool {
    debug_assert!(supremum > 0, "crossing index supremum must be positive");
    debug_assert!(origin1 < supremum && destination1 < supremum);
    debug_assert!(origin2 < supremum && destination2 < supremum);

    let mut i = origin1;
    let mut state_a = true;
    // A shared destination must count as a conflict, hence the check order
    // in the second state.
    for _ in 0..2 * u16::from(supremum) {
        i = (i + 1) % supremum;
        if state_a {
            if i == origin2 || i == destination2 {
                state_a = false;
            } else if i == destination1 {
                return false;
            }
        } else if i == destination1 || destination1 == destination2 {
            return true;
        } else if i == origin2 || i == destination2 {
            return false;
        }
    }
    false
}

/// Returns the index at which the two maneuvers' runs first match, scanning
/// all alignments of the runs in one fixed order, or `None` if no alignment
/// matches.
///
/// Because the runs are ascending along the circle there is at most one
/// matching alignment, so the scan can stop at the first hit. The winner of
/// the right-before-left rule is the maneuver whose origin equals this
/// leftmost matched index.
pub fn leftmost_index_in_matching(
    origin1: u8,
    destination1: u8,
    origin2: u8,
    destination2: u8,
    supremum: u8,
) -> Option<u8> {
    let s1 = index_run(origin1, destination1, supremum);
    let s2 = index_run(origin2, destination2, supremum);
    let len1 = s1.len();
    let n = len1 + s2.len();

    // Conceptually both runs are padded to length n, the first run at the
    // front and the second at the back, and the second is slid leftwards one
    // position per outer iteration.
    let at1 = |j: usize| (j < len1).then(|| s1[j]);
    let at2 = |j: usize| (j >= len1).then(|| s2[j - len1]);

    for i in 0..n {
        for j in 0..n - i {
            if let (Some(a), Some(b)) = (at1(j), at2(j + i)) {
                if a == b {
                    return Some(a);
                }
            }
        }
    }
    None
}

fn index_run(origin: u8, destination: u8, supremum: u8) -> IndexRun {
    let mut run = IndexRun::new();
    let mut index = origin;
    while index != destination {
        run.push(index);
        index = (index + 1) % supremum;
    }
    run.push(destination);
    run
}

#[cfg(test)]
mod test {
    use super::*;
    use itertools::iproduct;

    /// Checks the predicate in both argument orders.
    fn assert_crossing(expected: bool, m1: (u8, u8), m2: (u8, u8), supremum: u8) {
        assert_eq!(
            are_indices_crossing(m1.0, m1.1, m2.0, m2.1, supremum),
            expected,
            "maneuvers {:?} and {:?}, supremum {}",
            m1,
            m2,
            supremum
        );
        assert_eq!(
            are_indices_crossing(m2.0, m2.1, m1.0, m1.1, supremum),
            expected,
            "maneuvers {:?} and {:?} swapped, supremum {}",
            m1,
            m2,
            supremum
        );
    }

    #[test]
    fn crossing_at_a_plus_crossroad() {
        // Two-lane plus crossroad, eight indexed lanes.
        assert_crossing(false, (2, 7), (6, 3), 8);
        assert_crossing(false, (4, 5), (6, 3), 8);
        assert_crossing(true, (6, 7), (2, 7), 8);
        assert_crossing(false, (6, 7), (2, 3), 8);
        assert_crossing(true, (0, 3), (6, 1), 8);
        assert_crossing(true, (0, 3), (2, 5), 8);
        assert_crossing(false, (0, 3), (4, 7), 8);
        assert_crossing(false, (2, 5), (6, 1), 8);
        assert_crossing(true, (0, 1), (6, 1), 8);
        assert_crossing(true, (4, 1), (6, 1), 8);
    }

    #[test]
    fn crossing_at_a_merging_crossroad() {
        // Three-armed junction, six indexed lanes.
        assert_crossing(true, (0, 3), (2, 3), 6);
        assert_crossing(true, (0, 3), (2, 5), 6);
        assert_crossing(false, (2, 3), (4, 5), 6);
        assert_crossing(false, (0, 1), (2, 3), 6);
    }

    #[test]
    fn crossing_is_symmetric_for_distinct_indices() {
        for (o1, d1, o2, d2) in iproduct!(0..6u8, 0..6u8, 0..6u8, 0..6u8) {
            let distinct =
                o1 != d1 && o1 != o2 && o1 != d2 && d1 != o2 && d1 != d2 && o2 != d2;
            if !distinct {
                continue;
            }
            assert_eq!(
                are_indices_crossing(o1, d1, o2, d2, 6),
                are_indices_crossing(o2, d2, o1, d1, 6),
                "asymmetric for ({}, {}) vs ({}, {})",
                o1,
                d1,
                o2,
                d2
            );
        }
    }

    #[test]
    fn leftmost_index_of_conflicting_maneuvers() {
        // Runs {6,7,0,1,2,3} and {4,5,6,7,0,1} first coincide at index 6.
        assert_eq!(leftmost_index_in_matching(6, 3, 4, 1, 8), Some(6));
        // Runs {2,..,7} and {6,7,0,..,3} first coincide at index 6 as well.
        assert_eq!(leftmost_index_in_matching(2, 7, 6, 3, 8), Some(6));
        // Identical maneuvers match at their shared origin.
        assert_eq!(leftmost_index_in_matching(0, 3, 0, 3, 8), Some(0));
    }

    #[test]
    fn no_match_for_disjoint_runs() {
        assert_eq!(leftmost_index_in_matching(0, 1, 4, 5, 8), None);
    }

    #[test]
    fn index_runs_wrap_around() {
        let run = index_run(6, 1, 8);
        assert_eq!(run.as_slice(), &[6, 7, 0, 1]);
        let run = index_run(3, 3, 8);
        assert_eq!(run.as_slice(), &[3]);
    }
}
