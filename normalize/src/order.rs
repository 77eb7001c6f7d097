use std::cmp::Ordering;
use std::collections::BTreeMap;

use gtfs::Time;

use crate::ids::StopId;

/// The hand-authored stop sequence a typical trip follows in one direction of
/// a route. A stop may appear twice when a loop legitimately revisits it.
/// Built once at startup, read-only afterwards.
pub struct ReferencePattern {
    stops: Vec<StopId>,
    positions: BTreeMap<StopId, Vec<usize>>,
}

/// Where an observed stop landed relative to the reference. Stops absent from
/// the reference attach behind their nearest resolved predecessor; `offset`
/// keeps a run of them in observed order. `anchor: None` sorts ahead of the
/// whole pattern.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct Rank {
    pub anchor: Option<usize>,
    pub offset: usize,
}

/// One trip's stop sequence mapped onto a reference pattern.
#[derive(Debug)]
pub(crate) struct Resolution {
    pub ranks: Vec<Rank>,
    /// Observed stops whose pinned position lay behind the walk; tolerated as
    /// feed noise when the timestamps don't disagree.
    pub inversions: usize,
    /// Observed stops absent from the reference.
    pub interstitials: usize,
}

/// The walk would have to move the reference cursor backwards: the pattern is
/// stale relative to the feed.
#[derive(Debug)]
pub(crate) struct Backtrack {
    pub stop: StopId,
    /// How many observed stops resolved before the walk failed.
    pub resolved: usize,
}

impl ReferencePattern {
    pub fn new(stops: Vec<StopId>) -> Self {
        let mut positions: BTreeMap<StopId, Vec<usize>> = BTreeMap::new();
        for (idx, stop) in stops.iter().enumerate() {
            positions.entry(*stop).or_insert_with(Vec::new).push(idx);
        }
        Self { stops, positions }
    }

    pub fn len(&self) -> usize {
        self.stops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stops.is_empty()
    }

    /// Relative order of two stops by their position in the pattern, for
    /// orderings the feed itself leaves ambiguous. Equal when either stop is
    /// off-pattern; the caller falls back to scheduled times.
    pub fn compare_early(&self, a: StopId, b: StopId) -> Ordering {
        match (self.positions.get(&a), self.positions.get(&b)) {
            (Some(pa), Some(pb)) => pa[0].cmp(&pb[0]),
            _ => Ordering::Equal,
        }
    }

    /// Walks the observed (stop, arrival) sequence through the reference,
    /// assigning each stop a rank. The cursor through the reference never
    /// moves backwards:
    ///
    /// - a stop at or past the cursor advances it;
    /// - a stop pinned to a single position behind the cursor is feed noise
    ///   (the timestamps are tied or themselves contradict the feed order),
    ///   unless its arrival is strictly later than the arrival that set the
    ///   cursor, in which case the feed is internally consistent and the
    ///   pattern is stale;
    /// - a repeated stop with every occurrence behind the cursor can't be
    ///   attributed to a visit at all.
    pub(crate) fn resolve(&self, observed: &[(StopId, Time)]) -> Result<Resolution, Backtrack> {
        let mut ranks = Vec::with_capacity(observed.len());
        // Last reference position consumed, and the arrival that consumed it
        let mut cursor: Option<(usize, Time)> = None;
        // Where off-pattern stops attach
        let mut anchor: Option<usize> = None;
        let mut offset = 0;
        let mut inversions = 0;
        let mut interstitials = 0;

        for (idx, (stop, arrival)) in observed.iter().enumerate() {
            let occurrences = match self.positions.get(stop) {
                Some(list) => list,
                None => {
                    interstitials += 1;
                    offset += 1;
                    ranks.push(Rank { anchor, offset });
                    continue;
                }
            };
            let forward = occurrences
                .iter()
                .copied()
                .find(|&p| cursor.map_or(true, |(c, _)| p >= c));
            match forward {
                Some(p) => {
                    cursor = Some((p, *arrival));
                    anchor = Some(p);
                    offset = 0;
                    ranks.push(Rank {
                        anchor: Some(p),
                        offset: 0,
                    });
                }
                None => match cursor {
                    Some((_, cursor_arrival))
                        if occurrences.len() == 1 && *arrival <= cursor_arrival =>
                    {
                        inversions += 1;
                        let p = occurrences[0];
                        anchor = Some(p);
                        offset = 0;
                        ranks.push(Rank {
                            anchor: Some(p),
                            offset: 0,
                        });
                    }
                    _ => {
                        return Err(Backtrack {
                            stop: *stop,
                            resolved: idx,
                        })
                    }
                },
            }
        }

        Ok(Resolution {
            ranks,
            inversions,
            interstitials,
        })
    }
}

/// Resolves a trip against both of a route's patterns and picks the one it
/// belongs to: a walk anchoring every stop with no tolerated noise wins
/// outright, then fewer off-pattern stops (a pattern that doesn't know the
/// stops at all is trivially monotonic and proves nothing), then less noise,
/// then the closer length. When neither pattern resolves, reports the one
/// that got further.
pub(crate) fn match_direction(
    patterns: &[ReferencePattern; 2],
    observed: &[(StopId, Time)],
) -> Result<(usize, Resolution), (usize, Backtrack)> {
    let second = patterns[1].resolve(observed);
    match (patterns[0].resolve(observed), second) {
        (Ok(r0), Ok(r1)) => {
            if score(&r1, patterns[1].len(), observed.len())
                < score(&r0, patterns[0].len(), observed.len())
            {
                Ok((1, r1))
            } else {
                Ok((0, r0))
            }
        }
        (Ok(r0), Err(_)) => Ok((0, r0)),
        (Err(_), Ok(r1)) => Ok((1, r1)),
        (Err(e0), Err(e1)) => {
            if e1.resolved > e0.resolved {
                Err((1, e1))
            } else {
                Err((0, e0))
            }
        }
    }
}

fn score(res: &Resolution, pattern_len: usize, observed_len: usize) -> (bool, usize, usize, usize) {
    (
        res.inversions > 0 || res.interstitials > 0,
        res.interstitials,
        res.inversions,
        pattern_len.abs_diff(observed_len),
    )
}

#[cfg(test)]
mod tests {
    use std::cmp::Ordering;

    use gtfs::Time;
    use pretty_assertions::assert_eq;

    use super::{match_direction, Rank, ReferencePattern};
    use crate::ids::StopId;

    fn pattern(stops: &[u32]) -> ReferencePattern {
        ReferencePattern::new(stops.iter().map(|&x| StopId(x)).collect())
    }

    fn t(x: &str) -> Time {
        Time::parse(x).unwrap()
    }

    fn observed(stops: &[(u32, &str)]) -> Vec<(StopId, Time)> {
        stops.iter().map(|&(s, at)| (StopId(s), t(at))).collect()
    }

    // What the splitter does with a resolution: sort by rank, then arrival,
    // then the feed sequence number.
    fn reorder(pattern: &ReferencePattern, stops: &[(u32, &str)]) -> Vec<u32> {
        let obs = observed(stops);
        let resolution = pattern.resolve(&obs).unwrap();
        let mut order: Vec<usize> = (0..obs.len()).collect();
        order.sort_by_key(|&i| (resolution.ranks[i], obs[i].1, i));
        order.into_iter().map(|i| (obs[i].0).0).collect()
    }

    #[test]
    fn noise_swap_resolves_by_reference_rank() {
        // The feed swapped the middle pair but left their timestamps tied
        let r = pattern(&[1, 2, 3, 4]);
        let stops = [
            (1, "08:00:00"),
            (3, "08:10:00"),
            (2, "08:10:00"),
            (4, "08:20:00"),
        ];
        assert_eq!(reorder(&r, &stops), vec![1, 2, 3, 4]);

        let resolution = r.resolve(&observed(&stops)).unwrap();
        assert_eq!(resolution.inversions, 1);
        // A stop occurring once in the pattern keeps its pinned position no
        // matter where the feed put it
        assert_eq!(
            resolution.ranks,
            vec![
                Rank { anchor: Some(0), offset: 0 },
                Rank { anchor: Some(2), offset: 0 },
                Rank { anchor: Some(1), offset: 0 },
                Rank { anchor: Some(3), offset: 0 },
            ]
        );
    }

    #[test]
    fn off_pattern_stop_rides_behind_its_predecessor() {
        let r = pattern(&[1, 2, 3]);
        let stops = [
            (1, "08:00:00"),
            (9, "08:05:00"),
            (2, "08:10:00"),
            (3, "08:20:00"),
        ];
        assert_eq!(reorder(&r, &stops), vec![1, 9, 2, 3]);

        let resolution = r.resolve(&observed(&stops)).unwrap();
        assert_eq!(resolution.interstitials, 1);
        assert_eq!(resolution.ranks[1], Rank { anchor: Some(0), offset: 1 });
    }

    #[test]
    fn leading_off_pattern_stops_sort_first() {
        let r = pattern(&[1, 2]);
        let stops = [(8, "08:00:00"), (9, "08:01:00"), (1, "08:05:00"), (2, "08:10:00")];
        assert_eq!(reorder(&r, &stops), vec![8, 9, 1, 2]);

        let resolution = r.resolve(&observed(&stops)).unwrap();
        assert_eq!(resolution.ranks[0], Rank { anchor: None, offset: 1 });
        assert_eq!(resolution.ranks[1], Rank { anchor: None, offset: 2 });
    }

    #[test]
    fn stale_pattern_fails_loudly() {
        // Timestamps strictly increase, so the feed really does visit 3 before
        // 2; the pattern is wrong, not the feed
        let r = pattern(&[1, 2, 3]);
        let err = r
            .resolve(&observed(&[
                (1, "08:00:00"),
                (3, "08:10:00"),
                (2, "08:20:00"),
            ]))
            .unwrap_err();
        assert_eq!(err.stop, StopId(2));
        assert_eq!(err.resolved, 2);
    }

    #[test]
    fn loop_revisit_consumes_later_occurrence() {
        let r = pattern(&[1, 2, 1]);
        let stops = [(1, "08:00:00"), (2, "08:10:00"), (1, "08:20:00")];
        assert_eq!(reorder(&r, &stops), vec![1, 2, 1]);

        let resolution = r.resolve(&observed(&stops)).unwrap();
        assert_eq!(resolution.ranks[2], Rank { anchor: Some(2), offset: 0 });

        // A revisit the pattern doesn't encode can't be attributed
        let r = pattern(&[1, 2]);
        assert!(r
            .resolve(&observed(&[
                (1, "08:00:00"),
                (2, "08:10:00"),
                (1, "08:20:00"),
            ]))
            .is_err());
    }

    #[test]
    fn reordering_is_idempotent() {
        let r = pattern(&[1, 2, 3, 4]);
        let stops = [
            (1, "08:00:00"),
            (3, "08:10:00"),
            (2, "08:10:00"),
            (4, "08:20:00"),
        ];
        let once = reorder(&r, &stops);
        let again: Vec<(u32, &str)> = once
            .iter()
            .zip(["08:00:00", "08:10:00", "08:10:00", "08:20:00"])
            .map(|(&s, at)| (s, at))
            .collect();
        assert_eq!(reorder(&r, &again), once);
    }

    #[test]
    fn shared_terminus_goes_to_the_monotonic_direction() {
        // Both directions touch stops 9 and 2; only one of them starts at 9
        let patterns = [pattern(&[9, 1, 2]), pattern(&[2, 3, 9])];
        let obs = observed(&[(9, "08:00:00"), (1, "08:10:00"), (2, "08:20:00")]);
        let (direction, resolution) = match_direction(&patterns, &obs).unwrap();
        assert_eq!(direction, 0);
        assert_eq!(resolution.inversions, 0);
    }

    #[test]
    fn tie_goes_to_the_closer_pattern() {
        // Either direction admits the trip; the one matching its length wins
        let patterns = [pattern(&[1, 2, 3, 4, 5, 6]), pattern(&[1, 2, 3])];
        let obs = observed(&[(1, "08:00:00"), (2, "08:10:00"), (3, "08:20:00")]);
        let (direction, _) = match_direction(&patterns, &obs).unwrap();
        assert_eq!(direction, 1);
    }

    #[test]
    fn unmatchable_trip_reports_the_closer_direction() {
        let patterns = [pattern(&[1, 2, 3]), pattern(&[3, 2, 1])];
        // 1 then 3 then 2, strictly increasing times: fails both ways
        let obs = observed(&[(1, "08:00:00"), (3, "08:10:00"), (2, "08:20:00")]);
        let (direction, err) = match_direction(&patterns, &obs).unwrap_err();
        // The forward direction resolved two stops before failing; the reverse
        // failed at its second
        assert_eq!(direction, 0);
        assert_eq!(err.stop, StopId(2));
    }

    #[test]
    fn compare_early_orders_by_pattern_position() {
        let r = pattern(&[65, 74, 75, 80]);
        assert_eq!(r.compare_early(StopId(74), StopId(80)), Ordering::Less);
        assert_eq!(r.compare_early(StopId(80), StopId(65)), Ordering::Greater);
        assert_eq!(r.compare_early(StopId(74), StopId(74)), Ordering::Equal);
        // Off-pattern stops defer to the caller's time-based tie-break
        assert_eq!(r.compare_early(StopId(999), StopId(80)), Ordering::Equal);
    }
}
