//! Coordinate chains: ordered, 1-based inclusive intervals for exon and CDS segments.
//!
//! Introns are stored as junction pairs `(donor, acceptor)`: `donor` is the last
//! base of the upstream exon and `acceptor` the first base of the downstream exon,
//! so the bases excluded from the chain are the ones strictly between them.

use crate::error::Error;

/// Closed interval `[start, end]`, 1-based inclusive.
pub type Interval = (u64, u64);

/// Build the retained chain for a span minus its ascending introns.
///
/// With no introns the chain is the span itself.
pub fn build_chain(span: Interval, introns: &[Interval]) -> Result<Vec<Interval>, Error> {
    let (span_start, span_end) = span;
    if span_start > span_end {
        return Err(Error::Validation(format!(
            "invalid span {span_start}-{span_end}: start after end"
        )));
    }

    let mut chain = Vec::with_capacity(introns.len() + 1);
    let mut segment_start = span_start;
    for &(donor, acceptor) in introns {
        if donor >= acceptor {
            return Err(Error::Validation(format!(
                "invalid intron {donor}-{acceptor}: donor must precede acceptor"
            )));
        }
        if donor < segment_start || acceptor > span_end {
            return Err(Error::Validation(format!(
                "intron {donor}-{acceptor} is unordered or outside span {span_start}-{span_end}"
            )));
        }
        chain.push((segment_start, donor));
        segment_start = acceptor;
    }
    chain.push((segment_start, span_end));

    Ok(chain)
}

/// Clip a chain to the window `[start, end]`.
///
/// An empty result is a valid outcome: a window that misses every interval, or
/// one with `start >= end`, yields an empty chain.
#[must_use]
pub fn cut(chain: &[Interval], start: u64, end: u64) -> Vec<Interval> {
    if chain.is_empty() || start >= end {
        return Vec::new();
    }

    chain
        .iter()
        .filter(|&&(cs, ce)| ce >= start && cs <= end)
        .map(|&(cs, ce)| (cs.max(start), ce.min(end)))
        .filter(|&(cs, ce)| cs <= ce)
        .collect()
}

/// Number of bases covered by a chain.
#[must_use]
pub fn chain_length(chain: &[Interval]) -> u64 {
    chain.iter().map(|&(s, e)| e - s + 1).sum()
}

/// Number of bases an intron junction pair removes from its span.
#[must_use]
pub fn excluded_length(intron: Interval) -> u64 {
    intron.1 - intron.0 - 1
}

/// Derive intron junction pairs from consecutive exons.
#[must_use]
pub fn introns_from_exons(exons: &[Interval]) -> Vec<Interval> {
    exons.windows(2).map(|w| (w[0].1, w[1].0)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_introns_returns_span() {
        assert_eq!(build_chain((10, 20), &[]).unwrap(), vec![(10, 20)]);
    }

    #[test]
    fn single_intron_chain() {
        let chain = build_chain((100, 500), &[(200, 300)]).unwrap();
        assert_eq!(chain, vec![(100, 200), (300, 500)]);
    }

    #[test]
    fn lengths_partition_the_span() {
        let cases: Vec<(Interval, Vec<Interval>)> = vec![
            ((1, 1), vec![]),
            ((100, 500), vec![(200, 300)]),
            ((1000, 9000), vec![(1200, 1500), (1700, 2000), (2000, 2001), (8000, 8999)]),
            ((5, 50), vec![(5, 7), (7, 50)]),
        ];
        for (span, introns) in cases {
            let chain = build_chain(span, &introns).unwrap();
            let excluded: u64 = introns.iter().map(|&i| excluded_length(i)).sum();
            assert_eq!(chain_length(&chain) + excluded, span.1 - span.0 + 1);
            assert_eq!(chain.first().unwrap().0, span.0);
            assert_eq!(chain.last().unwrap().1, span.1);
        }
    }

    #[test]
    fn unordered_introns_rejected() {
        assert!(build_chain((100, 500), &[(300, 350), (150, 200)]).is_err());
        assert!(build_chain((100, 500), &[(50, 200)]).is_err());
        assert!(build_chain((100, 500), &[(200, 200)]).is_err());
        assert!(build_chain((500, 100), &[]).is_err());
    }

    #[test]
    fn cut_clips_both_ends() {
        let chain = vec![(100, 200), (300, 500)];
        assert_eq!(cut(&chain, 150, 450), vec![(150, 200), (300, 450)]);
    }

    #[test]
    fn cut_is_idempotent() {
        let chain = vec![(100, 200), (300, 500), (700, 900)];
        for (s, e) in [(150, 450), (1, 1000), (250, 280), (200, 300), (800, 805)] {
            let once = cut(&chain, s, e);
            assert_eq!(cut(&once, s, e), once);
        }
    }

    #[test]
    fn cut_empty_window() {
        let chain = vec![(100, 200), (300, 500)];
        assert!(cut(&chain, 300, 300).is_empty());
        assert!(cut(&chain, 450, 150).is_empty());
    }

    #[test]
    fn cut_outside_chain() {
        assert!(cut(&[(10, 20)], 100, 200).is_empty());
        assert!(cut(&[(100, 200), (300, 500)], 210, 290).is_empty());
        assert!(cut(&[], 1, 10).is_empty());
    }

    #[test]
    fn cut_touching_boundaries() {
        let chain = vec![(100, 200), (300, 500)];
        assert_eq!(cut(&chain, 200, 300), vec![(200, 200), (300, 300)]);
    }

    #[test]
    fn introns_between_exons() {
        let exons = vec![(100, 200), (300, 400), (450, 500)];
        assert_eq!(introns_from_exons(&exons), vec![(200, 300), (400, 450)]);
        assert!(introns_from_exons(&exons[..1]).is_empty());
    }
}
