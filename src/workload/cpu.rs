//! CPU burn primitive.
//!
//! Cost is a segmented sieve of Eratosthenes over `[0, limit]`; its running
//! time grows with `limit` (n log log n) while memory stays at one segment
//! plus the sieving primes found so far. The result is only kept alive so
//! the work cannot be optimized away.

use std::hint::black_box;

const SEGMENT_LEN: u64 = 32 * 1024;

/// Count the primes `<= limit`.
pub fn sieve_primes(limit: u64) -> u64 {
    if limit < 2 {
        return 0;
    }

    // primes p with p * p <= limit, in ascending order
    let mut sieving: Vec<u64> = Vec::new();
    let mut composite = vec![false; SEGMENT_LEN as usize];
    let mut count = 0;
    let mut low = 2u64;

    loop {
        let high = low.saturating_add(SEGMENT_LEN - 1).min(limit);
        let len = (high - low + 1) as usize;
        composite[..len].fill(false);

        for &p in &sieving {
            let square = p * p;
            if square > high {
                break;
            }
            let first = match low.div_ceil(p).checked_mul(p) {
                Some(m) => m.max(square),
                None => continue,
            };
            mark_multiples(&mut composite, low, high, first, p);
        }

        for offset in 0..len {
            if composite[offset] {
                continue;
            }
            count += 1;
            let p = low + offset as u64;
            if let Some(square) = p.checked_mul(p).filter(|sq| *sq <= limit) {
                sieving.push(p);
                mark_multiples(&mut composite, low, high, square, p);
            }
        }

        if high == limit {
            return count;
        }
        low = high + 1;
    }
}

fn mark_multiples(composite: &mut [bool], low: u64, high: u64, first: u64, step: u64) {
    let mut multiple = first;
    while multiple <= high {
        composite[(multiple - low) as usize] = true;
        multiple = match multiple.checked_add(step) {
            Some(next) => next,
            None => break,
        };
    }
}

/// Burn CPU proportionally to `cost`.
pub fn burn(cost: u64) -> u64 {
    black_box(sieve_primes(black_box(cost)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_small_limits() {
        assert_eq!(sieve_primes(0), 0);
        assert_eq!(sieve_primes(1), 0);
        assert_eq!(sieve_primes(2), 1);
        assert_eq!(sieve_primes(10), 4);
        assert_eq!(sieve_primes(11), 5);
    }

    #[test]
    fn test_known_counts() {
        assert_eq!(sieve_primes(100), 25);
        assert_eq!(sieve_primes(10_000), 1_229);
    }

    #[test]
    fn test_counts_across_segments() {
        // 32771 is the first prime past the first segment
        assert_eq!(sieve_primes(SEGMENT_LEN + 1), sieve_primes(32_770));
        assert_eq!(sieve_primes(32_771), sieve_primes(32_770) + 1);
        assert_eq!(sieve_primes(100_000), 9_592);
        assert_eq!(sieve_primes(1_000_000), 78_498);
    }

    #[test]
    fn test_burn_matches_sieve() {
        assert_eq!(burn(1_000), sieve_primes(1_000));
    }
}
