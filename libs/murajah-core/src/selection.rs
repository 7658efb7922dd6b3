//! Quiz verse selection.
//!
//! Draws a uniform random sample of verses for a quiz round using a
//! partial Fisher-Yates shuffle: only the first `count` positions are
//! shuffled, so drawing a handful of verses from a long chapter does not
//! pay for a full-pool shuffle.

use rand::Rng;

use crate::error::{Result, SelectionError};
use crate::types::Verse;

/// Draw up to `count` distinct verses from `verses`, uniformly at random.
///
/// Asking for more verses than exist returns the whole pool in shuffled
/// order. An empty pool is an error.
pub fn draw<R: Rng + ?Sized>(verses: &[Verse], count: usize, rng: &mut R) -> Result<Vec<Verse>> {
    if verses.is_empty() {
        return Err(SelectionError::NoVerses);
    }

    let take = count.min(verses.len());
    let mut pool: Vec<Verse> = verses.to_vec();

    for i in 0..take {
        let j = rng.random_range(i..pool.len());
        pool.swap(i, j);
    }

    pool.truncate(take);
    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn verse(chapter_id: u32, verse_number: u32) -> Verse {
        Verse {
            chapter_id,
            verse_number,
            text_arabic: format!("verse {}", verse_number),
            text_translation: None,
            global_number: verse_number,
        }
    }

    fn pool(n: u32) -> Vec<Verse> {
        (1..=n).map(|v| verse(1, v)).collect()
    }

    #[test]
    fn test_empty_pool_is_error() {
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(draw(&[], 5, &mut rng), Err(SelectionError::NoVerses));
    }

    #[test]
    fn test_draw_count_and_distinctness() {
        let verses = pool(20);
        let mut rng = StdRng::seed_from_u64(42);

        let drawn = draw(&verses, 5, &mut rng).unwrap();
        assert_eq!(drawn.len(), 5);

        let mut numbers: Vec<u32> = drawn.iter().map(|v| v.verse_number).collect();
        numbers.sort_unstable();
        numbers.dedup();
        assert_eq!(numbers.len(), 5);
    }

    #[test]
    fn test_oversized_request_returns_whole_pool() {
        let verses = pool(3);
        let mut rng = StdRng::seed_from_u64(7);

        let drawn = draw(&verses, 10, &mut rng).unwrap();
        assert_eq!(drawn.len(), 3);

        let mut numbers: Vec<u32> = drawn.iter().map(|v| v.verse_number).collect();
        numbers.sort_unstable();
        assert_eq!(numbers, vec![1, 2, 3]);
    }

    #[test]
    fn test_every_verse_reachable() {
        // Over many seeded draws of 1 from a pool of 4, every verse
        // should show up at least once.
        let verses = pool(4);
        let mut seen = [false; 4];

        for seed in 0..64 {
            let mut rng = StdRng::seed_from_u64(seed);
            let drawn = draw(&verses, 1, &mut rng).unwrap();
            seen[(drawn[0].verse_number - 1) as usize] = true;
        }

        assert!(seen.iter().all(|&s| s));
    }
}
