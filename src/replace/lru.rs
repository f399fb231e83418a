use crate::cache::Line;

use super::Replace;

#[derive(Debug, Default)]
pub struct Lru {}

impl Lru {
    pub fn new() -> Self {
        Lru {}
    }
}

impl Replace for Lru {
    fn victim(&mut self, set: &[Line]) -> usize {
        // min_by_key keeps the first of equal keys, so ties go to the lowest way
        set.iter()
            .enumerate()
            .min_by_key(|(_way, b)| b.recency)
            .map(|(way, _b)| way)
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(tag: u64, recency: u64) -> Line {
        Line {
            valid: true,
            tag,
            recency,
        }
    }

    #[test]
    fn picks_oldest() {
        let set = [line(1, 5), line(2, 3), line(3, 9)];
        assert_eq!(Lru::new().victim(&set), 1);
    }

    #[test]
    fn ties_go_to_lowest_way() {
        let set = [line(1, 4), line(2, 2), line(3, 2)];
        assert_eq!(Lru::new().victim(&set), 1);
    }

    #[test]
    fn single_way() {
        assert_eq!(Lru::new().victim(&[line(7, 1)]), 0);
    }
}
