use tracing::debug;

/// Position within the ordered groups of a wizard.
///
/// Movement saturates at both ends and never checks field validity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupNavigator {
    current: usize,
    len: usize,
}

impl GroupNavigator {
    pub fn new(len: usize) -> Self {
        Self { current: 0, len }
    }

    pub fn current(&self) -> usize {
        self.current
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_first(&self) -> bool {
        self.current == 0
    }

    pub fn is_last(&self) -> bool {
        self.current + 1 >= self.len
    }

    /// Moves forward one group; returns false when already on the last group.
    pub fn next(&mut self) -> bool {
        if self.is_last() {
            return false;
        }
        self.current += 1;
        debug!(group = self.current, "advanced to next group");
        true
    }

    /// Moves back one group; returns false when already on the first group.
    pub fn previous(&mut self) -> bool {
        if self.is_first() {
            return false;
        }
        self.current -= 1;
        debug!(group = self.current, "returned to previous group");
        true
    }

    pub fn jump_to_start(&mut self) {
        self.current = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn previous_at_start_is_a_no_op() {
        let mut nav = GroupNavigator::new(3);
        assert!(!nav.previous());
        assert_eq!(nav.current(), 0);
    }

    #[test]
    fn next_at_end_is_a_no_op() {
        let mut nav = GroupNavigator::new(3);
        assert!(nav.next());
        assert!(nav.next());
        assert!(nav.is_last());
        assert!(!nav.next());
        assert_eq!(nav.current(), 2);
    }

    #[test]
    fn next_then_previous_is_identity_from_interior() {
        for start in 1..4 {
            let mut nav = GroupNavigator::new(5);
            for _ in 0..start {
                nav.next();
            }
            let before = nav;
            assert!(nav.next());
            assert!(nav.previous());
            assert_eq!(nav, before);
            assert_eq!(nav.current(), start);
        }
    }

    #[test]
    fn single_group_is_both_first_and_last() {
        let mut nav = GroupNavigator::new(1);
        assert!(nav.is_first() && nav.is_last());
        assert!(!nav.next());
        assert!(!nav.previous());
    }

    #[test]
    fn jump_to_start_rewinds() {
        let mut nav = GroupNavigator::new(3);
        nav.next();
        nav.next();
        nav.jump_to_start();
        assert!(nav.is_first());
    }
}
