/// Answered and open question counts of an attempt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NavigatorProgress {
    pub total: usize,
    pub answered: usize,
    pub remaining: usize,
}
