//! BFT quorum arithmetic.

/// Minimum number of matching replica results required to accept a command
/// outcome: the BFT quorum `2n/3 + 1` over `n` hosts.
///
/// With `n = 3f + 1` replicas this tolerates `f` Byzantine members; a single
/// host degenerates to requiring just its own answer.
pub fn expected_players(hosts: usize) -> usize {
    hosts * 2 / 3 + 1
}

/// Strict majority threshold over `total` respondents: `total/2 + 1`.
pub fn strict_majority(total: usize) -> usize {
    total / 2 + 1
}

/// Whether `count` agreeing respondents out of `total` polled form a strict
/// majority (`count > total/2`).
pub fn has_strict_majority(count: usize, total: usize) -> bool {
    count >= strict_majority(total)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expected_players() {
        assert_eq!(expected_players(1), 1);
        assert_eq!(expected_players(3), 3);
        assert_eq!(expected_players(4), 3);
        assert_eq!(expected_players(7), 5);
        assert_eq!(expected_players(10), 7);
    }

    #[test]
    fn test_strict_majority() {
        assert_eq!(strict_majority(1), 1);
        assert_eq!(strict_majority(2), 2);
        assert_eq!(strict_majority(3), 2);
        assert_eq!(strict_majority(4), 3);
        assert_eq!(strict_majority(5), 3);
    }

    #[test]
    fn test_has_strict_majority_boundary() {
        // Exactly half is not a majority.
        assert!(!has_strict_majority(2, 4));
        assert!(has_strict_majority(3, 4));
        assert!(!has_strict_majority(0, 0));
    }
}
