// Integration tests: the DP solver agrees with permutation enumeration
use proptest::prelude::*;
use rstest::rstest;
use shopping_route::models::Time;
use shopping_route::{BruteForceTsp, DynamicProgrammingTsp, TspError, TspSolver};

/// Square matrices of 2..=7 nodes with a start node; about one edge in six
/// is missing and small costs make ties common.
fn matrix_and_start() -> impl Strategy<Value = (Vec<Vec<Time>>, usize)> {
    (2usize..=7).prop_flat_map(|n| {
        let cell = prop_oneof![1 => Just(-1 as Time), 5 => (0 as Time)..=12];
        (
            prop::collection::vec(prop::collection::vec(cell, n), n),
            0..n,
        )
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(300))]

    /// Both solvers return the same cost and the same cycle, or both fail
    /// with "no path".
    #[test]
    fn dp_matches_bruteforce((matrix, start) in matrix_and_start()) {
        let expected = BruteForceTsp.solve(&matrix, start);
        let actual = DynamicProgrammingTsp.solve(&matrix, start);
        prop_assert_eq!(actual, expected);
    }

    /// A returned tour visits every node once and its cost is the sum of
    /// the edges along it, none of them missing.
    #[test]
    fn tour_is_a_valid_cycle((matrix, start) in matrix_and_start()) {
        if let Ok(tour) = DynamicProgrammingTsp.solve(&matrix, start) {
            let n = matrix.len();
            prop_assert_eq!(tour.order.len(), n + 1);
            prop_assert_eq!(tour.order[0], start);
            prop_assert_eq!(tour.order[n], start);

            let mut interior = tour.order[1..n].to_vec();
            interior.sort_unstable();
            let expected: Vec<usize> = (0..n).filter(|&node| node != start).collect();
            prop_assert_eq!(interior, expected);

            let mut cost = 0;
            for pair in tour.order.windows(2) {
                let edge = matrix[pair[0]][pair[1]];
                prop_assert!(edge >= 0);
                cost += edge;
            }
            prop_assert_eq!(cost, tour.cost);
        }
    }
}

#[rstest]
#[case(vec![vec![0, 1, 4], vec![8, 0, 3], vec![2, 5, 0]], 6)]
#[case(vec![vec![0, 8, 2], vec![9, 0, 1], vec![7, 7, 0]], 16)]
fn known_tours(#[case] matrix: Vec<Vec<Time>>, #[case] cost: Time) {
    let bruteforce = BruteForceTsp.solve(&matrix, 0).unwrap();
    let dp = DynamicProgrammingTsp.solve(&matrix, 0).unwrap();

    assert_eq!(bruteforce.order, vec![0, 1, 2, 0]);
    assert_eq!(bruteforce.cost, cost);
    assert_eq!(dp, bruteforce);
}

#[test]
fn unreachable_everywhere_is_no_path() {
    let matrix = vec![vec![-1; 4]; 4];
    assert_eq!(BruteForceTsp.solve(&matrix, 1), Err(TspError::NoPath));
    assert_eq!(DynamicProgrammingTsp.solve(&matrix, 1), Err(TspError::NoPath));
}

#[test]
fn oversized_matrix_is_rejected_by_bruteforce_only() {
    let matrix = vec![vec![1; 12]; 12];
    assert!(matches!(
        BruteForceTsp.solve(&matrix, 0),
        Err(TspError::InvalidInput(_))
    ));
    let tour = DynamicProgrammingTsp.solve(&matrix, 0).unwrap();
    assert_eq!(tour.cost, 12);
    assert_eq!(tour.order, (0..12).chain(std::iter::once(0)).collect::<Vec<_>>());
}
