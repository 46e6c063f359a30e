use miic_core::{AdjacencyMatrix, EdgeKind};
use proptest::prelude::*;

/// Variable names `V0..V{n-1}`.
pub fn variable_names(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("V{i}")).collect()
}

/// Acyclic seed structures over 3 to 6 variables.
///
/// Directed edges always point from the lower to the higher index, so the
/// directed part can never contain a cycle.
pub fn arb_seed() -> impl Strategy<Value = AdjacencyMatrix> {
    (3usize..=6).prop_flat_map(|n| {
        let pairs = n * (n - 1) / 2;
        prop::collection::vec(0u8..4, pairs).prop_map(move |marks| {
            let mut adj = AdjacencyMatrix::new(variable_names(n)).unwrap();
            let mut next = marks.iter();
            for i in 0..n {
                for j in (i + 1)..n {
                    let kind = match next.next() {
                        Some(1) => EdgeKind::Undirected,
                        Some(2) => EdgeKind::ParentOf,
                        Some(3) => EdgeKind::Bidirected,
                        _ => EdgeKind::None,
                    };
                    adj.set(i, j, kind);
                }
            }
            adj
        })
    })
}

/// A pseudo-random but fully deterministic information value in
/// `[-0.3, 0.5)`, derived from the canonical key and a salt.
pub fn hashed_information(salt: u64, x: &str, y: &str, conditioning: &[&str]) -> f64 {
    let (a, b) = if x <= y { (x, y) } else { (y, x) };
    let mut cond: Vec<&str> = conditioning.to_vec();
    cond.sort_unstable();
    cond.dedup();

    let key = format!("{salt}|{a}|{b}|{}", cond.join(","));
    let digest = blake3::hash(key.as_bytes());
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest.as_bytes()[..8]);
    let unit = u64::from_le_bytes(bytes) as f64 / u64::MAX as f64;
    unit.mul_add(0.8, -0.3)
}
