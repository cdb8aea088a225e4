//! Recursive coordinate bisection.
//!
//! Split the point set along the longest extent of its bounding box so the
//! two halves carry weight proportional to the number of parts each side
//! receives (`⌈k/2⌉` left, `⌊k/2⌋` right), then recurse. Ties on the
//! coordinate are broken by index, so the result is fully deterministic.

/// Assign each point to one of `n_parts` parts.
pub fn rcb_partition(centroids: &[[f64; 3]], weights: &[u64], n_parts: usize) -> Vec<usize> {
    assert!(n_parts > 0, "Number of parts (k) must be ≥ 1");
    let mut parts = vec![0; centroids.len()];
    let idx: Vec<usize> = (0..centroids.len()).collect();
    bisect(centroids, weights, idx, 0, n_parts, &mut parts);
    parts
}

fn longest_axis(centroids: &[[f64; 3]], idx: &[usize]) -> usize {
    let mut lo = [f64::INFINITY; 3];
    let mut hi = [f64::NEG_INFINITY; 3];
    for &i in idx {
        for d in 0..3 {
            lo[d] = lo[d].min(centroids[i][d]);
            hi[d] = hi[d].max(centroids[i][d]);
        }
    }
    (0..3)
        .max_by(|&a, &b| (hi[a] - lo[a]).total_cmp(&(hi[b] - lo[b])).then(b.cmp(&a)))
        .unwrap_or(0)
}

fn bisect(
    centroids: &[[f64; 3]],
    weights: &[u64],
    mut idx: Vec<usize>,
    first_part: usize,
    k: usize,
    parts: &mut [usize],
) {
    if k == 1 || idx.is_empty() {
        for i in idx {
            parts[i] = first_part;
        }
        return;
    }
    let k_left = k.div_ceil(2);
    let axis = longest_axis(centroids, &idx);
    idx.sort_by(|&a, &b| {
        centroids[a][axis]
            .total_cmp(&centroids[b][axis])
            .then(a.cmp(&b))
    });

    // first position where the left side reaches its share of the weight
    let total: u128 = idx.iter().map(|&i| weights[i] as u128).sum();
    let target = total * k_left as u128;
    let mut acc: u128 = 0;
    let mut cut = idx.len();
    for (pos, &i) in idx.iter().enumerate() {
        if acc * k as u128 >= target {
            cut = pos;
            break;
        }
        acc += weights[i] as u128;
    }

    let right = idx.split_off(cut);
    bisect(centroids, weights, idx, first_part, k_left, parts);
    bisect(centroids, weights, right, first_part + k_left, k - k_left, parts);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_along_longest_axis() {
        // tall column: y spread dominates
        let pts: Vec<[f64; 3]> = (0..8).map(|i| [0.1 * (i % 2) as f64, i as f64, 0.0]).collect();
        let parts = rcb_partition(&pts, &[1; 8], 2);
        assert_eq!(parts, vec![0, 0, 0, 0, 1, 1, 1, 1]);
    }

    #[test]
    fn odd_part_counts_get_proportional_shares() {
        let pts: Vec<[f64; 3]> = (0..9).map(|i| [i as f64, 0.0, 0.0]).collect();
        let parts = rcb_partition(&pts, &[1; 9], 3);
        let mut counts = [0; 3];
        for p in parts {
            counts[p] += 1;
        }
        assert_eq!(counts, [3, 3, 3]);
    }

    #[test]
    fn weights_shift_the_cut() {
        let pts: Vec<[f64; 3]> = (0..4).map(|i| [i as f64, 0.0, 0.0]).collect();
        let parts = rcb_partition(&pts, &[3, 1, 1, 1], 2);
        assert_eq!(parts, vec![0, 1, 1, 1]);
    }

    #[test]
    fn more_parts_than_points_leaves_parts_empty() {
        let parts = rcb_partition(&[[0.0; 3], [1.0, 0.0, 0.0]], &[1, 1], 4);
        assert_eq!(parts.len(), 2);
        assert_ne!(parts[0], parts[1]);
        assert!(parts.iter().all(|&p| p < 4));
    }
}
