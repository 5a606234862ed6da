//! Initial center selection.
//!
//! | Strategy | k | Randomized |
//! |----------|---|------------|
//! | [`Seeding::Random`] | given | yes: k distinct points, uniformly |
//! | [`Seeding::KMeansPlusPlus`] | given | yes: D(x)-weighted |
//! | [`Seeding::Canopy`] | number of canopies | no |
//! | [`Seeding::Centers`] | number of centers | no |
//!
//! ## K-means++
//!
//! Spreads the initial centers:
//! 1. Choose the first center uniformly at random
//! 2. Choose each next center with probability proportional to D(x), the
//!    distance to the nearest chosen center under the configured measure
//!    (squared Euclidean by default, which gives the classic D(x)² rule)

use super::canopy::CanopySeeder;
use super::centroid::to_matrix;
use super::distance::DistanceMeasure;
use crate::error::{Error, Result};
use ndarray::Array2;
use rand::prelude::*;
use std::sync::Arc;
use tracing::warn;

/// How a centroid clusterer picks its starting centers.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Seeding {
    /// `k` distinct input points chosen uniformly.
    #[default]
    Random,
    /// K-means++ weighted sampling.
    KMeansPlusPlus,
    /// One center per canopy; `k` is ignored.
    Canopy {
        /// Loose threshold.
        t1: f64,
        /// Tight threshold.
        t2: f64,
    },
    /// Caller-supplied centers; `k` is ignored.
    Centers(Vec<Vec<f64>>),
}

/// Build the initial `k' × d` center matrix.
pub(crate) fn initial_centers(
    seeding: &Seeding,
    data: &Array2<f64>,
    k: usize,
    measure: &Arc<dyn DistanceMeasure>,
    rng: &mut dyn RngCore,
) -> Result<Array2<f64>> {
    let n = data.nrows();
    let d = data.ncols();
    let needs_k = matches!(seeding, Seeding::Random | Seeding::KMeansPlusPlus);
    if needs_k {
        if k == 0 {
            return Err(Error::invalid("k", "must be > 0"));
        }
        if k > n {
            return Err(Error::InvalidClusterCount {
                requested: k,
                n_items: n,
            });
        }
    }

    match seeding {
        Seeding::Random => {
            let chosen = rand::seq::index::sample(rng, n, k);
            let mut centers = Array2::zeros((k, d));
            for (mut row, i) in centers.rows_mut().into_iter().zip(chosen.iter()) {
                row.assign(&data.row(i));
            }
            Ok(centers)
        }
        Seeding::KMeansPlusPlus => Ok(kmeans_plus_plus(data, k, measure.as_ref(), rng)),
        Seeding::Canopy { t1, t2 } => {
            let seeder = CanopySeeder::new(*t1, *t2).with_measure(Arc::clone(measure));
            seeder.validate()?;
            let canopies = seeder.seed_matrix(data);
            if count_differs(k, canopies.len()) {
                warn!(
                    requested = k,
                    canopies = canopies.len(),
                    "canopy seeding produced a different cluster count than requested"
                );
            }
            let mut centers = Array2::zeros((canopies.len(), d));
            for (mut row, c) in centers.rows_mut().into_iter().zip(&canopies) {
                row.assign(&c.center);
            }
            Ok(centers)
        }
        Seeding::Centers(given) => {
            if given.is_empty() {
                return Err(Error::invalid("centers", "at least one center is required"));
            }
            let mut centers = Array2::zeros((given.len(), d));
            for (mut row, c) in centers.rows_mut().into_iter().zip(given) {
                if c.len() != d {
                    return Err(Error::DimensionMismatch {
                        expected: d,
                        found: c.len(),
                    });
                }
                row.assign(&ndarray::ArrayView1::from(c.as_slice()));
            }
            Ok(centers)
        }
    }
}

/// Point matrix plus starting centers, with the rng fixed by `seed` when given.
pub(crate) fn prepare(
    data: &[Vec<f64>],
    seeding: &Seeding,
    k: usize,
    measure: &Arc<dyn DistanceMeasure>,
    seed: Option<u64>,
) -> Result<(Array2<f64>, Array2<f64>)> {
    let matrix = to_matrix(data)?;
    let mut rng: Box<dyn RngCore> = match seed {
        Some(s) => Box::new(StdRng::seed_from_u64(s)),
        None => Box::new(rand::rng()),
    };
    let centers = initial_centers(seeding, &matrix, k, measure, rng.as_mut())?;
    Ok((matrix, centers))
}

fn count_differs(k: usize, produced: usize) -> bool {
    k != 0 && k != produced
}

fn kmeans_plus_plus(
    data: &Array2<f64>,
    k: usize,
    measure: &dyn DistanceMeasure,
    rng: &mut dyn RngCore,
) -> Array2<f64> {
    let n = data.nrows();
    let mut centers = Array2::zeros((k, data.ncols()));

    let first = rng.random_range(0..n);
    centers.row_mut(0).assign(&data.row(first));

    for i in 1..k {
        let distances: Vec<f64> = data
            .rows()
            .into_iter()
            .map(|p| {
                centers
                    .rows()
                    .into_iter()
                    .take(i)
                    .map(|c| measure.distance(p, c))
                    .fold(f64::INFINITY, f64::min)
            })
            .collect();

        let total: f64 = distances.iter().sum();
        let selected = if total > 0.0 {
            let threshold = rng.random::<f64>() * total;
            let mut cumsum = 0.0;
            let mut selected = n - 1;
            for (j, &d) in distances.iter().enumerate() {
                cumsum += d;
                if d > 0.0 && cumsum >= threshold {
                    selected = j;
                    break;
                }
            }
            selected
        } else {
            rng.random_range(0..n)
        };
        centers.row_mut(i).assign(&data.row(selected));
    }

    centers
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::distance::default_measure;
    use ndarray::array;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(7)
    }

    #[test]
    fn test_random_picks_distinct_points() {
        let data = array![[0.0], [1.0], [2.0], [3.0], [4.0]];
        let centers =
            initial_centers(&Seeding::Random, &data, 5, &default_measure(), &mut rng()).unwrap();
        let mut picked: Vec<f64> = centers.column(0).to_vec();
        picked.sort_by(f64::total_cmp);
        assert_eq!(picked, vec![0.0, 1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_k_bounds() {
        let data = array![[0.0], [1.0]];
        let m = default_measure();
        assert!(matches!(
            initial_centers(&Seeding::Random, &data, 3, &m, &mut rng()),
            Err(Error::InvalidClusterCount { requested: 3, n_items: 2 })
        ));
        assert!(initial_centers(&Seeding::KMeansPlusPlus, &data, 0, &m, &mut rng()).is_err());
    }

    #[test]
    fn test_plus_plus_spreads_centers() {
        let data = array![[0.0, 0.0], [0.0, 0.1], [50.0, 50.0], [50.0, 50.1]];
        for seed in 0..20 {
            let centers = initial_centers(
                &Seeding::KMeansPlusPlus,
                &data,
                2,
                &default_measure(),
                &mut StdRng::seed_from_u64(seed),
            )
            .unwrap();
            let near_origin = centers.rows().into_iter().filter(|r| r[0] < 1.0).count();
            assert_eq!(near_origin, 1, "seed {seed}: {centers:?}");
        }
    }

    #[test]
    fn test_plus_plus_uses_every_chosen_center() {
        // After two picks only the remaining point has a nonzero distance.
        let data = array![[0.0], [10.0], [20.0]];
        for seed in 0..10 {
            let centers = initial_centers(
                &Seeding::KMeansPlusPlus,
                &data,
                3,
                &default_measure(),
                &mut StdRng::seed_from_u64(seed),
            )
            .unwrap();
            let mut picked = centers.column(0).to_vec();
            picked.sort_by(f64::total_cmp);
            assert_eq!(picked, vec![0.0, 10.0, 20.0], "seed {seed}");
        }
    }

    #[test]
    fn test_canopy_and_explicit_centers() {
        let data = array![[0.0], [0.5], [10.0]];
        let m = default_measure();
        let centers =
            initial_centers(&Seeding::Canopy { t1: 1.0, t2: 1.0 }, &data, 0, &m, &mut rng())
                .unwrap();
        assert_eq!(centers, array![[0.25], [10.0]]);

        let given = Seeding::Centers(vec![vec![1.0], vec![2.0]]);
        let centers = initial_centers(&given, &data, 0, &m, &mut rng()).unwrap();
        assert_eq!(centers, array![[1.0], [2.0]]);

        let bad = Seeding::Centers(vec![vec![1.0, 2.0]]);
        assert!(initial_centers(&bad, &data, 0, &m, &mut rng()).is_err());
    }
}
