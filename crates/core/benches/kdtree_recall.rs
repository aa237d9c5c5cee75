//! kd-tree benchmark: recall@1 and QPS against exact search on synthetic
//! clustered 128-d descriptors, swept over check budgets.
//!
//! Usage: cargo bench --bench kdtree_recall

use featurematch_core::kdtree::linear_scan;
use featurematch_core::{FeatureIndex, KdTreeConfig, VectorSet};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Instant;

const DIM: usize = 128;
const CLUSTERS: usize = 100;
const PER_CLUSTER: usize = 500;
const QUERIES: usize = 1_000;
const BUDGETS: [usize; 7] = [16, 32, 64, 128, 250, 500, 1000];

fn generate(rng: &mut StdRng) -> VectorSet {
    let mut data = Vec::with_capacity(CLUSTERS * PER_CLUSTER * DIM);
    let mut labels = Vec::with_capacity(CLUSTERS * PER_CLUSTER);
    for c in 0..CLUSTERS {
        let center: Vec<f32> = (0..DIM).map(|_| rng.gen_range(0.0..1.0)).collect();
        for _ in 0..PER_CLUSTER {
            data.extend(center.iter().map(|&x| x + rng.gen_range(-0.1..0.1)));
            labels.push(c as u32);
        }
    }
    VectorSet::from_flat(DIM, data, labels).expect("generated data is well-formed")
}

fn main() {
    let mut rng = StdRng::seed_from_u64(0x5EED);
    println!("Generating {} x {}d vectors...", CLUSTERS * PER_CLUSTER, DIM);
    let set = generate(&mut rng);

    let queries: Vec<Vec<f32>> = (0..QUERIES)
        .map(|_| {
            let base = set.vector(rng.gen_range(0..set.len()));
            base.iter().map(|&x| x + rng.gen_range(-0.05..0.05)).collect()
        })
        .collect();

    println!("Computing ground truth (linear scan)...");
    let t = Instant::now();
    let truth: Vec<f32> = queries
        .iter()
        .map(|q| linear_scan(&set, q, 1).expect("valid query")[0].distance)
        .collect();
    let scan_secs = t.elapsed().as_secs_f64();
    println!(
        "  linear scan: {:.0} QPS ({:.2}s)",
        QUERIES as f64 / scan_secs,
        scan_secs
    );

    for bucket_capacity in [8, 16, 32] {
        let t = Instant::now();
        let index = FeatureIndex::with_config(
            &set,
            KdTreeConfig {
                bucket_capacity,
                ..KdTreeConfig::default()
            },
        )
        .expect("valid config");
        println!(
            "\nbucket={bucket_capacity}: built in {:.2}s ({} nodes, depth {})",
            t.elapsed().as_secs_f64(),
            index.node_count(),
            index.depth()
        );
        println!("{:>8} {:>10} {:>12}", "checks", "recall@1", "QPS");

        for budget in BUDGETS {
            let t = Instant::now();
            let mut hits = 0usize;
            for (q, &best) in queries.iter().zip(&truth) {
                let found = index.search(q, 1, budget).expect("valid query");
                if found.first().is_some_and(|r| r.distance <= best) {
                    hits += 1;
                }
            }
            let secs = t.elapsed().as_secs_f64();
            println!(
                "{:>8} {:>10.4} {:>12.0}",
                budget,
                hits as f64 / QUERIES as f64,
                QUERIES as f64 / secs
            );
        }

        let t = Instant::now();
        let batch = index.find_knn(&queries, 1, 250).expect("valid queries");
        let secs = t.elapsed().as_secs_f64();
        println!(
            "  batch find_knn (rayon, 250 checks): {:.0} QPS, {} results",
            QUERIES as f64 / secs,
            batch.len()
        );
    }
}
