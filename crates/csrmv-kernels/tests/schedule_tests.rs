use csrmv_core::{build_matrix, Csr};
use csrmv_kernels::config::{MAX_CHUNK_ROWS, MIN_CHUNK_ROWS};
use csrmv_kernels::*;

/// Matrix whose first rows are dense and the rest nearly empty.
fn skewed_csr(nrows: usize, ncols: usize, heavy_rows: usize) -> Csr<f64, i64> {
    let mut indptr = vec![0i64];
    let mut indices = Vec::new();
    let mut data = Vec::new();
    for r in 0..nrows {
        let width = if r < heavy_rows { ncols } else { 1 };
        for j in 0..width {
            indices.push(j as i64);
            data.push(1.0 + (r % 7) as f64);
        }
        indptr.push(indices.len() as i64);
    }
    Csr::from_parts(nrows, ncols, indptr, indices, data).unwrap()
}

#[test]
fn chunk_size_stays_clamped() {
    for nrows in [0, 1, 999, 50_000, 10_000_000, usize::MAX] {
        for threads in [1, 2, 8, 256] {
            let c = dynamic_chunk_size(nrows, threads);
            assert!(
                (MIN_CHUNK_ROWS..=MAX_CHUNK_ROWS).contains(&c),
                "nrows={nrows} threads={threads} chunk={c}"
            );
        }
    }
}

#[test]
fn chunk_size_boundaries() {
    assert_eq!(dynamic_chunk_size(1, 1), 10);
    assert_eq!(dynamic_chunk_size(1, 256), 10);
    assert_eq!(dynamic_chunk_size(10_000_000, 1), 1000);
    assert_eq!(dynamic_chunk_size(10_000_000, 256), 390);
}

#[test]
fn every_chunk_claimed_once() {
    let a = build_matrix(5_003, 64, 0.05).unwrap();
    let x = vec![1.0; 64];
    for threads in [1, 3, 8] {
        let (y, stats) = spmv_dynamic_with_stats(&a, &x, threads).unwrap();
        assert_eq!(y, spmv_sequential(&a, &x).unwrap());
        assert_eq!(stats.chunk_size, dynamic_chunk_size(5_003, threads));
        assert_eq!(stats.num_chunks, 5_003usize.div_ceil(stats.chunk_size));
        assert_eq!(stats.chunks_claimed(), stats.num_chunks);
        assert_eq!(stats.rows_processed(), 5_003);
        assert_eq!(stats.workers.iter().map(|w| w.nnz).sum::<usize>(), a.nnz());
        assert!(stats.workers.len() <= threads);
    }
}

#[test]
fn skewed_rows_still_match() {
    let a = skewed_csr(4_000, 300, 40);
    let x: Vec<f64> = (0..300).map(|j| (j % 11) as f64 - 5.0).collect();
    let y_seq = spmv_sequential(&a, &x).unwrap();
    for threads in [2, 4, 8] {
        assert_eq!(spmv_static(&a, &x, threads).unwrap(), y_seq);
        assert_eq!(spmv_dynamic(&a, &x, threads).unwrap(), y_seq);
    }
}

#[test]
fn static_ranges_cover_rows() {
    for (nrows, parts) in [(0, 3), (7, 1), (10, 4), (1_000, 8), (5, 9)] {
        let ranges = partition_rows(nrows, parts);
        assert_eq!(ranges.len(), parts);
        assert_eq!(ranges.first().unwrap().start, 0);
        assert_eq!(ranges.last().unwrap().end, nrows);
        assert!(ranges.windows(2).all(|w| w[0].end == w[1].start));
        let lens: Vec<usize> = ranges.iter().map(|r| r.len()).collect();
        let (lo, hi) = (lens.iter().min().unwrap(), lens.iter().max().unwrap());
        assert!(hi - lo <= 1);
    }
}

#[test]
fn schedule_dispatch_by_name() {
    let a = skewed_csr(50, 10, 5);
    let x = vec![1.0; 10];
    let expected = spmv_sequential(&a, &x).unwrap();
    for name in ["sequential", "static", "dynamic"] {
        let schedule: Schedule = name.parse().unwrap();
        assert_eq!(schedule.as_str(), name);
        assert_eq!(spmv(&a, &x, schedule, 3).unwrap(), expected);
    }
}
