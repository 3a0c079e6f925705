//! SpMV kernels for csrmv: sequential reference, static and dynamic row
//! scheduling, and result verification.
//!
//! Parallel kernels take an explicit worker count; [`available_threads`]
//! gives the default, which honours `RAYON_NUM_THREADS`.

pub mod config;
pub mod schedule;
pub mod spmv;
pub mod util;
pub mod verify;

pub use config::{available_threads, DEFAULT_TOLERANCE};
pub use schedule::{
    dynamic_chunk_size, spmv, spmv_dynamic, spmv_dynamic_with_stats, spmv_static, ChunkCursor,
    DynamicStats, Schedule, WorkerLoad,
};
pub use spmv::{row_dot, spmv_sequential};
pub use util::partition_rows;
pub use verify::{verify, Mismatch, VerifyReport};
