mod build;

use criterion::*;

criterion_main! {
    build::benches,
    search::benches,
}
