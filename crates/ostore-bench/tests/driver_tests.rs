//! Benchmark driver end-to-end and failure isolation tests.

mod common;

use common::{FaultyEngine, Faults, new_client};
use ostore_bench::results::OperationKind;
use ostore_bench::{BenchmarkConfig, BenchmarkDriver, PayloadPattern, ReportFormatter};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use tempfile::TempDir;

fn config(sizes: &[usize], iterations: usize) -> BenchmarkConfig {
    BenchmarkConfig {
        sizes: sizes.to_vec(),
        iterations,
        progress: false,
        ..BenchmarkConfig::default()
    }
}

fn driver(config: BenchmarkConfig) -> BenchmarkDriver {
    BenchmarkDriver::new(config).with_stop_flag(Arc::new(AtomicBool::new(false)))
}

#[test]
fn test_two_sizes_three_iterations() {
    let dir = TempDir::new().unwrap();
    let mut client = new_client(&dir, FaultyEngine::new(Faults::default()));

    let report = driver(config(&[4096, 16_384], 3)).run(&mut client, |_| {});

    assert_eq!(report.outcomes.len(), 2);
    assert!(report.is_complete());
    for outcome in &report.outcomes {
        assert_eq!(outcome.write_samples.len(), 3);
        assert_eq!(outcome.read_samples.len(), 3);

        let write = outcome.write_summary();
        let read = outcome.read_summary();
        let (write, read) = (write.measured().unwrap(), read.measured().unwrap());
        assert!(write.mean_us > 0.0 && write.throughput_mbps > 0.0);
        assert!(read.mean_us > 0.0 && read.throughput_mbps > 0.0);
    }

    let mut names = client.list().unwrap();
    names.sort();
    assert_eq!(
        names,
        vec!["obj_16384_0", "obj_16384_1", "obj_16384_2", "obj_4096_0", "obj_4096_1", "obj_4096_2"]
    );

    let text = ReportFormatter::default().render(&report);
    let rows = text.lines().filter(|l| l.starts_with("4 KB") || l.starts_with("16 KB")).count();
    assert_eq!(rows, 2);
    assert!(!text.contains("FAILED"));
}

#[test]
fn test_failed_write_only_affects_its_size() {
    let dir = TempDir::new().unwrap();
    let engine = FaultyEngine::new(Faults {
        fail_write: vec!["obj_16384_1".to_string()],
        ..Faults::default()
    });
    let mut client = new_client(&dir, engine);

    let report = driver(config(&[4096, 16_384, 65_536], 3)).run(&mut client, |_| {});

    assert_eq!(report.outcomes.len(), 3);
    let [small, middle, large] = &report.outcomes[..] else {
        panic!("expected three outcomes");
    };

    assert_eq!(small.write_samples.len(), 3);
    assert_eq!(large.write_samples.len(), 3);
    assert!(small.failure.is_none() && large.failure.is_none());

    // Iteration 0 succeeded, iteration 1 aborted the size.
    assert_eq!(middle.write_samples.len(), 1);
    assert_eq!(middle.read_samples.len(), 1);
    assert!(!middle.is_failed());
    assert!(middle.was_aborted());
    assert!(!small.was_aborted() && !large.was_aborted());
    let failure = middle.failure.as_ref().unwrap();
    assert_eq!(failure.kind, OperationKind::Write);
    assert_eq!(failure.iteration, 1);
    assert_eq!(failure.code, Some(-libc::EIO));
    assert!(!report.is_complete());
    assert_eq!(report.failed_outcomes().map(|o| o.size).collect::<Vec<_>>(), vec![16_384]);
}

#[test]
fn test_failure_on_first_iteration_is_failed_row() {
    let dir = TempDir::new().unwrap();
    let engine = FaultyEngine::new(Faults {
        fail_read: vec!["obj_4096_".to_string()],
        ..Faults::default()
    });
    let mut client = new_client(&dir, engine);

    let mut seen = Vec::new();
    let report = driver(config(&[4096, 16_384], 2)).run(&mut client, |o| seen.push(o.size));

    assert_eq!(seen, vec![4096, 16_384]);
    assert!(report.outcomes[0].is_failed());
    assert_eq!(report.outcomes[0].write_samples.len(), 1);
    assert!(report.outcomes[0].read_samples.is_empty());
    assert!(!report.outcomes[1].is_failed());
    assert_eq!(report.failed_outcomes().map(|o| o.size).collect::<Vec<_>>(), vec![4096]);

    let text = ReportFormatter::default().render(&report);
    assert!(text.contains("4 KB         FAILED — no successful operations"));
}

#[test]
fn test_verify_catches_corrupt_reads() {
    let dir = TempDir::new().unwrap();
    let engine = FaultyEngine::new(Faults {
        corrupt_read: vec!["obj_4096_2".to_string()],
        ..Faults::default()
    });
    let mut client = new_client(&dir, engine);

    let mut cfg = config(&[4096], 4);
    cfg.verify = true;
    cfg.payload = PayloadPattern::Fill(b'x');
    let report = driver(cfg).run(&mut client, |_| {});

    let outcome = &report.outcomes[0];
    assert_eq!(outcome.write_samples.len(), 3);
    assert_eq!(outcome.read_samples.len(), 2);
    let failure = outcome.failure.as_ref().unwrap();
    assert_eq!(failure.kind, OperationKind::Read);
    assert_eq!(failure.iteration, 2);
}

#[test]
fn test_stop_flag_interrupts_run() {
    let dir = TempDir::new().unwrap();
    let mut client = new_client(&dir, FaultyEngine::new(Faults::default()));

    let stop = Arc::new(AtomicBool::new(true));
    let report = BenchmarkDriver::new(config(&[4096, 16_384], 3))
        .with_stop_flag(stop)
        .run(&mut client, |_| {});

    assert!(report.interrupted);
    assert!(report.outcomes.is_empty());
    assert!(client.list().unwrap().is_empty());

    let text = ReportFormatter::default().render(&report);
    assert!(text.ends_with("Benchmark interrupted.\n\n"));
}

#[test]
fn test_store_is_released_after_run() {
    let dir = TempDir::new().unwrap();
    let mut client = new_client(&dir, FaultyEngine::new(Faults::default()));
    driver(config(&[4096], 1)).run(&mut client, |_| {});

    client.teardown().unwrap();
    assert!(!client.store().is_mounted());
}

