//! Decoder pool tests
//!
//! These tests run the worker pool on a multi-threaded runtime and check
//! routing, fan-in and lifecycle behaviour.

mod common;

use std::collections::HashSet;
use std::time::Duration;

use common::{encode, encode_multipart, payload};
use tokio::time::timeout;
use yenc_pool::{
    Data, Decoder, DecoderConfig, YencAssembler, YencError, available_parallelism, job_queue,
};

const TIMEOUT: Duration = Duration::from_secs(10);

fn workers(wanted: usize) -> usize {
    wanted.min(available_parallelism())
}

#[test]
fn test_decoder_max_workers() {
    let (_jobs, queue) = job_queue(1);
    let err = Decoder::new(available_parallelism() * 2, queue).unwrap_err();
    assert!(matches!(err, YencError::TooManyWorkers { .. }));
}

#[test]
fn test_decoder_zero_workers() {
    let (_jobs, queue) = job_queue(1);
    assert!(matches!(
        Decoder::new(0, queue).unwrap_err(),
        YencError::Config(_)
    ));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_decoder_multi_part() {
    let data = payload(19338, 7);
    let parts = encode_multipart(&data, "joystick.jpg", 2);

    let (jobs, queue) = job_queue(4);
    let mut decoder = Decoder::new(workers(4), queue).unwrap();
    decoder.start().unwrap();
    let mut responses = decoder.collect().unwrap();

    for part in &parts {
        jobs.send(Data::new(part.clone())).await.unwrap();
    }

    let mut results: Vec<Option<Data>> = vec![None, None];
    for _ in 0..parts.len() {
        let done = timeout(TIMEOUT, responses.recv()).await.unwrap().unwrap();
        assert!(done.error.is_none(), "unexpected error: {:?}", done.error);
        let part = done.part_number().unwrap() as usize;
        results[part - 1] = Some(done);
    }

    let mut joined = Vec::new();
    for done in results.into_iter().flatten() {
        joined.extend_from_slice(&done.content);
    }
    assert_eq!(joined, data);

    decoder.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_more_jobs_than_workers() {
    const JOBS: usize = 24;
    let max_workers = workers(2);

    let (jobs, queue) = job_queue(JOBS);
    let mut decoder = Decoder::new(max_workers, queue).unwrap();
    decoder.start().unwrap();
    let mut responses = decoder.collect().unwrap();

    for i in 0..JOBS {
        let encoded = encode(&payload(2048 + i, i as u32), &format!("job-{i}.bin"), 128, None);
        jobs.send(Data::new(encoded)).await.unwrap();
    }

    let mut names = HashSet::new();
    for _ in 0..JOBS {
        let done = timeout(TIMEOUT, responses.recv()).await.unwrap().unwrap();
        assert!(done.is_ok());
        let name = done.meta.unwrap().header.name;
        assert!(names.insert(name), "job delivered twice");
    }
    assert_eq!(names.len(), JOBS);

    let stats = decoder.stats();
    assert_eq!(stats.completed, JOBS as u64);
    assert_eq!(stats.failed, 0);
    assert!(stats.peak_active >= 1);
    assert!(stats.peak_active <= max_workers);

    decoder.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_errors_travel_with_the_job() {
    let (jobs, queue) = job_queue(4);
    let mut decoder = Decoder::new(1, queue).unwrap();
    decoder.start().unwrap();
    let mut responses = decoder.collect().unwrap();

    jobs.send(Data::new(&b"not a yenc article\r\n"[..])).await.unwrap();
    let done = timeout(TIMEOUT, responses.recv()).await.unwrap().unwrap();
    assert!(matches!(
        done.error,
        Some(YencError::MissingMarker { marker: "=ybegin" })
    ));
    assert!(done.content.is_empty());

    let data = payload(64, 1);
    let mut bad = b"=ybegin line=128 size=64 name=bad.bin\r\n".to_vec();
    bad.extend_from_slice(&common::encode_body(&data, 128));
    bad.extend_from_slice(b"=yend size=64 crc32=00000000\r\n");

    jobs.send(Data::new(bad)).await.unwrap();
    let done = timeout(TIMEOUT, responses.recv()).await.unwrap().unwrap();
    assert!(done.error.as_ref().is_some_and(YencError::is_checksum_mismatch));
    assert_eq!(done.content, data);

    assert_eq!(decoder.stats().failed, 2);
    decoder.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_pool_output_feeds_assembler() {
    let data = payload(30_000, 11);
    let parts = encode_multipart(&data, "archive.rar", 6);

    let config = DecoderConfig::new(workers(3)).with_queue_capacity(2);
    let (jobs, queue) = config.job_queue();
    let mut decoder = Decoder::with_config(config, queue).unwrap();
    decoder.start().unwrap();
    let mut responses = decoder.collect().unwrap();

    let count = parts.len();
    tokio::spawn(async move {
        for part in parts {
            if jobs.send(Data::new(part)).await.is_err() {
                break;
            }
        }
    });

    let mut assembler = YencAssembler::new();
    for _ in 0..count {
        let done = timeout(TIMEOUT, responses.recv()).await.unwrap().unwrap();
        assembler.add_data(done).unwrap();
    }

    assert!(assembler.is_complete());
    assert_eq!(assembler.filename(), Some("archive.rar"));
    assert_eq!(assembler.assemble().unwrap(), data);

    decoder.stop().await;
}

#[tokio::test]
async fn test_lifecycle_errors() {
    let (_jobs, queue) = job_queue(1);
    let mut decoder = Decoder::new(1, queue).unwrap();

    assert!(!decoder.is_running());
    assert!(matches!(decoder.collect(), Err(YencError::Lifecycle(_))));

    decoder.start().unwrap();
    assert!(decoder.is_running());
    assert!(matches!(decoder.start(), Err(YencError::Lifecycle(_))));

    let _responses = decoder.collect().unwrap();
    assert!(matches!(decoder.collect(), Err(YencError::Lifecycle(_))));

    decoder.stop().await;
    assert!(!decoder.is_running());
    assert!(matches!(decoder.start(), Err(YencError::Lifecycle(_))));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_stop_closes_output() {
    let (jobs, queue) = job_queue(4);
    let mut decoder = Decoder::new(workers(2), queue).unwrap();
    decoder.start().unwrap();
    let mut responses = decoder.collect().unwrap();

    jobs.send(Data::new(encode(b"hello", "hello.txt", 128, None)))
        .await
        .unwrap();
    let done = timeout(TIMEOUT, responses.recv()).await.unwrap().unwrap();
    assert_eq!(done.content, b"hello");

    timeout(TIMEOUT, decoder.stop()).await.unwrap();

    // Every worker has exited, so the merged stream ends
    let end = timeout(TIMEOUT, responses.recv()).await.unwrap();
    assert!(end.is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_stop_without_collector_does_not_hang() {
    let (jobs, queue) = job_queue(16);
    let mut decoder = Decoder::new(1, queue).unwrap();
    decoder.start().unwrap();

    for i in 0..8 {
        let encoded = encode(&payload(512, i), "pending.bin", 128, None);
        jobs.send(Data::new(encoded)).await.unwrap();
    }

    timeout(TIMEOUT, decoder.stop()).await.unwrap();
    assert!(!decoder.is_running());
}
