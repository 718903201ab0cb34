//! Tests for the bounded asynchronous sink

mod common;

use std::collections::HashSet;
use std::io;
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use common::{is_child, run_child, FailingWriter, GatedWriter, RecordingWriter, SharedBuffer};
use sluice_core::error::SinkError;
use sluice_core::sink::{AsyncSink, Sink, SyncSink, WriteFailurePolicy, DEFAULT_CAPACITY};

const BLOCKED: Duration = Duration::from_millis(200);
const PATIENCE: Duration = Duration::from_secs(5);

#[test]
fn test_single_producer_order_is_preserved()
{
    let recorder = RecordingWriter::new();
    let sink = AsyncSink::new(recorder.clone(), 8).unwrap();

    let expected: Vec<Vec<u8>> = (0..500).map(|i| format!("entry-{i}\n").into_bytes()).collect();
    for entry in &expected {
        assert_eq!(sink.write(entry).unwrap(), entry.len());
    }
    sink.close().unwrap();

    assert_eq!(recorder.writes(), expected);
}

#[test]
fn test_concurrent_producers_drain_completely()
{
    let recorder = RecordingWriter::new();
    let sink = Arc::new(AsyncSink::new(recorder.clone(), 16).unwrap());

    let producers: Vec<_> = (0..10)
        .map(|producer| {
            let sink = Arc::clone(&sink);
            thread::spawn(move || {
                let mut sent = 0;
                for i in 0..100 {
                    let entry = format!("p{producer}-{i}\n");
                    sink.write(entry.as_bytes()).unwrap();
                    sent += entry.len();
                }
                sent
            })
        })
        .collect();
    let sent: usize = producers.into_iter().map(|p| p.join().unwrap()).sum();

    sink.close().unwrap();

    let writes = recorder.writes();
    assert_eq!(writes.len(), 1000);
    assert_eq!(writes.iter().map(Vec::len).sum::<usize>(), sent);

    let unique: HashSet<&Vec<u8>> = writes.iter().collect();
    assert_eq!(unique.len(), 1000, "no entry may be written twice");

    // FIFO per producer: each producer's sequence numbers arrive in order.
    for producer in 0..10 {
        let prefix = format!("p{producer}-");
        let sequence: Vec<u32> = writes
            .iter()
            .map(|w| String::from_utf8(w.clone()).unwrap())
            .filter_map(|w| w.strip_prefix(&prefix).map(|rest| rest.trim_end().parse().unwrap()))
            .collect();
        assert_eq!(sequence, (0..100).collect::<Vec<_>>());
    }
}

#[test]
fn test_write_after_close_fails_fast()
{
    let sink = AsyncSink::new(io::sink(), 4).unwrap();
    sink.close().unwrap();

    let started = Instant::now();
    let result = sink.write(b"late\n");
    assert!(matches!(result, Err(SinkError::Closed)));
    assert!(started.elapsed() < Duration::from_secs(1));
    assert!(sink.is_closed());
}

#[test]
fn test_close_is_idempotent()
{
    let buffer = SharedBuffer::new();
    let sink = AsyncSink::new(buffer.clone(), 4).unwrap();
    sink.write(b"once\n").unwrap();

    sink.close().unwrap();
    sink.close().unwrap();

    assert_eq!(buffer.contents(), "once\n");
}

#[test]
fn test_zero_capacity_is_rejected()
{
    let result = AsyncSink::new(io::sink(), 0);
    assert!(matches!(result, Err(SinkError::InvalidCapacity(0))));
}

#[test]
fn test_default_capacity()
{
    let sink = AsyncSink::new(io::sink(), DEFAULT_CAPACITY).unwrap();
    assert_eq!(sink.capacity(), 1000);
    sink.close().unwrap();
}

#[test]
fn test_full_queue_blocks_producer_until_space_frees()
{
    let (writer, gate) = GatedWriter::new();
    let sink = Arc::new(AsyncSink::new(writer, 2).unwrap());

    // The writer thread takes entry 1 and parks inside the downstream write.
    sink.write(b"1").unwrap();
    gate.entered.recv_timeout(PATIENCE).unwrap();

    sink.write(b"2").unwrap();
    sink.write(b"3").unwrap();
    assert_eq!(sink.queued(), 2);

    let (done_tx, done_rx) = mpsc::channel();
    let producer = {
        let sink = Arc::clone(&sink);
        thread::spawn(move || done_tx.send(sink.write(b"4")).unwrap())
    };
    assert!(done_rx.recv_timeout(BLOCKED).is_err(), "producer must block on a full queue");

    gate.release.send(()).unwrap();
    assert!(done_rx.recv_timeout(PATIENCE).unwrap().is_ok());
    producer.join().unwrap();

    drop(gate.release);
    sink.close().unwrap();

    let written: Vec<Vec<u8>> = gate.records.writes();
    assert_eq!(written, vec![b"1".to_vec(), b"2".to_vec(), b"3".to_vec(), b"4".to_vec()]);
}

#[test]
fn test_producer_blocked_at_shutdown_is_rejected()
{
    let (writer, gate) = GatedWriter::new();
    let sink = Arc::new(AsyncSink::new(writer, 2).unwrap());

    sink.write(b"1").unwrap();
    gate.entered.recv_timeout(PATIENCE).unwrap();
    sink.write(b"2").unwrap();
    sink.write(b"3").unwrap();

    let (done_tx, done_rx) = mpsc::channel();
    let producer = {
        let sink = Arc::clone(&sink);
        thread::spawn(move || done_tx.send(sink.write(b"4")).unwrap())
    };
    assert!(done_rx.recv_timeout(BLOCKED).is_err());

    let closer = {
        let sink = Arc::clone(&sink);
        thread::spawn(move || sink.close())
    };

    let rejected = done_rx.recv_timeout(PATIENCE).unwrap();
    assert!(matches!(rejected, Err(SinkError::Closed)));
    producer.join().unwrap();

    // Entries accepted before shutdown are still delivered.
    drop(gate.release);
    closer.join().unwrap().unwrap();
    assert_eq!(gate.records.writes(), vec![b"1".to_vec(), b"2".to_vec(), b"3".to_vec()]);
}

#[test]
fn test_concurrent_close_waits_for_drain()
{
    let recorder = RecordingWriter::slow(Duration::from_millis(5));
    let sink = Arc::new(AsyncSink::new(recorder.clone(), 32).unwrap());
    for i in 0..20 {
        sink.write(format!("{i}\n").as_bytes()).unwrap();
    }

    let closers: Vec<_> = (0..2)
        .map(|_| {
            let sink = Arc::clone(&sink);
            let recorder = recorder.clone();
            thread::spawn(move || {
                sink.close().unwrap();
                recorder.writes().len()
            })
        })
        .collect();

    for closer in closers {
        assert_eq!(closer.join().unwrap(), 20);
    }
}

#[test]
fn test_downstream_failures_are_summarized_on_close()
{
    let sink = AsyncSink::with_policy(FailingWriter, 4, WriteFailurePolicy::Report).unwrap();
    for _ in 0..3 {
        sink.write(b"lost\n").unwrap();
    }

    match sink.close() {
        Err(SinkError::DownstreamWrite { failures, last }) => {
            assert_eq!(failures, 3);
            assert!(last.contains("downstream gone"));
        }
        other => panic!("expected DownstreamWrite, got {other:?}"),
    }
}

#[test]
fn test_exit_policy_terminates_on_write_failure()
{
    if is_child("exit-policy") {
        let sink = AsyncSink::with_policy(FailingWriter, 4, WriteFailurePolicy::Exit).unwrap();
        sink.write(b"lost\n").unwrap();
        // The writer thread exits the process before close can return.
        let _ = sink.close();
        std::process::exit(0);
    }

    let output = run_child("test_exit_policy_terminates_on_write_failure", "exit-policy");
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn test_drop_drains_pending_entries()
{
    let buffer = SharedBuffer::new();
    {
        let sink = AsyncSink::new(buffer.clone(), 4).unwrap();
        for i in 0..10 {
            sink.write(format!("{i}\n").as_bytes()).unwrap();
        }
    }
    assert_eq!(buffer.lines().len(), 10);
}

#[test]
fn test_sync_sink_rejects_after_close()
{
    let buffer = SharedBuffer::new();
    let sink = SyncSink::new(buffer.clone());

    Sink::write(&sink, b"now\n").unwrap();
    assert_eq!(buffer.contents(), "now\n");

    sink.close().unwrap();
    sink.close().unwrap();
    assert!(matches!(Sink::write(&sink, b"later\n"), Err(SinkError::Closed)));
}

#[test]
fn test_closed_error_maps_to_broken_pipe()
{
    let err: io::Error = SinkError::Closed.into();
    assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    assert!(err.to_string().contains("sink closed"));
}
