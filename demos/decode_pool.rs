//! Decoder pool example
//!
//! Decodes yEnc article bodies from files in parallel and reassembles
//! multi-part files.
//!
//! Run with: cargo run --example decode_pool -- part1.ntx part2.ntx
//!
//! Set YENC_OUT to write the assembled file, YENC_WORKERS to pick the
//! worker count and YENC_STRICT=1 for strict header parsing.

use std::time::Instant;
use yenc_pool::{Data, Decoder, DecoderConfig, YencAssembler};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    let inputs: Vec<String> = std::env::args().skip(1).collect();
    if inputs.is_empty() {
        eprintln!("usage: decode_pool <file.ntx>...");
        return Ok(());
    }

    let config = DecoderConfig::new(
        std::env::var("YENC_WORKERS")
            .ok()
            .and_then(|w| w.parse().ok())
            .unwrap_or_else(yenc_pool::available_parallelism),
    )
    .with_strict(std::env::var("YENC_STRICT").is_ok_and(|v| v == "1"));

    println!("Starting decoder pool with {} workers...", config.workers);

    let (jobs, queue) = config.job_queue();
    let mut decoder = Decoder::with_config(config, queue)?;
    decoder.start()?;
    let mut results = decoder.collect()?;

    let mut contents = Vec::with_capacity(inputs.len());
    for path in &inputs {
        match tokio::fs::read(path).await {
            Ok(content) => contents.push(content),
            Err(e) => eprintln!("  {}: {}", path, e),
        }
    }

    let start = Instant::now();
    let count = contents.len();

    // Feed jobs from a separate task so the queue never blocks collection
    let feeder = tokio::spawn(async move {
        for content in contents {
            if jobs.send(Data::new(content)).await.is_err() {
                break;
            }
        }
    });

    let mut assembler = YencAssembler::new();
    let mut single = Vec::new();
    let mut received = 0;

    while received < count {
        let Some(done) = results.recv().await else {
            break;
        };
        received += 1;

        match (&done.error, &done.meta) {
            (Some(err), _) => println!("  error: {}", err),
            (None, Some(meta)) => {
                println!(
                    "  {} part {} ({} bytes, crc32 {:08x})",
                    meta.header.name,
                    meta.header.part,
                    done.content.len(),
                    meta.crc32()
                );
            }
            (None, None) => {}
        }

        if done.part_number().is_some_and(|p| p > 0) {
            if let Err(e) = assembler.add_data(done) {
                println!("  cannot assemble: {}", e);
            }
        } else if done.is_ok() {
            single.push(done);
        }
    }

    feeder.await?;
    decoder.stop().await;

    let stats = decoder.stats();
    println!(
        "Decoded {} jobs ({} failed, peak {} concurrent) in {:?}",
        stats.completed,
        stats.failed,
        stats.peak_active,
        start.elapsed()
    );

    if let Ok(out) = std::env::var("YENC_OUT") {
        if assembler.is_complete() {
            std::fs::write(&out, assembler.assemble()?)?;
            println!("Wrote {} to {}", assembler.filename().unwrap_or("file"), out);
        } else if let Some(done) = single.first() {
            std::fs::write(&out, &done.content)?;
            println!("Wrote single-part file to {}", out);
        } else {
            println!("Nothing complete to write ({} bytes missing)", assembler.missing_bytes());
        }
    }

    Ok(())
}
