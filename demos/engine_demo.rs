//! Demonstration of the MoodSense aggregation engine.
//!
//! This example shows how to:
//! 1. Create an engine and subscribe to its mood transitions
//! 2. Feed synthetic classifier outputs from all three sources
//! 3. Run a short focus session and receive its closing message
//!
//! Run with: cargo run --example engine_demo

use std::time::Duration;

use moodsense::{
    engine::{MoodEngine, SessionTimerState},
    signal::{BoundingBox, Detection},
    MoodState,
};

#[tokio::main]
async fn main() {
    println!("MoodSense - Engine Demo");
    println!("=======================");
    println!();

    // A 6-second session so the demo finishes quickly.
    let mut engine = MoodEngine::new(400, 10, Duration::from_secs(6));
    println!("Instance ID: {}", engine.instance_id());
    println!();

    // Watch every mood transition as it happens.
    let mut mood_rx = engine.mood().observe();
    let printer = tokio::spawn(async move {
        while let Ok(state) = mood_rx.recv().await {
            match state {
                MoodState::Processing => println!("  [mood] processing..."),
                MoodState::Detected { label, source } => {
                    println!("  [mood] {label} (from {source})")
                }
                MoodState::Error { reason } => println!("  [mood] error: {reason}"),
                MoodState::Inactive => {}
            }
        }
    });

    // 1. Audio: 400 time steps of model output, mostly "Happy" (class 2).
    println!("Feeding audio model outputs...");
    let mut steps = vec![vec![0.05, 0.05, 0.6, 0.05, 0.05, 0.05, 0.05, 0.1]; 400];
    steps[0] = vec![0.9, 0.0, 0.1, 0.0, 0.0, 0.0, 0.0, 0.0]; // one noisy frame
    match engine.process_audio_steps(steps) {
        Ok(verdict) => println!("  audio cycle: {} ({:.2})", verdict.label, verdict.confidence),
        Err(e) => eprintln!("  audio cycle failed: {e}"),
    }
    println!();

    // 2. Face: model outputs arriving over the sample bus, the way a
    //    producer thread would deliver them.
    println!("Feeding face model outputs over the sample bus...");
    let (tx, rx) = moodsense::signal::sample_bus(64);
    let producer = std::thread::spawn(move || {
        let probs = vec![0.02, 0.02, 0.02, 0.8, 0.06, 0.04, 0.04];
        let _ = tx.send(moodsense::signal::Sample::probabilities(
            moodsense::signal::SignalSource::Face,
            probs,
        ));
    });
    while let Ok(sample) = rx.recv_timeout(Duration::from_millis(200)) {
        match engine.ingest(sample) {
            Ok(Some(verdict)) => println!("  face cycle: {}", verdict.label),
            Ok(None) => {}
            Err(e) => eprintln!("  sample rejected: {e}"),
        }
    }
    let _ = producer.join();
    println!();

    // 3. Face again: smile-probability heuristic over two detections.
    println!("Feeding face detections...");
    let detections = vec![
        Detection {
            bounds: BoundingBox {
                x: 120,
                y: 80,
                width: 96,
                height: 96,
            },
            smile_probability: Some(0.85),
        },
        Detection {
            bounds: BoundingBox {
                x: 400,
                y: 90,
                width: 80,
                height: 80,
            },
            smile_probability: Some(0.7),
        },
    ];
    if let Some(verdict) = engine.process_smile(&detections, 640, 480) {
        println!("  smile cycle: {}", verdict.label);
    }
    println!();

    // 4. Typing: twenty quick keystrokes on a growing text.
    println!("Feeding keystrokes...");
    let base = chrono::Utc::now();
    let mut text = String::new();
    for i in 0..20 {
        text.push_str("hi ");
        let at = base + chrono::Duration::milliseconds(120 * (i + 1));
        if let Some(verdict) = engine.process_keystroke(&text, at) {
            println!("  typing cycle: {}", verdict.label);
        }
    }
    println!();

    // 5. A short focus session. The closing message reflects the final mood.
    println!("Starting a 6 second session...");
    let mut timer_rx = engine.timer().observe();
    let session = engine.start_session();

    loop {
        match timer_rx.recv().await {
            Ok(SessionTimerState::Running { .. }) => {
                let state = engine.timer().snapshot();
                println!("  {:02}:{:02} remaining", state.minutes(), state.seconds());
            }
            Ok(SessionTimerState::Finished { message }) => {
                println!();
                println!("{message}");
                break;
            }
            Ok(SessionTimerState::Inactive) => {}
            Err(_) => break,
        }
    }
    let _ = session.await;

    println!();
    println!("{}", engine.log().summary());
    drop(engine);
    let _ = printer.await;

    println!();
    println!("Demo complete!");
}
