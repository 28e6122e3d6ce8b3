//! Demonstration of the posture monitor engine.
//!
//! This example shows how to:
//! 1. Create an engine from the default configuration
//! 2. Share it between a sampling thread and a minute ticker
//! 3. Feed synthetic frames (blinks, leaning in, stepping away)
//! 4. Collect the debounced alerts
//!
//! Run with: cargo run --example monitor_demo
//!
//! Time is simulated: one simulated minute passes in well under a second.

use crossbeam_channel::{bounded, unbounded, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use posture_monitor::{
    core::{MonitorEngine, StartOutcome},
    AlertIntent, Config, Sample, ALERT_GUIDE,
};

const FRAME_MS: i64 = 100;
const MINUTE_MS: i64 = 60_000;

fn synthetic_frame(ts: i64) -> Sample {
    let minute = ts / MINUTE_MS;
    let in_minute = ts % MINUTE_MS;

    // Minute 4: the user walks away.
    if minute == 4 {
        return Sample::no_face(ts);
    }

    // Blink every 4s for the first two minutes, then only every 15s.
    let blink_every = if minute < 2 { 4_000 } else { 15_000 };
    let openness = if in_minute % blink_every < FRAME_MS { 0.12 } else { 0.31 };

    // Minute 3: leaning into the screen.
    let face_size = if minute == 3 { 0.62 } else { 0.18 };

    Sample::face(ts, openness, face_size)
}

fn main() {
    println!("Posture Monitor - Engine Demo");
    println!("=============================");
    println!("{ALERT_GUIDE}");

    let engine = match MonitorEngine::new(Config::default()) {
        Ok(engine) => engine.into_shared(),
        Err(e) => {
            eprintln!("Invalid configuration: {e}");
            return;
        }
    };

    if let StartOutcome::Started(id) = engine.lock().expect("engine lock").start(0) {
        println!("Session: {id}");
    }

    let (alert_tx, alert_rx) = unbounded::<AlertIntent>();
    let minutes = 8;

    // Frames and ticks are produced on separate threads; the engine mutex
    // serialises them. A ticker may run slightly ahead of the frames, which
    // only shifts a few blinks into the next bucket.
    let (tick_tx, tick_rx) = bounded::<i64>(4);
    let sampler = {
        let engine = engine.clone();
        let alert_tx = alert_tx.clone();
        thread::spawn(move || {
            let mut ts = 0;
            while ts < minutes * MINUTE_MS {
                let observation = engine.lock().expect("engine lock").observe(&synthetic_frame(ts));
                for alert in observation.alerts {
                    if alert_tx.send(alert).is_err() {
                        return;
                    }
                }
                ts += FRAME_MS;
                if ts % MINUTE_MS == 0 && tick_tx.send(ts).is_err() {
                    eprintln!("Ticker stopped early");
                    return;
                }
            }
        })
    };

    let ticker = {
        let engine = engine.clone();
        thread::spawn(move || {
            for now in tick_rx {
                let outcome = engine.lock().expect("engine lock").tick(now);
                if let Some(bucket) = outcome.bucket {
                    println!(
                        "[minute {:>2}] {:>2} blinks",
                        bucket.timestamp_ms / MINUTE_MS,
                        bucket.blink_count
                    );
                }
                for alert in outcome.alerts {
                    if alert_tx.send(alert).is_err() {
                        return;
                    }
                }
            }
        })
    };

    let mut alerts = Vec::new();
    loop {
        match alert_rx.recv_timeout(Duration::from_millis(100)) {
            Ok(alert) => alerts.push(alert),
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    let _ = sampler.join();
    let _ = ticker.join();

    println!();
    println!("Alerts:");
    for alert in &alerts {
        println!(
            "  [{:>6.1}s] {:<16} {}",
            alert.timestamp_ms as f64 / 1000.0,
            alert.kind.as_str(),
            alert.message
        );
    }

    let mut engine = engine.lock().expect("engine lock");
    let status = engine.status(minutes * MINUTE_MS);
    println!();
    println!(
        "Blink rate: {:.1}/min over {} minutes, {} blinks total",
        status.blink_stats.avg_per_minute, status.blink_stats.minute_count, status.total_blinks
    );
    engine.stop();
}
