use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::NaiveDate;
use tokio::sync::mpsc;
use ulid::Ulid;

use tandem::engine::{filter, AgeRange, BookingService, FilterSpec, HOBBY_CATALOG};
use tandem::model::*;
use tandem::store::{Repository, Store};

const PROVIDERS: usize = 10_000;
const ROUNDS: usize = 200;

fn percentile(sorted: &[Duration], p: f64) -> Duration {
    if sorted.is_empty() {
        return Duration::ZERO;
    }
    let idx = ((sorted.len() as f64) * p / 100.0) as usize;
    sorted[idx.min(sorted.len() - 1)]
}

fn print_latency(label: &str, latencies: &mut [Duration]) {
    latencies.sort();
    let total: Duration = latencies.iter().sum();
    let avg = total / latencies.len() as u32;
    println!("  {label}:");
    println!(
        "    n={}, avg={:.3}ms, p50={:.3}ms, p95={:.3}ms, p99={:.3}ms, max={:.3}ms",
        latencies.len(),
        avg.as_secs_f64() * 1000.0,
        percentile(latencies, 50.0).as_secs_f64() * 1000.0,
        percentile(latencies, 95.0).as_secs_f64() * 1000.0,
        percentile(latencies, 99.0).as_secs_f64() * 1000.0,
        latencies.last().map_or(0.0, |d| d.as_secs_f64() * 1000.0),
    );
}

/// Deterministic spread of names, hobbies, ages and weekly hours.
fn providers(n: usize) -> Vec<Profile> {
    (0..n)
        .map(|i| {
            let mut p = Profile::new(Ulid::new(), Role::Provider, format!("provider-{i}"));
            p.interests = format!(
                "{}, {}",
                HOBBY_CATALOG[i % HOBBY_CATALOG.len()],
                HOBBY_CATALOG[(i * 7) % HOBBY_CATALOG.len()]
            );
            p.gender = Some(if i % 2 == 0 { "female" } else { "male" }.into());
            p.birth_date = NaiveDate::from_ymd_opt(1970 + (i % 35) as i32, 1 + (i % 12) as u32, 1);
            p.rating = (i % 50) as f32 / 10.0;
            let start = (6 * 60 + (i % 24) * 30) as u16;
            if let (Some(s), Some(e)) = (TimeOfDay::new(start), TimeOfDay::new(start + 180))
                && let Ok(interval) = Interval::new(s, e)
            {
                p.availability = WeeklyAvailability::default().with(Day::ALL[i % 7], interval);
            }
            p
        })
        .collect()
}

fn queries() -> Vec<(&'static str, FilterSpec)> {
    vec![
        ("identity", FilterSpec::default()),
        (
            "text",
            FilterSpec {
                text: Some("photo".into()),
                ..Default::default()
            },
        ),
        (
            "evening shift",
            FilterSpec {
                window: Some(SearchWindow::Shift(Shift::Evening)),
                ..Default::default()
            },
        ),
        (
            "combined",
            FilterSpec {
                gender: Some("female".into()),
                age: Some(AgeRange { min: 25, max: 40 }),
                hobbies: vec!["coffee".into(), "music".into()],
                window: SearchWindow::parse_custom("10:00 - 13:30").ok(),
                ..Default::default()
            },
        ),
    ]
}

fn bench_filter(candidates: &[Profile], today: NaiveDate) {
    for (label, query) in queries() {
        let mut latencies = Vec::with_capacity(ROUNDS);
        let mut kept = 0;
        for _ in 0..ROUNDS {
            let input = candidates.to_vec();
            let start = Instant::now();
            kept = filter(input, &query, today).len();
            latencies.push(start.elapsed());
        }
        print_latency(&format!("{label} ({kept}/{} kept)", candidates.len()), &mut latencies);
    }
}

async fn bench_service(candidates: Vec<Profile>, today: NaiveDate) {
    let store = Arc::new(Store::in_memory());
    for p in candidates {
        store.save_profile(p).await.unwrap();
    }
    let (tx, _rx) = mpsc::channel(1);
    let service = BookingService::new(store, tx);

    for (label, query) in queries() {
        let mut latencies = Vec::with_capacity(ROUNDS);
        for _ in 0..ROUNDS {
            let start = Instant::now();
            let _ = service.search(&query, today).await.unwrap();
            latencies.push(start.elapsed());
        }
        print_latency(label, &mut latencies);
    }
}

#[tokio::main]
async fn main() {
    let today = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
    let candidates = providers(PROVIDERS);

    println!("=== tandem search benchmark ===");
    println!("{PROVIDERS} providers, {ROUNDS} rounds per query\n");

    println!("[phase 1] filter over an in-memory list");
    bench_filter(&candidates, today);

    println!("\n[phase 2] service search (list + sort + filter)");
    bench_service(candidates, today).await;
}
