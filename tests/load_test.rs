//! Load Test Suite (Stress Testing)
//!
//! Many vehicles, many kits, a slow backend.
//! Run with: cargo test --test load_test --release

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use kit_readiness::catalog::{HomologationLookup, InMemoryCatalog, InMemoryVehicles, ItemKind, Kit, VehicleRecord};
use kit_readiness::error::LookupError;
use kit_readiness::matching::NormalizedKey;
use kit_readiness::readiness::{AccessorySelection, ReadinessAggregator};
use kit_readiness::session::SchedulingSession;
use kit_readiness::score_kits;

/// Every lookup costs a fixed round trip; everything is homologated
struct LatencyLookup {
    latency: Duration,
    calls: AtomicUsize,
}

#[async_trait]
impl HomologationLookup for LatencyLookup {
    async fn lookup(&self, _key: &NormalizedKey, _kind: ItemKind) -> Result<Option<bool>, LookupError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.latency).await;
        Ok(Some(true))
    }
}

fn accessory_names(count: usize) -> Vec<String> {
    (0..count).map(|i| format!("Acessorio {:04}", i)).collect()
}

// 1. FAN-OUT: lookups for one vehicle run concurrently
#[tokio::test]
async fn test_lookup_fan_out() -> anyhow::Result<()> {
    let backend = Arc::new(LatencyLookup {
        latency: Duration::from_millis(50),
        calls: AtomicUsize::new(0),
    });
    let aggregator = ReadinessAggregator::new(backend.clone());

    let count = 200;
    println!("\n🔀 FAN-OUT: {} lookups at 50ms each...", count);

    let start = Instant::now();
    let verdict = aggregator
        .recompute("ABC1D23", &AccessorySelection::vehicle_only(accessory_names(count)))
        .await;
    let duration = start.elapsed();

    println!("   -> Time: {:.2?}", duration);
    assert!(verdict.ready);
    assert_eq!(verdict.tracked, count);
    assert_eq!(backend.calls.load(Ordering::SeqCst), count);
    // serial would take 10s
    assert!(duration < Duration::from_secs(5));

    Ok(())
}

// 2. CONTENTION: many tasks recomputing on one shared aggregator
#[tokio::test]
async fn test_concurrent_recomputes() -> anyhow::Result<()> {
    let backend = Arc::new(LatencyLookup {
        latency: Duration::from_millis(1),
        calls: AtomicUsize::new(0),
    });
    let aggregator = Arc::new(ReadinessAggregator::new(backend.clone()));
    let names = accessory_names(20);

    let count = 500;
    println!("\n🔥 CONTENTION: {} concurrent recomputes...", count);

    let start = Instant::now();
    let mut handles = Vec::new();
    for i in 0..count {
        let aggregator = aggregator.clone();
        let selection = AccessorySelection::vehicle_only(names[i % 10..i % 10 + 10].to_vec());
        handles.push(tokio::spawn(async move {
            aggregator.recompute(&format!("VEH{:04}", i), &selection).await
        }));
    }

    let mut ready = 0;
    for h in handles {
        if h.await?.ready {
            ready += 1;
        }
    }

    let duration = start.elapsed();
    println!("   -> Time: {:.2?}", duration);
    println!("   -> Rate: {:.0} recomputes/sec", count as f64 / duration.as_secs_f64());

    assert_eq!(ready, count);
    assert!(aggregator.is_ready("VEH0499").await);
    assert_eq!(aggregator.cache().len().await, 19);

    Ok(())
}

// 3. SESSION: full refresh over a large fleet
#[tokio::test]
async fn test_session_refresh_fleet() -> anyhow::Result<()> {
    let backend = Arc::new(LatencyLookup {
        latency: Duration::from_millis(5),
        calls: AtomicUsize::new(0),
    });
    let names = accessory_names(100);

    let kits: Vec<Kit> = (0..200)
        .map(|i| {
            Kit::new(format!("kit-{:03}", i), format!("Kit {}", i))
                .with_accessory(names[i % 100].clone())
                .with_accessory(names[(i * 7) % 100].clone())
        })
        .collect();
    let vehicles: Vec<VehicleRecord> = (0..1_000)
        .map(|i| VehicleRecord::new(format!("VEH{:04}", i)).with_accessories(names[i % 90..i % 90 + 5].to_vec()))
        .collect();

    let session = SchedulingSession::new(
        Arc::new(InMemoryCatalog::new(kits)),
        Arc::new(InMemoryVehicles::new(vehicles)),
        backend.clone(),
    );

    println!("\n🚚 FLEET: 1000 vehicles x 200 kits...");
    let start = Instant::now();
    let report = session.refresh().await?;
    let duration = start.elapsed();
    println!("   -> Time: {:.2?}", duration);

    assert_eq!(report.vehicles.len(), 1_000);
    assert!(report.vehicles.iter().all(|v| v.verdict.ready));
    assert!(report.vehicles.iter().all(|v| !v.suggestions.is_empty()));
    // one lookup per distinct accessory, not per vehicle
    assert_eq!(backend.calls.load(Ordering::SeqCst), 94);

    Ok(())
}

// 4. SCORING: ranking throughput without any I/O
#[test]
fn test_scoring_throughput() {
    let names = accessory_names(50);
    let catalog: Vec<Kit> = (0..500)
        .map(|i| {
            let mut kit = Kit::new(format!("kit-{:03}", i), "Kit");
            for j in 0..8 {
                kit = kit.with_accessory(names[(i + j * 3) % 50].clone());
            }
            kit
        })
        .collect();

    let count = 200;
    let start = std::time::Instant::now();
    for i in 0..count {
        let vehicle = &names[i % 40..i % 40 + 10];
        let scored = score_kits(vehicle, &catalog, None);
        assert!(scored.windows(2).all(|w| w[0].match_count >= w[1].match_count));
    }
    let duration = start.elapsed();
    println!("\n📊 SCORING: {} rankings over {} kits", count, catalog.len());
    println!("   -> Rate: {:.0} rankings/sec", count as f64 / duration.as_secs_f64());
}
