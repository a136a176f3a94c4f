use btc_eur_price_sdk::{BitcoinPriceTracker, Timeframe};
use std::time::{Duration, Instant};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let tracker = BitcoinPriceTracker::global().await?;

    println!("Bitcoin/EUR price watch");
    println!("-------------------------------------------");

    // 1. One-shot resolution through the provider chain
    println!("1. Resolving current price...");
    let start = Instant::now();
    let current = match tracker.get_current_price().await {
        Ok(price) => {
            println!("   Price:  €{:.2}", price.price);
            if let Some(change) = price.change_24h {
                println!("   24h:    {:+.2}%", change);
            }
            println!("   Source: {}", price.source);
            println!("   Latency: {:?}", start.elapsed());
            Some(price)
        }
        Err(e) => {
            eprintln!("   Price unavailable: {}", e);
            None
        }
    };
    println!();

    // 2. Historical series for every timeframe
    println!("2. Historical series...");
    for timeframe in Timeframe::all() {
        let series = tracker
            .get_historical_price_data(*timeframe, current.as_ref())
            .await;
        if series.is_empty() {
            println!("   {:>3}: no data", timeframe);
        } else {
            println!(
                "   {:>3}: {:>4} points, {:+.2}%",
                timeframe,
                series.points.len(),
                series.change_percentage
            );
        }
    }
    println!();

    // 3. Cached quote, polled while subscribed
    println!("3. Watching cached price for 3 updates...");
    let mut events = tracker.cache().events();
    let subscription = tracker.subscribe();
    let mut updates = 0;
    while updates < 3 {
        match tokio::time::timeout(Duration::from_secs(120), events.recv()).await {
            Ok(Ok(event)) => {
                println!("   {}", event);
                updates += 1;
            }
            Ok(Err(e)) => {
                eprintln!("   Event stream error: {}", e);
                break;
            }
            Err(_) => {
                eprintln!("   No update within 120s");
                break;
            }
        }
    }

    let snapshot = subscription.snapshot();
    println!(
        "   loading={} validating={} error={}",
        snapshot.is_loading, snapshot.is_validating, snapshot.is_error
    );

    let health = tracker.health_check().await;
    println!("   Health: {:?} - {}", health.status, health.message.unwrap_or_default());

    Ok(())
}
