//! Simple market run with the default roster and the two preset consortiums
//!
//! `RUST_LOG=debug cargo run --example simple_sim` prints every tick.

use emotion_market::{AgentKind, EngineConfig, MarketEngine};

fn main() -> emotion_market::Result<()> {
    env_logger::init();

    println!("=== Emotion Market Simulation ===\n");

    let config = EngineConfig::default().with_seed(42);
    let mut engine = MarketEngine::new(config)?;

    println!("Adding agents:");
    engine.init_default_agents()?;
    println!("  - 9 value, 9 trend, 9 noise, 4 risk");
    engine.init_preset_consortiums()?;
    println!("  - ValueAboveAll (9/4/4/1) and RiskAboveAll (4/4/9/1) consortiums");

    println!("\nRunning simulation for 250 ticks...\n");
    for _ in 0..5 {
        let report = engine.step()?;
        println!(
            "Day {:>3}: price={:>4} demand={:>5} supply={:>5} buys={:>2} sells={:>2}",
            report.day, report.price, report.demand, report.supply, report.buys, report.sells
        );
    }
    let metrics = engine.run(245)?;

    println!("\n=== Results ===\n");
    println!("Total ticks:       {}", metrics.total_ticks);
    println!("Final price:       {}", metrics.final_price);
    println!("Average price:     {:.2}", metrics.avg_price);
    println!("Price volatility:  {:.4}", metrics.price_volatility);
    println!("Buys / sells:      {} / {}", metrics.total_buys, metrics.total_sells);
    println!("Shares traded:     {}", metrics.total_volume);
    println!("Black swans:       {}", metrics.black_swans);
    println!("Bull runs:         {}", metrics.bull_runs);

    println!("\nWealth by agent type:");
    for (kind, wealth) in &metrics.wealth_by_type {
        println!("  {:<12} {:>14.2}", kind.to_string(), wealth);
    }

    let mean_emotion = |kind: AgentKind| {
        let emotions: Vec<f64> = engine
            .agents()
            .iter()
            .filter(|a| a.kind() == kind)
            .map(|a| a.state.emotion)
            .collect();
        emotions.iter().sum::<f64>() / emotions.len().max(1) as f64
    };
    println!("\nMean emotion by agent type:");
    for kind in [
        AgentKind::Value,
        AgentKind::Trend,
        AgentKind::Noise,
        AgentKind::Risk,
        AgentKind::Consortium,
    ] {
        println!("  {:<12} {:>+.3}", kind.to_string(), mean_emotion(kind));
    }

    if !engine.events().is_empty() {
        println!("\nTail events:");
        for event in engine.events() {
            println!(
                "  day {:>3}: {:?} x{:.2} ({} -> {})",
                event.tick, event.kind, event.multiplier, event.price_before, event.price_after
            );
        }
    }

    Ok(())
}
