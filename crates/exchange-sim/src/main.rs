use exchange_clock::SystemClock;
use exchange_core::{Order, OrderType, Price, Quantity, Side};
use exchange_ports::{Clock, MetricsCalculator};
use exchange_sim::{
    EngineMetricsCalculator, ExchangeConfig, InMemoryOrderRepository, InMemoryTradeRepository,
    MatchingEngine, MetricsMatcher, MetricsMonitor, RealTimeMetrics, TradingService,
};
use log::{error, info, warn};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

fn print_help() {
    eprintln!(
        r#"Exchange Simulator - price-time matching engine

USAGE:
    exchange-sim [OPTIONS]

OPTIONS:
    --config <PATH>     Load configuration from JSON file
    --orders <PATH>     Replay a JSON array of orders
    --help              Print this help message

ENVIRONMENT VARIABLES:
    EXCHANGE_NAME                 Exchange name
    EXCHANGE_SYMBOLS              Comma separated symbols (default: BTCUSD,ETHUSD)
    EXCHANGE_AUTO_CREATE_BOOKS    Open books for unknown symbols (default: false)
    METRICS_WINDOW_SECS           Metrics window (default: 60)
    METRICS_MAX_ACTIVE_ORDERS     Orders counted as full load (default: 10000)
    METRICS_TARGET_LATENCY_MS     Latency target (default: 10)
    ANALYSIS_LATENCY_THRESHOLD_MS Latency bottleneck threshold (default: 100)
    ANALYSIS_THROUGHPUT_THRESHOLD Expected orders+trades/s (default: 1000)
    ANALYSIS_HISTORY_SIZE         Snapshots kept for analysis (default: 100)
    ANALYSIS_SAMPLE_INTERVAL_MS   Snapshot interval (default: 10000)
    REQUEST_TIMEOUT_MS            Store call timeout (default: 5000)
    RUST_LOG                      Log level filter (default: info)

EXAMPLES:
    # Replay orders against the default books
    exchange-sim --orders orders.json

    # Run with config file
    exchange-sim --config config.json --orders orders.json
"#
    );
}

/// One line of an order replay file
#[derive(Debug, Deserialize)]
struct OrderRequest {
    #[serde(default)]
    id: Option<String>,
    user_id: String,
    symbol: String,
    side: Side,
    order_type: OrderType,
    #[serde(default)]
    price: Price,
    quantity: Quantity,
}

impl OrderRequest {
    fn into_order(self, clock: &dyn Clock) -> exchange_core::ValidationResult<Order> {
        let id = self.id.unwrap_or_else(|| Uuid::new_v4().to_string());
        let price = match self.order_type {
            OrderType::Market => Decimal::ZERO,
            OrderType::Limit => self.price,
        };
        Order::new_with_time(
            id,
            self.user_id,
            self.symbol,
            self.side,
            self.order_type,
            price,
            self.quantity,
            clock.now(),
        )
    }
}

#[tokio::main]
async fn main() -> exchange_sim::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // Parse command line arguments
    let args: Vec<String> = std::env::args().collect();
    let mut config_path: Option<String> = None;
    let mut orders_path: Option<String> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                print_help();
                return Ok(());
            }
            "--config" | "-c" => {
                i += 1;
                if i >= args.len() {
                    eprintln!("Error: --config requires a path argument");
                    std::process::exit(1);
                }
                config_path = Some(args[i].clone());
            }
            "--orders" | "-o" => {
                i += 1;
                if i >= args.len() {
                    eprintln!("Error: --orders requires a path argument");
                    std::process::exit(1);
                }
                orders_path = Some(args[i].clone());
            }
            arg => {
                eprintln!("Unknown argument: {}", arg);
                print_help();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    let config = match config_path {
        Some(path) => {
            info!("Loading configuration from: {}", path);
            ExchangeConfig::from_file(&path)?
        }
        None => {
            info!("Using default configuration with environment overrides");
            ExchangeConfig::from_env()?
        }
    };
    info!("Exchange: {}", config.name);
    info!("Symbols: {}", config.engine.symbols.join(", "));

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let engine = Arc::new(MatchingEngine::from_config(&config.engine, clock.clone()));
    let collector = Arc::new(RealTimeMetrics::new(config.metrics.window(), clock.clone()));
    let matcher = Arc::new(MetricsMatcher::new(
        engine.clone(),
        collector.clone(),
        clock.clone(),
    ));
    let orders = Arc::new(InMemoryOrderRepository::new());
    let trades = Arc::new(InMemoryTradeRepository::new());
    let service = TradingService::new(matcher, orders.clone(), trades, &config.service);
    let calculator =
        EngineMetricsCalculator::new(orders, collector.clone(), clock.clone(), &config.metrics);
    let monitor = Arc::new(MetricsMonitor::new(collector, clock.clone(), &config.analysis));
    let sampler = monitor.start().await;
    monitor.sample().await?;

    if let Some(path) = orders_path {
        let content = std::fs::read_to_string(&path)?;
        let requests: Vec<OrderRequest> = serde_json::from_str(&content)?;
        info!("Replaying {} order(s) from {}", requests.len(), path);

        for request in requests {
            let order = match request.into_order(clock.as_ref()) {
                Ok(order) => order,
                Err(e) => {
                    warn!("Skipping invalid order: {}", e);
                    continue;
                }
            };

            match service.place_order(order).await {
                Ok(placed) => println!("{}", serde_json::to_string(&placed)?),
                Err(e) if e.is_post_match() => error!("{}", e),
                Err(e) => warn!("{}", e),
            }
        }
    }

    for symbol in engine.symbols() {
        let book = service.order_book(&symbol).await?;
        println!("{}", serde_json::to_string_pretty(&book)?);
    }

    let performance = calculator
        .get_performance_metrics(config.metrics.window())
        .await?;
    info!(
        "Performance: {:.2} orders/s, {:.3}ms avg latency, {:.1}% load, score {:.1}",
        performance.orders_per_second,
        performance.average_latency_ms,
        performance.system_load_percent,
        performance.optimization_score
    );
    info!(
        "Healthy: {}, efficiency: {:.2}",
        performance.is_healthy(),
        performance.calculate_efficiency()
    );
    info!(
        "Engine stats: {}",
        serde_json::to_string(&engine.stats().await)?
    );

    monitor.sample().await?;
    let summary = monitor.summary().await?;
    if let Some(analysis) = &summary.analysis {
        info!(
            "Latency trend {}, throughput trend {}, predicted {:.2}/s",
            analysis.latency.trend, analysis.throughput.trend, analysis.throughput.predicted
        );
        for bottleneck in &analysis.bottlenecks {
            warn!(
                "Bottleneck {:?} in {} (severity {:.2}): {}",
                bottleneck.kind, bottleneck.component, bottleneck.severity, bottleneck.description
            );
        }
        for recommendation in &analysis.recommendations {
            info!("Recommendation: {}", recommendation);
        }
    }
    info!(
        "Monitor health: {}",
        serde_json::to_string(&summary.health)?
    );

    monitor.stop();
    if let Some(sampler) = sampler {
        sampler.abort();
    }

    Ok(())
}
