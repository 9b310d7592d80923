use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use std::{panic, thread};
use tabled::settings::Style;
use tabled::{Table, Tabled};

use ohlc_forecast::utils::format_duration;
use ohlc_forecast::{Cli, Forecast, JobEvent, ParsedSeries, Session};

#[derive(Tabled)]
struct PriceRow {
    #[tabled(rename = "")]
    label: String,
    #[tabled(rename = "Date")]
    date: String,
    #[tabled(rename = "Open")]
    open: String,
    #[tabled(rename = "High")]
    high: String,
    #[tabled(rename = "Low")]
    low: String,
    #[tabled(rename = "Close")]
    close: String,
}

fn print_dataset(parsed: &ParsedSeries) {
    let series = &parsed.series;
    if let (Some(first), Some(last)) = (series.first(), series.last()) {
        println!(
            "Loaded {} points from {} to {} (scale {})",
            series.len(),
            first.date,
            last.date,
            parsed.scale
        );
    }
    if !parsed.warnings.is_empty() {
        println!("Skipped {} lines:", parsed.warnings.len());
        for warning in &parsed.warnings {
            println!("  {}", warning);
        }
    }
}

fn print_forecast(forecast: &Forecast) {
    let last = forecast.last_point;
    let p = forecast.prediction;
    let rows = vec![
        PriceRow {
            label: "Last".to_string(),
            date: last.date.to_string(),
            open: format!("{:.2}", last.open),
            high: format!("{:.2}", last.high),
            low: format!("{:.2}", last.low),
            close: format!("{:.2}", last.close),
        },
        PriceRow {
            label: "Forecast".to_string(),
            date: forecast
                .target_date
                .map(|d| d.to_string())
                .unwrap_or_else(|| "-".to_string()),
            open: format!("{:.2}", p.open),
            high: format!("{:.2}", p.high),
            low: format!("{:.2}", p.low),
            close: format!("{:.2}", p.close),
        },
    ];

    println!("{}", Table::new(rows).with(Style::rounded()));
    println!(
        "Trend: {} ({:+.2}% on close)",
        forecast.trend,
        forecast.close_change_pct()
    );
}

#[tokio::main]
async fn main() -> Result<()> {
    panic::set_hook(Box::new(|info| {
        let backtrace = std::backtrace::Backtrace::force_capture();
        log::error!("CRITICAL PANIC:\n{}\nStack Trace:\n{}", info, backtrace);
    }));

    let (global_level, my_code_level) = if cfg!(debug_assertions) {
        (log::LevelFilter::Warn, log::LevelFilter::Info)
    } else {
        (log::LevelFilter::Error, log::LevelFilter::Error)
    };

    env_logger::Builder::new()
        .filter(None, global_level)
        .filter(Some("ohlc_forecast"), my_code_level)
        .parse_default_env()
        .init();

    let args = Cli::parse();
    let config = args.resolve_config()?;

    let (mut session, events) = Session::new(config, Arc::new(args.factory()))
        .context("Failed to set up the training session")?;

    let parsed = session.load_file(&args.file, args.format).await?;
    print_dataset(parsed);

    // Events arrive on a std channel; drain them off the runtime.
    let printer = thread::spawn(move || {
        for event in events {
            match event {
                JobEvent::Started { sequences } => {
                    println!("Training on {} sequences...", sequences)
                }
                JobEvent::Progress(p) => println!(
                    "  iteration {:>6}  error {:.6}  ({:.0}%)",
                    p.iteration,
                    p.error,
                    p.percent()
                ),
                JobEvent::Failed(msg) => eprintln!("Training failed: {}", msg),
                JobEvent::Succeeded(_) | JobEvent::Reset => {}
            }
        }
    });

    let started = std::time::Instant::now();
    let outcome = session.train().await;
    let elapsed = started.elapsed();

    // Closing the session closes the event channel and ends the printer.
    drop(session);
    let _ = printer.join();

    let forecast = outcome.context("Training job did not produce a forecast")?;
    print_forecast(&forecast);
    println!("Done in {}", format_duration(elapsed.as_millis() as i64));
    Ok(())
}
