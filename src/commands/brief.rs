// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Operations brief - Go/No-Go, weather and tide windows

use super::Output;
use crate::config::AppConfig;
use crate::ssot::{load_brief, Decision};
use anyhow::{Context, Result};

/// Run the brief command
pub fn run(config: &AppConfig, out: Output, voyage: Option<String>) -> Result<()> {
    let brief = load_brief(&config.go_no_go_path, &config.weather_path, &config.tide_path)
        .context("Failed to load operations documents")?;

    if out.json {
        return out.print_json(&brief);
    }

    match &brief.go_no_go {
        Some(call) => {
            let label = call.decision.to_string();
            println!("Go/No-Go: {}", out.verdict(call.decision == Decision::Go, &label));
            if !call.reason_codes.is_empty() {
                println!("  reasons: {}", call.reason_codes.join(", "));
            }
            if let Some(at) = &call.updated_at {
                println!("  updated: {at}");
            }
        }
        None => println!("Go/No-Go: no decision published"),
    }

    match &brief.weather {
        Some(weather) => {
            println!("Weather{}:", weather.last_updated.as_deref().map(|u| format!(" (as of {u})")).unwrap_or_default());
            for day in &weather.forecast {
                let visibility = day.visibility_km.map(|v| format!(", vis {v} km")).unwrap_or_default();
                println!(
                    "  {}  wind {} kt, wave {} m{}  {}",
                    day.date,
                    day.wind_kt,
                    day.wave_m,
                    visibility,
                    day.summary.as_deref().unwrap_or("")
                );
            }
            if let Some(worst) = weather.windiest() {
                println!("  windiest: {} ({} kt)", worst.date, worst.wind_kt);
            }
        }
        None => println!("Weather: no forecast available"),
    }

    match &brief.tides {
        Some(tides) => {
            println!("Tide windows:");
            let voyages: Vec<_> = match voyage.as_deref() {
                Some(id) => tides.for_voyage(id).into_iter().collect(),
                None => tides.voyages.iter().collect(),
            };
            if voyages.is_empty() {
                println!("  (none)");
            }
            for v in voyages {
                println!("  {}:", v.voyage_id);
                for window in &v.top3 {
                    println!("    {} .. {}  {} m", window.start, window.end, window.height_m);
                }
            }
        }
        None => println!("Tide windows: none published"),
    }
    Ok(())
}
