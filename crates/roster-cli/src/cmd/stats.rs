//! `roster stats`: category headcounts and weekly deactivation series.

use std::io::Write;
use std::path::Path;

use anyhow::Result;
use clap::{Args, ValueEnum};
use roster_core::aggregate::{Aggregator, CategoryCount, CategoryWeek, WeeklyCount};
use roster_core::config::RosterConfig;
use serde::Serialize;

use crate::output::{OutputMode, pretty_section, render_mode};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum StatsView {
    /// Active and deactivated members per category.
    #[default]
    Categories,
    /// Deactivations per week.
    Weekly,
    /// Weekly deactivations per category, plus the ALL series.
    Series,
}

/// Arguments for `roster stats`.
#[derive(Args, Debug, Default)]
pub struct StatsArgs {
    /// Which table to print.
    #[arg(long, value_enum, default_value_t = StatsView::Categories)]
    pub view: StatsView,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum StatsPayload {
    Categories { categories: Vec<CategoryCount> },
    Weekly { weekly: Vec<WeeklyCount> },
    Series { series: Vec<CategoryWeek> },
}

/// Execute `roster stats`.
///
/// # Errors
///
/// Returns an error if the store cannot be opened or holds no snapshot yet.
pub fn run_stats(
    args: &StatsArgs,
    config: &RosterConfig,
    output: OutputMode,
    project_root: &Path,
) -> Result<()> {
    let store = super::open_store(project_root, config)?;
    let aggregator = Aggregator::load(&store, config.aggregate.options())
        .map_err(|err| super::fail(output, err))?;

    let payload = match args.view {
        StatsView::Categories => StatsPayload::Categories {
            categories: aggregator.category_counts(),
        },
        StatsView::Weekly => StatsPayload::Weekly {
            weekly: aggregator.weekly_deactivations(),
        },
        StatsView::Series => StatsPayload::Series {
            series: aggregator.weekly_by_category(),
        },
    };

    render_mode(output, &payload, render_stats_text, render_stats_pretty)
}

fn render_stats_text(payload: &StatsPayload, w: &mut dyn Write) -> std::io::Result<()> {
    match payload {
        StatsPayload::Categories { categories } => {
            writeln!(w, "category\tactive\tdeactivated")?;
            for row in categories {
                writeln!(w, "{}\t{}\t{}", row.category, row.active, row.deactivated)?;
            }
        }
        StatsPayload::Weekly { weekly } => {
            writeln!(w, "week\tcount")?;
            for row in weekly {
                writeln!(w, "{}\t{}", row.week, row.count)?;
            }
        }
        StatsPayload::Series { series } => {
            writeln!(w, "week\tcategory\tcount")?;
            for row in series {
                writeln!(w, "{}\t{}\t{}", row.week, row.category, row.count)?;
            }
        }
    }
    Ok(())
}

fn render_stats_pretty(payload: &StatsPayload, w: &mut dyn Write) -> std::io::Result<()> {
    match payload {
        StatsPayload::Categories { categories } => {
            pretty_section(w, "Members by category")?;
            writeln!(w, "{:<24} {:>8} {:>12}", "category", "active", "deactivated")?;
            for row in categories {
                writeln!(
                    w,
                    "{:<24} {:>8} {:>12}",
                    row.category, row.active, row.deactivated
                )?;
            }
        }
        StatsPayload::Weekly { weekly } => {
            pretty_section(w, "Deactivations by week")?;
            for row in weekly {
                writeln!(w, "{}  {:>6}", row.week, row.count)?;
            }
        }
        StatsPayload::Series { series } => {
            pretty_section(w, "Deactivations by week and category")?;
            for row in series {
                writeln!(w, "{}  {:<24} {:>6}", row.week, row.category, row.count)?;
            }
        }
    }
    Ok(())
}
