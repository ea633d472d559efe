//! Plain-text output.

use std::fmt::{self, Write};

use chess_analysis::{AggregateStats, BatchReport};

/// One line per outcome class, then one line per failed game.
pub fn batch_summary(report: &BatchReport) -> String {
    render(|f| write_batch(f, report))
}

/// Renders `stats` as a table, most played openings first.
pub fn stats_table(username: &str, stats: &AggregateStats) -> String {
    render(|f| write_stats(f, username, stats))
}

fn render<F>(write: F) -> String
where
    F: Fn(&mut fmt::Formatter<'_>) -> fmt::Result,
{
    Rendered(write).to_string()
}

struct Rendered<F>(F);

impl<F> fmt::Display for Rendered<F>
where
    F: Fn(&mut fmt::Formatter<'_>) -> fmt::Result,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        (self.0)(f)
    }
}

fn write_batch(out: &mut impl Write, report: &BatchReport) -> fmt::Result {
    writeln!(out, "Analysed: {}", report.analyzed)?;
    writeln!(out, "Skipped (already stored): {}", report.skipped)?;
    writeln!(out, "Failed: {}", report.failed.len())?;
    for (id, reason) in &report.failed {
        writeln!(out, "  {id}: {reason}")?;
    }
    Ok(())
}

fn percent(part: u32, whole: u32) -> f64 {
    if whole == 0 {
        0.0
    } else {
        f64::from(part) * 100.0 / f64::from(whole)
    }
}

fn write_stats(out: &mut impl Write, username: &str, stats: &AggregateStats) -> fmt::Result {
    writeln!(out, "Games stored: {}", stats.total_games)?;
    writeln!(
        out,
        "Wins as white: {}  Wins as black: {}",
        stats.win_by_color.white, stats.win_by_color.black
    )?;
    writeln!(
        out,
        "Endgames reached by {username}: {} (won {})",
        stats.endgames_reached, stats.endgames_won
    )?;

    let openings = stats.openings_by_games();
    if openings.is_empty() {
        return writeln!(out, "No classified openings.");
    }

    let width = openings
        .iter()
        .map(|(label, _)| label.chars().count())
        .max()
        .unwrap_or(0)
        .max("Opening".len());
    writeln!(out)?;
    writeln!(
        out,
        "{:<width$}  {:>5}  {:>4}  {:>4}  {:>6}",
        "Opening", "Games", "Won", "Lost", "Win %"
    )?;
    for (label, outcome) in openings {
        writeln!(
            out,
            "{:<width$}  {:>5}  {:>4}  {:>4}  {:>5.1}%",
            label,
            outcome.games(),
            outcome.won,
            outcome.lost,
            percent(outcome.won, outcome.games())
        )?;
    }
    Ok(())
}
