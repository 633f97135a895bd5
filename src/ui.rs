use std::error::Error;
use std::io;

use chrono::NaiveDate;
use crossterm::style::Stylize;
use ratatui::backend::CrosstermBackend;
use ratatui::style::{Color, Style};
use ratatui::symbols;
use ratatui::text::Line;
use ratatui::widgets::{Axis, Block, Chart, Dataset, GraphType};
use ratatui::{Terminal, TerminalOptions, Viewport};

use crate::dates::format_date;
use crate::domain::{DueReport, StatsReport};

const CHART_HEIGHT: u16 = 18;
const SUMMARY_RULE_WIDTH: usize = 50;

pub fn print_error(message: &str) {
	println!("{}", message.red());
}

pub fn print_due_report(today: NaiveDate, report: &DueReport) {
	println!("{}", format!("Today: {}", format_date(today)).cyan().bold());
	println!();

	if !report.due.is_empty() {
		println!("{}", "Problems to revisit today:".green().bold());
		for item in &report.due {
			println!(
				"{}",
				format!("  - Problem {} (Revisit #{})", item.number, item.revisit).green()
			);
		}
	}

	if !report.overdue.is_empty() {
		if !report.due.is_empty() {
			println!();
		}
		println!("{}", "Past pending problems:".red().bold());
		for item in &report.overdue {
			println!(
				"{}",
				format!(
					"  - Problem {} (Revisit #{}) - Due: {}",
					item.number,
					item.revisit,
					format_date(item.date)
				)
				.yellow()
			);
		}
	}

	if report.due.is_empty() && report.overdue.is_empty() {
		println!("{}", "No problems to revisit today.".blue());
	}
}

pub fn print_schedule(number: u32, initial: NaiveDate, schedule: &[NaiveDate]) {
	println!(
		"{}",
		format!("Problem {} recorded for {}", number, format_date(initial)).green()
	);
	println!("{}", "Revisit dates:".cyan());
	for (index, date) in schedule.iter().enumerate() {
		println!(
			"{}",
			format!("  - Revisit #{}: {}", index + 1, format_date(*date)).blue()
		);
	}
}

pub fn print_deleted(number: u32, removed: usize) {
	println!(
		"{}",
		format!("Problem {number} removed ({removed} revisit(s) deleted)").green()
	);
}

pub fn print_completed(number: u32, date: NaiveDate, revisit: u8) {
	println!(
		"{}",
		format!(
			"Problem {} marked as done for {} (Revisit #{})",
			number,
			format_date(date),
			revisit
		)
		.green()
	);
}

pub fn print_already_done(number: u32, date: NaiveDate) {
	println!(
		"{}",
		format!(
			"Problem {} is already marked as done for {}",
			number,
			format_date(date)
		)
		.yellow()
	);
}

pub fn print_stats_summary(report: &StatsReport) {
	let rule = "=".repeat(SUMMARY_RULE_WIDTH);
	println!();
	println!("{}", rule.as_str().cyan());
	println!("{}", "Problem Statistics".cyan().bold());
	println!("{}", rule.as_str().cyan());
	println!();
	println!(
		"{}",
		format!("Total problems attempted: {}", report.total_problems).green()
	);
	println!();
	println!("{}", "Problems per day statistics:".cyan());
	println!("{}", format!("  Mean:       {:.2}", report.mean).blue());
	println!("{}", format!("  Median:     {:.2}", report.median).blue());
	println!("{}", format!("  Std Dev:    {:.2}", report.std_dev).blue());
	println!("{}", format!("  Range:      {}", report.range).blue());
	match report.mode {
		Some(mode) => println!("{}", format!("  Mode:       {mode}").blue()),
		None => println!("{}", "  Mode:       N/A (no unique mode)".yellow()),
	}
	println!();
	println!("{}", rule.as_str().cyan());
}

/// Draws the per-day attempt counts as a line chart in an inline viewport,
/// with horizontal mean and median reference lines.
pub fn render_stats_chart(report: &StatsReport) -> Result<(), Box<dyn Error>> {
	let points: Vec<(f64, f64)> = report
		.series
		.iter()
		.enumerate()
		.map(|(index, (_, count))| (index as f64, *count as f64))
		.collect();

	let max_x = report.series.len().saturating_sub(1).max(1) as f64;
	let mean_line = [(0.0, report.mean), (max_x, report.mean)];
	let median_line = [(0.0, report.median), (max_x, report.median)];

	let x_labels = axis_dates(&report.series);
	let y_upper = report.y_upper;
	let y_labels = vec![
		"0".to_string(),
		format!("{}", y_upper / 2),
		format!("{y_upper}"),
	];

	let backend = CrosstermBackend::new(io::stdout());
	let mut terminal = Terminal::with_options(
		backend,
		TerminalOptions {
			viewport: Viewport::Inline(CHART_HEIGHT),
		},
	)?;

	terminal.draw(|frame| {
		let datasets = vec![
			Dataset::default()
				.name("problems per day")
				.marker(symbols::Marker::Braille)
				.graph_type(GraphType::Line)
				.style(Style::default().fg(Color::Blue))
				.data(&points),
			Dataset::default()
				.name(format!("mean {:.2}", report.mean))
				.marker(symbols::Marker::Dot)
				.graph_type(GraphType::Line)
				.style(Style::default().fg(Color::Red))
				.data(&mean_line),
			Dataset::default()
				.name(format!("median {:.2}", report.median))
				.marker(symbols::Marker::Dot)
				.graph_type(GraphType::Line)
				.style(Style::default().fg(Color::Green))
				.data(&median_line),
		];

		let chart = Chart::new(datasets)
			.block(Block::bordered().title("New problems attempted per day"))
			.x_axis(
				Axis::default()
					.style(Style::default().fg(Color::Gray))
					.bounds([0.0, max_x])
					.labels(x_labels.clone()),
			)
			.y_axis(
				Axis::default()
					.style(Style::default().fg(Color::Gray))
					.bounds([0.0, y_upper as f64])
					.labels(y_labels.clone()),
			);

		frame.render_widget(chart, frame.area());
	})?;

	println!();
	Ok(())
}

fn axis_dates(series: &[(NaiveDate, u64)]) -> Vec<Line<'static>> {
	let mut labels = Vec::new();
	if let Some((first, _)) = series.first() {
		labels.push(Line::from(format_date(*first)));
	}
	if series.len() > 2 {
		let (middle, _) = series[series.len() / 2];
		labels.push(Line::from(format_date(middle)));
	}
	if series.len() > 1 {
		if let Some((last, _)) = series.last() {
			labels.push(Line::from(format_date(*last)));
		}
	}
	labels
}
