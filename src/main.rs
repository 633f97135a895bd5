mod dates;
mod domain;
mod storage;
mod ui;

use std::error::Error;
use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};

use crate::dates::{parse_date, today};
use crate::domain::{MarkOutcome, TrackerError};
use crate::storage::{data_file_path, load_store, save_store};

#[derive(Debug, Parser)]
#[command(
	name = "revisit-calendar",
	about = "Spaced-repetition tracker for practice problems"
)]
struct Cli {
	#[arg(long)]
	file: Option<PathBuf>,
	#[command(subcommand)]
	command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
	/// Show problems to revisit today
	Today,
	/// Record a problem attempt, today or backfilled to a date
	Add {
		number: u32,
		/// MM/DD/YYYY or MM/DD/YY, defaults to today
		date: Option<String>,
		/// Extend the schedule with +3mo, +6mo and +1yr revisits
		#[arg(short, long)]
		extended: bool,
	},
	/// Delete a problem and all of its revisits
	Del { number: u32 },
	/// Mark the oldest outstanding revisit of a problem as done
	Done { number: u32 },
	/// Show attempt statistics and a per-day chart
	Stats {
		/// MM/DD/YYYY or MM/DD/YY, defaults to the first recorded day
		start_date: Option<String>,
	},
}

fn main() {
	if let Err(err) = run() {
		eprintln!("error: {err}");
		std::process::exit(1);
	}
}

fn run() -> Result<(), Box<dyn Error>> {
	let cli = Cli::parse();
	let store_path = data_file_path(cli.file);
	let mut store = load_store(&store_path)?;
	let today = today();

	match cli.command {
		Command::Today => {
			let report = store.due_today(today);
			ui::print_due_report(today, &report);
		}
		Command::Add {
			number,
			date,
			extended,
		} => {
			let Some(initial) = parse_optional_date(date, today) else {
				return Ok(());
			};
			let schedule = store.add_problem(number, initial, extended);
			save_store(&store_path, &store)?;
			ui::print_schedule(number, initial, &schedule);
		}
		Command::Del { number } => {
			let removed = store.delete_problem(number);
			if removed > 0 {
				save_store(&store_path, &store)?;
				ui::print_deleted(number, removed);
			} else {
				ui::print_error(&TrackerError::NotFound(number).to_string());
			}
		}
		Command::Done { number } => match store.mark_done(today, number) {
			Ok(MarkOutcome::Completed { date, revisit }) => {
				save_store(&store_path, &store)?;
				ui::print_completed(number, date, revisit);
			}
			Ok(MarkOutcome::AlreadyDone { date }) => {
				ui::print_already_done(number, date);
			}
			Err(err) => ui::print_error(&err.to_string()),
		},
		Command::Stats { start_date } => {
			let start = match start_date {
				Some(raw) => match parse_date(&raw) {
					Ok(date) => Some(date),
					Err(err) => {
						ui::print_error(&err.to_string());
						return Ok(());
					}
				},
				None => None,
			};
			match store.compute_stats(start, today) {
				Ok(report) => {
					ui::render_stats_chart(&report)?;
					ui::print_stats_summary(&report);
				}
				Err(err) => ui::print_error(&err.to_string()),
			}
		}
	}

	Ok(())
}

fn parse_optional_date(raw: Option<String>, today: NaiveDate) -> Option<NaiveDate> {
	match raw {
		Some(raw) => match parse_date(&raw) {
			Ok(date) => Some(date),
			Err(err) => {
				ui::print_error(&err.to_string());
				None
			}
		},
		None => Some(today),
	}
}
