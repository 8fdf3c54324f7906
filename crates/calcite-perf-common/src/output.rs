//! Console output shared by the binaries.
//!
//! Status lines go to stdout except errors, which go to stderr so a failing
//! tool still leaves a clean table on stdout.

use std::fmt::Display;

use colored::Colorize;
use tabled::{Table, Tabled};

const RULE_WIDTH: usize = 60;

pub fn print_success(message: impl Display) {
    println!("{} {message}", "✓".green().bold());
}

pub fn print_error(message: impl Display) {
    eprintln!("{} {message}", "✗".red().bold());
}

pub fn print_warning(message: impl Display) {
    println!("{} {message}", "⚠".yellow().bold());
}

pub fn print_info(message: impl Display) {
    println!("{} {message}", "ℹ".blue().bold());
}

/// Rows as a table, or a note when there are none.
pub fn print_table<T: Tabled>(rows: Vec<T>) {
    if rows.is_empty() {
        print_info("No rows");
        return;
    }
    println!("{}", Table::new(rows));
}

/// Section title between two rules.
pub fn print_header(title: &str) {
    let rule = "=".repeat(RULE_WIDTH);
    println!("\n{rule}\n{}\n{rule}", title.bold());
}
