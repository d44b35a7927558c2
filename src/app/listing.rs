//! `--list-plugins` output

use crate::core::styles::StyleRole;
use crate::plugin::api::{Discovery, PluginInfo};
use prettytable::{format, Cell, Row, Table};

const HEADERS: [&str; 6] = ["Plugin", "Name", "Version", "Commands", "Database", "Description"];

fn styled(text: &str, role: StyleRole, use_color: bool) -> Cell {
    let cell = Cell::new(text);
    match role.table_spec().filter(|_| use_color) {
        Some(spec) => cell.style_spec(spec),
        None => cell,
    }
}

fn flag(set: bool) -> &'static str {
    if set {
        "yes"
    } else {
        "-"
    }
}

fn plugin_row(info: &PluginInfo, use_color: bool) -> Row {
    Row::new(vec![
        styled(&info.name, StyleRole::Name, use_color),
        Cell::new(&info.friendly_name),
        Cell::new(&info.version.to_string()),
        styled(flag(info.provides_commands), StyleRole::Flag, use_color),
        styled(flag(info.needs_database), StyleRole::Flag, use_color),
        Cell::new(&info.description),
    ])
}

/// One row per discovered plugin, in discovery order
pub fn plugin_table(discovery: &Discovery, use_color: bool) -> Table {
    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_CLEAN);
    table.set_titles(Row::new(
        HEADERS
            .iter()
            .map(|h| styled(h, StyleRole::Header, use_color))
            .collect(),
    ));
    for plugin in &discovery.plugins {
        table.add_row(plugin_row(&plugin.info, use_color));
    }
    table
}

/// Print the table, then skipped and failed providers
pub fn print_plugins(discovery: &Discovery, use_color: bool) {
    if discovery.plugins.is_empty() {
        eprintln!("No plugins discovered.");
    } else {
        plugin_table(discovery, use_color).printstd();
    }

    if !discovery.skipped.is_empty() {
        println!();
        println!(
            "{} {}",
            StyleRole::Header.paint("Disabled:", use_color),
            discovery.skipped.join(", ")
        );
    }
    for failure in &discovery.failures {
        eprintln!("{} {}", StyleRole::Error.paint("error:", use_color), failure);
    }
}
