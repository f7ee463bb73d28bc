use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use calib_cli::types::{ExportReport, GroupsReport, IndexReport, ResolveReport, StateIdReport};
use calib_model::{ContentDigest, IndexEntry, mode_name, timestamp};

pub fn print_state_id(report: &StateIdReport) {
    println!("{}", report.state_id);
    let mut table = Table::new();
    table.set_header(vec![header_cell("Field"), header_cell("Value")]);
    apply_table_style(&mut table);
    let fp = &report.fingerprint;
    table.add_row(vec![Cell::new("vdet_arc1"), Cell::new(fp.arc_angle1)]);
    table.add_row(vec![Cell::new("vdet_arc2"), Cell::new(fp.arc_angle2)]);
    table.add_row(vec![Cell::new("WavelengthUserReq"), Cell::new(fp.wavelength_request)]);
    table.add_row(vec![Cell::new("Frequency"), Cell::new(fp.frequency)]);
    table.add_row(vec![Cell::new("Pos"), Cell::new(fp.position)]);
    align_column(&mut table, 1, CellAlignment::Right);
    println!("{table}");
    println!("State directory: {}", report.state_dir.display());
    if !report.initialized {
        println!("State not initialized (use --init to create it).");
    }
}

pub fn print_states(states: &[ContentDigest]) {
    if states.is_empty() {
        println!("No states found.");
        return;
    }
    for state in states {
        println!("{state}");
    }
}

pub fn print_index(report: &IndexReport) {
    println!(
        "State: {}  Kind: {}  Mode: {}",
        report.state_id,
        report.kind,
        mode_name(report.use_lite_mode)
    );
    if report.entries.is_empty() {
        println!("No versions recorded.");
        return;
    }
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Version"),
        header_cell("Run"),
        header_cell("Applies to"),
        header_cell("Author"),
        header_cell("Timestamp"),
        header_cell("Comments"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 0, CellAlignment::Right);
    align_column(&mut table, 1, CellAlignment::Right);
    for entry in &report.entries {
        table.add_row(entry_row(entry));
    }
    println!("{table}");
}

pub fn print_resolve(report: &ResolveReport) -> serde_json::Result<()> {
    println!(
        "Run {} requested {} {} -> version {} ({})",
        report.run_number,
        report.requested,
        report.kind,
        report.entry.version,
        report.entry.applies_to_text()
    );
    println!("Record: {}", report.record_path.display());
    println!("{}", serde_json::to_string_pretty(&report.record)?);
    Ok(())
}

pub fn print_groups(report: &GroupsReport) {
    println!("State: {}", report.state_id);
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Mode"),
        header_cell("Schema"),
        header_cell("Definition"),
    ]);
    apply_table_style(&mut table);
    for use_lite_mode in [false, true] {
        let groups = report.map.groups(use_lite_mode);
        if groups.is_empty() {
            table.add_row(vec![
                Cell::new(mode_name(use_lite_mode)),
                dim_cell("-"),
                dim_cell("no usable schemas"),
            ]);
        }
        for (name, path) in groups {
            table.add_row(vec![
                Cell::new(mode_name(use_lite_mode)),
                Cell::new(name),
                Cell::new(path.display()),
            ]);
        }
    }
    for pruned in &report.pruned {
        table.add_row(vec![
            Cell::new(pruned.mode).fg(Color::Yellow),
            Cell::new(&pruned.name).fg(Color::Yellow),
            Cell::new(format!("{} ({})", pruned.path.display(), pruned.problem))
                .fg(Color::Yellow),
        ]);
    }
    println!("{table}");
}

pub fn print_export(report: &ExportReport) {
    println!(
        "Stored {} version {} for run {} in state {}",
        report.kind, report.entry.version, report.entry.run_number, report.state_id
    );
    println!("Record: {}", report.record_path.display());
}

fn entry_row(entry: &IndexEntry) -> Vec<Cell> {
    vec![
        Cell::new(entry.version).add_attribute(Attribute::Bold),
        Cell::new(entry.run_number),
        Cell::new(entry.applies_to_text()),
        optional_cell(&entry.author),
        Cell::new(timestamp::format(&entry.timestamp)),
        optional_cell(&entry.comments),
    ]
}

fn optional_cell(value: &str) -> Cell {
    if value.is_empty() {
        dim_cell("-")
    } else {
        Cell::new(value)
    }
}

pub fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120);
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value).fg(Color::DarkGrey)
}
