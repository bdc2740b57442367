use comfy_table::modifiers::{UTF8_ROUND_CORNERS, UTF8_SOLID_INNER_BORDERS};
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use variants_cli::plan::DerivedVariant;
use variants_cli::report::attribute_value;
use variants_model::{FieldDescriptor, RecordType};

pub fn print_types(types: &[RecordType]) {
    for ty in types {
        match ty.base() {
            Some(base) => println!("{}({})", ty.name(), base.name()),
            None => println!("{}", ty.name()),
        }
        if let Some(doc) = ty.doc() {
            println!("{doc}");
        }
        println!("{}", field_table(ty));
    }
}

pub fn print_variants(variants: &[DerivedVariant]) {
    for derived in variants {
        println!(
            "{} -> {} ({})",
            derived.origin.name(),
            derived.ty.name(),
            derived.variant
        );
        println!("{}", field_table(&derived.ty));
        if !derived.attributes.is_empty() {
            let mut table = Table::new();
            table.set_header(vec![header_cell("Attribute"), header_cell("Value")]);
            apply_table_style(&mut table);
            for (name, attribute) in &derived.attributes {
                table.add_row(vec![Cell::new(name), Cell::new(attribute_value(attribute))]);
            }
            println!("{table}");
        }
    }
    println!("{}", totals_table(variants));
}

fn field_table(ty: &RecordType) -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Field"),
        header_cell("Type"),
        header_cell("Required"),
        header_cell("Default"),
        header_cell("Markers"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 2, CellAlignment::Center);
    for field in ty.fields() {
        table.add_row(vec![
            Cell::new(&field.name).add_attribute(Attribute::Bold),
            Cell::new(&field.ty),
            required_cell(field.is_required()),
            default_cell(field),
            markers_cell(field),
        ]);
    }
    table
}

fn totals_table(variants: &[DerivedVariant]) -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Origin"),
        header_cell("Variant"),
        header_cell("Type"),
        header_cell("Fields"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 3, CellAlignment::Right);
    for derived in variants {
        table.add_row(vec![
            Cell::new(derived.origin.name()),
            Cell::new(&derived.variant),
            Cell::new(derived.ty.name()).fg(Color::Green),
            Cell::new(derived.ty.fields().len()),
        ]);
    }
    table.add_row(vec![
        Cell::new("TOTAL")
            .fg(Color::Cyan)
            .add_attribute(Attribute::Bold),
        dim_cell("-"),
        dim_cell("-"),
        Cell::new(variants.len()).add_attribute(Attribute::Bold),
    ]);
    table
}

fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .apply_modifier(UTF8_SOLID_INNER_BORDERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
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

fn required_cell(required: bool) -> Cell {
    if required {
        Cell::new("yes").fg(Color::Yellow)
    } else {
        dim_cell("no")
    }
}

fn default_cell(field: &FieldDescriptor) -> Cell {
    match (&field.default, &field.default_factory) {
        (Some(value), _) => Cell::new(value),
        (None, Some(factory)) => Cell::new(format!("{}()", factory.name())),
        (None, None) => dim_cell("-"),
    }
}

fn markers_cell(field: &FieldDescriptor) -> Cell {
    if field.metadata.is_empty() {
        return dim_cell("-");
    }
    let markers: Vec<String> = field.metadata.iter().map(ToString::to_string).collect();
    Cell::new(markers.join(" "))
}

fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value).fg(Color::DarkGrey)
}
