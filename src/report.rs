use std::io::{self, Write};
use std::net::Ipv4Addr;

use comfy_table::{ColumnConstraint, ContentArrangement, Table, Width, presets};

use crate::trace::HopResult;

/// Column titles and widths.
const COLUMNS: [(&str, u16); 6] = [
    ("HOP", 3),
    ("ADDRESS", 15),
    ("DOMAIN", 35),
    ("NETNAME", 50),
    ("COUNTRY", 7),
    ("ASN", 7),
];

/// Writes the route as a fixed-width table, one row per hop as it arrives.
#[derive(Debug)]
pub struct Report<W> {
    out: W,
}

impl<W: Write> Report<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    /// Write the banner and the column header.
    pub fn start(&mut self, host: &str, addr: Ipv4Addr, max_hops: u8) -> io::Result<()> {
        writeln!(
            self.out,
            "Route to {host} [{addr}] with {max_hops} hops max."
        )?;
        writeln!(self.out, "{}", render(COLUMNS.map(|(title, _)| title.to_string())))?;
        self.out.flush()
    }

    pub fn hop(&mut self, hop: &HopResult) -> io::Result<()> {
        writeln!(self.out, "{}", render(cells(hop)))?;
        self.out.flush()
    }
}

fn cells(hop: &HopResult) -> [String; 6] {
    let text = |value: Option<&str>| value.unwrap_or_default().to_string();
    [
        hop.hop.to_string(),
        hop.addr.map_or_else(|| "*".to_string(), |addr| addr.to_string()),
        text(hop.name.as_deref()),
        text(hop.net_name.as_deref()),
        text(hop.country.as_deref()),
        hop.as_number.map(|asn| asn.to_string()).unwrap_or_default(),
    ]
}

/// Render one line; every line shares the column widths so rows stay aligned.
fn render(cells: [String; 6]) -> String {
    let mut table = Table::new();
    table
        .load_preset(presets::NOTHING)
        .set_content_arrangement(ContentArrangement::Disabled)
        .add_row(
            cells
                .iter()
                .zip(COLUMNS)
                .map(|(cell, (_, width))| fit(cell, usize::from(width))),
        );
    // Fixed widths count the cell padding; `fit` has already cut the content.
    for (column, (_, width)) in table.column_iter_mut().zip(COLUMNS) {
        let padded = width + column.padding_width();
        column.set_constraint(ColumnConstraint::Absolute(Width::Fixed(padded)));
    }
    table.to_string()
}

/// Cut `text` to at most `width` characters.
fn fit(text: &str, width: usize) -> String {
    text.chars().take(width).collect()
}
