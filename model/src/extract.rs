use anyhow::Result;
use csv::StringRecord;

/// One query extract: a tab-separated file whose first line names the
/// columns. The column set varies per query, so nothing here is typed
/// beyond the header.
pub struct Extract {
    pub columns: Vec<String>,
    pub rows: Vec<StringRecord>,
    /// Rows whose field count didn't match the header. They're dropped at
    /// load time and only show up in the final summary.
    pub skipped_rows: usize,
}

pub fn load<R: std::io::Read>(reader: R) -> Result<Extract> {
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        // Let short and long rows through so we can count them instead of
        // aborting the whole extract.
        .flexible(true)
        .from_reader(reader);

    let columns: Vec<String> = rdr.headers()?.iter().map(|x| x.to_string()).collect();

    let mut rows = Vec::new();
    let mut skipped_rows = 0;
    for rec in rdr.records() {
        let rec = match rec {
            Ok(x) => x,
            Err(err) => {
                warn!("Skipping unparseable row: {}", err);
                skipped_rows += 1;
                continue;
            }
        };
        if rec.len() != columns.len() {
            warn!(
                "Skipping row with {} fields; the header has {}",
                rec.len(),
                columns.len()
            );
            skipped_rows += 1;
            continue;
        }
        rows.push(rec);
    }

    Ok(Extract {
        columns,
        rows,
        skipped_rows,
    })
}
