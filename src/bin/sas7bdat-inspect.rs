use std::path::{Path, PathBuf};

use clap::Parser;
use rayon::prelude::*;
use serde_json::json;
use walkdir::WalkDir;

use sas7bdat_reader::logger::{log_error, set_log_file, set_log_prefix};
use sas7bdat_reader::metadata::{DatasetMetadata, Vendor};
use sas7bdat_reader::parser::{PageHeader, RowIndex, Subheader, VisitResult, Visitor};
use sas7bdat_reader::value::{MissingValue, Value};
use sas7bdat_reader::{ReadOptions, SasFile};

#[derive(Parser)]
#[command(
    name = "sas7bdat-inspect",
    version,
    about = "Print the schema, page tree and leading rows of SAS7BDAT files"
)]
struct Cli {
    /// Input files or directories (recurses directories).
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Also print the page and subheader tree.
    #[arg(long)]
    tree: bool,

    /// Print the first N rows.
    #[arg(long, default_value_t = 0)]
    rows: u64,

    /// Skip leading N rows before printing.
    #[arg(long, default_value_t = 0)]
    skip: u64,

    /// Override the character set declared by the file.
    #[arg(long)]
    encoding: Option<String>,

    /// Walk every page while assembling the schema.
    #[arg(long)]
    full_walk: bool,

    /// Copy warnings and errors to this file.
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Number of concurrent worker threads.
    #[arg(long)]
    jobs: Option<usize>,
}

type AnyError = Box<dyn std::error::Error + Send + Sync>;

fn main() -> Result<(), AnyError> {
    let cli = Cli::parse();
    if let Some(path) = &cli.log_file {
        set_log_file(path)?;
    }
    if let Some(jobs) = cli.jobs {
        // The global pool can only be configured once per process.
        let _ = rayon::ThreadPoolBuilder::new()
            .num_threads(jobs)
            .build_global();
    }

    let files = discover_inputs(&cli.inputs);
    if files.is_empty() {
        return Err("no .sas7bdat inputs found".into());
    }

    let reports = files
        .par_iter()
        .map(|path| {
            let _prefix = set_log_prefix(path.display().to_string());
            inspect(path, &cli).inspect_err(|err| log_error(&err.to_string()))
        })
        .collect::<Vec<_>>();

    let mut failures = 0usize;
    for report in reports {
        match report {
            Ok(report) => {
                serde_json::to_writer_pretty(std::io::stdout(), &report)?;
                println!();
            }
            Err(_) => failures += 1,
        }
    }
    if failures > 0 {
        return Err(format!("{failures} of {} files failed", files.len()).into());
    }
    Ok(())
}

fn inspect(path: &Path, cli: &Cli) -> Result<serde_json::Value, AnyError> {
    let mut options = ReadOptions::new()
        .with_skip_rows(cli.skip)
        .with_max_rows(cli.rows)
        .with_early_exit(!cli.full_walk);
    if let Some(label) = &cli.encoding {
        options = options.with_encoding(label.clone());
    }
    let mut sas = SasFile::open_with(path, options)?;
    let mut report = json!({
        "path": path.display().to_string(),
        "schema": schema_json(sas.metadata()),
    });

    if cli.tree {
        let mut tree = TreePrinter::default();
        sas.visit(&mut tree)?;
        report["tree"] = json!(tree.lines);
    }

    if cli.rows > 0 {
        let mut rows = Vec::new();
        let mut cursor = sas.rows()?;
        while cursor.next()? {
            let values = cursor.values()?;
            rows.push(values.iter().map(value_json).collect::<Vec<_>>());
        }
        report["rows"] = json!(rows);
    }
    Ok(report)
}

fn schema_json(meta: &DatasetMetadata) -> serde_json::Value {
    #[derive(serde::Serialize)]
    struct ColumnJson<'a> {
        index: u32,
        name: &'a str,
        label: Option<&'a str>,
        kind: &'static str,
        offset: usize,
        length: usize,
        format: Option<String>,
    }

    let columns = meta
        .columns
        .iter()
        .map(|column| ColumnJson {
            index: column.index,
            name: &column.name,
            label: column.label.as_deref(),
            kind: column.kind.as_str(),
            offset: column.offset,
            length: column.length,
            format: column.format.as_ref().map(|format| {
                format!("{}{}.{}", format.name, format.width, format.precision)
            }),
        })
        .collect::<Vec<_>>();
    json!({
        "name": meta.name,
        "label": meta.label,
        "file_type": meta.file_type,
        "row_count": meta.row_count,
        "column_count": meta.column_count(),
        "created": meta.timestamps.created.map(|at| at.to_string()),
        "modified": meta.timestamps.modified.map(|at| at.to_string()),
        "release": meta.release,
        "version": meta.version.map(|v| format!("{}.{}.{}", v.major, v.minor, v.revision)),
        "vendor": match meta.vendor {
            Vendor::Sas => "SAS",
            Vendor::StatTransfer => "StatTransfer",
        },
        "host": meta.host,
        "os_name": meta.os_name,
        "encoding": meta.encoding,
        "endianness": meta.endianness.as_str(),
        "compression": meta.compression.to_string(),
        "columns": columns,
        "column_list": meta.column_list,
    })
}

fn value_json(value: &Value<'_>) -> serde_json::Value {
    match value {
        Value::Number(number) => json!(number),
        Value::Text(text) => json!(text),
        Value::Date(date) => json!(date.to_string()),
        Value::DateTime(at) => json!(at.to_string()),
        Value::Time(duration) => json!(duration.as_seconds_f64()),
        Value::Missing(MissingValue::System) => serde_json::Value::Null,
        Value::Missing(MissingValue::Tagged(tag)) => json!(format!(".{tag}")),
    }
}

/// Collects one indented line per visited node.
#[derive(Default)]
struct TreePrinter {
    lines: Vec<String>,
}

impl Visitor for TreePrinter {
    fn visit_page(&mut self, page: &PageHeader) -> sas7bdat_reader::Result<VisitResult> {
        let kind = page
            .known_type()
            .map_or_else(|| format!("0x{:04X}", page.raw_type), |kind| kind.as_str().to_owned());
        self.lines.push(format!(
            "page {} {kind}{} blocks={} subheaders={}",
            page.index,
            if page.is_flagged() { "+flag" } else { "" },
            page.block_count,
            page.subheader_count
        ));
        Ok(VisitResult::Continue)
    }

    fn visit_subheader(
        &mut self,
        _page: &PageHeader,
        subheader: &Subheader<'_>,
    ) -> sas7bdat_reader::Result<VisitResult> {
        let pointer = subheader.pointer;
        let what = match subheader.signature {
            Some(signature) => signature
                .known()
                .map_or_else(|| format!("unknown 0x{:X}", signature.raw()), |sig| sig.as_str().to_owned()),
            None if pointer.is_empty() => "empty".to_owned(),
            None if pointer.is_truncated() => "truncated".to_owned(),
            None => format!("format {}", pointer.format.raw()),
        };
        self.lines.push(format!(
            "  {} {what} offset={} length={}{}",
            pointer.location,
            pointer.offset,
            pointer.length,
            if pointer.is_data { " data" } else { "" }
        ));
        Ok(VisitResult::Continue)
    }

    fn visit_row_index(
        &mut self,
        _page: &PageHeader,
        entry: &RowIndex,
    ) -> sas7bdat_reader::Result<VisitResult> {
        self.lines.push(format!(
            "  {} row {} ends at {}",
            entry.source, entry.row_number, entry.last_row
        ));
        Ok(VisitResult::Continue)
    }
}

fn discover_inputs(inputs: &[PathBuf]) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for input in inputs {
        if input.is_dir() {
            for entry in WalkDir::new(input)
                .follow_links(false)
                .into_iter()
                .filter_map(Result::ok)
            {
                let path = entry.path();
                if path.is_file() && is_sas7bdat(path) {
                    files.push(path.to_path_buf());
                }
            }
        } else if input.is_file() {
            files.push(input.clone());
        }
    }
    files.sort();
    files.dedup();
    files
}

fn is_sas7bdat(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("sas7bdat"))
}
