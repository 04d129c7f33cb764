//! pdfinspect - show how a PDF was ingested
//!
//! Prints the trailer summary, the page list, single resolved objects and
//! the health report of recoverable issues.

use anyhow::{Context, Result, bail};
use clap::{ArgAction, Parser};
use memmap2::Mmap;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use strata_core::document::Trailer;
use strata_core::parser::serialize_object;
use strata_core::{Document, Object, ParseOptions};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "pdfinspect", version, about = "Inspect PDF structure and ingestion health")]
struct Args {
    /// PDF file to inspect
    file: PathBuf,

    /// Reject non-conforming input instead of repairing it
    #[arg(long)]
    strict: bool,

    /// Re-parse objects on every access
    #[arg(long)]
    no_cache: bool,

    /// Cap on any forward recovery scan, in bytes
    #[arg(long, value_name = "BYTES")]
    max_scan: Option<u64>,

    /// Print one resolved object
    #[arg(long, value_name = "N")]
    object: Option<u32>,

    /// Generation of --object
    #[arg(long = "gen", value_name = "G", default_value_t = 0, requires = "object")]
    gen_num: u16,

    /// List pages
    #[arg(long)]
    pages: bool,

    /// Print the health report
    #[arg(long)]
    health: bool,

    /// More logging (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn write_trailer<W: Write>(out: &mut W, doc: &Document, trailer: &Trailer) -> Result<()> {
    writeln!(out, "version:   {}", doc.header_version().unwrap_or("?"))?;
    writeln!(out, "revisions: {}", doc.trailers().len())?;
    writeln!(out, "objects:   {}", doc.object_ids().len())?;
    if let Some(size) = trailer.size {
        writeln!(out, "size:      {size}")?;
    }
    if let Some(root) = trailer.root {
        writeln!(out, "root:      {root}")?;
    }
    if let Some(info) = doc.info() {
        writeln!(
            out,
            "info:      {}",
            String::from_utf8_lossy(&serialize_object(&Object::Dict(info.clone())))
        )?;
    }
    writeln!(out, "encrypted: {}", doc.is_encrypted())?;
    writeln!(out, "recovered: {}", doc.is_fallback())?;
    if let Some(count) = doc.page_count() {
        writeln!(out, "pages:     {count}")?;
    }
    Ok(())
}

fn write_pages<W: Write>(out: &mut W, doc: &Document) -> Result<()> {
    for (i, page) in doc.iterate_pages().enumerate() {
        let page = page.with_context(|| format!("reading page {}", i + 1))?;
        let [x0, y0, x1, y1] = page.media_box;
        writeln!(
            out,
            "page {:>4}  {:<10} [{x0} {y0} {x1} {y1}]  rotate {:>3}  contents {}",
            i + 1,
            page.obj_ref.to_string(),
            page.rotate,
            page.contents.len()
        )?;
    }
    Ok(())
}

fn write_object<W: Write>(out: &mut W, doc: &Document, obj_num: u32, gen_num: u16) -> Result<()> {
    let obj = doc
        .resolve(obj_num, gen_num)
        .with_context(|| format!("resolving {obj_num} {gen_num} R"))?;
    writeln!(out, "{obj_num} {gen_num} obj")?;
    out.write_all(&serialize_object(obj.value()))?;
    writeln!(out)?;
    if let Some(stream) = obj.stream() {
        let desc = &stream.descriptor;
        writeln!(
            out,
            "% payload at {} length {} filters [{}]",
            desc.data_offset,
            desc.length,
            desc.filters
                .iter()
                .map(|f| f.name.as_str())
                .collect::<Vec<_>>()
                .join(" ")
        )?;
    }
    writeln!(out, "endobj")?;
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let file = File::open(&args.file).with_context(|| format!("opening {}", args.file.display()))?;
    // SAFETY: the file is opened read-only and the map is not shared with
    // other writers in this process.
    let mmap = unsafe { Mmap::map(&file) }.with_context(|| format!("mapping {}", args.file.display()))?;

    let options = ParseOptions {
        strict: args.strict,
        caching: !args.no_cache,
        max_scan_distance: args.max_scan,
        ..ParseOptions::default()
    };
    let doc = match Document::builder().options(options).open_mmap(mmap) {
        Ok(doc) => doc,
        Err(e) => bail!("cannot ingest {}: {e}", args.file.display()),
    };

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    write_trailer(&mut out, &doc, doc.trailer())?;

    if let Some(obj_num) = args.object {
        writeln!(out)?;
        write_object(&mut out, &doc, obj_num, args.gen_num)?;
    }
    if args.pages {
        writeln!(out)?;
        write_pages(&mut out, &doc)?;
    }
    if args.health {
        writeln!(out)?;
        write!(out, "{}", doc.health_report())?;
    }
    out.flush()?;
    Ok(())
}
