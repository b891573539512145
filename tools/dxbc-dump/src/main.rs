use std::fmt::Write as _;
use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::Parser;
use dxforge_dxbc::{DxbcFile, ParseOptions, SignatureChunk};
use dxforge_sm4::{
    emit_minimal_vertex_passthrough_shader, parse_container_with_options, ShaderContainer,
    Sm4Program,
};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "dxbc-dump",
    about = "Inspect a DXBC shader container: header, chunks, signatures, RDEF and decoded SM4/SM5 instructions."
)]
struct Args {
    /// Container to inspect
    input: Option<PathBuf>,

    /// Print a JSON summary instead of text
    #[arg(long, action = clap::ArgAction::SetTrue)]
    json: bool,

    /// Skip checksum verification (diagnostics only)
    #[arg(long, action = clap::ArgAction::SetTrue)]
    no_verify: bool,

    /// Print the first N raw program tokens
    #[arg(long, value_name = "N", default_value_t = 0)]
    head: usize,

    /// Log at debug level (overridden by RUST_LOG)
    #[arg(long, short, action = clap::ArgAction::SetTrue)]
    verbose: bool,

    /// Write the vs_5_0 passthrough container to this path
    #[arg(long, value_name = "PATH")]
    emit_passthrough: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
struct Summary {
    size: usize,
    checksum: String,
    checksum_ok: bool,
    chunks: Vec<ChunkSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    program: Option<ProgramSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Debug, Serialize)]
struct ChunkSummary {
    fourcc: String,
    offset: u32,
    len: usize,
}

#[derive(Debug, Serialize)]
struct ProgramSummary {
    stage: String,
    model: String,
    instructions: Vec<String>,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    run(args)
}

fn run(args: Args) -> anyhow::Result<()> {
    if let Some(path) = &args.emit_passthrough {
        let bytes = emit_minimal_vertex_passthrough_shader().context("emit passthrough shader")?;
        fs::write(path, &bytes).with_context(|| format!("write {}", path.display()))?;
        info!(path = %path.display(), len = bytes.len(), "wrote passthrough container");
    }

    let Some(input) = &args.input else {
        if args.emit_passthrough.is_some() {
            return Ok(());
        }
        bail!("no input file given (pass a path or --emit-passthrough <PATH>)");
    };

    let bytes = fs::read(input).with_context(|| format!("read {}", input.display()))?;
    let options = ParseOptions {
        verify_checksum: !args.no_verify,
        ..ParseOptions::default()
    };

    let file = DxbcFile::parse_with_options(&bytes, options)
        .with_context(|| format!("parse {}", input.display()))?;
    let parsed = parse_container_with_options(&bytes, options);

    if args.json {
        let summary = summarize(&file, parsed.as_ref().ok(), parsed.as_ref().err());
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print!("{}", render_text(&file, parsed.as_ref().ok(), args.head));
    }

    parsed
        .map(|_| ())
        .with_context(|| format!("decode {}", input.display()))
}

fn summarize(
    file: &DxbcFile<'_>,
    parsed: Option<&ShaderContainer>,
    error: Option<&dxforge_sm4::Sm4Error>,
) -> Summary {
    Summary {
        size: file.bytes().len(),
        checksum: hex(&file.header().checksum),
        checksum_ok: file.checksum_matches(),
        chunks: file
            .chunks()
            .map(|c| ChunkSummary {
                fourcc: c.fourcc.to_string(),
                offset: c.offset,
                len: c.data.len(),
            })
            .collect(),
        program: parsed.and_then(|p| p.program.as_ref()).map(|m| ProgramSummary {
            stage: format!("{:?}", m.stage),
            model: format!("{}_{}", m.model.major, m.model.minor),
            instructions: m.instructions.iter().map(ToString::to_string).collect(),
        }),
        error: error.map(ToString::to_string),
    }
}

fn render_text(file: &DxbcFile<'_>, parsed: Option<&ShaderContainer>, head: usize) -> String {
    let mut out = String::new();
    let header = file.header();
    let _ = writeln!(
        out,
        "DXBC {} bytes, {} chunks, checksum {} ({})",
        header.total_size,
        header.chunk_count,
        hex(&header.checksum),
        if file.checksum_matches() { "ok" } else { "MISMATCH" }
    );
    for chunk in file.chunks() {
        let _ = writeln!(
            out,
            "  {} @ {:#06x} ({} bytes)",
            chunk.fourcc,
            chunk.offset,
            chunk.data.len()
        );
    }

    if head > 0 {
        let program = file
            .find_shader_chunk()
            .map(|c| Sm4Program::parse_program_tokens(c.data));
        if let Some(Ok(program)) = program {
            let _ = writeln!(out, "tokens:");
            for (i, token) in program.tokens.iter().take(head).enumerate() {
                let _ = writeln!(out, "  [{i:4}] {token:#010x}");
            }
        }
    }

    let Some(parsed) = parsed else {
        return out;
    };
    if let Some(sig) = &parsed.input_signature {
        render_signature(&mut out, "input signature", sig);
    }
    if let Some(sig) = &parsed.output_signature {
        render_signature(&mut out, "output signature", sig);
    }
    if let Some(rdef) = &parsed.rdef {
        let _ = writeln!(
            out,
            "rdef: {} {}.{}, {} constant buffers, {} bindings",
            rdef.creator,
            rdef.major,
            rdef.minor,
            rdef.constant_buffers.len(),
            rdef.bindings.len()
        );
        for cb in &rdef.constant_buffers {
            let _ = writeln!(out, "  cbuffer {} ({} bytes)", cb.name, cb.size);
            for var in &cb.variables {
                let _ = writeln!(out, "    {} @ {} ({} bytes)", var.name, var.offset, var.size);
            }
        }
        for b in &rdef.bindings {
            let _ = writeln!(
                out,
                "  binding {} type {} slot {}..{}",
                b.name,
                b.input_type,
                b.bind_point,
                b.bind_point.saturating_add(b.bind_count)
            );
        }
    }
    if let Some(program) = &parsed.program {
        let _ = writeln!(
            out,
            "{}_{}_{}:",
            program.stage.prefix(),
            program.model.major,
            program.model.minor
        );
        for inst in &program.instructions {
            let _ = writeln!(out, "  {inst}");
        }
    }
    out
}

fn render_signature(out: &mut String, title: &str, sig: &SignatureChunk) {
    let _ = writeln!(out, "{title}:");
    for e in &sig.entries {
        let _ = writeln!(
            out,
            "  {}{} r{} mask {:#x} rw {:#x} sv {}",
            e.semantic_name,
            e.semantic_index,
            e.register,
            e.mask,
            e.read_write_mask,
            e.system_value_type
        );
    }
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().fold(String::with_capacity(bytes.len() * 2), |mut s, b| {
        let _ = write!(s, "{b:02x}");
        s
    })
}
