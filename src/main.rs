//! vfile command line tool

// Use jemalloc as global allocator
#[global_allocator]
static GLOBAL: jemallocator::Jemalloc = jemallocator::Jemalloc;

use clap::{Parser, Subcommand};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use vfile::{get_size, FileConfig, SeekMode, VfsResult, VirtualFile};

const CHUNK_SIZE: usize = 64 * 1024;
const DUMP_WIDTH: usize = 16;

#[derive(Parser, Debug)]
#[command(name = "vfile")]
#[command(about = "Inspect and copy files through the virtual file layer")]
struct Args {
    /// JSON file with a `FileConfig`
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the size of a file in bytes
    Size { path: PathBuf },
    /// Hex dump part of a file
    Dump {
        path: PathBuf,
        #[arg(short = 'o', long, default_value = "0", allow_hyphen_values = true)]
        offset: i64,
        /// Interpret the offset relative to the end of the file
        #[arg(long)]
        from_end: bool,
        #[arg(short = 'n', long, default_value = "256")]
        length: usize,
    },
    /// Copy a file chunk by chunk
    Copy { src: PathBuf, dst: PathBuf },
}

fn hex_dump(bytes: &[u8], base: u64) -> String {
    let mut out = String::new();
    for (i, line) in bytes.chunks(DUMP_WIDTH).enumerate() {
        let _ = write!(out, "{:08x} ", base + (i * DUMP_WIDTH) as u64);
        for column in 0..DUMP_WIDTH {
            match line.get(column) {
                Some(byte) => {
                    let _ = write!(out, " {:02x}", byte);
                }
                None => out.push_str("   "),
            }
        }
        out.push_str("  |");
        out.extend(line.iter().map(|&b| if b.is_ascii_graphic() || b == b' ' { b as char } else { '.' }));
        out.push_str("|\n");
    }
    out
}

fn dump(path: &Path, offset: i64, from_end: bool, length: usize, config: &FileConfig) -> VfsResult<bool> {
    let mut file = VirtualFile::open_with_config(path, "rb", config)?;
    let mode = if from_end { SeekMode::End } else { SeekMode::Start };
    if !file.seek(offset, mode) {
        eprintln!("cannot seek to {} in {}", offset, path.display());
        file.close()?;
        return Ok(false);
    }

    let base = file.tell();
    let mut buf = vec![0u8; length];
    let count = file.read(&mut buf);
    print!("{}", hex_dump(&buf[..count], base));
    file.close()?;
    Ok(true)
}

fn copy(src: &Path, dst: &Path, config: &FileConfig) -> VfsResult<u64> {
    let mut input = VirtualFile::open_with_config(src, "rb", config)?;
    let mut output = VirtualFile::open_with_config(dst, "wb", config)?;
    let mut buf = vec![0u8; CHUNK_SIZE];
    let mut total = 0u64;

    loop {
        let count = input.read(&mut buf);
        if count == 0 {
            break;
        }
        let written = output.write(&buf[..count]);
        total += written as u64;
        if written < count {
            log::error!("short write to {}: {} of {} bytes", dst.display(), written, count);
            break;
        }
    }

    input.close()?;
    output.close()?;
    Ok(total)
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => match FileConfig::load(path) {
            Ok(config) => config,
            Err(err) => {
                eprintln!("invalid config {}: {}", path.display(), err);
                return ExitCode::FAILURE;
            }
        },
        None => FileConfig::default(),
    };
    log::debug!("using {:?}", config);

    let result = match &args.command {
        Command::Size { path } => {
            let size = get_size(path);
            if size < 0 {
                eprintln!("cannot stat {}", path.display());
                return ExitCode::FAILURE;
            }
            println!("{}", size);
            Ok(true)
        }
        Command::Dump {
            path,
            offset,
            from_end,
            length,
        } => dump(path, *offset, *from_end, *length, &config),
        Command::Copy { src, dst } => copy(src, dst, &config).map(|total| {
            println!("copied {} bytes", total);
            true
        }),
    };

    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            eprintln!("error: {}", err);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_dump_layout() {
        let out = hex_dump(b"ABC\x00", 0x10);
        assert_eq!(
            out,
            format!("00000010  41 42 43 00{}  |ABC.|\n", "   ".repeat(12))
        );
    }

    #[test]
    fn test_hex_dump_multiple_lines() {
        let bytes: Vec<u8> = (0..20).collect();
        let out = hex_dump(&bytes, 0);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[1].starts_with("00000010  10 11 12 13"));
    }

    #[test]
    fn test_args_parse() {
        let args = Args::parse_from(["vfile", "dump", "data.bin", "-o", "-4", "--from-end"]);
        match args.command {
            Command::Dump { offset, from_end, length, .. } => {
                assert_eq!(offset, -4);
                assert!(from_end);
                assert_eq!(length, 256);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }
}
