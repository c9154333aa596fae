//! Feeds translation units through the reader and into a shared translator.

use std::fs;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::error::{Result, TranslateError};
use crate::parser::Parser;
use crate::translator::Translator;

const SOURCE_EXTENSION: &str = "vm";
const OUTPUT_EXTENSION: &str = "asm";

/// Translate one source file as its own unit.
pub fn translate<W: Write>(path: &Path, translator: &mut Translator<W>) -> Result<usize> {
    let parser = Parser::open(path)?;
    run(parser, translator)
}

/// Translate a unit read from any buffered source.
pub fn translate_source<R: BufRead, W: Write>(
    unit: &str,
    reader: R,
    translator: &mut Translator<W>,
) -> Result<usize> {
    run(Parser::from_reader(unit, reader), translator)
}

fn run<R: BufRead, W: Write>(parser: Parser<R>, translator: &mut Translator<W>) -> Result<usize> {
    translator.set_unit(parser.unit());
    let unit = parser.unit().to_string();

    let mut count = 0;
    for command in parser {
        translator.translate(&command?)?;
        count += 1;
    }

    debug!("{}: translated {} commands", unit, count);
    Ok(count)
}

/// Translate every source into one program, in order, emitting the bootstrap
/// first when the translator asks for it.
pub fn translate_program<W: Write>(
    sources: &[PathBuf],
    translator: &mut Translator<W>,
) -> Result<usize> {
    if translator.options().bootstrap {
        translator.write_bootstrap()?;
    }

    let mut total = 0;
    for source in sources {
        info!("translating {}", source.display());
        total += translate(source, translator)?;
    }
    translator.flush()?;
    Ok(total)
}

/// The sources named by `input`: the file itself, or every `.vm` file in a
/// directory sorted by name.
pub fn collect_sources(input: &Path) -> Result<Vec<PathBuf>> {
    if !input.is_dir() {
        return Ok(vec![input.to_path_buf()]);
    }

    let entries = fs::read_dir(input).map_err(|source| TranslateError::SourceNotFound {
        path: input.to_path_buf(),
        source,
    })?;

    let mut sources = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == SOURCE_EXTENSION) {
            sources.push(path);
        }
    }
    sources.sort();

    if sources.is_empty() {
        return Err(TranslateError::NoSources(input.to_path_buf()));
    }
    Ok(sources)
}

/// `Foo.vm` becomes `Foo.asm`; a directory `prog/` becomes `prog/prog.asm`.
pub fn default_output(input: &Path) -> PathBuf {
    if input.is_dir() {
        let mut name = input
            .canonicalize()
            .ok()
            .and_then(|p| p.file_name().map(|n| n.to_os_string()))
            .unwrap_or_else(|| "out".into());
        name.push(".");
        name.push(OUTPUT_EXTENSION);
        input.join(name)
    } else {
        input.with_extension(OUTPUT_EXTENSION)
    }
}
