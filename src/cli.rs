// ============================================================================
// PixInpainter CLI — headless batch painting via command-line arguments
// ============================================================================
//
// Usage examples:
//   PixInpainter --input photo.png --script strokes.txt --output result.png
//   PixInpainter -i photo.jpg -o out.png              (format inferred from output ext)
//   PixInpainter -i "shots/*.png" -s mask.txt --output-dir masked/ --format png
//   PixInpainter --new 512x512 -s sketch.txt -o sketch.pxs   (session with history)
//   PixInpainter --write-settings                             (materialize the settings file)
//
// Gesture scripts are plain text, one command per line:
//   tool rectangle
//   color 255,0,0,255
//   width 3
//   press 10 10
//   move 40 30
//   release 40 30
//   undo
//
// Everything runs synchronously on the current thread.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use clap::Parser;

use crate::canvas::{Point, str_to_color};
use crate::components::history::HistoryManager;
use crate::components::tools::Tool;
use crate::io::{load_image_sync, load_session, save_image, save_session};
use crate::model::CanvasModel;
use crate::project::Project;
use crate::settings::AppSettings;

// ============================================================================
// CLI argument definition (clap Derive)
// ============================================================================

/// PixInpainter headless canvas processor.
///
/// Replay gesture scripts onto images and convert between formats.
#[derive(Parser, Debug)]
#[command(
    name = "PixInpainter",
    about = "PixInpainter headless batch painter",
    long_about = "Replay pen, shape and fill gestures onto image files without opening\n\
                  an editor. Reads PNG, JPEG, BMP and .pxs session files; writes the\n\
                  same, where .pxs keeps the full undo/redo history.\n\n\
                  Example:\n  \
                  PixInpainter --input photo.png --script strokes.txt --output result.png\n  \
                  PixInpainter --new 256x256 -s sketch.txt -o sketch.png"
)]
pub struct CliArgs {
    /// Input file(s). Glob patterns accepted (e.g. "*.png", "shots/*.jpg").
    #[arg(short, long, num_args = 1.., required_unless_present_any = ["new", "write_settings"])]
    pub input: Vec<String>,

    /// Start from a blank white canvas of the given size instead of an input file.
    #[arg(long, value_name = "WxH", conflicts_with = "input")]
    pub new: Option<String>,

    /// Gesture script replayed on each canvas.
    /// If omitted, images are only loaded and re-saved (useful for format conversion).
    #[arg(short, long, value_name = "SCRIPT")]
    pub script: Option<PathBuf>,

    /// Output file path. Only valid for a single canvas.
    /// For batch input use --output-dir instead.
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output directory for batch processing.
    /// Files are written here with the original stem and the target format's extension.
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Output format: png, jpeg, bmp, pxs.
    /// When omitted, the format is inferred from --output's extension, defaulting to png.
    #[arg(short, long, value_name = "FORMAT")]
    pub format: Option<String>,

    /// Settings file to read defaults (colors, pen width, undo depth) from.
    /// Defaults to the platform settings location.
    #[arg(long, value_name = "FILE")]
    pub settings: Option<PathBuf>,

    /// Write the effective settings back to the settings file, creating it
    /// with defaults if it does not exist yet.
    #[arg(long)]
    pub write_settings: bool,

    /// Print per-file timing and mirror log output to stderr.
    #[arg(short, long)]
    pub verbose: bool,
}

// ============================================================================
// Gesture scripts
// ============================================================================

/// One parsed line of a gesture script.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScriptCommand {
    Tool(Tool),
    Color(image::Rgba<u8>),
    Secondary(image::Rgba<u8>),
    Width(u32),
    Press(Point),
    Move(Point),
    Release(Point),
    Undo,
    Redo,
    Clear,
}

/// Parse a gesture script. Blank lines and `#` comments are skipped;
/// errors name the offending 1-based line.
pub fn parse_script(source: &str) -> Result<Vec<ScriptCommand>, String> {
    let mut commands = Vec::new();
    for (idx, raw) in source.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let command = parse_line(line).map_err(|e| format!("line {}: {}", idx + 1, e))?;
        commands.push(command);
    }
    Ok(commands)
}

fn parse_line(line: &str) -> Result<ScriptCommand, String> {
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((w, r)) => (w, r.trim()),
        None => (line, ""),
    };
    let command = match word.to_lowercase().as_str() {
        "tool" => ScriptCommand::Tool(
            Tool::from_name(rest).ok_or_else(|| format!("unknown tool '{}'", rest))?,
        ),
        "color" => ScriptCommand::Color(parse_color(rest)?),
        "secondary" => ScriptCommand::Secondary(parse_color(rest)?),
        "width" => ScriptCommand::Width(
            rest.parse()
                .map_err(|_| format!("invalid width '{}'", rest))?,
        ),
        "press" => ScriptCommand::Press(parse_point(rest)?),
        "move" => ScriptCommand::Move(parse_point(rest)?),
        "release" => ScriptCommand::Release(parse_point(rest)?),
        "undo" => ScriptCommand::Undo,
        "redo" => ScriptCommand::Redo,
        "clear" => ScriptCommand::Clear,
        other => return Err(format!("unknown command '{}'", other)),
    };
    Ok(command)
}

fn parse_color(s: &str) -> Result<image::Rgba<u8>, String> {
    str_to_color(s).ok_or_else(|| format!("invalid color '{}' (expected r,g,b[,a])", s))
}

fn parse_point(s: &str) -> Result<Point, String> {
    let mut parts = s.split_whitespace();
    let (Some(x), Some(y), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(format!("expected 'x y', got '{}'", s));
    };
    let x = x.parse().map_err(|_| format!("invalid x coordinate '{}'", x))?;
    let y = y.parse().map_err(|_| format!("invalid y coordinate '{}'", y))?;
    Ok(Point::new(x, y))
}

/// Replay parsed commands onto a document.
pub fn apply_script(project: &mut Project, commands: &[ScriptCommand]) {
    for command in commands {
        match *command {
            ScriptCommand::Tool(tool) => project.set_tool(tool),
            ScriptCommand::Color(c) => project.primary_color = c,
            ScriptCommand::Secondary(c) => project.secondary_color = c,
            ScriptCommand::Width(w) => project.set_pen_width(w),
            ScriptCommand::Press(p) => {
                project.press(p);
            }
            ScriptCommand::Move(p) => {
                project.move_to(p);
            }
            ScriptCommand::Release(p) => {
                project.release(p);
            }
            ScriptCommand::Undo => {
                project.undo();
            }
            ScriptCommand::Redo => {
                project.redo();
            }
            ScriptCommand::Clear => project.clear(),
        }
    }
}

// ============================================================================
// Public entry point
// ============================================================================

/// Run all CLI processing and return an OS exit code.
/// `0` = all files succeeded, `1` = one or more files failed.
pub fn run(args: CliArgs) -> ExitCode {
    let settings = match &args.settings {
        Some(path) => AppSettings::load_from(path),
        None => AppSettings::load(),
    };

    if args.write_settings {
        match &args.settings {
            Some(path) => {
                if let Err(e) = settings.save_to(path) {
                    eprintln!("error: could not write settings '{}': {}", path.display(), e);
                    return ExitCode::FAILURE;
                }
            }
            None => settings.save(),
        }
        if args.input.is_empty() && args.new.is_none() {
            return ExitCode::SUCCESS;
        }
    }

    let script = match &args.script {
        Some(path) => {
            let source = match std::fs::read_to_string(path) {
                Ok(src) => src,
                Err(e) => {
                    eprintln!("error: could not read script '{}': {}", path.display(), e);
                    return ExitCode::FAILURE;
                }
            };
            match parse_script(&source) {
                Ok(commands) => commands,
                Err(e) => {
                    eprintln!("error: {}: {}", path.display(), e);
                    return ExitCode::FAILURE;
                }
            }
        }
        None => Vec::new(),
    };

    // Create output directory if specified
    if let Some(dir) = &args.output_dir
        && let Err(e) = std::fs::create_dir_all(dir)
    {
        eprintln!(
            "error: could not create output directory '{}': {}",
            dir.display(),
            e
        );
        return ExitCode::FAILURE;
    }

    let ext = parse_format(args.format.as_deref(), args.output.as_deref());

    // -- Blank canvas ------------------------------------------------------
    if let Some(size) = &args.new {
        let (width, height) = match parse_size(size) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("error: {}", e);
                return ExitCode::FAILURE;
            }
        };
        let Some(output) = build_output_path(
            Path::new("untitled"),
            args.output.as_deref(),
            args.output_dir.as_deref(),
            ext,
        ) else {
            eprintln!("error: cannot determine output path.");
            return ExitCode::FAILURE;
        };
        let settings = AppSettings {
            canvas_width: width,
            canvas_height: height,
            ..settings
        };
        let mut project = Project::from_settings(1, &settings);
        apply_script(&mut project, &script);
        return match write_project(&project, &output) {
            Ok(()) => {
                if args.verbose {
                    println!("  → {}", output.display());
                }
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("  error: {}", e);
                ExitCode::FAILURE
            }
        };
    }

    // -- Input files ---------------------------------------------------------
    let inputs = resolve_inputs(&args.input);
    if inputs.is_empty() {
        eprintln!("error: no input files matched the given pattern(s).");
        return ExitCode::FAILURE;
    }

    // Multiple inputs require --output-dir, not --output
    if inputs.len() > 1 && args.output.is_some() && args.output_dir.is_none() {
        eprintln!(
            "error: {} input files given but --output only accepts a single file path.\n\
             Use --output-dir to specify a destination directory for batch processing.",
            inputs.len()
        );
        return ExitCode::FAILURE;
    }

    let total = inputs.len();
    let multi = total > 1;
    let mut any_failure = false;

    for (idx, input_path) in inputs.iter().enumerate() {
        if multi || args.verbose {
            println!("[{}/{}] {}", idx + 1, total, input_path.display());
        }

        let file_start = Instant::now();

        let Some(output_path) = build_output_path(
            input_path,
            args.output.as_deref(),
            args.output_dir.as_deref(),
            ext,
        ) else {
            eprintln!(
                "  error: cannot determine output path for '{}'.",
                input_path.display()
            );
            any_failure = true;
            continue;
        };

        match run_one(input_path, &output_path, &script, &settings) {
            Ok(()) => {
                crate::log_info!("{} -> {}", input_path.display(), output_path.display());
                if args.verbose || multi {
                    println!(
                        "  → {} ({:.0}ms)",
                        output_path.display(),
                        file_start.elapsed().as_secs_f64() * 1000.0
                    );
                }
            }
            Err(e) => {
                crate::log_err!("{}: {}", input_path.display(), e);
                eprintln!("  error: {}", e);
                any_failure = true;
            }
        }
    }

    if any_failure { ExitCode::FAILURE } else { ExitCode::SUCCESS }
}

// ============================================================================
// Per-file processing pipeline
// ============================================================================

fn run_one(
    input: &Path,
    output: &Path,
    script: &[ScriptCommand],
    settings: &AppSettings,
) -> Result<(), String> {
    // -- Step 1: Load ----------------------------------------------------
    let canvas = if is_session(input) {
        load_session(input).map_err(|e| format!("session load failed: {}", e))?
    } else {
        let image = load_image_sync(input).map_err(|e| format!("load failed: {}", e))?;
        CanvasModel::from_parts(image, HistoryManager::new(settings.max_undo_steps))
    };
    let mut project = Project::from_file(input.to_path_buf(), canvas);
    project.primary_color = settings.primary_color;
    project.secondary_color = settings.secondary_color;
    project.set_pen_width(settings.pen_width);

    // -- Step 2: Replay gestures -----------------------------------------
    apply_script(&mut project, script);

    // -- Step 3: Save ----------------------------------------------------
    write_project(&project, output)
}

fn write_project(project: &Project, output: &Path) -> Result<(), String> {
    if is_session(output) {
        save_session(&project.canvas, output).map_err(|e| format!("session save failed: {}", e))
    } else {
        save_image(project.canvas.image(), output).map_err(|e| format!("save failed: {}", e))
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn is_session(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("pxs"))
}

/// Parse `WxH` (also accepts `W*H` and `WXH`).
fn parse_size(s: &str) -> Result<(u32, u32), String> {
    let (w, h) = s
        .split_once(['x', 'X', '*'])
        .ok_or_else(|| format!("invalid canvas size '{}' (expected WxH)", s))?;
    let w: u32 = w.trim().parse().map_err(|_| format!("invalid width in '{}'", s))?;
    let h: u32 = h.trim().parse().map_err(|_| format!("invalid height in '{}'", s))?;
    if w == 0 || h == 0 {
        return Err(format!("canvas size must be positive, got '{}'", s));
    }
    Ok((w, h))
}

/// Expand glob patterns and literal paths into a deduplicated, ordered list.
fn resolve_inputs(patterns: &[String]) -> Vec<PathBuf> {
    let mut result: Vec<PathBuf> = Vec::new();

    for pattern in patterns {
        let as_path = Path::new(pattern);

        if as_path.exists() {
            // Literal path
            if !result.iter().any(|p| p.as_path() == as_path) {
                result.push(as_path.to_path_buf());
            }
            continue;
        }

        // Treat as glob pattern
        match glob::glob(pattern) {
            Ok(entries) => {
                let mut matched = false;
                for entry in entries.flatten() {
                    if !result.contains(&entry) {
                        result.push(entry);
                    }
                    matched = true;
                }
                if !matched {
                    eprintln!("warning: pattern '{}' matched no files.", pattern);
                }
            }
            Err(e) => {
                eprintln!("warning: invalid glob '{}': {}", pattern, e);
            }
        }
    }

    result
}

/// Choose the output extension from the `--format` string or infer it from
/// the output file extension. Defaults to PNG when neither is known.
fn parse_format(format_arg: Option<&str>, output: Option<&Path>) -> &'static str {
    let name = match (format_arg, output) {
        (Some(f), _) => f.to_lowercase(),
        (None, Some(out)) => out
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase(),
        (None, None) => String::new(),
    };
    match name.as_str() {
        "jpeg" | "jpg" => "jpg",
        "bmp" => "bmp",
        "pxs" => "pxs",
        _ => "png",
    }
}

/// Compute the output path for a single input file.
///
/// Priority:
/// 1. `--output` (explicit path, used for single-file input)
/// 2. `--output-dir` (batch directory, derives filename from input stem)
/// 3. Fallback: same directory as input, same stem, new extension
///    (appends `_out` to stem if it would collide with the input path)
fn build_output_path(
    input: &Path,
    output: Option<&Path>,
    output_dir: Option<&Path>,
    ext: &str,
) -> Option<PathBuf> {
    // Explicit output path
    if let Some(out) = output {
        return Some(out.to_path_buf());
    }

    let stem = input.file_stem()?.to_string_lossy().into_owned();

    if let Some(dir) = output_dir {
        return Some(dir.join(format!("{}.{}", stem, ext)));
    }

    // Write next to the input file
    let parent = input.parent().unwrap_or(Path::new("."));
    let candidate = parent.join(format!("{}.{}", stem, ext));

    // Avoid silent overwrite of the input
    if candidate == input {
        Some(parent.join(format!("{}_out.{}", stem, ext)))
    } else {
        Some(candidate)
    }
}
