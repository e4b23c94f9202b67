//! CLI for streplace.

use anyhow::{Context, Result, bail};
use clap::{ArgAction, Parser};
use std::io::{self, Read, Write};
use std::path::Path;
use std::process::ExitCode;
use streplace::config::{C_EXTENSIONS, HTML_EXTENSIONS};
use streplace::prelude::*;
use streplace::rule::decode_escapes;
use streplace::ruleset::STDIN_PATH;
use tracing::warn;
use tracing_subscriber::EnvFilter;

const RULE_HELP: &str = "\
Rules:
  - A rule is of the form FOO=BAR which replaces FOO by BAR. FOO is a regular
    expression by default (unless -x is specified).
  - Use C escape sequences like \\n \\t \\xff. Use \\\\ to get a verbatim backslash.
    Protect backslashes from the shell with single quotes.
  - Use 'IMG([0-9]*).jpeg=pic$1.jpg' to reuse subexpressions ($& for the whole
    match, $1..$9 for groups, $$ for a verbatim $).
  - Arguments after -- are always files or directories.
  - A single - as path filters stdin to stdout.";

#[derive(Parser)]
#[command(name = "streplace")]
#[command(
    author,
    version,
    about = "Replace strings in files, filenames and symbolic links, in place, recursively",
    long_about = None,
    after_help = RULE_HELP
)]
struct Cli {
    /// Rules (FOO=BAR) followed by files and directories
    #[arg(value_name = "RULES_AND_PATHS")]
    args: Vec<String>,

    /// Files and directories, never taken as rules
    #[arg(last = true, value_name = "PATHS")]
    paths: Vec<String>,

    /// Recursively process directories
    #[arg(short, long, help_heading = "File options")]
    recursive: bool,

    /// Follow symbolic links
    #[arg(short = 'l', long = "follow-links", help_heading = "File options")]
    follow_links: bool,

    /// Process all files and directories; '.git' directories are skipped by default
    #[arg(long, help_heading = "File options")]
    all: bool,

    /// Process only files with an extension in the comma separated LIST
    #[arg(
        short = 'o',
        long = "only",
        value_name = "LIST",
        value_delimiter = ',',
        help_heading = "File options"
    )]
    only: Vec<String>,

    /// Same as -o html,htm,shtml,dhtml
    #[arg(short = 'H', long, help_heading = "File options")]
    html_only: bool,

    /// Same as -o with the usual C/C++ source and header extensions
    #[arg(short = 'C', long, help_heading = "File options")]
    c_only: bool,

    /// Skip files and directories that can't be read, written or renamed
    #[arg(short = 'E', long, help_heading = "File options")]
    ignore_errors: bool,

    /// Skip files larger than N megabytes (0 = unlimited)
    #[arg(
        short = 'M',
        long = "max-filesize",
        value_name = "N",
        default_value_t = 0,
        help_heading = "File options"
    )]
    max_filesize: u64,

    /// Ignore case
    #[arg(short, long, help_heading = "Matching options")]
    ignore_case: bool,

    /// Match the left side of each rule as a plain string, not as a regex
    #[arg(short = 'x', long = "no-regex", help_heading = "Matching options")]
    no_regex: bool,

    /// Match only whole words
    #[arg(short, long, help_heading = "Matching options")]
    whole_words: bool,

    /// Separate the sides of a rule with SEP
    #[arg(
        long,
        value_name = "SEP",
        default_value = "=",
        help_heading = "Matching options"
    )]
    equals: String,

    /// Introduce placeholders in right sides with MARK
    #[arg(
        long,
        value_name = "MARK",
        default_value = "$",
        help_heading = "Matching options"
    )]
    dollar: String,

    /// Rename files and directories in addition to modifying file contents
    #[arg(short = 'A', long, help_heading = "Renaming options")]
    rename: bool,

    /// Rename files and directories, do not modify file contents
    #[arg(short = 'N', long, help_heading = "Renaming options")]
    rename_only: bool,

    /// Modify the targets of symbolic links instead of contents and names
    #[arg(short = 's', long, help_heading = "Renaming options")]
    modify_symlinks: bool,

    /// Replace existing entries during rename and allow control chars in names
    #[arg(short, long, help_heading = "Renaming options")]
    force: bool,

    /// Increase verbosity (repeat for more)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Do not write or change anything
    #[arg(short = 'd', long = "dummy-mode", short_alias = '0')]
    dummy: bool,

    /// Do not write anything, print matching lines with highlighted replacements
    #[arg(
        short = 'P',
        long,
        visible_alias = "dummy-linetrace",
        short_alias = 'L'
    )]
    preview: bool,

    /// Do not write anything, print whole matching files with highlighted replacements
    #[arg(short = 'T', long = "dummy-trace")]
    dummy_trace: bool,

    /// Context lines for --preview (-1 = whole file, +N hides separators)
    #[arg(
        long,
        value_name = "N",
        default_value = "1",
        allow_hyphen_values = true
    )]
    context: ContextLines,

    /// Do not colorize output
    #[arg(short = 'Q', long, help_heading = "Color options")]
    no_color: bool,

    /// Escape sequence switching to bold
    #[arg(long, value_name = "SEQ", help_heading = "Color options")]
    color_bold: Option<String>,

    /// Escape sequence switching to thin (separators)
    #[arg(long, value_name = "SEQ", help_heading = "Color options")]
    color_thin: Option<String>,

    /// Escape sequence switching back to normal
    #[arg(
        long,
        value_name = "SEQ",
        alias = "color-nor",
        help_heading = "Color options"
    )]
    color_normal: Option<String>,

    /// Print the final statistics as JSON
    #[arg(long)]
    json: bool,
}

impl Cli {
    fn config(&self) -> Result<Config> {
        let mode = Mode::from_flags(self.rename, self.rename_only, self.modify_symlinks)?;

        let mut extensions = self.only.clone();
        if self.html_only {
            extensions.extend(HTML_EXTENSIONS.iter().map(|e| e.to_string()));
        }
        if self.c_only {
            extensions.extend(C_EXTENSIONS.iter().map(|e| e.to_string()));
        }
        extensions.retain(|e| !e.is_empty());

        let preview = self.preview || self.dummy_trace;
        let context = if self.dummy_trace {
            ContextLines::WholeFile
        } else {
            self.context
        };

        let config = Config {
            recursive: self.recursive,
            follow_symlinks: self.follow_links,
            all: self.all,
            ignore_case: self.ignore_case,
            literal: self.no_regex,
            whole_words: self.whole_words,
            separator: self.equals.clone(),
            placeholder: self.dollar.clone(),
            mode,
            dummy: self.dummy || preview,
            preview,
            context,
            verbosity: self.verbose,
            extensions,
            ignore_errors: self.ignore_errors,
            force: self.force,
            max_file_size: None,
            style: self.style(),
        };
        Ok(config.max_file_size_mb(self.max_filesize))
    }

    fn style(&self) -> RenderStyle {
        let mut style = if self.no_color {
            RenderStyle::plain()
        } else {
            RenderStyle::default()
        };
        if let Some(seq) = &self.color_bold {
            style.bold = decode_marker(seq);
        }
        if let Some(seq) = &self.color_thin {
            style.thin = decode_marker(seq);
        }
        if let Some(seq) = &self.color_normal {
            style.normal = decode_marker(seq);
        }
        style
    }

    /// Positional arguments with `--` put back in front of the trailing paths.
    fn positional(&self) -> Vec<String> {
        let mut args = self.args.clone();
        if !self.paths.is_empty() {
            args.push("--".to_string());
            args.extend(self.paths.iter().cloned());
        }
        args
    }
}

fn decode_marker(seq: &str) -> String {
    String::from_utf8_lossy(&decode_escapes(seq).bytes).into_owned()
}

fn init_tracing(verbosity: u8) {
    // RUST_LOG overrides; -vvv => debug; else warnings only
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if verbosity >= 3 {
            "streplace=debug"
        } else {
            "streplace=warn"
        })
    });
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .without_time()
        .try_init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("streplace: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    let config = cli.config()?;
    let mut set = RuleSetBuilder::new(&config).build(&cli.positional())?;

    // stdout carries the filtered data when reading stdin
    if set.paths.iter().any(|p| p == Path::new(STDIN_PATH)) {
        if config.verbosity >= 2 {
            list_rules(&mut io::stderr().lock(), &set.rules)?;
        }
        return filter_stdin(&config, &mut set);
    }
    if config.verbosity >= 2 {
        list_rules(&mut io::stdout().lock(), &set.rules)?;
    }
    if set.paths.is_empty() {
        warn!("no files or directories given");
    }
    if config.dummy && config.verbosity >= 1 {
        writeln!(io::stdout(), "Dummy mode: nothing will be written.")?;
    }

    let mut walker = Walker::new(
        &config,
        &mut set.rules,
        ConsoleReporter::new(config.verbosity),
    );
    for path in &set.paths {
        walker
            .process(path)
            .with_context(|| format!("processing '{}'", path.display()))?;
    }
    let (stats, _) = walker.into_parts();

    let mut stdout = io::stdout().lock();
    if config.verbosity >= 2 {
        writeln!(stdout, "Matches per rule:")?;
        for rule in &set.rules {
            writeln!(stdout, "  {:>8}  {rule}", rule.match_count())?;
        }
    }
    if config.verbosity >= 1 {
        writeln!(stdout, "{stats}")?;
    }
    if cli.json {
        writeln!(stdout, "{}", serde_json::to_string_pretty(&stats)?)?;
    }
    stdout.flush()?;
    Ok(())
}

fn list_rules(out: &mut impl Write, rules: &[Rule]) -> io::Result<()> {
    writeln!(out, "Rules:")?;
    for rule in rules {
        writeln!(out, "  {rule}")?;
    }
    Ok(())
}

/// Applies the rules to stdin and writes the result to stdout.
fn filter_stdin(config: &Config, set: &mut RuleSet) -> Result<()> {
    if !set.is_stdin_filter() {
        bail!("'{STDIN_PATH}' can't be combined with other paths");
    }
    if config.mode != Mode::Content {
        return Err(StreplaceError::ConflictingModes(
            "renaming and symlink modes make no sense when filtering stdin".into(),
        )
        .into());
    }
    if config.dummy {
        return Err(StreplaceError::ConflictingModes(
            "dummy and preview modes make no sense when filtering stdin".into(),
        )
        .into());
    }

    let mut input = Vec::new();
    io::stdin()
        .lock()
        .read_to_end(&mut input)
        .context("reading stdin")?;
    let sub = Engine::new(config.whole_words).apply_all(&mut set.rules, &input);

    let mut stdout = io::stdout().lock();
    stdout.write_all(&sub.output).context("writing stdout")?;
    stdout.flush().context("writing stdout")?;
    Ok(())
}
