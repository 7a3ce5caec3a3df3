use std::io::{self, BufWriter, IsTerminal, Read};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::Parser;

use http_file_runner::presenter::DEFAULT_STYLE;
use http_file_runner::{
    ClientConfig, Error, Executor, Highlight, HyperTransport, OutputOptions, Presenter,
    SyntectHighlighter,
};

/// Sends the HTTP requests of a file one after another and prints the
/// responses. Requests are separated by a line containing only `###`.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Don't print response headers
    #[arg(long)]
    hide_headers: bool,

    /// Don't print response bodies
    #[arg(long)]
    hide_body: bool,

    /// Print bodies without syntax highlighting
    #[arg(long)]
    raw: bool,

    /// Exit with the HTTP status code of the first response above 300
    #[arg(short, long)]
    fail_on_error: bool,

    /// Highlighting style
    #[arg(short, long, env = "HTTP_FILE_RUNNER_STYLE", default_value = DEFAULT_STYLE)]
    style: String,

    /// List the available highlighting styles and exit
    #[arg(long)]
    list_styles: bool,

    /// Don't follow redirects
    #[arg(long)]
    no_follow: bool,

    /// Give up after this many redirects
    #[arg(long, default_value_t = 10)]
    max_redirects: usize,

    /// Request file; stdin is read when omitted
    file: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    pretty_env_logger::init();
    let cli = Cli::parse();

    if let Err(err) = run(cli).await {
        eprintln!("Error: {err:#}");
        let code = err.downcast_ref::<Error>().map_or(1, Error::exit_code);
        std::process::exit(code);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let highlighter = SyntectHighlighter::new();

    if cli.list_styles {
        for style in highlighter.styles() {
            println!("{style}");
        }
        return Ok(());
    }

    if !cli.raw && !cli.hide_body && !highlighter.has_style(&cli.style) {
        return Err(Error::UnknownStyle(cli.style).into());
    }

    let input = read_input(cli.file.as_deref())?;

    let config = ClientConfig {
        follow_redirects: !cli.no_follow,
        max_redirects: cli.max_redirects,
        ..ClientConfig::default()
    };
    let executor = Executor::new(HyperTransport::new()?, config).fail_on_error(cli.fail_on_error);

    let options = OutputOptions {
        hide_headers: cli.hide_headers,
        hide_body: cli.hide_body,
        raw: cli.raw,
        style: cli.style,
    };
    let presenter = Presenter::new(highlighter, options);

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    http_file_runner::run(&input, &executor, &presenter, &mut out).await?;

    Ok(())
}

fn read_input(file: Option<&Path>) -> anyhow::Result<Vec<u8>> {
    if let Some(path) = file {
        return std::fs::read(path).with_context(|| format!("failed to read {}", path.display()));
    }

    let mut stdin = io::stdin();
    if stdin.is_terminal() {
        bail!("no input: pass a request file or pipe requests into stdin");
    }

    let mut input = Vec::new();
    stdin.read_to_end(&mut input).context("failed to read stdin")?;
    Ok(input)
}
