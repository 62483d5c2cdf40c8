use std::io::{self, Read, Write};

use clap::{Parser, Subcommand};
use wiretree_binary::{BinaryFormatter, BinaryParser};
use wiretree_core::{Decomposer, Node};
use wiretree_json::{JsonFormatter, JsonParser};
use wiretree_rpc::Client;

#[derive(Parser)]
#[command(name = "wiretree-cli", about = "Binary/JSON wire codec and RPC client demo")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Read JSON from stdin, write the binary wire encoding to stdout.
    Encode,
    /// Read the binary wire encoding from stdin, write JSON to stdout.
    Decode {
        #[arg(long)]
        beautify: bool,
    },
    /// Invoke a remote procedure and print its result as JSON.
    Call {
        #[arg(long)]
        addr: String,
        #[arg(long)]
        port: u16,
        #[arg(long)]
        domain: Option<String>,
        method: String,
        /// A single integer argument, if the procedure takes one.
        arg: Option<i64>,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Command::Encode => encode(),
        Command::Decode { beautify } => decode(beautify),
        Command::Call { addr, port, domain, method, arg } => call(addr, port, domain, method, arg),
    };

    if let Err(e) = result {
        tracing::error!(error = %e, "command failed");
        std::process::exit(1);
    }
}

fn encode() -> Result<(), Box<dyn std::error::Error>> {
    let mut input = String::new();
    io::stdin().read_to_string(&mut input)?;

    let mut node = Node::void();
    let mut chars = input.chars().peekable();
    JsonParser::new().parse_value(&mut chars, &mut node)?;

    let mut formatter = BinaryFormatter::new(io::stdout().lock());
    node.decompose("", &mut formatter)?;
    Ok(())
}

fn decode(beautify: bool) -> Result<(), Box<dyn std::error::Error>> {
    let mut input = Vec::new();
    io::stdin().read_to_end(&mut input)?;

    let mut node = Node::void();
    BinaryParser::new().parse_root(&mut io::Cursor::new(input), &mut node)?;

    let mut formatter = JsonFormatter::new(io::stdout().lock()).beautify(beautify);
    node.decompose("", &mut formatter)?;
    writeln!(io::stdout())?;
    Ok(())
}

fn call(
    addr: String,
    port: u16,
    domain: Option<String>,
    method: String,
    arg: Option<i64>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut client = Client::new(addr, port);
    if let Some(domain) = domain {
        client = client.with_domain(domain);
    }

    let mut result = Node::void();
    match arg {
        Some(v) => client.call(&method, &[&v], &mut result)?,
        None => client.call(&method, &[], &mut result)?,
    }

    let mut formatter = JsonFormatter::new(io::stdout().lock());
    result.decompose("", &mut formatter)?;
    writeln!(io::stdout())?;
    Ok(())
}
