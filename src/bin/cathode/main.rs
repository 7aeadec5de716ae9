//! Cathode CLI - inspect and round-trip Commands archives and command streams.

use std::env;
use std::path::Path;
use std::time::Instant;

use cathode::model::{CommandStream, Commands, Composite, EntityRef, FunctionKind};
use cathode::prelude::{DecodeOptions, Diagnostic, EncodeOptions, HasherContext, Result};
use tracing_subscriber::EnvFilter;

/// Verbosity level
const LOG_QUIET: u8 = 0;
const LOG_INFO: u8 = 1;
const LOG_DEBUG: u8 = 2;
const LOG_TRACE: u8 = 3;

fn init_logging(level: u8) {
    let default = match level {
        LOG_QUIET => "error",
        LOG_INFO => "info",
        LOG_DEBUG => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).with_writer(std::io::stderr).init();
}

fn main() {
    let args: Vec<String> = env::args().collect();

    // Parse global flags
    let mut level = LOG_INFO;
    let mut parallel = true;
    let mut dictionary: Option<&str> = None;
    let mut filtered_args: Vec<&str> = Vec::new();
    let mut iter = args[1..].iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "-d" | "--dict" => match iter.next() {
                Some(path) => dictionary = Some(path.as_str()),
                None => {
                    eprintln!("Error: --dict needs a file");
                    std::process::exit(1);
                }
            },
            "-v" | "--verbose" => level = LOG_DEBUG,
            "-vv" | "--trace" => level = LOG_TRACE,
            "-q" | "--quiet" => level = LOG_QUIET,
            "-s" | "--sequential" => parallel = false,
            _ => filtered_args.push(arg),
        }
    }
    init_logging(level);

    if filtered_args.is_empty() {
        print_help();
        return;
    }

    let hasher = match dictionary {
        Some(path) => match HasherContext::with_dictionary(path) {
            Ok(hasher) => hasher,
            Err(e) => {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        },
        None => HasherContext::new(),
    };
    let decode = DecodeOptions { parallel, ..DecodeOptions::default() };
    let encode = EncodeOptions { parallel };

    let result = match filtered_args[0] {
        // Info command - counts per composite
        "info" | "i" => match filtered_args.get(1) {
            Some(path) => cmd_info(path, &hasher, &decode),
            None => usage("cathode-cli info <file.pak|file.bin>"),
        },

        // Tree command - composites and their entities
        "tree" | "t" => match filtered_args.get(1) {
            Some(path) => cmd_tree(path, filtered_args.get(2).copied(), &hasher, &decode),
            None => usage("cathode-cli tree <file> [composite]"),
        },

        // Roundtrip command - decode, encode, decode, compare
        "roundtrip" | "r" => match filtered_args.get(1) {
            Some(path) => cmd_roundtrip(path, filtered_args.get(2).copied(), &hasher, &decode, &encode),
            None => usage("cathode-cli roundtrip <file> [output]"),
        },

        // Hash command - print ShortGuids
        "hash" => {
            if filtered_args.len() < 2 {
                usage("cathode-cli hash <text>...")
            } else {
                cmd_hash(&filtered_args[1..], &hasher);
                Ok(())
            }
        }

        "help" | "h" | "-h" | "--help" => {
            print_help();
            Ok(())
        }

        // Default: if file exists, show info; otherwise error
        other => {
            if Path::new(other).exists() {
                cmd_info(other, &hasher, &decode)
            } else {
                eprintln!("Unknown command: {}", other);
                eprintln!();
                print_help();
                std::process::exit(1);
            }
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn print_help() {
    println!("cathode-cli - Commands graph toolkit");
    println!();
    println!("USAGE:");
    println!("    cathode-cli [OPTIONS] <COMMAND> [ARGS]");
    println!();
    println!("COMMANDS:");
    println!("    i, info      <file>              Show entry points and entity counts");
    println!("    t, tree      <file> [composite]  Show composites and their entities");
    println!("    r, roundtrip <file> [output]     Decode, re-encode and compare");
    println!("    hash         <text>...           Print the ShortGuid of each string");
    println!("    h, help                          Show this help");
    println!();
    println!("OPTIONS:");
    println!("    -v, --verbose       Debug output");
    println!("    -vv, --trace        Trace output");
    println!("    -q, --quiet         Errors only");
    println!("    -s, --sequential    Decode and encode on one thread");
    println!("    -d, --dict <file>   Extra known strings, one per line");
    println!();
    println!("Files ending in .bin are read as command streams, anything else as");
    println!("an archive. RUST_LOG overrides the verbosity flags.");
}

fn usage(text: &str) -> Result<()> {
    eprintln!("Error: missing argument");
    eprintln!("Usage: {}", text);
    std::process::exit(1);
}

/// Either decoded format.
#[derive(Debug, PartialEq)]
enum Graph {
    Archive(Commands),
    Stream(CommandStream),
}

impl Graph {
    fn open(path: &str, hasher: &HasherContext, options: &DecodeOptions) -> Result<(Self, Vec<Diagnostic>)> {
        let is_stream = Path::new(path)
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("bin"));
        let bytes = cathode::io::FileBytes::open(path)?;
        Self::decode(bytes.as_slice(), is_stream, hasher, options)
    }

    fn decode(data: &[u8], is_stream: bool, hasher: &HasherContext, options: &DecodeOptions) -> Result<(Self, Vec<Diagnostic>)> {
        if is_stream {
            let decoded = cathode::stream::decode(data, hasher, options)?;
            Ok((Self::Stream(decoded.value), decoded.diagnostics))
        } else {
            let decoded = cathode::pak::decode(data, hasher, options)?;
            Ok((Self::Archive(decoded.value), decoded.diagnostics))
        }
    }

    fn encode(&self, hasher: &HasherContext, options: &EncodeOptions) -> Result<Vec<u8>> {
        match self {
            Self::Archive(commands) => cathode::pak::encode(commands, hasher, options),
            Self::Stream(stream) => cathode::stream::encode(stream, hasher, options),
        }
    }

    fn is_stream(&self) -> bool {
        matches!(self, Self::Stream(_))
    }

    fn composites(&self) -> &[Composite] {
        match self {
            Self::Archive(commands) => &commands.composites,
            Self::Stream(stream) => &stream.composites,
        }
    }

    fn sort(&mut self) {
        match self {
            Self::Archive(commands) => commands.sort(),
            Self::Stream(stream) => stream.sort(),
        }
    }
}

fn cmd_info(path: &str, hasher: &HasherContext, options: &DecodeOptions) -> Result<()> {
    tracing::info!("Opening {}", path);
    let start = Instant::now();
    let (graph, diagnostics) = Graph::open(path, hasher, options)?;
    tracing::debug!("Decoded in {:.2?}", start.elapsed());

    println!("File: {}", path);
    match &graph {
        Graph::Archive(commands) => {
            println!("Format: archive");
            let entry = commands.entry_points;
            println!("Root:       {} {}", entry.root, name_of(commands.composites.as_slice(), entry.root));
            println!("Global:     {} {}", entry.global, name_of(commands.composites.as_slice(), entry.global));
            println!("Pause menu: {} {}", entry.pause_menu, name_of(commands.composites.as_slice(), entry.pause_menu));
            if !commands.trailer.is_empty() {
                println!("Trailer:    {} bytes", commands.trailer.len());
            }
        }
        Graph::Stream(stream) => {
            println!("Format: command stream");
            if let Some(root) = stream.root {
                println!("Root: {} {}", root, name_of(&stream.composites, root));
            }
        }
    }
    println!();

    let mut totals = Counts::default();
    for composite in graph.composites() {
        totals.add(composite);
    }
    println!("Composites: {}", graph.composites().len());
    println!("  Functions:  {} ({} animation, {} sequence)", totals.functions, totals.animations, totals.sequences);
    println!("  Proxies:    {}", totals.proxies);
    println!("  Aliases:    {}", totals.aliases);
    println!("  Variables:  {}", totals.variables);
    if totals.placeholders > 0 {
        println!("  Placeholders: {}", totals.placeholders);
    }
    println!("  Parameters: {}", totals.parameters);
    println!("  Links:      {}", totals.links);
    println!("  Resources:  {}", totals.resources);
    println!();
    println!("Diagnostics: {}", diagnostics.len());
    Ok(())
}

fn name_of(composites: &[Composite], id: cathode::ShortGuid) -> &str {
    composites.iter().find(|c| c.id == id).map(|c| c.name.as_str()).unwrap_or("")
}

#[derive(Default)]
struct Counts {
    functions: usize,
    animations: usize,
    sequences: usize,
    proxies: usize,
    aliases: usize,
    variables: usize,
    placeholders: usize,
    parameters: usize,
    links: usize,
    resources: usize,
}

impl Counts {
    fn add(&mut self, composite: &Composite) {
        self.functions += composite.functions.len();
        self.animations += composite.functions.iter().filter(|f| f.animation().is_some()).count();
        self.sequences += composite.functions.iter().filter(|f| f.sequence().is_some()).count();
        self.proxies += composite.proxies.len();
        self.aliases += composite.aliases.len();
        self.variables += composite.variables.len();
        self.placeholders += composite.placeholders.len();
        for entity in composite.all_entities() {
            let base = entity.base();
            self.parameters += base.parameters.len();
            self.links += base.links.len();
        }
        self.resources += cathode::relink::gather(composite).len();
    }
}

fn cmd_tree(path: &str, filter: Option<&str>, hasher: &HasherContext, options: &DecodeOptions) -> Result<()> {
    let (mut graph, _) = Graph::open(path, hasher, options)?;
    graph.sort();

    println!("File: {}", path);
    println!();
    for composite in graph.composites() {
        if let Some(filter) = filter {
            if !composite.name.to_ascii_lowercase().contains(&filter.to_ascii_lowercase()) {
                continue;
            }
        }
        println!("{} {}", composite.id, composite.name);
        let mut entities = composite.all_entities();
        entities.sort_by_key(|e| e.id());
        for entity in entities {
            print_entity(composite, entity, hasher);
        }
    }
    Ok(())
}

fn print_entity(composite: &Composite, entity: EntityRef<'_>, hasher: &HasherContext) {
    let label = match entity {
        EntityRef::Function(f) => {
            let extra = match &f.kind {
                FunctionKind::Animation(data) => format!(
                    " [{} bindings, {} float, {} event tracks]",
                    data.connections.len(),
                    data.float_tracks.len(),
                    data.event_tracks.len()
                ),
                FunctionKind::Sequence(data) => {
                    format!(" [{} entries, {} methods]", data.entries.len(), data.methods.len())
                }
                FunctionKind::Plain => String::new(),
            };
            format!("{}{}", hasher.find_string(f.function_type), extra)
        }
        EntityRef::Proxy(p) => format!("-> {} ids", p.path.len()),
        EntityRef::Alias(a) => format!("-> {} ids", a.path.len()),
        EntityRef::Variable(v) => format!("{} : {}", hasher.find_string(v.name), v.value_type),
        EntityRef::Placeholder(_) => String::new(),
    };
    let name = composite.entity_names.get(&entity.id()).map(String::as_str).unwrap_or("");
    println!("  {} {:<11} {} {}", entity.id(), entity.kind_name(), label, name);

    let base = entity.base();
    for param in &base.parameters {
        println!("      .{} = {:?}", hasher.find_string(param.name), param.value);
    }
    for link in &base.links {
        println!(
            "      {} -> {}.{}",
            hasher.find_string(link.parent_param_id),
            link.child_entity_id,
            hasher.find_string(link.child_param_id)
        );
    }
    if !base.resources.is_empty() {
        println!("      {} resource(s)", base.resources.len());
    }
}

fn cmd_roundtrip(
    path: &str,
    output: Option<&str>,
    hasher: &HasherContext,
    decode: &DecodeOptions,
    encode: &EncodeOptions,
) -> Result<()> {
    let original = std::fs::read(path)?;
    let is_stream = Path::new(path)
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("bin"));

    let start = Instant::now();
    let (first, _) = Graph::decode(&original, is_stream, hasher, decode)?;
    let bytes = first.encode(hasher, encode)?;
    let (second, _) = Graph::decode(&bytes, first.is_stream(), hasher, decode)?;
    let again = second.encode(hasher, encode)?;
    tracing::debug!("Round trip in {:.2?}", start.elapsed());

    let mut sorted_first = first;
    let mut sorted_second = second;
    sorted_first.sort();
    sorted_second.sort();

    println!("Input:           {} bytes", original.len());
    println!("Re-encoded:      {} bytes", bytes.len());
    println!("Graphs equal:    {}", sorted_first == sorted_second);
    println!("Encode stable:   {}", bytes == again);
    println!("Input identical: {}", bytes == original);

    if let Some(output) = output {
        cathode::io::write_file(output, &bytes)?;
        println!("Wrote {}", output);
    }
    if sorted_first != sorted_second || bytes != again {
        std::process::exit(2);
    }
    Ok(())
}

fn cmd_hash(texts: &[&str], hasher: &HasherContext) {
    for text in texts {
        println!("{}  {}", hasher.generate(text), text);
    }
}
