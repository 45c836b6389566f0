mod pipeline;

use std::path::PathBuf;
use std::process::exit;

use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use anyhow::Result;

use suru_backend::app_settings::AppSettings;
use suru_backend::lexeme_creator::AddLexemeRequest;
use suru_backend::logger;

#[derive(Parser, Debug)]
#[command(author, version, about = "SURU dictionary to Wikidata pipeline", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Log level: silent, error, warn, info or debug.
    #[arg(long, global = true, env = "LOG_LEVEL")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Pretty-print the XML files and write the merged entry template
    #[command(arg_required_else_help = true)]
    Overview {
        /// Directory with the SURU XML files
        #[arg(value_name = "XML_DIR")]
        source_dir: PathBuf,

        #[arg(long, value_name = "DIRECTORY_PATH", default_value = "02_overview_pretty")]
        pretty_dir: PathBuf,

        #[arg(long, value_name = "FILE_PATH", default_value = "02_overview_template.xml")]
        template: PathBuf,
    },

    /// Extract one row per dictionary entry
    #[command(arg_required_else_help = true)]
    Extract {
        /// Directory with the SURU XML files
        #[arg(value_name = "XML_DIR")]
        source_dir: PathBuf,

        /// Output table, tab separated for .tsv and .txt, comma separated otherwise
        #[arg(long, short, value_name = "FILE_PATH", default_value = "03_suru.tsv")]
        output: PathBuf,

        /// Also write the records as JSON, keeping absent values and groups
        #[arg(long, value_name = "FILE_PATH")]
        json: Option<PathBuf>,
    },

    /// Join the entry table with the modern Finnish word list
    #[command(arg_required_else_help = true)]
    Categorize {
        #[arg(value_name = "SURU_TABLE")]
        input: PathBuf,

        /// Word list table with a Hakusana column
        #[arg(value_name = "WORD_LIST")]
        word_list: PathBuf,

        #[arg(long, short, value_name = "FILE_PATH", default_value = "04_cat.tsv")]
        output: PathBuf,
    },

    /// Keep the categorized entries found in a word list or in the search statistics
    #[command(arg_required_else_help = true)]
    Filter {
        #[arg(value_name = "CATEGORIZED_TABLE")]
        input: PathBuf,

        /// Plain word list, one word per line
        #[arg(value_name = "WORD_LIST")]
        word_list: PathBuf,

        /// Search statistics table with Label and Searches columns
        #[arg(value_name = "SEARCHES")]
        searches: PathBuf,

        #[arg(long, value_name = "FILE_PATH", default_value = "05_suom_lista.tsv")]
        word_list_output: PathBuf,

        #[arg(long, value_name = "FILE_PATH", default_value = "05_vanligaste.tsv")]
        searches_output: PathBuf,
    },

    /// Look up Wikidata lexemes and items for each row
    #[command(arg_required_else_help = true)]
    MatchLexemes {
        #[arg(value_name = "FILTERED_TABLE")]
        input: PathBuf,

        /// Defaults to the input name with 05 replaced by 06
        #[arg(long, short, value_name = "FILE_PATH")]
        output: Option<PathBuf>,

        /// Rows between checkpoint writes
        #[arg(long, env = "CHECKPOINT_INTERVAL")]
        checkpoint_interval: Option<usize>,
    },

    /// Create a lexeme, or complete an existing one, on Wikidata
    #[command(arg_required_else_help = true)]
    CreateLexeme {
        /// Language code of the lemma (fi or sv)
        #[arg(long, default_value = "fi")]
        lang: String,

        lemma: String,

        /// noun or adjective
        category: String,

        #[arg(long)]
        suru_id: Option<String>,

        #[arg(long)]
        sv_gloss: Option<String>,

        /// Item the Swedish sense refers to
        #[arg(long)]
        betydelse_objekt: Option<String>,
    },

    /// Serve the lexeme creator over HTTP
    Serve {
        #[arg(long, env = "API_ADDRESS")]
        address: Option<String>,

        #[arg(long, env = "API_PORT")]
        port: Option<u16>,
    },
}

fn main() {
    if dotenv().is_err() {
        println!("Info: No .env file found or failed to load.");
    }

    let cli = Cli::parse();

    if let Some(level) = &cli.log_level {
        if !logger::set_log_level_str(level) {
            eprintln!("Warning: unknown log level '{}'", level);
        }
    }

    let mut settings = AppSettings::from_env();

    let command_result: Result<()> = match cli.command {
        Commands::Overview { source_dir, pretty_dir, template } => {
            pipeline::overview(&source_dir, &pretty_dir, &template)
        }

        Commands::Extract { source_dir, output, json } => {
            pipeline::extract(&source_dir, &output, json.as_deref())
        }

        Commands::Categorize { input, word_list, output } => {
            pipeline::categorize(&input, &word_list, &output)
        }

        Commands::Filter { input, word_list, searches, word_list_output, searches_output } => {
            pipeline::filter(&input, &word_list, &searches, &word_list_output, &searches_output)
        }

        Commands::MatchLexemes { input, output, checkpoint_interval } => {
            if let Some(n) = checkpoint_interval {
                settings.checkpoint_interval = n.max(1);
            }
            let output = output.unwrap_or_else(|| pipeline::default_match_output(&input));
            pipeline::match_lexemes(&input, &output, &settings)
        }

        Commands::CreateLexeme { lang, lemma, category, suru_id, sv_gloss, betydelse_objekt } => {
            let req = AddLexemeRequest {
                lang,
                lemma,
                category,
                suru_id,
                sv_gloss,
                sense_item: betydelse_objekt,
            };
            pipeline::create_lexeme(&req, &settings)
        }

        Commands::Serve { address, port } => {
            if let Some(address) = address {
                settings.api_address = address;
            }
            if let Some(port) = port {
                settings.api_port = port;
            }
            suru_api::start_webserver(&settings)
        }
    };

    if let Err(e) = command_result {
        eprintln!("Error executing command: {:#}", e);
        exit(1);
    }
}
