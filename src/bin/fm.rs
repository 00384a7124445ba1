use blob_file_manager::client::{
    Dialog, FileManager, HttpFileApi, JsonFilePreferenceStore, PendingFile, PersistedState,
    PreferenceStore, UploadOutcome, state::SIZE_ALERT,
};
use clap::Parser;
use dotenvy::dotenv;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const HELP: &str = "\
commands:
  select <path>   choose a file to upload
  upload          upload the selected file
  list            show uploaded files
  refresh         reload the list from the server
  rename <n>      open the rename dialog for row n
  name <text>     type the new name into the rename dialog
  delete <n>      open the delete dialog for row n
  yes             confirm the open dialog
  cancel          close the open dialog
  whoami          show the display name
  iam <name>      change the display name
  quit";

#[derive(Parser, Debug)]
#[command(author, version, about = "Terminal file manager for blob-file-manager", long_about = None)]
struct Args {
    /// Server base URL
    #[arg(short, long, default_value = "http://localhost:3000")]
    server: String,

    /// Where the display-name preference is kept
    #[arg(long, default_value = ".fm_preferences.json")]
    prefs: PathBuf,
}

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Select(PathBuf),
    Upload,
    List,
    Refresh,
    Rename(usize),
    Name(String),
    Delete(usize),
    Yes,
    Cancel,
    WhoAmI,
    IAm(String),
    Help,
    Quit,
}

impl Command {
    fn parse(line: &str) -> Result<Self, String> {
        let line = line.trim();
        let (word, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
        let rest = rest.trim();
        let row = |rest: &str| {
            rest.parse::<usize>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| format!("expected a row number, got '{}'", rest))
        };

        match word {
            "select" if !rest.is_empty() => Ok(Command::Select(PathBuf::from(rest))),
            "upload" => Ok(Command::Upload),
            "list" | "ls" => Ok(Command::List),
            "refresh" => Ok(Command::Refresh),
            "rename" => row(rest).map(Command::Rename),
            "name" => Ok(Command::Name(rest.to_string())),
            "delete" | "rm" => row(rest).map(Command::Delete),
            "yes" | "y" | "save" => Ok(Command::Yes),
            "cancel" | "no" | "n" => Ok(Command::Cancel),
            "whoami" => Ok(Command::WhoAmI),
            "iam" if !rest.is_empty() => Ok(Command::IAm(rest.to_string())),
            "help" | "?" => Ok(Command::Help),
            "quit" | "exit" | "q" => Ok(Command::Quit),
            "select" | "iam" => Err(format!("'{}' needs an argument", word)),
            other => Err(format!("unknown command '{}', try 'help'", other)),
        }
    }
}

fn render(fm: &FileManager) {
    if fm.files().is_empty() {
        println!("(no files)");
    }
    for (i, url) in fm.files().iter().enumerate() {
        println!("{:>3}. {}", i + 1, url);
    }
    match fm.selection() {
        Some(file) => println!("Selected file: {} ({} bytes)", file.name, file.size()),
        None => println!("Drag 'n' drop some files here, or select one"),
    }
    match fm.dialog() {
        Dialog::None => {}
        Dialog::Rename { url, draft } => {
            println!("[Rename File] {} -> '{}'  (name <text>, yes, cancel)", url, draft)
        }
        Dialog::Delete { url } => {
            println!("[Confirm Deletion] Delete {}?  (yes, cancel)", url)
        }
    }
    if let Some(error) = fm.error() {
        println!("Error: {}", error);
    }
}

fn row_url(fm: &FileManager, n: usize) -> Option<String> {
    fm.files().get(n - 1).cloned()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fm=warn,blob_file_manager=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let prefs: Arc<dyn PreferenceStore> = Arc::new(JsonFilePreferenceStore::new(&args.prefs));
    let mut display_name = PersistedState::get_or_init(prefs, "name", "John Doe".to_string());

    let api = Arc::new(HttpFileApi::new(reqwest::Client::new(), args.server.clone()));
    let mut fm = FileManager::new(api);

    println!("Hello, {}! Connected to {}", display_name.get(), args.server);
    fm.refresh().await;
    render(&fm);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let command = match Command::parse(&line) {
            Ok(command) => command,
            Err(e) => {
                println!("{}", e);
                continue;
            }
        };

        match command {
            Command::Select(path) => match PendingFile::from_path(&path).await {
                Ok(file) => fm.select_file(file),
                Err(e) => println!("Cannot read {}: {}", path.display(), e),
            },
            Command::Upload => {
                if let UploadOutcome::TooLarge { .. } = fm.upload().await {
                    println!("{}", SIZE_ALERT);
                }
            }
            Command::List => {}
            Command::Refresh => {
                fm.refresh().await;
            }
            Command::Rename(n) => match row_url(&fm, n) {
                Some(url) => fm.open_rename(url),
                None => println!("No row {}", n),
            },
            Command::Name(text) => fm.set_draft(text),
            Command::Delete(n) => match row_url(&fm, n) {
                Some(url) => fm.open_delete(url),
                None => println!("No row {}", n),
            },
            Command::Yes => {
                if matches!(fm.dialog(), Dialog::Rename { .. }) {
                    fm.confirm_rename().await;
                } else if matches!(fm.dialog(), Dialog::Delete { .. }) {
                    fm.confirm_delete().await;
                } else {
                    println!("No dialog is open");
                }
            }
            Command::Cancel => fm.dismiss_dialog(),
            Command::WhoAmI => println!("{}", display_name.get()),
            Command::IAm(name) => display_name.set(name),
            Command::Help => println!("{}", HELP),
            Command::Quit => break,
        }
        render(&fm);
    }

    Ok(())
}
