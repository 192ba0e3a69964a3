#[cfg(test)]
#[path = "cli_test.rs"]
mod tests;

use std::env;
use std::io;
use std::path;
use std::time::Duration;

use anyhow::bail;
use anyhow::Result;
use clap::builder::PossibleValuesParser;
use clap::value_parser;
use clap::Arg;
use clap::ArgAction;
use clap::ArgMatches;
use clap::Command;
use clap_complete::generate;
use clap_complete::Generator;
use clap_complete::Shell;
use strum::VariantNames;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use yansi::Paint;

use super::progress;
use crate::configuration::Config;
use crate::configuration::ConfigKey;
use crate::domain::models::wire::RegisterUserRequest;
use crate::domain::models::ApiError;
use crate::domain::models::Event;
use crate::domain::models::Platform;
use crate::domain::models::SubmissionState;
use crate::domain::models::SubmissionStatus;
use crate::domain::services::platforms;
use crate::domain::services::ApiClient;
use crate::domain::services::AuthService;
use crate::domain::services::AuthStatus;
use crate::domain::services::ExchangeOutcome;
use crate::domain::services::SessionStore;
use crate::domain::services::SubmissionPoller;
use crate::domain::services::SubmissionTracker;
use crate::domain::services::TrackOutcome;
use crate::infrastructure::storage::StorageManager;

/// Directory the debug log is written to when `RUST_LOG` mentions solvetrack.
pub fn log_dir() -> path::PathBuf {
    if let Ok(dir) = env::var("SOLVETRACK_LOG_DIR") {
        return path::PathBuf::from(dir);
    }

    return dirs::cache_dir()
        .unwrap_or_else(env::temp_dir)
        .join("solvetrack");
}

fn print_completions<G: Generator>(gen: G, cmd: &mut Command) {
    let name = cmd.get_name().to_string();
    generate(gen, cmd, name, &mut io::stdout());
}

async fn create_config_file() -> Result<()> {
    let config_file_path_str = Config::default(ConfigKey::ConfigFile);
    let config_file_path = path::PathBuf::from(&config_file_path_str);
    if config_file_path.exists() {
        bail!(format!(
            "Config file already exists at {config_file_path_str}"
        ));
    }

    if let Some(parent) = config_file_path.parent() {
        fs::create_dir_all(parent).await?;
    }

    let mut file = fs::File::create(&config_file_path).await?;
    file.write_all(Config::serialize_default(build()).as_bytes())
        .await?;

    println!("Created default config file at {config_file_path_str}");
    return Ok(());
}

fn cancel_on_ctrl_c() -> CancellationToken {
    let cancel = CancellationToken::new();
    let token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::debug!("Ctrl-C received");
            token.cancel();
        }
    });

    return cancel;
}

fn api_client() -> ApiClient {
    let storage = StorageManager::get(&Config::get(ConfigKey::StorageFile));
    return ApiClient::new(
        SessionStore::new(storage),
        &Config::get(ConfigKey::ApiBase),
    );
}

fn poller(api: &ApiClient) -> Result<SubmissionPoller<'_>> {
    let attempts = u32::try_from(Config::get_u64(ConfigKey::PollAttempts)?)?;
    let interval = Duration::from_millis(Config::get_u64(ConfigKey::PollInterval)?);

    return Ok(SubmissionPoller::new(api)
        .with_max_attempts(attempts)
        .with_interval(interval));
}

fn string_arg(matches: &ArgMatches, name: &str) -> String {
    return matches
        .get_one::<String>(name)
        .map(|e| return e.to_string())
        .unwrap_or_default();
}

fn print_status(status: &SubmissionStatus) {
    let state = match status.status {
        SubmissionState::Completed => Paint::green(status.status.to_string()),
        SubmissionState::Pending => Paint::yellow(status.status.to_string()),
        _ => Paint::red(status.status.to_string()),
    };
    println!("Status: {state}");

    if let Some(url) = &status.github_commit_url {
        println!("Commit: {url}");
    }
    if status.is_sheet_updated() {
        println!("Sheet updated");
    }
}

fn finish_tracking(status: &SubmissionStatus) -> Result<()> {
    return match status.status {
        SubmissionState::Completed => Ok(()),
        SubmissionState::Failed => bail!("Submission failed to update the tracking sheet"),
        SubmissionState::Cancelled => bail!("Stopped waiting for the submission"),
        _ => bail!("Timed out waiting for the submission. Check it later with `track`."),
    };
}

async fn print_oauth_url(auth: &AuthService<'_>, temp_token: &str) -> Result<()> {
    let url = auth.oauth_url(temp_token).await?;
    println!("Open the following URL in your browser to connect GitHub:\n\n  {url}\n");
    println!("Then run `solvetrack exchange --wait` to finish logging in.");
    return Ok(());
}

async fn run_register(matches: &ArgMatches) -> Result<()> {
    let api = api_client();
    let auth = AuthService::new(&api);
    let temp_token = auth
        .register_user(RegisterUserRequest {
            full_name: string_arg(matches, "name"),
            email: string_arg(matches, "email"),
            group_name: string_arg(matches, "group"),
            github_repo: string_arg(matches, "repo"),
        })
        .await?;

    println!("Registered.");
    return print_oauth_url(&auth, &temp_token).await;
}

async fn run_login(matches: &ArgMatches) -> Result<()> {
    let api = api_client();
    let auth = AuthService::new(&api);
    let temp_token = auth.start_login(&string_arg(matches, "email")).await?;

    return print_oauth_url(&auth, &temp_token).await;
}

async fn run_exchange(matches: &ArgMatches) -> Result<()> {
    let api = api_client();
    let auth = AuthService::new(&api);

    let temp_token = match matches.get_one::<String>("temp-token") {
        Some(token) => token.to_string(),
        None => match api.store().temp_token().await? {
            Some(token) => token,
            None => bail!("No pending login. Run `register` or `login` first."),
        },
    };

    let outcome = if matches.get_flag("wait") {
        let interval = Duration::from_millis(Config::get_u64(ConfigKey::PollInterval)?);
        let attempts = u32::try_from(Config::get_u64(ConfigKey::PollAttempts)?)?;
        println!("Waiting for GitHub authorisation...");
        auth.wait_for_exchange(&temp_token, attempts, interval, &cancel_on_ctrl_c())
            .await?
    } else {
        auth.exchange(&temp_token).await?
    };

    match outcome {
        ExchangeOutcome::Authenticated => println!("{}", Paint::green("Authenticated")),
        ExchangeOutcome::Pending => {
            println!("GitHub authorisation is still pending. Finish it in the browser and try again.")
        }
    }

    return Ok(());
}

async fn run_complete(matches: &ArgMatches) -> Result<()> {
    let api = api_client();
    let status = AuthService::new(&api)
        .complete_from_redirect(&string_arg(matches, "url"))
        .await?;

    println!("{status}");
    return Ok(());
}

async fn run_status() -> Result<()> {
    let api = api_client();
    let status = AuthService::new(&api).status().await?;
    let identity = api.store().identity().await?;

    let status_text = match status {
        AuthStatus::Authenticated => Paint::green(status.to_string()),
        AuthStatus::NotAuthenticated => Paint::red(status.to_string()),
    };
    println!("Session: {status_text}");
    println!("API base: {}", api.api_base().await?);
    match identity {
        Some(identity) if !identity.install_id.is_empty() => {
            println!("Install: {}", identity.install_id)
        }
        Some(_) => println!("Install: registered"),
        None => println!("Install: not registered"),
    }

    return Ok(());
}

async fn run_api_base(matches: &ArgMatches) -> Result<()> {
    let api = api_client();
    match matches.subcommand() {
        Some(("set", set_matches)) => {
            api.store()
                .set_api_base(&string_arg(set_matches, "url"))
                .await?;
            println!("API base saved");
        }
        _ => {
            println!("{}", api.api_base().await?);
        }
    }

    return Ok(());
}

async fn run_submit(matches: &ArgMatches) -> Result<()> {
    let platform = match Platform::parse(&string_arg(matches, "platform")) {
        Some(platform) => platform,
        None => bail!("Unsupported platform"),
    };

    let code_path = string_arg(matches, "file");
    let code = fs::read_to_string(&code_path).await?;
    let solution = platforms::scrape(
        platform,
        &string_arg(matches, "url"),
        &code,
        &string_arg(matches, "language"),
        &string_arg(matches, "title"),
        string_arg(matches, "verdict").contains("Accepted"),
    );

    let trials = matches.get_one::<u32>("trials").copied().unwrap_or(1);
    let minutes = matches.get_one::<u32>("time").copied().unwrap_or(0);
    let wait = !matches.get_flag("no-wait");

    let api = api_client();
    let (tx, rx) = mpsc::unbounded_channel::<Event>();
    let printer = tokio::spawn(progress::print_events(rx));

    let mut tracker = SubmissionTracker::new(&api, poller(&api)?, tx);
    let res = tracker
        .run(platform, solution, trials, minutes, wait, &cancel_on_ctrl_c())
        .await;
    drop(tracker);
    printer.await?;

    return match res? {
        TrackOutcome::Rejected(reason) => bail!(reason),
        TrackOutcome::Queued(receipt) => {
            if let Some(id) = receipt.submission_id {
                println!("Submission ID: {id}");
            }
            Ok(())
        }
        TrackOutcome::Finished(status) => {
            print_status(&status);
            finish_tracking(&status)
        }
    };
}

async fn run_track(matches: &ArgMatches) -> Result<()> {
    let submission_id = string_arg(matches, "id");
    let api = api_client();
    let (tx, mut rx) = mpsc::unbounded_channel::<SubmissionStatus>();

    let printer = tokio::spawn(async move {
        let mut last = None;
        while let Some(snapshot) = rx.recv().await {
            if last != Some(snapshot.status) {
                println!("Status: {}", snapshot.status);
                last = Some(snapshot.status);
            }
        }
    });

    let status = poller(&api)?
        .poll(&submission_id, tx, &cancel_on_ctrl_c())
        .await;
    printer.await?;

    print_status(&status);
    return finish_tracking(&status);
}

fn arg_config_file() -> Arg {
    return Arg::new(ConfigKey::ConfigFile.to_string())
        .short('c')
        .long(ConfigKey::ConfigFile.to_string())
        .env("SOLVETRACK_CONFIG_FILE")
        .num_args(1)
        .help(format!(
            "Path to configuration file [default: {}]",
            Config::default(ConfigKey::ConfigFile)
        ))
        .global(true);
}

fn arg_api_base() -> Arg {
    return Arg::new(ConfigKey::ApiBase.to_string())
        .long(ConfigKey::ApiBase.to_string())
        .env("SOLVETRACK_API_BASE")
        .num_args(1)
        .help(format!(
            "Base URL of the tracking backend, used when none is stored yet. [default: {}]",
            Config::default(ConfigKey::ApiBase)
        ))
        .global(true);
}

fn arg_poll_attempts() -> Arg {
    return Arg::new(ConfigKey::PollAttempts.to_string())
        .long(ConfigKey::PollAttempts.to_string())
        .env("SOLVETRACK_POLL_ATTEMPTS")
        .num_args(1)
        .help(format!(
            "Status queries made before giving up on a submission. [default: {}]",
            Config::default(ConfigKey::PollAttempts)
        ))
        .global(true);
}

fn arg_poll_interval() -> Arg {
    return Arg::new(ConfigKey::PollInterval.to_string())
        .long(ConfigKey::PollInterval.to_string())
        .env("SOLVETRACK_POLL_INTERVAL")
        .num_args(1)
        .help(format!(
            "Milliseconds to wait before each status query. [default: {}]",
            Config::default(ConfigKey::PollInterval)
        ))
        .global(true);
}

fn arg_storage_file() -> Arg {
    return Arg::new(ConfigKey::StorageFile.to_string())
        .long(ConfigKey::StorageFile.to_string())
        .env("SOLVETRACK_STORAGE_FILE")
        .num_args(1)
        .help(format!(
            "JSON file holding the session and installation identity. [default: {}]",
            Config::default(ConfigKey::StorageFile)
        ))
        .global(true);
}

fn subcommand_completions() -> Command {
    return Command::new("completions")
        .about("Generates shell completions.")
        .arg(
            Arg::new("shell")
                .short('s')
                .long("shell")
                .help("Which shell to generate completions for.")
                .action(ArgAction::Set)
                .value_parser(value_parser!(Shell))
                .required(true),
        );
}

fn subcommand_config() -> Command {
    return Command::new("config")
        .about("Configuration file options.")
        .subcommand(
            Command::new("create").about("Saves the default config file to the configuration file path. This command will fail if the file exists already.")
        )
        .subcommand(
            Command::new("default").about("Outputs the default configuration file to stdout.")
        )
        .subcommand(
            Command::new("path").about("Returns the default path for the configuration file.")
        );
}

fn subcommand_debug() -> Command {
    return Command::new("debug")
        .about("Debug helpers for SolveTrack")
        .hide(true)
        .subcommand(
            Command::new("log-path").about("Output path to debug log file generated when running SolveTrack with environment variable RUST_LOG=solvetrack")
        )
        .subcommand(
            Command::new("enum-config").about("List all config keys as strings.")
        );
}

fn subcommand_register() -> Command {
    let field = |name: &'static str, help: &'static str| {
        return Arg::new(name).long(name).num_args(1).help(help);
    };

    return Command::new("register")
        .about("Registers a new account and prints the GitHub connect URL.")
        .arg(field("name", "Full name."))
        .arg(field("email", "Email address."))
        .arg(field("group", "Group name, e.g. G55."))
        .arg(field("repo", "GitHub repository solutions are pushed to, e.g. user/a2sv."));
}

fn subcommand_login() -> Command {
    return Command::new("login")
        .about("Starts a GitHub login for an existing account.")
        .arg(
            Arg::new("email")
                .long("email")
                .num_args(1)
                .help("Email address the account was registered with."),
        );
}

fn subcommand_exchange() -> Command {
    return Command::new("exchange")
        .about("Trades the pending login token for a session once GitHub is connected.")
        .arg(
            Arg::new("temp-token")
                .long("temp-token")
                .num_args(1)
                .help("Token printed by `register` or `login`. Defaults to the stored one."),
        )
        .arg(
            Arg::new("wait")
                .short('w')
                .long("wait")
                .action(ArgAction::SetTrue)
                .help("Keep retrying until the browser step completes."),
        );
}

fn subcommand_complete() -> Command {
    return Command::new("complete")
        .about("Stores the session carried by the URL the OAuth flow redirected to.")
        .arg(
            Arg::new("url")
                .long("url")
                .num_args(1)
                .required(true)
                .help("Full redirect URL, including its query string."),
        );
}

fn subcommand_api_base() -> Command {
    return Command::new("api-base")
        .about("Shows or saves the backend base URL.")
        .subcommand(Command::new("get").about("Prints the base URL in use."))
        .subcommand(
            Command::new("set").about("Saves a new base URL.").arg(
                Arg::new("url")
                    .num_args(1)
                    .required(true)
                    .help("Base URL, e.g. http://localhost:3000"),
            ),
        );
}

fn subcommand_submit() -> Command {
    return Command::new("submit")
        .about("Submits an accepted solution and waits until it is pushed and recorded.")
        .arg(
            Arg::new("platform")
                .short('p')
                .long("platform")
                .num_args(1)
                .required(true)
                .help("Judge the solution was accepted on.")
                .value_parser(PossibleValuesParser::new(Platform::VARIANTS)),
        )
        .arg(
            Arg::new("url")
                .short('u')
                .long("url")
                .num_args(1)
                .required(true)
                .help("Problem URL."),
        )
        .arg(
            Arg::new("file")
                .short('f')
                .long("file")
                .num_args(1)
                .required(true)
                .help("File holding the solution source."),
        )
        .arg(
            Arg::new("language")
                .short('l')
                .long("language")
                .num_args(1)
                .help("Editor language label, e.g. \"Python3\" or \"GNU C++17\"."),
        )
        .arg(
            Arg::new("title")
                .long("title")
                .num_args(1)
                .help("Problem title. Defaults to the question key."),
        )
        .arg(
            Arg::new("verdict")
                .long("verdict")
                .num_args(1)
                .default_value("Accepted")
                .help("Verdict the judge reported."),
        )
        .arg(
            Arg::new("trials")
                .long("trials")
                .num_args(1)
                .default_value("1")
                .value_parser(value_parser!(u32))
                .help("Number of attempts it took."),
        )
        .arg(
            Arg::new("time")
                .long("time")
                .num_args(1)
                .default_value("0")
                .value_parser(value_parser!(u32))
                .help("Minutes spent on the problem."),
        )
        .arg(
            Arg::new("no-wait")
                .long("no-wait")
                .action(ArgAction::SetTrue)
                .help("Return once the submission is queued."),
        );
}

fn subcommand_track() -> Command {
    return Command::new("track")
        .about("Polls a queued submission until it finishes.")
        .arg(
            Arg::new("id")
                .short('i')
                .long("id")
                .num_args(1)
                .required(true)
                .help("Submission ID."),
        );
}

pub fn build() -> Command {
    let about = format!(
        "{}\n\nVersion: {}\nCommit: {}",
        env!("CARGO_PKG_DESCRIPTION"),
        env!("CARGO_PKG_VERSION"),
        env!("VERGEN_GIT_DESCRIBE")
    );

    return Command::new("solvetrack")
        .about(about)
        .author(env!("CARGO_PKG_AUTHORS"))
        .version(env!("CARGO_PKG_VERSION"))
        .arg_required_else_help(true)
        .subcommand(subcommand_register())
        .subcommand(subcommand_login())
        .subcommand(subcommand_exchange())
        .subcommand(subcommand_complete())
        .subcommand(Command::new("logout").about("Removes the stored session."))
        .subcommand(Command::new("status").about("Shows whether a session is stored."))
        .subcommand(subcommand_api_base())
        .subcommand(subcommand_submit())
        .subcommand(subcommand_track())
        .subcommand(subcommand_completions())
        .subcommand(subcommand_config())
        .subcommand(subcommand_debug())
        .arg(arg_config_file())
        .arg(arg_api_base())
        .arg(arg_poll_attempts())
        .arg(arg_poll_interval())
        .arg(arg_storage_file());
}

pub async fn parse() -> Result<()> {
    let matches = build().get_matches();
    let res = run(&matches).await;

    if let Some(err) = res.as_ref().err().and_then(|e| return e.downcast_ref::<ApiError>()) {
        tracing::error!(status = ?err.status(), error = %err, "Command failed");
        if err.is_auth() {
            bail!("{err}\nRun `solvetrack login --email <email>` to start a new session.");
        }
    }

    return res;
}

async fn run(matches: &ArgMatches) -> Result<()> {
    match matches.subcommand() {
        Some(("debug", debug_matches)) => match debug_matches.subcommand() {
            Some(("log-path", _)) => {
                println!("{}", log_dir().join("debug.log").to_string_lossy());
            }
            Some(("enum-config", _)) => {
                println!("{}", ConfigKey::VARIANTS.join("\n"));
            }
            _ => {
                subcommand_debug().print_long_help()?;
            }
        },
        Some(("completions", subcmd_matches)) => {
            if let Some(completions) = subcmd_matches.get_one::<Shell>("shell").copied() {
                let mut app = build();
                print_completions(completions, &mut app);
            }
        }
        Some(("config", subcmd_matches)) => match subcmd_matches.subcommand() {
            Some(("create", _)) => create_config_file().await?,
            Some(("default", _)) => println!("{}", Config::serialize_default(build())),
            Some(("path", _)) => println!("{}", Config::default(ConfigKey::ConfigFile)),
            _ => subcommand_config().print_long_help()?,
        },
        Some((name, subcmd_matches)) => {
            Config::load(vec![matches, subcmd_matches]).await?;
            tracing::debug!(command = name, "Running command");

            match name {
                "register" => run_register(subcmd_matches).await?,
                "login" => run_login(subcmd_matches).await?,
                "exchange" => run_exchange(subcmd_matches).await?,
                "complete" => run_complete(subcmd_matches).await?,
                "logout" => {
                    let api = api_client();
                    AuthService::new(&api).logout().await?;
                    println!("Logged out");
                }
                "status" => run_status().await?,
                "api-base" => run_api_base(subcmd_matches).await?,
                "submit" => run_submit(subcmd_matches).await?,
                "track" => run_track(subcmd_matches).await?,
                _ => build().print_long_help()?,
            }
        }
        None => build().print_long_help()?,
    }

    return Ok(());
}
