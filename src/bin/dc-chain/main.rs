use std::process::ExitCode;

use dc_chain::{
    CancelToken, Dispatcher, Downloader, FetchContext, GitCli, Manifest, Progress, RunMode,
    RunResult, Staging, Transport,
};

mod args;
mod error;
mod logging;

use args::{ManifestSource, ValidatedArgs};
use error::{AppError, AppErrorKind};

fn main() -> ExitCode {
    let args = match args::parse() {
        Ok(args) => args,
        Err(err) => {
            err.report();
            return err.into();
        }
    };
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            if *err.error_kind() == AppErrorKind::Logging {
                err.report();
            } else {
                tracing::error!("{}", err.chain());
            }
            err.into()
        }
    }
}

fn load_manifest(source: &ManifestSource, transport: &impl Transport) -> Result<Manifest, AppError> {
    let manifest_error = |err| AppError::manifest(source.to_string(), err);
    match source {
        ManifestSource::Path(path) => Manifest::read(path).map_err(manifest_error),
        ManifestSource::Url(url) => {
            let scratch = tempfile::NamedTempFile::new().map_err(|err| manifest_error(err.into()))?;
            transport
                .download(url, scratch.path(), Progress::Silent)
                .map_err(manifest_error)?;
            Manifest::read(scratch.path()).map_err(manifest_error)
        }
    }
}

fn run(args: ValidatedArgs) -> Result<(), AppError> {
    let log_path = logging::init(&args.config.log_dir)?;
    let config = args.config;
    tracing::debug!("run log: {}", log_path.display());
    if let Some(path) = &args.config_file {
        tracing::debug!("configuration read from {}", path.display());
    }

    let cancel = CancelToken::new();
    let handler_token = cancel.clone();
    if let Err(err) = ctrlc::set_handler(move || handler_token.cancel()) {
        tracing::warn!("unable to install Ctrl-C handler: {err}");
    }

    if config.mode == RunMode::Clone {
        let git = GitCli::probe().map_err(AppError::capability)?;
        tracing::debug!("using {}", git.display());
    }

    let staging = Staging::open(&config.staging_dir).map_err(AppError::staging)?;
    let transport = Downloader::new(config.http_connect_timeout, config.http_timeout, cancel.clone())
        .map_err(|err| AppError::arg_validation(format!("unable to set up HTTP client: {err}")))?;
    let vcs = GitCli::new(config.clone_timeout, cancel.clone());

    let manifest = load_manifest(&args.manifest, &transport)?;
    tracing::info!(
        "{} component(s) listed in {}",
        manifest.components().count(),
        args.manifest
    );

    let dispatcher = Dispatcher::new(FetchContext {
        config: &config,
        staging: &staging,
        transport: &transport,
        vcs: &vcs,
        cancel: &cancel,
    });
    let report = dispatcher.run(&manifest);

    println!(
        "\n📦 {} fetched, {} already present, {} skipped in {}",
        report.fetched(),
        report.already_present(),
        report.skipped(),
        dispatcher.staging_root().display()
    );
    match report.result() {
        RunResult::Ok => {
            println!("🎉 All sources staged. Build with up to {} parallel jobs.", config.jobs);
            Ok(())
        }
        RunResult::Fail => {
            for failure in &report.failures {
                eprintln!("❌ {failure}: {}", failure.source);
            }
            if report.stopped_early {
                tracing::warn!("run stopped before the end of the manifest");
            }
            Err(AppError::fetch(report.failures.len()))
        }
    }
}
