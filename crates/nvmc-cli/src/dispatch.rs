use std::io;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use nvmc_core::{InstallOptions, Settings};
use nvmc_installer::{
    activate, current_version, default_user_agent, default_user_root, list_versions, uninstall,
    ActivationStatus, HomeLayout, HttpFetcher, Installer,
};
use tracing::{debug, warn};

use crate::completion::{resolve_completion_shell, write_completions_script};
use crate::render::{
    format_install_lines, format_list_json, format_list_lines, format_uninstall_lines,
    TerminalRenderer,
};
use crate::{Cli, Commands};

/// Layout and effective settings for one invocation.
pub(crate) struct CliContext {
    pub(crate) layout: HomeLayout,
    pub(crate) settings: Settings,
}

impl CliContext {
    pub(crate) fn resolve<F>(
        home: Option<PathBuf>,
        download_url: Option<String>,
        lookup: F,
    ) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let root = match home {
            Some(home) => home,
            None => default_user_root()?,
        };
        let layout = HomeLayout::new(root);
        let mut settings = Settings::load(&layout.settings_path())?.with_env_overrides(lookup);

        if let Some(url) = download_url {
            let url = url.trim().trim_end_matches('/');
            if url.is_empty() {
                bail!("--download-url must not be empty");
            }
            settings.download_url = url.to_string();
        }

        debug!(
            root = %layout.root().display(),
            download_url = %settings.download_url,
            "resolved configuration"
        );
        Ok(Self { layout, settings })
    }

    pub(crate) fn install_options(
        &self,
        activate: bool,
        skip_checksum: bool,
        force: bool,
    ) -> InstallOptions {
        InstallOptions {
            skip_checksum: skip_checksum || self.settings.skip_checksum,
            activate,
            force,
        }
    }
}

pub(crate) fn run_cli(cli: Cli) -> Result<()> {
    let renderer = TerminalRenderer::current();
    let Cli {
        download_url,
        home,
        command,
        ..
    } = cli;
    let resolve_context =
        move || CliContext::resolve(home, download_url, |key| std::env::var(key).ok());

    match command {
        Commands::Install {
            version,
            activate,
            skip_checksum,
            force,
        } => {
            let context = resolve_context()?;
            let options = context.install_options(activate, skip_checksum, force);
            run_install(&context, &version, options, renderer)
        }
        Commands::Use { version } => {
            let context = resolve_context()?;
            let version = activate(&context.layout, &version)?;
            renderer.print_status("ok", &format!("now using node {version}"));
            Ok(())
        }
        Commands::List { json } => run_list(&resolve_context()?, json, renderer),
        Commands::Current => match current_version(&resolve_context()?.layout)? {
            Some(version) => {
                println!("{version}");
                Ok(())
            }
            None => bail!("no node version is activated"),
        },
        Commands::Uninstall { version } => {
            let context = resolve_context()?;
            let report = uninstall(&context.layout, &version)?;
            renderer.print_lines(&format_uninstall_lines(&report, renderer.style()));
            Ok(())
        }
        Commands::Completions { shell } => {
            let shell = resolve_completion_shell(
                shell,
                std::env::var("SHELL").ok().as_deref(),
                cfg!(windows),
            );
            write_completions_script(shell, &mut io::stdout().lock())
        }
    }
}

fn run_install(
    context: &CliContext,
    version: &str,
    options: InstallOptions,
    renderer: TerminalRenderer,
) -> Result<()> {
    let user_agent = context
        .settings
        .user_agent
        .clone()
        .unwrap_or_else(default_user_agent);
    let progress = renderer.start_download("download");
    let mut fetcher = HttpFetcher::with_user_agent(&user_agent)?;
    if let Some(callback) = progress.callback() {
        fetcher = fetcher.with_progress(callback);
    }

    let installer = Installer::new(
        &context.layout,
        &fetcher,
        context.settings.download_url.as_str(),
    );
    let report = match installer.install(version, options) {
        Ok(report) => {
            progress.finish_success();
            report
        }
        Err(err) => {
            progress.finish_abandon();
            return Err(err).with_context(|| format!("failed to install {version}"));
        }
    };

    renderer.print_lines(&format_install_lines(&report, renderer.style()));
    match report.activation {
        ActivationStatus::Failed(err) => Err(anyhow::Error::new(err).context(format!(
            "{} is installed but could not be activated",
            report.version
        ))),
        _ => Ok(()),
    }
}

fn run_list(context: &CliContext, json: bool, renderer: TerminalRenderer) -> Result<()> {
    let versions = list_versions(&context.layout)?;
    let current = current_version(&context.layout).unwrap_or_else(|err| {
        warn!(kind = err.kind(), error = %err, "could not read activation link");
        None
    });

    if json {
        println!("{}", format_list_json(&versions, current.as_ref()));
        return Ok(());
    }
    if versions.is_empty() {
        bail!("no versions installed");
    }

    renderer.print_lines(&format_list_lines(
        &versions,
        current.as_ref(),
        renderer.style(),
    ));
    Ok(())
}
