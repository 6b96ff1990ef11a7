use anyhow::Result;
use serde::Serialize;
use structopt::StructOpt;
use tokio::runtime::Runtime;

use crate::credentials::CredentialTriple;
use crate::settings::{Config, Environment, Opt};
use crate::ui::Ui;

pub mod awssdk_backend;
pub mod batch;
pub mod credentials;
pub mod error;
pub mod settings;
mod tracing;
mod ui;

/// Everything the surrounding tooling needs to open a CloudShell session.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SessionParameters<'a> {
    region: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    proxy: Option<String>,
    credentials: &'a CredentialTriple,
}

pub fn run(runtime: Runtime) -> Result<()> {
    let opt = Opt::from_args();

    let config = match opt.config {
        Some(ref path) => Config::load(path)?,
        None => Config::load_default()?,
    };

    let mut env = Environment::new();
    env.apply_config(&config);
    env.apply_cli(&opt);

    let _guard = tracing::configure(opt.verbose, &env)?;

    runtime.block_on(async {
        let ui = ui::ConsoleUi::new()?;
        let backend = awssdk_backend::SdkBackend::new(env.region());

        let proxy = env.proxy_url()?;
        if let Some(ref proxy) = proxy {
            ui.debug(&format!("routing the CloudShell connection via {}", proxy));
        }

        let creds = credentials::resolve(&env, &backend, &ui).await?;

        let session = SessionParameters {
            region: env.region(),
            proxy: proxy.map(|p| p.to_string()),
            credentials: &creds,
        };
        ui.println(&serde_json::to_string_pretty(&session)?);

        Ok(())
    })
}
