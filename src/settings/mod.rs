use anyhow::Result;
use std::path::PathBuf;
use structopt::StructOpt;
use url::Url;

use crate::error::usage_error;

pub use config::{Config, DebugConfig};

mod config;

/// Region used when neither the config file nor the command line names one.
pub const DEFAULT_REGION: &str = "us-east-1";

#[derive(Clone, Debug)]
pub enum Setter {
    Config,
    CommandLine,
    Environment,
}

#[derive(Clone, Debug)]
pub struct Setting<T: Clone> {
    name: String,
    modified: bool,
    setter: Setter,
    pub value: T,
}

impl<T> Setting<T>
where
    T: Clone,
{
    fn apply_value(&mut self, other: &T, setter: Setter) {
        self.modified = true;
        self.setter = setter;
        self.value = other.clone();
    }

    fn apply_value_opt(&mut self, other: &Option<T>, setter: Setter) {
        if let Some(value) = other {
            self.modified = true;
            self.setter = setter;
            self.value = value.clone();
        }
    }
}

impl<T> Setting<Option<T>>
where
    T: Clone,
{
    fn apply_opt(&mut self, other: &Option<T>, setter: Setter) {
        if let Some(value) = other {
            self.modified = true;
            self.setter = setter;
            self.value = Some(value.clone());
        }
    }
}

fn setting<T: Clone>(name: &str, value: T) -> Setting<T> {
    Setting {
        name: name.to_string(),
        modified: false,
        setter: Setter::Environment,
        value,
    }
}

/// A snapshot of everything the credential resolver needs to know. Built
/// once per invocation from defaults, then the config file, then the command
/// line; the resolver never reads configuration behind the caller's back.
#[derive(Debug)]
pub struct Environment {
    pub region: Setting<Option<String>>,
    pub profile: Setting<Option<String>>,
    pub assume_role: Setting<Option<String>>,
    pub sso: Setting<bool>,
    pub sso_region: Setting<Option<String>>,
    pub mfa_serial: Setting<Option<String>>,
    pub proxy: Setting<Option<String>>,
    pub debug_log: Setting<Option<PathBuf>>,
}

impl Environment {
    pub fn new() -> Environment {
        Environment {
            region: setting("region", None),
            profile: setting("profile", None),
            assume_role: setting("assume_role", None),
            sso: setting("sso", false),
            sso_region: setting("sso_region", None),
            mfa_serial: setting("mfa_serial", None),
            proxy: setting("proxy", None),
            debug_log: setting("debug_log", None),
        }
    }

    pub fn apply_config(&mut self, config: &Config) {
        self.region.apply_opt(&config.region, Setter::Config);
        self.profile.apply_opt(&config.profile, Setter::Config);
        self.assume_role.apply_opt(&config.assume_role, Setter::Config);
        self.sso.apply_value_opt(&config.sso, Setter::Config);
        self.sso_region.apply_opt(&config.sso_region, Setter::Config);
        self.mfa_serial.apply_opt(&config.mfa_serial, Setter::Config);
        self.proxy.apply_opt(&config.proxy, Setter::Config);
        if let Some(ref debug) = config.debug {
            self.debug_log.apply_opt(&debug.log, Setter::Config);
        }
    }

    pub fn apply_cli(&mut self, opt: &Opt) {
        self.region.apply_opt(&opt.region, Setter::CommandLine);
        self.profile.apply_opt(&opt.profile, Setter::CommandLine);
        self.assume_role
            .apply_opt(&opt.assume_role, Setter::CommandLine);
        if opt.sso {
            self.sso.apply_value(&true, Setter::CommandLine);
        }
        self.sso_region
            .apply_opt(&opt.sso_region, Setter::CommandLine);
        self.mfa_serial
            .apply_opt(&opt.mfa_serial, Setter::CommandLine);
        self.proxy.apply_opt(&opt.proxy, Setter::CommandLine);
    }

    /// The configured region, or [`DEFAULT_REGION`] if none is set.
    pub fn region(&self) -> String {
        self.region
            .value
            .clone()
            .unwrap_or_else(|| DEFAULT_REGION.to_string())
    }

    pub fn profile(&self) -> Option<String> {
        self.profile.value.clone()
    }

    pub fn assume_role(&self) -> Option<String> {
        non_empty(&self.assume_role.value)
    }

    pub fn sso(&self) -> bool {
        self.sso.value
    }

    pub fn sso_region(&self) -> Option<String> {
        non_empty(&self.sso_region.value)
    }

    pub fn mfa_serial(&self) -> Option<String> {
        non_empty(&self.mfa_serial.value)
    }

    /// The configured proxy. An empty string means "no proxy" and is
    /// normalized to `None`.
    pub fn proxy(&self) -> Option<String> {
        non_empty(&self.proxy.value)
    }

    /// The configured proxy, validated as a URL.
    pub fn proxy_url(&self) -> Result<Option<Url>> {
        match self.proxy() {
            Some(proxy) => {
                let url = Url::parse(&proxy)
                    .map_err(|e| usage_error(format!("invalid proxy `{}`: {}", proxy, e)))?;
                Ok(Some(url))
            }
            None => Ok(None),
        }
    }

    pub fn debug_log(&self) -> Option<PathBuf> {
        self.debug_log.value.clone()
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value.as_deref().filter(|v| !v.is_empty()).map(String::from)
}

#[derive(Debug, StructOpt, Default)]
#[structopt(
    name = "cloudshell-creds",
    about = "Resolves AWS credentials for opening an AWS CloudShell session."
)]
pub struct Opt {
    #[structopt(short, long = "--region")]
    pub region: Option<String>,

    #[structopt(short, long = "--profile")]
    pub profile: Option<String>,

    /// ARN of a role to assume with the resolved default credentials.
    #[structopt(short = "a", long = "--assume-role")]
    pub assume_role: Option<String>,

    /// Resolve credentials through IAM Identity Center (requires --sso-region).
    #[structopt(long = "--sso")]
    pub sso: bool,

    #[structopt(long = "--sso-region")]
    pub sso_region: Option<String>,

    /// Serial number of the MFA device to prompt a one-time code for.
    #[structopt(long = "--mfa-serial")]
    pub mfa_serial: Option<String>,

    /// Proxy to route the CloudShell connection through.
    #[structopt(long = "--proxy")]
    pub proxy: Option<String>,

    #[structopt(short, long, parse(from_os_str))]
    pub config: Option<PathBuf>,

    /// Configure verbosity of logging. By default, only errors will be logged.
    /// Repeated usages of this (e.g. `-vv`) will increase the level. The
    /// highest level is `-vvv` which corresponds to `trace`.
    #[structopt(short, long = "--verbose", parse(from_occurrences))]
    pub verbose: u8,
}
