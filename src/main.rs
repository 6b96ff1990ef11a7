use anyhow::Result;
use cloudshell_creds::run;
use tokio::runtime;

fn main() -> Result<()> {
    let runtime = runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    run(runtime)
}
