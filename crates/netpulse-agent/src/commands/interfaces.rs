//! `interfaces` command: list the interfaces the counter source can see.

use netpulse_core::default_source;

use crate::cli::GlobalOpts;
use crate::error::CliError;

pub async fn handle(_global: &GlobalOpts) -> Result<(), CliError> {
    let mut source = default_source();
    let names = source.list_interfaces().await?;

    if names.is_empty() {
        println!("(no interfaces found)");
        return Ok(());
    }
    for name in names {
        println!("{name}");
    }
    Ok(())
}
