use std::env;

use abi_codec::{encode_call, Method, Param};
use vault_api::{bootstrap::build_state, config::AppConfig, telemetry};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    telemetry::init_tracing()?;

    let mut args = env::args().skip(1);
    let cmd = args.next().unwrap_or_default();

    // encoding needs no chain access
    if cmd == "encode" {
        let name = args
            .next()
            .ok_or_else(|| anyhow::anyhow!("missing method name"))?;
        let method: Method = name.parse()?;
        let values: Vec<String> = args.collect();
        let kinds = method.inputs();
        if values.len() != kinds.len() {
            anyhow::bail!(
                "{} takes {} argument(s), got {}",
                method.signature(),
                kinds.len(),
                values.len()
            );
        }
        let params = kinds
            .iter()
            .zip(&values)
            .map(|(kind, value)| Param::parse(*kind, value))
            .collect::<Result<Vec<_>, _>>()?;
        println!("{}", encode_call(method, &params)?);
        return Ok(());
    }

    let mut config = AppConfig::from_env()?;
    // one-shot commands, no background polling
    config.enable_poller = false;
    let state = build_state(&config).await?;

    match cmd.as_str() {
        "owner" => {
            let owner = state.operations.owner().await?;
            println!("vault={} owner={owner}", config.vault_address);
        }
        "snapshot" => {
            let snapshot = state.engine.refresh().await;
            println!("{}", serde_json::to_string_pretty(snapshot.as_ref())?);
        }
        "clear-metadata" => {
            let metadata = state.engine.metadata();
            let count = metadata.len().await;
            metadata.clear_all().await;
            println!(
                "cleared {count} cached token(s) from {}",
                config.metadata_cache_path.display()
            );
        }
        _ => {
            let methods = Method::all()
                .map(|method| format!("    {}", method.signature()))
                .collect::<Vec<_>>()
                .join("\n");
            eprintln!(
                "Usage: cargo run -p vault_api --bin vault_tools -- <command>\n\
                 Commands:\n  owner\n  snapshot\n  encode <method> [args...]\n  clear-metadata\n\
                 Methods:\n{methods}"
            );
        }
    }

    Ok(())
}
