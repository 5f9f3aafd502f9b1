//! invs config - Show the effective configuration

use clap::Args;
use serde::Serialize;
use serde_json::Value;

use crate::app::AppContext;
use crate::cli::output::{self, OutputFormat, robot_ok};
use crate::config::Config;
use crate::error::{InvError, Result};

#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// Dotted key to print (e.g. `search.text_weight`); omit for everything
    pub key: Option<String>,
}

#[derive(Debug, Serialize)]
struct EffectiveConfig<'a> {
    root: String,
    config_path: Option<String>,
    #[serde(flatten)]
    config: &'a Config,
}

/// The loaded config with store paths resolved against the root.
fn resolved(ctx: &AppContext) -> Config {
    let mut config = ctx.config.clone();
    config.store.db_path = Some(ctx.config.store.db_path(&ctx.root));
    config.store.index_path = Some(ctx.config.store.index_path(&ctx.root));
    config
}

/// Look up a dotted key in a serialized config.
pub(crate) fn lookup<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
    key.split('.')
        .filter(|part| !part.is_empty())
        .try_fold(value, |node, part| node.get(part))
}

pub fn run(ctx: &AppContext, args: &ConfigArgs) -> Result<()> {
    let config = resolved(ctx);

    if let Some(key) = &args.key {
        let tree = serde_json::to_value(&config)?;
        let value = lookup(&tree, key)
            .ok_or_else(|| InvError::Config(format!("unknown config key: {key}")))?;
        return match ctx.output_format {
            OutputFormat::Json => output::emit_json(&robot_ok(value)),
            _ => {
                match value {
                    Value::String(s) => println!("{s}"),
                    other => println!("{other}"),
                }
                Ok(())
            }
        };
    }

    if ctx.output_format.is_machine_readable() {
        let effective = EffectiveConfig {
            root: ctx.root.display().to_string(),
            config_path: ctx.config_path.as_ref().map(|p| p.display().to_string()),
            config: &config,
        };
        return output::emit_json(&robot_ok(effective));
    }

    let rendered = toml::to_string_pretty(&config)
        .map_err(|err| InvError::Serialization(format!("render config: {err}")))?;
    println!("# root: {}", ctx.root.display());
    if let Some(path) = &ctx.config_path {
        println!("# config: {}", path.display());
    }
    println!("{rendered}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_walks_dotted_keys() {
        let tree = serde_json::to_value(Config::default()).unwrap();
        assert_eq!(lookup(&tree, "search.max_limit"), Some(&Value::from(200)));
        assert_eq!(
            lookup(&tree, "embedding.backend"),
            Some(&Value::from("hash"))
        );
        assert!(lookup(&tree, "search.nope").is_none());
        assert!(lookup(&tree, "search").is_some_and(Value::is_object));
    }
}
