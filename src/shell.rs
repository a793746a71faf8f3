//! Simulator shell
//!
//! Drives the manager against the fake providers, interactively or as a
//! single batch command. One line per command; command output goes to
//! stdout, errors to stderr. Batch invocations exit nonzero on error.

use crate::config::Class;
use crate::domain::ports::StorageProvider as _;
use crate::error::{Error, Result};
use crate::manager::Manager;
use crate::provider::FakeStorageProvider;
use crate::topology::StorageNode;
use std::fmt::Write as _;
use std::io::Write as _;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

/// Command dispatcher over a manager and its fake storage backend
pub struct Shell {
    manager: Arc<Manager>,
    storage: Arc<FakeStorageProvider>,
}

impl Shell {
    pub fn new(manager: Arc<Manager>, storage: Arc<FakeStorageProvider>) -> Self {
        Self { manager, storage }
    }

    /// Read commands from stdin until EOF or `quit`
    pub async fn run_interactive(&self) -> Result<()> {
        println!("Rico Simulator");
        prompt()?;

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Some(line) = lines.next_line().await? {
            let argv: Vec<&str> = line.split_whitespace().collect();
            if argv.is_empty() {
                prompt()?;
                continue;
            }
            if matches!(argv[0], "quit" | "q" | "exit") {
                break;
            }
            match self.execute(&argv).await {
                Ok(output) if output.is_empty() => {}
                Ok(output) => println!("{output}"),
                Err(e) => eprintln!("ERROR: {e}"),
            }
            prompt()?;
        }
        Ok(())
    }

    /// Execute one command, returning its printable output
    pub async fn execute(&self, argv: &[&str]) -> Result<String> {
        let (command, args) = argv
            .split_first()
            .ok_or_else(|| Error::InvalidArgument("empty command".into()))?;

        match *command {
            "node-add" | "na" => self.node_add(args),
            "utilization-set" | "us" => self.utilization_set(args).await,
            "topology" | "t" => self.topology().await,
            "reconcile" | "r" => self.reconcile().await,
            "class-list" | "c" | "classes" => Ok(self.class_list().await),
            "class-add" | "ca" => self.class_add(args).await,
            "class-delete" | "cd" => self.class_delete(args).await,
            "status" => self.status().await,
            other => Err(Error::InvalidArgument(format!(
                "unknown command: {other}"
            ))),
        }
    }

    fn node_add(&self, args: &[&str]) -> Result<String> {
        let id = args
            .first()
            .ok_or_else(|| Error::InvalidArgument("node-add <id>".into()))?;
        self.storage.node_add(StorageNode::new(*id));
        Ok("OK".into())
    }

    async fn utilization_set(&self, args: &[&str]) -> Result<String> {
        let [name, value] = args else {
            return Err(Error::InvalidArgument(
                "utilization-set <class> <int>".into(),
            ));
        };
        let utilization: u32 = value
            .parse()
            .map_err(|_| Error::InvalidArgument(format!("bad utilization: {value}")))?;

        let config = self.manager.config().await;
        let class = config
            .get(name)
            .ok_or_else(|| Error::ClassNotFound {
                name: (*name).into(),
            })?;
        self.storage.set_utilization(class, utilization);
        Ok("OK".into())
    }

    async fn topology(&self) -> Result<String> {
        let topology = self.storage.get_topology().await?;
        let config = self.manager.config().await;
        Ok(topology.render(&config))
    }

    async fn reconcile(&self) -> Result<String> {
        self.manager.reconcile().await?;
        Ok("OK".into())
    }

    async fn class_list(&self) -> String {
        let config = self.manager.config().await;
        let mut out = String::new();
        for class in config.classes() {
            let _ = writeln!(
                out,
                "{}: Max:{} Min:{} Size:{} WH:{} WL:{} Params:{:?}",
                class.name,
                class.maximum_total_size_gb,
                class.minimum_total_size_gb,
                class.disk_size_gb,
                class.watermark_high,
                class.watermark_low,
                class.parameters,
            );
        }
        out.trim_end().to_string()
    }

    async fn class_add(&self, args: &[&str]) -> Result<String> {
        let class = parse_class(args)?;
        let mut config = self.manager.config().await;
        config.insert(class)?;
        self.manager.set_config(config).await?;
        Ok("OK".into())
    }

    async fn class_delete(&self, args: &[&str]) -> Result<String> {
        let name = args
            .first()
            .ok_or_else(|| Error::InvalidArgument("class-delete <name>".into()))?;
        let mut config = self.manager.config().await;
        config.remove(name)?;
        self.manager.set_config(config).await?;
        Ok("OK".into())
    }

    async fn status(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.manager.status().await)?)
    }
}

fn prompt() -> Result<()> {
    print!("> ");
    std::io::stdout().flush()?;
    Ok(())
}

/// Parse `key=value` pairs into a class: name, wh, wl, size, max, min
fn parse_class(args: &[&str]) -> Result<Class> {
    let mut name = None;
    let mut watermark_high = None;
    let mut watermark_low = None;
    let mut disk_size_gb = None;
    let mut maximum_total_size_gb = None;
    let mut minimum_total_size_gb = None;

    for param in args {
        let (key, value) = param.split_once('=').ok_or_else(|| {
            Error::InvalidArgument(format!("bad param (expected key=value): {param}"))
        })?;
        match key.to_lowercase().as_str() {
            "name" => name = Some(value.to_string()),
            "wh" => watermark_high = Some(parse_int::<u32>("wh", value)?),
            "wl" => watermark_low = Some(parse_int::<u32>("wl", value)?),
            "size" => disk_size_gb = Some(parse_int::<i64>("size", value)?),
            "max" => maximum_total_size_gb = Some(parse_int::<i64>("max", value)?),
            "min" => minimum_total_size_gb = Some(parse_int::<i64>("min", value)?),
            other => {
                return Err(Error::InvalidArgument(format!("unknown key: {other}")));
            }
        }
    }

    Ok(Class {
        name: name.ok_or_else(|| Error::InvalidArgument("name missing: name=<name>".into()))?,
        watermark_high: watermark_high
            .ok_or_else(|| Error::InvalidArgument("watermark missing: wh=<int>".into()))?,
        watermark_low: watermark_low
            .ok_or_else(|| Error::InvalidArgument("watermark missing: wl=<int>".into()))?,
        disk_size_gb: disk_size_gb
            .ok_or_else(|| Error::InvalidArgument("size missing: size=<int>".into()))?,
        maximum_total_size_gb: maximum_total_size_gb
            .ok_or_else(|| Error::InvalidArgument("max missing: max=<int>".into()))?,
        minimum_total_size_gb: minimum_total_size_gb
            .ok_or_else(|| Error::InvalidArgument("min missing: min=<int>".into()))?,
        parameters: Default::default(),
    })
}

fn parse_int<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| Error::InvalidArgument(format!("bad integer for {key}: {value}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::provider::FakeCloudProvider;
    use crate::topology::Topology;

    fn shell() -> Shell {
        let cloud = Arc::new(FakeCloudProvider::new());
        let storage = Arc::new(FakeStorageProvider::new(Topology::default()));
        let manager =
            Arc::new(Manager::new(Config::empty(), cloud, storage.clone()).unwrap());
        Shell::new(manager, storage)
    }

    #[tokio::test]
    async fn test_class_add_and_list() {
        let shell = shell();

        let output = shell
            .execute(&[
                "class-add", "name=gp2", "wh=75", "wl=25", "size=8", "max=1024", "min=32",
            ])
            .await
            .unwrap();
        assert_eq!(output, "OK");

        let listing = shell.execute(&["class-list"]).await.unwrap();
        assert!(listing.starts_with("gp2: Max:1024 Min:32 Size:8 WH:75 WL:25"));
    }

    #[tokio::test]
    async fn test_class_add_missing_key() {
        let shell = shell();
        let err = shell
            .execute(&["class-add", "name=gp2", "wh=75"])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn test_class_add_rejects_bad_watermarks() {
        let shell = shell();
        let err = shell
            .execute(&[
                "class-add", "name=gp2", "wh=25", "wl=75", "size=8", "max=1024", "min=32",
            ])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ConfigInvalid { .. }));
    }

    #[tokio::test]
    async fn test_class_delete_unknown() {
        let shell = shell();
        let err = shell.execute(&["class-delete", "gp2"]).await.unwrap_err();
        assert!(matches!(err, Error::ClassNotFound { .. }));
    }

    #[tokio::test]
    async fn test_utilization_set_unknown_class() {
        let shell = shell();
        let err = shell
            .execute(&["utilization-set", "gp2", "80"])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ClassNotFound { .. }));
    }

    #[tokio::test]
    async fn test_node_add_and_topology() {
        let shell = shell();
        shell.execute(&["node-add", "one"]).await.unwrap();
        shell
            .execute(&[
                "class-add", "name=gp2", "wh=75", "wl=25", "size=8", "max=1024", "min=0",
            ])
            .await
            .unwrap();

        let rendered = shell.execute(&["topology"]).await.unwrap();
        assert!(rendered.starts_with("TOPOLOGY\nC[gp2|0] \nN[one|0]: "));
    }

    #[tokio::test]
    async fn test_reconcile_grows_simulated_cluster() {
        let shell = shell();
        shell.execute(&["node-add", "one"]).await.unwrap();
        shell
            .execute(&[
                "class-add", "name=gp2", "wh=75", "wl=25", "size=8", "max=1024", "min=32",
            ])
            .await
            .unwrap();

        // total 0 < min 32 forces growth on an empty node
        assert_eq!(shell.execute(&["reconcile"]).await.unwrap(), "OK");

        let rendered = shell.execute(&["t"]).await.unwrap();
        assert!(rendered.contains("N[one|1]:"));
    }

    #[tokio::test]
    async fn test_aliases_match_full_commands() {
        let shell = shell();
        shell.execute(&["na", "one"]).await.unwrap();
        assert!(shell.execute(&["t"]).await.unwrap().starts_with("TOPOLOGY"));
        assert!(shell.execute(&["c"]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_command() {
        let shell = shell();
        assert!(shell.execute(&["bogus"]).await.is_err());
    }

    #[tokio::test]
    async fn test_status_is_json() {
        let shell = shell();
        let output = shell.execute(&["status"]).await.unwrap();
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["reconcile_count"], 0);
    }
}
