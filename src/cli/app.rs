use super::fixtures::{ConsoleDispatcher, Roster};
use anyhow::{Context, Result};
use leaderboards::admin::{self, AdminCommand};
use leaderboards::{Engine, EngineContext, EngineSettings, FileStoreProvider};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

const HELP: &[&str] = &[
    "reload | info <leaderboard> | top <leaderboard> [page]",
    "list | players | join <player> | leave <player>",
    "set <player> <placeholder> <value>",
    "placeholder <params>   e.g. placeholder topname_kills_1",
    "save <leaderboard> | complete <words...> | quit",
];

pub struct App {
    engine: Engine,
    roster: Roster,
    exit: bool,
}

impl App {
    pub async fn new(
        config_dir: PathBuf,
        data_dir: PathBuf,
        fixtures: Option<&Path>,
        tick: Duration,
    ) -> Result<Self> {
        let roster = Roster::load(fixtures)?;
        let world = roster.world();
        let context = EngineContext::new(
            world.clone(),
            world.clone(),
            Arc::new(ConsoleDispatcher::new(world)),
            Arc::new(FileStoreProvider::new(data_dir)),
        );
        let settings = EngineSettings::new(config_dir).tick_interval(tick);
        let engine = Engine::start(settings, context)
            .await
            .context("failed to start leaderboard engine")?;

        Ok(Self {
            engine,
            roster,
            exit: false,
        })
    }

    pub async fn run(&mut self) -> Result<()> {
        let mut stdout = tokio::io::stdout();
        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        stdout
            .write_all(
                format!(
                    "{} leaderboards loaded, {} skipped. Type 'help' for commands.\n",
                    self.engine.len(),
                    self.engine.failures().len()
                )
                .as_bytes(),
            )
            .await?;

        while !self.exit {
            stdout.write_all(b"> ").await?;
            stdout.flush().await?;

            let Some(line) = lines.next_line().await? else {
                break;
            };
            for output in self.handle(&line).await {
                stdout.write_all(output.as_bytes()).await?;
                stdout.write_all(b"\n").await?;
            }
        }

        let written = self.engine.shutdown().await?;
        stdout
            .write_all(format!("Saved {} leaderboards.\n", written).as_bytes())
            .await?;
        stdout.flush().await?;
        Ok(())
    }

    async fn handle(&mut self, line: &str) -> Vec<String> {
        let args: Vec<&str> = line.split_whitespace().collect();
        let Some(command) = args.first().map(|c| c.to_lowercase()) else {
            return Vec::new();
        };

        match (command.as_str(), args.as_slice()) {
            ("quit" | "exit", _) => {
                self.exit = true;
                Vec::new()
            }
            ("help", _) => HELP.iter().map(|l| l.to_string()).collect(),
            ("list", _) => self
                .engine
                .names()
                .into_iter()
                .filter_map(|name| self.engine.info(&name))
                .map(|info| format!("{} ({}) - {}", info.name, info.kind, info.description))
                .collect(),
            ("players", _) => self.roster.names(),
            ("join", [_, player]) => report(self.roster.join(player).map(|id| format!("{} joined as {}", player, id))),
            ("leave", [_, player]) => report(self.roster.leave(player).map(|_| format!("{} left", player))),
            ("set", [_, player, placeholder, value]) => report(
                self.roster
                    .set(player, placeholder, value)
                    .map(|_| format!("{} {} = {}", player, placeholder, value)),
            ),
            ("placeholder", [_, params]) => vec![self.engine.expand(params)],
            ("save", [_, name]) => {
                let flushed = self
                    .engine
                    .require(name)
                    .and_then(|handle| handle.flush())
                    .map(|outcome| format!("{}: {:?}", name, outcome));
                report(flushed.map_err(anyhow::Error::from))
            }
            ("complete", [_, rest @ ..]) => admin::complete(&self.engine, rest),
            ("join" | "leave" | "set" | "placeholder" | "save", _) => HELP.iter().map(|l| l.to_string()).collect(),
            _ => match AdminCommand::parse(line) {
                Ok(command) => command.execute(&mut self.engine).await,
                Err(usage) => usage,
            },
        }
    }
}

fn report(result: Result<String>) -> Vec<String> {
    match result {
        Ok(line) => vec![line],
        Err(err) => vec![format!("Error: {:#}", err)],
    }
}
