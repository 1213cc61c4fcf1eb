use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use partial_core::{PageCoordinator, StateKey};
use partial_web::{
    AxumPartialAdapter, CheckBoxList, EventKind, ListItem, Page, PageHost, RepeatLayout,
};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "partial")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Serve pages whose widgets refresh through callbacks", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve the demo page
    Serve {
        /// Address to bind
        #[arg(long)]
        bind: Option<String>,

        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,

        /// TOML file with server settings
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,
    },

    /// Write the client runtime script to a file
    Runtime {
        #[arg(short, long, default_value = "partial-runtime.js")]
        out: PathBuf,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ServeConfig {
    pub bind: String,
    pub port: u16,
    pub title: String,
    /// Secret sealing the page state. A random one is generated per process
    /// when unset, so served pages stop calling back after a restart.
    pub state_key: Option<String>,
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".to_string(),
            port: 8080,
            title: "Partial demo".to_string(),
            state_key: None,
        }
    }
}

impl ServeConfig {
    pub fn from_toml(source: &str) -> Result<Self> {
        toml::from_str(source).context("invalid server config")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let source = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_toml(&source).with_context(|| format!("in {}", path.display()))
    }

    /// Command-line flags win over the file.
    pub fn with_overrides(mut self, bind: Option<String>, port: Option<u16>) -> Self {
        if let Some(bind) = bind {
            self.bind = bind;
        }
        if let Some(port) = port {
            self.port = port;
        }
        self
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }

    pub fn state_key(&self) -> Result<StateKey> {
        match &self.state_key {
            Some(secret) => StateKey::new(secret).context("invalid state_key"),
            None => Ok(StateKey::generate()),
        }
    }
}

pub async fn run_from_env() -> Result<()> {
    init_tracing();
    run(Cli::parse()).await
}

pub async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Serve { bind, port, config } => {
            let config = match config {
                Some(path) => ServeConfig::load(&path)?,
                None => ServeConfig::default(),
            }
            .with_overrides(bind, port);
            serve(config).await
        }
        Command::Runtime { out } => {
            fs::write(&out, partial_web::PARTIAL_RUNTIME_JS)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("wrote {}", out.display());
            Ok(())
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    // A subscriber may already be installed when embedded.
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

async fn serve(config: ServeConfig) -> Result<()> {
    let address = config.address();
    let key = config.state_key()?;
    let app = AxumPartialAdapter::new(demo_host(config.title).with_state_key(key)).router();
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind {address}"))?;
    tracing::info!("serving on http://{address}");
    axum::serve(listener, app).await.context("server stopped")?;
    Ok(())
}

fn palette() -> Vec<ListItem> {
    ["Red", "Green", "Blue", "Yellow"]
        .into_iter()
        .map(|name| ListItem::new(name, name.to_ascii_lowercase()))
        .collect()
}

/// Demo page: `colors` calls back on every click, `mirror` follows its
/// selection on every callback, `extras` appears once something is picked,
/// and `plain` still submits the whole form.
pub fn demo_host(title: String) -> PageHost {
    PageHost::new(move |coordinator: Rc<PageCoordinator>| {
        let mut page = Page::new(title.clone(), coordinator);

        let colors = CheckBoxList::new("colors", page.coordinator())?
            .with_items(palette())
            .with_config(|config| {
                config.auto_callback = true;
                config.text_during_callback = "Saving...".to_string();
                config.enabled_during_callback = false;
            });

        let mut mirror = CheckBoxList::new("mirror", page.coordinator())?
            .with_items(palette())
            .with_layout(RepeatLayout::Flow);
        mirror.set_auto_update_after_callback(true);
        mirror.set_enabled(false);

        let mut extras = CheckBoxList::new("extras", page.coordinator())?.with_items([
            ListItem::new("Matte", "matte"),
            ListItem::new("Gloss", "gloss"),
        ]);
        extras.set_visible(false);

        let mut plain = CheckBoxList::new("plain", page.coordinator())?
            .with_items([ListItem::new("Newsletter", "news")])
            .with_layout(RepeatLayout::Flow);
        plain.set_auto_postback(true);

        page.add_html("<h2>Pick colors</h2>");
        page.add(colors)?;
        page.add_html("<h2>Mirror</h2>");
        page.add(mirror)?;
        page.add_html("<h2>Finish</h2>");
        page.add(extras)?;
        page.add_html("<h2>Full postback</h2>");
        page.add(plain)?;

        page.on_event(|controls, event| {
            if event.kind != EventKind::Callback || event.target.as_str() != "colors" {
                return Ok(());
            }
            if let Some(mirror) = controls.get_mut("mirror") {
                mirror.apply_selection(&event.checked)?;
            }
            if let Some(extras) = controls.get_mut("extras") {
                let show = !event.checked.is_empty();
                if extras.visible() != show {
                    extras.set_visible(show);
                    extras.set_update_after_callback(true);
                }
            }
            Ok(())
        });
        Ok(page)
    })
}
