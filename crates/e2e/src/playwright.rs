//! Playwright browser automation
//!
//! A long-lived `node` process runs a small bridge script that owns one
//! browser context. Commands go over stdin as JSON lines, one reply per
//! command on stdout, matched by id.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tracing::{debug, info, warn};

use crate::driver::{Dialog, Driver, Locator, WaitState};
use crate::error::{E2eError, E2eResult};
use crate::session::Cookie;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum BrowserKind {
    #[default]
    Chromium,
    Firefox,
    Webkit,
}

impl BrowserKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BrowserKind::Chromium => "chromium",
            BrowserKind::Firefox => "firefox",
            BrowserKind::Webkit => "webkit",
        }
    }
}

/// Configuration for one browser process
#[derive(Debug, Clone)]
pub struct DriverConfig {
    pub base_url: String,
    pub browser: BrowserKind,
    pub headless: bool,
    pub viewport_width: u32,
    pub viewport_height: u32,
    pub navigation_timeout: Duration,

    /// `node` executable
    pub node_binary: PathBuf,

    /// Directory `playwright` is resolved from (its `node_modules`)
    pub working_dir: PathBuf,

    /// Upper bound for starting node and launching the browser
    pub launch_timeout: Duration,

    /// Added to each command's own timeout to bound the round trip
    pub command_slack: Duration,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.demoblaze.com".to_string(),
            browser: BrowserKind::Chromium,
            headless: true,
            viewport_width: 1280,
            viewport_height: 720,
            navigation_timeout: Duration::from_secs(30),
            node_binary: PathBuf::from("node"),
            working_dir: PathBuf::from("."),
            launch_timeout: Duration::from_secs(60),
            command_slack: Duration::from_secs(5),
        }
    }
}

#[derive(Serialize)]
struct BridgeConfig<'a> {
    base_url: &'a str,
    browser: &'static str,
    headless: bool,
    viewport_width: u32,
    viewport_height: u32,
    navigation_timeout_ms: u64,
}

#[derive(Debug, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum BridgeCommand<'a> {
    Goto { path: &'a str, timeout_ms: u64 },
    Reload { timeout_ms: u64 },
    GoBack { timeout_ms: u64 },
    CurrentUrl,
    WaitFor { target: &'a Locator, state: WaitState, timeout_ms: u64 },
    Click { target: &'a Locator, timeout_ms: u64 },
    Fill { target: &'a Locator, value: &'a str, timeout_ms: u64 },
    Count { target: &'a Locator },
    IsVisible { target: &'a Locator },
    InnerText { target: &'a Locator, timeout_ms: u64 },
    AllInnerTexts { target: &'a Locator },
    ExpectDialog,
    ResolveDialog { timeout_ms: u64 },
    PollDialog,
    DisarmDialog,
    Cookies,
    AddCookies { cookies: &'a [Cookie] },
    Close,
}

impl BridgeCommand<'_> {
    /// Bound the bridge enforces itself, if any.
    fn timeout_ms(&self) -> u64 {
        match self {
            BridgeCommand::Goto { timeout_ms, .. }
            | BridgeCommand::Reload { timeout_ms }
            | BridgeCommand::GoBack { timeout_ms }
            | BridgeCommand::WaitFor { timeout_ms, .. }
            | BridgeCommand::Click { timeout_ms, .. }
            | BridgeCommand::Fill { timeout_ms, .. }
            | BridgeCommand::InnerText { timeout_ms, .. }
            | BridgeCommand::ResolveDialog { timeout_ms } => *timeout_ms,
            _ => 0,
        }
    }

    fn describe(&self) -> String {
        match self {
            BridgeCommand::Goto { path, .. } => format!("goto {path}"),
            BridgeCommand::WaitFor { target, state, .. } => format!("{} to be {state:?}", target.describe()),
            BridgeCommand::Click { target, .. } => format!("click {}", target.describe()),
            BridgeCommand::Fill { target, .. } => format!("fill {}", target.describe()),
            BridgeCommand::InnerText { target, .. } => format!("text of {}", target.describe()),
            BridgeCommand::Count { target }
            | BridgeCommand::IsVisible { target }
            | BridgeCommand::AllInnerTexts { target } => target.describe(),
            BridgeCommand::ResolveDialog { .. } => "native dialog".to_string(),
            other => format!("{other:?}"),
        }
    }
}

#[derive(Serialize)]
struct Envelope<'a> {
    id: u64,
    #[serde(flatten)]
    command: &'a BridgeCommand<'a>,
}

#[derive(Debug, Deserialize)]
struct Reply {
    id: u64,
    #[serde(default)]
    value: Value,
    #[serde(default)]
    error: Option<BridgeFailure>,
}

#[derive(Debug, Deserialize)]
struct BridgeFailure {
    kind: String,
    message: String,
}

/// Unsolicited line from the bridge, e.g. a dialog nobody armed for.
#[derive(Debug, Deserialize)]
struct BridgeEvent {
    event: String,
    #[serde(default)]
    message: String,
}

#[derive(Debug)]
enum BridgeLine {
    Reply(Reply),
    Event(BridgeEvent),
    Other,
}

impl BridgeLine {
    fn parse(line: &str) -> Self {
        if let Ok(reply) = serde_json::from_str::<Reply>(line) {
            return BridgeLine::Reply(reply);
        }
        match serde_json::from_str::<BridgeEvent>(line) {
            Ok(event) => BridgeLine::Event(event),
            Err(_) => BridgeLine::Other,
        }
    }
}

/// [`Driver`] backed by a Playwright browser context.
pub struct PlaywrightDriver {
    child: Child,
    stdin: ChildStdin,
    stdout: Lines<BufReader<ChildStdout>>,
    next_id: u64,
    navigation_timeout: Duration,
    command_slack: Duration,
    // Holds the bridge script for the child's lifetime.
    _script_dir: tempfile::TempDir,
}

impl PlaywrightDriver {
    /// Start node, launch the browser and open a blank page.
    pub async fn launch(config: DriverConfig) -> E2eResult<Self> {
        let script_dir = tempfile::tempdir()?;
        let script_path = script_dir.path().join("bridge.js");
        std::fs::write(&script_path, BRIDGE_JS)?;

        let bridge_config = serde_json::to_string(&BridgeConfig {
            base_url: &config.base_url,
            browser: config.browser.as_str(),
            headless: config.headless,
            viewport_width: config.viewport_width,
            viewport_height: config.viewport_height,
            navigation_timeout_ms: ms(config.navigation_timeout),
        })?;

        let mut child = Command::new(&config.node_binary)
            .arg(&script_path)
            .current_dir(&config.working_dir)
            .env("STORECHECK_BRIDGE_CONFIG", bridge_config)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| E2eError::Driver(format!("Failed to spawn {}: {}", config.node_binary.display(), e)))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| E2eError::Driver("bridge stdin unavailable".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| E2eError::Driver("bridge stdout unavailable".into()))?;

        let mut driver = Self {
            child,
            stdin,
            stdout: BufReader::new(stdout).lines(),
            next_id: 1,
            navigation_timeout: config.navigation_timeout,
            command_slack: config.command_slack,
            _script_dir: script_dir,
        };

        match tokio::time::timeout(config.launch_timeout, driver.read_reply(0)).await {
            Ok(Ok(Reply { error: None, .. })) => {}
            Ok(Ok(Reply { error: Some(failure), .. })) => {
                return Err(E2eError::Driver(format!("browser launch: {}", failure.message)))
            }
            Ok(Err(e)) => return Err(e),
            Err(_) => return Err(E2eError::timeout("browser launch", config.launch_timeout)),
        }

        info!(browser = config.browser.as_str(), base_url = %config.base_url, "browser launched");
        Ok(driver)
    }

    async fn call(&mut self, command: BridgeCommand<'_>) -> E2eResult<Value> {
        let id = self.next_id;
        self.next_id += 1;

        let mut line = serde_json::to_string(&Envelope { id, command: &command })?;
        line.push('\n');

        let own_timeout = Duration::from_millis(command.timeout_ms());
        let bound = own_timeout + self.command_slack;

        let exchange = async {
            self.stdin.write_all(line.as_bytes()).await?;
            self.stdin.flush().await?;
            self.read_reply(id).await
        };

        let reply = match tokio::time::timeout(bound, exchange).await {
            Ok(reply) => reply?,
            Err(_) => return Err(E2eError::timeout(command.describe(), bound)),
        };

        match reply.error {
            None => Ok(reply.value),
            Some(failure) if failure.kind == "timeout" => Err(E2eError::timeout(command.describe(), own_timeout)),
            Some(failure) => Err(E2eError::Driver(format!("{}: {}", command.describe(), failure.message))),
        }
    }

    async fn read_reply(&mut self, id: u64) -> E2eResult<Reply> {
        loop {
            let line = self
                .stdout
                .next_line()
                .await?
                .ok_or_else(|| E2eError::Driver("bridge exited unexpectedly".into()))?;
            match BridgeLine::parse(&line) {
                BridgeLine::Reply(reply) if reply.id == id => return Ok(reply),
                BridgeLine::Reply(reply) => warn!(expected = id, got = reply.id, "stale bridge reply"),
                BridgeLine::Event(event) => {
                    warn!(event = %event.event, dialog = %event.message, "dialog outside the armed window")
                }
                BridgeLine::Other => debug!(line = %line, "bridge output"),
            }
        }
    }

    /// Close the browser and wait for node to exit.
    pub async fn close(mut self) -> E2eResult<()> {
        self.call(BridgeCommand::Close).await?;
        let _ = tokio::time::timeout(Duration::from_secs(5), self.child.wait()).await;
        Ok(())
    }

    fn stop(&mut self) {
        #[cfg(unix)]
        {
            use nix::sys::signal::{kill, Signal};
            use nix::unistd::Pid;

            if let Some(pid) = self.child.id() {
                let _ = kill(Pid::from_raw(pid as i32), Signal::SIGTERM);
            }
        }

        let _ = self.child.start_kill();
    }
}

impl Drop for PlaywrightDriver {
    fn drop(&mut self) {
        self.stop();
    }
}

fn ms(d: Duration) -> u64 {
    d.as_millis() as u64
}

#[async_trait]
impl Driver for PlaywrightDriver {
    async fn goto(&mut self, path: &str) -> E2eResult<()> {
        let timeout_ms = ms(self.navigation_timeout);
        self.call(BridgeCommand::Goto { path, timeout_ms }).await.map(drop)
    }

    async fn reload(&mut self) -> E2eResult<()> {
        let timeout_ms = ms(self.navigation_timeout);
        self.call(BridgeCommand::Reload { timeout_ms }).await.map(drop)
    }

    async fn go_back(&mut self) -> E2eResult<()> {
        let timeout_ms = ms(self.navigation_timeout);
        self.call(BridgeCommand::GoBack { timeout_ms }).await.map(drop)
    }

    async fn current_url(&mut self) -> E2eResult<String> {
        let value = self.call(BridgeCommand::CurrentUrl).await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    async fn wait_for(&mut self, target: &Locator, state: WaitState, timeout: Duration) -> E2eResult<()> {
        self.call(BridgeCommand::WaitFor {
            target,
            state,
            timeout_ms: ms(timeout),
        })
        .await
        .map(drop)
    }

    async fn click(&mut self, target: &Locator) -> E2eResult<()> {
        self.call(BridgeCommand::Click {
            target,
            timeout_ms: ms(self.command_slack),
        })
        .await
        .map(drop)
    }

    async fn fill(&mut self, target: &Locator, value: &str) -> E2eResult<()> {
        self.call(BridgeCommand::Fill {
            target,
            value,
            timeout_ms: ms(self.command_slack),
        })
        .await
        .map(drop)
    }

    async fn count(&mut self, target: &Locator) -> E2eResult<usize> {
        let value = self.call(BridgeCommand::Count { target }).await?;
        Ok(value.as_u64().unwrap_or(0) as usize)
    }

    async fn is_visible(&mut self, target: &Locator) -> E2eResult<bool> {
        let value = self.call(BridgeCommand::IsVisible { target }).await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    async fn inner_text(&mut self, target: &Locator) -> E2eResult<Option<String>> {
        let value = self
            .call(BridgeCommand::InnerText {
                target,
                timeout_ms: ms(self.command_slack),
            })
            .await?;
        Ok(value.as_str().map(str::to_string))
    }

    async fn all_inner_texts(&mut self, target: &Locator) -> E2eResult<Vec<String>> {
        let value = self.call(BridgeCommand::AllInnerTexts { target }).await?;
        Ok(serde_json::from_value(value)?)
    }

    async fn expect_dialog(&mut self) -> E2eResult<()> {
        self.call(BridgeCommand::ExpectDialog).await.map(drop)
    }

    async fn resolve_dialog(&mut self, timeout: Duration) -> E2eResult<Dialog> {
        let value = self
            .call(BridgeCommand::ResolveDialog {
                timeout_ms: ms(timeout),
            })
            .await?;
        Ok(serde_json::from_value(value)?)
    }

    async fn poll_dialog(&mut self) -> E2eResult<Option<Dialog>> {
        let value = self.call(BridgeCommand::PollDialog).await?;
        Ok(serde_json::from_value(value)?)
    }

    async fn disarm_dialog(&mut self) -> E2eResult<()> {
        self.call(BridgeCommand::DisarmDialog).await.map(drop)
    }

    async fn cookies(&mut self) -> E2eResult<Vec<Cookie>> {
        let value = self.call(BridgeCommand::Cookies).await?;
        Ok(serde_json::from_value(value)?)
    }

    async fn add_cookies(&mut self, cookies: &[Cookie]) -> E2eResult<()> {
        self.call(BridgeCommand::AddCookies { cookies }).await.map(drop)
    }
}

/// Node side of the protocol. Locators resolve to role/text queries; waits and
/// text reads use the first match, clicks and fills stay strict.
const BRIDGE_JS: &str = r#"
const { chromium, firefox, webkit } = require(require.resolve('playwright', { paths: [process.cwd()] }));
const readline = require('readline');

const cfg = JSON.parse(process.env.STORECHECK_BRIDGE_CONFIG);
const engines = { chromium, firefox, webkit };

function send(msg) {
  process.stdout.write(JSON.stringify(msg) + '\n');
}

function resolve(root, loc) {
  switch (loc.by) {
    case 'role':
      return loc.name == null
        ? root.getByRole(loc.role)
        : root.getByRole(loc.role, { name: loc.name, exact: !!loc.exact });
    case 'text':
      return root.getByText(loc.text);
    case 'id':
      return root.locator(`[id="${loc.id}"]`);
    case 'class':
      return root.locator(`.${loc.class}`);
    case 'within':
      return resolve(resolve(root, loc.scope), loc.inner);
    case 'nth':
      return resolve(root, loc.base).nth(loc.index);
    default:
      throw new Error(`unknown locator ${JSON.stringify(loc)}`);
  }
}

const sleep = (ms) => new Promise((r) => setTimeout(r, ms));

(async () => {
  const browser = await engines[cfg.browser].launch({ headless: cfg.headless });
  const context = await browser.newContext({
    baseURL: cfg.base_url,
    viewport: { width: cfg.viewport_width, height: cfg.viewport_height },
  });
  const page = await context.newPage();

  let armed = false;
  let fired = null;
  const report = (event, message) => {
    send({ event, message });
    process.stderr.write(`bridge: ${event}: ${message}\n`);
  };
  const dropFired = () => {
    if (fired !== null) report('dropped_dialog', fired.message);
    fired = null;
  };
  page.on('dialog', async (dialog) => {
    if (armed) {
      armed = false;
      fired = { message: dialog.message() };
    } else {
      report('unexpected_dialog', dialog.message());
    }
    await dialog.accept().catch(() => dialog.dismiss().catch(() => {}));
  });

  const ops = {
    goto: (c) => page.goto(c.path, { timeout: c.timeout_ms }).then(() => null),
    reload: (c) => page.reload({ timeout: c.timeout_ms }).then(() => null),
    go_back: (c) => page.goBack({ timeout: c.timeout_ms }).then(() => null),
    current_url: async () => page.url(),
    wait_for: (c) => resolve(page, c.target).first().waitFor({ state: c.state, timeout: c.timeout_ms }).then(() => null),
    click: (c) => resolve(page, c.target).click({ timeout: c.timeout_ms }).then(() => null),
    fill: (c) => resolve(page, c.target).fill(c.value, { timeout: c.timeout_ms }).then(() => null),
    count: (c) => resolve(page, c.target).count(),
    is_visible: (c) => resolve(page, c.target).first().isVisible(),
    inner_text: async (c) => {
      const loc = resolve(page, c.target);
      if ((await loc.count()) === 0) return null;
      return loc.first().innerText({ timeout: c.timeout_ms });
    },
    all_inner_texts: (c) => resolve(page, c.target).allInnerTexts(),
    expect_dialog: async () => {
      dropFired();
      armed = true;
      return null;
    },
    resolve_dialog: async (c) => {
      const deadline = Date.now() + c.timeout_ms;
      while (fired === null) {
        if (Date.now() >= deadline) {
          const err = new Error(`no dialog within ${c.timeout_ms} ms`);
          err.name = 'TimeoutError';
          throw err;
        }
        await sleep(25);
      }
      const d = fired;
      fired = null;
      return d;
    },
    poll_dialog: async () => {
      const d = fired;
      fired = null;
      return d;
    },
    disarm_dialog: async () => {
      dropFired();
      armed = false;
      return null;
    },
    cookies: () => context.cookies(),
    add_cookies: (c) => context.addCookies(c.cookies).then(() => null),
    close: async () => {
      await browser.close();
      return null;
    },
  };

  page.setDefaultNavigationTimeout(cfg.navigation_timeout_ms);
  send({ id: 0, value: 'ready' });

  let queue = Promise.resolve();
  const rl = readline.createInterface({ input: process.stdin });
  rl.on('line', (line) => {
    queue = queue.then(async () => {
      let cmd;
      try {
        cmd = JSON.parse(line);
        const value = await ops[cmd.op](cmd);
        send({ id: cmd.id, value: value === undefined ? null : value });
        if (cmd.op === 'close') process.exit(0);
      } catch (e) {
        const kind = e && e.name === 'TimeoutError' ? 'timeout' : 'error';
        send({ id: cmd ? cmd.id : -1, error: { kind, message: String(e && e.message) } });
      }
    });
  });
  rl.on('close', async () => {
    await browser.close().catch(() => {});
    process.exit(0);
  });
})().catch((e) => {
  process.stderr.write(`bridge failed: ${e && e.stack}\n`);
  process.exit(1);
});
"#;
