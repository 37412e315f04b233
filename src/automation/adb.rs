use super::driver::UiDriver;
use super::gestures::Swipe;
use super::tree::{UiNode, UiTree};
use crate::model::ToolPaths;
use anyhow::{Context, Result, bail};
use std::process::{Command, Output};

const DUMP_START: &str = "<?xml";
const DUMP_END: &str = "</hierarchy>";

/// Drives a device over `adb`: uiautomator dumps in, `input` events out.
#[derive(Debug, Clone)]
pub struct AdbDriver {
    program: String,
    serial: Option<String>,
}

impl AdbDriver {
    pub fn new(program: impl Into<String>, serial: Option<String>) -> Self {
        Self {
            program: program.into(),
            serial,
        }
    }

    pub fn from_tools(tools: &ToolPaths) -> Self {
        Self::new(tools.adb.clone(), tools.adb_serial.clone())
    }

    pub fn base_args(&self) -> Vec<String> {
        match &self.serial {
            Some(serial) => vec!["-s".to_string(), serial.clone()],
            None => Vec::new(),
        }
    }

    fn run(&self, args: &[String]) -> Result<Output> {
        let mut all = self.base_args();
        all.extend_from_slice(args);
        log::debug!("{} {}", self.program, all.join(" "));
        Command::new(&self.program)
            .args(&all)
            .output()
            .with_context(|| format!("failed to run {}", self.program))
    }

    fn shell(&self, command: &[String]) -> Result<bool> {
        let mut args = vec!["shell".to_string()];
        args.extend_from_slice(command);
        let output = self.run(&args)?;
        if !output.status.success() {
            log::warn!(
                "adb shell {} failed: {}",
                command.join(" "),
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok(output.status.success())
    }

    fn input_swipe(&self, from: (i32, i32), to: (i32, i32), millis: u128) -> Result<bool> {
        let args: Vec<String> = ["input", "swipe"]
            .into_iter()
            .map(str::to_string)
            .chain(
                [from.0, from.1, to.0, to.1]
                    .into_iter()
                    .map(|value| value.to_string()),
            )
            .chain(std::iter::once(millis.to_string()))
            .collect();
        self.shell(&args)
    }
}

impl UiDriver for AdbDriver {
    fn snapshot(&mut self) -> Result<UiTree> {
        let args: Vec<String> = ["exec-out", "uiautomator", "dump", "/dev/tty"]
            .into_iter()
            .map(str::to_string)
            .collect();
        let output = self.run(&args)?;
        let raw = String::from_utf8_lossy(&output.stdout);
        let xml = extract_dump(&raw).with_context(|| {
            format!(
                "uiautomator returned no hierarchy: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            )
        })?;
        UiTree::from_uiautomator_xml(xml)
    }

    fn click(&mut self, node: &UiNode) -> Result<bool> {
        if node.bounds.is_empty() {
            return Ok(false);
        }
        let (x, y) = node.bounds.center();
        self.shell(&[
            "input".to_string(),
            "tap".to_string(),
            x.to_string(),
            y.to_string(),
        ])
    }

    /// adb has no accessibility actions, so this is a fling inside the node.
    fn scroll_forward(&mut self, node: &UiNode) -> Result<bool> {
        let bounds = node.bounds;
        if bounds.is_empty() {
            return Ok(false);
        }
        let (cx, cy) = bounds.center();
        let (from, to) = if bounds.width() >= bounds.height() {
            let span = bounds.width() / 10 * 3;
            ((cx.saturating_add(span), cy), (cx.saturating_sub(span), cy))
        } else {
            let span = bounds.height() / 10 * 3;
            ((cx, cy.saturating_add(span)), (cx, cy.saturating_sub(span)))
        };
        self.input_swipe(from, to, 300)
    }

    fn swipe(&mut self, swipe: &Swipe) -> Result<bool> {
        self.input_swipe(
            (swipe.start.x.round() as i32, swipe.start.y.round() as i32),
            (swipe.end.x.round() as i32, swipe.end.y.round() as i32),
            swipe.duration.as_millis(),
        )
    }

    fn focused_package(&mut self) -> Result<Option<String>> {
        let args: Vec<String> = ["shell", "dumpsys", "window"]
            .into_iter()
            .map(str::to_string)
            .collect();
        let output = self.run(&args)?;
        if !output.status.success() {
            bail!("dumpsys window exited with {}", output.status);
        }
        Ok(parse_focused_package(&String::from_utf8_lossy(&output.stdout)))
    }
}

/// The XML part of `uiautomator dump /dev/tty` output.
pub fn extract_dump(raw: &str) -> Option<&str> {
    let start = raw.find(DUMP_START)?;
    let end = raw[start..].find(DUMP_END)? + start + DUMP_END.len();
    Some(&raw[start..end])
}

/// Package from the `mCurrentFocus=Window{… u0 pkg/activity}` line.
pub fn parse_focused_package(dumpsys: &str) -> Option<String> {
    let line = dumpsys
        .lines()
        .find(|line| line.contains("mCurrentFocus") || line.contains("mFocusedApp"))?;
    line.split_whitespace()
        .filter_map(|token| token.split_once('/'))
        .map(|(package, _)| package.trim_start_matches('{'))
        .find(|package| package.contains('.') && !package.is_empty())
        .map(str::to_string)
}
