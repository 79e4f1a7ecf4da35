//! Scripted stand-in for the external tools.

#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use std::path::Path;
use std::sync::{Arc, Mutex};

use yoop_core::{ToolConfig, ToolOutput, ToolRunner, Toolchain};

type Handler = dyn Fn(&str, &[String], &[u8]) -> ToolOutput + Send + Sync;

/// One recorded invocation.
#[derive(Debug, Clone)]
pub struct Call {
    pub program: String,
    pub args: Vec<String>,
}

/// Answers every invocation from a closure keyed on the program name and
/// records what was asked.
pub struct ScriptedRunner {
    handler: Box<Handler>,
    calls: Mutex<Vec<Call>>,
}

impl ScriptedRunner {
    pub fn new(
        handler: impl Fn(&str, &[String], &[u8]) -> ToolOutput + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            handler: Box::new(handler),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, program: &str) -> usize {
        self.calls().iter().filter(|c| c.program == program).count()
    }
}

impl ToolRunner for ScriptedRunner {
    fn run(
        &self,
        program: &Path,
        args: &[String],
        input: &[u8],
    ) -> yoop_core::Result<ToolOutput> {
        let name = program
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.calls.lock().unwrap().push(Call {
            program: name.clone(),
            args: args.to_vec(),
        });
        Ok((self.handler)(&name, args, input))
    }
}

pub fn toolchain(runner: Arc<ScriptedRunner>) -> Toolchain {
    Toolchain::with_runner(ToolConfig::default(), runner)
}

pub fn toolchain_with(config: ToolConfig, runner: Arc<ScriptedRunner>) -> Toolchain {
    Toolchain::with_runner(config, runner)
}

/// Value following `flag` in an argument list.
pub fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .map(String::as_str)
}

/// Apply a `--playlist-items` `start:end:step` selection the way the
/// fetcher does: 1-based, inclusive, negatives counting from the end.
pub fn select_items<T: Clone>(items: &[T], selection: &str) -> Vec<T> {
    let len = isize::try_from(items.len()).unwrap();
    let parts: Vec<&str> = selection.split(':').collect();
    let bound = |s: &str| -> Option<isize> {
        if s.is_empty() {
            None
        } else {
            let v: isize = s.parse().unwrap();
            Some(if v < 0 { len + 1 + v } else { v })
        }
    };
    let start = parts.first().and_then(|s| bound(s));
    let end = parts.get(1).and_then(|s| bound(s));
    let step: isize = parts.get(2).map_or(1, |s| s.parse().unwrap());

    let mut out = Vec::new();
    if step > 0 {
        let mut i = start.unwrap_or(1).max(1);
        let end = end.unwrap_or(len).min(len);
        while i <= end {
            out.push(items[usize::try_from(i - 1).unwrap()].clone());
            i += step;
        }
    } else {
        let mut i = start.unwrap_or(len).min(len);
        let end = end.unwrap_or(1).max(1);
        while i >= end {
            out.push(items[usize::try_from(i - 1).unwrap()].clone());
            i += step;
        }
    }
    out
}
